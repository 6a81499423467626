//! Allow/deny matching of request actions.
//!
//! An action is in the enforcement set when it matches at least one allow
//! pattern and no deny pattern. Deny always wins on overlap.

use std::fmt;

/// A single action pattern.
///
/// Patterns form a closed set:
/// - `"*"` matches every action, including the empty one
/// - `"prefix*"` matches every action starting with `prefix`
/// - anything else must equal the action exactly
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// Matches any action.
    Any,
    /// Matches actions starting with the given prefix.
    Prefix(String),
    /// Matches exactly one action.
    Exact(String),
}

impl Pattern {
    /// Parses a configured pattern string.
    ///
    /// # Examples
    ///
    /// ```
    /// use csrf_gate::Pattern;
    ///
    /// assert_eq!(Pattern::parse("*"), Pattern::Any);
    /// assert_eq!(Pattern::parse("user.*"), Pattern::Prefix("user.".to_string()));
    /// assert_eq!(Pattern::parse("ping"), Pattern::Exact("ping".to_string()));
    /// ```
    pub fn parse(raw: &str) -> Self {
        if raw == "*" {
            return Pattern::Any;
        }
        match raw.strip_suffix('*') {
            Some(prefix) if !prefix.is_empty() && !prefix.contains('*') => {
                Pattern::Prefix(prefix.to_string())
            }
            _ => Pattern::Exact(raw.to_string()),
        }
    }

    /// Returns true if this pattern matches `action`.
    pub fn matches(&self, action: &str) -> bool {
        match self {
            Pattern::Any => true,
            Pattern::Prefix(prefix) => action.starts_with(prefix.as_str()),
            Pattern::Exact(expected) => expected == action,
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Any => write!(f, "*"),
            Pattern::Prefix(prefix) => write!(f, "{}*", prefix),
            Pattern::Exact(action) => write!(f, "{}", action),
        }
    }
}

/// Decides whether CSRF enforcement applies to an action.
///
/// # Examples
///
/// ```
/// use csrf_gate::ActionMatcher;
///
/// let matcher = ActionMatcher::new(["*"], ["ping"]);
///
/// assert!(matcher.matches("user.update"));
/// assert!(!matcher.matches("ping"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionMatcher {
    allow: Vec<Pattern>,
    deny: Vec<Pattern>,
}

impl ActionMatcher {
    /// Builds a matcher from allow and deny pattern lists.
    ///
    /// An empty allow list is treated as `["*"]`.
    pub fn new<A, D>(allow: A, deny: D) -> Self
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        let mut allow: Vec<Pattern> = allow
            .into_iter()
            .map(|p| Pattern::parse(p.as_ref()))
            .collect();
        if allow.is_empty() {
            allow.push(Pattern::Any);
        }

        let deny = deny
            .into_iter()
            .map(|p| Pattern::parse(p.as_ref()))
            .collect();

        Self { allow, deny }
    }

    /// Returns true if `action` matches some allow pattern.
    pub fn is_allowed(&self, action: &str) -> bool {
        self.allow.iter().any(|p| p.matches(action))
    }

    /// Returns true if `action` matches some deny pattern.
    pub fn is_denied(&self, action: &str) -> bool {
        self.deny.iter().any(|p| p.matches(action))
    }

    /// Returns true if CSRF enforcement applies to `action`.
    ///
    /// Equivalent to `is_allowed(action) && !is_denied(action)`, independent
    /// of the order patterns were configured in.
    pub fn matches(&self, action: &str) -> bool {
        !self.is_denied(action) && self.is_allowed(action)
    }

    /// Returns the parsed allow patterns.
    pub fn allow_patterns(&self) -> &[Pattern] {
        &self.allow
    }

    /// Returns the parsed deny patterns.
    pub fn deny_patterns(&self) -> &[Pattern] {
        &self.deny
    }
}

impl Default for ActionMatcher {
    fn default() -> Self {
        Self {
            allow: vec![Pattern::Any],
            deny: Vec::new(),
        }
    }
}
