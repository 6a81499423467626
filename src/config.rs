//! Gate configuration and its environment loading.

use std::path::Path;

use serde::{Deserialize, Deserializer};

use crate::error::ConfigError;

/// Environment variable prefix used by [`CsrfConfig::from_env`].
pub const ENV_PREFIX: &str = "APICSRF_";

const DEFAULT_HEADER_NAME: &str = "X-CSRF-TOKEN";
const DEFAULT_SESSION_NAME: &str = "default";
const DEFAULT_SESSION_KEY: &str = "csrf_token";

/// Configuration for the CSRF gate.
///
/// Every field has a default, so partial configuration (or none at all)
/// deserializes cleanly.
///
/// # Examples
///
/// ```
/// use csrf_gate::CsrfConfig;
///
/// let config = CsrfConfig::new()
///     .header_name("X-XSRF-TOKEN")
///     .deny_actions(["ping"]);
///
/// assert!(config.enabled);
/// assert_eq!(config.header_name, "X-XSRF-TOKEN");
/// assert_eq!(config.store_key().key, "csrf_token");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CsrfConfig {
    /// Master switch.
    /// Default: true
    pub enabled: bool,

    /// The name of the header expected to contain the CSRF token.
    /// Default: "X-CSRF-TOKEN"
    pub header_name: String,

    /// Where the expected token lives, as `session_name.value_key`.
    /// Default: "default.csrf_token"
    pub session_store_key: String,

    /// Actions that require a CSRF token.
    /// Entries are trimmed and empty entries dropped.
    /// Default: ["*"]
    #[serde(deserialize_with = "deserialize_actions")]
    pub allow_actions: Vec<String>,

    /// Actions exempt from the CSRF check, even if allowed above.
    /// Entries are trimmed and empty entries dropped.
    /// Default: []
    #[serde(deserialize_with = "deserialize_actions")]
    pub deny_actions: Vec<String>,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            header_name: DEFAULT_HEADER_NAME.to_string(),
            session_store_key: format!("{}.{}", DEFAULT_SESSION_NAME, DEFAULT_SESSION_KEY),
            allow_actions: vec!["*".to_string()],
            deny_actions: Vec::new(),
        }
    }
}

impl CsrfConfig {
    /// Create a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from `APICSRF_*` environment variables.
    ///
    /// List values are comma separated, e.g. `APICSRF_DENY_ACTIONS=ping, health`;
    /// whitespace around each entry is ignored. Unset variables keep their
    /// defaults.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use csrf_gate::{load_dotenv, CsrfConfig};
    ///
    /// // Pick up APICSRF_* settings from .env, if present
    /// load_dotenv();
    /// let config = CsrfConfig::from_env().expect("invalid APICSRF_* settings");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if a variable is present but malformed,
    /// e.g. `APICSRF_ENABLED=maybe`.
    pub fn from_env() -> Result<Self, ConfigError> {
        envy::prefixed(ENV_PREFIX)
            .from_env::<Self>()
            .map_err(ConfigError::from)
    }

    /// Load configuration from explicit key/value pairs using the same
    /// `APICSRF_*` naming as [`from_env`](Self::from_env).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if a value is malformed.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(ENV_PREFIX)
            .from_iter::<_, Self>(pairs)
            .map_err(ConfigError::from)
    }

    /// Set the master switch.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the header name.
    pub fn header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = name.into();
        self
    }

    /// Set the `session_name.value_key` address of the expected token.
    pub fn session_store_key(mut self, key: impl Into<String>) -> Self {
        self.session_store_key = key.into();
        self
    }

    /// Set the actions that require a token.
    pub fn allow_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_actions = normalize_actions(actions.into_iter().map(Into::into));
        self
    }

    /// Set the actions exempt from the check.
    pub fn deny_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deny_actions = normalize_actions(actions.into_iter().map(Into::into));
        self
    }

    /// Parse the session store key.
    pub fn store_key(&self) -> SessionStoreKey {
        SessionStoreKey::parse(&self.session_store_key)
    }
}

/// Trims every action and drops the empty ones.
fn normalize_actions(actions: impl IntoIterator<Item = String>) -> Vec<String> {
    actions
        .into_iter()
        .filter_map(|action| {
            let trimmed = action.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .collect()
}

fn deserialize_actions<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<String>::deserialize(deserializer).map(normalize_actions)
}

/// Location of the expected token inside the session store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionStoreKey {
    /// Name of the session to resolve for each request.
    pub name: String,
    /// Key inside the session's value mapping.
    pub key: String,
}

impl SessionStoreKey {
    /// Splits `raw` on the first `.`.
    ///
    /// Input without a `.` falls back to `default.csrf_token`. Parsing never
    /// fails; an empty name (e.g. `".csrf_token"`) is kept and switches the
    /// check off.
    ///
    /// # Examples
    ///
    /// ```
    /// use csrf_gate::SessionStoreKey;
    ///
    /// let key = SessionStoreKey::parse("auth.token.v2");
    /// assert_eq!(key.name, "auth");
    /// assert_eq!(key.key, "token.v2");
    ///
    /// let fallback = SessionStoreKey::parse("garbage");
    /// assert_eq!(fallback, SessionStoreKey::default());
    /// ```
    pub fn parse(raw: &str) -> Self {
        match raw.split_once('.') {
            Some((name, key)) => Self {
                name: name.to_string(),
                key: key.to_string(),
            },
            None => Self::default(),
        }
    }
}

impl Default for SessionStoreKey {
    fn default() -> Self {
        Self {
            name: DEFAULT_SESSION_NAME.to_string(),
            key: DEFAULT_SESSION_KEY.to_string(),
        }
    }
}

/// Load a `.env` file into the process environment, if one exists.
///
/// Call this before [`CsrfConfig::from_env`] when settings live in `.env`.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

/// Load a specific env file into the process environment.
///
/// Variables already set in the environment are not overwritten.
///
/// # Errors
///
/// Returns [`ConfigError::Dotenv`] if the file cannot be read or parsed.
pub fn load_dotenv_from(path: impl AsRef<Path>) -> Result<(), ConfigError> {
    dotenvy::from_path(path.as_ref())?;
    Ok(())
}
