//! Property tests for csrf-gate.
//!
//! These tests validate matching and check invariants over arbitrary
//! actions, patterns and tokens.

use std::sync::Arc;

use csrf_gate::{
    ActionMatcher, CsrfConfig, CsrfErrorKind, CsrfGate, CsrfToken, ErrorCatalog, ErrorReporter,
    GateHost, MemorySessionStore, Outcome, RequestContext, Session, SessionStore,
    StoreError,
};
use proptest::prelude::*;

// Reference matcher over raw pattern strings: "*", a trailing-"*" prefix
// with no other "*", or an exact name
fn pattern_matches(pattern: &str, action: &str) -> bool {
    if pattern == "*" || pattern == action {
        return true;
    }
    match pattern.strip_suffix('*') {
        Some(prefix) if !prefix.is_empty() && !prefix.contains('*') => action.starts_with(prefix),
        _ => false,
    }
}

// Strategy: dotted action names such as "user.update"
fn arb_action() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]{0,6}(\\.[a-z]{1,6}){0,2}").unwrap()
}

// Strategy: configured patterns, mixing wildcard, prefix and exact forms
fn arb_pattern() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("*".to_string()),
        prop::string::string_regex("[a-z]{1,4}\\*").unwrap(),
        arb_action(),
    ]
}

fn arb_token() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z0-9_-]{1,32}").unwrap()
}

struct Host {
    store: Arc<MemorySessionStore>,
    errors: ErrorCatalog,
}

impl GateHost for Host {
    fn session_store(&self) -> Result<Arc<dyn SessionStore>, StoreError> {
        let store: Arc<dyn SessionStore> = self.store.clone();
        Ok(store)
    }

    fn error_reporter(&self) -> &dyn ErrorReporter {
        &self.errors
    }
}

fn gate_with_token(config: CsrfConfig, token: &str) -> CsrfGate {
    let store = Arc::new(MemorySessionStore::new("X-Session-Id"));
    store.put("sid", Session::new("default").with_value("csrf_token", token));
    CsrfGate::initialize(
        config,
        Arc::new(Host {
            store,
            errors: ErrorCatalog::new(),
        }),
    )
}

proptest! {
    /// Property: enforcement is exactly "allowed and not denied"
    #[test]
    fn proptest_matches_is_allow_and_not_deny(
        allow in prop::collection::vec(arb_pattern(), 0..4),
        deny in prop::collection::vec(arb_pattern(), 0..4),
        action in arb_action()
    ) {
        let matcher = ActionMatcher::new(&allow, &deny);
        let allow_hit = allow.is_empty() || allow.iter().any(|p| pattern_matches(p, &action));
        let deny_hit = deny.iter().any(|p| pattern_matches(p, &action));

        prop_assert_eq!(matcher.matches(&action), allow_hit && !deny_hit);
    }

    /// Property: pattern order never changes the decision
    #[test]
    fn proptest_pattern_order_is_irrelevant(
        allow in prop::collection::vec(arb_pattern(), 0..4),
        deny in prop::collection::vec(arb_pattern(), 0..4),
        action in arb_action()
    ) {
        let forward = ActionMatcher::new(&allow, &deny);
        let reversed = ActionMatcher::new(allow.iter().rev(), deny.iter().rev());

        prop_assert_eq!(forward.matches(&action), reversed.matches(&action));
    }

    /// Property: an action named in the deny list is never enforced
    #[test]
    fn proptest_deny_dominates_allow(
        allow in prop::collection::vec(arb_pattern(), 0..4),
        action in arb_action()
    ) {
        let matcher = ActionMatcher::new(&allow, [action.clone()]);
        prop_assert!(!matcher.matches(&action));
    }

    /// Property: a disabled gate lets every request through
    #[test]
    fn proptest_disabled_gate_always_proceeds(
        action in arb_action(),
        header in prop::option::of(arb_token()),
        param in prop::option::of(arb_token())
    ) {
        let gate = gate_with_token(CsrfConfig::new().enabled(false), "expected");

        let mut request = RequestContext::new("req-prop", action);
        if let Some(h) = header {
            request.add_header("X-CSRF-TOKEN", h);
        }
        if let Some(p) = param {
            request.add_param("api_csrf_token", p);
        }

        prop_assert_eq!(gate.check(&request), Outcome::Proceed);
    }

    /// Property: a request proceeds iff its header token equals the session token
    #[test]
    fn proptest_header_token_must_equal_session_token(
        expected in arb_token(),
        presented in arb_token()
    ) {
        let gate = gate_with_token(CsrfConfig::new(), &expected);
        let request = RequestContext::new("req-prop", "save")
            .with_header("X-Session-Id", "sid")
            .with_header("X-CSRF-TOKEN", presented.clone());

        let outcome = gate.check(&request);
        if presented == expected {
            prop_assert_eq!(outcome, Outcome::Proceed);
        } else {
            prop_assert_eq!(outcome, Outcome::Reject(CsrfErrorKind::CsrfTokenError));
        }
    }

    /// Property: token formatting never leaks the token
    #[test]
    fn proptest_token_never_leaks_in_output(secret_value in arb_token()) {
        let token = CsrfToken::new(secret_value.clone());

        let debug_output = format!("{:?}", token);
        let display_output = format!("{}", token);

        prop_assert_eq!(debug_output.as_str(), "[REDACTED]");
        prop_assert_eq!(display_output.as_str(), "[REDACTED]");
        prop_assert!(token.verify(&secret_value));
    }
}
