//! Environment-based configuration loading.
//!
//! These tests mutate process environment variables, so they run serially.

use std::env;
use std::io::Write;

use csrf_gate::{load_dotenv_from, ActionMatcher, ConfigError, CsrfConfig};
use serial_test::serial;

const VARS: [&str; 5] = [
    "APICSRF_ENABLED",
    "APICSRF_HEADER_NAME",
    "APICSRF_SESSION_STORE_KEY",
    "APICSRF_ALLOW_ACTIONS",
    "APICSRF_DENY_ACTIONS",
];

fn clear_vars() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn from_env_without_variables_uses_defaults() {
    clear_vars();
    let config = CsrfConfig::from_env().expect("defaults should load");
    assert_eq!(config, CsrfConfig::default());
}

#[test]
#[serial]
fn from_env_reads_all_settings() {
    clear_vars();
    env::set_var("APICSRF_ENABLED", "true");
    env::set_var("APICSRF_HEADER_NAME", "X-XSRF-TOKEN");
    env::set_var("APICSRF_SESSION_STORE_KEY", "web.csrf");
    env::set_var("APICSRF_ALLOW_ACTIONS", "order.*,user.update");
    env::set_var("APICSRF_DENY_ACTIONS", "order.list");

    let config = CsrfConfig::from_env().expect("config should load");
    clear_vars();

    assert_eq!(config.header_name, "X-XSRF-TOKEN");
    assert_eq!(config.store_key().name, "web");
    assert_eq!(config.store_key().key, "csrf");

    let matcher = ActionMatcher::new(&config.allow_actions, &config.deny_actions);
    assert!(matcher.matches("order.create"));
    assert!(matcher.matches("user.update"));
    assert!(!matcher.matches("order.list"));
    assert!(!matcher.matches("user.delete"));
}

#[test]
#[serial]
fn from_env_rejects_malformed_switch() {
    clear_vars();
    env::set_var("APICSRF_ENABLED", "sometimes");

    let result = CsrfConfig::from_env();
    clear_vars();

    assert!(matches!(result, Err(ConfigError::Env(_))));
}

#[test]
#[serial]
fn from_env_trims_spaced_lists() {
    clear_vars();
    env::set_var("APICSRF_ALLOW_ACTIONS", "order.create, user.update");
    env::set_var("APICSRF_DENY_ACTIONS", "ping, health,");

    let config = CsrfConfig::from_env().expect("config should load");
    clear_vars();

    assert_eq!(config.allow_actions, vec!["order.create", "user.update"]);
    assert_eq!(config.deny_actions, vec!["ping", "health"]);

    let matcher = ActionMatcher::new(&config.allow_actions, &config.deny_actions);
    assert!(matcher.matches("user.update"));
    assert!(!matcher.matches("health"));
}

#[test]
#[serial]
fn dotenv_file_feeds_from_env() {
    clear_vars();
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "APICSRF_HEADER_NAME=X-XSRF-TOKEN").unwrap();
    writeln!(file, "APICSRF_DENY_ACTIONS=ping, health").unwrap();
    file.flush().unwrap();

    load_dotenv_from(file.path()).expect("env file should load");
    let config = CsrfConfig::from_env().expect("config should load");
    clear_vars();

    assert_eq!(config.header_name, "X-XSRF-TOKEN");
    assert_eq!(config.deny_actions, vec!["ping", "health"]);
}

#[test]
#[serial]
fn dotenv_file_does_not_override_environment() {
    clear_vars();
    env::set_var("APICSRF_HEADER_NAME", "X-From-Env");
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "APICSRF_HEADER_NAME=X-From-File").unwrap();
    file.flush().unwrap();

    load_dotenv_from(file.path()).expect("env file should load");
    let config = CsrfConfig::from_env().expect("config should load");
    clear_vars();

    assert_eq!(config.header_name, "X-From-Env");
}

#[test]
fn missing_dotenv_file_is_an_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let result = load_dotenv_from(dir.path().join("absent.env"));
    assert!(matches!(result, Err(ConfigError::Dotenv(_))));
}
