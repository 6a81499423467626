//! Session-bound CSRF protection for HTTP request pipelines.
//!
//! The gate sits between the server and application handlers. For every
//! request it decides:
//! - **Whether** the request's action needs a token, from allow/deny lists
//! - **What** token is expected, read from the caller's session
//! - **Whether** the presented token (header, else `api_csrf_token`
//!   parameter) matches
//!
//! # Core Types
//!
//! - [`CsrfGate`]: The enforcement gate; [`CsrfGate::check`] yields an [`Outcome`]
//! - [`ActionMatcher`]: Allow/deny action matching with deny precedence
//! - [`CsrfConfig`]: Gate settings with defaults and `APICSRF_*` env loading
//! - [`RequestContext`]: Framework-neutral view of an inbound request
//! - [`SessionStore`] / [`GateHost`]: Collaborators provided by the application
//! - [`CsrfErrorKind`] / [`ErrorReporter`]: Rejection kinds and their rendering
//!
//! # Examples
//!
//! ```
//! use csrf_gate::{ActionMatcher, RequestContext, presented_token};
//!
//! // Everything is protected except health checks
//! let matcher = ActionMatcher::new(["*"], ["health"]);
//! assert!(matcher.matches("order.create"));
//! assert!(!matcher.matches("health"));
//!
//! // The header wins over the parameter
//! let request = RequestContext::new("req-1", "order.create")
//!     .with_param("api_csrf_token", "t1");
//! assert_eq!(presented_token(&request, "X-CSRF-TOKEN"), "t1");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod gate;
mod matcher;
mod request;
mod session;
mod token;

pub use config::{load_dotenv, load_dotenv_from, CsrfConfig, SessionStoreKey, ENV_PREFIX};
pub use error::{
    ConfigError, CsrfErrorKind, ErrorCatalog, ErrorDefine, ErrorReporter, RenderedError,
    SessionError, StoreError, DEFAULT_LOCALE, ERROR_GROUP,
};
pub use gate::{CsrfGate, Outcome};
pub use matcher::{ActionMatcher, Pattern};
pub use request::{presented_token, RequestContext, TOKEN_PARAM};
pub use session::{GateHost, MemorySessionStore, Session, SessionStore, SessionValue};
pub use token::CsrfToken;
