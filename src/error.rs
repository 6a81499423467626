//! Rejection kinds, their localized messages, and the reporter that renders them.

use std::collections::HashMap;
use std::fmt;
use std::sync::{RwLock, RwLockReadGuard};

/// Error group under which the gate registers its rejection kinds.
pub const ERROR_GROUP: &str = "csrf";

/// Locale used when a reporter has no message for the requested one.
pub const DEFAULT_LOCALE: &str = "en_us";

/// Why the gate rejected a request.
///
/// Token-level failures are deliberately collapsed into
/// [`CsrfTokenError`](CsrfErrorKind::CsrfTokenError) so a caller cannot tell a
/// missing session value from a wrong token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CsrfErrorKind {
    /// The session store could not be acquired at initialization.
    SessionInitFailed,
    /// The request's session could not be resolved.
    SessionGetFailed,
    /// The expected or presented token is missing, malformed, or wrong.
    CsrfTokenError,
}

impl CsrfErrorKind {
    /// All kinds, in code order.
    pub const ALL: [CsrfErrorKind; 3] = [
        CsrfErrorKind::SessionInitFailed,
        CsrfErrorKind::SessionGetFailed,
        CsrfErrorKind::CsrfTokenError,
    ];

    /// Stable numeric code within the `csrf` group.
    pub fn code(self) -> u32 {
        match self {
            CsrfErrorKind::SessionInitFailed => 0,
            CsrfErrorKind::SessionGetFailed => 1,
            CsrfErrorKind::CsrfTokenError => 2,
        }
    }

    /// Stable error name.
    pub fn name(self) -> &'static str {
        match self {
            CsrfErrorKind::SessionInitFailed => "SessionInitFailed",
            CsrfErrorKind::SessionGetFailed => "SessionGetFailed",
            CsrfErrorKind::CsrfTokenError => "CSRFTokenError",
        }
    }

    /// Built-in definition with localized messages.
    pub fn define(self) -> ErrorDefine {
        let (en_us, zh_cn) = match self {
            CsrfErrorKind::SessionInitFailed => ("Session init failed!", "会话初始化失败！"),
            CsrfErrorKind::SessionGetFailed => ("Failed to get session!", "会话获取失败！"),
            CsrfErrorKind::CsrfTokenError => ("CSRF token error!", "CSRF验证失败！"),
        };

        ErrorDefine::new(self)
            .message("en_us", en_us)
            .message("zh_cn", zh_cn)
    }

    /// Definitions for every kind, as registered by the gate.
    pub fn defines() -> Vec<ErrorDefine> {
        Self::ALL.iter().map(|k| k.define()).collect()
    }
}

impl fmt::Display for CsrfErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Definition of one error kind: its identity plus messages per locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDefine {
    /// The kind being defined
    pub kind: CsrfErrorKind,
    /// Locale (e.g. `en_us`) to message
    pub messages: HashMap<String, String>,
}

impl ErrorDefine {
    /// Creates a definition with no messages.
    pub fn new(kind: CsrfErrorKind) -> Self {
        Self {
            kind,
            messages: HashMap::new(),
        }
    }

    /// Adds a message for `locale`.
    pub fn message(mut self, locale: impl Into<String>, text: impl Into<String>) -> Self {
        self.messages.insert(locale.into(), text.into());
        self
    }

    /// Returns the message for `locale`, falling back to [`DEFAULT_LOCALE`].
    pub fn message_for(&self, locale: &str) -> Option<&str> {
        self.messages
            .get(locale)
            .or_else(|| self.messages.get(DEFAULT_LOCALE))
            .map(String::as_str)
    }
}

/// A rejection rendered by an [`ErrorReporter`], ready to be written as a
/// response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{group}.{name} ({code}): {message}")]
pub struct RenderedError {
    /// Error group, always `csrf` for rejections from the gate
    pub group: String,
    /// The rejection kind
    pub kind: CsrfErrorKind,
    /// Stable error name
    pub name: String,
    /// Stable numeric code
    pub code: u32,
    /// Localized message
    pub message: String,
}

/// Host-side error reporting used to render rejections.
pub trait ErrorReporter: Send + Sync {
    /// Registers the definitions of an error group.
    fn register_kinds(&self, group: &str, kinds: &[ErrorDefine]);

    /// Renders an error of `kind` within `group`.
    fn new_error(&self, group: &str, kind: CsrfErrorKind) -> RenderedError;
}

/// In-memory [`ErrorReporter`] rendering messages in a fixed locale.
///
/// # Examples
///
/// ```
/// use csrf_gate::{CsrfErrorKind, ErrorCatalog, ErrorReporter, ERROR_GROUP};
///
/// let catalog = ErrorCatalog::with_locale("zh_cn");
/// catalog.register_kinds(ERROR_GROUP, &CsrfErrorKind::defines());
///
/// let err = catalog.new_error(ERROR_GROUP, CsrfErrorKind::CsrfTokenError);
/// assert_eq!(err.name, "CSRFTokenError");
/// assert_eq!(err.message, "CSRF验证失败！");
/// ```
#[derive(Debug)]
pub struct ErrorCatalog {
    locale: String,
    groups: RwLock<HashMap<String, Vec<ErrorDefine>>>,
}

impl ErrorCatalog {
    /// Creates an empty catalog rendering in [`DEFAULT_LOCALE`].
    pub fn new() -> Self {
        Self::with_locale(DEFAULT_LOCALE)
    }

    /// Creates an empty catalog rendering in `locale`.
    pub fn with_locale(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            groups: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the rendering locale.
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Returns true if `group` has been registered.
    pub fn is_registered(&self, group: &str) -> bool {
        self.read().contains_key(group)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Vec<ErrorDefine>>> {
        self.groups.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lookup(&self, group: &str, kind: CsrfErrorKind) -> Option<ErrorDefine> {
        self.read()
            .get(group)?
            .iter()
            .find(|d| d.kind == kind)
            .cloned()
    }
}

impl Default for ErrorCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorReporter for ErrorCatalog {
    fn register_kinds(&self, group: &str, kinds: &[ErrorDefine]) {
        self.groups
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(group.to_string(), kinds.to_vec());
    }

    fn new_error(&self, group: &str, kind: CsrfErrorKind) -> RenderedError {
        let define = self.lookup(group, kind).unwrap_or_else(|| kind.define());
        let message = define
            .message_for(&self.locale)
            .unwrap_or(kind.name())
            .to_string();

        RenderedError {
            group: group.to_string(),
            kind,
            name: kind.name().to_string(),
            code: kind.code(),
            message,
        }
    }
}

/// Errors returned when resolving a request's session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// No session with this name exists for the request
    #[error("session '{0}' not found")]
    NotFound(String),
    /// The session exists but has expired
    #[error("session '{0}' expired")]
    Expired(String),
    /// The store failed while loading the session
    #[error("session backend error: {0}")]
    Backend(String),
}

/// Errors returned when acquiring the session store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The host could not provide a session store
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable deserialization failed
    #[error("configuration error: {0}")]
    Env(#[from] envy::Error),
    /// An env file could not be read or parsed
    #[error("env file error: {0}")]
    Dotenv(#[from] dotenvy::Error),
}
