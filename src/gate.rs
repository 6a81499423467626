//! The gate: one-time initialization, the enable switch, and the per-request check.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::{
    config::{CsrfConfig, SessionStoreKey},
    error::{CsrfErrorKind, RenderedError, ERROR_GROUP},
    matcher::ActionMatcher,
    request::{presented_token, RequestContext},
    session::{GateHost, SessionStore, SessionValue},
    token::CsrfToken,
};

/// Result of checking one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Hand the request to the next pipeline stage.
    Proceed,
    /// Stop here and answer with the given error.
    Reject(CsrfErrorKind),
}

impl Outcome {
    /// Returns true for [`Outcome::Proceed`].
    pub fn is_proceed(&self) -> bool {
        matches!(self, Outcome::Proceed)
    }

    /// Returns the rejection kind, if any.
    pub fn rejection(&self) -> Option<CsrfErrorKind> {
        match self {
            Outcome::Proceed => None,
            Outcome::Reject(kind) => Some(*kind),
        }
    }
}

/// State built once by the first initialization and reused afterwards.
struct GateState {
    header_name: String,
    store_key: SessionStoreKey,
    matcher: ActionMatcher,
    /// `None` when the host could not provide a store.
    store: Option<Arc<dyn SessionStore>>,
}

impl GateState {
    fn verify(&self, request: &RequestContext) -> Result<(), CsrfErrorKind> {
        let store = self
            .store
            .as_ref()
            .ok_or(CsrfErrorKind::SessionInitFailed)?;

        let session = store.get(request, &self.store_key.name).map_err(|err| {
            tracing::debug!(
                request_id = %request.request_id(),
                session = %self.store_key.name,
                error = %err,
                "session lookup failed"
            );
            CsrfErrorKind::SessionGetFailed
        })?;

        let expected = session
            .get(&self.store_key.key)
            .and_then(SessionValue::as_text)
            .map(CsrfToken::new)
            .ok_or(CsrfErrorKind::CsrfTokenError)?;

        if expected.verify(presented_token(request, &self.header_name)) {
            Ok(())
        } else {
            Err(CsrfErrorKind::CsrfTokenError)
        }
    }
}

/// The CSRF enforcement gate.
///
/// A gate is created once at startup, shared behind an `Arc`, and asked to
/// [`check`](Self::check) every request. Checking never mutates the gate;
/// only [`enable`](Self::enable) and [`disable`](Self::disable) do.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use csrf_gate::{
///     CsrfConfig, CsrfErrorKind, CsrfGate, ErrorCatalog, ErrorReporter, GateHost,
///     MemorySessionStore, Outcome, RequestContext, Session, SessionStore, StoreError,
/// };
///
/// struct App {
///     store: Arc<MemorySessionStore>,
///     errors: ErrorCatalog,
/// }
///
/// impl GateHost for App {
///     fn session_store(&self) -> Result<Arc<dyn SessionStore>, StoreError> {
///         let store: Arc<dyn SessionStore> = self.store.clone();
///         Ok(store)
///     }
///
///     fn error_reporter(&self) -> &dyn ErrorReporter {
///         &self.errors
///     }
/// }
///
/// let store = Arc::new(MemorySessionStore::new("X-Session-Id"));
/// store.put("sid-1", Session::new("default").with_value("csrf_token", "abc123"));
///
/// let app = Arc::new(App { store, errors: ErrorCatalog::new() });
/// let gate = CsrfGate::initialize(CsrfConfig::new().deny_actions(["ping"]), app);
///
/// let ok = RequestContext::new("req-1", "user.update")
///     .with_header("X-Session-Id", "sid-1")
///     .with_header("X-CSRF-TOKEN", "abc123");
/// assert_eq!(gate.check(&ok), Outcome::Proceed);
///
/// let forged = RequestContext::new("req-2", "user.update").with_header("X-Session-Id", "sid-1");
/// assert_eq!(gate.check(&forged), Outcome::Reject(CsrfErrorKind::CsrfTokenError));
///
/// let ping = RequestContext::new("req-3", "ping");
/// assert_eq!(gate.check(&ping), Outcome::Proceed);
/// ```
pub struct CsrfGate {
    host: Arc<dyn GateHost>,
    config: CsrfConfig,
    enabled: AtomicBool,
    state: OnceLock<GateState>,
    // Serializes enable/disable against each other.
    admin: Mutex<()>,
}

impl CsrfGate {
    /// Creates a gate from `config`.
    ///
    /// The gate's error kinds are registered with the host's reporter. When
    /// `config.enabled` is false nothing else happens: no store is acquired
    /// and no matcher is built until [`enable`](Self::enable) is called.
    ///
    /// Initialization never fails. If the host cannot provide a session
    /// store, the failure is logged and protected requests are rejected with
    /// [`CsrfErrorKind::SessionInitFailed`].
    pub fn initialize(config: CsrfConfig, host: Arc<dyn GateHost>) -> Self {
        host.error_reporter()
            .register_kinds(ERROR_GROUP, &CsrfErrorKind::defines());

        let gate = Self {
            host,
            config,
            enabled: AtomicBool::new(false),
            state: OnceLock::new(),
            admin: Mutex::new(()),
        };

        if gate.config.enabled {
            gate.init();
            gate.enabled.store(true, Ordering::Release);
        } else {
            tracing::info!("csrf gate created disabled");
        }

        gate
    }

    /// Builds the gate state on first call; later calls return the same state.
    fn init(&self) -> &GateState {
        self.state.get_or_init(|| {
            let store_key = self.config.store_key();
            let matcher = ActionMatcher::new(&self.config.allow_actions, &self.config.deny_actions);

            let store = match self.host.session_store() {
                Ok(store) => Some(store),
                Err(err) => {
                    tracing::error!(
                        error = %err,
                        "session store init failed, protected requests will be rejected"
                    );
                    None
                }
            };

            tracing::debug!(
                header = %self.config.header_name,
                session = %store_key.name,
                key = %store_key.key,
                "csrf gate initialized"
            );

            GateState {
                header_name: self.config.header_name.clone(),
                store_key,
                matcher,
                store,
            }
        })
    }

    /// Turns enforcement on, initializing the gate if it never was.
    ///
    /// Re-enabling an initialized gate reuses the state built the first
    /// time; configuration is not re-read.
    pub fn enable(&self) {
        let _guard = self.admin.lock().unwrap_or_else(PoisonError::into_inner);
        self.init();
        // State before flag: a reader that sees `enabled` must see the state.
        self.enabled.store(true, Ordering::Release);
        tracing::info!("csrf gate enabled");
    }

    /// Turns enforcement off. Store and matcher are kept for a later
    /// [`enable`](Self::enable).
    pub fn disable(&self) {
        let _guard = self.admin.lock().unwrap_or_else(PoisonError::into_inner);
        self.enabled.store(false, Ordering::Release);
        tracing::info!("csrf gate disabled");
    }

    /// Returns true if enforcement is on.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Returns true once the gate state has been built.
    pub fn is_initialized(&self) -> bool {
        self.state.get().is_some()
    }

    /// Returns the configuration the gate was created with.
    pub fn config(&self) -> &CsrfConfig {
        &self.config
    }

    /// Decides whether `request` may proceed.
    ///
    /// Steps, stopping at the first decisive one:
    /// 1. disabled gate, or empty session name: proceed
    /// 2. action exempt by the allow/deny lists: proceed
    /// 3. no session store: reject with `SessionInitFailed`
    /// 4. session not resolvable: reject with `SessionGetFailed`
    /// 5. expected token missing or not text: reject with `CsrfTokenError`
    /// 6. presented token (header, else `api_csrf_token` parameter) differs:
    ///    reject with `CsrfTokenError`
    pub fn check(&self, request: &RequestContext) -> Outcome {
        if !self.is_enabled() {
            return Outcome::Proceed;
        }

        let state = match self.state.get() {
            Some(state) if !state.store_key.name.is_empty() => state,
            _ => return Outcome::Proceed,
        };

        let action = request.action();
        if !state.matcher.matches(action) {
            tracing::debug!(request_id = %request.request_id(), action, "action exempt from csrf check");
            return Outcome::Proceed;
        }

        match state.verify(request) {
            Ok(()) => {
                tracing::debug!(request_id = %request.request_id(), action, "csrf check passed");
                Outcome::Proceed
            }
            Err(kind) => {
                tracing::warn!(
                    request_id = %request.request_id(),
                    action,
                    kind = %kind,
                    "csrf check rejected request"
                );
                Outcome::Reject(kind)
            }
        }
    }

    /// Runs `next` if `request` passes the check.
    ///
    /// # Errors
    ///
    /// Returns the rejection rendered by the host's error reporter. `next`
    /// is not called in that case.
    pub fn serve<F, R>(&self, request: &RequestContext, next: F) -> Result<R, RenderedError>
    where
        F: FnOnce(&RequestContext) -> R,
    {
        match self.check(request) {
            Outcome::Proceed => Ok(next(request)),
            Outcome::Reject(kind) => Err(self.host.error_reporter().new_error(ERROR_GROUP, kind)),
        }
    }
}

impl fmt::Debug for CsrfGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrfGate")
            .field("enabled", &self.is_enabled())
            .field("initialized", &self.is_initialized())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
