//! The expected CSRF token and its constant-time comparison.

use std::fmt;

use subtle::ConstantTimeEq;

/// The expected CSRF token read from a session.
///
/// Debug and Display output is always `[REDACTED]`, so the token can flow
/// through tracing fields and error chains without leaking. The raw value is
/// only reachable through [`expose_secret`](Self::expose_secret).
///
/// # Examples
///
/// ```
/// use csrf_gate::CsrfToken;
///
/// let token = CsrfToken::new("abc123");
///
/// assert_eq!(format!("{:?}", token), "[REDACTED]");
/// assert!(token.verify("abc123"));
/// assert!(!token.verify("abc124"));
/// ```
// Do NOT derive Clone or Debug: both would make duplicating or printing the
// raw value too easy.
pub struct CsrfToken {
    inner: String,
}

impl CsrfToken {
    /// Wraps a token value.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: value.into(),
        }
    }

    /// Returns the raw token value.
    pub fn expose_secret(&self) -> &str {
        &self.inner
    }

    /// Compares `presented` against this token.
    ///
    /// Equality is exact. For equal-length inputs the running time does not
    /// depend on where the first differing byte is.
    pub fn verify(&self, presented: &str) -> bool {
        self.inner.as_bytes().ct_eq(presented.as_bytes()).into()
    }
}

impl fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for CsrfToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}
