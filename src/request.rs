//! Read-only view of an inbound request.

use std::collections::HashMap;

/// Request parameter carrying the token when the header is absent.
///
/// This name is part of the external contract and is not configurable.
pub const TOKEN_PARAM: &str = "api_csrf_token";

/// What the gate needs to know about an inbound request.
///
/// `RequestContext` contains simple owned data so it does not couple the gate
/// to a specific framework. Framework integration code builds one per
/// request from its own request type.
///
/// Header names are matched case-insensitively; parameter names are
/// matched exactly.
///
/// # Examples
///
/// ```
/// use csrf_gate::RequestContext;
///
/// let mut request = RequestContext::new("req-1", "user.update");
/// request.add_header("X-CSRF-Token", "abc123");
/// request.add_param("name", "alice");
///
/// assert_eq!(request.action(), "user.update");
/// assert_eq!(request.header("x-csrf-token"), Some("abc123"));
/// assert_eq!(request.param("name"), Some("alice"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Unique request identifier, used for log correlation
    request_id: String,
    /// Logical action name the request targets
    action: String,
    /// Request headers, keyed by lower-cased name
    headers: HashMap<String, String>,
    /// Merged query and body parameters
    params: HashMap<String, String>,
}

impl RequestContext {
    /// Creates a context for `action` with no headers or parameters.
    pub fn new(request_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            action: action.into(),
            headers: HashMap::new(),
            params: HashMap::new(),
        }
    }

    /// Adds a header.
    ///
    /// A repeated header keeps its first value; later values with the same
    /// name (in any case) are ignored, matching what an HTTP header lookup
    /// returns for a multi-valued header.
    pub fn add_header(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.headers
            .entry(name.as_ref().to_ascii_lowercase())
            .or_insert_with(|| value.into());
    }

    /// Adds a query or body parameter.
    pub fn add_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.insert(name.into(), value.into());
    }

    /// Builder-style [`add_header`](Self::add_header).
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.add_header(name, value);
        self
    }

    /// Builder-style [`add_param`](Self::add_param).
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_param(name, value);
        self
    }

    /// Returns the request ID.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns the logical action name.
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Looks up a header by name, ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Looks up a query or body parameter by exact name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Number of headers.
    pub fn headers_count(&self) -> usize {
        self.headers.len()
    }

    /// Number of parameters.
    pub fn params_count(&self) -> usize {
        self.params.len()
    }
}

/// Extracts the token a request presents.
///
/// The header named `header_name` wins when it is present and non-empty;
/// otherwise the [`TOKEN_PARAM`] parameter is used. Returns `""` when
/// neither carries a value.
///
/// # Examples
///
/// ```
/// use csrf_gate::{presented_token, RequestContext};
///
/// let request = RequestContext::new("req-1", "save")
///     .with_header("X-CSRF-TOKEN", "from-header")
///     .with_param("api_csrf_token", "from-param");
///
/// assert_eq!(presented_token(&request, "X-CSRF-TOKEN"), "from-header");
/// ```
pub fn presented_token<'a>(request: &'a RequestContext, header_name: &str) -> &'a str {
    match request.header(header_name) {
        Some(value) if !value.is_empty() => value,
        _ => request.param(TOKEN_PARAM).unwrap_or(""),
    }
}
