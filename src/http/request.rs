//! Description of a single outbound call.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

/// Scheme used in the `Authorization` header for token credentials.
pub const AUTHORIZATION_TOKEN_PREFIX: &str = "Bearer";

/// Encoding of the request body, sent as the `Content-Type` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentType {
    #[default]
    Json,
    FormUrlEncoded,
}

impl ContentType {
    /// MIME type sent in the `Content-Type` header.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::FormUrlEncoded => "application/x-www-form-urlencoded",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication attached to a request. Basic and bearer are mutually
/// exclusive; the last one set on a request wins.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Basic { username: String, password: String },
    Bearer(String),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Credentials::Bearer(_) => f.debug_tuple("Bearer").field(&"<redacted>").finish(),
        }
    }
}

/// Type-erased request body, encoded lazily when the request is executed.
pub(crate) trait RequestBody: Send + Sync {
    fn to_json(&self) -> serde_json::Result<Vec<u8>>;
    fn to_form(&self) -> Result<String, serde_qs::Error>;
    fn render(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl<T> RequestBody for T
where
    T: Serialize + fmt::Debug + Send + Sync,
{
    fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    fn to_form(&self) -> Result<String, serde_qs::Error> {
        serde_qs::to_string(self)
    }

    fn render(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

struct BodyDebug<'a>(&'a dyn RequestBody);

impl fmt::Debug for BodyDebug<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.render(f)
    }
}

/// An outbound HTTP call: endpoint, verb, body and everything that goes on
/// the wire with it.
///
/// Nothing is validated when fields are set; the
/// [`HttpClient`](super::HttpClient) reports malformed values when the
/// request is executed. A zero timeout means "use the client default".
///
/// ```
/// use paywire::http::{ContentType, HttpRequest};
///
/// let request = HttpRequest::new("https://api.example.com/charge", "POST")
///     .with_body(serde_json::json!({"amount": 100, "currency": "USD"}))
///     .with_bearer_auth("sk_test")
///     .with_content_type(ContentType::Json);
/// assert!(request.has_body());
/// ```
#[derive(Clone)]
pub struct HttpRequest {
    endpoint: String,
    method: String,
    body: Option<Arc<dyn RequestBody>>,
    query_params: BTreeMap<String, String>,
    credentials: Option<Credentials>,
    host: Option<String>,
    headers: BTreeMap<String, String>,
    content_type: ContentType,
    timeout: Duration,
}

impl HttpRequest {
    /// Creates a descriptor with a JSON content type and no timeout override.
    pub fn new(endpoint: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: method.into(),
            body: None,
            query_params: BTreeMap::new(),
            credentials: None,
            host: None,
            headers: BTreeMap::new(),
            content_type: ContentType::default(),
            timeout: Duration::ZERO,
        }
    }

    /// Sets the body. Any `Serialize + Debug` value works; it is encoded
    /// according to the content type at execution time.
    pub fn with_body<T>(mut self, body: T) -> Self
    where
        T: Serialize + fmt::Debug + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(body));
        self
    }

    /// Replaces all query parameters.
    pub fn with_query_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query_params = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Sets a single query parameter, replacing any previous value for `key`.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_query_param(key, value);
        self
    }

    /// Adds a query parameter in place.
    pub fn add_query_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.query_params.insert(key.into(), value.into());
    }

    /// Replaces all custom headers.
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers = headers
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Sets a single header, replacing any previous value for `key`.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_header(key, value);
        self
    }

    /// Adds a header in place.
    pub fn add_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(key.into(), value.into());
    }

    /// Uses HTTP basic authentication, replacing any bearer token.
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::Basic {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Uses `Authorization: Bearer <token>`, replacing any basic credentials.
    pub fn with_bearer_auth(mut self, token: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::Bearer(token.into()));
        self
    }

    /// Overrides the `Host` header sent on the wire.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets how the body is encoded on the wire.
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    /// Overrides the pipeline timeout for this request. Zero keeps the default.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Target URL as given, before query parameters are merged.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// HTTP verb as given.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Whether a body was set.
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    pub(crate) fn body(&self) -> Option<&dyn RequestBody> {
        self.body.as_deref()
    }

    /// Query parameters merged into the endpoint's query string.
    pub fn query_params(&self) -> &BTreeMap<String, String> {
        &self.query_params
    }

    /// Basic or bearer credentials, if any.
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Host header override.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Custom headers, applied after the computed ones.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Body encoding.
    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    /// Per-request timeout; zero means the client default applies.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Debug rendering attached to errors as the `request` diagnostic.
    pub fn render(&self) -> String {
        format!("{:?}", self)
    }
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("endpoint", &self.endpoint)
            .field("method", &self.method)
            .field("body", &self.body.as_deref().map(BodyDebug))
            .field("query_params", &self.query_params)
            .field("credentials", &self.credentials)
            .field("host", &self.host)
            .field("headers", &self.headers)
            .field("content_type", &self.content_type)
            .field("timeout", &self.timeout)
            .finish()
    }
}
