//! Classified errors produced by the outbound request pipeline.
//!
//! Every failure is wrapped into a [`ClassifiedError`] carrying a fixed
//! [`ErrorCode`], the original cause, and diagnostic parameters (the rendered
//! request, the raw response body, ...). Nothing here logs; callers decide
//! what to emit.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Shared, type-erased cause of a classified error.
pub type ErrorSource = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Fixed taxonomy of failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorCode {
    /// Malformed caller input. Reserved for callers; the pipeline never produces it.
    RequestNotValid,
    /// The endpoint is not a valid URL.
    ApiUrlParsingError,
    /// The wire request could not be constructed (bad verb, bad header, ...).
    ApiRequestCreationError,
    /// Network-level failure, including timeouts and cancellation.
    ApiRequestError,
    /// The response status was not 200.
    ApiRequestStatusError,
    /// The request body could not be encoded as JSON.
    JsonSerializationError,
    /// The response body could not be decoded from JSON.
    JsonDeserializationError,
    /// The request body could not be encoded as URL-encoded form data.
    FormSerializationError,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 8] = [
        ErrorCode::RequestNotValid,
        ErrorCode::ApiUrlParsingError,
        ErrorCode::ApiRequestCreationError,
        ErrorCode::ApiRequestError,
        ErrorCode::ApiRequestStatusError,
        ErrorCode::JsonSerializationError,
        ErrorCode::JsonDeserializationError,
        ErrorCode::FormSerializationError,
    ];

    /// Stable wire/log identifier of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::RequestNotValid => "REQUEST_NOT_VALID",
            ErrorCode::ApiUrlParsingError => "API_URL_PARSING_ERROR",
            ErrorCode::ApiRequestCreationError => "API_REQUEST_CREATION_ERROR",
            ErrorCode::ApiRequestError => "API_REQUEST_ERROR",
            ErrorCode::ApiRequestStatusError => "API_REQUEST_STATUS_ERROR",
            ErrorCode::JsonSerializationError => "JSON_SERIALIZATION_ERROR",
            ErrorCode::JsonDeserializationError => "JSON_DESERIALIZATION_ERROR",
            ErrorCode::FormSerializationError => "FORM_SERIALIZATION_ERROR",
        }
    }

    /// Whether a failure of this kind may succeed when the call is replayed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ErrorCode::ApiRequestError | ErrorCode::ApiRequestStatusError
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable lookup table of human-readable descriptions per [`ErrorCode`].
///
/// Built once and owned by whoever constructs errors (usually the
/// [`HttpClient`](crate::http::HttpClient)).
#[derive(Debug, Clone)]
pub struct ErrorCatalog {
    entries: HashMap<ErrorCode, String>,
}

impl ErrorCatalog {
    /// Creates a catalog from explicit entries. Codes without an entry get an
    /// empty description.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (ErrorCode, S)>,
        S: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(code, info)| (code, info.into()))
                .collect(),
        }
    }

    /// Description registered for `code`, or `""`.
    pub fn info(&self, code: ErrorCode) -> &str {
        self.entries.get(&code).map(String::as_str).unwrap_or("")
    }

    /// Builds an error of kind `code` with the catalog's description attached.
    pub fn error(&self, code: ErrorCode, message: impl Into<String>) -> ClassifiedError {
        ClassifiedError {
            code,
            info: self.info(code).to_string(),
            message: message.into(),
            source: None,
            params: BTreeMap::new(),
        }
    }

    /// Wraps `cause` into an error of kind `code`, using its text as the message.
    pub fn wrap<E>(&self, code: ErrorCode, cause: E) -> ClassifiedError
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.error(code, cause.to_string()).with_source(cause)
    }
}

impl Default for ErrorCatalog {
    fn default() -> Self {
        Self::new([
            (ErrorCode::RequestNotValid, "The request is not valid"),
            (ErrorCode::ApiUrlParsingError, "The API endpoint is not a valid URL"),
            (
                ErrorCode::ApiRequestCreationError,
                "The API request could not be created",
            ),
            (ErrorCode::ApiRequestError, "The API request failed"),
            (
                ErrorCode::ApiRequestStatusError,
                "The API responded with an unexpected status",
            ),
            (
                ErrorCode::JsonSerializationError,
                "The request body could not be serialized to JSON",
            ),
            (
                ErrorCode::JsonDeserializationError,
                "The response body could not be deserialized from JSON",
            ),
            (
                ErrorCode::FormSerializationError,
                "The request body could not be serialized as form data",
            ),
        ])
    }
}

/// A failure tagged with an [`ErrorCode`], its cause and diagnostic parameters.
///
/// Values are immutable: [`with_param`](Self::with_param) and
/// [`with_source`](Self::with_source) consume the error and return an
/// augmented one.
#[derive(Clone)]
pub struct ClassifiedError {
    code: ErrorCode,
    info: String,
    message: String,
    source: Option<ErrorSource>,
    params: BTreeMap<String, String>,
}

impl ClassifiedError {
    /// Creates an error without a catalog description.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            info: String::new(),
            message: message.into(),
            source: None,
            params: BTreeMap::new(),
        }
    }

    /// Kind of failure.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Catalog description of the code, empty when built without a catalog.
    pub fn info(&self) -> &str {
        &self.info
    }

    /// Human-readable description of this particular failure.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Diagnostic parameters, ordered by key.
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Value of a single diagnostic parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Whether the retry driver may replay the call.
    pub fn is_transient(&self) -> bool {
        self.code.is_transient()
    }

    /// Returns a copy with `key` set to `value`. An existing value is replaced.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Returns a copy wrapping `cause` as the underlying error.
    pub fn with_source<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(cause));
        self
    }

    /// Looks for a cause of type `E` in the source chain.
    pub fn find_source<E: std::error::Error + 'static>(&self) -> Option<&E> {
        let mut current: Option<&(dyn std::error::Error + 'static)> = std::error::Error::source(self);
        while let Some(err) = current {
            if let Some(found) = err.downcast_ref::<E>() {
                return Some(found);
            }
            current = err.source();
        }
        None
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Code: {} | {}", self.code, self.message)
    }
}

impl fmt::Debug for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifiedError")
            .field("code", &self.code)
            .field("message", &self.message)
            .field("source", &self.source.as_ref().map(|s| s.to_string()))
            .field("params", &self.params)
            .finish()
    }
}

impl std::error::Error for ClassifiedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Escalates a failed result into a panic.
///
/// Meant for callers that treat an error as an unrecoverable program fault.
/// The pipeline itself never calls this.
pub fn panic_if_necessary<T, E: fmt::Display>(result: Result<T, E>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => panic!("{}", e),
    }
}
