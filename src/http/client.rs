//! HTTP client executing [`HttpRequest`]s with classified errors.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HOST, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;

use super::body::{decode_json, encode_body};
use super::context::CallContext;
use super::request::{AUTHORIZATION_TOKEN_PREFIX, Credentials, HttpRequest};
use super::retry::with_retries;
use crate::error::{ClassifiedError, ErrorCatalog, ErrorCode};

/// Timeout applied when a request does not set its own.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Outbound request pipeline over a shared reqwest connection pool.
///
/// Cloning is cheap and clones share the pool. The client keeps no per-call
/// state, so it can serve concurrent independent calls.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    default_timeout: Duration,
    catalog: Arc<ErrorCatalog>,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            default_timeout: DEFAULT_TIMEOUT,
            catalog: Arc::new(ErrorCatalog::default()),
        }
    }

    /// Sets the timeout used by requests that do not carry their own.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Replaces the catalog used to describe errors.
    pub fn with_catalog(mut self, catalog: ErrorCatalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    /// Returns a reference to the underlying reqwest Client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Catalog used to describe errors.
    pub fn catalog(&self) -> &ErrorCatalog {
        &self.catalog
    }

    /// Timeout used by requests that do not carry their own.
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Executes one attempt and returns the raw body of a 200 response.
    ///
    /// Any other status is a [`ErrorCode::ApiRequestStatusError`] carrying
    /// the verbatim response body as the `response` parameter. Cancellation
    /// or expiry of `ctx` aborts the in-flight call.
    #[tracing::instrument(skip(self, ctx, request), fields(method = %request.method(), endpoint = %request.endpoint()))]
    pub async fn execute_raw(
        &self,
        ctx: &CallContext,
        request: &HttpRequest,
    ) -> Result<Vec<u8>, ClassifiedError> {
        debug!("{} {}...", request.method(), request.endpoint());

        let wire = self.build(request)?;

        tokio::select! {
            result = self.send(wire, request) => result,
            reason = ctx.done() => Err(self
                .catalog
                .wrap(ErrorCode::ApiRequestError, reason)
                .with_param("request", request.render())),
        }
    }

    /// Executes one attempt and decodes the JSON body into `T`.
    #[tracing::instrument(skip(self, ctx, request), fields(method = %request.method(), endpoint = %request.endpoint()))]
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        request: &HttpRequest,
    ) -> Result<T, ClassifiedError> {
        let body = self.execute_raw(ctx, request).await?;
        decode_json(&body, request, &self.catalog)
    }

    /// Like [`execute_json`](Self::execute_json), replaying the request up to
    /// `retries` more times while it fails with a transient error.
    #[tracing::instrument(skip(self, ctx, request), fields(method = %request.method(), endpoint = %request.endpoint()))]
    pub async fn execute_json_with_retries<T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        request: &HttpRequest,
        retries: usize,
    ) -> Result<T, ClassifiedError> {
        with_retries(ctx, "execute_json", retries, move || {
            self.execute_json(ctx, request)
        })
        .await
    }

    /// Turns the descriptor into a wire request.
    fn build(&self, request: &HttpRequest) -> Result<reqwest::Request, ClassifiedError> {
        let body = encode_body(request, &self.catalog)?;

        let mut url = Url::parse(request.endpoint())
            .map_err(|e| self.classify(ErrorCode::ApiUrlParsingError, e, request))?;

        // Appended to whatever the endpoint already carries.
        if !request.query_params().is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in request.query_params() {
                pairs.append_pair(key, value);
            }
        }

        let method = Method::from_bytes(request.method().as_bytes())
            .map_err(|e| self.classify(ErrorCode::ApiRequestCreationError, e, request))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(request.content_type().as_str()),
        );

        if let Some(Credentials::Bearer(token)) = request.credentials() {
            if !token.is_empty() {
                let mut value =
                    self.header_value(&format!("{} {}", AUTHORIZATION_TOKEN_PREFIX, token), request)?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
        }

        if let Some(host) = request.host() {
            headers.insert(HOST, self.header_value(host, request)?);
        }

        for (key, value) in request.headers() {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| self.classify(ErrorCode::ApiRequestCreationError, e, request))?;
            headers.insert(name, self.header_value(value, request)?);
        }

        let timeout = if request.timeout().is_zero() {
            self.default_timeout
        } else {
            request.timeout()
        };

        let mut builder = self.client.request(method, url).timeout(timeout);

        if let Some(Credentials::Basic { username, password }) = request.credentials() {
            if !username.is_empty() && !password.is_empty() {
                builder = builder.basic_auth(username, Some(password));
            }
        }

        // Replaces per key, so custom headers win over everything above.
        builder = builder.headers(headers);

        if request.has_body() {
            builder = builder.body(body);
        }

        builder
            .build()
            .map_err(|e| self.classify(ErrorCode::ApiRequestCreationError, e, request))
    }

    /// Sends the wire request. The response is dropped on every return path.
    async fn send(
        &self,
        wire: reqwest::Request,
        request: &HttpRequest,
    ) -> Result<Vec<u8>, ClassifiedError> {
        let response = self
            .client
            .execute(wire)
            .await
            .map_err(|e| self.classify(ErrorCode::ApiRequestError, e, request))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(match response.bytes().await {
                Ok(body) => self.status_error(status, &body, request),
                Err(e) => self
                    .status_error(status, &[], request)
                    .with_param("response-read-error", e.to_string()),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.classify(ErrorCode::ApiRequestError, e, request))?;

        debug!("Received {} bytes from {}", body.len(), request.endpoint());

        Ok(body.to_vec())
    }

    fn status_error(&self, status: StatusCode, body: &[u8], request: &HttpRequest) -> ClassifiedError {
        let mut err = self
            .catalog
            .error(
                ErrorCode::ApiRequestStatusError,
                format!("unexpected response status {}", status),
            )
            .with_param("request", request.render())
            .with_param("status", status.as_u16().to_string())
            .with_param("response", String::from_utf8_lossy(body));

        // Best effort: error bodies are usually flat JSON objects.
        if let Ok(fields) = serde_json::from_slice::<serde_json::Map<String, serde_json::Value>>(body) {
            err = err.with_param("response-json", serde_json::Value::Object(fields).to_string());
        }

        err
    }

    fn header_value(&self, value: &str, request: &HttpRequest) -> Result<HeaderValue, ClassifiedError> {
        HeaderValue::from_str(value)
            .map_err(|e| self.classify(ErrorCode::ApiRequestCreationError, e, request))
    }

    fn classify<E>(&self, code: ErrorCode, cause: E, request: &HttpRequest) -> ClassifiedError
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.catalog
            .wrap(code, cause)
            .with_param("request", request.render())
    }
}
