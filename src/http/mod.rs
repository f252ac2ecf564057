//! Outbound HTTP pipeline: request descriptors, body encoding, execution with
//! classified errors, and bounded retries.

mod body;
mod client;
mod context;
mod request;
mod retry;

pub use body::{decode_json, encode_body};
pub use client::{DEFAULT_TIMEOUT, HttpClient};
pub use context::{CallContext, CancelHandle, ContextError};
pub use request::{AUTHORIZATION_TOKEN_PREFIX, ContentType, Credentials, HttpRequest};
pub use retry::{DEFAULT_RETRIES, with_retries};
