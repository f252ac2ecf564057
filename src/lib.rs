//! Outbound request pipeline for payment-provider integrations.
//!
//! Build an [`HttpRequest`], then execute it through an [`HttpClient`]:
//! `execute_raw` returns the body bytes, `execute_json` decodes them, and
//! `execute_json_with_retries` replays transient failures. Every failure is a
//! [`ClassifiedError`].

pub mod config;
pub mod error;
pub mod http;
pub mod provider;

pub use config::ClientConfig;
pub use error::{ClassifiedError, ErrorCatalog, ErrorCode, panic_if_necessary};
pub use http::{CallContext, CancelHandle, ContentType, HttpClient, HttpRequest};
