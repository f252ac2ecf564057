//! Bounded retry of transient failures.

use log::debug;

use super::context::CallContext;
use crate::error::ClassifiedError;

/// Retry budget used when a caller does not pick one.
pub const DEFAULT_RETRIES: usize = 2;

/// Runs `operation` up to `retries + 1` times.
///
/// Returns on the first success, or immediately on a failure whose code is
/// not transient. Transient failures are replayed without delay. When the
/// budget is exhausted, or the context is done before the next attempt, the
/// last error is returned.
pub async fn with_retries<F, Fut, T>(
    ctx: &CallContext,
    operation_name: &str,
    retries: usize,
    mut operation: F,
) -> Result<T, ClassifiedError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClassifiedError>>,
{
    let attempts = retries.saturating_add(1);
    let mut attempt = 1;

    loop {
        let err = match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        if !err.is_transient() {
            debug!("{}: non-retryable error: {}", operation_name, err);
            return Err(err);
        }

        if attempt >= attempts {
            debug!(
                "{}: giving up after {} attempts ({})",
                operation_name, attempts, err
            );
            return Err(err);
        }

        if let Some(reason) = ctx.err() {
            debug!("{}: {} before attempt {}", operation_name, reason, attempt + 1);
            return Err(err);
        }

        debug!(
            "{}: attempt {}/{} failed ({}), retrying...",
            operation_name, attempt, attempts, err
        );
        attempt += 1;
    }
}
