/// Exponential backoff retry around provider send attempts
use crate::constants::{BACKOFF_EXPONENT_CAP, RETRY_JITTER_MAX_MS, RETRY_JITTER_MIN_MS};
use crate::error::MailrelayError;
use crate::services::transport::WireResponse;
use crate::utils::logging::redact_email;
use http::StatusCode;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, warn};

/// Statuses worth another attempt: rate limiting and server-side failures
fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Backoff before attempt `attempt + 1`: `2^min(attempt, 6)` seconds plus a
/// uniform jitter so concurrent callers don't retry in lockstep
fn backoff_delay(attempt: u32) -> Duration {
    let base_secs = 1u64 << attempt.min(BACKOFF_EXPONENT_CAP);
    let jitter_ms = rand::thread_rng().gen_range(RETRY_JITTER_MIN_MS..RETRY_JITTER_MAX_MS);
    Duration::from_secs(base_secs) + Duration::from_millis(jitter_ms)
}

/// Drives one send attempt through up to `max_retries` additional tries
///
/// Retries on a 429/5xx response (honoring a `Retry-After` hint when the
/// provider supplies one) and on retriable transport errors. The retry
/// budget only bounds attempts: a still-retryable response on the final
/// attempt is returned as-is, and a final transport error propagates to the
/// caller.
pub async fn send_with_retry<F, Fut>(
    mut attempt: F,
    max_retries: u32,
    target: &str,
) -> Result<WireResponse, MailrelayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<WireResponse, MailrelayError>>,
{
    let mut index = 0u32;

    loop {
        match attempt().await {
            Ok(response) => {
                if is_retryable_status(response.status) && index < max_retries {
                    let delay = response
                        .retry_after()
                        .unwrap_or_else(|| backoff_delay(index));
                    warn!(
                        target = %redact_email(target),
                        status = response.status.as_u16(),
                        attempt = index,
                        max_retries = max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Retryable provider status, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    index += 1;
                    continue;
                }

                if index > 0 && response.is_success() {
                    debug!(
                        target = %redact_email(target),
                        attempt = index,
                        "Send succeeded after retry"
                    );
                }
                return Ok(response);
            }
            Err(e) if e.is_retriable() && index < max_retries => {
                let delay = backoff_delay(index);
                warn!(
                    target = %redact_email(target),
                    attempt = index,
                    max_retries = max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transport error, backing off"
                );
                tokio::time::sleep(delay).await;
                index += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
