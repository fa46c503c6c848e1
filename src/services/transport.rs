/// Provider transport boundary
///
/// The wrapped provider SDK is opaque to the pipeline: one wire message in,
/// one status + headers + body out. Keeping the surface this narrow isolates
/// the retry and mapping logic from the concrete vendor client and makes it
/// substitutable with a test double.
use crate::constants::MESSAGE_ID_HEADER;
use crate::email::wire::WireMessage;
use crate::error::MailrelayError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use http::{HeaderMap, StatusCode, header};
use std::time::Duration;

#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Performs exactly one delivery attempt against the provider API
    async fn send(&self, message: &WireMessage) -> Result<WireResponse, MailrelayError>;
}

/// Raw provider response
#[derive(Debug, Clone)]
pub struct WireResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl WireResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<String>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Provider-assigned message id from the `X-Message-Id` header
    pub fn message_id(&self) -> Option<String> {
        self.headers
            .get(MESSAGE_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string())
    }

    /// Parses the `Retry-After` hint as delay seconds or as an HTTP-date
    ///
    /// An absolute timestamp already in the past yields a zero delay.
    pub fn retry_after(&self) -> Option<Duration> {
        let value = self
            .headers
            .get(header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())?
            .trim();

        if let Ok(seconds) = value.parse::<u64>() {
            return Some(Duration::from_secs(seconds));
        }

        let when: DateTime<Utc> = DateTime::parse_from_rfc2822(value).ok()?.to_utc();
        Some((when - Utc::now()).to_std().unwrap_or(Duration::ZERO))
    }
}
