/// Delivery outcome models
use crate::constants::PROVIDER_NAME;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-recipient delivery outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailResult {
    pub email_address: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub validation_errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Provider-suggested wait before retrying, from `Retry-After`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<Duration>,
    pub provider: String,
}

impl EmailResult {
    pub fn success(email_address: impl Into<String>, message_id: Option<String>) -> Self {
        Self {
            email_address: email_address.into(),
            success: true,
            message_id,
            error_message: None,
            validation_errors: Vec::new(),
            status_code: None,
            retry_after: None,
            provider: PROVIDER_NAME.to_string(),
        }
    }

    pub fn failure(email_address: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            email_address: email_address.into(),
            success: false,
            message_id: None,
            error_message: Some(error_message.into()),
            validation_errors: Vec::new(),
            status_code: None,
            retry_after: None,
            provider: PROVIDER_NAME.to_string(),
        }
    }

    pub fn invalid(email_address: impl Into<String>, validation_errors: Vec<String>) -> Self {
        Self {
            email_address: email_address.into(),
            success: false,
            message_id: None,
            error_message: None,
            validation_errors,
            status_code: None,
            retry_after: None,
            provider: PROVIDER_NAME.to_string(),
        }
    }
}

/// Aggregate bulk outcome
///
/// Invariant: `sent_count + failed_count == results.len()`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EmailResponse {
    pub sent_count: usize,
    pub failed_count: usize,
    pub results: Vec<EmailResult>,
}

impl EmailResponse {
    pub fn from_results(results: Vec<EmailResult>) -> Self {
        let sent_count = results.iter().filter(|r| r.success).count();
        Self {
            sent_count,
            failed_count: results.len() - sent_count,
            results,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Outcome of a health probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthCheckResult {
    pub fn healthy(description: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Healthy,
            description: description.into(),
            error: None,
        }
    }

    pub fn degraded(description: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Degraded,
            description: description.into(),
            error: None,
        }
    }

    pub fn unhealthy(description: impl Into<String>, error: Option<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            description: description.into(),
            error,
        }
    }

    pub fn with_status(status: HealthStatus, description: impl Into<String>) -> Self {
        Self {
            status,
            description: description.into(),
            error: None,
        }
    }
}
