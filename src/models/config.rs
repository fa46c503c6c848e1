/// Instance configuration models
use crate::constants::{
    DEFAULT_MAX_BATCH_SIZE, DEFAULT_MAX_CONCURRENCY, DEFAULT_MAX_RETRIES, MAX_BATCH_SIZE_CEILING,
    MAX_CONCURRENCY_CEILING, MAX_RETRIES_CEILING,
};
use crate::error::MailrelayError;
use crate::models::email::EmailAddress;
use crate::models::result::HealthStatus;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Process-wide delivery settings, immutable after construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySettings {
    pub api_key: String,
    pub default_from: EmailAddress,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// When enabled, the provider validates requests without delivering
    #[serde(default)]
    pub sandbox_mode: bool,
    #[serde(default)]
    pub bulk: BulkOptions,
    /// Logical template name to provider template id
    #[serde(default)]
    pub template_map: HashMap<String, String>,
    #[serde(default)]
    pub global_headers: HashMap<String, String>,
    #[serde(default)]
    pub global_categories: Vec<String>,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl RelaySettings {
    pub fn new(api_key: impl Into<String>, default_from: EmailAddress) -> Self {
        Self {
            api_key: api_key.into(),
            default_from,
            max_retries: DEFAULT_MAX_RETRIES,
            sandbox_mode: false,
            bulk: BulkOptions::default(),
            template_map: HashMap::new(),
            global_headers: HashMap::new(),
            global_categories: Vec::new(),
        }
    }

    /// Clamps every knob into its supported range
    pub fn normalize(mut self) -> Self {
        self.max_retries = self.max_retries.min(MAX_RETRIES_CEILING);
        self.bulk.max_batch_size = self.bulk.max_batch_size.clamp(1, MAX_BATCH_SIZE_CEILING);
        self.bulk.max_concurrency = self.bulk.max_concurrency.clamp(1, MAX_CONCURRENCY_CEILING);
        self
    }

    /// Validates the settings required before any send can be attempted
    pub fn validate(&self) -> Result<(), MailrelayError> {
        if self.api_key.trim().is_empty() {
            return Err(MailrelayError::Config(
                "API credential is not configured".to_string(),
            ));
        }

        if self.default_from.is_blank() {
            return Err(MailrelayError::Config(
                "Default sender address is not configured".to_string(),
            ));
        }

        Ok(())
    }

    /// Fills blank fields from a JSON-encoded settings document
    ///
    /// The overlay form is `{"ApiKey": ..., "DefaultFrom": {"Address": ...,
    /// "Name": ...}}`. Values already present on the local settings take
    /// precedence. Malformed JSON is a fatal configuration error.
    pub fn apply_json_overlay(mut self, json: &str) -> Result<Self, MailrelayError> {
        let overlay: JsonOverlay = serde_json::from_str(json)
            .map_err(|e| MailrelayError::Config(format!("Invalid settings JSON: {}", e)))?;

        if self.api_key.trim().is_empty() {
            if let Some(api_key) = overlay.api_key {
                self.api_key = api_key;
            }
        }

        if self.default_from.is_blank() {
            if let Some(from) = overlay.default_from {
                self.default_from = EmailAddress {
                    address: from.address,
                    name: from.name,
                };
            }
        }

        Ok(self)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JsonOverlay {
    api_key: Option<String>,
    default_from: Option<JsonAddress>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JsonAddress {
    address: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkOptions {
    /// Recipients per shared-template batch request
    pub max_batch_size: usize,
    /// Worker width for personalized bulk sends
    pub max_concurrency: usize,
}

impl Default for BulkOptions {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// Options for the health checker
#[derive(Debug, Clone)]
pub struct HealthCheckOptions {
    /// How long a healthy probe result stays cached; `None` or zero disables
    /// caching entirely
    pub cache_duration: Option<Duration>,
    /// When disabled, a passing configuration check reports healthy without
    /// a network call
    pub connectivity_test: bool,
    /// Recipient for the connectivity test message
    pub test_address: Option<EmailAddress>,
    /// Whether this process runs in a production environment
    pub production: bool,
    /// Severity reported when the provider rejects the test message
    pub failure_status: HealthStatus,
}

impl Default for HealthCheckOptions {
    fn default() -> Self {
        Self {
            cache_duration: Some(Duration::from_secs(300)),
            connectivity_test: false,
            test_address: None,
            production: false,
            failure_status: HealthStatus::Unhealthy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> RelaySettings {
        RelaySettings::new("SG.key", EmailAddress::new("no-reply@co.com"))
    }

    #[test]
    fn test_normalize_clamps_knobs() {
        let mut s = settings();
        s.max_retries = 99;
        s.bulk.max_batch_size = 5000;
        s.bulk.max_concurrency = 0;

        let s = s.normalize();
        assert_eq!(s.max_retries, 10);
        assert_eq!(s.bulk.max_batch_size, 1000);
        assert_eq!(s.bulk.max_concurrency, 1);
    }

    #[test]
    fn test_normalize_keeps_in_range_values() {
        let s = settings().normalize();
        assert_eq!(s.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(s.bulk.max_batch_size, DEFAULT_MAX_BATCH_SIZE);
        assert_eq!(s.bulk.max_concurrency, DEFAULT_MAX_CONCURRENCY);
    }

    #[test]
    fn test_validate_requires_credential_and_sender() {
        assert!(settings().validate().is_ok());

        let mut s = settings();
        s.api_key = "  ".to_string();
        assert!(s.validate().is_err());

        let mut s = settings();
        s.default_from = EmailAddress::default();
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_json_overlay_fills_blank_fields() {
        let s = RelaySettings::new("", EmailAddress::default())
            .apply_json_overlay(
                r#"{"ApiKey": "SG.overlay", "DefaultFrom": {"Address": "ops@co.com", "Name": "Ops"}}"#,
            )
            .unwrap();

        assert_eq!(s.api_key, "SG.overlay");
        assert_eq!(s.default_from.address, "ops@co.com");
        assert_eq!(s.default_from.name.as_deref(), Some("Ops"));
    }

    #[test]
    fn test_json_overlay_local_settings_win() {
        let s = settings()
            .apply_json_overlay(r#"{"ApiKey": "SG.other", "DefaultFrom": {"Address": "x@y.com"}}"#)
            .unwrap();

        assert_eq!(s.api_key, "SG.key");
        assert_eq!(s.default_from.address, "no-reply@co.com");
    }

    #[test]
    fn test_json_overlay_rejects_malformed_json() {
        let err = settings().apply_json_overlay("{not json").unwrap_err();
        assert!(matches!(err, MailrelayError::Config(_)));
    }
}
