/// Provider health probe with a TTL cache and single-flight de-duplication
use crate::constants::{FAILURE_CACHE_FLOOR_SECS, HEALTH_CACHE_JITTER_MAX_SECS};
use crate::error::MailrelayError;
use crate::models::{
    EmailMessage, HealthCheckOptions, HealthCheckResult, HealthStatus, Priority,
};
use crate::services::sender::RelayMailer;
use crate::utils::validation::is_valid_email;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

struct CacheEntry {
    result: HealthCheckResult,
    expires_at: Instant,
}

/// Health checker for one mailer instance
///
/// Probes are expensive (they can send a real test message), so results are
/// cached with asymmetric TTLs: failures expire sooner than successes, and
/// a jitter keeps a fleet of instances from re-probing in lockstep. A
/// single-flight lock guarantees at most one in-flight probe per instance
/// regardless of concurrent callers.
pub struct HealthChecker {
    name: String,
    mailer: Arc<RelayMailer>,
    options: HealthCheckOptions,
    cache: Mutex<Option<CacheEntry>>,
    probe_lock: Mutex<()>,
}

impl HealthChecker {
    pub fn new(name: impl Into<String>, mailer: Arc<RelayMailer>, options: HealthCheckOptions) -> Self {
        Self {
            name: name.into(),
            mailer,
            options,
            cache: Mutex::new(None),
            probe_lock: Mutex::new(()),
        }
    }

    pub async fn check_health(&self) -> HealthCheckResult {
        let Some(cache_duration) = self.options.cache_duration.filter(|d| !d.is_zero()) else {
            return self.run_probe().await;
        };

        if let Some(result) = self.cached().await {
            return result;
        }

        // Single flight: only one caller probes; the lock is released on
        // every exit path by the guard
        let _guard = self.probe_lock.lock().await;

        // Another caller may have populated the cache while we waited
        if let Some(result) = self.cached().await {
            debug!(instance = %self.name, "Health cache populated while waiting for probe lock");
            return result;
        }

        let result = self.run_probe().await;

        let base_ttl = if result.status == HealthStatus::Healthy {
            cache_duration
        } else {
            failure_cache_duration(cache_duration)
        };
        let ttl = base_ttl + cache_jitter();

        let mut cache = self.cache.lock().await;
        *cache = Some(CacheEntry {
            result: result.clone(),
            expires_at: Instant::now() + ttl,
        });
        debug!(
            instance = %self.name,
            status = ?result.status,
            ttl_secs = ttl.as_secs(),
            "Cached health result"
        );

        result
    }

    async fn cached(&self) -> Option<HealthCheckResult> {
        let cache = self.cache.lock().await;
        cache
            .as_ref()
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.result.clone())
    }

    async fn run_probe(&self) -> HealthCheckResult {
        if let Some(result) = self.check_configuration() {
            warn!(
                instance = %self.name,
                status = ?result.status,
                description = %result.description,
                "Health configuration check failed"
            );
            return result;
        }

        if !self.options.connectivity_test {
            return HealthCheckResult::healthy("Configuration valid, connectivity test disabled");
        }

        self.check_connectivity().await
    }

    /// Pure configuration check; any issue short-circuits without a network
    /// call
    fn check_configuration(&self) -> Option<HealthCheckResult> {
        let settings = self.mailer.settings();

        if settings.api_key.trim().is_empty() {
            return Some(HealthCheckResult::unhealthy(
                "API credential is not configured",
                None,
            ));
        }

        match &self.options.test_address {
            Some(addr) if is_valid_email(&addr.address) => {}
            Some(addr) => {
                return Some(HealthCheckResult::unhealthy(
                    format!("Test address '{}' is not a valid email address", addr.address),
                    None,
                ));
            }
            None => {
                return Some(HealthCheckResult::unhealthy(
                    "No test address configured",
                    None,
                ));
            }
        }

        if settings.sandbox_mode && self.options.production {
            return Some(HealthCheckResult::degraded(
                "Sandbox mode is enabled in production, no mail is being delivered",
            ));
        }

        if !(1..=1000).contains(&settings.bulk.max_batch_size) {
            return Some(HealthCheckResult::unhealthy(
                format!(
                    "Batch size {} is outside the supported range 1..=1000",
                    settings.bulk.max_batch_size
                ),
                None,
            ));
        }

        None
    }

    /// Sends one real low-priority test message through the full single-send
    /// pipeline and classifies the outcome
    async fn check_connectivity(&self) -> HealthCheckResult {
        let Some(test_address) = self.options.test_address.clone() else {
            return HealthCheckResult::unhealthy("No test address configured", None);
        };

        let message = EmailMessage {
            to: vec![test_address],
            subject: Some(format!("Health check: {}", self.name)),
            text_content: Some("Connectivity probe".to_string()),
            priority: Priority::Low,
            ..Default::default()
        };

        match self.mailer.try_send(message).await {
            Ok(result) if result.success => {
                info!(instance = %self.name, "Connectivity probe delivered");
                HealthCheckResult::healthy("Test message accepted by provider")
            }
            Ok(result) if !result.validation_errors.is_empty() => HealthCheckResult::unhealthy(
                format!(
                    "Test message failed validation: {}",
                    result.validation_errors.join("; ")
                ),
                None,
            ),
            Ok(result) => HealthCheckResult::with_status(
                self.options.failure_status,
                format!(
                    "Provider rejected test message (status {})",
                    result
                        .status_code
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "unknown".to_string())
                ),
            ),
            // Network-level failures are a distinct, softer signal than a
            // provider rejection
            Err(MailrelayError::Transport(e)) => HealthCheckResult::degraded(format!(
                "Provider unreachable: {}",
                e
            )),
            Err(e) => HealthCheckResult::unhealthy(
                "Connectivity probe failed",
                Some(e.to_string()),
            ),
        }
    }
}

/// Failed probes re-run sooner than successful ones, but never more often
/// than the floor allows
fn failure_cache_duration(cache_duration: Duration) -> Duration {
    cache_duration.div_f64(2.0).max(Duration::from_secs(FAILURE_CACHE_FLOOR_SECS))
}

fn cache_jitter() -> Duration {
    Duration::from_millis(rand::thread_rng().gen_range(0..HEALTH_CACHE_JITTER_MAX_SECS * 1000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_cache_duration_floor() {
        assert_eq!(
            failure_cache_duration(Duration::from_secs(40)),
            Duration::from_secs(35)
        );
        assert_eq!(
            failure_cache_duration(Duration::from_secs(300)),
            Duration::from_secs(150)
        );
    }

    #[test]
    fn test_cache_jitter_bounds() {
        for _ in 0..50 {
            assert!(cache_jitter() < Duration::from_secs(HEALTH_CACHE_JITTER_MAX_SECS));
        }
    }
}
