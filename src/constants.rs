/// Application constants
///
/// This module contains all hardcoded values used throughout the crate.
/// Constants are organized by category for easy maintenance.
// ============================================================================
// Provider Constants
// ============================================================================
/// Provider identifier stamped on every delivery result
pub const PROVIDER_NAME: &str = "sendgrid";

/// Response header carrying the provider-assigned message id
pub const MESSAGE_ID_HEADER: &str = "x-message-id";

// ============================================================================
// Retry Configuration
// ============================================================================

/// Default number of retries for transient failures
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Upper bound for the configurable retry count
pub const MAX_RETRIES_CEILING: u32 = 10;

/// Exponent cap for exponential backoff (2^6 = 64s maximum base delay)
pub const BACKOFF_EXPONENT_CAP: u32 = 6;

/// Lower bound of the uniform jitter added to each backoff delay
pub const RETRY_JITTER_MIN_MS: u64 = 250;

/// Upper bound (exclusive) of the uniform jitter added to each backoff delay
pub const RETRY_JITTER_MAX_MS: u64 = 1000;

// ============================================================================
// Bulk Dispatch Limits
// ============================================================================

/// Default recipients per shared-template batch
pub const DEFAULT_MAX_BATCH_SIZE: usize = 500;

/// Provider ceiling on personalizations per request
pub const MAX_BATCH_SIZE_CEILING: usize = 1000;

/// Default worker width for personalized bulk sends
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Upper bound for the configurable worker width
pub const MAX_CONCURRENCY_CEILING: usize = 50;

// ============================================================================
// Priority Headers
// ============================================================================

/// Headers applied to high-priority messages
pub const HIGH_PRIORITY_HEADERS: &[(&str, &str)] = &[
    ("X-Priority", "1"),
    ("X-MSMail-Priority", "High"),
    ("Importance", "High"),
];

/// Headers applied to low-priority messages
pub const LOW_PRIORITY_HEADERS: &[(&str, &str)] = &[
    ("X-Priority", "5"),
    ("X-MSMail-Priority", "Low"),
    ("Importance", "Low"),
];

/// Header carrying the caller-supplied idempotency key
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

// ============================================================================
// Health Check
// ============================================================================

/// Minimum time an unhealthy result stays cached, in seconds
pub const FAILURE_CACHE_FLOOR_SECS: u64 = 35;

/// Upper bound (exclusive) of the jitter added to health cache TTLs, in seconds
pub const HEALTH_CACHE_JITTER_MAX_SECS: u64 = 5;
