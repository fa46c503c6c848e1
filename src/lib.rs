// Library root - exports public API

pub mod constants;
pub mod email;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use error::MailrelayError;
pub use models::{
    Attachment, BulkOptions, EmailAddress, EmailMessage, EmailResponse, EmailResult,
    HealthCheckOptions, HealthCheckResult, HealthStatus, Priority, RelaySettings,
};
pub use services::health::HealthChecker;
pub use services::sender::{EmailSender, RelayMailer};
pub use services::transport::{MailTransport, WireResponse};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
