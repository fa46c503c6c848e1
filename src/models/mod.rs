pub mod config;
/// Data models for the delivery pipeline
pub mod email;
pub mod result;

// Re-export commonly used types
pub use config::*;
pub use email::*;
pub use result::*;
