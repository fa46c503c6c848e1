/// Error types for the mailrelay delivery pipeline
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MailrelayError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Attachment stream error: {0}")]
    Stream(String),
}

impl MailrelayError {
    /// Determines if an error is retriable
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Validation(_) => false,
            Self::Config(_) => false,
            Self::Provider(_) => false,
            Self::Template(_) => false,
            Self::Stream(_) => false,
        }
    }
}

impl From<serde_json::Error> for MailrelayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}
