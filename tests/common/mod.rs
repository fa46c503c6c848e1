/// Shared test fixtures
pub mod mock_transport;

use mailrelay::models::{EmailAddress, EmailMessage, RelaySettings};
use std::sync::Once;

static INIT: Once = Once::new();

/// Routes pipeline logs through the test writer; enable with RUST_LOG
fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn test_settings() -> RelaySettings {
    init_tracing();
    RelaySettings::new("SG.test-key", EmailAddress::with_name("no-reply@co.com", "Acme"))
}

/// Settings that fail fast: no retry budget for transient failures
pub fn no_retry_settings() -> RelaySettings {
    let mut settings = test_settings();
    settings.max_retries = 0;
    settings
}

pub fn text_message(to: &str) -> EmailMessage {
    EmailMessage {
        to: vec![EmailAddress::new(to)],
        subject: Some("Test Subject".to_string()),
        text_content: Some("This is a test email".to_string()),
        ..Default::default()
    }
}

pub fn recipients(count: usize) -> Vec<EmailAddress> {
    (0..count)
        .map(|i| EmailAddress::new(format!("user{}@example.com", i)))
        .collect()
}
