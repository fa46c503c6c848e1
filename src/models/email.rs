/// Email domain models
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncSeek};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EmailAddress {
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl EmailAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
        }
    }

    pub fn with_name(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: Some(name.into()),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.address.trim().is_empty()
    }
}

// Equality is by address only, case-insensitive
impl PartialEq for EmailAddress {
    fn eq(&self, other: &Self) -> bool {
        self.address.eq_ignore_ascii_case(&other.address)
    }
}

impl Eq for EmailAddress {}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

/// How an attachment is presented to the recipient
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    Inline,
    #[serde(rename = "attachment")]
    Attached,
}

impl Disposition {
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Attached => "attachment",
        }
    }
}

/// Readable, optionally seekable source for stream-backed attachments
pub trait AttachmentStream: AsyncRead + AsyncSeek + Send + Unpin {}

impl<T: AsyncRead + AsyncSeek + Send + Unpin> AttachmentStream for T {}

/// Attachment payload: in-memory bytes or a byte stream read at send time
#[derive(Clone)]
pub enum AttachmentContent {
    Bytes(Bytes),
    Stream(Arc<Mutex<Box<dyn AttachmentStream>>>),
}

impl std::fmt::Debug for AttachmentContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bytes(data) => write!(f, "Bytes({} bytes)", data.len()),
            Self::Stream(_) => write!(f, "Stream"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub disposition: Disposition,
    /// Content id referenced from HTML bodies, required for inline use
    pub content_id: Option<String>,
    pub content: AttachmentContent,
}

impl Attachment {
    pub fn from_bytes(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            disposition: Disposition::Attached,
            content_id: None,
            content: AttachmentContent::Bytes(data.into()),
        }
    }

    pub fn from_stream(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        stream: impl AttachmentStream + 'static,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            disposition: Disposition::Attached,
            content_id: None,
            content: AttachmentContent::Stream(Arc::new(Mutex::new(Box::new(stream)))),
        }
    }

    /// Marks the attachment as inline under the given content id
    pub fn inline(mut self, content_id: impl Into<String>) -> Self {
        self.disposition = Disposition::Inline;
        self.content_id = Some(content_id.into());
        self
    }
}

/// Logical, provider-agnostic email message
///
/// Messages are immutable values: the pipeline never mutates a caller's
/// instance, and defaulting produces a new copy.
#[derive(Debug, Clone, Default)]
pub struct EmailMessage {
    /// Sender; an empty address means "use the instance default"
    pub from: EmailAddress,
    pub to: Vec<EmailAddress>,
    pub cc: Vec<EmailAddress>,
    pub bcc: Vec<EmailAddress>,
    pub subject: Option<String>,
    pub text_content: Option<String>,
    pub html_content: Option<String>,
    /// Direct provider template reference, takes precedence over `template_key`
    pub template_id: Option<String>,
    /// Logical template name resolved through the instance template map
    pub template_key: Option<String>,
    pub template_data: HashMap<String, serde_json::Value>,
    pub headers: HashMap<String, String>,
    pub categories: Vec<String>,
    pub custom_args: HashMap<String, String>,
    pub reply_to: Option<EmailAddress>,
    pub attachments: Vec<Attachment>,
    pub priority: Priority,
    pub idempotency_key: Option<String>,
    /// Absolute scheduled delivery time
    pub send_at: Option<DateTime<Utc>>,
}

impl EmailMessage {
    /// Returns a copy with the instance default sender applied when `from`
    /// is blank; an identity transform otherwise.
    pub fn with_default_from(mut self, default_from: &EmailAddress) -> Self {
        if self.from.is_blank() {
            self.from = default_from.clone();
        }
        self
    }

    pub fn has_content(&self) -> bool {
        let non_blank = |value: &Option<String>| {
            value
                .as_deref()
                .map(|v| !v.trim().is_empty())
                .unwrap_or(false)
        };
        non_blank(&self.text_content) || non_blank(&self.html_content)
    }

    pub fn has_template_reference(&self) -> bool {
        let non_blank = |value: &Option<String>| {
            value
                .as_deref()
                .map(|v| !v.trim().is_empty())
                .unwrap_or(false)
        };
        non_blank(&self.template_id) || non_blank(&self.template_key)
    }

    /// Primary recipient address, used as the delivery target in results
    pub fn primary_recipient(&self) -> String {
        self.to
            .first()
            .map(|addr| addr.address.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_equality_is_case_insensitive() {
        let a = EmailAddress::new("User@Example.com");
        let b = EmailAddress::with_name("user@example.com", "User");
        assert_eq!(a, b);
        assert_ne!(a, EmailAddress::new("other@example.com"));
    }

    #[test]
    fn test_with_default_from_applies_when_blank() {
        let default = EmailAddress::with_name("no-reply@co.com", "Acme");
        let message = EmailMessage {
            to: vec![EmailAddress::new("user@example.com")],
            text_content: Some("hi".to_string()),
            ..Default::default()
        };

        let defaulted = message.with_default_from(&default);
        assert_eq!(defaulted.from.address, "no-reply@co.com");
        assert_eq!(defaulted.from.name.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_with_default_from_is_identity_when_set() {
        let default = EmailAddress::new("no-reply@co.com");
        let message = EmailMessage {
            from: EmailAddress::new("sender@example.com"),
            ..Default::default()
        };

        let defaulted = message.with_default_from(&default);
        assert_eq!(defaulted.from.address, "sender@example.com");
    }

    #[test]
    fn test_has_content_ignores_blank_strings() {
        let mut message = EmailMessage::default();
        assert!(!message.has_content());

        message.text_content = Some("   ".to_string());
        assert!(!message.has_content());

        message.html_content = Some("<p>hi</p>".to_string());
        assert!(message.has_content());
    }

    #[test]
    fn test_inline_attachment() {
        let attachment = Attachment::from_bytes("logo.png", "image/png", vec![1u8, 2, 3]);
        assert_eq!(attachment.disposition, Disposition::Attached);

        let inline = attachment.inline("logo-cid");
        assert_eq!(inline.disposition, Disposition::Inline);
        assert_eq!(inline.content_id.as_deref(), Some("logo-cid"));
    }
}
