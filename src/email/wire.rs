/// Provider wire format and the logical-to-wire mapper
use crate::constants::{HIGH_PRIORITY_HEADERS, IDEMPOTENCY_KEY_HEADER, LOW_PRIORITY_HEADERS};
use crate::error::MailrelayError;
use crate::models::{
    Attachment, AttachmentContent, EmailAddress, EmailMessage, Priority, RelaySettings,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;
use std::collections::HashMap;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Default)]
pub struct WireAddress {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl From<&EmailAddress> for WireAddress {
    fn from(addr: &EmailAddress) -> Self {
        Self {
            email: addr.address.clone(),
            name: addr.name.clone(),
        }
    }
}

/// One set of recipients bound to the shared message body
#[derive(Debug, Clone, Serialize, Default)]
pub struct WirePersonalization {
    pub to: Vec<WireAddress>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<WireAddress>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bcc: Vec<WireAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamic_template_data: Option<serde_json::Value>,
}

impl WirePersonalization {
    /// Entry binding a single recipient, used by the batched bulk strategy
    pub fn for_recipient(recipient: &EmailAddress, data: Option<serde_json::Value>) -> Self {
        Self {
            to: vec![recipient.into()],
            cc: Vec::new(),
            bcc: Vec::new(),
            dynamic_template_data: data,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WireContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WireAttachment {
    /// Base64-encoded payload
    pub content: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub filename: String,
    pub disposition: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WireMailSettings {
    pub sandbox_mode: WireSandboxMode,
}

#[derive(Debug, Clone, Serialize)]
pub struct WireSandboxMode {
    pub enable: bool,
}

/// Provider-specific request payload
#[derive(Debug, Clone, Serialize, Default)]
pub struct WireMessage {
    pub from: WireAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub personalizations: Vec<WirePersonalization>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<WireContent>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub custom_args: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<WireAddress>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<WireAttachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    /// Scheduled delivery as epoch seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mail_settings: Option<WireMailSettings>,
    /// Substitution data stamped onto personalizations appended after the
    /// build, never serialized itself
    #[serde(skip)]
    pub shared_template_data: Option<serde_json::Value>,
}

fn priority_headers(priority: Priority) -> &'static [(&'static str, &'static str)] {
    match priority {
        Priority::High => HIGH_PRIORITY_HEADERS,
        Priority::Low => LOW_PRIORITY_HEADERS,
        Priority::Normal => &[],
    }
}

/// Converts a validated logical message into the provider wire structure
///
/// `include_to` controls whether the message's own recipients become a
/// personalization block; the batched bulk strategy builds without one and
/// appends an entry per recipient afterwards.
pub async fn build_wire_message(
    message: &EmailMessage,
    settings: &RelaySettings,
    include_to: bool,
) -> Result<WireMessage, MailrelayError> {
    let mut wire = WireMessage {
        from: WireAddress::from(&message.from),
        subject: message.subject.clone(),
        ..Default::default()
    };

    if let Some(reply_to) = &message.reply_to {
        wire.reply_to = Some(reply_to.into());
    }

    if let Some(text) = &message.text_content {
        wire.content.push(WireContent {
            content_type: mime::TEXT_PLAIN.to_string(),
            value: text.clone(),
        });
    }

    if let Some(html) = &message.html_content {
        wire.content.push(WireContent {
            content_type: mime::TEXT_HTML.to_string(),
            value: html.clone(),
        });
    }

    // Header precedence: instance globals, then per-message overrides, then
    // priority-derived headers, then the idempotency key
    let mut headers = settings.global_headers.clone();
    headers.extend(message.headers.clone());
    for (key, value) in priority_headers(message.priority) {
        headers.insert((*key).to_string(), (*value).to_string());
    }
    if let Some(key) = &message.idempotency_key {
        headers.insert(IDEMPOTENCY_KEY_HEADER.to_string(), key.clone());
    }
    wire.headers = headers;

    // Instance categories first, message categories appended verbatim
    wire.categories = settings
        .global_categories
        .iter()
        .chain(message.categories.iter())
        .cloned()
        .collect();

    wire.custom_args = message.custom_args.clone();

    if let Some(template_id) = resolve_template(message, settings)? {
        wire.template_id = Some(template_id);
        if !message.template_data.is_empty() {
            wire.shared_template_data = Some(serde_json::to_value(&message.template_data)?);
        }
    }

    for attachment in &message.attachments {
        wire.attachments.push(map_attachment(attachment).await?);
    }

    if settings.sandbox_mode {
        wire.mail_settings = Some(WireMailSettings {
            sandbox_mode: WireSandboxMode { enable: true },
        });
    }

    if include_to {
        wire.personalizations.push(WirePersonalization {
            to: message.to.iter().map(WireAddress::from).collect(),
            cc: message.cc.iter().map(WireAddress::from).collect(),
            bcc: message.bcc.iter().map(WireAddress::from).collect(),
            dynamic_template_data: wire.shared_template_data.clone(),
        });
    }

    if let Some(send_at) = message.send_at {
        wire.send_at = Some(send_at.timestamp());
    }

    Ok(wire)
}

/// Resolves the effective provider template id
///
/// A direct `template_id` wins. A `template_key` goes through the instance
/// template map; a miss is fatal when the message has no content to fall
/// back on, otherwise the message goes out content-only.
fn resolve_template(
    message: &EmailMessage,
    settings: &RelaySettings,
) -> Result<Option<String>, MailrelayError> {
    if let Some(id) = message.template_id.as_deref() {
        if !id.trim().is_empty() {
            return Ok(Some(id.to_string()));
        }
    }

    let Some(key) = message.template_key.as_deref().filter(|k| !k.trim().is_empty()) else {
        return Ok(None);
    };

    match settings.template_map.get(key) {
        Some(id) => Ok(Some(id.clone())),
        None if message.has_content() => {
            warn!(template_key = %key, "Template key is not mapped, sending content only");
            Ok(None)
        }
        None => Err(MailrelayError::Template(format!(
            "Template key '{}' is not mapped and the message has no content",
            key
        ))),
    }
}

async fn map_attachment(attachment: &Attachment) -> Result<WireAttachment, MailrelayError> {
    let data = match &attachment.content {
        AttachmentContent::Bytes(bytes) => bytes.to_vec(),
        AttachmentContent::Stream(stream) => {
            let mut guard = stream.lock().await;
            if let Err(e) = guard.rewind().await {
                warn!(
                    file = %attachment.file_name,
                    error = %e,
                    "Could not rewind attachment stream, reading from current position"
                );
            }
            let mut buf = Vec::new();
            guard.read_to_end(&mut buf).await.map_err(|e| {
                MailrelayError::Stream(format!(
                    "Failed to read attachment '{}': {}",
                    attachment.file_name, e
                ))
            })?;
            buf
        }
    };

    let content_type = if attachment.content_type.trim().is_empty() {
        mime::APPLICATION_OCTET_STREAM.to_string()
    } else {
        attachment.content_type.clone()
    };

    Ok(WireAttachment {
        content: BASE64.encode(&data),
        content_type,
        filename: attachment.file_name.clone(),
        disposition: attachment.disposition.as_wire().to_string(),
        content_id: attachment.content_id.clone(),
    })
}
