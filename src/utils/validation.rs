/// Input validation utilities
use crate::models::EmailMessage;
use regex::Regex;

lazy_static::lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$"
    ).unwrap();
}

pub fn is_valid_email(address: &str) -> bool {
    EMAIL_REGEX.is_match(address)
}

/// Validates a message's structural correctness before any network call
///
/// All rules are checked independently; the returned list carries every
/// failure, and an empty list means the message is valid. `validate_to` is
/// disabled for shared-template bulk frames where recipients are supplied
/// separately.
pub fn validate_message(message: &EmailMessage, validate_to: bool) -> Vec<String> {
    let mut errors = Vec::new();

    if validate_to && message.to.is_empty() {
        errors.push("At least one recipient is required".to_string());
    }

    if !message.has_content() && !message.has_template_reference() {
        errors.push(
            "Message must have text or HTML content, or a template reference".to_string(),
        );
    }

    for addr in message
        .to
        .iter()
        .chain(message.cc.iter())
        .chain(message.bcc.iter())
    {
        if !is_valid_email(&addr.address) {
            errors.push(format!("Invalid email address: {}", addr.address));
        }
    }

    if let Some(reply_to) = &message.reply_to {
        if !is_valid_email(&reply_to.address) {
            errors.push(format!("Invalid reply-to address: {}", reply_to.address));
        }
    }

    for attachment in &message.attachments {
        if attachment.content_type.trim().is_empty() {
            errors.push(format!(
                "Attachment '{}' has no content type",
                attachment.file_name
            ));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Attachment, EmailAddress, EmailMessage};

    fn valid_message() -> EmailMessage {
        EmailMessage {
            from: EmailAddress::new("sender@example.com"),
            to: vec![EmailAddress::new("recipient@example.com")],
            subject: Some("Test".to_string()),
            text_content: Some("Body".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("test@example.com"));
        assert!(is_valid_email("user+tag@example.co.uk"));
        assert!(!is_valid_email("invalid"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_valid_message_passes() {
        assert!(validate_message(&valid_message(), true).is_empty());
    }

    #[test]
    fn test_missing_recipients_only_with_validate_to() {
        let mut message = valid_message();
        message.to = vec![];

        assert_eq!(validate_message(&message, true).len(), 1);
        assert!(validate_message(&message, false).is_empty());
    }

    #[test]
    fn test_template_reference_substitutes_for_content() {
        let mut message = valid_message();
        message.text_content = None;
        message.template_key = Some("welcome".to_string());
        assert!(validate_message(&message, true).is_empty());

        message.template_key = None;
        assert_eq!(validate_message(&message, true).len(), 1);
    }

    #[test]
    fn test_all_failures_are_collected() {
        let message = EmailMessage {
            to: vec![EmailAddress::new("not-an-address")],
            cc: vec![EmailAddress::new("also-bad")],
            reply_to: Some(EmailAddress::new("nope")),
            attachments: vec![Attachment::from_bytes("report.pdf", " ", vec![1u8])],
            ..Default::default()
        };

        let errors = validate_message(&message, true);
        assert_eq!(errors.len(), 5);
        assert!(errors.iter().any(|e| e.contains("not-an-address")));
        assert!(errors.iter().any(|e| e.contains("also-bad")));
        assert!(errors.iter().any(|e| e.contains("reply-to")));
        assert!(errors.iter().any(|e| e.contains("report.pdf")));
    }

    #[test]
    fn test_each_invalid_address_named_once() {
        let mut message = valid_message();
        message.bcc = vec![
            EmailAddress::new("bad-one"),
            EmailAddress::new("bad-two"),
        ];

        let errors = validate_message(&message, true);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("bad-one"));
        assert!(errors[1].contains("bad-two"));
    }
}
