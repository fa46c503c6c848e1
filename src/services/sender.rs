/// Outbound delivery pipeline
use crate::email::wire::{WirePersonalization, build_wire_message};
use crate::error::MailrelayError;
use crate::models::{EmailAddress, EmailMessage, EmailResponse, EmailResult, RelaySettings};
use crate::services::transport::{MailTransport, WireResponse};
use crate::utils::logging::redact_email;
use crate::utils::retry::send_with_retry;
use crate::utils::validation::validate_message;
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Inbound API the hosting layer binds into its container
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Sends one message; every failure is reported in the result, never
    /// raised
    async fn send_email(&self, message: EmailMessage) -> EmailResult;

    /// Sends one shared template to many recipients in provider-side batches
    ///
    /// Fails only on an empty recipient list.
    async fn send_bulk_template(
        &self,
        template: EmailMessage,
        recipients: Vec<EmailAddress>,
        validate_only: bool,
    ) -> Result<EmailResponse, MailrelayError>;

    /// Sends fully-personalized messages through a bounded worker pool
    ///
    /// Fails only on an empty message list. Result order is not guaranteed
    /// to match input order.
    async fn send_bulk_personalized(
        &self,
        messages: Vec<EmailMessage>,
        validate_only: bool,
    ) -> Result<EmailResponse, MailrelayError>;
}

pub struct RelayMailer {
    transport: Arc<dyn MailTransport>,
    settings: Arc<RelaySettings>,
}

impl RelayMailer {
    pub fn new(transport: Arc<dyn MailTransport>, settings: RelaySettings) -> Self {
        Self {
            transport,
            settings: Arc::new(settings.normalize()),
        }
    }

    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    /// Fallible single-send pipeline: defaulting, validation, wire mapping,
    /// retrying delivery
    ///
    /// Unlike [`EmailSender::send_email`] this surfaces pipeline errors to
    /// the caller; the health probe uses that to distinguish transport
    /// failures from provider rejections.
    pub(crate) async fn try_send(
        &self,
        message: EmailMessage,
    ) -> Result<EmailResult, MailrelayError> {
        let message = message.with_default_from(&self.settings.default_from);
        let target = message.primary_recipient();

        let errors = validate_message(&message, true);
        if !errors.is_empty() {
            return Ok(EmailResult::invalid(target, errors));
        }

        self.deliver(&message, &target).await
    }

    async fn deliver(
        &self,
        message: &EmailMessage,
        target: &str,
    ) -> Result<EmailResult, MailrelayError> {
        let wire = build_wire_message(message, &self.settings, true).await?;

        debug!(target = %redact_email(target), "Dispatching email");
        let response =
            send_with_retry(|| self.transport.send(&wire), self.settings.max_retries, target)
                .await?;

        Ok(self.map_response(target, &response))
    }

    /// Maps one provider response onto one recipient's result
    fn map_response(&self, address: &str, response: &WireResponse) -> EmailResult {
        if response.is_success() {
            let message_id = response.message_id();
            info!(
                target = %redact_email(address),
                message_id = message_id.as_deref().unwrap_or(""),
                "Email accepted by provider"
            );
            return EmailResult::success(address, message_id);
        }

        warn!(
            target = %redact_email(address),
            status = response.status.as_u16(),
            body = %response.body,
            "Provider rejected email"
        );

        let mut result = EmailResult::failure(address, response.body.clone());
        result.status_code = Some(response.status.as_u16());
        result.retry_after = response.retry_after();
        result
    }

    /// One bulk worker: defaulting, validation, optional dry-run stop,
    /// delivery; errors become a failed result for this message only
    async fn process_message(&self, message: EmailMessage, validate_only: bool) -> EmailResult {
        let message = message.with_default_from(&self.settings.default_from);
        let target = message.primary_recipient();

        let errors = validate_message(&message, true);
        if !errors.is_empty() {
            return EmailResult::invalid(target, errors);
        }

        if validate_only {
            return EmailResult::success(target, None);
        }

        match self.deliver(&message, &target).await {
            Ok(result) => result,
            Err(e) => {
                error!(
                    target = %redact_email(&target),
                    error = %e,
                    "Bulk message send failed"
                );
                EmailResult::failure(target, e.to_string())
            }
        }
    }

    /// Builds and delivers one shared-template chunk as a single request
    async fn send_chunk(
        &self,
        template: &EmailMessage,
        chunk: &[EmailAddress],
    ) -> Result<WireResponse, MailrelayError> {
        let mut wire = build_wire_message(template, &self.settings, false).await?;
        for recipient in chunk {
            wire.personalizations.push(WirePersonalization::for_recipient(
                recipient,
                wire.shared_template_data.clone(),
            ));
        }

        let target = chunk.first().map(|r| r.address.as_str()).unwrap_or("");
        send_with_retry(|| self.transport.send(&wire), self.settings.max_retries, target).await
    }
}

#[async_trait]
impl EmailSender for RelayMailer {
    async fn send_email(&self, message: EmailMessage) -> EmailResult {
        let target = message.primary_recipient();
        match self.try_send(message).await {
            Ok(result) => result,
            Err(e) => {
                // Final safety net: nothing escapes to the caller
                error!(target = %redact_email(&target), error = %e, "Send failed");
                EmailResult::failure(target, e.to_string())
            }
        }
    }

    async fn send_bulk_template(
        &self,
        template: EmailMessage,
        recipients: Vec<EmailAddress>,
        validate_only: bool,
    ) -> Result<EmailResponse, MailrelayError> {
        if recipients.is_empty() {
            return Err(MailrelayError::Validation(
                "Recipient list is empty".to_string(),
            ));
        }

        let template = template.with_default_from(&self.settings.default_from);

        // Frame-level validation applies to every recipient identically
        let errors = validate_message(&template, false);
        if !errors.is_empty() {
            warn!(
                recipients = recipients.len(),
                errors = errors.len(),
                "Bulk template failed validation"
            );
            let results = recipients
                .iter()
                .map(|r| EmailResult::invalid(r.address.clone(), errors.clone()))
                .collect();
            return Ok(EmailResponse::from_results(results));
        }

        if validate_only {
            info!(
                recipients = recipients.len(),
                "Validate-only bulk send, skipping delivery"
            );
            let results = recipients
                .iter()
                .map(|r| EmailResult::success(r.address.clone(), None))
                .collect();
            return Ok(EmailResponse::from_results(results));
        }

        let chunk_size = self.settings.bulk.max_batch_size.max(1);
        let mut results = Vec::with_capacity(recipients.len());

        // Chunks share one wire message under construction, so they are
        // processed strictly sequentially
        for chunk in recipients.chunks(chunk_size) {
            match self.send_chunk(&template, chunk).await {
                Ok(response) => {
                    // The provider returns one result per API call; it
                    // applies to every recipient in the chunk
                    for recipient in chunk {
                        results.push(self.map_response(&recipient.address, &response));
                    }
                }
                Err(e) => {
                    warn!(
                        chunk_size = chunk.len(),
                        error = %e,
                        "Bulk chunk failed, continuing with remaining chunks"
                    );
                    for recipient in chunk {
                        results.push(EmailResult::failure(recipient.address.clone(), e.to_string()));
                    }
                }
            }
        }

        Ok(EmailResponse::from_results(results))
    }

    async fn send_bulk_personalized(
        &self,
        messages: Vec<EmailMessage>,
        validate_only: bool,
    ) -> Result<EmailResponse, MailrelayError> {
        if messages.is_empty() {
            return Err(MailrelayError::Validation(
                "Message list is empty".to_string(),
            ));
        }

        let width = self.settings.bulk.max_concurrency.max(1);
        debug!(
            messages = messages.len(),
            width = width,
            "Dispatching personalized bulk send"
        );

        let results: Vec<EmailResult> = futures::stream::iter(
            messages
                .into_iter()
                .map(|message| self.process_message(message, validate_only)),
        )
        .buffer_unordered(width)
        .collect()
        .await;

        Ok(EmailResponse::from_results(results))
    }
}
