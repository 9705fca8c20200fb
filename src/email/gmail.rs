//! Gmail OAuth relay provider
//!
//! Sends from the restaurant's own Gmail mailbox. The stored refresh token is
//! exchanged for an access token before every transport operation and the
//! message is submitted to Gmail's SMTP relay with XOAUTH2.

use super::provider::{EmailProvider, EmailProviderError};
use crate::domain::{
    EmailAddress, EmailBulkResult, EmailProviderKind, EmailSendResult, ProviderQuota, Restaurant,
    SendBulkPayload, SendEmailPayload, VerifyResult,
};
use crate::google::GoogleOAuthClient;
use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::{Credentials, Mechanism},
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const DEFAULT_SENDER_NAME: &str = "Restaurant";

/// Submits a built message on behalf of `login` using an OAuth access token
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailRelay: Send + Sync {
    async fn submit(
        &self,
        login: &str,
        access_token: &str,
        message: Message,
    ) -> Result<Option<String>, EmailProviderError>;
}

/// Implicit-TLS SMTP relay authenticated with XOAUTH2
pub struct SmtpOAuthRelay {
    host: String,
    port: u16,
    timeout: Duration,
}

impl SmtpOAuthRelay {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }
}

#[async_trait]
impl MailRelay for SmtpOAuthRelay {
    async fn submit(
        &self,
        login: &str,
        access_token: &str,
        message: Message,
    ) -> Result<Option<String>, EmailProviderError> {
        // Credentials change with every access token, so the transport is per call
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.host)
            .map_err(|e| EmailProviderError::InvalidConfiguration(e.to_string()))?
            .port(self.port)
            .credentials(Credentials::new(login.to_string(), access_token.to_string()))
            .authentication(vec![Mechanism::Xoauth2])
            .timeout(Some(self.timeout))
            .build();

        match transport.send(message).await {
            Ok(response) => Ok(response.message().next().map(|s| s.to_string())),
            Err(e) => {
                let error_msg = e.to_string();
                if error_msg.contains("authentication") || error_msg.contains("AUTH") {
                    Err(EmailProviderError::AuthenticationFailed(error_msg))
                } else if error_msg.contains("connection") || error_msg.contains("timeout") {
                    Err(EmailProviderError::ConnectionError(error_msg))
                } else {
                    Err(EmailProviderError::SendFailed(error_msg))
                }
            }
        }
    }
}

pub struct GmailRelayProvider {
    restaurant: Restaurant,
    oauth: GoogleOAuthClient,
    relay: Arc<dyn MailRelay>,
    bulk_delay: Duration,
}

impl GmailRelayProvider {
    pub fn new(
        restaurant: Restaurant,
        oauth: GoogleOAuthClient,
        relay: Arc<dyn MailRelay>,
        bulk_delay: Duration,
    ) -> Self {
        Self {
            restaurant,
            oauth,
            relay,
            bulk_delay,
        }
    }

    async fn access_token(&self) -> Result<String, EmailProviderError> {
        let refresh_token = self
            .restaurant
            .gmail_refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| EmailProviderError::NotConfigured("Gmail not connected".to_string()))?;

        self.oauth
            .refresh_access_token(refresh_token)
            .await
            .inspect_err(|e| {
                warn!(restaurant_id = self.restaurant.id, error = %e, "Failed to refresh Gmail access token")
            })
    }

    fn mailbox_address(&self) -> Result<&str, EmailProviderError> {
        self.restaurant
            .gmail_email
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| {
                EmailProviderError::NotConfigured("Gmail not properly configured".to_string())
            })
    }

    /// Token and mailbox needed before anything can be submitted
    async fn session(&self) -> Result<(String, &str), EmailProviderError> {
        let token = self.access_token().await?;
        let mailbox = self.mailbox_address()?;
        Ok((token, mailbox))
    }

    fn from_mailbox(&self, address: &str) -> Result<Mailbox, EmailProviderError> {
        let name = self
            .restaurant
            .email_sender_name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_SENDER_NAME.to_string());
        to_mailbox(address, Some(&name))
    }

    async fn try_send(&self, payload: &SendEmailPayload) -> Result<Option<String>, EmailProviderError> {
        let (token, mailbox) = self.session().await?;

        let to = payload
            .to
            .iter()
            .map(address_mailbox)
            .collect::<Result<Vec<_>, _>>()?;
        let reply_to = payload.reply_to.as_ref().map(address_mailbox).transpose()?;

        let message = build_message(
            self.from_mailbox(mailbox)?,
            to,
            reply_to,
            &payload.subject,
            payload.text_part(),
            payload.html_part(),
        )?;

        self.relay.submit(mailbox, &token, message).await
    }

    /// One message per recipient, spaced by the bulk delay. A failed
    /// recipient does not stop the rest.
    async fn deliver_each(
        &self,
        token: &str,
        mailbox: &str,
        payload: &SendBulkPayload,
    ) -> EmailBulkResult {
        let mut result = EmailBulkResult::default();
        let text = payload.text_part();
        let html = payload.html_part();

        for (index, recipient) in payload.recipients.iter().enumerate() {
            if index > 0 && !self.bulk_delay.is_zero() {
                tokio::time::sleep(self.bulk_delay).await;
            }

            let outcome = async {
                let message = build_message(
                    self.from_mailbox(mailbox)?,
                    vec![address_mailbox(recipient)?],
                    None,
                    &payload.subject,
                    text.clone(),
                    html.clone(),
                )?;
                self.relay.submit(mailbox, token, message).await
            }
            .await;

            match outcome {
                Ok(_) => result.record_sent(),
                Err(e) => {
                    warn!(recipient = %recipient.email, error = %e, "Gmail bulk message failed");
                    result.record_failure(&recipient.email, e.to_string());
                }
            }
        }

        result
    }
}

#[async_trait]
impl EmailProvider for GmailRelayProvider {
    async fn send(&self, payload: &SendEmailPayload) -> EmailSendResult {
        match self.try_send(payload).await {
            Ok(message_id) => EmailSendResult::success(message_id),
            Err(e) => {
                warn!(restaurant_id = self.restaurant.id, error = %e, "Gmail send failed");
                EmailSendResult::failure(e.to_string())
            }
        }
    }

    async fn send_bulk(&self, payload: &SendBulkPayload) -> EmailBulkResult {
        let (token, mailbox) = match self.session().await {
            Ok(session) => session,
            Err(e) => {
                warn!(restaurant_id = self.restaurant.id, error = %e, "Gmail bulk send aborted");
                return EmailBulkResult::all_failed(&payload.recipients, &e.to_string());
            }
        };

        self.deliver_each(&token, mailbox, payload).await
    }

    async fn verify(&self) -> VerifyResult {
        match self.access_token().await {
            Ok(_) => {
                let details = json!({ "email": self.restaurant.gmail_email });
                if self.mailbox_address().is_ok() {
                    VerifyResult::verified(details)
                } else {
                    VerifyResult::not_verified(details)
                }
            }
            Err(e) => VerifyResult::not_verified(json!({ "error": e.to_string() })),
        }
    }

    fn get_quota(&self) -> ProviderQuota {
        self.restaurant.quota()
    }

    fn provider_name(&self) -> &'static str {
        EmailProviderKind::Gmail.as_str()
    }
}

fn to_mailbox(email: &str, name: Option<&str>) -> Result<Mailbox, EmailProviderError> {
    let address: Address = email.parse().map_err(|e| {
        EmailProviderError::InvalidConfiguration(format!("Invalid address {}: {}", email, e))
    })?;
    Ok(Mailbox::new(
        name.filter(|n| !n.is_empty()).map(str::to_string),
        address,
    ))
}

fn address_mailbox(addr: &EmailAddress) -> Result<Mailbox, EmailProviderError> {
    to_mailbox(&addr.email, addr.name.as_deref())
}

fn build_message(
    from: Mailbox,
    to: Vec<Mailbox>,
    reply_to: Option<Mailbox>,
    subject: &str,
    text: String,
    html: String,
) -> Result<Message, EmailProviderError> {
    if to.is_empty() {
        return Err(EmailProviderError::InvalidConfiguration(
            "No recipients specified".to_string(),
        ));
    }

    let mut builder = Message::builder().from(from).subject(subject);
    for mailbox in to {
        builder = builder.to(mailbox);
    }
    if let Some(reply_to) = reply_to {
        builder = builder.reply_to(reply_to);
    }

    builder
        .multipart(MultiPart::alternative_plain_html(text, html))
        .map_err(|e| EmailProviderError::SendFailed(e.to_string()))
}
