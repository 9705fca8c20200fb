//! Email payload and result types shared by all providers

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Email address with optional display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct EmailAddress {
    #[validate(email)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl EmailAddress {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    pub fn with_name(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: Some(name.into()),
        }
    }
}

/// One logical message, possibly addressed to several recipients at once
#[derive(Debug, Clone, PartialEq)]
pub struct SendEmailPayload {
    pub to: Vec<EmailAddress>,
    pub subject: String,
    pub html: Option<String>,
    pub text: Option<String>,
    pub reply_to: Option<EmailAddress>,
}

impl SendEmailPayload {
    pub fn new(to: Vec<EmailAddress>, subject: impl Into<String>) -> Self {
        Self {
            to,
            subject: subject.into(),
            html: None,
            text: None,
            reply_to: None,
        }
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn text_part(&self) -> String {
        text_part(&self.text)
    }

    pub fn html_part(&self) -> String {
        html_part(&self.html, &self.text)
    }
}

/// The same content sent separately to each recipient
#[derive(Debug, Clone, PartialEq)]
pub struct SendBulkPayload {
    pub recipients: Vec<EmailAddress>,
    pub subject: String,
    pub html: Option<String>,
    pub text: Option<String>,
}

impl SendBulkPayload {
    pub fn text_part(&self) -> String {
        text_part(&self.text)
    }

    pub fn html_part(&self) -> String {
        html_part(&self.html, &self.text)
    }
}

fn text_part(text: &Option<String>) -> String {
    text.clone().unwrap_or_default()
}

/// HTML falls back to the text body when no HTML was supplied
fn html_part(html: &Option<String>, text: &Option<String>) -> String {
    html.as_deref()
        .filter(|h| !h.is_empty())
        .or(text.as_deref())
        .unwrap_or_default()
        .to_string()
}

/// Result of sending a single message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailSendResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EmailSendResult {
    pub fn success(message_id: Option<String>) -> Self {
        Self {
            success: true,
            message_id,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

/// Per-recipient failure inside a bulk send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkSendError {
    pub recipient: String,
    pub error: String,
}

/// Outcome of a bulk send.
///
/// Counters only move through the `record_*` methods, so
/// `queued == sent + failed` and `errors.len() == failed` always hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailBulkResult {
    pub queued: usize,
    pub sent: usize,
    pub failed: usize,
    pub errors: Vec<BulkSendError>,
}

impl EmailBulkResult {
    pub fn record_sent(&mut self) {
        self.queued += 1;
        self.sent += 1;
    }

    pub fn record_failure(&mut self, recipient: impl Into<String>, error: impl Into<String>) {
        self.queued += 1;
        self.failed += 1;
        self.errors.push(BulkSendError {
            recipient: recipient.into(),
            error: error.into(),
        });
    }

    /// Every recipient failed for the same reason
    pub fn all_failed(recipients: &[EmailAddress], error: &str) -> Self {
        let mut result = Self::default();
        for recipient in recipients {
            result.record_failure(&recipient.email, error);
        }
        result
    }

    /// First recorded error for `email`, if any
    pub fn error_for(&self, email: &str) -> Option<&BulkSendError> {
        self.errors.iter().find(|e| e.recipient == email)
    }
}

/// Answer of a provider identity check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyResult {
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl VerifyResult {
    pub fn verified(details: serde_json::Value) -> Self {
        Self {
            verified: true,
            details: Some(details),
        }
    }

    pub fn not_verified(details: serde_json::Value) -> Self {
        Self {
            verified: false,
            details: Some(details),
        }
    }
}

/// DNS record the restaurant must publish to authenticate its sending domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    #[serde(rename = "type")]
    pub record_type: String,
    pub host: String,
    pub data: String,
    pub ttl: u32,
}

/// Credentials and DNS instructions produced by sub-account provisioning
#[derive(Debug, Clone, PartialEq)]
pub struct SubAccountProvisioning {
    pub api_key: String,
    pub sub_account_id: String,
    pub dns_records: Vec<DnsRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_address() {
        let addr = EmailAddress::new("client@example.com");
        assert_eq!(addr.email, "client@example.com");
        assert!(addr.name.is_none());

        let addr = EmailAddress::with_name("client@example.com", "Marie");
        assert_eq!(addr.name.as_deref(), Some("Marie"));
    }

    #[test]
    fn test_email_address_validation() {
        assert!(EmailAddress::new("client@example.com").validate().is_ok());
        assert!(EmailAddress::new("not-an-email").validate().is_err());
    }

    #[test]
    fn test_body_fallbacks() {
        let payload = SendEmailPayload::new(vec![EmailAddress::new("a@b.fr")], "Hi");
        assert_eq!(payload.text_part(), "");
        assert_eq!(payload.html_part(), "");

        let payload = payload.with_text("plain only");
        assert_eq!(payload.text_part(), "plain only");
        assert_eq!(payload.html_part(), "plain only");

        let payload = payload.with_html("<p>rich</p>");
        assert_eq!(payload.html_part(), "<p>rich</p>");
        assert_eq!(payload.text_part(), "plain only");
    }

    #[test]
    fn test_empty_html_falls_back_to_text() {
        let payload = SendBulkPayload {
            recipients: vec![],
            subject: "s".to_string(),
            html: Some(String::new()),
            text: Some("text".to_string()),
        };
        assert_eq!(payload.html_part(), "text");
    }

    #[test]
    fn test_send_result() {
        let ok = EmailSendResult::success(Some("msg-1".to_string()));
        assert!(ok.success);
        assert!(ok.error.is_none());

        let ko = EmailSendResult::failure("Connection refused");
        assert!(!ko.success);
        assert_eq!(ko.error.as_deref(), Some("Connection refused"));
    }

    #[test]
    fn test_bulk_result_accounting() {
        let mut result = EmailBulkResult::default();
        result.record_sent();
        result.record_failure("bad@example.com", "mailbox unavailable");
        result.record_sent();

        assert_eq!(result.queued, 3);
        assert_eq!(result.sent, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.errors.len(), result.failed);
        assert_eq!(result.queued, result.sent + result.failed);
        assert!(result.error_for("bad@example.com").is_some());
        assert!(result.error_for("good@example.com").is_none());
    }

    #[test]
    fn test_bulk_result_all_failed() {
        let recipients = vec![
            EmailAddress::new("a@example.com"),
            EmailAddress::new("b@example.com"),
        ];
        let result = EmailBulkResult::all_failed(&recipients, "SendGrid API key not configured");

        assert_eq!(result.queued, 2);
        assert_eq!(result.sent, 0);
        assert_eq!(result.failed, 2);
        assert_eq!(result.errors[1].recipient, "b@example.com");
    }

    #[test]
    fn test_dns_record_serialization() {
        let record = DnsRecord {
            record_type: "CNAME".to_string(),
            host: "mail.example.com".to_string(),
            data: "u123.wl.sendgrid.net".to_string(),
            ttl: 3600,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "CNAME");
        assert_eq!(json["ttl"], 3600);
    }
}
