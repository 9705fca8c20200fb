//! Email provider trait and error types

use crate::domain::{
    EmailBulkResult, EmailSendResult, ProviderQuota, SendBulkPayload, SendEmailPayload,
    VerifyResult,
};
use async_trait::async_trait;
use thiserror::Error;

/// Email provider error types
///
/// Raised by transports and clients; providers turn them into result values
/// before returning to the orchestrator.
#[derive(Error, Debug)]
pub enum EmailProviderError {
    #[error("{0}")]
    NotConfigured(String),

    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Rate limited")]
    RateLimited,
}

impl From<reqwest::Error> for EmailProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            Self::ConnectionError(e.to_string())
        } else {
            Self::SendFailed(e.to_string())
        }
    }
}

impl From<EmailProviderError> for crate::error::AppError {
    fn from(e: EmailProviderError) -> Self {
        match e {
            EmailProviderError::NotConfigured(msg) => Self::BadRequest(msg),
            other => Self::Upstream(other.to_string()),
        }
    }
}

/// Trait for email providers
///
/// `send`, `send_bulk` and `verify` never fail: transport and credential
/// errors are reported inside the returned value.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Send one logical message (all `to` addresses in one transport call)
    async fn send(&self, payload: &SendEmailPayload) -> EmailSendResult;

    /// Send the same content separately to every recipient
    async fn send_bulk(&self, payload: &SendBulkPayload) -> EmailBulkResult;

    /// Check whether the sending identity is confirmed upstream
    async fn verify(&self) -> VerifyResult;

    /// Ledger projection, no I/O
    fn get_quota(&self) -> ProviderQuota;

    /// Stored `email_provider` value this provider serves
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EmailAddress;
    use crate::error::AppError;
    use chrono::Utc;

    #[tokio::test]
    async fn test_mock_email_provider() {
        let mut mock = MockEmailProvider::new();

        mock.expect_provider_name().returning(|| "mock");
        mock.expect_verify()
            .returning(|| VerifyResult::verified(serde_json::json!({})));
        mock.expect_send()
            .returning(|_| EmailSendResult::success(Some("msg-123".to_string())));

        let resets_at = Utc::now();
        mock.expect_get_quota().returning(move || ProviderQuota {
            limit: 300,
            used: 1,
            resets_at,
        });

        assert_eq!(mock.provider_name(), "mock");
        assert!(mock.verify().await.verified);
        assert_eq!(mock.get_quota().used, 1);

        let payload = SendEmailPayload::new(vec![EmailAddress::new("test@example.com")], "Test")
            .with_html("<p>Hello</p>");
        let result = mock.send(&payload).await;
        assert!(result.success);
    }

    #[test]
    fn test_email_provider_error_display() {
        let errors = vec![
            EmailProviderError::NotConfigured("SendGrid API key not configured".to_string()),
            EmailProviderError::TokenRefreshFailed("invalid_grant".to_string()),
            EmailProviderError::ConnectionError("timeout".to_string()),
            EmailProviderError::AuthenticationFailed("bad token".to_string()),
            EmailProviderError::SendFailed("recipient rejected".to_string()),
            EmailProviderError::InvalidConfiguration("missing host".to_string()),
            EmailProviderError::RateLimited,
        ];

        for err in errors {
            let msg = err.to_string();
            assert!(!msg.is_empty());
        }
    }

    #[test]
    fn test_not_configured_keeps_message() {
        let err = EmailProviderError::NotConfigured("SendGrid sub-account key missing".to_string());
        assert_eq!(err.to_string(), "SendGrid sub-account key missing");
    }

    #[test]
    fn test_into_app_error() {
        let app: AppError = EmailProviderError::NotConfigured("no key".to_string()).into();
        assert!(matches!(app, AppError::BadRequest(_)));

        let app: AppError = EmailProviderError::SendFailed("503".to_string()).into();
        assert!(matches!(app, AppError::Upstream(_)));
    }
}
