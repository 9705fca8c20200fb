//! SendGrid v3 REST client
//!
//! One instance per API key: the platform (parent) key for the shared
//! subdomain provider and account management, or a restaurant's sub-account
//! key for its own sends.

use super::types::*;
use crate::email::EmailProviderError;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

/// Maximum personalizations SendGrid accepts in one mail/send request
pub const MAX_PERSONALIZATIONS: usize = 1000;

#[derive(Clone)]
pub struct SendGridClient {
    http_client: Client,
    base_url: String,
    api_key: String,
}

impl SendGridClient {
    pub fn new(http_client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(&self.api_key)
    }

    // ============================================================================
    // Mail Send
    // ============================================================================

    /// Submit a message. Returns the `X-Message-Id` header when present.
    pub async fn send_mail(
        &self,
        request: &MailSendRequest,
    ) -> Result<Option<String>, EmailProviderError> {
        let response = self
            .authed(self.http_client.post(self.url("/v3/mail/send")))
            .json(request)
            .send()
            .await?;

        let response = check_status(response, "Failed to send mail").await?;

        Ok(response
            .headers()
            .get("x-message-id")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string()))
    }

    // ============================================================================
    // Domain Authentication
    // ============================================================================

    /// Look up the authenticated domain matching `domain` exactly
    pub async fn find_domain(
        &self,
        domain: &str,
    ) -> Result<Option<WhitelabelDomain>, EmailProviderError> {
        let response = self
            .authed(self.http_client.get(self.url("/v3/whitelabel/domains")))
            .query(&[("domain", domain)])
            .send()
            .await?;

        let domains: Vec<WhitelabelDomain> =
            parse_json(response, "Failed to list authenticated domains").await?;

        Ok(domains.into_iter().find(|d| d.domain == domain))
    }

    pub async fn create_domain(
        &self,
        request: &CreateDomainRequest,
    ) -> Result<WhitelabelDomain, EmailProviderError> {
        let response = self
            .authed(self.http_client.post(self.url("/v3/whitelabel/domains")))
            .json(request)
            .send()
            .await?;

        parse_json(response, "Failed to authenticate domain").await
    }

    // ============================================================================
    // Subusers
    // ============================================================================

    pub async fn create_subuser(
        &self,
        request: &CreateSubuserRequest,
    ) -> Result<SubuserResponse, EmailProviderError> {
        let response = self
            .authed(self.http_client.post(self.url("/v3/subusers")))
            .json(request)
            .send()
            .await?;

        parse_json(response, "Failed to create subuser").await
    }

    /// Create an API key owned by `subuser`
    pub async fn create_api_key(
        &self,
        subuser: &str,
        request: &CreateApiKeyRequest,
    ) -> Result<ApiKeyResponse, EmailProviderError> {
        let response = self
            .authed(self.http_client.post(self.url("/v3/api_keys")))
            .header("on-behalf-of", subuser)
            .json(request)
            .send()
            .await?;

        parse_json(response, "Failed to create API key").await
    }
}

async fn check_status(response: Response, context: &str) -> Result<Response, EmailProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            EmailProviderError::AuthenticationFailed(format!("{}: {} - {}", context, status, body))
        }
        StatusCode::TOO_MANY_REQUESTS => EmailProviderError::RateLimited,
        _ => EmailProviderError::SendFailed(format!("{}: {} - {}", context, status, body)),
    })
}

async fn parse_json<T: DeserializeOwned>(
    response: Response,
    context: &str,
) -> Result<T, EmailProviderError> {
    let response = check_status(response, context).await?;
    response.json().await.map_err(|e| {
        EmailProviderError::SendFailed(format!("{}: invalid response body: {}", context, e))
    })
}
