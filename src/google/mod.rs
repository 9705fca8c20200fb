//! Google OAuth 2.0 and Gmail API client
//!
//! Covers what the Gmail relay needs: the consent URL, the authorization code
//! exchange, refresh-token grants and the mailbox address lookup.

use crate::config::GoogleOAuthConfig;
use crate::email::EmailProviderError;
use reqwest::Client;
use serde::Deserialize;

/// Scope allowing the relay to submit mail on the mailbox owner's behalf
pub const GMAIL_SEND_SCOPE: &str = "https://www.googleapis.com/auth/gmail.send";

#[derive(Clone)]
pub struct GoogleOAuthClient {
    config: GoogleOAuthConfig,
    http_client: Client,
}

/// Token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailProfile {
    email_address: String,
}

impl GoogleOAuthClient {
    pub fn new(config: GoogleOAuthConfig, http_client: Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    fn client_credentials(&self) -> Result<(&str, &str), EmailProviderError> {
        match (
            self.config.client_id.as_deref(),
            self.config.client_secret.as_deref(),
        ) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Ok((id, secret)),
            _ => Err(EmailProviderError::NotConfigured(
                "Google OAuth credentials not configured".to_string(),
            )),
        }
    }

    /// Consent screen URL requesting offline access to `gmail.send`
    pub fn authorization_url(&self) -> Result<String, EmailProviderError> {
        let (client_id, _) = self.client_credentials()?;
        let redirect_uri = self.config.redirect_uri.as_deref().unwrap_or_default();

        let url = url::Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("client_id", client_id),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", GMAIL_SEND_SCOPE),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| EmailProviderError::InvalidConfiguration(format!("Invalid auth URL: {}", e)))?;

        Ok(url.into())
    }

    /// Exchange an authorization code from the consent redirect
    pub async fn exchange_code(&self, code: &str) -> Result<GoogleTokens, EmailProviderError> {
        let (client_id, client_secret) = self.client_credentials()?;
        let redirect_uri = self.config.redirect_uri.as_deref().unwrap_or_default();

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("redirect_uri", redirect_uri),
        ];

        let response = self
            .http_client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmailProviderError::AuthenticationFailed(format!(
                "Failed to exchange authorization code: {} - {}",
                status, body
            )));
        }

        response.json().await.map_err(|e| {
            EmailProviderError::AuthenticationFailed(format!(
                "Failed to parse token response: {}",
                e
            ))
        })
    }

    /// Obtain a fresh access token for a stored refresh token
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<String, EmailProviderError> {
        let (client_id, client_secret) = self.client_credentials()?;

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ];

        let response = self
            .http_client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| EmailProviderError::TokenRefreshFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmailProviderError::TokenRefreshFailed(format!(
                "{} - {}",
                status, body
            )));
        }

        let tokens: GoogleTokens = response
            .json()
            .await
            .map_err(|e| EmailProviderError::TokenRefreshFailed(e.to_string()))?;

        if tokens.access_token.is_empty() {
            return Err(EmailProviderError::TokenRefreshFailed(
                "Empty access token".to_string(),
            ));
        }

        Ok(tokens.access_token)
    }

    /// Mailbox address of the account that granted `access_token`
    pub async fn get_profile_email(&self, access_token: &str) -> Result<String, EmailProviderError> {
        let url = format!(
            "{}/gmail/v1/users/me/profile",
            self.config.gmail_api_url.trim_end_matches('/')
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmailProviderError::AuthenticationFailed(format!(
                "Failed to read Gmail profile: {} - {}",
                status, body
            )));
        }

        let profile: GmailProfile = response.json().await.map_err(|e| {
            EmailProviderError::AuthenticationFailed(format!("Failed to parse Gmail profile: {}", e))
        })?;

        Ok(profile.email_address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> GoogleOAuthConfig {
        GoogleOAuthConfig {
            client_id: Some("client-123.apps.googleusercontent.com".to_string()),
            client_secret: Some("secret".to_string()),
            redirect_uri: Some("https://api.cartelia.app/api/v1/email/oauth/google/callback".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_authorization_url() {
        let client = GoogleOAuthClient::new(configured(), Client::new());
        let url = client.authorization_url().unwrap();
        let parsed = url::Url::parse(&url).unwrap();
        let params: std::collections::HashMap<_, _> = parsed.query_pairs().into_owned().collect();

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert_eq!(params["scope"], GMAIL_SEND_SCOPE);
        assert_eq!(params["access_type"], "offline");
        assert_eq!(params["prompt"], "consent");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["client_id"], "client-123.apps.googleusercontent.com");
    }

    #[test]
    fn test_authorization_url_requires_credentials() {
        let client = GoogleOAuthClient::new(GoogleOAuthConfig::default(), Client::new());
        assert!(!client.is_configured());
        assert!(matches!(
            client.authorization_url(),
            Err(EmailProviderError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn test_refresh_without_credentials() {
        let client = GoogleOAuthClient::new(GoogleOAuthConfig::default(), Client::new());
        let err = client.refresh_access_token("1//token").await.unwrap_err();
        assert!(matches!(err, EmailProviderError::NotConfigured(_)));
    }
}
