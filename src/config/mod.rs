//! Configuration management for Cartelia Mail

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server host
    pub http_host: String,
    /// HTTP server port
    pub http_port: u16,
    /// Public URL of the dashboard, used for OAuth callback redirects
    pub public_base_url: String,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Platform SendGrid account
    pub sendgrid: SendGridConfig,
    /// Google OAuth client used by the Gmail relay provider
    pub google: GoogleOAuthConfig,
    /// Delivery tuning
    pub delivery: DeliveryConfig,
    /// Logging and metrics
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct SendGridConfig {
    /// Platform (parent account) API key. Absent in environments without email.
    pub api_key: Option<String>,
    /// Domain authenticated on the platform account (e.g. noreply.cartelia.app)
    pub verified_domain: String,
    /// Base URL of the SendGrid v3 API
    pub api_url: String,
}

impl Default for SendGridConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            verified_domain: DEFAULT_VERIFIED_DOMAIN.to_string(),
            api_url: "https://api.sendgrid.com".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    /// OAuth authorization endpoint (consent screen)
    pub auth_url: String,
    /// OAuth token endpoint (code exchange and refresh)
    pub token_url: String,
    /// Gmail REST API base URL (profile lookup)
    pub gmail_api_url: String,
    /// SMTP relay used for XOAUTH2 submission
    pub smtp_host: String,
    pub smtp_port: u16,
}

impl GoogleOAuthConfig {
    /// Both halves of the client credential are present
    pub fn is_configured(&self) -> bool {
        self.client_id.as_deref().is_some_and(|s| !s.is_empty())
            && self.client_secret.as_deref().is_some_and(|s| !s.is_empty())
    }
}

impl Default for GoogleOAuthConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            gmail_api_url: "https://gmail.googleapis.com".to_string(),
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 465,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// Pause between consecutive Gmail bulk messages
    pub gmail_bulk_delay: Duration,
    /// Timeout applied to every upstream HTTP call
    pub http_timeout: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            gmail_bulk_delay: Duration::from_millis(1000),
            http_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// "json" or "pretty"
    pub log_format: String,
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: "pretty".to_string(),
            metrics_enabled: true,
        }
    }
}

pub const DEFAULT_VERIFIED_DOMAIN: &str = "noreply.cartelia.app";

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let google_defaults = GoogleOAuthConfig::default();
        let sendgrid_defaults = SendGridConfig::default();

        Ok(Self {
            http_host: env::var("HTTP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("Invalid HTTP_PORT")?,
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").context("DATABASE_URL is required")?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()
                    .unwrap_or(2),
            },
            sendgrid: SendGridConfig {
                api_key: non_empty_var("SENDGRID_API_KEY"),
                verified_domain: non_empty_var("SENDGRID_VERIFIED_DOMAIN")
                    .unwrap_or(sendgrid_defaults.verified_domain),
                api_url: env::var("SENDGRID_API_URL").unwrap_or(sendgrid_defaults.api_url),
            },
            google: GoogleOAuthConfig {
                client_id: non_empty_var("GOOGLE_OAUTH_CLIENT_ID"),
                client_secret: non_empty_var("GOOGLE_OAUTH_CLIENT_SECRET"),
                redirect_uri: non_empty_var("GOOGLE_OAUTH_REDIRECT_URI"),
                auth_url: env::var("GOOGLE_OAUTH_AUTH_URL").unwrap_or(google_defaults.auth_url),
                token_url: env::var("GOOGLE_OAUTH_TOKEN_URL")
                    .unwrap_or(google_defaults.token_url),
                gmail_api_url: env::var("GMAIL_API_URL").unwrap_or(google_defaults.gmail_api_url),
                smtp_host: env::var("GMAIL_SMTP_HOST").unwrap_or(google_defaults.smtp_host),
                smtp_port: env::var("GMAIL_SMTP_PORT")
                    .ok()
                    .map(|p| p.parse().context("Invalid GMAIL_SMTP_PORT"))
                    .transpose()?
                    .unwrap_or(google_defaults.smtp_port),
            },
            delivery: DeliveryConfig {
                gmail_bulk_delay: Duration::from_millis(
                    env::var("GMAIL_BULK_DELAY_MS")
                        .unwrap_or_else(|_| "1000".to_string())
                        .parse()
                        .unwrap_or(1000),
                ),
                http_timeout: Duration::from_secs(
                    env::var("EMAIL_HTTP_TIMEOUT_SECS")
                        .unwrap_or_else(|_| "30".to_string())
                        .parse()
                        .unwrap_or(30),
                ),
            },
            telemetry: TelemetryConfig {
                log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
                metrics_enabled: env::var("METRICS_ENABLED")
                    .map(|s| s.to_lowercase() != "false")
                    .unwrap_or(true),
            },
        })
    }

    /// Get HTTP server address
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            http_host: "127.0.0.1".to_string(),
            http_port: 3000,
            public_base_url: "http://localhost:3000".to_string(),
            database: DatabaseConfig {
                url: "mysql://localhost/test".to_string(),
                max_connections: 10,
                min_connections: 2,
            },
            sendgrid: SendGridConfig::default(),
            google: GoogleOAuthConfig::default(),
            delivery: DeliveryConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }

    #[test]
    fn test_config_addresses() {
        let config = test_config();
        assert_eq!(config.http_addr(), "127.0.0.1:3000");
    }

    #[test]
    fn test_sendgrid_defaults() {
        let config = SendGridConfig::default();
        assert!(config.api_key.is_none());
        assert_eq!(config.verified_domain, "noreply.cartelia.app");
        assert_eq!(config.api_url, "https://api.sendgrid.com");
    }

    #[test]
    fn test_google_is_configured() {
        let mut config = GoogleOAuthConfig::default();
        assert!(!config.is_configured());

        config.client_id = Some("client".to_string());
        assert!(!config.is_configured());

        config.client_secret = Some(String::new());
        assert!(!config.is_configured());

        config.client_secret = Some("secret".to_string());
        assert!(config.is_configured());
    }

    #[test]
    fn test_delivery_defaults() {
        let delivery = DeliveryConfig::default();
        assert_eq!(delivery.gmail_bulk_delay, Duration::from_millis(1000));
        assert_eq!(delivery.http_timeout, Duration::from_secs(30));
    }
}
