//! Provider selection from a restaurant's stored configuration

use super::gmail::{GmailRelayProvider, MailRelay, SmtpOAuthRelay};
use super::platform::PlatformSubdomainProvider;
use super::provider::EmailProvider;
use super::sendgrid_sub::SendGridSubAccountProvider;
use crate::config::Config;
use crate::domain::{EmailProviderKind, Restaurant};
use crate::google::GoogleOAuthClient;
use crate::sendgrid::SendGridClient;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Builds the [`EmailProvider`] for a restaurant.
///
/// Selection only; no I/O. Kept behind a trait so orchestrator tests can
/// substitute mock providers.
#[cfg_attr(test, mockall::automock)]
pub trait EmailProviderFactory: Send + Sync {
    fn create(&self, restaurant: &Restaurant) -> Box<dyn EmailProvider>;
}

/// Factory wired to the real SendGrid and Google transports.
/// Owns the shared HTTP client; providers are created per request.
pub struct DefaultEmailProviderFactory {
    http_client: Client,
    sendgrid_api_key: Option<String>,
    sendgrid_api_url: String,
    verified_domain: String,
    oauth: GoogleOAuthClient,
    relay: Arc<dyn MailRelay>,
    gmail_bulk_delay: Duration,
}

impl DefaultEmailProviderFactory {
    pub fn new(config: &Config, http_client: Client) -> Self {
        Self {
            oauth: GoogleOAuthClient::new(config.google.clone(), http_client.clone()),
            http_client,
            sendgrid_api_key: config.sendgrid.api_key.clone(),
            sendgrid_api_url: config.sendgrid.api_url.clone(),
            verified_domain: config.sendgrid.verified_domain.clone(),
            relay: Arc::new(SmtpOAuthRelay::new(
                config.google.smtp_host.clone(),
                config.google.smtp_port,
                config.delivery.http_timeout,
            )),
            gmail_bulk_delay: config.delivery.gmail_bulk_delay,
        }
    }

    /// Replace the Gmail SMTP relay
    pub fn with_relay(mut self, relay: Arc<dyn MailRelay>) -> Self {
        self.relay = relay;
        self
    }

    fn sendgrid_client(&self, api_key: Option<&str>) -> Option<SendGridClient> {
        api_key
            .filter(|k| !k.is_empty())
            .map(|k| SendGridClient::new(self.http_client.clone(), &self.sendgrid_api_url, k))
    }

    /// Client for the platform (parent) SendGrid account
    pub fn platform_client(&self) -> Option<SendGridClient> {
        self.sendgrid_client(self.sendgrid_api_key.as_deref())
    }
}

impl EmailProviderFactory for DefaultEmailProviderFactory {
    fn create(&self, restaurant: &Restaurant) -> Box<dyn EmailProvider> {
        match restaurant.provider_kind() {
            EmailProviderKind::Gmail => Box::new(GmailRelayProvider::new(
                restaurant.clone(),
                self.oauth.clone(),
                Arc::clone(&self.relay),
                self.gmail_bulk_delay,
            )),
            EmailProviderKind::SendGridSub => Box::new(SendGridSubAccountProvider::new(
                restaurant.clone(),
                self.sendgrid_client(restaurant.sendgrid_sub_key.as_deref()),
                self.platform_client(),
                &self.verified_domain,
            )),
            EmailProviderKind::PlatformSubdomain => Box::new(PlatformSubdomainProvider::new(
                restaurant.clone(),
                self.platform_client(),
                &self.verified_domain,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        DatabaseConfig, DeliveryConfig, GoogleOAuthConfig, SendGridConfig, TelemetryConfig,
    };

    fn test_config() -> Config {
        Config {
            http_host: "127.0.0.1".to_string(),
            http_port: 3000,
            public_base_url: "http://localhost:5173".to_string(),
            database: DatabaseConfig {
                url: "mysql://localhost/test".to_string(),
                max_connections: 1,
                min_connections: 1,
            },
            sendgrid: SendGridConfig {
                api_key: Some("SG.platform".to_string()),
                ..Default::default()
            },
            google: GoogleOAuthConfig::default(),
            delivery: DeliveryConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }

    fn factory() -> DefaultEmailProviderFactory {
        DefaultEmailProviderFactory::new(&test_config(), Client::new())
    }

    fn restaurant_with(provider: &str) -> Restaurant {
        let mut restaurant = Restaurant::new(1, "Test");
        restaurant.email_provider = provider.to_string();
        restaurant
    }

    #[test]
    fn test_selects_by_stored_provider() {
        let factory = factory();
        assert_eq!(
            factory.create(&restaurant_with("gmail")).provider_name(),
            "gmail"
        );
        assert_eq!(
            factory.create(&restaurant_with("sendgrid_sub")).provider_name(),
            "sendgrid_sub"
        );
        assert_eq!(
            factory
                .create(&restaurant_with("cartelia_subdomain"))
                .provider_name(),
            "cartelia_subdomain"
        );
    }

    #[test]
    fn test_unknown_or_empty_falls_back_to_platform() {
        let factory = factory();
        for stored in ["", "mailchimp", "GMAIL"] {
            assert_eq!(
                factory.create(&restaurant_with(stored)).provider_name(),
                "cartelia_subdomain"
            );
        }
    }

    #[test]
    fn test_provider_carries_restaurant_quota() {
        let factory = factory();
        let mut restaurant = restaurant_with("gmail");
        restaurant.email_quota_used = 77;
        restaurant.email_quota_limit = 500;

        let quota = factory.create(&restaurant).get_quota();
        assert_eq!(quota.used, 77);
        assert_eq!(quota.limit, 500);
    }

    #[test]
    fn test_platform_client_requires_key() {
        let mut config = test_config();
        config.sendgrid.api_key = None;
        let factory = DefaultEmailProviderFactory::new(&config, Client::new());
        assert!(factory.platform_client().is_none());
    }
}
