//! Platform subdomain provider
//!
//! Sends through the shared platform SendGrid account as
//! `resto_{id}@{verified domain}`. The domain is authenticated once for the
//! whole platform, so every restaurant is considered verified.

use super::provider::EmailProvider;
use super::sendgrid_mail;
use crate::domain::{
    EmailBulkResult, EmailProviderKind, EmailSendResult, ProviderQuota, Restaurant,
    SendBulkPayload, SendEmailPayload, VerifyResult,
};
use crate::sendgrid::{SendGridClient, SendGridEmail};
use async_trait::async_trait;
use serde_json::json;
use tracing::error;

const DEFAULT_SENDER_NAME: &str = "Cartelia";
const MISSING_KEY: &str = "SendGrid API key not configured";

pub struct PlatformSubdomainProvider {
    restaurant: Restaurant,
    /// `None` when the platform key is absent
    client: Option<SendGridClient>,
    verified_domain: String,
}

impl PlatformSubdomainProvider {
    pub fn new(
        restaurant: Restaurant,
        client: Option<SendGridClient>,
        verified_domain: impl Into<String>,
    ) -> Self {
        Self {
            restaurant,
            client,
            verified_domain: verified_domain.into(),
        }
    }

    /// Deterministic per-restaurant address on the platform domain
    pub fn sender_address(restaurant_id: i64, verified_domain: &str) -> String {
        format!("resto_{}@{}", restaurant_id, verified_domain)
    }

    fn from(&self) -> SendGridEmail {
        SendGridEmail {
            email: Self::sender_address(self.restaurant.id, &self.verified_domain),
            name: Some(
                self.restaurant
                    .email_sender_name
                    .clone()
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| DEFAULT_SENDER_NAME.to_string()),
            ),
        }
    }
}

#[async_trait]
impl EmailProvider for PlatformSubdomainProvider {
    async fn send(&self, payload: &SendEmailPayload) -> EmailSendResult {
        let Some(client) = &self.client else {
            error!(restaurant_id = self.restaurant.id, "{}", MISSING_KEY);
            return EmailSendResult::failure(MISSING_KEY);
        };
        sendgrid_mail::send_one(client, self.from(), payload, self.provider_name()).await
    }

    async fn send_bulk(&self, payload: &SendBulkPayload) -> EmailBulkResult {
        let Some(client) = &self.client else {
            error!(restaurant_id = self.restaurant.id, "{}", MISSING_KEY);
            return EmailBulkResult::all_failed(&payload.recipients, MISSING_KEY);
        };
        sendgrid_mail::send_many(client, self.from(), payload, self.provider_name()).await
    }

    async fn verify(&self) -> VerifyResult {
        VerifyResult::verified(json!({ "subdomain": self.verified_domain }))
    }

    fn get_quota(&self) -> ProviderQuota {
        self.restaurant.quota()
    }

    fn provider_name(&self) -> &'static str {
        EmailProviderKind::PlatformSubdomain.as_str()
    }
}
