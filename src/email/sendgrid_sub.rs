//! Per-restaurant SendGrid sub-account provider
//!
//! The restaurant sends from its own domain with a dedicated sub-account key.
//! Domain authentication is managed from the platform (parent) account.

use super::provider::{EmailProvider, EmailProviderError};
use super::sendgrid_mail;
use crate::domain::{
    EmailBulkResult, EmailProviderKind, EmailSendResult, ProviderQuota, Restaurant,
    SendBulkPayload, SendEmailPayload, SubAccountProvisioning, VerifyResult,
};
use crate::sendgrid::{
    CreateApiKeyRequest, CreateDomainRequest, CreateSubuserRequest, SendGridClient, SendGridEmail,
};
use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use serde_json::json;
use tracing::{info, warn};

const DEFAULT_SENDER_NAME: &str = "Restaurant";
const MISSING_SUB_KEY: &str = "SendGrid sub-account key missing";
const API_KEY_SCOPE: &str = "mail.send";
const DOMAIN_SUBDOMAIN: &str = "mail";

pub struct SendGridSubAccountProvider {
    restaurant: Restaurant,
    /// Bound to the restaurant's sub-account key, `None` when not provisioned
    client: Option<SendGridClient>,
    /// Platform account client, `None` when the platform key is absent
    management: Option<SendGridClient>,
    verified_domain: String,
}

impl SendGridSubAccountProvider {
    pub fn new(
        restaurant: Restaurant,
        client: Option<SendGridClient>,
        management: Option<SendGridClient>,
        verified_domain: impl Into<String>,
    ) -> Self {
        Self {
            restaurant,
            client,
            management,
            verified_domain: verified_domain.into(),
        }
    }

    fn sender_email(&self) -> String {
        self.restaurant
            .email_sender
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("contact+{}@{}", self.restaurant.id, self.verified_domain))
    }

    fn from(&self) -> SendGridEmail {
        SendGridEmail {
            email: self.sender_email(),
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
impl EmailProvider for SendGridSubAccountProvider {
    async fn send(&self, payload: &SendEmailPayload) -> EmailSendResult {
        let Some(client) = &self.client else {
            warn!(restaurant_id = self.restaurant.id, "{}", MISSING_SUB_KEY);
            return EmailSendResult::failure(MISSING_SUB_KEY);
        };
        sendgrid_mail::send_one(client, self.from(), payload, self.provider_name()).await
    }

    async fn send_bulk(&self, payload: &SendBulkPayload) -> EmailBulkResult {
        let Some(client) = &self.client else {
            warn!(restaurant_id = self.restaurant.id, "{}", MISSING_SUB_KEY);
            return EmailBulkResult::all_failed(&payload.recipients, MISSING_SUB_KEY);
        };
        sendgrid_mail::send_many(client, self.from(), payload, self.provider_name()).await
    }

    async fn verify(&self) -> VerifyResult {
        let Some(management) = &self.management else {
            return VerifyResult::not_verified(json!({ "error": "SendGrid API key missing" }));
        };

        let Some(sender) = self.restaurant.email_sender.as_deref().filter(|s| !s.is_empty())
        else {
            return VerifyResult::not_verified(json!({ "error": "Sender email not configured" }));
        };

        let Some(domain) = sender_domain(sender) else {
            return VerifyResult::not_verified(json!({
                "error": "Sender email has no domain",
                "sender": sender,
            }));
        };

        match management.find_domain(domain).await {
            Ok(Some(found)) => VerifyResult {
                verified: found.valid,
                details: Some(serde_json::to_value(&found).unwrap_or_default()),
            },
            Ok(None) => VerifyResult::not_verified(json!({
                "domain": domain,
                "message": "No verified domain found",
            })),
            Err(e) => {
                warn!(restaurant_id = self.restaurant.id, error = %e, "Domain verification lookup failed");
                VerifyResult::not_verified(json!({ "error": e.to_string() }))
            }
        }
    }

    fn get_quota(&self) -> ProviderQuota {
        self.restaurant.quota()
    }

    fn provider_name(&self) -> &'static str {
        EmailProviderKind::SendGridSub.as_str()
    }
}

fn sender_domain(address: &str) -> Option<&str> {
    address.split_once('@').map(|(_, d)| d).filter(|d| !d.is_empty())
}

/// Parameters for a new sub-account
#[derive(Debug, Clone)]
pub struct SubAccountRequest {
    pub username: String,
    /// Contact address; its domain is registered for authentication
    pub email: String,
}

/// Create a sub-account, a send-only key for it, then register the sender domain.
///
/// The first two steps are mandatory. Nothing is rolled back if the key
/// cannot be created. A failed domain registration only yields no DNS records.
pub async fn provision_sub_account(
    management: &SendGridClient,
    request: &SubAccountRequest,
) -> Result<SubAccountProvisioning, EmailProviderError> {
    let subuser = management
        .create_subuser(&CreateSubuserRequest {
            username: request.username.clone(),
            email: request.email.clone(),
            password: generate_password(),
            ips: Vec::new(),
        })
        .await?;
    let sub_account_id = subuser.sub_account_id(&request.username);

    let key = management
        .create_api_key(
            &request.username,
            &CreateApiKeyRequest {
                name: format!("cartelia-sub-{}", request.username),
                scopes: vec![API_KEY_SCOPE.to_string()],
            },
        )
        .await?;
    let api_key = key
        .api_key
        .filter(|k| !k.is_empty())
        .ok_or_else(|| EmailProviderError::SendFailed("SendGrid API key not returned".to_string()))?;

    let dns_records = match sender_domain(&request.email) {
        Some(domain) => match management
            .create_domain(&CreateDomainRequest {
                domain: domain.to_string(),
                subdomain: DOMAIN_SUBDOMAIN.to_string(),
                default: false,
            })
            .await
        {
            Ok(created) => created.dns_records(),
            Err(e) => {
                warn!(domain, error = %e, "Failed to register SendGrid domain authentication");
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    info!(
        username = %request.username,
        sub_account_id = %sub_account_id,
        dns_records = dns_records.len(),
        "SendGrid sub-account provisioned"
    );

    Ok(SubAccountProvisioning {
        api_key,
        sub_account_id,
        dns_records,
    })
}

fn generate_password() -> String {
    let body: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect();
    format!("{}!", body)
}
