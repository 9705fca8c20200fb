//! Provider onboarding for restaurants

use crate::domain::{
    DnsRecord, EmailProviderKind, EmailSetupUpdate, EmailStatus, Restaurant, VerifyResult,
};
use crate::email::{
    provision_sub_account, EmailProviderFactory, PlatformSubdomainProvider, SubAccountRequest,
};
use crate::error::{AppError, Result};
use crate::google::GoogleOAuthClient;
use crate::repository::RestaurantRepository;
use crate::sendgrid::SendGridClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

/// Provider a restaurant switches to, with the parameter each one needs
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "option", rename_all = "snake_case")]
pub enum EmailSetupOption {
    CarteliaSubdomain,
    Gmail {
        #[serde(default)]
        gmail_code: Option<String>,
    },
    SendgridSub {
        #[serde(default)]
        domain: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailSetupRequest {
    pub restaurant_id: i64,
    #[serde(flatten)]
    pub option: EmailSetupOption,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailSetupResponse {
    pub sender: String,
    pub verification_pending: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_records: Option<Vec<DnsRecord>>,
}

pub struct EmailSetupService<R: RestaurantRepository> {
    restaurant_repo: Arc<R>,
    provider_factory: Arc<dyn EmailProviderFactory>,
    google: GoogleOAuthClient,
    sendgrid: Option<SendGridClient>,
    verified_domain: String,
}

impl<R: RestaurantRepository> EmailSetupService<R> {
    pub fn new(
        restaurant_repo: Arc<R>,
        provider_factory: Arc<dyn EmailProviderFactory>,
        google: GoogleOAuthClient,
        sendgrid: Option<SendGridClient>,
        verified_domain: impl Into<String>,
    ) -> Self {
        Self {
            restaurant_repo,
            provider_factory,
            google,
            sendgrid,
            verified_domain: verified_domain.into(),
        }
    }

    async fn load(&self, restaurant_id: i64) -> Result<Restaurant> {
        self.restaurant_repo
            .find_by_id(restaurant_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Restaurant {} not found", restaurant_id)))
    }

    /// Switch a restaurant to another provider
    #[instrument(skip(self, option))]
    pub async fn setup(
        &self,
        restaurant_id: i64,
        option: EmailSetupOption,
    ) -> Result<EmailSetupResponse> {
        let restaurant = self.load(restaurant_id).await?;

        let response = match option {
            EmailSetupOption::CarteliaSubdomain => self.setup_subdomain(&restaurant).await?,
            EmailSetupOption::Gmail { gmail_code } => {
                let code = required(gmail_code, "gmail_code is required for Gmail setup")?;
                self.setup_gmail(&restaurant, &code).await?
            }
            EmailSetupOption::SendgridSub { domain } => {
                let domain = required(domain, "domain is required for custom domain setup")?;
                self.setup_sendgrid_sub(&restaurant, &domain).await?
            }
        };

        info!(
            restaurant_id,
            sender = %response.sender,
            verification_pending = response.verification_pending,
            "Email provider configured"
        );
        Ok(response)
    }

    async fn setup_subdomain(&self, restaurant: &Restaurant) -> Result<EmailSetupResponse> {
        let kind = EmailProviderKind::PlatformSubdomain;
        let sender =
            PlatformSubdomainProvider::sender_address(restaurant.id, &self.verified_domain);

        self.restaurant_repo
            .update_email_setup(
                restaurant.id,
                &EmailSetupUpdate {
                    email_provider: Some(kind),
                    email_sender: Some(sender.clone()),
                    email_verified: Some(true),
                    email_quota_limit: Some(kind.default_quota_limit()),
                    ..Default::default()
                },
            )
            .await?;

        Ok(EmailSetupResponse {
            sender,
            verification_pending: false,
            dns_records: None,
        })
    }

    async fn setup_gmail(&self, restaurant: &Restaurant, code: &str) -> Result<EmailSetupResponse> {
        if !self.google.is_configured() {
            return Err(AppError::BadRequest("Google OAuth not configured".to_string()));
        }

        let tokens = self.google.exchange_code(code).await?;
        let refresh_token = tokens.refresh_token.filter(|t| !t.is_empty()).ok_or_else(|| {
            AppError::Upstream("Google did not return a refresh token".to_string())
        })?;
        let mailbox = self.google.get_profile_email(&tokens.access_token).await?;

        let kind = EmailProviderKind::Gmail;
        self.restaurant_repo
            .update_email_setup(
                restaurant.id,
                &EmailSetupUpdate {
                    email_provider: Some(kind),
                    email_sender: Some(mailbox.clone()),
                    email_verified: Some(true),
                    email_quota_limit: Some(kind.default_quota_limit()),
                    gmail_refresh_token: Some(refresh_token),
                    gmail_email: Some(mailbox.clone()),
                    ..Default::default()
                },
            )
            .await?;

        Ok(EmailSetupResponse {
            sender: mailbox,
            verification_pending: false,
            dns_records: None,
        })
    }

    async fn setup_sendgrid_sub(
        &self,
        restaurant: &Restaurant,
        domain: &str,
    ) -> Result<EmailSetupResponse> {
        let management = self
            .sendgrid
            .as_ref()
            .ok_or_else(|| AppError::BadRequest("SendGrid not configured".to_string()))?;

        let sender = format!("contact@{}", domain);
        let provisioned = provision_sub_account(
            management,
            &SubAccountRequest {
                username: format!("resto_{}", restaurant.id),
                email: sender.clone(),
            },
        )
        .await?;

        let kind = EmailProviderKind::SendGridSub;
        self.restaurant_repo
            .update_email_setup(
                restaurant.id,
                &EmailSetupUpdate {
                    email_provider: Some(kind),
                    email_sender: Some(sender.clone()),
                    email_verified: Some(false),
                    email_quota_limit: Some(kind.default_quota_limit()),
                    sendgrid_sub_key: Some(provisioned.api_key),
                    sendgrid_sub_id: Some(provisioned.sub_account_id),
                    ..Default::default()
                },
            )
            .await?;

        Ok(EmailSetupResponse {
            sender,
            verification_pending: true,
            dns_records: Some(provisioned.dns_records),
        })
    }

    pub async fn status(&self, restaurant_id: i64) -> Result<EmailStatus> {
        Ok(self.load(restaurant_id).await?.email_status())
    }

    /// Check the custom domain upstream and mark the restaurant verified once it passes
    #[instrument(skip(self))]
    pub async fn verify_domain(&self, restaurant_id: i64) -> Result<VerifyResult> {
        let restaurant = self.load(restaurant_id).await?;

        if restaurant.provider_kind() != EmailProviderKind::SendGridSub {
            return Err(AppError::BadRequest(
                "Domain verification only applies to SendGrid custom domains".to_string(),
            ));
        }

        let result = self.provider_factory.create(&restaurant).verify().await;
        if result.verified {
            self.restaurant_repo.mark_email_verified(restaurant_id).await?;
            info!(restaurant_id, "Sender domain verified");
        }

        Ok(result)
    }

    /// Consent URL for connecting a Gmail mailbox
    pub fn google_authorization_url(&self) -> Result<String> {
        if !self.google.is_configured() {
            return Err(AppError::BadRequest("Google OAuth not configured".to_string()));
        }
        Ok(self.google.authorization_url()?)
    }
}

fn required(value: Option<String>, message: &str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Validation(message.to_string()))
}
