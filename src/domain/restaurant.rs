//! Restaurant (tenant) email configuration

use super::quota::next_reset_after;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Which upstream transport a restaurant sends through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EmailProviderKind {
    /// Shared platform SendGrid account, `resto_{id}@` on the platform domain
    #[default]
    #[serde(rename = "cartelia_subdomain")]
    PlatformSubdomain,
    /// Restaurant's own Gmail mailbox via OAuth
    #[serde(rename = "gmail")]
    Gmail,
    /// Dedicated SendGrid sub-account with the restaurant's own domain
    #[serde(rename = "sendgrid_sub")]
    SendGridSub,
}

impl EmailProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlatformSubdomain => "cartelia_subdomain",
            Self::Gmail => "gmail",
            Self::SendGridSub => "sendgrid_sub",
        }
    }

    /// Lenient parse of the stored column: unknown or unset values select the platform provider
    pub fn from_setting(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }

    /// Daily quota granted when a restaurant switches to this provider
    pub fn default_quota_limit(&self) -> i64 {
        match self {
            Self::PlatformSubdomain => 300,
            Self::Gmail => 500,
            Self::SendGridSub => 10_000,
        }
    }
}

impl std::str::FromStr for EmailProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "cartelia_subdomain" => Ok(Self::PlatformSubdomain),
            "gmail" => Ok(Self::Gmail),
            "sendgrid_sub" => Ok(Self::SendGridSub),
            _ => Err(format!("Unknown email provider: {}", s)),
        }
    }
}

impl std::fmt::Display for EmailProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Email-related columns of a restaurant row
///
/// Credentials (`sendgrid_sub_key`, `gmail_refresh_token`) are never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Restaurant {
    pub id: i64,
    pub name: String,
    pub email_provider: String,
    pub email_sender: Option<String>,
    pub email_sender_name: Option<String>,
    #[serde(skip_serializing)]
    pub sendgrid_sub_key: Option<String>,
    pub sendgrid_sub_id: Option<String>,
    #[serde(skip_serializing)]
    pub gmail_refresh_token: Option<String>,
    pub gmail_email: Option<String>,
    pub email_quota_used: i64,
    pub email_quota_limit: i64,
    pub email_quota_reset_at: DateTime<Utc>,
    pub email_verified: bool,
}

impl Restaurant {
    /// A freshly onboarded restaurant: platform provider, default quota, resets next midnight
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        let kind = EmailProviderKind::default();
        Self {
            id,
            name: name.into(),
            email_provider: kind.as_str().to_string(),
            email_sender: None,
            email_sender_name: None,
            sendgrid_sub_key: None,
            sendgrid_sub_id: None,
            gmail_refresh_token: None,
            gmail_email: None,
            email_quota_used: 0,
            email_quota_limit: kind.default_quota_limit(),
            email_quota_reset_at: next_reset_after(Utc::now(), &Local),
            email_verified: false,
        }
    }

    pub fn provider_kind(&self) -> EmailProviderKind {
        EmailProviderKind::from_setting(Some(&self.email_provider))
    }

    /// Read-only status projection for the dashboard
    pub fn email_status(&self) -> EmailStatus {
        EmailStatus {
            provider: self.email_provider.clone(),
            sender: self.email_sender.clone(),
            verified: self.email_verified,
            quota_used: self.email_quota_used,
            quota_limit: self.email_quota_limit,
            quota_reset_at: self.email_quota_reset_at,
        }
    }
}

/// Fields written when a restaurant (re)configures its email provider.
/// `None` leaves the stored column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmailSetupUpdate {
    pub email_provider: Option<EmailProviderKind>,
    pub email_sender: Option<String>,
    pub email_verified: Option<bool>,
    pub email_quota_limit: Option<i64>,
    pub sendgrid_sub_key: Option<String>,
    pub sendgrid_sub_id: Option<String>,
    pub gmail_refresh_token: Option<String>,
    pub gmail_email: Option<String>,
}

/// Email configuration summary returned by the status endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailStatus {
    pub provider: String,
    pub sender: Option<String>,
    pub verified: bool,
    pub quota_used: i64,
    pub quota_limit: i64,
    pub quota_reset_at: DateTime<Utc>,
}
