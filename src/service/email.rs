//! Send orchestration: quota ledger, template rendering, provider dispatch
//! and per-recipient delivery logging.

use crate::domain::{
    clamp_to_quota, CreateEmailLogInput, EmailAddress, EmailBulkResult, EmailLog, EmailLogStatus,
    EmailSendResult, Restaurant, SendBulkPayload, SendEmailPayload,
};
use crate::email::{EmailProviderFactory, EmailTemplate, TemplateEngine};
use crate::error::{AppError, Result};
use crate::repository::{EmailLogRepository, RestaurantRepository};
use crate::telemetry::metrics;
use chrono::{Local, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

const MAX_LOG_PAGE: i64 = 200;

/// Single send request. A `template` replaces `subject`, `html` and `text`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendEmailRequest {
    pub restaurant_id: i64,
    #[validate(length(min = 1), nested)]
    pub to: Vec<EmailAddress>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub reply_to: Option<EmailAddress>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub variables: Option<Value>,
}

/// Bulk send request; each recipient gets a separate message
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendBulkRequest {
    pub restaurant_id: i64,
    #[validate(length(min = 1), nested)]
    pub recipients: Vec<EmailAddress>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub variables: Option<Value>,
}

/// Subject and bodies after optional template rendering
struct Content {
    subject: String,
    html: Option<String>,
    text: Option<String>,
}

impl Content {
    fn resolve(
        template: Option<EmailTemplate>,
        variables: Option<&Value>,
        subject: &str,
        html: &Option<String>,
        text: &Option<String>,
    ) -> Self {
        match template {
            Some(template) => {
                let empty = Value::Null;
                let rendered =
                    TemplateEngine::new(variables.unwrap_or(&empty)).render_template(template);
                Self {
                    subject: rendered.subject,
                    html: Some(rendered.html),
                    text: Some(rendered.text),
                }
            }
            None => Self {
                subject: subject.to_string(),
                html: html.clone(),
                text: text.clone(),
            },
        }
    }

    /// A message needs a subject and at least one non-empty body.
    fn ensure_deliverable(&self) -> Result<()> {
        if self.subject.trim().is_empty() {
            return Err(AppError::Validation("subject must not be empty".to_string()));
        }
        let has_body =
            |body: &Option<String>| body.as_deref().is_some_and(|b| !b.trim().is_empty());
        if !has_body(&self.html) && !has_body(&self.text) {
            return Err(AppError::Validation(
                "html or text content is required".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct EmailService<R: RestaurantRepository, L: EmailLogRepository> {
    restaurant_repo: Arc<R>,
    log_repo: Arc<L>,
    provider_factory: Arc<dyn EmailProviderFactory>,
}

impl<R: RestaurantRepository, L: EmailLogRepository> EmailService<R, L> {
    pub fn new(
        restaurant_repo: Arc<R>,
        log_repo: Arc<L>,
        provider_factory: Arc<dyn EmailProviderFactory>,
    ) -> Self {
        Self {
            restaurant_repo,
            log_repo,
            provider_factory,
        }
    }

    /// Load a restaurant and apply the daily quota reset if it is due.
    /// The reset is persisted before the caller sees the ledger.
    pub async fn reset_quota_if_needed(&self, restaurant_id: i64) -> Result<Restaurant> {
        let mut restaurant = self
            .restaurant_repo
            .find_by_id(restaurant_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Restaurant {} not found", restaurant_id)))?;

        if restaurant.reset_quota_if_due(Utc::now(), &Local) {
            self.restaurant_repo
                .reset_quota(restaurant.id, restaurant.email_quota_reset_at)
                .await?;
            metrics::record_quota_reset();
            info!(
                restaurant_id,
                next_reset_at = %restaurant.email_quota_reset_at,
                "Email quota reset"
            );
        }

        Ok(restaurant)
    }

    /// Send one message. Transport failures come back as an unsuccessful
    /// result; only missing restaurant, exhausted quota, unknown template and
    /// empty content are errors.
    #[instrument(skip(self, request), fields(restaurant_id = request.restaurant_id))]
    pub async fn send_email(&self, request: SendEmailRequest) -> Result<EmailSendResult> {
        let template = parse_template(request.template.as_deref())?;
        let restaurant = self.reset_quota_if_needed(request.restaurant_id).await?;

        if restaurant.quota_exhausted() {
            metrics::record_quota_rejection();
            return Err(AppError::QuotaExceeded {
                reset_at: restaurant.email_quota_reset_at,
            });
        }

        let content = Content::resolve(
            template,
            request.variables.as_ref(),
            &request.subject,
            &request.html,
            &request.text,
        );
        content.ensure_deliverable()?;

        let provider = self.provider_factory.create(&restaurant);
        let payload = SendEmailPayload {
            to: request.to,
            subject: content.subject,
            html: content.html,
            text: content.text,
            reply_to: request.reply_to,
        };
        let result = provider.send(&payload).await;

        let recipient = payload
            .to
            .first()
            .map(|a| a.email.clone())
            .unwrap_or_else(|| "unknown".to_string());
        self.log_repo
            .create(&CreateEmailLogInput {
                restaurant_id: restaurant.id,
                provider: provider.provider_name().to_string(),
                recipient,
                subject: payload.subject.clone(),
                status: if result.success {
                    EmailLogStatus::Sent
                } else {
                    EmailLogStatus::Failed
                },
                error: result.error.clone(),
            })
            .await?;

        if result.success {
            self.restaurant_repo.increment_quota(restaurant.id, 1).await?;
            metrics::record_deliveries(provider.provider_name(), 1, 0);
        } else {
            metrics::record_deliveries(provider.provider_name(), 0, 1);
        }

        Ok(result)
    }

    /// Send the same content to many recipients, truncated to the quota left
    /// for today. Recipients beyond the quota are dropped without a log entry.
    #[instrument(
        skip(self, request),
        fields(restaurant_id = request.restaurant_id, requested = request.recipients.len())
    )]
    pub async fn send_bulk_emails(&self, request: SendBulkRequest) -> Result<EmailBulkResult> {
        let template = parse_template(request.template.as_deref())?;
        let restaurant = self.reset_quota_if_needed(request.restaurant_id).await?;

        let remaining = restaurant.quota_remaining();
        if remaining <= 0 {
            metrics::record_quota_rejection();
            return Err(AppError::QuotaExceeded {
                reset_at: restaurant.email_quota_reset_at,
            });
        }

        let mut recipients = request.recipients;
        let allowed = clamp_to_quota(recipients.len(), remaining);
        if allowed < recipients.len() {
            info!(
                requested = recipients.len(),
                allowed, "Bulk send truncated to remaining quota"
            );
            recipients.truncate(allowed);
        }

        let content = Content::resolve(
            template,
            request.variables.as_ref(),
            &request.subject,
            &request.html,
            &request.text,
        );
        content.ensure_deliverable()?;

        let provider = self.provider_factory.create(&restaurant);
        let payload = SendBulkPayload {
            recipients,
            subject: content.subject,
            html: content.html,
            text: content.text,
        };
        let result = provider.send_bulk(&payload).await;

        for recipient in &payload.recipients {
            let failure = result.error_for(&recipient.email);
            self.log_repo
                .create(&CreateEmailLogInput {
                    restaurant_id: restaurant.id,
                    provider: provider.provider_name().to_string(),
                    recipient: recipient.email.clone(),
                    subject: payload.subject.clone(),
                    status: if failure.is_some() {
                        EmailLogStatus::Failed
                    } else {
                        EmailLogStatus::Sent
                    },
                    error: failure.map(|f| f.error.clone()),
                })
                .await?;
        }

        if result.sent > 0 {
            self.restaurant_repo
                .increment_quota(restaurant.id, result.sent as i64)
                .await?;
        }
        metrics::record_deliveries(provider.provider_name(), result.sent, result.failed);

        Ok(result)
    }

    /// Most recent delivery log entries for a restaurant, newest first
    pub async fn recent_logs(&self, restaurant_id: i64, limit: i64) -> Result<Vec<EmailLog>> {
        let limit = limit.clamp(1, MAX_LOG_PAGE);
        self.log_repo.list_by_restaurant(restaurant_id, limit).await
    }
}

fn parse_template(name: Option<&str>) -> Result<Option<EmailTemplate>> {
    name.map(EmailTemplate::from_str).transpose()
}
