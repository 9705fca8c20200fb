//! Email API handlers

use crate::api::SuccessResponse;
use crate::error::Result;
use crate::service::{EmailSetupRequest, SendBulkRequest, SendEmailRequest};
use crate::state::HasEmail;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use validator::Validate;

/// Restaurant selector used by status (query) and verify-domain (body)
#[derive(Debug, Clone, Deserialize)]
pub struct RestaurantRef {
    pub restaurant_id: i64,
}

/// Query for the delivery log listing
#[derive(Debug, Clone, Deserialize)]
pub struct LogsQuery {
    pub restaurant_id: i64,
    #[serde(default = "default_logs_limit")]
    pub limit: i64,
}

fn default_logs_limit() -> i64 {
    50
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationUrlResponse {
    pub url: String,
}

/// Query string Google appends to the redirect URI
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoogleCallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
}

/// POST /api/v1/email/setup
pub async fn setup<S: HasEmail>(
    State(state): State<S>,
    Json(request): Json<EmailSetupRequest>,
) -> Result<impl IntoResponse> {
    let response = state
        .email_setup_service()
        .setup(request.restaurant_id, request.option)
        .await?;
    Ok(Json(SuccessResponse::new(response)))
}

/// GET /api/v1/email/status?restaurant_id=
pub async fn status<S: HasEmail>(
    State(state): State<S>,
    Query(query): Query<RestaurantRef>,
) -> Result<impl IntoResponse> {
    let status = state.email_setup_service().status(query.restaurant_id).await?;
    Ok(Json(SuccessResponse::new(status)))
}

/// POST /api/v1/email/verify-domain
pub async fn verify_domain<S: HasEmail>(
    State(state): State<S>,
    Json(body): Json<RestaurantRef>,
) -> Result<impl IntoResponse> {
    let result = state
        .email_setup_service()
        .verify_domain(body.restaurant_id)
        .await?;
    Ok(Json(SuccessResponse::new(result)))
}

/// POST /api/v1/email/send
pub async fn send<S: HasEmail>(
    State(state): State<S>,
    Json(request): Json<SendEmailRequest>,
) -> Result<impl IntoResponse> {
    request.validate()?;
    let result = state.email_service().send_email(request).await?;
    Ok(Json(SuccessResponse::new(result)))
}

/// POST /api/v1/email/send-bulk
pub async fn send_bulk<S: HasEmail>(
    State(state): State<S>,
    Json(request): Json<SendBulkRequest>,
) -> Result<impl IntoResponse> {
    request.validate()?;
    let result = state.email_service().send_bulk_emails(request).await?;
    Ok(Json(SuccessResponse::new(result)))
}

/// GET /api/v1/email/logs?restaurant_id=&limit=
pub async fn logs<S: HasEmail>(
    State(state): State<S>,
    Query(query): Query<LogsQuery>,
) -> Result<impl IntoResponse> {
    let logs = state
        .email_service()
        .recent_logs(query.restaurant_id, query.limit)
        .await?;
    Ok(Json(SuccessResponse::new(logs)))
}

/// GET /api/v1/email/oauth/google/url
pub async fn google_authorization_url<S: HasEmail>(
    State(state): State<S>,
) -> Result<impl IntoResponse> {
    let url = state.email_setup_service().google_authorization_url()?;
    Ok(Json(SuccessResponse::new(AuthorizationUrlResponse { url })))
}

/// GET /api/v1/email/oauth/google/callback
///
/// Hands the authorization code back to the dashboard, which completes the
/// setup through `/setup`.
pub async fn google_callback<S: HasEmail>(
    State(state): State<S>,
    Query(query): Query<GoogleCallbackQuery>,
) -> Redirect {
    let settings_url = format!(
        "{}/dashboard/settings",
        state.config().public_base_url.trim_end_matches('/')
    );

    match (query.code.as_deref().filter(|c| !c.is_empty()), query.error) {
        (Some(code), None) => Redirect::to(&format!(
            "{}?gmailCode={}",
            settings_url,
            urlencoding::encode(code)
        )),
        (_, error) => {
            warn!(error = ?error, "Google OAuth callback without authorization code");
            Redirect::to(&format!("{}?error=gmail_auth_failed", settings_url))
        }
    }
}
