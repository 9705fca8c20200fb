//! Server initialization and routing

use crate::api;
use crate::config::Config;
use crate::email::DefaultEmailProviderFactory;
use crate::google::GoogleOAuthClient;
use crate::middleware::ObservabilityLayer;
use crate::repository::{EmailLogRepositoryImpl, RestaurantRepositoryImpl};
use crate::service::{EmailService, EmailSetupService};
use crate::state::HasEmail;
use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub email_service: Arc<EmailService<RestaurantRepositoryImpl, EmailLogRepositoryImpl>>,
    pub email_setup_service: Arc<EmailSetupService<RestaurantRepositoryImpl>>,
}

impl HasEmail for AppState {
    type RestaurantRepo = RestaurantRepositoryImpl;
    type EmailLogRepo = EmailLogRepositoryImpl;

    fn config(&self) -> &Config {
        &self.config
    }

    fn email_service(&self) -> &EmailService<Self::RestaurantRepo, Self::EmailLogRepo> {
        &self.email_service
    }

    fn email_setup_service(&self) -> &EmailSetupService<Self::RestaurantRepo> {
        &self.email_setup_service
    }
}

/// Run the HTTP server
pub async fn run(config: Config, metrics_handle: Option<PrometheusHandle>) -> Result<()> {
    let db_pool = MySqlPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    info!("Connected to database");

    let http_client = reqwest::Client::builder()
        .timeout(config.delivery.http_timeout)
        .build()
        .context("Failed to build HTTP client")?;

    let restaurant_repo = Arc::new(RestaurantRepositoryImpl::new(db_pool.clone()));
    let email_log_repo = Arc::new(EmailLogRepositoryImpl::new(db_pool.clone()));

    let factory = DefaultEmailProviderFactory::new(&config, http_client.clone());
    let platform_client = factory.platform_client();
    if platform_client.is_none() {
        warn!("SENDGRID_API_KEY not set; platform and sub-account sends will fail");
    }
    let google = GoogleOAuthClient::new(config.google.clone(), http_client);
    if !google.is_configured() {
        warn!("Google OAuth not configured; Gmail setup is unavailable");
    }
    let factory = Arc::new(factory);

    let email_service = Arc::new(EmailService::new(
        restaurant_repo.clone(),
        email_log_repo,
        factory.clone(),
    ));
    let email_setup_service = Arc::new(EmailSetupService::new(
        restaurant_repo,
        factory,
        google,
        platform_client,
        config.sendgrid.verified_domain.clone(),
    ));

    let http_addr = config.http_addr();
    let state = AppState {
        config: Arc::new(config),
        email_service,
        email_setup_service,
    };

    let app = build_router(state).merge(metrics_router(metrics_handle));

    let listener = TcpListener::bind(&http_addr).await?;
    info!("HTTP server started on {}", http_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn metrics_router(handle: Option<PrometheusHandle>) -> Router {
    Router::new()
        .route("/metrics", get(api::metrics::metrics_handler))
        .with_state(Arc::new(handle))
}

/// Build the HTTP router
///
/// Generic over the state type so tests can drive the same routes with
/// in-memory repositories.
pub fn build_router<S: HasEmail>(state: S) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(api::health::health))
        .route("/api/v1/email/setup", post(api::email::setup::<S>))
        .route("/api/v1/email/status", get(api::email::status::<S>))
        .route(
            "/api/v1/email/verify-domain",
            post(api::email::verify_domain::<S>),
        )
        .route("/api/v1/email/send", post(api::email::send::<S>))
        .route("/api/v1/email/send-bulk", post(api::email::send_bulk::<S>))
        .route("/api/v1/email/logs", get(api::email::logs::<S>))
        .route(
            "/api/v1/email/oauth/google/url",
            get(api::email::google_authorization_url::<S>),
        )
        .route(
            "/api/v1/email/oauth/google/callback",
            get(api::email::google_callback::<S>),
        )
        .layer(ObservabilityLayer)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
