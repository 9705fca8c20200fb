//! Application state traits for dependency injection
//!
//! Handlers are generic over [`HasEmail`] so the same router serves the
//! production `AppState` and test states built on in-memory repositories.

use crate::config::Config;
use crate::repository::{EmailLogRepository, RestaurantRepository};
use crate::service::{EmailService, EmailSetupService};

/// State that provides the email services
pub trait HasEmail: Clone + Send + Sync + 'static {
    type RestaurantRepo: RestaurantRepository;
    type EmailLogRepo: EmailLogRepository;

    fn config(&self) -> &Config;

    /// Send orchestrator
    fn email_service(&self) -> &EmailService<Self::RestaurantRepo, Self::EmailLogRepo>;

    /// Provider onboarding
    fn email_setup_service(&self) -> &EmailSetupService<Self::RestaurantRepo>;
}
