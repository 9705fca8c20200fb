//! Data access layer (Repository pattern)

pub mod email_log;
pub mod restaurant;

pub use email_log::{EmailLogRepository, EmailLogRepositoryImpl};
pub use restaurant::{RestaurantRepository, RestaurantRepositoryImpl};
