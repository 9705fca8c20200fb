//! Cartelia Mail - transactional email delivery for Cartelia restaurants
//!
//! Provider abstraction over the platform SendGrid subdomain, restaurant
//! Gmail mailboxes and per-restaurant SendGrid sub-accounts, with daily
//! quotas, templates and per-recipient delivery logs.

pub mod api;
pub mod config;
pub mod domain;
pub mod email;
pub mod error;
pub mod google;
pub mod middleware;
pub mod migration;
pub mod repository;
pub mod sendgrid;
pub mod server;
pub mod service;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
