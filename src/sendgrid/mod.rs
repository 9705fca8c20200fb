//! SendGrid v3 API client used by the platform and sub-account providers

pub mod client;
pub mod types;

pub use client::{SendGridClient, MAX_PERSONALIZATIONS};
pub use types::*;
