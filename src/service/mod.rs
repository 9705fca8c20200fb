//! Business logic layer

pub mod email;
pub mod email_setup;

pub use email::{EmailService, SendBulkRequest, SendEmailRequest};
pub use email_setup::{EmailSetupOption, EmailSetupRequest, EmailSetupResponse, EmailSetupService};
