//! Email sending for Cartelia restaurants
//!
//! Three providers behind one trait:
//! - platform subdomain (shared SendGrid account)
//! - Gmail OAuth relay (restaurant's own mailbox over SMTP/XOAUTH2)
//! - SendGrid sub-account (restaurant's own domain)

pub mod factory;
pub mod gmail;
pub mod platform;
pub mod provider;
mod sendgrid_mail;
pub mod sendgrid_sub;
pub mod templates;

pub use factory::{DefaultEmailProviderFactory, EmailProviderFactory};
pub use gmail::{GmailRelayProvider, MailRelay, SmtpOAuthRelay};
pub use platform::PlatformSubdomainProvider;
pub use provider::{EmailProvider, EmailProviderError};
pub use sendgrid_sub::{provision_sub_account, SendGridSubAccountProvider, SubAccountRequest};
pub use templates::{EmailTemplate, RenderedEmail, TemplateEngine};
