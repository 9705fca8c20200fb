//! Domain models for Cartelia Mail

pub mod email;
pub mod email_log;
pub mod quota;
pub mod restaurant;

pub use email::*;
pub use email_log::*;
pub use quota::*;
pub use restaurant::*;
