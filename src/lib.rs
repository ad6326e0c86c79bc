pub mod admin;
pub mod amount;
pub mod announcements;
pub mod config;
pub mod csv;
pub mod error;
pub mod ledger;
pub mod model;
pub mod payment;
pub mod platform;
pub mod qr;
pub mod registry;

pub use amount::Amount;
pub use config::Config;
pub use error::{Error, ErrorKind};
pub use platform::{Command, FlowOutcome, Outcome, Platform, PlatformHandle, RegistrationAttempt};
