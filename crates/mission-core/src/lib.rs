//! `mission-core`: configuration and the shared error type used by every
//! Mission Control crate.

pub mod config;
pub mod error;

pub use config::MissionConfig;
pub use error::{MissionError, Result};
