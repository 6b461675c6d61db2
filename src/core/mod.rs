//! Core module - common types, collaborator traits, config, and errors

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{AppConfig, TraderConfig};
pub use error::{Error, Result};
pub use traits::*;
pub use types::*;
