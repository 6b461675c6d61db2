//! Tidebot - Core Library
//! Percentile-band mean-reversion trading for a single market

// Public modules
pub mod core;
pub mod exchanges;
pub mod plx_api;
pub mod scheduler;
pub mod store;
pub mod trading;

// Re-exports
pub use core::{AppConfig, Error, Result};
pub use trading::Trader;
