//! Poloniex REST API client and wire types.

pub mod client;
pub mod model;

pub use client::{Credentials, PlxClient};
