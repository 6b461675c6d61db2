//! Exchange implementations - pluggable venue adapters

pub mod poloniex;
pub mod sim;

pub use poloniex::{PlxExchange, PlxMarket};
pub use sim::{SimExchange, SimMarket};
