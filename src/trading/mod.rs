//! Trading engine: percentile statistics, order ledgers, persisted state,
//! and the per-market decision loop.

pub mod ledger;
pub mod percentiles;
pub mod state;
pub mod trader;

pub use ledger::{OrderLedger, reconcile};
pub use state::{TraderState, state_key};
pub use trader::Trader;
