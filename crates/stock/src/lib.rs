//! `storefront-stock` — the single source of truth for "how many units of
//! product P are free to sell".
//!
//! [`StockLedger`] implements check-and-decrement semantics over whatever
//! storage transaction the caller is running; it never reads stock outside
//! the transaction that will also write it.

pub mod ledger;

pub use ledger::{StockLedger, StockStore};
