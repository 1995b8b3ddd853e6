//! `storefront-orders` — order model and line-item aggregation.
//!
//! An order owns its line items; each line item snapshots the catalog price
//! at reservation time so historical orders are immune to later price
//! changes. Total cost is always the sum of line costs, recomputed
//! explicitly by [`pricing::LineItemAggregator`] — never by a save-time side
//! effect.

pub mod delivery;
pub mod order;
pub mod pricing;

pub use delivery::Delivery;
pub use order::{LineRequest, Order, OrderLineItem, OrderStatus, validate_requests};
pub use pricing::{LineItemAggregator, PricedLine};
