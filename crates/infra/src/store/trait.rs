use std::sync::Arc;

use storefront_core::{OrderId, OrderResult, ProductId};
use storefront_orders::Order;
use storefront_stock::StockStore;

/// One atomic unit of work over stock and order rows.
///
/// A transaction sees its own uncommitted writes. Nothing becomes visible to
/// other transactions until [`StoreTx::commit`] returns `Ok`; dropping a
/// transaction without committing rolls every buffered write back. Stock
/// rows are reached through the [`StockStore`] seam so `StockLedger`'s
/// read-check-write stays inside the same unit of work as the order write
/// it accompanies.
///
/// ## Implementation requirements
///
/// - Reads and writes of the same row within one transaction must be
///   consistent (read-your-writes).
/// - Concurrent transactions touching the same rows must be serializable:
///   either block until the competing transaction finishes (lock-based) or
///   abort with [`storefront_core::OrderError::Conflict`] for the caller to
///   retry (optimistic). No interleaving may lose an update.
/// - `commit` is all-or-nothing; a failed commit leaves no partial state.
pub trait StoreTx: StockStore {
    /// Create a stock record for a product, or reset an existing one.
    /// Used by intake and fixtures; reservations never create records.
    fn create_stock(&mut self, product_id: ProductId, quantity: i64) -> OrderResult<()>;

    /// Load an order with its owned line items, locking it for this
    /// transaction.
    fn load_order(&mut self, order_id: OrderId) -> OrderResult<Option<Order>>;

    /// Insert or rewrite an order and its line items. Line items not present
    /// on `order` anymore are deleted (the order owns them).
    fn save_order(&mut self, order: &Order) -> OrderResult<()>;

    /// Commit all buffered writes.
    fn commit(self) -> OrderResult<()>;
}

/// Durable storage for stock and order rows, handing out transactions.
pub trait OrderStore: Send + Sync {
    type Tx<'a>: StoreTx
    where
        Self: 'a;

    /// Begin a transaction.
    fn begin(&self) -> OrderResult<Self::Tx<'_>>;
}

impl<S> OrderStore for Arc<S>
where
    S: OrderStore + ?Sized,
{
    type Tx<'a>
        = S::Tx<'a>
    where
        Self: 'a;

    fn begin(&self) -> OrderResult<Self::Tx<'_>> {
        (**self).begin()
    }
}
