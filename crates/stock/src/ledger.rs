use storefront_core::{OrderError, OrderResult, ProductId};

/// Row access the enclosing storage transaction must provide.
///
/// Implementations expose the stock quantity of a product *as seen inside
/// the current transaction* (own writes included). The ledger never touches
/// rows any other way, so the read-check-write of a reservation stays one
/// atomically-isolated step.
pub trait StockStore {
    /// Available quantity for the product, `None` if no stock record exists.
    fn available(&mut self, product_id: ProductId) -> OrderResult<Option<i64>>;

    /// Overwrite the available quantity for an existing stock record.
    fn set_available(&mut self, product_id: ProductId, quantity: i64) -> OrderResult<()>;
}

/// Check-and-decrement stock operations over a storage transaction.
///
/// Borrows the transaction for its lifetime so stock mutations commit or
/// roll back together with the order write they accompany.
#[derive(Debug)]
pub struct StockLedger<'a, S: StockStore> {
    store: &'a mut S,
}

impl<'a, S: StockStore> StockLedger<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    /// Reserve `quantity` units, failing without side effects when the
    /// product is unknown, exhausted, or has less than requested.
    ///
    /// A reservation for exactly the available quantity succeeds and leaves
    /// the record at zero. Returns the new balance.
    pub fn reserve(&mut self, product_id: ProductId, quantity: i64) -> OrderResult<i64> {
        if quantity <= 0 {
            return Err(OrderError::invalid_quantity(product_id, quantity));
        }

        let available = self
            .store
            .available(product_id)?
            .ok_or(OrderError::UnknownProduct(product_id))?;

        if available == 0 {
            return Err(OrderError::OutOfStock(product_id));
        }
        if available < quantity {
            return Err(OrderError::insufficient_stock(
                product_id, quantity, available,
            ));
        }

        let remaining = available - quantity;
        self.store.set_available(product_id, remaining)?;
        tracing::debug!(%product_id, quantity, remaining, "stock reserved");
        Ok(remaining)
    }

    /// Return `quantity` units to the record. No upper bound is enforced.
    /// Returns the new balance.
    pub fn release(&mut self, product_id: ProductId, quantity: i64) -> OrderResult<i64> {
        if quantity <= 0 {
            return Err(OrderError::invalid_quantity(product_id, quantity));
        }

        let available = self
            .store
            .available(product_id)?
            .ok_or(OrderError::UnknownProduct(product_id))?;

        let remaining = available + quantity;
        self.store.set_available(product_id, remaining)?;
        tracing::debug!(%product_id, quantity, remaining, "stock released");
        Ok(remaining)
    }

    /// Signed adjustment for update flows: positive deltas reserve, negative
    /// deltas release, zero is a no-op returning the current balance.
    pub fn adjust(&mut self, product_id: ProductId, delta: i64) -> OrderResult<i64> {
        if delta > 0 {
            self.reserve(product_id, delta)
        } else if delta < 0 {
            self.release(product_id, -delta)
        } else {
            self.store
                .available(product_id)?
                .ok_or(OrderError::UnknownProduct(product_id))
        }
    }
}
