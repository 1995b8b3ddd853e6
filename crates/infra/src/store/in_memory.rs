use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use storefront_core::{OrderError, OrderId, OrderResult, ProductId};
use storefront_orders::Order;
use storefront_stock::StockStore;

use super::r#trait::{OrderStore, StoreTx};

#[derive(Debug, Default)]
struct State {
    stock: HashMap<ProductId, i64>,
    orders: HashMap<OrderId, Order>,
}

/// In-memory order store.
///
/// Intended for tests/dev. A transaction holds the store lock for its whole
/// lifetime, so transactions execute one at a time: competing callers block
/// until the holder commits or rolls back, which trivially satisfies the
/// serializability requirement. Writes are buffered in the transaction and
/// applied on commit.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    state: Mutex<State>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted orders. Diagnostic helper for tests/dev.
    pub fn order_count(&self) -> usize {
        self.state.lock().map(|state| state.orders.len()).unwrap_or(0)
    }
}

impl OrderStore for InMemoryOrderStore {
    type Tx<'a>
        = InMemoryTx<'a>
    where
        Self: 'a;

    fn begin(&self) -> OrderResult<InMemoryTx<'_>> {
        let state = self
            .state
            .lock()
            .map_err(|_| OrderError::storage("lock poisoned"))?;
        Ok(InMemoryTx {
            state,
            stock_writes: HashMap::new(),
            order_writes: HashMap::new(),
        })
    }
}

/// A buffered transaction over [`InMemoryOrderStore`].
#[derive(Debug)]
pub struct InMemoryTx<'a> {
    state: MutexGuard<'a, State>,
    stock_writes: HashMap<ProductId, i64>,
    order_writes: HashMap<OrderId, Order>,
}

impl StockStore for InMemoryTx<'_> {
    fn available(&mut self, product_id: ProductId) -> OrderResult<Option<i64>> {
        if let Some(quantity) = self.stock_writes.get(&product_id) {
            return Ok(Some(*quantity));
        }
        Ok(self.state.stock.get(&product_id).copied())
    }

    fn set_available(&mut self, product_id: ProductId, quantity: i64) -> OrderResult<()> {
        self.stock_writes.insert(product_id, quantity);
        Ok(())
    }
}

impl StoreTx for InMemoryTx<'_> {
    fn create_stock(&mut self, product_id: ProductId, quantity: i64) -> OrderResult<()> {
        self.stock_writes.insert(product_id, quantity);
        Ok(())
    }

    fn load_order(&mut self, order_id: OrderId) -> OrderResult<Option<Order>> {
        if let Some(order) = self.order_writes.get(&order_id) {
            return Ok(Some(order.clone()));
        }
        Ok(self.state.orders.get(&order_id).cloned())
    }

    fn save_order(&mut self, order: &Order) -> OrderResult<()> {
        self.order_writes.insert(order.id, order.clone());
        Ok(())
    }

    fn commit(self) -> OrderResult<()> {
        let InMemoryTx {
            mut state,
            stock_writes,
            order_writes,
        } = self;

        for (product_id, quantity) in stock_writes {
            state.stock.insert(product_id, quantity);
        }
        for (order_id, order) in order_writes {
            state.orders.insert(order_id, order);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use storefront_core::{DeliveryId, Decimal};
    use storefront_orders::{OrderLineItem, OrderStatus};

    fn test_product_id() -> ProductId {
        ProductId::new()
    }

    fn test_order(total: Decimal) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::new(),
            user_id: None,
            delivery_id: DeliveryId::new(),
            status: OrderStatus::Placed,
            total_cost: total,
            created_at: now,
            updated_at: now,
            lines: vec![OrderLineItem {
                product_id: test_product_id(),
                quantity: 1,
                unit_price: total,
                cost: total,
            }],
        }
    }

    #[test]
    fn committed_writes_are_visible_to_later_transactions() {
        let store = InMemoryOrderStore::new();
        let product_id = test_product_id();

        let mut tx = store.begin().unwrap();
        tx.create_stock(product_id, 7).unwrap();
        tx.commit().unwrap();

        let mut tx = store.begin().unwrap();
        assert_eq!(tx.available(product_id).unwrap(), Some(7));
    }

    #[test]
    fn transaction_sees_its_own_writes() {
        let store = InMemoryOrderStore::new();
        let product_id = test_product_id();

        let mut tx = store.begin().unwrap();
        tx.create_stock(product_id, 5).unwrap();
        tx.set_available(product_id, 3).unwrap();
        assert_eq!(tx.available(product_id).unwrap(), Some(3));

        let order = test_order(dec!(10.00));
        tx.save_order(&order).unwrap();
        assert_eq!(tx.load_order(order.id).unwrap(), Some(order));
    }

    #[test]
    fn dropped_transaction_rolls_back() {
        let store = InMemoryOrderStore::new();
        let product_id = test_product_id();

        let mut tx = store.begin().unwrap();
        tx.create_stock(product_id, 5).unwrap();
        tx.commit().unwrap();

        let order = test_order(dec!(10.00));
        {
            let mut tx = store.begin().unwrap();
            tx.set_available(product_id, 1).unwrap();
            tx.save_order(&order).unwrap();
            // No commit.
        }

        let mut tx = store.begin().unwrap();
        assert_eq!(tx.available(product_id).unwrap(), Some(5));
        assert_eq!(tx.load_order(order.id).unwrap(), None);
        assert_eq!(store.order_count(), 0);
    }

    #[test]
    fn order_roundtrip_preserves_lines() {
        let store = InMemoryOrderStore::new();
        let order = test_order(dec!(42.42));

        let mut tx = store.begin().unwrap();
        tx.save_order(&order).unwrap();
        tx.commit().unwrap();

        let mut tx = store.begin().unwrap();
        let loaded = tx.load_order(order.id).unwrap().unwrap();
        assert_eq!(loaded, order);
        assert_eq!(loaded.lines.len(), 1);
    }

    #[test]
    fn unknown_rows_read_as_absent() {
        let store = InMemoryOrderStore::new();

        let mut tx = store.begin().unwrap();
        assert_eq!(tx.available(test_product_id()).unwrap(), None);
        assert_eq!(tx.load_order(OrderId::new()).unwrap(), None);
    }
}
