use std::collections::BTreeSet;

use chrono::Utc;

use storefront_catalog::Catalog;
use storefront_core::{DeliveryId, OrderError, OrderId, OrderResult, UserId};
use storefront_orders::{LineItemAggregator, LineRequest, Order, OrderStatus, validate_requests};
use storefront_stock::StockLedger;

use crate::store::{OrderStore, StoreTx};

/// Retries granted to a transaction that aborts with `Conflict` before the
/// error is surfaced to the caller.
const DEFAULT_CONFLICT_RETRIES: u32 = 3;

/// The order state machine: create / update / cancel / confirm payment.
///
/// Every public operation runs as one storage transaction composing
/// `StockLedger` (reservations) and `LineItemAggregator` (price snapshots
/// and totals). Multi-step mutations are all-or-nothing: if any reservation
/// or adjustment fails, the transaction is dropped and nothing partial ever
/// becomes visible. Stock failures are surfaced verbatim, naming the product
/// and the available quantity — quantities are never silently clamped.
///
/// `Conflict` aborts from contending transactions are the one retried error:
/// the operation is re-run from scratch up to the retry bound, and the
/// caller only ever sees eventual success or a non-transient error.
#[derive(Debug)]
pub struct OrderEngine<S, C> {
    store: S,
    catalog: C,
    conflict_retries: u32,
}

impl<S, C> OrderEngine<S, C>
where
    S: OrderStore,
    C: Catalog,
{
    pub fn new(store: S, catalog: C) -> Self {
        Self {
            store,
            catalog,
            conflict_retries: DEFAULT_CONFLICT_RETRIES,
        }
    }

    /// Override the conflict retry bound.
    pub fn with_conflict_retries(mut self, retries: u32) -> Self {
        self.conflict_retries = retries;
        self
    }

    /// Place a new order: reserve stock for every line, snapshot prices,
    /// persist the order with its total.
    pub fn create(
        &self,
        requests: &[LineRequest],
        delivery_id: DeliveryId,
        user_id: Option<UserId>,
    ) -> OrderResult<Order> {
        validate_requests(requests)?;

        let order = self.with_retries(|| self.try_create(requests, delivery_id, user_id))?;
        tracing::info!(
            order_id = %order.id,
            lines = order.lines.len(),
            total_cost = %order.total_cost,
            "order placed"
        );
        Ok(order)
    }

    /// Re-synchronize a placed order with a new line-item set, adjusting
    /// stock by per-product deltas and rewriting line items.
    pub fn update(&self, order_id: OrderId, requests: &[LineRequest]) -> OrderResult<Order> {
        validate_requests(requests)?;

        let order = self.with_retries(|| self.try_update(order_id, requests))?;
        tracing::info!(
            order_id = %order.id,
            lines = order.lines.len(),
            total_cost = %order.total_cost,
            "order updated"
        );
        Ok(order)
    }

    /// Cancel a placed order, releasing every reserved line back to stock.
    /// Cancelling an already-cancelled order is a no-op.
    pub fn cancel(&self, order_id: OrderId) -> OrderResult<()> {
        self.with_retries(|| self.try_cancel(order_id))
    }

    /// Mark a placed order as paid. Does not touch stock; the reservation
    /// was committed at placement time.
    pub fn confirm_payment(&self, order_id: OrderId) -> OrderResult<Order> {
        self.with_retries(|| self.try_confirm_payment(order_id))
    }

    fn with_retries<T>(&self, op: impl Fn() -> OrderResult<T>) -> OrderResult<T> {
        let mut attempt = 0;
        loop {
            match op() {
                Err(OrderError::Conflict(reason)) if attempt < self.conflict_retries => {
                    attempt += 1;
                    tracing::warn!(attempt, reason = %reason, "transaction conflict, retrying");
                }
                other => return other,
            }
        }
    }

    fn try_create(
        &self,
        requests: &[LineRequest],
        delivery_id: DeliveryId,
        user_id: Option<UserId>,
    ) -> OrderResult<Order> {
        let mut tx = self.store.begin()?;

        let mut ledger = StockLedger::new(&mut tx);
        for request in requests {
            ledger.reserve(request.product_id, request.quantity)?;
        }

        let aggregator = LineItemAggregator::new(&self.catalog);
        let lines = aggregator.price_lines(requests)?;
        let total_cost = aggregator.total(&lines);

        let now = Utc::now();
        let order = Order {
            id: OrderId::new(),
            user_id,
            delivery_id,
            status: OrderStatus::Placed,
            total_cost,
            created_at: now,
            updated_at: now,
            lines: lines.into_iter().map(Into::into).collect(),
        };

        tx.save_order(&order)?;
        tx.commit()?;
        Ok(order)
    }

    fn try_update(&self, order_id: OrderId, requests: &[LineRequest]) -> OrderResult<Order> {
        let mut tx = self.store.begin()?;

        let mut order = tx.load_order(order_id)?.ok_or(OrderError::NotFound)?;
        match order.status {
            OrderStatus::Placed => {}
            OrderStatus::Paid => {
                return Err(OrderError::invalid_transition(
                    "paid orders cannot be updated",
                ));
            }
            OrderStatus::Cancelled => {
                return Err(OrderError::invalid_transition(
                    "cancelled orders cannot be updated",
                ));
            }
        }

        // Every product on either side of the update participates with
        // delta = requested - currently held (absent side counts as zero).
        let mut products: BTreeSet<_> = order.lines.iter().map(|line| line.product_id).collect();
        products.extend(requests.iter().map(|request| request.product_id));

        let mut ledger = StockLedger::new(&mut tx);
        for product_id in products {
            let current = order.line_quantity(product_id);
            let requested = requests
                .iter()
                .find(|request| request.product_id == product_id)
                .map(|request| request.quantity)
                .unwrap_or(0);
            ledger.adjust(product_id, requested - current)?;
        }

        let aggregator = LineItemAggregator::new(&self.catalog);
        let lines = aggregator.price_lines(requests)?;
        order.total_cost = aggregator.total(&lines);
        order.lines = lines.into_iter().map(Into::into).collect();
        order.updated_at = Utc::now();

        tx.save_order(&order)?;
        tx.commit()?;
        Ok(order)
    }

    fn try_cancel(&self, order_id: OrderId) -> OrderResult<()> {
        let mut tx = self.store.begin()?;

        let mut order = tx.load_order(order_id)?.ok_or(OrderError::NotFound)?;
        match order.status {
            OrderStatus::Placed => {}
            // Idempotent: a second cancel must not release stock again.
            OrderStatus::Cancelled => return Ok(()),
            OrderStatus::Paid => {
                return Err(OrderError::invalid_transition(
                    "paid orders cannot be cancelled",
                ));
            }
        }

        let mut ledger = StockLedger::new(&mut tx);
        for line in &order.lines {
            ledger.release(line.product_id, line.quantity)?;
        }

        order.status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();
        tx.save_order(&order)?;
        tx.commit()?;

        tracing::info!(order_id = %order_id, "order cancelled");
        Ok(())
    }

    fn try_confirm_payment(&self, order_id: OrderId) -> OrderResult<Order> {
        let mut tx = self.store.begin()?;

        let mut order = tx.load_order(order_id)?.ok_or(OrderError::NotFound)?;
        match order.status {
            OrderStatus::Placed => {}
            // Re-confirming a paid order is a no-op, not an error.
            OrderStatus::Paid => return Ok(order),
            OrderStatus::Cancelled => {
                return Err(OrderError::invalid_transition(
                    "cannot confirm payment on a cancelled order",
                ));
            }
        }

        order.status = OrderStatus::Paid;
        order.updated_at = Utc::now();
        tx.save_order(&order)?;
        tx.commit()?;

        tracing::info!(order_id = %order_id, "payment confirmed");
        Ok(order)
    }
}
