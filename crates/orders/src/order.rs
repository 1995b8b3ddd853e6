use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{Decimal, DeliveryId, OrderError, OrderId, OrderResult, ProductId, UserId};

/// Order status lifecycle.
///
/// `Placed` orders hold stock reservations; `Paid` and `Cancelled` are
/// terminal. Cancellation releases stock but keeps the rows — it is a state,
/// not a deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Placed,
    Paid,
    Cancelled,
}

/// One (product, quantity, price-snapshot) entry belonging to an order.
///
/// `unit_price` is the catalog price at the moment the stock was reserved;
/// `cost` is always `unit_price * quantity`. Within one order, at most one
/// line references a given product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub cost: Decimal,
}

/// A persisted order with its owned line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Absent for orders placed by an unauthenticated buyer.
    pub user_id: Option<UserId>,
    pub delivery_id: DeliveryId,
    pub status: OrderStatus,
    /// Always equal to the sum of the line items' costs.
    pub total_cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub lines: Vec<OrderLineItem>,
}

impl Order {
    pub fn paid(&self) -> bool {
        self.status == OrderStatus::Paid
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == OrderStatus::Cancelled
    }

    /// Quantity currently held for a product, zero if the order has no line
    /// for it.
    pub fn line_quantity(&self, product_id: ProductId) -> i64 {
        self.lines
            .iter()
            .find(|line| line.product_id == product_id)
            .map(|line| line.quantity)
            .unwrap_or(0)
    }
}

/// One requested (product, quantity) pair, before pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl LineRequest {
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Structural validation shared by create and update.
///
/// Rejects empty requests, non-positive quantities, and requests naming the
/// same product twice. Runs before any stock or storage work, so a rejection
/// here has no side effects.
pub fn validate_requests(requests: &[LineRequest]) -> OrderResult<()> {
    if requests.is_empty() {
        return Err(OrderError::EmptyOrder);
    }

    let mut seen = HashSet::with_capacity(requests.len());
    for request in requests {
        if request.quantity <= 0 {
            return Err(OrderError::invalid_quantity(
                request.product_id,
                request.quantity,
            ));
        }
        if !seen.insert(request.product_id) {
            return Err(OrderError::DuplicateProduct(request.product_id));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_product_id() -> ProductId {
        ProductId::new()
    }

    fn test_order() -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::new(),
            user_id: None,
            delivery_id: DeliveryId::new(),
            status: OrderStatus::Placed,
            total_cost: dec!(59.97),
            created_at: now,
            updated_at: now,
            lines: vec![OrderLineItem {
                product_id: test_product_id(),
                quantity: 3,
                unit_price: dec!(19.99),
                cost: dec!(59.97),
            }],
        }
    }

    #[test]
    fn empty_request_is_rejected() {
        assert_eq!(validate_requests(&[]).unwrap_err(), OrderError::EmptyOrder);
    }

    #[test]
    fn duplicate_products_are_rejected() {
        let product_id = test_product_id();
        let requests = vec![
            LineRequest::new(product_id, 1),
            LineRequest::new(test_product_id(), 2),
            LineRequest::new(product_id, 3),
        ];

        assert_eq!(
            validate_requests(&requests).unwrap_err(),
            OrderError::DuplicateProduct(product_id)
        );
    }

    #[test]
    fn non_positive_quantities_are_rejected() {
        let product_id = test_product_id();

        assert_eq!(
            validate_requests(&[LineRequest::new(product_id, 0)]).unwrap_err(),
            OrderError::invalid_quantity(product_id, 0)
        );
        assert_eq!(
            validate_requests(&[LineRequest::new(product_id, -1)]).unwrap_err(),
            OrderError::invalid_quantity(product_id, -1)
        );
    }

    #[test]
    fn distinct_products_pass_validation() {
        let requests = vec![
            LineRequest::new(test_product_id(), 1),
            LineRequest::new(test_product_id(), 5),
        ];

        assert!(validate_requests(&requests).is_ok());
    }

    #[test]
    fn line_quantity_defaults_to_zero() {
        let order = test_order();
        let present = order.lines[0].product_id;

        assert_eq!(order.line_quantity(present), 3);
        assert_eq!(order.line_quantity(test_product_id()), 0);
    }

    #[test]
    fn status_accessors() {
        let mut order = test_order();
        assert!(!order.paid());
        assert!(!order.is_cancelled());

        order.status = OrderStatus::Paid;
        assert!(order.paid());

        order.status = OrderStatus::Cancelled;
        assert!(order.is_cancelled());
        assert!(!order.paid());
    }
}
