//! Domain error model.

use thiserror::Error;

use crate::id::ProductId;

/// Result type used across the domain layer.
pub type OrderResult<T> = Result<T, OrderError>;

/// Domain-level error.
///
/// Keep this focused on deterministic business failures (validation,
/// stock rejections, lifecycle violations). Every stock rejection names the
/// offending product and, where relevant, the actually-available quantity so
/// callers can render a precise message without re-querying.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// An order request carried no lines at all.
    #[error("order must contain at least one line")]
    EmptyOrder,

    /// The same product appeared more than once in one request.
    #[error("product {0} appears more than once in the request")]
    DuplicateProduct(ProductId),

    /// A requested quantity was zero or negative.
    #[error("invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity {
        product_id: ProductId,
        quantity: i64,
    },

    /// No catalog entry or stock record exists for the product.
    #[error("unknown product {0}")]
    UnknownProduct(ProductId),

    /// Nothing left to sell for the product.
    #[error("product {0} is out of stock")]
    OutOfStock(ProductId),

    /// Some stock remains, but less than requested.
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    /// A requested order does not exist.
    #[error("order not found")]
    NotFound,

    /// An identifier failed to parse.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A value failed validation (e.g. malformed contact info).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Transient contention on shared rows; retried internally before being
    /// surfaced.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A lifecycle transition that the order's current state forbids.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// Storage-layer failure outside the business taxonomy.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl OrderError {
    pub fn invalid_quantity(product_id: ProductId, quantity: i64) -> Self {
        Self::InvalidQuantity {
            product_id,
            quantity,
        }
    }

    pub fn insufficient_stock(product_id: ProductId, requested: i64, available: i64) -> Self {
        Self::InsufficientStock {
            product_id,
            requested,
            available,
        }
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Whether the error is transient contention worth retrying.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}
