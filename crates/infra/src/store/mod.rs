//! Transactional order-store boundary.
//!
//! This module defines an infrastructure-facing abstraction for reading and
//! writing stock and order rows inside one atomic unit of work, without
//! making storage assumptions.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;
pub use r#trait::{OrderStore, StoreTx};
