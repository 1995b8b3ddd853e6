//! `storefront-catalog` — product catalog collaborator.
//!
//! The order engine only ever asks the catalog one question: "what does
//! product P cost right now?". Browsing, filtering and taxonomy live in the
//! surrounding application, not here.

pub mod product;

pub use product::{Catalog, InMemoryCatalog, Product};
