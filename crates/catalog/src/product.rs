use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use storefront_core::{Decimal, ProductId, round_money};

/// A sellable catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Current list price, normalized to the money scale.
    pub price: Decimal,
}

impl Product {
    pub fn new(id: ProductId, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id,
            name: name.into(),
            price: round_money(price),
        }
    }
}

/// Read-only price lookup consumed by the order engine.
///
/// Returns `None` for products the catalog does not know; the caller turns
/// that into its unknown-product rejection.
pub trait Catalog: Send + Sync {
    fn price_of(&self, product_id: ProductId) -> Option<Decimal>;
}

impl<C> Catalog for Arc<C>
where
    C: Catalog + ?Sized,
{
    fn price_of(&self, product_id: ProductId) -> Option<Decimal> {
        (**self).price_of(product_id)
    }
}

/// In-memory catalog.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a product. The price is normalized to the money
    /// scale on the way in.
    pub fn upsert(&self, product: Product) {
        let normalized = Product {
            price: round_money(product.price),
            ..product
        };
        if let Ok(mut products) = self.products.write() {
            products.insert(normalized.id, normalized);
        }
    }

    pub fn get(&self, product_id: ProductId) -> Option<Product> {
        self.products
            .read()
            .ok()
            .and_then(|products| products.get(&product_id).cloned())
    }
}

impl Catalog for InMemoryCatalog {
    fn price_of(&self, product_id: ProductId) -> Option<Decimal> {
        self.products
            .read()
            .ok()
            .and_then(|products| products.get(&product_id).map(|p| p.price))
    }
}
