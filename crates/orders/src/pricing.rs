use serde::{Deserialize, Serialize};

use storefront_catalog::Catalog;
use storefront_core::{Decimal, OrderError, OrderResult, ProductId, round_money};

use crate::order::{LineRequest, OrderLineItem};

/// A line request resolved against the catalog: price snapshotted, cost
/// computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub cost: Decimal,
}

impl From<PricedLine> for OrderLineItem {
    fn from(line: PricedLine) -> Self {
        Self {
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            cost: line.cost,
        }
    }
}

/// Turns validated (product, quantity) requests into priced lines and a
/// total.
///
/// Pricing is the only point where the live catalog price is read; every
/// later recomputation works from the snapshot. Both the create and update
/// paths go through here, which keeps "price is a snapshot, not a live
/// join" in one place.
#[derive(Debug)]
pub struct LineItemAggregator<'a, C: Catalog> {
    catalog: &'a C,
}

impl<'a, C: Catalog> LineItemAggregator<'a, C> {
    pub fn new(catalog: &'a C) -> Self {
        Self { catalog }
    }

    /// Resolve each request's unit price via the catalog and compute its
    /// cost, in fixed-point decimal throughout. Fails when the catalog has
    /// no such product.
    pub fn price_lines(&self, requests: &[LineRequest]) -> OrderResult<Vec<PricedLine>> {
        requests
            .iter()
            .map(|request| {
                let price = self
                    .catalog
                    .price_of(request.product_id)
                    .ok_or(OrderError::UnknownProduct(request.product_id))?;
                let unit_price = round_money(price);
                Ok(PricedLine {
                    product_id: request.product_id,
                    quantity: request.quantity,
                    unit_price,
                    cost: unit_price * Decimal::from(request.quantity),
                })
            })
            .collect()
    }

    /// Sum of the lines' costs; exactly zero for an empty sequence, so a
    /// line-item-less order still has a well-defined total.
    pub fn total(&self, lines: &[PricedLine]) -> Decimal {
        lines
            .iter()
            .fold(Decimal::ZERO, |total, line| total + line.cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use storefront_catalog::{InMemoryCatalog, Product};

    fn test_product(catalog: &InMemoryCatalog, price: Decimal) -> ProductId {
        let id = ProductId::new();
        catalog.upsert(Product::new(id, "product", price));
        id
    }

    #[test]
    fn price_lines_snapshots_catalog_price_and_cost() {
        let catalog = InMemoryCatalog::new();
        let id = test_product(&catalog, dec!(19.99));
        let aggregator = LineItemAggregator::new(&catalog);

        let lines = aggregator
            .price_lines(&[LineRequest::new(id, 3)])
            .unwrap();

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].unit_price, dec!(19.99));
        assert_eq!(lines[0].cost, dec!(59.97));
    }

    #[test]
    fn price_lines_fails_on_unknown_product() {
        let catalog = InMemoryCatalog::new();
        let known = test_product(&catalog, dec!(10.00));
        let unknown = ProductId::new();
        let aggregator = LineItemAggregator::new(&catalog);

        let err = aggregator
            .price_lines(&[LineRequest::new(known, 1), LineRequest::new(unknown, 1)])
            .unwrap_err();

        assert_eq!(err, OrderError::UnknownProduct(unknown));
    }

    #[test]
    fn total_of_empty_lines_is_exactly_zero() {
        let catalog = InMemoryCatalog::new();
        let aggregator = LineItemAggregator::new(&catalog);

        assert_eq!(aggregator.total(&[]), Decimal::ZERO);
    }

    #[test]
    fn total_sums_costs_without_drift() {
        let catalog = InMemoryCatalog::new();
        let a = test_product(&catalog, dec!(19.99));
        let b = test_product(&catalog, dec!(0.10));
        let c = test_product(&catalog, dec!(0.20));
        let aggregator = LineItemAggregator::new(&catalog);

        let lines = aggregator
            .price_lines(&[
                LineRequest::new(a, 3),
                LineRequest::new(b, 1),
                LineRequest::new(c, 1),
            ])
            .unwrap();

        // 59.97 + 0.10 + 0.20: exact in decimal, classically wrong in binary
        // floating point.
        assert_eq!(aggregator.total(&lines), dec!(60.27));
    }

    #[test]
    fn snapshot_survives_later_catalog_changes() {
        let catalog = InMemoryCatalog::new();
        let id = test_product(&catalog, dec!(100.00));
        let aggregator = LineItemAggregator::new(&catalog);

        let lines = aggregator
            .price_lines(&[LineRequest::new(id, 2)])
            .unwrap();
        catalog.upsert(Product::new(id, "product", dec!(250.00)));

        assert_eq!(lines[0].unit_price, dec!(100.00));
        assert_eq!(lines[0].cost, dec!(200.00));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: the aggregated total equals the sum of
            /// `unit_price * quantity` for every priced line.
            #[test]
            fn total_equals_sum_of_line_costs(
                prices in proptest::collection::vec((1u64..100_000, 1i64..100), 1..12)
            ) {
                let catalog = InMemoryCatalog::new();
                let requests: Vec<LineRequest> = prices
                    .iter()
                    .map(|(cents, quantity)| {
                        let price = Decimal::new(*cents as i64, 2);
                        let id = ProductId::new();
                        catalog.upsert(Product::new(id, "product", price));
                        LineRequest::new(id, *quantity)
                    })
                    .collect();

                let aggregator = LineItemAggregator::new(&catalog);
                let lines = aggregator.price_lines(&requests).unwrap();

                let expected = lines
                    .iter()
                    .fold(Decimal::ZERO, |sum, line| {
                        sum + line.unit_price * Decimal::from(line.quantity)
                    });
                prop_assert_eq!(aggregator.total(&lines), expected);

                for line in &lines {
                    prop_assert_eq!(line.cost, line.unit_price * Decimal::from(line.quantity));
                }
            }
        }
    }
}
