use criterion::{Criterion, black_box, criterion_group, criterion_main};

use std::sync::Arc;

use rust_decimal_macros::dec;

use storefront_catalog::{InMemoryCatalog, Product};
use storefront_core::{DeliveryId, ProductId};
use storefront_infra::store::{InMemoryOrderStore, OrderStore, StoreTx};
use storefront_infra::OrderEngine;
use storefront_orders::LineRequest;

fn seeded_engine(
    products: usize,
    stock_each: i64,
) -> (
    OrderEngine<Arc<InMemoryOrderStore>, Arc<InMemoryCatalog>>,
    Vec<ProductId>,
) {
    let store = Arc::new(InMemoryOrderStore::new());
    let catalog = Arc::new(InMemoryCatalog::new());

    let mut ids = Vec::with_capacity(products);
    let mut tx = store.begin().unwrap();
    for i in 0..products {
        let id = ProductId::new();
        catalog.upsert(Product::new(id, format!("product-{i}"), dec!(19.99)));
        tx.create_stock(id, stock_each).unwrap();
        ids.push(id);
    }
    tx.commit().unwrap();

    (OrderEngine::new(store, catalog), ids)
}

fn bench_create(c: &mut Criterion) {
    let (engine, ids) = seeded_engine(8, i64::MAX / 2);
    let requests: Vec<LineRequest> = ids
        .iter()
        .map(|id| LineRequest::new(*id, 2))
        .collect();

    c.bench_function("create_order_8_lines", |b| {
        b.iter(|| {
            let order = engine
                .create(black_box(&requests), DeliveryId::new(), None)
                .unwrap();
            black_box(order)
        })
    });
}

fn bench_update_noop(c: &mut Criterion) {
    let (engine, ids) = seeded_engine(8, i64::MAX / 2);
    let requests: Vec<LineRequest> = ids
        .iter()
        .map(|id| LineRequest::new(*id, 2))
        .collect();
    let order = engine
        .create(&requests, DeliveryId::new(), None)
        .unwrap();

    c.bench_function("update_order_identical_lines", |b| {
        b.iter(|| {
            let updated = engine
                .update(black_box(order.id), black_box(&requests))
                .unwrap();
            black_box(updated)
        })
    });
}

fn bench_place_and_cancel(c: &mut Criterion) {
    let (engine, ids) = seeded_engine(1, i64::MAX / 2);
    let requests = vec![LineRequest::new(ids[0], 1)];

    c.bench_function("place_then_cancel", |b| {
        b.iter(|| {
            let order = engine
                .create(black_box(&requests), DeliveryId::new(), None)
                .unwrap();
            engine.cancel(order.id).unwrap();
        })
    });
}

criterion_group!(benches, bench_create, bench_update_noop, bench_place_and_cancel);
criterion_main!(benches);
