//! Postgres-backed order store.
//!
//! Row-level `FOR UPDATE` locks inside a SQL transaction provide the
//! serializable check-and-decrement: a competing reservation blocks on the
//! locked stock row until this transaction commits or aborts. Serialization
//! failures and deadlocks surface as `Conflict`, which the engine retries.

use sqlx::{PgPool, Postgres, Row, Transaction};
use tokio::runtime::Handle;
use uuid::Uuid;

use storefront_core::{Decimal, OrderError, OrderId, OrderResult, ProductId};
use storefront_orders::{Order, OrderLineItem, OrderStatus};
use storefront_stock::StockStore;

use super::r#trait::{OrderStore, StoreTx};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS stock (
    product_id UUID PRIMARY KEY,
    available_quantity BIGINT NOT NULL CHECK (available_quantity >= 0)
);

CREATE TABLE IF NOT EXISTS orders (
    id UUID PRIMARY KEY,
    user_id UUID NULL,
    delivery_id UUID NOT NULL,
    status TEXT NOT NULL,
    total_cost NUMERIC(40, 2) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS order_line_item (
    order_id UUID NOT NULL REFERENCES orders (id) ON DELETE CASCADE,
    product_id UUID NOT NULL,
    quantity BIGINT NOT NULL CHECK (quantity > 0),
    unit_price NUMERIC(20, 2) NOT NULL,
    cost NUMERIC(40, 2) NOT NULL,
    UNIQUE (order_id, product_id)
);
"#;

/// Postgres-backed [`OrderStore`].
///
/// Bridges the synchronous store traits over `Handle::block_on`, so calls
/// must come from a thread that is allowed to block (not from inside an
/// async runtime worker). Uses the SQLx connection pool, which is
/// thread-safe.
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the stock/orders/line-item tables if they do not exist yet.
    pub fn ensure_schema(&self) -> OrderResult<()> {
        let handle = current_handle()?;
        handle
            .block_on(sqlx::raw_sql(SCHEMA).execute(&self.pool))
            .map_err(map_sqlx_err)?;
        Ok(())
    }
}

impl OrderStore for PostgresOrderStore {
    type Tx<'a>
        = PostgresTx
    where
        Self: 'a;

    fn begin(&self) -> OrderResult<PostgresTx> {
        let handle = current_handle()?;
        let tx = handle
            .block_on(self.pool.begin())
            .map_err(map_sqlx_err)?;
        Ok(PostgresTx {
            tx: Some(tx),
            handle,
        })
    }
}

/// A SQL transaction; dropping it without commit issues a rollback.
pub struct PostgresTx {
    tx: Option<Transaction<'static, Postgres>>,
    handle: Handle,
}

impl PostgresTx {
    fn tx(&mut self) -> OrderResult<&mut Transaction<'static, Postgres>> {
        self.tx
            .as_mut()
            .ok_or_else(|| OrderError::storage("transaction already finished"))
    }
}

impl StockStore for PostgresTx {
    fn available(&mut self, product_id: ProductId) -> OrderResult<Option<i64>> {
        let handle = self.handle.clone();
        let tx = self.tx()?;
        let row = handle
            .block_on(
                sqlx::query(
                    "SELECT available_quantity FROM stock WHERE product_id = $1 FOR UPDATE",
                )
                .bind(*product_id.as_uuid())
                .fetch_optional(&mut **tx),
            )
            .map_err(map_sqlx_err)?;

        row.map(|row| row.try_get::<i64, _>("available_quantity"))
            .transpose()
            .map_err(map_sqlx_err)
    }

    fn set_available(&mut self, product_id: ProductId, quantity: i64) -> OrderResult<()> {
        let handle = self.handle.clone();
        let tx = self.tx()?;
        handle
            .block_on(
                sqlx::query("UPDATE stock SET available_quantity = $2 WHERE product_id = $1")
                    .bind(*product_id.as_uuid())
                    .bind(quantity)
                    .execute(&mut **tx),
            )
            .map_err(map_sqlx_err)?;
        Ok(())
    }
}

impl StoreTx for PostgresTx {
    fn create_stock(&mut self, product_id: ProductId, quantity: i64) -> OrderResult<()> {
        let handle = self.handle.clone();
        let tx = self.tx()?;
        handle
            .block_on(
                sqlx::query(
                    r#"
                    INSERT INTO stock (product_id, available_quantity)
                    VALUES ($1, $2)
                    ON CONFLICT (product_id)
                    DO UPDATE SET available_quantity = EXCLUDED.available_quantity
                    "#,
                )
                .bind(*product_id.as_uuid())
                .bind(quantity)
                .execute(&mut **tx),
            )
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    fn load_order(&mut self, order_id: OrderId) -> OrderResult<Option<Order>> {
        let handle = self.handle.clone();
        let tx = self.tx()?;

        let Some(row) = handle
            .block_on(
                sqlx::query(
                    r#"
                    SELECT id, user_id, delivery_id, status, total_cost, created_at, updated_at
                    FROM orders
                    WHERE id = $1
                    FOR UPDATE
                    "#,
                )
                .bind(*order_id.as_uuid())
                .fetch_optional(&mut **tx),
            )
            .map_err(map_sqlx_err)?
        else {
            return Ok(None);
        };

        let line_rows = handle
            .block_on(
                sqlx::query(
                    r#"
                    SELECT product_id, quantity, unit_price, cost
                    FROM order_line_item
                    WHERE order_id = $1
                    ORDER BY product_id
                    "#,
                )
                .bind(*order_id.as_uuid())
                .fetch_all(&mut **tx),
            )
            .map_err(map_sqlx_err)?;

        let mut lines = Vec::with_capacity(line_rows.len());
        for line in line_rows {
            lines.push(OrderLineItem {
                product_id: ProductId::from_uuid(
                    line.try_get::<Uuid, _>("product_id").map_err(map_sqlx_err)?,
                ),
                quantity: line.try_get("quantity").map_err(map_sqlx_err)?,
                unit_price: line
                    .try_get::<Decimal, _>("unit_price")
                    .map_err(map_sqlx_err)?,
                cost: line.try_get::<Decimal, _>("cost").map_err(map_sqlx_err)?,
            });
        }

        let status = status_from_str(&row.try_get::<String, _>("status").map_err(map_sqlx_err)?)?;

        Ok(Some(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id").map_err(map_sqlx_err)?),
            user_id: row
                .try_get::<Option<Uuid>, _>("user_id")
                .map_err(map_sqlx_err)?
                .map(storefront_core::UserId::from_uuid),
            delivery_id: storefront_core::DeliveryId::from_uuid(
                row.try_get::<Uuid, _>("delivery_id").map_err(map_sqlx_err)?,
            ),
            status,
            total_cost: row
                .try_get::<Decimal, _>("total_cost")
                .map_err(map_sqlx_err)?,
            created_at: row.try_get("created_at").map_err(map_sqlx_err)?,
            updated_at: row.try_get("updated_at").map_err(map_sqlx_err)?,
            lines,
        }))
    }

    fn save_order(&mut self, order: &Order) -> OrderResult<()> {
        let handle = self.handle.clone();
        let tx = self.tx()?;

        handle
            .block_on(
                sqlx::query(
                    r#"
                    INSERT INTO orders (id, user_id, delivery_id, status, total_cost, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    ON CONFLICT (id)
                    DO UPDATE SET
                        user_id = EXCLUDED.user_id,
                        delivery_id = EXCLUDED.delivery_id,
                        status = EXCLUDED.status,
                        total_cost = EXCLUDED.total_cost,
                        updated_at = EXCLUDED.updated_at
                    "#,
                )
                .bind(*order.id.as_uuid())
                .bind(order.user_id.map(|user_id| *user_id.as_uuid()))
                .bind(*order.delivery_id.as_uuid())
                .bind(status_to_str(order.status))
                .bind(order.total_cost)
                .bind(order.created_at)
                .bind(order.updated_at)
                .execute(&mut **tx),
            )
            .map_err(map_sqlx_err)?;

        // The order owns its line items: rewrite the set wholesale.
        handle
            .block_on(
                sqlx::query("DELETE FROM order_line_item WHERE order_id = $1")
                    .bind(*order.id.as_uuid())
                    .execute(&mut **tx),
            )
            .map_err(map_sqlx_err)?;

        for line in &order.lines {
            handle
                .block_on(
                    sqlx::query(
                        r#"
                        INSERT INTO order_line_item (order_id, product_id, quantity, unit_price, cost)
                        VALUES ($1, $2, $3, $4, $5)
                        "#,
                    )
                    .bind(*order.id.as_uuid())
                    .bind(*line.product_id.as_uuid())
                    .bind(line.quantity)
                    .bind(line.unit_price)
                    .bind(line.cost)
                    .execute(&mut **tx),
                )
                .map_err(map_sqlx_err)?;
        }

        Ok(())
    }

    fn commit(mut self) -> OrderResult<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| OrderError::storage("transaction already finished"))?;
        self.handle.block_on(tx.commit()).map_err(map_sqlx_err)
    }
}

fn current_handle() -> OrderResult<Handle> {
    Handle::try_current()
        .map_err(|_| OrderError::storage("no tokio runtime available for the postgres store"))
}

fn status_to_str(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Placed => "placed",
        OrderStatus::Paid => "paid",
        OrderStatus::Cancelled => "cancelled",
    }
}

fn status_from_str(status: &str) -> OrderResult<OrderStatus> {
    match status {
        "placed" => Ok(OrderStatus::Placed),
        "paid" => Ok(OrderStatus::Paid),
        "cancelled" => Ok(OrderStatus::Cancelled),
        other => Err(OrderError::storage(format!("unknown order status '{other}'"))),
    }
}

/// SQLSTATE 40001 (serialization_failure) and 40P01 (deadlock_detected) are
/// transient contention; everything else is a storage failure.
fn map_sqlx_err(err: sqlx::Error) -> OrderError {
    if let sqlx::Error::Database(db) = &err {
        if matches!(db.code().as_deref(), Some("40001") | Some("40P01")) {
            return OrderError::conflict(db.message().to_string());
        }
    }
    OrderError::storage(err.to_string())
}
