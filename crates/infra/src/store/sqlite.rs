//! SQLite-backed ledger store.
//!
//! ## Atomicity
//!
//! Each mutating operation runs inside one sqlx transaction. Writers are also
//! serialized through an in-process async gate, so the read-then-write inside
//! receive/issue/remove cannot interleave with another writer sharing this
//! handle (no lost updates). Write transactions open with `BEGIN IMMEDIATE`,
//! so writers on other handles or processes queue behind the busy timeout
//! rather than failing. `UNIQUE(name)` on both tables backstops the
//! name-keyed lookups.
//!
//! ## Thread Safety
//!
//! `SqliteLedgerStore` is `Clone + Send + Sync`; clones share the pool and the gate.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tokio::sync::Mutex;
use tracing::instrument;

use warehouse_core::{CategoryId, DomainError, Money, ProductId};
use warehouse_inventory::{
    plan_issue, plan_receive, plan_removal, AddCategory, Category, DeletePolicy, IssueOutcome,
    IssuePlan, IssueStock, Product, ProductListing, ReceiveOutcome, ReceivePlan, ReceiveStock,
    RemovalPlan, UpdateCategory, UpdateProduct,
};

use super::LedgerStore;
use crate::config::LedgerConfig;
use crate::error::{map_sqlx_error, LedgerResult};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS categories (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE,
    description TEXT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS products (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    name             TEXT NOT NULL UNIQUE,
    quantity         INTEGER NOT NULL CHECK (quantity > 0),
    unit_price_cents INTEGER NOT NULL CHECK (unit_price_cents >= 0),
    category_id      INTEGER NOT NULL REFERENCES categories(id),
    updated_at       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS products_category_id_idx ON products (category_id);
"#;

const LISTING_SELECT: &str = r#"
    SELECT
        p.id,
        p.name,
        p.quantity,
        p.unit_price_cents,
        p.category_id,
        p.updated_at,
        c.name AS category_name
    FROM products p
    LEFT JOIN categories c ON c.id = p.category_id
"#;

#[derive(Debug, Clone)]
pub struct SqliteLedgerStore {
    pool: SqlitePool,
    write_gate: Arc<Mutex<()>>,
}

impl SqliteLedgerStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Open a pool for `config.database_url` and create the schema.
    ///
    /// Foreign keys are enforced on every connection. In-memory databases are
    /// pinned to a single long-lived connection so the data survives.
    pub async fn connect(config: &LedgerConfig) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.database_url)
            .with_context(|| format!("invalid database url {:?}", config.database_url))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool_options = if config.is_in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(config.max_connections)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("failed to open SQLite pool at {:?}", config.database_url))?;

        let store = Self::new(pool);
        store
            .migrate()
            .await
            .context("failed to create ledger schema")?;
        Ok(store)
    }

    /// Create tables if absent. Idempotent.
    pub async fn migrate(&self) -> LedgerResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Start a write transaction holding the RESERVED lock from the first
    /// statement, so competing writers wait in the busy handler instead of
    /// failing a lock upgrade.
    async fn begin_write(&self, operation: &str) -> LedgerResult<Transaction<'static, Sqlite>> {
        self.pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(|e| map_sqlx_error(operation, e))
    }
}

fn decode_money(row: &SqliteRow, column: &str) -> Result<Money, sqlx::Error> {
    let cents: i64 = row.try_get(column)?;
    let cents = u64::try_from(cents).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
    Ok(Money::from_cents(cents))
}

fn encode_money(money: Money) -> i64 {
    // Money is capped at i64::MAX cents.
    i64::try_from(money.cents()).unwrap_or(i64::MAX)
}

fn category_from_row(row: &SqliteRow) -> Result<Category, sqlx::Error> {
    Ok(Category {
        id: CategoryId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
    })
}

fn product_from_row(row: &SqliteRow) -> Result<Product, sqlx::Error> {
    Ok(Product {
        id: ProductId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        quantity: row.try_get("quantity")?,
        unit_price: decode_money(row, "unit_price_cents")?,
        category_id: CategoryId::new(row.try_get("category_id")?),
        updated_at: row.try_get("updated_at")?,
    })
}

fn listing_from_row(row: &SqliteRow) -> Result<ProductListing, sqlx::Error> {
    Ok(ProductListing {
        id: ProductId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        quantity: row.try_get("quantity")?,
        unit_price: decode_money(row, "unit_price_cents")?,
        category_id: CategoryId::new(row.try_get("category_id")?),
        category_name: row.try_get("category_name")?,
        updated_at: row.try_get("updated_at")?,
    })
}

async fn fetch_category(conn: &mut SqliteConnection, id: CategoryId) -> LedgerResult<Option<Category>> {
    let row = sqlx::query(
        r#"
        SELECT id, name, description, created_at
        FROM categories
        WHERE id = ?1
        "#,
    )
    .bind(id.get())
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("fetch_category", e))?;

    row.as_ref()
        .map(category_from_row)
        .transpose()
        .map_err(|e| map_sqlx_error("decode_category", e))
}

async fn category_name_taken(
    conn: &mut SqliteConnection,
    name: &str,
    except: Option<CategoryId>,
) -> LedgerResult<bool> {
    let row = sqlx::query("SELECT id FROM categories WHERE name = ?1 AND id IS NOT ?2")
        .bind(name)
        .bind(except.map(CategoryId::get))
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("category_name_taken", e))?;
    Ok(row.is_some())
}

async fn require_category(conn: &mut SqliteConnection, id: CategoryId) -> LedgerResult<()> {
    match fetch_category(conn, id).await? {
        Some(_) => Ok(()),
        None => Err(DomainError::precondition(format!("no such category: {id}")).into()),
    }
}

async fn fetch_product_where(
    conn: &mut SqliteConnection,
    operation: &str,
    filter: &str,
    bind: ProductKey<'_>,
) -> LedgerResult<Option<Product>> {
    let sql = format!(
        r#"
        SELECT id, name, quantity, unit_price_cents, category_id, updated_at
        FROM products
        WHERE {filter}
        "#
    );
    let query = sqlx::query(&sql);
    let query = match bind {
        ProductKey::Id(id) => query.bind(id.get()),
        ProductKey::Name(name) => query.bind(name),
    };
    let row = query
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error(operation, e))?;

    row.as_ref()
        .map(product_from_row)
        .transpose()
        .map_err(|e| map_sqlx_error(operation, e))
}

enum ProductKey<'a> {
    Id(ProductId),
    Name(&'a str),
}

async fn fetch_product(conn: &mut SqliteConnection, id: ProductId) -> LedgerResult<Option<Product>> {
    fetch_product_where(conn, "fetch_product", "id = ?1", ProductKey::Id(id)).await
}

async fn fetch_product_by_name(conn: &mut SqliteConnection, name: &str) -> LedgerResult<Option<Product>> {
    fetch_product_where(conn, "fetch_product_by_name", "name = ?1", ProductKey::Name(name)).await
}

#[async_trait::async_trait]
impl LedgerStore for SqliteLedgerStore {
    #[instrument(skip(self), err)]
    async fn add_category(&self, cmd: AddCategory, now: DateTime<Utc>) -> LedgerResult<Category> {
        let cmd = cmd.validate()?;
        let _gate = self.write_gate.lock().await;
        let mut tx = self.begin_write("add_category").await?;

        if category_name_taken(&mut tx, &cmd.name, None).await? {
            return Err(DomainError::conflict(format!("category {:?} already exists", cmd.name)).into());
        }

        let result = sqlx::query(
            r#"
            INSERT INTO categories (name, description, created_at)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(&cmd.name)
        .bind(&cmd.description)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("add_category", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("add_category", e))?;

        Ok(Category {
            id: CategoryId::new(result.last_insert_rowid()),
            name: cmd.name,
            description: cmd.description,
            created_at: now,
        })
    }

    async fn list_categories(&self) -> LedgerResult<Vec<Category>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, description, created_at
            FROM categories
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_categories", e))?;

        rows.iter()
            .map(category_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("list_categories", e))
    }

    async fn get_category(&self, id: CategoryId) -> LedgerResult<Option<Category>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("get_category", e))?;
        fetch_category(&mut conn, id).await
    }

    #[instrument(skip(self), err)]
    async fn update_category(&self, cmd: UpdateCategory) -> LedgerResult<Category> {
        let cmd = cmd.validate()?;
        let _gate = self.write_gate.lock().await;
        let mut tx = self.begin_write("update_category").await?;

        let existing = fetch_category(&mut tx, cmd.id)
            .await?
            .ok_or_else(DomainError::not_found)?;
        if category_name_taken(&mut tx, &cmd.name, Some(cmd.id)).await? {
            return Err(DomainError::conflict(format!("category {:?} already exists", cmd.name)).into());
        }

        sqlx::query("UPDATE categories SET name = ?1, description = ?2 WHERE id = ?3")
            .bind(&cmd.name)
            .bind(&cmd.description)
            .bind(cmd.id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_category", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("update_category", e))?;

        Ok(Category {
            name: cmd.name,
            description: cmd.description,
            ..existing
        })
    }

    #[instrument(skip(self), err)]
    async fn remove_category(&self, id: CategoryId, policy: DeletePolicy) -> LedgerResult<usize> {
        let _gate = self.write_gate.lock().await;
        let mut tx = self.begin_write("remove_category").await?;

        let category = fetch_category(&mut tx, id)
            .await?
            .ok_or_else(DomainError::not_found)?;

        let row = sqlx::query("SELECT COUNT(*) AS dependents FROM products WHERE category_id = ?1")
            .bind(id.get())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("remove_category", e))?;
        let dependents: i64 = row
            .try_get("dependents")
            .map_err(|e| map_sqlx_error("remove_category", e))?;
        let dependents = usize::try_from(dependents).unwrap_or(0);

        if let RemovalPlan::Cascade { .. } = plan_removal(policy, &category, dependents)? {
            sqlx::query("DELETE FROM products WHERE category_id = ?1")
                .bind(id.get())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("remove_category", e))?;
        }

        sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("remove_category", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("remove_category", e))?;

        Ok(dependents)
    }

    #[instrument(skip(self), err)]
    async fn receive(&self, cmd: ReceiveStock, now: DateTime<Utc>) -> LedgerResult<ReceiveOutcome> {
        let cmd = cmd.validate()?;
        let unit_price = encode_money(cmd.unit_price);
        let _gate = self.write_gate.lock().await;
        let mut tx = self.begin_write("receive").await?;

        require_category(&mut tx, cmd.category_id).await?;
        let existing = fetch_product_by_name(&mut tx, &cmd.name).await?;

        let plan = plan_receive(existing.as_ref(), &cmd)?;
        let outcome = match plan {
            ReceivePlan::Create(new) => {
                let result = sqlx::query(
                    r#"
                    INSERT INTO products (name, quantity, unit_price_cents, category_id, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                )
                .bind(&new.name)
                .bind(new.quantity)
                .bind(unit_price)
                .bind(new.category_id.get())
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("receive", e))?;

                ReceiveOutcome::Created {
                    product: Product {
                        id: ProductId::new(result.last_insert_rowid()),
                        name: new.name,
                        quantity: new.quantity,
                        unit_price: new.unit_price,
                        category_id: new.category_id,
                        updated_at: now,
                    },
                }
            }
            ReceivePlan::Restock {
                id,
                quantity,
                unit_price: price,
            } => {
                sqlx::query(
                    r#"
                    UPDATE products
                    SET quantity = ?1, unit_price_cents = ?2, updated_at = ?3
                    WHERE id = ?4
                    "#,
                )
                .bind(quantity)
                .bind(unit_price)
                .bind(now)
                .bind(id.get())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("receive", e))?;

                let existing = existing.ok_or_else(DomainError::not_found)?;
                ReceiveOutcome::Restocked {
                    product: Product {
                        quantity,
                        unit_price: price,
                        updated_at: now,
                        ..existing
                    },
                }
            }
        };

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("receive", e))?;
        Ok(outcome)
    }

    #[instrument(skip(self), err)]
    async fn issue(&self, cmd: IssueStock, now: DateTime<Utc>) -> LedgerResult<IssueOutcome> {
        let _gate = self.write_gate.lock().await;
        let mut tx = self.begin_write("issue").await?;

        let existing = fetch_product(&mut tx, cmd.product_id).await?;
        let plan = plan_issue(existing.as_ref(), &cmd)?;
        let existing = existing.ok_or_else(DomainError::not_found)?;

        let outcome = match plan {
            IssuePlan::Deduct { id, remaining } => {
                sqlx::query("UPDATE products SET quantity = ?1, updated_at = ?2 WHERE id = ?3")
                    .bind(remaining)
                    .bind(now)
                    .bind(id.get())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("issue", e))?;
                IssueOutcome::Deducted {
                    product: Product {
                        quantity: remaining,
                        updated_at: now,
                        ..existing
                    },
                }
            }
            IssuePlan::Remove { id } => {
                sqlx::query("DELETE FROM products WHERE id = ?1")
                    .bind(id.get())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("issue", e))?;
                IssueOutcome::Depleted {
                    product_id: id,
                    name: existing.name,
                }
            }
        };

        tx.commit().await.map_err(|e| map_sqlx_error("issue", e))?;
        Ok(outcome)
    }

    async fn list_products(&self) -> LedgerResult<Vec<ProductListing>> {
        let sql = format!("{LISTING_SELECT} ORDER BY p.name ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;

        rows.iter()
            .map(listing_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("list_products", e))
    }

    async fn get_product(&self, id: ProductId) -> LedgerResult<Option<ProductListing>> {
        let sql = format!("{LISTING_SELECT} WHERE p.id = ?1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;

        row.as_ref()
            .map(listing_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("get_product", e))
    }

    #[instrument(skip(self), err)]
    async fn update_product(&self, cmd: UpdateProduct, now: DateTime<Utc>) -> LedgerResult<Product> {
        let cmd = cmd.validate()?;
        let unit_price = encode_money(cmd.unit_price);
        let _gate = self.write_gate.lock().await;
        let mut tx = self.begin_write("update_product").await?;

        if fetch_product(&mut tx, cmd.id).await?.is_none() {
            return Err(DomainError::not_found().into());
        }
        require_category(&mut tx, cmd.category_id).await?;
        if let Some(other) = fetch_product_by_name(&mut tx, &cmd.name).await? {
            if other.id != cmd.id {
                return Err(DomainError::conflict(format!("product {:?} already exists", cmd.name)).into());
            }
        }

        sqlx::query(
            r#"
            UPDATE products
            SET name = ?1, quantity = ?2, unit_price_cents = ?3, category_id = ?4, updated_at = ?5
            WHERE id = ?6
            "#,
        )
        .bind(&cmd.name)
        .bind(cmd.quantity)
        .bind(unit_price)
        .bind(cmd.category_id.get())
        .bind(now)
        .bind(cmd.id.get())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("update_product", e))?;

        Ok(Product {
            id: cmd.id,
            name: cmd.name,
            quantity: cmd.quantity,
            unit_price: cmd.unit_price,
            category_id: cmd.category_id,
            updated_at: now,
        })
    }

    #[instrument(skip(self), err)]
    async fn delete_product(&self, id: ProductId) -> LedgerResult<()> {
        let _gate = self.write_gate.lock().await;
        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found().into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteLedgerStore {
        SqliteLedgerStore::connect(&LedgerConfig::in_memory())
            .await
            .expect("in-memory sqlite")
    }

    #[tokio::test]
    async fn migrate_is_idempotent() {
        let store = store().await;
        store.migrate().await.unwrap();
        store.migrate().await.unwrap();
        assert!(store.list_categories().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn schema_refuses_orphan_products() {
        let store = store().await;
        let err = sqlx::query(
            "INSERT INTO products (name, quantity, unit_price_cents, category_id, updated_at) \
             VALUES ('Ghost', 1, 0, 999, '2024-01-01T00:00:00Z')",
        )
        .execute(store.pool())
        .await
        .map_err(|e| map_sqlx_error("insert", e))
        .unwrap_err();

        assert!(matches!(err.domain(), Some(DomainError::ReferentialIntegrity(_))));
    }

    #[tokio::test]
    async fn schema_refuses_zero_quantity() {
        let store = store().await;
        let category = store
            .add_category(AddCategory::new("Tools", None), Utc::now())
            .await
            .unwrap();
        let err = sqlx::query(
            "INSERT INTO products (name, quantity, unit_price_cents, category_id, updated_at) \
             VALUES ('Empty', 0, 0, ?1, '2024-01-01T00:00:00Z')",
        )
        .bind(category.id.get())
        .execute(store.pool())
        .await
        .map_err(|e| map_sqlx_error("insert", e))
        .unwrap_err();

        assert!(matches!(err.domain(), Some(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn listing_left_joins_category_name() {
        let store = store().await;
        let category = store
            .add_category(AddCategory::new("Tools", Some("hand tools")), Utc::now())
            .await
            .unwrap();
        store
            .receive(
                ReceiveStock {
                    name: "Hammer".to_string(),
                    category_id: category.id,
                    quantity: 3,
                    unit_price: Money::from_cents(1250),
                },
                Utc::now(),
            )
            .await
            .unwrap();

        let listings = store.list_products().await.unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].category_name.as_deref(), Some("Tools"));
        assert_eq!(listings[0].value(), Money::from_cents(3750));
    }
}
