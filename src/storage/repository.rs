use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::domain::{
    Expense, LineItem, PaymentMethod, Product, ProductId, Quantity, SaleStatus, Transaction,
    TransactionId,
};

use super::{MIGRATION_001_INITIAL, MIGRATION_002_EXPENSES, Store, StoreError};

const PRODUCT_COLUMNS: &str = "id, name, price_cents, quantity, low_stock_threshold, barcode, description, category, expiry_date, created_at, updated_at";

const EXPIRY_DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite-backed store for the catalog, the sales ledger and expenses.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database URL, e.g. `sqlite:shop.db?mode=rwc`.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations. Safe to run more than once.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        sqlx::raw_sql(MIGRATION_002_EXPENSES)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 002")?;

        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    async fn fetch_product(conn: &mut SqliteConnection, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(conn)
        .await
        .context("Failed to fetch product")?;

        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn current_stock(conn: &mut SqliteConnection, id: ProductId) -> Result<Option<i64>> {
        sqlx::query_scalar::<_, i64>("SELECT quantity FROM products WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(conn)
            .await
            .context("Failed to read stock level")
    }

    /// Explain why a guarded decrement matched no row.
    async fn stock_shortfall(
        conn: &mut SqliteConnection,
        id: ProductId,
        requested: Quantity,
    ) -> StoreError {
        match Self::current_stock(conn, id).await {
            Ok(Some(available)) => StoreError::InsufficientStock {
                product_id: id,
                available,
                requested,
            },
            Ok(None) => StoreError::ProductNotFound(id),
            Err(e) => StoreError::Backend(e),
        }
    }

    /// Explain why a guarded restock matched no row.
    async fn stock_overflow(
        conn: &mut SqliteConnection,
        id: ProductId,
        added: Quantity,
    ) -> StoreError {
        match Self::current_stock(conn, id).await {
            Ok(Some(current)) => StoreError::StockOverflow {
                product_id: id,
                current,
                added,
            },
            Ok(None) => StoreError::ProductNotFound(id),
            Err(e) => StoreError::Backend(e),
        }
    }

    /// Take the next ledger sequence number inside the caller's transaction.
    async fn next_sequence(conn: &mut SqliteConnection) -> Result<i64> {
        let row = sqlx::query(
            r#"
            UPDATE sequence_counter
            SET value = value + 1
            WHERE name = 'transaction_sequence'
            RETURNING value
            "#,
        )
        .fetch_one(conn)
        .await
        .context("Failed to get next sequence number")?;

        Ok(row.get("value"))
    }

    /// Load transactions and their items from one read snapshot.
    /// `filter` is a fixed SQL fragment over the `t` (transactions) alias.
    async fn load_transactions(&self, filter: &'static str) -> Result<Vec<Transaction>> {
        let mut tx = self.pool.begin().await.context("Failed to begin read")?;

        let rows = sqlx::query(&format!(
            "SELECT t.id, t.sequence, t.created_at, t.total_cents, t.payment_method, t.status \
             FROM transactions t {filter} ORDER BY t.sequence DESC"
        ))
        .fetch_all(&mut *tx)
        .await
        .context("Failed to list transactions")?;

        let item_rows = sqlx::query(&format!(
            "SELECT ti.transaction_id, ti.product_id, ti.product_name, ti.unit_price_cents, ti.quantity \
             FROM transaction_items ti JOIN transactions t ON t.id = ti.transaction_id \
             {filter} ORDER BY ti.transaction_id, ti.position"
        ))
        .fetch_all(&mut *tx)
        .await
        .context("Failed to list transaction items")?;

        tx.commit().await.context("Failed to end read")?;

        let mut items_by_transaction: HashMap<String, Vec<LineItem>> = HashMap::new();
        for row in &item_rows {
            let transaction_id: String = row.get("transaction_id");
            items_by_transaction
                .entry(transaction_id)
                .or_default()
                .push(Self::row_to_line_item(row)?);
        }

        rows.iter()
            .map(|row| {
                let id: String = row.get("id");
                let items = items_by_transaction.remove(&id).unwrap_or_default();
                Self::row_to_transaction(row, items)
            })
            .collect()
    }

    fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product> {
        let id_str: String = row.get("id");
        let expiry_str: Option<String> = row.get("expiry_date");
        let created_at_str: String = row.get("created_at");
        let updated_at_str: String = row.get("updated_at");

        Ok(Product {
            id: Uuid::parse_str(&id_str).context("Invalid product ID")?,
            name: row.get("name"),
            price_cents: row.get("price_cents"),
            quantity: row.get("quantity"),
            low_stock_threshold: row.get("low_stock_threshold"),
            barcode: row.get("barcode"),
            description: row.get("description"),
            category: row.get("category"),
            expiry_date: expiry_str
                .map(|s| NaiveDate::parse_from_str(&s, EXPIRY_DATE_FORMAT))
                .transpose()
                .context("Invalid expiry date")?,
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at")?,
            updated_at: parse_timestamp(&updated_at_str).context("Invalid updated_at")?,
        })
    }

    fn row_to_line_item(row: &sqlx::sqlite::SqliteRow) -> Result<LineItem> {
        let product_id_str: String = row.get("product_id");

        Ok(LineItem {
            product_id: Uuid::parse_str(&product_id_str).context("Invalid line item product ID")?,
            name: row.get("product_name"),
            unit_price_cents: row.get("unit_price_cents"),
            quantity: row.get("quantity"),
        })
    }

    fn row_to_transaction(
        row: &sqlx::sqlite::SqliteRow,
        items: Vec<LineItem>,
    ) -> Result<Transaction> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");
        let payment_str: String = row.get("payment_method");
        let status_str: String = row.get("status");

        Ok(Transaction {
            id: Uuid::parse_str(&id_str).context("Invalid transaction ID")?,
            sequence: row.get("sequence"),
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at")?,
            items,
            total_cents: row.get("total_cents"),
            payment_method: PaymentMethod::from_str(&payment_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid payment method: {}", payment_str))?,
            status: SaleStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid sale status: {}", status_str))?,
        })
    }

    fn row_to_expense(row: &sqlx::sqlite::SqliteRow) -> Result<Expense> {
        let id_str: String = row.get("id");
        let date_str: String = row.get("date");
        let created_at_str: String = row.get("created_at");

        Ok(Expense {
            id: Uuid::parse_str(&id_str).context("Invalid expense ID")?,
            description: row.get("description"),
            category: row.get("category"),
            amount_cents: row.get("amount_cents"),
            date: parse_timestamp(&date_str).context("Invalid expense date")?,
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at")?,
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

/// A UNIQUE violation on `products.barcode` becomes `DuplicateBarcode`.
fn product_write_error(
    err: sqlx::Error,
    product: &Product,
    context: &'static str,
) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() && db_err.message().contains("products.barcode") {
            return StoreError::DuplicateBarcode(product.barcode.clone().unwrap_or_default());
        }
    }
    StoreError::Backend(anyhow::Error::new(err).context(context))
}

#[async_trait]
impl Store for Repository {
    // ========================
    // Catalog
    // ========================

    async fn save_product(&self, product: &Product) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(product.id.to_string())
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.quantity)
        .bind(product.low_stock_threshold)
        .bind(&product.barcode)
        .bind(&product.description)
        .bind(&product.category)
        .bind(
            product
                .expiry_date
                .map(|d| d.format(EXPIRY_DATE_FORMAT).to_string()),
        )
        .bind(product.created_at.to_rfc3339())
        .bind(product.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| product_write_error(e, product, "Failed to save product"))?;
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        Self::fetch_product(&mut conn, id).await
    }

    async fn get_product_by_barcode(&self, barcode: &str) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE barcode = ?"
        ))
        .bind(barcode)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch product by barcode")?;

        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name, id"
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list products")?;

        rows.iter().map(Self::row_to_product).collect()
    }

    async fn update_product(&self, product: &Product) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = ?, price_cents = ?, low_stock_threshold = ?, barcode = ?,
                description = ?, category = ?, expiry_date = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.low_stock_threshold)
        .bind(&product.barcode)
        .bind(&product.description)
        .bind(&product.category)
        .bind(
            product
                .expiry_date
                .map(|d| d.format(EXPIRY_DATE_FORMAT).to_string()),
        )
        .bind(product.updated_at.to_rfc3339())
        .bind(product.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| product_write_error(e, product, "Failed to update product"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ProductNotFound(product.id));
        }
        Ok(())
    }

    async fn restock(&self, id: ProductId, amount: Quantity) -> Result<Product, StoreError> {
        let mut tx = self.pool.begin().await.context("Failed to begin restock")?;

        // SQLite turns an overflowing integer sum into REAL; refuse it instead.
        let result = sqlx::query(
            "UPDATE products SET quantity = quantity + ?, updated_at = ? WHERE id = ? AND quantity <= ?",
        )
        .bind(amount)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .bind(Quantity::MAX.saturating_sub(amount))
        .execute(&mut *tx)
        .await
        .context("Failed to restock product")?;

        if result.rows_affected() == 0 {
            return Err(Self::stock_overflow(&mut tx, id, amount).await);
        }

        let product = Self::fetch_product(&mut tx, id)
            .await?
            .ok_or(StoreError::ProductNotFound(id))?;
        tx.commit().await.context("Failed to commit restock")?;
        Ok(product)
    }

    async fn set_stock(&self, id: ProductId, quantity: Quantity) -> Result<Product, StoreError> {
        let mut tx = self.pool.begin().await.context("Failed to begin stock update")?;

        let result = sqlx::query("UPDATE products SET quantity = ?, updated_at = ? WHERE id = ?")
            .bind(quantity)
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to set stock")?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ProductNotFound(id));
        }

        let product = Self::fetch_product(&mut tx, id)
            .await?
            .ok_or(StoreError::ProductNotFound(id))?;
        tx.commit().await.context("Failed to commit stock update")?;
        Ok(product)
    }

    async fn decrement_stock(&self, id: ProductId, amount: Quantity) -> Result<Product, StoreError> {
        let mut tx = self.pool.begin().await.context("Failed to begin decrement")?;

        let result = sqlx::query(
            "UPDATE products SET quantity = quantity - ?, updated_at = ? WHERE id = ? AND quantity >= ?",
        )
        .bind(amount)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .bind(amount)
        .execute(&mut *tx)
        .await
        .context("Failed to decrement stock")?;

        if result.rows_affected() == 0 {
            return Err(Self::stock_shortfall(&mut tx, id, amount).await);
        }

        let product = Self::fetch_product(&mut tx, id)
            .await?
            .ok_or(StoreError::ProductNotFound(id))?;
        tx.commit().await.context("Failed to commit decrement")?;
        Ok(product)
    }

    // ========================
    // Ledger
    // ========================

    async fn apply_sale(&self, sale: &mut Transaction) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.context("Failed to begin sale")?;
        let now = Utc::now().to_rfc3339();

        // Guarded decrements: a line that no longer fits aborts the whole sale.
        // Dropping `tx` without commit rolls back the lines already applied.
        for item in &sale.items {
            let result = sqlx::query(
                "UPDATE products SET quantity = quantity - ?, updated_at = ? WHERE id = ? AND quantity >= ?",
            )
            .bind(item.quantity)
            .bind(&now)
            .bind(item.product_id.to_string())
            .bind(item.quantity)
            .execute(&mut *tx)
            .await
            .context("Failed to decrement stock for sale")?;

            if result.rows_affected() == 0 {
                let err = Self::stock_shortfall(&mut tx, item.product_id, item.quantity).await;
                debug!(product_id = %item.product_id, "sale rolled back: {}", err);
                return Err(err);
            }
        }

        sale.sequence = Self::next_sequence(&mut tx).await?;

        sqlx::query(
            r#"
            INSERT INTO transactions (id, sequence, created_at, total_cents, payment_method, status)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(sale.id.to_string())
        .bind(sale.sequence)
        .bind(sale.created_at.to_rfc3339())
        .bind(sale.total_cents)
        .bind(sale.payment_method.as_str())
        .bind(sale.status.as_str())
        .execute(&mut *tx)
        .await
        .context("Failed to save transaction")?;

        for (position, item) in sale.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO transaction_items (transaction_id, position, product_id, product_name, unit_price_cents, quantity)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(sale.id.to_string())
            .bind(position as i64)
            .bind(item.product_id.to_string())
            .bind(&item.name)
            .bind(item.unit_price_cents)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await
            .context("Failed to save transaction item")?;
        }

        tx.commit().await.context("Failed to commit sale")?;
        debug!(transaction_id = %sale.id, sequence = sale.sequence, "sale appended");
        Ok(())
    }

    async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>> {
        let mut tx = self.pool.begin().await.context("Failed to begin read")?;

        let row = sqlx::query(
            r#"
            SELECT id, sequence, created_at, total_cents, payment_method, status
            FROM transactions
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to fetch transaction")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let item_rows = sqlx::query(
            r#"
            SELECT transaction_id, product_id, product_name, unit_price_cents, quantity
            FROM transaction_items
            WHERE transaction_id = ?
            ORDER BY position
            "#,
        )
        .bind(id.to_string())
        .fetch_all(&mut *tx)
        .await
        .context("Failed to fetch transaction items")?;

        tx.commit().await.context("Failed to end read")?;

        let items = item_rows
            .iter()
            .map(Self::row_to_line_item)
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(Self::row_to_transaction(&row, items)?))
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        self.load_transactions("").await
    }

    async fn list_unpaid_credit_transactions(&self) -> Result<Vec<Transaction>> {
        self.load_transactions("WHERE t.payment_method = 'credit' AND t.status = 'unpaid'")
            .await
    }

    async fn mark_transaction_paid(&self, id: TransactionId) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET status = 'paid'
            WHERE id = ? AND payment_method = 'credit' AND status = 'unpaid'
            "#,
        )
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to settle transaction")?;

        Ok(result.rows_affected() == 1)
    }

    // ========================
    // Expenses
    // ========================

    async fn save_expense(&self, expense: &Expense) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO expenses (id, description, category, amount_cents, date, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(expense.id.to_string())
        .bind(&expense.description)
        .bind(&expense.category)
        .bind(expense.amount_cents)
        .bind(expense.date.to_rfc3339())
        .bind(expense.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save expense")?;
        Ok(())
    }

    async fn list_expenses(&self) -> Result<Vec<Expense>> {
        let rows = sqlx::query(
            r#"
            SELECT id, description, category, amount_cents, date, created_at
            FROM expenses
            ORDER BY date DESC, created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list expenses")?;

        rows.iter().map(Self::row_to_expense).collect()
    }
}
