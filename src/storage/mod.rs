mod memory;
mod repository;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Expense, Product, ProductId, Quantity, Transaction, TransactionId};

pub use memory::*;
pub use repository::*;

/// SQL migration for the catalog and sales ledger
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// SQL migration for expenses
pub const MIGRATION_002_EXPENSES: &str = include_str!("migrations/002_expenses.sql");

/// Failures of the catalog-writing and stock-mutating store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: ProductId,
        available: Quantity,
        requested: Quantity,
    },

    #[error("Stock overflow for product {product_id}: {current} on hand, adding {added}")]
    StockOverflow {
        product_id: ProductId,
        current: Quantity,
        added: Quantity,
    },

    #[error("Barcode already in use: {0}")]
    DuplicateBarcode(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Persistence for the catalog, the transaction ledger and expenses.
///
/// Every stock mutation is atomic per product: a decrement either applies in full
/// against the quantity it checked or not at all. `apply_sale` extends that to a whole
/// cart plus the ledger append.
#[async_trait]
pub trait Store: Send + Sync {
    // ========================
    // Catalog
    // ========================

    /// Insert a new product. A barcode held by another product is `DuplicateBarcode`.
    async fn save_product(&self, product: &Product) -> Result<(), StoreError>;

    async fn get_product(&self, id: ProductId) -> anyhow::Result<Option<Product>>;

    async fn get_product_by_barcode(&self, barcode: &str) -> anyhow::Result<Option<Product>>;

    /// All products ordered by name.
    async fn list_products(&self) -> anyhow::Result<Vec<Product>>;

    /// Persist descriptive fields. Quantity is left untouched.
    async fn update_product(&self, product: &Product) -> Result<(), StoreError>;

    /// Add to stock. A total past `Quantity::MAX` is `StockOverflow` and changes nothing.
    async fn restock(&self, id: ProductId, amount: Quantity) -> Result<Product, StoreError>;

    async fn set_stock(&self, id: ProductId, quantity: Quantity) -> Result<Product, StoreError>;

    async fn decrement_stock(&self, id: ProductId, amount: Quantity)
    -> Result<Product, StoreError>;

    // ========================
    // Ledger
    // ========================

    /// Decrement stock for every item and append the transaction, all or nothing.
    /// Assigns the next ledger sequence number to `sale`.
    async fn apply_sale(&self, sale: &mut Transaction) -> Result<(), StoreError>;

    async fn get_transaction(&self, id: TransactionId) -> anyhow::Result<Option<Transaction>>;

    /// All transactions, newest first.
    async fn list_transactions(&self) -> anyhow::Result<Vec<Transaction>>;

    /// Credit sales still awaiting payment, newest first.
    async fn list_unpaid_credit_transactions(&self) -> anyhow::Result<Vec<Transaction>>;

    /// Flip an unpaid credit sale to paid. Returns false when no such unpaid credit sale exists.
    async fn mark_transaction_paid(&self, id: TransactionId) -> anyhow::Result<bool>;

    // ========================
    // Expenses
    // ========================

    async fn save_expense(&self, expense: &Expense) -> anyhow::Result<()>;

    /// All expenses, newest first.
    async fn list_expenses(&self) -> anyhow::Result<Vec<Expense>>;
}
