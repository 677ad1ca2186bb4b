use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::domain::{
    CartLine, Cents, Expense, NewProduct, PaymentMethod, Product, ProductFilter, ProductId,
    ProductUpdate, Quantity, SaleStatus, Transaction, TransactionId, check_settlement,
    compute_total, normalize_cart, validate_cart,
};
use crate::storage::{MemoryStore, Repository, Store};

use super::{AppError, SalesReport, build_sales_report};

/// Application service providing the shop's operations: catalog, checkout,
/// credit settlement, expenses and reports.
/// This is the primary interface for any client (CLI, API, TUI, etc.).
pub struct LedgerService<S: Store = Repository> {
    store: S,
    /// Serializes the validate-then-commit checkout against other stock changes in this process.
    checkout: Mutex<()>,
}

impl LedgerService<Repository> {
    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }
}

impl LedgerService<MemoryStore> {
    /// A service over a fresh, empty in-memory store.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }
}

impl<S: Store> LedgerService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            checkout: Mutex::new(()),
        }
    }

    // ========================
    // Catalog operations
    // ========================

    /// Add a product to the catalog.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn add_product(&self, input: NewProduct) -> Result<Product, AppError> {
        input.validate().map_err(AppError::InvalidProduct)?;

        // The store enforces barcode uniqueness.
        let product = input.into_product();
        self.store.save_product(&product).await?;
        debug!(product_id = %product.id, "product added");
        Ok(product)
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Product, AppError> {
        self.store
            .get_product(id)
            .await?
            .ok_or_else(|| AppError::ProductNotFound(id.to_string()))
    }

    pub async fn find_by_barcode(&self, barcode: &str) -> Result<Product, AppError> {
        self.store
            .get_product_by_barcode(barcode.trim())
            .await?
            .ok_or_else(|| AppError::ProductNotFound(barcode.to_string()))
    }

    /// List all products ordered by name.
    pub async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        Ok(self.store.list_products().await?)
    }

    /// Resolve a scan result to a catalog product: barcode first, then exact name
    /// (case-insensitive).
    pub async fn match_scanned_product(
        &self,
        barcode: Option<&str>,
        name: Option<&str>,
    ) -> Result<Product, AppError> {
        let barcode = barcode.map(str::trim).filter(|b| !b.is_empty());
        let name = name.map(str::trim).filter(|n| !n.is_empty());

        if let Some(code) = barcode {
            if let Some(product) = self.store.get_product_by_barcode(code).await? {
                return Ok(product);
            }
        }

        if let Some(wanted) = name {
            let wanted = wanted.to_lowercase();
            let found = self
                .store
                .list_products()
                .await?
                .into_iter()
                .find(|p| p.name.to_lowercase() == wanted);
            if let Some(product) = found {
                return Ok(product);
            }
        }

        let query = barcode.or(name).unwrap_or_default();
        Err(AppError::ProductNotFound(query.to_string()))
    }

    pub async fn search_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, AppError> {
        Ok(self
            .store
            .list_products()
            .await?
            .into_iter()
            .filter(|p| filter.matches(p))
            .collect())
    }

    /// Distinct product categories, sorted.
    pub async fn categories(&self) -> Result<Vec<String>, AppError> {
        let categories: BTreeSet<String> = self
            .store
            .list_products()
            .await?
            .into_iter()
            .filter_map(|p| p.category)
            .collect();
        Ok(categories.into_iter().collect())
    }

    /// Products at or below their low-stock threshold.
    pub async fn low_stock_products(&self) -> Result<Vec<Product>, AppError> {
        self.search_products(&ProductFilter {
            low_stock_only: true,
            ..Default::default()
        })
        .await
    }

    /// Edit a product's descriptive fields. Recorded sales keep their own copy.
    #[instrument(skip(self, update))]
    pub async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, AppError> {
        update.validate().map_err(AppError::InvalidProduct)?;

        let mut product = self.get_product(id).await?;
        update.apply_to(&mut product);
        self.store.update_product(&product).await?;
        self.get_product(id).await
    }

    /// Add received units to a product's stock.
    #[instrument(skip(self))]
    pub async fn restock(&self, id: ProductId, amount: Quantity) -> Result<Product, AppError> {
        if amount < 1 {
            return Err(AppError::InvalidQuantity(format!(
                "restock amount must be at least 1, got {}",
                amount
            )));
        }

        let _guard = self.checkout.lock().await;
        let product = self.store.restock(id, amount).await?;
        info!(product_id = %id, quantity = product.quantity, "restocked");
        Ok(product)
    }

    /// Overwrite a product's stock level after a physical count.
    #[instrument(skip(self))]
    pub async fn set_stock(&self, id: ProductId, quantity: Quantity) -> Result<Product, AppError> {
        if quantity < 0 {
            return Err(AppError::InvalidQuantity(format!(
                "stock level must be non-negative, got {}",
                quantity
            )));
        }

        let _guard = self.checkout.lock().await;
        let product = self.store.set_stock(id, quantity).await?;
        info!(product_id = %id, quantity, "stock level set");
        Ok(product)
    }

    /// Remove units from stock, failing if fewer are on hand.
    #[instrument(skip(self))]
    pub async fn decrement_stock(
        &self,
        id: ProductId,
        amount: Quantity,
    ) -> Result<Product, AppError> {
        if amount < 1 {
            return Err(AppError::InvalidQuantity(format!(
                "decrement amount must be at least 1, got {}",
                amount
            )));
        }

        let _guard = self.checkout.lock().await;
        Ok(self.store.decrement_stock(id, amount).await?)
    }

    // ========================
    // Sale operations
    // ========================

    /// Check out a cart. Either every line is sold and the sale is recorded,
    /// or nothing changes.
    #[instrument(skip(self, cart, payment_method), fields(lines = cart.len(), payment = %payment_method))]
    pub async fn process_sale(
        &self,
        cart: &[CartLine],
        payment_method: PaymentMethod,
    ) -> Result<Transaction, AppError> {
        let result = self.checkout_cart(cart, payment_method).await;
        match &result {
            Ok(sale) => info!(
                transaction_id = %sale.id,
                sequence = sale.sequence,
                total_cents = sale.total_cents,
                status = %sale.status,
                "sale recorded"
            ),
            Err(e) => warn!(error = %e, "sale rejected"),
        }
        result
    }

    async fn checkout_cart(
        &self,
        cart: &[CartLine],
        payment_method: PaymentMethod,
    ) -> Result<Transaction, AppError> {
        let lines = normalize_cart(cart)?;

        let _guard = self.checkout.lock().await;

        let mut catalog: HashMap<ProductId, Product> = HashMap::with_capacity(lines.len());
        for line in &lines {
            if let Some(product) = self.store.get_product(line.product_id).await? {
                catalog.insert(product.id, product);
            }
        }

        let items = validate_cart(&lines, &catalog)?;
        let total = compute_total(&items)?;

        let mut sale = Transaction::new(items, total, payment_method);
        self.store.apply_sale(&mut sale).await?;
        Ok(sale)
    }

    pub async fn get_transaction(&self, id: TransactionId) -> Result<Transaction, AppError> {
        self.store
            .get_transaction(id)
            .await?
            .ok_or_else(|| AppError::TransactionNotFound(id.to_string()))
    }

    /// All recorded sales, newest first.
    pub async fn list_transactions(&self) -> Result<Vec<Transaction>, AppError> {
        Ok(self.store.list_transactions().await?)
    }

    /// Credit sales still awaiting payment, newest first.
    pub async fn list_unpaid_credit_transactions(&self) -> Result<Vec<Transaction>, AppError> {
        Ok(self.store.list_unpaid_credit_transactions().await?)
    }

    // ========================
    // Credit settlement
    // ========================

    /// Mark an unpaid credit sale as paid. Settling twice is an error.
    #[instrument(skip(self))]
    pub async fn settle_credit(&self, id: TransactionId) -> Result<Transaction, AppError> {
        let mut transaction = self.get_transaction(id).await?;

        if let Err(e) = check_settlement(&transaction) {
            warn!(transaction_id = %id, reason = %e, "settlement rejected");
            return Err(AppError::from_settlement(e, id));
        }

        // Another caller may have settled it since we read it.
        if !self.store.mark_transaction_paid(id).await? {
            warn!(transaction_id = %id, "settlement lost to a concurrent settle");
            return Err(AppError::AlreadyPaid(id));
        }

        transaction.status = SaleStatus::Paid;
        info!(transaction_id = %id, total_cents = transaction.total_cents, "credit settled");
        Ok(transaction)
    }

    /// Total still owed across all unpaid credit sales.
    pub async fn outstanding_credit_total(&self) -> Result<Cents, AppError> {
        Ok(self
            .store
            .list_unpaid_credit_transactions()
            .await?
            .iter()
            .fold(0, |acc: Cents, t| acc.saturating_add(t.total_cents)))
    }

    // ========================
    // Expense operations
    // ========================

    #[instrument(skip(self, description, category))]
    pub async fn record_expense(
        &self,
        description: impl Into<String>,
        category: impl Into<String>,
        amount_cents: Cents,
        date: DateTime<Utc>,
    ) -> Result<Expense, AppError> {
        let expense = Expense::new(description, category, amount_cents, date);
        expense.validate().map_err(AppError::InvalidExpense)?;

        self.store.save_expense(&expense).await?;
        debug!(expense_id = %expense.id, "expense recorded");
        Ok(expense)
    }

    /// All expenses, newest first.
    pub async fn list_expenses(&self) -> Result<Vec<Expense>, AppError> {
        Ok(self.store.list_expenses().await?)
    }

    // ========================
    // Reports
    // ========================

    /// Sales, credit and expense figures for `[from, to)`. Open bounds cover all time.
    pub async fn sales_report(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<SalesReport, AppError> {
        let transactions = self.store.list_transactions().await?;
        let expenses = self.store.list_expenses().await?;
        Ok(build_sales_report(&transactions, &expenses, from, to))
    }
}
