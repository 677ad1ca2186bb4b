use std::collections::HashMap;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::domain::{
    Expense, Product, ProductId, Quantity, SaleStatus, Transaction, TransactionId,
};

use super::{Store, StoreError};

#[derive(Default)]
struct MemoryState {
    products: HashMap<ProductId, Product>,
    /// Append order, oldest first
    transactions: Vec<Transaction>,
    expenses: Vec<Expense>,
    next_sequence: i64,
}

/// Volatile store for tests and throwaway sessions. All state lives behind one lock,
/// so every operation observes and mutates a consistent snapshot.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryState {
    /// Another product already holding `barcode`, the way SQLite's UNIQUE index sees it.
    fn barcode_taken(&self, barcode: &str, owner: ProductId) -> bool {
        self.products
            .values()
            .any(|p| p.id != owner && p.barcode.as_deref() == Some(barcode))
    }
}

fn sorted_newest_first(mut transactions: Vec<Transaction>) -> Vec<Transaction> {
    transactions.sort_by(|a, b| b.sequence.cmp(&a.sequence));
    transactions
}

#[async_trait]
impl Store for MemoryStore {
    async fn save_product(&self, product: &Product) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if state.products.contains_key(&product.id) {
            return Err(anyhow!("Product {} already exists", product.id).into());
        }
        if let Some(barcode) = &product.barcode {
            if state.barcode_taken(barcode, product.id) {
                return Err(StoreError::DuplicateBarcode(barcode.clone()));
            }
        }
        state.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.lock().products.get(&id).cloned())
    }

    async fn get_product_by_barcode(&self, barcode: &str) -> Result<Option<Product>> {
        Ok(self
            .state
            .lock()
            .products
            .values()
            .find(|p| p.barcode.as_deref() == Some(barcode))
            .cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let mut products: Vec<Product> = self.state.lock().products.values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(products)
    }

    async fn update_product(&self, product: &Product) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if let Some(barcode) = &product.barcode {
            if state.barcode_taken(barcode, product.id) {
                return Err(StoreError::DuplicateBarcode(barcode.clone()));
            }
        }
        let Some(stored) = state.products.get_mut(&product.id) else {
            return Err(StoreError::ProductNotFound(product.id));
        };
        let quantity = stored.quantity;
        *stored = product.clone();
        stored.quantity = quantity;
        Ok(())
    }

    async fn restock(&self, id: ProductId, amount: Quantity) -> Result<Product, StoreError> {
        let mut state = self.state.lock();
        let product = state
            .products
            .get_mut(&id)
            .ok_or(StoreError::ProductNotFound(id))?;
        product.quantity =
            product
                .quantity
                .checked_add(amount)
                .ok_or(StoreError::StockOverflow {
                    product_id: id,
                    current: product.quantity,
                    added: amount,
                })?;
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn set_stock(&self, id: ProductId, quantity: Quantity) -> Result<Product, StoreError> {
        let mut state = self.state.lock();
        let product = state
            .products
            .get_mut(&id)
            .ok_or(StoreError::ProductNotFound(id))?;
        product.quantity = quantity;
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn decrement_stock(&self, id: ProductId, amount: Quantity) -> Result<Product, StoreError> {
        let mut state = self.state.lock();
        let product = state
            .products
            .get_mut(&id)
            .ok_or(StoreError::ProductNotFound(id))?;
        if product.quantity < amount {
            return Err(StoreError::InsufficientStock {
                product_id: id,
                available: product.quantity,
                requested: amount,
            });
        }
        product.quantity -= amount;
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn apply_sale(&self, sale: &mut Transaction) -> Result<(), StoreError> {
        let mut state = self.state.lock();

        // Check every line before touching any stock.
        for item in &sale.items {
            let product = state
                .products
                .get(&item.product_id)
                .ok_or(StoreError::ProductNotFound(item.product_id))?;
            if product.quantity < item.quantity {
                return Err(StoreError::InsufficientStock {
                    product_id: item.product_id,
                    available: product.quantity,
                    requested: item.quantity,
                });
            }
        }

        let now = Utc::now();
        for item in &sale.items {
            if let Some(product) = state.products.get_mut(&item.product_id) {
                product.quantity -= item.quantity;
                product.updated_at = now;
            }
        }

        state.next_sequence += 1;
        sale.sequence = state.next_sequence;
        state.transactions.push(sale.clone());
        Ok(())
    }

    async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>> {
        Ok(self
            .state
            .lock()
            .transactions
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        let transactions = self.state.lock().transactions.clone();
        Ok(sorted_newest_first(transactions))
    }

    async fn list_unpaid_credit_transactions(&self) -> Result<Vec<Transaction>> {
        let transactions = self
            .state
            .lock()
            .transactions
            .iter()
            .filter(|t| t.is_outstanding_credit())
            .cloned()
            .collect();
        Ok(sorted_newest_first(transactions))
    }

    async fn mark_transaction_paid(&self, id: TransactionId) -> Result<bool> {
        let mut state = self.state.lock();
        match state
            .transactions
            .iter_mut()
            .find(|t| t.id == id && t.is_outstanding_credit())
        {
            Some(transaction) => {
                transaction.status = SaleStatus::Paid;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn save_expense(&self, expense: &Expense) -> Result<()> {
        self.state.lock().expenses.push(expense.clone());
        Ok(())
    }

    async fn list_expenses(&self) -> Result<Vec<Expense>> {
        let mut expenses = self.state.lock().expenses.clone();
        expenses.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(expenses)
    }
}
