use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::{Expense, Product, Transaction, format_cents};
use crate::storage::Store;

/// Full shop snapshot for backup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub products: Vec<Product>,
    pub transactions: Vec<Transaction>,
    pub expenses: Vec<Expense>,
}

/// Header of the products CSV; the importer reads the same columns by name.
pub const PRODUCT_CSV_HEADER: [&str; 9] = [
    "id",
    "name",
    "price",
    "quantity",
    "low_stock_threshold",
    "barcode",
    "category",
    "description",
    "expiry_date",
];

/// Exporter for converting shop data to various formats
pub struct Exporter<'a, S: Store> {
    service: &'a LedgerService<S>,
}

impl<'a, S: Store> Exporter<'a, S> {
    pub fn new(service: &'a LedgerService<S>) -> Self {
        Self { service }
    }

    /// Export the catalog to CSV format
    pub async fn export_products_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let products = self.service.list_products().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(PRODUCT_CSV_HEADER)?;

        for product in &products {
            csv_writer.write_record(&[
                product.id.to_string(),
                product.name.clone(),
                format_cents(product.price_cents),
                product.quantity.to_string(),
                product.low_stock_threshold.to_string(),
                product.barcode.clone().unwrap_or_default(),
                product.category.clone().unwrap_or_default(),
                product.description.clone().unwrap_or_default(),
                product
                    .expiry_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(products.len())
    }

    /// Export sales to CSV, one row per line item, oldest sale first
    pub async fn export_transactions_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let transactions = self.service.list_transactions().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(&[
            "transaction_id",
            "sequence",
            "created_at",
            "payment_method",
            "status",
            "total",
            "product_id",
            "product_name",
            "unit_price",
            "quantity",
            "line_total",
        ])?;

        let mut count = 0;
        for transaction in transactions.iter().rev() {
            for item in &transaction.items {
                csv_writer.write_record(&[
                    transaction.id.to_string(),
                    transaction.sequence.to_string(),
                    transaction.created_at.to_rfc3339(),
                    transaction.payment_method.as_str().to_string(),
                    transaction.status.as_str().to_string(),
                    format_cents(transaction.total_cents),
                    item.product_id.to_string(),
                    item.name.clone(),
                    format_cents(item.unit_price_cents),
                    item.quantity.to_string(),
                    item.subtotal().map(format_cents).unwrap_or_default(),
                ])?;
                count += 1;
            }
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export expenses to CSV format
    pub async fn export_expenses_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let expenses = self.service.list_expenses().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(&["id", "date", "description", "category", "amount"])?;

        for expense in &expenses {
            csv_writer.write_record(&[
                expense.id.to_string(),
                expense.date.to_rfc3339(),
                expense.description.clone(),
                expense.category.clone(),
                format_cents(expense.amount_cents),
            ])?;
        }

        csv_writer.flush()?;
        Ok(expenses.len())
    }

    /// Export everything as one JSON snapshot
    pub async fn export_full_json<W: Write>(&self, mut writer: W) -> Result<ShopSnapshot> {
        let snapshot = ShopSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            products: self.service.list_products().await?,
            transactions: self.service.list_transactions().await?,
            expenses: self.service.list_expenses().await?,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
