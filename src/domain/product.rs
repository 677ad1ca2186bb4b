use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Cents;

pub type ProductId = Uuid;

/// Unit counts for stock and cart lines.
pub type Quantity = i64;

/// A catalog entry with its live stock level.
/// Only the catalog store mutates `quantity`; sales keep their own snapshot of name and price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Unit price in cents (never negative)
    pub price_cents: Cents,
    /// Units on hand (never negative)
    pub quantity: Quantity,
    /// At or below this quantity the product is reported as low stock. Informational only.
    pub low_stock_threshold: Quantity,
    pub barcode: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.low_stock_threshold
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.quantity == 0
    }

    /// Case-insensitive substring match over name, barcode and category.
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&term)
            || self
                .barcode
                .as_deref()
                .is_some_and(|b| b.to_lowercase().contains(&term))
            || self
                .category
                .as_deref()
                .is_some_and(|c| c.to_lowercase().contains(&term))
    }
}

/// Input for adding a product to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price_cents: Cents,
    pub quantity: Quantity,
    pub low_stock_threshold: Quantity,
    pub barcode: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub expiry_date: Option<NaiveDate>,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, price_cents: Cents, quantity: Quantity) -> Self {
        Self {
            name: name.into(),
            price_cents,
            quantity,
            low_stock_threshold: 0,
            barcode: None,
            description: None,
            category: None,
            expiry_date: None,
        }
    }

    pub fn with_low_stock_threshold(mut self, threshold: Quantity) -> Self {
        self.low_stock_threshold = threshold;
        self
    }

    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = Some(barcode.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_expiry_date(mut self, expiry_date: NaiveDate) -> Self {
        self.expiry_date = Some(expiry_date);
        self
    }

    /// Checks the catalog invariants, returning a human-readable reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("product name must not be empty".to_string());
        }
        validate_price(self.price_cents)?;
        if self.quantity < 0 {
            return Err(format!("quantity must be non-negative, got {}", self.quantity));
        }
        validate_threshold(self.low_stock_threshold)
    }

    /// Turn the input into a catalog product with a fresh id.
    pub fn into_product(self) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4(),
            name: self.name.trim().to_string(),
            price_cents: self.price_cents,
            quantity: self.quantity,
            low_stock_threshold: self.low_stock_threshold,
            barcode: normalize_optional(self.barcode),
            description: normalize_optional(self.description),
            category: normalize_optional(self.category),
            expiry_date: self.expiry_date,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Edits to a product's descriptive fields. Stock is never changed through an update.
///
/// A blank barcode, description or category clears that field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price_cents: Option<Cents>,
    pub low_stock_threshold: Option<Quantity>,
    pub barcode: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub clear_expiry_date: bool,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self == &ProductUpdate::default()
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err("product name must not be empty".to_string());
            }
        }
        if let Some(price) = self.price_cents {
            validate_price(price)?;
        }
        if let Some(threshold) = self.low_stock_threshold {
            validate_threshold(threshold)?;
        }
        if self.clear_expiry_date && self.expiry_date.is_some() {
            return Err("cannot both set and clear the expiry date".to_string());
        }
        Ok(())
    }

    /// Apply the edit in place and bump `updated_at`.
    pub fn apply_to(self, product: &mut Product) {
        if let Some(name) = self.name {
            product.name = name.trim().to_string();
        }
        if let Some(price) = self.price_cents {
            product.price_cents = price;
        }
        if let Some(threshold) = self.low_stock_threshold {
            product.low_stock_threshold = threshold;
        }
        if let Some(barcode) = self.barcode {
            product.barcode = normalize_optional(Some(barcode));
        }
        if let Some(description) = self.description {
            product.description = normalize_optional(Some(description));
        }
        if let Some(category) = self.category {
            product.category = normalize_optional(Some(category));
        }
        if self.clear_expiry_date {
            product.expiry_date = None;
        } else if let Some(expiry_date) = self.expiry_date {
            product.expiry_date = Some(expiry_date);
        }
        product.updated_at = Utc::now();
    }
}

/// Inventory screen filter: free-text search, exact category and low-stock toggle.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub low_stock_only: bool,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(term) = &self.search {
            if !product.matches_search(term) {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if product.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        !self.low_stock_only || product.is_low_stock()
    }
}

fn validate_price(price_cents: Cents) -> Result<(), String> {
    if price_cents < 0 {
        return Err(format!("price must be non-negative, got {}", price_cents));
    }
    Ok(())
}

fn validate_threshold(threshold: Quantity) -> Result<(), String> {
    if threshold < 0 {
        return Err(format!(
            "low-stock threshold must be non-negative, got {}",
            threshold
        ));
    }
    Ok(())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
