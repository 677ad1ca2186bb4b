// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use scan2sale::application::LedgerService;
use scan2sale::domain::{NewProduct, Product, ProductId, Quantity};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// Test fixture: a small grocery catalog
pub struct SampleCatalog {
    pub milk: Product,
    pub bread: Product,
    pub apples: Product,
    pub cheese: Product,
}

impl SampleCatalog {
    pub async fn create(service: &LedgerService) -> Result<Self> {
        let milk = service
            .add_product(
                NewProduct::new("Whole Milk", 420, 12)
                    .with_barcode("5000112")
                    .with_category("Dairy")
                    .with_low_stock_threshold(3),
            )
            .await?;
        let bread = service
            .add_product(
                NewProduct::new("Sourdough Bread", 349, 6)
                    .with_barcode("5000223")
                    .with_category("Bakery")
                    .with_low_stock_threshold(2),
            )
            .await?;
        let apples = service
            .add_product(
                NewProduct::new("Organic Apples", 299, 50)
                    .with_barcode("5000334")
                    .with_category("Fruits")
                    .with_low_stock_threshold(10),
            )
            .await?;
        let cheese = service
            .add_product(
                NewProduct::new("Cheddar", 650, 0)
                    .with_category("Dairy")
                    .with_low_stock_threshold(1),
            )
            .await?;

        Ok(Self {
            milk,
            bread,
            apples,
            cheese,
        })
    }
}

/// Current stock level of a product
pub async fn stock_of(service: &LedgerService, id: ProductId) -> Result<Quantity> {
    Ok(service.get_product(id).await?.quantity)
}
