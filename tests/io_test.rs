mod common;

use anyhow::Result;
use chrono::Utc;
use common::{SampleCatalog, test_service};
use scan2sale::application::LedgerService;
use scan2sale::domain::{CartLine, NewProduct, PaymentMethod};
use scan2sale::io::{Exporter, ImportOptions, Importer, ShopSnapshot};

#[tokio::test]
async fn test_products_csv_reimports_into_fresh_shop() -> Result<()> {
    let (service, _temp) = test_service().await?;
    SampleCatalog::create(&service).await?;

    let mut buffer = Vec::new();
    let count = Exporter::new(&service)
        .export_products_csv(&mut buffer)
        .await?;
    assert_eq!(count, 4);

    let csv = String::from_utf8(buffer.clone())?;
    assert!(csv.starts_with("id,name,price,quantity,low_stock_threshold"));
    assert!(csv.contains("Whole Milk,4.20,12,3,5000112,Dairy"));

    let (fresh, _fresh_temp) = test_service().await?;
    let result = Importer::new(&fresh)
        .import_products_csv(buffer.as_slice(), ImportOptions::default())
        .await?;
    assert_eq!(result.imported, 4);
    assert!(result.errors.is_empty());

    let milk = fresh.find_by_barcode("5000112").await?;
    assert_eq!(milk.price_cents, 420);
    assert_eq!(milk.quantity, 12);
    assert_eq!(milk.category.as_deref(), Some("Dairy"));

    // Importing the same file again only hits duplicates
    let again = Importer::new(&fresh)
        .import_products_csv(
            buffer.as_slice(),
            ImportOptions {
                skip_duplicates: true,
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(again.skipped, 3);
    // Cheddar has no barcode, so it cannot be recognized as a duplicate
    assert_eq!(again.imported, 1);

    Ok(())
}

#[tokio::test]
async fn test_transactions_csv_has_one_row_per_line_item() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let catalog = SampleCatalog::create(&service).await?;

    service
        .process_sale(
            &[
                CartLine::new(catalog.milk.id, 2),
                CartLine::new(catalog.bread.id, 1),
            ],
            PaymentMethod::Credit,
        )
        .await?;
    service
        .process_sale(&[CartLine::new(catalog.apples.id, 4)], PaymentMethod::Cash)
        .await?;

    let mut buffer = Vec::new();
    let rows = Exporter::new(&service)
        .export_transactions_csv(&mut buffer)
        .await?;
    assert_eq!(rows, 3);

    let csv = String::from_utf8(buffer)?;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[1].contains(",credit,unpaid,11.89,"));
    assert!(lines[1].contains(",Whole Milk,4.20,2,8.40"));
    assert!(lines[3].contains(",cash,paid,11.96,"));

    Ok(())
}

#[tokio::test]
async fn test_full_json_snapshot() -> Result<()> {
    let service = LedgerService::in_memory();
    let roll = service
        .add_product(NewProduct::new("Receipt Roll", 250, 10))
        .await?;

    service
        .process_sale(&[CartLine::new(roll.id, 1)], PaymentMethod::Cash)
        .await?;
    service
        .record_expense("Receipt paper", "Supplies", 799, Utc::now())
        .await?;

    let mut buffer = Vec::new();
    let snapshot = Exporter::new(&service).export_full_json(&mut buffer).await?;
    assert_eq!(snapshot.version, env!("CARGO_PKG_VERSION"));

    let parsed: ShopSnapshot = serde_json::from_slice(&buffer)?;
    assert_eq!(parsed.products.len(), 1);
    assert_eq!(parsed.transactions.len(), 1);
    assert_eq!(parsed.expenses.len(), 1);
    assert_eq!(parsed.transactions[0], snapshot.transactions[0]);

    let raw: serde_json::Value = serde_json::from_slice(&buffer)?;
    assert_eq!(raw["transactions"][0]["payment_method"], "cash");
    assert_eq!(raw["transactions"][0]["status"], "paid");

    Ok(())
}
