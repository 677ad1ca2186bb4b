mod common;

use anyhow::Result;
use chrono::NaiveDate;
use common::{SampleCatalog, stock_of, test_service};
use scan2sale::application::{AppError, ErrorKind, LedgerService};
use scan2sale::domain::{NewProduct, ProductFilter, ProductUpdate};
use uuid::Uuid;

#[tokio::test]
async fn test_add_and_fetch_product() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let expiry = NaiveDate::from_ymd_opt(2030, 6, 30).unwrap();
    let added = service
        .add_product(
            NewProduct::new("  Greek Yogurt ", 189, 24)
                .with_barcode("4011")
                .with_category("Dairy")
                .with_description("Plain, 500g")
                .with_low_stock_threshold(5)
                .with_expiry_date(expiry),
        )
        .await?;

    assert_eq!(added.name, "Greek Yogurt");

    let fetched = service.get_product(added.id).await?;
    assert_eq!(fetched, added);
    assert_eq!(fetched.expiry_date, Some(expiry));

    let by_code = service.find_by_barcode("4011").await?;
    assert_eq!(by_code.id, added.id);

    Ok(())
}

#[tokio::test]
async fn test_add_product_validation() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let err = service
        .add_product(NewProduct::new("", 100, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidProduct(_)));
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let err = service
        .add_product(NewProduct::new("Milk", -5, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidProduct(_)));

    let err = service
        .add_product(NewProduct::new("Milk", 100, -1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidProduct(_)));

    assert!(service.list_products().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_duplicate_barcode_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let catalog = SampleCatalog::create(&service).await?;

    let err = service
        .add_product(NewProduct::new("Other Milk", 399, 1).with_barcode("5000112"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ProductAlreadyExists(code) if code == "5000112"));

    // Moving another product onto a taken barcode is rejected too
    let err = service
        .update_product(
            catalog.bread.id,
            ProductUpdate {
                barcode: Some("5000112".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ProductAlreadyExists(_)));

    Ok(())
}

#[tokio::test]
async fn test_list_and_search() -> Result<()> {
    let (service, _temp) = test_service().await?;
    SampleCatalog::create(&service).await?;

    let names: Vec<String> = service
        .list_products()
        .await?
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(
        names,
        vec!["Cheddar", "Organic Apples", "Sourdough Bread", "Whole Milk"]
    );

    let dairy = service
        .search_products(&ProductFilter {
            category: Some("Dairy".to_string()),
            ..Default::default()
        })
        .await?;
    assert_eq!(dairy.len(), 2);

    let search = service
        .search_products(&ProductFilter {
            search: Some("BREAD".to_string()),
            ..Default::default()
        })
        .await?;
    assert_eq!(search.len(), 1);
    assert_eq!(search[0].name, "Sourdough Bread");

    let by_code = service
        .search_products(&ProductFilter {
            search: Some("0003".to_string()),
            ..Default::default()
        })
        .await?;
    assert_eq!(by_code[0].name, "Organic Apples");

    assert_eq!(
        service.categories().await?,
        vec!["Bakery", "Dairy", "Fruits"]
    );

    Ok(())
}

#[tokio::test]
async fn test_low_stock_is_informational() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let catalog = SampleCatalog::create(&service).await?;

    let low: Vec<Uuid> = service
        .low_stock_products()
        .await?
        .iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(low, vec![catalog.cheese.id]);

    // Selling down to the threshold flags the product but does not block the sale
    service.set_stock(catalog.bread.id, 2).await?;
    service.decrement_stock(catalog.bread.id, 2).await?;
    let low = service.low_stock_products().await?;
    assert_eq!(low.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_stock_adjustments() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let catalog = SampleCatalog::create(&service).await?;

    let restocked = service.restock(catalog.cheese.id, 8).await?;
    assert_eq!(restocked.quantity, 8);

    let counted = service.set_stock(catalog.milk.id, 7).await?;
    assert_eq!(counted.quantity, 7);

    let decremented = service.decrement_stock(catalog.milk.id, 7).await?;
    assert_eq!(decremented.quantity, 0);

    let err = service
        .decrement_stock(catalog.milk.id, 1)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InsufficientStock {
            available: 0,
            requested: 1,
            ..
        }
    ));
    assert_eq!(stock_of(&service, catalog.milk.id).await?, 0);

    let missing = service.restock(Uuid::new_v4(), 1).await.unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::NotFound);

    let missing = service.decrement_stock(Uuid::new_v4(), 1).await.unwrap_err();
    assert!(matches!(missing, AppError::ProductNotFound(_)));

    let invalid = service.restock(catalog.milk.id, 0).await.unwrap_err();
    assert!(matches!(invalid, AppError::InvalidQuantity(_)));

    Ok(())
}

#[tokio::test]
async fn test_restock_past_the_limit_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let catalog = SampleCatalog::create(&service).await?;

    let err = service
        .restock(catalog.bread.id, i64::MAX)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidQuantity(_)));
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(stock_of(&service, catalog.bread.id).await?, 6);

    // Same answer from the in-memory store
    let memory = LedgerService::in_memory();
    let bread = memory
        .add_product(NewProduct::new("Sourdough Bread", 349, 6))
        .await?;
    let err = memory.restock(bread.id, i64::MAX).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidQuantity(_)));
    assert_eq!(memory.get_product(bread.id).await?.quantity, 6);

    Ok(())
}

#[tokio::test]
async fn test_clearing_optional_fields() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let expiry = NaiveDate::from_ymd_opt(2030, 6, 30).unwrap();
    let yogurt = service
        .add_product(
            NewProduct::new("Greek Yogurt", 189, 24)
                .with_barcode("4011")
                .with_category("Dairy")
                .with_expiry_date(expiry),
        )
        .await?;

    let cleared = service
        .update_product(
            yogurt.id,
            ProductUpdate {
                barcode: Some(String::new()),
                category: Some(" ".to_string()),
                clear_expiry_date: true,
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(cleared.barcode, None);
    assert_eq!(cleared.category, None);
    assert_eq!(cleared.expiry_date, None);

    // The freed barcode can go to another product
    service
        .add_product(NewProduct::new("Skyr", 229, 12).with_barcode("4011"))
        .await?;

    Ok(())
}

#[tokio::test]
async fn test_update_product_details() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let catalog = SampleCatalog::create(&service).await?;

    let updated = service
        .update_product(
            catalog.apples.id,
            ProductUpdate {
                price_cents: Some(349),
                category: Some("Produce".to_string()),
                description: Some("Crisp and sweet".to_string()),
                ..Default::default()
            },
        )
        .await?;

    assert_eq!(updated.price_cents, 349);
    assert_eq!(updated.category.as_deref(), Some("Produce"));
    assert_eq!(updated.description.as_deref(), Some("Crisp and sweet"));
    assert_eq!(updated.quantity, 50);
    assert_eq!(updated.barcode.as_deref(), Some("5000334"));

    let invalid = service
        .update_product(
            catalog.apples.id,
            ProductUpdate {
                price_cents: Some(-1),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(invalid, AppError::InvalidProduct(_)));

    Ok(())
}

#[tokio::test]
async fn test_match_scanned_product() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let catalog = SampleCatalog::create(&service).await?;

    let scanned = service
        .match_scanned_product(Some("5000223"), None)
        .await?;
    assert_eq!(scanned.id, catalog.bread.id);

    // Unknown barcode falls back to the label name
    let by_label = service
        .match_scanned_product(Some("9999999"), Some("cheddar"))
        .await?;
    assert_eq!(by_label.id, catalog.cheese.id);

    let err = service
        .match_scanned_product(Some("9999999"), Some("Brie"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ProductNotFound(_)));

    Ok(())
}
