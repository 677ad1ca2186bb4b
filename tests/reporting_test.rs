mod common;

use anyhow::Result;
use chrono::{Duration, Utc};
use common::{SampleCatalog, parse_date, test_service};
use scan2sale::application::{AppError, ErrorKind};
use scan2sale::domain::{CartLine, PaymentMethod};

#[tokio::test]
async fn test_sales_report_over_all_time() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let catalog = SampleCatalog::create(&service).await?;

    service
        .process_sale(
            &[
                CartLine::new(catalog.milk.id, 2),
                CartLine::new(catalog.apples.id, 5),
            ],
            PaymentMethod::Cash,
        )
        .await?;
    let credit = service
        .process_sale(&[CartLine::new(catalog.bread.id, 1)], PaymentMethod::Credit)
        .await?;
    service
        .record_expense("Paper bags", "Supplies", 450, Utc::now())
        .await?;

    let report = service.sales_report(None, None).await?;

    let revenue = 2 * 420 + 5 * 299 + 349;
    assert_eq!(report.total_revenue, revenue);
    assert_eq!(report.sale_count, 2);
    assert_eq!(report.average_sale, revenue / 2);
    assert_eq!(report.outstanding_credit, credit.total_cents);
    assert_eq!(report.total_expenses, 450);
    assert_eq!(report.net, revenue - 450);
    assert_eq!(report.daily_revenue.len(), 1);
    assert_eq!(report.daily_revenue[0].revenue, revenue);

    assert_eq!(report.top_products[0].name, "Organic Apples");
    assert_eq!(report.top_products[0].quantity, 5);
    assert_eq!(report.top_products.len(), 3);

    // Settling moves money out of outstanding credit but not out of revenue
    service.settle_credit(credit.id).await?;
    let report = service.sales_report(None, None).await?;
    assert_eq!(report.outstanding_credit, 0);
    assert_eq!(report.total_revenue, revenue);

    Ok(())
}

#[tokio::test]
async fn test_report_uses_sale_snapshots() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let catalog = SampleCatalog::create(&service).await?;

    service
        .process_sale(&[CartLine::new(catalog.milk.id, 3)], PaymentMethod::Cash)
        .await?;
    service
        .update_product(
            catalog.milk.id,
            scan2sale::domain::ProductUpdate {
                name: Some("Oat Milk".to_string()),
                price_cents: Some(10_000),
                ..Default::default()
            },
        )
        .await?;

    let report = service.sales_report(None, None).await?;
    assert_eq!(report.total_revenue, 1260);
    assert_eq!(report.top_products[0].name, "Whole Milk");
    assert_eq!(report.top_products[0].revenue, 1260);

    Ok(())
}

#[tokio::test]
async fn test_report_window_excludes_other_periods() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let catalog = SampleCatalog::create(&service).await?;

    service
        .process_sale(&[CartLine::new(catalog.milk.id, 1)], PaymentMethod::Cash)
        .await?;
    service
        .record_expense("Rent", "Premises", 80_000, parse_date("2020-01-01"))
        .await?;

    let future = service
        .sales_report(Some(Utc::now() + Duration::days(1)), None)
        .await?;
    assert_eq!(future.sale_count, 0);
    assert_eq!(future.total_revenue, 0);
    assert_eq!(future.average_sale, 0);
    assert_eq!(future.total_expenses, 0);

    let old = service
        .sales_report(Some(parse_date("2020-01-01")), Some(parse_date("2020-02-01")))
        .await?;
    assert_eq!(old.sale_count, 0);
    assert_eq!(old.total_expenses, 80_000);
    assert_eq!(old.net, -80_000);

    Ok(())
}

#[tokio::test]
async fn test_expenses() -> Result<()> {
    let (service, _temp) = test_service().await?;

    service
        .record_expense("Shelf labels", "Supplies", 1_250, parse_date("2024-03-01"))
        .await?;
    service
        .record_expense("Electricity", "Utilities", 9_900, parse_date("2024-03-05"))
        .await?;

    let expenses = service.list_expenses().await?;
    assert_eq!(expenses.len(), 2);
    assert_eq!(expenses[0].description, "Electricity");
    assert_eq!(expenses[1].category, "Supplies");

    let err = service
        .record_expense("x", "Supplies", 100, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidExpense(_)));

    let err = service
        .record_expense("Stamps", "Office", 0, Utc::now())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    assert_eq!(service.list_expenses().await?.len(), 2);

    Ok(())
}
