use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Cents, Expense, ProductId, Quantity, Transaction};

/// How many products the best-seller list keeps.
pub const TOP_PRODUCTS_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesReport {
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub total_revenue: Cents,
    pub sale_count: i64,
    pub average_sale: Cents,
    pub daily_revenue: Vec<DailyRevenue>,
    pub top_products: Vec<ProductSales>,
    /// Unpaid credit among the sales in the window
    pub outstanding_credit: Cents,
    pub total_expenses: Cents,
    pub net: Cents,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub revenue: Cents,
    pub sale_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSales {
    pub product_id: ProductId,
    /// Name as recorded on the sale
    pub name: String,
    pub quantity: Quantity,
    pub revenue: Cents,
}

fn in_window(at: DateTime<Utc>, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> bool {
    from.is_none_or(|from| at >= from) && to.is_none_or(|to| at < to)
}

/// Aggregate recorded sales and expenses over `[from, to)`.
pub fn build_sales_report(
    transactions: &[Transaction],
    expenses: &[Expense],
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> SalesReport {
    let sales: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| in_window(t.created_at, from, to))
        .collect();

    let total_revenue = sales
        .iter()
        .fold(0 as Cents, |acc, t| acc.saturating_add(t.total_cents));
    let sale_count = sales.len() as i64;
    let average_sale = if sale_count > 0 {
        total_revenue / sale_count
    } else {
        0
    };

    let outstanding_credit = sales
        .iter()
        .filter(|t| t.is_outstanding_credit())
        .fold(0 as Cents, |acc, t| acc.saturating_add(t.total_cents));

    let mut by_day: BTreeMap<NaiveDate, DailyRevenue> = BTreeMap::new();
    for sale in &sales {
        let date = sale.created_at.date_naive();
        let day = by_day.entry(date).or_insert(DailyRevenue {
            date,
            revenue: 0,
            sale_count: 0,
        });
        day.revenue = day.revenue.saturating_add(sale.total_cents);
        day.sale_count += 1;
    }

    let mut by_product: HashMap<ProductId, ProductSales> = HashMap::new();
    for item in sales.iter().flat_map(|t| t.items.iter()) {
        let entry = by_product.entry(item.product_id).or_insert(ProductSales {
            product_id: item.product_id,
            name: item.name.clone(),
            quantity: 0,
            revenue: 0,
        });
        entry.quantity = entry.quantity.saturating_add(item.quantity);
        entry.revenue = entry
            .revenue
            .saturating_add(item.subtotal().unwrap_or(Cents::MAX));
    }
    let mut top_products: Vec<ProductSales> = by_product.into_values().collect();
    top_products.sort_by(|a, b| b.quantity.cmp(&a.quantity).then(a.name.cmp(&b.name)));
    top_products.truncate(TOP_PRODUCTS_LIMIT);

    let total_expenses = expenses
        .iter()
        .filter(|e| in_window(e.date, from, to))
        .fold(0 as Cents, |acc, e| acc.saturating_add(e.amount_cents));

    SalesReport {
        from_date: from,
        to_date: to,
        total_revenue,
        sale_count,
        average_sale,
        daily_revenue: by_day.into_values().collect(),
        top_products,
        outstanding_credit,
        total_expenses,
        net: total_revenue.saturating_sub(total_expenses),
    }
}
