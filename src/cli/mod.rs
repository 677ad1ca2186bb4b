use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::{LedgerService, SalesReport};
use crate::domain::{
    CartLine, DEFAULT_EXPENSE_CATEGORY, NewProduct, PaymentMethod, Product, ProductFilter,
    ProductUpdate, Quantity, Transaction, format_cents, parse_cents,
};

/// Scan2Sale - shop point of sale and inventory ledger
#[derive(Parser)]
#[command(name = "scan2sale")]
#[command(about = "A local-first point of sale: catalog, checkout, credit sales and expenses")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "SCAN2SALE_DATABASE", default_value = "scan2sale.db")]
    pub database: String,

    /// Enable verbose output (debug logs on stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Catalog management commands
    #[command(subcommand)]
    Product(ProductCommands),

    /// Ring up a sale
    Sell {
        /// Cart lines as PRODUCT=QTY, where PRODUCT is a product ID or barcode (QTY defaults to 1)
        #[arg(required = true)]
        items: Vec<String>,

        /// Payment method: cash, credit
        #[arg(short, long, default_value = "cash")]
        pay: String,
    },

    /// List recorded sales, newest first
    Sales {
        /// Maximum number of sales to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Print the receipt for a sale
    Receipt {
        /// Transaction ID
        id: String,
    },

    /// Credit sale commands
    #[command(subcommand)]
    Credit(CreditCommands),

    /// Expense commands
    #[command(subcommand)]
    Expense(ExpenseCommands),

    /// Sales report
    Report {
        /// Start date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// End date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Output format: text, json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Export data to CSV or JSON
    Export {
        /// What to export: products, transactions, expenses, full
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Import data from CSV
    Import {
        /// What to import: products
        import_type: String,

        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,

        /// Preview without importing
        #[arg(long)]
        dry_run: bool,

        /// Skip rows whose barcode is already in the catalog
        #[arg(long)]
        skip_duplicates: bool,
    },
}

#[derive(Subcommand)]
pub enum ProductCommands {
    /// Add a product to the catalog
    Add {
        /// Product name
        name: String,

        /// Unit price (e.g., "2.99")
        #[arg(short, long)]
        price: String,

        /// Units on hand
        #[arg(short, long, default_value = "0")]
        quantity: Quantity,

        /// Low-stock alert threshold
        #[arg(long, default_value = "0")]
        low_stock: Quantity,

        /// Barcode (must be unique)
        #[arg(short, long)]
        barcode: Option<String>,

        /// Category (e.g., "Dairy")
        #[arg(short, long)]
        category: Option<String>,

        /// Description
        #[arg(short, long)]
        description: Option<String>,

        /// Expiry date (YYYY-MM-DD)
        #[arg(long)]
        expiry: Option<String>,
    },

    /// List products
    List {
        /// Search name, barcode and category
        #[arg(short, long)]
        search: Option<String>,

        /// Only this category
        #[arg(short, long)]
        category: Option<String>,

        /// Only products at or below their low-stock threshold
        #[arg(long)]
        low_stock: bool,
    },

    /// Show product details
    Show {
        /// Product ID or barcode
        product: String,
    },

    /// Find the product matching a scanned barcode or label name
    Scan {
        /// Barcode read from the package
        #[arg(short, long)]
        barcode: Option<String>,

        /// Product name read from the label
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Edit product details (stock is changed with restock/set-stock)
    Update {
        /// Product ID or barcode
        product: String,

        #[arg(long)]
        name: Option<String>,

        /// Unit price (e.g., "2.99")
        #[arg(long)]
        price: Option<String>,

        #[arg(long)]
        low_stock: Option<Quantity>,

        /// Barcode; pass "" to remove it
        #[arg(long)]
        barcode: Option<String>,

        /// Category; pass "" to remove it
        #[arg(long)]
        category: Option<String>,

        /// Description; pass "" to remove it
        #[arg(long)]
        description: Option<String>,

        /// Expiry date (YYYY-MM-DD)
        #[arg(long)]
        expiry: Option<String>,

        /// Remove the expiry date
        #[arg(long, conflicts_with = "expiry")]
        clear_expiry: bool,
    },

    /// Add received units to stock
    Restock {
        /// Product ID or barcode
        product: String,

        /// Units received
        amount: Quantity,
    },

    /// Set the stock level after a physical count
    SetStock {
        /// Product ID or barcode
        product: String,

        /// Units on hand
        quantity: Quantity,
    },

    /// List product categories
    Categories,

    /// List products at or below their low-stock threshold
    LowStock,
}

#[derive(Subcommand)]
pub enum CreditCommands {
    /// List unpaid credit sales
    List,

    /// Mark a credit sale as paid
    Settle {
        /// Transaction ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ExpenseCommands {
    /// Record an expense
    Add {
        /// What the money was spent on
        description: String,

        /// Amount (e.g., "12.50")
        amount: String,

        /// Category
        #[arg(short, long, default_value = DEFAULT_EXPENSE_CATEGORY)]
        category: String,

        /// Date of the expense (YYYY-MM-DD, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// List expenses, newest first
    List,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                LedgerService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Product(product_cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_product_command(&service, product_cmd).await?;
            }

            Commands::Sell { items, pay } => {
                let service = LedgerService::connect(&self.database).await?;
                let payment_method = PaymentMethod::from_str(&pay).ok_or_else(|| {
                    anyhow::anyhow!("Invalid payment method '{}'. Use cash or credit", pay)
                })?;

                let mut cart = Vec::with_capacity(items.len());
                for item in &items {
                    let (key, quantity) = parse_cart_item(item)?;
                    let product = resolve_product(&service, key).await?;
                    cart.push(CartLine::new(product.id, quantity));
                }

                let sale = service.process_sale(&cart, payment_method).await?;
                print_receipt(&sale);
            }

            Commands::Sales { limit } => {
                let service = LedgerService::connect(&self.database).await?;
                let sales = service.list_transactions().await?;
                let shown = limit.unwrap_or(sales.len());
                print_transactions(&sales[..shown.min(sales.len())]);
            }

            Commands::Receipt { id } => {
                let service = LedgerService::connect(&self.database).await?;
                let transaction_id = parse_transaction_id(&id)?;
                let sale = service.get_transaction(transaction_id).await?;
                print_receipt(&sale);
            }

            Commands::Credit(credit_cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_credit_command(&service, credit_cmd).await?;
            }

            Commands::Expense(expense_cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_expense_command(&service, expense_cmd).await?;
            }

            Commands::Report { from, to, format } => {
                let service = LedgerService::connect(&self.database).await?;
                let (from_date, to_date) = parse_date_range(from, to)?;
                let report = service.sales_report(from_date, to_date).await?;

                match format.as_str() {
                    "json" => println!("{}", serde_json::to_string_pretty(&report)?),
                    "text" => print_report(&report),
                    _ => anyhow::bail!("Invalid format '{}'. Use text or json", format),
                }
            }

            Commands::Export {
                export_type,
                output,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                run_export_command(&service, &export_type, output.as_deref()).await?;
            }

            Commands::Import {
                import_type,
                input,
                dry_run,
                skip_duplicates,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                run_import_command(
                    &service,
                    &import_type,
                    input.as_deref(),
                    dry_run,
                    skip_duplicates,
                )
                .await?;
            }
        }

        Ok(())
    }
}

async fn run_product_command(service: &LedgerService, cmd: ProductCommands) -> Result<()> {
    match cmd {
        ProductCommands::Add {
            name,
            price,
            quantity,
            low_stock,
            barcode,
            category,
            description,
            expiry,
        } => {
            let price_cents =
                parse_cents(&price).context("Invalid price format. Use '2.99' or '3'")?;

            let mut input =
                NewProduct::new(name, price_cents, quantity).with_low_stock_threshold(low_stock);
            if let Some(code) = barcode {
                input = input.with_barcode(code);
            }
            if let Some(cat) = category {
                input = input.with_category(cat);
            }
            if let Some(desc) = description {
                input = input.with_description(desc);
            }
            if let Some(date) = expiry {
                input = input.with_expiry_date(parse_naive_date(&date)?);
            }

            let product = service.add_product(input).await?;
            println!(
                "Added product: {} at {} ({} in stock) ({})",
                product.name,
                format_cents(product.price_cents),
                product.quantity,
                product.id
            );
        }

        ProductCommands::List {
            search,
            category,
            low_stock,
        } => {
            let filter = ProductFilter {
                search,
                category,
                low_stock_only: low_stock,
            };
            let products = service.search_products(&filter).await?;
            print_products(&products);
        }

        ProductCommands::Show { product } => {
            let product = resolve_product(service, &product).await?;

            println!("Product: {}", product.name);
            println!("  ID:          {}", product.id);
            println!("  Price:       {}", format_cents(product.price_cents));
            println!(
                "  In stock:    {}{}",
                product.quantity,
                if product.is_low_stock() { " (low)" } else { "" }
            );
            println!("  Low stock:   {}", product.low_stock_threshold);
            if let Some(barcode) = &product.barcode {
                println!("  Barcode:     {}", barcode);
            }
            if let Some(category) = &product.category {
                println!("  Category:    {}", category);
            }
            if let Some(description) = &product.description {
                println!("  Description: {}", description);
            }
            if let Some(expiry) = product.expiry_date {
                println!("  Expires:     {}", expiry);
            }
            println!(
                "  Updated:     {}",
                product.updated_at.format("%Y-%m-%d %H:%M:%S")
            );
        }

        ProductCommands::Scan { barcode, name } => {
            if barcode.is_none() && name.is_none() {
                anyhow::bail!("Provide --barcode or --name");
            }
            let product = service
                .match_scanned_product(barcode.as_deref(), name.as_deref())
                .await?;
            println!(
                "{} ({}) {} - {} in stock",
                product.name,
                product.id,
                format_cents(product.price_cents),
                product.quantity
            );
        }

        ProductCommands::Update {
            product,
            name,
            price,
            low_stock,
            barcode,
            category,
            description,
            expiry,
            clear_expiry,
        } => {
            let target = resolve_product(service, &product).await?;
            let update = ProductUpdate {
                name,
                price_cents: price
                    .map(|p| parse_cents(&p))
                    .transpose()
                    .context("Invalid price format. Use '2.99' or '3'")?,
                low_stock_threshold: low_stock,
                barcode,
                description,
                category,
                expiry_date: expiry.map(|d| parse_naive_date(&d)).transpose()?,
                clear_expiry_date: clear_expiry,
            };
            if update.is_empty() {
                anyhow::bail!("Nothing to update");
            }

            let updated = service.update_product(target.id, update).await?;
            println!("Updated product: {} ({})", updated.name, updated.id);
        }

        ProductCommands::Restock { product, amount } => {
            let target = resolve_product(service, &product).await?;
            let updated = service.restock(target.id, amount).await?;
            println!(
                "Restocked {}: +{} ({} in stock)",
                updated.name, amount, updated.quantity
            );
        }

        ProductCommands::SetStock { product, quantity } => {
            let target = resolve_product(service, &product).await?;
            let updated = service.set_stock(target.id, quantity).await?;
            println!("Stock for {} set to {}", updated.name, updated.quantity);
        }

        ProductCommands::Categories => {
            let categories = service.categories().await?;
            if categories.is_empty() {
                println!("No categories found.");
            }
            for category in categories {
                println!("{}", category);
            }
        }

        ProductCommands::LowStock => {
            let products = service.low_stock_products().await?;
            print_products(&products);
        }
    }
    Ok(())
}

async fn run_credit_command(service: &LedgerService, cmd: CreditCommands) -> Result<()> {
    match cmd {
        CreditCommands::List => {
            let unpaid = service.list_unpaid_credit_transactions().await?;
            print_transactions(&unpaid);
            if !unpaid.is_empty() {
                println!();
                println!(
                    "Outstanding: {}",
                    format_cents(service.outstanding_credit_total().await?)
                );
            }
        }

        CreditCommands::Settle { id } => {
            let transaction_id = parse_transaction_id(&id)?;
            let settled = service.settle_credit(transaction_id).await?;
            println!(
                "Settled credit sale {}: {}",
                settled.short_id(),
                format_cents(settled.total_cents)
            );
        }
    }
    Ok(())
}

async fn run_expense_command(service: &LedgerService, cmd: ExpenseCommands) -> Result<()> {
    match cmd {
        ExpenseCommands::Add {
            description,
            amount,
            category,
            date,
        } => {
            let amount_cents =
                parse_cents(&amount).context("Invalid amount format. Use '12.50' or '12'")?;
            let date = match date {
                Some(date_str) => parse_date(&date_str).with_context(|| {
                    format!("Invalid date format '{}'. Use YYYY-MM-DD", date_str)
                })?,
                None => Utc::now(),
            };

            let expense = service
                .record_expense(description, category, amount_cents, date)
                .await?;
            println!(
                "Recorded expense: {} {} [{}]",
                format_cents(expense.amount_cents),
                expense.description,
                expense.category
            );
        }

        ExpenseCommands::List => {
            let expenses = service.list_expenses().await?;
            if expenses.is_empty() {
                println!("No expenses found.");
                return Ok(());
            }

            println!(
                "{:<12} {:<30} {:<16} {:>10}",
                "DATE", "DESCRIPTION", "CATEGORY", "AMOUNT"
            );
            println!("{}", "-".repeat(71));
            for expense in expenses {
                println!(
                    "{:<12} {:<30} {:<16} {:>10}",
                    expense.date.format("%Y-%m-%d").to_string(),
                    truncate(&expense.description, 30),
                    truncate(&expense.category, 16),
                    format_cents(expense.amount_cents)
                );
            }
        }
    }
    Ok(())
}

async fn run_export_command(
    service: &LedgerService,
    export_type: &str,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "products" => {
            let count = exporter.export_products_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} products", count);
            }
        }
        "transactions" => {
            let count = exporter.export_transactions_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} sale lines", count);
            }
        }
        "expenses" => {
            let count = exporter.export_expenses_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} expenses", count);
            }
        }
        "full" => {
            let snapshot = exporter.export_full_json(writer).await?;
            if output.is_some() {
                eprintln!(
                    "Exported full database: {} products, {} transactions, {} expenses",
                    snapshot.products.len(),
                    snapshot.transactions.len(),
                    snapshot.expenses.len()
                );
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: products, transactions, expenses, full",
                export_type
            );
        }
    }

    Ok(())
}

async fn run_import_command(
    service: &LedgerService,
    import_type: &str,
    input: Option<&str>,
    dry_run: bool,
    skip_duplicates: bool,
) -> Result<()> {
    use crate::io::{ImportOptions, Importer};
    use std::fs::File;
    use std::io::{Read, stdin};

    let importer = Importer::new(service);

    let reader: Box<dyn Read> = match input {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("Failed to open input file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdin()),
    };

    let options = ImportOptions {
        dry_run,
        skip_duplicates,
    };

    let result = match import_type {
        "products" => importer.import_products_csv(reader, options).await?,
        _ => {
            anyhow::bail!("Invalid import type '{}'. Valid types: products", import_type);
        }
    };

    if dry_run {
        println!("Dry run complete");
    } else {
        println!("Import complete");
    }
    println!("  Imported: {}", result.imported);
    println!("  Skipped:  {}", result.skipped);
    println!("  Errors:   {}", result.errors.len());

    if !result.errors.is_empty() {
        println!("\nErrors:");
        for error in result.errors.iter().take(10) {
            println!(
                "  Line {}: {}",
                error.line,
                error
                    .field
                    .as_ref()
                    .map(|f| format!("{}: ", f))
                    .unwrap_or_default()
                    + &error.error
            );
        }
        if result.errors.len() > 10 {
            println!("  ... and {} more errors", result.errors.len() - 10);
        }
    }

    Ok(())
}

/// Look a product up by UUID, falling back to barcode.
async fn resolve_product(service: &LedgerService, key: &str) -> Result<Product> {
    match Uuid::parse_str(key) {
        Ok(id) => Ok(service.get_product(id).await?),
        Err(_) => Ok(service.find_by_barcode(key).await?),
    }
}

/// Split "PRODUCT=QTY"; a bare "PRODUCT" means one unit.
fn parse_cart_item(item: &str) -> Result<(&str, Quantity)> {
    match item.rsplit_once('=') {
        Some((key, qty)) => {
            let quantity = qty
                .trim()
                .parse()
                .with_context(|| format!("Invalid quantity in '{}'", item))?;
            Ok((key.trim(), quantity))
        }
        None => Ok((item.trim(), 1)),
    }
}

fn parse_transaction_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).context("Invalid transaction ID format (expected UUID)")
}

fn print_products(products: &[Product]) {
    if products.is_empty() {
        println!("No products found.");
        return;
    }

    println!(
        "{:<36} {:<24} {:>10} {:>8} {:<16}",
        "ID", "NAME", "PRICE", "STOCK", "CATEGORY"
    );
    println!("{}", "-".repeat(98));
    for product in products {
        println!(
            "{:<36} {:<24} {:>10} {:>8} {:<16}",
            product.id,
            truncate(&product.name, 24),
            format_cents(product.price_cents),
            format!(
                "{}{}",
                product.quantity,
                if product.is_low_stock() { "!" } else { "" }
            ),
            truncate(product.category.as_deref().unwrap_or("-"), 16)
        );
    }
}

fn print_transactions(transactions: &[Transaction]) {
    if transactions.is_empty() {
        println!("No sales found.");
        return;
    }

    println!(
        "{:<36} {:<17} {:>6} {:>10} {:<7} {:<7}",
        "ID", "DATE", "ITEMS", "TOTAL", "PAYMENT", "STATUS"
    );
    println!("{}", "-".repeat(88));
    for sale in transactions {
        println!(
            "{:<36} {:<17} {:>6} {:>10} {:<7} {:<7}",
            sale.id,
            sale.created_at.format("%Y-%m-%d %H:%M").to_string(),
            sale.item_count(),
            format_cents(sale.total_cents),
            sale.payment_method.as_str(),
            sale.status.as_str()
        );
    }
}

fn print_receipt(sale: &Transaction) {
    println!("Receipt #{} ({})", sale.short_id(), sale.id);
    println!("  {}", sale.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("{}", "-".repeat(52));
    for item in &sale.items {
        println!(
            "{:<24} {:>4} x {:>8} {:>10}",
            truncate(&item.name, 24),
            item.quantity,
            format_cents(item.unit_price_cents),
            item.subtotal().map(format_cents).unwrap_or_default()
        );
    }
    println!("{}", "-".repeat(52));
    println!("{:<41} {:>10}", "TOTAL", format_cents(sale.total_cents));
    println!("Payment: {} ({})", sale.payment_method, sale.status);
}

/// Human-readable report window. The stored `to_date` is exclusive, so the
/// header names the last day it covers.
fn report_window(report: &SalesReport) -> String {
    match (report.from_date, report.to_date) {
        (None, None) => "all time".to_string(),
        (from, to) => format!(
            "{} to {}",
            from.map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "start".to_string()),
            to.map(|d| (d - Duration::nanoseconds(1)).format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "now".to_string())
        ),
    }
}

fn print_report(report: &SalesReport) {
    let window = report_window(report);

    println!("Sales report ({})", window);
    println!("{}", "-".repeat(44));
    println!("{:<28} {:>15}", "Revenue", format_cents(report.total_revenue));
    println!("{:<28} {:>15}", "Sales", report.sale_count);
    println!("{:<28} {:>15}", "Average sale", format_cents(report.average_sale));
    println!(
        "{:<28} {:>15}",
        "Outstanding credit",
        format_cents(report.outstanding_credit)
    );
    println!("{:<28} {:>15}", "Expenses", format_cents(report.total_expenses));
    println!("{:<28} {:>15}", "Net", format_cents(report.net));

    if !report.daily_revenue.is_empty() {
        println!();
        println!("{:<12} {:>8} {:>12}", "DAY", "SALES", "REVENUE");
        for day in &report.daily_revenue {
            println!(
                "{:<12} {:>8} {:>12}",
                day.date.to_string(),
                day.sale_count,
                format_cents(day.revenue)
            );
        }
    }

    if !report.top_products.is_empty() {
        println!();
        println!("{:<24} {:>8} {:>12}", "TOP PRODUCTS", "QTY", "REVENUE");
        for product in &report.top_products {
            println!(
                "{:<24} {:>8} {:>12}",
                truncate(&product.name, 24),
                product.quantity,
                format_cents(product.revenue)
            );
        }
    }
}

/// Report bounds: `from` at midnight, `to` through the end of that day.
fn parse_date_range(
    from: Option<String>,
    to: Option<String>,
) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
    let from_date = from
        .map(|s| parse_date(&s))
        .transpose()
        .context("Invalid --from date")?;
    let to_date = to
        .map(|s| -> Result<DateTime<Utc>> {
            let day = parse_naive_date(&s)?;
            let next = day
                .succ_opt()
                .ok_or_else(|| anyhow::anyhow!("Date out of range: {}", s))?;
            midnight_utc(next)
        })
        .transpose()
        .context("Invalid --to date")?;

    Ok((from_date, to_date))
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn parse_naive_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
        .context("Date must be in YYYY-MM-DD format")
}

fn midnight_utc(date: NaiveDate) -> Result<DateTime<Utc>> {
    let naive_datetime = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow::anyhow!("Invalid date"))?;
    Ok(DateTime::from_naive_utc_and_offset(naive_datetime, Utc))
}

fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    midnight_utc(parse_naive_date(date_str)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::build_sales_report;

    #[test]
    fn test_parse_cart_item() {
        assert_eq!(parse_cart_item("5000112=3").unwrap(), ("5000112", 3));
        assert_eq!(parse_cart_item("5000112").unwrap(), ("5000112", 1));
        assert_eq!(parse_cart_item(" abc = 2 ").unwrap(), ("abc", 2));
        assert!(parse_cart_item("abc=two").is_err());
    }

    #[test]
    fn test_report_range_includes_end_day() {
        let (from, to) =
            parse_date_range(Some("2024-03-01".to_string()), Some("2024-03-31".to_string()))
                .unwrap();
        assert_eq!(from.unwrap().to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(to.unwrap().to_rfc3339(), "2024-04-01T00:00:00+00:00");
        assert_eq!(parse_date_range(None, None).unwrap(), (None, None));
    }

    #[test]
    fn test_report_header_shows_last_included_day() {
        let (from, to) =
            parse_date_range(Some("2024-03-01".to_string()), Some("2024-03-31".to_string()))
                .unwrap();
        let report = build_sales_report(&[], &[], from, to);
        assert_eq!(report_window(&report), "2024-03-01 to 2024-03-31");

        let open_ended = build_sales_report(&[], &[], None, to);
        assert_eq!(report_window(&open_ended), "start to 2024-03-31");

        let all_time = build_sales_report(&[], &[], None, None);
        assert_eq!(report_window(&all_time), "all time");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Milk", 10), "Milk");
        assert_eq!(truncate("Organic Whole Milk", 10), "Organic...");
    }

    #[test]
    fn test_cli_update_flags() {
        let cli = Cli::try_parse_from([
            "scan2sale",
            "product",
            "update",
            "5000112",
            "--barcode",
            "",
            "--clear-expiry",
        ])
        .unwrap();
        match cli.command {
            Commands::Product(ProductCommands::Update {
                barcode,
                clear_expiry,
                ..
            }) => {
                assert_eq!(barcode.as_deref(), Some(""));
                assert!(clear_expiry);
            }
            _ => panic!("expected product update"),
        }

        assert!(
            Cli::try_parse_from([
                "scan2sale",
                "product",
                "update",
                "5000112",
                "--expiry",
                "2030-01-01",
                "--clear-expiry",
            ])
            .is_err()
        );
    }

    #[test]
    fn test_cli_parses_sell() {
        let cli = Cli::try_parse_from(["scan2sale", "sell", "123=2", "456", "--pay", "credit"])
            .unwrap();
        match cli.command {
            Commands::Sell { items, pay } => {
                assert_eq!(items, vec!["123=2", "456"]);
                assert_eq!(pay, "credit");
            }
            _ => panic!("expected sell"),
        }
    }
}
