use anyhow::Result;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashSet;
use std::io::Read;

use crate::application::{AppError, LedgerService};
use crate::domain::{NewProduct, parse_cents};
use crate::storage::Store;

/// Result of an import operation
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportError>,
}

/// Error that occurred during import
#[derive(Debug, Clone)]
pub struct ImportError {
    pub line: usize,
    pub field: Option<String>,
    pub error: String,
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Validate every row without writing anything
    pub dry_run: bool,
    /// Count rows whose barcode is already in the catalog as skipped instead of failed
    pub skip_duplicates: bool,
}

/// One products CSV row. Columns are matched by header name; unknown columns are ignored.
#[derive(Debug, Deserialize)]
struct ProductRecord {
    name: String,
    price: String,
    quantity: i64,
    #[serde(default)]
    low_stock_threshold: Option<i64>,
    #[serde(default)]
    barcode: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    expiry_date: Option<String>,
}

impl ProductRecord {
    fn into_new_product(self) -> Result<NewProduct, (String, String)> {
        let price_cents = parse_cents(&self.price)
            .map_err(|e| ("price".to_string(), format!("Invalid price: {}", e)))?;

        let mut input = NewProduct::new(self.name, price_cents, self.quantity)
            .with_low_stock_threshold(self.low_stock_threshold.unwrap_or(0));
        if let Some(barcode) = self.barcode {
            input = input.with_barcode(barcode);
        }
        if let Some(category) = self.category {
            input = input.with_category(category);
        }
        if let Some(description) = self.description {
            input = input.with_description(description);
        }
        if let Some(raw) = self.expiry_date.filter(|s| !s.trim().is_empty()) {
            let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| {
                (
                    "expiry_date".to_string(),
                    format!("Invalid expiry date: {}", e),
                )
            })?;
            input = input.with_expiry_date(date);
        }

        input
            .validate()
            .map_err(|e| ("product".to_string(), e))?;
        Ok(input)
    }
}

/// Importer for loading data into the shop
pub struct Importer<'a, S: Store> {
    service: &'a LedgerService<S>,
}

impl<'a, S: Store> Importer<'a, S> {
    pub fn new(service: &'a LedgerService<S>) -> Self {
        Self { service }
    }

    /// Import catalog products from CSV. Bad rows are reported and do not stop the import.
    pub async fn import_products_csv<R: Read>(
        &self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut result = ImportResult::default();
        let mut seen_barcodes: HashSet<String> = HashSet::new();

        for (line_num, record) in csv_reader.deserialize::<ProductRecord>().enumerate() {
            let line = line_num + 2; // +2 for header and 0-indexing

            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    result.errors.push(ImportError {
                        line,
                        field: None,
                        error: format!("CSV parse error: {}", e),
                    });
                    continue;
                }
            };

            let input = match record.into_new_product() {
                Ok(input) => input,
                Err((field, error)) => {
                    result.errors.push(ImportError {
                        line,
                        field: Some(field),
                        error,
                    });
                    continue;
                }
            };

            if let Some(barcode) = input.barcode.as_deref().map(str::trim) {
                let in_catalog = match self.service.find_by_barcode(barcode).await {
                    Ok(_) => true,
                    Err(AppError::ProductNotFound(_)) => false,
                    Err(e) => return Err(e.into()),
                };
                if in_catalog || !seen_barcodes.insert(barcode.to_string()) {
                    if options.skip_duplicates {
                        result.skipped += 1;
                    } else {
                        result.errors.push(ImportError {
                            line,
                            field: Some("barcode".to_string()),
                            error: format!("Barcode already in use: {}", barcode),
                        });
                    }
                    continue;
                }
            }

            if options.dry_run {
                result.imported += 1;
                continue;
            }

            match self.service.add_product(input).await {
                Ok(_) => result.imported += 1,
                Err(AppError::ProductAlreadyExists(_)) if options.skip_duplicates => {
                    result.skipped += 1
                }
                Err(AppError::Database(e)) => return Err(e),
                Err(e) => result.errors.push(ImportError {
                    line,
                    field: None,
                    error: format!("Product creation failed: {}", e),
                }),
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
name,price,quantity,low_stock_threshold,barcode,category,description,expiry_date
Whole Milk,4.20,12,3,5000112,Dairy,,2030-01-31
Bread,3.49,8,,,,Sourdough loaf,
Broken,abc,1,,,,,
";

    #[tokio::test]
    async fn test_import_collects_row_errors() {
        let service = LedgerService::in_memory();
        let result = Importer::new(&service)
            .import_products_csv(CSV.as_bytes(), ImportOptions::default())
            .await
            .unwrap();

        assert_eq!(result.imported, 2);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].line, 4);
        assert_eq!(result.errors[0].field.as_deref(), Some("price"));

        let milk = service.find_by_barcode("5000112").await.unwrap();
        assert_eq!(milk.price_cents, 420);
        assert_eq!(milk.low_stock_threshold, 3);
        assert_eq!(
            milk.expiry_date,
            NaiveDate::from_ymd_opt(2030, 1, 31)
        );
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let service = LedgerService::in_memory();
        let options = ImportOptions {
            dry_run: true,
            ..Default::default()
        };
        let result = Importer::new(&service)
            .import_products_csv(CSV.as_bytes(), options)
            .await
            .unwrap();

        assert_eq!(result.imported, 2);
        assert!(service.list_products().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_skip_duplicates_by_barcode() {
        let service = LedgerService::in_memory();
        service
            .add_product(NewProduct::new("Milk", 400, 1).with_barcode("5000112"))
            .await
            .unwrap();

        let options = ImportOptions {
            skip_duplicates: true,
            ..Default::default()
        };
        let result = Importer::new(&service)
            .import_products_csv(CSV.as_bytes(), options)
            .await
            .unwrap();

        assert_eq!(result.imported, 1);
        assert_eq!(result.skipped, 1);
        assert_eq!(service.list_products().await.unwrap().len(), 2);
    }
}
