use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Cents;

pub type ExpenseId = Uuid;

/// Category used when the operator doesn't pick one.
pub const DEFAULT_EXPENSE_CATEGORY: &str = "Miscellaneous";

/// Money spent running the shop (supplies, rent, ...). Independent of the sales ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub description: String,
    pub category: String,
    /// Amount in cents (always positive)
    pub amount_cents: Cents,
    /// When the expense was incurred
    pub date: DateTime<Utc>,
    /// When it was recorded
    pub created_at: DateTime<Utc>,
}

impl Expense {
    pub fn new(
        description: impl Into<String>,
        category: impl Into<String>,
        amount_cents: Cents,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into().trim().to_string(),
            category: category.into().trim().to_string(),
            amount_cents,
            date,
            created_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.description.chars().count() < 2 {
            return Err("description must be at least 2 characters".to_string());
        }
        if self.category.chars().count() < 2 {
            return Err("category must be at least 2 characters".to_string());
        }
        if self.amount_cents <= 0 {
            return Err("amount must be positive".to_string());
        }
        Ok(())
    }
}
