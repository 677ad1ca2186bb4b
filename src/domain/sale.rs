use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, ProductId, Quantity, line_total};

pub type TransactionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Paid at the register
    Cash,
    /// Taken on account, settled later
    Credit,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Credit => "credit",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Some(PaymentMethod::Cash),
            "credit" => Some(PaymentMethod::Credit),
            _ => None,
        }
    }

    /// Cash sales are settled on the spot; credit sales start out unpaid.
    pub fn initial_status(&self) -> SaleStatus {
        match self {
            PaymentMethod::Cash => SaleStatus::Paid,
            PaymentMethod::Credit => SaleStatus::Unpaid,
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Paid,
    Unpaid,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Paid => "paid",
            SaleStatus::Unpaid => "unpaid",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "paid" => Some(SaleStatus::Paid),
            "unpaid" => Some(SaleStatus::Unpaid),
            _ => None,
        }
    }
}

impl std::fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One requested product in a cart submitted at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: Quantity,
}

impl CartLine {
    pub fn new(product_id: ProductId, quantity: Quantity) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// A sold line, copied from the catalog at the time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price_cents: Cents,
    pub quantity: Quantity,
}

impl LineItem {
    pub fn subtotal(&self) -> Option<Cents> {
        line_total(self.unit_price_cents, self.quantity)
    }
}

/// A completed sale. Items, total and payment method never change after creation;
/// only a credit sale's status may move from unpaid to paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Append order in the ledger
    pub sequence: i64,
    pub created_at: DateTime<Utc>,
    pub items: Vec<LineItem>,
    pub total_cents: Cents,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
}

impl Transaction {
    /// Create a new transaction. Sequence number is assigned by the store on append.
    pub fn new(items: Vec<LineItem>, total_cents: Cents, payment_method: PaymentMethod) -> Self {
        Self {
            id: Uuid::new_v4(),
            sequence: 0,
            created_at: Utc::now(),
            items,
            total_cents,
            payment_method,
            status: payment_method.initial_status(),
        }
    }

    pub fn is_paid(&self) -> bool {
        self.status == SaleStatus::Paid
    }

    /// Unpaid credit sale, i.e. money still owed to the shop.
    pub fn is_outstanding_credit(&self) -> bool {
        self.payment_method == PaymentMethod::Credit && self.status == SaleStatus::Unpaid
    }

    pub fn item_count(&self) -> Quantity {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Short identifier printed on receipts.
    pub fn short_id(&self) -> String {
        let simple = self.id.simple().to_string();
        simple[simple.len() - 8..].to_uppercase()
    }
}
