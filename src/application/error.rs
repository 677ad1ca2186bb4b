use thiserror::Error;

use crate::domain::{CheckoutError, ProductId, Quantity, SettlementError, TransactionId};
use crate::storage::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Product already exists: {0}")]
    ProductAlreadyExists(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: ProductId,
        available: Quantity,
        requested: Quantity,
    },

    #[error("Invalid cart: {0}")]
    InvalidCart(String),

    #[error("Transaction {0} is not a credit sale")]
    NotACreditSale(TransactionId),

    #[error("Transaction {0} is already paid")]
    AlreadyPaid(TransactionId),

    #[error("Invalid product: {0}")]
    InvalidProduct(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Invalid expense: {0}")]
    InvalidExpense(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

/// Coarse error categories callers can branch on without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InsufficientStock,
    InvalidCart,
    InvalidSettlement,
    InvalidInput,
    Storage,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::ProductNotFound(_) | AppError::TransactionNotFound(_) => ErrorKind::NotFound,
            AppError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            AppError::InvalidCart(_) => ErrorKind::InvalidCart,
            AppError::NotACreditSale(_) | AppError::AlreadyPaid(_) => ErrorKind::InvalidSettlement,
            AppError::ProductAlreadyExists(_)
            | AppError::InvalidProduct(_)
            | AppError::InvalidQuantity(_)
            | AppError::InvalidExpense(_) => ErrorKind::InvalidInput,
            AppError::Database(_) => ErrorKind::Storage,
        }
    }

    pub(crate) fn from_settlement(error: SettlementError, id: TransactionId) -> Self {
        match error {
            SettlementError::NotACreditSale => AppError::NotACreditSale(id),
            SettlementError::AlreadyPaid => AppError::AlreadyPaid(id),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::ProductNotFound(id) => AppError::ProductNotFound(id.to_string()),
            StoreError::InsufficientStock {
                product_id,
                available,
                requested,
            } => AppError::InsufficientStock {
                product_id,
                available,
                requested,
            },
            e @ StoreError::StockOverflow { .. } => AppError::InvalidQuantity(e.to_string()),
            StoreError::DuplicateBarcode(code) => AppError::ProductAlreadyExists(code),
            StoreError::Backend(e) => AppError::Database(e),
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(error: CheckoutError) -> Self {
        match error {
            CheckoutError::ProductNotFound(id) => AppError::ProductNotFound(id.to_string()),
            CheckoutError::InsufficientStock {
                product_id,
                available,
                requested,
            } => AppError::InsufficientStock {
                product_id,
                available,
                requested,
            },
            e @ (CheckoutError::EmptyCart
            | CheckoutError::NonPositiveQuantity { .. }
            | CheckoutError::TotalOverflow) => AppError::InvalidCart(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_error_kinds() {
        let id = Uuid::new_v4();
        assert_eq!(
            AppError::from(CheckoutError::EmptyCart).kind(),
            ErrorKind::InvalidCart
        );
        assert_eq!(
            AppError::from(CheckoutError::ProductNotFound(id)).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            AppError::from(StoreError::InsufficientStock {
                product_id: id,
                available: 0,
                requested: 1
            })
            .kind(),
            ErrorKind::InsufficientStock
        );
        assert_eq!(
            AppError::from(StoreError::DuplicateBarcode("4011".to_string())).kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            AppError::from(StoreError::StockOverflow {
                product_id: id,
                current: 5,
                added: i64::MAX
            })
            .kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            AppError::from_settlement(SettlementError::AlreadyPaid, id).kind(),
            ErrorKind::InvalidSettlement
        );
        assert_eq!(
            AppError::from(anyhow::anyhow!("disk full")).kind(),
            ErrorKind::Storage
        );
    }

    #[test]
    fn test_cart_errors_keep_their_message() {
        let err = AppError::from(CheckoutError::EmptyCart);
        assert_eq!(err.to_string(), "Invalid cart: Cart is empty");
    }
}
