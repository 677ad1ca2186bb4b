use std::collections::HashMap;

use thiserror::Error;

use super::{CartLine, Cents, LineItem, PaymentMethod, Product, ProductId, Quantity, Transaction};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Invalid quantity {quantity} for product {product_id}: must be at least 1")]
    NonPositiveQuantity {
        product_id: ProductId,
        quantity: Quantity,
    },

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: ProductId,
        available: Quantity,
        requested: Quantity,
    },

    #[error("Cart total exceeds the representable amount")]
    TotalOverflow,
}

/// Merge repeated products into one line each, keeping first-seen order.
/// Rejects an empty cart and any line with quantity below 1.
pub fn normalize_cart(cart: &[CartLine]) -> Result<Vec<CartLine>, CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let mut merged: Vec<CartLine> = Vec::with_capacity(cart.len());
    for line in cart {
        if line.quantity < 1 {
            return Err(CheckoutError::NonPositiveQuantity {
                product_id: line.product_id,
                quantity: line.quantity,
            });
        }
        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(line.quantity)
                    .ok_or(CheckoutError::TotalOverflow)?;
            }
            None => merged.push(*line),
        }
    }
    Ok(merged)
}

/// Validation pass: check every line against the catalog snapshot without mutating anything.
/// Returns the priced line items, or the first violation in cart order.
pub fn validate_cart(
    lines: &[CartLine],
    catalog: &HashMap<ProductId, Product>,
) -> Result<Vec<LineItem>, CheckoutError> {
    lines
        .iter()
        .map(|line| {
            let product = catalog
                .get(&line.product_id)
                .ok_or(CheckoutError::ProductNotFound(line.product_id))?;

            if line.quantity > product.quantity {
                return Err(CheckoutError::InsufficientStock {
                    product_id: product.id,
                    available: product.quantity,
                    requested: line.quantity,
                });
            }

            Ok(LineItem {
                product_id: product.id,
                name: product.name.clone(),
                unit_price_cents: product.price_cents,
                quantity: line.quantity,
            })
        })
        .collect()
}

/// Sum of unit price times quantity over all items, with overflow checking.
pub fn compute_total(items: &[LineItem]) -> Result<Cents, CheckoutError> {
    items.iter().try_fold(0 as Cents, |total, item| {
        item.subtotal()
            .and_then(|subtotal| total.checked_add(subtotal))
            .ok_or(CheckoutError::TotalOverflow)
    })
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementError {
    #[error("transaction was not a credit sale")]
    NotACreditSale,

    #[error("transaction is already paid")]
    AlreadyPaid,
}

/// A transaction can be settled only while it is an unpaid credit sale.
pub fn check_settlement(transaction: &Transaction) -> Result<(), SettlementError> {
    if transaction.payment_method != PaymentMethod::Credit {
        return Err(SettlementError::NotACreditSale);
    }
    if transaction.is_paid() {
        return Err(SettlementError::AlreadyPaid);
    }
    Ok(())
}
