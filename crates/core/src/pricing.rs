//! Selection pricing.
//!
//! Applies a bundle's discount rule to a shopper's selection. Unit prices
//! arrive with the request (the product catalog is an external collaborator
//! and is never read here). The checkout-time merge algorithm consumes the
//! synchronized snapshot instead and is out of scope.

use serde::{Deserialize, Serialize};

use crate::bundle::{DiscountRule, DiscountType};
use crate::error::CoreError;
use crate::types::ObjectId;

/// One line of a shopper's selection.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectionItem {
    pub product_id: ObjectId,
    pub quantity: u32,
    /// Unit price as supplied by the caller's catalog lookup.
    pub unit_price: f64,
}

/// Computed price for a selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBreakdown {
    pub subtotal: f64,
    pub discount_amount: f64,
    pub total: f64,
}

/// Apply `discount` to `items`.
///
/// - `Percentage`: `value`% off the subtotal (value clamped to 0..=100).
/// - `Fixed`: `min(value, subtotal)` off.
/// - `Total`: the total becomes `min(value, subtotal)` — never a markup.
///
/// All amounts are rounded to 2 decimal places and never negative.
pub fn price_selection(
    discount: &DiscountRule,
    items: &[SelectionItem],
) -> Result<PriceBreakdown, CoreError> {
    if items.is_empty() {
        return Err(CoreError::Validation(
            "Selection must contain at least one item".to_string(),
        ));
    }
    for item in items {
        if item.quantity == 0 {
            return Err(CoreError::Validation(format!(
                "Item {}: quantity must be at least 1",
                item.product_id
            )));
        }
        if !item.unit_price.is_finite() || item.unit_price < 0.0 {
            return Err(CoreError::Validation(format!(
                "Item {}: unit price must be a non-negative number",
                item.product_id
            )));
        }
    }

    let subtotal: f64 = items
        .iter()
        .map(|i| i.unit_price * f64::from(i.quantity))
        .sum();

    let discount_amount = match discount.discount_type {
        DiscountType::Percentage => subtotal * (discount.value.clamp(0.0, 100.0) / 100.0),
        DiscountType::Fixed => discount.value.min(subtotal),
        DiscountType::Total => (subtotal - discount.value.min(subtotal)).max(0.0),
    };

    let subtotal = round_money(subtotal);
    let discount_amount = round_money(discount_amount.clamp(0.0, subtotal));
    let total = round_money(subtotal - discount_amount);

    Ok(PriceBreakdown {
        subtotal,
        discount_amount,
        total,
    })
}

/// Round to 2 decimal places, half away from zero.
fn round_money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
