//! Caller-side validation for bundle input.
//!
//! The remote store enforces none of these constraints; the API layer calls
//! these before any write. Violations are [`CoreError::Validation`].

use crate::bundle::{BundleDraft, BundlePatch, BundleStep, ColumnCounts, DiscountRule, DiscountType};
use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum bundle title length.
pub const MAX_TITLE_LEN: usize = 255;

/// Maximum number of steps per bundle.
pub const MAX_STEPS: usize = 10;

/// Column bounds per breakpoint.
pub const MIN_COLUMNS: u32 = 1;
pub const MAX_MOBILE_COLUMNS: u32 = 4;
pub const MAX_DESKTOP_COLUMNS: u32 = 6;

// ---------------------------------------------------------------------------
// Field validators
// ---------------------------------------------------------------------------

/// Validate a bundle title: non-empty after trimming, bounded length.
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::Validation(
            "Bundle title must not be empty".to_string(),
        ));
    }
    if title.len() > MAX_TITLE_LEN {
        return Err(CoreError::Validation(format!(
            "Bundle title must not exceed {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

/// Validate a discount rule.
///
/// Rules:
/// - `value` must be finite and non-negative.
/// - Percentage discounts must not exceed 100.
pub fn validate_discount(discount: &DiscountRule) -> Result<(), CoreError> {
    if !discount.value.is_finite() || discount.value < 0.0 {
        return Err(CoreError::Validation(
            "Discount value must be a non-negative number".to_string(),
        ));
    }
    if discount.discount_type == DiscountType::Percentage && discount.value > 100.0 {
        return Err(CoreError::Validation(
            "Percentage discount must not exceed 100".to_string(),
        ));
    }
    Ok(())
}

/// Validate per-breakpoint column counts (`mobile` 1..=4, `desktop` 1..=6).
pub fn validate_columns(columns: &ColumnCounts) -> Result<(), CoreError> {
    if !(MIN_COLUMNS..=MAX_MOBILE_COLUMNS).contains(&columns.mobile) {
        return Err(CoreError::Validation(format!(
            "Mobile columns must be between {MIN_COLUMNS} and {MAX_MOBILE_COLUMNS}"
        )));
    }
    if !(MIN_COLUMNS..=MAX_DESKTOP_COLUMNS).contains(&columns.desktop) {
        return Err(CoreError::Validation(format!(
            "Desktop columns must be between {MIN_COLUMNS} and {MAX_DESKTOP_COLUMNS}"
        )));
    }
    Ok(())
}

/// Validate a single step.
///
/// Rules:
/// - Non-empty title.
/// - 1-based position.
/// - `max_selections >= min_selections` when present.
/// - Product positions are 1-based.
pub fn validate_step(step: &BundleStep) -> Result<(), CoreError> {
    if step.title.trim().is_empty() {
        return Err(CoreError::Validation(
            "Step title must not be empty".to_string(),
        ));
    }
    if step.position == 0 {
        return Err(CoreError::Validation(
            "Step position must be 1-based".to_string(),
        ));
    }
    if let Some(max) = step.max_selections {
        if max < step.min_selections {
            return Err(CoreError::Validation(format!(
                "Step \"{}\": max_selections ({max}) must be >= min_selections ({})",
                step.title, step.min_selections
            )));
        }
    }
    for product in &step.products {
        if product.product_id.is_empty() {
            return Err(CoreError::Validation(format!(
                "Step \"{}\": product id must not be empty",
                step.title
            )));
        }
        if product.position == 0 {
            return Err(CoreError::Validation(format!(
                "Step \"{}\": product position must be 1-based",
                step.title
            )));
        }
    }
    Ok(())
}

/// Validate an ordered step list: bounded count, every step valid.
pub fn validate_steps(steps: &[BundleStep]) -> Result<(), CoreError> {
    if steps.len() > MAX_STEPS {
        return Err(CoreError::Validation(format!(
            "A bundle may have at most {MAX_STEPS} steps"
        )));
    }
    for step in steps {
        validate_step(step)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// DTO validators
// ---------------------------------------------------------------------------

/// Validate a create payload. A usable bundle needs at least one step, so
/// empty `steps` is rejected here even though the store would accept it.
pub fn validate_draft(draft: &BundleDraft) -> Result<(), CoreError> {
    validate_title(&draft.title)?;
    validate_discount(&draft.discount)?;
    validate_columns(&draft.columns)?;
    if draft.steps.is_empty() {
        return Err(CoreError::Validation(
            "A bundle must have at least one step".to_string(),
        ));
    }
    validate_steps(&draft.steps)?;
    if let Some(settings) = &draft.layout_settings {
        if settings.layout_type() != draft.layout_type {
            return Err(CoreError::Validation(
                "layout_settings variant must match layout_type".to_string(),
            ));
        }
    }
    Ok(())
}

/// Validate a partial update. Only populated fields are checked; an empty
/// patch is rejected so callers do not issue no-op writes.
pub fn validate_patch(patch: &BundlePatch) -> Result<(), CoreError> {
    if patch.is_empty() {
        return Err(CoreError::Validation(
            "Update must set at least one field".to_string(),
        ));
    }
    if let Some(title) = &patch.title {
        validate_title(title)?;
    }
    if let Some(discount) = &patch.discount {
        validate_discount(discount)?;
    }
    if let Some(columns) = &patch.columns {
        validate_columns(columns)?;
    }
    if let Some(steps) = &patch.steps {
        validate_steps(steps)?;
    }
    if let (Some(settings), Some(layout)) = (&patch.layout_settings, patch.layout_type) {
        if settings.layout_type() != layout {
            return Err(CoreError::Validation(
                "layout_settings variant must match layout_type".to_string(),
            ));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::{BundleProduct, BundleStatus, LayoutSettings, LayoutType};

    fn step(title: &str, min: u32, max: Option<u32>) -> BundleStep {
        BundleStep {
            id: "s1".into(),
            title: title.into(),
            description: None,
            position: 1,
            min_selections: min,
            max_selections: max,
            required: true,
            selection_type: Default::default(),
            products: vec![BundleProduct {
                product_id: "gid://shop/Product/1".into(),
                position: 1,
            }],
        }
    }

    fn draft() -> BundleDraft {
        BundleDraft {
            title: "Breakfast box".into(),
            status: BundleStatus::Draft,
            discount: DiscountRule::default(),
            layout_type: LayoutType::Grid,
            columns: ColumnCounts::default(),
            layout_settings: None,
            steps: vec![step("Pick a cereal", 1, Some(2))],
            combination_image_ids: vec![],
        }
    }

    // -- titles ---------------------------------------------------------------

    #[test]
    fn blank_title_rejected() {
        assert!(validate_title("   ").is_err());
    }

    #[test]
    fn overlong_title_rejected() {
        assert!(validate_title(&"x".repeat(MAX_TITLE_LEN + 1)).is_err());
    }

    // -- discount -------------------------------------------------------------

    #[test]
    fn negative_discount_rejected() {
        let rule = DiscountRule {
            discount_type: DiscountType::Fixed,
            value: -5.0,
        };
        assert!(validate_discount(&rule).is_err());
    }

    #[test]
    fn percentage_over_100_rejected() {
        let rule = DiscountRule {
            discount_type: DiscountType::Percentage,
            value: 120.0,
        };
        assert!(validate_discount(&rule).is_err());
    }

    #[test]
    fn fixed_discount_over_100_allowed() {
        let rule = DiscountRule {
            discount_type: DiscountType::Fixed,
            value: 250.0,
        };
        assert!(validate_discount(&rule).is_ok());
    }

    // -- columns --------------------------------------------------------------

    #[test]
    fn column_bounds_enforced() {
        assert!(validate_columns(&ColumnCounts { mobile: 0, desktop: 4 }).is_err());
        assert!(validate_columns(&ColumnCounts { mobile: 5, desktop: 4 }).is_err());
        assert!(validate_columns(&ColumnCounts { mobile: 2, desktop: 7 }).is_err());
        assert!(validate_columns(&ColumnCounts { mobile: 4, desktop: 6 }).is_ok());
    }

    // -- steps ----------------------------------------------------------------

    #[test]
    fn max_below_min_rejected() {
        assert!(validate_step(&step("Pick", 3, Some(2))).is_err());
        assert!(validate_step(&step("Pick", 2, Some(2))).is_ok());
    }

    #[test]
    fn too_many_steps_rejected() {
        let steps: Vec<_> = (0..MAX_STEPS + 1)
            .map(|i| {
                let mut s = step("Pick", 1, None);
                s.position = i as u32 + 1;
                s
            })
            .collect();
        assert!(validate_steps(&steps).is_err());
    }

    // -- drafts ---------------------------------------------------------------

    #[test]
    fn valid_draft_accepted() {
        assert!(validate_draft(&draft()).is_ok());
    }

    #[test]
    fn draft_without_steps_rejected() {
        let mut d = draft();
        d.steps.clear();
        assert!(validate_draft(&d).is_err());
    }

    #[test]
    fn mismatched_layout_settings_rejected() {
        let mut d = draft();
        d.layout_settings = Some(LayoutSettings::default_for(LayoutType::Slider));
        assert!(validate_draft(&d).is_err());
    }

    // -- patches --------------------------------------------------------------

    #[test]
    fn empty_patch_rejected() {
        assert!(validate_patch(&BundlePatch::default()).is_err());
    }

    #[test]
    fn patch_checks_only_populated_fields() {
        let patch = BundlePatch {
            status: Some(BundleStatus::Active),
            ..Default::default()
        };
        assert!(validate_patch(&patch).is_ok());
    }
}
