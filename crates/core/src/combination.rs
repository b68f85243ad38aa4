//! Combination-image entities.
//!
//! A [`Combination`] is a content-addressed secondary record: its identity
//! key is the *sorted* tuple of member product ids. The remote store has no
//! uniqueness constraint, so set-equality is checked at the application
//! level only.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::ObjectId;

/// Minimum number of products in a combination.
pub const MIN_COMBINATION_PRODUCTS: usize = 2;
/// Maximum number of products in a combination.
pub const MAX_COMBINATION_PRODUCTS: usize = 4;

/// Representative image for a product combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinationImage {
    /// Opaque id of the registered media asset.
    pub media_id: ObjectId,
    /// Resolved delivery URL. Resolution is asynchronous on the remote side;
    /// a combination record only ever references a resolvable asset.
    pub url: String,
}

/// A combination record as decoded from the remote store. `product_ids` is
/// kept sorted so two records for the same set compare equal field-wise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Combination {
    pub id: ObjectId,
    pub product_ids: Vec<ObjectId>,
    pub image: CombinationImage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// The canonical identity key of a product set: the sorted id tuple.
pub fn product_set_key(ids: &[ObjectId]) -> Vec<ObjectId> {
    let mut key = ids.to_vec();
    key.sort();
    key
}

/// Order-independent, length-equal set comparison.
pub fn same_product_set(a: &[ObjectId], b: &[ObjectId]) -> bool {
    a.len() == b.len() && product_set_key(a) == product_set_key(b)
}

/// Validate a combination's member set: 2..=4 distinct, non-empty ids.
pub fn validate_product_set(ids: &[ObjectId]) -> Result<(), CoreError> {
    if !(MIN_COMBINATION_PRODUCTS..=MAX_COMBINATION_PRODUCTS).contains(&ids.len()) {
        return Err(CoreError::Validation(format!(
            "A combination needs between {MIN_COMBINATION_PRODUCTS} and \
             {MAX_COMBINATION_PRODUCTS} products, got {}",
            ids.len()
        )));
    }
    if ids.iter().any(|id| id.is_empty()) {
        return Err(CoreError::Validation(
            "Combination product ids must not be empty".to_string(),
        ));
    }
    let key = product_set_key(ids);
    if key.windows(2).any(|pair| pair[0] == pair[1]) {
        return Err(CoreError::Validation(
            "Combination product ids must be distinct".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<ObjectId> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn set_comparison_is_order_independent() {
        assert!(same_product_set(&ids(&["a", "b"]), &ids(&["b", "a"])));
    }

    #[test]
    fn set_comparison_requires_equal_length() {
        assert!(!same_product_set(&ids(&["a", "b"]), &ids(&["a", "b", "c"])));
        assert!(!same_product_set(&ids(&["a", "b"]), &ids(&["a", "c"])));
    }

    #[test]
    fn key_is_sorted() {
        assert_eq!(product_set_key(&ids(&["c", "a", "b"])), ids(&["a", "b", "c"]));
    }

    #[test]
    fn member_count_bounds_enforced() {
        assert!(validate_product_set(&ids(&["a"])).is_err());
        assert!(validate_product_set(&ids(&["a", "b"])).is_ok());
        assert!(validate_product_set(&ids(&["a", "b", "c", "d"])).is_ok());
        assert!(validate_product_set(&ids(&["a", "b", "c", "d", "e"])).is_err());
    }

    #[test]
    fn duplicate_members_rejected() {
        assert!(validate_product_set(&ids(&["a", "a"])).is_err());
    }
}
