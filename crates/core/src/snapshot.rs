//! Cart-transform snapshot projection.
//!
//! The checkout-time pricing function reads a single denormalized document
//! describing every active bundle. [`build_snapshot`] is the pure rebuild
//! function: the synchronizer feeds it the full bundle list and overwrites
//! the stored document wholesale with the result. The snapshot has no
//! independent identity and is never patched incrementally.

use serde::{Deserialize, Serialize};

use crate::bundle::{Bundle, BundleStatus, DiscountType};
use crate::types::ObjectId;

/// Product reference inside a snapshot step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotProduct {
    pub id: ObjectId,
}

/// Step projection: id plus member product ids, nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotStep {
    pub id: String,
    pub products: Vec<SnapshotProduct>,
}

/// One active bundle as the checkout runtime sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotBundle {
    pub id: ObjectId,
    pub title: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub steps: Vec<SnapshotStep>,
}

/// The full denormalized document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartTransformSnapshot {
    pub bundles: Vec<SnapshotBundle>,
}

/// Project the active subset of `bundles` into the snapshot shape.
///
/// Pure and deterministic: the same input list always yields the same
/// document, byte for byte once serialized, which is what lets overlapping
/// sync passes converge without coordination.
pub fn build_snapshot(bundles: &[Bundle]) -> CartTransformSnapshot {
    let bundles = bundles
        .iter()
        .filter(|b| b.status == BundleStatus::Active)
        .map(|b| SnapshotBundle {
            id: b.id.clone(),
            title: b.title.clone(),
            discount_type: b.discount.discount_type,
            discount_value: b.discount.value,
            steps: b
                .steps
                .iter()
                .map(|s| SnapshotStep {
                    id: s.id.clone(),
                    products: s
                        .products
                        .iter()
                        .map(|p| SnapshotProduct {
                            id: p.product_id.clone(),
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect();
    CartTransformSnapshot { bundles }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::{
        BundleProduct, BundleStep, ColumnCounts, DiscountRule, LayoutSettings, LayoutType,
    };

    fn bundle(id: &str, status: BundleStatus) -> Bundle {
        Bundle {
            id: id.into(),
            handle: format!("{id}-handle"),
            title: format!("Bundle {id}"),
            status,
            discount: DiscountRule {
                discount_type: DiscountType::Percentage,
                value: 10.0,
            },
            layout_type: LayoutType::Grid,
            columns: ColumnCounts::default(),
            layout_settings: LayoutSettings::default_for(LayoutType::Grid),
            steps: vec![BundleStep {
                id: format!("{id}-step-1"),
                title: "Pick".into(),
                description: None,
                position: 1,
                min_selections: 1,
                max_selections: None,
                required: true,
                selection_type: Default::default(),
                products: vec![BundleProduct {
                    product_id: "gid://shop/Product/9".into(),
                    position: 1,
                }],
            }],
            combination_image_ids: vec![],
        }
    }

    #[test]
    fn only_active_bundles_are_projected() {
        let bundles = vec![
            bundle("a", BundleStatus::Active),
            bundle("b", BundleStatus::Draft),
            bundle("c", BundleStatus::Inactive),
        ];
        let snapshot = build_snapshot(&bundles);
        assert_eq!(snapshot.bundles.len(), 1);
        assert_eq!(snapshot.bundles[0].id, "a");
    }

    #[test]
    fn projection_keeps_only_minimal_fields() {
        let snapshot = build_snapshot(&[bundle("a", BundleStatus::Active)]);
        let b = &snapshot.bundles[0];
        assert_eq!(b.discount_value, 10.0);
        assert_eq!(b.steps[0].id, "a-step-1");
        assert_eq!(b.steps[0].products[0].id, "gid://shop/Product/9");
    }

    #[test]
    fn rebuild_is_byte_identical_for_identical_input() {
        let bundles = vec![
            bundle("a", BundleStatus::Active),
            bundle("b", BundleStatus::Active),
        ];
        let first = serde_json::to_string(&build_snapshot(&bundles)).unwrap();
        let second = serde_json::to_string(&build_snapshot(&bundles)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_input_yields_empty_document() {
        let snapshot = build_snapshot(&[]);
        assert!(snapshot.bundles.is_empty());
        assert_eq!(
            serde_json::to_string(&snapshot).unwrap(),
            r#"{"bundles":[]}"#
        );
    }
}
