//! Bundle entities and DTOs.
//!
//! A [`Bundle`] is a multi-step product picker with a discount rule. The
//! entity struct mirrors what the remote object store holds; [`BundleDraft`]
//! and [`BundlePatch`] are the create/update DTOs consumed by the API layer.
//! Steps are serialized as an opaque blob by the store-side codec, so the
//! serde defaults on [`BundleStep`] double as the backward-compatibility
//! shims for fields absent on older records.

use serde::{Deserialize, Serialize};

use crate::types::ObjectId;

// ---------------------------------------------------------------------------
// Status / discount
// ---------------------------------------------------------------------------

/// Lifecycle status of a bundle. Transitions are free-form; only caller
/// validation constrains them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleStatus {
    #[default]
    Draft,
    Active,
    Inactive,
}

impl BundleStatus {
    /// Stable wire name, used as the stored field value.
    pub fn as_str(self) -> &'static str {
        match self {
            BundleStatus::Draft => "draft",
            BundleStatus::Active => "active",
            BundleStatus::Inactive => "inactive",
        }
    }

    /// Parse a stored field value. Returns `None` for unknown values so the
    /// codec can apply its own default.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(BundleStatus::Draft),
            "active" => Some(BundleStatus::Active),
            "inactive" => Some(BundleStatus::Inactive),
            _ => None,
        }
    }
}

/// How the discount value is applied to a selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// `value` percent off the selection subtotal.
    #[default]
    Percentage,
    /// `value` currency units off the selection subtotal.
    Fixed,
    /// The selection total becomes `value` (never a markup).
    Total,
}

impl DiscountType {
    pub fn as_str(self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::Fixed => "fixed",
            DiscountType::Total => "total",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "percentage" => Some(DiscountType::Percentage),
            "fixed" => Some(DiscountType::Fixed),
            "total" => Some(DiscountType::Total),
            _ => None,
        }
    }
}

/// Discount rule attached to a bundle. `value >= 0` is enforced by
/// [`crate::validation::validate_discount`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscountRule {
    #[serde(rename = "type")]
    pub discount_type: DiscountType,
    pub value: f64,
}

impl Default for DiscountRule {
    fn default() -> Self {
        Self {
            discount_type: DiscountType::Percentage,
            value: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Storefront layout of a bundle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutType {
    #[default]
    Grid,
    Slider,
    Modal,
    Selection,
}

impl LayoutType {
    pub fn as_str(self) -> &'static str {
        match self {
            LayoutType::Grid => "grid",
            LayoutType::Slider => "slider",
            LayoutType::Modal => "modal",
            LayoutType::Selection => "selection",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "grid" => Some(LayoutType::Grid),
            "slider" => Some(LayoutType::Slider),
            "modal" => Some(LayoutType::Modal),
            "selection" => Some(LayoutType::Selection),
            _ => None,
        }
    }
}

/// Per-breakpoint column counts. Bounds: `mobile` 1..=4, `desktop` 1..=6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnCounts {
    pub mobile: u32,
    pub desktop: u32,
}

impl Default for ColumnCounts {
    fn default() -> Self {
        Self {
            mobile: DEFAULT_MOBILE_COLUMNS,
            desktop: DEFAULT_DESKTOP_COLUMNS,
        }
    }
}

/// Default mobile column count, also used when a stored value is unparsable.
pub const DEFAULT_MOBILE_COLUMNS: u32 = 2;
/// Default desktop column count, also used when a stored value is unparsable.
pub const DEFAULT_DESKTOP_COLUMNS: u32 = 4;

/// Layout-specific settings, a variant record keyed by layout type.
///
/// Records written before the settings field existed decode via
/// [`LayoutSettings::default_for`], which gives each layout a distinct
/// default shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layout", rename_all = "lowercase")]
pub enum LayoutSettings {
    Grid {
        gap_px: u32,
        show_step_progress: bool,
    },
    Slider {
        slides_per_view: u32,
        autoplay: bool,
        show_arrows: bool,
    },
    Modal {
        trigger_label: String,
        open_on_add: bool,
    },
    Selection {
        collapse_completed_steps: bool,
        show_summary_sidebar: bool,
    },
}

impl LayoutSettings {
    /// Fixed per-layout default table.
    pub fn default_for(layout: LayoutType) -> Self {
        match layout {
            LayoutType::Grid => LayoutSettings::Grid {
                gap_px: 16,
                show_step_progress: true,
            },
            LayoutType::Slider => LayoutSettings::Slider {
                slides_per_view: 2,
                autoplay: false,
                show_arrows: true,
            },
            LayoutType::Modal => LayoutSettings::Modal {
                trigger_label: "Build your bundle".to_string(),
                open_on_add: false,
            },
            LayoutType::Selection => LayoutSettings::Selection {
                collapse_completed_steps: true,
                show_summary_sidebar: true,
            },
        }
    }

    /// The layout type this settings variant belongs to.
    pub fn layout_type(&self) -> LayoutType {
        match self {
            LayoutSettings::Grid { .. } => LayoutType::Grid,
            LayoutSettings::Slider { .. } => LayoutType::Slider,
            LayoutSettings::Modal { .. } => LayoutType::Modal,
            LayoutSettings::Selection { .. } => LayoutType::Selection,
        }
    }
}

// ---------------------------------------------------------------------------
// Steps and products
// ---------------------------------------------------------------------------

/// What a step lets the shopper pick from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionType {
    #[default]
    Product,
    Collection,
}

/// A product reference inside a step. Title/image/price are fetched live
/// from the product catalog by the UI layer; only the id and display
/// position are owned here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleProduct {
    pub product_id: ObjectId,
    /// 1-based display position.
    pub position: u32,
}

/// One step of a bundle. The `id` is generated by the owning bundle at
/// creation time and never regenerated on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleStep {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// 1-based position within the bundle.
    pub position: u32,
    #[serde(default)]
    pub min_selections: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_selections: Option<u32>,
    #[serde(default)]
    pub required: bool,
    /// Absent on records written before this field existed; defaults to
    /// `product`.
    #[serde(default)]
    pub selection_type: SelectionType,
    #[serde(default)]
    pub products: Vec<BundleProduct>,
}

impl BundleStep {
    /// Generate a fresh step id. Called by the store when a draft step
    /// arrives without one, and by `duplicate` to strip source identity.
    pub fn fresh_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

// ---------------------------------------------------------------------------
// Bundle entity and DTOs
// ---------------------------------------------------------------------------

/// A fully-decoded bundle record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bundle {
    /// Store-assigned opaque id.
    pub id: ObjectId,
    /// Store-assigned human-readable handle.
    pub handle: String,
    pub title: String,
    pub status: BundleStatus,
    pub discount: DiscountRule,
    pub layout_type: LayoutType,
    pub columns: ColumnCounts,
    pub layout_settings: LayoutSettings,
    pub steps: Vec<BundleStep>,
    /// References into the combination-image sub-store.
    pub combination_image_ids: Vec<ObjectId>,
}

/// Create DTO: everything but identity.
#[derive(Debug, Clone, Deserialize)]
pub struct BundleDraft {
    pub title: String,
    #[serde(default)]
    pub status: BundleStatus,
    #[serde(default)]
    pub discount: DiscountRule,
    #[serde(default)]
    pub layout_type: LayoutType,
    #[serde(default)]
    pub columns: ColumnCounts,
    /// Defaults to [`LayoutSettings::default_for`] the draft's layout type.
    #[serde(default)]
    pub layout_settings: Option<LayoutSettings>,
    pub steps: Vec<BundleStep>,
    #[serde(default)]
    pub combination_image_ids: Vec<ObjectId>,
}

/// Partial-update DTO: only populated fields are written, each as a full
/// field overwrite (the store has no deeper patch primitive).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BundlePatch {
    pub title: Option<String>,
    pub status: Option<BundleStatus>,
    pub discount: Option<DiscountRule>,
    pub layout_type: Option<LayoutType>,
    pub columns: Option<ColumnCounts>,
    pub layout_settings: Option<LayoutSettings>,
    pub steps: Option<Vec<BundleStep>>,
    pub combination_image_ids: Option<Vec<ObjectId>>,
}

impl BundlePatch {
    /// True when no field is populated (nothing to write).
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.status.is_none()
            && self.discount.is_none()
            && self.layout_type.is_none()
            && self.columns.is_none()
            && self.layout_settings.is_none()
            && self.steps.is_none()
            && self.combination_image_ids.is_none()
    }
}

impl From<BundleDraft> for BundlePatch {
    fn from(draft: BundleDraft) -> Self {
        let layout_settings = draft
            .layout_settings
            .unwrap_or_else(|| LayoutSettings::default_for(draft.layout_type));
        BundlePatch {
            title: Some(draft.title),
            status: Some(draft.status),
            discount: Some(draft.discount),
            layout_type: Some(draft.layout_type),
            columns: Some(draft.columns),
            layout_settings: Some(layout_settings),
            steps: Some(draft.steps),
            combination_image_ids: Some(draft.combination_image_ids),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- enum wire names ------------------------------------------------------

    #[test]
    fn status_round_trips_through_wire_names() {
        for status in [
            BundleStatus::Draft,
            BundleStatus::Active,
            BundleStatus::Inactive,
        ] {
            assert_eq!(BundleStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn unknown_status_parses_to_none() {
        assert_eq!(BundleStatus::parse("archived"), None);
    }

    #[test]
    fn layout_type_round_trips_through_wire_names() {
        for layout in [
            LayoutType::Grid,
            LayoutType::Slider,
            LayoutType::Modal,
            LayoutType::Selection,
        ] {
            assert_eq!(LayoutType::parse(layout.as_str()), Some(layout));
        }
    }

    // -- layout defaults ------------------------------------------------------

    #[test]
    fn each_layout_gets_a_matching_default_shape() {
        for layout in [
            LayoutType::Grid,
            LayoutType::Slider,
            LayoutType::Modal,
            LayoutType::Selection,
        ] {
            let settings = LayoutSettings::default_for(layout);
            assert_eq!(settings.layout_type(), layout);
        }
    }

    #[test]
    fn grid_default_shape_is_stable() {
        assert_eq!(
            LayoutSettings::default_for(LayoutType::Grid),
            LayoutSettings::Grid {
                gap_px: 16,
                show_step_progress: true,
            }
        );
    }

    // -- step serde shims -----------------------------------------------------

    #[test]
    fn step_without_selection_type_defaults_to_product() {
        let json = r#"{"id":"s1","title":"Pick one","position":1,"min_selections":1}"#;
        let step: BundleStep = serde_json::from_str(json).unwrap();
        assert_eq!(step.selection_type, SelectionType::Product);
        assert!(step.products.is_empty());
        assert!(!step.required);
    }

    // -- draft → patch --------------------------------------------------------

    #[test]
    fn draft_without_settings_fills_in_layout_default() {
        let draft = BundleDraft {
            title: "Ski kit".into(),
            status: BundleStatus::Draft,
            discount: DiscountRule::default(),
            layout_type: LayoutType::Slider,
            columns: ColumnCounts::default(),
            layout_settings: None,
            steps: vec![],
            combination_image_ids: vec![],
        };
        let patch = BundlePatch::from(draft);
        assert_eq!(
            patch.layout_settings,
            Some(LayoutSettings::default_for(LayoutType::Slider))
        );
    }

    #[test]
    fn empty_patch_is_empty() {
        assert!(BundlePatch::default().is_empty());
        let patch = BundlePatch {
            title: Some("t".into()),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
