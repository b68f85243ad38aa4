//! Bidirectional mapping between domain entities and flat field lists.
//!
//! Encoding emits one field per populated attribute; composite attributes
//! (`steps`, `layout_settings`, `combination_images`) serialize as JSON
//! blobs. The steps blob carries an explicit schema version envelope so
//! future shape changes stay decodable per version; the decoder also
//! accepts the bare legacy array.
//!
//! Decoding never fails: malformed stored data degrades to documented
//! defaults rather than failing the read. Unknown status values decode to
//! `draft`, unparsable numerics to 0 (discount) and 2/4 (columns), a
//! missing settings blob synthesizes the per-layout default shape, and a
//! step stored without `selection_type` decodes to `product`.

use serde::{Deserialize, Serialize};

use bundlekit_core::bundle::{
    Bundle, BundlePatch, BundleStatus, BundleStep, ColumnCounts, DiscountRule, DiscountType,
    LayoutSettings, LayoutType, DEFAULT_DESKTOP_COLUMNS, DEFAULT_MOBILE_COLUMNS,
};
use bundlekit_core::types::ObjectId;

use crate::error::StoreError;
use crate::object_store::{FieldInput, ObjectRecord};

// ---------------------------------------------------------------------------
// Bundle field keys
// ---------------------------------------------------------------------------

pub const FIELD_TITLE: &str = "title";
pub const FIELD_STATUS: &str = "status";
pub const FIELD_DISCOUNT_TYPE: &str = "discount_type";
pub const FIELD_DISCOUNT_VALUE: &str = "discount_value";
pub const FIELD_LAYOUT_TYPE: &str = "layout_type";
pub const FIELD_MOBILE_COLUMNS: &str = "mobile_columns";
pub const FIELD_DESKTOP_COLUMNS: &str = "desktop_columns";
pub const FIELD_LAYOUT_SETTINGS: &str = "layout_settings";
pub const FIELD_STEPS: &str = "steps";
pub const FIELD_COMBINATION_IMAGES: &str = "combination_images";

/// Current schema version of the steps blob.
pub const STEPS_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Combination field keys
// ---------------------------------------------------------------------------

pub const COMBINATION_FIELD_PRODUCTS: &str = "product_ids";
pub const COMBINATION_FIELD_MEDIA_ID: &str = "media_id";
pub const COMBINATION_FIELD_TITLE: &str = "title";

// ---------------------------------------------------------------------------
// Bundle encoding
// ---------------------------------------------------------------------------

/// Versioned envelope for the steps blob.
#[derive(Serialize, Deserialize)]
struct StepsBlob {
    v: u32,
    steps: Vec<BundleStep>,
}

/// Encode a partial update: one field per populated attribute, absent
/// attributes emit no field.
pub fn encode_patch(patch: &BundlePatch) -> Result<Vec<FieldInput>, StoreError> {
    let mut fields = Vec::new();

    if let Some(title) = &patch.title {
        fields.push(FieldInput::new(FIELD_TITLE, title.clone()));
    }
    if let Some(status) = patch.status {
        fields.push(FieldInput::new(FIELD_STATUS, status.as_str()));
    }
    if let Some(discount) = &patch.discount {
        fields.push(FieldInput::new(
            FIELD_DISCOUNT_TYPE,
            discount.discount_type.as_str(),
        ));
        fields.push(FieldInput::new(
            FIELD_DISCOUNT_VALUE,
            discount.value.to_string(),
        ));
    }
    if let Some(layout) = patch.layout_type {
        fields.push(FieldInput::new(FIELD_LAYOUT_TYPE, layout.as_str()));
    }
    if let Some(columns) = &patch.columns {
        fields.push(FieldInput::new(
            FIELD_MOBILE_COLUMNS,
            columns.mobile.to_string(),
        ));
        fields.push(FieldInput::new(
            FIELD_DESKTOP_COLUMNS,
            columns.desktop.to_string(),
        ));
    }
    if let Some(settings) = &patch.layout_settings {
        fields.push(FieldInput::new(
            FIELD_LAYOUT_SETTINGS,
            serde_json::to_string(settings)?,
        ));
    }
    if let Some(steps) = &patch.steps {
        let blob = StepsBlob {
            v: STEPS_SCHEMA_VERSION,
            steps: steps.clone(),
        };
        fields.push(FieldInput::new(FIELD_STEPS, serde_json::to_string(&blob)?));
    }
    if let Some(ids) = &patch.combination_image_ids {
        fields.push(FieldInput::new(
            FIELD_COMBINATION_IMAGES,
            serde_json::to_string(ids)?,
        ));
    }

    Ok(fields)
}

// ---------------------------------------------------------------------------
// Bundle decoding
// ---------------------------------------------------------------------------

/// Decode a stored record into a [`Bundle`]. Never fails; see the module
/// docs for the defaulting rules.
pub fn decode_bundle(record: &ObjectRecord) -> Bundle {
    let title = record.field(FIELD_TITLE).unwrap_or_default().to_string();

    let status = record
        .field(FIELD_STATUS)
        .and_then(BundleStatus::parse)
        .unwrap_or_default();

    let discount = DiscountRule {
        discount_type: record
            .field(FIELD_DISCOUNT_TYPE)
            .and_then(DiscountType::parse)
            .unwrap_or_default(),
        value: parse_f64(record.field(FIELD_DISCOUNT_VALUE), 0.0),
    };

    let layout_type = record
        .field(FIELD_LAYOUT_TYPE)
        .and_then(LayoutType::parse)
        .unwrap_or_default();

    let columns = ColumnCounts {
        mobile: parse_u32(record.field(FIELD_MOBILE_COLUMNS), DEFAULT_MOBILE_COLUMNS),
        desktop: parse_u32(record.field(FIELD_DESKTOP_COLUMNS), DEFAULT_DESKTOP_COLUMNS),
    };

    let layout_settings = record
        .field(FIELD_LAYOUT_SETTINGS)
        .and_then(|raw| serde_json::from_str::<LayoutSettings>(raw).ok())
        .unwrap_or_else(|| LayoutSettings::default_for(layout_type));

    let steps = record.field(FIELD_STEPS).map(decode_steps).unwrap_or_default();

    let combination_image_ids = record
        .field(FIELD_COMBINATION_IMAGES)
        .and_then(|raw| serde_json::from_str::<Vec<ObjectId>>(raw).ok())
        .unwrap_or_default();

    Bundle {
        id: record.id.clone(),
        handle: record.handle.clone(),
        title,
        status,
        discount,
        layout_type,
        columns,
        layout_settings,
        steps,
        combination_image_ids,
    }
}

/// Decode a steps blob, accepting both the versioned envelope and the bare
/// legacy array. Malformed blobs degrade to an empty list.
fn decode_steps(raw: &str) -> Vec<BundleStep> {
    if let Ok(blob) = serde_json::from_str::<StepsBlob>(raw) {
        return blob.steps;
    }
    serde_json::from_str::<Vec<BundleStep>>(raw).unwrap_or_default()
}

fn parse_u32(raw: Option<&str>, default: u32) -> u32 {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn parse_f64(raw: Option<&str>, default: f64) -> f64 {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

// ---------------------------------------------------------------------------
// Combination encoding / decoding
// ---------------------------------------------------------------------------

/// A combination record before its image URL has been resolved. The URL is
/// never stored; it is fetched live from the media service per read.
#[derive(Debug, Clone)]
pub struct CombinationRecord {
    pub id: ObjectId,
    pub product_ids: Vec<ObjectId>,
    pub media_id: ObjectId,
    pub title: Option<String>,
}

/// Encode a combination's fields. `product_ids` is stored sorted so records
/// for the same set compare equal without re-sorting on every read.
pub fn encode_combination(
    product_ids: &[ObjectId],
    media_id: &str,
    title: Option<&str>,
) -> Result<Vec<FieldInput>, StoreError> {
    let sorted = bundlekit_core::combination::product_set_key(product_ids);
    let mut fields = vec![
        FieldInput::new(COMBINATION_FIELD_PRODUCTS, serde_json::to_string(&sorted)?),
        FieldInput::new(COMBINATION_FIELD_MEDIA_ID, media_id),
    ];
    if let Some(title) = title {
        fields.push(FieldInput::new(COMBINATION_FIELD_TITLE, title));
    }
    Ok(fields)
}

/// Decode a stored combination record. Same never-fail discipline as
/// [`decode_bundle`]: a malformed product list degrades to empty.
pub fn decode_combination(record: &ObjectRecord) -> CombinationRecord {
    let product_ids = record
        .field(COMBINATION_FIELD_PRODUCTS)
        .and_then(|raw| serde_json::from_str::<Vec<ObjectId>>(raw).ok())
        .unwrap_or_default();

    CombinationRecord {
        id: record.id.clone(),
        product_ids,
        media_id: record
            .field(COMBINATION_FIELD_MEDIA_ID)
            .unwrap_or_default()
            .to_string(),
        title: record
            .field(COMBINATION_FIELD_TITLE)
            .filter(|t| !t.is_empty())
            .map(str::to_string),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use bundlekit_core::bundle::{BundleProduct, SelectionType};
    use crate::object_store::StoredField;

    fn record_with(fields: Vec<(&str, String)>) -> ObjectRecord {
        ObjectRecord {
            id: "gid://shop/Bundle/1".into(),
            handle: "bundle-1".into(),
            object_type: "product_bundle".into(),
            fields: fields
                .into_iter()
                .map(|(k, v)| StoredField {
                    key: k.to_string(),
                    value: v,
                })
                .collect(),
            updated_at: None,
        }
    }

    fn sample_patch() -> BundlePatch {
        BundlePatch {
            title: Some("Winter kit".into()),
            status: Some(BundleStatus::Active),
            discount: Some(DiscountRule {
                discount_type: DiscountType::Fixed,
                value: 12.5,
            }),
            layout_type: Some(LayoutType::Slider),
            columns: Some(ColumnCounts {
                mobile: 1,
                desktop: 3,
            }),
            layout_settings: Some(LayoutSettings::default_for(LayoutType::Slider)),
            steps: Some(vec![BundleStep {
                id: "step-1".into(),
                title: "Pick skis".into(),
                description: Some("Any pair".into()),
                position: 1,
                min_selections: 1,
                max_selections: Some(2),
                required: true,
                selection_type: SelectionType::Product,
                products: vec![BundleProduct {
                    product_id: "gid://shop/Product/5".into(),
                    position: 1,
                }],
            }]),
            combination_image_ids: Some(vec!["gid://shop/Combination/3".into()]),
        }
    }

    // -- round-trip -----------------------------------------------------------

    #[test]
    fn decode_reproduces_every_encoded_field() {
        let patch = sample_patch();
        let fields = encode_patch(&patch).unwrap();
        let record = record_with(
            fields
                .iter()
                .map(|f| (f.key.as_str(), f.value.clone()))
                .collect(),
        );

        let bundle = decode_bundle(&record);

        assert_eq!(bundle.title, "Winter kit");
        assert_eq!(bundle.status, BundleStatus::Active);
        assert_eq!(bundle.discount, patch.discount.unwrap());
        assert_eq!(bundle.layout_type, LayoutType::Slider);
        assert_eq!(bundle.columns, patch.columns.unwrap());
        assert_eq!(bundle.layout_settings, patch.layout_settings.unwrap());
        assert_eq!(bundle.steps, patch.steps.unwrap());
        assert_eq!(
            bundle.combination_image_ids,
            patch.combination_image_ids.unwrap()
        );
    }

    #[test]
    fn absent_attributes_emit_no_field() {
        let patch = BundlePatch {
            title: Some("Only title".into()),
            ..Default::default()
        };
        let fields = encode_patch(&patch).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].key, FIELD_TITLE);
    }

    // -- defaulting -----------------------------------------------------------

    #[test]
    fn missing_layout_settings_synthesized_from_layout_type() {
        let record = record_with(vec![
            (FIELD_TITLE, "Bare".into()),
            (FIELD_LAYOUT_TYPE, "grid".into()),
        ]);
        let bundle = decode_bundle(&record);
        assert_eq!(
            bundle.layout_settings,
            LayoutSettings::default_for(LayoutType::Grid)
        );
    }

    #[test]
    fn unparsable_numerics_fall_back_to_documented_defaults() {
        let record = record_with(vec![
            (FIELD_DISCOUNT_VALUE, "not-a-number".into()),
            (FIELD_MOBILE_COLUMNS, "".into()),
            (FIELD_DESKTOP_COLUMNS, "???".into()),
        ]);
        let bundle = decode_bundle(&record);
        assert_eq!(bundle.discount.value, 0.0);
        assert_eq!(bundle.columns.mobile, 2);
        assert_eq!(bundle.columns.desktop, 4);
    }

    #[test]
    fn unknown_status_decodes_to_draft() {
        let record = record_with(vec![(FIELD_STATUS, "archived".into())]);
        assert_eq!(decode_bundle(&record).status, BundleStatus::Draft);
    }

    #[test]
    fn malformed_steps_blob_degrades_to_empty() {
        let record = record_with(vec![(FIELD_STEPS, "{not json".into())]);
        assert!(decode_bundle(&record).steps.is_empty());
    }

    // -- legacy shapes --------------------------------------------------------

    #[test]
    fn bare_legacy_steps_array_still_decodes() {
        let legacy = r#"[{"id":"s1","title":"Pick","position":1,"min_selections":1}]"#;
        let record = record_with(vec![(FIELD_STEPS, legacy.into())]);
        let bundle = decode_bundle(&record);
        assert_eq!(bundle.steps.len(), 1);
        assert_eq!(bundle.steps[0].selection_type, SelectionType::Product);
    }

    #[test]
    fn versioned_steps_envelope_decodes() {
        let patch = BundlePatch {
            steps: Some(vec![BundleStep {
                id: "s1".into(),
                title: "Pick".into(),
                description: None,
                position: 1,
                min_selections: 1,
                max_selections: None,
                required: false,
                selection_type: SelectionType::Product,
                products: vec![],
            }]),
            ..Default::default()
        };
        let fields = encode_patch(&patch).unwrap();
        assert!(fields[0].value.starts_with(r#"{"v":1"#));

        let record = record_with(vec![(FIELD_STEPS, fields[0].value.clone())]);
        assert_eq!(decode_bundle(&record).steps.len(), 1);
    }

    // -- combinations ---------------------------------------------------------

    #[test]
    fn combination_products_stored_sorted() {
        let ids: Vec<ObjectId> = vec!["b".into(), "a".into()];
        let fields = encode_combination(&ids, "gid://shop/Media/1", None).unwrap();
        assert_eq!(fields[0].value, r#"["a","b"]"#);
    }

    #[test]
    fn combination_round_trips() {
        let ids: Vec<ObjectId> = vec!["p2".into(), "p1".into()];
        let fields = encode_combination(&ids, "gid://shop/Media/9", Some("Pair")).unwrap();
        let record = ObjectRecord {
            id: "gid://shop/Combination/1".into(),
            handle: "combo-1".into(),
            object_type: "bundle_combination".into(),
            fields: fields
                .into_iter()
                .map(|f| StoredField {
                    key: f.key,
                    value: f.value,
                })
                .collect(),
            updated_at: None,
        };
        let decoded = decode_combination(&record);
        assert_eq!(decoded.product_ids, vec!["p1".to_string(), "p2".to_string()]);
        assert_eq!(decoded.media_id, "gid://shop/Media/9");
        assert_eq!(decoded.title.as_deref(), Some("Pair"));
    }
}
