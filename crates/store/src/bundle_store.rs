//! Repository for bundle records in the remote object store.
//!
//! The remote offers no filter predicate and no secondary index, so every
//! list is a full cursor scan with client-side status filtering and
//! windowing. O(collection size) per call — an explicit ceiling, acceptable
//! at the expected tens-to-low-hundreds of records.

use std::sync::Arc;

use bundlekit_core::bundle::{Bundle, BundleDraft, BundlePatch, BundleStatus, BundleStep};
use bundlekit_core::error::CoreError;

use crate::codec::{
    decode_bundle, encode_patch, FIELD_COMBINATION_IMAGES, FIELD_DESKTOP_COLUMNS,
    FIELD_DISCOUNT_TYPE, FIELD_DISCOUNT_VALUE, FIELD_LAYOUT_SETTINGS, FIELD_LAYOUT_TYPE,
    FIELD_MOBILE_COLUMNS, FIELD_STATUS, FIELD_STEPS, FIELD_TITLE,
};
use crate::error::StoreError;
use crate::object_store::{
    scan_all, FieldDefinition, FieldType, ObjectDefinition, ObjectStore,
};

/// Remote type name of bundle records.
pub const BUNDLE_TYPE: &str = "product_bundle";

/// Cursor page size used by the full scan.
pub const SCAN_PAGE_SIZE: u32 = 100;

/// Maximum client-facing page size.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// One client-facing page of the filtered collection.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BundlePage {
    pub items: Vec<Bundle>,
    /// Count of the *filtered* collection, not the page.
    pub total: usize,
    pub has_next: bool,
}

/// CRUD for bundle records, plus clone and scan helpers.
pub struct BundleStore {
    store: Arc<dyn ObjectStore>,
}

impl BundleStore {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// The fixed field set registered for the bundle type.
    pub fn definition() -> ObjectDefinition {
        ObjectDefinition {
            object_type: BUNDLE_TYPE.to_string(),
            name: "Product bundle".to_string(),
            fields: vec![
                FieldDefinition::new(FIELD_TITLE, "Title", FieldType::SingleLineText),
                FieldDefinition::new(FIELD_STATUS, "Status", FieldType::SingleLineText),
                FieldDefinition::new(
                    FIELD_DISCOUNT_TYPE,
                    "Discount type",
                    FieldType::SingleLineText,
                ),
                FieldDefinition::new(FIELD_DISCOUNT_VALUE, "Discount value", FieldType::Decimal),
                FieldDefinition::new(FIELD_LAYOUT_TYPE, "Layout type", FieldType::SingleLineText),
                FieldDefinition::new(FIELD_MOBILE_COLUMNS, "Mobile columns", FieldType::Integer),
                FieldDefinition::new(FIELD_DESKTOP_COLUMNS, "Desktop columns", FieldType::Integer),
                FieldDefinition::new(FIELD_LAYOUT_SETTINGS, "Layout settings", FieldType::Json),
                FieldDefinition::new(FIELD_STEPS, "Steps", FieldType::Json),
                FieldDefinition::new(
                    FIELD_COMBINATION_IMAGES,
                    "Combination images",
                    FieldType::Json,
                ),
            ],
        }
    }

    /// Idempotent schema bootstrap: check-then-create, treating a
    /// "definition already exists" user error from a concurrent caller as
    /// success.
    pub async fn ensure_definition(&self) -> Result<(), StoreError> {
        if self.store.definition_exists(BUNDLE_TYPE).await? {
            return Ok(());
        }
        match self.store.create_definition(&Self::definition()).await {
            Ok(()) => {
                tracing::info!(object_type = BUNDLE_TYPE, "Registered record definition");
                Ok(())
            }
            Err(err) if err.is_taken() => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Full-scan the collection and decode every record.
    async fn scan_decoded(&self) -> Result<Vec<Bundle>, StoreError> {
        let records = scan_all(self.store.as_ref(), BUNDLE_TYPE, SCAN_PAGE_SIZE).await?;
        Ok(records.iter().map(decode_bundle).collect())
    }

    /// List bundles with in-memory status filtering and windowing.
    ///
    /// `page` is 1-based; `limit` is capped at [`MAX_PAGE_LIMIT`]. `total`
    /// counts the filtered collection.
    pub async fn list(
        &self,
        page: u32,
        limit: u32,
        status: Option<BundleStatus>,
    ) -> Result<BundlePage, StoreError> {
        if page == 0 {
            return Err(CoreError::Validation("page is 1-based".to_string()).into());
        }
        if limit == 0 {
            return Err(CoreError::Validation("limit must be at least 1".to_string()).into());
        }
        if limit > MAX_PAGE_LIMIT {
            return Err(CoreError::LimitExceeded(format!(
                "limit must not exceed {MAX_PAGE_LIMIT}"
            ))
            .into());
        }

        let mut bundles = self.scan_decoded().await?;
        if let Some(status) = status {
            bundles.retain(|b| b.status == status);
        }

        let total = bundles.len();
        let start = ((u64::from(page) - 1) * u64::from(limit)) as usize;
        let end = start.saturating_add(limit as usize).min(total);
        let items = if start < total {
            bundles[start..end].to_vec()
        } else {
            Vec::new()
        };
        let has_next = end < total;

        Ok(BundlePage {
            items,
            total,
            has_next,
        })
    }

    /// All active bundles, in scan order. Used by the synchronizer.
    pub async fn list_active(&self) -> Result<Vec<Bundle>, StoreError> {
        let mut bundles = self.scan_decoded().await?;
        bundles.retain(|b| b.status == BundleStatus::Active);
        Ok(bundles)
    }

    /// Fetch a single bundle. Absence is `Ok(None)`, not an error.
    pub async fn get(&self, id: &str) -> Result<Option<Bundle>, StoreError> {
        let record = self.store.get(id).await?;
        Ok(record.as_ref().map(decode_bundle))
    }

    /// Create a bundle. Steps arriving without an id get one generated
    /// here; that id is never regenerated on later updates.
    pub async fn create(&self, mut draft: BundleDraft) -> Result<Bundle, StoreError> {
        self.ensure_definition().await?;

        for step in &mut draft.steps {
            if step.id.is_empty() {
                step.id = BundleStep::fresh_id();
            }
        }

        let fields = encode_patch(&BundlePatch::from(draft))?;
        let record = self.store.create(BUNDLE_TYPE, &fields).await?;
        let bundle = decode_bundle(&record);
        tracing::info!(id = %bundle.id, handle = %bundle.handle, "Bundle created");
        Ok(bundle)
    }

    /// Partially update a bundle: only the provided fields are written,
    /// each as a full field overwrite.
    ///
    /// Existence is verified with a pre-read, so absence surfaces as
    /// [`StoreError::NotFound`] instead of having to be sniffed out of the
    /// remote's update-error text.
    pub async fn update(&self, id: &str, patch: BundlePatch) -> Result<Bundle, StoreError> {
        if self.store.get(id).await?.is_none() {
            return Err(StoreError::NotFound { id: id.to_string() });
        }

        let fields = encode_patch(&patch)?;
        let record = self.store.update(id, &fields).await?;
        let bundle = decode_bundle(&record);
        tracing::info!(id = %bundle.id, fields = fields.len(), "Bundle updated");
        Ok(bundle)
    }

    /// Delete a bundle. The caller is responsible for re-syncing the
    /// cart-transform snapshot afterwards.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        if self.store.get(id).await?.is_none() {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        self.store.delete(id).await?;
        tracing::info!(id, "Bundle deleted");
        Ok(())
    }

    /// Clone a bundle under a new title and status.
    ///
    /// Deep-copies every attribute except identity: the new record gets a
    /// fresh id/handle from the store and fresh step ids, and carries zero
    /// combination references — those stay owned by the source bundle's
    /// product set.
    pub async fn duplicate(
        &self,
        id: &str,
        new_title: String,
        new_status: BundleStatus,
    ) -> Result<Bundle, StoreError> {
        let source = self
            .get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;

        let steps = source
            .steps
            .into_iter()
            .map(|mut step| {
                step.id = BundleStep::fresh_id();
                step
            })
            .collect();

        let draft = BundleDraft {
            title: new_title,
            status: new_status,
            discount: source.discount,
            layout_type: source.layout_type,
            columns: source.columns,
            layout_settings: Some(source.layout_settings),
            steps,
            combination_image_ids: Vec::new(),
        };

        let clone = self.create(draft).await?;
        tracing::info!(source = id, clone = %clone.id, "Bundle duplicated");
        Ok(clone)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
