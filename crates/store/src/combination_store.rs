//! Repository for combination-image records.
//!
//! Combinations are content-addressed by their sorted product-id set, but
//! only at the application level — the remote store has no uniqueness
//! constraint, so callers that want one-per-set semantics check
//! [`CombinationStore::find_by_product_set`] first. Image bytes go through
//! the media upload pipeline before any record is written, so a stored
//! combination always references a resolvable asset.

use std::sync::Arc;

use bundlekit_core::combination::{
    same_product_set, validate_product_set, Combination, CombinationImage,
};
use bundlekit_core::error::CoreError;
use bundlekit_core::types::ObjectId;

use crate::codec::{
    decode_combination, encode_combination, CombinationRecord, COMBINATION_FIELD_MEDIA_ID,
    COMBINATION_FIELD_PRODUCTS, COMBINATION_FIELD_TITLE,
};
use crate::error::StoreError;
use crate::media::{MediaService, MediaStatus, MediaUploader, PollPolicy};
use crate::object_store::{
    scan_all, FieldDefinition, FieldInput, FieldType, ObjectDefinition, ObjectStore,
};

/// Remote type name of combination records.
pub const COMBINATION_TYPE: &str = "bundle_combination";

/// Cursor page size used by the full scan.
const SCAN_PAGE_SIZE: u32 = 100;

/// A new image to push through the upload pipeline.
#[derive(Debug, Clone)]
pub struct NewCombinationImage {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// CRUD + set lookup for combination records.
pub struct CombinationStore {
    store: Arc<dyn ObjectStore>,
    media: Arc<dyn MediaService>,
    uploader: MediaUploader,
}

impl CombinationStore {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        media: Arc<dyn MediaService>,
        poll: PollPolicy,
    ) -> Self {
        let uploader = MediaUploader::new(media.clone(), poll);
        Self {
            store,
            media,
            uploader,
        }
    }

    /// The fixed field set registered for the combination type.
    pub fn definition() -> ObjectDefinition {
        ObjectDefinition {
            object_type: COMBINATION_TYPE.to_string(),
            name: "Bundle combination".to_string(),
            fields: vec![
                FieldDefinition::new(COMBINATION_FIELD_PRODUCTS, "Product ids", FieldType::Json),
                FieldDefinition::new(
                    COMBINATION_FIELD_MEDIA_ID,
                    "Media id",
                    FieldType::SingleLineText,
                ),
                FieldDefinition::new(COMBINATION_FIELD_TITLE, "Title", FieldType::SingleLineText),
            ],
        }
    }

    /// Idempotent schema bootstrap; same benign-race semantics as the
    /// bundle store.
    pub async fn ensure_definition(&self) -> Result<(), StoreError> {
        if self.store.definition_exists(COMBINATION_TYPE).await? {
            return Ok(());
        }
        match self.store.create_definition(&Self::definition()).await {
            Ok(()) => {
                tracing::info!(
                    object_type = COMBINATION_TYPE,
                    "Registered record definition",
                );
                Ok(())
            }
            Err(err) if err.is_taken() => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Find an existing combination for the given product set, comparing
    /// order-independently. Full scan; `None` when no record matches.
    pub async fn find_by_product_set(
        &self,
        ids: &[ObjectId],
    ) -> Result<Option<Combination>, StoreError> {
        let records = scan_all(self.store.as_ref(), COMBINATION_TYPE, SCAN_PAGE_SIZE).await?;
        for record in &records {
            let decoded = decode_combination(record);
            if same_product_set(&decoded.product_ids, ids) {
                return Ok(Some(self.resolve(decoded).await?));
            }
        }
        Ok(None)
    }

    /// Upload the image and create the combination record.
    ///
    /// The record is written only after the asset resolves to a URL; an
    /// upload timeout or processing failure leaves no partial record
    /// behind.
    pub async fn create(
        &self,
        product_ids: Vec<ObjectId>,
        image: NewCombinationImage,
        title: Option<String>,
    ) -> Result<Combination, StoreError> {
        validate_product_set(&product_ids).map_err(StoreError::Core)?;
        self.ensure_definition().await?;

        let uploaded = self
            .uploader
            .upload_image(&image.filename, &image.mime_type, image.bytes)
            .await?;

        let fields = encode_combination(&product_ids, &uploaded.media_id, title.as_deref())?;
        let record = self.store.create(COMBINATION_TYPE, &fields).await?;
        let decoded = decode_combination(&record);
        tracing::info!(
            id = %decoded.id,
            products = decoded.product_ids.len(),
            "Combination created",
        );

        Ok(Combination {
            id: decoded.id,
            product_ids: decoded.product_ids,
            image: CombinationImage {
                media_id: uploaded.media_id,
                url: uploaded.url,
            },
            title: decoded.title,
        })
    }

    /// Update title and/or image. The upload pipeline runs only when new
    /// bytes are supplied.
    pub async fn update(
        &self,
        id: &str,
        title: Option<String>,
        image: Option<NewCombinationImage>,
    ) -> Result<Combination, StoreError> {
        if title.is_none() && image.is_none() {
            return Err(CoreError::Validation(
                "Update must supply a new title or a new image".to_string(),
            )
            .into());
        }
        if self.store.get(id).await?.is_none() {
            return Err(StoreError::NotFound { id: id.to_string() });
        }

        let mut fields = Vec::new();
        if let Some(image) = image {
            let uploaded = self
                .uploader
                .upload_image(&image.filename, &image.mime_type, image.bytes)
                .await?;
            fields.push(FieldInput::new(COMBINATION_FIELD_MEDIA_ID, uploaded.media_id));
        }
        if let Some(title) = &title {
            fields.push(FieldInput::new(COMBINATION_FIELD_TITLE, title.clone()));
        }

        let record = self.store.update(id, &fields).await?;
        let decoded = decode_combination(&record);
        tracing::info!(id = %decoded.id, "Combination updated");
        self.resolve(decoded).await
    }

    /// Remove the combination record. The underlying media asset is left
    /// in place; orphaned media cleanup is out of scope.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        if self.store.get(id).await?.is_none() {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        self.store.delete(id).await?;
        tracing::info!(id, "Combination deleted");
        Ok(())
    }

    /// Resolve a batch of combinations by id, fetching each image URL live
    /// (URL resolution is a per-combination remote fetch, not cached).
    /// Missing ids are skipped; resolution failures propagate.
    pub async fn list_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<Combination>, StoreError> {
        let mut combinations = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(record) = self.store.get(id).await? else {
                continue;
            };
            let decoded = decode_combination(&record);
            combinations.push(self.resolve(decoded).await?);
        }
        Ok(combinations)
    }

    /// Attach the live image URL to a decoded record. A stored combination
    /// references a registered asset, so anything but `Ready` here is a
    /// remote-side inconsistency and surfaces as an error.
    async fn resolve(&self, record: CombinationRecord) -> Result<Combination, StoreError> {
        let url = match self.media.media_status(&record.media_id).await? {
            MediaStatus::Ready { url } => url,
            MediaStatus::Processing => {
                return Err(StoreError::Malformed(format!(
                    "media {} of combination {} is still processing",
                    record.media_id, record.id
                )))
            }
            MediaStatus::Failed { reason } => return Err(StoreError::MediaFailed(reason)),
        };

        Ok(Combination {
            id: record.id,
            product_ids: record.product_ids,
            image: CombinationImage {
                media_id: record.media_id,
                url,
            },
            title: record.title,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use assert_matches::assert_matches;
    use std::time::Duration;

    fn fixtures() -> (Arc<InMemoryStore>, CombinationStore) {
        let remote = Arc::new(InMemoryStore::new());
        let poll = PollPolicy {
            max_attempts: 5,
            interval: Duration::ZERO,
        };
        let combinations = CombinationStore::new(remote.clone(), remote.clone(), poll);
        (remote, combinations)
    }

    fn image() -> NewCombinationImage {
        NewCombinationImage {
            filename: "combo.png".into(),
            mime_type: "image/png".into(),
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
        }
    }

    fn ids(raw: &[&str]) -> Vec<ObjectId> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn create_then_find_by_set_in_any_order() {
        let (_, combinations) = fixtures();
        let created = combinations
            .create(ids(&["p1", "p2"]), image(), Some("Pair".into()))
            .await
            .unwrap();

        let found = combinations
            .find_by_product_set(&ids(&["p2", "p1"]))
            .await
            .unwrap()
            .expect("set lookup should match regardless of order");

        assert_eq!(found.id, created.id);
        assert_eq!(found.image.media_id, created.image.media_id);
        assert!(!found.image.url.is_empty());
    }

    #[tokio::test]
    async fn find_requires_exact_set() {
        let (_, combinations) = fixtures();
        combinations
            .create(ids(&["p1", "p2"]), image(), None)
            .await
            .unwrap();

        assert!(combinations
            .find_by_product_set(&ids(&["p1", "p2", "p3"]))
            .await
            .unwrap()
            .is_none());
        assert!(combinations
            .find_by_product_set(&ids(&["p1", "p9"]))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn upload_timeout_creates_no_record() {
        let (remote, _) = fixtures();
        remote.set_media_ready_after(100).await;
        let poll = PollPolicy {
            max_attempts: 2,
            interval: Duration::ZERO,
        };
        let combinations = CombinationStore::new(remote.clone(), remote.clone(), poll);

        let err = combinations
            .create(ids(&["p1", "p2"]), image(), None)
            .await
            .unwrap_err();

        assert_matches!(err, StoreError::UploadTimeout { .. });
        assert_eq!(remote.record_count(COMBINATION_TYPE).await, 0);
    }

    #[tokio::test]
    async fn invalid_member_counts_rejected_before_any_upload() {
        let (remote, combinations) = fixtures();
        assert_matches!(
            combinations.create(ids(&["p1"]), image(), None).await.unwrap_err(),
            StoreError::Core(CoreError::Validation(_))
        );
        assert_eq!(remote.media_asset_count().await, 0);
    }

    #[tokio::test]
    async fn title_only_update_skips_the_pipeline() {
        let (remote, combinations) = fixtures();
        let created = combinations
            .create(ids(&["p1", "p2"]), image(), None)
            .await
            .unwrap();
        let assets_before = remote.media_asset_count().await;

        let updated = combinations
            .update(&created.id, Some("Renamed".into()), None)
            .await
            .unwrap();

        assert_eq!(updated.title.as_deref(), Some("Renamed"));
        assert_eq!(updated.image.media_id, created.image.media_id);
        assert_eq!(remote.media_asset_count().await, assets_before);
    }

    #[tokio::test]
    async fn image_update_reruns_the_pipeline() {
        let (remote, combinations) = fixtures();
        let created = combinations
            .create(ids(&["p1", "p2"]), image(), None)
            .await
            .unwrap();

        let updated = combinations
            .update(&created.id, None, Some(image()))
            .await
            .unwrap();

        assert_ne!(updated.image.media_id, created.image.media_id);
        assert_eq!(remote.media_asset_count().await, 2);
    }

    #[tokio::test]
    async fn list_by_ids_skips_missing_and_resolves_urls() {
        let (_, combinations) = fixtures();
        let a = combinations.create(ids(&["p1", "p2"]), image(), None).await.unwrap();
        let b = combinations.create(ids(&["p3", "p4"]), image(), None).await.unwrap();

        let listed = combinations
            .list_by_ids(&[a.id.clone(), "gid://shop/Combination/404".into(), b.id.clone()])
            .await
            .unwrap();

        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|c| c.image.url.starts_with("https://")));
    }

    #[tokio::test]
    async fn delete_removes_only_the_record() {
        let (remote, combinations) = fixtures();
        let created = combinations.create(ids(&["p1", "p2"]), image(), None).await.unwrap();

        combinations.delete(&created.id).await.unwrap();

        assert_eq!(remote.record_count(COMBINATION_TYPE).await, 0);
        // The media asset stays; cleanup is out of scope.
        assert_eq!(remote.media_asset_count().await, 1);
    }

    #[tokio::test]
    async fn empty_update_rejected() {
        let (_, combinations) = fixtures();
        assert_matches!(
            combinations.update("gid://x", None, None).await.unwrap_err(),
            StoreError::Core(CoreError::Validation(_))
        );
    }
}
