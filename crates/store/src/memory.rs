//! In-process implementation of the remote-store traits.
//!
//! A complete, deterministic stand-in for the remote object store, media
//! service, and derived-view store, so every store-layer property is
//! testable without a network (and the api crate's integration tests can
//! drive the real router end to end). Mirrors the remote's observable
//! behavior: insertion-ordered cursor enumeration, handle collisions
//! reported through user-error text, asynchronous media readiness.
//!
//! Failure injection is deliberately narrow: fail one id's delete/update,
//! fail snapshot writes, delay or fail media readiness.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use bundlekit_core::types::ObjectId;

use crate::error::{StoreError, UserError};
use crate::media::{MediaService, MediaStatus, StagedTarget};
use crate::object_store::{
    FieldInput, ObjectDefinition, ObjectRecord, ObjectStore, RecordPage, StoredField,
};
use crate::sync::SnapshotStore;

/// A registered media asset and its readiness countdown.
struct MediaAsset {
    url: String,
    polls_remaining: u32,
}

#[derive(Default)]
struct Inner {
    sequence: u64,
    definitions: HashMap<String, ObjectDefinition>,
    /// Insertion-ordered, like the remote's cursor enumeration.
    records: Vec<ObjectRecord>,
    handles: HashSet<String>,
    staged: HashMap<String, Vec<u8>>,
    media: HashMap<String, MediaAsset>,
    snapshot: Option<String>,
    fail_deletes: HashSet<String>,
    fail_updates: HashSet<String>,
    fail_snapshot_writes: bool,
    media_ready_after: u32,
    media_failing: bool,
}

/// The in-memory remote. Cheap to construct per test; share via `Arc` to
/// hand the same instance to every store that would talk to the same shop.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // -- failure / readiness injection --------------------------------------

    /// Make every delete of `id` fail with a remote error.
    pub async fn fail_delete_of(&self, id: &str) {
        self.inner.lock().await.fail_deletes.insert(id.to_string());
    }

    /// Make every update of `id` fail with a remote error.
    pub async fn fail_update_of(&self, id: &str) {
        self.inner.lock().await.fail_updates.insert(id.to_string());
    }

    /// Make snapshot writes fail until called again with `false`.
    pub async fn fail_snapshot_writes(&self, failing: bool) {
        self.inner.lock().await.fail_snapshot_writes = failing;
    }

    /// Newly registered media assets report `Processing` for this many
    /// status polls before becoming `Ready`.
    pub async fn set_media_ready_after(&self, polls: u32) {
        self.inner.lock().await.media_ready_after = polls;
    }

    /// Make every media status poll report a terminal failure.
    pub async fn set_media_failing(&self, failing: bool) {
        self.inner.lock().await.media_failing = failing;
    }

    // -- inspection ---------------------------------------------------------

    /// The currently stored snapshot document, if any.
    pub async fn stored_snapshot(&self) -> Option<String> {
        self.inner.lock().await.snapshot.clone()
    }

    /// Number of records of the given type.
    pub async fn record_count(&self, object_type: &str) -> usize {
        self.inner
            .lock()
            .await
            .records
            .iter()
            .filter(|r| r.object_type == object_type)
            .count()
    }

    /// Number of registered media assets.
    pub async fn media_asset_count(&self) -> usize {
        self.inner.lock().await.media.len()
    }
}

/// Derive a handle slug the way the remote does: lowercased title with
/// non-alphanumeric runs collapsed to single hyphens.
fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut last_was_hyphen = true;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

impl Inner {
    fn next_id(&mut self, object_type: &str) -> String {
        self.sequence += 1;
        format!("gid://shop/{object_type}/{}", self.sequence)
    }

    fn apply_fields(record: &mut ObjectRecord, fields: &[FieldInput]) {
        for input in fields {
            match record.fields.iter_mut().find(|f| f.key == input.key) {
                Some(existing) => existing.value = input.value.clone(),
                None => record.fields.push(StoredField {
                    key: input.key.clone(),
                    value: input.value.clone(),
                }),
            }
        }
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn definition_exists(&self, object_type: &str) -> Result<bool, StoreError> {
        Ok(self.inner.lock().await.definitions.contains_key(object_type))
    }

    async fn create_definition(&self, definition: &ObjectDefinition) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.definitions.contains_key(&definition.object_type) {
            return Err(StoreError::UserErrors(vec![UserError {
                field: Some("type".to_string()),
                message: "Type has already been taken".to_string(),
            }]));
        }
        inner
            .definitions
            .insert(definition.object_type.clone(), definition.clone());
        Ok(())
    }

    async fn create(
        &self,
        object_type: &str,
        fields: &[FieldInput],
    ) -> Result<ObjectRecord, StoreError> {
        let mut inner = self.inner.lock().await;

        let title = fields
            .iter()
            .find(|f| f.key == "title")
            .map(|f| f.value.clone());
        let handle = match title.as_deref().map(slugify).filter(|s| !s.is_empty()) {
            Some(slug) => slug,
            None => format!("{object_type}-{}", inner.sequence + 1),
        };
        if inner.handles.contains(&handle) {
            return Err(StoreError::UserErrors(vec![UserError {
                field: Some("handle".to_string()),
                message: "Handle has already been taken".to_string(),
            }]));
        }

        let id = inner.next_id(object_type);
        let mut record = ObjectRecord {
            id,
            handle: handle.clone(),
            object_type: object_type.to_string(),
            fields: Vec::new(),
            updated_at: None,
        };
        Inner::apply_fields(&mut record, fields);

        inner.handles.insert(handle);
        inner.records.push(record.clone());
        Ok(record)
    }

    async fn get(&self, id: &str) -> Result<Option<ObjectRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.records.iter().find(|r| r.id == id).cloned())
    }

    async fn update(&self, id: &str, fields: &[FieldInput]) -> Result<ObjectRecord, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.fail_updates.contains(id) {
            return Err(StoreError::Remote {
                status: 500,
                body: "injected update failure".to_string(),
            });
        }
        let record = inner
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        Inner::apply_fields(record, fields);
        Ok(record.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.fail_deletes.contains(id) {
            return Err(StoreError::Remote {
                status: 500,
                body: "injected delete failure".to_string(),
            });
        }
        let Some(index) = inner.records.iter().position(|r| r.id == id) else {
            return Err(StoreError::NotFound { id: id.to_string() });
        };
        let record = inner.records.remove(index);
        inner.handles.remove(&record.handle);
        Ok(())
    }

    async fn list(
        &self,
        object_type: &str,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<RecordPage, StoreError> {
        let inner = self.inner.lock().await;
        let filtered: Vec<&ObjectRecord> = inner
            .records
            .iter()
            .filter(|r| r.object_type == object_type)
            .collect();

        let start: usize = match cursor {
            Some(raw) => raw
                .parse()
                .map_err(|_| StoreError::Malformed(format!("bad cursor: {raw}")))?,
            None => 0,
        };
        let end = start.saturating_add(page_size.max(1) as usize).min(filtered.len());
        let records = filtered[start.min(end)..end].iter().map(|r| (*r).clone()).collect();
        let next = if end < filtered.len() {
            Some(end.to_string())
        } else {
            None
        };

        Ok(RecordPage {
            records,
            cursor: next,
        })
    }
}

#[async_trait]
impl MediaService for InMemoryStore {
    async fn stage_upload(
        &self,
        _filename: &str,
        _mime_type: &str,
        _byte_size: u64,
    ) -> Result<StagedTarget, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.sequence += 1;
        let resource_url = format!("memory://staged/{}", inner.sequence);
        Ok(StagedTarget {
            url: format!("memory://upload/{}", inner.sequence),
            resource_url,
            parameters: Vec::new(),
        })
    }

    async fn transfer(
        &self,
        target: &StagedTarget,
        _filename: &str,
        _mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.staged.insert(target.resource_url.clone(), bytes);
        Ok(())
    }

    async fn register(
        &self,
        resource_url: &str,
        _alt: Option<&str>,
    ) -> Result<ObjectId, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.staged.remove(resource_url).is_none() {
            return Err(StoreError::Malformed(format!(
                "nothing staged at {resource_url}"
            )));
        }
        inner.sequence += 1;
        let media_id = format!("gid://shop/MediaImage/{}", inner.sequence);
        let asset = MediaAsset {
            url: format!("https://cdn.example.com/media/{}.png", inner.sequence),
            polls_remaining: inner.media_ready_after,
        };
        inner.media.insert(media_id.clone(), asset);
        Ok(media_id)
    }

    async fn media_status(&self, media_id: &str) -> Result<MediaStatus, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.media_failing {
            return Ok(MediaStatus::Failed {
                reason: "injected processing failure".to_string(),
            });
        }
        let asset = inner
            .media
            .get_mut(media_id)
            .ok_or_else(|| StoreError::NotFound {
                id: media_id.to_string(),
            })?;
        if asset.polls_remaining > 0 {
            asset.polls_remaining -= 1;
            return Ok(MediaStatus::Processing);
        }
        Ok(MediaStatus::Ready {
            url: asset.url.clone(),
        })
    }
}

#[async_trait]
impl SnapshotStore for InMemoryStore {
    async fn write_snapshot(&self, payload: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.fail_snapshot_writes {
            return Err(StoreError::Remote {
                status: 500,
                body: "injected snapshot write failure".to_string(),
            });
        }
        inner.snapshot = Some(payload.to_string());
        Ok(())
    }

    async fn read_snapshot(&self) -> Result<Option<String>, StoreError> {
        Ok(self.inner.lock().await.snapshot.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn field(key: &str, value: &str) -> FieldInput {
        FieldInput::new(key, value)
    }

    #[tokio::test]
    async fn cursor_enumeration_walks_the_whole_collection() {
        let store = InMemoryStore::new();
        for i in 0..7 {
            store
                .create("thing", &[field("title", &format!("Thing {i}"))])
                .await
                .unwrap();
        }

        let first = store.list("thing", None, 3).await.unwrap();
        assert_eq!(first.records.len(), 3);
        let second = store
            .list("thing", first.cursor.as_deref(), 3)
            .await
            .unwrap();
        assert_eq!(second.records.len(), 3);
        let third = store
            .list("thing", second.cursor.as_deref(), 3)
            .await
            .unwrap();
        assert_eq!(third.records.len(), 1);
        assert!(third.cursor.is_none());
    }

    #[tokio::test]
    async fn handle_collision_reports_taken() {
        let store = InMemoryStore::new();
        store.create("thing", &[field("title", "Same")]).await.unwrap();
        let err = store
            .create("thing", &[field("title", "Same")])
            .await
            .unwrap_err();
        assert!(err.is_taken());
    }

    #[tokio::test]
    async fn deleted_handle_is_reusable() {
        let store = InMemoryStore::new();
        let record = store.create("thing", &[field("title", "Same")]).await.unwrap();
        store.delete(&record.id).await.unwrap();
        assert!(store.create("thing", &[field("title", "Same")]).await.is_ok());
    }

    #[tokio::test]
    async fn slugify_collapses_punctuation() {
        assert_eq!(slugify("Winter Kit & 2026!"), "winter-kit-2026");
        assert_eq!(slugify("  spaced  out  "), "spaced-out");
    }
}
