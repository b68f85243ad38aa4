//! The remote object-store abstraction.
//!
//! The remote offers a typed, schema-registered record collection addressed
//! by opaque id. Its primitives are deliberately narrow: field-level CRUD
//! and cursor enumeration, with no filter predicate and no secondary index.
//! [`ObjectStore`] exposes exactly those primitives so a backend with native
//! filtering could replace the full scan without touching any caller.

use async_trait::async_trait;

use bundlekit_core::types::{ObjectId, Timestamp};

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Records and fields
// ---------------------------------------------------------------------------

/// A field to write: full-value overwrite keyed by field name. The store has
/// no patch primitive deeper than "replace this field's value".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInput {
    pub key: String,
    pub value: String,
}

impl FieldInput {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A stored field as returned by the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredField {
    pub key: String,
    pub value: String,
}

/// A record as returned by the remote: identity plus a flat field list.
#[derive(Debug, Clone)]
pub struct ObjectRecord {
    /// Store-assigned opaque id.
    pub id: ObjectId,
    /// Store-assigned human-readable handle.
    pub handle: String,
    pub object_type: String,
    pub fields: Vec<StoredField>,
    pub updated_at: Option<Timestamp>,
}

impl ObjectRecord {
    /// Look up a field value by key.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.value.as_str())
    }
}

/// One page of a cursor enumeration.
#[derive(Debug, Clone)]
pub struct RecordPage {
    pub records: Vec<ObjectRecord>,
    /// Cursor for the next page; `None` when the collection is exhausted.
    pub cursor: Option<String>,
}

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// Remote field types supported by the schema registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    SingleLineText,
    Integer,
    Decimal,
    Json,
}

impl FieldType {
    /// Wire name used when registering a definition.
    pub fn as_remote_str(self) -> &'static str {
        match self {
            FieldType::SingleLineText => "single_line_text_field",
            FieldType::Integer => "number_integer",
            FieldType::Decimal => "number_decimal",
            FieldType::Json => "json",
        }
    }
}

/// A field slot in a registered record type.
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    pub key: String,
    pub name: String,
    pub field_type: FieldType,
}

impl FieldDefinition {
    pub fn new(key: &str, name: &str, field_type: FieldType) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            field_type,
        }
    }
}

/// A record type registration: the fixed field set for one object type.
#[derive(Debug, Clone)]
pub struct ObjectDefinition {
    pub object_type: String,
    pub name: String,
    pub fields: Vec<FieldDefinition>,
}

// ---------------------------------------------------------------------------
// The store trait
// ---------------------------------------------------------------------------

/// Generic CRUD + cursor enumeration over the remote record collection.
///
/// Implementations: [`crate::graphql::AdminApiStore`] (HTTP) and
/// [`crate::memory::InMemoryStore`] (tests).
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Whether a definition for `object_type` is registered.
    async fn definition_exists(&self, object_type: &str) -> Result<bool, StoreError>;

    /// Register a definition. Callers treat an "already taken" user error as
    /// success so concurrent check-then-create races collapse to a no-op.
    async fn create_definition(&self, definition: &ObjectDefinition) -> Result<(), StoreError>;

    /// Create a record. Field-level validation errors from the remote
    /// surface verbatim as [`StoreError::UserErrors`].
    async fn create(
        &self,
        object_type: &str,
        fields: &[FieldInput],
    ) -> Result<ObjectRecord, StoreError>;

    /// Fetch a single record. Absence is `Ok(None)`, not an error.
    async fn get(&self, id: &str) -> Result<Option<ObjectRecord>, StoreError>;

    /// Overwrite the given fields on an existing record.
    async fn update(&self, id: &str, fields: &[FieldInput]) -> Result<ObjectRecord, StoreError>;

    /// Delete a record.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Fetch one page of the collection. Cursor enumeration is the only
    /// read primitive the remote offers over a collection.
    async fn list(
        &self,
        object_type: &str,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<RecordPage, StoreError>;
}

/// Exhaustively enumerate a collection via repeated cursor fetches.
///
/// This is O(collection size) per call and is the documented scalability
/// ceiling of every list operation built on it: acceptable because expected
/// collection sizes are tens to low hundreds. A mid-scan failure propagates
/// rather than returning a silent partial list.
pub async fn scan_all(
    store: &dyn ObjectStore,
    object_type: &str,
    page_size: u32,
) -> Result<Vec<ObjectRecord>, StoreError> {
    let mut records = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = store.list(object_type, cursor.as_deref(), page_size).await?;
        records.extend(page.records);
        match page.cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    Ok(records)
}
