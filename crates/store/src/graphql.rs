//! HTTP implementation of the remote-store traits.
//!
//! Wraps the shop's admin GraphQL endpoint using [`reqwest`]: record CRUD
//! and cursor listing for [`crate::object_store::ObjectStore`], the
//! three-step staged upload protocol for [`crate::media::MediaService`],
//! and the metafield write for [`crate::sync::SnapshotStore`]. Remote
//! `userErrors` are preserved verbatim in [`StoreError::UserErrors`].

use async_trait::async_trait;
use serde_json::{json, Value};

use bundlekit_core::types::ObjectId;

use crate::error::{StoreError, UserError};
use crate::media::{MediaService, MediaStatus, StagedParameter, StagedTarget};
use crate::object_store::{
    FieldInput, ObjectDefinition, ObjectRecord, ObjectStore, RecordPage, StoredField,
};
use crate::sync::{SnapshotStore, SNAPSHOT_KEY, SNAPSHOT_NAMESPACE};

/// Header carrying the admin access token.
const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

// ---------------------------------------------------------------------------
// GraphQL documents
// ---------------------------------------------------------------------------

const QUERY_DEFINITION_BY_TYPE: &str = "\
query DefinitionByType($type: String!) {
  metaobjectDefinitionByType(type: $type) { id }
}";

const MUTATION_DEFINITION_CREATE: &str = "\
mutation DefinitionCreate($definition: MetaobjectDefinitionCreateInput!) {
  metaobjectDefinitionCreate(definition: $definition) {
    metaobjectDefinition { id }
    userErrors { field message }
  }
}";

const MUTATION_RECORD_CREATE: &str = "\
mutation RecordCreate($metaobject: MetaobjectCreateInput!) {
  metaobjectCreate(metaobject: $metaobject) {
    metaobject { id handle type updatedAt fields { key value } }
    userErrors { field message }
  }
}";

const QUERY_RECORD_BY_ID: &str = "\
query RecordById($id: ID!) {
  metaobject(id: $id) { id handle type updatedAt fields { key value } }
}";

const MUTATION_RECORD_UPDATE: &str = "\
mutation RecordUpdate($id: ID!, $metaobject: MetaobjectUpdateInput!) {
  metaobjectUpdate(id: $id, metaobject: $metaobject) {
    metaobject { id handle type updatedAt fields { key value } }
    userErrors { field message }
  }
}";

const MUTATION_RECORD_DELETE: &str = "\
mutation RecordDelete($id: ID!) {
  metaobjectDelete(id: $id) {
    deletedId
    userErrors { field message }
  }
}";

const QUERY_RECORD_LIST: &str = "\
query RecordList($type: String!, $first: Int!, $after: String) {
  metaobjects(type: $type, first: $first, after: $after) {
    nodes { id handle type updatedAt fields { key value } }
    pageInfo { hasNextPage endCursor }
  }
}";

const MUTATION_STAGED_UPLOADS_CREATE: &str = "\
mutation StagedUploadsCreate($input: [StagedUploadInput!]!) {
  stagedUploadsCreate(input: $input) {
    stagedTargets { url resourceUrl parameters { name value } }
    userErrors { field message }
  }
}";

const MUTATION_FILE_CREATE: &str = "\
mutation FileCreate($files: [FileCreateInput!]!) {
  fileCreate(files: $files) {
    files { id }
    userErrors { field message }
  }
}";

const QUERY_MEDIA_STATUS: &str = "\
query MediaStatus($id: ID!) {
  node(id: $id) {
    ... on MediaImage {
      fileStatus
      image { url }
    }
  }
}";

const MUTATION_METAFIELDS_SET: &str = "\
mutation MetafieldsSet($metafields: [MetafieldsSetInput!]!) {
  metafieldsSet(metafields: $metafields) {
    metafields { id }
    userErrors { field message }
  }
}";

const QUERY_SNAPSHOT_READ: &str = "\
query SnapshotRead($ownerId: ID!, $namespace: String!, $key: String!) {
  node(id: $ownerId) {
    ... on CartTransform {
      metafield(namespace: $namespace, key: $key) { value }
    }
  }
}";

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Admin-API client for a single shop.
pub struct AdminApiStore {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
    /// Owner of the derived snapshot document.
    cart_transform_id: String,
}

impl AdminApiStore {
    /// Create a client for one shop.
    ///
    /// * `shop_domain` - e.g. `my-shop.myshopify.com`.
    /// * `api_version` - admin API version, e.g. `2025-07`.
    pub fn new(
        shop_domain: &str,
        api_version: &str,
        access_token: String,
        cart_transform_id: String,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("https://{shop_domain}/admin/api/{api_version}/graphql.json"),
            access_token,
            cart_transform_id,
        }
    }

    /// Create a client reusing an existing [`reqwest::Client`] (connection
    /// pooling across stores for the same shop).
    pub fn with_client(
        client: reqwest::Client,
        shop_domain: &str,
        api_version: &str,
        access_token: String,
        cart_transform_id: String,
    ) -> Self {
        Self {
            client,
            endpoint: format!("https://{shop_domain}/admin/api/{api_version}/graphql.json"),
            access_token,
            cart_transform_id,
        }
    }

    /// Execute one GraphQL request and return the `data` object.
    async fn execute(&self, query: &str, variables: Value) -> Result<Value, StoreError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(ACCESS_TOKEN_HEADER, &self.access_token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(StoreError::Remote {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await?;
        if let Some(errors) = body.get("errors").filter(|e| !e.is_null()) {
            return Err(StoreError::Remote {
                status: status.as_u16(),
                body: errors.to_string(),
            });
        }

        body.get("data")
            .cloned()
            .ok_or_else(|| StoreError::Malformed("response has no data object".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Parse a `userErrors` array, preserving field paths and messages.
fn parse_user_errors(value: &Value) -> Vec<UserError> {
    value
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .map(|e| UserError {
                    field: match e.get("field") {
                        Some(Value::Array(path)) => Some(
                            path.iter()
                                .filter_map(Value::as_str)
                                .collect::<Vec<_>>()
                                .join("."),
                        ),
                        Some(Value::String(field)) => Some(field.clone()),
                        _ => None,
                    },
                    message: e
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Fail when a mutation payload carries user errors.
fn check_user_errors(payload: &Value) -> Result<(), StoreError> {
    let errors = parse_user_errors(&payload["userErrors"]);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(StoreError::UserErrors(errors))
    }
}

/// Parse a record node. Fields with a null value are treated as absent.
fn parse_record(node: &Value) -> Result<ObjectRecord, StoreError> {
    let id = node
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::Malformed("record node has no id".to_string()))?
        .to_string();

    let fields = node["fields"]
        .as_array()
        .map(|fields| {
            fields
                .iter()
                .filter_map(|f| {
                    let key = f.get("key")?.as_str()?.to_string();
                    let value = f.get("value")?.as_str()?.to_string();
                    Some(StoredField { key, value })
                })
                .collect()
        })
        .unwrap_or_default();

    let updated_at = node
        .get("updatedAt")
        .and_then(Value::as_str)
        .and_then(|raw| chrono::DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&chrono::Utc));

    Ok(ObjectRecord {
        id,
        handle: node
            .get("handle")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        object_type: node
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        fields,
        updated_at,
    })
}

fn fields_to_json(fields: &[FieldInput]) -> Value {
    Value::Array(
        fields
            .iter()
            .map(|f| json!({ "key": f.key, "value": f.value }))
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// ObjectStore
// ---------------------------------------------------------------------------

#[async_trait]
impl ObjectStore for AdminApiStore {
    async fn definition_exists(&self, object_type: &str) -> Result<bool, StoreError> {
        let data = self
            .execute(QUERY_DEFINITION_BY_TYPE, json!({ "type": object_type }))
            .await?;
        Ok(!data["metaobjectDefinitionByType"].is_null())
    }

    async fn create_definition(&self, definition: &ObjectDefinition) -> Result<(), StoreError> {
        let field_definitions: Vec<Value> = definition
            .fields
            .iter()
            .map(|f| {
                json!({
                    "key": f.key,
                    "name": f.name,
                    "type": f.field_type.as_remote_str(),
                })
            })
            .collect();

        let data = self
            .execute(
                MUTATION_DEFINITION_CREATE,
                json!({
                    "definition": {
                        "type": definition.object_type,
                        "name": definition.name,
                        "fieldDefinitions": field_definitions,
                    }
                }),
            )
            .await?;

        check_user_errors(&data["metaobjectDefinitionCreate"])
    }

    async fn create(
        &self,
        object_type: &str,
        fields: &[FieldInput],
    ) -> Result<ObjectRecord, StoreError> {
        let data = self
            .execute(
                MUTATION_RECORD_CREATE,
                json!({
                    "metaobject": {
                        "type": object_type,
                        "fields": fields_to_json(fields),
                    }
                }),
            )
            .await?;

        let payload = &data["metaobjectCreate"];
        check_user_errors(payload)?;
        parse_record(&payload["metaobject"])
    }

    async fn get(&self, id: &str) -> Result<Option<ObjectRecord>, StoreError> {
        let data = self.execute(QUERY_RECORD_BY_ID, json!({ "id": id })).await?;
        let node = &data["metaobject"];
        if node.is_null() {
            return Ok(None);
        }
        parse_record(node).map(Some)
    }

    async fn update(&self, id: &str, fields: &[FieldInput]) -> Result<ObjectRecord, StoreError> {
        let data = self
            .execute(
                MUTATION_RECORD_UPDATE,
                json!({
                    "id": id,
                    "metaobject": { "fields": fields_to_json(fields) },
                }),
            )
            .await?;

        let payload = &data["metaobjectUpdate"];
        check_user_errors(payload)?;
        parse_record(&payload["metaobject"])
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let data = self
            .execute(MUTATION_RECORD_DELETE, json!({ "id": id }))
            .await?;
        check_user_errors(&data["metaobjectDelete"])
    }

    async fn list(
        &self,
        object_type: &str,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<RecordPage, StoreError> {
        let data = self
            .execute(
                QUERY_RECORD_LIST,
                json!({
                    "type": object_type,
                    "first": page_size,
                    "after": cursor,
                }),
            )
            .await?;

        let connection = &data["metaobjects"];
        let records = connection["nodes"]
            .as_array()
            .map(|nodes| nodes.iter().map(parse_record).collect::<Result<_, _>>())
            .transpose()?
            .unwrap_or_default();

        let page_info = &connection["pageInfo"];
        let cursor = if page_info["hasNextPage"].as_bool().unwrap_or(false) {
            page_info["endCursor"].as_str().map(str::to_string)
        } else {
            None
        };

        Ok(RecordPage { records, cursor })
    }
}

// ---------------------------------------------------------------------------
// MediaService
// ---------------------------------------------------------------------------

#[async_trait]
impl MediaService for AdminApiStore {
    async fn stage_upload(
        &self,
        filename: &str,
        mime_type: &str,
        byte_size: u64,
    ) -> Result<StagedTarget, StoreError> {
        let data = self
            .execute(
                MUTATION_STAGED_UPLOADS_CREATE,
                json!({
                    "input": [{
                        "filename": filename,
                        "mimeType": mime_type,
                        "fileSize": byte_size.to_string(),
                        "resource": "IMAGE",
                        "httpMethod": "POST",
                    }]
                }),
            )
            .await?;

        let payload = &data["stagedUploadsCreate"];
        check_user_errors(payload)?;

        let target = payload["stagedTargets"]
            .as_array()
            .and_then(|targets| targets.first())
            .ok_or_else(|| StoreError::Malformed("no staged target returned".to_string()))?;

        let parameters = target["parameters"]
            .as_array()
            .map(|params| {
                params
                    .iter()
                    .map(|p| StagedParameter {
                        name: p["name"].as_str().unwrap_or_default().to_string(),
                        value: p["value"].as_str().unwrap_or_default().to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(StagedTarget {
            url: target["url"].as_str().unwrap_or_default().to_string(),
            resource_url: target["resourceUrl"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            parameters,
        })
    }

    async fn transfer(
        &self,
        target: &StagedTarget,
        filename: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), StoreError> {
        // Form parameters must precede the file part.
        let mut form = reqwest::multipart::Form::new();
        for parameter in &target.parameters {
            form = form.text(parameter.name.clone(), parameter.value.clone());
        }
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime_type)
            .map_err(|e| StoreError::Malformed(format!("invalid mime type: {e}")))?;
        form = form.part("file", part);

        let response = self.client.post(&target.url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(StoreError::Remote {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    async fn register(&self, resource_url: &str, alt: Option<&str>) -> Result<ObjectId, StoreError> {
        let data = self
            .execute(
                MUTATION_FILE_CREATE,
                json!({
                    "files": [{
                        "originalSource": resource_url,
                        "contentType": "IMAGE",
                        "alt": alt,
                    }]
                }),
            )
            .await?;

        let payload = &data["fileCreate"];
        check_user_errors(payload)?;

        payload["files"]
            .as_array()
            .and_then(|files| files.first())
            .and_then(|f| f["id"].as_str())
            .map(str::to_string)
            .ok_or_else(|| StoreError::Malformed("no file id returned".to_string()))
    }

    async fn media_status(&self, media_id: &str) -> Result<MediaStatus, StoreError> {
        let data = self
            .execute(QUERY_MEDIA_STATUS, json!({ "id": media_id }))
            .await?;

        let node = &data["node"];
        if node.is_null() {
            return Err(StoreError::NotFound {
                id: media_id.to_string(),
            });
        }

        match node["fileStatus"].as_str() {
            Some("READY") => match node["image"]["url"].as_str() {
                Some(url) => Ok(MediaStatus::Ready {
                    url: url.to_string(),
                }),
                // READY without a URL yet: the CDN record lags the status.
                None => Ok(MediaStatus::Processing),
            },
            Some("FAILED") => Ok(MediaStatus::Failed {
                reason: "media service reported FAILED".to_string(),
            }),
            _ => Ok(MediaStatus::Processing),
        }
    }
}

// ---------------------------------------------------------------------------
// SnapshotStore
// ---------------------------------------------------------------------------

#[async_trait]
impl SnapshotStore for AdminApiStore {
    async fn write_snapshot(&self, payload: &str) -> Result<(), StoreError> {
        let data = self
            .execute(
                MUTATION_METAFIELDS_SET,
                json!({
                    "metafields": [{
                        "ownerId": self.cart_transform_id,
                        "namespace": SNAPSHOT_NAMESPACE,
                        "key": SNAPSHOT_KEY,
                        "type": "json",
                        "value": payload,
                    }]
                }),
            )
            .await?;

        check_user_errors(&data["metafieldsSet"])
    }

    async fn read_snapshot(&self) -> Result<Option<String>, StoreError> {
        let data = self
            .execute(
                QUERY_SNAPSHOT_READ,
                json!({
                    "ownerId": self.cart_transform_id,
                    "namespace": SNAPSHOT_NAMESPACE,
                    "key": SNAPSHOT_KEY,
                }),
            )
            .await?;

        Ok(data["node"]["metafield"]["value"]
            .as_str()
            .map(str::to_string))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_node_parses_fields_and_skips_nulls() {
        let node = json!({
            "id": "gid://shop/product_bundle/1",
            "handle": "winter-kit",
            "type": "product_bundle",
            "updatedAt": "2026-03-01T12:00:00Z",
            "fields": [
                { "key": "title", "value": "Winter kit" },
                { "key": "layout_settings", "value": null },
            ],
        });

        let record = parse_record(&node).unwrap();
        assert_eq!(record.handle, "winter-kit");
        assert_eq!(record.fields.len(), 1);
        assert_eq!(record.field("title"), Some("Winter kit"));
        assert!(record.updated_at.is_some());
    }

    #[test]
    fn record_node_without_id_is_malformed() {
        assert!(parse_record(&json!({ "handle": "x" })).is_err());
    }

    #[test]
    fn user_errors_preserve_field_paths() {
        let payload = json!({
            "userErrors": [
                { "field": ["metaobject", "handle"], "message": "Handle has already been taken" },
            ]
        });

        let err = check_user_errors(&payload).unwrap_err();
        assert!(err.is_taken());
        match err {
            StoreError::UserErrors(errors) => {
                assert_eq!(errors[0].field.as_deref(), Some("metaobject.handle"));
            }
            other => panic!("expected UserErrors, got {other:?}"),
        }
    }

    #[test]
    fn empty_user_errors_is_ok() {
        assert!(check_user_errors(&json!({ "userErrors": [] })).is_ok());
    }
}
