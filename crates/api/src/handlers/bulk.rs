//! Handlers for bulk delete and bulk status change.
//!
//! A batch is non-atomic by design: per-item failures are isolated and
//! reported in the outcome, and already-applied items stay applied. The
//! snapshot re-sync runs once per batch, after all items.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use bundlekit_core::bundle::BundleStatus;
use bundlekit_core::types::ObjectId;

use crate::error::AppResult;
use crate::handlers::sync_after_mutation;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /api/v1/bundles/bulk/delete`.
#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<ObjectId>,
}

/// Request body for `POST /api/v1/bundles/bulk/status`.
#[derive(Debug, Deserialize)]
pub struct BulkStatusRequest {
    pub ids: Vec<ObjectId>,
    pub status: BundleStatus,
}

/// POST /api/v1/bundles/bulk/delete
///
/// Delete a batch of bundles. The response's `success` is true iff every
/// item succeeded; inspect `items` for per-id results.
pub async fn bulk_delete(
    State(state): State<AppState>,
    Json(input): Json<BulkDeleteRequest>,
) -> AppResult<impl IntoResponse> {
    let outcome = state.bulk.bulk_delete(&input.ids).await?;
    sync_after_mutation(&state, "bulk-delete").await;

    tracing::info!(
        total = outcome.summary.total,
        failed = outcome.summary.failed,
        "Bulk delete via API",
    );

    Ok(Json(DataResponse { data: outcome }))
}

/// POST /api/v1/bundles/bulk/status
pub async fn bulk_set_status(
    State(state): State<AppState>,
    Json(input): Json<BulkStatusRequest>,
) -> AppResult<impl IntoResponse> {
    let outcome = state.bulk.bulk_set_status(&input.ids, input.status).await?;
    sync_after_mutation(&state, "bulk-status").await;

    tracing::info!(
        total = outcome.summary.total,
        failed = outcome.summary.failed,
        status = input.status.as_str(),
        "Bulk status change via API",
    );

    Ok(Json(DataResponse { data: outcome }))
}
