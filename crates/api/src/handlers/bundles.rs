//! Handlers for bundle CRUD and duplication.
//!
//! Every mutation triggers a snapshot sync afterwards; see
//! [`super::sync_after_mutation`] for the failure semantics.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use bundlekit_core::bundle::{BundleDraft, BundlePatch, BundleStatus};
use bundlekit_core::error::CoreError;
use bundlekit_core::validation::{validate_draft, validate_patch, validate_title};

use crate::error::{AppError, AppResult};
use crate::handlers::sync_after_mutation;
use crate::response::DataResponse;
use crate::state::AppState;

/// Default page size for bundle listing.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Query parameters for `GET /api/v1/bundles`.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
}

/// Request body for `POST /api/v1/bundles/{id}/duplicate`.
#[derive(Debug, Deserialize)]
pub struct DuplicateRequest {
    /// Defaults to `Copy of {source title}`.
    pub title: Option<String>,
    /// Defaults to `draft`.
    pub status: Option<BundleStatus>,
}

/// GET /api/v1/bundles
///
/// Paged list with optional status filter. The backing store has no filter
/// predicate, so this is a full scan with in-memory filtering; `total`
/// counts the filtered collection.
pub async fn list_bundles(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<impl IntoResponse> {
    let status = match params.status.as_deref() {
        Some(raw) => Some(
            BundleStatus::parse(raw)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown status '{raw}'")))?,
        ),
        None => None,
    };

    let page = state
        .bundles
        .list(
            params.page.unwrap_or(1),
            params.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
            status,
        )
        .await?;

    Ok(Json(DataResponse { data: page }))
}

/// GET /api/v1/bundles/{id}
pub async fn get_bundle(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let bundle = state
        .bundles
        .get(&id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Bundle",
            id,
        }))?;

    Ok(Json(DataResponse { data: bundle }))
}

/// POST /api/v1/bundles
pub async fn create_bundle(
    State(state): State<AppState>,
    Json(draft): Json<BundleDraft>,
) -> AppResult<impl IntoResponse> {
    validate_draft(&draft)?;

    let bundle = state.bundles.create(draft).await?;
    sync_after_mutation(&state, "bundle-create").await;

    tracing::info!(id = %bundle.id, "Bundle created via API");

    Ok((StatusCode::CREATED, Json(DataResponse { data: bundle })))
}

/// PATCH /api/v1/bundles/{id}
///
/// Partial update: only the provided fields are written.
pub async fn update_bundle(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<BundlePatch>,
) -> AppResult<impl IntoResponse> {
    validate_patch(&patch)?;

    let bundle = state.bundles.update(&id, patch).await?;
    sync_after_mutation(&state, "bundle-update").await;

    Ok(Json(DataResponse { data: bundle }))
}

/// DELETE /api/v1/bundles/{id}
pub async fn delete_bundle(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.bundles.delete(&id).await?;
    sync_after_mutation(&state, "bundle-delete").await;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/bundles/{id}/duplicate
///
/// Clone a bundle under a new title and status. The clone carries fresh
/// step ids and zero combination references.
pub async fn duplicate_bundle(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<DuplicateRequest>,
) -> AppResult<impl IntoResponse> {
    let source = state
        .bundles
        .get(&id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Bundle",
            id: id.clone(),
        }))?;

    let title = input
        .title
        .unwrap_or_else(|| format!("Copy of {}", source.title));
    validate_title(&title)?;
    let status = input.status.unwrap_or(BundleStatus::Draft);

    let clone = state.bundles.duplicate(&id, title, status).await?;
    sync_after_mutation(&state, "bundle-duplicate").await;

    tracing::info!(source = %id, clone = %clone.id, "Bundle duplicated via API");

    Ok((StatusCode::CREATED, Json(DataResponse { data: clone })))
}
