//! Handlers for combination images.
//!
//! Create and update accept multipart form data: an `image` file part plus
//! `product_ids` (comma-separated) and an optional `title` text part. The
//! store allows duplicate product sets, so create checks for an existing
//! combination first and reports a conflict instead of silently creating a
//! second record for the same set.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use bundlekit_core::error::CoreError;
use bundlekit_core::types::ObjectId;
use bundlekit_store::combination_store::NewCombinationImage;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters carrying a comma-separated id list.
#[derive(Debug, Deserialize)]
pub struct IdsParams {
    pub ids: String,
}

/// GET /api/v1/combinations?ids=a,b,c
///
/// Resolve a batch of combinations by id, including each image URL.
/// Missing ids are skipped.
pub async fn list_combinations(
    State(state): State<AppState>,
    Query(params): Query<IdsParams>,
) -> AppResult<impl IntoResponse> {
    let ids = split_ids(&params.ids)?;
    let combinations = state.combinations.list_by_ids(&ids).await?;

    Ok(Json(DataResponse { data: combinations }))
}

/// GET /api/v1/combinations/by-products?ids=a,b
///
/// Look up the combination for a product set, order-independently.
/// Absence is a normal outcome (`data: null`), not an error; callers use
/// this as the duplicate pre-check before creating.
pub async fn find_by_products(
    State(state): State<AppState>,
    Query(params): Query<IdsParams>,
) -> AppResult<impl IntoResponse> {
    let ids = split_ids(&params.ids)?;
    let combination = state.combinations.find_by_product_set(&ids).await?;

    Ok(Json(DataResponse { data: combination }))
}

/// POST /api/v1/combinations (multipart)
pub async fn create_combination(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let form = parse_form(multipart).await?;

    let image = form
        .image
        .ok_or_else(|| AppError::BadRequest("An image part is required".to_string()))?;

    if let Some(existing) = state
        .combinations
        .find_by_product_set(&form.product_ids)
        .await?
    {
        return Err(AppError::Core(CoreError::Duplicate(format!(
            "A combination for this product set already exists ({})",
            existing.id
        ))));
    }

    let combination = state
        .combinations
        .create(form.product_ids, image, form.title)
        .await?;

    tracing::info!(id = %combination.id, "Combination created via API");

    Ok((StatusCode::CREATED, Json(DataResponse { data: combination })))
}

/// PATCH /api/v1/combinations/{id} (multipart)
///
/// Update title and/or image; the upload pipeline runs only when a new
/// image part is supplied.
pub async fn update_combination(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let form = parse_form(multipart).await?;

    let combination = state
        .combinations
        .update(&id, form.title, form.image)
        .await?;

    Ok(Json(DataResponse { data: combination }))
}

/// DELETE /api/v1/combinations/{id}
///
/// Removes the record only; the underlying media asset is left in place.
pub async fn delete_combination(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.combinations.delete(&id).await?;

    tracing::info!(id, "Combination deleted via API");

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Multipart parsing
// ---------------------------------------------------------------------------

struct CombinationForm {
    product_ids: Vec<ObjectId>,
    title: Option<String>,
    image: Option<NewCombinationImage>,
}

/// Read the known multipart fields; unknown fields are ignored.
async fn parse_form(mut multipart: Multipart) -> AppResult<CombinationForm> {
    let mut form = CombinationForm {
        product_ids: Vec::new(),
        title: None,
        image: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        match field.name().unwrap_or_default() {
            "product_ids" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                form.product_ids = text
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
            "title" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                if !text.is_empty() {
                    form.title = Some(text);
                }
            }
            "image" => {
                let filename = field.file_name().unwrap_or("image").to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?
                    .to_vec();
                form.image = Some(NewCombinationImage {
                    filename,
                    mime_type,
                    bytes,
                });
            }
            other => {
                tracing::debug!(field = other, "Ignoring unknown multipart field");
            }
        }
    }

    Ok(form)
}

/// Split a comma-separated id list, rejecting an effectively empty one.
fn split_ids(raw: &str) -> AppResult<Vec<ObjectId>> {
    let ids: Vec<ObjectId> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if ids.is_empty() {
        return Err(AppError::BadRequest("ids must not be empty".to_string()));
    }
    Ok(ids)
}
