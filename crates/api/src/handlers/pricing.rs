//! Handler for pricing a selection against a bundle's discount rule.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use bundlekit_core::error::CoreError;
use bundlekit_core::pricing::{price_selection, SelectionItem};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /api/v1/bundles/{id}/price`.
///
/// Unit prices are supplied by the caller's catalog lookup; the product
/// catalog is an external collaborator and is never read here.
#[derive(Debug, Deserialize)]
pub struct PriceRequest {
    pub items: Vec<SelectionItem>,
}

/// POST /api/v1/bundles/{id}/price
pub async fn price_bundle(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<PriceRequest>,
) -> AppResult<impl IntoResponse> {
    let bundle = state
        .bundles
        .get(&id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Bundle",
            id,
        }))?;

    let breakdown = price_selection(&bundle.discount, &input.items)?;

    Ok(Json(DataResponse { data: breakdown }))
}
