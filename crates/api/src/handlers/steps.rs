//! Handlers for step mutations within a bundle.
//!
//! Steps have no record of their own: every mutation here rewrites the
//! owning bundle's `steps` field as a whole (the store offers no deeper
//! patch primitive) and re-syncs the snapshot. Step ids are generated at
//! creation and survive every later update.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use bundlekit_core::bundle::{
    Bundle, BundlePatch, BundleProduct, BundleStep, SelectionType,
};
use bundlekit_core::error::CoreError;
use bundlekit_core::validation::validate_steps;

use crate::error::{AppError, AppResult};
use crate::handlers::sync_after_mutation;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /api/v1/bundles/{id}/steps`.
#[derive(Debug, Deserialize)]
pub struct NewStepRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_min_selections")]
    pub min_selections: u32,
    #[serde(default)]
    pub max_selections: Option<u32>,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub selection_type: SelectionType,
    #[serde(default)]
    pub products: Vec<BundleProduct>,
}

fn default_min_selections() -> u32 {
    1
}

fn default_required() -> bool {
    true
}

/// Request body for `PATCH /api/v1/bundles/{id}/steps/{step_id}`.
/// Position is not updatable here; use the reorder endpoint.
#[derive(Debug, Deserialize)]
pub struct UpdateStepRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub min_selections: Option<u32>,
    pub max_selections: Option<u32>,
    pub required: Option<bool>,
    pub selection_type: Option<SelectionType>,
    pub products: Option<Vec<BundleProduct>>,
}

/// Request body for `PUT /api/v1/bundles/{id}/steps/order`.
#[derive(Debug, Deserialize)]
pub struct ReorderStepsRequest {
    /// Must be a permutation of the bundle's current step ids.
    pub step_ids: Vec<String>,
}

/// POST /api/v1/bundles/{id}/steps
///
/// Append a step at the end of the bundle.
pub async fn add_step(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<NewStepRequest>,
) -> AppResult<impl IntoResponse> {
    let bundle = fetch_bundle(&state, &id).await?;

    let mut steps = bundle.steps;
    steps.push(BundleStep {
        id: BundleStep::fresh_id(),
        title: input.title,
        description: input.description,
        position: steps.len() as u32 + 1,
        min_selections: input.min_selections,
        max_selections: input.max_selections,
        required: input.required,
        selection_type: input.selection_type,
        products: input.products,
    });

    let bundle = write_steps(&state, &id, steps).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: bundle })))
}

/// PATCH /api/v1/bundles/{id}/steps/{step_id}
pub async fn update_step(
    State(state): State<AppState>,
    Path((id, step_id)): Path<(String, String)>,
    Json(input): Json<UpdateStepRequest>,
) -> AppResult<impl IntoResponse> {
    let bundle = fetch_bundle(&state, &id).await?;

    let mut steps = bundle.steps;
    let step = steps
        .iter_mut()
        .find(|s| s.id == step_id)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Step",
            id: step_id,
        }))?;

    if let Some(title) = input.title {
        step.title = title;
    }
    if let Some(description) = input.description {
        step.description = Some(description);
    }
    if let Some(min) = input.min_selections {
        step.min_selections = min;
    }
    if let Some(max) = input.max_selections {
        step.max_selections = Some(max);
    }
    if let Some(required) = input.required {
        step.required = required;
    }
    if let Some(selection_type) = input.selection_type {
        step.selection_type = selection_type;
    }
    if let Some(products) = input.products {
        step.products = products;
    }

    let bundle = write_steps(&state, &id, steps).await?;
    Ok(Json(DataResponse { data: bundle }))
}

/// DELETE /api/v1/bundles/{id}/steps/{step_id}
///
/// Remove a step and close the position gap it leaves.
pub async fn remove_step(
    State(state): State<AppState>,
    Path((id, step_id)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    let bundle = fetch_bundle(&state, &id).await?;

    let mut steps = bundle.steps;
    let before = steps.len();
    steps.retain(|s| s.id != step_id);
    if steps.len() == before {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Step",
            id: step_id,
        }));
    }
    renumber(&mut steps);

    let bundle = write_steps(&state, &id, steps).await?;
    Ok(Json(DataResponse { data: bundle }))
}

/// PUT /api/v1/bundles/{id}/steps/order
///
/// Reorder steps by id list. The list must be a permutation of the
/// bundle's current step ids.
pub async fn reorder_steps(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ReorderStepsRequest>,
) -> AppResult<impl IntoResponse> {
    let bundle = fetch_bundle(&state, &id).await?;
    let steps = bundle.steps;

    let mut current: Vec<&str> = steps.iter().map(|s| s.id.as_str()).collect();
    let mut requested: Vec<&str> = input.step_ids.iter().map(String::as_str).collect();
    current.sort_unstable();
    requested.sort_unstable();
    if current != requested {
        return Err(AppError::Core(CoreError::Validation(
            "step_ids must be a permutation of the bundle's step ids".to_string(),
        )));
    }

    let mut by_id: std::collections::HashMap<&str, BundleStep> = steps
        .iter()
        .map(|s| (s.id.as_str(), s.clone()))
        .collect();
    let mut reordered: Vec<BundleStep> = input
        .step_ids
        .iter()
        .filter_map(|step_id| by_id.remove(step_id.as_str()))
        .collect();
    renumber(&mut reordered);

    let bundle = write_steps(&state, &id, reordered).await?;
    Ok(Json(DataResponse { data: bundle }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn fetch_bundle(state: &AppState, id: &str) -> AppResult<Bundle> {
    state
        .bundles
        .get(id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Bundle",
            id: id.to_string(),
        }))
}

/// Validate and persist a new step list, then re-sync the snapshot.
async fn write_steps(
    state: &AppState,
    id: &str,
    steps: Vec<BundleStep>,
) -> AppResult<Bundle> {
    validate_steps(&steps)?;

    let patch = BundlePatch {
        steps: Some(steps),
        ..Default::default()
    };
    let bundle = state.bundles.update(id, patch).await?;
    sync_after_mutation(state, "step-mutation").await;
    Ok(bundle)
}

/// Reassign 1-based positions in list order.
fn renumber(steps: &mut [BundleStep]) {
    for (index, step) in steps.iter_mut().enumerate() {
        step.position = index as u32 + 1;
    }
}
