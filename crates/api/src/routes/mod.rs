pub mod health;

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /bundles                          list (GET), create (POST)
/// /bundles/bulk/delete              bulk delete (POST)
/// /bundles/bulk/status              bulk status change (POST)
/// /bundles/{id}                     get, update (PATCH), delete
/// /bundles/{id}/duplicate           clone (POST)
/// /bundles/{id}/price               price a selection (POST)
/// /bundles/{id}/steps               append step (POST)
/// /bundles/{id}/steps/order         reorder steps (PUT)
/// /bundles/{id}/steps/{step_id}     update (PATCH), remove (DELETE)
///
/// /combinations                     batch resolve (GET), create (POST)
/// /combinations/by-products         set lookup (GET)
/// /combinations/{id}                update (PATCH), delete (DELETE)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // -- Bundles --
        .route(
            "/bundles",
            get(handlers::bundles::list_bundles).post(handlers::bundles::create_bundle),
        )
        .route("/bundles/bulk/delete", post(handlers::bulk::bulk_delete))
        .route("/bundles/bulk/status", post(handlers::bulk::bulk_set_status))
        .route(
            "/bundles/{id}",
            get(handlers::bundles::get_bundle)
                .patch(handlers::bundles::update_bundle)
                .delete(handlers::bundles::delete_bundle),
        )
        .route(
            "/bundles/{id}/duplicate",
            post(handlers::bundles::duplicate_bundle),
        )
        .route("/bundles/{id}/price", post(handlers::pricing::price_bundle))
        // -- Steps --
        .route("/bundles/{id}/steps", post(handlers::steps::add_step))
        .route(
            "/bundles/{id}/steps/order",
            put(handlers::steps::reorder_steps),
        )
        .route(
            "/bundles/{id}/steps/{step_id}",
            delete(handlers::steps::remove_step).patch(handlers::steps::update_step),
        )
        // -- Combinations --
        .route(
            "/combinations",
            get(handlers::combinations::list_combinations)
                .post(handlers::combinations::create_combination),
        )
        .route(
            "/combinations/by-products",
            get(handlers::combinations::find_by_products),
        )
        .route(
            "/combinations/{id}",
            delete(handlers::combinations::delete_combination)
                .patch(handlers::combinations::update_combination),
        )
}
