//! Request handlers.

pub mod bulk;
pub mod bundles;
pub mod combinations;
pub mod pricing;
pub mod steps;

use crate::state::AppState;

/// Rebuild the cart-transform snapshot after a committed mutation.
///
/// A failed pass must never undo the mutation: the stores are allowed to
/// diverge transiently and the next successful pass rebuilds from the
/// source of truth, so the failure is logged and the request still
/// succeeds.
pub(crate) async fn sync_after_mutation(state: &AppState, trigger: &str) {
    if let Err(err) = state.sync.on_bundle_changed().await {
        tracing::warn!(
            trigger,
            error = %err,
            "Snapshot sync failed; stores diverge until the next successful pass",
        );
    }
}
