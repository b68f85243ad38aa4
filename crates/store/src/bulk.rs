//! Bulk mutation executor with per-item failure isolation.
//!
//! The remote store offers no multi-record transaction primitive, so a
//! batch is applied item by item over a bounded worker pool: a failing item
//! is recorded and never aborts the batch, already-applied items are never
//! rolled back, and the aggregate reports exactly which ids failed.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use bundlekit_core::bundle::{BundlePatch, BundleStatus};
use bundlekit_core::error::CoreError;
use bundlekit_core::types::ObjectId;

use crate::bundle_store::BundleStore;
use crate::error::StoreError;

/// Maximum ids per batch.
pub const MAX_BULK_IDS: usize = 50;

/// Fan-out of the worker pool. Bounded to keep load on the remote API
/// predictable and error attribution simple.
pub const BULK_CONCURRENCY: usize = 4;

/// Outcome of one item of a batch.
#[derive(Debug, Clone, Serialize)]
pub struct BulkItemResult {
    pub id: ObjectId,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate counters for a batch.
#[derive(Debug, Clone, Serialize)]
pub struct BulkSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Full result of a batch: `success` is true iff every item succeeded;
/// callers inspect `items` to learn which specific ids failed.
#[derive(Debug, Clone, Serialize)]
pub struct BulkOutcome {
    pub success: bool,
    pub items: Vec<BulkItemResult>,
    pub summary: BulkSummary,
}

/// Applies delete/status-change across an id set.
pub struct BulkExecutor {
    bundles: Arc<BundleStore>,
}

impl BulkExecutor {
    pub fn new(bundles: Arc<BundleStore>) -> Self {
        Self { bundles }
    }

    /// Delete every id in the batch, isolating per-item failures.
    pub async fn bulk_delete(&self, ids: &[ObjectId]) -> Result<BulkOutcome, StoreError> {
        validate_batch(ids)?;
        let bundles = &self.bundles;
        let outcome = run_pool(ids, |id| async move {
            bundles.delete(&id).await
        })
        .await;
        tracing::info!(
            total = outcome.summary.total,
            failed = outcome.summary.failed,
            "Bulk delete finished",
        );
        Ok(outcome)
    }

    /// Set the status of every id in the batch, isolating per-item
    /// failures.
    pub async fn bulk_set_status(
        &self,
        ids: &[ObjectId],
        status: BundleStatus,
    ) -> Result<BulkOutcome, StoreError> {
        validate_batch(ids)?;
        let bundles = &self.bundles;
        let outcome = run_pool(ids, |id| async move {
            let patch = BundlePatch {
                status: Some(status),
                ..Default::default()
            };
            bundles.update(&id, patch).await.map(|_| ())
        })
        .await;
        tracing::info!(
            total = outcome.summary.total,
            failed = outcome.summary.failed,
            status = status.as_str(),
            "Bulk status change finished",
        );
        Ok(outcome)
    }
}

fn validate_batch(ids: &[ObjectId]) -> Result<(), StoreError> {
    if ids.is_empty() {
        return Err(CoreError::Validation("ids must not be empty".to_string()).into());
    }
    if ids.len() > MAX_BULK_IDS {
        return Err(CoreError::LimitExceeded(format!(
            "at most {MAX_BULK_IDS} ids per batch"
        ))
        .into());
    }
    Ok(())
}

/// Run `op` for every id over a pool of [`BULK_CONCURRENCY`] workers.
/// Results are re-ordered to input order, so attribution is independent of
/// completion order.
async fn run_pool<F, Fut>(ids: &[ObjectId], op: F) -> BulkOutcome
where
    F: Fn(ObjectId) -> Fut,
    Fut: std::future::Future<Output = Result<(), StoreError>>,
{
    let mut indexed: Vec<(usize, BulkItemResult)> = stream::iter(ids.iter().cloned().enumerate())
        .map(|(index, id)| {
            let fut = op(id.clone());
            async move {
                let result = fut.await;
                let item = match result {
                    Ok(()) => BulkItemResult {
                        id,
                        success: true,
                        error: None,
                    },
                    Err(err) => BulkItemResult {
                        id,
                        success: false,
                        error: Some(err.to_string()),
                    },
                };
                (index, item)
            }
        })
        .buffer_unordered(BULK_CONCURRENCY)
        .collect()
        .await;

    indexed.sort_by_key(|(index, _)| *index);
    let items: Vec<BulkItemResult> = indexed.into_iter().map(|(_, item)| item).collect();

    let succeeded = items.iter().filter(|i| i.success).count();
    let failed = items.len() - succeeded;

    BulkOutcome {
        success: failed == 0,
        summary: BulkSummary {
            total: items.len(),
            succeeded,
            failed,
        },
        items,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
