//! Cross-store synchronizer.
//!
//! After any bundle mutation the full active-bundle snapshot is rebuilt
//! from the source-of-truth store and the single derived document is
//! overwritten wholesale. There is no differential update and no mutual
//! exclusion: overlapping passes converge because the rebuild is a pure
//! function of current bundle state and the write is last-writer-wins over
//! the whole document. A failed pass leaves the stores transiently
//! divergent; the next successful pass self-heals.

use std::sync::Arc;

use async_trait::async_trait;

use bundlekit_core::snapshot::build_snapshot;

use crate::bundle_store::BundleStore;
use crate::error::StoreError;

/// Namespace of the derived document under the cart-transform resource.
pub const SNAPSHOT_NAMESPACE: &str = "$app:bundles";
/// Key of the derived document.
pub const SNAPSHOT_KEY: &str = "function-configuration";

/// The derived-view store: one opaque document, overwritten wholesale.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn write_snapshot(&self, payload: &str) -> Result<(), StoreError>;

    /// Read the current document, if one has been written.
    async fn read_snapshot(&self) -> Result<Option<String>, StoreError>;
}

/// Re-materializes the checkout-time snapshot after bundle mutations.
pub struct Synchronizer {
    bundles: Arc<BundleStore>,
    snapshots: Arc<dyn SnapshotStore>,
}

impl Synchronizer {
    pub fn new(bundles: Arc<BundleStore>, snapshots: Arc<dyn SnapshotStore>) -> Self {
        Self { bundles, snapshots }
    }

    /// Rebuild and overwrite the snapshot document.
    ///
    /// Invoked unconditionally after every create/update/delete/step
    /// mutation. The caller must not roll back the triggering mutation on
    /// failure; it reports the error and relies on the next pass to heal.
    pub async fn on_bundle_changed(&self) -> Result<(), StoreError> {
        let active = self.bundles.list_active().await?;
        let snapshot = build_snapshot(&active);
        let payload = serde_json::to_string(&snapshot)?;
        self.snapshots.write_snapshot(&payload).await?;
        tracing::info!(
            active = active.len(),
            bytes = payload.len(),
            "Cart-transform snapshot rebuilt",
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
