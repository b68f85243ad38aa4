use std::sync::Arc;

use bundlekit_store::bulk::BulkExecutor;
use bundlekit_store::bundle_store::BundleStore;
use bundlekit_store::combination_store::CombinationStore;
use bundlekit_store::sync::Synchronizer;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Bundle repository over the remote object store.
    pub bundles: Arc<BundleStore>,
    /// Combination-image repository plus its upload pipeline.
    pub combinations: Arc<CombinationStore>,
    /// Bulk delete/status executor.
    pub bulk: Arc<BulkExecutor>,
    /// Cart-transform snapshot synchronizer, invoked after every mutation.
    pub sync: Arc<Synchronizer>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
