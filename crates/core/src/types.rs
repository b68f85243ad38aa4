/// Opaque identifier assigned by the remote object store
/// (e.g. `gid://shop/Bundle/42`).
pub type ObjectId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
