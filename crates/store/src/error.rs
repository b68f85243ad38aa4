use bundlekit_core::error::CoreError;
use serde::Serialize;

/// A field-level error returned by the remote store, preserved verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct UserError {
    /// Field path the error refers to, when the remote reports one.
    pub field: Option<String>,
    pub message: String,
}

/// Join remote user-error messages for display.
fn join_messages(errors: &[UserError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The referenced record does not exist in the remote store.
    #[error("Record not found: {id}")]
    NotFound { id: String },

    /// The remote store rejected a write with field-level errors.
    #[error("Remote store rejected the write: {}", join_messages(.0))]
    UserErrors(Vec<UserError>),

    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote returned a non-2xx status code.
    #[error("Remote API error ({status}): {body}")]
    Remote { status: u16, body: String },

    /// The remote returned a 2xx response we could not interpret.
    #[error("Malformed remote response: {0}")]
    Malformed(String),

    /// The media asset reported a terminal processing failure.
    #[error("Media processing failed: {0}")]
    MediaFailed(String),

    /// The media asset never became resolvable within the poll budget.
    #[error("Media never became resolvable after {attempts} poll attempts")]
    UploadTimeout { attempts: u32 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A domain-level error raised before any remote call.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl StoreError {
    /// True when the remote reported that a definition, handle, or title is
    /// already in use. This is one of the two documented content-sniffing
    /// points: the remote has no native uniqueness constraint and signals
    /// collisions only through user-error text.
    pub fn is_taken(&self) -> bool {
        match self {
            StoreError::UserErrors(errors) => errors.iter().any(|e| {
                let msg = e.message.to_ascii_lowercase();
                msg.contains("taken") || msg.contains("already exists")
            }),
            _ => false,
        }
    }
}
