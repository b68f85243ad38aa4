//! Media upload pipeline.
//!
//! The remote media service uses a three-step protocol: obtain a
//! short-lived staged target with required form parameters, transfer the
//! raw bytes to that target, then register the uploaded resource as a
//! first-class asset. The asset becomes resolvable to a URL asynchronously,
//! so [`MediaUploader`] polls with a bounded budget and fails terminally
//! when the budget is exhausted — it never polls unboundedly and never
//! returns an unresolved image.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use bundlekit_core::types::ObjectId;

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Protocol types
// ---------------------------------------------------------------------------

/// A required form parameter for the staged upload request.
#[derive(Debug, Clone)]
pub struct StagedParameter {
    pub name: String,
    pub value: String,
}

/// A short-lived upload target issued by the media service.
#[derive(Debug, Clone)]
pub struct StagedTarget {
    /// Where to POST the bytes.
    pub url: String,
    /// Durable source URL to pass when registering the asset.
    pub resource_url: String,
    pub parameters: Vec<StagedParameter>,
}

/// Processing state of a registered media asset.
#[derive(Debug, Clone)]
pub enum MediaStatus {
    /// Still processing; poll again.
    Processing,
    /// Resolvable to a delivery URL.
    Ready { url: String },
    /// Terminal processing failure.
    Failed { reason: String },
}

/// The remote media service protocol.
#[async_trait]
pub trait MediaService: Send + Sync {
    /// Step 1: request a staged upload target.
    async fn stage_upload(
        &self,
        filename: &str,
        mime_type: &str,
        byte_size: u64,
    ) -> Result<StagedTarget, StoreError>;

    /// Step 2: transfer the raw bytes to the staged target.
    async fn transfer(
        &self,
        target: &StagedTarget,
        filename: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), StoreError>;

    /// Step 3: register the uploaded resource as a media asset, returning
    /// its durable id.
    async fn register(&self, resource_url: &str, alt: Option<&str>) -> Result<ObjectId, StoreError>;

    /// Query the asset's processing status.
    async fn media_status(&self, media_id: &str) -> Result<MediaStatus, StoreError>;
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Pipeline phases, in order. Terminal states are `Ready` and `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Staged,
    Transferred,
    Registering,
    Ready,
    Failed,
}

impl UploadPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            UploadPhase::Staged => "staged",
            UploadPhase::Transferred => "transferred",
            UploadPhase::Registering => "registering",
            UploadPhase::Ready => "ready",
            UploadPhase::Failed => "failed",
        }
    }
}

/// Poll budget for the readiness loop. `interval` is injectable so tests
/// run the bounded retry deterministically with a zero delay.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_POLL_ATTEMPTS,
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

/// Default number of readiness polls before giving up.
pub const DEFAULT_POLL_ATTEMPTS: u32 = 10;
/// Default delay between readiness polls.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// A fully-processed upload: registered asset id plus its delivery URL.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub media_id: ObjectId,
    pub url: String,
}

/// Drives the stage → transfer → register → poll pipeline.
pub struct MediaUploader {
    service: Arc<dyn MediaService>,
    poll: PollPolicy,
}

impl MediaUploader {
    pub fn new(service: Arc<dyn MediaService>, poll: PollPolicy) -> Self {
        Self { service, poll }
    }

    /// Upload image bytes and wait until the asset resolves to a URL.
    ///
    /// Fails with [`StoreError::UploadTimeout`] when the poll budget runs
    /// out, and with [`StoreError::MediaFailed`] when the service reports a
    /// terminal processing failure. Callers create no records referencing
    /// the asset unless this returns `Ok`.
    pub async fn upload_image(
        &self,
        filename: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedImage, StoreError> {
        let byte_size = bytes.len() as u64;

        let target = self
            .service
            .stage_upload(filename, mime_type, byte_size)
            .await?;
        let mut phase = UploadPhase::Staged;
        tracing::debug!(filename, phase = phase.as_str(), "Upload target staged");

        self.service
            .transfer(&target, filename, mime_type, bytes)
            .await?;
        phase = UploadPhase::Transferred;
        tracing::debug!(filename, phase = phase.as_str(), byte_size, "Bytes transferred");

        phase = UploadPhase::Registering;
        let media_id = self.service.register(&target.resource_url, None).await?;
        tracing::debug!(
            filename,
            phase = phase.as_str(),
            media_id = %media_id,
            "Asset registered, polling for readiness",
        );

        for attempt in 1..=self.poll.max_attempts {
            match self.service.media_status(&media_id).await? {
                MediaStatus::Ready { url } => {
                    phase = UploadPhase::Ready;
                    tracing::debug!(
                        filename,
                        phase = phase.as_str(),
                        attempt,
                        "Media resolvable",
                    );
                    return Ok(UploadedImage { media_id, url });
                }
                MediaStatus::Failed { reason } => {
                    phase = UploadPhase::Failed;
                    tracing::warn!(
                        filename,
                        phase = phase.as_str(),
                        media_id = %media_id,
                        %reason,
                        "Media processing failed",
                    );
                    return Err(StoreError::MediaFailed(reason));
                }
                MediaStatus::Processing => {
                    if attempt < self.poll.max_attempts {
                        tokio::time::sleep(self.poll.interval).await;
                    }
                }
            }
        }

        tracing::warn!(
            filename,
            media_id = %media_id,
            attempts = self.poll.max_attempts,
            "Media never became resolvable within the poll budget",
        );
        Err(StoreError::UploadTimeout {
            attempts: self.poll.max_attempts,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
