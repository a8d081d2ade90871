use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use crate::models::{ItemId, MediaDescriptor, MediaItemInfo, SeriesId};
use crate::reporting::ProgressReport;

/// Failure to hand a report to the remote tracking endpoint. Always
/// non-fatal: lifecycle reporting is best-effort telemetry and is never
/// retried inside this crate.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("server rejected report with status {0}")]
    Rejected(u16),
}

/// Catalog/streaming side of the server.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Resolve everything needed to play an item: stream URLs, audio and
    /// subtitle stream lists, chapters and the server-issued play session.
    async fn resolve_stream_info(&self, item_id: &ItemId) -> Result<MediaDescriptor>;

    /// Windowed neighbor query of `window` items centered on `adjacent_to`,
    /// in queue order.
    async fn fetch_neighbors(
        &self,
        series_id: &SeriesId,
        adjacent_to: &ItemId,
        window: usize,
    ) -> Result<Vec<MediaItemInfo>>;
}

/// Playstate side of the server.
#[async_trait]
pub trait TrackingService: Send + Sync {
    async fn report_start(&self, report: &ProgressReport) -> Result<(), DeliveryError>;
    async fn report_pause(&self, report: &ProgressReport) -> Result<(), DeliveryError>;
    async fn report_progress(&self, report: &ProgressReport) -> Result<(), DeliveryError>;
    async fn report_stop(&self, report: &ProgressReport) -> Result<(), DeliveryError>;
}

/// Probe into the embedding application's download store.
pub trait DownloadStore: Send + Sync {
    fn has_local_file(&self, item: &MediaItemInfo, filename: &str) -> bool;
    fn local_file_url(&self, item: &MediaItemInfo, filename: &str) -> Option<PathBuf>;
}
