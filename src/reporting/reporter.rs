use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::debouncer::{ReportDebouncer, ReportSink};
use super::report::ProgressReport;
use crate::backends::TrackingService;
use crate::core::Property;
use crate::events::EventBus;
use crate::models::NetworkMode;

struct DebouncedDelivery {
    tracking: Arc<dyn TrackingService>,
}

#[async_trait]
impl ReportSink for DebouncedDelivery {
    async fn deliver(&self, report: ProgressReport) {
        match self.tracking.report_progress(&report).await {
            Ok(()) => debug!("Progress report sent for item {}", report.item_id),
            Err(e) => warn!("Failed to send progress report for {}: {}", report.item_id, e),
        }
    }
}

/// Delivers session lifecycle reports to the tracking service.
///
/// Every operation is a no-op while the session is in `Local` mode, and
/// every delivery failure is logged and swallowed: reporting is telemetry,
/// never something playback waits on. Progress reports route through the
/// debouncer; start/pause/stop go out directly.
pub struct SessionLifecycleReporter {
    tracking: Arc<dyn TrackingService>,
    bus: Arc<EventBus>,
    network_mode: Property<NetworkMode>,
    debouncer: ReportDebouncer,
}

impl SessionLifecycleReporter {
    pub fn new(
        tracking: Arc<dyn TrackingService>,
        bus: Arc<EventBus>,
        network_mode: Property<NetworkMode>,
        debounce_window: Duration,
    ) -> Self {
        let sink = Arc::new(DebouncedDelivery {
            tracking: Arc::clone(&tracking),
        });
        Self {
            tracking,
            bus,
            network_mode,
            debouncer: ReportDebouncer::new(debounce_window, sink),
        }
    }

    async fn online(&self) -> bool {
        self.network_mode.get().await == NetworkMode::Online
    }

    pub async fn report_start(&self, report: ProgressReport) {
        if !self.online().await {
            return;
        }
        match self.tracking.report_start(&report).await {
            Ok(()) => debug!("Start report sent for item {}", report.item_id),
            Err(e) => warn!("Failed to send start report for {}: {}", report.item_id, e),
        }
    }

    pub async fn report_pause(&self, report: ProgressReport) {
        if !self.online().await {
            return;
        }
        match self.tracking.report_pause(&report).await {
            Ok(()) => debug!("Pause report sent for item {}", report.item_id),
            Err(e) => warn!("Failed to send pause report for {}: {}", report.item_id, e),
        }
    }

    pub async fn report_progress(&self, report: ProgressReport) {
        if !self.online().await {
            return;
        }
        self.debouncer.submit(report);
    }

    pub async fn report_stop(&self, report: ProgressReport) {
        if !self.online().await {
            return;
        }

        // A stop supersedes whatever progress was still waiting its turn.
        self.debouncer.cancel();

        let item_id = report.item_id.clone();
        match self.tracking.report_stop(&report).await {
            Ok(()) => debug!("Stop report sent for item {}", item_id),
            Err(e) => warn!("Failed to send stop report for {}: {}", item_id, e),
        }

        // Sibling cleanup relies on this firing whether or not the report
        // reached the server.
        self.bus.publish_stop_report_sent(item_id);
    }

    /// Discard any pending debounced report. Part of session teardown.
    pub fn cancel_pending(&self) {
        self.debouncer.cancel();
    }

    pub fn has_pending_progress(&self) -> bool {
        self.debouncer.has_pending()
    }
}
