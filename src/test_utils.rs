#![cfg(test)]

//! Shared mock collaborators and fixtures for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use url::Url;

use crate::backends::{CatalogService, DeliveryError, TrackingService};
use crate::cast::{CastChannel, CastTarget, CastTransport, DiscoveryEvent};
use crate::events::EventBus;
use crate::models::{
    ChapterInfo, ItemId, ItemKind, MediaDescriptor, MediaItemInfo, MediaStream, PlayMethod,
    PlaySessionId, PlaybackInfoResponse, SeriesId,
};
use crate::reporting::ProgressReport;
use crate::session::SessionServices;

/// Tracking service that records every report it receives.
pub struct RecordingTracker {
    reports: Mutex<Vec<ProgressReport>>,
    fail_next: AtomicBool,
}

impl RecordingTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            reports: Mutex::new(Vec::new()),
            fail_next: AtomicBool::new(false),
        })
    }

    pub fn reports(&self) -> Vec<ProgressReport> {
        self.reports.lock().unwrap().clone()
    }

    /// Make the next delivery fail with a transport error.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn record(&self, report: &ProgressReport) -> Result<(), DeliveryError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(DeliveryError::Transport("injected failure".to_string()));
        }
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }
}

#[async_trait]
impl TrackingService for RecordingTracker {
    async fn report_start(&self, report: &ProgressReport) -> Result<(), DeliveryError> {
        self.record(report)
    }

    async fn report_pause(&self, report: &ProgressReport) -> Result<(), DeliveryError> {
        self.record(report)
    }

    async fn report_progress(&self, report: &ProgressReport) -> Result<(), DeliveryError> {
        self.record(report)
    }

    async fn report_stop(&self, report: &ProgressReport) -> Result<(), DeliveryError> {
        self.record(report)
    }
}

/// Catalog with pre-scripted neighbor windows and stream descriptors.
pub struct ScriptedCatalog {
    neighbors: Mutex<Vec<MediaItemInfo>>,
    descriptors: Mutex<HashMap<ItemId, MediaDescriptor>>,
    fail_neighbors: AtomicBool,
}

impl ScriptedCatalog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            neighbors: Mutex::new(Vec::new()),
            descriptors: Mutex::new(HashMap::new()),
            fail_neighbors: AtomicBool::new(false),
        })
    }

    pub fn set_neighbors(&self, items: Vec<MediaItemInfo>) {
        *self.neighbors.lock().unwrap() = items;
    }

    pub fn add_descriptor(&self, descriptor: MediaDescriptor) {
        self.descriptors
            .lock()
            .unwrap()
            .insert(descriptor.item.id.clone(), descriptor);
    }

    pub fn fail_neighbors(&self) {
        self.fail_neighbors.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl CatalogService for ScriptedCatalog {
    async fn resolve_stream_info(&self, item_id: &ItemId) -> Result<MediaDescriptor> {
        self.descriptors
            .lock()
            .unwrap()
            .get(item_id)
            .cloned()
            .ok_or_else(|| anyhow!("no descriptor scripted for {}", item_id))
    }

    async fn fetch_neighbors(
        &self,
        _series_id: &SeriesId,
        _adjacent_to: &ItemId,
        _window: usize,
    ) -> Result<Vec<MediaItemInfo>> {
        if self.fail_neighbors.load(Ordering::SeqCst) {
            return Err(anyhow!("injected neighbor fetch failure"));
        }
        Ok(self.neighbors.lock().unwrap().clone())
    }
}

/// Cast transport whose discovery events are driven by the test.
pub struct ScriptedTransport {
    events: broadcast::Sender<DiscoveryEvent>,
    sent: Arc<Mutex<Vec<Value>>>,
    closed: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            events,
            sent: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn push_devices(&self, devices: Vec<CastTarget>) {
        let _ = self.events.send(DiscoveryEvent::DeviceListUpdated(devices));
    }

    pub fn sent_payloads(&self) -> Vec<Value> {
        self.sent.lock().unwrap().clone()
    }

    pub fn closed_channels(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CastTransport for ScriptedTransport {
    async fn start_discovery(&self) -> Result<broadcast::Receiver<DiscoveryEvent>> {
        Ok(self.events.subscribe())
    }

    async fn open_channel(
        &self,
        _target: &CastTarget,
        _namespace: &str,
    ) -> Result<Box<dyn CastChannel>> {
        Ok(Box::new(RecordingChannel {
            sent: Arc::clone(&self.sent),
            closed: Arc::clone(&self.closed),
        }))
    }
}

struct RecordingChannel {
    sent: Arc<Mutex<Vec<Value>>>,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl CastChannel for RecordingChannel {
    async fn send(&self, payload: Value) -> Result<(), DeliveryError> {
        self.sent.lock().unwrap().push(payload);
        Ok(())
    }

    async fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

fn audio_streams() -> Vec<MediaStream> {
    vec![
        MediaStream {
            index: 1,
            display_title: Some("English (Stereo)".to_string()),
            language: Some("eng".to_string()),
            codec: Some("aac".to_string()),
        },
        MediaStream {
            index: 4,
            display_title: Some("Commentary".to_string()),
            language: Some("eng".to_string()),
            codec: Some("ac3".to_string()),
        },
    ]
}

fn subtitle_streams() -> Vec<MediaStream> {
    vec![
        MediaStream {
            index: 10,
            display_title: Some("English".to_string()),
            language: Some("eng".to_string()),
            codec: Some("srt".to_string()),
        },
        MediaStream {
            index: 11,
            display_title: Some("French".to_string()),
            language: Some("fre".to_string()),
            codec: Some("srt".to_string()),
        },
    ]
}

pub fn episode_item(id: &str, series_id: &str) -> MediaItemInfo {
    MediaItemInfo {
        id: ItemId::new(id),
        kind: ItemKind::Episode,
        title: format!("Episode {}", id),
        series_id: Some(SeriesId::new(series_id)),
        run_time_ticks: Some(3_600_000_000),
        user_data: None,
    }
}

/// Movie-shaped descriptor with the shared stream fixtures.
pub fn descriptor(id: &str, run_time_ticks: i64) -> MediaDescriptor {
    MediaDescriptor {
        item: MediaItemInfo {
            id: ItemId::new(id),
            kind: ItemKind::Movie,
            title: format!("Item {}", id),
            series_id: None,
            run_time_ticks: (run_time_ticks > 0).then_some(run_time_ticks),
            user_data: None,
        },
        direct_url: Url::parse(&format!("http://server/Videos/{}/stream.mkv?Static=true", id))
            .unwrap(),
        transcoded_url: None,
        audio_streams: audio_streams(),
        subtitle_streams: subtitle_streams(),
        chapters: Vec::new(),
        response: PlaybackInfoResponse {
            play_session_id: PlaySessionId::new(format!("session-{}", id)),
        },
        play_method: PlayMethod::DirectPlay,
        container: "mkv".to_string(),
        filename: None,
    }
}

/// Episode-shaped descriptor with chapters, for adjacency and chapter tests.
pub fn episode_descriptor(id: &str, series_id: &str) -> MediaDescriptor {
    let mut desc = descriptor(id, 3_600_000_000);
    desc.item = episode_item(id, series_id);
    desc.chapters = vec![
        ChapterInfo {
            start_position_ticks: 0,
            name: Some("Opening".to_string()),
        },
        ChapterInfo {
            start_position_ticks: 1_200_000_000,
            name: Some("Middle".to_string()),
        },
        ChapterInfo {
            start_position_ticks: 2_400_000_000,
            name: Some("Ending".to_string()),
        },
    ];
    desc
}

pub fn services(tracker: Arc<RecordingTracker>) -> SessionServices {
    SessionServices {
        tracking: tracker,
        bus: Arc::new(EventBus::default()),
        downloads: None,
        debounce_window: Duration::from_millis(40),
    }
}

/// Poll `condition` until it holds or `max_wait` elapses.
pub async fn wait_for<F>(condition: F, max_wait: Duration) -> bool
where
    F: Fn() -> bool,
{
    let start = std::time::Instant::now();
    while start.elapsed() < max_wait {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
