pub mod adjacency;
pub mod registry;

pub use adjacency::AdjacencyResolver;
pub use registry::SessionRegistry;

use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock, Weak};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;
use url::Url;

use crate::backends::{DownloadStore, TrackingService};
use crate::constants::{PLAYLIST_ITEM_ID, TICKS_PER_SECOND};
use crate::core::Property;
use crate::events::{EventBus, EventType};
use crate::models::{
    ChapterInfo, ItemId, MediaDescriptor, MediaItemInfo, MediaStream, NetworkMode, PlayMethod,
    PlaySessionId, PlaybackInfoResponse, RepeatMode,
};
use crate::reporting::{ProgressReport, ReportKind, SessionLifecycleReporter};
use crate::timeline::TimelineModel;

const LABEL_PLACEHOLDER: &str = "--:--";

/// Shared handles a session (and any siblings built for it) needs.
#[derive(Clone)]
pub struct SessionServices {
    pub tracking: Arc<dyn TrackingService>,
    pub bus: Arc<EventBus>,
    pub downloads: Option<Arc<dyn DownloadStore>>,
    pub debounce_window: Duration,
}

/// Initial selections for a new session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub network_mode: NetworkMode,
    pub selected_audio_stream_index: i32,
    pub selected_subtitle_stream_index: i32,
    pub subtitles_enabled: bool,
    pub autoplay_enabled: bool,
    pub playback_speed: f64,
    /// Forward selection changes to linked sibling sessions.
    pub sync_adjacent: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            network_mode: NetworkMode::Online,
            selected_audio_stream_index: 0,
            selected_subtitle_stream_index: -1,
            subtitles_enabled: false,
            autoplay_enabled: true,
            playback_speed: 1.0,
            sync_adjacent: false,
        }
    }
}

/// One media item being played: timeline state, stream selections, sibling
/// links and lifecycle reporting.
///
/// Sessions are owned by a [`SessionRegistry`]; the `previous`/`next` links
/// between them are weak and symmetric. Mutations are expected to arrive
/// from a single coordinating context per session.
pub struct PlaybackSession {
    item: RwLock<MediaItemInfo>,
    timeline: TimelineModel,
    response: PlaybackInfoResponse,
    play_method: PlayMethod,
    container: String,
    filename: Option<String>,
    direct_url: Url,
    transcoded_url: Option<Url>,
    local_file_url: Option<PathBuf>,
    audio_streams: Vec<MediaStream>,
    subtitle_streams: Vec<MediaStream>,
    sync_adjacent: bool,

    fraction: Property<f64>,
    elapsed_label: Property<String>,
    remaining_label: Property<String>,
    playback_speed: Property<f64>,
    subtitles_enabled: Property<bool>,
    selected_audio_stream_index: Property<i32>,
    selected_subtitle_stream_index: Property<i32>,
    autoplay_enabled: Property<bool>,
    network_mode: Property<NetworkMode>,

    previous: RwLock<Weak<PlaybackSession>>,
    next: RwLock<Weak<PlaybackSession>>,

    // Wall-clock ticks at the moment playback started, per the playstate
    // schema. Zero until the start report goes out.
    start_time_ticks: AtomicI64,
    bus: Arc<EventBus>,
    reporter: SessionLifecycleReporter,
    cancel: CancellationToken,
}

impl PlaybackSession {
    pub fn new(
        descriptor: MediaDescriptor,
        options: SessionOptions,
        services: SessionServices,
    ) -> Arc<Self> {
        let timeline = TimelineModel::new(descriptor.item.run_time_ticks, descriptor.chapters);

        let local_file_url = match (&descriptor.filename, &services.downloads) {
            (Some(filename), Some(downloads))
                if downloads.has_local_file(&descriptor.item, filename) =>
            {
                downloads.local_file_url(&descriptor.item, filename)
            }
            _ => None,
        };

        let network_mode = Property::new(options.network_mode, "network_mode");
        let bus = Arc::clone(&services.bus);
        let reporter = SessionLifecycleReporter::new(
            services.tracking,
            services.bus,
            network_mode.clone(),
            services.debounce_window,
        );

        let initial_fraction = descriptor.item.resume_fraction().clamp(0.0, 1.0);

        Arc::new(Self {
            item: RwLock::new(descriptor.item),
            timeline,
            response: descriptor.response,
            play_method: descriptor.play_method,
            container: descriptor.container,
            filename: descriptor.filename,
            direct_url: descriptor.direct_url,
            transcoded_url: descriptor.transcoded_url,
            local_file_url,
            audio_streams: descriptor.audio_streams,
            subtitle_streams: descriptor.subtitle_streams,
            sync_adjacent: options.sync_adjacent,
            fraction: Property::new(initial_fraction, "fraction"),
            // Placeholder until the first position update arrives.
            elapsed_label: Property::new(LABEL_PLACEHOLDER.to_string(), "elapsed_label"),
            remaining_label: Property::new(LABEL_PLACEHOLDER.to_string(), "remaining_label"),
            playback_speed: Property::new(options.playback_speed, "playback_speed"),
            subtitles_enabled: Property::new(options.subtitles_enabled, "subtitles_enabled"),
            selected_audio_stream_index: Property::new(
                options.selected_audio_stream_index,
                "selected_audio_stream_index",
            ),
            selected_subtitle_stream_index: Property::new(
                options.selected_subtitle_stream_index,
                "selected_subtitle_stream_index",
            ),
            autoplay_enabled: Property::new(options.autoplay_enabled, "autoplay_enabled"),
            network_mode,
            previous: RwLock::new(Weak::new()),
            next: RwLock::new(Weak::new()),
            start_time_ticks: AtomicI64::new(0),
            bus,
            reporter,
            cancel: CancellationToken::new(),
        })
    }

    pub fn item(&self) -> MediaItemInfo {
        self.item.read().unwrap().clone()
    }

    pub fn item_id(&self) -> ItemId {
        self.item.read().unwrap().id.clone()
    }

    pub fn play_session_id(&self) -> &PlaySessionId {
        &self.response.play_session_id
    }

    pub fn timeline(&self) -> &TimelineModel {
        &self.timeline
    }

    pub fn direct_url(&self) -> &Url {
        &self.direct_url
    }

    pub fn transcoded_url(&self) -> Option<&Url> {
        self.transcoded_url.as_ref()
    }

    pub fn local_file_url(&self) -> Option<&PathBuf> {
        self.local_file_url.as_ref()
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn audio_streams(&self) -> &[MediaStream] {
        &self.audio_streams
    }

    pub fn subtitle_streams(&self) -> &[MediaStream] {
        &self.subtitle_streams
    }

    // Observable state, for UI binding.

    pub fn fraction(&self) -> &Property<f64> {
        &self.fraction
    }

    pub fn elapsed_label(&self) -> &Property<String> {
        &self.elapsed_label
    }

    pub fn remaining_label(&self) -> &Property<String> {
        &self.remaining_label
    }

    pub fn playback_speed(&self) -> &Property<f64> {
        &self.playback_speed
    }

    pub fn subtitles_enabled(&self) -> &Property<bool> {
        &self.subtitles_enabled
    }

    pub fn selected_audio_stream_index(&self) -> &Property<i32> {
        &self.selected_audio_stream_index
    }

    pub fn selected_subtitle_stream_index(&self) -> &Property<i32> {
        &self.selected_subtitle_stream_index
    }

    pub fn autoplay_enabled(&self) -> &Property<bool> {
        &self.autoplay_enabled
    }

    pub fn network_mode(&self) -> &Property<NetworkMode> {
        &self.network_mode
    }

    pub fn previous(&self) -> Option<Arc<PlaybackSession>> {
        self.previous.read().unwrap().upgrade()
    }

    pub fn next(&self) -> Option<Arc<PlaybackSession>> {
        self.next.read().unwrap().upgrade()
    }

    pub(crate) fn set_previous(&self, session: Weak<PlaybackSession>) {
        *self.previous.write().unwrap() = session;
    }

    pub(crate) fn set_next(&self, session: Weak<PlaybackSession>) {
        *self.next.write().unwrap() = session;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Snapshot of the current selections, used when materializing sibling
    /// sessions so they start out aligned with this one.
    pub async fn options_snapshot(&self) -> SessionOptions {
        SessionOptions {
            network_mode: self.network_mode.get().await,
            selected_audio_stream_index: self.selected_audio_stream_index.get().await,
            selected_subtitle_stream_index: self.selected_subtitle_stream_index.get().await,
            subtitles_enabled: self.subtitles_enabled.get().await,
            autoplay_enabled: self.autoplay_enabled.get().await,
            playback_speed: self.playback_speed.get().await,
            sync_adjacent: self.sync_adjacent,
        }
    }

    // Timeline position.

    pub async fn current_seconds(&self) -> f64 {
        self.timeline.position_seconds(self.fraction.get().await)
    }

    pub async fn current_position_ticks(&self) -> i64 {
        self.timeline.position_ticks(self.fraction.get().await)
    }

    pub async fn current_chapter(&self) -> Option<ChapterInfo> {
        self.timeline
            .chapter_at(self.current_position_ticks().await)
            .cloned()
    }

    pub async fn set_fraction(&self, fraction: f64) {
        let fraction = fraction.clamp(0.0, 1.0);
        self.fraction.set(fraction).await;
        self.refresh_labels(fraction).await;
    }

    /// Seek to an absolute position. Ignored when the item duration is
    /// unknown, since no fraction can be derived from it.
    pub async fn set_seconds(&self, seconds: i64) {
        let duration_ticks = self.timeline.duration_ticks();
        if duration_ticks <= 0 {
            warn!(
                "Ignoring seek on item {} with unknown duration",
                self.item_id()
            );
            return;
        }

        let fraction = (seconds * TICKS_PER_SECOND) as f64 / duration_ticks as f64;
        self.set_fraction(fraction).await;
    }

    async fn refresh_labels(&self, fraction: f64) {
        self.elapsed_label
            .set(TimelineModel::format_elapsed(
                self.timeline.position_seconds(fraction),
            ))
            .await;
        self.remaining_label
            .set(TimelineModel::format_elapsed(
                self.timeline.remaining_seconds(fraction),
            ))
            .await;
    }

    // Stream selection.

    pub async fn current_audio_stream(&self) -> Option<MediaStream> {
        let index = self.selected_audio_stream_index.get().await;
        self.audio_streams
            .iter()
            .find(|stream| stream.index == index)
            .cloned()
    }

    pub async fn current_subtitle_stream(&self) -> Option<MediaStream> {
        let index = self.selected_subtitle_stream_index.get().await;
        self.subtitle_streams
            .iter()
            .find(|stream| stream.index == index)
            .cloned()
    }

    pub async fn set_audio_stream_index(&self, index: i32) {
        self.selected_audio_stream_index.set(index).await;
        if self.sync_adjacent {
            for sibling in self.siblings() {
                sibling.match_audio_stream(self).await;
            }
        }
    }

    pub async fn set_subtitle_stream_index(&self, index: i32) {
        self.selected_subtitle_stream_index.set(index).await;
        if self.sync_adjacent {
            for sibling in self.siblings() {
                sibling.match_subtitle_stream(self).await;
            }
        }
    }

    pub async fn set_subtitles_enabled(&self, enabled: bool) {
        self.subtitles_enabled.set(enabled).await;
        if self.sync_adjacent {
            for sibling in self.siblings() {
                sibling.match_subtitles_enabled(self).await;
            }
        }
    }

    pub async fn set_autoplay_enabled(&self, enabled: bool) {
        self.autoplay_enabled.set(enabled).await;
        if self.sync_adjacent {
            for sibling in self.siblings() {
                sibling.autoplay_enabled.set(enabled).await;
            }
        }
    }

    fn siblings(&self) -> Vec<Arc<PlaybackSession>> {
        [self.previous(), self.next()].into_iter().flatten().collect()
    }

    // One-hop appliers invoked on siblings. These set the raw property and
    // never forward further, so propagation cannot re-enter the origin.

    pub(crate) async fn match_audio_stream(&self, master: &PlaybackSession) {
        let Some(master_stream) = master.current_audio_stream().await else {
            return;
        };
        if let Some(matching) = self
            .audio_streams
            .iter()
            .find(|stream| stream.matches_selection(&master_stream))
        {
            self.selected_audio_stream_index.set(matching.index).await;
        }
    }

    pub(crate) async fn match_subtitle_stream(&self, master: &PlaybackSession) {
        if !master.subtitles_enabled.get().await {
            self.match_subtitles_enabled(master).await;
        }

        let Some(master_stream) = master.current_subtitle_stream().await else {
            return;
        };
        if let Some(matching) = self
            .subtitle_streams
            .iter()
            .find(|stream| stream.matches_selection(&master_stream))
        {
            self.selected_subtitle_stream_index
                .set(matching.index)
                .await;
        }
    }

    pub(crate) async fn match_subtitles_enabled(&self, master: &PlaybackSession) {
        self.subtitles_enabled
            .set(master.subtitles_enabled.get().await)
            .await;
    }

    // Lifecycle reporting.

    pub async fn send_play_report(&self) {
        let now_ticks = chrono::Utc::now().timestamp() * TICKS_PER_SECOND;
        self.start_time_ticks.store(now_ticks, Ordering::Relaxed);

        let resume_ticks = self
            .item
            .read()
            .unwrap()
            .user_data
            .as_ref()
            .and_then(|data| data.playback_position_ticks)
            .unwrap_or(0);

        let report = self
            .build_report(ReportKind::Start, false, resume_ticks, Some(100), Some(100))
            .await;
        self.reporter.report_start(report).await;
        self.bus
            .publish_playback(EventType::PlaybackStarted, self.item_id(), resume_ticks);
    }

    pub async fn send_pause_report(&self, paused: bool) {
        let position = self.current_position_ticks().await;
        let report = self
            .build_report(ReportKind::Pause, paused, position, Some(100), Some(100))
            .await;
        self.reporter.report_pause(report).await;

        let event = if paused {
            EventType::PlaybackPaused
        } else {
            EventType::PlaybackResumed
        };
        self.bus.publish_playback(event, self.item_id(), position);
    }

    /// Queue a progress report; bursts collapse to one delivery per
    /// debounce window.
    pub async fn send_progress_report(&self) {
        let position = self.current_position_ticks().await;
        let report = self
            .build_report(ReportKind::Progress, false, position, None, None)
            .await;
        self.reporter.report_progress(report).await;
    }

    pub async fn send_stop_report(&self) {
        let position = self.current_position_ticks().await;
        let report = self
            .build_report(ReportKind::Stop, false, position, None, None)
            .await;
        self.reporter.report_stop(report).await;
        self.bus
            .publish_playback(EventType::PlaybackStopped, self.item_id(), position);
    }

    async fn build_report(
        &self,
        kind: ReportKind,
        is_paused: bool,
        position_ticks: i64,
        volume_level: Option<i32>,
        brightness: Option<i32>,
    ) -> ProgressReport {
        let item_id = self.item_id();
        let subtitle_stream_index = if self.subtitles_enabled.get().await {
            Some(self.selected_subtitle_stream_index.get().await)
        } else {
            None
        };

        ProgressReport {
            kind,
            media_source_id: item_id.clone(),
            item_id,
            play_session_id: self.response.play_session_id.clone(),
            can_seek: true,
            is_paused,
            is_muted: false,
            audio_stream_index: self.selected_audio_stream_index.get().await,
            subtitle_stream_index,
            position_ticks,
            playback_start_time_ticks: self.start_time_ticks.load(Ordering::Relaxed),
            volume_level,
            brightness,
            play_method: self.play_method,
            repeat_mode: RepeatMode::RepeatNone,
            playlist_item_id: PLAYLIST_ITEM_ID.to_string(),
        }
    }

    // Injected overrides.

    /// Reset the resume state so playback starts from the beginning.
    pub async fn inject_custom_values(&self, start_from_beginning: bool) {
        if start_from_beginning {
            {
                let mut item = self.item.write().unwrap();
                if let Some(user_data) = item.user_data.as_mut() {
                    user_data.playback_position_ticks = Some(0);
                    user_data.played_percentage = Some(0.0);
                }
            }
            self.set_fraction(0.0).await;
        }
    }

    pub async fn set_network_type(&self, mode: NetworkMode) {
        self.network_mode.set(mode).await;
    }

    /// Direct-stream URL with the given subtitle stream burned in.
    pub fn embedded_subtitle_url(&self, stream: &MediaStream) -> Url {
        let mut url = self.direct_url.clone();
        let retained: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(name, _)| name != "SubtitleStreamIndex" && name != "SubtitleMethod")
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();

        {
            let mut pairs = url.query_pairs_mut();
            pairs.clear();
            pairs.extend_pairs(retained);
            pairs.append_pair("SubtitleMethod", "Encode");
            pairs.append_pair("SubtitleStreamIndex", &stream.index.to_string());
        }

        url
    }

    /// Cancel pending reporting and drop sibling links. After this, results
    /// of any still-running adjacency fetches are discarded instead of
    /// applied.
    pub fn teardown(&self) {
        self.cancel.cancel();
        self.reporter.cancel_pending();
        *self.previous.write().unwrap() = Weak::new();
        *self.next.write().unwrap() = Weak::new();
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.reporter.cancel_pending();
    }
}
