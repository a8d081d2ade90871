use serde::Serialize;

use crate::models::{ItemId, PlayMethod, PlaySessionId, RepeatMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Start,
    Pause,
    Progress,
    Stop,
}

/// Snapshot of session state handed to the tracking endpoint. Serialized
/// field names follow the server's playstate schema; volume, brightness,
/// repeat mode and the playlist slot are pass-through constants the schema
/// requires.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProgressReport {
    #[serde(skip)]
    pub kind: ReportKind,
    pub item_id: ItemId,
    pub media_source_id: ItemId,
    pub play_session_id: PlaySessionId,
    pub can_seek: bool,
    pub is_paused: bool,
    pub is_muted: bool,
    pub audio_stream_index: i32,
    /// Present only while subtitles are enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle_stream_index: Option<i32>,
    pub position_ticks: i64,
    pub playback_start_time_ticks: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_level: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<i32>,
    pub play_method: PlayMethod,
    pub repeat_mode: RepeatMode,
    pub playlist_item_id: String,
}
