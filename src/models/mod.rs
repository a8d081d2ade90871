mod identifiers;

pub use identifiers::{DeviceId, ItemId, PlaySessionId, SeriesId, ServerId, UserId};

use serde::{Deserialize, Serialize};
use url::Url;

/// Whether a session is allowed to talk to the server at all. A `Local`
/// session plays a downloaded file and must never attempt network I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkMode {
    Online,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayMethod {
    DirectPlay,
    Transcode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepeatMode {
    RepeatNone,
    RepeatAll,
    RepeatOne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    Movie,
    Episode,
    Other,
}

/// One audio or subtitle stream inside a media source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaStream {
    pub index: i32,
    pub display_title: Option<String>,
    pub language: Option<String>,
    pub codec: Option<String>,
}

impl MediaStream {
    /// Streams are treated as interchangeable across items when both the
    /// display title and the language agree.
    pub fn matches_selection(&self, other: &MediaStream) -> bool {
        self.display_title == other.display_title && self.language == other.language
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterInfo {
    pub start_position_ticks: i64,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserItemData {
    pub played_percentage: Option<f64>,
    pub playback_position_ticks: Option<i64>,
}

/// Catalog metadata for a playable item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItemInfo {
    pub id: ItemId,
    pub kind: ItemKind,
    pub title: String,
    pub series_id: Option<SeriesId>,
    pub run_time_ticks: Option<i64>,
    pub user_data: Option<UserItemData>,
}

impl MediaItemInfo {
    /// Resume position as a fraction of the item duration, in `[0, 1]`.
    pub fn resume_fraction(&self) -> f64 {
        self.user_data
            .as_ref()
            .and_then(|data| data.played_percentage)
            .unwrap_or(0.0)
            / 100.0
    }
}

/// The slice of the server's playback-info response the coordinator keeps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackInfoResponse {
    pub play_session_id: PlaySessionId,
}

/// Fully-resolved inputs for one playback session: stream URLs, stream
/// lists, chapters and the server-issued session identity. Produced by the
/// catalog service before a session is constructed.
#[derive(Debug, Clone)]
pub struct MediaDescriptor {
    pub item: MediaItemInfo,
    pub direct_url: Url,
    pub transcoded_url: Option<Url>,
    pub audio_streams: Vec<MediaStream>,
    pub subtitle_streams: Vec<MediaStream>,
    pub chapters: Vec<ChapterInfo>,
    pub response: PlaybackInfoResponse,
    pub play_method: PlayMethod,
    pub container: String,
    pub filename: Option<String>,
}
