use serde::{Deserialize, Serialize};

use crate::models::{DeviceId, ItemId};

/// App-wide notification emitted by the playback coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerEvent {
    pub id: String,
    pub event_type: EventType,
    pub payload: EventPayload,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl PlayerEvent {
    pub fn new(event_type: EventType, payload: EventPayload) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type,
            payload,
            timestamp: chrono::Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    PlaybackStarted,
    PlaybackPaused,
    PlaybackResumed,
    PlaybackStopped,

    /// A stop report was handed to the tracking service. Sibling-cleanup
    /// logic listens for this to discard the finished session.
    StopReportSent,

    CastDevicesUpdated,
    CastSessionStarted,
    CastSessionEnded,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PlaybackStarted => "playback.started",
            EventType::PlaybackPaused => "playback.paused",
            EventType::PlaybackResumed => "playback.resumed",
            EventType::PlaybackStopped => "playback.stopped",
            EventType::StopReportSent => "report.stop_sent",
            EventType::CastDevicesUpdated => "cast.devices_updated",
            EventType::CastSessionStarted => "cast.session_started",
            EventType::CastSessionEnded => "cast.session_ended",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    Playback {
        item_id: ItemId,
        position_ticks: i64,
    },
    Report {
        item_id: ItemId,
    },
    Cast {
        device_id: Option<DeviceId>,
    },
}
