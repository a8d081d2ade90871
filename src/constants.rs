use std::time::Duration;

/// Tick resolution used by the tracking service: 100ns units.
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Delay after the last scrub before a coalesced progress report is sent.
pub const DEFAULT_PROGRESS_DEBOUNCE: Duration = Duration::from_millis(700);

/// Size of the neighbor query window centered on the current episode.
pub const NEIGHBOR_WINDOW: usize = 3;

/// Application namespace cast command channels are scoped to.
pub const CAST_APP_NAMESPACE: &str = "urn:x-cast:dev.playhead.media";

/// Fixed playlist slot id expected by the playstate schema.
pub const PLAYLIST_ITEM_ID: &str = "playlistItem0";

pub const CLIENT_NAME: &str = "Playhead";
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");
