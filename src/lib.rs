//! Playback session coordination for Jellyfin-compatible media clients.
//!
//! This crate tracks an in-progress playback session's timeline state,
//! synchronizes it with sibling sessions (previous/next queued episodes and
//! an optional remote cast target), and reports session lifecycle events to
//! a remote tracking service with debounced, best-effort delivery.
//!
//! Rendering, navigation and the media engine itself are the embedding
//! application's business; they talk to this crate through the traits in
//! [`backends`] and [`cast::transport`] and the observable properties on
//! [`session::PlaybackSession`].

pub mod backends;
pub mod cast;
pub mod config;
pub mod constants;
pub mod core;
pub mod events;
pub mod logging;
pub mod models;
pub mod reporting;
pub mod session;
pub mod timeline;

#[cfg(test)]
mod test_utils;

pub use cast::{CastIdentity, CastState, CastTarget, RemoteCastCoordinator};
pub use session::{
    AdjacencyResolver, PlaybackSession, SessionOptions, SessionRegistry, SessionServices,
};
