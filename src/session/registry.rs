use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::task::JoinHandle;
use tracing::debug;

use super::PlaybackSession;
use crate::events::{EventBus, EventPayload, EventType};
use crate::models::ItemId;

/// Arena that owns every live session. Sibling links between sessions are
/// weak; removing a session here is what actually destroys it.
///
/// Clones share the same arena.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<ItemId, Arc<PlaybackSession>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: Arc<PlaybackSession>) {
        self.sessions
            .write()
            .unwrap()
            .insert(session.item_id(), session);
    }

    pub fn get(&self, item_id: &ItemId) -> Option<Arc<PlaybackSession>> {
        self.sessions.read().unwrap().get(item_id).cloned()
    }

    /// Tear the session down and release it. Pending debounced reports are
    /// cancelled; in-flight fetch results against it will be dropped.
    pub fn remove(&self, item_id: &ItemId) -> Option<Arc<PlaybackSession>> {
        let session = self.sessions.write().unwrap().remove(item_id)?;
        session.teardown();
        Some(session)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().unwrap().is_empty()
    }

    pub fn clear(&self) {
        let drained: Vec<_> = self.sessions.write().unwrap().drain().collect();
        for (_, session) in drained {
            session.teardown();
        }
    }

    /// Discard sessions once their stop report has gone out.
    pub fn spawn_stop_report_cleanup(&self, bus: &EventBus) -> JoinHandle<()> {
        let mut subscriber = bus.subscribe_to_types(vec![EventType::StopReportSent]);
        let registry = self.clone();

        tokio::spawn(async move {
            while let Ok(event) = subscriber.recv().await {
                if let EventPayload::Report { item_id } = event.payload
                    && registry.remove(&item_id).is_some()
                {
                    debug!("Discarded session for {} after stop report", item_id);
                }
            }
        })
    }
}
