use anyhow::Result;
use tokio::sync::broadcast;
use tracing::trace;

use super::types::{EventPayload, EventType, PlayerEvent};
use crate::models::{DeviceId, ItemId};

/// Broadcast bus for playback notifications. Publishing never fails: an
/// event with no subscribers is simply dropped.
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<PlayerEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: PlayerEvent) {
        trace!("Publishing event {}", event.event_type.as_str());
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> EventSubscriber {
        EventSubscriber {
            receiver: self.sender.subscribe(),
            types: None,
        }
    }

    pub fn subscribe_to_types(&self, types: Vec<EventType>) -> EventSubscriber {
        EventSubscriber {
            receiver: self.sender.subscribe(),
            types: Some(types),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn publish_playback(&self, event_type: EventType, item_id: ItemId, position_ticks: i64) {
        self.publish(PlayerEvent::new(
            event_type,
            EventPayload::Playback {
                item_id,
                position_ticks,
            },
        ));
    }

    pub fn publish_stop_report_sent(&self, item_id: ItemId) {
        self.publish(PlayerEvent::new(
            EventType::StopReportSent,
            EventPayload::Report { item_id },
        ));
    }

    pub fn publish_cast(&self, event_type: EventType, device_id: Option<DeviceId>) {
        self.publish(PlayerEvent::new(
            event_type,
            EventPayload::Cast { device_id },
        ));
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Receiving half of the bus, optionally restricted to a set of event types.
pub struct EventSubscriber {
    receiver: broadcast::Receiver<PlayerEvent>,
    types: Option<Vec<EventType>>,
}

impl EventSubscriber {
    /// Receive the next matching event.
    pub async fn recv(&mut self) -> Result<PlayerEvent> {
        loop {
            let event = self.receiver.recv().await?;
            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking receive. Returns `Ok(None)` when no matching event is
    /// queued.
    pub fn try_recv(&mut self) -> Result<Option<PlayerEvent>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.matches(&event) {
                        return Ok(Some(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn matches(&self, event: &PlayerEvent) -> bool {
        self.types
            .as_ref()
            .is_none_or(|types| types.contains(&event.event_type))
    }
}
