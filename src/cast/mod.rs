pub mod transport;

pub use transport::{CastChannel, CastTarget, CastTransport, DiscoveryEvent};

use std::sync::{Arc, Mutex as StdMutex, Weak};

use anyhow::Result;
use serde_json::{Map, Value, json};
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::Property;
use crate::events::{EventBus, EventType};
use crate::models::{ServerId, UserId};
use crate::session::PlaybackSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastState {
    Idle,
    Discovering,
    Targeted,
    Casting,
}

/// Identity fields attached to every dispatched command.
#[derive(Debug, Clone)]
pub struct CastIdentity {
    pub user_id: UserId,
    pub server_id: ServerId,
}

// A selected target with its open channel and, while casting, the session
// delegated to it. stop_cast drops the whole value, so selection and
// channel can never be cleared separately.
struct CastSession {
    target: CastTarget,
    channel: Box<dyn CastChannel>,
    delegate: Weak<PlaybackSession>,
}

/// Tracks discoverable remote playback targets, the selected target and
/// the session delegated to it.
///
/// One instance is created by the embedding application and handed out by
/// clone; clones share all state. Shut it down explicitly when casting
/// support goes away. Device-set and selection mutations come only from
/// the discovery listener and the explicit `select`/`stop_cast` calls;
/// readers treat snapshots as immediately stale.
#[derive(Clone)]
pub struct RemoteCastCoordinator {
    transport: Arc<dyn CastTransport>,
    bus: Arc<EventBus>,
    identity: CastIdentity,
    namespace: String,
    devices: Property<Vec<CastTarget>>,
    selected_device: Property<Option<CastTarget>>,
    state: Property<CastState>,
    active: Arc<Mutex<Option<CastSession>>>,
    listener: Arc<StdMutex<Option<JoinHandle<()>>>>,
}

impl RemoteCastCoordinator {
    pub fn new(
        transport: Arc<dyn CastTransport>,
        bus: Arc<EventBus>,
        identity: CastIdentity,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            bus,
            identity,
            namespace: namespace.into(),
            devices: Property::new(Vec::new(), "cast_devices"),
            selected_device: Property::new(None, "selected_cast_device"),
            state: Property::new(CastState::Idle, "cast_state"),
            active: Arc::new(Mutex::new(None)),
            listener: Arc::new(StdMutex::new(None)),
        }
    }

    // Observable state, for UI binding.

    pub fn devices(&self) -> &Property<Vec<CastTarget>> {
        &self.devices
    }

    pub fn selected_device(&self) -> &Property<Option<CastTarget>> {
        &self.selected_device
    }

    pub fn state(&self) -> &Property<CastState> {
        &self.state
    }

    /// Begin passive scanning and keep the device set in sync with the
    /// transport's notifications.
    pub async fn start_discovery(&self) -> Result<()> {
        let mut events = self.transport.start_discovery().await?;

        if self.state.get().await == CastState::Idle {
            self.state.set(CastState::Discovering).await;
        }

        let coordinator = self.clone();
        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(DiscoveryEvent::DeviceListUpdated(devices)) => {
                        coordinator.handle_device_list(devices).await;
                    }
                    Ok(DiscoveryEvent::SessionStarted(device_id)) => {
                        debug!("Remote session started on {}", device_id);
                    }
                    Ok(DiscoveryEvent::SessionEnded(device_id)) => {
                        debug!("Remote session ended on {}", device_id);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("Discovery listener lagged, skipped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        if let Some(old) = self.listener.lock().unwrap().replace(handle) {
            old.abort();
        }

        info!("Cast discovery started");
        Ok(())
    }

    async fn handle_device_list(&self, devices: Vec<CastTarget>) {
        info!("Cast device list updated: {} device(s)", devices.len());

        // Each update replaces the full known set; no stale entries survive.
        self.devices.set(devices.clone()).await;
        self.bus.publish_cast(EventType::CastDevicesUpdated, None);

        let selection_lost = {
            let active = self.active.lock().await;
            active
                .as_ref()
                .is_some_and(|cast| !devices.contains(&cast.target))
        };

        if selection_lost {
            warn!("Selected cast target disappeared from the device set");
            self.stop_cast().await;
        }
    }

    /// Record `device` as the target and open a command channel to it.
    pub async fn select(&self, device: CastTarget) -> Result<()> {
        let channel = self.transport.open_channel(&device, &self.namespace).await?;

        {
            let mut active = self.active.lock().await;
            if let Some(prior) = active.take() {
                prior.channel.close().await;
            }
            *active = Some(CastSession {
                target: device.clone(),
                channel,
                delegate: Weak::new(),
            });
        }

        info!("Selected cast target {}", device.friendly_name);
        self.selected_device.set(Some(device)).await;
        self.state.set(CastState::Targeted).await;
        Ok(())
    }

    /// Delegate `session` to the selected target. A no-op when nothing is
    /// selected; any previously delegated session is displaced first.
    pub async fn start_cast(&self, session: &Arc<PlaybackSession>) {
        let device_id = {
            let mut active = self.active.lock().await;
            let Some(cast) = active.as_mut() else {
                debug!("start_cast without a selected target is a no-op");
                return;
            };
            cast.delegate = Arc::downgrade(session);
            cast.target.id.clone()
        };

        info!("Casting {} to {}", session.item_id(), device_id);
        self.state.set(CastState::Casting).await;
        self.bus
            .publish_cast(EventType::CastSessionStarted, Some(device_id));
    }

    /// End the remote session, closing the channel and clearing the
    /// selection together.
    pub async fn stop_cast(&self) {
        let Some(cast) = self.active.lock().await.take() else {
            return;
        };

        cast.channel.close().await;
        self.selected_device.set(None).await;
        self.state.set(CastState::Discovering).await;
        self.bus
            .publish_cast(EventType::CastSessionEnded, Some(cast.target.id.clone()));
        info!("Cast to {} ended", cast.target.friendly_name);
    }

    /// Serialize a command onto the open channel. Dispatching without a
    /// channel is a no-op; delivery failures are logged, never retried.
    pub async fn send_cast_command(&self, name: &str, options: Map<String, Value>) {
        let active = self.active.lock().await;
        let Some(cast) = active.as_ref() else {
            debug!("Ignoring cast command {} without an open channel", name);
            return;
        };

        let play_session_id = cast
            .delegate
            .upgrade()
            .map(|session| session.play_session_id().to_string());

        let payload = json!({
            "command": name,
            "options": options,
            "userId": self.identity.user_id.as_str(),
            "serverId": self.identity.server_id.as_str(),
            "playSessionId": play_session_id,
        });

        if let Err(e) = cast.channel.send(payload).await {
            warn!("Cast command {} failed: {}", name, e);
        }
    }

    /// Stop listening and tear down any active cast.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.listener.lock().unwrap().take() {
            handle.abort();
        }
        self.stop_cast().await;
        self.state.set(CastState::Idle).await;
        self.devices.set(Vec::new()).await;
    }
}
