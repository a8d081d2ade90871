use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::backends::DeliveryError;
use crate::models::DeviceId;

/// A discoverable remote playback target. Reachability is implied by
/// membership in the current discovered set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastTarget {
    pub id: DeviceId,
    pub friendly_name: String,
}

/// Notifications surfaced by the discovery transport.
#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    /// Wholesale replacement of the discovered device set. An empty list
    /// clears it.
    DeviceListUpdated(Vec<CastTarget>),
    SessionStarted(DeviceId),
    SessionEnded(DeviceId),
}

/// Discovery and session transport for remote playback targets. The
/// protocol behind it is a black box; the coordinator only consumes the
/// device-list stream and opens command channels.
#[async_trait]
pub trait CastTransport: Send + Sync {
    /// Begin passive scanning and return the notification stream.
    async fn start_discovery(&self) -> Result<broadcast::Receiver<DiscoveryEvent>>;

    /// Open a command channel to a device, scoped to an application
    /// namespace.
    async fn open_channel(
        &self,
        target: &CastTarget,
        namespace: &str,
    ) -> Result<Box<dyn CastChannel>>;
}

/// An open command channel to one device.
#[async_trait]
pub trait CastChannel: Send + Sync {
    /// Fire-and-forget command delivery.
    async fn send(&self, payload: serde_json::Value) -> Result<(), DeliveryError>;

    async fn close(&self);
}
