use std::sync::Arc;

use tracing::{debug, warn};

use super::registry::SessionRegistry;
use super::{PlaybackSession, SessionServices};
use crate::backends::CatalogService;
use crate::constants::NEIGHBOR_WINDOW;
use crate::models::{ItemId, ItemKind, MediaItemInfo, NetworkMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NeighborSlot {
    Previous,
    Next,
}

impl NeighborSlot {
    fn as_str(self) -> &'static str {
        match self {
            NeighborSlot::Previous => "previous",
            NeighborSlot::Next => "next",
        }
    }
}

/// Classify a neighbor window centered on `current`. The window is in queue
/// order, so which neighbors exist follows from the item count and the
/// current item's position alone:
///
/// - one item: no neighbors
/// - two items, current first: a next episode only
/// - two items, current second: a previous episode only
/// - three items: previous and next on either side
///
/// Any other shape is inconsistent and yields no neighbors.
fn classify_window<'a>(
    items: &'a [MediaItemInfo],
    current: &ItemId,
) -> (Option<&'a MediaItemInfo>, Option<&'a MediaItemInfo>) {
    match items {
        [first, second] if first.id == *current => (None, Some(second)),
        [first, second] if second.id == *current => (Some(first), None),
        [first, _, third] => (Some(first), Some(third)),
        _ => (None, None),
    }
}

/// Builds and links the previous/next sessions around a playing episode,
/// carrying the master's stream selections over to them.
pub struct AdjacencyResolver {
    catalog: Arc<dyn CatalogService>,
    registry: SessionRegistry,
    services: SessionServices,
}

impl AdjacencyResolver {
    pub fn new(
        catalog: Arc<dyn CatalogService>,
        registry: SessionRegistry,
        services: SessionServices,
    ) -> Self {
        Self {
            catalog,
            registry,
            services,
        }
    }

    /// Fetch the neighbor window for `master` and attach whatever it
    /// yields. Fetch failures leave the affected link unset; they are never
    /// fatal to the master session.
    pub async fn resolve_adjacent(&self, master: &Arc<PlaybackSession>) {
        if master.network_mode().get().await != NetworkMode::Online {
            return;
        }

        let item = master.item();
        if item.kind != ItemKind::Episode {
            return;
        }
        let Some(series_id) = item.series_id.clone() else {
            return;
        };

        let items = match self
            .catalog
            .fetch_neighbors(&series_id, &item.id, NEIGHBOR_WINDOW)
            .await
        {
            Ok(items) => items,
            Err(e) => {
                warn!("Neighbor fetch failed for {}: {:#}", item.id, e);
                return;
            }
        };

        let (previous, next) = classify_window(&items, &item.id);
        if previous.is_none() && next.is_none() {
            if items.len() != 1 {
                warn!(
                    "Unexpected neighbor window of {} items for {}",
                    items.len(),
                    item.id
                );
            }
            return;
        }

        // Previous and next resolve independently; neither outcome gates
        // the other.
        futures::join!(
            self.attach_neighbor(master, previous.cloned(), NeighborSlot::Previous),
            self.attach_neighbor(master, next.cloned(), NeighborSlot::Next),
        );
    }

    async fn attach_neighbor(
        &self,
        master: &Arc<PlaybackSession>,
        neighbor: Option<MediaItemInfo>,
        slot: NeighborSlot,
    ) {
        let Some(neighbor) = neighbor else {
            return;
        };

        let descriptor = match self.catalog.resolve_stream_info(&neighbor.id).await {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!(
                    "Failed to resolve {} episode {}: {:#}",
                    slot.as_str(),
                    neighbor.id,
                    e
                );
                return;
            }
        };

        // The master may have been torn down while the fetch was in
        // flight; its results are dropped, not applied.
        if master.is_cancelled() {
            debug!(
                "Dropping {} episode {} for torn-down session {}",
                slot.as_str(),
                neighbor.id,
                master.item_id()
            );
            return;
        }

        let mut options = master.options_snapshot().await;
        options.selected_audio_stream_index = descriptor
            .audio_streams
            .first()
            .map(|stream| stream.index)
            .unwrap_or(0);
        options.selected_subtitle_stream_index = descriptor
            .subtitle_streams
            .first()
            .map(|stream| stream.index)
            .unwrap_or(-1);

        let session = PlaybackSession::new(descriptor, options, self.services.clone());
        session.match_subtitle_stream(master).await;
        session.match_audio_stream(master).await;

        self.registry.insert(Arc::clone(&session));

        match slot {
            NeighborSlot::Previous => {
                master.set_previous(Arc::downgrade(&session));
                session.set_next(Arc::downgrade(master));
            }
            NeighborSlot::Next => {
                master.set_next(Arc::downgrade(&session));
                session.set_previous(Arc::downgrade(master));
            }
        }

        debug!(
            "Linked {} episode {} to {}",
            slot.as_str(),
            session.item_id(),
            master.item_id()
        );
    }
}
