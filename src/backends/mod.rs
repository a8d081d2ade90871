pub mod jellyfin;
pub mod traits;

pub use jellyfin::JellyfinClient;
pub use traits::{CatalogService, DeliveryError, DownloadStore, TrackingService};
