//! Session state aggregation and snapshot serialization.

pub mod aggregator;
pub mod fps;
pub mod registry;
pub mod serializer;

pub use aggregator::{CustomEventStore, SessionAggregator};
pub use fps::{FpsTracker, Viewpoint, FPS_NOISE_FLOOR, FPS_WINDOW};
pub use registry::ActionRegistry;
pub use serializer::{serialize, SerializedSnapshot};
