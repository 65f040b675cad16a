//! Layer domain: types, PostGIS-backed store, orchestration service and
//! HTTP routes.

pub mod routes;
pub mod service;
pub mod store;
pub mod types;

pub use routes::{LayerAppState, admin_routes, layer_routes};
pub use service::LayerService;
pub use store::{LayerStore, PgLayerStore};
pub use types::{Layer, LayerError, LayerGeometry};
