//! Layer types and error definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::geojson::GeoJsonError;

/// Maximum length of a layer name, matching the storage column.
pub const MAX_NAME_LEN: usize = 100;

/// Errors that can occur when working with layers
#[derive(Debug, Error)]
pub enum LayerError {
    #[error(transparent)]
    Validation(#[from] GeoJsonError),

    #[error("no geometry could be extracted from the GeoJSON document")]
    NoGeometryExtracted,

    #[error("invalid layer name: {0}")]
    InvalidName(String),

    #[error("layer not found: {0}")]
    NotFound(i64),

    #[error("uploaded file exceeds the maximum size of {max} bytes")]
    PayloadTooLarge { max: usize },

    #[error("unsupported file extension: {0:?} (expected json or geojson)")]
    UnsupportedExtension(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A geospatial layer as served by the read API.
///
/// `geometry_type` is derived from the stored geometry on every read
/// (PostGIS `GeometryType`, e.g. `POLYGON`); it is never stored on its own,
/// so it always agrees with the actual geometry. The geometry itself is
/// only exposed through the GeoJSON endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub id: i64,
    pub name: String,
    pub geometry_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A layer row together with its geometry decoded from `ST_AsGeoJSON`,
/// used to build the Feature / FeatureCollection API responses.
#[derive(Debug, Clone)]
pub struct LayerGeometry {
    pub id: i64,
    pub name: String,
    pub geometry: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of the admin name-update request
#[derive(Debug, Deserialize)]
pub struct UpdateLayerRequest {
    pub name: String,
}
