//! PostGIS-backed layer store
//!
//! All spatial SQL lives here. Geometry construction, serialization and
//! type introspection are delegated to the spatial engine
//! (`ST_GeomFromGeoJSON`, `ST_AsGeoJSON`, `GeometryType`); the application
//! performs no geometry math of its own.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::Row;
use sqlx::postgres::{PgPool, PgRow};
use tracing::debug;

use super::types::{Layer, LayerError, LayerGeometry};

/// Persistence operations for layers
#[async_trait]
pub trait LayerStore: Send + Sync {
    /// All layers, newest first.
    async fn list(&self) -> Result<Vec<Layer>, LayerError>;

    /// Layers whose stored geometry is of the given type (e.g. `POLYGON`).
    async fn list_by_geometry_type(&self, geometry_type: &str) -> Result<Vec<Layer>, LayerError>;

    /// Find a layer by id.
    async fn find(&self, id: i64) -> Result<Option<Layer>, LayerError>;

    /// Insert a layer from a GeoJSON geometry document and return the
    /// created row. The inserted id is captured directly from the insert
    /// statement, so concurrent writers cannot observe each other's rows.
    async fn insert(&self, name: &str, geometry: &Value) -> Result<Layer, LayerError>;

    /// Rename a layer. Returns false if the layer does not exist.
    async fn update_name(&self, id: i64, name: &str) -> Result<bool, LayerError>;

    /// Delete a layer. Returns false if the layer does not exist.
    async fn delete(&self, id: i64) -> Result<bool, LayerError>;

    /// All layers with their geometry re-encoded as GeoJSON, newest first.
    async fn all_as_geojson(&self) -> Result<Vec<LayerGeometry>, LayerError>;

    /// A single layer with its geometry re-encoded as GeoJSON.
    async fn find_geojson(&self, id: i64) -> Result<Option<LayerGeometry>, LayerError>;

    /// Total number of layers.
    async fn count(&self) -> Result<i64, LayerError>;
}

/// `LayerStore` over a PostGIS-enabled Postgres pool
pub struct PgLayerStore {
    pool: PgPool,
}

impl PgLayerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

const LAYER_COLUMNS: &str =
    "id, name, GeometryType(geometry) AS geometry_type, created_at, updated_at";

fn layer_from_row(row: &PgRow) -> Result<Layer, sqlx::Error> {
    Ok(Layer {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        geometry_type: row.try_get("geometry_type")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn geometry_from_row(row: &PgRow) -> Result<LayerGeometry, sqlx::Error> {
    let raw: String = row.try_get("geometry")?;
    let geometry: Value =
        serde_json::from_str(&raw).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

    Ok(LayerGeometry {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        geometry,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

#[async_trait]
impl LayerStore for PgLayerStore {
    async fn list(&self) -> Result<Vec<Layer>, LayerError> {
        let rows = sqlx::query(&format!(
            "SELECT {LAYER_COLUMNS} FROM geo.layers ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| layer_from_row(row).map_err(LayerError::from))
            .collect()
    }

    async fn list_by_geometry_type(&self, geometry_type: &str) -> Result<Vec<Layer>, LayerError> {
        let rows = sqlx::query(&format!(
            "SELECT {LAYER_COLUMNS} FROM geo.layers \
             WHERE GeometryType(geometry) = UPPER($1) \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(geometry_type)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| layer_from_row(row).map_err(LayerError::from))
            .collect()
    }

    async fn find(&self, id: i64) -> Result<Option<Layer>, LayerError> {
        let row = sqlx::query(&format!(
            "SELECT {LAYER_COLUMNS} FROM geo.layers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(layer_from_row).transpose().map_err(LayerError::from)
    }

    async fn insert(&self, name: &str, geometry: &Value) -> Result<Layer, LayerError> {
        let row = sqlx::query(
            "INSERT INTO geo.layers (name, geometry, created_at, updated_at) \
             VALUES ($1, ST_GeomFromGeoJSON($2), NOW(), NOW()) \
             RETURNING id",
        )
        .bind(name)
        .bind(geometry.to_string())
        .fetch_one(&self.pool)
        .await?;

        let id: i64 = row.try_get("id")?;
        debug!(layer_id = id, "inserted layer geometry");

        self.find(id)
            .await?
            .ok_or(LayerError::Database(sqlx::Error::RowNotFound))
    }

    async fn update_name(&self, id: i64, name: &str) -> Result<bool, LayerError> {
        let result = sqlx::query(
            "UPDATE geo.layers SET name = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(name)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool, LayerError> {
        let result = sqlx::query("DELETE FROM geo.layers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn all_as_geojson(&self) -> Result<Vec<LayerGeometry>, LayerError> {
        let rows = sqlx::query(
            "SELECT id, name, ST_AsGeoJSON(geometry) AS geometry, created_at, updated_at \
             FROM geo.layers \
             ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| geometry_from_row(row).map_err(LayerError::from))
            .collect()
    }

    async fn find_geojson(&self, id: i64) -> Result<Option<LayerGeometry>, LayerError> {
        let row = sqlx::query(
            "SELECT id, name, ST_AsGeoJSON(geometry) AS geometry, created_at, updated_at \
             FROM geo.layers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(geometry_from_row)
            .transpose()
            .map_err(LayerError::from)
    }

    async fn count(&self) -> Result<i64, LayerError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM geo.layers")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("count")?)
    }
}
