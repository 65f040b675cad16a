//! Layer orchestration service
//!
//! Ties together the upload pipeline: blob storage of the original file,
//! structural validation, geometry extraction and persistence. Also builds
//! the Feature / FeatureCollection documents served by the GeoJSON
//! endpoints.

use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::geojson::{extract, validate};
use crate::storage::ObjectStore;

use super::store::LayerStore;
use super::types::{Layer, LayerError, LayerGeometry, MAX_NAME_LEN};

pub struct LayerService {
    store: Arc<dyn LayerStore>,
    objects: Arc<dyn ObjectStore>,
}

impl LayerService {
    pub fn new(store: Arc<dyn LayerStore>, objects: Arc<dyn ObjectStore>) -> Self {
        Self { store, objects }
    }

    /// Create a layer from an uploaded GeoJSON file.
    ///
    /// The original file is stored as a blob first, best-effort: a storage
    /// failure is logged and ingestion continues from the in-memory bytes.
    /// Validation or extraction failures abort with no database write and
    /// clean up the just-stored blob.
    pub async fn create_layer(
        &self,
        name: &str,
        original_filename: &str,
        data: &[u8],
    ) -> Result<Layer, LayerError> {
        let name = validated_name(name)?;

        info!(
            layer_name = %name,
            file_name = %original_filename,
            size = data.len(),
            "creating layer from GeoJSON upload"
        );

        let stored_key = match self.objects.put(original_filename, data).await {
            Ok(key) => Some(key),
            Err(e) => {
                // Durability of the master copy is secondary to ingestion;
                // the geometry is still committed from the upload bytes.
                warn!(error = %e, "failed to store original upload, continuing");
                None
            }
        };

        let doc = match validate(data) {
            Ok((ty, doc)) => {
                debug!(geojson_type = %ty, "upload validated");
                doc
            }
            Err(e) => {
                self.discard_blob(stored_key.as_deref()).await;
                return Err(e.into());
            }
        };

        let geometry = match extract(&doc) {
            Some(geometry) => geometry,
            None => {
                self.discard_blob(stored_key.as_deref()).await;
                return Err(LayerError::NoGeometryExtracted);
            }
        };

        let layer = self.store.insert(&name, &geometry).await?;

        metrics::counter!("actomaps_layers_created_total").increment(1);
        info!(
            layer_id = layer.id,
            geometry_type = %layer.geometry_type,
            "layer created"
        );
        Ok(layer)
    }

    pub async fn get_all_layers(&self) -> Result<Vec<Layer>, LayerError> {
        self.store.list().await
    }

    pub async fn layers_by_geometry_type(
        &self,
        geometry_type: &str,
    ) -> Result<Vec<Layer>, LayerError> {
        self.store.list_by_geometry_type(geometry_type).await
    }

    pub async fn get_layer(&self, id: i64) -> Result<Layer, LayerError> {
        self.store.find(id).await?.ok_or(LayerError::NotFound(id))
    }

    pub async fn update_layer_name(&self, id: i64, name: &str) -> Result<Layer, LayerError> {
        let name = validated_name(name)?;

        if !self.store.update_name(id, &name).await? {
            return Err(LayerError::NotFound(id));
        }

        info!(layer_id = id, layer_name = %name, "layer renamed");
        self.get_layer(id).await
    }

    /// Delete a layer row. The stored original blob is not tracked by the
    /// data model, so it is left behind.
    pub async fn delete_layer(&self, id: i64) -> Result<(), LayerError> {
        if !self.store.delete(id).await? {
            return Err(LayerError::NotFound(id));
        }

        info!(layer_id = id, "layer deleted");
        Ok(())
    }

    /// All layers as a GeoJSON FeatureCollection, newest first.
    pub async fn feature_collection(&self) -> Result<Value, LayerError> {
        let rows = self.store.all_as_geojson().await?;
        let features: Vec<Value> = rows.into_iter().map(feature_value).collect();

        Ok(json!({
            "type": "FeatureCollection",
            "features": features,
        }))
    }

    /// A single layer as a GeoJSON Feature.
    pub async fn layer_feature(&self, id: i64) -> Result<Value, LayerError> {
        let row = self
            .store
            .find_geojson(id)
            .await?
            .ok_or(LayerError::NotFound(id))?;

        Ok(feature_value(row))
    }

    pub async fn layer_count(&self) -> Result<i64, LayerError> {
        self.store.count().await
    }

    async fn discard_blob(&self, key: Option<&str>) {
        if let Some(key) = key
            && let Err(e) = self.objects.delete(key).await
        {
            warn!(key = %key, error = %e, "failed to remove blob of rejected upload");
        }
    }
}

fn feature_value(row: LayerGeometry) -> Value {
    json!({
        "type": "Feature",
        "id": row.id,
        "properties": {
            "name": row.name,
            "created_at": row.created_at,
            "updated_at": row.updated_at,
        },
        "geometry": row.geometry,
    })
}

fn validated_name(name: &str) -> Result<String, LayerError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LayerError::InvalidName("name must not be empty".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(LayerError::InvalidName(format!(
            "name must not exceed {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}
