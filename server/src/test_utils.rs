//! Test Utilities Module
//!
//! In-memory doubles for the layer store and object store, plus shared
//! fixtures. Only compiled for tests.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::layer::store::LayerStore;
use crate::layer::types::{Layer, LayerError, LayerGeometry};
use crate::storage::{ObjectStore, StorageError};

/// The polygon from the upload happy path: name "Test Area", stored type
/// `POLYGON`.
pub fn polygon_doc() -> Value {
    json!({
        "type": "Polygon",
        "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]
    })
}

struct StoredLayer {
    layer: Layer,
    geometry: Value,
}

/// In-memory [`LayerStore`]. Derives `geometry_type` by uppercasing the
/// GeoJSON `type` tag, which matches what PostGIS `GeometryType()` returns
/// for the six base geometry types.
#[derive(Default)]
pub struct MemoryLayerStore {
    rows: Mutex<Vec<StoredLayer>>,
    next_id: AtomicI64,
}

impl MemoryLayerStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn geometry_of(&self, id: i64) -> Option<Value> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.layer.id == id)
            .map(|row| row.geometry.clone())
    }

    fn snapshot_newest_first(&self) -> Vec<(Layer, Value)> {
        let rows = self.rows.lock().unwrap();
        let mut all: Vec<(Layer, Value)> = rows
            .iter()
            .map(|row| (row.layer.clone(), row.geometry.clone()))
            .collect();
        all.sort_by(|a, b| {
            b.0.created_at
                .cmp(&a.0.created_at)
                .then(b.0.id.cmp(&a.0.id))
        });
        all
    }
}

fn derived_geometry_type(geometry: &Value) -> String {
    geometry
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_ascii_uppercase()
}

#[async_trait]
impl LayerStore for MemoryLayerStore {
    async fn list(&self) -> Result<Vec<Layer>, LayerError> {
        Ok(self
            .snapshot_newest_first()
            .into_iter()
            .map(|(layer, _)| layer)
            .collect())
    }

    async fn list_by_geometry_type(&self, geometry_type: &str) -> Result<Vec<Layer>, LayerError> {
        let wanted = geometry_type.to_ascii_uppercase();
        Ok(self
            .snapshot_newest_first()
            .into_iter()
            .map(|(layer, _)| layer)
            .filter(|layer| layer.geometry_type == wanted)
            .collect())
    }

    async fn find(&self, id: i64) -> Result<Option<Layer>, LayerError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.layer.id == id)
            .map(|row| row.layer.clone()))
    }

    async fn insert(&self, name: &str, geometry: &Value) -> Result<Layer, LayerError> {
        let now = Utc::now();
        let layer = Layer {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            name: name.to_string(),
            geometry_type: derived_geometry_type(geometry),
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(StoredLayer {
            layer: layer.clone(),
            geometry: geometry.clone(),
        });
        Ok(layer)
    }

    async fn update_name(&self, id: i64, name: &str) -> Result<bool, LayerError> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|row| row.layer.id == id) {
            Some(row) => {
                row.layer.name = name.to_string();
                row.layer.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: i64) -> Result<bool, LayerError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|row| row.layer.id != id);
        Ok(rows.len() < before)
    }

    async fn all_as_geojson(&self) -> Result<Vec<LayerGeometry>, LayerError> {
        Ok(self
            .snapshot_newest_first()
            .into_iter()
            .map(|(layer, geometry)| LayerGeometry {
                id: layer.id,
                name: layer.name,
                geometry,
                created_at: layer.created_at,
                updated_at: layer.updated_at,
            })
            .collect())
    }

    async fn find_geojson(&self, id: i64) -> Result<Option<LayerGeometry>, LayerError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.layer.id == id)
            .map(|row| LayerGeometry {
                id: row.layer.id,
                name: row.layer.name.clone(),
                geometry: row.geometry.clone(),
                created_at: row.layer.created_at,
                updated_at: row.layer.updated_at,
            }))
    }

    async fn count(&self) -> Result<i64, LayerError> {
        Ok(self.rows.lock().unwrap().len() as i64)
    }
}

/// In-memory [`ObjectStore`], optionally failing every `put` to exercise
/// the best-effort storage path.
#[derive(Default)]
pub struct MemoryObjectStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    fail_puts: bool,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            blobs: Mutex::new(HashMap::new()),
            fail_puts: true,
        }
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, original_name: &str, data: &[u8]) -> Result<String, StorageError> {
        if self.fail_puts {
            return Err(StorageError::Io(std::io::Error::other(
                "simulated storage outage",
            )));
        }
        let key = format!("{}-{}", self.len(), original_name);
        self.blobs
            .lock()
            .unwrap()
            .insert(key.clone(), data.to_vec());
        Ok(key)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.blobs.lock().unwrap().remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> bool {
        self.blobs.lock().unwrap().contains_key(key)
    }
}
