//! Common Test Utilities for Integration Tests
//!
//! Shared helpers used across integration test modules: in-memory store
//! doubles, router builders and request/body helpers.

use actomaps_server::config::UploadConfig;
use actomaps_server::layer::{
    Layer, LayerAppState, LayerError, LayerGeometry, LayerService, LayerStore, admin_routes,
    layer_routes,
};
use actomaps_server::ratelimit::{RateLimiter, rate_limit};
use actomaps_server::storage::{ObjectStore, StorageError};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::{Router, middleware};
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tower::util::ServiceExt;

/// In-memory layer store double. `geometry_type` is derived by uppercasing
/// the GeoJSON `type` tag, matching what PostGIS `GeometryType()` returns
/// for the six base geometry types.
#[derive(Default)]
pub struct MemoryLayerStore {
    rows: Mutex<Vec<(Layer, Value)>>,
    next_id: AtomicI64,
}

impl MemoryLayerStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn newest_first(&self) -> Vec<(Layer, Value)> {
        let mut all = self.rows.lock().unwrap().clone();
        all.sort_by(|a, b| {
            b.0.created_at
                .cmp(&a.0.created_at)
                .then(b.0.id.cmp(&a.0.id))
        });
        all
    }
}

#[async_trait]
impl LayerStore for MemoryLayerStore {
    async fn list(&self) -> Result<Vec<Layer>, LayerError> {
        Ok(self.newest_first().into_iter().map(|(l, _)| l).collect())
    }

    async fn list_by_geometry_type(&self, geometry_type: &str) -> Result<Vec<Layer>, LayerError> {
        let wanted = geometry_type.to_ascii_uppercase();
        Ok(self
            .newest_first()
            .into_iter()
            .map(|(l, _)| l)
            .filter(|l| l.geometry_type == wanted)
            .collect())
    }

    async fn find(&self, id: i64) -> Result<Option<Layer>, LayerError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|(l, _)| l.id == id)
            .map(|(l, _)| l.clone()))
    }

    async fn insert(&self, name: &str, geometry: &Value) -> Result<Layer, LayerError> {
        let now = Utc::now();
        let geometry_type = geometry
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_ascii_uppercase();
        let layer = Layer {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            name: name.to_string(),
            geometry_type,
            created_at: now,
            updated_at: now,
        };
        self.rows
            .lock()
            .unwrap()
            .push((layer.clone(), geometry.clone()));
        Ok(layer)
    }

    async fn update_name(&self, id: i64, name: &str) -> Result<bool, LayerError> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|(l, _)| l.id == id) {
            Some((layer, _)) => {
                layer.name = name.to_string();
                layer.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: i64) -> Result<bool, LayerError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|(l, _)| l.id != id);
        Ok(rows.len() < before)
    }

    async fn all_as_geojson(&self) -> Result<Vec<LayerGeometry>, LayerError> {
        Ok(self
            .newest_first()
            .into_iter()
            .map(|(l, geometry)| LayerGeometry {
                id: l.id,
                name: l.name,
                geometry,
                created_at: l.created_at,
                updated_at: l.updated_at,
            })
            .collect())
    }

    async fn find_geojson(&self, id: i64) -> Result<Option<LayerGeometry>, LayerError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|(l, _)| l.id == id)
            .map(|(l, geometry)| LayerGeometry {
                id: l.id,
                name: l.name.clone(),
                geometry: geometry.clone(),
                created_at: l.created_at,
                updated_at: l.updated_at,
            }))
    }

    async fn count(&self) -> Result<i64, LayerError> {
        Ok(self.rows.lock().unwrap().len() as i64)
    }
}

/// In-memory object store double
#[derive(Default)]
pub struct MemoryObjectStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, original_name: &str, data: &[u8]) -> Result<String, StorageError> {
        let mut blobs = self.blobs.lock().unwrap();
        let key = format!("{}-{}", blobs.len(), original_name);
        blobs.insert(key.clone(), data.to_vec());
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

fn test_state() -> LayerAppState {
    let store = Arc::new(MemoryLayerStore::new());
    let objects = Arc::new(MemoryObjectStore::default());
    LayerAppState {
        service: Arc::new(LayerService::new(store, objects)),
        upload: UploadConfig::default(),
    }
}

/// Create a test application router with the public and admin APIs mounted
pub fn create_test_app() -> Router {
    let state = test_state();
    Router::new()
        .nest("/api", layer_routes(state.clone()))
        .nest("/api/admin", admin_routes(state))
}

/// Create a test application with the public API behind a rate limiter
pub fn create_rate_limited_app(max_requests: u32) -> Router {
    let state = test_state();
    let limiter = Arc::new(RateLimiter::new(max_requests, Duration::from_secs(60)));
    let public = layer_routes(state).layer(middleware::from_fn_with_state(limiter, rate_limit));
    Router::new().nest("/api", public)
}

/// Send a request through the router
pub async fn send(app: &Router, request: Request<Body>) -> axum::response::Response {
    app.clone().oneshot(request).await.expect("request failed")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn patch_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("PATCH")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

const BOUNDARY: &str = "actomaps-test-boundary";

/// Build a multipart layer-upload request with a `name` field and a
/// `geojson_file` part.
pub fn multipart_upload(name: &str, filename: &str, content: &str) -> Request<Body> {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"name\"\r\n\r\n\
         {name}\r\n\
         --{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"geojson_file\"; filename=\"{filename}\"\r\n\
         Content-Type: application/geo+json\r\n\r\n\
         {content}\r\n\
         --{BOUNDARY}--\r\n"
    );

    Request::builder()
        .method("POST")
        .uri("/api/admin/layers")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Read a response body as JSON
pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    serde_json::from_slice(&bytes).expect("body is not JSON")
}
