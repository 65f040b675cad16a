//! HTTP route handlers for the layer API

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, warn};

use crate::config::UploadConfig;
use crate::response::{ApiResponse, ErrorResponse};

use super::service::LayerService;
use super::types::{Layer, LayerError, UpdateLayerRequest};

/// Application state shared by the layer routes
#[derive(Clone)]
pub struct LayerAppState {
    pub service: Arc<LayerService>,
    pub upload: UploadConfig,
}

/// Query parameters for the layer listing
#[derive(Debug, Deserialize)]
pub struct ListLayersParams {
    /// Optional `GeometryType` filter, e.g. `polygon` or `POLYGON`.
    pub geometry_type: Option<String>,
}

/// GET /api/layers - List all layers
pub async fn list_layers(
    State(state): State<LayerAppState>,
    Query(params): Query<ListLayersParams>,
) -> Result<Json<ApiResponse<Vec<Layer>>>, ErrorResponse> {
    let layers = match params.geometry_type.as_deref() {
        Some(geometry_type) => state.service.layers_by_geometry_type(geometry_type).await,
        None => state.service.get_all_layers().await,
    }
    .map_err(|e| {
        error!("Failed to list layers: {}", e);
        ErrorResponse::from(e)
    })?;

    Ok(ApiResponse::ok(layers, "Layers retrieved successfully"))
}

/// GET /api/layers/:id - Get a single layer
pub async fn get_layer(
    State(state): State<LayerAppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Layer>>, ErrorResponse> {
    let layer = state.service.get_layer(id).await.map_err(|e| {
        warn!("Failed to get layer {}: {}", id, e);
        ErrorResponse::from(e)
    })?;

    Ok(ApiResponse::ok(layer, "Layer retrieved successfully"))
}

/// GET /api/layers/geojson/all - All layers as a raw GeoJSON FeatureCollection
pub async fn all_layers_geojson(
    State(state): State<LayerAppState>,
) -> Result<Json<Value>, ErrorResponse> {
    let collection = state.service.feature_collection().await.map_err(|e| {
        error!("Failed to build FeatureCollection: {}", e);
        ErrorResponse::from(e)
    })?;

    Ok(Json(collection))
}

/// GET /api/layers/:id/geojson - A single layer as a raw GeoJSON Feature
pub async fn layer_geojson(
    State(state): State<LayerAppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ErrorResponse> {
    let feature = state.service.layer_feature(id).await.map_err(|e| {
        warn!("Failed to build Feature for layer {}: {}", id, e);
        ErrorResponse::from(e)
    })?;

    Ok(Json(feature))
}

/// POST /api/admin/layers - Create a layer from a multipart GeoJSON upload
///
/// Expects a `name` text field and a `geojson_file` file part with a
/// `.json` or `.geojson` extension, at most the configured maximum size.
pub async fn create_layer(
    State(state): State<LayerAppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<Layer>>), ErrorResponse> {
    let mut name: Option<String> = None;
    let mut file: Option<(String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ErrorResponse::unprocessable(format!("invalid multipart payload: {e}")))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "name" => {
                let value = field.text().await.map_err(|e| {
                    ErrorResponse::unprocessable(format!("invalid name field: {e}"))
                })?;
                name = Some(value);
            }
            "geojson_file" => {
                let filename = field
                    .file_name()
                    .unwrap_or("upload.geojson")
                    .to_string();
                let data = field.bytes().await.map_err(|e| {
                    ErrorResponse::unprocessable(format!("invalid file field: {e}"))
                })?;
                file = Some((filename, data));
            }
            _ => {}
        }
    }

    let name =
        name.ok_or_else(|| ErrorResponse::unprocessable("missing \"name\" field"))?;
    let (filename, data) =
        file.ok_or_else(|| ErrorResponse::unprocessable("missing \"geojson_file\" field"))?;

    check_upload_constraints(&filename, data.len(), &state.upload)?;

    let layer = state
        .service
        .create_layer(&name, &filename, &data)
        .await
        .map_err(|e| {
            warn!("Failed to create layer {:?}: {}", name, e);
            ErrorResponse::from(e)
        })?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(layer, "Layer created successfully"),
    ))
}

/// PATCH /api/admin/layers/:id - Rename a layer
pub async fn update_layer(
    State(state): State<LayerAppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateLayerRequest>,
) -> Result<Json<ApiResponse<Layer>>, ErrorResponse> {
    let layer = state
        .service
        .update_layer_name(id, &body.name)
        .await
        .map_err(|e| {
            warn!("Failed to update layer {}: {}", id, e);
            ErrorResponse::from(e)
        })?;

    Ok(ApiResponse::ok(layer, "Layer updated successfully"))
}

/// DELETE /api/admin/layers/:id - Delete a layer
pub async fn delete_layer(
    State(state): State<LayerAppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Value>>, ErrorResponse> {
    state.service.delete_layer(id).await.map_err(|e| {
        warn!("Failed to delete layer {}: {}", id, e);
        ErrorResponse::from(e)
    })?;

    Ok(ApiResponse::message_only("Layer deleted successfully"))
}

fn check_upload_constraints(
    filename: &str,
    size: usize,
    upload: &UploadConfig,
) -> Result<(), ErrorResponse> {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if !upload
        .allowed_extensions
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(&ext))
    {
        return Err(ErrorResponse::from(LayerError::UnsupportedExtension(ext)));
    }

    if size > upload.max_size_bytes {
        return Err(ErrorResponse::from(LayerError::PayloadTooLarge {
            max: upload.max_size_bytes,
        }));
    }

    Ok(())
}

/// Build the public read-only layer routes
pub fn layer_routes(state: LayerAppState) -> Router {
    Router::new()
        .route("/layers", get(list_layers))
        .route("/layers/geojson/all", get(all_layers_geojson))
        .route("/layers/:id", get(get_layer))
        .route("/layers/:id/geojson", get(layer_geojson))
        .with_state(state)
}

/// Build the admin layer routes (create / rename / delete)
pub fn admin_routes(state: LayerAppState) -> Router {
    // Body limit covers the configured file size plus multipart framing.
    let body_limit = state.upload.max_size_bytes + 64 * 1024;

    Router::new()
        .route("/layers", post(create_layer))
        .route("/layers/:id", patch(update_layer).delete(delete_layer))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
