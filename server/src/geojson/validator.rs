//! Structural validation of uploaded GeoJSON documents

use serde_json::Value;
use tracing::debug;

use super::types::{GeoJsonError, GeoJsonType};

/// Validate the raw content of an uploaded file as a GeoJSON document.
///
/// Checks, in order: JSON well-formedness, presence of a top-level `type`
/// string, membership of that string in the nine recognized GeoJSON type
/// names, and presence of the required nested field for the two composite
/// document types (`geometry` for `Feature`, `features` for
/// `FeatureCollection`). An explicit JSON `null` in those fields counts as
/// absent.
///
/// Coordinates are not inspected at all — range checks, ring closure and
/// winding order are left to the spatial engine at insert time.
///
/// Returns the recognized type together with the parsed document so callers
/// do not parse twice.
pub fn validate(raw: &[u8]) -> Result<(GeoJsonType, Value), GeoJsonError> {
    let doc: Value = serde_json::from_slice(raw)?;

    let name = doc
        .get("type")
        .and_then(Value::as_str)
        .ok_or(GeoJsonError::MissingType)?;

    let ty = GeoJsonType::from_name(name)
        .ok_or_else(|| GeoJsonError::UnrecognizedType(name.to_string()))?;

    match ty {
        GeoJsonType::Feature if field_missing(&doc, "geometry") => {
            return Err(GeoJsonError::FeatureMissingGeometry);
        }
        GeoJsonType::FeatureCollection if field_missing(&doc, "features") => {
            return Err(GeoJsonError::CollectionMissingFeatures);
        }
        _ => {}
    }

    debug!(geojson_type = %ty, "GeoJSON document validated");
    Ok((ty, doc))
}

fn field_missing(doc: &Value, key: &str) -> bool {
    doc.get(key).is_none_or(Value::is_null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validate_value(doc: Value) -> Result<(GeoJsonType, Value), GeoJsonError> {
        validate(doc.to_string().as_bytes())
    }

    #[test]
    fn test_accepts_all_base_geometry_types() {
        let docs = [
            json!({"type": "Point", "coordinates": [1, 2]}),
            json!({"type": "LineString", "coordinates": [[0, 0], [1, 1]]}),
            json!({"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}),
            json!({"type": "MultiPoint", "coordinates": [[1, 2]]}),
            json!({"type": "MultiLineString", "coordinates": [[[0, 0], [1, 1]]]}),
            json!({"type": "MultiPolygon", "coordinates": [[[[0, 0], [1, 0], [1, 1], [0, 0]]]]}),
        ];
        for doc in docs {
            let (ty, _) = validate_value(doc).expect("base geometry should validate");
            assert!(ty.is_geometry());
        }
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = validate(b"{not json").unwrap_err();
        assert!(matches!(err, GeoJsonError::MalformedJson(_)));
    }

    #[test]
    fn test_rejects_missing_type() {
        let err = validate_value(json!({"coordinates": [1, 2]})).unwrap_err();
        assert!(matches!(err, GeoJsonError::MissingType));
    }

    #[test]
    fn test_rejects_non_string_type() {
        let err = validate_value(json!({"type": 42})).unwrap_err();
        assert!(matches!(err, GeoJsonError::MissingType));
    }

    #[test]
    fn test_rejects_unrecognized_type() {
        let err = validate_value(json!({"type": "Circle"})).unwrap_err();
        match err {
            GeoJsonError::UnrecognizedType(name) => assert_eq!(name, "Circle"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_feature_requires_geometry_field() {
        let err =
            validate_value(json!({"type": "Feature", "properties": {}})).unwrap_err();
        assert!(matches!(err, GeoJsonError::FeatureMissingGeometry));
    }

    #[test]
    fn test_feature_with_null_geometry_is_rejected() {
        let err = validate_value(json!({"type": "Feature", "geometry": null})).unwrap_err();
        assert!(matches!(err, GeoJsonError::FeatureMissingGeometry));
    }

    #[test]
    fn test_feature_with_geometry_passes() {
        let doc = json!({
            "type": "Feature",
            "properties": {"name": "somewhere"},
            "geometry": {"type": "Point", "coordinates": [1, 2]}
        });
        let (ty, _) = validate_value(doc).unwrap();
        assert_eq!(ty, GeoJsonType::Feature);
    }

    #[test]
    fn test_collection_requires_features_field() {
        let err = validate_value(json!({"type": "FeatureCollection"})).unwrap_err();
        assert!(matches!(err, GeoJsonError::CollectionMissingFeatures));
    }

    #[test]
    fn test_collection_with_features_passes() {
        let doc = json!({"type": "FeatureCollection", "features": []});
        let (ty, _) = validate_value(doc).unwrap();
        assert_eq!(ty, GeoJsonType::FeatureCollection);
    }

    #[test]
    fn test_geometry_collection_is_recognized() {
        // Recognized by validation even though no geometry can be extracted
        // from it further down the pipeline.
        let doc = json!({"type": "GeometryCollection", "geometries": []});
        let (ty, _) = validate_value(doc).unwrap();
        assert_eq!(ty, GeoJsonType::GeometryCollection);
    }
}
