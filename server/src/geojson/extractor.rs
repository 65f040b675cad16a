//! Geometry extraction from parsed GeoJSON documents

use serde_json::Value;

use super::types::GeoJsonType;

/// Extract the single geometry object to persist from a parsed GeoJSON
/// document.
///
/// - The six base geometry types are returned unchanged (the document
///   already is a geometry object).
/// - `Feature` yields its `geometry` value; a missing or `null` geometry
///   yields `None`. The validator rejects such documents earlier in the
///   upload pipeline, but this function does not rely on that.
/// - `FeatureCollection` yields the geometry of `features[0]` ONLY; every
///   other feature in the collection is discarded, and an empty collection
///   yields `None`.
/// - `GeometryCollection` and anything else yields `None`.
///
/// Pure function, no side effects.
pub fn extract(doc: &Value) -> Option<Value> {
    let name = doc.get("type")?.as_str()?;
    let ty = GeoJsonType::from_name(name)?;

    match ty {
        ty if ty.is_geometry() => Some(doc.clone()),
        GeoJsonType::Feature => non_null(doc.get("geometry")),
        GeoJsonType::FeatureCollection => {
            let first = doc.get("features")?.as_array()?.first()?;
            non_null(first.get("geometry"))
        }
        _ => None,
    }
}

fn non_null(value: Option<&Value>) -> Option<Value> {
    value.filter(|v| !v.is_null()).cloned()
}
