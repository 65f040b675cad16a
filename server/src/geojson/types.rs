//! GeoJSON type names and validation errors

use thiserror::Error;

/// Errors produced while validating an uploaded GeoJSON document
#[derive(Debug, Error)]
pub enum GeoJsonError {
    #[error("file is not valid JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("GeoJSON document has no \"type\" field")]
    MissingType,

    #[error("unrecognized GeoJSON type: {0}")]
    UnrecognizedType(String),

    #[error("Feature document has no \"geometry\" field")]
    FeatureMissingGeometry,

    #[error("FeatureCollection document has no \"features\" field")]
    CollectionMissingFeatures,
}

/// The nine type names recognized by the GeoJSON specification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoJsonType {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    Feature,
    FeatureCollection,
    GeometryCollection,
}

impl GeoJsonType {
    /// Look up a type by its exact (case-sensitive) GeoJSON name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Point" => Some(Self::Point),
            "LineString" => Some(Self::LineString),
            "Polygon" => Some(Self::Polygon),
            "MultiPoint" => Some(Self::MultiPoint),
            "MultiLineString" => Some(Self::MultiLineString),
            "MultiPolygon" => Some(Self::MultiPolygon),
            "Feature" => Some(Self::Feature),
            "FeatureCollection" => Some(Self::FeatureCollection),
            "GeometryCollection" => Some(Self::GeometryCollection),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Point => "Point",
            Self::LineString => "LineString",
            Self::Polygon => "Polygon",
            Self::MultiPoint => "MultiPoint",
            Self::MultiLineString => "MultiLineString",
            Self::MultiPolygon => "MultiPolygon",
            Self::Feature => "Feature",
            Self::FeatureCollection => "FeatureCollection",
            Self::GeometryCollection => "GeometryCollection",
        }
    }

    /// True for the six base geometry types that can be persisted directly.
    /// Feature, FeatureCollection and GeometryCollection are composite
    /// documents and are never stored as-is.
    pub fn is_geometry(&self) -> bool {
        matches!(
            self,
            Self::Point
                | Self::LineString
                | Self::Polygon
                | Self::MultiPoint
                | Self::MultiLineString
                | Self::MultiPolygon
        )
    }
}

impl std::fmt::Display for GeoJsonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_round_trips() {
        for name in [
            "Point",
            "LineString",
            "Polygon",
            "MultiPoint",
            "MultiLineString",
            "MultiPolygon",
            "Feature",
            "FeatureCollection",
            "GeometryCollection",
        ] {
            let ty = GeoJsonType::from_name(name).expect(name);
            assert_eq!(ty.as_str(), name);
        }
    }

    #[test]
    fn test_from_name_is_case_sensitive() {
        assert!(GeoJsonType::from_name("point").is_none());
        assert!(GeoJsonType::from_name("POLYGON").is_none());
        assert!(GeoJsonType::from_name("Circle").is_none());
    }

    #[test]
    fn test_is_geometry() {
        assert!(GeoJsonType::Point.is_geometry());
        assert!(GeoJsonType::MultiPolygon.is_geometry());
        assert!(!GeoJsonType::Feature.is_geometry());
        assert!(!GeoJsonType::FeatureCollection.is_geometry());
        assert!(!GeoJsonType::GeometryCollection.is_geometry());
    }
}
