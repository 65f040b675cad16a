//! GeoJSON structural validation and geometry extraction
//!
//! Uploaded documents are handled as `serde_json::Value` throughout: the
//! checks here are structural only, and geometry semantics (coordinates,
//! rings, SRIDs) are owned by PostGIS at insert time.

pub mod extractor;
pub mod types;
pub mod validator;

pub use extractor::extract;
pub use types::{GeoJsonError, GeoJsonType};
pub use validator::validate;
