//! Geometry interchange for the shape list.
//!
//! Import/export runs only between editing sessions: the external glue
//! hands a validated document in, the collection is repopulated, and the
//! current shapes can be serialized back out to the same representation.

mod error;
mod geojson;

pub use error::FormatError;
pub use geojson::{shapes_from_geojson, shapes_to_geojson};
