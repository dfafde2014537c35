//! Error types for geometry interchange operations.

use thiserror::Error;

/// Errors that can occur while importing or exporting geometry documents.
#[derive(Error, Debug)]
pub enum FormatError {
    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Document is structurally valid JSON but not a usable document
    #[error("Invalid document: {message}")]
    InvalidDocument {
        /// Description of the problem
        message: String,
    },

    /// Geometry type not supported by the editor
    #[error("Unsupported geometry type '{geometry_type}'")]
    UnsupportedGeometry {
        /// The geometry type that was encountered
        geometry_type: String,
    },

    /// Coordinate payload does not match its geometry type
    #[error("Invalid coordinates: {message}")]
    InvalidCoordinates {
        /// Description of the problem
        message: String,
    },
}
