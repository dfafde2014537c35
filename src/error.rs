//! Error types for low-level geometry and index operations.
//!
//! Only the pure bottom layers (flat-index resolution, direct vertex
//! access) surface errors; higher layers log and degrade to no-ops.

use thiserror::Error;

use crate::geometry::GeometryKind;

/// Errors raised by flat-index resolution and vertex-level geometry access.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    /// Flat index not covered by any sub-collection
    #[error("flat index {index} out of range (total {total})")]
    FlatIndexOutOfRange {
        /// The flat index that was requested
        index: usize,
        /// Total number of addressable elements
        total: usize,
    },

    /// Vertex index outside the shape's vertex list
    #[error("vertex index {index} out of range (vertex count {count})")]
    VertexIndexOutOfRange {
        /// The vertex index that was requested
        index: usize,
        /// Number of addressable vertices
        count: usize,
    },

    /// Operation not defined for the shape's current geometry kind
    #[error("operation '{operation}' is not supported on {kind:?} geometry")]
    UnsupportedGeometry {
        /// Name of the attempted operation
        operation: &'static str,
        /// The geometry kind it was attempted on
        kind: GeometryKind,
    },

    /// Removal would drop the shape below its minimum vertex count
    #[error("cannot remove vertex: {kind:?} requires at least {minimum} vertices")]
    BelowMinimumVertices {
        /// The geometry kind being reduced
        kind: GeometryKind,
        /// Minimum vertex count for that kind
        minimum: usize,
    },
}
