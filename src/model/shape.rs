//! The editable shape: geometry plus lifecycle stage and metadata.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::geometry::{GeometryKind, Position, ShapeGeometry};
use crate::model::LifecycleStage;

/// Unique identifier for a shape, stable for the shape's lifetime.
pub type ShapeId = u64;

/// Open key/value metadata attached to a shape, independent of the
/// editing state machine.
pub type Properties = HashMap<String, serde_json::Value>;

/// One editable geometry object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    /// Unique identifier, assigned at creation and never reused.
    pub id: ShapeId,
    /// Current lifecycle stage.
    pub stage: LifecycleStage,
    /// Current geometry. Progresses monotonically Point -> LineString ->
    /// Polygon while drawing towards `final_kind`, never regressing.
    pub geometry: ShapeGeometry,
    /// The geometry kind this shape settles into when drawing completes.
    pub final_kind: GeometryKind,
    /// Domain metadata.
    #[serde(default)]
    pub properties: Properties,
}

impl Shape {
    /// Create a shape being drawn from its first tapped position.
    pub fn new_drawing(id: ShapeId, position: Position, final_kind: GeometryKind) -> Self {
        Self {
            id,
            stage: LifecycleStage::NewShape,
            geometry: ShapeGeometry::Point(position),
            final_kind,
            properties: Properties::new(),
        }
    }

    /// Create a committed shape from an imported geometry.
    pub fn from_geometry(id: ShapeId, geometry: ShapeGeometry, properties: Properties) -> Self {
        let final_kind = geometry.kind();
        Self {
            id,
            stage: LifecycleStage::View,
            geometry,
            final_kind,
            properties,
        }
    }

    /// A shape is complete when its geometry has reached its final kind.
    pub fn is_complete(&self) -> bool {
        self.geometry.kind() == self.final_kind
    }

    /// Number of vertices this shape contributes to the flattened
    /// draggable-handle list.
    pub fn draggable_count(&self) -> usize {
        if self.stage == LifecycleStage::EditShape {
            self.geometry.vertex_count()
        } else {
            0
        }
    }

    /// Extend an in-progress drawing with the next tapped position,
    /// promoting the geometry kind towards `final_kind` as vertices
    /// accumulate.
    ///
    /// A Point being extended becomes a two-vertex LineString; a
    /// LineString destined to be a Polygon closes into a ring once it has
    /// three vertices; afterwards new vertices append before the closing
    /// repeat. A shape already at a Point `final_kind` just moves.
    pub fn extend_drawing(&mut self, position: Position) {
        match (&mut self.geometry, self.final_kind) {
            (ShapeGeometry::Point(p), GeometryKind::Point) => {
                *p = position;
            }
            (ShapeGeometry::Point(p), _) => {
                let first = *p;
                self.geometry = ShapeGeometry::LineString(vec![first, position]);
            }
            (ShapeGeometry::LineString(points), GeometryKind::Polygon)
                if points.len() + 1 >= GeometryKind::Polygon.minimum_vertices() =>
            {
                let mut ring = points.clone();
                ring.push(position);
                ring.push(ring[0]);
                self.geometry = ShapeGeometry::Polygon(vec![ring]);
            }
            (ShapeGeometry::LineString(points), _) => {
                points.push(position);
            }
            (ShapeGeometry::Polygon(_), _) => {
                // Cannot fail: append on a non-point geometry
                let _ = self.geometry.add_vertex(position, None);
            }
        }
    }
}
