//! Per-shape vertex algebra.
//!
//! This module provides the geometry types for editable shapes, including:
//! - Point / LineString / Polygon geometry (polygons with holes)
//! - Role-tagged vertex enumeration for drag-handle styling
//! - Vertex insertion, removal, and repositioning
//! - Derived queries (bounding box, annotation center, nearest segment)

use serde::{Deserialize, Serialize};

use crate::error::EditError;
use crate::flat_index::resolve_flat_index;

// ============================================================================
// Core Geometry Types
// ============================================================================

/// A 2D map coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another position.
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Linear interpolation towards `other` (`t` in 0-1).
    pub fn lerp(&self, other: &Position, t: f64) -> Position {
        Position::new(self.x + (other.x - self.x) * t, self.y + (other.y - self.y) * t)
    }
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum X coordinate
    pub min_x: f64,
    /// Minimum Y coordinate
    pub min_y: f64,
    /// Maximum X coordinate
    pub max_x: f64,
    /// Maximum Y coordinate
    pub max_y: f64,
}

impl BoundingBox {
    /// Compute the bounding box of a non-empty set of positions.
    pub fn from_positions<'a>(positions: impl IntoIterator<Item = &'a Position>) -> Option<Self> {
        let mut bbox: Option<BoundingBox> = None;
        for p in positions {
            let b = bbox.get_or_insert(BoundingBox {
                min_x: p.x,
                min_y: p.y,
                max_x: p.x,
                max_y: p.y,
            });
            b.min_x = b.min_x.min(p.x);
            b.min_y = b.min_y.min(p.y);
            b.max_x = b.max_x.max(p.x);
            b.max_y = b.max_y.max(p.y);
        }
        bbox
    }

    /// Get the center of the box.
    pub fn center(&self) -> Position {
        Position::new((self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0)
    }
}

/// The kind of a shape geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
}

impl GeometryKind {
    /// Get the display name for this kind.
    pub fn name(&self) -> &'static str {
        match self {
            GeometryKind::Point => "Point",
            GeometryKind::LineString => "LineString",
            GeometryKind::Polygon => "Polygon",
        }
    }

    /// Minimum number of distinct vertices a complete shape of this kind
    /// may be reduced to.
    pub fn minimum_vertices(&self) -> usize {
        match self {
            GeometryKind::Point => 1,
            GeometryKind::LineString => 2,
            GeometryKind::Polygon => 3,
        }
    }
}

// ============================================================================
// Vertex Roles
// ============================================================================

/// Positional role of a vertex, used by external styling to pick distinct
/// drag-handle visuals. Carries no mutation semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VertexRole {
    /// The sole vertex of a point feature
    PointFeature,
    /// First vertex of a line
    LineStart,
    /// Second vertex of a line (only tagged when the line has > 3 vertices)
    LineSecond,
    /// Interior line vertex
    LineInner,
    /// Second-to-last vertex of a line (only tagged when the line has > 2 vertices)
    LineSecondLast,
    /// Last vertex of a line
    LineLast,
    /// First vertex of a polygon's outer ring
    PolygonStart,
    /// Interior outer-ring vertex
    PolygonInner,
    /// Last listed outer-ring vertex (the one before the closing repeat)
    PolygonSecondLast,
    /// Any vertex of a hole ring
    PolygonHole,
}

/// A vertex position together with its positional role.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaggedVertex {
    pub position: Position,
    pub role: VertexRole,
}

// ============================================================================
// Shape Geometry
// ============================================================================

/// Geometry of one editable shape (in map coordinates).
///
/// Polygon rings carry an explicit closing repeat of their first vertex;
/// ring 0 is the outer ring, any further rings are holes. The closing
/// repeat is never enumerated or addressed by vertex indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeGeometry {
    /// Single point marker.
    Point(Position),
    /// Open polyline defined by ordered vertices.
    LineString(Vec<Position>),
    /// Polygon defined by closed rings.
    Polygon(Vec<Vec<Position>>),
}

/// Number of addressable vertices in one closed ring (closing repeat excluded).
fn ring_vertex_count(ring: &[Position]) -> usize {
    ring.len().saturating_sub(1)
}

/// Rebuild a closed ring from an open vertex list.
fn close_ring(mut open: Vec<Position>) -> Vec<Position> {
    if let Some(first) = open.first().copied() {
        open.push(first);
    }
    open
}

/// Translate an optional signed insertion index into a position in
/// `[0, len]`, clamping out-of-range values to the nearest boundary.
///
/// `None` and `-1` both append; `0` inserts as the new first vertex;
/// `-len-1` (and anything below) clamps to the front.
fn insertion_position(len: usize, index: Option<isize>) -> usize {
    match index {
        None => len,
        Some(i) if i >= 0 => (i as usize).min(len),
        Some(i) => {
            let pos = len as isize + 1 + i;
            pos.max(0) as usize
        }
    }
}

impl ShapeGeometry {
    /// Get the kind of this geometry.
    pub fn kind(&self) -> GeometryKind {
        match self {
            ShapeGeometry::Point(_) => GeometryKind::Point,
            ShapeGeometry::LineString(_) => GeometryKind::LineString,
            ShapeGeometry::Polygon(_) => GeometryKind::Polygon,
        }
    }

    /// Number of addressable vertices (ring closing repeats excluded).
    pub fn vertex_count(&self) -> usize {
        match self {
            ShapeGeometry::Point(_) => 1,
            ShapeGeometry::LineString(points) => points.len(),
            ShapeGeometry::Polygon(rings) => rings.iter().map(|r| ring_vertex_count(r)).sum(),
        }
    }

    /// Enumerate vertices with their positional roles, in flattened order.
    pub fn vertex_roles(&self) -> Vec<TaggedVertex> {
        match self {
            ShapeGeometry::Point(p) => vec![TaggedVertex {
                position: *p,
                role: VertexRole::PointFeature,
            }],
            ShapeGeometry::LineString(points) => {
                let n = points.len();
                points
                    .iter()
                    .enumerate()
                    .map(|(i, p)| {
                        let role = if i == 0 {
                            VertexRole::LineStart
                        } else if i == n - 1 {
                            VertexRole::LineLast
                        } else if i == 1 && n > 3 {
                            VertexRole::LineSecond
                        } else if i == n - 2 && n > 2 {
                            VertexRole::LineSecondLast
                        } else {
                            VertexRole::LineInner
                        };
                        TaggedVertex { position: *p, role }
                    })
                    .collect()
            }
            ShapeGeometry::Polygon(rings) => {
                let mut tagged = Vec::with_capacity(self.vertex_count());
                for (ring_index, ring) in rings.iter().enumerate() {
                    let m = ring_vertex_count(ring);
                    for (i, p) in ring[..m].iter().enumerate() {
                        let role = if ring_index > 0 {
                            VertexRole::PolygonHole
                        } else if i == 0 {
                            VertexRole::PolygonStart
                        } else if i == m - 1 {
                            VertexRole::PolygonSecondLast
                        } else {
                            VertexRole::PolygonInner
                        };
                        tagged.push(TaggedVertex { position: *p, role });
                    }
                }
                tagged
            }
        }
    }

    /// Replace the vertex at flattened `index` (ring-aware for polygons).
    ///
    /// Repositioning a ring's first vertex also rewrites its closing repeat.
    pub fn reposition_vertex(&mut self, position: Position, index: usize) -> Result<(), EditError> {
        let count = self.vertex_count();
        match self {
            ShapeGeometry::Point(p) => {
                if index != 0 {
                    return Err(EditError::VertexIndexOutOfRange { index, count });
                }
                *p = position;
                Ok(())
            }
            ShapeGeometry::LineString(points) => {
                let slot = points
                    .get_mut(index)
                    .ok_or(EditError::VertexIndexOutOfRange { index, count })?;
                *slot = position;
                Ok(())
            }
            ShapeGeometry::Polygon(rings) => {
                let resolved =
                    resolve_flat_index(index, |i| rings.get(i).map(|r| ring_vertex_count(r)))
                        .map_err(|_| EditError::VertexIndexOutOfRange { index, count })?;
                let ring = &mut rings[resolved.outer];
                ring[resolved.inner] = position;
                if resolved.inner == 0 {
                    let last = ring.len() - 1;
                    ring[last] = position;
                }
                Ok(())
            }
        }
    }

    /// Insert `vertex` into the ordered vertex list.
    ///
    /// `index` uses Python-style negative indexing (`None`/`-1` appends,
    /// `0` inserts as the new first vertex); out-of-range values clamp to
    /// the nearest boundary. Polygon insertion addresses the outer ring and
    /// preserves ring closure. Fails on Point geometry, which has no
    /// insertable vertex list (drawing promotes a Point instead).
    pub fn add_vertex(&mut self, vertex: Position, index: Option<isize>) -> Result<(), EditError> {
        match self {
            ShapeGeometry::Point(_) => Err(EditError::UnsupportedGeometry {
                operation: "add_vertex",
                kind: GeometryKind::Point,
            }),
            ShapeGeometry::LineString(points) => {
                let pos = insertion_position(points.len(), index);
                points.insert(pos, vertex);
                Ok(())
            }
            ShapeGeometry::Polygon(rings) => {
                let outer = rings.first_mut().ok_or(EditError::UnsupportedGeometry {
                    operation: "add_vertex",
                    kind: GeometryKind::Polygon,
                })?;
                let mut open: Vec<Position> = outer[..ring_vertex_count(outer)].to_vec();
                let pos = insertion_position(open.len(), index);
                open.insert(pos, vertex);
                *outer = close_ring(open);
                Ok(())
            }
        }
    }

    /// Remove the vertex at `index` from the outer vertex list.
    ///
    /// Fails when removal would reduce the shape below the minimum vertex
    /// count for `final_kind`.
    pub fn remove_vertex(
        &mut self,
        index: usize,
        final_kind: GeometryKind,
    ) -> Result<Position, EditError> {
        let count = self.vertex_count();
        let minimum = final_kind.minimum_vertices();
        match self {
            ShapeGeometry::Point(_) => Err(EditError::BelowMinimumVertices {
                kind: GeometryKind::Point,
                minimum,
            }),
            ShapeGeometry::LineString(points) => {
                if index >= points.len() {
                    return Err(EditError::VertexIndexOutOfRange { index, count });
                }
                if points.len() <= minimum {
                    return Err(EditError::BelowMinimumVertices {
                        kind: GeometryKind::LineString,
                        minimum,
                    });
                }
                Ok(points.remove(index))
            }
            ShapeGeometry::Polygon(rings) => {
                let outer = rings.first_mut().ok_or(EditError::UnsupportedGeometry {
                    operation: "remove_vertex",
                    kind: GeometryKind::Polygon,
                })?;
                let mut open: Vec<Position> = outer[..ring_vertex_count(outer)].to_vec();
                if index >= open.len() {
                    return Err(EditError::VertexIndexOutOfRange { index, count });
                }
                if open.len() <= minimum {
                    return Err(EditError::BelowMinimumVertices {
                        kind: GeometryKind::Polygon,
                        minimum,
                    });
                }
                let removed = open.remove(index);
                *outer = close_ring(open);
                Ok(removed)
            }
        }
    }

    // ========================================================================
    // Derived Queries
    // ========================================================================

    /// Get the bounding box, or `None` for the degenerate point case.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        match self {
            ShapeGeometry::Point(_) => None,
            ShapeGeometry::LineString(points) => BoundingBox::from_positions(points),
            ShapeGeometry::Polygon(rings) => {
                BoundingBox::from_positions(rings.first().map(|r| r.as_slice()).unwrap_or(&[]))
            }
        }
    }

    /// Position where an annotation label should be anchored: the point
    /// itself, the midpoint-by-length of a line, or the centroid of a
    /// polygon's outer ring.
    pub fn annotation_center(&self) -> Position {
        match self {
            ShapeGeometry::Point(p) => *p,
            ShapeGeometry::LineString(points) => line_midpoint(points),
            ShapeGeometry::Polygon(rings) => {
                polygon_centroid(rings.first().map(|r| r.as_slice()).unwrap_or(&[]))
            }
        }
    }

    /// Find the segment of this geometry closest to `position` and return
    /// the vertex-list index at which a new vertex should be inserted to
    /// split it. `None` for points and degenerate vertex lists.
    pub fn nearest_segment(&self, position: Position) -> Option<isize> {
        let segments: &[Position] = match self {
            ShapeGeometry::Point(_) => return None,
            ShapeGeometry::LineString(points) => points,
            // Outer ring with the closing repeat, so the wrap-around
            // segment participates in the search.
            ShapeGeometry::Polygon(rings) => rings.first()?,
        };
        if segments.len() < 2 {
            return None;
        }
        let mut best: Option<(usize, f64)> = None;
        for i in 0..segments.len() - 1 {
            let d = point_to_segment_distance(position, segments[i], segments[i + 1]);
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((i, d));
            }
        }
        best.map(|(i, _)| (i + 1) as isize)
    }
}

/// Midpoint of a polyline measured along its length.
fn line_midpoint(points: &[Position]) -> Position {
    match points {
        [] => Position::new(0.0, 0.0),
        [only] => *only,
        _ => {
            let total: f64 = points.windows(2).map(|w| w[0].distance_to(&w[1])).sum();
            if total == 0.0 {
                return points[0];
            }
            let mut remaining = total / 2.0;
            for w in points.windows(2) {
                let seg = w[0].distance_to(&w[1]);
                if seg >= remaining {
                    return w[0].lerp(&w[1], remaining / seg);
                }
                remaining -= seg;
            }
            points[points.len() - 1]
        }
    }
}

/// Area-weighted centroid of a closed ring, falling back to the vertex
/// average for zero-area rings.
fn polygon_centroid(ring: &[Position]) -> Position {
    let m = ring.len().saturating_sub(1);
    if m == 0 {
        return ring.first().copied().unwrap_or(Position::new(0.0, 0.0));
    }
    let mut area = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for w in ring.windows(2) {
        let cross = w[0].x * w[1].y - w[1].x * w[0].y;
        area += cross;
        cx += (w[0].x + w[1].x) * cross;
        cy += (w[0].y + w[1].y) * cross;
    }
    if area.abs() < f64::EPSILON {
        let sum = ring[..m]
            .iter()
            .fold((0.0, 0.0), |acc, p| (acc.0 + p.x, acc.1 + p.y));
        return Position::new(sum.0 / m as f64, sum.1 / m as f64);
    }
    Position::new(cx / (3.0 * area), cy / (3.0 * area))
}

/// Distance from a point to a line segment.
fn point_to_segment_distance(p: Position, a: Position, b: Position) -> f64 {
    let len_sq = (b.x - a.x).powi(2) + (b.y - a.y).powi(2);
    if len_sq == 0.0 {
        return p.distance_to(&a);
    }
    let t = (((p.x - a.x) * (b.x - a.x) + (p.y - a.y) * (b.y - a.y)) / len_sq).clamp(0.0, 1.0);
    p.distance_to(&a.lerp(&b, t))
}

// ============================================================================
// Tests
// ============================================================================
