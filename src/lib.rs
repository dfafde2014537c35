//! Mapsketch - interactive vector-geometry editing core.
//!
//! A headless state machine for drawing, selecting, reshaping, and
//! annotating points, lines, and polygons on a map, with session-scoped
//! undo/redo. Rendering, hit-testing, and form widgets live in external
//! collaborators that consume the derived views exposed here.

pub mod collection;
pub mod controller;
pub mod error;
pub mod flat_index;
pub mod format;
pub mod geometry;
pub mod model;
pub mod undo;

pub use collection::{DragHandle, ShapeCollection};
pub use controller::{EditingController, InteractionMode};
pub use error::EditError;
pub use flat_index::{FlatIndex, resolve_flat_index};
pub use geometry::{BoundingBox, GeometryKind, Position, ShapeGeometry, TaggedVertex, VertexRole};
pub use model::{LifecycleStage, Properties, Shape, ShapeId};
pub use undo::{EditCommand, UndoStack};
