//! Data model for editable shapes.

mod lifecycle;
mod shape;

pub use lifecycle::LifecycleStage;
pub use shape::{Properties, Shape, ShapeId};
