//! Per-shape lifecycle stages.
//!
//! Every shape carries exactly one lifecycle stage. Stages govern which
//! operations are legal on the shape and which render partition it falls
//! into. Stage changes are invoked only by the collection and controller,
//! never spontaneously, and are deliberately kept out of the undo history:
//! selection bookkeeping is UI state, not user-visible geometry history.

use serde::{Deserialize, Serialize};

/// Lifecycle stage of one shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LifecycleStage {
    /// Being drawn for the first time, not yet committed
    NewShape,
    /// Pre-seeded draft awaiting a committed geometry kind
    DraftShape,
    /// Vertices currently interactive (drag/add/remove)
    EditShape,
    /// Metadata form open for this shape
    EditMetadata,
    /// Part of a multi-selection
    SelectMultiple,
    /// The single focused selection
    SelectSingle,
    /// Committed and idle
    #[default]
    View,
}

impl LifecycleStage {
    /// Get the display name for this stage.
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleStage::NewShape => "NewShape",
            LifecycleStage::DraftShape => "DraftShape",
            LifecycleStage::EditShape => "EditShape",
            LifecycleStage::EditMetadata => "EditMetadata",
            LifecycleStage::SelectMultiple => "SelectMultiple",
            LifecycleStage::SelectSingle => "SelectSingle",
            LifecycleStage::View => "View",
        }
    }

    /// Whether shapes in this stage render through the hot partition
    /// (always on top, individually stylable).
    pub fn is_hot(&self) -> bool {
        matches!(
            self,
            LifecycleStage::NewShape | LifecycleStage::DraftShape | LifecycleStage::EditShape
        )
    }

    /// Whether this stage marks the shape as selected.
    pub fn is_selected(&self) -> bool {
        matches!(
            self,
            LifecycleStage::SelectSingle | LifecycleStage::SelectMultiple
        )
    }

    /// Whether vertex mutations are legal in this stage.
    pub fn is_geometry_editable(&self) -> bool {
        matches!(self, LifecycleStage::NewShape | LifecycleStage::EditShape)
    }
}
