//! Undo/Redo system for geometry mutations.
//!
//! Each undoable mutation is recorded as a tagged command holding enough
//! state to reverse and re-apply itself against the shape list. Selection
//! and lifecycle bookkeeping is never recorded; single-point draws are
//! exempt by design (a point draw has no intermediate undo steps).

use crate::geometry::ShapeGeometry;
use crate::model::{Shape, ShapeId};

// ============================================================================
// Command Types
// ============================================================================

/// A recorded mutation that can be undone and redone.
#[derive(Debug, Clone)]
pub enum EditCommand {
    /// A shape was added (new drawing pushed into the collection)
    AddShape {
        /// Snapshot of the shape as it was added
        shape: Shape,
    },
    /// Shapes were removed (selection delete)
    RemoveShapes {
        /// The removed shapes with their former list positions
        removed: Vec<(usize, Shape)>,
    },
    /// A shape's geometry changed (drag, vertex add/remove, drawing step)
    ModifyGeometry {
        /// The shape whose geometry changed
        shape_id: ShapeId,
        /// Geometry before the mutation
        old: ShapeGeometry,
        /// Geometry after the mutation
        new: ShapeGeometry,
    },
}

impl EditCommand {
    /// Get a human-readable description of this command.
    pub fn description(&self) -> String {
        match self {
            EditCommand::AddShape { shape } => {
                format!("Add {} shape", shape.final_kind.name())
            }
            EditCommand::RemoveShapes { removed } => {
                format!("Delete {} shape(s)", removed.len())
            }
            EditCommand::ModifyGeometry { shape_id, .. } => {
                format!("Modify geometry of shape {}", shape_id)
            }
        }
    }
}

// ============================================================================
// Undo Stack
// ============================================================================

/// Maximum number of commands kept in history by default.
const DEFAULT_MAX_HISTORY: usize = 100;

/// The undo/redo history stack.
///
/// Maintains two stacks with the most recent command at the end of each.
/// Executing a new command pushes to the undo stack and clears the redo
/// stack; undo moves a command to the redo stack and redo moves it back.
#[derive(Debug, Clone)]
pub struct UndoStack {
    undo_stack: Vec<EditCommand>,
    redo_stack: Vec<EditCommand>,
    max_history: usize,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_history: DEFAULT_MAX_HISTORY,
        }
    }
}

impl UndoStack {
    /// Create a new empty undo stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with a custom history depth.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            max_history,
            ..Default::default()
        }
    }

    /// Record a command. Clears the redo stack (can't redo after a new
    /// action).
    pub fn push(&mut self, command: EditCommand) {
        log::debug!("📝 Undo: pushed '{}'", command.description());
        self.undo_stack.push(command);
        self.redo_stack.clear();

        while self.undo_stack.len() > self.max_history {
            self.undo_stack.remove(0);
        }
    }

    /// Check if undo is available.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Move the newest command to the redo stack and return it.
    pub fn pop_undo(&mut self) -> Option<EditCommand> {
        let cmd = self.undo_stack.pop()?;
        log::debug!("⏪ Undo: '{}'", cmd.description());
        self.redo_stack.push(cmd.clone());
        Some(cmd)
    }

    /// Move the newest undone command back to the undo stack and return it.
    pub fn pop_redo(&mut self) -> Option<EditCommand> {
        let cmd = self.redo_stack.pop()?;
        log::debug!("⏩ Redo: '{}'", cmd.description());
        self.undo_stack.push(cmd.clone());
        Some(cmd)
    }

    /// Clear all history. This is the session commit boundary.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        log::debug!("🗑️ Undo history cleared");
    }

    /// Number of commands available to undo.
    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    /// Number of commands available to redo.
    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }
}

// ============================================================================
// Undo/Redo Execution
// ============================================================================

/// Reverse the effect of a command on the shape list.
pub fn apply_undo(cmd: &EditCommand, shapes: &mut Vec<Shape>) {
    match cmd {
        EditCommand::AddShape { shape } => {
            shapes.retain(|s| s.id != shape.id);
            log::debug!("⏪ Undid add of shape {}", shape.id);
        }
        EditCommand::RemoveShapes { removed } => {
            // Restore in ascending position order so indices stay valid
            for (index, shape) in removed {
                let index = (*index).min(shapes.len());
                shapes.insert(index, shape.clone());
            }
            log::debug!("⏪ Undid delete, restored {} shape(s)", removed.len());
        }
        EditCommand::ModifyGeometry { shape_id, old, .. } => {
            if let Some(shape) = shapes.iter_mut().find(|s| s.id == *shape_id) {
                shape.geometry = old.clone();
                log::debug!("⏪ Undid geometry change on shape {}", shape_id);
            } else {
                log::warn!("Undo target shape {} no longer exists", shape_id);
            }
        }
    }
}

/// Re-apply the effect of a command on the shape list.
pub fn apply_redo(cmd: &EditCommand, shapes: &mut Vec<Shape>) {
    match cmd {
        EditCommand::AddShape { shape } => {
            shapes.push(shape.clone());
            log::debug!("⏩ Redid add of shape {}", shape.id);
        }
        EditCommand::RemoveShapes { removed } => {
            let ids: Vec<ShapeId> = removed.iter().map(|(_, s)| s.id).collect();
            shapes.retain(|s| !ids.contains(&s.id));
            log::debug!("⏩ Redid delete of {} shape(s)", removed.len());
        }
        EditCommand::ModifyGeometry { shape_id, new, .. } => {
            if let Some(shape) = shapes.iter_mut().find(|s| s.id == *shape_id) {
                shape.geometry = new.clone();
                log::debug!("⏩ Redid geometry change on shape {}", shape_id);
            } else {
                log::warn!("Redo target shape {} no longer exists", shape_id);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
