//! The shape collection: aggregation, derived render views, selection
//! transitions, and the session-scoped undo/redo history.
//!
//! All derived views (`draggable_positions`, hot/cold partitions, counts)
//! are pure recomputations over the authoritative shape list, so they can
//! never drift from it. Invalid calls reachable through ordinary UI races
//! (stale taps, double presses) log a warning and degrade to no-ops;
//! only the pure vertex layer below surfaces hard errors.

use crate::flat_index::resolve_flat_index;
use crate::geometry::{GeometryKind, Position, ShapeGeometry, VertexRole};
use crate::model::{LifecycleStage, Properties, Shape, ShapeId};
use crate::undo::{EditCommand, UndoStack, apply_redo, apply_undo};

/// One entry of the flattened draggable-handle view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragHandle {
    /// The shape owning this vertex.
    pub shape_id: ShapeId,
    /// Vertex position.
    pub position: Position,
    /// Positional role, for handle styling.
    pub role: VertexRole,
}

/// An ordered collection of editable shapes plus its undo history.
#[derive(Debug, Default)]
pub struct ShapeCollection {
    shapes: Vec<Shape>,
    history: UndoStack,
    next_id: ShapeId,
}

impl ShapeCollection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Import / Export
    // ========================================================================

    /// Replace the whole shape list with externally validated geometry,
    /// e.g. from a file import. Fresh ids are assigned; the undo history
    /// is cleared. Only call between editing sessions.
    pub fn replace_shapes(&mut self, items: Vec<(ShapeGeometry, Properties)>) {
        self.shapes = items
            .into_iter()
            .map(|(geometry, properties)| {
                let id = self.next_id;
                self.next_id += 1;
                Shape::from_geometry(id, geometry, properties)
            })
            .collect();
        self.history.clear();
        log::debug!("📥 Imported {} shape(s)", self.shapes.len());
    }

    /// All shapes, in collection order.
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Look up a shape by id.
    pub fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id == id)
    }

    /// Number of shapes in the collection.
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Check if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    // ========================================================================
    // Derived Views
    // ========================================================================

    /// Flattened draggable-vertex view over every shape currently in
    /// vertex-editing stage, in collection order.
    pub fn draggable_positions(&self) -> Vec<DragHandle> {
        self.shapes
            .iter()
            .filter(|s| s.draggable_count() > 0)
            .flat_map(|s| {
                s.geometry.vertex_roles().into_iter().map(|v| DragHandle {
                    shape_id: s.id,
                    position: v.position,
                    role: v.role,
                })
            })
            .collect()
    }

    /// Shapes under active geometry manipulation (rendered on top,
    /// individually stylable).
    pub fn hot_features(&self) -> Vec<&Shape> {
        self.shapes.iter().filter(|s| s.stage.is_hot()).collect()
    }

    /// Settled shapes (clustered, bulk-styled rendering).
    pub fn cold_features(&self) -> Vec<&Shape> {
        self.shapes.iter().filter(|s| !s.stage.is_hot()).collect()
    }

    /// Hot shapes whose current geometry is a point.
    pub fn hot_points(&self) -> Vec<&Shape> {
        self.hot_features()
            .into_iter()
            .filter(|s| s.geometry.kind() == GeometryKind::Point)
            .collect()
    }

    /// Hot shapes whose current geometry is a line or polygon.
    pub fn hot_paths(&self) -> Vec<&Shape> {
        self.hot_features()
            .into_iter()
            .filter(|s| s.geometry.kind() != GeometryKind::Point)
            .collect()
    }

    /// Cold shapes whose geometry is a point.
    pub fn cold_points(&self) -> Vec<&Shape> {
        self.cold_features()
            .into_iter()
            .filter(|s| s.geometry.kind() == GeometryKind::Point)
            .collect()
    }

    /// Cold shapes whose geometry is a line or polygon.
    pub fn cold_paths(&self) -> Vec<&Shape> {
        self.cold_features()
            .into_iter()
            .filter(|s| s.geometry.kind() != GeometryKind::Point)
            .collect()
    }

    /// Number of currently selected shapes.
    pub fn selected_count(&self) -> usize {
        self.shapes.iter().filter(|s| s.stage.is_selected()).count()
    }

    /// Whether deletion is currently possible.
    pub fn can_delete(&self) -> bool {
        self.selected_count() > 0
    }

    /// Whether the in-progress drawing (if any) has reached its final
    /// geometry kind. Exposed for UI gating of the confirm action; the
    /// lower layers never enforce it.
    pub fn has_complete_new_feature(&self) -> bool {
        self.shapes
            .iter()
            .any(|s| s.stage == LifecycleStage::NewShape && s.is_complete())
    }

    // ========================================================================
    // Vertex Mutations (recorded in undo history)
    // ========================================================================

    /// Move the vertex addressed by `flat_index` in the flattened
    /// draggable view to `position`.
    pub fn drag_position(&mut self, position: Position, flat_index: usize) {
        let resolved = match resolve_flat_index(flat_index, |i| {
            self.shapes.get(i).map(|s| s.draggable_count())
        }) {
            Ok(r) => r,
            Err(e) => {
                log::warn!("Drag ignored: {}", e);
                return;
            }
        };
        let shape = &mut self.shapes[resolved.outer];
        let old = shape.geometry.clone();
        if let Err(e) = shape.geometry.reposition_vertex(position, resolved.inner) {
            log::warn!("Drag ignored: {}", e);
            return;
        }
        let command = EditCommand::ModifyGeometry {
            shape_id: shape.id,
            old,
            new: shape.geometry.clone(),
        };
        self.history.push(command);
    }

    /// Insert a vertex into the shape currently being geometry-edited.
    pub fn add_vertex(&mut self, vertex: Position, index: Option<isize>) {
        let Some(shape_index) = self.editable_shape_index() else {
            return;
        };
        let shape = &mut self.shapes[shape_index];
        let old = shape.geometry.clone();
        if let Err(e) = shape.geometry.add_vertex(vertex, index) {
            log::warn!("Add vertex ignored: {}", e);
            return;
        }
        let command = EditCommand::ModifyGeometry {
            shape_id: shape.id,
            old,
            new: shape.geometry.clone(),
        };
        self.history.push(command);
    }

    /// Insert a vertex splitting the segment nearest to `position` on the
    /// shape currently being geometry-edited.
    pub fn add_vertex_nearest_segment(&mut self, position: Position) {
        let Some(shape_index) = self.editable_shape_index() else {
            return;
        };
        let Some(index) = self.shapes[shape_index].geometry.nearest_segment(position) else {
            log::warn!("Add vertex ignored: shape has no splittable segment");
            return;
        };
        self.add_vertex(position, Some(index));
    }

    /// Remove the vertex at `index` from the shape currently being
    /// geometry-edited.
    pub fn remove_vertex(&mut self, index: usize) {
        let Some(shape_index) = self.editable_shape_index() else {
            return;
        };
        let shape = &mut self.shapes[shape_index];
        let old = shape.geometry.clone();
        let final_kind = shape.final_kind;
        if let Err(e) = shape.geometry.remove_vertex(index, final_kind) {
            log::warn!("Remove vertex ignored: {}", e);
            return;
        }
        let command = EditCommand::ModifyGeometry {
            shape_id: shape.id,
            old,
            new: shape.geometry.clone(),
        };
        self.history.push(command);
    }

    /// Extend the in-progress drawing with the next tapped position,
    /// promoting its geometry kind as needed.
    pub fn extend_drawing(&mut self, position: Position) {
        let Some(shape) = self
            .shapes
            .iter_mut()
            .find(|s| s.stage == LifecycleStage::NewShape)
        else {
            log::warn!("Extend ignored: no drawing in progress");
            return;
        };
        let old = shape.geometry.clone();
        shape.extend_drawing(position);
        // Moving a committed single point draw stays out of the history,
        // consistent with its exempt creation.
        if shape.final_kind == GeometryKind::Point {
            return;
        }
        let command = EditCommand::ModifyGeometry {
            shape_id: shape.id,
            old,
            new: shape.geometry.clone(),
        };
        self.history.push(command);
    }

    // ========================================================================
    // Drawing Lifecycle
    // ========================================================================

    /// Start drawing a new shape from its first tapped position.
    ///
    /// Single-point draws are excluded from the undo history: a point has
    /// no intermediate steps to undo while being drawn.
    pub fn add_new_point(&mut self, position: Position, final_kind: GeometryKind) {
        if self
            .shapes
            .iter()
            .any(|s| s.stage == LifecycleStage::NewShape)
        {
            log::warn!("New drawing ignored: another drawing is in progress");
            return;
        }
        let id = self.next_id;
        self.next_id += 1;
        let shape = Shape::new_drawing(id, position, final_kind);
        if final_kind != GeometryKind::Point {
            self.history.push(EditCommand::AddShape {
                shape: shape.clone(),
            });
        }
        log::debug!("✏️ Started drawing {} shape {}", final_kind.name(), id);
        self.shapes.push(shape);
    }

    /// Place or move the throwaway draft point: a provisional marker
    /// dropped before any shape type is committed. Kept out of the undo
    /// history by design; it either settles with the session or is
    /// discarded with it.
    pub fn add_draft_point(&mut self, position: Position) {
        if let Some(shape) = self
            .shapes
            .iter_mut()
            .find(|s| s.stage == LifecycleStage::DraftShape)
        {
            if let Err(e) = shape.geometry.reposition_vertex(position, 0) {
                log::warn!("Draft move ignored: {}", e);
            }
            return;
        }
        let id = self.next_id;
        self.next_id += 1;
        let mut shape = Shape::new_drawing(id, position, GeometryKind::Point);
        shape.stage = LifecycleStage::DraftShape;
        log::debug!("📍 Placed draft point {}", id);
        self.shapes.push(shape);
    }

    /// Remove the throwaway draft point, if any (cancel path).
    pub fn discard_draft_features(&mut self) {
        self.shapes.retain(|s| s.stage != LifecycleStage::DraftShape);
    }

    /// Remove shapes still in the drawing stage (cancel path).
    pub fn discard_new_features(&mut self) {
        let before = self.shapes.len();
        self.shapes.retain(|s| s.stage != LifecycleStage::NewShape);
        let discarded = before - self.shapes.len();
        if discarded > 0 {
            log::debug!("🗑️ Discarded {} unfinished drawing(s)", discarded);
        }
    }

    /// Commit in-progress drawings to the idle stage. An incomplete
    /// drawing is warned about but committed anyway; blocking the action
    /// is the UI's concern, not this layer's.
    pub fn confirm_new_features(&mut self) {
        for shape in self
            .shapes
            .iter_mut()
            .filter(|s| s.stage == LifecycleStage::NewShape)
        {
            if !shape.is_complete() {
                log::warn!(
                    "Confirming incomplete shape {} ({} is still {})",
                    shape.id,
                    shape.final_kind.name(),
                    shape.geometry.kind().name()
                );
            }
            shape.stage = LifecycleStage::View;
        }
    }

    // ========================================================================
    // Session Boundary
    // ========================================================================

    /// Open an editing session: the history transaction starts empty.
    pub fn begin_editing_session(&mut self) {
        self.history.clear();
    }

    /// Commit the editing session: every shape not in a selection stage
    /// settles to the idle stage, then the undo history is cleared.
    pub fn end_editing_session(&mut self) {
        for shape in &mut self.shapes {
            if shape.stage.is_selected() || shape.stage == LifecycleStage::View {
                continue;
            }
            if !shape.is_complete() {
                log::warn!("Committing incomplete shape {}", shape.id);
            }
            shape.stage = LifecycleStage::View;
        }
        self.history.clear();
    }

    /// Revert to the pre-session state by undoing every recorded step.
    /// Calling this with an already-empty undo stack is a no-op.
    pub fn rollback_editing_session(&mut self) {
        let mut steps = 0;
        while let Some(cmd) = self.history.pop_undo() {
            apply_undo(&cmd, &mut self.shapes);
            steps += 1;
        }
        if steps > 0 {
            log::debug!("↩️ Rolled back {} step(s)", steps);
        }
    }

    /// Check if undo is available.
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Check if redo is available.
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Undo the most recent recorded mutation. Warns and no-ops on an
    /// empty stack.
    pub fn undo(&mut self) {
        match self.history.pop_undo() {
            Some(cmd) => apply_undo(&cmd, &mut self.shapes),
            None => log::warn!("Undo requested with empty history"),
        }
    }

    /// Redo the most recently undone mutation. Warns and no-ops on an
    /// empty stack.
    pub fn redo(&mut self) {
        match self.history.pop_redo() {
            Some(cmd) => apply_redo(&cmd, &mut self.shapes),
            None => log::warn!("Redo requested with empty history"),
        }
    }

    // ========================================================================
    // Selection (never recorded in undo history)
    // ========================================================================

    /// Toggle a shape in or out of the multi-selection.
    pub fn toggle_multi_select(&mut self, id: ShapeId) {
        let Some(index) = self.find_shape(id) else {
            return;
        };
        let shape = &mut self.shapes[index];
        match shape.stage {
            LifecycleStage::View => shape.stage = LifecycleStage::SelectMultiple,
            LifecycleStage::SelectMultiple => shape.stage = LifecycleStage::View,
            other => log::warn!(
                "Multi-select ignored for shape {} in stage {}",
                id,
                other.name()
            ),
        }
    }

    /// Focus a shape as the single selection, or unfocus it when it is
    /// already the single selection. Any previous selection is cleared.
    pub fn toggle_single_select(&mut self, id: ShapeId) {
        let Some(index) = self.find_shape(id) else {
            return;
        };
        let was_single = self.shapes[index].stage == LifecycleStage::SelectSingle;
        self.deselect_all();
        if was_single {
            return;
        }
        let shape = &mut self.shapes[index];
        match shape.stage {
            LifecycleStage::View => shape.stage = LifecycleStage::SelectSingle,
            other => log::warn!(
                "Single-select ignored for shape {} in stage {}",
                id,
                other.name()
            ),
        }
    }

    /// Return every selected shape to the idle stage.
    pub fn deselect_all(&mut self) {
        for shape in &mut self.shapes {
            if shape.stage.is_selected() {
                shape.stage = LifecycleStage::View;
            }
        }
    }

    /// Make the selected shapes vertex-editable. Only legal for a
    /// homogeneous selection: any number of points, or exactly one
    /// line/polygon.
    pub fn selected_to_editable(&mut self) {
        let selected: Vec<usize> = self
            .shapes
            .iter()
            .enumerate()
            .filter(|(_, s)| s.stage.is_selected())
            .map(|(i, _)| i)
            .collect();
        if selected.is_empty() {
            log::warn!("Edit request ignored: nothing selected");
            return;
        }
        let all_points = selected
            .iter()
            .all(|&i| self.shapes[i].geometry.kind() == GeometryKind::Point);
        if !all_points && selected.len() > 1 {
            log::warn!("Edit request ignored: mixed or multiple non-point selection");
            return;
        }
        for i in selected {
            self.shapes[i].stage = LifecycleStage::EditShape;
        }
    }

    /// Return vertex-editable shapes to a selection stage (leaving the
    /// vertex-editing mode without committing).
    pub fn editable_to_selected(&mut self) {
        let editable: Vec<usize> = self
            .shapes
            .iter()
            .enumerate()
            .filter(|(_, s)| s.stage == LifecycleStage::EditShape)
            .map(|(i, _)| i)
            .collect();
        let target = if editable.len() == 1 {
            LifecycleStage::SelectSingle
        } else {
            LifecycleStage::SelectMultiple
        };
        for i in editable {
            self.shapes[i].stage = target;
        }
    }

    /// Delete every selected shape. Recorded in the undo history:
    /// deletion is a user-visible, reversible geometry change.
    pub fn delete_selected(&mut self) {
        let removed: Vec<(usize, Shape)> = self
            .shapes
            .iter()
            .enumerate()
            .filter(|(_, s)| s.stage.is_selected())
            .map(|(i, s)| (i, s.clone()))
            .collect();
        if removed.is_empty() {
            log::warn!("Delete ignored: nothing selected");
            return;
        }
        self.shapes.retain(|s| !s.stage.is_selected());
        log::debug!("🗑️ Deleted {} shape(s)", removed.len());
        self.history.push(EditCommand::RemoveShapes { removed });
    }

    // ========================================================================
    // Metadata Editing
    // ========================================================================

    /// Open metadata editing on the focused shape.
    pub fn begin_metadata_edit(&mut self, id: ShapeId) {
        if self
            .shapes
            .iter()
            .any(|s| s.stage == LifecycleStage::EditMetadata)
        {
            log::warn!("Metadata edit ignored: another metadata edit is open");
            return;
        }
        let Some(index) = self.find_shape(id) else {
            return;
        };
        let shape = &mut self.shapes[index];
        match shape.stage {
            LifecycleStage::SelectSingle => shape.stage = LifecycleStage::EditMetadata,
            other => log::warn!(
                "Metadata edit ignored for shape {} in stage {}",
                id,
                other.name()
            ),
        }
    }

    /// Apply an externally validated metadata object to the shape under
    /// metadata editing and return it to the focused selection.
    pub fn commit_metadata(&mut self, properties: Properties) {
        let Some(shape) = self
            .shapes
            .iter_mut()
            .find(|s| s.stage == LifecycleStage::EditMetadata)
        else {
            log::warn!("Metadata commit ignored: no metadata edit open");
            return;
        };
        shape.properties = properties;
        shape.stage = LifecycleStage::SelectSingle;
    }

    /// Close metadata editing without applying changes.
    pub fn cancel_metadata_edit(&mut self) {
        if let Some(shape) = self
            .shapes
            .iter_mut()
            .find(|s| s.stage == LifecycleStage::EditMetadata)
        {
            shape.stage = LifecycleStage::SelectSingle;
        }
    }

    /// The shape currently under metadata editing, if any.
    pub fn metadata_shape(&self) -> Option<&Shape> {
        self.shapes
            .iter()
            .find(|s| s.stage == LifecycleStage::EditMetadata)
    }

    // ========================================================================
    // Internal
    // ========================================================================

    /// Locate a shape by id, warning on zero or duplicate matches
    /// (duplicates are a data-integrity problem; the first match wins).
    fn find_shape(&self, id: ShapeId) -> Option<usize> {
        let mut matches = self
            .shapes
            .iter()
            .enumerate()
            .filter(|(_, s)| s.id == id)
            .map(|(i, _)| i);
        let first = matches.next();
        if first.is_none() {
            log::warn!("No shape with id {}", id);
        } else if matches.next().is_some() {
            log::warn!("Duplicate shapes with id {}, using the first", id);
        }
        first
    }

    /// The unique shape legal for vertex mutations. Zero or multiple
    /// candidates are logged, not propagated: both are reachable through
    /// UI races and must not take the session down.
    fn editable_shape_index(&self) -> Option<usize> {
        let mut candidates = self
            .shapes
            .iter()
            .enumerate()
            .filter(|(_, s)| s.stage.is_geometry_editable())
            .map(|(i, _)| i);
        let first = candidates.next();
        if first.is_none() {
            log::warn!("Vertex edit ignored: no shape is being edited");
            return None;
        }
        if candidates.next().is_some() {
            log::warn!("Vertex edit ignored: multiple shapes in an editable stage");
            return None;
        }
        first
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(x: f64, y: f64) -> Position {
        Position::new(x, y)
    }

    fn collection_with(shapes: Vec<(ShapeGeometry, LifecycleStage)>) -> ShapeCollection {
        let mut collection = ShapeCollection::new();
        collection.replace_shapes(
            shapes
                .iter()
                .map(|(g, _)| (g.clone(), Properties::new()))
                .collect(),
        );
        for (shape, (_, stage)) in collection.shapes.iter_mut().zip(&shapes) {
            shape.stage = *stage;
        }
        collection
    }

    fn line(points: &[(f64, f64)]) -> ShapeGeometry {
        ShapeGeometry::LineString(points.iter().map(|&(x, y)| pos(x, y)).collect())
    }

    #[test]
    fn test_selection_exclusivity() {
        let mut collection = collection_with(vec![
            (ShapeGeometry::Point(pos(0.0, 0.0)), LifecycleStage::View),
            (ShapeGeometry::Point(pos(1.0, 1.0)), LifecycleStage::View),
        ]);
        let (a, b) = (collection.shapes()[0].id, collection.shapes()[1].id);

        collection.toggle_single_select(a);
        assert_eq!(collection.shape(a).unwrap().stage, LifecycleStage::SelectSingle);

        collection.toggle_single_select(b);
        assert_eq!(collection.shape(a).unwrap().stage, LifecycleStage::View);
        assert_eq!(collection.shape(b).unwrap().stage, LifecycleStage::SelectSingle);
        assert_eq!(collection.selected_count(), 1);

        // Toggling the focused shape again unfocuses it
        collection.toggle_single_select(b);
        assert_eq!(collection.shape(b).unwrap().stage, LifecycleStage::View);
        assert_eq!(collection.selected_count(), 0);
    }

    #[test]
    fn test_delete_selected_scenario() {
        let mut collection = collection_with(vec![
            (ShapeGeometry::Point(pos(0.0, 0.0)), LifecycleStage::View),
            (ShapeGeometry::Point(pos(1.0, 1.0)), LifecycleStage::SelectSingle),
            (ShapeGeometry::Point(pos(2.0, 2.0)), LifecycleStage::SelectMultiple),
        ]);
        let a = collection.shapes()[0].id;

        collection.delete_selected();
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.shapes()[0].id, a);

        // Deletion is a reversible geometry change
        collection.undo();
        assert_eq!(collection.len(), 3);
    }

    #[test]
    fn test_drag_undo_redo_round_trip() {
        let mut collection = collection_with(vec![
            (line(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]), LifecycleStage::EditShape),
        ]);
        let original = collection.shapes()[0].geometry.clone();

        collection.drag_position(pos(0.0, 5.0), 0);
        collection.drag_position(pos(1.0, 7.0), 1);
        collection.drag_position(pos(2.0, 9.0), 2);
        let dragged = collection.shapes()[0].geometry.clone();
        assert_ne!(dragged, original);

        collection.undo();
        collection.undo();
        collection.undo();
        assert_eq!(collection.shapes()[0].geometry, original);

        collection.redo();
        collection.redo();
        collection.redo();
        assert_eq!(collection.shapes()[0].geometry, dragged);
    }

    #[test]
    fn test_drag_resolves_across_shapes() {
        let mut collection = collection_with(vec![
            (ShapeGeometry::Point(pos(0.0, 0.0)), LifecycleStage::View),
            (line(&[(0.0, 0.0), (1.0, 0.0)]), LifecycleStage::EditShape),
        ]);
        // View-stage point contributes no draggable vertices, so flat
        // index 1 is the line's second vertex.
        collection.drag_position(pos(9.0, 9.0), 1);
        assert_eq!(
            collection.shapes()[1].geometry,
            line(&[(0.0, 0.0), (9.0, 9.0)])
        );

        // Out of range drag is ignored
        collection.drag_position(pos(0.0, 0.0), 2);
        assert_eq!(
            collection.shapes()[1].geometry,
            line(&[(0.0, 0.0), (9.0, 9.0)])
        );
    }

    #[test]
    fn test_rollback_is_idempotent() {
        let mut collection = collection_with(vec![
            (line(&[(0.0, 0.0), (1.0, 0.0)]), LifecycleStage::EditShape),
        ]);
        let original = collection.shapes()[0].geometry.clone();

        collection.drag_position(pos(5.0, 5.0), 0);
        collection.rollback_editing_session();
        assert_eq!(collection.shapes()[0].geometry, original);
        assert!(!collection.can_undo());

        // Second rollback with an empty stack: no-op, no panic
        collection.rollback_editing_session();
        assert_eq!(collection.shapes()[0].geometry, original);
    }

    #[test]
    fn test_point_draw_exempt_from_history() {
        let mut collection = ShapeCollection::new();
        collection.add_new_point(pos(1.0, 1.0), GeometryKind::Point);
        assert!(!collection.can_undo());

        collection.confirm_new_features();
        assert_eq!(collection.shapes()[0].stage, LifecycleStage::View);
    }

    #[test]
    fn test_multi_vertex_draw_is_recorded_and_rolls_back() {
        let mut collection = ShapeCollection::new();
        collection.add_new_point(pos(0.0, 0.0), GeometryKind::Polygon);
        assert!(collection.can_undo());

        collection.extend_drawing(pos(1.0, 0.0));
        collection.extend_drawing(pos(1.0, 1.0));
        assert!(collection.has_complete_new_feature());

        collection.rollback_editing_session();
        assert!(collection.is_empty());
    }

    #[test]
    fn test_draft_point_is_throwaway() {
        let mut collection = ShapeCollection::new();
        collection.add_draft_point(pos(1.0, 1.0));
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.shapes()[0].stage, LifecycleStage::DraftShape);
        assert!(!collection.can_undo());

        // A second placement moves the existing draft
        collection.add_draft_point(pos(2.0, 2.0));
        assert_eq!(collection.len(), 1);
        assert_eq!(
            collection.shapes()[0].geometry,
            ShapeGeometry::Point(pos(2.0, 2.0))
        );

        collection.discard_draft_features();
        assert!(collection.is_empty());
    }

    #[test]
    fn test_draft_point_settles_with_the_session() {
        let mut collection = ShapeCollection::new();
        collection.add_draft_point(pos(1.0, 1.0));
        collection.end_editing_session();
        assert_eq!(collection.shapes()[0].stage, LifecycleStage::View);
    }

    #[test]
    fn test_only_one_drawing_at_a_time() {
        let mut collection = ShapeCollection::new();
        collection.add_new_point(pos(0.0, 0.0), GeometryKind::LineString);
        collection.add_new_point(pos(1.0, 1.0), GeometryKind::LineString);
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_confirm_incomplete_is_permissive() {
        let mut collection = ShapeCollection::new();
        collection.add_new_point(pos(0.0, 0.0), GeometryKind::Polygon);
        assert!(!collection.has_complete_new_feature());

        // Warns, but proceeds: gating is a UI concern
        collection.confirm_new_features();
        assert_eq!(collection.shapes()[0].stage, LifecycleStage::View);
    }

    #[test]
    fn test_end_editing_session_settles_and_clears() {
        let mut collection = collection_with(vec![
            (line(&[(0.0, 0.0), (1.0, 0.0)]), LifecycleStage::EditShape),
            (ShapeGeometry::Point(pos(2.0, 2.0)), LifecycleStage::SelectMultiple),
        ]);
        collection.drag_position(pos(0.0, 3.0), 0);
        assert!(collection.can_undo());

        collection.end_editing_session();
        assert_eq!(collection.shapes()[0].stage, LifecycleStage::View);
        // Selection survives the session commit
        assert_eq!(collection.shapes()[1].stage, LifecycleStage::SelectMultiple);
        assert!(!collection.can_undo());
    }

    #[test]
    fn test_undo_redo_empty_stack_no_ops() {
        let mut collection = ShapeCollection::new();
        collection.undo();
        collection.redo();
        assert!(collection.is_empty());
    }

    #[test]
    fn test_draggable_positions_only_from_edit_stage() {
        let mut collection = collection_with(vec![
            (line(&[(0.0, 0.0), (1.0, 0.0)]), LifecycleStage::EditShape),
            (line(&[(5.0, 5.0), (6.0, 5.0)]), LifecycleStage::View),
        ]);
        let handles = collection.draggable_positions();
        assert_eq!(handles.len(), 2);
        assert!(handles.iter().all(|h| h.shape_id == collection.shapes()[0].id));
        assert_eq!(handles[0].role, VertexRole::LineStart);

        collection.shapes[0].stage = LifecycleStage::View;
        assert!(collection.draggable_positions().is_empty());
    }

    #[test]
    fn test_hot_cold_partition() {
        let collection = collection_with(vec![
            (ShapeGeometry::Point(pos(0.0, 0.0)), LifecycleStage::NewShape),
            (line(&[(0.0, 0.0), (1.0, 0.0)]), LifecycleStage::EditShape),
            (ShapeGeometry::Point(pos(2.0, 2.0)), LifecycleStage::View),
            (line(&[(3.0, 3.0), (4.0, 3.0)]), LifecycleStage::SelectSingle),
        ]);
        assert_eq!(collection.hot_features().len(), 2);
        assert_eq!(collection.cold_features().len(), 2);
        assert_eq!(collection.hot_points().len(), 1);
        assert_eq!(collection.hot_paths().len(), 1);
        assert_eq!(collection.cold_points().len(), 1);
        assert_eq!(collection.cold_paths().len(), 1);
    }

    #[test]
    fn test_add_vertex_nearest_segment() {
        let mut collection = collection_with(vec![
            (line(&[(0.0, 0.0), (10.0, 0.0)]), LifecycleStage::EditShape),
        ]);
        collection.add_vertex_nearest_segment(pos(5.0, 1.0));
        assert_eq!(
            collection.shapes()[0].geometry,
            line(&[(0.0, 0.0), (5.0, 1.0), (10.0, 0.0)])
        );
        // Recorded: undo restores the original segment
        collection.undo();
        assert_eq!(
            collection.shapes()[0].geometry,
            line(&[(0.0, 0.0), (10.0, 0.0)])
        );
    }

    #[test]
    fn test_vertex_edit_requires_unique_editable_shape() {
        // No editable shape
        let mut collection = collection_with(vec![
            (line(&[(0.0, 0.0), (1.0, 0.0)]), LifecycleStage::View),
        ]);
        collection.add_vertex(pos(0.5, 0.5), None);
        assert_eq!(collection.shapes()[0].geometry.vertex_count(), 2);

        // Two editable shapes: invariant violation, logged and ignored
        let mut collection = collection_with(vec![
            (line(&[(0.0, 0.0), (1.0, 0.0)]), LifecycleStage::EditShape),
            (line(&[(2.0, 0.0), (3.0, 0.0)]), LifecycleStage::EditShape),
        ]);
        collection.add_vertex(pos(0.5, 0.5), None);
        assert_eq!(collection.shapes()[0].geometry.vertex_count(), 2);
        assert_eq!(collection.shapes()[1].geometry.vertex_count(), 2);
    }

    #[test]
    fn test_selected_to_editable_homogeneity() {
        // All points: allowed
        let mut collection = collection_with(vec![
            (ShapeGeometry::Point(pos(0.0, 0.0)), LifecycleStage::SelectMultiple),
            (ShapeGeometry::Point(pos(1.0, 1.0)), LifecycleStage::SelectMultiple),
        ]);
        collection.selected_to_editable();
        assert!(collection
            .shapes()
            .iter()
            .all(|s| s.stage == LifecycleStage::EditShape));

        // Mixed selection: refused
        let mut collection = collection_with(vec![
            (ShapeGeometry::Point(pos(0.0, 0.0)), LifecycleStage::SelectMultiple),
            (line(&[(0.0, 0.0), (1.0, 0.0)]), LifecycleStage::SelectMultiple),
        ]);
        collection.selected_to_editable();
        assert!(collection
            .shapes()
            .iter()
            .all(|s| s.stage == LifecycleStage::SelectMultiple));

        // Exactly one non-point: allowed
        let mut collection = collection_with(vec![
            (line(&[(0.0, 0.0), (1.0, 0.0)]), LifecycleStage::SelectSingle),
        ]);
        collection.selected_to_editable();
        assert_eq!(collection.shapes()[0].stage, LifecycleStage::EditShape);
    }

    #[test]
    fn test_editable_to_selected() {
        let mut collection = collection_with(vec![
            (line(&[(0.0, 0.0), (1.0, 0.0)]), LifecycleStage::EditShape),
        ]);
        collection.editable_to_selected();
        assert_eq!(collection.shapes()[0].stage, LifecycleStage::SelectSingle);

        let mut collection = collection_with(vec![
            (ShapeGeometry::Point(pos(0.0, 0.0)), LifecycleStage::EditShape),
            (ShapeGeometry::Point(pos(1.0, 1.0)), LifecycleStage::EditShape),
        ]);
        collection.editable_to_selected();
        assert!(collection
            .shapes()
            .iter()
            .all(|s| s.stage == LifecycleStage::SelectMultiple));
    }

    #[test]
    fn test_metadata_workflow() {
        let mut collection = collection_with(vec![
            (ShapeGeometry::Point(pos(0.0, 0.0)), LifecycleStage::SelectSingle),
        ]);
        let id = collection.shapes()[0].id;

        collection.begin_metadata_edit(id);
        assert_eq!(collection.metadata_shape().map(|s| s.id), Some(id));
        assert!(!collection.can_undo());

        let mut properties = Properties::new();
        properties.insert("name".into(), serde_json::json!("Site A"));
        collection.commit_metadata(properties);
        assert_eq!(collection.shapes()[0].stage, LifecycleStage::SelectSingle);
        assert_eq!(
            collection.shapes()[0].properties.get("name"),
            Some(&serde_json::json!("Site A"))
        );
        // Metadata editing is stage bookkeeping: never recorded
        assert!(!collection.can_undo());
    }

    #[test]
    fn test_metadata_requires_single_selection() {
        let mut collection = collection_with(vec![
            (ShapeGeometry::Point(pos(0.0, 0.0)), LifecycleStage::View),
        ]);
        let id = collection.shapes()[0].id;
        collection.begin_metadata_edit(id);
        assert!(collection.metadata_shape().is_none());
    }

    #[test]
    fn test_import_assigns_fresh_ids_and_clears_history() {
        let mut collection = ShapeCollection::new();
        collection.add_new_point(pos(0.0, 0.0), GeometryKind::LineString);
        assert!(collection.can_undo());

        collection.replace_shapes(vec![
            (ShapeGeometry::Point(pos(1.0, 1.0)), Properties::new()),
            (ShapeGeometry::Point(pos(2.0, 2.0)), Properties::new()),
        ]);
        assert_eq!(collection.len(), 2);
        assert!(!collection.can_undo());
        let ids: Vec<ShapeId> = collection.shapes().iter().map(|s| s.id).collect();
        assert_ne!(ids[0], ids[1]);
        assert!(collection
            .shapes()
            .iter()
            .all(|s| s.stage == LifecycleStage::View));
    }
}
