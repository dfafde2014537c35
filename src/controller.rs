//! Top-level interaction-mode state machine.
//!
//! The controller translates discrete user intents (mode toggles, map
//! presses, picks, confirm/cancel/delete, undo/redo) into collection and
//! lifecycle transitions, and brackets geometry-modification modes with
//! an editing session (the undo transaction boundary). Invalid intents
//! log a warning and degrade to no-ops; the controller must stay
//! responsive to further input regardless of prior misuse.

use crate::collection::ShapeCollection;
use crate::geometry::{GeometryKind, Position};
use crate::model::{LifecycleStage, Properties, ShapeId};

/// The controller-level interaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionMode {
    /// Drag existing point features
    DragPoint,
    /// Draw single point features
    DrawPoint,
    /// Draw polygons
    DrawPolygon,
    /// Draw polylines
    DrawPolyline,
    /// Edit metadata of the focused shape
    EditMetadata,
    /// Edit vertices of the selected shape(s)
    EditVertices,
    /// Pick shapes into a multi-selection
    SelectMultiple,
    /// Focus a single shape
    #[default]
    SelectSingle,
}

impl InteractionMode {
    /// Get the display name for this mode.
    pub fn name(&self) -> &'static str {
        match self {
            InteractionMode::DragPoint => "DragPoint",
            InteractionMode::DrawPoint => "DrawPoint",
            InteractionMode::DrawPolygon => "DrawPolygon",
            InteractionMode::DrawPolyline => "DrawPolyline",
            InteractionMode::EditMetadata => "EditMetadata",
            InteractionMode::EditVertices => "EditVertices",
            InteractionMode::SelectMultiple => "SelectMultiple",
            InteractionMode::SelectSingle => "SelectSingle",
        }
    }

    /// Whether this mode modifies geometry and therefore runs inside an
    /// editing session.
    pub fn is_modification(&self) -> bool {
        !matches!(
            self,
            InteractionMode::EditMetadata
                | InteractionMode::SelectMultiple
                | InteractionMode::SelectSingle
        )
    }

    /// The geometry kind drawn by this mode, if it is a draw mode.
    fn draw_kind(&self) -> Option<GeometryKind> {
        match self {
            InteractionMode::DrawPoint => Some(GeometryKind::Point),
            InteractionMode::DrawPolyline => Some(GeometryKind::LineString),
            InteractionMode::DrawPolygon => Some(GeometryKind::Polygon),
            _ => None,
        }
    }
}

/// The editing controller: owns the shape collection for the lifetime of
/// one editing widget instance.
#[derive(Debug, Default)]
pub struct EditingController {
    collection: ShapeCollection,
    mode: InteractionMode,
    draft_properties: Option<Properties>,
}

impl EditingController {
    /// Create a controller over an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a controller over a pre-seeded collection.
    pub fn with_collection(collection: ShapeCollection) -> Self {
        Self {
            collection,
            ..Default::default()
        }
    }

    /// The owned shape collection (read-only derived views).
    pub fn collection(&self) -> &ShapeCollection {
        &self.collection
    }

    /// Mutable collection access, for import/export glue between sessions.
    pub fn collection_mut(&mut self) -> &mut ShapeCollection {
        &mut self.collection
    }

    /// The current interaction mode.
    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    // ========================================================================
    // Mode Transitions
    // ========================================================================

    /// Toggle a mode: selecting the current mode reverts to the default.
    ///
    /// Crossing into a geometry-modification mode opens an editing
    /// session (history starts empty); leaving one via confirm/cancel
    /// closes it. Toggling out directly keeps the history, as the session
    /// settles through `confirm`/`cancel`.
    pub fn toggle_mode(&mut self, mode: InteractionMode) {
        let next = if mode == self.mode {
            InteractionMode::default()
        } else {
            mode
        };
        log::debug!("🔀 Mode {} -> {}", self.mode.name(), next.name());
        self.leave_mode(next);
        self.enter_mode(next);
        self.mode = next;
    }

    fn leave_mode(&mut self, next: InteractionMode) {
        match self.mode {
            InteractionMode::EditVertices if next != InteractionMode::EditVertices => {
                self.collection.editable_to_selected();
            }
            InteractionMode::EditMetadata if next != InteractionMode::EditMetadata => {
                self.collection.cancel_metadata_edit();
                self.draft_properties = None;
            }
            _ => {}
        }
    }

    fn enter_mode(&mut self, next: InteractionMode) {
        if next.is_modification() && !self.mode.is_modification() {
            self.collection.begin_editing_session();
        }
        match next {
            InteractionMode::EditVertices => self.collection.selected_to_editable(),
            InteractionMode::EditMetadata => {
                let focused = self
                    .collection
                    .shapes()
                    .iter()
                    .find(|s| s.stage == LifecycleStage::SelectSingle)
                    .map(|s| (s.id, s.properties.clone()));
                match focused {
                    Some((id, properties)) => {
                        self.collection.begin_metadata_edit(id);
                        self.draft_properties = Some(properties);
                    }
                    None => log::warn!("Metadata mode without a focused shape"),
                }
            }
            _ => {}
        }
    }

    // ========================================================================
    // Map Intents
    // ========================================================================

    /// Handle a raw press on the map, dispatched by the current mode.
    pub fn handle_press(&mut self, position: Position) {
        match self.mode {
            InteractionMode::DrawPoint
            | InteractionMode::DrawPolyline
            | InteractionMode::DrawPolygon => {
                let drawing_in_progress = self
                    .collection
                    .shapes()
                    .iter()
                    .any(|s| s.stage == LifecycleStage::NewShape);
                if drawing_in_progress {
                    self.collection.extend_drawing(position);
                } else if let Some(kind) = self.mode.draw_kind() {
                    self.collection.add_new_point(position, kind);
                }
            }
            InteractionMode::DragPoint => {
                self.collection.add_draft_point(position);
            }
            InteractionMode::EditVertices => {
                self.collection.add_vertex_nearest_segment(position);
            }
            _ => {
                log::debug!("Press ignored in mode {}", self.mode.name());
            }
        }
    }

    /// Handle a drag of the flattened vertex handle `flat_index` to
    /// `position`.
    pub fn handle_drag(&mut self, position: Position, flat_index: usize) {
        if !self.mode.is_modification() {
            log::warn!("Drag ignored in mode {}", self.mode.name());
            return;
        }
        self.collection.drag_position(position, flat_index);
    }

    /// Handle an externally picked feature id, dispatched by the current
    /// selection mode.
    pub fn handle_pick(&mut self, id: ShapeId) {
        match self.mode {
            InteractionMode::SelectSingle => self.collection.toggle_single_select(id),
            InteractionMode::SelectMultiple => self.collection.toggle_multi_select(id),
            _ => log::warn!("Pick ignored in mode {}", self.mode.name()),
        }
    }

    // ========================================================================
    // Session Intents
    // ========================================================================

    /// Confirm the current mode's work and return to the default mode.
    pub fn confirm(&mut self) {
        match self.mode {
            InteractionMode::DrawPoint => self.collection.confirm_new_features(),
            InteractionMode::EditMetadata => {
                let properties = self.draft_properties.take().unwrap_or_default();
                self.collection.commit_metadata(properties);
            }
            mode if mode.is_modification() => {
                self.collection.confirm_new_features();
                self.collection.end_editing_session();
            }
            mode => {
                log::warn!("Confirm ignored in mode {}", mode.name());
                return;
            }
        }
        self.mode = InteractionMode::default();
    }

    /// Abandon the current mode's work and return to the default mode.
    /// Safe to call when there is nothing to cancel.
    pub fn cancel(&mut self) {
        match self.mode {
            InteractionMode::EditMetadata => {
                self.collection.cancel_metadata_edit();
                self.draft_properties = None;
            }
            mode if mode.is_modification() => {
                self.collection.rollback_editing_session();
                self.collection.discard_new_features();
                self.collection.discard_draft_features();
                if mode == InteractionMode::EditVertices {
                    self.collection.editable_to_selected();
                }
            }
            _ => {}
        }
        self.mode = InteractionMode::default();
    }

    /// Delete the selected shapes. Only enabled while something is
    /// selected.
    pub fn delete(&mut self) {
        if !self.collection.can_delete() {
            log::warn!("Delete ignored: nothing selected");
            return;
        }
        self.collection.delete_selected();
    }

    /// Undo the most recent recorded mutation, gated on availability.
    pub fn undo(&mut self) {
        if !self.collection.can_undo() {
            log::warn!("Undo ignored: history is empty");
            return;
        }
        self.collection.undo();
    }

    /// Redo the most recently undone mutation, gated on availability.
    pub fn redo(&mut self) {
        if !self.collection.can_redo() {
            log::warn!("Redo ignored: history is empty");
            return;
        }
        self.collection.redo();
    }

    // ========================================================================
    // Metadata Draft
    // ========================================================================

    /// Replace the draft metadata object (supplied by the external form
    /// layer while metadata editing is open).
    pub fn set_draft_properties(&mut self, properties: Properties) {
        if self.mode != InteractionMode::EditMetadata {
            log::warn!("Metadata draft ignored in mode {}", self.mode.name());
            return;
        }
        self.draft_properties = Some(properties);
    }

    /// The current draft metadata object, if metadata editing is open.
    pub fn draft_properties(&self) -> Option<&Properties> {
        self.draft_properties.as_ref()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ShapeGeometry;

    fn pos(x: f64, y: f64) -> Position {
        Position::new(x, y)
    }

    fn seeded_controller() -> EditingController {
        let mut collection = ShapeCollection::new();
        collection.replace_shapes(vec![
            (ShapeGeometry::Point(pos(0.0, 0.0)), Properties::new()),
            (
                ShapeGeometry::LineString(vec![pos(1.0, 0.0), pos(2.0, 0.0)]),
                Properties::new(),
            ),
        ]);
        EditingController::with_collection(collection)
    }

    #[test]
    fn test_default_mode() {
        let controller = EditingController::new();
        assert_eq!(controller.mode(), InteractionMode::SelectSingle);
    }

    #[test]
    fn test_toggle_same_mode_reverts_to_default() {
        let mut controller = EditingController::new();
        controller.toggle_mode(InteractionMode::DrawPolygon);
        assert_eq!(controller.mode(), InteractionMode::DrawPolygon);
        controller.toggle_mode(InteractionMode::DrawPolygon);
        assert_eq!(controller.mode(), InteractionMode::SelectSingle);
    }

    #[test]
    fn test_draw_polygon_flow() {
        let mut controller = EditingController::new();
        controller.toggle_mode(InteractionMode::DrawPolygon);
        controller.handle_press(pos(0.0, 0.0));
        controller.handle_press(pos(4.0, 0.0));
        controller.handle_press(pos(4.0, 4.0));
        assert!(controller.collection().has_complete_new_feature());

        controller.confirm();
        assert_eq!(controller.mode(), InteractionMode::SelectSingle);
        let shapes = controller.collection().shapes();
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].stage, LifecycleStage::View);
        assert_eq!(shapes[0].geometry.kind(), GeometryKind::Polygon);
        assert!(!controller.collection().can_undo());
    }

    #[test]
    fn test_cancel_discards_drawing() {
        let mut controller = EditingController::new();
        controller.toggle_mode(InteractionMode::DrawPolyline);
        controller.handle_press(pos(0.0, 0.0));
        controller.handle_press(pos(1.0, 0.0));
        assert_eq!(controller.collection().len(), 1);

        controller.cancel();
        assert!(controller.collection().is_empty());
        assert_eq!(controller.mode(), InteractionMode::SelectSingle);
    }

    #[test]
    fn test_cancel_is_safe_when_idle() {
        let mut controller = EditingController::new();
        controller.cancel();
        controller.cancel();
        assert_eq!(controller.mode(), InteractionMode::SelectSingle);
    }

    #[test]
    fn test_confirm_outside_modification_mode_is_a_no_op() {
        let mut controller = seeded_controller();
        controller.confirm();
        assert_eq!(controller.mode(), InteractionMode::SelectSingle);
        assert_eq!(controller.collection().len(), 2);
    }

    #[test]
    fn test_point_draw_confirm_path() {
        let mut controller = EditingController::new();
        controller.toggle_mode(InteractionMode::DrawPoint);
        controller.handle_press(pos(3.0, 3.0));
        // A second press moves the point rather than extending it
        controller.handle_press(pos(5.0, 5.0));
        assert_eq!(controller.collection().len(), 1);
        assert!(!controller.collection().can_undo());

        controller.confirm();
        let shapes = controller.collection().shapes();
        assert_eq!(shapes[0].geometry, ShapeGeometry::Point(pos(5.0, 5.0)));
        assert_eq!(shapes[0].stage, LifecycleStage::View);
    }

    #[test]
    fn test_entering_a_modification_mode_opens_a_fresh_session() {
        let mut controller = EditingController::new();
        controller.toggle_mode(InteractionMode::DrawPolyline);
        controller.handle_press(pos(0.0, 0.0));
        controller.handle_press(pos(1.0, 0.0));
        assert!(controller.collection().can_undo());
        controller.confirm();

        controller.toggle_mode(InteractionMode::DragPoint);
        assert!(!controller.collection().can_undo());
    }

    #[test]
    fn test_edit_vertices_round_trip() {
        let mut controller = seeded_controller();
        let line_id = controller.collection().shapes()[1].id;
        controller.handle_pick(line_id);
        assert_eq!(controller.collection().selected_count(), 1);

        controller.toggle_mode(InteractionMode::EditVertices);
        assert_eq!(
            controller.collection().shape(line_id).unwrap().stage,
            LifecycleStage::EditShape
        );
        assert_eq!(controller.collection().draggable_positions().len(), 2);

        controller.handle_press(pos(1.5, 0.5));
        assert_eq!(
            controller
                .collection()
                .shape(line_id)
                .unwrap()
                .geometry
                .vertex_count(),
            3
        );

        controller.cancel();
        assert_eq!(
            controller.collection().shape(line_id).unwrap().stage,
            LifecycleStage::SelectSingle
        );
        assert_eq!(
            controller
                .collection()
                .shape(line_id)
                .unwrap()
                .geometry
                .vertex_count(),
            2
        );
    }

    #[test]
    fn test_drag_point_draft_flow() {
        let mut controller = EditingController::new();
        controller.toggle_mode(InteractionMode::DragPoint);
        controller.handle_press(pos(1.0, 1.0));
        controller.handle_press(pos(2.0, 2.0));
        assert_eq!(controller.collection().len(), 1);
        assert_eq!(
            controller.collection().shapes()[0].stage,
            LifecycleStage::DraftShape
        );

        controller.cancel();
        assert!(controller.collection().is_empty());

        controller.toggle_mode(InteractionMode::DragPoint);
        controller.handle_press(pos(3.0, 3.0));
        controller.confirm();
        assert_eq!(controller.collection().shapes()[0].stage, LifecycleStage::View);
        assert_eq!(
            controller.collection().shapes()[0].geometry,
            ShapeGeometry::Point(pos(3.0, 3.0))
        );
    }

    #[test]
    fn test_delete_gated_on_selection() {
        let mut controller = seeded_controller();
        controller.delete();
        assert_eq!(controller.collection().len(), 2);

        let id = controller.collection().shapes()[0].id;
        controller.handle_pick(id);
        controller.delete();
        assert_eq!(controller.collection().len(), 1);
    }

    #[test]
    fn test_metadata_flow() {
        let mut controller = seeded_controller();
        let id = controller.collection().shapes()[0].id;
        controller.handle_pick(id);

        controller.toggle_mode(InteractionMode::EditMetadata);
        assert!(controller.draft_properties().is_some());

        let mut properties = Properties::new();
        properties.insert("kind".into(), serde_json::json!("well"));
        controller.set_draft_properties(properties);
        controller.confirm();

        let shape = controller.collection().shape(id).unwrap();
        assert_eq!(shape.stage, LifecycleStage::SelectSingle);
        assert_eq!(shape.properties.get("kind"), Some(&serde_json::json!("well")));
        assert_eq!(controller.mode(), InteractionMode::SelectSingle);
        assert!(controller.draft_properties().is_none());
    }

    #[test]
    fn test_metadata_cancel_leaves_properties_untouched() {
        let mut controller = seeded_controller();
        let id = controller.collection().shapes()[0].id;
        controller.handle_pick(id);
        controller.toggle_mode(InteractionMode::EditMetadata);

        let mut properties = Properties::new();
        properties.insert("kind".into(), serde_json::json!("well"));
        controller.set_draft_properties(properties);
        controller.cancel();

        let shape = controller.collection().shape(id).unwrap();
        assert!(shape.properties.is_empty());
        assert_eq!(shape.stage, LifecycleStage::SelectSingle);
    }

    #[test]
    fn test_undo_redo_gating() {
        let mut controller = EditingController::new();
        // Empty history: warns, no panic
        controller.undo();
        controller.redo();

        controller.toggle_mode(InteractionMode::DrawPolyline);
        controller.handle_press(pos(0.0, 0.0));
        controller.handle_press(pos(1.0, 0.0));
        controller.undo();
        assert_eq!(
            controller.collection().shapes()[0].geometry.kind(),
            GeometryKind::Point
        );
        controller.redo();
        assert_eq!(
            controller.collection().shapes()[0].geometry.kind(),
            GeometryKind::LineString
        );
    }

    #[test]
    fn test_multi_select_pick_mode() {
        let mut controller = seeded_controller();
        let ids: Vec<_> = controller.collection().shapes().iter().map(|s| s.id).collect();
        controller.toggle_mode(InteractionMode::SelectMultiple);
        controller.handle_pick(ids[0]);
        controller.handle_pick(ids[1]);
        assert_eq!(controller.collection().selected_count(), 2);

        controller.handle_pick(ids[0]);
        assert_eq!(controller.collection().selected_count(), 1);
    }
}
