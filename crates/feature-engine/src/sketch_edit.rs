//! Editing session on one sketch feature.
//!
//! The editor works on its own copy of the sketch with its own undo history.
//! Nothing reaches the scene until [`SketchEditor::commit`], which records a
//! single scene undo step for the whole session.

use anvil_types::{
    BodyId, ElementId, FeatureId, Operation, Point2D, Sketch, SketchConstraint, SketchElement,
};
use kernel_bridge::identity::{rezip_exact, rezip_trim};
use kernel_bridge::{SketchKernel, SnapPoint, SnapSettings, TrimResult};
use tracing::debug;

use crate::scene::SceneState;
use crate::types::EngineError;
use crate::undo::History;

pub struct SketchEditor {
    body_id: BodyId,
    feature_id: FeatureId,
    sketch: Sketch,
    history: History<Sketch>,
    selection: Vec<ElementId>,
    modified: bool,
}

impl SketchEditor {
    /// Start editing the sketch feature `feature_id` of `body_id`.
    pub fn open(
        state: &SceneState,
        body_id: BodyId,
        feature_id: FeatureId,
    ) -> Result<Self, EngineError> {
        let sketch = match &state.feature(body_id, feature_id)?.operation {
            Operation::Sketch { sketch, .. } => sketch.clone(),
            _ => {
                return Err(EngineError::WrongOperation {
                    id: feature_id,
                    expected: "sketch",
                })
            }
        };
        Ok(Self {
            body_id,
            feature_id,
            sketch,
            history: History::new(state.config().sketch_history_limit),
            selection: Vec::new(),
            modified: false,
        })
    }

    pub fn sketch(&self) -> &Sketch {
        &self.sketch
    }

    pub fn feature_id(&self) -> FeatureId {
        self.feature_id
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn selection(&self) -> &[ElementId] {
        &self.selection
    }

    // ── Elements ──────────────────────────────────────────────────────────

    pub fn add_element(&mut self, element: SketchElement) -> ElementId {
        self.checkpoint();
        self.sketch.add_element(element)
    }

    /// Remove elements and every constraint that refers to them. Returns
    /// how many elements were removed.
    pub fn remove_elements(&mut self, ids: &[ElementId]) -> usize {
        if !ids.iter().any(|id| self.sketch.entry(*id).is_some()) {
            return 0;
        }
        self.checkpoint();
        self.selection.retain(|s| !ids.contains(s));
        self.sketch.remove_entries(ids)
    }

    pub fn set_construction(&mut self, id: ElementId, construction: bool) -> Result<(), EngineError> {
        let current = self
            .sketch
            .entry(id)
            .ok_or(EngineError::ElementNotFound { id })?
            .construction;
        if current == construction {
            return Ok(());
        }
        self.checkpoint();
        if let Some(entry) = self.sketch.entry_mut(id) {
            entry.construction = construction;
        }
        Ok(())
    }

    /// Flip the construction flag. Returns the new value.
    pub fn toggle_construction(&mut self, id: ElementId) -> Result<bool, EngineError> {
        let construction = !self
            .sketch
            .entry(id)
            .ok_or(EngineError::ElementNotFound { id })?
            .construction;
        self.set_construction(id, construction)?;
        Ok(construction)
    }

    // ── Constraints ───────────────────────────────────────────────────────

    pub fn add_constraint(&mut self, constraint: SketchConstraint) -> Result<(), EngineError> {
        if let Some(id) = constraint
            .references()
            .into_iter()
            .find(|id| self.sketch.entry(*id).is_none())
        {
            return Err(EngineError::ElementNotFound { id });
        }
        self.checkpoint();
        self.sketch.constraints.push(constraint);
        Ok(())
    }

    pub fn remove_constraint(&mut self, index: usize) -> Result<SketchConstraint, EngineError> {
        let count = self.sketch.constraints.len();
        if index >= count {
            return Err(EngineError::ConstraintOutOfRange { index, count });
        }
        self.checkpoint();
        Ok(self.sketch.constraints.remove(index))
    }

    // ── Kernel-backed edits ───────────────────────────────────────────────

    /// Solve constraints and move the geometry accordingly. Entry ids and
    /// construction flags are kept.
    pub fn solve(&mut self, kernel: &mut dyn SketchKernel) -> Result<(), EngineError> {
        let response = kernel.solve_constraints(&self.sketch)?;
        let entries = rezip_exact(&self.sketch.entries, response)?;
        self.checkpoint();
        self.sketch.entries = entries;
        Ok(())
    }

    /// Trim an element at the piece nearest `point`.
    ///
    /// Returns the ids now standing where the element was: the element's
    /// own id first, then any pieces split off it. An empty list means the
    /// element was removed, along with its constraints and selection.
    pub fn trim(
        &mut self,
        kernel: &mut dyn SketchKernel,
        id: ElementId,
        point: Point2D,
    ) -> Result<Vec<ElementId>, EngineError> {
        let index = self
            .sketch
            .index_of(id)
            .ok_or(EngineError::ElementNotFound { id })?;
        let result = kernel.trim_element(&self.sketch, index, point)?;
        if result == TrimResult::NoChange {
            return Ok(vec![id]);
        }
        let mut next_id = self.sketch.next_element_id;
        let entries = rezip_trim(&self.sketch.entries, index, result, &mut next_id)?;
        let pieces = entries.len() + 1 - self.sketch.entries.len();

        self.checkpoint();
        let kept: Vec<ElementId> = entries[index..index + pieces]
            .iter()
            .map(|e| e.id)
            .collect();
        self.sketch.entries = entries;
        self.sketch.next_element_id = next_id;
        if kept.is_empty() {
            self.sketch.constraints.retain(|c| !c.references().contains(&id));
            self.selection.retain(|s| *s != id);
        }
        debug!(element = id, pieces, "trimmed sketch element");
        Ok(kept)
    }

    /// Snap candidates near the cursor. The positions in the kernel's answer
    /// are translated to entry ids.
    pub fn snap_points(
        &self,
        kernel: &mut dyn SketchKernel,
        cursor: Point2D,
        settings: &SnapSettings,
    ) -> Vec<(SnapPoint, Option<ElementId>)> {
        kernel
            .query_snap_points(&self.sketch, cursor, settings)
            .into_iter()
            .map(|snap| {
                let id = snap
                    .source_element
                    .and_then(|i| self.sketch.entries.get(i))
                    .map(|e| e.id);
                (snap, id)
            })
            .collect()
    }

    /// Add the arc through three points, in order.
    pub fn add_arc_through(
        &mut self,
        kernel: &mut dyn SketchKernel,
        start: Point2D,
        mid: Point2D,
        end: Point2D,
    ) -> Result<ElementId, EngineError> {
        let fit = kernel.fit_arc_through_three_points(start, mid, end);
        if !fit.valid {
            return Err(EngineError::DegenerateArc);
        }
        Ok(self.add_element(SketchElement::Arc {
            center: fit.center,
            radius: fit.radius,
            start_angle: fit.start_angle,
            end_angle: fit.end_angle,
        }))
    }

    // ── Selection ─────────────────────────────────────────────────────────

    pub fn select(&mut self, id: ElementId, additive: bool) -> Result<(), EngineError> {
        if self.sketch.entry(id).is_none() {
            return Err(EngineError::ElementNotFound { id });
        }
        if !additive {
            self.selection.clear();
        }
        if !self.selection.contains(&id) {
            self.selection.push(id);
        }
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // ── History ───────────────────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        let undone = self.history.undo(&mut self.sketch);
        if undone {
            self.prune_selection();
        }
        undone
    }

    pub fn redo(&mut self) -> bool {
        let redone = self.history.redo(&mut self.sketch);
        if redone {
            self.prune_selection();
        }
        redone
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Write the sketch back into the scene. Unmodified sessions leave the
    /// scene untouched.
    pub fn commit(self, state: &mut SceneState) -> Result<bool, EngineError> {
        if !self.modified {
            return Ok(false);
        }
        debug!(
            body = %self.body_id,
            feature = %self.feature_id,
            entries = self.sketch.entries.len(),
            "committing sketch"
        );
        state.replace_sketch(self.body_id, self.feature_id, self.sketch)?;
        Ok(true)
    }

    fn checkpoint(&mut self) {
        self.history.save(&self.sketch);
        self.modified = true;
    }

    fn prune_selection(&mut self) {
        let sketch = &self.sketch;
        self.selection.retain(|id| sketch.entry(*id).is_some());
    }
}
