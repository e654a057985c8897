//! The mutable design: bodies, their features, selection, undo history and
//! version counters.
//!
//! Every user-level mutation saves one undo snapshot, bumps the scene
//! version and records that version on each body it touched, so display
//! refresh can tell which bodies need re-evaluation. Edits that change a
//! feature's inputs also drop the memoized results that depended on them.

use std::collections::HashMap;

use anvil_types::{
    Body, BodyId, ExtrudeParams, Feature, FeatureId, Mesh, Operation, Primitive, SceneDescription,
    Sketch, Transform,
};
use tracing::debug;

use crate::config::EngineConfig;
use crate::resolve::{dependent_bodies, first_use_of, sketch_consumers};
use crate::types::{EngineError, FeaturePatch, Selection};
use crate::undo::History;

pub struct SceneState {
    scene: SceneDescription,
    history: History<SceneDescription>,
    config: EngineConfig,
    version: u64,
    body_versions: HashMap<BodyId, u64>,
    selection: Selection,
}

impl SceneState {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            scene: SceneDescription::default(),
            history: History::new(config.scene_history_limit),
            config,
            version: 0,
            body_versions: HashMap::new(),
            selection: Selection::default(),
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn scene(&self) -> &SceneDescription {
        &self.scene
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn body(&self, id: BodyId) -> Result<&Body, EngineError> {
        self.scene.body(id).ok_or(EngineError::BodyNotFound { id })
    }

    pub fn feature(&self, body_id: BodyId, id: FeatureId) -> Result<&Feature, EngineError> {
        self.body(body_id)?
            .feature(id)
            .ok_or(EngineError::FeatureNotFound { id })
    }

    /// Monotonic counter bumped by every mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Scene version at the last mutation that touched this body.
    pub fn body_version(&self, id: BodyId) -> u64 {
        self.body_versions.get(&id).copied().unwrap_or(0)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ── Bodies ────────────────────────────────────────────────────────────

    pub fn create_body(&mut self, name: impl Into<String>) -> BodyId {
        self.history.save(&self.scene);
        let body = Body::new(name);
        let id = body.id;
        self.scene.bodies.push(body);
        self.touch(&[id]);
        debug!(body = %id, "created body");
        id
    }

    /// New body whose first feature is a base primitive.
    pub fn create_body_with_primitive(
        &mut self,
        name: impl Into<String>,
        primitive: Primitive,
        transform: Transform,
    ) -> BodyId {
        self.history.save(&self.scene);
        let mut body = Body::new(name);
        let label = format!("Base {}", primitive.label());
        body.features.push(Feature::new(
            label,
            Operation::BasePrimitive {
                primitive,
                transform,
            },
        ));
        let id = body.id;
        self.scene.bodies.push(body);
        self.touch(&[id]);
        debug!(body = %id, "created body with primitive");
        id
    }

    pub fn rename_body(&mut self, id: BodyId, name: impl Into<String>) -> Result<(), EngineError> {
        self.body(id)?;
        self.history.save(&self.scene);
        if let Some(body) = self.scene.body_mut(id) {
            body.name = name.into();
        }
        self.touch(&[]);
        Ok(())
    }

    pub fn set_body_visible(&mut self, id: BodyId, visible: bool) -> Result<(), EngineError> {
        if self.body(id)?.visible == visible {
            return Ok(());
        }
        self.history.save(&self.scene);
        if let Some(body) = self.scene.body_mut(id) {
            body.visible = visible;
        }
        self.touch(&[]);
        Ok(())
    }

    /// Flip visibility. Returns the new state.
    pub fn toggle_body_visibility(&mut self, id: BodyId) -> Result<bool, EngineError> {
        let visible = !self.body(id)?.visible;
        self.set_body_visible(id, visible)?;
        Ok(visible)
    }

    /// Remove a body together with the boolean records that mention it and
    /// any selection of it. Returns the ids of the dropped records.
    ///
    /// Bodies that used it as a boolean tool lose the memoized results from
    /// that point on; their boolean step is skipped from now on.
    pub fn remove_body(&mut self, id: BodyId) -> Result<Vec<uuid::Uuid>, EngineError> {
        self.body(id)?;
        self.history.save(&self.scene);

        let dependents = self.invalidate_dependents(id);
        self.scene.bodies.retain(|b| b.id != id);
        let mut dropped = Vec::new();
        self.scene.body_operations.retain(|op| {
            if op.references(id) {
                dropped.push(op.id);
                false
            } else {
                true
            }
        });
        self.selection.forget_body(id);
        self.body_versions.remove(&id);
        self.touch(&dependents);
        debug!(body = %id, records = dropped.len(), "removed body");
        Ok(dropped)
    }

    // ── Features ──────────────────────────────────────────────────────────

    /// Append a feature to a body.
    pub fn add_feature(&mut self, body_id: BodyId, feature: Feature) -> Result<FeatureId, EngineError> {
        self.body(body_id)?;
        self.history.save(&self.scene);
        let id = feature.id;
        let index = match self.scene.body_mut(body_id) {
            Some(body) => {
                body.features.push(feature);
                body.features.len() - 1
            }
            None => return Err(EngineError::BodyNotFound { id: body_id }),
        };
        let touched = self.invalidate_from(body_id, index);
        self.touch(&touched);
        debug!(body = %body_id, feature = %id, "added feature");
        Ok(id)
    }

    /// Patch a feature in place. An operation change drops the memoized
    /// results of this feature, every later feature of the body, and every
    /// body that reads this one as a boolean tool.
    pub fn update_feature(
        &mut self,
        body_id: BodyId,
        id: FeatureId,
        patch: FeaturePatch,
    ) -> Result<(), EngineError> {
        let index = self.feature_index(body_id, id)?;
        self.history.save(&self.scene);
        let changes_geometry = patch.operation.is_some();
        if let Some(feature) = self
            .scene
            .body_mut(body_id)
            .and_then(|b| b.features.get_mut(index))
        {
            if let Some(name) = patch.name {
                feature.name = name;
            }
            if let Some(operation) = patch.operation {
                feature.operation = operation;
            }
        }
        if changes_geometry {
            let touched = self.invalidate_from(body_id, index);
            self.touch(&touched);
        } else {
            self.touch(&[]);
        }
        Ok(())
    }

    /// Edit the parameters of an extrude feature.
    pub fn update_extrude(
        &mut self,
        body_id: BodyId,
        id: FeatureId,
        edit: impl FnOnce(&mut ExtrudeParams),
    ) -> Result<(), EngineError> {
        let mut operation = self.feature(body_id, id)?.operation.clone();
        match &mut operation {
            Operation::Extrude { params } => edit(params),
            _ => {
                return Err(EngineError::WrongOperation {
                    id,
                    expected: "extrude",
                })
            }
        }
        self.update_feature(body_id, id, FeaturePatch::operation(operation))
    }

    /// Replace the sketch of a sketch feature, keeping its placement.
    pub fn replace_sketch(
        &mut self,
        body_id: BodyId,
        id: FeatureId,
        sketch: Sketch,
    ) -> Result<(), EngineError> {
        let transform = match &self.feature(body_id, id)?.operation {
            Operation::Sketch { transform, .. } => transform.clone(),
            _ => {
                return Err(EngineError::WrongOperation {
                    id,
                    expected: "sketch",
                })
            }
        };
        self.update_feature(
            body_id,
            id,
            FeaturePatch::operation(Operation::Sketch { sketch, transform }),
        )
    }

    /// Remove one feature. Features that referenced it stay in place.
    pub fn remove_feature(&mut self, body_id: BodyId, id: FeatureId) -> Result<Feature, EngineError> {
        let index = self.feature_index(body_id, id)?;
        self.history.save(&self.scene);
        let removed = match self.scene.body_mut(body_id) {
            Some(body) => body.features.remove(index),
            None => return Err(EngineError::BodyNotFound { id: body_id }),
        };
        if matches!(self.selection.feature, Some((_, f)) if f == id) {
            self.selection.feature = None;
        }
        let touched = self.invalidate_from(body_id, index);
        self.touch(&touched);
        debug!(body = %body_id, feature = %id, "removed feature");
        Ok(removed)
    }

    /// Remove a sketch and every feature that consumes it directly, in one
    /// pass. Features that depended on those consumers are left in place.
    /// Returns the removed ids.
    pub fn remove_sketch_and_dependents(
        &mut self,
        body_id: BodyId,
        sketch_id: FeatureId,
    ) -> Result<Vec<FeatureId>, EngineError> {
        let body = self.body(body_id)?;
        let index = body
            .feature_index(sketch_id)
            .ok_or(EngineError::SketchNotFound { id: sketch_id })?;
        if !body.features[index].is_sketch() {
            return Err(EngineError::WrongOperation {
                id: sketch_id,
                expected: "sketch",
            });
        }
        let mut removed = sketch_consumers(body, sketch_id);
        removed.insert(0, sketch_id);

        self.history.save(&self.scene);
        if let Some(body) = self.scene.body_mut(body_id) {
            body.features.retain(|f| !removed.contains(&f.id));
        }
        if matches!(self.selection.feature, Some((_, f)) if removed.contains(&f)) {
            self.selection.feature = None;
        }
        let touched = self.invalidate_from(body_id, index);
        self.touch(&touched);
        debug!(body = %body_id, sketch = %sketch_id, removed = removed.len(), "removed sketch");
        Ok(removed)
    }

    /// Store a recomputed result on a feature.
    ///
    /// Not an edit: no undo snapshot, and the body is not marked for
    /// re-evaluation. Only the scene version moves.
    pub fn commit_cache(
        &mut self,
        body_id: BodyId,
        id: FeatureId,
        cached: Mesh,
        base: Option<Mesh>,
    ) -> Result<(), EngineError> {
        let feature = self
            .scene
            .body_mut(body_id)
            .ok_or(EngineError::BodyNotFound { id: body_id })?
            .feature_mut(id)
            .ok_or(EngineError::FeatureNotFound { id })?;
        feature.commit_cache(cached, base);
        self.notify_mutated();
        Ok(())
    }

    // ── Whole scene ───────────────────────────────────────────────────────

    /// Replace the design, e.g. after loading a file. Clears undo history
    /// and selection.
    pub fn set_scene(&mut self, scene: SceneDescription) {
        self.scene = scene;
        self.history.clear();
        self.selection = Selection::default();
        self.body_versions.clear();
        self.touch_all();
    }

    pub fn clear(&mut self) {
        self.set_scene(SceneDescription::default());
    }

    /// Record an out-of-band change.
    pub fn notify_mutated(&mut self) {
        self.version += 1;
    }

    pub fn undo(&mut self) -> bool {
        if !self.history.undo(&mut self.scene) {
            return false;
        }
        self.after_history_jump();
        true
    }

    pub fn redo(&mut self) -> bool {
        if !self.history.redo(&mut self.scene) {
            return false;
        }
        self.after_history_jump();
        true
    }

    // ── Selection ─────────────────────────────────────────────────────────

    pub fn select_body(&mut self, id: BodyId, additive: bool) -> Result<(), EngineError> {
        self.body(id)?;
        if !additive {
            self.selection.bodies.clear();
        }
        if !self.selection.bodies.contains(&id) {
            self.selection.bodies.push(id);
        }
        Ok(())
    }

    pub fn select_feature(&mut self, body_id: BodyId, id: FeatureId) -> Result<(), EngineError> {
        self.feature(body_id, id)?;
        self.selection.feature = Some((body_id, id));
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection = Selection::default();
    }

    // ── Internals ─────────────────────────────────────────────────────────

    pub(crate) fn scene_mut(&mut self) -> &mut SceneDescription {
        &mut self.scene
    }

    pub(crate) fn save_undo(&mut self) {
        self.history.save(&self.scene);
    }

    fn feature_index(&self, body_id: BodyId, id: FeatureId) -> Result<usize, EngineError> {
        self.body(body_id)?
            .feature_index(id)
            .ok_or(EngineError::FeatureNotFound { id })
    }

    /// Bump the scene version and stamp it on the given bodies.
    pub(crate) fn touch(&mut self, bodies: &[BodyId]) {
        self.version += 1;
        for id in bodies {
            self.body_versions.insert(*id, self.version);
        }
    }

    fn touch_all(&mut self) {
        let ids: Vec<BodyId> = self.scene.bodies.iter().map(|b| b.id).collect();
        self.touch(&ids);
    }

    fn after_history_jump(&mut self) {
        let live: Vec<BodyId> = self.scene.bodies.iter().map(|b| b.id).collect();
        self.selection.bodies.retain(|b| live.contains(b));
        if let Some((body_id, feature_id)) = self.selection.feature {
            if self.feature(body_id, feature_id).is_err() {
                self.selection.feature = None;
            }
        }
        self.body_versions.retain(|id, _| live.contains(id));
        self.touch_all();
    }

    /// Drop memoized results of `body_id` from `index` on, then of every
    /// body reading it as a tool. Returns every body touched.
    pub(crate) fn invalidate_from(&mut self, body_id: BodyId, index: usize) -> Vec<BodyId> {
        let mut dropped = 0;
        if let Some(body) = self.scene.body_mut(body_id) {
            for feature in body.features.iter_mut().skip(index) {
                if feature.invalidate() {
                    dropped += 1;
                }
            }
        }
        if dropped > 0 {
            debug!(body = %body_id, from = index, dropped, "invalidated cached results");
        }
        let mut touched = vec![body_id];
        touched.extend(self.invalidate_dependents(body_id));
        touched
    }

    /// Drop memoized results in bodies that read `body_id` as a tool, from
    /// their first use of it on.
    fn invalidate_dependents(&mut self, body_id: BodyId) -> Vec<BodyId> {
        let dependents = dependent_bodies(&self.scene, body_id);
        for dependent in &dependents {
            let Some(body) = self.scene.body_mut(*dependent) else {
                continue;
            };
            // First use of any tool body in the changed chain.
            let start = body
                .tool_bodies()
                .iter()
                .filter(|t| **t == body_id || dependents.contains(t))
                .filter_map(|t| first_use_of(body, *t))
                .min();
            if let Some(start) = start {
                for feature in body.features.iter_mut().skip(start) {
                    feature.invalidate();
                }
            }
        }
        dependents
    }
}

impl Default for SceneState {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
