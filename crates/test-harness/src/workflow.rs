//! ModelBuilder: fluent API for scripting modeling sessions in tests.
//!
//! Drives the real scene model, evaluator and rebuild coordinator against a
//! [`MockKernel`]. All methods accept string names instead of UUIDs for
//! readability.

use std::collections::HashMap;

use anvil_types::*;
use feature_engine::{
    CancelToken, EngineConfig, GeometryCache, RebuildCoordinator, RebuildReport, SceneMeshes,
    SceneState,
};
use file_format::{load_project, save_project_with, ProjectMetadata, SaveOptions};
use kernel_bridge::MockKernel;
use uuid::Uuid;

use crate::helpers::*;

/// A fluent builder for constructing and verifying scenes in tests.
///
/// Bodies and features are registered under the names given when they are
/// created; the names share one namespace.
pub struct ModelBuilder {
    pub state: SceneState,
    kernel: MockKernel,
    cache: GeometryCache,
    meshes: SceneMeshes,
    coordinator: RebuildCoordinator,
    bodies: HashMap<String, BodyId>,
    features: HashMap<String, (BodyId, FeatureId)>,
    history: Vec<(String, String)>,
}

impl std::fmt::Debug for ModelBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBuilder")
            .field("bodies", &self.bodies)
            .field("features", &self.features)
            .finish_non_exhaustive()
    }
}

impl ModelBuilder {
    /// Create a new ModelBuilder with MockKernel and default settings.
    pub fn mock() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            state: SceneState::new(config),
            kernel: MockKernel::new(),
            cache: GeometryCache::new(),
            meshes: SceneMeshes::new(),
            coordinator: RebuildCoordinator::new(),
            bodies: HashMap::new(),
            features: HashMap::new(),
            history: Vec::new(),
        }
    }

    // ── Bodies ──────────────────────────────────────────────────────────

    /// New body holding a cube of edge `size` centered on `position`.
    pub fn cube(&mut self, name: &str, size: f64, position: [f64; 3]) -> Result<BodyId, HarnessError> {
        self.primitive(
            name,
            Primitive::Cube {
                width: size,
                height: size,
                depth: size,
            },
            Transform {
                position,
                ..Transform::identity()
            },
        )
    }

    pub fn primitive(
        &mut self,
        name: &str,
        primitive: Primitive,
        transform: Transform,
    ) -> Result<BodyId, HarnessError> {
        self.check_name_available(name)?;
        let id = self
            .state
            .create_body_with_primitive(name, primitive, transform);
        self.bodies.insert(name.to_string(), id);
        self.log("CreateBody", name);
        Ok(id)
    }

    /// Combine two bodies into a new body; both operands stay as they are.
    pub fn boolean_new(
        &mut self,
        name: &str,
        left: &str,
        right: &str,
        op: BooleanOp,
    ) -> Result<BodyId, HarnessError> {
        self.check_name_available(name)?;
        let (left, right) = (self.body_id(left)?, self.body_id(right)?);
        let new_body_id = Uuid::new_v4();
        let result = BooleanResult::CreateNewBody {
            new_body_id,
            new_body_name: name.to_string(),
        };
        self.state.apply_boolean(left, right, op, result)?;
        self.bodies.insert(name.to_string(), new_body_id);
        self.log("Boolean", name);
        Ok(new_body_id)
    }

    /// Combine `right` into `left`; `right` is hidden.
    pub fn merge_into_left(
        &mut self,
        left: &str,
        right: &str,
        op: BooleanOp,
    ) -> Result<Uuid, HarnessError> {
        let (left_id, right_id) = (self.body_id(left)?, self.body_id(right)?);
        let id = self
            .state
            .apply_boolean(left_id, right_id, op, BooleanResult::MergeIntoLeft)?;
        self.log("Boolean", left);
        Ok(id)
    }

    /// Remove a body. Returns the ids of the boolean records dropped with it.
    pub fn delete_body(&mut self, name: &str) -> Result<Vec<Uuid>, HarnessError> {
        let id = self.body_id(name)?;
        let dropped = self.state.remove_body(id)?;
        self.bodies.remove(name);
        self.features.retain(|_, (body, _)| *body != id);
        self.log("DeleteBody", name);
        Ok(dropped)
    }

    // ── Features ────────────────────────────────────────────────────────

    pub fn sketch(&mut self, name: &str, body: &str, sketch: Sketch) -> Result<FeatureId, HarnessError> {
        let body_id = self.body_id(body)?;
        self.add_feature(name, body_id, sketch_feature(name, sketch))
    }

    /// Sketch holding one rectangle with its corner at (x, y).
    #[allow(clippy::too_many_arguments)]
    pub fn rect_sketch(
        &mut self,
        name: &str,
        body: &str,
        plane: SketchPlane,
        offset: f64,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
    ) -> Result<FeatureId, HarnessError> {
        self.sketch(name, body, rect_sketch(plane, offset, x, y, w, h))
    }

    pub fn extrude(
        &mut self,
        name: &str,
        body: &str,
        sketch: &str,
        height: f64,
    ) -> Result<FeatureId, HarnessError> {
        let (body_id, sketch_id) = (self.body_id(body)?, self.feature_id(sketch)?);
        self.add_feature(name, body_id, boss_feature(name, sketch_id, height))
    }

    /// Cut extrude; `None` cuts through all.
    pub fn cut(
        &mut self,
        name: &str,
        body: &str,
        sketch: &str,
        depth: Option<f64>,
    ) -> Result<FeatureId, HarnessError> {
        let (body_id, sketch_id) = (self.body_id(body)?, self.feature_id(sketch)?);
        self.add_feature(name, body_id, cut_feature(name, sketch_id, depth))
    }

    pub fn revolve(
        &mut self,
        name: &str,
        body: &str,
        sketch: &str,
        angle: Option<f64>,
    ) -> Result<FeatureId, HarnessError> {
        let (body_id, sketch_id) = (self.body_id(body)?, self.feature_id(sketch)?);
        let feature = Feature::new(
            name,
            Operation::Revolve {
                params: RevolveParams {
                    sketch_id,
                    angle,
                    segments: self.state.config().revolve_segments,
                    axis: None,
                    cut: false,
                },
            },
        );
        self.add_feature(name, body_id, feature)
    }

    /// Fillet one picked edge of the body.
    pub fn fillet(
        &mut self,
        name: &str,
        body: &str,
        edge: EdgeDescriptor,
        radius: f64,
    ) -> Result<FeatureId, HarnessError> {
        let body_id = self.body_id(body)?;
        let feature = Feature::new(
            name,
            Operation::Fillet3d {
                params: FilletParams {
                    radius,
                    segments: 4,
                    edges: vec![edge],
                },
            },
        );
        self.add_feature(name, body_id, feature)
    }

    /// Change the depth of a named cut.
    pub fn set_cut_depth(&mut self, name: &str, depth: Option<f64>) -> Result<&mut Self, HarnessError> {
        let (body_id, id) = self.resolve_feature(name)?;
        self.state
            .update_extrude(body_id, id, |params| params.height = depth)?;
        self.log("UpdateFeature", name);
        Ok(self)
    }

    /// Delete a sketch and every feature built from it. Returns the number
    /// of features removed.
    pub fn delete_sketch(&mut self, name: &str) -> Result<usize, HarnessError> {
        let (body_id, id) = self.resolve_feature(name)?;
        let removed = self.state.remove_sketch_and_dependents(body_id, id)?;
        self.features.retain(|_, (_, f)| !removed.contains(f));
        self.log("DeleteSketch", name);
        Ok(removed.len())
    }

    pub fn delete_feature(&mut self, name: &str) -> Result<&mut Self, HarnessError> {
        let (body_id, id) = self.resolve_feature(name)?;
        self.state.remove_feature(body_id, id)?;
        self.features.remove(name);
        self.log("DeleteFeature", name);
        Ok(self)
    }

    // ── History ─────────────────────────────────────────────────────────

    /// Undo the last operation.
    pub fn undo(&mut self) -> Result<&mut Self, HarnessError> {
        if !self.state.undo() {
            return Err(HarnessError::AssertionFailed {
                detail: "nothing to undo".into(),
            });
        }
        self.log("Undo", "");
        Ok(self)
    }

    /// Redo the last undone operation.
    pub fn redo(&mut self) -> Result<&mut Self, HarnessError> {
        if !self.state.redo() {
            return Err(HarnessError::AssertionFailed {
                detail: "nothing to redo".into(),
            });
        }
        self.log("Redo", "");
        Ok(self)
    }

    // ── Evaluation ──────────────────────────────────────────────────────

    /// Bring display meshes up to date. Returns the bodies re-evaluated.
    pub fn refresh(&mut self) -> Vec<BodyId> {
        self.meshes
            .refresh(&mut self.state, &mut self.kernel, &mut self.cache)
    }

    /// Run one rebuild pass over uncached cuts.
    pub fn rebuild(&mut self) -> RebuildReport {
        self.rebuild_with(&CancelToken::new())
    }

    pub fn rebuild_with(&mut self, cancel: &CancelToken) -> RebuildReport {
        let report = self
            .coordinator
            .run(&mut self.state, &mut self.kernel, &mut self.cache, cancel);
        self.log("Rebuild", &format!("{} committed", report.committed.len()));
        report
    }

    /// Display mesh of a named body, refreshed first.
    pub fn mesh(&mut self, name: &str) -> Result<Mesh, HarnessError> {
        let id = self.body_id(name)?;
        self.refresh();
        self.meshes
            .mesh(id)
            .cloned()
            .ok_or_else(|| HarnessError::NoMesh {
                name: name.to_string(),
            })
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn body_id(&self, name: &str) -> Result<BodyId, HarnessError> {
        self.bodies
            .get(name)
            .copied()
            .ok_or_else(|| HarnessError::BodyNotFound {
                name: name.to_string(),
            })
    }

    pub fn body(&self, name: &str) -> Result<&Body, HarnessError> {
        Ok(self.state.body(self.body_id(name)?)?)
    }

    /// Get the UUID of a named feature.
    pub fn feature_id(&self, name: &str) -> Result<FeatureId, HarnessError> {
        self.resolve_feature(name).map(|(_, id)| id)
    }

    pub fn feature(&self, name: &str) -> Result<&Feature, HarnessError> {
        let (body_id, id) = self.resolve_feature(name)?;
        Ok(self.state.feature(body_id, id)?)
    }

    pub fn kernel(&self) -> &MockKernel {
        &self.kernel
    }

    pub fn kernel_mut(&mut self) -> &mut MockKernel {
        &mut self.kernel
    }

    pub fn cache(&self) -> &GeometryCache {
        &self.cache
    }

    /// Display errors from the last refresh, by body name.
    pub fn errors(&self) -> Vec<(String, String)> {
        let mut errors: Vec<(String, String)> = self
            .bodies
            .iter()
            .filter_map(|(name, id)| {
                self.meshes
                    .error(*id)
                    .map(|e| (name.clone(), e.to_string()))
            })
            .collect();
        errors.sort();
        errors
    }

    /// Get the operation log.
    pub fn history(&self) -> &[(String, String)] {
        &self.history
    }

    // ── File I/O ────────────────────────────────────────────────────────

    /// Save the project and return the JSON string.
    pub fn save(&self, options: SaveOptions) -> Result<String, HarnessError> {
        let json = save_project_with(self.state.scene(), &ProjectMetadata::new("Harness"), options)?;
        Ok(json)
    }

    /// Load a project from JSON, replacing the current state. Names are
    /// re-mapped from the loaded bodies and features; cached geometry and
    /// rebuild progress start over.
    pub fn load(&mut self, json: &str) -> Result<&mut Self, HarnessError> {
        let (scene, _) = load_project(json)?;
        self.state.set_scene(scene);
        self.cache.clear_all();
        self.meshes = SceneMeshes::new();
        self.coordinator = RebuildCoordinator::new();

        self.bodies.clear();
        self.features.clear();
        for body in &self.state.scene().bodies {
            self.bodies.insert(body.name.clone(), body.id);
            for feature in &body.features {
                self.features
                    .insert(feature.name.clone(), (body.id, feature.id));
            }
        }
        self.log("Load", "");
        Ok(self)
    }

    // ── Inline Assertions ───────────────────────────────────────────────

    /// Assert a body has exactly `expected` features.
    pub fn assert_feature_count(&self, body: &str, expected: usize) -> Result<&Self, HarnessError> {
        let body = self.body(body)?;
        if body.features.len() == expected {
            Ok(self)
        } else {
            Err(HarnessError::AssertionFailed {
                detail: format!(
                    "expected {} features in {}, got {}. Features: {:?}",
                    expected,
                    body.name,
                    body.features.len(),
                    body.features.iter().map(|f| &f.name).collect::<Vec<_>>()
                ),
            })
        }
    }

    /// Assert a named feature carries a memoized result.
    pub fn assert_cached(&self, name: &str) -> Result<&Self, HarnessError> {
        if self.feature(name)?.cached_mesh.is_some() {
            Ok(self)
        } else {
            Err(HarnessError::AssertionFailed {
                detail: format!("expected {name} to be cached"),
            })
        }
    }

    pub fn assert_uncached(&self, name: &str) -> Result<&Self, HarnessError> {
        if self.feature(name)?.cached_mesh.is_none() {
            Ok(self)
        } else {
            Err(HarnessError::AssertionFailed {
                detail: format!("expected {name} to have no cached result"),
            })
        }
    }

    /// Assert no body failed in the last refresh.
    pub fn assert_no_errors(&self) -> Result<&Self, HarnessError> {
        let errors = self.errors();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(HarnessError::AssertionFailed {
                detail: format!("expected no errors, got {}: {:?}", errors.len(), errors),
            })
        }
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn add_feature(
        &mut self,
        name: &str,
        body_id: BodyId,
        feature: Feature,
    ) -> Result<FeatureId, HarnessError> {
        self.check_name_available(name)?;
        let id = self.state.add_feature(body_id, feature)?;
        self.features.insert(name.to_string(), (body_id, id));
        self.log("AddFeature", name);
        Ok(id)
    }

    fn resolve_feature(&self, name: &str) -> Result<(BodyId, FeatureId), HarnessError> {
        self.features
            .get(name)
            .copied()
            .ok_or_else(|| HarnessError::FeatureNotFound {
                name: name.to_string(),
            })
    }

    fn check_name_available(&self, name: &str) -> Result<(), HarnessError> {
        if self.bodies.contains_key(name) || self.features.contains_key(name) {
            return Err(HarnessError::DuplicateName {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn log(&mut self, action: &str, detail: &str) {
        self.history.push((action.to_string(), detail.to_string()));
    }
}
