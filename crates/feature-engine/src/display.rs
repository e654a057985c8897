//! Meshes handed to the renderer, refreshed incrementally.

use std::collections::{HashMap, HashSet};

use anvil_types::{BodyId, Mesh};
use kernel_bridge::GeometryKernel;
use tracing::{debug, warn};

use crate::cache::GeometryCache;
use crate::evaluate::{evaluate_into_cache, BodyEvaluation};
use crate::resolve::evaluation_order;
use crate::scene::SceneState;

/// Display meshes of every body plus the errors of bodies that failed.
///
/// `refresh` re-evaluates a body only when its version moved since the
/// last refresh, when a body it reads as a tool was re-evaluated, or when
/// its last evaluation failed.
#[derive(Debug, Default)]
pub struct SceneMeshes {
    seen: HashMap<BodyId, u64>,
    meshes: HashMap<BodyId, Mesh>,
    errors: HashMap<BodyId, String>,
}

impl SceneMeshes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring meshes up to date with the scene. Recomputed cut results are
    /// stored back on their features. Returns the bodies evaluated, in order.
    pub fn refresh(
        &mut self,
        state: &mut SceneState,
        kernel: &mut dyn GeometryKernel,
        cache: &mut GeometryCache,
    ) -> Vec<BodyId> {
        let order = evaluation_order(state.scene());

        let removed: HashSet<BodyId> = self
            .seen
            .keys()
            .chain(self.meshes.keys())
            .chain(self.errors.keys())
            .filter(|id| !order.contains(id))
            .copied()
            .collect();
        for id in removed {
            self.seen.remove(&id);
            self.meshes.remove(&id);
            self.errors.remove(&id);
            cache.clear(id);
        }

        let mut evaluated: Vec<BodyId> = Vec::new();
        let mut changed: HashSet<BodyId> = HashSet::new();
        for body_id in order {
            let version = state.body_version(body_id);
            let Ok(body) = state.body(body_id) else {
                continue;
            };
            let stale = self.seen.get(&body_id) != Some(&version);
            let tool_changed = body.tool_bodies().iter().any(|t| changed.contains(t));
            if !stale && !tool_changed {
                continue;
            }

            let config = state.config().clone();
            let evaluation = evaluate_into_cache(body, cache, &config, kernel);
            self.record(&evaluation, &config);
            let failed = !evaluation.is_ok();
            for commit in evaluation.commits {
                let feature_id = commit.feature_id;
                if let Err(error) = state.commit_cache(
                    body_id,
                    feature_id,
                    commit.cached_mesh,
                    Some(commit.base_mesh),
                ) {
                    warn!(
                        body = %body_id,
                        feature = %feature_id,
                        %error,
                        "could not store cut result"
                    );
                }
            }
            // A failed body stays stale so the next refresh retries it.
            if failed {
                self.seen.remove(&body_id);
            } else {
                self.seen.insert(body_id, version);
            }
            changed.insert(body_id);
            evaluated.push(body_id);
        }
        if !evaluated.is_empty() {
            debug!(bodies = evaluated.len(), "refreshed display meshes");
        }
        evaluated
    }

    fn record(&mut self, evaluation: &BodyEvaluation, config: &crate::config::EngineConfig) {
        let id = evaluation.body_id;
        match evaluation.display_mesh(config) {
            Some(mesh) => {
                self.meshes.insert(id, mesh);
            }
            None => {
                self.meshes.remove(&id);
            }
        }
        match &evaluation.failure {
            Some(failure) => {
                self.errors.insert(id, failure.error.to_string());
            }
            None => {
                self.errors.remove(&id);
            }
        }
    }

    /// Mesh shown for a body, including placeholders for failed bodies.
    pub fn mesh(&self, id: BodyId) -> Option<&Mesh> {
        self.meshes.get(&id)
    }

    /// Meshes of visible bodies, in scene order.
    pub fn visible<'a>(&'a self, state: &'a SceneState) -> Vec<(BodyId, &'a Mesh)> {
        state
            .scene()
            .bodies
            .iter()
            .filter(|b| b.visible)
            .filter_map(|b| self.meshes.get(&b.id).map(|m| (b.id, m)))
            .collect()
    }

    pub fn error(&self, id: BodyId) -> Option<&str> {
        self.errors.get(&id).map(String::as_str)
    }

    pub fn errors(&self) -> &HashMap<BodyId, String> {
        &self.errors
    }
}
