//! Incremental rebuild of memoized cut results, e.g. after loading a file
//! saved without them.

use std::collections::HashMap;

use anvil_types::{BodyId, FeatureId, SceneDescription};
use kernel_bridge::GeometryKernel;
use tracing::{debug, info, warn};

use crate::cache::GeometryCache;
use crate::cancel::CancelToken;
use crate::evaluate::{FeatureChain, StepOutcome};
use crate::resolve::evaluation_order;
use crate::scene::SceneState;

/// Outcome of one rebuild pass.
#[derive(Debug, Clone, Default)]
pub struct RebuildReport {
    /// Cut features whose result was stored, in commit order.
    pub committed: Vec<FeatureId>,
    /// Features that failed, with the error message.
    pub failed: Vec<(FeatureId, String)>,
    /// Uncached cuts left alone: after a failure in their body, or passed
    /// over because they could not be applied.
    pub skipped: Vec<FeatureId>,
    /// Bodies evaluated in this pass, in order.
    pub bodies: Vec<BodyId>,
    pub cancelled: bool,
}

impl RebuildReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }
}

/// Recomputes cut features that have no memoized result and stores each
/// result on its feature as soon as it is available.
///
/// Each uncached cut is marked with its body's version before it is
/// computed, and the mark is dropped once the cut is stored or has failed.
/// A cut that stays marked (it was skipped, or its result could not be
/// stored) is not taken on again until the body is edited. Failed cuts are
/// retried on the next pass.
#[derive(Debug, Default)]
pub struct RebuildCoordinator {
    in_flight: HashMap<FeatureId, u64>,
}

impl RebuildCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bodies with uncached cuts not yet attempted at the body's current
    /// version, in evaluation order.
    pub fn pending_bodies(&self, state: &SceneState) -> Vec<BodyId> {
        let scene = state.scene();
        evaluation_order(scene)
            .into_iter()
            .filter(|id| !self.open_cuts(state, *id).is_empty())
            .collect()
    }

    pub fn is_marked(&self, feature_id: FeatureId) -> bool {
        self.in_flight.contains_key(&feature_id)
    }

    /// Run one pass over the scene.
    ///
    /// Bodies are visited in evaluation order. Pending bodies are
    /// re-evaluated feature by feature; other bodies are evaluated only when
    /// the cache has no mesh for them, so later bodies can read them as
    /// tools. Cancellation is checked before each body and each feature;
    /// results already stored stay stored.
    pub fn run(
        &mut self,
        state: &mut SceneState,
        kernel: &mut dyn GeometryKernel,
        cache: &mut GeometryCache,
        cancel: &CancelToken,
    ) -> RebuildReport {
        let mut report = RebuildReport::default();
        let pending = self.pending_bodies(state);
        if pending.is_empty() && all_cached(state.scene(), cache) {
            debug!("nothing to rebuild");
            return report;
        }
        info!(bodies = pending.len(), "rebuilding cached results");

        for body_id in evaluation_order(state.scene()) {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            if !pending.contains(&body_id) && cache.contains(body_id) {
                continue;
            }
            self.rebuild_body(state, body_id, kernel, cache, cancel, &mut report);
            report.bodies.push(body_id);
            if report.cancelled {
                break;
            }
        }

        info!(
            committed = report.committed.len(),
            failed = report.failed.len(),
            cancelled = report.cancelled,
            "rebuild pass finished"
        );
        report
    }

    fn rebuild_body(
        &mut self,
        state: &mut SceneState,
        body_id: BodyId,
        kernel: &mut dyn GeometryKernel,
        cache: &mut GeometryCache,
        cancel: &CancelToken,
        report: &mut RebuildReport,
    ) {
        let version = state.body_version(body_id);
        let open = self.open_cuts(state, body_id);
        // Evaluate a snapshot so results can be stored while walking.
        let Ok(body) = state.body(body_id).cloned() else {
            return;
        };

        let config = state.config().clone();
        let mut chain = FeatureChain::new(&body, cache, &config);
        let mut failed_at = None;
        while let Some(feature) = chain.next_feature() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let attempt = open.contains(&feature.id);
            if attempt {
                self.in_flight.insert(feature.id, version);
            }
            match chain.step(kernel) {
                Some(StepOutcome::Committed(commit)) => {
                    let stored = state.commit_cache(
                        body_id,
                        commit.feature_id,
                        commit.cached_mesh,
                        Some(commit.base_mesh),
                    );
                    match stored {
                        Ok(()) => {
                            self.in_flight.remove(&commit.feature_id);
                            report.committed.push(commit.feature_id);
                        }
                        Err(error) => {
                            warn!(
                                body = %body_id,
                                feature = %commit.feature_id,
                                %error,
                                "could not store rebuilt result"
                            );
                        }
                    }
                }
                Some(StepOutcome::Failed(failure)) => {
                    self.in_flight.remove(&failure.feature_id);
                    report
                        .failed
                        .push((failure.feature_id, failure.error.to_string()));
                    failed_at = Some(failure.feature_id);
                }
                Some(StepOutcome::Skipped { .. }) if attempt => {
                    report.skipped.push(feature.id);
                }
                _ => {}
            }
        }

        if let Some(failed_id) = failed_at {
            // Everything after the failure stays uncached.
            let remaining = body
                .features
                .iter()
                .skip_while(|f| f.id != failed_id)
                .skip(1)
                .filter(|f| f.needs_rebuild())
                .map(|f| f.id);
            report.skipped.extend(remaining);
            warn!(body = %body_id, feature = %failed_id, "rebuild stopped at failing feature");
            drop(chain);
            cache.clear(body_id);
            return;
        }
        if report.cancelled {
            return;
        }
        let mesh = chain.running().cloned();
        drop(chain);
        match mesh {
            Some(mesh) => cache.set(body_id, mesh),
            None => {
                cache.clear(body_id);
            }
        }
    }

    /// Uncached cuts after the body's checkpoint, up to the first one still
    /// marked at the body's current version.
    fn open_cuts(&self, state: &SceneState, body_id: BodyId) -> Vec<FeatureId> {
        let Ok(body) = state.body(body_id) else {
            return Vec::new();
        };
        let version = state.body_version(body_id);
        body.pending_cuts()
            .take_while(|f| self.in_flight.get(&f.id) != Some(&version))
            .map(|f| f.id)
            .collect()
    }
}

fn all_cached(scene: &SceneDescription, cache: &GeometryCache) -> bool {
    scene.bodies.iter().all(|b| cache.contains(b.id))
}
