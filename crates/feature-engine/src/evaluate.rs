//! Feature-chain evaluation: folds a body's feature list into one mesh.
//!
//! The fold keeps a running mesh. Primitives, bosses and revolves create
//! geometry (unioned into what is already there), cuts subtract a tool swept
//! from their sketch, `boolean_modify` combines with another body's mesh
//! from the [`GeometryCache`], and fillets/chamfers rework the running mesh.
//! Features that already carry a cached result are never recomputed: the
//! walk starts at the last one and earlier features only contribute their
//! sketches.

use anvil_types::{Body, BodyId, BooleanOp, Feature, FeatureId, Mesh, Operation};
use kernel_bridge::GeometryKernel;
use modeling_ops::{
    execute_boolean, execute_chamfer, execute_cut, execute_extrude, execute_fillet,
    execute_primitive, execute_revolve, OpResult,
};
use tracing::{debug, warn};

use crate::cache::GeometryCache;
use crate::config::EngineConfig;
use crate::resolve::SketchIndex;
use crate::types::EngineError;

/// A recomputed cut, ready to be stored on its feature.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheCommit {
    pub feature_id: FeatureId,
    /// Body geometry after the cut.
    pub cached_mesh: Mesh,
    /// Body geometry before the cut.
    pub base_mesh: Mesh,
}

/// The feature that stopped a body's evaluation.
#[derive(Debug, Clone)]
pub struct FeatureFailure {
    pub feature_id: FeatureId,
    pub error: EngineError,
}

/// What one evaluation step did.
#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// The running mesh was updated, or a sketch was indexed.
    Applied,
    /// A cached result was taken without calling the kernel.
    Checkpoint,
    /// A cut was recomputed; its result may be persisted.
    Committed(CacheCommit),
    /// The feature could not be applied and was passed over.
    Skipped { reason: String },
    /// The kernel or an operation rejected the feature. Evaluation of the
    /// body stops here.
    Failed(FeatureFailure),
}

/// Result of evaluating a whole body.
#[derive(Debug, Clone)]
pub struct BodyEvaluation {
    pub body_id: BodyId,
    /// Final running mesh. None when the body produced no geometry or its
    /// evaluation failed.
    pub mesh: Option<Mesh>,
    pub commits: Vec<CacheCommit>,
    pub failure: Option<FeatureFailure>,
    pub skipped: Vec<FeatureId>,
    pub warnings: Vec<String>,
}

impl BodyEvaluation {
    /// Mesh to show for the body: the result, or a placeholder box when
    /// evaluation failed.
    pub fn display_mesh(&self, config: &EngineConfig) -> Option<Mesh> {
        match (&self.failure, &self.mesh) {
            (Some(_), _) => Some(config.placeholder_mesh()),
            (None, mesh) => mesh.clone(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.failure.is_none()
    }
}

/// Step-by-step evaluator over one body.
pub struct FeatureChain<'a> {
    body: &'a Body,
    cache: &'a GeometryCache,
    config: &'a EngineConfig,
    sketches: SketchIndex<'a>,
    running: Option<Mesh>,
    next: usize,
    failed: bool,
}

impl<'a> FeatureChain<'a> {
    /// Prepare the walk, fast-forwarding to the last cached feature.
    pub fn new(body: &'a Body, cache: &'a GeometryCache, config: &'a EngineConfig) -> Self {
        let mut chain = Self {
            body,
            cache,
            config,
            sketches: SketchIndex::new(),
            running: None,
            next: 0,
            failed: false,
        };
        if let Some(index) = body.checkpoint_index() {
            for feature in &body.features[..index] {
                chain.sketches.observe(feature);
            }
            chain.running = body.features[index].cached_mesh.clone();
            chain.next = index + 1;
            debug!(
                body = %body.id,
                skipped = index + 1,
                "fast-forwarded to cached feature"
            );
        }
        chain
    }

    /// The feature the next [`FeatureChain::step`] will evaluate.
    pub fn next_feature(&self) -> Option<&'a Feature> {
        if self.failed {
            return None;
        }
        self.body.features.get(self.next)
    }

    pub fn running(&self) -> Option<&Mesh> {
        self.running.as_ref()
    }

    /// Evaluate the next feature. Returns None once the list is exhausted or
    /// a feature has failed.
    pub fn step(&mut self, kernel: &mut dyn GeometryKernel) -> Option<StepOutcome> {
        let feature = self.next_feature()?;
        self.next += 1;

        let outcome = match self.apply(feature, kernel) {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(
                    body = %self.body.id,
                    feature = %feature.id,
                    name = %feature.name,
                    %error,
                    "feature evaluation failed"
                );
                self.failed = true;
                StepOutcome::Failed(FeatureFailure {
                    feature_id: feature.id,
                    error,
                })
            }
        };
        if let StepOutcome::Skipped { reason } = &outcome {
            warn!(body = %self.body.id, feature = %feature.id, %reason, "feature skipped");
        }
        Some(outcome)
    }

    /// Run to the end and collect the result.
    pub fn run(mut self, kernel: &mut dyn GeometryKernel) -> BodyEvaluation {
        let mut evaluation = BodyEvaluation {
            body_id: self.body.id,
            mesh: None,
            commits: Vec::new(),
            failure: None,
            skipped: Vec::new(),
            warnings: Vec::new(),
        };
        while let Some(feature) = self.next_feature() {
            let id = feature.id;
            match self.step(kernel) {
                Some(StepOutcome::Committed(commit)) => evaluation.commits.push(commit),
                Some(StepOutcome::Skipped { reason }) => {
                    evaluation.skipped.push(id);
                    evaluation.warnings.push(reason);
                }
                Some(StepOutcome::Failed(failure)) => evaluation.failure = Some(failure),
                _ => {}
            }
        }
        if evaluation.failure.is_none() {
            evaluation.mesh = self.running;
        }
        evaluation
    }

    fn apply(
        &mut self,
        feature: &'a Feature,
        kernel: &mut dyn GeometryKernel,
    ) -> Result<StepOutcome, EngineError> {
        match &feature.operation {
            Operation::Sketch { .. } => {
                self.sketches.observe(feature);
                Ok(StepOutcome::Applied)
            }

            Operation::BasePrimitive {
                primitive,
                transform,
            } => {
                let created = execute_primitive(kernel, primitive, transform)?;
                self.add_geometry(kernel, created)?;
                Ok(StepOutcome::Applied)
            }

            Operation::Extrude { .. } | Operation::Revolve { .. } if feature.is_cut() => {
                self.apply_cut(feature, kernel)
            }

            Operation::Extrude { params } => {
                let Some(sketch) = self.sketches.get(params.sketch_id) else {
                    return Ok(dangling_sketch(params.sketch_id));
                };
                let created = execute_extrude(
                    kernel,
                    sketch.sketch,
                    sketch.transform,
                    params,
                    &self.config.cut_settings(),
                )?;
                self.add_geometry(kernel, created)?;
                Ok(StepOutcome::Applied)
            }

            Operation::Revolve { params } => {
                let Some(sketch) = self.sketches.get(params.sketch_id) else {
                    return Ok(dangling_sketch(params.sketch_id));
                };
                let created = execute_revolve(kernel, sketch.sketch, sketch.transform, params)?;
                self.add_geometry(kernel, created)?;
                Ok(StepOutcome::Applied)
            }

            Operation::BooleanModify { params } => {
                if params.tool_body_id == self.body.id {
                    return Ok(StepOutcome::Skipped {
                        reason: "body cannot be its own boolean tool".to_string(),
                    });
                }
                let cache = self.cache;
                let Some(tool) = cache.get(params.tool_body_id) else {
                    return Ok(StepOutcome::Skipped {
                        reason: format!("tool body {} has no geometry", params.tool_body_id),
                    });
                };
                match (self.running.take(), params.op) {
                    (Some(running), op) => {
                        let result = execute_boolean(kernel, &running, tool, op)?;
                        self.running = Some(result.mesh);
                        Ok(StepOutcome::Applied)
                    }
                    (None, BooleanOp::Union) => {
                        self.running = Some(tool.clone());
                        Ok(StepOutcome::Applied)
                    }
                    (None, op) => Ok(StepOutcome::Skipped {
                        reason: format!("{op:?} with no body geometry"),
                    }),
                }
            }

            Operation::Fillet3d { params } => {
                let Some(running) = self.running.as_ref() else {
                    return Ok(no_geometry("fillet"));
                };
                let result = execute_fillet(kernel, running, params)?;
                self.running = Some(result.mesh);
                Ok(StepOutcome::Applied)
            }

            Operation::Chamfer3d { params } => {
                let Some(running) = self.running.as_ref() else {
                    return Ok(no_geometry("chamfer"));
                };
                let result = execute_chamfer(kernel, running, params)?;
                self.running = Some(result.mesh);
                Ok(StepOutcome::Applied)
            }
        }
    }

    fn apply_cut(
        &mut self,
        feature: &'a Feature,
        kernel: &mut dyn GeometryKernel,
    ) -> Result<StepOutcome, EngineError> {
        if let Some(cached) = &feature.cached_mesh {
            self.running = Some(cached.clone());
            return Ok(StepOutcome::Checkpoint);
        }
        let Some(base) = self.running.as_ref() else {
            return Ok(no_geometry("cut"));
        };
        let Some(sketch_id) = feature.sketch_ref() else {
            return Ok(dangling_sketch(feature.id));
        };
        let Some(sketch) = self.sketches.get(sketch_id) else {
            return Ok(dangling_sketch(sketch_id));
        };

        let tool = match &feature.operation {
            Operation::Extrude { params } => execute_extrude(
                kernel,
                sketch.sketch,
                sketch.transform,
                params,
                &self.config.cut_settings(),
            )?,
            Operation::Revolve { params } => {
                execute_revolve(kernel, sketch.sketch, sketch.transform, params)?
            }
            _ => return Ok(dangling_sketch(sketch_id)),
        };
        let result = execute_cut(kernel, base, &tool.mesh)?;

        let commit = CacheCommit {
            feature_id: feature.id,
            cached_mesh: result.mesh.clone(),
            base_mesh: base.clone(),
        };
        self.running = Some(result.mesh);
        Ok(StepOutcome::Committed(commit))
    }

    fn add_geometry(
        &mut self,
        kernel: &mut dyn GeometryKernel,
        created: OpResult,
    ) -> Result<(), EngineError> {
        self.running = Some(match self.running.take() {
            Some(running) => {
                execute_boolean(kernel, &running, &created.mesh, BooleanOp::Union)?.mesh
            }
            None => created.mesh,
        });
        Ok(())
    }
}

fn dangling_sketch(sketch_id: FeatureId) -> StepOutcome {
    StepOutcome::Skipped {
        reason: format!("sketch {sketch_id} is not an earlier feature of this body"),
    }
}

fn no_geometry(what: &str) -> StepOutcome {
    StepOutcome::Skipped {
        reason: format!("{what} with no body geometry"),
    }
}

/// Evaluate a body in full.
pub fn evaluate_body(
    body: &Body,
    cache: &GeometryCache,
    config: &EngineConfig,
    kernel: &mut dyn GeometryKernel,
) -> BodyEvaluation {
    FeatureChain::new(body, cache, config).run(kernel)
}

/// Evaluate a body and publish its mesh to the cache. A failed or empty
/// body has its cache entry removed so dependents see it as missing.
pub fn evaluate_into_cache(
    body: &Body,
    cache: &mut GeometryCache,
    config: &EngineConfig,
    kernel: &mut dyn GeometryKernel,
) -> BodyEvaluation {
    let evaluation = evaluate_body(body, cache, config, kernel);
    publish(&evaluation, cache);
    evaluation
}

pub(crate) fn publish(evaluation: &BodyEvaluation, cache: &mut GeometryCache) {
    match &evaluation.mesh {
        Some(mesh) => cache.set(evaluation.body_id, mesh.clone()),
        None => {
            cache.clear(evaluation.body_id);
        }
    }
}
