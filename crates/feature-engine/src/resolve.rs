use std::collections::{HashMap, HashSet};

use anvil_types::{Body, BodyId, Feature, FeatureId, Operation, SceneDescription, Sketch, Transform};

/// A sketch feature as seen by the features that consume it.
#[derive(Debug, Clone, Copy)]
pub struct SketchRef<'a> {
    pub sketch: &'a Sketch,
    pub transform: &'a Transform,
}

/// Sketches of one body seen so far in an evaluation pass, by feature id.
///
/// Built incrementally while walking the feature list, so a lookup only
/// succeeds for sketches that come earlier in the body.
#[derive(Debug, Default)]
pub struct SketchIndex<'a> {
    sketches: HashMap<FeatureId, SketchRef<'a>>,
}

impl<'a> SketchIndex<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `feature` if it is a sketch. Returns true if it was.
    pub fn observe(&mut self, feature: &'a Feature) -> bool {
        match &feature.operation {
            Operation::Sketch { sketch, transform } => {
                self.sketches
                    .insert(feature.id, SketchRef { sketch, transform });
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, id: FeatureId) -> Option<SketchRef<'a>> {
        self.sketches.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.sketches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sketches.is_empty()
    }
}

/// Order in which bodies must be evaluated so every tool body is computed
/// before the bodies that read it.
///
/// Stable: independent bodies keep their list order. Bodies caught in a
/// reference cycle are appended in list order.
pub fn evaluation_order(scene: &SceneDescription) -> Vec<BodyId> {
    let ids: HashSet<BodyId> = scene.bodies.iter().map(|b| b.id).collect();
    let tools: Vec<(BodyId, Vec<BodyId>)> = scene
        .bodies
        .iter()
        .map(|b| {
            let deps = b
                .tool_bodies()
                .into_iter()
                .filter(|t| *t != b.id && ids.contains(t))
                .collect();
            (b.id, deps)
        })
        .collect();

    let mut placed: HashSet<BodyId> = HashSet::new();
    let mut order = Vec::with_capacity(tools.len());
    loop {
        let before = order.len();
        for (id, deps) in &tools {
            if !placed.contains(id) && deps.iter().all(|d| placed.contains(d)) {
                placed.insert(*id);
                order.push(*id);
            }
        }
        if order.len() == tools.len() {
            break;
        }
        if order.len() == before {
            for (id, _) in &tools {
                if placed.insert(*id) {
                    order.push(*id);
                }
            }
            break;
        }
    }
    order
}

/// Bodies that read `body_id` as a boolean tool, directly or through other
/// bodies. Does not include `body_id` itself.
pub fn dependent_bodies(scene: &SceneDescription, body_id: BodyId) -> Vec<BodyId> {
    let mut found: Vec<BodyId> = Vec::new();
    let mut frontier = vec![body_id];
    while let Some(current) = frontier.pop() {
        for body in &scene.bodies {
            if body.id != body_id
                && !found.contains(&body.id)
                && body.tool_bodies().contains(&current)
            {
                found.push(body.id);
                frontier.push(body.id);
            }
        }
    }
    found
}

/// Position of the first feature of `body` that reads `tool` as an operand.
pub fn first_use_of(body: &Body, tool: BodyId) -> Option<usize> {
    body.features
        .iter()
        .position(|f| f.operation.tool_body() == Some(tool))
}

/// Features of `body` that consume the sketch `sketch_id`.
pub fn sketch_consumers(body: &Body, sketch_id: FeatureId) -> Vec<FeatureId> {
    body.features
        .iter()
        .filter(|f| f.sketch_ref() == Some(sketch_id))
        .map(|f| f.id)
        .collect()
}
