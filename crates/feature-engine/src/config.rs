//! Engine configuration.

use anvil_types::Mesh;
use modeling_ops::CutSettings;
use serde::{Deserialize, Serialize};

/// Tunables of the engine. Every field has a default, so a partial JSON
/// document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Undo depth of the scene history.
    pub scene_history_limit: usize,
    /// Undo depth of a sketch editing session.
    pub sketch_history_limit: usize,
    /// Depth of a cut whose feature leaves it unset.
    pub cut_through_distance: f64,
    /// Overshoot of cut tools past the sketch plane.
    pub cut_clearance: f64,
    /// Segments given to newly created revolves.
    pub revolve_segments: u32,
    /// Edge length of the box shown for a body that failed to evaluate.
    pub placeholder_size: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scene_history_limit: 100,
            sketch_history_limit: 50,
            cut_through_distance: 1000.0,
            cut_clearance: 0.01,
            revolve_segments: 32,
            placeholder_size: 1.0,
        }
    }
}

impl EngineConfig {
    /// Defaults with custom undo depths.
    pub fn with_history_limits(scene: usize, sketch: usize) -> Self {
        Self {
            scene_history_limit: scene,
            sketch_history_limit: sketch,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn cut_settings(&self) -> CutSettings {
        CutSettings {
            through_distance: self.cut_through_distance,
            clearance: self.cut_clearance,
        }
    }

    pub fn placeholder_mesh(&self) -> Mesh {
        Mesh::placeholder(self.placeholder_size)
    }
}
