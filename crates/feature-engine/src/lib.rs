//! Feature-history evaluation for Anvil designs.
//!
//! [`SceneState`] owns the design and its undo history. Bodies are turned
//! into meshes by the feature-chain evaluator ([`evaluate`]), which reads
//! and writes a [`GeometryCache`] so bodies can use each other as boolean
//! tools. [`SceneMeshes`] keeps display meshes current, and the
//! [`RebuildCoordinator`] restores memoized cut results after a load.

pub mod boolean;
pub mod cache;
pub mod cancel;
pub mod config;
pub mod display;
pub mod evaluate;
pub mod rebuild;
pub mod resolve;
pub mod scene;
pub mod sketch_edit;
pub mod tree;
pub mod types;
pub mod undo;

pub use cache::GeometryCache;
pub use cancel::CancelToken;
pub use config::EngineConfig;
pub use display::SceneMeshes;
pub use evaluate::{
    evaluate_body, evaluate_into_cache, BodyEvaluation, CacheCommit, FeatureChain,
    FeatureFailure, StepOutcome,
};
pub use rebuild::{RebuildCoordinator, RebuildReport};
pub use scene::SceneState;
pub use sketch_edit::SketchEditor;
pub use tree::{feature_outline, OutlineNode};
pub use types::*;
pub use undo::History;
