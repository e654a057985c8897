//! Test harness for scripted modeling sessions.
//!
//! Provides a fluent builder over the scene model, evaluator and rebuild
//! coordinator, plus fixtures and assertions for checking the meshes they
//! produce.
//!
//! # Key Components
//!
//! - [`ModelBuilder`]: fluent API for building and verifying scenes by name
//! - [`helpers`]: error type, sketch and feature fixtures, mesh math
//! - [`assertions`]: assertion helpers with diagnostics

pub mod assertions;
pub mod helpers;
pub mod workflow;

pub use helpers::HarnessError;
pub use workflow::ModelBuilder;
