//! Project file persistence.
//!
//! A project file is pretty-printed JSON: a format identifier, a version
//! number, project metadata and the scene. Older versions are migrated on
//! load; newer ones are rejected.

pub mod errors;
pub mod load;
pub mod metadata;
pub mod migrate;
pub mod save;

pub use errors::{LoadError, SaveError};
pub use load::load_project;
pub use metadata::ProjectMetadata;
pub use save::{save_project, save_project_with, SaveOptions, FORMAT_ID, FORMAT_VERSION};
