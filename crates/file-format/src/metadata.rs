use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Project metadata stored alongside the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub name: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl ProjectMetadata {
    /// Metadata with the given name, created now.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            created: now,
            modified: now,
        }
    }

    /// Stamp the modification time.
    pub fn touch(&mut self) {
        self.modified = Utc::now().max(self.created);
    }
}

impl Default for ProjectMetadata {
    fn default() -> Self {
        Self::new("Untitled")
    }
}
