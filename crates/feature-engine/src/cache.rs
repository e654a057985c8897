use std::collections::HashMap;

use anvil_types::{BodyId, Mesh};

/// Latest computed mesh per body, shared between evaluation passes so a
/// body can read another body's result as a boolean operand.
///
/// Never persisted. Passed explicitly to whoever reads or writes it.
#[derive(Debug, Clone, Default)]
pub struct GeometryCache {
    meshes: HashMap<BodyId, Mesh>,
}

impl GeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the mesh for a body, replacing any previous one.
    pub fn set(&mut self, body_id: BodyId, mesh: Mesh) {
        self.meshes.insert(body_id, mesh);
    }

    pub fn get(&self, body_id: BodyId) -> Option<&Mesh> {
        self.meshes.get(&body_id)
    }

    pub fn clear(&mut self, body_id: BodyId) -> Option<Mesh> {
        self.meshes.remove(&body_id)
    }

    pub fn contains(&self, body_id: BodyId) -> bool {
        self.meshes.contains_key(&body_id)
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Drop entries for bodies not in `live`.
    pub fn retain_bodies(&mut self, live: &[BodyId]) {
        self.meshes.retain(|id, _| live.contains(id));
    }

    pub fn clear_all(&mut self) {
        self.meshes.clear();
    }
}
