use std::sync::Arc;

use glam::{Quat, Vec3};

use crate::hash::EntityHandle;
use crate::scene::displayable::Displayable;

/// One placement of a root displayable in world space.
#[derive(Debug, Clone)]
pub struct SceneInstance {
    handle: EntityHandle,
    pub position: Vec3,
    pub rotation: Quat,
    pub representation: Arc<Displayable>,
}

impl SceneInstance {
    #[must_use]
    pub fn new(representation: Arc<Displayable>, position: Vec3, rotation: Quat) -> Self {
        Self {
            handle: EntityHandle::new(),
            position,
            rotation,
            representation,
        }
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> EntityHandle {
        self.handle
    }
}

/// A fully populated scene, ready for export. Mesh tessellation and image
/// decoding have already happened.
#[derive(Debug, Clone, Default)]
pub struct SceneSource {
    pub name: String,
    pub instances: Vec<SceneInstance>,
}

impl SceneSource {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instances: Vec::new(),
        }
    }

    pub fn add_instance(&mut self, instance: SceneInstance) -> &mut Self {
        self.instances.push(instance);
        self
    }
}
