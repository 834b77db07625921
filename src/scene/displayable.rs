//! Displayables and the renderables they carry.
//!
//! A [`Displayable`] is one placement in the logical scene graph. Its identity
//! is its handle: two placements are always two nodes. What gets deduplicated
//! is the [`DisplayableRenderable`] it points at, whose hash is purely a
//! function of content.

use std::sync::Arc;

use glam::{Quat, Vec3};
use smallvec::SmallVec;

use crate::hash::{ContentAddressed, ContentHash, ContentHasher, EntityHandle};
use crate::scene::material::MaterialInfo;
use crate::scene::mesh::MeshInfo;

/// Attribute key marking the root part of a linked object.
pub const ATTR_IS_ROOT: &str = "is-root";

// ============================================================================
// Attribute Bag
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Vector(Vec3),
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec3> for AttributeValue {
    fn from(v: Vec3) -> Self {
        Self::Vector(v)
    }
}

/// Small ordered key to value map. Most displayables carry a handful of
/// attributes at most.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    entries: SmallVec<[(String, AttributeValue); 4]>,
}

impl Attributes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.set(key, value);
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            AttributeValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn get_number(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            AttributeValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            AttributeValue::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn get_vec3(&self, key: &str) -> Option<Vec3> {
        match self.get(key)? {
            AttributeValue::Vector(v) => Some(*v),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Renderables
// ============================================================================

/// One mesh paired with the material it is drawn with.
#[derive(Debug, Clone)]
pub struct RenderableMesh {
    handle: EntityHandle,
    /// Face ordinal within the source object.
    pub num: u32,
    pub mesh: Arc<MeshInfo>,
    pub material: Arc<MaterialInfo>,
}

impl RenderableMesh {
    #[must_use]
    pub fn new(num: u32, mesh: Arc<MeshInfo>, material: Arc<MaterialInfo>) -> Self {
        Self {
            handle: EntityHandle::new(),
            num,
            mesh,
            material,
        }
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> EntityHandle {
        self.handle
    }

    #[must_use]
    pub fn content_hash(&self) -> ContentHash {
        ContentHash::combine(self.mesh.content_hash(), self.material.content_hash())
    }
}

impl ContentAddressed for RenderableMesh {
    fn content_hash(&self) -> ContentHash {
        RenderableMesh::content_hash(self)
    }
}

/// The set of meshes that together draw one object.
#[derive(Debug, Clone, Default)]
pub struct RenderableMeshGroup {
    handle: EntityHandle,
    pub meshes: Vec<Arc<RenderableMesh>>,
}

impl RenderableMeshGroup {
    #[must_use]
    pub fn new(meshes: Vec<Arc<RenderableMesh>>) -> Self {
        Self {
            handle: EntityHandle::new(),
            meshes,
        }
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> EntityHandle {
        self.handle
    }

    /// Member hashes combined in mesh-handle order, so construction order
    /// does not matter.
    #[must_use]
    pub fn content_hash(&self) -> ContentHash {
        let mut members: Vec<&Arc<RenderableMesh>> = self.meshes.iter().collect();
        members.sort_by_key(|m| m.mesh.handle());
        let mut hasher = ContentHasher::new();
        for member in members {
            hasher.add_hash(member.content_hash());
        }
        hasher.finish()
    }
}

/// Shape and appearance payload of a displayable.
#[derive(Debug, Clone)]
pub enum DisplayableRenderable {
    MeshGroup(RenderableMeshGroup),
}

impl DisplayableRenderable {
    #[must_use]
    pub fn handle(&self) -> EntityHandle {
        match self {
            Self::MeshGroup(group) => group.handle(),
        }
    }

    #[must_use]
    pub fn content_hash(&self) -> ContentHash {
        match self {
            Self::MeshGroup(group) => group.content_hash(),
        }
    }
}

impl ContentAddressed for DisplayableRenderable {
    fn content_hash(&self) -> ContentHash {
        DisplayableRenderable::content_hash(self)
    }
}

impl From<RenderableMeshGroup> for DisplayableRenderable {
    fn from(group: RenderableMeshGroup) -> Self {
        Self::MeshGroup(group)
    }
}

// ============================================================================
// Displayable
// ============================================================================

/// Placement relative to the parent displayable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Offset {
    pub position: Vec3,
    pub rotation: Quat,
    /// `None` when scale is baked into the vertices.
    pub scale: Option<Vec3>,
}

impl Default for Offset {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Offset {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: None,
    };

    #[must_use]
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            scale: None,
        }
    }

    #[must_use]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = Some(scale);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Displayable {
    handle: EntityHandle,
    pub name: String,
    pub offset: Offset,
    pub renderable: Option<Arc<DisplayableRenderable>>,
    pub children: Vec<Arc<Displayable>>,
    pub attributes: Attributes,
}

impl Displayable {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            handle: EntityHandle::new(),
            name: name.into(),
            offset: Offset::IDENTITY,
            renderable: None,
            children: Vec::new(),
            attributes: Attributes::new(),
        }
    }

    /// Builds a displayable from source-object data.
    ///
    /// Root parts sit at their instance's transform, so their offset is
    /// reset. The source scale is kept only when scaling is left to the
    /// renderer; otherwise it is assumed to be baked into the vertices.
    #[must_use]
    pub fn from_source(
        name: impl Into<String>,
        renderable: Option<Arc<DisplayableRenderable>>,
        offset: Offset,
        attributes: Attributes,
        display_time_scaling: bool,
    ) -> Self {
        let is_root = attributes.get_bool(ATTR_IS_ROOT).unwrap_or(false);
        let mut placed = if is_root {
            Offset::IDENTITY
        } else {
            Offset::new(offset.position, offset.rotation)
        };
        if display_time_scaling {
            placed.scale = offset.scale;
        }
        Self {
            handle: EntityHandle::new(),
            name: name.into(),
            offset: placed,
            renderable,
            children: Vec::new(),
            attributes,
        }
    }

    #[must_use]
    pub fn with_renderable(mut self, renderable: Arc<DisplayableRenderable>) -> Self {
        self.renderable = Some(renderable);
        self
    }

    #[must_use]
    pub fn with_offset(mut self, offset: Offset) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: Arc<Displayable>) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes.set(key, value);
        self
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> EntityHandle {
        self.handle
    }

    /// Identity hash. Displayables are never deduplicated by content.
    #[must_use]
    pub fn content_hash(&self) -> ContentHash {
        self.handle.content_hash()
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.attribute_bool(ATTR_IS_ROOT).unwrap_or(false)
    }

    #[must_use]
    pub fn attribute_bool(&self, key: &str) -> Option<bool> {
        self.attributes.get_bool(key)
    }

    #[must_use]
    pub fn attribute_number(&self, key: &str) -> Option<f64> {
        self.attributes.get_number(key)
    }

    #[must_use]
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get_str(key)
    }

    #[must_use]
    pub fn attribute_vec3(&self, key: &str) -> Option<Vec3> {
        self.attributes.get_vec3(key)
    }
}

impl ContentAddressed for Displayable {
    fn content_hash(&self) -> ContentHash {
        Displayable::content_hash(self)
    }
}
