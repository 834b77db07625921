use std::fmt;

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use parking_lot::Mutex;

use crate::hash::{ContentAddressed, ContentHash, ContentHasher, EntityHandle};

/// One tessellated vertex: position, normal and texture coordinate.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

impl Vertex {
    #[must_use]
    pub const fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }

    /// Join key used when merging vertices across primitives.
    #[must_use]
    pub fn content_hash(&self) -> ContentHash {
        let mut hasher = ContentHasher::new();
        self.feed(&mut hasher);
        hasher.finish()
    }

    fn feed(&self, hasher: &mut ContentHasher) {
        hasher
            .add_vec3(self.position)
            .add_vec3(self.normal)
            .add_vec2(self.uv);
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedHash {
    hash: ContentHash,
    vertex_count: usize,
    index_count: usize,
}

/// Geometry of one face: a triangle list over its own vertex list.
///
/// The hash covers vertices, indices, face center and scale, in that order.
/// It is cached on first use and recomputed when the vertex or index count no
/// longer matches the counts it was computed for.
#[derive(Debug)]
pub struct MeshInfo {
    handle: EntityHandle,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub face_center: Vec3,
    /// Scale already applied to the vertices. Part of the hash.
    pub scale: Vec3,
    cached: Mutex<Option<CachedHash>>,
}

impl Default for MeshInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshInfo {
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(Vec::new(), Vec::new())
    }

    #[must_use]
    pub fn from_parts(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            handle: EntityHandle::new(),
            vertices,
            indices,
            face_center: Vec3::ZERO,
            scale: Vec3::ONE,
            cached: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_face_center(mut self, face_center: Vec3) -> Self {
        self.face_center = face_center;
        self
    }

    #[must_use]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Same data under a fresh handle.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self {
            handle: EntityHandle::new(),
            vertices: self.vertices.clone(),
            indices: self.indices.clone(),
            face_center: self.face_center,
            scale: self.scale,
            cached: Mutex::new(*self.cached.lock()),
        }
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> EntityHandle {
        self.handle
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    #[must_use]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    #[must_use]
    pub fn content_hash(&self) -> ContentHash {
        let mut cached = self.cached.lock();
        if let Some(c) = *cached
            && c.vertex_count == self.vertices.len()
            && c.index_count == self.indices.len()
        {
            return c.hash;
        }
        let hash = self.compute_hash();
        *cached = Some(CachedHash {
            hash,
            vertex_count: self.vertices.len(),
            index_count: self.indices.len(),
        });
        hash
    }

    /// Recomputes the hash even if the cached one looks current.
    pub fn content_hash_forced(&self) -> ContentHash {
        let hash = self.compute_hash();
        *self.cached.lock() = Some(CachedHash {
            hash,
            vertex_count: self.vertices.len(),
            index_count: self.indices.len(),
        });
        hash
    }

    fn compute_hash(&self) -> ContentHash {
        let mut hasher = ContentHasher::new();
        for vertex in &self.vertices {
            vertex.feed(&mut hasher);
        }
        for &index in &self.indices {
            hasher.add_u32(index);
        }
        hasher.add_vec3(self.face_center).add_vec3(self.scale);
        hasher.finish()
    }
}

impl ContentAddressed for MeshInfo {
    fn content_hash(&self) -> ContentHash {
        MeshInfo::content_hash(self)
    }
}

impl fmt::Display for MeshInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/v={}/i={}",
            self.handle,
            self.vertices.len(),
            self.indices.len()
        )
    }
}
