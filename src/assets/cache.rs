//! Asset Cache
//!
//! Hash-keyed get-or-create tables shared by every task that feeds one
//! export. Meshes, materials, images and renderables are keyed by content
//! hash and deduplicated. Displayables are keyed by identity hash and only
//! tracked for existence.
//!
//! Each table has its own lock and no operation ever holds two of them, so
//! builders are free to populate nested tables (a material builder fetching
//! its image, for instance).

use std::future::Future;
use std::sync::Arc;

use slotmap::new_key_type;
use uuid::Uuid;

use crate::assets::storage::AssetTable;
use crate::errors::{BoxedError, Result};
use crate::hash::ContentHash;
use crate::scene::{Displayable, DisplayableRenderable, ImageInfo, MaterialInfo, MeshInfo};

new_key_type! {
    pub struct DisplayableKey;
    pub struct RenderableKey;
    pub struct MeshKey;
    pub struct MaterialKey;
    pub struct ImageKey;
}

/// Cheap to clone; clones share the same tables.
#[derive(Clone)]
pub struct AssetCache {
    displayables: Arc<AssetTable<DisplayableKey, Displayable>>,
    renderables: Arc<AssetTable<RenderableKey, DisplayableRenderable>>,
    meshes: Arc<AssetTable<MeshKey, MeshInfo>>,
    materials: Arc<AssetTable<MaterialKey, MaterialInfo>>,
    images: Arc<AssetTable<ImageKey, ImageInfo>>,
}

impl Default for AssetCache {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            displayables: Arc::new(AssetTable::new("displayable")),
            renderables: Arc::new(AssetTable::new("renderable")),
            meshes: Arc::new(AssetTable::new("mesh")),
            materials: Arc::new(AssetTable::new("material")),
            images: Arc::new(AssetTable::new("image")),
        }
    }

    // ========================================================================
    // Displayables (identity keyed)
    // ========================================================================

    /// Records a displayable. Returns `false` if it was already known.
    pub fn add_unique_displayable(&self, displayable: Arc<Displayable>) -> bool {
        self.displayables
            .insert_unique(displayable.content_hash(), displayable)
    }

    #[must_use]
    pub fn get_displayable(&self, hash: ContentHash) -> Option<Arc<Displayable>> {
        self.displayables.get(hash)
    }

    // ========================================================================
    // Content-keyed tables
    // ========================================================================

    pub fn get_or_create_renderable<F, E>(
        &self,
        hash: ContentHash,
        build: F,
    ) -> Result<Arc<DisplayableRenderable>>
    where
        F: FnOnce() -> std::result::Result<DisplayableRenderable, E>,
        E: Into<BoxedError>,
    {
        self.renderables.get_or_create(hash, build)
    }

    pub fn get_or_create_mesh<F, E>(&self, hash: ContentHash, build: F) -> Result<Arc<MeshInfo>>
    where
        F: FnOnce() -> std::result::Result<MeshInfo, E>,
        E: Into<BoxedError>,
    {
        self.meshes.get_or_create(hash, build)
    }

    pub fn get_or_create_material<F, E>(
        &self,
        hash: ContentHash,
        build: F,
    ) -> Result<Arc<MaterialInfo>>
    where
        F: FnOnce() -> std::result::Result<MaterialInfo, E>,
        E: Into<BoxedError>,
    {
        self.materials.get_or_create(hash, build)
    }

    /// Image builders decode and may be slow; they run without the lock.
    pub async fn get_or_create_image<F, Fut, E>(
        &self,
        hash: ContentHash,
        build: F,
    ) -> Result<Arc<ImageInfo>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<ImageInfo, E>>,
        E: Into<BoxedError>,
    {
        self.images.get_or_create_async(hash, build).await
    }

    // ========================================================================
    // Interning already-built values
    // ========================================================================

    /// The stored renderable equal in content to `renderable`, storing it if
    /// none exists yet.
    pub fn intern_renderable(
        &self,
        renderable: &Arc<DisplayableRenderable>,
    ) -> Arc<DisplayableRenderable> {
        self.renderables
            .get_or_insert(renderable.content_hash(), renderable.clone())
    }

    pub fn intern_mesh(&self, mesh: &Arc<MeshInfo>) -> Arc<MeshInfo> {
        self.meshes.get_or_insert(mesh.content_hash(), mesh.clone())
    }

    pub fn intern_material(&self, material: &Arc<MaterialInfo>) -> Arc<MaterialInfo> {
        self.materials
            .get_or_insert(material.content_hash(), material.clone())
    }

    pub fn intern_image(&self, image: &Arc<ImageInfo>) -> Arc<ImageInfo> {
        self.images.get_or_insert(image.content_hash(), image.clone())
    }

    #[must_use]
    pub fn get_image(&self, hash: ContentHash) -> Option<Arc<ImageInfo>> {
        self.images.get(hash)
    }

    /// Smallest stored image of `identifier` whose sides both fit within
    /// `size_constraint`. Used to find reduced-resolution copies.
    #[must_use]
    pub fn find_image(&self, identifier: Uuid, size_constraint: u32) -> Option<Arc<ImageInfo>> {
        let guard = self.images.read_lock();
        let mut best: Option<&Arc<ImageInfo>> = None;
        for image in guard.map.values() {
            if image.identifier != identifier || !image.fits_within(size_constraint) {
                continue;
            }
            match best {
                Some(current) if current.width <= image.width && current.height <= image.height => {}
                _ => best = Some(image),
            }
        }
        best.cloned()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub fn displayables(&self) -> &AssetTable<DisplayableKey, Displayable> {
        &self.displayables
    }

    #[must_use]
    pub fn renderables(&self) -> &AssetTable<RenderableKey, DisplayableRenderable> {
        &self.renderables
    }

    #[must_use]
    pub fn meshes(&self) -> &AssetTable<MeshKey, MeshInfo> {
        &self.meshes
    }

    #[must_use]
    pub fn materials(&self) -> &AssetTable<MaterialKey, MaterialInfo> {
        &self.materials
    }

    #[must_use]
    pub fn images(&self) -> &AssetTable<ImageKey, ImageInfo> {
        &self.images
    }

    pub fn clear(&self) {
        self.displayables.clear();
        self.renderables.clear();
        self.meshes.clear();
        self.materials.clear();
        self.images.clear();
    }
}
