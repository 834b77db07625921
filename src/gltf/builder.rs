//! Scene Graph Materializer
//!
//! Walks scene instances and registers glTF nodes, meshes, primitives,
//! materials, textures and images in a [`GltfDocument`]. Every entity is
//! looked up by hash before it is built, so shared geometry yields one glTF
//! mesh no matter how many placements reference it.
//!
//! This pass is purely structural. Accessors, buffer views and buffers are
//! left for the packer.

use std::sync::Arc;

use glam::Vec3;
use serde_json::Value;

use crate::assets::AssetCache;
use crate::gltf::document::{
    GltfDocument, GltfImage, GltfMaterial, GltfMesh, GltfNode, GltfPrimitive, GltfScene,
    GltfTexture, ImageKey, MaterialKey, MeshKey, NodeKey, NodeTransform, PrimitiveKey, SceneKey,
    TextureKey, gl,
};
use crate::scene::{
    Displayable, DisplayableRenderable, ImageInfo, MaterialInfo, RenderableMesh, SceneSource,
};
use crate::settings::ExportSettings;

/// Explicit build context: the document under construction plus the shared
/// asset cache it canonicalizes scene data through.
pub struct DocumentBuilder<'a> {
    settings: &'a ExportSettings,
    cache: &'a AssetCache,
    doc: GltfDocument,
}

impl<'a> DocumentBuilder<'a> {
    #[must_use]
    pub fn new(name: impl Into<String>, settings: &'a ExportSettings, cache: &'a AssetCache) -> Self {
        Self {
            settings,
            cache,
            doc: GltfDocument::new(name, settings),
        }
    }

    #[must_use]
    pub fn document(&self) -> &GltfDocument {
        &self.doc
    }

    #[must_use]
    pub fn finish(self) -> GltfDocument {
        self.doc
    }

    /// Adds every instance of `source` as a root node of a new scene, and
    /// makes that scene the document default.
    pub fn add_scene(&mut self, source: &SceneSource) -> SceneKey {
        let mut roots = Vec::with_capacity(source.instances.len());
        for instance in &source.instances {
            let node = self.node_for(&instance.representation);
            if let Some(n) = self.doc.nodes.get_mut(node) {
                n.place(instance.position, instance.rotation);
            }
            roots.push(node);
        }
        let scene = self.doc.scenes.insert(GltfScene {
            id: format!("{}_scene", source.name),
            name: source.name.clone(),
            nodes: roots,
        });
        self.doc.scene = Some(scene);
        if self.settings.log_building {
            log::debug!(
                "DocumentBuilder: scene '{}' with {} instances",
                source.name,
                source.instances.len()
            );
        }
        scene
    }

    /// Node for `displayable`, keyed by its identity hash.
    pub fn node_for(&mut self, displayable: &Arc<Displayable>) -> NodeKey {
        let hash = displayable.content_hash();
        if let Some(existing) = self.doc.nodes.find(hash) {
            return existing;
        }
        self.cache.add_unique_displayable(displayable.clone());

        let mesh = displayable
            .renderable
            .as_ref()
            .map(|renderable| self.mesh_for(renderable));
        let children = displayable
            .children
            .iter()
            .map(|child| self.node_for(child))
            .collect();

        let offset = displayable.offset;
        let node = GltfNode {
            id: format!("{}_node", displayable.handle()),
            name: displayable.name.clone(),
            transform: NodeTransform::Trs {
                translation: offset.position,
                rotation: offset.rotation,
                scale: offset.scale.unwrap_or(Vec3::ONE),
            },
            children,
            mesh,
            extras: serde_json::Map::new(),
        };
        if self.settings.log_building {
            log::debug!(
                "DocumentBuilder: node {} for displayable {hash}, children={}",
                node.id,
                node.children.len()
            );
        }
        self.doc.nodes.insert_keyed(hash, node)
    }

    /// Mesh for a renderable, keyed by its content hash.
    pub fn mesh_for(&mut self, renderable: &Arc<DisplayableRenderable>) -> MeshKey {
        let hash = renderable.content_hash();
        if let Some(existing) = self.doc.meshes.find(hash) {
            return existing;
        }
        let renderable = self.cache.intern_renderable(renderable);

        let primitives: Vec<PrimitiveKey> = match renderable.as_ref() {
            DisplayableRenderable::MeshGroup(group) => group
                .meshes
                .iter()
                .map(|member| self.primitive_for(member))
                .collect(),
        };

        let id = format!("{}_mesh", renderable.handle());
        let mut extras = serde_json::Map::new();
        if self.settings.add_unique_codes {
            extras.insert("uniqueHash".to_string(), Value::String(hash.to_hex()));
        }
        let mesh = GltfMesh {
            name: id.clone(),
            id,
            source_hash: hash,
            primitives,
            extras,
        };
        if self.settings.log_building {
            log::debug!(
                "DocumentBuilder: mesh {} for renderable {hash}, primitives={}",
                mesh.id,
                mesh.primitives.len()
            );
        }
        self.doc.meshes.insert_keyed(hash, mesh)
    }

    /// Primitive for one mesh/material pairing, keyed by its content hash.
    pub fn primitive_for(&mut self, renderable_mesh: &RenderableMesh) -> PrimitiveKey {
        let hash = renderable_mesh.content_hash();
        if let Some(existing) = self.doc.primitives.find(hash) {
            return existing;
        }
        let mesh = self.cache.intern_mesh(&renderable_mesh.mesh);
        let material = self.material_for(&renderable_mesh.material);
        let primitive = GltfPrimitive {
            id: format!("{}_prim", renderable_mesh.handle()),
            source_hash: hash,
            mesh,
            material,
            mode: gl::TRIANGLES,
            indices: None,
            position: None,
            normal: None,
            texcoord: None,
        };
        if self.settings.log_building {
            log::debug!(
                "DocumentBuilder: primitive {} mesh={}",
                primitive.id,
                primitive.mesh
            );
        }
        self.doc.primitives.insert_keyed(hash, primitive)
    }

    pub fn material_for(&mut self, material: &Arc<MaterialInfo>) -> MaterialKey {
        let hash = material.content_hash();
        if let Some(existing) = self.doc.materials.find(hash) {
            return existing;
        }
        let material = self.cache.intern_material(material);

        let base_color_texture = material.image.as_ref().map(|image| self.texture_for(image));
        let gltf_material = GltfMaterial {
            id: format!("{}_mat", material.handle()),
            name: format!("pbrmat-{hash}"),
            source_hash: hash,
            base_color_factor: material.rgba,
            base_color_texture,
            metallic_factor: material
                .shininess
                .map_or(0.0, |s| (s / 256.0).clamp(0.0, 1.0)),
            emissive_factor: material
                .glow
                .filter(|g| *g > 0.0)
                .map(|g| Vec3::splat(g.clamp(0.0, 1.0))),
            alpha_blend: material.is_translucent(),
            double_sided: self.settings.double_sided,
        };
        if self.settings.log_building {
            log::debug!(
                "DocumentBuilder: material {} textured={}",
                gltf_material.name,
                gltf_material.base_color_texture.is_some()
            );
        }
        self.doc.materials.insert_keyed(hash, gltf_material)
    }

    /// Texture for an image, after the image has been reduced to the
    /// configured maximum size. Keyed by the hash of the image actually used.
    pub fn texture_for(&mut self, image: &Arc<ImageInfo>) -> TextureKey {
        let image = self.sized_image(image);
        let hash = image.content_hash();
        if let Some(existing) = self.doc.textures.find(hash) {
            return existing;
        }
        let source = self.image_for(&image);
        let texture = GltfTexture {
            id: format!("{}_tex", image.handle()),
            source_hash: hash,
            source,
            sampler: self.doc.default_sampler(),
        };
        self.doc.textures.insert_keyed(hash, texture)
    }

    pub fn image_for(&mut self, image: &Arc<ImageInfo>) -> ImageKey {
        let hash = image.content_hash();
        if let Some(existing) = self.doc.images.find(hash) {
            return existing;
        }
        let gltf_image = GltfImage {
            id: format!("{}_img", image.handle()),
            name: image.identifier.to_string(),
            source_hash: hash,
            uri: format!("{}{}", self.settings.uri_base, image.filename()),
            info: image.clone(),
        };
        if self.settings.log_building {
            log::debug!(
                "DocumentBuilder: image {} {}x{}",
                gltf_image.uri,
                image.width,
                image.height
            );
        }
        self.doc.images.insert_keyed(hash, gltf_image)
    }

    /// The image to export for `image`: a reduced copy when it exceeds the
    /// texture size limit, reusing any reduction already in the cache.
    fn sized_image(&self, image: &Arc<ImageInfo>) -> Arc<ImageInfo> {
        let image = self.cache.intern_image(image);
        if let Some(max) = self.settings.texture_constraint()
            && image.resizable
            && !image.fits_within(max)
        {
            if let Some(found) = self.cache.find_image(image.identifier, max) {
                return found;
            }
            if let Some(reduced) = image.constrained(max) {
                return self.cache.intern_image(&Arc::new(reduced));
            }
        }
        image
    }
}
