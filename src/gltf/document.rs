//! glTF Document Model
//!
//! The document root owns one [`Collection`] per glTF array. Entities refer to
//! each other by slotmap key; keys turn into integer reference indices only
//! when the document is serialized.

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3, Vec4};
use serde_json::{Map, Value};
use slotmap::new_key_type;

use crate::gltf::collection::Collection;
use crate::hash::ContentHash;
use crate::scene::{ImageInfo, MeshInfo};
use crate::settings::ExportSettings;

new_key_type! {
    pub struct SceneKey;
    pub struct NodeKey;
    pub struct MeshKey;
    pub struct PrimitiveKey;
    pub struct MaterialKey;
    pub struct TextureKey;
    pub struct ImageKey;
    pub struct SamplerKey;
    pub struct AccessorKey;
    pub struct BufferViewKey;
    pub struct BufferKey;
}

/// glTF version written into `asset.version`.
pub const GLTF_VERSION: &str = "2.0";

// ============================================================================
// GL Constants
// ============================================================================

pub mod gl {
    pub const TRIANGLES: u32 = 4;

    pub const LINEAR: u32 = 9729;
    pub const LINEAR_MIPMAP_LINEAR: u32 = 9987;
    pub const REPEAT: u32 = 10497;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    UnsignedShort,
    UnsignedInt,
    Float,
}

impl ComponentType {
    #[must_use]
    pub const fn gl_enum(self) -> u32 {
        match self {
            Self::UnsignedShort => 5123,
            Self::UnsignedInt => 5125,
            Self::Float => 5126,
        }
    }

    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::UnsignedShort => 2,
            Self::UnsignedInt | Self::Float => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorType {
    Scalar,
    Vec2,
    Vec3,
}

impl AccessorType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scalar => "SCALAR",
            Self::Vec2 => "VEC2",
            Self::Vec3 => "VEC3",
        }
    }

    #[must_use]
    pub const fn components(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferTarget {
    ArrayBuffer,
    ElementArrayBuffer,
}

impl BufferTarget {
    #[must_use]
    pub const fn gl_enum(self) -> u32 {
        match self {
            Self::ArrayBuffer => 34962,
            Self::ElementArrayBuffer => 34963,
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

#[derive(Debug, Clone)]
pub struct GltfScene {
    pub id: String,
    pub name: String,
    pub nodes: Vec<NodeKey>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeTransform {
    Matrix(Mat4),
    Trs {
        translation: Vec3,
        rotation: Quat,
        scale: Vec3,
    },
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::Trs {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GltfNode {
    pub id: String,
    pub name: String,
    pub transform: NodeTransform,
    pub children: Vec<NodeKey>,
    pub mesh: Option<MeshKey>,
    pub extras: Map<String, Value>,
}

impl GltfNode {
    /// Replaces translation and rotation, keeping any scale.
    pub fn place(&mut self, translation: Vec3, rotation: Quat) {
        let scale = match self.transform {
            NodeTransform::Trs { scale, .. } => scale,
            NodeTransform::Matrix(m) => m.to_scale_rotation_translation().0,
        };
        self.transform = NodeTransform::Trs {
            translation,
            rotation,
            scale,
        };
    }
}

#[derive(Debug, Clone)]
pub struct GltfMesh {
    pub id: String,
    pub name: String,
    /// Hash of the renderable this mesh was built from.
    pub source_hash: ContentHash,
    pub primitives: Vec<PrimitiveKey>,
    pub extras: Map<String, Value>,
}

/// One drawable: a mesh's geometry plus its material.
///
/// The accessor fields stay `None` until the buffer packer runs.
#[derive(Debug, Clone)]
pub struct GltfPrimitive {
    pub id: String,
    pub source_hash: ContentHash,
    pub mesh: Arc<MeshInfo>,
    pub material: MaterialKey,
    pub mode: u32,
    pub indices: Option<AccessorKey>,
    pub position: Option<AccessorKey>,
    pub normal: Option<AccessorKey>,
    pub texcoord: Option<AccessorKey>,
}

/// pbrMetallicRoughness material.
#[derive(Debug, Clone)]
pub struct GltfMaterial {
    pub id: String,
    pub name: String,
    pub source_hash: ContentHash,
    pub base_color_factor: Vec4,
    pub base_color_texture: Option<TextureKey>,
    pub metallic_factor: f32,
    pub emissive_factor: Option<Vec3>,
    pub alpha_blend: bool,
    pub double_sided: bool,
}

#[derive(Debug, Clone)]
pub struct GltfTexture {
    pub id: String,
    pub source_hash: ContentHash,
    pub source: ImageKey,
    pub sampler: SamplerKey,
}

#[derive(Debug, Clone)]
pub struct GltfImage {
    pub id: String,
    pub name: String,
    pub source_hash: ContentHash,
    pub info: Arc<ImageInfo>,
    pub uri: String,
}

impl GltfImage {
    #[must_use]
    pub fn filename(&self) -> String {
        self.info.filename()
    }
}

#[derive(Debug, Clone)]
pub struct GltfSampler {
    pub id: String,
    pub name: String,
    pub mag_filter: u32,
    pub min_filter: u32,
    pub wrap_s: u32,
    pub wrap_t: u32,
}

/// Accessor `min`/`max` payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Bounds {
    Float(Vec<f32>),
    Unsigned(Vec<u32>),
}

#[derive(Debug, Clone)]
pub struct GltfAccessor {
    pub id: String,
    pub buffer_view: BufferViewKey,
    pub byte_offset: usize,
    pub component_type: ComponentType,
    pub count: usize,
    pub kind: AccessorType,
    pub min: Option<Bounds>,
    pub max: Option<Bounds>,
}

#[derive(Debug, Clone)]
pub struct GltfBufferView {
    pub id: String,
    pub name: String,
    pub buffer: BufferKey,
    pub byte_offset: usize,
    pub byte_length: usize,
    /// Vertex views only.
    pub byte_stride: Option<usize>,
    pub target: BufferTarget,
}

#[derive(Debug, Clone)]
pub struct GltfBuffer {
    pub id: String,
    pub name: String,
    pub source_hash: ContentHash,
    pub bytes: Arc<Vec<u8>>,
    pub uri: String,
}

impl GltfBuffer {
    #[must_use]
    pub fn filename(&self) -> String {
        buffer_filename(self.source_hash)
    }
}

#[must_use]
pub fn buffer_filename(hash: ContentHash) -> String {
    format!("{hash}.buf")
}

// ============================================================================
// Document Root
// ============================================================================

#[derive(Debug, Clone)]
pub struct AssetInfo {
    pub generator: String,
    pub copyright: String,
    /// Name of the scene this document was exported from.
    pub source: Option<String>,
}

/// How far a document has progressed through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DocumentStage {
    Materialized,
    Packed,
    Resolved,
}

pub struct GltfDocument {
    pub name: String,
    pub asset: AssetInfo,
    pub scene: Option<SceneKey>,

    pub scenes: Collection<SceneKey, GltfScene>,
    pub nodes: Collection<NodeKey, GltfNode>,
    pub meshes: Collection<MeshKey, GltfMesh>,
    pub primitives: Collection<PrimitiveKey, GltfPrimitive>,
    pub materials: Collection<MaterialKey, GltfMaterial>,
    pub textures: Collection<TextureKey, GltfTexture>,
    pub images: Collection<ImageKey, GltfImage>,
    pub samplers: Collection<SamplerKey, GltfSampler>,
    pub accessors: Collection<AccessorKey, GltfAccessor>,
    pub buffer_views: Collection<BufferViewKey, GltfBufferView>,
    pub buffers: Collection<BufferKey, GltfBuffer>,

    extensions_used: Vec<String>,
    extensions_required: Vec<String>,
    default_sampler: SamplerKey,
    stage: DocumentStage,
}

impl GltfDocument {
    /// An empty document holding only the default repeating sampler.
    #[must_use]
    pub fn new(name: impl Into<String>, settings: &ExportSettings) -> Self {
        let mut samplers = Collection::new();
        let default_sampler = samplers.insert(GltfSampler {
            id: "simpleTextureRepeat".to_string(),
            name: "simpleTextureRepeat".to_string(),
            mag_filter: gl::LINEAR,
            min_filter: gl::LINEAR_MIPMAP_LINEAR,
            wrap_s: gl::REPEAT,
            wrap_t: gl::REPEAT,
        });
        let name = name.into();
        Self {
            asset: AssetInfo {
                generator: settings.generator.clone(),
                copyright: settings.copyright.clone(),
                source: (!name.is_empty()).then(|| name.clone()),
            },
            name,
            scene: None,
            scenes: Collection::new(),
            nodes: Collection::new(),
            meshes: Collection::new(),
            primitives: Collection::new(),
            materials: Collection::new(),
            textures: Collection::new(),
            images: Collection::new(),
            samplers,
            accessors: Collection::new(),
            buffer_views: Collection::new(),
            buffers: Collection::new(),
            extensions_used: Vec::new(),
            extensions_required: Vec::new(),
            default_sampler,
            stage: DocumentStage::Materialized,
        }
    }

    #[inline]
    #[must_use]
    pub fn default_sampler(&self) -> SamplerKey {
        self.default_sampler
    }

    /// Records that the document uses `extension`. A required extension is
    /// listed in both sets. Order of first use is kept.
    pub fn use_extension(&mut self, extension: impl Into<String>, required: bool) {
        let extension = extension.into();
        if required && !self.extensions_required.contains(&extension) {
            self.extensions_required.push(extension.clone());
        }
        if !self.extensions_used.contains(&extension) {
            self.extensions_used.push(extension);
        }
    }

    #[must_use]
    pub fn extensions_used(&self) -> &[String] {
        &self.extensions_used
    }

    /// Subset of [`Self::extensions_used`] a loader must support.
    #[must_use]
    pub fn extensions_required(&self) -> &[String] {
        &self.extensions_required
    }

    #[inline]
    #[must_use]
    pub fn stage(&self) -> DocumentStage {
        self.stage
    }

    pub(crate) fn set_stage(&mut self, stage: DocumentStage) {
        self.stage = stage;
    }

    /// Filename the JSON document is stored under.
    #[must_use]
    pub fn filename(&self) -> String {
        let stem = if self.name.is_empty() { "scene" } else { &self.name };
        format!("{stem}.gltf")
    }
}
