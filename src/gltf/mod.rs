//! glTF 2.0 document model and the passes that fill, pack and serialize it.

pub mod builder;
pub mod collection;
pub mod document;
pub mod json;
pub mod packer;
pub mod resolve;

pub use builder::DocumentBuilder;
pub use collection::Collection;
pub use document::{
    AccessorType, Bounds, BufferTarget, ComponentType, DocumentStage, GltfAccessor, GltfBuffer,
    GltfBufferView, GltfDocument, GltfImage, GltfMaterial, GltfMesh, GltfNode, GltfPrimitive,
    GltfSampler, GltfScene, GltfTexture, NodeTransform,
};
pub use json::{to_json_string, to_json_value};
pub use packer::{ChannelBounds, VertexGroup, pack, partition_by_vertex_budget};
pub use resolve::resolve;
