//! Scene Data Model
//!
//! Immutable-once-built value records supplied by the scene source. Every
//! record exposes a content hash; the exporter never mutates them.

pub mod displayable;
pub mod image;
pub mod instance;
pub mod material;
pub mod mesh;

pub use displayable::{
    ATTR_IS_ROOT, AttributeValue, Attributes, Displayable, DisplayableRenderable, Offset,
    RenderableMesh, RenderableMeshGroup,
};
pub use image::ImageInfo;
pub use instance::{SceneInstance, SceneSource};
pub use material::MaterialInfo;
pub use mesh::{MeshInfo, Vertex};
