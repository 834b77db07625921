//! Scene to glTF 2.0 exporter.
//!
//! Converts an in-memory scene graph into a glTF document whose geometry
//! lives in external, size-bounded binary buffers. Meshes, materials, images
//! and renderables are deduplicated by content hash, so shared geometry is
//! written once regardless of how many placements use it.
//!
//! ```rust,ignore
//! use scene_gltf::{Exporter, ExportSettings, FileAssetStore};
//!
//! let exporter = Exporter::new(ExportSettings::default());
//! let doc = exporter.build(&scene)?;
//! exporter.write(&doc, &FileAssetStore::new("out")).await?;
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod assets;
pub mod errors;
pub mod export;
pub mod gltf;
pub mod hash;
pub mod scene;
pub mod settings;

pub use assets::{AssetCache, AssetStore, FileAssetStore, MemoryAssetStore};
pub use errors::{ExportError, Result};
pub use export::{ExportSummary, Exporter};
pub use gltf::GltfDocument;
pub use hash::{ContentHash, ContentHasher, EntityHandle};
pub use scene::{
    Displayable, DisplayableRenderable, ImageInfo, MaterialInfo, MeshInfo, RenderableMesh,
    RenderableMeshGroup, SceneInstance, SceneSource, Vertex,
};
pub use settings::ExportSettings;
