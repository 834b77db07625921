pub mod cache;
pub mod io;
pub mod storage;

pub use cache::{AssetCache, DisplayableKey, ImageKey, MaterialKey, MeshKey, RenderableKey};
pub use io::{AssetStore, FileAssetStore, MemoryAssetStore};
pub use storage::AssetTable;
