//! Export Pipeline Tests
//!
//! Tests for:
//! - Exporter::write: every buffer and image stored, document last
//! - Storage failures abort before the document is written
//! - FileAssetStore: flat and deep filename layouts, fetch errors
//! - Cache sharing across exports

use std::sync::Arc;

use glam::{Quat, Vec2, Vec3, Vec4};
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;
use scene_gltf::assets::AssetStore;
use scene_gltf::scene::{
    Displayable, ImageInfo, MaterialInfo, MeshInfo, RenderableMesh, RenderableMeshGroup,
    SceneInstance, SceneSource, Vertex,
};
use scene_gltf::{
    AssetCache, ExportError, ExportSettings, Exporter, FileAssetStore, MemoryAssetStore, Result,
};
use serde_json::Value;
use uuid::Uuid;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn textured_scene(name: &str, image: Option<Arc<ImageInfo>>) -> SceneSource {
    let mesh = MeshInfo::from_parts(
        vec![
            Vertex::new(Vec3::ZERO, Vec3::Z, Vec2::ZERO),
            Vertex::new(Vec3::X, Vec3::Z, Vec2::X),
            Vertex::new(Vec3::Y, Vec3::Z, Vec2::Y),
        ],
        vec![0, 1, 2],
    );
    let mut material = MaterialInfo::new(Vec4::ONE);
    if let Some(image) = image {
        material = material.with_image(image);
    }
    let member = RenderableMesh::new(0, Arc::new(mesh), Arc::new(material));
    let group = Arc::new(RenderableMeshGroup::new(vec![Arc::new(member)]).into());
    let root = Arc::new(Displayable::new("tile").with_renderable(group));

    let mut scene = SceneSource::new(name);
    scene.add_instance(SceneInstance::new(root, Vec3::ZERO, Quat::IDENTITY));
    scene
}

fn pixels(size: u32) -> Arc<ImageInfo> {
    Arc::new(ImageInfo::from_rgba(
        Uuid::new_v4(),
        RgbaImage::from_pixel(size, size, Rgba([1, 2, 3, 255])),
    ))
}

/// Records store calls and fails on names with the given suffix.
struct FailingStore {
    fail_suffix: &'static str,
    stored: Mutex<Vec<String>>,
}

impl AssetStore for FailingStore {
    async fn store(&self, name: &str, _bytes: &[u8]) -> Result<()> {
        if name.ends_with(self.fail_suffix) {
            return Err(ExportError::StorageFailed {
                name: name.to_string(),
                reason: "disk full".to_string(),
            });
        }
        self.stored.lock().push(name.to_string());
        Ok(())
    }

    async fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        Err(ExportError::StorageFailed {
            name: name.to_string(),
            reason: "write-only".to_string(),
        })
    }
}

// ============================================================================
// Memory Store
// ============================================================================

#[tokio::test]
async fn export_stores_buffers_images_and_document() {
    init_logger();
    let store = MemoryAssetStore::new();
    let exporter = Exporter::new(ExportSettings::default());
    let (doc, summary) = exporter
        .export(&textured_scene("yard", Some(pixels(16))), &store)
        .await
        .unwrap();

    assert_eq!(summary.document, "yard.gltf");
    assert_eq!(summary.buffers.len(), 1);
    assert_eq!(summary.images.len(), 1);
    assert_eq!(store.len(), 3);

    let (_, buffer) = doc.buffers.iter().next().unwrap();
    assert_eq!(summary.buffers[0], buffer.filename());
    assert_eq!(store.get(&buffer.filename()).unwrap(), *buffer.bytes);

    let png = store.get(&summary.images[0]).unwrap();
    let decoded = ImageInfo::decode(Uuid::new_v4(), &png).unwrap();
    assert_eq!((decoded.width, decoded.height), (16, 16));

    let json: Value = serde_json::from_slice(&store.get("yard.gltf").unwrap()).unwrap();
    assert_eq!(json["buffers"][0]["uri"], format!("./{}", buffer.filename()));
    assert_eq!(json["images"][0]["uri"], format!("./{}", summary.images[0]));

    let total: usize = store.names().iter().map(|n| store.get(n).unwrap().len()).sum();
    assert_eq!(summary.bytes_written, total);
}

#[tokio::test]
async fn fetch_returns_stored_bytes() {
    let store = MemoryAssetStore::new();
    store.store("a.buf", &[1, 2, 3]).await.unwrap();
    assert_eq!(store.fetch("a.buf").await.unwrap(), vec![1, 2, 3]);
    assert!(matches!(
        store.fetch("missing.buf").await,
        Err(ExportError::StorageFailed { .. })
    ));
}

#[tokio::test]
async fn undecoded_images_are_not_stored() {
    let image = Arc::new(ImageInfo::undecoded(Uuid::new_v4(), 64, 64));
    let store = MemoryAssetStore::new();
    let (doc, summary) = Exporter::new(ExportSettings::default())
        .export(&textured_scene("remote", Some(image)), &store)
        .await
        .unwrap();

    assert_eq!(doc.images.len(), 1);
    assert!(summary.images.is_empty());
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn shared_cache_reuses_reduced_images() {
    let cache = AssetCache::new();
    let image = pixels(512);
    let store = MemoryAssetStore::new();

    for name in ["first", "second"] {
        let exporter = Exporter::with_cache(ExportSettings::default(), cache.clone());
        exporter
            .export(&textured_scene(name, Some(image.clone())), &store)
            .await
            .unwrap();
    }
    // One original and one reduced copy, shared by both documents.
    assert_eq!(cache.images().len(), 2);
    let pngs: Vec<String> = store
        .names()
        .into_iter()
        .filter(|n| n.ends_with(".png"))
        .collect();
    assert_eq!(pngs.len(), 1);
    assert!(pngs[0].ends_with("_256_256.png"));
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn failed_buffer_store_aborts_before_document() {
    init_logger();
    let store = FailingStore {
        fail_suffix: ".buf",
        stored: Mutex::new(Vec::new()),
    };
    let exporter = Exporter::new(ExportSettings::default());
    let doc = exporter.build(&textured_scene("broken", None)).unwrap();

    let err = exporter.write(&doc, &store).await.unwrap_err();
    assert!(matches!(err, ExportError::StorageFailed { ref name, .. } if name.ends_with(".buf")));
    assert!(!store.stored.lock().iter().any(|n| n.ends_with(".gltf")));
}

#[tokio::test]
async fn failed_document_store_is_reported() {
    let store = FailingStore {
        fail_suffix: ".gltf",
        stored: Mutex::new(Vec::new()),
    };
    let exporter = Exporter::new(ExportSettings::default());
    let result = exporter
        .export(&textured_scene("late", Some(pixels(4))), &store)
        .await;

    assert!(matches!(result, Err(ExportError::StorageFailed { .. })));
    // Buffer and image made it before the document failed.
    assert_eq!(store.stored.lock().len(), 2);
}

#[tokio::test]
async fn invalid_settings_fail_before_building() {
    let exporter = Exporter::new(ExportSettings {
        vertices_max_for_buffer: 0,
        ..ExportSettings::default()
    });
    let result = exporter
        .export(&textured_scene("none", None), &MemoryAssetStore::new())
        .await;
    assert!(matches!(result, Err(ExportError::Settings(_))));
    assert!(exporter.cache().meshes().is_empty());
}

// ============================================================================
// File Store
// ============================================================================

fn scratch_dir() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("scene-gltf-{}", Uuid::new_v4()))
}

#[test]
fn deep_paths_split_on_stem_prefix() {
    let flat = FileAssetStore::new("/out");
    let deep = FileAssetStore::new("/out").with_deep_filenames(true);

    assert_eq!(flat.path_for("abcdef.buf"), std::path::Path::new("/out/abcdef.buf"));
    assert_eq!(
        deep.path_for("abcdef.buf"),
        std::path::Path::new("/out/ab/cd/abcdef.buf")
    );
    // Stems too short to split stay flat.
    assert_eq!(deep.path_for("abc.gltf"), std::path::Path::new("/out/abc.gltf"));
}

#[tokio::test]
async fn file_store_writes_deep_tree() {
    init_logger();
    let root = scratch_dir();
    let store = FileAssetStore::new(&root).with_deep_filenames(true);
    let (doc, summary) = Exporter::new(ExportSettings::default())
        .export(&textured_scene("district", None), &store)
        .await
        .unwrap();

    let (_, buffer) = doc.buffers.iter().next().unwrap();
    let name = buffer.filename();
    let expected = root.join(&name[0..2]).join(&name[2..4]).join(&name);
    assert!(expected.is_file(), "{}", expected.display());
    assert_eq!(store.fetch(&name).await.unwrap(), *buffer.bytes);
    assert!(store.path_for(&summary.document).is_file());

    tokio::fs::remove_dir_all(&root).await.unwrap();
}

#[tokio::test]
async fn file_store_fetch_missing_is_storage_error() {
    let store = FileAssetStore::new(scratch_dir());
    let err = store.fetch("nothing.buf").await.unwrap_err();
    assert!(matches!(err, ExportError::Storage { ref name, .. } if name == "nothing.buf"));
}
