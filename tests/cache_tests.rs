//! Asset Cache Tests
//!
//! Tests for:
//! - AssetTable: get_or_create runs the builder at most once per hash
//! - Builder failures propagate and leave no entry behind
//! - Hash mismatches are stored under the requested key
//! - Concurrent async image builders: first insert wins
//! - AssetCache: displayable registry, interning, reduced-image lookup

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use glam::{Vec2, Vec3, Vec4};
use image::{Rgba, RgbaImage};
use scene_gltf::assets::AssetCache;
use scene_gltf::hash::ContentHash;
use scene_gltf::scene::{
    Displayable, DisplayableRenderable, ImageInfo, MaterialInfo, MeshInfo, RenderableMesh,
    RenderableMeshGroup, Vertex,
};
use scene_gltf::{ExportError, Result};
use uuid::Uuid;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn triangle(x: f32) -> MeshInfo {
    MeshInfo::from_parts(
        vec![
            Vertex::new(Vec3::new(x, 0.0, 0.0), Vec3::Z, Vec2::ZERO),
            Vertex::new(Vec3::new(x + 1.0, 0.0, 0.0), Vec3::Z, Vec2::X),
            Vertex::new(Vec3::new(x, 1.0, 0.0), Vec3::Z, Vec2::Y),
        ],
        vec![0, 1, 2],
    )
}

fn group(x: f32) -> DisplayableRenderable {
    let member = RenderableMesh::new(
        0,
        Arc::new(triangle(x)),
        Arc::new(MaterialInfo::new(Vec4::ONE)),
    );
    RenderableMeshGroup::new(vec![Arc::new(member)]).into()
}

// ============================================================================
// Get-or-create
// ============================================================================

#[test]
fn builder_runs_once_per_hash() {
    init_logger();
    let cache = AssetCache::new();
    let calls = AtomicUsize::new(0);

    let first = group(0.0);
    let equal = group(0.0);
    let hash = first.content_hash();
    assert_eq!(hash, equal.content_hash());

    let a = cache
        .get_or_create_renderable(hash, || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ExportError>(first)
        })
        .unwrap();
    let b = cache
        .get_or_create_renderable(hash, || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ExportError>(equal)
        })
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(cache.renderables().len(), 1);
}

#[test]
fn distinct_hashes_get_distinct_entries() {
    let cache = AssetCache::new();
    for x in [0.0, 1.0, 2.0] {
        let mesh = triangle(x);
        let hash = mesh.content_hash();
        cache
            .get_or_create_mesh(hash, || Ok::<_, ExportError>(mesh))
            .unwrap();
    }
    assert_eq!(cache.meshes().len(), 3);
}

#[test]
fn failed_builder_inserts_nothing() {
    init_logger();
    let cache = AssetCache::new();
    let hash = triangle(0.0).content_hash();

    let err = cache
        .get_or_create_mesh(hash, || Err::<MeshInfo, _>("tessellation failed"))
        .unwrap_err();
    match err {
        ExportError::Builder { kind, hash: h, .. } => {
            assert_eq!(kind, "mesh");
            assert_eq!(h, hash);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!cache.meshes().contains(hash));

    // A later successful build is not blocked by the failure.
    let mesh = cache
        .get_or_create_mesh(hash, || Ok::<_, ExportError>(triangle(0.0)))
        .unwrap();
    assert_eq!(mesh.content_hash(), hash);
}

#[test]
fn mismatched_builder_result_stored_under_requested_key() {
    init_logger();
    let cache = AssetCache::new();
    let requested = ContentHash::from_u128(42);
    let mesh = cache
        .get_or_create_mesh(requested, || Ok::<_, ExportError>(triangle(0.0)))
        .unwrap();

    assert_ne!(mesh.content_hash(), requested);
    assert!(cache.meshes().contains(requested));
    assert!(!cache.meshes().contains(mesh.content_hash()));
}

#[test]
fn nested_builders_fill_other_tables() {
    let cache = AssetCache::new();
    let material = MaterialInfo::new(Vec4::new(1.0, 0.0, 0.0, 1.0));
    let hash = material.content_hash();

    let built = cache
        .get_or_create_material(hash, || -> Result<MaterialInfo> {
            let mesh = triangle(9.0);
            cache.get_or_create_mesh(mesh.content_hash(), || Ok::<_, ExportError>(mesh))?;
            Ok(material)
        })
        .unwrap();

    assert_eq!(built.content_hash(), hash);
    assert_eq!(cache.meshes().len(), 1);
    assert_eq!(cache.materials().len(), 1);
}

// ============================================================================
// Async Image Table
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_image_builds_keep_first_insert() {
    init_logger();
    let cache = AssetCache::new();
    let builds = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(tokio::sync::Barrier::new(2));
    let identifier = Uuid::new_v4();
    let pixels = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
    let hash = ImageInfo::from_rgba(identifier, pixels.clone()).content_hash();

    let spawn_build = || {
        let cache = cache.clone();
        let builds = builds.clone();
        let barrier = barrier.clone();
        let pixels = pixels.clone();
        tokio::spawn(async move {
            cache
                .get_or_create_image(hash, || async move {
                    // Both builders are in flight before either inserts.
                    barrier.wait().await;
                    builds.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ExportError>(ImageInfo::from_rgba(identifier, pixels))
                })
                .await
        })
    };

    let first = spawn_build();
    let second = spawn_build();
    let a = first.await.unwrap().unwrap();
    let b = second.await.unwrap().unwrap();

    assert_eq!(builds.load(Ordering::SeqCst), 2);
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(cache.images().len(), 1);
}

#[tokio::test]
async fn stored_image_skips_builder() {
    let cache = AssetCache::new();
    let info = Arc::new(ImageInfo::from_rgba(
        Uuid::new_v4(),
        RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255])),
    ));
    let hash = info.content_hash();
    cache.intern_image(&info);

    let found = cache
        .get_or_create_image(hash, || async {
            Err::<ImageInfo, _>("decoder should not run")
        })
        .await
        .unwrap();
    assert!(Arc::ptr_eq(&found, &info));
}

#[tokio::test]
async fn failed_image_builder_propagates() {
    let cache = AssetCache::new();
    let result = cache
        .get_or_create_image(ContentHash::from_u128(7), || async {
            Err::<ImageInfo, _>("corrupt jpeg")
        })
        .await;
    assert!(matches!(result, Err(ExportError::Builder { kind: "image", .. })));
    assert!(cache.images().is_empty());
}

// ============================================================================
// Displayables, Interning, Reduced Images
// ============================================================================

#[test]
fn displayables_tracked_by_identity() {
    let cache = AssetCache::new();
    let a = Arc::new(Displayable::new("twin"));
    let b = Arc::new(Displayable::new("twin"));

    assert!(cache.add_unique_displayable(a.clone()));
    assert!(!cache.add_unique_displayable(a.clone()));
    assert!(cache.add_unique_displayable(b));
    assert_eq!(cache.displayables().len(), 2);
    assert!(cache.get_displayable(a.content_hash()).is_some());
}

#[test]
fn interning_returns_first_equal_value() {
    let cache = AssetCache::new();
    let first = Arc::new(triangle(1.0));
    let second = Arc::new(triangle(1.0));

    let a = cache.intern_mesh(&first);
    let b = cache.intern_mesh(&second);
    assert!(Arc::ptr_eq(&a, &first));
    assert!(Arc::ptr_eq(&b, &first));
}

#[test]
fn find_image_picks_smallest_fitting_copy() {
    let cache = AssetCache::new();
    let identifier = Uuid::new_v4();
    let original = ImageInfo::from_rgba(
        identifier,
        RgbaImage::from_pixel(512, 512, Rgba([5, 5, 5, 255])),
    );
    let medium = original.constrained(256).unwrap();
    let small = original.constrained(64).unwrap();
    for info in [original, medium, small] {
        cache.intern_image(&Arc::new(info));
    }
    cache.intern_image(&Arc::new(ImageInfo::from_rgba(
        Uuid::new_v4(),
        RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255])),
    )));

    let found = cache.find_image(identifier, 300).unwrap();
    assert_eq!((found.width, found.height), (64, 64));
    assert!(cache.find_image(identifier, 32).is_none());
    assert!(cache.find_image(Uuid::new_v4(), 1000).is_none());
}

#[test]
fn clear_empties_every_table() {
    let cache = AssetCache::new();
    cache.intern_mesh(&Arc::new(triangle(0.0)));
    cache.add_unique_displayable(Arc::new(Displayable::new("x")));
    cache.clear();
    assert!(cache.meshes().is_empty());
    assert!(cache.displayables().is_empty());
}
