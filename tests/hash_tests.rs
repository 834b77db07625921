//! Content Hash Tests
//!
//! Tests for:
//! - ContentHasher: determinism, order sensitivity, NaN canonicalization
//! - ContentHash: combine, hex text
//! - EntityHandle: uniqueness and identity hash

use glam::{Vec2, Vec3};
use scene_gltf::hash::{ContentHash, ContentHasher, EntityHandle};

fn hash_of(f: impl FnOnce(&mut ContentHasher)) -> ContentHash {
    let mut hasher = ContentHasher::new();
    f(&mut hasher);
    hasher.finish()
}

// ============================================================================
// ContentHasher
// ============================================================================

#[test]
fn same_inputs_same_hash() {
    let a = hash_of(|h| {
        h.add_vec3(Vec3::new(1.0, 2.0, 3.0)).add_str("mesh").add_u32(7);
    });
    let b = hash_of(|h| {
        h.add_vec3(Vec3::new(1.0, 2.0, 3.0)).add_str("mesh").add_u32(7);
    });
    assert_eq!(a, b);
}

#[test]
fn input_order_matters() {
    let a = hash_of(|h| {
        h.add_f32(1.0).add_f32(2.0);
    });
    let b = hash_of(|h| {
        h.add_f32(2.0).add_f32(1.0);
    });
    assert_ne!(a, b);
}

#[test]
fn strings_are_length_prefixed() {
    let a = hash_of(|h| {
        h.add_str("ab").add_str("c");
    });
    let b = hash_of(|h| {
        h.add_str("a").add_str("bc");
    });
    assert_ne!(a, b);
}

#[test]
fn every_nan_hashes_alike() {
    let other_nan = f32::from_bits(0x7fc0_0001);
    assert!(other_nan.is_nan());
    let a = hash_of(|h| {
        h.add_f32(f32::NAN);
    });
    let b = hash_of(|h| {
        h.add_f32(other_nan);
    });
    assert_eq!(a, b);
}

#[test]
fn optional_none_differs_from_zero() {
    let none = hash_of(|h| {
        h.add_opt_f32(None);
    });
    let zero = hash_of(|h| {
        h.add_opt_f32(Some(0.0));
    });
    assert_ne!(none, zero);
}

#[test]
fn vec2_and_two_floats_agree() {
    let a = hash_of(|h| {
        h.add_vec2(Vec2::new(0.25, 0.75));
    });
    let b = hash_of(|h| {
        h.add_f32(0.25).add_f32(0.75);
    });
    assert_eq!(a, b);
}

// ============================================================================
// ContentHash
// ============================================================================

#[test]
fn combine_is_hashing_in_sequence() {
    let a = hash_of(|h| {
        h.add_str("mesh");
    });
    let b = hash_of(|h| {
        h.add_str("material");
    });
    let expected = hash_of(|h| {
        h.add_hash(a).add_hash(b);
    });
    assert_eq!(ContentHash::combine(a, b), expected);
    assert_ne!(ContentHash::combine(a, b), ContentHash::combine(b, a));
}

#[test]
fn hex_text_is_32_lowercase_digits() {
    let hash = ContentHash::from_u128(0xAB);
    let text = hash.to_hex();
    assert_eq!(text.len(), 32);
    assert!(text.ends_with("ab"));
    assert_eq!(text, hash.to_string());
}

// ============================================================================
// EntityHandle
// ============================================================================

#[test]
fn handles_are_unique() {
    let a = EntityHandle::new();
    let b = EntityHandle::new();
    assert_ne!(a, b);
    assert_ne!(a.content_hash(), b.content_hash());
}

#[test]
fn handle_hash_is_stable() {
    let handle = EntityHandle::new();
    assert_eq!(handle.content_hash(), handle.content_hash());
    assert_eq!(
        EntityHandle::from_uuid(handle.uuid()).content_hash(),
        handle.content_hash()
    );
}
