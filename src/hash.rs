//! Content Hashing and Entity Identity
//!
//! Two kinds of identity flow through the exporter:
//!
//! - [`ContentHash`]: a 128-bit xxh3 digest over an entity's defining fields.
//!   Equal hashes mean interchangeable entities; every dedup table is keyed
//!   by it.
//! - [`EntityHandle`]: a random, never-reused identity assigned at creation.
//!   Used for naming and debugging, and as the identity hash of displayables,
//!   which are never deduplicated by content.
//!
//! Hashing is order-sensitive. Callers feeding collections must feed them in a
//! canonical order when the resulting hash has to be stable.

use std::fmt;

use glam::{Quat, Vec2, Vec3, Vec4};
use uuid::Uuid;
use xxhash_rust::xxh3::Xxh3;

/// Opaque 128-bit content digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ContentHash(u128);

impl ContentHash {
    #[inline]
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(value)
    }

    #[inline]
    #[must_use]
    pub const fn as_u128(self) -> u128 {
        self.0
    }

    /// Order-sensitive combination: equal to hashing `a` and then `b`.
    #[must_use]
    pub fn combine(a: ContentHash, b: ContentHash) -> ContentHash {
        let mut hasher = ContentHasher::new();
        hasher.add_hash(a).add_hash(b);
        hasher.finish()
    }

    /// 32 lowercase hex digits. Stored filenames derive from this text.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("{:032x}", self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:032x})", self.0)
    }
}

/// Anything that can report its own content hash.
///
/// The asset tables use this to verify that a builder produced the entity
/// that was asked for.
pub trait ContentAddressed {
    fn content_hash(&self) -> ContentHash;
}

/// Incremental hasher over scalar, vector, and string inputs.
pub struct ContentHasher {
    state: Xxh3,
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentHasher {
    #[must_use]
    pub fn new() -> Self {
        Self { state: Xxh3::new() }
    }

    pub fn add_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.state.update(bytes);
        self
    }

    /// Hashes the bit pattern. Every NaN hashes as the canonical NaN.
    pub fn add_f32(&mut self, value: f32) -> &mut Self {
        let bits = if value.is_nan() {
            f32::NAN.to_bits()
        } else {
            value.to_bits()
        };
        self.add_bytes(&bits.to_le_bytes())
    }

    pub fn add_u32(&mut self, value: u32) -> &mut Self {
        self.add_bytes(&value.to_le_bytes())
    }

    pub fn add_i32(&mut self, value: i32) -> &mut Self {
        self.add_bytes(&value.to_le_bytes())
    }

    pub fn add_u64(&mut self, value: u64) -> &mut Self {
        self.add_bytes(&value.to_le_bytes())
    }

    pub fn add_bool(&mut self, value: bool) -> &mut Self {
        self.add_bytes(&[u8::from(value)])
    }

    /// Length-prefixed so that `("ab", "c")` and `("a", "bc")` differ.
    pub fn add_str(&mut self, value: &str) -> &mut Self {
        self.add_u64(value.len() as u64);
        self.add_bytes(value.as_bytes())
    }

    pub fn add_hash(&mut self, value: ContentHash) -> &mut Self {
        self.add_bytes(&value.0.to_le_bytes())
    }

    pub fn add_vec2(&mut self, v: Vec2) -> &mut Self {
        self.add_f32(v.x).add_f32(v.y)
    }

    pub fn add_vec3(&mut self, v: Vec3) -> &mut Self {
        self.add_f32(v.x).add_f32(v.y).add_f32(v.z)
    }

    pub fn add_vec4(&mut self, v: Vec4) -> &mut Self {
        self.add_f32(v.x).add_f32(v.y).add_f32(v.z).add_f32(v.w)
    }

    pub fn add_quat(&mut self, q: Quat) -> &mut Self {
        self.add_f32(q.x).add_f32(q.y).add_f32(q.z).add_f32(q.w)
    }

    /// Optional values hash a presence flag first so `None` and `Some(0.0)`
    /// never collide.
    pub fn add_opt_f32(&mut self, value: Option<f32>) -> &mut Self {
        match value {
            Some(v) => self.add_bool(true).add_f32(v),
            None => self.add_bool(false),
        }
    }

    #[must_use]
    pub fn finish(&self) -> ContentHash {
        ContentHash(self.state.digest128())
    }
}

/// Process-unique identity assigned when an entity is created.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityHandle(Uuid);

impl Default for EntityHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityHandle {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    #[inline]
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Identity hash, independent of any content.
    #[must_use]
    pub fn content_hash(&self) -> ContentHash {
        let mut hasher = ContentHasher::new();
        hasher.add_bytes(self.0.as_bytes());
        hasher.finish()
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityHandle({})", self.0)
    }
}
