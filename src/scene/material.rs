use std::sync::Arc;

use glam::Vec4;

use crate::hash::{ContentAddressed, ContentHash, ContentHasher, EntityHandle};
use crate::scene::image::ImageInfo;

/// Surface appearance of one face.
#[derive(Debug, Clone)]
pub struct MaterialInfo {
    handle: EntityHandle,
    /// Diffuse color, alpha in `w`.
    pub rgba: Vec4,
    /// 0..=255 scale.
    pub shininess: Option<f32>,
    /// 0..=1 scale.
    pub glow: Option<f32>,
    pub transparency: Option<f32>,
    pub image: Option<Arc<ImageInfo>>,
}

impl Default for MaterialInfo {
    fn default() -> Self {
        Self::new(Vec4::ONE)
    }
}

impl MaterialInfo {
    #[must_use]
    pub fn new(rgba: Vec4) -> Self {
        Self {
            handle: EntityHandle::new(),
            rgba,
            shininess: None,
            glow: None,
            transparency: None,
            image: None,
        }
    }

    #[must_use]
    pub fn with_image(mut self, image: Arc<ImageInfo>) -> Self {
        self.image = Some(image);
        self
    }

    #[must_use]
    pub fn with_shininess(mut self, shininess: f32) -> Self {
        self.shininess = Some(shininess);
        self
    }

    #[must_use]
    pub fn with_glow(mut self, glow: f32) -> Self {
        self.glow = Some(glow);
        self
    }

    #[must_use]
    pub fn with_transparency(mut self, transparency: f32) -> Self {
        self.transparency = Some(transparency);
        self
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> EntityHandle {
        self.handle
    }

    #[must_use]
    pub fn content_hash(&self) -> ContentHash {
        let mut hasher = ContentHasher::new();
        hasher
            .add_vec4(self.rgba)
            .add_opt_f32(self.shininess)
            .add_opt_f32(self.glow)
            .add_opt_f32(self.transparency);
        match &self.image {
            Some(image) => hasher.add_bool(true).add_hash(image.content_hash()),
            None => hasher.add_bool(false),
        };
        hasher.finish()
    }

    /// Whether the surface needs alpha blending.
    #[must_use]
    pub fn is_translucent(&self) -> bool {
        (self.rgba.w - 1.0).abs() > f32::EPSILON || self.image.as_ref().is_some_and(|i| i.has_transparency)
    }
}

impl ContentAddressed for MaterialInfo {
    fn content_hash(&self) -> ContentHash {
        MaterialInfo::content_hash(self)
    }
}
