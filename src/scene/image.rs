use std::io::Cursor;

use image::{ImageFormat, RgbaImage, imageops::FilterType};
use uuid::Uuid;

use crate::errors::{ExportError, Result};
use crate::hash::{ContentAddressed, ContentHash, ContentHasher, EntityHandle};

/// A texture as handed over by the scene source: dimensions, a transparency
/// flag, and (when decoded) its RGBA pixels.
///
/// The hash is taken over the decoded pixels. An undecoded image hashes its
/// source identifier instead.
#[derive(Debug, Clone)]
pub struct ImageInfo {
    handle: EntityHandle,
    /// Identity of the source texture this image was decoded from. Reduced
    /// copies keep the identifier of their original.
    pub identifier: Uuid,
    pub width: u32,
    pub height: u32,
    pub has_transparency: bool,
    /// Whether reduced-size copies may replace this image on export.
    pub resizable: bool,
    pixels: Option<RgbaImage>,
    hash: ContentHash,
}

impl ImageInfo {
    #[must_use]
    pub fn from_rgba(identifier: Uuid, pixels: RgbaImage) -> Self {
        let (width, height) = pixels.dimensions();
        let has_transparency = pixels.pixels().any(|p| p.0[3] != u8::MAX);
        let hash = Self::pixel_hash(&pixels);
        Self {
            handle: EntityHandle::new(),
            identifier,
            width,
            height,
            has_transparency,
            resizable: true,
            pixels: Some(pixels),
            hash,
        }
    }

    /// Decodes an encoded image (PNG, JPEG) into RGBA pixels.
    pub fn decode(identifier: Uuid, bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes)?;
        Ok(Self::from_rgba(identifier, decoded.into_rgba8()))
    }

    /// An image known only by identity and size.
    #[must_use]
    pub fn undecoded(identifier: Uuid, width: u32, height: u32) -> Self {
        let mut hasher = ContentHasher::new();
        hasher.add_bytes(identifier.as_bytes());
        Self {
            handle: EntityHandle::new(),
            identifier,
            width,
            height,
            has_transparency: false,
            resizable: false,
            pixels: None,
            hash: hasher.finish(),
        }
    }

    #[must_use]
    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    fn pixel_hash(pixels: &RgbaImage) -> ContentHash {
        let mut hasher = ContentHasher::new();
        hasher
            .add_u32(pixels.width())
            .add_u32(pixels.height())
            .add_bytes(pixels.as_raw());
        hasher.finish()
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> EntityHandle {
        self.handle
    }

    #[inline]
    #[must_use]
    pub fn content_hash(&self) -> ContentHash {
        self.hash
    }

    #[must_use]
    pub fn pixels(&self) -> Option<&RgbaImage> {
        self.pixels.as_ref()
    }

    #[must_use]
    pub fn fits_within(&self, max: u32) -> bool {
        self.width <= max && self.height <= max
    }

    /// Filename under which the encoded image is stored.
    #[must_use]
    pub fn filename(&self) -> String {
        format!("{}_{}_{}.png", self.hash, self.width, self.height)
    }

    /// A copy reduced so neither side exceeds `max`, keeping the aspect
    /// ratio. `None` when the image already fits, is not resizable, or has
    /// no pixels to resample.
    #[must_use]
    pub fn constrained(&self, max: u32) -> Option<ImageInfo> {
        if max == 0 || !self.resizable || self.fits_within(max) {
            return None;
        }
        let pixels = self.pixels.as_ref()?;
        let (width, height) = constrained_size(self.width, self.height, max);
        let resized = image::imageops::resize(pixels, width, height, FilterType::Triangle);
        let mut reduced = ImageInfo::from_rgba(self.identifier, resized);
        reduced.has_transparency = self.has_transparency;
        Some(reduced)
    }

    /// PNG bytes for storage.
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let pixels = self.pixels.as_ref().ok_or_else(|| {
            ExportError::InvalidImage(format!("image {} has no decoded pixels", self.handle))
        })?;
        let mut out = Cursor::new(Vec::new());
        pixels.write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }
}

impl ContentAddressed for ImageInfo {
    fn content_hash(&self) -> ContentHash {
        self.hash
    }
}

/// Longest side becomes `max`, the other scales proportionally (at least 1).
#[must_use]
pub fn constrained_size(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width, height);
    }
    let scale_to = |side: u32, long: u32| {
        ((f64::from(side) * f64::from(max) / f64::from(long)).round() as u32).max(1)
    };
    if width >= height {
        (max, scale_to(height, width))
    } else {
        (scale_to(width, height), max)
    }
}
