//! Export Settings
//!
//! Every knob the exporter reads. Settings deserialize from camelCase JSON;
//! missing keys take their defaults and unknown keys are ignored.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{ExportError, Result};

/// Images whose constraint is at or above this size are never reduced.
pub const TEXTURE_SIZE_DISABLED_AT: u32 = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportSettings {
    /// Ceiling on the pre-dedup vertex count packed into one binary buffer.
    pub vertices_max_for_buffer: u32,
    /// Largest texture dimension written out. `0` disables reduction.
    pub texture_max_size: u32,
    pub double_sided: bool,
    /// Prefix for every generated `uri`.
    pub uri_base: String,
    /// Verbose per-entity build tracing at `debug` level.
    pub log_building: bool,
    pub copyright: String,
    pub generator: String,
    /// Adds `extras.uniqueHash` to every mesh.
    pub add_unique_codes: bool,
    /// Copy each displayable's own scale into its node instead of assuming it
    /// is already baked into the vertices.
    pub display_time_scaling: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            vertices_max_for_buffer: 50_000,
            texture_max_size: 256,
            double_sided: true,
            uri_base: "./".to_string(),
            log_building: false,
            copyright: "Copyright. All rights reserved".to_string(),
            generator: "scene-gltf".to_string(),
            add_unique_codes: true,
            display_time_scaling: false,
        }
    }
}

impl ExportSettings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ExportError::Storage {
            name: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.vertices_max_for_buffer == 0 {
            return Err(ExportError::Settings(
                "verticesMaxForBuffer must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// The active texture size limit, if reduction is enabled.
    #[must_use]
    pub fn texture_constraint(&self) -> Option<u32> {
        (self.texture_max_size > 0 && self.texture_max_size < TEXTURE_SIZE_DISABLED_AT)
            .then_some(self.texture_max_size)
    }
}
