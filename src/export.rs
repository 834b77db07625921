//! Export Pipeline
//!
//! [`Exporter`] runs the stages in order: materialize the scene into a
//! document, pack buffers, resolve reference indices. [`Exporter::write`]
//! then hands every buffer, every image and finally the JSON document to an
//! [`AssetStore`]. Buffers and images target distinct files and are stored
//! concurrently; the document is written last, and only if all of them
//! succeeded.

use std::sync::Arc;

use futures::future::try_join_all;

use crate::assets::{AssetCache, AssetStore};
use crate::errors::Result;
use crate::gltf::builder::DocumentBuilder;
use crate::gltf::document::GltfDocument;
use crate::gltf::json::to_json_string;
use crate::gltf::packer::pack;
use crate::gltf::resolve::resolve;
use crate::scene::SceneSource;
use crate::settings::ExportSettings;

/// What [`Exporter::write`] stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub document: String,
    pub buffers: Vec<String>,
    pub images: Vec<String>,
    pub bytes_written: usize,
}

pub struct Exporter {
    settings: ExportSettings,
    cache: AssetCache,
}

impl Exporter {
    #[must_use]
    pub fn new(settings: ExportSettings) -> Self {
        Self::with_cache(settings, AssetCache::new())
    }

    /// Shares an existing cache, so several documents built by the same
    /// process reuse each other's meshes, materials and images.
    #[must_use]
    pub fn with_cache(settings: ExportSettings, cache: AssetCache) -> Self {
        Self { settings, cache }
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    #[inline]
    #[must_use]
    pub fn cache(&self) -> &AssetCache {
        &self.cache
    }

    /// Materializes, packs and resolves `source` into a document ready for
    /// serialization.
    pub fn build(&self, source: &SceneSource) -> Result<GltfDocument> {
        self.settings.validate()?;

        let mut builder = DocumentBuilder::new(source.name.clone(), &self.settings, &self.cache);
        builder.add_scene(source);
        let mut doc = builder.finish();
        log::debug!(
            "Exporter: '{}' materialized: nodes={}, meshes={}, primitives={}, materials={}, images={}",
            doc.name,
            doc.nodes.len(),
            doc.meshes.len(),
            doc.primitives.len(),
            doc.materials.len(),
            doc.images.len()
        );

        pack(&mut doc, &self.settings)?;
        resolve(&mut doc)?;
        Ok(doc)
    }

    /// Stores every buffer and image of `doc`, then the document itself.
    ///
    /// Any storage failure aborts the write; a document is only stored once
    /// everything it references has been.
    pub async fn write<S: AssetStore>(&self, doc: &GltfDocument, store: &S) -> Result<ExportSummary> {
        let json = to_json_string(doc, true)?;

        let mut summary = ExportSummary {
            document: doc.filename(),
            ..ExportSummary::default()
        };
        let mut files: Vec<(String, Arc<Vec<u8>>)> = Vec::new();
        for (_, buffer) in doc.buffers.iter() {
            let name = buffer.filename();
            summary.buffers.push(name.clone());
            files.push((name, buffer.bytes.clone()));
        }
        for (_, image) in doc.images.iter() {
            if image.info.pixels().is_none() {
                log::warn!(
                    "Exporter: image {} has no pixel data, assuming it is already stored",
                    image.filename()
                );
                continue;
            }
            let name = image.filename();
            summary.images.push(name.clone());
            files.push((name, Arc::new(image.info.encode_png()?)));
        }

        try_join_all(files.iter().map(|(name, bytes)| store.store(name, bytes))).await?;
        store.store(&summary.document, json.as_bytes()).await?;

        summary.bytes_written =
            files.iter().map(|(_, bytes)| bytes.len()).sum::<usize>() + json.len();
        log::info!(
            "Exporter: wrote '{}' with {} buffers and {} images ({} bytes)",
            summary.document,
            summary.buffers.len(),
            summary.images.len(),
            summary.bytes_written
        );
        Ok(summary)
    }

    /// [`build`](Self::build) followed by [`write`](Self::write).
    pub async fn export<S: AssetStore>(
        &self,
        source: &SceneSource,
        store: &S,
    ) -> Result<(GltfDocument, ExportSummary)> {
        let doc = self.build(source)?;
        let summary = self.write(&doc, store).await?;
        Ok((doc, summary))
    }
}
