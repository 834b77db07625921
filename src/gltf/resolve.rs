use crate::errors::{ExportError, Result};
use crate::gltf::document::{DocumentStage, GltfDocument};

/// Assigns every entry of every collection its 0-based position in
/// insertion order.
///
/// Not incremental: inserting into any collection afterwards drops that
/// collection's indices and the document has to be resolved again.
pub fn resolve(doc: &mut GltfDocument) -> Result<()> {
    if doc.stage() == DocumentStage::Materialized {
        return Err(ExportError::NotBuilt("buffers have not been packed"));
    }
    doc.scenes.assign_reference_indices();
    doc.nodes.assign_reference_indices();
    doc.meshes.assign_reference_indices();
    doc.primitives.assign_reference_indices();
    doc.materials.assign_reference_indices();
    doc.textures.assign_reference_indices();
    doc.images.assign_reference_indices();
    doc.samplers.assign_reference_indices();
    doc.accessors.assign_reference_indices();
    doc.buffer_views.assign_reference_indices();
    doc.buffers.assign_reference_indices();
    doc.set_stage(DocumentStage::Resolved);
    Ok(())
}

/// Whether every collection currently holds valid reference indices.
#[must_use]
pub fn is_resolved(doc: &GltfDocument) -> bool {
    doc.scenes.is_resolved()
        && doc.nodes.is_resolved()
        && doc.meshes.is_resolved()
        && doc.primitives.is_resolved()
        && doc.materials.is_resolved()
        && doc.textures.is_resolved()
        && doc.images.is_resolved()
        && doc.samplers.is_resolved()
        && doc.accessors.is_resolved()
        && doc.buffer_views.is_resolved()
        && doc.buffers.is_resolved()
}
