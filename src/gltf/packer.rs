//! Buffer Packer
//!
//! Turns the materialized primitives into binary buffers, buffer views and
//! accessors.
//!
//! Primitives are taken in document order and grouped greedily: a group is
//! flushed when adding the next primitive would push its input vertex count
//! past the configured ceiling. A primitive is never split, so a primitive
//! larger than the ceiling gets a group of its own.
//!
//! Within a group, vertices are deduplicated by content hash and every
//! primitive's indices are remapped onto the unique list. The group's buffer
//! is laid out as:
//!
//! ```text
//! [indices, padded to 32 bytes][positions f32x3][normals f32x3][texcoords f32x2]
//! ```
//!
//! Vertex channels are planar, not interleaved. Positions, normals and
//! texcoords each get one accessor shared by the whole group; indices get one
//! accessor per primitive into the shared indices view.

use std::ops::Range;
use std::sync::Arc;

use glam::{Vec2, Vec3};
use rustc_hash::FxHashMap;

use crate::errors::Result;
use crate::gltf::document::{
    AccessorKey, AccessorType, Bounds, BufferKey, BufferTarget, BufferViewKey, ComponentType,
    DocumentStage, GltfAccessor, GltfBuffer, GltfBufferView, GltfDocument, PrimitiveKey,
    buffer_filename,
};
use crate::hash::{ContentHash, ContentHasher};
use crate::scene::{MeshInfo, Vertex};
use crate::settings::ExportSettings;

/// Alignment of the vertex section: 8 floats.
pub const PAD_UNIT: usize = 32;

/// Texcoord bounds beyond this magnitude are treated as corrupt input.
pub const TEXCOORD_BOUND_LIMIT: f32 = 1_000_000.0;

/// Splits `vertex_counts` into order-preserving groups whose totals stay
/// within `max_vertices`. A single oversized entry still forms a group.
#[must_use]
pub fn partition_by_vertex_budget(vertex_counts: &[usize], max_vertices: usize) -> Vec<Range<usize>> {
    let mut groups = Vec::new();
    let mut start = 0;
    let mut total = 0usize;
    for (i, &count) in vertex_counts.iter().enumerate() {
        if i > start && total + count > max_vertices {
            groups.push(start..i);
            start = i;
            total = 0;
        }
        total += count;
    }
    if start < vertex_counts.len() {
        groups.push(start..vertex_counts.len());
    }
    groups
}

/// The deduplicated vertex set of one group and each member's remapped
/// indices.
#[derive(Debug, Clone, Default)]
pub struct VertexGroup {
    pub vertices: Vec<Vertex>,
    /// One entry per input mesh, in input order.
    pub indices: Vec<Vec<u32>>,
    /// Vertex count before deduplication.
    pub input_vertices: usize,
}

impl VertexGroup {
    /// Collects unique vertices across `meshes` and remaps each mesh's
    /// indices onto them, joining on the vertex hash.
    #[must_use]
    pub fn build(meshes: &[&MeshInfo]) -> Self {
        let mut by_hash: FxHashMap<ContentHash, u32> = FxHashMap::default();
        let mut vertices = Vec::new();
        let mut input_vertices = 0;
        let mut indices = Vec::with_capacity(meshes.len());

        for mesh in meshes {
            input_vertices += mesh.vertices.len();
            let local_to_group: Vec<u32> = mesh
                .vertices
                .iter()
                .map(|vertex| {
                    *by_hash.entry(vertex.content_hash()).or_insert_with(|| {
                        vertices.push(*vertex);
                        (vertices.len() - 1) as u32
                    })
                })
                .collect();

            let remapped: Vec<u32> = mesh
                .indices
                .iter()
                .map(|&index| {
                    local_to_group.get(index as usize).copied().unwrap_or_else(|| {
                        log::error!(
                            "Packer: mesh {mesh} index {index} is out of range, using 0"
                        );
                        0
                    })
                })
                .collect();
            indices.push(remapped);
        }

        Self {
            vertices,
            indices,
            input_vertices,
        }
    }

    #[must_use]
    pub fn index_count(&self) -> usize {
        self.indices.iter().map(Vec::len).sum()
    }

    /// 16-bit indices when the index count fits and every index value stays
    /// below 65535, which glTF reserves for primitive restart.
    #[must_use]
    pub fn index_component_type(&self) -> ComponentType {
        if self.index_count() < usize::from(u16::MAX) + 1
            && self.vertices.len() < usize::from(u16::MAX)
        {
            ComponentType::UnsignedShort
        } else {
            ComponentType::UnsignedInt
        }
    }
}

/// `len` rounded up to the next multiple of `unit`.
#[must_use]
pub fn padded_len(len: usize, unit: usize) -> usize {
    len.div_ceil(unit) * unit
}

/// Component-wise min and max of one vertex channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelBounds<const N: usize> {
    pub min: [f32; N],
    pub max: [f32; N],
    /// Whether any NaN or infinite component was left out.
    pub skipped_non_finite: bool,
}

impl<const N: usize> ChannelBounds<N> {
    /// Folds over the finite components only. A component with no finite
    /// value at all is bounded by `0`. `None` for an empty input.
    pub fn compute(values: impl IntoIterator<Item = [f32; N]>) -> Option<Self> {
        let mut min = [f32::INFINITY; N];
        let mut max = [f32::NEG_INFINITY; N];
        let mut skipped_non_finite = false;
        let mut seen = false;
        for value in values {
            seen = true;
            for (i, component) in value.into_iter().enumerate() {
                if !component.is_finite() {
                    skipped_non_finite = true;
                    continue;
                }
                min[i] = min[i].min(component);
                max[i] = max[i].max(component);
            }
        }
        if !seen {
            return None;
        }
        for (lo, hi) in min.iter_mut().zip(max.iter_mut()) {
            if *lo > *hi {
                *lo = 0.0;
                *hi = 0.0;
            }
        }
        Some(Self {
            min,
            max,
            skipped_non_finite,
        })
    }

    fn min_bounds(&self) -> Bounds {
        Bounds::Float(self.min.to_vec())
    }

    fn max_bounds(&self) -> Bounds {
        Bounds::Float(self.max.to_vec())
    }
}

fn sane_texcoord_bound(v: [f32; 2]) -> bool {
    v.iter().all(|c| c.is_finite() && c.abs() < TEXCOORD_BOUND_LIMIT)
}

/// Packs every primitive of `doc` into buffers. The document must be freshly
/// materialized; packing twice is a no-op.
pub fn pack(doc: &mut GltfDocument, settings: &ExportSettings) -> Result<()> {
    if doc.stage() != DocumentStage::Materialized {
        log::warn!("Packer: document '{}' is already packed", doc.name);
        return Ok(());
    }
    settings.validate()?;

    let keys: Vec<PrimitiveKey> = doc.primitives.keys().collect();
    let counts: Vec<usize> = keys
        .iter()
        .map(|&k| doc.primitives.get(k).map_or(0, |p| p.mesh.vertex_count()))
        .collect();

    let max = settings.vertices_max_for_buffer as usize;
    for range in partition_by_vertex_budget(&counts, max) {
        pack_group(doc, settings, &keys[range]);
    }
    doc.set_stage(DocumentStage::Packed);
    Ok(())
}

fn pack_group(doc: &mut GltfDocument, settings: &ExportSettings, keys: &[PrimitiveKey]) {
    let meshes: Vec<Arc<MeshInfo>> = keys
        .iter()
        .filter_map(|&k| doc.primitives.get(k).map(|p| p.mesh.clone()))
        .collect();
    let mesh_refs: Vec<&MeshInfo> = meshes.iter().map(AsRef::as_ref).collect();
    let group = VertexGroup::build(&mesh_refs);

    if group.vertices.is_empty() {
        for &key in keys {
            if let Some(primitive) = doc.primitives.get(key) {
                log::error!(
                    "Packer: primitive {} has no vertices, leaving it without accessors",
                    primitive.id
                );
                if primitive.mesh.index_count() == 0 {
                    log::error!("Packer: primitive {} has zero indices", primitive.id);
                }
            }
        }
        return;
    }

    let index_type = group.index_component_type();
    let index_size = index_type.size();
    let indices_len = group.index_count() * index_size;
    let padded_indices_len = padded_len(indices_len, PAD_UNIT);
    let vertex_count = group.vertices.len();
    let vec3_len = vertex_count * std::mem::size_of::<Vec3>();
    let vec2_len = vertex_count * std::mem::size_of::<Vec2>();

    // Indices, then padding, then the three planar channels.
    let mut bytes = Vec::with_capacity(padded_indices_len + 2 * vec3_len + vec2_len);
    let mut index_offsets = Vec::with_capacity(group.indices.len());
    for indices in &group.indices {
        index_offsets.push(bytes.len());
        if index_type == ComponentType::UnsignedShort {
            let short: Vec<u16> = indices.iter().map(|&i| i as u16).collect();
            bytes.extend_from_slice(bytemuck::cast_slice(&short));
        } else {
            bytes.extend_from_slice(bytemuck::cast_slice(indices));
        }
    }
    bytes.resize(padded_indices_len, 0);

    let positions: Vec<Vec3> = group.vertices.iter().map(|v| v.position).collect();
    let normals: Vec<Vec3> = group.vertices.iter().map(|v| v.normal).collect();
    let texcoords: Vec<Vec2> = group.vertices.iter().map(|v| v.uv).collect();
    bytes.extend_from_slice(bytemuck::cast_slice(&positions));
    bytes.extend_from_slice(bytemuck::cast_slice(&normals));
    bytes.extend_from_slice(bytemuck::cast_slice(&texcoords));

    let number = format!("{:03}", doc.buffers.len() + 1);
    let buffer_name = format!("{}_buffer{number}", doc.name);
    let hash = {
        let mut hasher = ContentHasher::new();
        hasher.add_bytes(&bytes);
        hasher.finish()
    };

    if settings.log_building {
        log::debug!(
            "Packer: {buffer_name}: meshes={}, vertices={}, unique={}, indexSize={index_size}, \
             indexBytes={indices_len}, paddedIndexBytes={padded_indices_len}, totalBytes={}",
            keys.len(),
            group.input_vertices,
            vertex_count,
            bytes.len()
        );
    }

    let byte_length = bytes.len();
    let buffer = doc.buffers.insert(GltfBuffer {
        id: buffer_name.clone(),
        name: buffer_name.clone(),
        source_hash: hash,
        bytes: Arc::new(bytes),
        uri: format!("{}{}", settings.uri_base, buffer_filename(hash)),
    });
    debug_assert_eq!(byte_length, padded_indices_len + 2 * vec3_len + vec2_len);

    let indices_view = add_view(
        doc,
        buffer,
        format!("indices{number}"),
        0..padded_indices_len,
        None,
        BufferTarget::ElementArrayBuffer,
    );
    let positions_start = padded_indices_len;
    let normals_start = positions_start + vec3_len;
    let texcoords_start = normals_start + vec3_len;
    let positions_view = add_view(
        doc,
        buffer,
        format!("viewVertices{number}"),
        positions_start..normals_start,
        Some(std::mem::size_of::<Vec3>()),
        BufferTarget::ArrayBuffer,
    );
    let normals_view = add_view(
        doc,
        buffer,
        format!("normals{number}"),
        normals_start..texcoords_start,
        Some(std::mem::size_of::<Vec3>()),
        BufferTarget::ArrayBuffer,
    );
    let texcoords_view = add_view(
        doc,
        buffer,
        format!("texCoord{number}"),
        texcoords_start..texcoords_start + vec2_len,
        Some(std::mem::size_of::<Vec2>()),
        BufferTarget::ArrayBuffer,
    );

    let position_bounds = ChannelBounds::compute(positions.iter().map(|v| v.to_array()));
    let normal_bounds = ChannelBounds::compute(normals.iter().map(|v| v.to_array()));
    let uv_bounds = ChannelBounds::compute(texcoords.iter().map(|v| v.to_array()));

    let skipped = |b: &Option<ChannelBounds<3>>| b.is_some_and(|b| b.skipped_non_finite);
    if skipped(&position_bounds) || skipped(&normal_bounds) {
        log::warn!("Packer: {buffer_name}: non-finite vertex components left out of bounds");
    }
    let (uv_min, uv_max) = match uv_bounds {
        Some(b) if b.skipped_non_finite => {
            log::warn!("Packer: {buffer_name}: non-finite texcoords, omitting bounds");
            (None, None)
        }
        Some(b) => {
            let lo = sane_texcoord_bound(b.min).then(|| b.min_bounds());
            let hi = sane_texcoord_bound(b.max).then(|| b.max_bounds());
            if lo.is_none() || hi.is_none() {
                log::warn!("Packer: {buffer_name}: texcoord bounds out of range, omitting");
            }
            (lo, hi)
        }
        None => (None, None),
    };

    let position = doc.accessors.insert(GltfAccessor {
        id: format!("{buffer_name}_accCVer"),
        buffer_view: positions_view,
        byte_offset: 0,
        component_type: ComponentType::Float,
        count: vertex_count,
        kind: AccessorType::Vec3,
        min: position_bounds.map(|b| b.min_bounds()),
        max: position_bounds.map(|b| b.max_bounds()),
    });
    let normal = doc.accessors.insert(GltfAccessor {
        id: format!("{buffer_name}_accNor"),
        buffer_view: normals_view,
        byte_offset: 0,
        component_type: ComponentType::Float,
        count: vertex_count,
        kind: AccessorType::Vec3,
        min: normal_bounds.map(|b| b.min_bounds()),
        max: normal_bounds.map(|b| b.max_bounds()),
    });
    let texcoord = doc.accessors.insert(GltfAccessor {
        id: format!("{buffer_name}_accUV"),
        buffer_view: texcoords_view,
        byte_offset: 0,
        component_type: ComponentType::Float,
        count: vertex_count,
        kind: AccessorType::Vec2,
        min: uv_min,
        max: uv_max,
    });

    for ((&key, indices), &offset) in keys.iter().zip(&group.indices).zip(&index_offsets) {
        let Some(prim_id) = doc.primitives.get(key).map(|p| p.id.clone()) else {
            continue;
        };
        if indices.is_empty() {
            log::error!("Packer: primitive {prim_id} has zero indices");
        }
        let lo = indices.iter().copied().min();
        let hi = indices.iter().copied().max();
        let index_accessor = doc.accessors.insert(GltfAccessor {
            id: format!("{prim_id}_accInd"),
            buffer_view: indices_view,
            byte_offset: offset,
            component_type: index_type,
            count: indices.len(),
            kind: AccessorType::Scalar,
            min: lo.map(|v| Bounds::Unsigned(vec![v])),
            max: hi.map(|v| Bounds::Unsigned(vec![v])),
        });
        if settings.log_building {
            log::debug!(
                "Packer: {prim_id}_accInd: offset={offset}, count={}, type={index_type:?}",
                indices.len()
            );
        }
        wire_primitive(doc, key, index_accessor, position, normal, texcoord);
    }
}

fn add_view(
    doc: &mut GltfDocument,
    buffer: BufferKey,
    name: String,
    span: Range<usize>,
    byte_stride: Option<usize>,
    target: BufferTarget,
) -> BufferViewKey {
    doc.buffer_views.insert(GltfBufferView {
        id: name.clone(),
        name,
        buffer,
        byte_offset: span.start,
        byte_length: span.len(),
        byte_stride,
        target,
    })
}

fn wire_primitive(
    doc: &mut GltfDocument,
    key: PrimitiveKey,
    indices: AccessorKey,
    position: AccessorKey,
    normal: AccessorKey,
    texcoord: AccessorKey,
) {
    if let Some(primitive) = doc.primitives.get_mut(key) {
        primitive.indices = Some(indices);
        primitive.position = Some(position);
        primitive.normal = Some(normal);
        primitive.texcoord = Some(texcoord);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(offset: f32) -> MeshInfo {
        let n = Vec3::Z;
        MeshInfo::from_parts(
            vec![
                Vertex::new(Vec3::new(offset, 0.0, 0.0), n, Vec2::new(0.0, 0.0)),
                Vertex::new(Vec3::new(offset + 1.0, 0.0, 0.0), n, Vec2::new(1.0, 0.0)),
                Vertex::new(Vec3::new(offset + 1.0, 1.0, 0.0), n, Vec2::new(1.0, 1.0)),
                Vertex::new(Vec3::new(offset, 1.0, 0.0), n, Vec2::new(0.0, 1.0)),
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
    }

    #[test]
    fn partition_flushes_before_overflow() {
        let groups = partition_by_vertex_budget(&[40_000, 15_000, 20_000], 50_000);
        assert_eq!(groups, vec![0..1, 1..3]);
    }

    #[test]
    fn partition_keeps_oversized_primitive_whole() {
        let groups = partition_by_vertex_budget(&[10, 120, 10], 100);
        assert_eq!(groups, vec![0..1, 1..2, 2..3]);
    }

    #[test]
    fn partition_exact_fit_stays_together() {
        let groups = partition_by_vertex_budget(&[25, 25], 50);
        assert_eq!(groups, vec![0..2]);
    }

    #[test]
    fn partition_empty_input() {
        assert!(partition_by_vertex_budget(&[], 50).is_empty());
    }

    #[test]
    fn padded_len_rounds_up_to_unit() {
        assert_eq!(padded_len(0, PAD_UNIT), 0);
        assert_eq!(padded_len(12, PAD_UNIT), 32);
        assert_eq!(padded_len(32, PAD_UNIT), 32);
        assert_eq!(padded_len(33, PAD_UNIT), 64);
    }

    #[test]
    fn shared_vertices_collapse_across_meshes() {
        let n = Vec3::Z;
        let v = [
            Vertex::new(Vec3::new(0.0, 0.0, 0.0), n, Vec2::new(0.0, 0.0)),
            Vertex::new(Vec3::new(1.0, 0.0, 0.0), n, Vec2::new(1.0, 0.0)),
            Vertex::new(Vec3::new(1.0, 1.0, 0.0), n, Vec2::new(1.0, 1.0)),
            Vertex::new(Vec3::new(0.0, 1.0, 0.0), n, Vec2::new(0.0, 1.0)),
        ];
        let a = MeshInfo::from_parts(vec![v[0], v[1], v[2]], vec![0, 1, 2]);
        let b = MeshInfo::from_parts(vec![v[0], v[2], v[3]], vec![0, 1, 2]);
        let group = VertexGroup::build(&[&a, &b]);

        assert_eq!(group.input_vertices, 6);
        assert_eq!(group.vertices.len(), 4);
        assert_eq!(group.indices[0], vec![0, 1, 2]);
        assert_eq!(group.indices[1], vec![0, 2, 3]);
    }

    #[test]
    fn identical_meshes_share_every_vertex() {
        let a = quad(0.0);
        let b = a.duplicate();
        let group = VertexGroup::build(&[&a, &b]);

        assert_eq!(group.vertices.len(), 4);
        assert_eq!(group.indices[0], group.indices[1]);
    }

    #[test]
    fn out_of_range_index_maps_to_zero() {
        let mut mesh = quad(0.0);
        mesh.indices.push(99);
        let group = VertexGroup::build(&[&mesh]);
        assert_eq!(group.indices[0].last(), Some(&0));
    }

    #[test]
    fn small_groups_use_short_indices() {
        let a = quad(0.0);
        let group = VertexGroup::build(&[&a]);
        assert_eq!(group.index_component_type(), ComponentType::UnsignedShort);
    }

    #[test]
    fn texcoord_sanity_limits() {
        assert!(sane_texcoord_bound([0.5, -3.0]));
        assert!(!sane_texcoord_bound([f32::NAN, 0.0]));
        assert!(!sane_texcoord_bound([2_000_000.0, 0.0]));
    }

    #[test]
    fn channel_bounds_skip_non_finite_components() {
        let bounds =
            ChannelBounds::compute([[0.0, 0.0, 0.0], [f32::NAN, 0.0, 0.0], [1.0, 1.0, 1.0]])
                .unwrap();
        assert_eq!(bounds.min, [0.0, 0.0, 0.0]);
        assert_eq!(bounds.max, [1.0, 1.0, 1.0]);
        assert!(bounds.skipped_non_finite);
    }

    #[test]
    fn channel_bounds_without_finite_values_are_zero() {
        let bounds = ChannelBounds::compute([[f32::NAN, 2.0], [f32::INFINITY, -1.0]]).unwrap();
        assert_eq!(bounds.min, [0.0, -1.0]);
        assert_eq!(bounds.max, [0.0, 2.0]);
        assert!(ChannelBounds::<2>::compute([]).is_none());
    }
}
