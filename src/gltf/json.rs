//! JSON Emission
//!
//! Converts a resolved [`GltfDocument`] into a `serde_json` value tree. All
//! cross-references are written as reference indices. Collections with no
//! entries are left out entirely.
//!
//! Floats are written with the shortest text that round-trips an `f32`
//! (at most 9 significant digits). NaN and infinities are not valid JSON;
//! they are written as `0` and logged.

use glam::{Mat4, Quat, Vec3, Vec4};
use serde_json::{Map, Number, Value, json};
use slotmap::Key;

use crate::errors::{ExportError, Result};
use crate::gltf::collection::Collection;
use crate::gltf::document::{
    Bounds, GltfAccessor, GltfBuffer, GltfBufferView, GltfDocument, GltfImage, GltfMaterial,
    GltfMesh, GltfNode, GltfPrimitive, GltfSampler, GltfScene, GltfTexture, GLTF_VERSION,
    NodeTransform,
};
use crate::gltf::resolve::is_resolved;

/// JSON number for an `f32`, at most 9 significant digits.
#[must_use]
pub fn number_f32(value: f32) -> Value {
    if !value.is_finite() {
        log::warn!("JSON: non-finite float {value} written as 0");
        return Value::from(0);
    }
    if value.fract() == 0.0 && value.abs() < 1.0e15 {
        return Value::from(value as i64);
    }
    // f32 Display is the shortest text that parses back to the same f32.
    let shortest: f64 = value.to_string().parse().unwrap_or(f64::from(value));
    Number::from_f64(shortest).map_or_else(|| Value::from(0), Value::Number)
}

fn floats(values: &[f32]) -> Value {
    Value::Array(values.iter().copied().map(number_f32).collect())
}

fn vec3(v: Vec3) -> Value {
    floats(&v.to_array())
}

fn vec4(v: Vec4) -> Value {
    floats(&v.to_array())
}

fn quat(q: Quat) -> Value {
    floats(&q.to_array())
}

fn mat4(m: Mat4) -> Value {
    floats(&m.to_cols_array())
}

fn bounds(b: &Bounds) -> Value {
    match b {
        Bounds::Float(values) => floats(values),
        Bounds::Unsigned(values) => Value::Array(values.iter().map(|&v| Value::from(v)).collect()),
    }
}

/// Reference index of `key`, failing if the collection is not resolved.
fn reference<K: Key, T>(collection: &Collection<K, T>, key: K) -> Result<usize> {
    collection
        .reference_index(key)
        .ok_or(ExportError::NotBuilt("reference indices are not assigned"))
}

fn array_of<K: Key, T>(
    collection: &Collection<K, T>,
    mut to_json: impl FnMut(&T) -> Result<Value>,
) -> Result<Option<Value>> {
    if collection.is_empty() {
        return Ok(None);
    }
    let items = collection
        .iter()
        .map(|(_, item)| to_json(item))
        .collect::<Result<Vec<_>>>()?;
    Ok(Some(Value::Array(items)))
}

fn insert_opt(map: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value);
    }
}

// ============================================================================
// Entities
// ============================================================================

fn scene_json(doc: &GltfDocument, scene: &GltfScene) -> Result<Value> {
    let nodes = scene
        .nodes
        .iter()
        .map(|&n| reference(&doc.nodes, n))
        .collect::<Result<Vec<_>>>()?;
    Ok(json!({ "name": scene.name, "nodes": nodes }))
}

fn node_json(doc: &GltfDocument, node: &GltfNode) -> Result<Value> {
    let mut map = Map::new();
    if !node.name.is_empty() {
        map.insert("name".into(), Value::from(node.name.clone()));
    }
    match node.transform {
        NodeTransform::Matrix(m) => {
            map.insert("matrix".into(), mat4(m));
        }
        NodeTransform::Trs {
            translation,
            rotation,
            scale,
        } => {
            map.insert("translation".into(), vec3(translation));
            map.insert("rotation".into(), quat(rotation));
            map.insert("scale".into(), vec3(scale));
        }
    }
    if !node.children.is_empty() {
        let children = node
            .children
            .iter()
            .map(|&c| reference(&doc.nodes, c))
            .collect::<Result<Vec<_>>>()?;
        map.insert("children".into(), json!(children));
    }
    if let Some(mesh) = node.mesh {
        map.insert("mesh".into(), json!(reference(&doc.meshes, mesh)?));
    }
    if !node.extras.is_empty() {
        map.insert("extras".into(), Value::Object(node.extras.clone()));
    }
    Ok(Value::Object(map))
}

fn primitive_json(doc: &GltfDocument, primitive: &GltfPrimitive) -> Result<Value> {
    let mut attributes = Map::new();
    for (name, accessor) in [
        ("POSITION", primitive.position),
        ("NORMAL", primitive.normal),
        ("TEXCOORD_0", primitive.texcoord),
    ] {
        if let Some(accessor) = accessor {
            attributes.insert(name.into(), json!(reference(&doc.accessors, accessor)?));
        }
    }
    let mut map = Map::new();
    map.insert("mode".into(), json!(primitive.mode));
    if let Some(indices) = primitive.indices {
        map.insert("indices".into(), json!(reference(&doc.accessors, indices)?));
    }
    map.insert(
        "material".into(),
        json!(reference(&doc.materials, primitive.material)?),
    );
    map.insert("attributes".into(), Value::Object(attributes));
    Ok(Value::Object(map))
}

fn mesh_json(doc: &GltfDocument, mesh: &GltfMesh) -> Result<Value> {
    let primitives = mesh
        .primitives
        .iter()
        .filter_map(|&p| doc.primitives.get(p))
        .filter(|p| {
            if p.position.is_none() {
                log::warn!("JSON: primitive {} has no vertex data, skipped", p.id);
            }
            p.position.is_some()
        })
        .map(|p| primitive_json(doc, p))
        .collect::<Result<Vec<_>>>()?;
    let mut map = Map::new();
    map.insert("name".into(), Value::from(mesh.name.clone()));
    map.insert("primitives".into(), Value::Array(primitives));
    if !mesh.extras.is_empty() {
        map.insert("extras".into(), Value::Object(mesh.extras.clone()));
    }
    Ok(Value::Object(map))
}

fn material_json(doc: &GltfDocument, material: &GltfMaterial) -> Result<Value> {
    let mut pbr = Map::new();
    pbr.insert("baseColorFactor".into(), vec4(material.base_color_factor));
    if let Some(texture) = material.base_color_texture {
        pbr.insert(
            "baseColorTexture".into(),
            json!({ "index": reference(&doc.textures, texture)? }),
        );
    }
    pbr.insert("metallicFactor".into(), number_f32(material.metallic_factor));

    let mut map = Map::new();
    map.insert("name".into(), Value::from(material.name.clone()));
    map.insert("pbrMetallicRoughness".into(), Value::Object(pbr));
    if let Some(emissive) = material.emissive_factor {
        map.insert("emissiveFactor".into(), vec3(emissive));
    }
    if material.alpha_blend {
        map.insert("alphaMode".into(), Value::from("BLEND"));
    }
    map.insert("doubleSided".into(), Value::from(material.double_sided));
    Ok(Value::Object(map))
}

fn texture_json(doc: &GltfDocument, texture: &GltfTexture) -> Result<Value> {
    Ok(json!({
        "source": reference(&doc.images, texture.source)?,
        "sampler": reference(&doc.samplers, texture.sampler)?,
    }))
}

fn image_json(image: &GltfImage) -> Value {
    json!({ "name": image.name, "uri": image.uri })
}

fn sampler_json(sampler: &GltfSampler) -> Value {
    json!({
        "name": sampler.name,
        "magFilter": sampler.mag_filter,
        "minFilter": sampler.min_filter,
        "wrapS": sampler.wrap_s,
        "wrapT": sampler.wrap_t,
    })
}

fn accessor_json(doc: &GltfDocument, accessor: &GltfAccessor) -> Result<Value> {
    let mut map = Map::new();
    map.insert(
        "bufferView".into(),
        json!(reference(&doc.buffer_views, accessor.buffer_view)?),
    );
    map.insert("byteOffset".into(), json!(accessor.byte_offset));
    map.insert(
        "componentType".into(),
        json!(accessor.component_type.gl_enum()),
    );
    map.insert("count".into(), json!(accessor.count));
    map.insert("type".into(), Value::from(accessor.kind.as_str()));
    insert_opt(&mut map, "min", accessor.min.as_ref().map(bounds));
    insert_opt(&mut map, "max", accessor.max.as_ref().map(bounds));
    Ok(Value::Object(map))
}

fn buffer_view_json(doc: &GltfDocument, view: &GltfBufferView) -> Result<Value> {
    let mut map = Map::new();
    map.insert("name".into(), Value::from(view.name.clone()));
    map.insert("buffer".into(), json!(reference(&doc.buffers, view.buffer)?));
    map.insert("byteOffset".into(), json!(view.byte_offset));
    map.insert("byteLength".into(), json!(view.byte_length));
    insert_opt(&mut map, "byteStride", view.byte_stride.map(Value::from));
    map.insert("target".into(), json!(view.target.gl_enum()));
    Ok(Value::Object(map))
}

fn buffer_json(buffer: &GltfBuffer) -> Value {
    json!({
        "name": buffer.name,
        "byteLength": buffer.bytes.len(),
        "uri": buffer.uri,
    })
}

fn asset_json(doc: &GltfDocument) -> Value {
    let mut map = Map::new();
    map.insert("generator".into(), Value::from(doc.asset.generator.clone()));
    map.insert("version".into(), Value::from(GLTF_VERSION));
    map.insert("copyright".into(), Value::from(doc.asset.copyright.clone()));
    if let Some(source) = &doc.asset.source {
        map.insert(
            "extras".into(),
            json!({
                "sceneGltf": {
                    "version": env!("CARGO_PKG_VERSION"),
                    "source": source,
                }
            }),
        );
    }
    Value::Object(map)
}

// ============================================================================
// Document
// ============================================================================

/// The whole document as a JSON value. The document must be resolved.
pub fn to_json_value(doc: &GltfDocument) -> Result<Value> {
    if !is_resolved(doc) {
        return Err(ExportError::NotBuilt("reference indices are not assigned"));
    }
    let mut root = Map::new();
    if let Some(scene) = doc.scene {
        root.insert("scene".into(), json!(reference(&doc.scenes, scene)?));
    }
    root.insert("asset".into(), asset_json(doc));

    insert_opt(&mut root, "scenes", array_of(&doc.scenes, |s| scene_json(doc, s))?);
    insert_opt(&mut root, "nodes", array_of(&doc.nodes, |n| node_json(doc, n))?);
    insert_opt(&mut root, "meshes", array_of(&doc.meshes, |m| mesh_json(doc, m))?);
    insert_opt(
        &mut root,
        "accessors",
        array_of(&doc.accessors, |a| accessor_json(doc, a))?,
    );
    insert_opt(
        &mut root,
        "bufferViews",
        array_of(&doc.buffer_views, |v| buffer_view_json(doc, v))?,
    );
    insert_opt(
        &mut root,
        "materials",
        array_of(&doc.materials, |m| material_json(doc, m))?,
    );
    insert_opt(
        &mut root,
        "textures",
        array_of(&doc.textures, |t| texture_json(doc, t))?,
    );
    insert_opt(&mut root, "images", array_of(&doc.images, |i| Ok(image_json(i)))?);
    insert_opt(
        &mut root,
        "samplers",
        array_of(&doc.samplers, |s| Ok(sampler_json(s)))?,
    );
    insert_opt(&mut root, "buffers", array_of(&doc.buffers, |b| Ok(buffer_json(b)))?);

    if !doc.extensions_used().is_empty() {
        root.insert("extensionsUsed".into(), json!(doc.extensions_used()));
    }
    if !doc.extensions_required().is_empty() {
        root.insert("extensionsRequired".into(), json!(doc.extensions_required()));
    }
    Ok(Value::Object(root))
}

pub fn to_json_string(doc: &GltfDocument, pretty: bool) -> Result<String> {
    let value = to_json_value(doc)?;
    let text = if pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    Ok(text)
}
