//! glTF / GLB scene loading
//!
//! Every node of the default scene becomes a document entity. Nodes with a
//! mesh become mesh entities, the rest become empties, and the node hierarchy
//! is reproduced with parent links. glTF is Y-up; the document is Z-up.

use std::path::Path;

use glam::{Quat, Vec3};

use crate::document::{Document, EntityData, EntityId, MeshData, Transform};

use super::ImportError;

/// A node read from the file, not yet inserted into the document
struct PendingNode {
    name: String,
    data: EntityData,
    transform: Transform,
    parent: Option<usize>,
}

fn map_gltf_error(error: gltf::Error) -> ImportError {
    match error {
        gltf::Error::Io(e) => ImportError::Io(e.to_string()),
        other => ImportError::Parse(other.to_string()),
    }
}

/// Load a .gltf or .glb file, returning the created entities
///
/// Only buffers are loaded. Images are never read, so a texture that is
/// missing or in an unknown encoding does not block the geometry.
pub fn import_gltf(doc: &mut Document, path: &Path) -> Result<Vec<EntityId>, ImportError> {
    let gltf = gltf::Gltf::open(path).map_err(map_gltf_error)?;
    let gltf_doc = gltf.document;
    let buffers =
        gltf::import_buffers(&gltf_doc, path.parent(), gltf.blob).map_err(map_gltf_error)?;

    let Some(scene) = gltf_doc.default_scene().or_else(|| gltf_doc.scenes().next()) else {
        tracing::warn!("glTF file {:?} contains no scene", path);
        return Ok(Vec::new());
    };

    // Read everything before touching the document
    let mut pending = Vec::new();
    for node in scene.nodes() {
        collect_node(&node, None, &buffers, &mut pending);
    }

    let mut ids: Vec<EntityId> = Vec::with_capacity(pending.len());
    for node in pending {
        let id = doc.add_entity(&node.name, node.data);
        if let Some(entity) = doc.get_mut(id) {
            entity.transform = node.transform;
        }
        if let Some(parent) = node.parent {
            doc.set_parent(id, Some(ids[parent]))
                .map_err(|e| ImportError::Parse(e.to_string()))?;
        }
        ids.push(id);
    }

    tracing::debug!("glTF {:?}: {} nodes", path, ids.len());
    Ok(ids)
}

fn collect_node(
    node: &gltf::Node,
    parent: Option<usize>,
    buffers: &[gltf::buffer::Data],
    out: &mut Vec<PendingNode>,
) {
    let name = node
        .name()
        .or_else(|| node.mesh().and_then(|m| m.name()))
        .map(str::to_string)
        .unwrap_or_else(|| format!("Node.{}", node.index()));

    let data = match node.mesh() {
        Some(mesh) => EntityData::Mesh(convert_mesh(&mesh, buffers)),
        None => EntityData::Empty { mesh: None },
    };

    let (translation, rotation, scale) = node.transform().decomposed();
    let transform = Transform {
        translation: Vec3::from(y_up_to_z_up(translation)),
        rotation: Quat::from_xyzw(rotation[0], -rotation[2], rotation[1], rotation[3]),
        scale: Vec3::new(scale[0], scale[2], scale[1]),
    };

    let index = out.len();
    out.push(PendingNode {
        name,
        data,
        transform,
        parent,
    });

    for child in node.children() {
        collect_node(&child, Some(index), buffers, out);
    }
}

/// Concatenate all triangle primitives of a mesh
fn convert_mesh(mesh: &gltf::Mesh, buffers: &[gltf::buffer::Data]) -> MeshData {
    let label = mesh
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("Mesh.{}", mesh.index()));

    let mut vertices: Vec<[f32; 3]> = Vec::new();
    let mut polygons: Vec<[u32; 3]> = Vec::new();
    // Per-loop coordinates for each TEXCOORD set
    let mut uv_sets: Vec<Vec<[f32; 2]>> = Vec::new();

    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            tracing::warn!(
                "Skipping non-triangle primitive {} of mesh '{}'",
                primitive.index(),
                label
            );
            continue;
        }

        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| d.0.as_slice()));
        let Some(positions) = reader.read_positions() else {
            continue;
        };
        let positions: Vec<[f32; 3]> = positions.map(y_up_to_z_up).collect();

        let mut indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };
        indices.truncate(indices.len() / 3 * 3);

        let loops_before = polygons.len() * 3;
        let mut set = 0;
        while let Some(tex_coords) = reader.read_tex_coords(set) {
            let per_vertex: Vec<[f32; 2]> = tex_coords.into_f32().map(|[u, v]| [u, 1.0 - v]).collect();
            let slot = set as usize;
            if uv_sets.len() <= slot {
                uv_sets.push(vec![[0.0; 2]; loops_before]);
            }
            uv_sets[slot].extend(
                indices
                    .iter()
                    .map(|&i| per_vertex.get(i as usize).copied().unwrap_or([0.0; 2])),
            );
            set += 1;
        }

        let offset = vertices.len() as u32;
        vertices.extend(positions);
        polygons.extend(
            indices
                .chunks_exact(3)
                .map(|tri| [tri[0] + offset, tri[1] + offset, tri[2] + offset]),
        );

        let loop_count = polygons.len() * 3;
        for uv in &mut uv_sets {
            uv.resize(loop_count, [0.0; 2]);
        }
    }

    let mut data = MeshData::from_polygons(label, vertices, &polygons);
    for (i, uv) in uv_sets.into_iter().enumerate() {
        let name = if i == 0 {
            "UVMap".to_string()
        } else {
            format!("UVMap.{:03}", i)
        };
        data.add_uv_layer(name).data = uv;
    }
    data
}

fn y_up_to_z_up(p: [f32; 3]) -> [f32; 3] {
    [p[0], -p[2], p[1]]
}

/// Write a small glTF scene: empty "rotor" (translated up) with mesh
/// children "blade" and "blade_tip", both a single UV-mapped triangle
#[cfg(test)]
pub(crate) fn write_test_gltf(path: &Path) {
    std::fs::write(path, TEST_GLTF).unwrap();
}

#[cfg(test)]
const TEST_GLTF: &str = r#"{
  "asset": { "version": "2.0" },
  "scene": 0,
  "scenes": [{ "nodes": [0] }],
  "nodes": [
    { "name": "rotor", "children": [1, 2], "translation": [0.0, 2.0, 0.0] },
    { "name": "blade", "mesh": 0 },
    { "name": "blade_tip", "mesh": 0, "scale": [2.0, 2.0, 2.0] }
  ],
  "meshes": [{
    "name": "BladeMesh",
    "primitives": [{ "attributes": { "POSITION": 0, "TEXCOORD_0": 1 }, "indices": 2 }]
  }],
  "accessors": [
    { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
      "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
    { "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC2" },
    { "bufferView": 2, "componentType": 5123, "count": 3, "type": "SCALAR" }
  ],
  "bufferViews": [
    { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
    { "buffer": 0, "byteOffset": 36, "byteLength": 24 },
    { "buffer": 0, "byteOffset": 60, "byteLength": 6 }
  ],
  "buffers": [{
    "byteLength": 68,
    "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAAAAAAAAAAAAAAAIA/AAAAAAAAAAAAAIA/AAABAAIAAAA="
  }]
}"#;
