//! STL file loading

use std::io::BufReader;
use std::path::Path;

use crate::document::{Document, EntityData, EntityId, MeshData};

use super::{ImportError, file_stem_name};

/// Scale applied to STL coordinates: files are in millimeters, documents in meters
pub const STL_UNIT_SCALE: f32 = 0.001;

/// Load an STL file (ASCII or binary) as one mesh entity named after the file stem
pub fn import_stl(doc: &mut Document, path: &Path) -> Result<EntityId, ImportError> {
    let file = std::fs::File::open(path).map_err(|e| ImportError::Io(e.to_string()))?;
    let mut reader = BufReader::new(file);

    let mesh = stl_io::read_stl(&mut reader).map_err(|e| ImportError::Parse(e.to_string()))?;

    let vertices: Vec<[f32; 3]> = mesh
        .vertices
        .iter()
        .map(|v| {
            [
                v[0] * STL_UNIT_SCALE,
                v[1] * STL_UNIT_SCALE,
                v[2] * STL_UNIT_SCALE,
            ]
        })
        .collect();
    let polygons: Vec<[u32; 3]> = mesh
        .faces
        .iter()
        .map(|face| {
            [
                face.vertices[0] as u32,
                face.vertices[1] as u32,
                face.vertices[2] as u32,
            ]
        })
        .collect();

    let name = file_stem_name(path);
    let data = MeshData::from_polygons(name.as_str(), vertices, &polygons);
    tracing::debug!(
        "STL {:?}: {} vertices, {} triangles",
        path,
        data.vertex_count(),
        data.polygon_count()
    );

    Ok(doc.add_entity(&name, EntityData::Mesh(data)))
}

/// Write an STL file from triangles given in file units
#[cfg(test)]
pub(crate) fn write_test_stl(path: &Path, triangles: &[[[f32; 3]; 3]]) {
    let triangles: Vec<stl_io::Triangle> = triangles
        .iter()
        .map(|t| stl_io::Triangle {
            normal: stl_io::Normal::new([0.0, 0.0, 1.0]),
            vertices: [
                stl_io::Vertex::new(t[0]),
                stl_io::Vertex::new(t[1]),
                stl_io::Vertex::new(t[2]),
            ],
        })
        .collect();
    let mut file = std::fs::File::create(path).unwrap();
    stl_io::write_stl(&mut file, triangles.iter()).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_import_stl_scales_and_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bracket.stl");
        write_test_stl(
            &path,
            &[
                [[0.0, 0.0, 0.0], [1000.0, 0.0, 0.0], [0.0, 1000.0, 0.0]],
                [[1000.0, 0.0, 0.0], [1000.0, 1000.0, 0.0], [0.0, 1000.0, 0.0]],
            ],
        );

        let mut doc = Document::new();
        let id = import_stl(&mut doc, &path).unwrap();
        let entity = doc.get(id).unwrap();

        assert_eq!(entity.name, "bracket");
        let mesh = entity.mesh().unwrap();
        assert_eq!(mesh.name, "bracket");
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.polygon_count(), 2);
        assert_eq!(mesh.loop_count(), 6);
        assert!(mesh.uv_layers.is_empty());

        let max_x = mesh.vertices.iter().map(|v| v[0]).fold(f32::MIN, f32::max);
        assert_relative_eq!(max_x, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_import_stl_garbage_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.stl");
        std::fs::write(&path, b"not an stl").unwrap();

        let mut doc = Document::new();
        let result = import_stl(&mut doc, &path);
        assert!(matches!(result, Err(ImportError::Parse(_))));
        assert!(doc.is_empty());
    }
}
