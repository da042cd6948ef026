//! Geometry replacement that keeps the target's UV layers by name

use crate::document::{MeshData, MeshWarning};

/// Replace `target`'s geometry with `source`'s, restoring UV layers by name
///
/// UV coordinates are stored per loop, so they can only be carried over when
/// the new geometry has exactly as many loops as the layer had. Layers whose
/// length does not match are recreated empty (zeroed). Every polygon ends up
/// smooth shaded. Returns the warnings produced by validating the result.
pub fn replace_geometry(target: &mut MeshData, source: &MeshData) -> Vec<MeshWarning> {
    let uv_backup: Vec<(String, Vec<[f32; 2]>)> = target
        .uv_layers
        .iter()
        .map(|layer| (layer.name.clone(), layer.data.clone()))
        .collect();

    target.remove_uv_layers();
    target.clear_geometry();
    target.set_geometry(source.vertices.clone(), &source.polygon_lists());

    for (name, data) in uv_backup {
        let layer = target.add_uv_layer(name);
        if data.len() == layer.data.len() {
            layer.data = data;
        } else {
            tracing::debug!(
                "UV layer '{}' has {} loops, mesh has {}: left empty",
                layer.name,
                data.len(),
                layer.data.len()
            );
        }
    }

    target.set_smooth_all(true);
    target.validate()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(name: &str, size: f32) -> MeshData {
        MeshData::from_polygons(
            name,
            vec![[0.0, 0.0, 0.0], [size, 0.0, 0.0], [size, size, 0.0], [0.0, size, 0.0]],
            &[vec![0u32, 1, 2, 3]],
        )
    }

    fn triangles(name: &str) -> MeshData {
        MeshData::from_polygons(
            name,
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            &[[0u32, 1, 2], [0, 2, 3]],
        )
    }

    fn with_uvs(mut mesh: MeshData, layer: &str) -> MeshData {
        let uv = mesh.add_uv_layer(layer);
        for (i, c) in uv.data.iter_mut().enumerate() {
            *c = [i as f32 * 0.25, 1.0 - i as f32 * 0.25];
        }
        mesh
    }

    #[test]
    fn test_uv_layer_survives_matching_topology() {
        let mut target = with_uvs(quad("target", 1.0), "UVMap");
        let before = target.uv_layers[0].data.clone();
        let source = quad("source", 2.0);

        let warnings = replace_geometry(&mut target, &source);

        assert!(warnings.is_empty());
        assert_eq!(target.vertices, source.vertices);
        assert_eq!(target.polygon_lists(), source.polygon_lists());
        assert_eq!(target.uv_layers.len(), 1);
        assert_eq!(target.uv_layers[0].name, "UVMap");
        assert_eq!(target.uv_layers[0].data, before);
    }

    #[test]
    fn test_uv_layer_zeroed_on_topology_change() {
        let mut target = with_uvs(quad("target", 1.0), "UVMap");
        let source = triangles("source");

        replace_geometry(&mut target, &source);

        let layer = target.uv_layer("UVMap").unwrap();
        assert_eq!(layer.data.len(), 6);
        assert!(layer.data.iter().all(|uv| *uv == [0.0, 0.0]));
    }

    #[test]
    fn test_layer_order_and_names_preserved() {
        let mut target = with_uvs(with_uvs(quad("target", 1.0), "UVMap"), "Lightmap");
        replace_geometry(&mut target, &quad("source", 3.0));

        let names: Vec<&str> = target.uv_layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["UVMap", "Lightmap"]);
    }

    #[test]
    fn test_label_kept_and_polygons_smooth() {
        let mut target = quad("target", 1.0);
        replace_geometry(&mut target, &triangles("source"));

        assert_eq!(target.name, "target");
        assert_eq!(target.smooth, vec![true, true]);
    }

    #[test]
    fn test_source_uvs_are_not_copied() {
        let mut target = quad("target", 1.0);
        let source = with_uvs(quad("source", 1.0), "SourceUV");

        replace_geometry(&mut target, &source);
        assert!(target.uv_layers.is_empty());
    }

    #[test]
    fn test_remerge_is_idempotent() {
        let source = quad("source", 2.0);
        let mut target = with_uvs(quad("target", 1.0), "UVMap");

        replace_geometry(&mut target, &source);
        let first = target.clone();
        replace_geometry(&mut target, &source);

        assert_eq!(target, first);
    }

    #[test]
    fn test_invalid_source_polygons_reported() {
        let mut target = quad("target", 1.0);
        let source = MeshData::from_polygons(
            "source",
            vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            &[vec![0u32, 1, 2], vec![0, 1]],
        );

        let warnings = replace_geometry(&mut target, &source);

        assert_eq!(warnings.len(), 1);
        assert_eq!(target.polygon_count(), 1);
    }
}
