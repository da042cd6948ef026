//! Document file loading and saving (RON)

use std::path::Path;

use super::{Document, DocumentError};

impl Document {
    /// Load a document from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| DocumentError::Io(e.to_string()))?;
        let mut document: Document =
            ron::from_str(&content).map_err(|e| DocumentError::Parse(e.to_string()))?;
        document.restore()?;

        tracing::info!("Loaded document from {:?} ({} entities)", path, document.len());
        Ok(document)
    }

    /// Save the document to a RON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| DocumentError::Io(e.to_string()))?;
        }

        let content = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| DocumentError::Serialize(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| DocumentError::Io(e.to_string()))?;

        tracing::info!("Saved document to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PartSpec, UpdateConfig};
    use crate::document::{EntityData, MeshData, PropertyValue};
    use crate::import::stl::write_test_stl;
    use crate::updater::Updater;

    #[test]
    fn test_save_and_load_preserves_entities() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.ron");

        let mut doc = Document::new();
        let root = doc.add_entity("assembly", EntityData::Empty { mesh: None });
        let mut mesh = MeshData::from_polygons(
            "body",
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            &[[0u32, 1, 2]],
        );
        mesh.add_uv_layer("UVMap").data[1] = [0.5, 0.25];
        let body = doc.add_entity("body.stl", EntityData::Mesh(mesh));
        doc.set_parent(body, Some(root)).unwrap();
        let entity = doc.get_mut(body).unwrap();
        entity.materials.push("Steel".to_string());
        entity
            .custom_properties
            .insert("part_no".to_string(), PropertyValue::Int(42));

        doc.save(&path).unwrap();
        let loaded = Document::load(&path).unwrap();

        assert_eq!(loaded.len(), 2);
        let id = loaded.find_by_name("body.stl").unwrap();
        assert_eq!(loaded.get(id), doc.get(body));

        // next_id survives so new entities never reuse ids
        let mut loaded = loaded;
        let fresh = loaded.add_entity("fresh", EntityData::Empty { mesh: None });
        assert!(fresh > id);
    }

    #[test]
    fn test_stale_next_id_does_not_clobber_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.ron");
        let stl = dir.path().join("cube.stl");
        write_test_stl(
            &stl,
            &[[[0.0, 0.0, 0.0], [1000.0, 0.0, 0.0], [0.0, 1000.0, 0.0]]],
        );

        let mut doc = Document::new();
        let target = doc.add_entity("cube.stl", EntityData::Mesh(MeshData::new("cube")));
        doc.get_mut(target).unwrap().materials.push("Steel".to_string());
        doc.next_id = 0;
        doc.save(&path).unwrap();

        let mut loaded = Document::load(&path).unwrap();
        let config = UpdateConfig {
            parts: vec![PartSpec {
                name: stl.to_string_lossy().to_string(),
            }],
            ..Default::default()
        };
        let report = Updater::new(config).update_all(&mut loaded);

        assert!(report.is_clean());
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.find_by_name("cube.stl"), Some(target));
        let entity = loaded.get(target).unwrap();
        assert_eq!(entity.materials, vec!["Steel".to_string()]);
        assert_eq!(entity.mesh().unwrap().polygon_count(), 1);
    }

    #[test]
    fn test_load_rejects_duplicate_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.ron");

        let mut doc = Document::new();
        doc.add_entity("bolt", EntityData::Empty { mesh: None });
        let second = doc.add_entity("nut", EntityData::Empty { mesh: None });
        doc.entities.get_mut(&second).unwrap().name = "bolt".to_string();
        doc.save(&path).unwrap();

        assert!(matches!(
            Document::load(&path),
            Err(DocumentError::DuplicateName(name)) if name == "bolt"
        ));
    }

    #[test]
    fn test_load_rejects_one_sided_parent_link() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.ron");

        let mut doc = Document::new();
        let root = doc.add_entity("frame", EntityData::Empty { mesh: None });
        let child = doc.add_entity("arm", EntityData::Empty { mesh: None });
        doc.entities.get_mut(&child).unwrap().parent = Some(root);
        doc.save(&path).unwrap();

        assert!(matches!(
            Document::load(&path),
            Err(DocumentError::BrokenHierarchy(id)) if id == child
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Document::load("/nonexistent/scene.ron");
        assert!(matches!(result, Err(DocumentError::Io(_))));
    }
}
