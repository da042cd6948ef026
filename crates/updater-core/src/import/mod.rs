//! Mesh file import (STL, glTF/GLB) into temporary document entities

pub(crate) mod gltf_scene;
pub(crate) mod stl;

use std::path::Path;

use crate::document::{Document, EntityId};

pub use gltf_scene::import_gltf;
pub use stl::{STL_UNIT_SCALE, import_stl};

/// Import format, chosen from the extension of the expected target name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshFormat {
    Stl,
    Gltf,
    Unsupported(String),
}

impl MeshFormat {
    /// Detect format from a name's extension
    ///
    /// The extension is the text after the final `.`; a name without a `.` is
    /// taken whole.
    pub fn from_name(name: &str) -> Self {
        let ext = name.rsplit_once('.').map_or(name, |(_, ext)| ext);
        match ext.to_lowercase().as_str() {
            "stl" => MeshFormat::Stl,
            "gltf" | "glb" => MeshFormat::Gltf,
            _ => MeshFormat::Unsupported(ext.to_string()),
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, MeshFormat::Unsupported(_))
    }

    pub fn name(&self) -> &str {
        match self {
            MeshFormat::Stl => "STL",
            MeshFormat::Gltf => "glTF/GLB",
            MeshFormat::Unsupported(ext) => ext,
        }
    }
}

/// Import errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ImportError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("Nothing imported from '{0}'")]
    NothingImported(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Import a mesh file into the document
///
/// The format is taken from `expected_name`, not from `file_path`. Returns
/// every entity the import introduced, in creation order and regardless of
/// type.
pub fn import(
    doc: &mut Document,
    file_path: impl AsRef<Path>,
    expected_name: &str,
) -> Result<Vec<EntityId>, ImportError> {
    let file_path = file_path.as_ref();
    let format = MeshFormat::from_name(expected_name);
    tracing::info!("Importing file {:?} with name '{}'", file_path, expected_name);

    let before = doc.snapshot();
    match format {
        MeshFormat::Stl => {
            import_stl(doc, file_path)?;
        }
        MeshFormat::Gltf => {
            import_gltf(doc, file_path)?;
        }
        MeshFormat::Unsupported(ext) => return Err(ImportError::UnsupportedFormat(ext)),
    }

    let imported = doc.ids_since(&before);
    if imported.is_empty() {
        return Err(ImportError::NothingImported(
            file_path.to_string_lossy().to_string(),
        ));
    }

    tracing::debug!("Imported {} entities from {:?}", imported.len(), file_path);
    Ok(imported)
}

/// Entity name for a file: its stem, or "unnamed"
pub(crate) fn file_stem_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unnamed")
        .to_string()
}
