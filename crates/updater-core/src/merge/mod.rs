//! Geometry merging: move freshly imported geometry into existing entities
//!
//! The target keeps its name, parent, transform, materials and custom
//! properties. Only its geometry and UV layer contents change. Imported
//! entities are temporary and are removed from the document once the merge
//! finishes, whether it succeeded or not.

mod geometry;
mod hierarchy;

use crate::document::{Document, DocumentError, Entity, EntityData, EntityId, EntityKind};

pub use geometry::replace_geometry;
pub use hierarchy::{base_name, find_prefix_match};

/// Merge behavior switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// For targets that are neither mesh nor empty, keep the first imported
    /// entity renamed after the target instead of discarding it
    pub legacy_rename_fallback: bool,
}

/// Merge errors (all of them skip the entry, none abort a run)
#[derive(Debug, Clone, thiserror::Error)]
pub enum MergeError {
    #[error("No existing object named '{0}' to replace")]
    NoSuchTarget(String),
    #[error("No imported mesh found to replace '{0}'")]
    NoMeshToMerge(String),
    #[error("Object type '{kind}' of '{name}' not supported for merging")]
    UnsupportedTargetKind { name: String, kind: String },
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),
}

/// How a target takes new geometry
#[derive(Debug, Clone, PartialEq, Eq)]
enum MergeTarget {
    Mesh,
    /// Empty; `own_mesh` when it carries mesh data of its own
    Group { own_mesh: bool },
    Unsupported(String),
}

impl MergeTarget {
    fn of(entity: &Entity) -> Self {
        match &entity.data {
            EntityData::Mesh(_) => MergeTarget::Mesh,
            EntityData::Empty { mesh } => MergeTarget::Group {
                own_mesh: mesh.is_some(),
            },
            EntityData::Other { type_name } => MergeTarget::Unsupported(type_name.clone()),
        }
    }
}

/// Replace the geometry of `target_name` with the imported entities
///
/// Returns the target name on success.
pub fn merge(
    doc: &mut Document,
    target_name: &str,
    imported: &[EntityId],
    options: &MergeOptions,
) -> Result<String, MergeError> {
    let mut keep = None;
    let result = merge_into(doc, target_name, imported, options, &mut keep);

    for id in imported.iter().copied() {
        if Some(id) != keep && doc.contains(id) {
            doc.remove_entity(id)?;
        }
    }

    result.map(|()| target_name.to_string())
}

fn merge_into(
    doc: &mut Document,
    target_name: &str,
    imported: &[EntityId],
    options: &MergeOptions,
    keep: &mut Option<EntityId>,
) -> Result<(), MergeError> {
    // An imported entity that happens to carry the target name is not a target
    let (target_id, plan) = doc
        .find_by_name(target_name)
        .filter(|id| !imported.contains(id))
        .and_then(|id| doc.get(id).map(|e| (id, MergeTarget::of(e))))
        .ok_or_else(|| MergeError::NoSuchTarget(target_name.to_string()))?;

    match plan {
        MergeTarget::Mesh => {
            let source = first_of_kind(doc, imported, EntityKind::Mesh)
                .ok_or_else(|| MergeError::NoMeshToMerge(target_name.to_string()))?;
            doc.apply_transform(source, false, true, true)?;
            copy_mesh(doc, source, target_id)?;
        }
        MergeTarget::Group { own_mesh } => {
            merge_group(doc, target_id, target_name, own_mesh, imported)?;
        }
        MergeTarget::Unsupported(kind) => {
            if options.legacy_rename_fallback {
                *keep = rename_first(doc, target_name, imported)?;
            }
            return Err(MergeError::UnsupportedTargetKind {
                name: target_name.to_string(),
                kind,
            });
        }
    }

    tracing::info!("Replaced geometry of '{}'", target_name);
    Ok(())
}

/// Empty target: own mesh from a lone imported empty, children by name prefix
fn merge_group(
    doc: &mut Document,
    target_id: EntityId,
    target_name: &str,
    own_mesh: bool,
    imported: &[EntityId],
) -> Result<(), MergeError> {
    let mut replaced = 0;

    if own_mesh {
        let empties: Vec<EntityId> = imported
            .iter()
            .copied()
            .filter(|id| {
                doc.get(*id)
                    .is_some_and(|e| e.kind() == EntityKind::Empty && e.mesh().is_some())
            })
            .collect();
        if let [source] = empties.as_slice() {
            doc.apply_transform(*source, false, true, true)?;
            copy_mesh(doc, *source, target_id)?;
            replaced += 1;
        } else {
            tracing::debug!(
                "'{}': {} imported empties carry mesh data, own geometry left unchanged",
                target_name,
                empties.len()
            );
        }
    }

    let meshes: Vec<EntityId> = imported
        .iter()
        .copied()
        .filter(|id| doc.get(*id).is_some_and(|e| e.kind() == EntityKind::Mesh))
        .collect();
    for id in &meshes {
        doc.apply_transform(*id, false, true, true)?;
    }

    let children: Vec<(EntityId, String)> = doc
        .get(target_id)
        .map(|t| t.children.clone())
        .unwrap_or_default()
        .into_iter()
        .filter_map(|id| {
            doc.get(id)
                .filter(|e| e.kind() == EntityKind::Mesh)
                .map(|e| (id, e.name.clone()))
        })
        .collect();

    for (child_id, child_name) in children {
        match find_prefix_match(doc, base_name(&child_name), &meshes) {
            Some(source) => {
                copy_mesh(doc, source, child_id)?;
                replaced += 1;
            }
            None => tracing::debug!("No imported mesh matches child '{}'", child_name),
        }
    }

    if replaced == 0 {
        return Err(MergeError::NoMeshToMerge(target_name.to_string()));
    }
    Ok(())
}

fn first_of_kind(doc: &Document, ids: &[EntityId], kind: EntityKind) -> Option<EntityId> {
    ids.iter()
        .copied()
        .find(|id| doc.get(*id).is_some_and(|e| e.kind() == kind))
}

/// Copy the mesh of `source` into `target`, logging validation warnings
fn copy_mesh(doc: &mut Document, source: EntityId, target: EntityId) -> Result<(), MergeError> {
    let source_mesh = doc
        .get(source)
        .ok_or(DocumentError::EntityNotFound(source))?
        .mesh()
        .cloned()
        .unwrap_or_default();

    let target_entity = doc
        .get_mut(target)
        .ok_or(DocumentError::EntityNotFound(target))?;
    let Some(target_mesh) = target_entity.mesh_mut() else {
        return Ok(());
    };

    for warning in replace_geometry(target_mesh, &source_mesh) {
        tracing::warn!("Mesh '{}': {}", target_entity.name, warning);
    }
    Ok(())
}

/// Keep the first imported entity under the target's name (deduplicated)
fn rename_first(
    doc: &mut Document,
    target_name: &str,
    imported: &[EntityId],
) -> Result<Option<EntityId>, MergeError> {
    let Some(&first) = imported.first() else {
        tracing::warn!("No imported object to rename");
        return Ok(None);
    };

    let assigned = doc.rename(first, target_name)?;
    if let Some(mesh) = doc.get_mut(first).and_then(|e| e.mesh_mut()) {
        mesh.name = target_name.to_string();
    }
    tracing::warn!("Kept imported object as '{}' next to '{}'", assigned, target_name);
    Ok(Some(first))
}
