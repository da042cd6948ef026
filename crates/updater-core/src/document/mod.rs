//! Scene document: named entities, hierarchy, transforms and mesh payloads
//!
//! The document is the single mutable resource every operation works on. It
//! is always passed explicitly; nothing in this crate holds it globally.

mod mesh;
mod persist;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

pub use mesh::{MeshData, MeshWarning, Polygon, UvLayer};

/// Handle to an entity in a [`Document`]
///
/// Ids are allocated in increasing order, so sorting by id gives creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Local transform (translation, rotation, scale)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    pub fn from_mat4(matrix: &Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }
}

/// Custom property value attached to an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// Entity payload
///
/// Only meshes and empties take part in geometry replacement; any other object
/// type (cameras, lights, armatures, …) is carried as `Other`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityData {
    Mesh(MeshData),
    /// Grouping node, optionally carrying its own mesh data
    Empty { mesh: Option<MeshData> },
    Other { type_name: String },
}

/// Payload-free entity type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Mesh,
    Empty,
    Other,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Mesh => "MESH",
            EntityKind::Empty => "EMPTY",
            EntityKind::Other => "OTHER",
        };
        f.write_str(name)
    }
}

/// A named object in the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub data: EntityData,
    pub parent: Option<EntityId>,
    pub children: Vec<EntityId>,
    pub transform: Transform,
    /// Material slot names
    #[serde(default)]
    pub materials: Vec<String>,
    #[serde(default)]
    pub custom_properties: BTreeMap<String, PropertyValue>,
}

impl Entity {
    fn new(name: String, data: EntityData) -> Self {
        Self {
            name,
            data,
            parent: None,
            children: Vec::new(),
            transform: Transform::IDENTITY,
            materials: Vec::new(),
            custom_properties: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self.data {
            EntityData::Mesh(_) => EntityKind::Mesh,
            EntityData::Empty { .. } => EntityKind::Empty,
            EntityData::Other { .. } => EntityKind::Other,
        }
    }

    /// Mesh payload of a mesh entity or of an empty carrying mesh data
    pub fn mesh(&self) -> Option<&MeshData> {
        match &self.data {
            EntityData::Mesh(mesh) => Some(mesh),
            EntityData::Empty { mesh } => mesh.as_ref(),
            EntityData::Other { .. } => None,
        }
    }

    pub fn mesh_mut(&mut self) -> Option<&mut MeshData> {
        match &mut self.data {
            EntityData::Mesh(mesh) => Some(mesh),
            EntityData::Empty { mesh } => mesh.as_mut(),
            EntityData::Other { .. } => None,
        }
    }
}

/// Document-related errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum DocumentError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),
    #[error("Parenting would create a cycle")]
    WouldCreateCycle,
    #[error("Duplicate entity name '{0}'")]
    DuplicateName(String),
    #[error("Inconsistent hierarchy at entity {0}")]
    BrokenHierarchy(EntityId),
}

/// The scene document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    entities: BTreeMap<EntityId, Entity>,
    next_id: u64,
    #[serde(skip)]
    name_index: HashMap<String, EntityId>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Add an entity, returning its id
    ///
    /// A name that is already taken gets a `.001`, `.002`, … suffix.
    pub fn add_entity(&mut self, name: &str, data: EntityData) -> EntityId {
        let id = self.allocate_id();

        let name = self.unique_name(name);
        self.name_index.insert(name.clone(), id);
        self.entities.insert(id, Entity::new(name, data));
        id
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<EntityId> {
        self.name_index.get(name).copied()
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Entity> {
        self.find_by_name(name).and_then(|id| self.get(id))
    }

    /// All entity ids in creation order
    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities.iter().map(|(id, e)| (*id, e))
    }

    /// Snapshot of the current entity set
    pub fn snapshot(&self) -> BTreeSet<EntityId> {
        self.entities.keys().copied().collect()
    }

    /// Entities present now but absent from `before`, in creation order
    pub fn ids_since(&self, before: &BTreeSet<EntityId>) -> Vec<EntityId> {
        self.entities
            .keys()
            .filter(|id| !before.contains(id))
            .copied()
            .collect()
    }

    /// Parent `child` under `parent`, or detach it when `parent` is `None`
    pub fn set_parent(
        &mut self,
        child: EntityId,
        parent: Option<EntityId>,
    ) -> Result<(), DocumentError> {
        if !self.contains(child) {
            return Err(DocumentError::EntityNotFound(child));
        }
        if let Some(parent_id) = parent {
            if !self.contains(parent_id) {
                return Err(DocumentError::EntityNotFound(parent_id));
            }
            if self.would_create_cycle(parent_id, child) {
                return Err(DocumentError::WouldCreateCycle);
            }
        }

        let old_parent = self.entities.get(&child).and_then(|e| e.parent);
        if let Some(old) = old_parent
            && let Some(old_entity) = self.entities.get_mut(&old)
        {
            old_entity.children.retain(|c| *c != child);
        }

        if let Some(parent_id) = parent
            && let Some(parent_entity) = self.entities.get_mut(&parent_id)
        {
            parent_entity.children.push(child);
        }
        if let Some(entity) = self.entities.get_mut(&child) {
            entity.parent = parent;
        }
        Ok(())
    }

    fn would_create_cycle(&self, parent: EntityId, child: EntityId) -> bool {
        let mut current = Some(parent);
        while let Some(id) = current {
            if id == child {
                return true;
            }
            current = self.entities.get(&id).and_then(|e| e.parent);
        }
        false
    }

    /// Remove an entity; its children become roots
    pub fn remove_entity(&mut self, id: EntityId) -> Result<Entity, DocumentError> {
        let entity = self
            .entities
            .remove(&id)
            .ok_or(DocumentError::EntityNotFound(id))?;
        self.name_index.remove(&entity.name);

        if let Some(parent) = entity.parent
            && let Some(parent_entity) = self.entities.get_mut(&parent)
        {
            parent_entity.children.retain(|c| *c != id);
        }
        for child in &entity.children {
            if let Some(child_entity) = self.entities.get_mut(child) {
                child_entity.parent = None;
            }
        }

        Ok(entity)
    }

    /// Rename an entity, returning the name actually assigned
    pub fn rename(&mut self, id: EntityId, name: &str) -> Result<String, DocumentError> {
        let old = self
            .entities
            .get(&id)
            .map(|e| e.name.clone())
            .ok_or(DocumentError::EntityNotFound(id))?;
        if old == name {
            return Ok(old);
        }

        self.name_index.remove(&old);
        let name = self.unique_name(name);
        self.name_index.insert(name.clone(), id);
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.name = name.clone();
        }
        Ok(name)
    }

    /// Bake the selected transform components into the entity's mesh vertices
    ///
    /// The baked components are reset on the entity. Direct children get their
    /// local transforms compensated so they keep their world placement.
    pub fn apply_transform(
        &mut self,
        id: EntityId,
        location: bool,
        rotation: bool,
        scale: bool,
    ) -> Result<(), DocumentError> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(DocumentError::EntityNotFound(id))?;

        let old = entity.transform;
        let remaining = Transform {
            translation: if location { Vec3::ZERO } else { old.translation },
            rotation: if rotation { Quat::IDENTITY } else { old.rotation },
            scale: if scale { Vec3::ONE } else { old.scale },
        };
        let bake = remaining.to_mat4().inverse() * old.to_mat4();

        entity.transform = remaining;
        if let Some(mesh) = entity.mesh_mut() {
            mesh.transform_vertices(&bake);
        }

        let children = entity.children.clone();
        for child in children {
            if let Some(child_entity) = self.entities.get_mut(&child) {
                let local = bake * child_entity.transform.to_mat4();
                child_entity.transform = Transform::from_mat4(&local);
            }
        }

        tracing::debug!("Applied transform on {}", id);
        Ok(())
    }

    /// Pick a free name, appending or bumping a numeric `.NNN` suffix
    fn unique_name(&self, name: &str) -> String {
        if !self.name_index.contains_key(name) {
            return name.to_string();
        }

        let base = match name.rsplit_once('.') {
            Some((base, suffix))
                if suffix.len() >= 3 && suffix.chars().all(|c| c.is_ascii_digit()) =>
            {
                base
            }
            _ => name,
        };

        let mut n = 1u32;
        loop {
            let candidate = format!("{}.{:03}", base, n);
            if !self.name_index.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Next free id, always above every id in use
    fn allocate_id(&mut self) -> EntityId {
        let after_last = self.entities.keys().next_back().map_or(0, |id| id.0 + 1);
        let id = EntityId(self.next_id.max(after_last));
        self.next_id = id.0 + 1;
        id
    }

    /// Rebuild derived state after deserializing and reject inconsistent data
    ///
    /// Names must be unique, every parent link must be mirrored by the
    /// parent's child list (and the other way round), and parent chains must
    /// end at a root. A stale `next_id` is raised past the highest id.
    fn restore(&mut self) -> Result<(), DocumentError> {
        let mut name_index = HashMap::with_capacity(self.entities.len());
        for (id, entity) in &self.entities {
            if name_index.insert(entity.name.clone(), *id).is_some() {
                return Err(DocumentError::DuplicateName(entity.name.clone()));
            }
        }

        for (id, entity) in &self.entities {
            if let Some(parent) = entity.parent {
                let mirrored = self
                    .entities
                    .get(&parent)
                    .is_some_and(|p| p.children.contains(id));
                if !mirrored {
                    return Err(DocumentError::BrokenHierarchy(*id));
                }
            }
            for child in &entity.children {
                let linked = self
                    .entities
                    .get(child)
                    .is_some_and(|c| c.parent == Some(*id));
                if !linked {
                    return Err(DocumentError::BrokenHierarchy(*id));
                }
            }

            let mut current = entity.parent;
            let mut steps = 0;
            while let Some(ancestor) = current {
                steps += 1;
                if ancestor == *id || steps > self.entities.len() {
                    return Err(DocumentError::WouldCreateCycle);
                }
                current = self.entities.get(&ancestor).and_then(|e| e.parent);
            }
        }

        self.name_index = name_index;
        if let Some(last) = self.entities.keys().next_back() {
            self.next_id = self.next_id.max(last.0 + 1);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn triangle(name: &str) -> EntityData {
        EntityData::Mesh(MeshData::from_polygons(
            name,
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            &[[0u32, 1, 2]],
        ))
    }

    #[test]
    fn test_add_entity_never_reuses_an_id() {
        let mut doc = Document::new();
        let target = doc.add_entity("cube.stl", triangle("cube"));
        doc.next_id = 0;

        let fresh = doc.add_entity("cube", triangle("cube"));
        assert!(fresh > target);
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.find_by_name("cube.stl"), Some(target));
        assert_eq!(doc.get(target).unwrap().name, "cube.stl");
    }

    #[test]
    fn test_add_entity_disambiguates_names() {
        let mut doc = Document::new();
        let a = doc.add_entity("wheel", triangle("wheel"));
        let b = doc.add_entity("wheel", triangle("wheel"));
        let c = doc.add_entity("wheel.001", triangle("wheel"));

        assert_eq!(doc.get(a).unwrap().name, "wheel");
        assert_eq!(doc.get(b).unwrap().name, "wheel.001");
        assert_eq!(doc.get(c).unwrap().name, "wheel.002");
        assert_eq!(doc.find_by_name("wheel.001"), Some(b));
    }

    #[test]
    fn test_ids_since_is_creation_ordered() {
        let mut doc = Document::new();
        doc.add_entity("existing", triangle("existing"));
        let before = doc.snapshot();

        let x = doc.add_entity("x", EntityData::Empty { mesh: None });
        let y = doc.add_entity("y", triangle("y"));

        assert_eq!(doc.ids_since(&before), vec![x, y]);
    }

    #[test]
    fn test_set_parent_rejects_cycle() {
        let mut doc = Document::new();
        let root = doc.add_entity("root", EntityData::Empty { mesh: None });
        let child = doc.add_entity("child", triangle("child"));

        doc.set_parent(child, Some(root)).unwrap();
        assert_eq!(doc.get(root).unwrap().children, vec![child]);
        assert!(matches!(
            doc.set_parent(root, Some(child)),
            Err(DocumentError::WouldCreateCycle)
        ));
    }

    #[test]
    fn test_remove_entity_detaches_hierarchy() {
        let mut doc = Document::new();
        let root = doc.add_entity("root", EntityData::Empty { mesh: None });
        let mid = doc.add_entity("mid", EntityData::Empty { mesh: None });
        let leaf = doc.add_entity("leaf", triangle("leaf"));
        doc.set_parent(mid, Some(root)).unwrap();
        doc.set_parent(leaf, Some(mid)).unwrap();

        doc.remove_entity(mid).unwrap();

        assert!(doc.get(root).unwrap().children.is_empty());
        assert_eq!(doc.get(leaf).unwrap().parent, None);
        assert_eq!(doc.find_by_name("mid"), None);
        assert!(matches!(
            doc.remove_entity(mid),
            Err(DocumentError::EntityNotFound(_))
        ));
    }

    #[test]
    fn test_rename_keeps_names_unique() {
        let mut doc = Document::new();
        doc.add_entity("part.stl", triangle("a"));
        let other = doc.add_entity("import", triangle("b"));

        let assigned = doc.rename(other, "part.stl").unwrap();
        assert_eq!(assigned, "part.stl.001");
        assert_eq!(doc.find_by_name("import"), None);
        assert_eq!(doc.find_by_name("part.stl.001"), Some(other));
    }

    #[test]
    fn test_apply_rotation_scale_keeps_location() {
        let mut doc = Document::new();
        let id = doc.add_entity("tri", triangle("tri"));
        doc.get_mut(id).unwrap().transform = Transform {
            translation: Vec3::new(5.0, 0.0, 0.0),
            rotation: Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
            scale: Vec3::splat(2.0),
        };

        doc.apply_transform(id, false, true, true).unwrap();

        let entity = doc.get(id).unwrap();
        assert_eq!(entity.transform.translation, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(entity.transform.rotation, Quat::IDENTITY);
        assert_eq!(entity.transform.scale, Vec3::ONE);

        let v = entity.mesh().unwrap().vertices[1];
        assert_relative_eq!(v[0], 0.0, epsilon = 1e-5);
        assert_relative_eq!(v[1], 2.0, epsilon = 1e-5);
        assert_relative_eq!(v[2], 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_apply_transform_compensates_children() {
        let mut doc = Document::new();
        let parent = doc.add_entity("parent", EntityData::Empty { mesh: None });
        let child = doc.add_entity("child", triangle("child"));
        doc.set_parent(child, Some(parent)).unwrap();
        doc.get_mut(parent).unwrap().transform.scale = Vec3::splat(3.0);
        doc.get_mut(child).unwrap().transform.translation = Vec3::new(1.0, 0.0, 0.0);

        doc.apply_transform(parent, false, true, true).unwrap();

        let child_transform = doc.get(child).unwrap().transform;
        assert_relative_eq!(child_transform.translation.x, 3.0, epsilon = 1e-5);
        assert_relative_eq!(child_transform.scale.x, 3.0, epsilon = 1e-5);
    }
}
