//! Name-based matching of composite target children to imported meshes

use crate::document::{Document, EntityId};

/// Name up to (excluding) the first `.`
///
/// Strips disambiguation suffixes such as `.001`. A name without a `.` is
/// returned whole.
pub fn base_name(name: &str) -> &str {
    name.split_once('.').map_or(name, |(base, _)| base)
}

/// First candidate, in the given order, whose name starts with `base`
pub fn find_prefix_match(doc: &Document, base: &str, candidates: &[EntityId]) -> Option<EntityId> {
    candidates
        .iter()
        .copied()
        .find(|id| doc.get(*id).is_some_and(|e| e.name.starts_with(base)))
}
