//! Mapping a picked identifier back to the object the caller cares about.
//!
//! The picker reports the identifier of the drawable that covered the pixel.
//! Applications usually want its enclosing pickable group instead (a whole
//! character rather than one of its sub-meshes).

use std::collections::HashMap;

use crate::id::ObjectId;

/// Read access to the caller's scene hierarchy.
pub trait ObjectHierarchy {
    /// Whether the identifier refers to a live object.
    fn contains(&self, id: ObjectId) -> bool;

    /// Parent of an object, or `None` at the scene root.
    fn parent(&self, id: ObjectId) -> Option<ObjectId>;

    /// Whether an object is a pick boundary. Defaults to direct children of the scene root.
    fn is_pick_root(&self, id: ObjectId) -> bool {
        self.parent(id).is_none()
    }
}

/// Walks up from `id` to the nearest pick root.
///
/// Returns `None` when the identifier no longer refers to a live object,
/// for example when it was removed after the frame was drawn.
pub fn resolve_pick_root<H: ObjectHierarchy + ?Sized>(hierarchy: &H, id: ObjectId) -> Option<ObjectId> {
    if !hierarchy.contains(id) {
        log::debug!("picked object {id} is no longer in the scene");
        return None;
    }

    let mut current = id;
    // Bounded walk guards against cyclic parent links.
    for _ in 0..=u16::MAX {
        if hierarchy.is_pick_root(current) {
            return Some(current);
        }
        match hierarchy.parent(current) {
            Some(parent) if hierarchy.contains(parent) => current = parent,
            _ => return Some(current),
        }
    }
    log::warn!("parent chain of {id} does not terminate");
    None
}

/// A parent map, enough for simple scenes and tests.
#[derive(Debug, Clone, Default)]
pub struct ParentMap {
    parents: HashMap<ObjectId, Option<ObjectId>>,
}

impl ParentMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an object under `parent` (`None` for the scene root).
    pub fn insert(&mut self, id: ObjectId, parent: Option<ObjectId>) {
        self.parents.insert(id, parent);
    }

    /// Removes an object. Children keep pointing at it and resolve to themselves.
    pub fn remove(&mut self, id: ObjectId) {
        self.parents.remove(&id);
    }
}

impl ObjectHierarchy for ParentMap {
    fn contains(&self, id: ObjectId) -> bool {
        self.parents.contains_key(&id)
    }

    fn parent(&self, id: ObjectId) -> Option<ObjectId> {
        self.parents.get(&id).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u32) -> ObjectId {
        ObjectId::new(raw).unwrap()
    }

    #[test]
    fn test_resolves_to_top_level_group() {
        let mut scene = ParentMap::new();
        scene.insert(id(1), None);
        scene.insert(id(2), Some(id(1)));
        scene.insert(id(3), Some(id(2)));
        assert_eq!(resolve_pick_root(&scene, id(3)), Some(id(1)));
        assert_eq!(resolve_pick_root(&scene, id(1)), Some(id(1)));
    }

    #[test]
    fn test_unknown_id_is_unresolved() {
        let scene = ParentMap::new();
        assert_eq!(resolve_pick_root(&scene, id(42)), None);
    }

    #[test]
    fn test_custom_boundary() {
        struct Groups(ParentMap);
        impl ObjectHierarchy for Groups {
            fn contains(&self, id: ObjectId) -> bool {
                self.0.contains(id)
            }
            fn parent(&self, id: ObjectId) -> Option<ObjectId> {
                self.0.parent(id)
            }
            fn is_pick_root(&self, id: ObjectId) -> bool {
                id.get() == 2
            }
        }

        let mut scene = ParentMap::new();
        scene.insert(id(1), None);
        scene.insert(id(2), Some(id(1)));
        scene.insert(id(3), Some(id(2)));
        assert_eq!(resolve_pick_root(&Groups(scene), id(3)), Some(id(2)));
    }

    #[test]
    fn test_cycle_terminates() {
        let mut scene = ParentMap::new();
        scene.insert(id(1), Some(id(2)));
        scene.insert(id(2), Some(id(1)));
        assert_eq!(resolve_pick_root(&scene, id(1)), None);
    }
}
