//! The host renderer's draw items, seen through the capabilities picking needs.

use glam::Mat4;

use crate::id::ObjectId;
use crate::signature::Side;

/// What the picker needs to know about a draw item's geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeometryTraits {
    /// Number of morph targets declared on the position attribute.
    pub morph_targets: usize,
}

/// What the picker needs to know about a draw item's original material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaterialTraits {
    /// Face culling side.
    pub side: Side,
    /// Whether the material enables morph targets.
    pub morph_targets: bool,
}

/// One drawable unit from the host's visibility/sort pass.
///
/// Draw items are owned by the host renderer. A pick call only borrows them
/// and never keeps them past its return.
pub trait DrawItem {
    /// The backend's shader program type, used for caller-supplied overrides.
    type Program;

    /// Identifier of the object this item belongs to.
    fn object_id(&self) -> ObjectId;

    /// World transform of the drawable.
    fn world_transform(&self) -> Mat4;

    /// Geometry capabilities, or `None` when the item has no geometry attached.
    fn geometry(&self) -> Option<GeometryTraits>;

    /// Material capabilities, or `None` when the item has no material attached.
    fn material(&self) -> Option<MaterialTraits>;

    /// Whether the drawable is a skinned mesh.
    fn is_skinned(&self) -> bool {
        false
    }

    /// Whether the drawable is instanced.
    fn is_instanced(&self) -> bool {
        false
    }

    /// A caller-supplied program to use verbatim instead of the cached override.
    fn pick_program(&self) -> Option<&Self::Program> {
        None
    }
}

/// The host's current frame lists, already culled and sorted.
#[derive(Debug, Clone)]
pub struct DrawLists<T> {
    /// Opaque items, front to back.
    pub opaque: Vec<T>,
    /// Transparent items, back to front.
    pub transparent: Vec<T>,
}

impl<T> DrawLists<T> {
    /// Creates empty lists.
    #[must_use]
    pub fn new() -> Self {
        Self {
            opaque: Vec::new(),
            transparent: Vec::new(),
        }
    }

    /// Removes every item, keeping allocations for the next frame.
    pub fn clear(&mut self) {
        self.opaque.clear();
        self.transparent.clear();
    }

    /// Total number of items across both lists.
    #[must_use]
    pub fn len(&self) -> usize {
        self.opaque.len() + self.transparent.len()
    }

    /// Returns true if both lists are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.opaque.is_empty() && self.transparent.is_empty()
    }

    /// Iterates opaque items, then transparent items.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.opaque.iter().chain(self.transparent.iter())
    }
}

impl<T> Default for DrawLists<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_lists_iterate_opaque_first() {
        let mut lists = DrawLists::new();
        assert!(lists.is_empty());
        lists.transparent.push(3);
        lists.opaque.push(1);
        lists.opaque.push(2);

        assert_eq!(lists.len(), 3);
        assert!(!lists.is_empty());
        assert_eq!(lists.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(lists.iter().take(lists.opaque.len()).count(), 2);

        lists.clear();
        assert!(lists.is_empty());
        assert_eq!(lists.len(), 0);
        assert_eq!(lists.iter().next(), None);
    }
}
