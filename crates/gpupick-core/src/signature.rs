//! Feature signatures: the vertex-stage requirements of a draw item.
//!
//! Two draw items with the same signature can share one override program,
//! so the signature is the key of the override material cache.

use serde::{Deserialize, Serialize};

use crate::draw_item::DrawItem;

/// Which faces a material draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Side {
    /// Front faces only (back faces culled).
    #[default]
    Front,
    /// Back faces only (front faces culled).
    Back,
    /// Both faces.
    Double,
}

/// Bitmask of morphing, skinning, instancing and culling side.
///
/// Layout: bit 0 morph targets, bit 1 skinning, bit 2 instancing,
/// bit 3 front, bit 4 back, bit 5 double. Exactly one side bit is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureSignature(u8);

impl FeatureSignature {
    pub const MORPH_TARGETS: u8 = 1 << 0;
    pub const SKINNING: u8 = 1 << 1;
    pub const INSTANCING: u8 = 1 << 2;
    pub const SIDE_FRONT: u8 = 1 << 3;
    pub const SIDE_BACK: u8 = 1 << 4;
    pub const SIDE_DOUBLE: u8 = 1 << 5;

    /// Upper bound on distinct signatures, and so on override cache entries.
    ///
    /// Six bits give 64 slots; only 24 of them are reachable since exactly
    /// one side bit is ever set, so no eviction is needed.
    pub const CARDINALITY: usize = 1 << 6;

    /// Builds a signature from its parts.
    #[must_use]
    pub fn new(morph_targets: bool, skinning: bool, instancing: bool, side: Side) -> Self {
        let mut bits = match side {
            Side::Front => Self::SIDE_FRONT,
            Side::Back => Self::SIDE_BACK,
            Side::Double => Self::SIDE_DOUBLE,
        };
        if morph_targets {
            bits |= Self::MORPH_TARGETS;
        }
        if skinning {
            bits |= Self::SKINNING;
        }
        if instancing {
            bits |= Self::INSTANCING;
        }
        Self(bits)
    }

    /// Derives the signature of a draw item.
    ///
    /// Items without a material fall back to front-side culling without
    /// morphing; items without geometry never use morph targets.
    pub fn of<T: DrawItem + ?Sized>(item: &T) -> Self {
        let material = item.material().unwrap_or_default();
        let morph_targets = material.morph_targets
            && item
                .geometry()
                .is_some_and(|geometry| geometry.morph_targets > 0);
        Self::new(
            morph_targets,
            item.is_skinned(),
            item.is_instanced(),
            material.side,
        )
    }

    /// Raw bits.
    #[must_use]
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Cache slot for this signature, always below [`Self::CARDINALITY`].
    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    #[must_use]
    pub fn uses_morph_targets(self) -> bool {
        self.0 & Self::MORPH_TARGETS != 0
    }

    #[must_use]
    pub fn uses_skinning(self) -> bool {
        self.0 & Self::SKINNING != 0
    }

    #[must_use]
    pub fn uses_instancing(self) -> bool {
        self.0 & Self::INSTANCING != 0
    }

    /// Culling side encoded in the signature.
    #[must_use]
    pub fn side(self) -> Side {
        if self.0 & Self::SIDE_DOUBLE != 0 {
            Side::Double
        } else if self.0 & Self::SIDE_BACK != 0 {
            Side::Back
        } else {
            Side::Front
        }
    }

    /// Shader defines enabling the vertex-stage features of this signature.
    #[must_use]
    pub fn shader_defines(self) -> Vec<&'static str> {
        let mut defines = Vec::new();
        if self.uses_morph_targets() {
            defines.push("USE_MORPHTARGETS");
        }
        if self.uses_skinning() {
            defines.push("USE_SKINNING");
        }
        if self.uses_instancing() {
            defines.push("USE_INSTANCING");
        }
        defines
    }
}

impl Default for FeatureSignature {
    fn default() -> Self {
        Self::new(false, false, false, Side::Front)
    }
}
