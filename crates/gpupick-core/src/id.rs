//! Object identifiers and their color encoding.
//!
//! Each pickable object renders as a flat color whose four 8-bit channels
//! carry the object's 32-bit identifier. Reading one pixel back and
//! recombining the channels recovers the identifier.

use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// The reserved identifier meaning "no object at this pixel".
///
/// The pick target is cleared to transparent black, which decodes to this value.
pub const NO_HIT: u32 = 0;

/// A 32-bit identifier of a pickable object, never equal to [`NO_HIT`].
///
/// Identifiers are minted by the host scene; the picker only carries them through the GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ObjectId(NonZeroU32);

impl ObjectId {
    /// Creates an identifier, returning `None` for the reserved sentinel.
    #[must_use]
    pub const fn new(raw: u32) -> Option<Self> {
        match NonZeroU32::new(raw) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    /// Returns the raw 32-bit value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Encodes the identifier as `[R, G, B, A]` bytes.
    ///
    /// - R contains bits 24-31
    /// - G contains bits 16-23
    /// - B contains bits 8-15
    /// - A contains bits 0-7
    #[must_use]
    pub const fn to_rgba(self) -> [u8; 4] {
        self.get().to_be_bytes()
    }

    /// Encodes the identifier as a normalized color for the override shader.
    #[must_use]
    pub fn to_normalized(self) -> [f32; 4] {
        self.to_rgba().map(|channel| f32::from(channel) / 255.0)
    }
}

impl From<ObjectId> for u32 {
    fn from(id: ObjectId) -> Self {
        id.get()
    }
}

impl TryFrom<u32> for ObjectId {
    type Error = String;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Self::new(raw).ok_or_else(|| format!("object id {NO_HIT} is reserved for no-hit"))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.get())
    }
}

/// Recombines a pick pixel into its raw 32-bit value.
#[must_use]
pub fn pixel_to_raw(pixel: [u8; 4]) -> u32 {
    (u32::from(pixel[0]) << 24)
        | (u32::from(pixel[1]) << 16)
        | (u32::from(pixel[2]) << 8)
        | u32::from(pixel[3])
}

/// Decodes a pick pixel, returning `None` for the no-hit sentinel.
#[must_use]
pub fn decode_pixel(pixel: [u8; 4]) -> Option<ObjectId> {
    ObjectId::new(pixel_to_raw(pixel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sentinel_is_not_an_id() {
        assert!(ObjectId::new(NO_HIT).is_none());
        assert_eq!(decode_pixel([0, 0, 0, 0]), None);
    }

    #[test]
    fn test_channel_layout() {
        let id = ObjectId::new(0x1234_5678).unwrap();
        assert_eq!(id.to_rgba(), [0x12, 0x34, 0x56, 0x78]);
        assert_eq!(ObjectId::new(17).unwrap().to_rgba(), [0, 0, 0, 17]);
        assert_eq!(ObjectId::new(4096).unwrap().to_rgba(), [0, 0, 16, 0]);
    }

    #[test]
    fn test_normalized_extremes() {
        let id = ObjectId::new(u32::MAX).unwrap();
        assert_eq!(id.to_normalized(), [1.0; 4]);
        let id = ObjectId::new(1).unwrap();
        assert_eq!(id.to_normalized(), [0.0, 0.0, 0.0, 1.0 / 255.0]);
    }

    #[test]
    fn test_serde_rejects_sentinel() {
        let id: ObjectId = serde_json::from_str("4096").unwrap();
        assert_eq!(id.get(), 4096);
        assert!(serde_json::from_str::<ObjectId>("0").is_err());
    }

    proptest! {
        #[test]
        fn prop_encode_decode_recovers_id(raw in 1u32..=u32::MAX) {
            let id = ObjectId::new(raw).unwrap();
            prop_assert_eq!(decode_pixel(id.to_rgba()), Some(id));
        }

        #[test]
        fn prop_normalized_quantizes_back(raw in 1u32..=u32::MAX) {
            // Mirrors what an Rgba8Unorm target stores for the shader output.
            let id = ObjectId::new(raw).unwrap();
            let pixel = id.to_normalized().map(|c| (c * 255.0).round() as u8);
            prop_assert_eq!(decode_pixel(pixel), Some(id));
        }
    }
}
