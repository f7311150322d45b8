//! Core abstractions for gpupick.
//!
//! This crate provides the backend-agnostic half of GPU picking:
//! - [`ObjectId`] and its encoding into four 8-bit color channels
//! - [`FeatureSignature`] describing the vertex-stage needs of a draw item
//! - [`DrawItemAdapter`] selecting cached override programs per signature
//! - [`Picker`], which renders the requested pixel through a [`PickBackend`]
//!   and decodes the identifier found there

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]

pub mod adapter;
pub mod backend;
pub mod camera;
pub mod draw_item;
pub mod error;
pub mod id;
pub mod options;
pub mod picker;
pub mod resolve;
pub mod signature;

#[cfg(test)]
mod software;

pub use adapter::{DrawItemAdapter, OverrideMaterialCache};
pub use backend::{ClearColor, DirectDraw, PickBackend};
pub use camera::{Camera, ProjectionMode, ViewOffset};
pub use draw_item::{DrawItem, DrawLists, GeometryTraits, MaterialTraits};
pub use error::{PickError, Result};
pub use id::{decode_pixel, pixel_to_raw, ObjectId, NO_HIT};
pub use options::PickerOptions;
pub use picker::{PickRequest, Picker, PICK_CLEAR_COLOR};
pub use resolve::{resolve_pick_root, ObjectHierarchy, ParentMap};
pub use signature::{FeatureSignature, Side};

// Re-export glam types for convenience
pub use glam::{Mat4, Vec2, Vec3, Vec4};
