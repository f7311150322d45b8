//! Configuration options for the picker.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Picker configuration, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickerOptions {
    /// Whether the pick pass depth-tests, so the nearest surface wins.
    pub depth_test: bool,

    /// Whether transparent items are pickable. When false only the opaque list is drawn.
    pub pick_transparent: bool,

    /// Label prefix for GPU objects created by the picker.
    pub label: String,
}

impl PickerOptions {
    /// Parses options from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for PickerOptions {
    fn default() -> Self {
        Self {
            depth_test: true,
            pick_transparent: true,
            label: "gpupick".to_string(),
        }
    }
}
