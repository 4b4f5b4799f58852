//! Face anchor geometry
//!
//! The blend-shape table has a fixed layout (the ARKit coefficient set).
//! Backends deliver a full table every tick; it replaces the previous one
//! wholesale, so coefficients missing from a delivery drop back to zero.

use std::collections::BTreeMap;

use xrspace_core::{XrError, XrResult};

/// Number of blend-shape coefficients
pub const BLEND_SHAPE_COUNT: usize = 52;

/// Coefficient names, in table order
pub const BLEND_SHAPE_NAMES: [&str; BLEND_SHAPE_COUNT] = [
    "browDownLeft",
    "browDownRight",
    "browInnerUp",
    "browOuterUpLeft",
    "browOuterUpRight",
    "cheekPuff",
    "cheekSquintLeft",
    "cheekSquintRight",
    "eyeBlinkLeft",
    "eyeBlinkRight",
    "eyeLookDownLeft",
    "eyeLookDownRight",
    "eyeLookInLeft",
    "eyeLookInRight",
    "eyeLookOutLeft",
    "eyeLookOutRight",
    "eyeLookUpLeft",
    "eyeLookUpRight",
    "eyeSquintLeft",
    "eyeSquintRight",
    "eyeWideLeft",
    "eyeWideRight",
    "jawForward",
    "jawLeft",
    "jawOpen",
    "jawRight",
    "mouthClose",
    "mouthDimpleLeft",
    "mouthDimpleRight",
    "mouthFrownLeft",
    "mouthFrownRight",
    "mouthFunnel",
    "mouthLeft",
    "mouthLowerDownLeft",
    "mouthLowerDownRight",
    "mouthPressLeft",
    "mouthPressRight",
    "mouthPucker",
    "mouthRight",
    "mouthRollLower",
    "mouthRollUpper",
    "mouthShrugLower",
    "mouthShrugUpper",
    "mouthSmileLeft",
    "mouthSmileRight",
    "mouthStretchLeft",
    "mouthStretchRight",
    "mouthUpperUpLeft",
    "mouthUpperUpRight",
    "noseSneerLeft",
    "noseSneerRight",
    "tongueOut",
];

/// Tracked face state
#[derive(Debug, Clone, PartialEq)]
pub struct FaceGeometry {
    blend_shapes: [f64; BLEND_SHAPE_COUNT],
    /// Face mesh vertices in the anchor's local space
    pub vertices: Vec<[f64; 3]>,
}

impl Default for FaceGeometry {
    fn default() -> Self {
        Self {
            blend_shapes: [0.0; BLEND_SHAPE_COUNT],
            vertices: Vec::new(),
        }
    }
}

impl FaceGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table index of a coefficient name
    pub fn index_of(name: &str) -> Option<usize> {
        BLEND_SHAPE_NAMES.iter().position(|candidate| *candidate == name)
    }

    pub fn blend_shapes(&self) -> &[f64; BLEND_SHAPE_COUNT] {
        &self.blend_shapes
    }

    /// Coefficient by name
    pub fn blend_shape(&self, name: &str) -> Option<f64> {
        Self::index_of(name).map(|index| self.blend_shapes[index])
    }

    /// Replace the whole table from an ordered slice
    pub fn replace_blend_shapes(&mut self, values: &[f64]) -> XrResult<()> {
        if values.len() != BLEND_SHAPE_COUNT {
            return Err(XrError::invalid_input(format!(
                "blend-shape table needs {} entries, got {}",
                BLEND_SHAPE_COUNT,
                values.len()
            )));
        }
        self.blend_shapes.copy_from_slice(values);
        Ok(())
    }

    /// Replace the whole table from named coefficients.
    ///
    /// Unknown names are ignored; names not present reset to zero.
    pub fn replace_named_blend_shapes(&mut self, values: &BTreeMap<String, f64>) {
        let mut table = [0.0; BLEND_SHAPE_COUNT];
        for (name, value) in values {
            match Self::index_of(name) {
                Some(index) => table[index] = *value,
                None => log::trace!("ignoring unknown blend shape '{}'", name),
            }
        }
        self.blend_shapes = table;
    }
}
