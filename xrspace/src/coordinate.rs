//! Coordinate systems
//!
//! Three named frames exist per display:
//!
//! - **head-model**: follows the head; its pose is the display's head pose
//! - **eye-level**: a fixed origin at standing/sitting eye height
//! - **tracker**: the backend's raw 6-DoF origin, periodically re-localized
//!
//! Tracker-type coordinate systems never cache an absolute pose. They keep a
//! matrix relative to the tracker origin and compose it with the display's
//! current tracker pose on every resolution, so a backend re-localization
//! moves every anchor at once.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use xrspace_core::math::{self, Mat4};
use xrspace_core::{xr_internal, XrError, XrResult};

/// Display identifier
pub type DisplayId = u32;

/// Kind of coordinate system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CoordinateSystemType {
    HeadModel,
    EyeLevel,
    Tracker,
}

impl CoordinateSystemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoordinateSystemType::HeadModel => "headModel",
            CoordinateSystemType::EyeLevel => "eyeLevel",
            CoordinateSystemType::Tracker => "tracker",
        }
    }
}

impl fmt::Display for CoordinateSystemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CoordinateSystemType {
    type Err = XrError;

    /// Unknown names are a construction bug, reported as a contract violation
    fn from_str(s: &str) -> XrResult<Self> {
        match s {
            "headModel" => Ok(CoordinateSystemType::HeadModel),
            "eyeLevel" => Ok(CoordinateSystemType::EyeLevel),
            "tracker" => Ok(CoordinateSystemType::Tracker),
            other => Err(xr_internal!("unknown coordinate system type '{}'", other)),
        }
    }
}

/// Snapshot of the poses a display publishes each tick
///
/// All three matrices are expressed in the same world space. Resolution
/// functions take this snapshot instead of reaching into the display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseContext {
    /// Display the poses belong to
    pub display: DisplayId,
    /// Head pose
    pub head_model: Mat4,
    /// Eye-level origin
    pub eye_level: Mat4,
    /// Tracker origin
    pub tracker: Mat4,
}

impl PoseContext {
    /// All poses at the world origin
    pub fn identity(display: DisplayId) -> Self {
        Self {
            display,
            head_model: math::identity(),
            eye_level: math::identity(),
            tracker: math::identity(),
        }
    }

    /// Express a world pose relative to the tracker origin
    pub fn to_tracker_relative(&self, world: &Mat4) -> XrResult<Mat4> {
        let inverse_tracker = math::invert(&self.tracker)
            .ok_or_else(|| xr_internal!("tracker pose of display {} is singular", self.display))?;
        Ok(inverse_tracker * world)
    }
}

/// Pose snapshot plus the primary view's camera matrices
///
/// This is what hit tests need from a display: where the tracked frames are
/// and how the screen maps into the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayContext {
    pub pose: PoseContext,
    /// Projection matrix of the primary view
    pub projection: Mat4,
    /// View matrix (inverse camera pose) of the primary view
    pub view: Mat4,
}

impl DisplayContext {
    /// Camera pose in world space
    pub fn camera_pose(&self) -> XrResult<Mat4> {
        math::invert(&self.view)
            .ok_or_else(|| xr_internal!("view matrix of display {} is singular", self.pose.display))
    }
}

/// A frame of reference owned by a display
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateSystem {
    kind: CoordinateSystemType,
    display: DisplayId,
    relative: Mat4,
}

impl CoordinateSystem {
    pub fn new(kind: CoordinateSystemType, display: DisplayId) -> Self {
        Self {
            kind,
            display,
            relative: math::identity(),
        }
    }

    pub fn head_model(display: DisplayId) -> Self {
        Self::new(CoordinateSystemType::HeadModel, display)
    }

    pub fn eye_level(display: DisplayId) -> Self {
        Self::new(CoordinateSystemType::EyeLevel, display)
    }

    /// The tracker origin itself
    pub fn tracker(display: DisplayId) -> Self {
        Self::new(CoordinateSystemType::Tracker, display)
    }

    /// A tracker-type frame at `relative` from the tracker origin
    pub fn tracker_relative(display: DisplayId, relative: Mat4) -> Self {
        Self {
            kind: CoordinateSystemType::Tracker,
            display,
            relative,
        }
    }

    pub fn kind(&self) -> CoordinateSystemType {
        self.kind
    }

    pub fn display(&self) -> DisplayId {
        self.display
    }

    /// Stored matrix relative to the tracker origin (identity for non-tracker types)
    pub fn relative_matrix(&self) -> &Mat4 {
        &self.relative
    }

    /// Replace the tracker-relative matrix
    pub fn set_relative_matrix(&mut self, relative: Mat4) {
        self.relative = relative;
    }

    /// Pose of this frame in world space
    pub fn resolve_pose(&self, ctx: &PoseContext) -> Mat4 {
        match self.kind {
            CoordinateSystemType::HeadModel => ctx.head_model,
            CoordinateSystemType::EyeLevel => ctx.eye_level,
            CoordinateSystemType::Tracker => ctx.tracker * self.relative,
        }
    }

    /// Transform taking coordinates in `self` to coordinates in `other`
    ///
    /// `inverse(other.pose) * self.pose`
    pub fn transform_to(&self, other: &CoordinateSystem, ctx: &PoseContext) -> XrResult<Mat4> {
        if self.display != ctx.display || other.display != ctx.display {
            return Err(xr_internal!(
                "coordinate systems of displays {} and {} resolved against display {}",
                self.display,
                other.display,
                ctx.display
            ));
        }
        let other_pose = other.resolve_pose(ctx);
        let inverse_other = math::invert(&other_pose)
            .ok_or_else(|| xr_internal!("{} pose is singular", other.kind))?;
        Ok(inverse_other * self.resolve_pose(ctx))
    }
}
