//! Anchor family
//!
//! An [`Anchor`] is a tracked point or region whose pose a reality keeps up
//! to date. Its pose lives in a tracker-type [`CoordinateSystem`], so
//! re-localizing the tracker moves it without touching the anchor.
//!
//! Specialized anchors carry extra geometry through [`AnchorKind`]:
//!
//! - [`PlaneGeometry`]: detected planar surface (center, extent, alignment, mesh)
//! - [`FaceGeometry`]: tracked face with its blend-shape table
//! - image: a detected reference image, tagged by name
//!
//! [`AnchorOffset`] pins a fixed local transform to an anchor and resolves
//! against the anchor's current pose on demand.

mod face;
mod offset;
mod plane;
mod table;

pub use face::{FaceGeometry, BLEND_SHAPE_COUNT, BLEND_SHAPE_NAMES};
pub use offset::AnchorOffset;
pub use plane::{PlaneAlignment, PlaneGeometry, PlaneMesh};
pub use table::AnchorTable;

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use xrspace_core::math::Mat4;

use crate::coordinate::{CoordinateSystem, CoordinateSystemType, PoseContext};

/// Unique anchor identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnchorId(String);

impl AnchorId {
    /// Fresh identifier
    pub fn generate() -> Self {
        AnchorId(format!("anchor-{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AnchorId {
    fn from(value: &str) -> Self {
        AnchorId(value.to_string())
    }
}

impl From<String> for AnchorId {
    fn from(value: String) -> Self {
        AnchorId(value)
    }
}

impl Borrow<str> for AnchorId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// What an anchor tracks
#[derive(Debug, Clone, PartialEq)]
pub enum AnchorKind {
    /// Caller-placed point
    Point,
    /// Detected planar surface
    Plane(PlaneGeometry),
    /// Tracked face
    Face(FaceGeometry),
    /// Detected reference image
    Image { name: String },
}

impl AnchorKind {
    pub fn label(&self) -> &'static str {
        match self {
            AnchorKind::Point => "point",
            AnchorKind::Plane(_) => "plane",
            AnchorKind::Face(_) => "face",
            AnchorKind::Image { .. } => "image",
        }
    }
}

/// A tracked point or region
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    uid: AnchorId,
    coordinate_system: CoordinateSystem,
    kind: AnchorKind,
    timestamp: f64,
}

impl Anchor {
    /// Point anchor; a uid is generated when none is given
    pub fn new(coordinate_system: CoordinateSystem, uid: Option<AnchorId>) -> Self {
        Self::with_kind(coordinate_system, uid, AnchorKind::Point)
    }

    pub fn with_kind(
        coordinate_system: CoordinateSystem,
        uid: Option<AnchorId>,
        kind: AnchorKind,
    ) -> Self {
        Self {
            uid: uid.unwrap_or_else(AnchorId::generate),
            coordinate_system,
            kind,
            timestamp: 0.0,
        }
    }

    /// Plane anchor
    pub fn plane(
        coordinate_system: CoordinateSystem,
        uid: Option<AnchorId>,
        geometry: PlaneGeometry,
    ) -> Self {
        Self::with_kind(coordinate_system, uid, AnchorKind::Plane(geometry))
    }

    /// Face anchor
    pub fn face(
        coordinate_system: CoordinateSystem,
        uid: Option<AnchorId>,
        geometry: FaceGeometry,
    ) -> Self {
        Self::with_kind(coordinate_system, uid, AnchorKind::Face(geometry))
    }

    /// Image anchor
    pub fn image(
        coordinate_system: CoordinateSystem,
        uid: Option<AnchorId>,
        name: impl Into<String>,
    ) -> Self {
        Self::with_kind(
            coordinate_system,
            uid,
            AnchorKind::Image { name: name.into() },
        )
    }

    pub fn uid(&self) -> &AnchorId {
        &self.uid
    }

    pub fn coordinate_system(&self) -> &CoordinateSystem {
        &self.coordinate_system
    }

    pub fn kind(&self) -> &AnchorKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut AnchorKind {
        &mut self.kind
    }

    /// Timestamp of the last creation/update (milliseconds)
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: f64) {
        self.timestamp = timestamp;
    }

    pub fn plane_geometry(&self) -> Option<&PlaneGeometry> {
        match &self.kind {
            AnchorKind::Plane(geometry) => Some(geometry),
            _ => None,
        }
    }

    pub fn face_geometry(&self) -> Option<&FaceGeometry> {
        match &self.kind {
            AnchorKind::Face(geometry) => Some(geometry),
            _ => None,
        }
    }

    pub fn image_name(&self) -> Option<&str> {
        match &self.kind {
            AnchorKind::Image { name } => Some(name),
            _ => None,
        }
    }

    /// Move the anchor relative to the tracker origin.
    ///
    /// Anchors created in a head-model or eye-level frame are re-homed into
    /// tracker space on their first update.
    pub fn set_tracker_relative(&mut self, relative: Mat4) {
        if self.coordinate_system.kind() != CoordinateSystemType::Tracker {
            self.coordinate_system =
                CoordinateSystem::tracker_relative(self.coordinate_system.display(), relative);
        } else {
            self.coordinate_system.set_relative_matrix(relative);
        }
    }

    /// Current world pose
    pub fn resolve_pose(&self, ctx: &PoseContext) -> Mat4 {
        self.coordinate_system.resolve_pose(ctx)
    }
}
