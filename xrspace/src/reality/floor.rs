//! Floor anchors

use xrspace_core::math::{self, Mat4, Vec3};
use xrspace_core::XrResult;

use super::{Reality, RealityKind};
use crate::anchor::{Anchor, AnchorId, AnchorOffset, PlaneAlignment};
use crate::coordinate::{CoordinateSystem, PoseContext};

/// Where a floor anchor came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloorSource {
    /// A horizontal plane reported by the backend
    Detected,
    /// The virtual floor at y = 0 in tracker space
    Synthesized,
    /// Approximation at the tracker origin's level; the backend has no floor
    TrackerOrigin,
}

impl FloorSource {
    /// False for approximations callers should not rely on
    pub fn is_authoritative(&self) -> bool {
        !matches!(self, FloorSource::TrackerOrigin)
    }
}

/// Outcome of [`Reality::find_floor_anchor`]
#[derive(Debug, Clone, PartialEq)]
pub struct FloorAnchor {
    pub offset: AnchorOffset,
    pub source: FloorSource,
    /// The anchor was created for this query
    pub created: bool,
}

impl Reality {
    /// Best-effort floor.
    ///
    /// A detected floor plane wins. Otherwise the anchor sits at the tracker
    /// origin, registered under `uid` when given (an existing anchor with
    /// that id is reused).
    pub fn find_floor_anchor(&mut self, ctx: &PoseContext, uid: Option<AnchorId>) -> XrResult<FloorAnchor> {
        match self.kind() {
            RealityKind::Virtual => self.origin_floor(ctx, uid, FloorSource::Synthesized),
            RealityKind::Camera => match self.detected_floor(ctx) {
                Some(floor) => Ok(floor),
                None => {
                    log::debug!(
                        "reality '{}' has no floor plane; using the tracker origin",
                        self.name
                    );
                    self.origin_floor(ctx, uid, FloorSource::TrackerOrigin)
                }
            },
        }
    }

    /// Lowest horizontal plane, offset to its center
    fn detected_floor(&self, ctx: &PoseContext) -> Option<FloorAnchor> {
        let mut lowest: Option<(f64, &Anchor, Mat4)> = None;
        for (anchor, plane) in self.anchors.planes() {
            if plane.alignment != PlaneAlignment::Horizontal {
                continue;
            }
            let pose = anchor.resolve_pose(ctx);
            let center = math::transform_point(&pose, &plane.center);
            if lowest.as_ref().map_or(true, |(y, _, _)| center.y < *y) {
                lowest = Some((center.y, anchor, pose));
            }
        }

        let (_, anchor, pose) = lowest?;
        let center = anchor.plane_geometry().map_or_else(Vec3::zeros, |plane| plane.center);
        let inverse = math::invert(&pose)?;
        // World offset equal to moving the anchor pose to the plane center
        let local = pose * math::from_translation(&center) * inverse;
        Some(FloorAnchor {
            offset: AnchorOffset::new(anchor.uid().clone(), local),
            source: FloorSource::Detected,
            created: false,
        })
    }

    fn origin_floor(
        &mut self,
        ctx: &PoseContext,
        uid: Option<AnchorId>,
        source: FloorSource,
    ) -> XrResult<FloorAnchor> {
        if let Some(existing) = uid.as_ref().filter(|uid| self.anchors.contains(uid)) {
            return Ok(FloorAnchor {
                offset: AnchorOffset::new(existing.clone(), math::identity()),
                source,
                created: false,
            });
        }
        let anchor = Anchor::new(CoordinateSystem::tracker(ctx.display), uid);
        let uid = self.add_anchor(anchor, ctx)?;
        Ok(FloorAnchor {
            offset: AnchorOffset::new(uid, math::identity()),
            source,
            created: true,
        })
    }
}
