//! Anchor-relative transforms

use xrspace_core::math::Mat4;
use xrspace_core::{xr_internal, XrResult};

use super::{AnchorId, AnchorTable};
use crate::coordinate::PoseContext;

/// A fixed local transform pinned to an anchor
///
/// The world transform is never stored. It is recomputed from the anchor's
/// current pose on every call, so anchor updates and tracker re-localization
/// are picked up immediately.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorOffset {
    anchor_id: AnchorId,
    local_pose: Mat4,
}

impl AnchorOffset {
    pub fn new(anchor_id: AnchorId, local_pose: Mat4) -> Self {
        Self {
            anchor_id,
            local_pose,
        }
    }

    pub fn anchor_id(&self) -> &AnchorId {
        &self.anchor_id
    }

    pub fn local_pose(&self) -> &Mat4 {
        &self.local_pose
    }

    /// `local_pose * anchor_pose`
    ///
    /// Resolving against an anchor that is not in `anchors` is a caller bug.
    pub fn world_transform(&self, anchors: &AnchorTable, ctx: &PoseContext) -> XrResult<Mat4> {
        let anchor = anchors.get(&self.anchor_id).ok_or_else(|| {
            xr_internal!("anchor offset resolved against unknown anchor '{}'", self.anchor_id)
        })?;
        Ok(self.local_pose * anchor.resolve_pose(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::Anchor;
    use crate::coordinate::CoordinateSystem;
    use xrspace_core::math::{self, Quat, Vec3};

    #[test]
    fn test_world_transform_tracks_anchor_updates() {
        let ctx = PoseContext::identity(0);
        let mut table = AnchorTable::new();
        let anchor = Anchor::new(
            CoordinateSystem::tracker_relative(0, math::from_translation(&Vec3::new(1.0, 0.0, 0.0))),
            Some("a".into()),
        );
        table.insert(anchor).unwrap();

        let local = math::from_rotation_translation(
            &Quat::from_axis_angle(&Vec3::y_axis(), 0.5),
            &Vec3::new(0.0, 0.2, 0.0),
        );
        let offset = AnchorOffset::new("a".into(), local);
        let before = offset.world_transform(&table, &ctx).unwrap();

        let moved = math::from_translation(&Vec3::new(4.0, 0.0, -2.0));
        table
            .get_mut(&"a".into())
            .unwrap()
            .set_tracker_relative(moved);
        let after = offset.world_transform(&table, &ctx).unwrap();

        assert_eq!(after, local * moved);
        assert_ne!(before, after);
    }

    #[test]
    fn test_unknown_anchor_is_contract_violation() {
        let table = AnchorTable::new();
        let offset = AnchorOffset::new("missing".into(), math::identity());
        let err = offset
            .world_transform(&table, &PoseContext::identity(0))
            .unwrap_err();
        assert!(err.is_contract_violation());
    }
}
