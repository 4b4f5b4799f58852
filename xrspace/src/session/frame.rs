//! Per-tick presentation frame

use xrspace_core::math::Mat4;
use xrspace_core::{xr_internal, XrResult};

use super::Session;
use crate::anchor::{Anchor, AnchorId, AnchorOffset};
use crate::coordinate::{CoordinateSystem, CoordinateSystemType, PoseContext};
use crate::display::View;
use crate::hit_test::Hit;

/// Snapshot handed to the frame callback.
///
/// Built fresh for every tick and only valid inside the callback.
pub struct PresentationFrame<'a> {
    session: &'a mut Session,
    timestamp: f64,
}

impl<'a> PresentationFrame<'a> {
    pub(super) fn new(session: &'a mut Session, timestamp: f64) -> Self {
        Self { session, timestamp }
    }

    /// Tick timestamp in milliseconds
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn views(&self) -> Vec<View> {
        self.session.views()
    }

    pub fn pose_context(&self) -> PoseContext {
        self.session.pose_context()
    }

    pub fn coordinate_system(&self, kind: CoordinateSystemType) -> CoordinateSystem {
        self.session.coordinate_system(kind)
    }

    pub fn anchors(&self) -> Vec<Anchor> {
        self.session.anchors()
    }

    pub fn get_anchor(&self, uid: &AnchorId) -> Option<Anchor> {
        self.session.get_anchor(uid)
    }

    /// Anchor a pose given in `coordinate_system`.
    ///
    /// The anchor is pinned where that pose is this tick, expressed relative
    /// to the tracker so later origin corrections carry it along.
    pub fn add_anchor(&mut self, coordinate_system: &CoordinateSystem, pose: &Mat4) -> XrResult<AnchorId> {
        let ctx = self.session.pose_context();
        if coordinate_system.display() != ctx.display {
            return Err(xr_internal!(
                "coordinate system of display {} used in a frame of display {}",
                coordinate_system.display(),
                ctx.display
            ));
        }
        let world = coordinate_system.resolve_pose(&ctx) * pose;
        let relative = ctx.to_tracker_relative(&world)?;
        let anchor = Anchor::new(CoordinateSystem::tracker_relative(ctx.display, relative), None);
        self.session.add_anchor(anchor)
    }

    pub fn find_anchor(&mut self, x: f64, y: f64) -> XrResult<Option<AnchorOffset>> {
        self.session.find_anchor(x, y)
    }

    pub fn remove_anchor(&mut self, uid: &AnchorId) -> XrResult<()> {
        self.session.remove_anchor(uid)
    }

    pub fn hit_test(&self, x: f64, y: f64) -> XrResult<Vec<Hit>> {
        self.session.hit_test(x, y)
    }

    pub fn anchor_world_transform(&self, offset: &AnchorOffset) -> XrResult<Mat4> {
        self.session.anchor_world_transform(offset)
    }

    /// Schedule the next tick's callback
    pub fn request_frame<F>(&mut self, callback: F) -> XrResult<()>
    where
        F: FnOnce(&mut PresentationFrame<'_>) + Send + 'static,
    {
        self.session.request_frame(callback)
    }

    pub fn session(&self) -> &Session {
        &*self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut *self.session
    }
}
