//! Head-mounted display

use std::fmt;

use xrspace_core::math::{self, Mat4};
use xrspace_core::XrResult;

use super::Display;
use crate::bridge::{RoomScaleCapabilities, SharedRoomScale};

/// Room-scale tracker feeding a headset display
#[derive(Clone)]
pub struct HeadMountedSource {
    tracker: SharedRoomScale,
}

impl HeadMountedSource {
    pub fn new(tracker: SharedRoomScale) -> Self {
        Self { tracker }
    }

    pub fn capabilities(&self) -> RoomScaleCapabilities {
        self.tracker.lock().capabilities()
    }

    pub fn frame_rate_hz(&self) -> f64 {
        self.tracker.lock().frame_rate_hz()
    }

    pub(super) fn request_present(&self) -> XrResult<()> {
        self.tracker.lock().request_present()
    }

    pub(super) fn exit_present(&self) {
        self.tracker.lock().exit_present();
    }

    pub(super) fn submit_frame(&self) -> XrResult<()> {
        let mut tracker = self.tracker.lock();
        if tracker.is_presenting() {
            tracker.submit_frame()
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for HeadMountedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HeadMountedSource")
            .field(&self.tracker.lock().name())
            .finish()
    }
}

impl Display {
    /// Copy per-eye matrices from the tracker.
    ///
    /// A sitting-to-standing transform `S` is folded in once per tick: the
    /// head pose becomes `S * head` and each view `view * inverse(S)`.
    pub(super) fn update_head_mounted(&mut self, source: &HeadMountedSource) {
        let (frame, standing) = {
            let mut tracker = source.tracker.lock();
            (tracker.frame_data(), tracker.sitting_to_standing())
        };
        let standing = standing.unwrap_or_else(math::identity);
        self.eye_level_pose = standing;

        let Some(frame) = frame else {
            return;
        };
        let Some(inverse_standing) = math::invert(&standing) else {
            log::warn!("display {}: sitting-to-standing transform is singular", self.id);
            return;
        };

        self.head_pose = standing * frame.head_pose;
        let eyes: [(Mat4, Mat4); 2] = [
            (frame.left_view, frame.left_projection),
            (frame.right_view, frame.right_projection),
        ];
        for (view, (eye_view, projection)) in self.views.iter_mut().zip(eyes) {
            view.view = eye_view * inverse_standing;
            view.projection = projection;
        }
    }
}
