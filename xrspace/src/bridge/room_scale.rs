//! Room-scale tracking extension
//!
//! Headset runtimes that report a head pose plus per-eye view and projection
//! matrices every frame, with an optional synchronous forward hit test.

use std::sync::Arc;

use parking_lot::Mutex;
use xrspace_core::math::{self, Mat4, Vec3};
use xrspace_core::{XrError, XrResult};

use crate::hit_test::Hit;

/// Shared handle to a tracking extension
pub type SharedRoomScale = Arc<Mutex<dyn RoomScaleTracker>>;

/// What the hardware declares
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoomScaleCapabilities {
    pub has_position: bool,
    pub has_passthrough_camera: bool,
    pub can_present: bool,
}

/// One frame of tracking data, in sitting space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoomScaleFrame {
    pub timestamp: f64,
    pub head_pose: Mat4,
    pub left_view: Mat4,
    pub right_view: Mat4,
    pub left_projection: Mat4,
    pub right_projection: Mat4,
}

pub trait RoomScaleTracker: Send {
    fn name(&self) -> &str;

    fn capabilities(&self) -> RoomScaleCapabilities;

    /// Transform from sitting to standing space, when the hardware knows one
    fn sitting_to_standing(&self) -> Option<Mat4>;

    /// Latest frame, `None` before the first pose arrives
    fn frame_data(&mut self) -> Option<RoomScaleFrame>;

    /// Synchronous hit test at a normalized screen point
    fn hit_test(&mut self, x: f64, y: f64) -> Vec<Hit>;

    fn request_present(&mut self) -> XrResult<()>;

    fn exit_present(&mut self);

    fn is_presenting(&self) -> bool;

    fn submit_frame(&mut self) -> XrResult<()>;

    fn frame_rate_hz(&self) -> f64;
}

/// Scriptable tracker for tests and desktop development
#[derive(Debug, Clone)]
pub struct SimulatedRoomScale {
    capabilities: RoomScaleCapabilities,
    sitting_to_standing: Option<Mat4>,
    frame: Option<RoomScaleFrame>,
    hits: Vec<Hit>,
    presenting: bool,
    submitted: u64,
    fail_submit: bool,
    frame_rate_hz: f64,
}

impl Default for SimulatedRoomScale {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedRoomScale {
    /// Presenting headset without passthrough
    pub fn new() -> Self {
        Self {
            capabilities: RoomScaleCapabilities {
                has_position: true,
                has_passthrough_camera: false,
                can_present: true,
            },
            sitting_to_standing: None,
            frame: None,
            hits: Vec::new(),
            presenting: false,
            submitted: 0,
            fail_submit: false,
            frame_rate_hz: 90.0,
        }
    }

    pub fn shared(self) -> Arc<Mutex<SimulatedRoomScale>> {
        Arc::new(Mutex::new(self))
    }

    pub fn with_passthrough(mut self) -> Self {
        self.capabilities.has_passthrough_camera = true;
        self
    }

    pub fn with_sitting_to_standing(mut self, transform: Mat4) -> Self {
        self.sitting_to_standing = Some(transform);
        self
    }

    /// Publish a head pose with eyes 64 mm apart and a symmetric projection
    pub fn set_head_pose(&mut self, timestamp: f64, head_pose: Mat4) {
        let half_ipd = 0.032;
        let eye = |dx: f64| {
            let eye_pose = head_pose * math::from_translation(&Vec3::new(dx, 0.0, 0.0));
            math::invert(&eye_pose).unwrap_or_else(math::identity)
        };
        let projection = math::perspective(100f64.to_radians(), 1.0, 0.1, 1000.0);
        self.frame = Some(RoomScaleFrame {
            timestamp,
            head_pose,
            left_view: eye(-half_ipd),
            right_view: eye(half_ipd),
            left_projection: projection,
            right_projection: projection,
        });
    }

    pub fn set_hits(&mut self, hits: Vec<Hit>) {
        self.hits = hits;
    }

    pub fn fail_next_submit(&mut self) {
        self.fail_submit = true;
    }

    pub fn submitted_frames(&self) -> u64 {
        self.submitted
    }
}

impl RoomScaleTracker for SimulatedRoomScale {
    fn name(&self) -> &str {
        "simulated-room-scale"
    }

    fn capabilities(&self) -> RoomScaleCapabilities {
        self.capabilities
    }

    fn sitting_to_standing(&self) -> Option<Mat4> {
        self.sitting_to_standing
    }

    fn frame_data(&mut self) -> Option<RoomScaleFrame> {
        self.frame
    }

    fn hit_test(&mut self, _x: f64, _y: f64) -> Vec<Hit> {
        self.hits.clone()
    }

    fn request_present(&mut self) -> XrResult<()> {
        if !self.capabilities.can_present {
            return Err(XrError::unsupported("headset cannot present"));
        }
        self.presenting = true;
        Ok(())
    }

    fn exit_present(&mut self) {
        self.presenting = false;
    }

    fn is_presenting(&self) -> bool {
        self.presenting
    }

    fn submit_frame(&mut self) -> XrResult<()> {
        if !self.presenting {
            return Ok(());
        }
        if std::mem::take(&mut self.fail_submit) {
            return Err(XrError::backend("simulated-room-scale", "compositor rejected frame"));
        }
        self.submitted += 1;
        Ok(())
    }

    fn frame_rate_hz(&self) -> f64 {
        self.frame_rate_hz
    }
}
