//! Displays: render targets and head-pose sources
//!
//! A [`Display`] owns its views and the three published poses (head,
//! eye-level origin, tracker origin). Once per tick the session hands it the
//! reality's [`TrackingSample`] through `handle_new_frame`, which refreshes
//! the head pose and view matrices before the frame callback runs;
//! `handle_after_frame` submits the rendered frame where that applies.
//!
//! Variants:
//!
//! - **Flat**: one view, pose from the native bridge, an orientation
//!   sensor, or a static pose at eye height
//! - **Head-mounted**: two views read straight from a room-scale tracker

mod flat;
mod head_mounted;
mod view;

pub use flat::FlatPoseSource;
pub use head_mounted::HeadMountedSource;
pub use view::{Eye, View, ViewRect, Viewport};

use std::sync::Arc;

use parking_lot::Mutex;
use xrspace_core::math::{self, Mat4, Vec3};
use xrspace_core::{DisplayConfig, XrError, XrResult};

use crate::coordinate::{
    CoordinateSystem, CoordinateSystemType, DisplayContext, DisplayId, PoseContext,
};
use crate::reality::TrackingSample;
use crate::session::{SessionParams, SessionType};

/// Display shared between the runtime and its sessions
pub type SharedDisplay = Arc<Mutex<Display>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayKind {
    Flat,
    HeadMounted,
}

#[derive(Debug, Clone)]
enum DisplayBackend {
    Flat(FlatPoseSource),
    HeadMounted(HeadMountedSource),
}

pub struct Display {
    id: DisplayId,
    name: String,
    backend: DisplayBackend,
    views: Vec<View>,
    head_pose: Mat4,
    eye_level_pose: Mat4,
    tracker_pose: Mat4,
    depth_near: f64,
    depth_far: f64,
    fov_y: f64,
    viewport: Viewport,
    focal_length: Option<f64>,
    /// Device camera projection; replaces the lens-derived one when known
    backend_projection: Option<Mat4>,
    frame_rate_hz: f64,
    camera_reality_available: bool,
    eye_height: f64,
}

impl Display {
    fn with_backend(
        id: DisplayId,
        name: &str,
        backend: DisplayBackend,
        views: Vec<View>,
        config: &DisplayConfig,
    ) -> Self {
        let eye_level_pose = math::from_translation(&Vec3::new(0.0, config.eye_height, 0.0));
        let mut display = Self {
            id,
            name: name.to_string(),
            backend,
            views,
            head_pose: eye_level_pose,
            eye_level_pose,
            tracker_pose: math::identity(),
            depth_near: config.depth_near,
            depth_far: config.depth_far,
            fov_y: config.fov_y_degrees.to_radians(),
            viewport: Viewport::default(),
            focal_length: None,
            backend_projection: None,
            frame_rate_hz: config.frame_rate_hz,
            camera_reality_available: false,
            eye_height: config.eye_height,
        };
        display.refresh_mono_view();
        display
    }

    /// Single-view display (phone, tablet, desktop window)
    pub fn flat(
        id: DisplayId,
        source: FlatPoseSource,
        camera_reality_available: bool,
        config: &DisplayConfig,
    ) -> Self {
        let mut display = Self::with_backend(
            id,
            "flat",
            DisplayBackend::Flat(source),
            vec![View::mono()],
            config,
        );
        display.camera_reality_available = camera_reality_available;
        display
    }

    /// Stereo headset driven by a room-scale tracker
    pub fn head_mounted(id: DisplayId, source: HeadMountedSource, config: &DisplayConfig) -> Self {
        let mut display = Self::with_backend(
            id,
            "head-mounted",
            DisplayBackend::HeadMounted(source),
            View::stereo().to_vec(),
            config,
        );
        display.eye_level_pose = math::identity();
        display
    }

    pub fn into_shared(self) -> SharedDisplay {
        Arc::new(Mutex::new(self))
    }

    pub fn id(&self) -> DisplayId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DisplayKind {
        match self.backend {
            DisplayBackend::Flat(_) => DisplayKind::Flat,
            DisplayBackend::HeadMounted(_) => DisplayKind::HeadMounted,
        }
    }

    pub fn views(&self) -> &[View] {
        &self.views
    }

    pub fn head_pose(&self) -> &Mat4 {
        &self.head_pose
    }

    pub fn eye_level_pose(&self) -> &Mat4 {
        &self.eye_level_pose
    }

    pub fn tracker_pose(&self) -> &Mat4 {
        &self.tracker_pose
    }

    pub fn depth_range(&self) -> (f64, f64) {
        (self.depth_near, self.depth_far)
    }

    pub fn set_depth_range(&mut self, near: f64, far: f64) -> XrResult<()> {
        if !(near > 0.0 && far > near) {
            return Err(XrError::invalid_input(format!(
                "depth range must satisfy 0 < near < far, got {} / {}",
                near, far
            )));
        }
        self.depth_near = near;
        self.depth_far = far;
        self.refresh_mono_view();
        Ok(())
    }

    /// Vertical field of view in radians
    pub fn fov_y(&self) -> f64 {
        self.fov_y
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn frame_rate_hz(&self) -> f64 {
        match &self.backend {
            DisplayBackend::HeadMounted(source) => source.frame_rate_hz(),
            DisplayBackend::Flat(_) => self.frame_rate_hz,
        }
    }

    /// Poses published this tick
    pub fn pose_context(&self) -> PoseContext {
        PoseContext {
            display: self.id,
            head_model: self.head_pose,
            eye_level: self.eye_level_pose,
            tracker: self.tracker_pose,
        }
    }

    /// Poses plus the primary view's camera matrices
    pub fn context(&self) -> DisplayContext {
        let primary = self.views.first().copied().unwrap_or_else(View::mono);
        DisplayContext {
            pose: self.pose_context(),
            projection: primary.projection,
            view: primary.view,
        }
    }

    pub fn coordinate_system(&self, kind: CoordinateSystemType) -> CoordinateSystem {
        CoordinateSystem::new(kind, self.id)
    }

    pub fn supports_session(&self, params: &SessionParams) -> bool {
        match &self.backend {
            DisplayBackend::Flat(_) => {
                !params.exclusive
                    && match params.session_type {
                        SessionType::Reality => true,
                        SessionType::Augmentation => self.camera_reality_available,
                    }
            }
            DisplayBackend::HeadMounted(source) => match params.session_type {
                SessionType::Reality => true,
                SessionType::Augmentation => source.capabilities().has_passthrough_camera,
            },
        }
    }

    /// Validate session parameters against what this display supports
    pub fn request_session(&self, params: &SessionParams) -> XrResult<()> {
        params.validate()?;
        if !self.supports_session(params) {
            return Err(XrError::invalid_input(format!(
                "display '{}' does not support {} {:?} sessions",
                self.name,
                if params.exclusive { "exclusive" } else { "non-exclusive" },
                params.session_type
            )));
        }
        Ok(())
    }

    /// Take over the display for an exclusive session
    pub fn begin_presenting(&mut self) -> XrResult<()> {
        match &self.backend {
            DisplayBackend::HeadMounted(source) => source.request_present(),
            DisplayBackend::Flat(_) => Err(XrError::unsupported("flat displays cannot present exclusively")),
        }
    }

    pub fn end_presenting(&mut self) {
        if let DisplayBackend::HeadMounted(source) = &self.backend {
            source.exit_present();
        }
    }

    /// Pull the latest pose before the frame callback runs
    pub fn handle_new_frame(&mut self, timestamp: f64, sample: &TrackingSample) {
        let backend = self.backend.clone();
        match backend {
            DisplayBackend::Flat(source) => self.update_flat(&source, sample),
            DisplayBackend::HeadMounted(source) => self.update_head_mounted(&source),
        }
        log::trace!("display {} updated for frame at {:.1} ms", self.id, timestamp);
    }

    /// Submit the rendered frame where the display needs it
    pub fn handle_after_frame(&mut self) -> XrResult<()> {
        match &self.backend {
            DisplayBackend::HeadMounted(source) => source.submit_frame(),
            DisplayBackend::Flat(_) => Ok(()),
        }
    }

    /// Viewport change; a known focal length re-derives the field of view
    pub fn resize(&mut self, width: u32, height: u32) -> XrResult<()> {
        if width == 0 || height == 0 {
            return Err(XrError::invalid_input(format!(
                "viewport must be non-empty, got {}x{}",
                width, height
            )));
        }
        self.viewport = Viewport { width, height };
        if let Some(focal_length) = self.focal_length {
            self.fov_y = math::fov_from_focal_length(focal_length, height as f64);
        }
        self.refresh_mono_view();
        Ok(())
    }

    /// Rebuild a flat display's single view from the head pose and lens
    fn refresh_mono_view(&mut self) {
        if self.kind() != DisplayKind::Flat {
            return;
        }
        let projection = self.backend_projection.unwrap_or_else(|| {
            math::perspective(
                self.fov_y,
                self.viewport.aspect(),
                self.depth_near,
                self.depth_far,
            )
        });
        let view = math::invert(&self.head_pose).unwrap_or_else(math::identity);
        for v in &mut self.views {
            v.projection = projection;
            v.view = view;
        }
    }
}
