//! Realities: the providers of tracking data
//!
//! A [`Reality`] owns the anchor table and answers spatial queries (hit
//! tests, floor, light, world maps). Two variants exist:
//!
//! - **Virtual**: caller-defined anchors only, hit tests always miss, the
//!   floor is synthesized at the tracker origin.
//! - **Camera**: backed by one [`CameraBackend`], chosen once from the
//!   platform probe. Backend anchor deliveries are relayed into the table
//!   and re-emitted as [`RealityEvent`]s whatever the backend.
//!
//! Optional capabilities say so explicitly: a [`Capability::Unsupported`]
//! or a [`Pending`] rejected with `XrError::Unsupported`, never a silent
//! default.

pub mod camera;
mod floor;

pub use camera::CameraBackend;
pub use floor::{FloorAnchor, FloorSource};

use std::sync::Arc;

use parking_lot::Mutex;
use xrspace_core::math::{self, Mat4};
use xrspace_core::{EventBus, HitTestConfig, Pending, Subscription, XrError, XrResult};

use crate::anchor::{Anchor, AnchorId, AnchorOffset, AnchorTable};
use crate::bridge::{DetectionImage, TrackingState, VideoFrame, WorldMap, WorldMappingStatus};
use crate::coordinate::{CoordinateSystem, CoordinateSystemType, DisplayContext, PoseContext};
use crate::hit_test::{self, Hit, HitTypeMask};
use crate::session::SessionParams;

/// Reality shared between sessions
pub type SharedReality = Arc<Mutex<Reality>>;

/// Result of an optional capability query
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Capability<T> {
    Supported(T),
    Unsupported,
}

impl<T> Capability<T> {
    pub fn is_supported(&self) -> bool {
        matches!(self, Capability::Supported(_))
    }

    pub fn supported(self) -> Option<T> {
        match self {
            Capability::Supported(value) => Some(value),
            Capability::Unsupported => None,
        }
    }
}

/// Notifications published by a reality
#[derive(Debug, Clone, PartialEq)]
pub enum RealityEvent {
    /// The backend reported a new anchor
    AnchorAdded(AnchorId),
    AnchorUpdated(AnchorId),
    AnchorRemoved(AnchorId),
    TrackingChanged(TrackingState),
    BackendFault { backend: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealityKind {
    Virtual,
    Camera,
}

/// What a reality learned from its backend during one tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackingSample {
    pub timestamp: f64,
    /// Camera pose in the backend's tracking frame
    pub camera_pose: Option<Mat4>,
    /// Camera projection reported by the backend
    pub projection: Option<Mat4>,
    /// Focal length in pixels
    pub focal_length: Option<f64>,
    /// Where the backend's tracking frame sits in the world
    pub tracker_origin: Option<Mat4>,
}

impl TrackingSample {
    /// Sample carrying no backend data
    pub fn at(timestamp: f64) -> Self {
        Self {
            timestamp,
            ..Self::default()
        }
    }
}

/// Outcome of [`Reality::find_anchor`]
#[derive(Debug, Clone, PartialEq)]
pub struct FoundAnchor {
    pub offset: AnchorOffset,
    /// The anchor was created for this query rather than matched
    pub created: bool,
}

enum RealityBackend {
    Virtual,
    Camera(CameraBackend),
}

/// Maximum queued raw camera frames; older frames are dropped
const MAX_QUEUED_VIDEO_FRAMES: usize = 4;

pub struct Reality {
    name: String,
    shared: bool,
    backend: RealityBackend,
    anchors: AnchorTable,
    events: EventBus<RealityEvent>,
    active_sessions: usize,
    extent_tolerance: f64,
    light_intensity: Option<f64>,
    mapping_status: WorldMappingStatus,
    tracking_state: TrackingState,
    video_frames: Vec<VideoFrame>,
}

impl Reality {
    fn with_backend(name: &str, shared: bool, backend: RealityBackend, config: &HitTestConfig) -> Self {
        Self {
            name: name.to_string(),
            shared,
            backend,
            anchors: AnchorTable::new(),
            events: EventBus::new(),
            active_sessions: 0,
            extent_tolerance: config.extent_tolerance,
            light_intensity: None,
            mapping_status: WorldMappingStatus::NotAvailable,
            tracking_state: TrackingState::NotAvailable,
            video_frames: Vec::new(),
        }
    }

    pub fn new_virtual(name: &str, shared: bool, config: &HitTestConfig) -> Self {
        Self::with_backend(name, shared, RealityBackend::Virtual, config)
    }

    /// Camera realities are always shared
    pub fn new_camera(backend: CameraBackend, config: &HitTestConfig) -> Self {
        Self::with_backend("camera", true, RealityBackend::Camera(backend), config)
    }

    pub fn into_shared(self) -> SharedReality {
        Arc::new(Mutex::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_shared(&self) -> bool {
        self.shared
    }

    pub fn kind(&self) -> RealityKind {
        match self.backend {
            RealityBackend::Virtual => RealityKind::Virtual,
            RealityBackend::Camera(_) => RealityKind::Camera,
        }
    }

    /// Shows the camera image behind the scene
    pub fn is_passthrough(&self) -> bool {
        self.kind() == RealityKind::Camera
    }

    pub fn backend_name(&self) -> String {
        match &self.backend {
            RealityBackend::Virtual => "virtual".to_string(),
            RealityBackend::Camera(camera) => camera.name(),
        }
    }

    pub fn camera_backend(&self) -> Option<&CameraBackend> {
        match &self.backend {
            RealityBackend::Camera(camera) => Some(camera),
            RealityBackend::Virtual => None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.active_sessions > 0
    }

    pub fn tracking_state(&self) -> TrackingState {
        self.tracking_state
    }

    /// Begin serving one more session; the backend starts with the first
    pub fn start(&mut self, params: &SessionParams) -> XrResult<()> {
        params.validate()?;
        self.active_sessions += 1;
        if let RealityBackend::Camera(CameraBackend::NativeBridge(adapter)) = &mut self.backend {
            if self.active_sessions == 1 {
                adapter.begin(&params.bridge_init_options(), params.watch_options());
            }
            if params.video_frames {
                adapter.set_video_frames_enabled(true);
            }
        }
        if self.active_sessions == 1 {
            log::info!("reality '{}' started ({})", self.name, self.backend_name());
        }
        Ok(())
    }

    /// Release one session; the backend stops with the last
    pub fn stop(&mut self) -> Pending<()> {
        if self.active_sessions == 0 {
            return Pending::resolved(());
        }
        self.active_sessions -= 1;
        if self.active_sessions > 0 {
            return Pending::resolved(());
        }
        log::info!("reality '{}' stopped", self.name);
        self.video_frames.clear();
        match &mut self.backend {
            RealityBackend::Camera(CameraBackend::NativeBridge(adapter)) => adapter.stop(),
            _ => Pending::resolved(()),
        }
    }

    pub fn subscribe(&mut self) -> Subscription<RealityEvent> {
        self.events.subscribe()
    }

    pub fn anchors(&self) -> &AnchorTable {
        &self.anchors
    }

    pub fn get_anchor(&self, uid: &AnchorId) -> Option<&Anchor> {
        self.anchors.get(uid)
    }

    /// World pose of an anchor offset against this reality's table
    pub fn resolve_offset(&self, offset: &AnchorOffset, ctx: &PoseContext) -> XrResult<Mat4> {
        offset.world_transform(&self.anchors, ctx)
    }

    /// Register an anchor.
    ///
    /// Anchors given in a head-model or eye-level frame are pinned where that
    /// frame is right now, re-expressed relative to the tracker. Native
    /// bridges are also asked to track the anchor so later updates match by
    /// id. A bridge failure is published as a backend fault; the anchor stays.
    pub fn add_anchor(&mut self, mut anchor: Anchor, ctx: &PoseContext) -> XrResult<AnchorId> {
        let relative = match anchor.coordinate_system().kind() {
            CoordinateSystemType::Tracker => *anchor.coordinate_system().relative_matrix(),
            _ => {
                let relative = ctx.to_tracker_relative(&anchor.resolve_pose(ctx))?;
                anchor.set_tracker_relative(relative);
                relative
            }
        };
        let uid = self.anchors.insert(anchor)?;
        log::debug!("reality '{}' registered anchor '{}'", self.name, uid);

        if let RealityBackend::Camera(CameraBackend::NativeBridge(adapter)) = &mut self.backend {
            if let Err(err) = adapter.add_anchor(&uid, &relative) {
                let backend = adapter.name().to_string();
                self.report_fault(&backend, err.to_string());
            }
        }
        Ok(uid)
    }

    /// Drop an anchor; the table entry goes first, a bridge failure is reported after
    pub fn remove_anchor(&mut self, uid: &AnchorId) -> XrResult<()> {
        if self.anchors.remove(uid).is_none() {
            return Err(XrError::NotFound(format!("anchor '{}'", uid)));
        }
        if let RealityBackend::Camera(CameraBackend::NativeBridge(adapter)) = &mut self.backend {
            if let Err(err) = adapter.remove_anchor(uid) {
                let backend = adapter.name().to_string();
                self.report_fault(&backend, err.to_string());
                return Err(err);
            }
        }
        Ok(())
    }

    /// All hits at a screen point, nearest first
    pub fn hit_test_no_anchor(&mut self, x: f64, y: f64, display: &DisplayContext) -> XrResult<Vec<Hit>> {
        hit_test::validate_screen_point(x, y)?;
        match &self.backend {
            RealityBackend::Virtual | RealityBackend::Camera(CameraBackend::CaptureOnly) => Ok(Vec::new()),
            RealityBackend::Camera(CameraBackend::NativeBridge(_)) => {
                hit_test::hit_test_planes(&self.anchors, x, y, display, self.extent_tolerance)
            }
            RealityBackend::Camera(CameraBackend::RoomScale(tracker)) => {
                let mut hits = tracker.lock().hit_test(x, y);
                hit_test::sort_by_distance(&mut hits);
                Ok(hits)
            }
        }
    }

    /// Anchor the nearest hit at a screen point. `None` on a miss.
    ///
    /// A hit on a known plane reuses that plane's anchor; any other hit
    /// gets a fresh anchor at the hit pose.
    pub fn find_anchor(&mut self, x: f64, y: f64, display: &DisplayContext) -> XrResult<Option<FoundAnchor>> {
        let hits = self.hit_test_no_anchor(x, y, display)?;
        let Some(hit) = hits.into_iter().next() else {
            return Ok(None);
        };

        if let Some(uid) = hit.anchor_id.as_ref().filter(|uid| self.anchors.contains(uid)) {
            return Ok(Some(FoundAnchor {
                offset: AnchorOffset::new(uid.clone(), hit.local_transform),
                created: false,
            }));
        }

        let relative = display.pose.to_tracker_relative(&hit.world_transform)?;
        let anchor = Anchor::new(
            CoordinateSystem::tracker_relative(display.pose.display, relative),
            None,
        );
        let uid = self.add_anchor(anchor, &display.pose)?;
        Ok(Some(FoundAnchor {
            offset: AnchorOffset::new(uid, math::identity()),
            created: true,
        }))
    }

    /// The backend's own hit test
    pub fn request_backend_hit_test(&mut self, x: f64, y: f64, mask: HitTypeMask) -> Pending<Vec<Hit>> {
        if let Err(err) = hit_test::validate_screen_point(x, y) {
            return Pending::rejected(err);
        }
        match &mut self.backend {
            RealityBackend::Camera(CameraBackend::NativeBridge(adapter)) => adapter.hit_test(x, y, mask),
            RealityBackend::Camera(CameraBackend::RoomScale(tracker)) => {
                let mut hits: Vec<Hit> = tracker
                    .lock()
                    .hit_test(x, y)
                    .into_iter()
                    .filter(|hit| mask.contains(hit.hit_type))
                    .collect();
                hit_test::sort_by_distance(&mut hits);
                Pending::resolved(hits)
            }
            _ => Pending::resolved(Vec::new()),
        }
    }

    pub fn light_ambient_intensity(&self) -> Capability<Option<f64>> {
        match &self.backend {
            RealityBackend::Camera(CameraBackend::NativeBridge(_)) => {
                Capability::Supported(self.light_intensity)
            }
            _ => Capability::Unsupported,
        }
    }

    pub fn world_mapping_status(&self) -> Capability<WorldMappingStatus> {
        match &self.backend {
            RealityBackend::Camera(CameraBackend::NativeBridge(_)) => {
                Capability::Supported(self.mapping_status)
            }
            _ => Capability::Unsupported,
        }
    }

    fn unsupported<T>(&self, operation: &str) -> Pending<T> {
        Pending::rejected(XrError::unsupported(format!(
            "{} is not supported by the {} reality",
            operation,
            self.backend_name()
        )))
    }

    pub fn get_world_map(&mut self) -> Pending<WorldMap> {
        match &mut self.backend {
            RealityBackend::Camera(CameraBackend::NativeBridge(adapter)) => adapter.get_world_map(),
            _ => self.unsupported("world map export"),
        }
    }

    pub fn set_world_map(&mut self, map: &WorldMap) -> Pending<()> {
        match &mut self.backend {
            RealityBackend::Camera(CameraBackend::NativeBridge(adapter)) => adapter.set_world_map(map),
            _ => self.unsupported("world map import"),
        }
    }

    pub fn create_image_anchor(&mut self, image: DetectionImage) -> Pending<()> {
        if let Err(err) = image.validate() {
            return Pending::rejected(err);
        }
        match &mut self.backend {
            RealityBackend::Camera(CameraBackend::NativeBridge(adapter)) => {
                adapter.create_image_anchor(image)
            }
            _ => self.unsupported("image detection"),
        }
    }

    pub fn activate_detection_image(&mut self, name: &str) -> Pending<()> {
        match &mut self.backend {
            RealityBackend::Camera(CameraBackend::NativeBridge(adapter)) => {
                adapter.activate_detection_image(name)
            }
            _ => self.unsupported("image detection"),
        }
    }

    pub fn deactivate_detection_image(&mut self, name: &str) -> Pending<()> {
        match &mut self.backend {
            RealityBackend::Camera(CameraBackend::NativeBridge(adapter)) => {
                adapter.deactivate_detection_image(name)
            }
            _ => self.unsupported("image detection"),
        }
    }

    pub fn set_video_frames_enabled(&mut self, enabled: bool) -> XrResult<()> {
        match &mut self.backend {
            RealityBackend::Camera(CameraBackend::NativeBridge(adapter)) => {
                adapter.set_video_frames_enabled(enabled);
                Ok(())
            }
            _ => Err(XrError::unsupported(format!(
                "video frames are not supported by the {} reality",
                self.backend_name()
            ))),
        }
    }

    /// Raw camera frames received since the last call, oldest first
    pub fn take_video_frames(&mut self) -> Vec<VideoFrame> {
        std::mem::take(&mut self.video_frames)
    }

    /// Pull this tick's backend data
    pub fn handle_new_frame(&mut self, timestamp: f64, ctx: &PoseContext) -> TrackingSample {
        match &mut self.backend {
            RealityBackend::Virtual | RealityBackend::Camera(CameraBackend::CaptureOnly) => {
                TrackingSample::at(timestamp)
            }
            RealityBackend::Camera(CameraBackend::NativeBridge(adapter)) => {
                let messages = adapter.poll();
                let backend = adapter.name().to_string();
                self.apply_bridge_messages(&backend, messages, timestamp, ctx)
            }
            RealityBackend::Camera(CameraBackend::RoomScale(tracker)) => {
                let frame = tracker.lock().frame_data();
                match frame {
                    Some(frame) => TrackingSample {
                        timestamp,
                        camera_pose: Some(frame.head_pose),
                        ..TrackingSample::default()
                    },
                    None => TrackingSample::at(timestamp),
                }
            }
        }
    }

    fn report_fault(&mut self, backend: &str, message: String) {
        log::warn!("reality '{}' backend '{}' fault: {}", self.name, backend, message);
        self.events.publish(RealityEvent::BackendFault {
            backend: backend.to_string(),
            message,
        });
    }

    fn queue_video_frame(&mut self, frame: VideoFrame) {
        if self.video_frames.len() >= MAX_QUEUED_VIDEO_FRAMES {
            self.video_frames.remove(0);
        }
        self.video_frames.push(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::{PlaneAlignment, PlaneGeometry};
    use xrspace_core::math::{Quat, Vec3};

    fn virtual_reality() -> Reality {
        Reality::new_virtual("test", false, &HitTestConfig::default())
    }

    fn display_context() -> DisplayContext {
        let camera = math::from_rotation_translation(
            &Quat::from_axis_angle(&Vec3::x_axis(), -std::f64::consts::FRAC_PI_2),
            &Vec3::new(0.0, 2.0, 0.0),
        );
        DisplayContext {
            pose: PoseContext::identity(0),
            projection: math::perspective(1.0, 1.0, 0.1, 100.0),
            view: math::invert(&camera).unwrap(),
        }
    }

    #[test]
    fn test_virtual_hit_tests_always_miss() {
        let mut reality = virtual_reality();
        let ctx = display_context();
        reality
            .add_anchor(
                Anchor::plane(
                    CoordinateSystem::tracker(0),
                    None,
                    PlaneGeometry::new(Vec3::zeros(), [4.0, 4.0], PlaneAlignment::Horizontal),
                ),
                &ctx.pose,
            )
            .unwrap();
        assert!(reality.hit_test_no_anchor(0.5, 0.5, &ctx).unwrap().is_empty());
        assert!(reality.find_anchor(0.5, 0.5, &ctx).unwrap().is_none());
        assert!(reality.hit_test_no_anchor(2.0, 0.5, &ctx).is_err());
    }

    #[test]
    fn test_optional_capabilities_report_unsupported() {
        let mut reality = virtual_reality();
        assert_eq!(reality.light_ambient_intensity(), Capability::Unsupported);
        assert!(!reality.world_mapping_status().is_supported());
        let err = reality.get_world_map().try_take().unwrap().unwrap_err();
        assert!(err.is_unsupported());
        assert!(reality.set_video_frames_enabled(true).unwrap_err().is_unsupported());
    }

    #[test]
    fn test_start_stop_is_reference_counted() {
        let mut reality = virtual_reality();
        let params = SessionParams::reality();
        reality.start(&params).unwrap();
        reality.start(&params).unwrap();
        reality.stop().try_take().unwrap().unwrap();
        assert!(reality.is_running());
        reality.stop().try_take().unwrap().unwrap();
        assert!(!reality.is_running());
        // Extra stops are harmless
        reality.stop().try_take().unwrap().unwrap();
    }

    #[test]
    fn test_remove_unknown_anchor_is_not_found() {
        let mut reality = virtual_reality();
        let err = reality.remove_anchor(&"nope".into()).unwrap_err();
        assert!(matches!(err, XrError::NotFound(_)));
    }

    #[test]
    fn test_head_model_anchor_is_rehomed_for_tracker() {
        let mut reality = virtual_reality();
        let mut ctx = PoseContext::identity(0);
        ctx.head_model = math::from_translation(&Vec3::new(0.0, 1.5, 0.0));
        let uid = reality
            .add_anchor(Anchor::new(CoordinateSystem::head_model(0), None), &ctx)
            .unwrap();
        let placed = ctx.head_model;
        ctx.head_model = math::from_translation(&Vec3::new(3.0, 1.5, 0.0));
        let anchor = reality.get_anchor(&uid).unwrap();
        assert_eq!(anchor.coordinate_system().kind(), CoordinateSystemType::Tracker);
        assert!(math::approx_eq(&anchor.resolve_pose(&ctx), &placed, 1e-12));
    }
}
