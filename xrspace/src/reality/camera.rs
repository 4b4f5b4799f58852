//! Camera reality backends
//!
//! The backend is chosen once, in priority order: a native AR bridge, then a
//! room-scale tracking extension, then plain camera capture. Whatever the
//! backend, anchor deliveries end up in the reality's table and on its
//! event bus.

use std::fmt;

use super::{Reality, RealityEvent, TrackingSample};
use crate::anchor::{Anchor, AnchorKind, FaceGeometry};
use crate::bridge::{
    BridgeAnchor, BridgeAnchorGeometry, BridgeFrame, BridgeMessage, NativeBridgeAdapter, Platform,
    SharedRoomScale,
};
use crate::coordinate::{CoordinateSystem, DisplayId, PoseContext};

/// Tracking source behind a camera reality
pub enum CameraBackend {
    /// 6-DoF poses with plane and anchor detection
    NativeBridge(NativeBridgeAdapter),
    /// Headset extension with a synchronous forward hit test
    RoomScale(SharedRoomScale),
    /// Camera image only; no spatial understanding
    CaptureOnly,
}

impl CameraBackend {
    /// Best backend the platform offers, `None` when there is no camera at all
    pub fn probe(platform: &mut Platform) -> Option<Self> {
        if let Some(bridge) = platform.take_native_bridge() {
            return Some(CameraBackend::NativeBridge(NativeBridgeAdapter::new(bridge)));
        }
        // A tracker only counts as a camera when it can see through the headset
        if let Some(tracker) = platform
            .room_scale()
            .filter(|tracker| tracker.lock().capabilities().has_passthrough_camera)
        {
            return Some(CameraBackend::RoomScale(tracker));
        }
        if platform.capabilities().camera_capture {
            return Some(CameraBackend::CaptureOnly);
        }
        None
    }

    pub fn name(&self) -> String {
        match self {
            CameraBackend::NativeBridge(adapter) => adapter.name().to_string(),
            CameraBackend::RoomScale(tracker) => tracker.lock().name().to_string(),
            CameraBackend::CaptureOnly => "camera-capture".to_string(),
        }
    }

    /// Whether the backend can place anchors and report planes
    pub fn has_spatial_understanding(&self) -> bool {
        !matches!(self, CameraBackend::CaptureOnly)
    }
}

impl fmt::Debug for CameraBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CameraBackend").field(&self.name()).finish()
    }
}

fn kind_from_geometry(geometry: &BridgeAnchorGeometry) -> AnchorKind {
    match geometry {
        BridgeAnchorGeometry::Point => AnchorKind::Point,
        BridgeAnchorGeometry::Plane(plane) => AnchorKind::Plane(plane.clone()),
        BridgeAnchorGeometry::Face {
            blend_shapes,
            vertices,
        } => {
            let mut face = FaceGeometry::new();
            face.replace_named_blend_shapes(blend_shapes);
            face.vertices = vertices.clone();
            AnchorKind::Face(face)
        }
        BridgeAnchorGeometry::Image { name } => AnchorKind::Image { name: name.clone() },
    }
}

fn apply_geometry(kind: &mut AnchorKind, geometry: &BridgeAnchorGeometry) {
    match (kind, geometry) {
        // Point updates carry only a pose; specialized geometry is kept
        (_, BridgeAnchorGeometry::Point) => {}
        (AnchorKind::Face(face), BridgeAnchorGeometry::Face { blend_shapes, vertices }) => {
            face.replace_named_blend_shapes(blend_shapes);
            face.vertices = vertices.clone();
        }
        (kind, geometry) => *kind = kind_from_geometry(geometry),
    }
}

impl Reality {
    pub(super) fn apply_bridge_messages(
        &mut self,
        backend: &str,
        messages: Vec<BridgeMessage>,
        timestamp: f64,
        ctx: &PoseContext,
    ) -> TrackingSample {
        let mut sample = TrackingSample::at(timestamp);
        for message in messages {
            match message {
                BridgeMessage::Frame(frame) => {
                    self.apply_bridge_frame(&frame, ctx.display);
                    sample.camera_pose = Some(frame.camera_pose);
                    sample.projection = Some(frame.projection);
                    if frame.focal_length.is_some() {
                        sample.focal_length = frame.focal_length;
                    }
                    if frame.tracker_origin.is_some() {
                        sample.tracker_origin = frame.tracker_origin;
                    }
                }
                BridgeMessage::VideoFrame(video) => self.queue_video_frame(video),
                BridgeMessage::TrackingChanged(state) => {
                    if state != self.tracking_state {
                        log::info!("reality '{}' tracking {:?} -> {:?}", self.name, self.tracking_state, state);
                        self.tracking_state = state;
                        self.events.publish(RealityEvent::TrackingChanged(state));
                    }
                }
                BridgeMessage::Error(message) => self.report_fault(backend, message),
            }
        }
        sample
    }

    fn apply_bridge_frame(&mut self, frame: &BridgeFrame, display: DisplayId) {
        if frame.light_intensity.is_some() {
            self.light_intensity = frame.light_intensity;
        }
        self.mapping_status = frame.world_mapping_status;

        for anchor in frame.new_anchors.iter().chain(frame.updated_anchors.iter()) {
            self.upsert_bridge_anchor(anchor, display, frame.timestamp);
        }
        for uid in &frame.removed_anchor_ids {
            if self.anchors.remove(uid).is_some() {
                log::debug!("backend removed anchor '{}'", uid);
                self.events.publish(RealityEvent::AnchorRemoved(uid.clone()));
            }
        }
    }

    /// Update a known anchor by id, or register a new one
    fn upsert_bridge_anchor(&mut self, delivered: &BridgeAnchor, display: DisplayId, timestamp: f64) {
        if let Some(existing) = self.anchors.get_mut(&delivered.uid) {
            existing.set_tracker_relative(delivered.transform);
            apply_geometry(existing.kind_mut(), &delivered.geometry);
            existing.set_timestamp(timestamp);
            self.events
                .publish(RealityEvent::AnchorUpdated(delivered.uid.clone()));
            return;
        }

        let mut anchor = Anchor::with_kind(
            CoordinateSystem::tracker_relative(display, delivered.transform),
            Some(delivered.uid.clone()),
            kind_from_geometry(&delivered.geometry),
        );
        anchor.set_timestamp(timestamp);
        match self.anchors.insert(anchor) {
            Ok(uid) => {
                log::debug!("backend added anchor '{}'", uid);
                self.events.publish(RealityEvent::AnchorAdded(uid));
            }
            Err(err) => log::warn!("dropping delivered anchor: {}", err),
        }
    }
}
