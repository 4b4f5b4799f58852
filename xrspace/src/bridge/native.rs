//! Native AR bridge
//!
//! A native AR bridge supplies 6-DoF camera poses, plane and anchor
//! detection, light estimation and world maps. Per-tick deliveries are
//! pushed into a [`BridgeSender`] handed over by `watch`; the owner drains
//! the matching receiver at the start of every tick.
//!
//! Poses delivered by the bridge are expressed in the bridge's own tracking
//! frame. `BridgeFrame::tracker_origin`, when present, is where that frame
//! currently sits in the application's world.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use crossbeam::channel::Sender;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use xrspace_core::math::{self, Mat4};
use xrspace_core::{pending, Pending, Resolver, XrError, XrResult};

use crate::anchor::{AnchorId, PlaneGeometry};
use crate::hit_test::{Hit, HitTypeMask};

/// Channel end a bridge pushes its deliveries into
pub type BridgeSender = Sender<BridgeMessage>;

/// Options passed to `NativeBridge::init`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeInitOptions {
    pub world_sensing: bool,
    pub light_estimation: bool,
}

/// Options passed to `NativeBridge::watch`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchOptions {
    pub camera: bool,
    pub objects: bool,
    pub light_intensity: bool,
    pub video_frames: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            camera: true,
            objects: true,
            light_intensity: true,
            video_frames: false,
        }
    }
}

/// Backend tracking quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackingState {
    NotAvailable,
    Limited,
    Normal,
}

/// Progress of the backend's world map
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WorldMappingStatus {
    #[default]
    NotAvailable,
    Limited,
    Extending,
    Mapped,
}

/// Opaque serialized world map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldMap {
    pub data: Vec<u8>,
}

/// Reference image for image detection
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionImage {
    pub name: String,
    pub width_px: u32,
    pub height_px: u32,
    /// Real-world width of the printed image, meters
    pub physical_width: f64,
    /// RGBA pixels, row-major
    pub pixels: Vec<u8>,
}

impl DetectionImage {
    pub fn validate(&self) -> XrResult<()> {
        if self.name.is_empty() {
            return Err(XrError::invalid_input("detection image needs a name"));
        }
        if !(self.physical_width > 0.0) {
            return Err(XrError::invalid_input(format!(
                "detection image '{}' has non-positive physical width",
                self.name
            )));
        }
        let expected = self.width_px as usize * self.height_px as usize * 4;
        if self.pixels.len() != expected {
            return Err(XrError::invalid_input(format!(
                "detection image '{}' has {} bytes, expected {}",
                self.name,
                self.pixels.len(),
                expected
            )));
        }
        Ok(())
    }
}

/// Geometry attached to a delivered anchor
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeAnchorGeometry {
    Point,
    Plane(PlaneGeometry),
    Face {
        blend_shapes: BTreeMap<String, f64>,
        vertices: Vec<[f64; 3]>,
    },
    Image {
        name: String,
    },
}

/// One anchor as delivered by the bridge
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeAnchor {
    pub uid: AnchorId,
    /// Pose in the bridge's tracking frame
    pub transform: Mat4,
    pub geometry: BridgeAnchorGeometry,
}

/// Per-tick delivery
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeFrame {
    pub timestamp: f64,
    pub camera_pose: Mat4,
    pub projection: Mat4,
    /// Focal length in pixels, when the camera reports one
    pub focal_length: Option<f64>,
    pub light_intensity: Option<f64>,
    pub world_mapping_status: WorldMappingStatus,
    pub tracker_origin: Option<Mat4>,
    pub new_anchors: Vec<BridgeAnchor>,
    pub updated_anchors: Vec<BridgeAnchor>,
    pub removed_anchor_ids: Vec<AnchorId>,
}

impl BridgeFrame {
    /// Frame with only a camera pose and a default projection
    pub fn at(timestamp: f64, camera_pose: Mat4) -> Self {
        Self {
            timestamp,
            camera_pose,
            projection: math::perspective(50f64.to_radians(), 1.0, 0.1, 1000.0),
            focal_length: None,
            light_intensity: None,
            world_mapping_status: WorldMappingStatus::NotAvailable,
            tracker_origin: None,
            new_anchors: Vec::new(),
            updated_anchors: Vec::new(),
            removed_anchor_ids: Vec::new(),
        }
    }
}

/// Raw camera image delivered by the bridge
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub timestamp: f64,
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<Vec<u8>>,
    pub view: Mat4,
    pub projection: Mat4,
    /// Anchor whose frame `view` was rewritten into
    pub anchor_id: Option<AnchorId>,
}

/// Everything a bridge can push between ticks
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeMessage {
    Frame(Box<BridgeFrame>),
    VideoFrame(VideoFrame),
    TrackingChanged(TrackingState),
    Error(String),
}

/// Narrow interface to a platform AR runtime
pub trait NativeBridge: Send {
    fn name(&self) -> &str;

    /// Start the runtime; resolves with a device id
    fn init(&mut self, options: &BridgeInitOptions) -> Pending<String>;

    /// Begin delivering into `sink`. Calling it again while watching is a no-op.
    fn watch(&mut self, options: &WatchOptions, sink: BridgeSender);

    fn stop(&mut self) -> Pending<()>;

    fn hit_test(&mut self, x: f64, y: f64, mask: HitTypeMask) -> Pending<Vec<Hit>>;

    /// Ask the runtime to track an anchor at `transform` (bridge frame)
    fn add_anchor(&mut self, uid: &AnchorId, transform: &Mat4) -> XrResult<()>;

    fn remove_anchor(&mut self, uid: &AnchorId) -> XrResult<()>;

    fn get_world_map(&mut self) -> Pending<WorldMap>;

    fn set_world_map(&mut self, map: &WorldMap) -> Pending<()>;

    fn create_image_anchor(&mut self, image: DetectionImage) -> Pending<()>;

    fn activate_detection_image(&mut self, name: &str) -> Pending<()>;

    fn deactivate_detection_image(&mut self, name: &str) -> Pending<()>;

    fn set_video_frames_enabled(&mut self, enabled: bool);
}

#[derive(Default)]
struct SimulatedBridgeState {
    defer_init: bool,
    init_error: Option<String>,
    init_resolver: Option<Resolver<String>>,
    init_calls: usize,
    sink: Option<BridgeSender>,
    watch_calls: usize,
    stopped: bool,
    hit_results: Vec<Hit>,
    added_anchors: Vec<(AnchorId, Mat4)>,
    removed_anchors: Vec<AnchorId>,
    fail_next_add: bool,
    fail_next_remove: bool,
    world_map: Option<WorldMap>,
    detection_images: HashMap<String, DetectionImage>,
    active_images: HashSet<String>,
    video_frames_enabled: bool,
}

/// In-process bridge for tests and desktop development
///
/// Scripted through a [`SimulatedBridgeHandle`], which shares its state.
pub struct SimulatedArBridge {
    state: Arc<Mutex<SimulatedBridgeState>>,
}

/// Test-side control of a [`SimulatedArBridge`]
#[derive(Clone)]
pub struct SimulatedBridgeHandle {
    state: Arc<Mutex<SimulatedBridgeState>>,
}

impl SimulatedArBridge {
    pub const DEVICE_ID: &'static str = "simulated-ar-device";

    pub fn new() -> (Self, SimulatedBridgeHandle) {
        let state = Arc::new(Mutex::new(SimulatedBridgeState::default()));
        (
            Self {
                state: state.clone(),
            },
            SimulatedBridgeHandle { state },
        )
    }

    fn unknown_image<T>(name: &str) -> Pending<T> {
        Pending::rejected(XrError::NotFound(format!("detection image '{}'", name)))
    }
}

impl NativeBridge for SimulatedArBridge {
    fn name(&self) -> &str {
        "simulated-ar"
    }

    fn init(&mut self, _options: &BridgeInitOptions) -> Pending<String> {
        let mut state = self.state.lock();
        state.init_calls += 1;
        state.stopped = false;
        if let Some(message) = state.init_error.take() {
            return Pending::rejected(XrError::backend("simulated-ar", message));
        }
        if state.defer_init {
            let (resolver, result) = pending();
            state.init_resolver = Some(resolver);
            return result;
        }
        Pending::resolved(Self::DEVICE_ID.to_string())
    }

    fn watch(&mut self, _options: &WatchOptions, sink: BridgeSender) {
        let mut state = self.state.lock();
        if state.sink.is_some() {
            return;
        }
        state.watch_calls += 1;
        state.sink = Some(sink);
    }

    fn stop(&mut self) -> Pending<()> {
        let mut state = self.state.lock();
        state.sink = None;
        state.stopped = true;
        Pending::resolved(())
    }

    fn hit_test(&mut self, _x: f64, _y: f64, mask: HitTypeMask) -> Pending<Vec<Hit>> {
        let state = self.state.lock();
        let hits = state
            .hit_results
            .iter()
            .filter(|hit| mask.contains(hit.hit_type))
            .cloned()
            .collect();
        Pending::resolved(hits)
    }

    fn add_anchor(&mut self, uid: &AnchorId, transform: &Mat4) -> XrResult<()> {
        let mut state = self.state.lock();
        if std::mem::take(&mut state.fail_next_add) {
            return Err(XrError::backend("simulated-ar", format!("cannot add anchor '{}'", uid)));
        }
        state.added_anchors.push((uid.clone(), *transform));
        Ok(())
    }

    fn remove_anchor(&mut self, uid: &AnchorId) -> XrResult<()> {
        let mut state = self.state.lock();
        if std::mem::take(&mut state.fail_next_remove) {
            return Err(XrError::backend(
                "simulated-ar",
                format!("cannot remove anchor '{}'", uid),
            ));
        }
        state.removed_anchors.push(uid.clone());
        Ok(())
    }

    fn get_world_map(&mut self) -> Pending<WorldMap> {
        match self.state.lock().world_map.clone() {
            Some(map) => Pending::resolved(map),
            None => Pending::rejected(XrError::NotFound("world map".to_string())),
        }
    }

    fn set_world_map(&mut self, map: &WorldMap) -> Pending<()> {
        self.state.lock().world_map = Some(map.clone());
        Pending::resolved(())
    }

    fn create_image_anchor(&mut self, image: DetectionImage) -> Pending<()> {
        if let Err(err) = image.validate() {
            return Pending::rejected(err);
        }
        self.state
            .lock()
            .detection_images
            .insert(image.name.clone(), image);
        Pending::resolved(())
    }

    fn activate_detection_image(&mut self, name: &str) -> Pending<()> {
        let mut state = self.state.lock();
        if !state.detection_images.contains_key(name) {
            return Self::unknown_image(name);
        }
        state.active_images.insert(name.to_string());
        Pending::resolved(())
    }

    fn deactivate_detection_image(&mut self, name: &str) -> Pending<()> {
        let mut state = self.state.lock();
        if !state.active_images.remove(name) {
            return Self::unknown_image(name);
        }
        Pending::resolved(())
    }

    fn set_video_frames_enabled(&mut self, enabled: bool) {
        self.state.lock().video_frames_enabled = enabled;
    }
}

impl SimulatedBridgeHandle {
    /// Hold `init` open until `complete_init` or `fail_init`
    pub fn defer_init(&self) {
        self.state.lock().defer_init = true;
    }

    /// Make the next `init` reject
    pub fn fail_next_init(&self, message: &str) {
        self.state.lock().init_error = Some(message.to_string());
    }

    pub fn complete_init(&self) -> bool {
        match self.state.lock().init_resolver.take() {
            Some(resolver) => {
                resolver.resolve(SimulatedArBridge::DEVICE_ID.to_string());
                true
            }
            None => false,
        }
    }

    pub fn fail_init(&self, message: &str) -> bool {
        match self.state.lock().init_resolver.take() {
            Some(resolver) => {
                resolver.reject(XrError::backend("simulated-ar", message));
                true
            }
            None => false,
        }
    }

    /// Deliver a message if the bridge is being watched
    pub fn push(&self, message: BridgeMessage) -> bool {
        match &self.state.lock().sink {
            Some(sink) => sink.send(message).is_ok(),
            None => false,
        }
    }

    pub fn push_frame(&self, frame: BridgeFrame) -> bool {
        self.push(BridgeMessage::Frame(Box::new(frame)))
    }

    pub fn push_error(&self, message: &str) -> bool {
        self.push(BridgeMessage::Error(message.to_string()))
    }

    pub fn set_hit_results(&self, hits: Vec<Hit>) {
        self.state.lock().hit_results = hits;
    }

    pub fn fail_next_add(&self) {
        self.state.lock().fail_next_add = true;
    }

    pub fn fail_next_remove(&self) {
        self.state.lock().fail_next_remove = true;
    }

    pub fn is_watching(&self) -> bool {
        self.state.lock().sink.is_some()
    }

    pub fn init_calls(&self) -> usize {
        self.state.lock().init_calls
    }

    pub fn watch_calls(&self) -> usize {
        self.state.lock().watch_calls
    }

    pub fn is_stopped(&self) -> bool {
        self.state.lock().stopped
    }

    pub fn added_anchors(&self) -> Vec<(AnchorId, Mat4)> {
        self.state.lock().added_anchors.clone()
    }

    pub fn removed_anchors(&self) -> Vec<AnchorId> {
        self.state.lock().removed_anchors.clone()
    }

    pub fn active_images(&self) -> Vec<String> {
        let mut names: Vec<_> = self.state.lock().active_images.iter().cloned().collect();
        names.sort();
        names
    }

    pub fn video_frames_enabled(&self) -> bool {
        self.state.lock().video_frames_enabled
    }
}
