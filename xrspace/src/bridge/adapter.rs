//! Lifecycle wrapper around a [`NativeBridge`]
//!
//! Owns the delivery channel and walks the bridge through
//! `init -> watch -> stop`. Initialization is asynchronous: the adapter
//! polls the pending device id at the start of each tick and starts
//! watching as soon as it arrives.

use crossbeam::channel::{unbounded, Receiver};
use xrspace_core::math::Mat4;
use xrspace_core::{Pending, XrError, XrResult};

use super::native::{
    BridgeInitOptions, BridgeMessage, BridgeSender, DetectionImage, NativeBridge, WatchOptions,
    WorldMap,
};
use crate::anchor::AnchorId;
use crate::hit_test::{Hit, HitTypeMask};

/// Where the bridge is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeLifecycle {
    Idle,
    Initializing,
    Watching,
    Failed,
}

pub struct NativeBridgeAdapter {
    bridge: Box<dyn NativeBridge>,
    tx: BridgeSender,
    rx: Receiver<BridgeMessage>,
    init: Option<Pending<String>>,
    device_id: Option<String>,
    lifecycle: BridgeLifecycle,
    watch_options: WatchOptions,
}

impl NativeBridgeAdapter {
    pub fn new(bridge: Box<dyn NativeBridge>) -> Self {
        let (tx, rx) = unbounded();
        Self {
            bridge,
            tx,
            rx,
            init: None,
            device_id: None,
            lifecycle: BridgeLifecycle::Idle,
            watch_options: WatchOptions::default(),
        }
    }

    pub fn name(&self) -> &str {
        self.bridge.name()
    }

    pub fn lifecycle(&self) -> BridgeLifecycle {
        self.lifecycle
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    /// Request initialization; no-op unless idle or failed
    pub fn begin(&mut self, init_options: &BridgeInitOptions, watch_options: WatchOptions) {
        if matches!(
            self.lifecycle,
            BridgeLifecycle::Initializing | BridgeLifecycle::Watching
        ) {
            return;
        }
        log::info!("initializing native bridge '{}'", self.bridge.name());
        self.watch_options = watch_options;
        self.init = Some(self.bridge.init(init_options));
        self.lifecycle = BridgeLifecycle::Initializing;
    }

    /// Advance initialization and drain everything delivered since the last call.
    ///
    /// An initialization failure is reported as a `BridgeMessage::Error`.
    pub fn poll(&mut self) -> Vec<BridgeMessage> {
        let mut messages = Vec::new();

        if let Some(init) = self.init.as_mut() {
            if let Some(outcome) = init.try_take() {
                self.init = None;
                match outcome {
                    Ok(device_id) => {
                        log::info!(
                            "native bridge '{}' ready on device '{}'",
                            self.bridge.name(),
                            device_id
                        );
                        self.device_id = Some(device_id);
                        self.bridge.watch(&self.watch_options, self.tx.clone());
                        self.lifecycle = BridgeLifecycle::Watching;
                    }
                    Err(err) => {
                        log::warn!("native bridge '{}' failed to initialize: {}", self.bridge.name(), err);
                        self.lifecycle = BridgeLifecycle::Failed;
                        messages.push(BridgeMessage::Error(err.to_string()));
                    }
                }
            }
        }

        messages.extend(self.rx.try_iter());
        messages
    }

    pub fn stop(&mut self) -> Pending<()> {
        self.init = None;
        self.device_id = None;
        self.lifecycle = BridgeLifecycle::Idle;
        let stopped = self.bridge.stop();
        // Deliveries queued before the stop are stale for the next start
        while self.rx.try_recv().is_ok() {}
        stopped
    }

    fn require_watching<T>(&self, operation: &str) -> Option<Pending<T>> {
        if self.lifecycle == BridgeLifecycle::Watching {
            None
        } else {
            Some(Pending::rejected(XrError::backend(
                self.bridge.name(),
                format!("{} before the bridge is running", operation),
            )))
        }
    }

    pub fn hit_test(&mut self, x: f64, y: f64, mask: HitTypeMask) -> Pending<Vec<Hit>> {
        if let Some(rejected) = self.require_watching("hit test") {
            return rejected;
        }
        self.bridge.hit_test(x, y, mask)
    }

    pub fn add_anchor(&mut self, uid: &AnchorId, transform: &Mat4) -> XrResult<()> {
        self.bridge.add_anchor(uid, transform)
    }

    pub fn remove_anchor(&mut self, uid: &AnchorId) -> XrResult<()> {
        self.bridge.remove_anchor(uid)
    }

    pub fn get_world_map(&mut self) -> Pending<WorldMap> {
        if let Some(rejected) = self.require_watching("world map request") {
            return rejected;
        }
        self.bridge.get_world_map()
    }

    pub fn set_world_map(&mut self, map: &WorldMap) -> Pending<()> {
        if let Some(rejected) = self.require_watching("world map upload") {
            return rejected;
        }
        self.bridge.set_world_map(map)
    }

    pub fn create_image_anchor(&mut self, image: DetectionImage) -> Pending<()> {
        self.bridge.create_image_anchor(image)
    }

    pub fn activate_detection_image(&mut self, name: &str) -> Pending<()> {
        self.bridge.activate_detection_image(name)
    }

    pub fn deactivate_detection_image(&mut self, name: &str) -> Pending<()> {
        self.bridge.deactivate_detection_image(name)
    }

    pub fn set_video_frames_enabled(&mut self, enabled: bool) {
        self.watch_options.video_frames = enabled;
        self.bridge.set_video_frames_enabled(enabled);
    }
}
