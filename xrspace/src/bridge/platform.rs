//! Platform probe
//!
//! Collects whichever tracking backends the host offers. The runtime probes
//! it exactly once and picks a backend for each reality and display.

use std::fmt;

use super::native::NativeBridge;
use super::orientation::SharedOrientation;
use super::room_scale::SharedRoomScale;

/// Backends available on the host
#[derive(Default)]
pub struct Platform {
    native_bridge: Option<Box<dyn NativeBridge>>,
    room_scale: Option<SharedRoomScale>,
    orientation: Option<SharedOrientation>,
    camera_capture: bool,
}

/// Summary of [`Platform`] used for backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlatformCapabilities {
    pub native_bridge: bool,
    pub room_scale: bool,
    pub orientation_sensor: bool,
    pub camera_capture: bool,
    pub passthrough_camera: bool,
    pub can_present: bool,
}

impl PlatformCapabilities {
    /// Any backend that can feed a camera reality
    pub fn has_camera_reality(&self) -> bool {
        self.native_bridge || self.passthrough_camera || self.camera_capture
    }
}

impl Platform {
    /// Desktop host with no tracking hardware
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_native_bridge(mut self, bridge: Box<dyn NativeBridge>) -> Self {
        self.native_bridge = Some(bridge);
        self
    }

    pub fn with_room_scale(mut self, tracker: SharedRoomScale) -> Self {
        self.room_scale = Some(tracker);
        self
    }

    pub fn with_orientation_sensor(mut self, sensor: SharedOrientation) -> Self {
        self.orientation = Some(sensor);
        self
    }

    /// Plain camera capture with no 3-D understanding
    pub fn with_camera_capture(mut self) -> Self {
        self.camera_capture = true;
        self
    }

    pub fn capabilities(&self) -> PlatformCapabilities {
        let room = self.room_scale.as_ref().map(|tracker| tracker.lock().capabilities());
        PlatformCapabilities {
            native_bridge: self.native_bridge.is_some(),
            room_scale: self.room_scale.is_some(),
            orientation_sensor: self.orientation.is_some(),
            camera_capture: self.camera_capture,
            passthrough_camera: room.map_or(false, |caps| caps.has_passthrough_camera),
            can_present: room.map_or(false, |caps| caps.can_present),
        }
    }

    pub(crate) fn take_native_bridge(&mut self) -> Option<Box<dyn NativeBridge>> {
        self.native_bridge.take()
    }

    pub(crate) fn room_scale(&self) -> Option<SharedRoomScale> {
        self.room_scale.clone()
    }

    pub(crate) fn orientation_sensor(&self) -> Option<SharedOrientation> {
        self.orientation.clone()
    }
}

impl fmt::Debug for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Platform")
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::native::SimulatedArBridge;
    use crate::bridge::room_scale::SimulatedRoomScale;

    #[test]
    fn test_desktop_has_nothing() {
        let caps = Platform::new().capabilities();
        assert!(!caps.has_camera_reality());
        assert!(!caps.can_present);
    }

    #[test]
    fn test_capabilities_reflect_backends() {
        let (bridge, _handle) = SimulatedArBridge::new();
        let platform = Platform::new()
            .with_native_bridge(Box::new(bridge))
            .with_room_scale(SimulatedRoomScale::new().with_passthrough().shared());
        let caps = platform.capabilities();
        assert!(caps.native_bridge && caps.room_scale);
        assert!(caps.passthrough_camera && caps.can_present);
        assert!(caps.has_camera_reality());
    }

    #[test]
    fn test_tracker_without_passthrough_is_not_a_camera() {
        let caps = Platform::new()
            .with_room_scale(SimulatedRoomScale::new().shared())
            .capabilities();
        assert!(caps.room_scale && caps.can_present);
        assert!(!caps.has_camera_reality());
    }
}
