//! Tracking backends
//!
//! - [`native`]: native AR runtime with 6-DoF poses, planes and anchors
//! - [`room_scale`]: headset tracking extension with per-eye matrices
//! - [`orientation`]: attitude-only fallback for handheld devices
//! - [`platform`]: the set of backends a host offers
//!
//! Every backend has a simulated implementation for tests and desktop use.

pub mod adapter;
pub mod native;
pub mod orientation;
pub mod platform;
pub mod room_scale;

pub use adapter::{BridgeLifecycle, NativeBridgeAdapter};
pub use native::{
    BridgeAnchor, BridgeAnchorGeometry, BridgeFrame, BridgeInitOptions, BridgeMessage,
    BridgeSender, DetectionImage, NativeBridge, SimulatedArBridge, SimulatedBridgeHandle,
    TrackingState, VideoFrame, WatchOptions, WorldMap, WorldMappingStatus,
};
pub use orientation::{Attitude, OrientationSensor, SharedOrientation, SimulatedOrientationSensor};
pub use platform::{Platform, PlatformCapabilities};
pub use room_scale::{
    RoomScaleCapabilities, RoomScaleFrame, RoomScaleTracker, SharedRoomScale, SimulatedRoomScale,
};
