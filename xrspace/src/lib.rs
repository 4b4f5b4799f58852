//! # xrspace
//!
//! Spatial tracking for applications that render a 3D or augmented scene
//! anchored to a moving device, a head-mounted display or a camera view,
//! whatever backend supplies the tracking data.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use xrspace::prelude::*;
//!
//! let runtime = XrRuntime::new(Platform::new(), XrConfig::handheld()).unwrap();
//! let mut session = runtime
//!     .request_session(FLAT_DISPLAY_ID, SessionParams::reality())
//!     .unwrap();
//!
//! session
//!     .request_frame(|frame| {
//!         for view in frame.views() {
//!             let _ = (view.projection, view.view);
//!         }
//!     })
//!     .unwrap();
//!
//! let clock = SystemClock::new();
//! let mut pacer = FramePacer::new(60.0);
//! session.run(&clock, &mut pacer, Some(1)).unwrap();
//! ```
//!
//! ## Layers
//!
//! - **Coordinate systems**: head-model, eye-level and tracker frames
//! - **Anchors**: points, planes, faces and images plus offsets against them
//! - **Realities**: virtual or camera-backed providers owning the anchor table
//! - **Displays**: flat or head-mounted render targets sourcing the head pose
//! - **Sessions**: one display bound to one reality, running the frame loop

pub mod anchor;
pub mod bridge;
pub mod coordinate;
pub mod display;
pub mod reality;
pub mod runtime;
pub mod session;

pub use xrspace_core::{self, *};

pub use runtime::{XrRuntime, FLAT_DISPLAY_ID, HEAD_MOUNTED_DISPLAY_ID};

/// Everything an application needs to open a session and render frames
pub mod prelude {
    pub use xrspace_core::math::{self, Mat4, Quat, Vec3};
    pub use xrspace_core::{
        FrameClock, FramePacer, ManualClock, Pending, SystemClock, XrConfig, XrError, XrResult,
    };

    pub use crate::anchor::{Anchor, AnchorId, AnchorKind, AnchorOffset, PlaneAlignment, PlaneGeometry};
    pub use crate::bridge::{Platform, PlatformCapabilities, TrackingState, WorldMappingStatus};
    pub use crate::coordinate::{CoordinateSystem, CoordinateSystemType};
    pub use crate::display::{DisplayKind, Eye, View};
    pub use crate::hit_test::{Hit, HitType, HitTypeMask};
    pub use crate::reality::{Capability, FloorSource, RealityKind};
    pub use crate::runtime::{XrRuntime, FLAT_DISPLAY_ID, HEAD_MOUNTED_DISPLAY_ID};
    pub use crate::session::{PresentationFrame, Session, SessionEvent, SessionParams, SessionType};
}
