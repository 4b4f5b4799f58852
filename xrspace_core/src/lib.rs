//! # xrspace core
//!
//! Runtime building blocks shared by the spatial-tracking layer:
//!
//! - **Errors**: the [`XrError`] taxonomy and [`XrResult`] alias
//! - **Configuration**: [`XrConfig`], loaded from YAML or TOML
//! - **Math**: 4x4 pose helpers over `nalgebra`
//! - **Pending results**: single-resolution outcomes for long-running backend queries
//! - **Events**: fan-out subscriptions for anchor and tracking notifications
//! - **Timing**: the frame clock and pacer that drive the per-tick loop

pub mod config;
pub mod error;
pub mod events;
pub mod math;
pub mod pending;
pub mod timing;

pub use config::{DisplayConfig, HitTestConfig, SessionConfig, XrConfig};
pub use error::{XrError, XrResult};
pub use events::{EventBus, Subscription};
pub use math::{Mat4, Quat, Vec3};
pub use pending::{pending, Pending, PendingState, Resolver};
pub use timing::{FrameClock, FramePacer, ManualClock, SystemClock};
