//! xrspace runtime configuration
//!
//! Typed configuration for `xrspace.yaml` (or `xrspace.toml`) files. Every
//! section has defaults, so an empty document is a valid configuration.
//!
//! # Example xrspace.yaml
//!
//! ```yaml
//! hit_test:
//!   extent_tolerance: 0.0075
//!
//! session:
//!   rolling_anchor_capacity: 5
//!   rolling_anchor_interval_ms: 1000
//!   adaptive_frame_skip: true
//!   frame_budget_ms: 16.67
//!
//! display:
//!   depth_near: 0.1
//!   depth_far: 1000.0
//!   fov_y_degrees: 50.0
//!   eye_height: 1.6
//!   frame_rate_hz: 60.0
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{XrError, XrResult};

/// Tolerance (world units) added to a plane's half-extent during hit tests
pub const DEFAULT_EXTENT_TOLERANCE: f64 = 0.0075;

/// Maximum number of entries in a session's rolling camera-anchor window
pub const DEFAULT_ROLLING_ANCHOR_CAPACITY: usize = 5;

/// Minimum spacing between two rolling camera anchors
pub const DEFAULT_ROLLING_ANCHOR_INTERVAL_MS: f64 = 1000.0;

/// Complete configuration for the tracking layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XrConfig {
    /// Plane hit-test parameters
    pub hit_test: HitTestConfig,

    /// Session loop parameters
    pub session: SessionConfig,

    /// Display defaults
    pub display: DisplayConfig,
}

/// Plane hit-test parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitTestConfig {
    /// Slack added to each plane half-extent, in world units
    pub extent_tolerance: f64,
}

impl Default for HitTestConfig {
    fn default() -> Self {
        Self {
            extent_tolerance: DEFAULT_EXTENT_TOLERANCE,
        }
    }
}

/// Session loop parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Upper bound of the rolling camera-anchor window
    pub rolling_anchor_capacity: usize,

    /// Minimum time between two rolling anchors (milliseconds)
    pub rolling_anchor_interval_ms: f64,

    /// Skip every other frame while the frame callback overruns its budget
    pub adaptive_frame_skip: bool,

    /// Callback budget used by `adaptive_frame_skip` (milliseconds)
    pub frame_budget_ms: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rolling_anchor_capacity: DEFAULT_ROLLING_ANCHOR_CAPACITY,
            rolling_anchor_interval_ms: DEFAULT_ROLLING_ANCHOR_INTERVAL_MS,
            adaptive_frame_skip: false,
            frame_budget_ms: 1000.0 / 60.0,
        }
    }
}

/// Display defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Near clip plane distance
    pub depth_near: f64,

    /// Far clip plane distance
    pub depth_far: f64,

    /// Vertical field of view used until a backend reports a focal length
    pub fov_y_degrees: f64,

    /// Height of the eye-level origin above the floor, in meters
    pub eye_height: f64,

    /// Frame rate of flat displays
    pub frame_rate_hz: f64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            depth_near: 0.1,
            depth_far: 1000.0,
            fov_y_degrees: 50.0,
            eye_height: 1.6,
            frame_rate_hz: 60.0,
        }
    }
}

impl XrConfig {
    /// Preset for handheld AR (phones, tablets)
    pub fn handheld() -> Self {
        Self::default()
    }

    /// Preset for tethered headsets: 90 Hz, frame halving under load
    pub fn headset() -> Self {
        Self {
            session: SessionConfig {
                adaptive_frame_skip: true,
                frame_budget_ms: 1000.0 / 90.0,
                ..Default::default()
            },
            display: DisplayConfig {
                frame_rate_hz: 90.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Load configuration from a YAML string
    pub fn from_yaml(content: &str) -> XrResult<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML string
    pub fn from_toml(content: &str) -> XrResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file; `.toml` files are parsed as TOML, anything else as YAML
    pub fn from_file(path: &Path) -> XrResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&content)?,
            _ => Self::from_yaml(&content)?,
        };
        log::debug!("loaded xrspace config from {}", path.display());
        Ok(config)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> XrResult<String> {
        serde_yaml::to_string(self).map_err(|e| XrError::Serialization(e.to_string()))
    }

    /// Check value ranges
    pub fn validate(&self) -> XrResult<()> {
        if !(self.hit_test.extent_tolerance >= 0.0) {
            return Err(XrError::config(format!(
                "hit_test.extent_tolerance must be >= 0, got {}",
                self.hit_test.extent_tolerance
            )));
        }
        if self.session.rolling_anchor_capacity == 0 {
            return Err(XrError::config(
                "session.rolling_anchor_capacity must be at least 1",
            ));
        }
        if !(self.session.rolling_anchor_interval_ms > 0.0) {
            return Err(XrError::config(
                "session.rolling_anchor_interval_ms must be positive",
            ));
        }
        if !(self.session.frame_budget_ms > 0.0) {
            return Err(XrError::config("session.frame_budget_ms must be positive"));
        }
        let display = &self.display;
        if !(display.depth_near > 0.0 && display.depth_far > display.depth_near) {
            return Err(XrError::config(format!(
                "display depth range invalid: near={} far={}",
                display.depth_near, display.depth_far
            )));
        }
        if !(display.fov_y_degrees > 0.0 && display.fov_y_degrees < 180.0) {
            return Err(XrError::config(format!(
                "display.fov_y_degrees must be in (0, 180), got {}",
                display.fov_y_degrees
            )));
        }
        if !(display.frame_rate_hz > 0.0) {
            return Err(XrError::config("display.frame_rate_hz must be positive"));
        }
        Ok(())
    }
}
