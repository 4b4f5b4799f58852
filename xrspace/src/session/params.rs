//! Session creation parameters

use serde::{Deserialize, Serialize};
use xrspace_core::{XrError, XrResult};

use crate::bridge::{BridgeInitOptions, WatchOptions};

/// What the session renders over
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionType {
    /// Fully virtual scene
    #[default]
    Reality,
    /// Virtual content over the camera view
    Augmentation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionParams {
    /// Take over the display (headsets only)
    pub exclusive: bool,
    pub session_type: SessionType,
    /// Give the session its own virtual reality instead of the shared one
    pub private_reality: bool,
    /// Ask the backend for plane and world-map tracking
    pub world_sensing: bool,
    pub light_estimation: bool,
    /// Deliver raw camera frames
    pub video_frames: bool,
}

impl SessionParams {
    pub fn reality() -> Self {
        Self::default()
    }

    pub fn augmentation() -> Self {
        Self {
            session_type: SessionType::Augmentation,
            world_sensing: true,
            light_estimation: true,
            ..Self::default()
        }
    }

    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    pub fn with_video_frames(mut self) -> Self {
        self.video_frames = true;
        self
    }

    /// Reject combinations no display can honor
    pub fn validate(&self) -> XrResult<()> {
        if self.session_type == SessionType::Augmentation && self.private_reality {
            return Err(XrError::invalid_input(
                "augmentation sessions use the shared camera reality",
            ));
        }
        if self.video_frames && self.session_type != SessionType::Augmentation {
            return Err(XrError::invalid_input(
                "video frames require an augmentation session",
            ));
        }
        Ok(())
    }

    pub(crate) fn bridge_init_options(&self) -> BridgeInitOptions {
        BridgeInitOptions {
            world_sensing: self.world_sensing,
            light_estimation: self.light_estimation,
        }
    }

    pub(crate) fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            light_intensity: self.light_estimation,
            video_frames: self.video_frames,
            ..WatchOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_combinations_rejected() {
        let mut params = SessionParams::augmentation();
        params.private_reality = true;
        assert!(matches!(params.validate(), Err(XrError::InvalidInput(_))));

        let params = SessionParams::reality().with_video_frames();
        assert!(params.validate().is_err());

        assert!(SessionParams::augmentation().with_video_frames().validate().is_ok());
    }

    #[test]
    fn test_yaml_defaults() {
        let params: SessionParams = serde_yaml::from_str("session_type: augmentation\n").unwrap();
        assert_eq!(params.session_type, SessionType::Augmentation);
        assert!(!params.exclusive);
    }
}
