//! Runtime root
//!
//! [`XrRuntime`] probes the [`Platform`] once, builds the displays and the
//! two shared realities, and hands out sessions bound to them.

use std::path::Path;

use xrspace_core::{XrConfig, XrError, XrResult};

use crate::bridge::{Platform, PlatformCapabilities};
use crate::coordinate::DisplayId;
use crate::display::{Display, FlatPoseSource, HeadMountedSource, SharedDisplay};
use crate::reality::{CameraBackend, Reality, SharedReality};
use crate::session::{Session, SessionParams, SessionType};

/// Id of the flat display every host has
pub const FLAT_DISPLAY_ID: DisplayId = 0;
/// Id of the headset display, present when the tracker can present
pub const HEAD_MOUNTED_DISPLAY_ID: DisplayId = 1;

pub struct XrRuntime {
    config: XrConfig,
    capabilities: PlatformCapabilities,
    displays: Vec<SharedDisplay>,
    virtual_reality: SharedReality,
    camera_reality: Option<SharedReality>,
}

impl XrRuntime {
    pub fn new(mut platform: Platform, config: XrConfig) -> XrResult<Self> {
        config.validate()?;
        let capabilities = platform.capabilities();
        log::info!("probing platform: {:?}", capabilities);

        let camera_reality = CameraBackend::probe(&mut platform).map(|backend| {
            log::info!("camera reality backed by '{}'", backend.name());
            Reality::new_camera(backend, &config.hit_test).into_shared()
        });

        let flat_source = FlatPoseSource::probe(&capabilities, platform.orientation_sensor());
        log::debug!("flat display pose source: {:?}", flat_source);
        let mut displays = vec![Display::flat(
            FLAT_DISPLAY_ID,
            flat_source,
            camera_reality.is_some(),
            &config.display,
        )
        .into_shared()];

        if let Some(tracker) = platform.room_scale().filter(|_| capabilities.can_present) {
            displays.push(
                Display::head_mounted(
                    HEAD_MOUNTED_DISPLAY_ID,
                    HeadMountedSource::new(tracker),
                    &config.display,
                )
                .into_shared(),
            );
        }

        let virtual_reality = Reality::new_virtual("virtual", true, &config.hit_test).into_shared();

        Ok(Self {
            config,
            capabilities,
            displays,
            virtual_reality,
            camera_reality,
        })
    }

    /// Runtime configured from a YAML or TOML file
    pub fn from_config_file(platform: Platform, path: &Path) -> XrResult<Self> {
        Self::new(platform, XrConfig::from_file(path)?)
    }

    pub fn config(&self) -> &XrConfig {
        &self.config
    }

    pub fn capabilities(&self) -> PlatformCapabilities {
        self.capabilities
    }

    pub fn displays(&self) -> &[SharedDisplay] {
        &self.displays
    }

    pub fn display(&self, id: DisplayId) -> Option<&SharedDisplay> {
        self.displays.iter().find(|display| display.lock().id() == id)
    }

    pub fn virtual_reality(&self) -> &SharedReality {
        &self.virtual_reality
    }

    pub fn camera_reality(&self) -> Option<&SharedReality> {
        self.camera_reality.as_ref()
    }

    /// Start a session on `display_id`.
    ///
    /// Augmentation sessions use the shared camera reality; reality sessions
    /// use the shared virtual reality unless they ask for a private one.
    pub fn request_session(&self, display_id: DisplayId, params: SessionParams) -> XrResult<Session> {
        params.validate()?;
        let display = self
            .display(display_id)
            .cloned()
            .ok_or_else(|| XrError::NotFound(format!("display {}", display_id)))?;
        // Display support is checked before any reality is picked
        display.lock().request_session(&params)?;

        let reality = match params.session_type {
            SessionType::Augmentation => self
                .camera_reality
                .clone()
                .ok_or_else(|| XrError::unsupported("no camera reality on this platform"))?,
            SessionType::Reality if params.private_reality => {
                Reality::new_virtual("private", false, &self.config.hit_test).into_shared()
            }
            SessionType::Reality => self.virtual_reality.clone(),
        };

        Session::new(display, reality, params, &self.config.session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{SimulatedArBridge, SimulatedRoomScale};
    use crate::display::DisplayKind;
    use crate::reality::RealityKind;

    #[test]
    fn test_desktop_runtime() {
        let runtime = XrRuntime::new(Platform::new(), XrConfig::default()).unwrap();
        assert_eq!(runtime.displays().len(), 1);
        assert!(runtime.camera_reality().is_none());
        assert!(runtime.display(HEAD_MOUNTED_DISPLAY_ID).is_none());

        let err = runtime
            .request_session(FLAT_DISPLAY_ID, SessionParams::augmentation())
            .unwrap_err();
        assert!(err.is_unsupported());
        assert!(matches!(
            runtime.request_session(7, SessionParams::reality()),
            Err(XrError::NotFound(_))
        ));
    }

    #[test]
    fn test_headset_display_added() {
        let platform = Platform::new().with_room_scale(SimulatedRoomScale::new().shared());
        let runtime = XrRuntime::new(platform, XrConfig::headset()).unwrap();
        let hmd = runtime.display(HEAD_MOUNTED_DISPLAY_ID).unwrap();
        assert_eq!(hmd.lock().kind(), DisplayKind::HeadMounted);
        // An opaque headset offers no camera to augment
        assert!(runtime.camera_reality().is_none());
        let err = runtime
            .request_session(FLAT_DISPLAY_ID, SessionParams::augmentation())
            .unwrap_err();
        assert!(matches!(err, XrError::InvalidInput(_)));
    }

    #[test]
    fn test_passthrough_headset_backs_camera_reality() {
        let platform =
            Platform::new().with_room_scale(SimulatedRoomScale::new().with_passthrough().shared());
        let runtime = XrRuntime::new(platform, XrConfig::headset()).unwrap();
        assert_eq!(
            runtime.camera_reality().unwrap().lock().kind(),
            RealityKind::Camera
        );
        assert!(runtime
            .request_session(FLAT_DISPLAY_ID, SessionParams::augmentation())
            .is_ok());
    }

    #[test]
    fn test_private_reality_is_separate() {
        let runtime = XrRuntime::new(Platform::new(), XrConfig::default()).unwrap();
        let shared = runtime.request_session(FLAT_DISPLAY_ID, SessionParams::reality()).unwrap();
        let private = runtime
            .request_session(
                FLAT_DISPLAY_ID,
                SessionParams {
                    private_reality: true,
                    ..SessionParams::reality()
                },
            )
            .unwrap();
        assert!(std::sync::Arc::ptr_eq(shared.reality(), runtime.virtual_reality()));
        assert!(!std::sync::Arc::ptr_eq(private.reality(), runtime.virtual_reality()));
        assert!(!private.reality().lock().is_shared());
    }

    #[test]
    fn test_native_bridge_session_starts_bridge() {
        let (bridge, handle) = SimulatedArBridge::new();
        let platform = Platform::new().with_native_bridge(Box::new(bridge));
        let runtime = XrRuntime::new(platform, XrConfig::handheld()).unwrap();
        let _session = runtime
            .request_session(FLAT_DISPLAY_ID, SessionParams::augmentation())
            .unwrap();
        assert_eq!(handle.init_calls(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = XrConfig::default();
        config.session.rolling_anchor_capacity = 0;
        assert!(matches!(
            XrRuntime::new(Platform::new(), config),
            Err(XrError::Config(_))
        ));
    }
}
