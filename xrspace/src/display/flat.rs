//! Flat display pose sources

use std::fmt;

use xrspace_core::math::{self, Vec3};

use super::Display;
use crate::bridge::{PlatformCapabilities, SharedOrientation};
use crate::reality::TrackingSample;

/// Where a flat display gets its head pose
#[derive(Clone)]
pub enum FlatPoseSource {
    /// 6-DoF pose from the camera reality's native bridge
    Reality,
    /// 3-DoF attitude at eye height
    Orientation(SharedOrientation),
    /// Fixed pose at eye height
    Static,
}

impl FlatPoseSource {
    /// Same priority as camera realities: native bridge, orientation sensor, static
    pub fn probe(capabilities: &PlatformCapabilities, orientation: Option<SharedOrientation>) -> Self {
        if capabilities.native_bridge {
            return FlatPoseSource::Reality;
        }
        match orientation {
            Some(sensor) => FlatPoseSource::Orientation(sensor),
            None => FlatPoseSource::Static,
        }
    }
}

impl fmt::Debug for FlatPoseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlatPoseSource::Reality => f.write_str("Reality"),
            FlatPoseSource::Orientation(_) => f.write_str("Orientation"),
            FlatPoseSource::Static => f.write_str("Static"),
        }
    }
}

impl Display {
    pub(super) fn update_flat(&mut self, source: &FlatPoseSource, sample: &TrackingSample) {
        match source {
            FlatPoseSource::Reality => {
                if let Some(origin) = sample.tracker_origin {
                    self.tracker_pose = origin;
                }
                if let Some(camera) = sample.camera_pose {
                    self.head_pose = self.tracker_pose * camera;
                }
                if let Some(projection) = sample.projection {
                    self.backend_projection = Some(projection);
                }
                if let Some(focal_length) = sample.focal_length {
                    self.focal_length = Some(focal_length);
                }
            }
            FlatPoseSource::Orientation(sensor) => {
                let mut sensor = sensor.lock();
                if let Some(attitude) = sensor.attitude() {
                    let rotation = attitude.to_quaternion(sensor.screen_orientation());
                    self.head_pose = math::from_rotation_translation(
                        &rotation,
                        &Vec3::new(0.0, self.eye_height, 0.0),
                    );
                }
            }
            FlatPoseSource::Static => self.head_pose = self.eye_level_pose,
        }
        self.refresh_mono_view();
    }
}
