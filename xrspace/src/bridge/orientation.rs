//! Orientation-sensor pose fallback
//!
//! Devices without positional tracking still report an attitude (alpha, beta,
//! gamma, in degrees) and the current screen orientation. That is enough for
//! a 3-DoF head pose at a fixed eye height.

use std::sync::Arc;

use parking_lot::Mutex;
use xrspace_core::math::{Quat, Vec3};

/// Shared handle to an orientation sensor
pub type SharedOrientation = Arc<Mutex<dyn OrientationSensor>>;

/// Device attitude in degrees
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Attitude {
    /// Rotation about the vertical axis
    pub alpha: f64,
    /// Front-to-back tilt
    pub beta: f64,
    /// Left-to-right tilt
    pub gamma: f64,
}

impl Attitude {
    pub fn new(alpha: f64, beta: f64, gamma: f64) -> Self {
        Self { alpha, beta, gamma }
    }

    /// Orientation of the camera for this attitude and screen rotation (degrees)
    pub fn to_quaternion(&self, screen_orientation: f64) -> Quat {
        let device = Quat::from_axis_angle(&Vec3::y_axis(), self.alpha.to_radians())
            * Quat::from_axis_angle(&Vec3::x_axis(), self.beta.to_radians())
            * Quat::from_axis_angle(&Vec3::z_axis(), (-self.gamma).to_radians());
        // Sensors describe the screen lying flat; cameras look down -Z
        let screen_to_device = Quat::from_axis_angle(&Vec3::x_axis(), -std::f64::consts::FRAC_PI_2);
        let screen = Quat::from_axis_angle(&Vec3::z_axis(), (-screen_orientation).to_radians());
        device * screen_to_device * screen
    }
}

pub trait OrientationSensor: Send {
    /// Latest attitude, `None` until the sensor has reported
    fn attitude(&mut self) -> Option<Attitude>;

    /// Screen rotation in degrees (0, 90, 180, 270)
    fn screen_orientation(&self) -> f64;
}

/// Scriptable sensor for tests and desktop development
#[derive(Debug, Clone, Default)]
pub struct SimulatedOrientationSensor {
    attitude: Option<Attitude>,
    screen_orientation: f64,
}

impl SimulatedOrientationSensor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> Arc<Mutex<SimulatedOrientationSensor>> {
        Arc::new(Mutex::new(self))
    }

    pub fn set_attitude(&mut self, attitude: Attitude) {
        self.attitude = Some(attitude);
    }

    pub fn set_screen_orientation(&mut self, degrees: f64) {
        self.screen_orientation = degrees;
    }
}

impl OrientationSensor for SimulatedOrientationSensor {
    fn attitude(&mut self) -> Option<Attitude> {
        self.attitude
    }

    fn screen_orientation(&self) -> f64 {
        self.screen_orientation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forward(q: &Quat) -> Vec3 {
        q * Vec3::new(0.0, 0.0, -1.0)
    }

    #[test]
    fn test_flat_device_looks_down() {
        let q = Attitude::new(0.0, 0.0, 0.0).to_quaternion(0.0);
        assert!((forward(&q) - Vec3::new(0.0, -1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_upright_device_looks_ahead() {
        let q = Attitude::new(0.0, 90.0, 0.0).to_quaternion(0.0);
        assert!((forward(&q) - Vec3::new(0.0, 0.0, -1.0)).norm() < 1e-12);
    }

    #[test]
    fn test_alpha_turns_about_vertical() {
        let q = Attitude::new(90.0, 90.0, 0.0).to_quaternion(0.0);
        assert!((forward(&q) - Vec3::new(-1.0, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_screen_rotation_rolls_camera() {
        let upright = Attitude::new(0.0, 90.0, 0.0);
        let q = upright.to_quaternion(90.0);
        assert!((forward(&q) - Vec3::new(0.0, 0.0, -1.0)).norm() < 1e-12);
        let up = q * Vec3::y();
        assert!((up - Vec3::new(1.0, 0.0, 0.0)).norm() < 1e-12);
    }
}
