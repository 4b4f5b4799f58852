//! Render views

use xrspace_core::math::{self, Mat4};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Eye {
    Mono,
    Left,
    Right,
}

/// Pixel size of a display's drawing surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn aspect(&self) -> f64 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f64 / self.height as f64
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Fraction of the viewport a view draws into
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewRect {
    pub const FULL: ViewRect = ViewRect {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };
    pub const LEFT_HALF: ViewRect = ViewRect {
        x: 0.0,
        y: 0.0,
        width: 0.5,
        height: 1.0,
    };
    pub const RIGHT_HALF: ViewRect = ViewRect {
        x: 0.5,
        y: 0.0,
        width: 0.5,
        height: 1.0,
    };
}

/// One rendering viewpoint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    pub eye: Eye,
    pub projection: Mat4,
    /// Inverse of the eye's world pose
    pub view: Mat4,
    pub rect: ViewRect,
}

impl View {
    pub fn new(eye: Eye, rect: ViewRect) -> Self {
        Self {
            eye,
            projection: math::identity(),
            view: math::identity(),
            rect,
        }
    }

    pub fn mono() -> Self {
        Self::new(Eye::Mono, ViewRect::FULL)
    }

    pub fn stereo() -> [View; 2] {
        [
            Self::new(Eye::Left, ViewRect::LEFT_HALF),
            Self::new(Eye::Right, ViewRect::RIGHT_HALF),
        ]
    }
}
