//! Matrix helpers over `nalgebra`
//!
//! Poses are 4x4 homogeneous matrices in f64, column vectors, right-handed,
//! the same layout native bridges deliver as 16-element column-major arrays.

use nalgebra::{Matrix3, Matrix4, Perspective3, Rotation3, UnitQuaternion, Vector3, Vector4};

/// 4x4 homogeneous pose/projection matrix
pub type Mat4 = Matrix4<f64>;

/// 3D vector / point
pub type Vec3 = Vector3<f64>;

/// Unit rotation quaternion
pub type Quat = UnitQuaternion<f64>;

/// Identity pose
#[inline]
pub fn identity() -> Mat4 {
    Mat4::identity()
}

/// Build a pose from rotation and translation (rotation applied first)
pub fn from_rotation_translation(rotation: &Quat, translation: &Vec3) -> Mat4 {
    let mut m = rotation.to_homogeneous();
    m[(0, 3)] = translation.x;
    m[(1, 3)] = translation.y;
    m[(2, 3)] = translation.z;
    m
}

/// Pure translation pose
pub fn from_translation(translation: &Vec3) -> Mat4 {
    Mat4::new_translation(translation)
}

/// Build a matrix from a column-major 16-element array
pub fn from_column_major(values: &[f64; 16]) -> Mat4 {
    Mat4::from_column_slice(values)
}

/// Column-major 16-element array of a matrix
pub fn to_column_major(m: &Mat4) -> [f64; 16] {
    let mut out = [0.0; 16];
    out.copy_from_slice(m.as_slice());
    out
}

/// Translation part of a pose
#[inline]
pub fn translation(m: &Mat4) -> Vec3 {
    Vec3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)])
}

/// Rotation part of a pose (scale must be unit)
pub fn rotation(m: &Mat4) -> Quat {
    let basis: Matrix3<f64> = m.fixed_view::<3, 3>(0, 0).into_owned();
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(basis))
}

/// Inverse, `None` for singular matrices
#[inline]
pub fn invert(m: &Mat4) -> Option<Mat4> {
    m.try_inverse()
}

/// Transform a point, dividing by the homogeneous coordinate
pub fn transform_point(m: &Mat4, p: &Vec3) -> Vec3 {
    let v = m * Vector4::new(p.x, p.y, p.z, 1.0);
    if v.w.abs() > f64::EPSILON {
        Vec3::new(v.x / v.w, v.y / v.w, v.z / v.w)
    } else {
        Vec3::new(v.x, v.y, v.z)
    }
}

/// Transform a direction (ignores translation)
pub fn transform_vector(m: &Mat4, v: &Vec3) -> Vec3 {
    let r = m * Vector4::new(v.x, v.y, v.z, 0.0);
    Vec3::new(r.x, r.y, r.z)
}

/// OpenGL-style perspective projection (clip z in [-1, 1])
pub fn perspective(fov_y_radians: f64, aspect: f64, near: f64, far: f64) -> Mat4 {
    Perspective3::new(aspect, fov_y_radians, near, far).to_homogeneous()
}

/// Vertical field of view for a pinhole camera, from a focal length and image height in pixels
pub fn fov_from_focal_length(focal_length_px: f64, image_height_px: f64) -> f64 {
    2.0 * ((image_height_px * 0.5) / focal_length_px).atan()
}

/// Interpolate two poses: linear translation, SLERP rotation
pub fn interpolate(a: &Mat4, b: &Mat4, t: f64) -> Mat4 {
    let t = t.clamp(0.0, 1.0);
    let ta = translation(a);
    let tb = translation(b);
    let rot = rotation(a).slerp(&rotation(b), t);
    from_rotation_translation(&rot, &(ta + (tb - ta) * t))
}

/// Largest absolute element difference
pub fn max_abs_diff(a: &Mat4, b: &Mat4) -> f64 {
    (a - b).iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
}

/// Element-wise comparison within `epsilon`
pub fn approx_eq(a: &Mat4, b: &Mat4, epsilon: f64) -> bool {
    max_abs_diff(a, b) <= epsilon
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn approx_vec(a: &Vec3, b: &Vec3) -> bool {
        (a - b).norm() < 1e-9
    }

    #[test]
    fn test_rotation_translation_roundtrip() {
        let q = Quat::from_axis_angle(&Vec3::y_axis(), 0.7);
        let t = Vec3::new(1.0, 2.0, 3.0);
        let m = from_rotation_translation(&q, &t);
        assert!(approx_vec(&translation(&m), &t));
        assert!(rotation(&m).angle_to(&q) < 1e-9);
    }

    #[test]
    fn test_transform_point_applies_rotation_then_translation() {
        let q = Quat::from_axis_angle(&Vec3::z_axis(), FRAC_PI_2);
        let m = from_rotation_translation(&q, &Vec3::new(1.0, 0.0, 0.0));
        let p = transform_point(&m, &Vec3::new(1.0, 0.0, 0.0));
        assert!(approx_vec(&p, &Vec3::new(1.0, 1.0, 0.0)));
        let v = transform_vector(&m, &Vec3::new(1.0, 0.0, 0.0));
        assert!(approx_vec(&v, &Vec3::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn test_column_major_layout() {
        let m = from_translation(&Vec3::new(4.0, 5.0, 6.0));
        let cols = to_column_major(&m);
        assert_eq!(&cols[12..15], &[4.0, 5.0, 6.0]);
        assert_eq!(from_column_major(&cols), m);
    }

    #[test]
    fn test_perspective_unprojects_center_on_axis() {
        let proj = perspective(1.0, 1.5, 0.1, 100.0);
        let inv = invert(&proj).unwrap();
        let near = transform_point(&inv, &Vec3::new(0.0, 0.0, -1.0));
        assert!((near.z + 0.1).abs() < 1e-9);
        assert!(near.x.abs() < 1e-12 && near.y.abs() < 1e-12);
    }

    #[test]
    fn test_fov_from_focal_length() {
        // focal length equal to half the image height gives 90 degrees
        let fov = fov_from_focal_length(240.0, 480.0);
        assert!((fov - FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_interpolate_midpoint() {
        let a = identity();
        let b = from_rotation_translation(
            &Quat::from_axis_angle(&Vec3::y_axis(), 1.0),
            &Vec3::new(2.0, 0.0, 0.0),
        );
        let mid = interpolate(&a, &b, 0.5);
        assert!(approx_vec(&translation(&mid), &Vec3::new(1.0, 0.0, 0.0)));
        assert!((rotation(&mid).angle() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_singular_matrix_has_no_inverse() {
        assert!(invert(&Mat4::zeros()).is_none());
    }
}
