//! Math utilities and types
//!
//! Provides fundamental math types for 3D graphics.

pub use nalgebra::{Matrix4, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Math utility functions
pub mod utils {
    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees.to_radians()
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians.to_degrees()
    }

    /// Clamp a value between min and max
    pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
        value.max(min).min(max)
    }
}

/// Build a translation matrix
pub fn translation(offset: Vec3) -> Mat4 {
    Mat4::new_translation(&offset)
}

/// Build a right-handed orthographic projection (OpenGL clip space)
pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    Mat4::new_orthographic(left, right, bottom, top, near, far)
}

/// Build a right-handed perspective projection (OpenGL clip space)
///
/// `fov_y` is in radians.
pub fn perspective(aspect: f32, fov_y: f32, near: f32, far: f32) -> Mat4 {
    Mat4::new_perspective(aspect, fov_y, near, far)
}

/// Right-handed view matrix looking from `eye` towards `target`
pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
    Mat4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_translation_moves_origin() {
        let m = translation(Vec3::new(0.0, 0.0, -1.0));
        let p = m.transform_point(&Point3::origin());
        assert_relative_eq!(p.z, -1.0);
    }

    #[test]
    fn test_orthographic_maps_corners_to_ndc() {
        // Same projection the quad demo starts with: x right, y down
        let m = orthographic(0.0, 1.0, 1.0, 0.0, 0.1, 100.0);
        let p = m.transform_point(&Point3::new(1.0, 0.0, -0.1));
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-6);
        assert_relative_eq!(p.z, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_utils_clamp() {
        assert_relative_eq!(utils::clamp(5.0, -1.0, 1.0), 1.0);
        assert_relative_eq!(utils::clamp(-5.0, -1.0, 1.0), -1.0);
        assert_relative_eq!(utils::rad_to_deg(utils::deg_to_rad(45.0)), 45.0, epsilon = 1e-4);
    }
}
