//! # First-person camera
//!
//! A free-flying camera driven by keyboard and cursor input, producing the
//! view and projection matrices for the frame loop.
//!
//! ## Conventions
//! - Right-handed, Y-up world space (OpenGL convention)
//! - Yaw and pitch are stored in degrees; a yaw of -90° looks down -Z
//! - Pitch is clamped to ±89° so the view never flips over the pole
//! - Projections target OpenGL clip space (depth in -1..1)

use crate::config::CameraConfig;
use crate::foundation::math::{self, utils, Mat4, Vec3};
use crate::input::{InputState, KeyCode};

/// Largest pitch magnitude in degrees
pub const PITCH_LIMIT: f32 = 89.0;

/// FPS-style camera state
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Position in world space
    pub position: Vec3,

    /// Heading around the world up axis, in degrees
    pub yaw: f32,

    /// Elevation above the horizon, in degrees
    pub pitch: f32,

    /// World up direction used for vertical movement and the view basis
    pub world_up: Vec3,

    /// Movement speed in world units per second
    pub movement_speed: f32,

    /// Degrees turned per pixel of cursor movement
    pub turn_speed: f32,

    /// Vertical field of view in degrees
    pub fov: f32,

    /// Near clipping plane distance
    pub near: f32,

    /// Far clipping plane distance
    pub far: f32,
}

impl Camera {
    /// Camera at `position` looking down -Z with default speeds
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            ..Self::from_config(&CameraConfig::default())
        }
    }

    /// Build a camera from its configuration section
    pub fn from_config(config: &CameraConfig) -> Self {
        let [x, y, z] = config.position;
        Self {
            position: Vec3::new(x, y, z),
            yaw: config.yaw,
            pitch: utils::clamp(config.pitch, -PITCH_LIMIT, PITCH_LIMIT),
            world_up: Vec3::y(),
            movement_speed: config.movement_speed,
            turn_speed: config.turn_speed,
            fov: config.fov,
            near: config.near,
            far: config.far,
        }
    }

    /// Unit vector the camera looks along
    pub fn front(&self) -> Vec3 {
        let yaw = utils::deg_to_rad(self.yaw);
        let pitch = utils::deg_to_rad(self.pitch);
        Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize()
    }

    /// Unit vector to the camera's right, parallel to the ground
    pub fn right(&self) -> Vec3 {
        self.front().cross(&self.world_up).normalize()
    }

    /// Move according to held keys over `dt` seconds
    pub fn handle_keys(&mut self, input: &InputState, dt: f32) {
        let step = self.movement_speed * dt;
        let front = self.front();
        let right = self.right();
        let mut offset = Vec3::zeros();

        if input.is_pressed(KeyCode::W) {
            offset += front;
        }
        if input.is_pressed(KeyCode::S) {
            offset -= front;
        }
        if input.is_pressed(KeyCode::D) {
            offset += right;
        }
        if input.is_pressed(KeyCode::A) {
            offset -= right;
        }
        if input.is_pressed(KeyCode::Space) {
            offset += self.world_up;
        }
        if input.is_pressed(KeyCode::LeftShift) {
            offset -= self.world_up;
        }

        if offset != Vec3::zeros() {
            self.position += offset * step;
            log::trace!("Camera moved to {:?}", self.position);
        }
    }

    /// Turn by a cursor movement in pixels; screen Y grows downwards
    #[allow(clippy::cast_possible_truncation)]
    pub fn handle_mouse(&mut self, dx: f64, dy: f64) {
        self.yaw += dx as f32 * self.turn_speed;
        self.pitch = utils::clamp(self.pitch - dy as f32 * self.turn_speed, -PITCH_LIMIT, PITCH_LIMIT);
    }

    /// World-to-view transform
    pub fn view_matrix(&self) -> Mat4 {
        math::look_at(self.position, self.position + self.front(), self.world_up)
    }

    /// Perspective projection for a viewport aspect ratio (width / height)
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        math::perspective(aspect, utils::deg_to_rad(self.fov), self.near, self.far)
    }

    /// Orthographic projection with explicit bounds
    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
        math::orthographic(left, right, bottom, top, near, far)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}
