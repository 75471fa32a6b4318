/// Orbit camera and object transform.
/// Produces the combined view-model matrix consumed by the vertex stage.
use glam::{Mat4, Vec3};

/// Orbit-style camera: the view rotates around a focal target and backs
/// away along Z by zoom plus a fixed offset, pushing the world into
/// negative view-space Z where the projector expects it.
pub struct OrbitCamera {
    /// Pitch around the X axis (radians).
    pub orbit_x: f32,
    /// Turntable angle around the Z axis (radians).
    pub orbit_y: f32,
    pub zoom: f32,
    pub target: Vec3,
    /// Base camera distance added to zoom.
    pub z_offset: f32,
    pub auto_rotate: bool,
    pub auto_rotate_speed: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            orbit_x: -0.9,
            orbit_y: 0.6,
            zoom: 10.0,
            target: Vec3::ZERO,
            z_offset: 5.0,
            auto_rotate: false,
            auto_rotate_speed: 0.005,
        }
    }
}

impl OrbitCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance per-tick animation state.
    pub fn tick(&mut self) {
        if self.auto_rotate {
            self.orbit_y += self.auto_rotate_speed;
        }
    }

    /// Apply a mouse-drag delta to the orbit angles.
    pub fn orbit(&mut self, delta_x: f32, delta_y: f32) {
        self.orbit_y += delta_x;
        self.orbit_x += delta_y;
    }

    /// Dolly in/out, clamped so the target never crosses the camera plane.
    pub fn zoom_by(&mut self, delta: f32) {
        self.zoom = (self.zoom + delta).max(0.5);
    }

    /// View matrix: distance push, orbit rotations, then recenter on the
    /// focal target.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_translation(Vec3::new(0.0, 0.0, -(self.zoom + self.z_offset)))
            * Mat4::from_rotation_x(self.orbit_x)
            * Mat4::from_rotation_z(self.orbit_y)
            * Mat4::from_translation(-self.target)
    }
}

/// Position/rotation/scale of the rendered object.
#[derive(Copy, Clone, Debug)]
pub struct ModelTransform {
    pub position: Vec3,
    /// Euler rotation, applied X then Y then Z.
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl ModelTransform {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position)
            * Mat4::from_rotation_x(self.rotation.x)
            * Mat4::from_rotation_y(self.rotation.y)
            * Mat4::from_rotation_z(self.rotation.z)
            * Mat4::from_scale(self.scale)
    }

    /// Combined view-model matrix for the vertex stage.
    pub fn view_model(&self, camera: &OrbitCamera) -> Mat4 {
        camera.view_matrix() * self.matrix()
    }
}
