use std::f32::consts::PI;

use cgmath::{
    perspective, vec3, Deg, EuclideanSpace, InnerSpace, Matrix4, Point3, SquareMatrix, Vector2,
    Vector3, Vector4,
};

use crate::config::{CameraSettings, OrbitSettings};

/// cgmath projects depth into [-1, 1]; wgpu clips to [0, 1].
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vector3<f32>,
    pub direction: Vector3<f32>,
}

pub struct Camera {
    pub position: Vector3<f32>,
    pub target: Vector3<f32>,
    pub up: Vector3<f32>,
    fov: Deg<f32>,
    aspect: f32,
    near: f32,
    far: f32,
    projection: Matrix4<f32>,
}

impl Camera {
    pub fn new(settings: &CameraSettings, aspect: f32) -> Self {
        let mut camera = Self {
            position: settings.position,
            target: vec3(0.0, 0.0, 0.0),
            up: Vector3::unit_y(),
            fov: Deg(settings.fov_degrees),
            aspect,
            near: settings.near,
            far: settings.far,
            projection: Matrix4::identity(),
        };
        camera.update_projection();
        camera
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.update_projection();
    }

    fn update_projection(&mut self) {
        self.projection = perspective(self.fov, self.aspect, self.near, self.far);
    }

    pub fn projection(&self) -> Matrix4<f32> {
        self.projection
    }

    pub fn view(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(
            Point3::from_vec(self.position),
            Point3::from_vec(self.target),
            self.up,
        )
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * self.projection * self.view()
    }

    /// Ray from the camera through a point in normalized device coordinates.
    pub fn ray_through(&self, ndc: Vector2<f32>) -> Option<Ray> {
        let inverse = (self.projection * self.view()).invert()?;
        let point = inverse * Vector4::new(ndc.x, ndc.y, 0.5, 1.0);
        if point.w.abs() <= f32::EPSILON {
            return None;
        }
        let direction = point.truncate() / point.w - self.position;
        if direction.magnitude2() <= f32::EPSILON {
            return None;
        }
        Some(Ray {
            origin: self.position,
            direction: direction.normalize(),
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct SphericalDelta {
    theta: f32,
    phi: f32,
}

const PHI_EPSILON: f32 = 1e-6;

/// Damped orbit around the camera target with idle auto-rotation and a
/// clamped dolly distance.
pub struct OrbitControls {
    settings: OrbitSettings,
    delta: SphericalDelta,
    scale: f32,
    drag_anchor: Option<Vector2<f32>>,
}

impl OrbitControls {
    pub fn new(settings: OrbitSettings) -> Self {
        Self {
            settings,
            delta: SphericalDelta::default(),
            scale: 1.0,
            drag_anchor: None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_anchor.is_some()
    }

    pub fn begin_drag(&mut self, pointer: Vector2<f32>) {
        self.drag_anchor = Some(pointer);
    }

    pub fn end_drag(&mut self) {
        self.drag_anchor = None;
    }

    /// Pointer moved to `pointer` (physical pixels) while the drag button is held.
    pub fn drag_to(&mut self, pointer: Vector2<f32>, viewport_height: f32) {
        let Some(anchor) = self.drag_anchor else {
            return;
        };
        self.drag_anchor = Some(pointer);
        if viewport_height <= 0.0 {
            return;
        }
        let moved = pointer - anchor;
        let speed = 2.0 * PI * self.settings.rotate_speed / viewport_height;
        self.rotate_left(moved.x * speed);
        self.rotate_up(moved.y * speed);
    }

    /// Wheel input; negative `delta_y` (wheel up) moves the camera closer.
    pub fn dolly(&mut self, delta_y: f32) {
        if delta_y < 0.0 {
            self.scale *= self.settings.zoom_step;
        } else if delta_y > 0.0 {
            self.scale /= self.settings.zoom_step;
        }
    }

    fn rotate_left(&mut self, angle: f32) {
        self.delta.theta -= angle;
    }

    fn rotate_up(&mut self, angle: f32) {
        self.delta.phi -= angle;
    }

    fn auto_rotation_angle(&self) -> f32 {
        2.0 * PI / 60.0 / 60.0 * self.settings.auto_rotate_speed
    }

    pub fn update(&mut self, camera: &mut Camera) {
        let offset = camera.position - camera.target;
        let mut radius = offset.magnitude();
        let (mut theta, mut phi) = if radius <= f32::EPSILON {
            (0.0, PI / 2.0)
        } else {
            (
                offset.x.atan2(offset.z),
                (offset.y / radius).clamp(-1.0, 1.0).acos(),
            )
        };

        if !self.is_dragging() {
            self.rotate_left(self.auto_rotation_angle());
        }

        let damping = self.settings.damping_factor;
        theta += self.delta.theta * damping;
        phi += self.delta.phi * damping;
        phi = phi.clamp(PHI_EPSILON, PI - PHI_EPSILON);

        radius = (radius * self.scale).clamp(self.settings.min_distance, self.settings.max_distance);

        let sin_phi_radius = phi.sin() * radius;
        camera.position = camera.target
            + vec3(
                sin_phi_radius * theta.sin(),
                phi.cos() * radius,
                sin_phi_radius * theta.cos(),
            );

        self.delta.theta *= 1.0 - damping;
        self.delta.phi *= 1.0 - damping;
        self.scale = 1.0;
    }
}
