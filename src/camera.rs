//! Camera, projection and pointer rays.
//!
//! The camera is the usual yaw/pitch fly camera; the projection maps to
//! wgpu's clip space (depth in `[0, 1]`). [`CameraView`] pairs both with the
//! size of the render surface, which is all the pointer layer needs to turn
//! pixel coordinates into world-space rays.

use cgmath::{
    EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, SquareMatrix, Vector2, Vector3, Vector4,
    perspective,
};
use winit::dpi::PhysicalPosition;

use crate::config::CameraConfig;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub position: Point3<f32>,
    pub yaw: Rad<f32>,
    pub pitch: Rad<f32>,
}

impl Camera {
    pub fn new<V: Into<Point3<f32>>, Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(
        position: V,
        yaw: Y,
        pitch: P,
    ) -> Self {
        Self {
            position: position.into(),
            yaw: yaw.into(),
            pitch: pitch.into(),
        }
    }

    pub fn forward(&self) -> Vector3<f32> {
        let (sin_pitch, cos_pitch) = self.pitch.0.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.0.sin_cos();
        Vector3::new(cos_pitch * cos_yaw, sin_pitch, cos_pitch * sin_yaw).normalize()
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.forward(), Vector3::unit_y())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width.max(1) as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// A half-line in world space. `direction` is normalized.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn at(&self, distance: f32) -> Point3<f32> {
        self.origin + self.direction * distance
    }
}

/// Camera, projection and surface size: everything needed to go between
/// pixels and world space.
#[derive(Clone, Copy, Debug)]
pub struct CameraView {
    pub camera: Camera,
    pub projection: Projection,
    width: u32,
    height: u32,
}

impl CameraView {
    pub fn new(camera: Camera, projection: Projection, width: u32, height: u32) -> Self {
        Self {
            camera,
            projection,
            width,
            height,
        }
    }

    pub fn from_config(config: &CameraConfig, width: u32, height: u32) -> Self {
        let camera = Camera::new(
            config.position,
            cgmath::Deg(config.yaw_deg),
            cgmath::Deg(config.pitch_deg),
        );
        let projection = Projection::new(
            width,
            height,
            cgmath::Deg(config.fovy_deg),
            config.znear,
            config.zfar,
        );
        Self::new(camera, projection, width, height)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// A zero-sized surface has not been laid out yet; nothing can be hit on it.
    pub fn is_ready(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        if self.is_ready() {
            self.projection.resize(width, height);
        }
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection.calc_matrix() * self.camera.calc_matrix()
    }

    /// Pixel position (origin top-left, y down) to normalized device coordinates.
    pub fn pixel_to_ndc(&self, position: PhysicalPosition<f64>) -> Option<Vector2<f32>> {
        if !self.is_ready() {
            return None;
        }
        let x = (position.x / f64::from(self.width)) * 2.0 - 1.0;
        let y = 1.0 - (position.y / f64::from(self.height)) * 2.0;
        Some(Vector2::new(x as f32, y as f32))
    }

    pub fn ndc_to_pixel(&self, ndc: Vector2<f32>) -> PhysicalPosition<f64> {
        PhysicalPosition::new(
            (f64::from(ndc.x) + 1.0) / 2.0 * f64::from(self.width),
            (1.0 - f64::from(ndc.y)) / 2.0 * f64::from(self.height),
        )
    }

    /// Ray from the near plane through `ndc` towards the far plane.
    pub fn ray_through_ndc(&self, ndc: Vector2<f32>) -> Option<Ray> {
        let inverse = self.view_projection().invert()?;
        let unproject = |depth: f32| {
            let clip = inverse * Vector4::new(ndc.x, ndc.y, depth, 1.0);
            (clip.w.abs() > f32::EPSILON).then(|| Point3::from_vec(clip.truncate() / clip.w))
        };
        let near = unproject(0.0)?;
        let far = unproject(1.0)?;
        let direction = far - near;
        if direction.magnitude2() <= f32::EPSILON {
            return None;
        }
        Some(Ray {
            origin: near,
            direction: direction.normalize(),
        })
    }

    pub fn ray_through_pixel(&self, position: PhysicalPosition<f64>) -> Option<Ray> {
        self.ray_through_ndc(self.pixel_to_ndc(position)?)
    }

    /// Where a world-space point lands on the surface, or `None` if it is
    /// behind the camera.
    pub fn project(&self, point: Point3<f32>) -> Option<PhysicalPosition<f64>> {
        let clip = self.view_projection() * point.to_homogeneous();
        if clip.w <= f32::EPSILON {
            return None;
        }
        Some(self.ndc_to_pixel(Vector2::new(clip.x / clip.w, clip.y / clip.w)))
    }
}
