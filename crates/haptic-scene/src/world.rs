//! 无窗口世界（headless world）

use crate::object::{Color, InteractableObject};
use crate::{SceneError, SceneHandle};
use nalgebra::Vector3;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tracing::{debug, trace};

/// 透视相机
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vector3<f64>,
    pub look_at: Vector3<f64>,
    pub up: Vector3<f64>,
    pub near: f64,
    pub far: f64,
    pub fov_deg: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vector3::new(0.5, 0.0, 0.3),
            look_at: Vector3::zeros(),
            up: Vector3::z(),
            near: 0.01,
            far: 10.0,
            fov_deg: 45.0,
        }
    }
}

impl Camera {
    /// 设置视点（位置、注视点、上方向）
    pub fn set(
        &mut self,
        position: Vector3<f64>,
        look_at: Vector3<f64>,
        up: Vector3<f64>,
    ) -> Result<(), SceneError> {
        let forward = look_at - position;
        if forward.norm() < f64::EPSILON {
            return Err(SceneError::InvalidCamera(
                "camera position coincides with look-at point".to_string(),
            ));
        }
        if forward.cross(&up).norm() < f64::EPSILON {
            return Err(SceneError::InvalidCamera(
                "up vector is parallel to the view direction".to_string(),
            ));
        }
        self.position = position;
        self.look_at = look_at;
        self.up = up;
        Ok(())
    }

    pub fn set_clipping_planes(&mut self, near: f64, far: f64) -> Result<(), SceneError> {
        if !(near > 0.0 && far > near) {
            return Err(SceneError::InvalidCamera(format!(
                "clipping planes must satisfy 0 < near < far, got near={near} far={far}"
            )));
        }
        self.near = near;
        self.far = far;
        Ok(())
    }

    pub fn set_field_view_angle_deg(&mut self, fov_deg: f64) -> Result<(), SceneError> {
        if !(fov_deg > 0.0 && fov_deg < 180.0) {
            return Err(SceneError::InvalidCamera(format!(
                "field of view must be in (0, 180) degrees, got {fov_deg}"
            )));
        }
        self.fov_deg = fov_deg;
        Ok(())
    }
}

/// 方向光
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    pub enabled: bool,
    pub direction: Vector3<f64>,
    pub ambient: Color,
    pub diffuse: Color,
    pub specular: Color,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            enabled: true,
            direction: Vector3::new(-1.0, -1.0, -1.0),
            ambient: Color::gray(0.3),
            diffuse: Color::gray(0.7),
            specular: Color::WHITE,
        }
    }
}

impl DirectionalLight {
    pub fn set_dir(&mut self, direction: Vector3<f64>) -> Result<(), SceneError> {
        if direction.norm() < f64::EPSILON {
            return Err(SceneError::InvalidLight(
                "light direction must be non-zero".to_string(),
            ));
        }
        self.direction = direction;
        Ok(())
    }
}

/// 无窗口世界
///
/// 持有相机、光源和物体。`render()` 不产生像素，只记录帧计数和视口尺寸，
/// 真正的光栅化由外部渲染器负责。
#[derive(Debug, Default)]
pub struct World {
    pub background: Color,
    pub camera: Camera,
    pub light: DirectionalLight,
    origin: Vector3<f64>,
    objects: Vec<Arc<InteractableObject>>,
    frames_rendered: AtomicU64,
    global_updates: AtomicU64,
    last_viewport: (AtomicU32, AtomicU32),
}

impl World {
    pub fn new() -> Self {
        Self {
            background: Color::BLACK,
            ..Default::default()
        }
    }

    /// 世界坐标系原点（所有物体的父坐标系）
    pub fn with_origin(mut self, origin: Vector3<f64>) -> Self {
        self.origin = origin;
        self
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered.load(Ordering::Acquire)
    }

    pub fn global_updates(&self) -> u64 {
        self.global_updates.load(Ordering::Acquire)
    }

    pub fn last_viewport(&self) -> (u32, u32) {
        (
            self.last_viewport.0.load(Ordering::Acquire),
            self.last_viewport.1.load(Ordering::Acquire),
        )
    }
}

impl SceneHandle for World {
    fn advance_global_state(&self) {
        for object in &self.objects {
            object.update_global_pos(&self.origin);
        }
        self.global_updates.fetch_add(1, Ordering::Release);
    }

    fn render(&self, viewport_width: u32, viewport_height: u32) {
        if viewport_width == 0 || viewport_height == 0 {
            return;
        }
        let visible = self.objects.iter().filter(|o| o.is_visible()).count();
        self.last_viewport.0.store(viewport_width, Ordering::Release);
        self.last_viewport.1.store(viewport_height, Ordering::Release);
        let frame = self.frames_rendered.fetch_add(1, Ordering::AcqRel) + 1;
        trace!(frame, visible, viewport_width, viewport_height, "frame rendered");
    }

    fn add_object(
        &mut self,
        object: InteractableObject,
    ) -> Result<Arc<InteractableObject>, SceneError> {
        object.validate()?;
        object.update_global_pos(&self.origin);
        debug!(name = object.name(), "object added to world");
        let object = Arc::new(object);
        self.objects.push(object.clone());
        Ok(object)
    }

    fn interactables(&self) -> &[Arc<InteractableObject>] {
        &self.objects
    }
}
