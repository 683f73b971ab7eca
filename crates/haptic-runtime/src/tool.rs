//! 工具光标
//!
//! 工具是设备末端在场景中的代理：每次触觉迭代读取设备位姿，映射到场景坐标，
//! 与物体求交并计算接触力，再把力下发到设备。
//!
//! # 力学模型
//!
//! 对每个启用触觉的球体，穿透深度 `δ = r_obj + r_tool - |p - c|`：
//!
//! - 法向力 `k·δ / s`（`s` 为场景/设备工作空间缩放，把穿透换算回设备坐标）
//! - 粘滞阻尼 `-b·v`
//! - 摩擦：切向速度高于粘滞阈值时 `-μd·|Fn|·v̂t`，低于阈值时按 `μs` 线性爬升
//!
//! 合力按设备 `max_force_n` 限幅。

use haptic_device::{DeviceError, DeviceErrorKind, DeviceSpecifications, HapticDevice};
use haptic_scene::{InteractableObject, Shape};
use nalgebra::Vector3;
use std::sync::Arc;
use tracing::{debug, warn};

/// 低于该切向速度（m/s，设备坐标）时使用静摩擦
const STICK_SPEED: f64 = 1e-3;

/// 工具与球心几乎重合时使用的法向
const FALLBACK_NORMAL: Vector3<f64> = Vector3::new(0.0, 0.0, 1.0);

/// 触觉回路驱动的工具
///
/// # 实时性要求
///
/// 三个热路径方法在触觉线程上每次迭代调用一次，实现不得分配内存、
/// 执行阻塞 I/O 或输出日志。错误通过返回值交给回路计数。
pub trait HapticTool: Send {
    /// 读取设备位姿并更新工具的全局位置（第 2 步）
    fn update_from_device(&mut self) -> Result<(), DeviceError>;

    /// 计算与场景物体的交互力（第 3 步），返回是否存在接触
    fn compute_interaction_forces(&mut self) -> bool;

    /// 把计算出的力下发到设备（第 4 步）
    fn apply_to_device(&mut self) -> Result<(), DeviceError>;

    /// 工具在场景中的全局位置
    fn global_position(&self) -> Vector3<f64>;

    /// 最近一次计算出的力（设备坐标，N）
    fn force(&self) -> Vector3<f64>;

    /// 回路退出后交还设备句柄
    fn unbind(&mut self) -> Option<Box<dyn HapticDevice>>;
}

/// 球形工具光标
pub struct ToolCursor {
    device: Option<Box<dyn HapticDevice>>,
    specs: DeviceSpecifications,
    radius: f64,
    workspace_radius: f64,
    objects: Vec<Arc<InteractableObject>>,
    device_pos: Vector3<f64>,
    device_vel: Vector3<f64>,
    global_pos: Vector3<f64>,
    force: Vector3<f64>,
}

impl ToolCursor {
    pub fn new() -> Self {
        Self {
            device: None,
            specs: DeviceSpecifications::default(),
            radius: 0.005,
            workspace_radius: 0.15,
            objects: Vec::new(),
            device_pos: Vector3::zeros(),
            device_vel: Vector3::zeros(),
            global_pos: Vector3::zeros(),
            force: Vector3::zeros(),
        }
    }

    /// 绑定已打开的设备
    pub fn bind(&mut self, device: Box<dyn HapticDevice>) {
        self.specs = device.specifications();
        self.device = Some(device);
    }

    pub fn is_bound(&self) -> bool {
        self.device.is_some()
    }

    pub fn set_radius(&mut self, radius: f64) {
        self.radius = radius;
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// 设备工作空间映射到场景中的半径（m）
    pub fn set_workspace_radius(&mut self, radius: f64) {
        self.workspace_radius = radius;
    }

    /// 场景长度 / 设备长度
    pub fn workspace_scale(&self) -> f64 {
        if self.specs.workspace_radius_m > 0.0 {
            self.workspace_radius / self.specs.workspace_radius_m
        } else {
            1.0
        }
    }

    /// 绑定参与力计算的物体集合（启动前调用，热路径不再分配）
    pub fn bind_objects(&mut self, objects: &[Arc<InteractableObject>]) {
        self.objects.clear();
        self.objects.extend(objects.iter().cloned());
        debug!(count = self.objects.len(), "tool bound to objects");
    }

    /// 启动工具：输出清零并读取初始位置
    pub fn start(&mut self) -> Result<(), DeviceError> {
        let device = self
            .device
            .as_mut()
            .ok_or_else(|| DeviceError::new(DeviceErrorKind::NotOpen, "tool has no bound device"))?;
        device.set_force(Vector3::zeros())?;
        self.force = Vector3::zeros();
        if let Err(e) = self.update_from_device() {
            warn!(error = %e, "initial tool position read failed");
        }
        Ok(())
    }

    fn contact_force(&self, object: &InteractableObject, scale: f64) -> Option<Vector3<f64>> {
        let Shape::Sphere { radius } = object.shape();
        let offset = self.global_pos - object.global_pos();
        let distance = offset.norm();
        let penetration = radius + self.radius - distance;
        if penetration <= 0.0 {
            return None;
        }

        let normal = if distance > f64::EPSILON {
            offset / distance
        } else {
            FALLBACK_NORMAL
        };
        let material = object.material();

        let normal_magnitude = material.stiffness * penetration / scale;
        let mut force = normal * normal_magnitude;

        force -= self.device_vel * material.viscosity;

        let tangential = self.device_vel - normal * self.device_vel.dot(&normal);
        let speed = tangential.norm();
        if speed > STICK_SPEED {
            force -= tangential / speed * (material.dynamic_friction * normal_magnitude);
        } else if speed > 0.0 {
            force -= tangential / STICK_SPEED * (material.static_friction * normal_magnitude);
        }

        Some(force)
    }
}

impl Default for ToolCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl HapticTool for ToolCursor {
    fn update_from_device(&mut self) -> Result<(), DeviceError> {
        let device = self
            .device
            .as_mut()
            .ok_or_else(|| DeviceError::new(DeviceErrorKind::NotOpen, "tool has no bound device"))?;
        // 读取失败时保留上一次位置
        let position = device.position()?;
        let velocity = device.linear_velocity()?;
        self.device_pos = position;
        self.device_vel = velocity;
        self.global_pos = position * self.workspace_scale();
        Ok(())
    }

    fn compute_interaction_forces(&mut self) -> bool {
        let scale = self.workspace_scale();
        let mut total = Vector3::zeros();
        let mut in_contact = false;

        for object in &self.objects {
            if !object.is_haptic_enabled() {
                continue;
            }
            if let Some(force) = self.contact_force(object, scale) {
                total += force;
                in_contact = true;
            }
        }

        let max = self.specs.max_force_n;
        let magnitude = total.norm();
        if magnitude > max && magnitude > 0.0 {
            total *= max / magnitude;
        }
        self.force = total;
        in_contact
    }

    fn apply_to_device(&mut self) -> Result<(), DeviceError> {
        let device = self
            .device
            .as_mut()
            .ok_or_else(|| DeviceError::new(DeviceErrorKind::NotOpen, "tool has no bound device"))?;
        device.set_force(self.force)
    }

    fn global_position(&self) -> Vector3<f64> {
        self.global_pos
    }

    fn force(&self) -> Vector3<f64> {
        self.force
    }

    fn unbind(&mut self) -> Option<Box<dyn HapticDevice>> {
        let mut device = self.device.take()?;
        if let Err(e) = device.set_force(Vector3::zeros()) {
            warn!(error = %e, "failed to zero force on unbind");
        }
        self.force = Vector3::zeros();
        Some(device)
    }
}
