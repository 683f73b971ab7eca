//! # Haptic Device Layer
//!
//! 力反馈设备抽象层，提供统一的设备接口。
//!
//! 物理驱动和传输协议不在本 crate 范围内，这里只定义宿主程序依赖的窄接口：
//! - [`DeviceHandler`]：枚举第一个可用设备
//! - [`HapticDevice`]：打开/校准/关闭，读取位姿，下发力
//!
//! 内置两个后端：
//! - [`NullHandler`]：没有任何设备（无硬件时的默认后端）
//! - [`SimulatedHandler`]：纯软件设备，可脚本化打开/校准结果和运动轨迹

use nalgebra::Vector3;
use std::borrow::Cow;
use thiserror::Error;

mod null;
pub mod sim;

pub use null::NullHandler;
pub use sim::{MotionProfile, OpenBehavior, SimulatedDevice, SimulatedHandler, SimulatedProbe};

/// 设备层统一错误类型
///
/// 热路径上的错误使用 `&'static str` 消息构造，不分配内存。
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct DeviceError {
    pub kind: DeviceErrorKind,
    pub message: Cow<'static, str>,
}

/// 设备错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceErrorKind {
    Unknown,
    NotFound,
    /// 端口已找到，但被其他进程独占
    PortHeld,
    AccessDenied,
    NotOpen,
    CalibrationFailed,
    Timeout,
    Backend,
}

impl DeviceError {
    pub fn new(kind: DeviceErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// 是否为"端口被其他进程占用"哨兵
    pub fn is_port_held(&self) -> bool {
        self.kind == DeviceErrorKind::PortHeld
    }
}

impl From<String> for DeviceError {
    fn from(message: String) -> Self {
        Self::new(DeviceErrorKind::Unknown, message)
    }
}

impl From<&'static str> for DeviceError {
    fn from(message: &'static str) -> Self {
        Self::new(DeviceErrorKind::Unknown, message)
    }
}

/// 设备规格信息
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSpecifications {
    pub model_name: String,
    pub manufacturer: String,
    /// 最大连续输出力（N）
    pub max_force_n: f64,
    /// 设备物理工作空间半径（m）
    pub workspace_radius_m: f64,
}

impl Default for DeviceSpecifications {
    fn default() -> Self {
        Self {
            model_name: "unknown".to_string(),
            manufacturer: "unknown".to_string(),
            max_force_n: 10.0,
            workspace_radius_m: 0.1,
        }
    }
}

/// 力反馈设备
///
/// # 实时性要求
///
/// `position()`、`linear_velocity()`、`set_force()` 在触觉线程的热路径上调用（>= 1 kHz），
/// 实现不得分配内存或执行阻塞 I/O，失败时同样如此（错误消息用 `&'static str`）。
pub trait HapticDevice: Send {
    fn specifications(&self) -> DeviceSpecifications;
    fn open(&mut self) -> Result<(), DeviceError>;
    fn calibrate(&mut self) -> Result<(), DeviceError>;
    fn close(&mut self) -> Result<(), DeviceError>;
    /// 末端执行器位置（设备坐标系，m）
    fn position(&mut self) -> Result<Vector3<f64>, DeviceError>;
    /// 末端执行器线速度（m/s）
    fn linear_velocity(&mut self) -> Result<Vector3<f64>, DeviceError> {
        Ok(Vector3::zeros())
    }
    /// 下发力指令（N）
    fn set_force(&mut self, force: Vector3<f64>) -> Result<(), DeviceError>;
}

/// 设备管理器
pub trait DeviceHandler {
    /// 返回第一个可用设备（未打开），没有设备时返回 `None`
    fn enumerate_first_device(&mut self) -> Option<Box<dyn HapticDevice>>;
}

impl<H: DeviceHandler + ?Sized> DeviceHandler for Box<H> {
    fn enumerate_first_device(&mut self) -> Option<Box<dyn HapticDevice>> {
        (**self).enumerate_first_device()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_error_display() {
        let err = DeviceError::new(DeviceErrorKind::PortHeld, "COM3 in use");
        let msg = format!("{}", err);
        assert!(msg.contains("PortHeld") && msg.contains("COM3 in use"), "{}", msg);
    }

    #[test]
    fn test_port_held_sentinel() {
        assert!(DeviceError::new(DeviceErrorKind::PortHeld, "").is_port_held());
        assert!(!DeviceError::new(DeviceErrorKind::AccessDenied, "").is_port_held());
        assert!(!DeviceError::from("boom").is_port_held());
    }

    #[test]
    fn test_from_string_is_unknown() {
        let err: DeviceError = String::from("oops").into();
        assert_eq!(err.kind, DeviceErrorKind::Unknown);
        assert_eq!(err.message, "oops");
    }

    #[test]
    fn test_static_message_is_borrowed() {
        let err = DeviceError::new(DeviceErrorKind::NotOpen, "device not open");
        assert!(matches!(err.message, Cow::Borrowed(_)));
    }

    #[test]
    fn test_boxed_handler_delegates() {
        let mut handler: Box<dyn DeviceHandler> = Box::new(NullHandler);
        assert!(handler.enumerate_first_device().is_none());
    }
}
