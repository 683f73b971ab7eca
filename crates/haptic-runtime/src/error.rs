//! 运行时错误类型定义

use crate::state::{DeviceCapability, LifecycleState};
use std::time::Duration;
use thiserror::Error;

/// 设备故障分类
///
/// 设备层的所有错误都在 `DeviceSession` 边界被转换成 [`DeviceCapability`]，
/// 这里的分类只用于日志和操作员提示，不会作为错误向上传播。
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFault {
    /// 没有找到设备（退化为纯视觉模式）
    #[error("No haptic device detected")]
    NoDeviceFound,

    /// 端口被其他进程独占（退化，提示关闭占用进程）
    #[error("Device port is held by another process")]
    PortHeldByOtherProcess,

    /// 打开失败（退化）
    #[error("Failed to open device connection")]
    OpenFailed,

    /// 校准失败（非致命，继续以 Connected 运行）
    #[error("Device calibration failed")]
    CalibrationFailed,

    /// 设备已打开但位置通道无效（渲染回路延迟检测）
    #[error("Device position channel appears non-functional")]
    ProtocolMismatch,
}

impl DeviceFault {
    /// 给操作员的处理建议
    pub fn advisory(&self) -> &'static str {
        match self {
            DeviceFault::NoDeviceFound => {
                "Check that the device is connected via USB, powered, calibrated \
                 and that its host service is running. Continuing in visual-only mode."
            },
            DeviceFault::PortHeldByOtherProcess => {
                "Another process holds the device port. Close the other haptic application \
                 (or vendor hub) and restart. Continuing in visual-only mode."
            },
            DeviceFault::OpenFailed => {
                "The device was found but refused the connection. Power-cycle it and restart. \
                 Continuing in visual-only mode."
            },
            DeviceFault::CalibrationFailed => {
                "Calibration did not complete. Force output stays enabled; recalibrate the \
                 device if positions look offset."
            },
            DeviceFault::ProtocolMismatch => {
                "Tool position has stayed at the origin. The device may be using a protocol \
                 this host does not decode; force feedback is likely non-functional."
            },
        }
    }

    /// 非 Connected 能力对应的故障
    pub fn from_capability(capability: DeviceCapability) -> Option<Self> {
        match capability {
            DeviceCapability::Absent => Some(DeviceFault::NoDeviceFound),
            DeviceCapability::PortConflict => Some(DeviceFault::PortHeldByOtherProcess),
            DeviceCapability::OpenFailed => Some(DeviceFault::OpenFailed),
            DeviceCapability::Connected => None,
        }
    }
}

/// 生命周期控制错误
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// 配置要求必须连接设备，但探测结果不是 Connected
    #[error("Haptic device required but capability is {0:?}")]
    DeviceRequired(DeviceCapability),

    /// 非法状态转换
    #[error("Invalid lifecycle transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: LifecycleState,
        to: LifecycleState,
    },

    /// 触觉线程创建失败
    #[error("Failed to spawn haptic thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),

    /// 配置无效
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// 关闭阶段的诊断结果
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShutdownError {
    /// 触觉线程未在超时内退出
    #[error("Haptic thread did not stop within {0:?}")]
    ShutdownTimedOut(Duration),

    /// 触觉线程 panic
    #[error("Haptic thread panicked")]
    HapticThreadPanicked,
}

/// 配置错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_from_capability() {
        assert_eq!(
            DeviceFault::from_capability(DeviceCapability::Absent),
            Some(DeviceFault::NoDeviceFound)
        );
        assert_eq!(
            DeviceFault::from_capability(DeviceCapability::PortConflict),
            Some(DeviceFault::PortHeldByOtherProcess)
        );
        assert_eq!(
            DeviceFault::from_capability(DeviceCapability::OpenFailed),
            Some(DeviceFault::OpenFailed)
        );
        assert_eq!(DeviceFault::from_capability(DeviceCapability::Connected), None);
    }

    #[test]
    fn test_advisories_are_distinct() {
        let absent = DeviceFault::NoDeviceFound.advisory();
        let held = DeviceFault::PortHeldByOtherProcess.advisory();
        assert_ne!(absent, held);
        assert!(held.contains("Another process"));
    }

    #[test]
    fn test_lifecycle_error_display() {
        let err = LifecycleError::DeviceRequired(DeviceCapability::PortConflict);
        assert!(err.to_string().contains("PortConflict"));

        let err = LifecycleError::InvalidTransition {
            from: LifecycleState::Init,
            to: LifecycleState::HapticActive,
        };
        assert_eq!(
            err.to_string(),
            "Invalid lifecycle transition: Init -> HapticActive"
        );

        let err = ShutdownError::ShutdownTimedOut(Duration::from_millis(50));
        assert_eq!(err.to_string(), "Haptic thread did not stop within 50ms");
    }
}
