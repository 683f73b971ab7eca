//! 设备会话
//!
//! 负责探测、打开、校准和关闭力反馈设备。设备层的所有错误都在这里被转换成
//! [`DeviceCapability`]，任何非 Connected 结果都不会终止进程。
//!
//! 设备句柄是单一所有者的：触觉回路运行期间通过 [`DeviceSession::lease`] 移交给
//! 触觉线程，线程 join 后再通过 [`DeviceSession::reclaim`] 收回并关闭。
//! 租出的句柄包在 [`LeasedDevice`] 里，没有归还就被丢弃时（线程 spawn 失败、
//! 触觉线程 panic、超时后被分离的线程最终退出）由它自己关闭设备。

use crate::error::DeviceFault;
use crate::state::DeviceCapability;
use haptic_device::{DeviceError, DeviceHandler, DeviceSpecifications, HapticDevice};
use nalgebra::Vector3;
use tracing::{debug, error, info, warn};

/// 设备探测结果
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    /// 没有设备
    Absent,
    /// 找到设备（尚未打开）
    Found(DeviceSpecifications),
}

/// 校准结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalibrationStatus {
    #[default]
    NotAttempted,
    Calibrated,
    /// 校准失败（非致命，设备仍为 Connected）
    Failed,
}

/// 设备会话
pub struct DeviceSession {
    device: Option<Box<dyn HapticDevice>>,
    specs: Option<DeviceSpecifications>,
    capability: DeviceCapability,
    calibration: CalibrationStatus,
    opened: bool,
    leased: bool,
    closed: bool,
}

impl DeviceSession {
    pub fn new() -> Self {
        Self {
            device: None,
            specs: None,
            capability: DeviceCapability::Absent,
            calibration: CalibrationStatus::NotAttempted,
            opened: false,
            leased: false,
            closed: false,
        }
    }

    /// 查询设备层的第一个设备并保存句柄
    pub fn detect(&mut self, handler: &mut dyn DeviceHandler) -> Detection {
        if let Some(specs) = &self.specs {
            return Detection::Found(specs.clone());
        }

        match handler.enumerate_first_device() {
            Some(device) => {
                let specs = device.specifications();
                debug!(model = %specs.model_name, "Haptic device detected");
                self.specs = Some(specs.clone());
                self.device = Some(device);
                Detection::Found(specs)
            },
            None => {
                self.capability = DeviceCapability::Absent;
                Detection::Absent
            },
        }
    }

    /// 打开并校准已探测到的设备
    ///
    /// - 未探测到设备 → `Absent`
    /// - 端口被占用哨兵 → `PortConflict`
    /// - 其他打开失败 → `OpenFailed`
    /// - 打开成功 → `Connected`（校准失败只记录，不改变结果）
    pub fn open_and_calibrate(&mut self) -> DeviceCapability {
        if self.opened {
            return self.capability;
        }
        let Some(device) = self.device.as_mut() else {
            self.capability = DeviceCapability::Absent;
            return self.capability;
        };

        if let Err(e) = device.open() {
            self.capability = if e.is_port_held() {
                DeviceCapability::PortConflict
            } else {
                DeviceCapability::OpenFailed
            };
            warn!(error = %e, capability = ?self.capability, "Failed to open haptic device");
            return self.capability;
        }
        self.opened = true;

        match device.calibrate() {
            Ok(()) => {
                self.calibration = CalibrationStatus::Calibrated;
                info!("Haptic device calibrated");
            },
            Err(e) => {
                self.calibration = CalibrationStatus::Failed;
                warn!(
                    error = %e,
                    "{}",
                    DeviceFault::CalibrationFailed.advisory()
                );
            },
        }

        self.capability = DeviceCapability::Connected;
        self.capability
    }

    /// 探测 + 打开 + 校准，并为每个非 Connected 结果输出操作员提示
    pub fn probe(&mut self, handler: &mut dyn DeviceHandler) -> DeviceCapability {
        if let Detection::Found(specs) = self.detect(handler) {
            info!(
                model = %specs.model_name,
                manufacturer = %specs.manufacturer,
                max_force_n = specs.max_force_n,
                "Found haptic device"
            );
        }

        let capability = self.open_and_calibrate();
        match DeviceFault::from_capability(capability) {
            Some(fault) => warn!("{}: {}", fault, fault.advisory()),
            None => info!("Haptic device connected"),
        }
        capability
    }

    pub fn capability(&self) -> DeviceCapability {
        self.capability
    }

    pub fn calibration(&self) -> CalibrationStatus {
        self.calibration
    }

    pub fn specifications(&self) -> Option<&DeviceSpecifications> {
        self.specs.as_ref()
    }

    /// 把已打开的设备移交给触觉线程
    ///
    /// 仅在 Connected 且句柄尚在会话中时返回 `Some`。
    pub fn lease(&mut self) -> Option<Box<dyn HapticDevice>> {
        if !self.capability.is_connected() || self.closed {
            return None;
        }
        let device = self.device.take()?;
        self.leased = true;
        Some(Box::new(LeasedDevice::new(device)))
    }

    /// 收回触觉线程归还的设备
    pub fn reclaim(&mut self, device: Box<dyn HapticDevice>) {
        self.device = Some(device);
        self.leased = false;
    }

    /// 设备仍在触觉线程手中（未归还）
    pub fn is_leased(&self) -> bool {
        self.leased
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// 关闭设备（幂等）
    ///
    /// 无论设备是否打开过都可以调用；关闭错误只记录，不向上传播。
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if self.leased {
            error!(
                "Haptic device was never returned by the haptic thread, \
                it will be closed when the thread releases it"
            );
            return;
        }

        if let Some(device) = self.device.as_mut()
            && self.opened
        {
            match device.close() {
                Ok(()) => info!("Haptic device closed"),
                Err(e) => error!(error = %e, "Failed to close haptic device"),
            }
        }
        self.opened = false;
    }
}

impl Default for DeviceSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// 租出的设备句柄
///
/// 热路径方法直接转发。丢弃时如果设备还没有被关闭，先把输出力清零再关闭。
pub(crate) struct LeasedDevice {
    inner: Box<dyn HapticDevice>,
    closed: bool,
}

impl LeasedDevice {
    fn new(inner: Box<dyn HapticDevice>) -> Self {
        Self {
            inner,
            closed: false,
        }
    }
}

impl HapticDevice for LeasedDevice {
    fn specifications(&self) -> DeviceSpecifications {
        self.inner.specifications()
    }

    fn open(&mut self) -> Result<(), DeviceError> {
        self.inner.open()
    }

    fn calibrate(&mut self) -> Result<(), DeviceError> {
        self.inner.calibrate()
    }

    fn close(&mut self) -> Result<(), DeviceError> {
        self.closed = true;
        self.inner.close()
    }

    fn position(&mut self) -> Result<Vector3<f64>, DeviceError> {
        self.inner.position()
    }

    fn linear_velocity(&mut self) -> Result<Vector3<f64>, DeviceError> {
        self.inner.linear_velocity()
    }

    fn set_force(&mut self, force: Vector3<f64>) -> Result<(), DeviceError> {
        self.inner.set_force(force)
    }
}

impl Drop for LeasedDevice {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        warn!("Leased haptic device dropped without being returned, closing it");
        if let Err(e) = self.inner.set_force(Vector3::zeros()) {
            warn!(error = %e, "Failed to zero force before close");
        }
        match self.close() {
            Ok(()) => info!("Haptic device closed"),
            Err(e) => error!(error = %e, "Failed to close haptic device"),
        }
    }
}
