//! 软件模拟设备
//!
//! 用于没有物理设备时的演示和测试。打开结果、校准结果、运动轨迹均可脚本化，
//! 并通过 [`SimulatedProbe`] 从外部观察设备收到的调用。

use crate::{DeviceError, DeviceErrorKind, DeviceHandler, DeviceSpecifications, HapticDevice};
use nalgebra::Vector3;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// 打开设备时的行为
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenBehavior {
    #[default]
    Succeed,
    /// 返回端口被占用哨兵（`DeviceErrorKind::PortHeld`）
    PortHeld,
    /// 返回一般打开失败
    Fail,
}

/// 末端执行器运动轨迹
#[derive(Debug, Clone, PartialEq)]
pub enum MotionProfile {
    /// 固定位置
    Static(Vector3<f64>),
    /// 在 XY 平面上绕 `center` 做圆周运动
    Orbit {
        center: Vector3<f64>,
        radius: f64,
        period: Duration,
    },
    /// 位置通道失效：永远报告原点
    StuckAtZero,
    /// 位置固定，速度通道报告给定速度（用于阻尼/摩擦的确定性测试）
    Sliding {
        position: Vector3<f64>,
        velocity: Vector3<f64>,
    },
}

impl Default for MotionProfile {
    fn default() -> Self {
        MotionProfile::Orbit {
            center: Vector3::zeros(),
            radius: 0.04,
            period: Duration::from_secs(4),
        }
    }
}

#[derive(Debug, Default)]
struct ProbeState {
    open_calls: AtomicU32,
    calibrate_calls: AtomicU32,
    close_calls: AtomicU32,
    is_open: AtomicBool,
    force_commands: AtomicU64,
    position_reads: AtomicU64,
    last_force: [AtomicU64; 3],
}

/// 模拟设备的外部观察句柄
///
/// 设备被移动到触觉线程后，测试仍可通过 probe 读取调用计数。
#[derive(Debug, Clone, Default)]
pub struct SimulatedProbe {
    inner: Arc<ProbeState>,
}

impl SimulatedProbe {
    pub fn open_calls(&self) -> u32 {
        self.inner.open_calls.load(Ordering::Acquire)
    }

    pub fn calibrate_calls(&self) -> u32 {
        self.inner.calibrate_calls.load(Ordering::Acquire)
    }

    pub fn close_calls(&self) -> u32 {
        self.inner.close_calls.load(Ordering::Acquire)
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_open.load(Ordering::Acquire)
    }

    pub fn force_commands(&self) -> u64 {
        self.inner.force_commands.load(Ordering::Acquire)
    }

    pub fn position_reads(&self) -> u64 {
        self.inner.position_reads.load(Ordering::Acquire)
    }

    /// 最近一次下发的力
    pub fn last_force(&self) -> Vector3<f64> {
        let [x, y, z] = &self.inner.last_force;
        Vector3::new(
            f64::from_bits(x.load(Ordering::Acquire)),
            f64::from_bits(y.load(Ordering::Acquire)),
            f64::from_bits(z.load(Ordering::Acquire)),
        )
    }
}

/// 纯软件力反馈设备
pub struct SimulatedDevice {
    specs: DeviceSpecifications,
    open_behavior: OpenBehavior,
    calibration_ok: bool,
    motion: MotionProfile,
    force_latency: Duration,
    opened: bool,
    epoch: Instant,
    probe: SimulatedProbe,
}

impl SimulatedDevice {
    pub fn new() -> Self {
        Self {
            specs: DeviceSpecifications {
                model_name: "Simulated Inverse3".to_string(),
                manufacturer: "haptic-host".to_string(),
                max_force_n: 8.0,
                workspace_radius_m: 0.15,
            },
            open_behavior: OpenBehavior::Succeed,
            calibration_ok: true,
            motion: MotionProfile::default(),
            force_latency: Duration::ZERO,
            opened: false,
            epoch: Instant::now(),
            probe: SimulatedProbe::default(),
        }
    }

    pub fn with_specifications(mut self, specs: DeviceSpecifications) -> Self {
        self.specs = specs;
        self
    }

    pub fn with_open_behavior(mut self, behavior: OpenBehavior) -> Self {
        self.open_behavior = behavior;
        self
    }

    pub fn with_calibration(mut self, succeeds: bool) -> Self {
        self.calibration_ok = succeeds;
        self
    }

    pub fn with_motion(mut self, motion: MotionProfile) -> Self {
        self.motion = motion;
        self
    }

    /// 每次 `set_force` 阻塞的时长（仅用于模拟卡死的力通道）
    pub fn with_force_latency(mut self, latency: Duration) -> Self {
        self.force_latency = latency;
        self
    }

    pub fn probe(&self) -> SimulatedProbe {
        self.probe.clone()
    }

    fn ensure_open(&self) -> Result<(), DeviceError> {
        if self.opened {
            Ok(())
        } else {
            Err(DeviceError::new(DeviceErrorKind::NotOpen, "device not open"))
        }
    }

    fn sample(&self) -> (Vector3<f64>, Vector3<f64>) {
        match &self.motion {
            MotionProfile::Static(p) => (*p, Vector3::zeros()),
            MotionProfile::StuckAtZero => (Vector3::zeros(), Vector3::zeros()),
            MotionProfile::Sliding { position, velocity } => (*position, *velocity),
            MotionProfile::Orbit {
                center,
                radius,
                period,
            } => {
                let omega = std::f64::consts::TAU / period.as_secs_f64().max(f64::EPSILON);
                let phase = omega * self.epoch.elapsed().as_secs_f64();
                let (s, c) = phase.sin_cos();
                let position = center + Vector3::new(radius * c, radius * s, 0.0);
                let velocity = Vector3::new(-radius * omega * s, radius * omega * c, 0.0);
                (position, velocity)
            },
        }
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HapticDevice for SimulatedDevice {
    fn specifications(&self) -> DeviceSpecifications {
        self.specs.clone()
    }

    fn open(&mut self) -> Result<(), DeviceError> {
        self.probe.inner.open_calls.fetch_add(1, Ordering::AcqRel);
        match self.open_behavior {
            OpenBehavior::Succeed => {
                self.opened = true;
                self.epoch = Instant::now();
                self.probe.inner.is_open.store(true, Ordering::Release);
                info!("Simulated device opened");
                Ok(())
            },
            OpenBehavior::PortHeld => Err(DeviceError::new(
                DeviceErrorKind::PortHeld,
                "serial port is held by another process",
            )),
            OpenBehavior::Fail => Err(DeviceError::new(
                DeviceErrorKind::Backend,
                "device did not answer handshake",
            )),
        }
    }

    fn calibrate(&mut self) -> Result<(), DeviceError> {
        self.probe.inner.calibrate_calls.fetch_add(1, Ordering::AcqRel);
        self.ensure_open()?;
        if self.calibration_ok {
            Ok(())
        } else {
            Err(DeviceError::new(
                DeviceErrorKind::CalibrationFailed,
                "calibration pose not reached",
            ))
        }
    }

    fn close(&mut self) -> Result<(), DeviceError> {
        self.probe.inner.close_calls.fetch_add(1, Ordering::AcqRel);
        if self.opened {
            // 关闭前把输出力清零
            for axis in &self.probe.inner.last_force {
                axis.store(0f64.to_bits(), Ordering::Release);
            }
            self.opened = false;
            self.probe.inner.is_open.store(false, Ordering::Release);
            debug!("Simulated device closed");
        }
        Ok(())
    }

    fn position(&mut self) -> Result<Vector3<f64>, DeviceError> {
        self.ensure_open()?;
        self.probe.inner.position_reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.sample().0)
    }

    fn linear_velocity(&mut self) -> Result<Vector3<f64>, DeviceError> {
        self.ensure_open()?;
        Ok(self.sample().1)
    }

    fn set_force(&mut self, force: Vector3<f64>) -> Result<(), DeviceError> {
        self.ensure_open()?;
        if !self.force_latency.is_zero() {
            std::thread::sleep(self.force_latency);
        }
        for (axis, value) in self.probe.inner.last_force.iter().zip(force.iter()) {
            axis.store(value.to_bits(), Ordering::Release);
        }
        self.probe.inner.force_commands.fetch_add(1, Ordering::Release);
        Ok(())
    }
}

/// 只提供一台模拟设备的管理器
pub struct SimulatedHandler {
    device: Option<SimulatedDevice>,
}

impl SimulatedHandler {
    pub fn new(device: SimulatedDevice) -> Self {
        Self {
            device: Some(device),
        }
    }
}

impl DeviceHandler for SimulatedHandler {
    fn enumerate_first_device(&mut self) -> Option<Box<dyn HapticDevice>> {
        self.device
            .take()
            .map(|device| Box::new(device) as Box<dyn HapticDevice>)
    }
}
