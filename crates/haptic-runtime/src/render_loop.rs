//! 渲染回路
//!
//! 由窗口系统的刷新回调驱动（协作式，运行在主线程）。每次刷新渲染场景并呈现；
//! 设备已连接时每 N 帧采样一次触觉回路发布的工具位置，用于诊断。
//! 触觉回路尚未发布过位置时不采样，零位置检测窗口也不会开始计时。

use crate::config::RenderConfig;
use crate::error::DeviceFault;
use crate::flags::LoopFlags;
use crate::metrics::{HapticMetrics, HapticMetricsSnapshot};
use crate::state::DeviceCapability;
use crate::tool_state::SharedToolState;
use haptic_scene::{SceneHandle, Surface};
use nalgebra::Vector3;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// 持续零位置检测器
///
/// 位置模长持续低于 `epsilon` 达到 `window` 后触发一次，之后永不再触发。
/// 窗口未满之前绝不触发；任何一次非零样本都会重新开始计时。
#[derive(Debug, Clone)]
pub struct ZeroPositionDetector {
    epsilon: f64,
    window: Duration,
    zero_since: Option<Instant>,
    fired: bool,
}

impl ZeroPositionDetector {
    pub fn new(epsilon: f64, window: Duration) -> Self {
        Self {
            epsilon,
            window,
            zero_since: None,
            fired: false,
        }
    }

    /// 输入一个样本，本次触发时返回 true
    pub fn observe(&mut self, position: &Vector3<f64>, now: Instant) -> bool {
        if self.fired {
            return false;
        }
        if position.norm() >= self.epsilon {
            self.zero_since = None;
            return false;
        }

        let since = *self.zero_since.get_or_insert(now);
        if now.saturating_duration_since(since) >= self.window {
            self.fired = true;
            return true;
        }
        false
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }
}

/// 一次诊断采样
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolSample {
    pub frame: u64,
    pub position: Vector3<f64>,
    pub force: Vector3<f64>,
    /// 自上次采样以来的触觉回路频率（首次采样为 `None`）
    pub loop_rate_hz: Option<f64>,
    pub metrics: HapticMetricsSnapshot,
}

/// 一次刷新的结果
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutcome {
    /// 是否请求下一次刷新
    pub redisplay: bool,
    pub sample: Option<ToolSample>,
    /// 本帧首次触发的操作员提示
    pub advisory: Option<DeviceFault>,
}

/// 渲染回路
pub struct RenderLoop<S: SceneHandle + ?Sized> {
    scene: Arc<S>,
    flags: Arc<LoopFlags>,
    capability: DeviceCapability,
    shared: Arc<SharedToolState>,
    metrics: Arc<HapticMetrics>,
    sample_every: u64,
    frame: u64,
    detector: ZeroPositionDetector,
    last_sample: Option<(Instant, HapticMetricsSnapshot)>,
}

impl<S: SceneHandle + ?Sized> RenderLoop<S> {
    pub fn new(
        scene: Arc<S>,
        flags: Arc<LoopFlags>,
        capability: DeviceCapability,
        shared: Arc<SharedToolState>,
        metrics: Arc<HapticMetrics>,
        config: &RenderConfig,
    ) -> Self {
        Self {
            scene,
            flags,
            capability,
            shared,
            metrics,
            sample_every: u64::from(config.sample_every.max(1)),
            frame: 0,
            detector: ZeroPositionDetector::new(config.zero_epsilon, config.zero_window()),
            last_sample: None,
        }
    }

    pub fn capability(&self) -> DeviceCapability {
        self.capability
    }

    pub fn frames(&self) -> u64 {
        self.frame
    }

    pub fn scene(&self) -> &Arc<S> {
        &self.scene
    }

    /// 刷新回调
    pub fn on_refresh(&mut self, surface: &mut dyn Surface) -> FrameOutcome {
        self.on_refresh_at(surface, Instant::now())
    }

    /// 以指定时刻执行一次刷新
    pub fn on_refresh_at(&mut self, surface: &mut dyn Surface, now: Instant) -> FrameOutcome {
        let (width, height) = surface.size();
        self.scene.render(width, height);
        surface.present();
        self.frame += 1;

        let mut outcome = FrameOutcome {
            redisplay: self.flags.is_running(),
            sample: None,
            advisory: None,
        };

        if self.capability.is_connected()
            && self.frame % self.sample_every == 0
            && self.shared.has_published()
        {
            outcome.sample = self.sample(now);
            if let Some(sample) = &outcome.sample
                && self.detector.observe(&sample.position, now)
            {
                let fault = DeviceFault::ProtocolMismatch;
                warn!("{}: {}", fault, fault.advisory());
                outcome.advisory = Some(fault);
            }
        }

        outcome
    }

    fn sample(&mut self, now: Instant) -> Option<ToolSample> {
        let snapshot = self.shared.snapshot()?;
        let metrics = self.metrics.snapshot();
        let loop_rate_hz = self
            .last_sample
            .map(|(at, earlier)| metrics.rate_since(&earlier, now.saturating_duration_since(at)));
        self.last_sample = Some((now, metrics));

        let p = snapshot.position;
        match loop_rate_hz {
            Some(rate) => info!(
                frame = self.frame,
                x = p.x,
                y = p.y,
                z = p.z,
                loop_rate_hz = rate,
                device_errors = metrics.device_errors(),
                "tool position"
            ),
            None => info!(frame = self.frame, x = p.x, y = p.y, z = p.z, "tool position"),
        }

        Some(ToolSample {
            frame: self.frame,
            position: p,
            force: snapshot.force,
            loop_rate_hz,
            metrics,
        })
    }

    /// 视口尺寸变化
    pub fn resize(&mut self, surface: &mut dyn Surface, width: u32, height: u32) {
        debug!(width, height, "viewport resized");
        surface.resize(width, height);
    }

    /// 切换全屏，返回切换后的状态
    pub fn toggle_fullscreen(&mut self, surface: &mut dyn Surface) -> bool {
        surface.toggle_fullscreen()
    }
}
