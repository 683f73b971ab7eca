//! 生命周期控制器
//!
//! ```text
//! Init → DeviceProbing → {VisualOnly | HapticActive} → ShuttingDown → Terminated
//! ```
//!
//! 启动顺序：场景 → 设备会话 → 工具 → 触觉回路 → 渲染回路。
//! 关闭顺序：停止触觉回路 → join → 关闭设备 → 释放场景。

use crate::config::RuntimeConfig;
use crate::error::{LifecycleError, ShutdownError};
use crate::flags::LoopFlags;
use crate::haptic_loop::HapticLoop;
use crate::metrics::{HapticMetrics, HapticMetricsSnapshot};
use crate::render_loop::RenderLoop;
use crate::session::DeviceSession;
use crate::state::{AtomicLifecycleState, DeviceCapability, LifecycleState};
use crate::tool::{HapticTool, ToolCursor};
use crate::tool_state::SharedToolState;
use haptic_device::DeviceHandler;
use haptic_scene::SceneHandle;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{error, info, warn};

/// 关闭结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// 触觉线程（如有）已退出，设备已关闭
    Clean,
    /// 触觉线程未在超时内退出，线程被分离；设备随线程退出时关闭
    TimedOut(Duration),
    /// 触觉线程 panic
    HapticThreadPanicked,
}

impl ShutdownOutcome {
    pub fn into_result(self) -> Result<(), ShutdownError> {
        match self {
            ShutdownOutcome::Clean => Ok(()),
            ShutdownOutcome::TimedOut(timeout) => Err(ShutdownError::ShutdownTimedOut(timeout)),
            ShutdownOutcome::HapticThreadPanicked => Err(ShutdownError::HapticThreadPanicked),
        }
    }
}

/// 关闭报告
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    /// 开始关闭时所处的状态
    pub from: LifecycleState,
    pub capability: DeviceCapability,
    pub outcome: ShutdownOutcome,
    /// 设备是否已回到会话并关闭（从未连接时为 true）
    pub device_released: bool,
    pub metrics: HapticMetricsSnapshot,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.outcome == ShutdownOutcome::Clean
    }

    /// 进程退出码：正常 0，触觉线程未能停止 2
    pub fn exit_code(&self) -> i32 {
        match self.outcome {
            ShutdownOutcome::Clean => 0,
            ShutdownOutcome::TimedOut(_) | ShutdownOutcome::HapticThreadPanicked => 2,
        }
    }
}

/// 生命周期控制器
pub struct LifecycleController<S: SceneHandle + 'static> {
    config: RuntimeConfig,
    scene: Option<Arc<S>>,
    state: Arc<AtomicLifecycleState>,
    flags: Arc<LoopFlags>,
    shared: Arc<SharedToolState>,
    metrics: Arc<HapticMetrics>,
    session: DeviceSession,
    capability: DeviceCapability,
    haptic_thread: Option<JoinHandle<ToolCursor>>,
    report: Option<ShutdownReport>,
}

impl<S: SceneHandle + 'static> LifecycleController<S> {
    /// 接管已构造完成的场景（状态 `Init`）
    pub fn new(config: RuntimeConfig, scene: S) -> Result<Self, LifecycleError> {
        config.validate()?;
        Ok(Self {
            config,
            scene: Some(Arc::new(scene)),
            state: Arc::new(AtomicLifecycleState::new(LifecycleState::Init)),
            flags: Arc::new(LoopFlags::new()),
            shared: Arc::new(SharedToolState::new()),
            metrics: Arc::new(HapticMetrics::new()),
            session: DeviceSession::new(),
            capability: DeviceCapability::Absent,
            haptic_thread: None,
            report: None,
        })
    }

    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    pub fn capability(&self) -> DeviceCapability {
        self.capability
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn flags(&self) -> &Arc<LoopFlags> {
        &self.flags
    }

    pub fn session(&self) -> &DeviceSession {
        &self.session
    }

    pub fn metrics(&self) -> HapticMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn tool_state(&self) -> &Arc<SharedToolState> {
        &self.shared
    }

    /// 场景（关闭后释放，返回 `None`）
    pub fn scene(&self) -> Option<&Arc<S>> {
        self.scene.as_ref()
    }

    fn transition(&self, from: LifecycleState, to: LifecycleState) -> Result<(), LifecycleError> {
        self.state
            .transition(from, to)
            .map_err(|current| LifecycleError::InvalidTransition { from: current, to })?;
        info!("Lifecycle: {:?} -> {:?}", from, to);
        Ok(())
    }

    /// 探测设备并启动回路
    ///
    /// 返回进入的运行态（`VisualOnly` 或 `HapticActive`）。
    pub fn start(
        &mut self,
        handler: &mut dyn DeviceHandler,
    ) -> Result<LifecycleState, LifecycleError> {
        self.transition(LifecycleState::Init, LifecycleState::DeviceProbing)?;

        self.capability = self.session.probe(handler);

        if self.config.require_device && !self.capability.is_connected() {
            error!(
                capability = ?self.capability,
                "Haptic device is required, aborting startup"
            );
            self.shutdown();
            return Err(LifecycleError::DeviceRequired(self.capability));
        }

        let device = if self.capability.is_connected() {
            self.session.lease()
        } else {
            None
        };

        let Some(device) = device else {
            self.flags.start_visual_only();
            self.transition(LifecycleState::DeviceProbing, LifecycleState::VisualOnly)?;
            return Ok(LifecycleState::VisualOnly);
        };

        let Some(scene) = self.scene.clone() else {
            self.session.reclaim(device);
            return Err(LifecycleError::InvalidTransition {
                from: self.state(),
                to: LifecycleState::HapticActive,
            });
        };

        let haptic = &self.config.haptic;
        let mut tool = ToolCursor::new();
        tool.bind(device);
        tool.set_radius(haptic.tool_radius);
        tool.set_workspace_radius(haptic.workspace_radius);
        tool.bind_objects(scene.interactables());
        if let Err(e) = tool.start() {
            warn!(error = %e, "Tool start reported a device error, continuing");
        }

        // finished=false 必须先于 running=true 对其他线程可见
        self.flags.arm();
        let haptic_loop = HapticLoop::new(
            scene,
            tool,
            self.flags.clone(),
            self.shared.clone(),
            self.metrics.clone(),
        )
        .with_period(haptic.period())
        .with_realtime_priority(haptic.realtime_priority);

        match haptic_loop.spawn() {
            Ok(handle) => {
                self.haptic_thread = Some(handle);
                self.transition(LifecycleState::DeviceProbing, LifecycleState::HapticActive)?;
                Ok(LifecycleState::HapticActive)
            },
            Err(e) => {
                // 闭包连同租出的设备一起被丢弃，设备由租约关闭
                error!(error = %e, "Failed to spawn haptic thread");
                self.flags.disarm();
                self.shutdown();
                Err(LifecycleError::ThreadSpawn(e))
            },
        }
    }

    /// 为当前会话构造渲染回路（仅运行态有效）
    pub fn render_loop(&self) -> Option<RenderLoop<S>> {
        if !self.state().is_running() {
            return None;
        }
        let scene = self.scene.clone()?;
        Some(RenderLoop::new(
            scene,
            self.flags.clone(),
            self.capability,
            self.shared.clone(),
            self.metrics.clone(),
            &self.config.render,
        ))
    }

    /// 关闭（幂等）
    ///
    /// 第二次及之后的调用直接返回第一次的报告，没有副作用。
    pub fn shutdown(&mut self) -> ShutdownReport {
        if let Some(report) = &self.report {
            return report.clone();
        }

        let from = self.state();
        if let Err(e) = self.transition(from, LifecycleState::ShuttingDown) {
            warn!(error = %e, "Shutdown requested from unexpected state");
        }

        // Release: 停止前的写入对触觉线程可见
        self.flags.request_stop();

        let mut outcome = ShutdownOutcome::Clean;
        if let Some(handle) = self.haptic_thread.take() {
            let poll = self.config.shutdown.poll_interval();
            let timeout = self.config.shutdown.join_timeout();

            if self.flags.wait_finished(poll, timeout) {
                match handle.join() {
                    Ok(mut tool) => {
                        if let Some(device) = tool.unbind() {
                            self.session.reclaim(device);
                        }
                    },
                    Err(_) => {
                        // 展开过程中租出的设备已被关闭
                        error!("Haptic thread panicked");
                        outcome = ShutdownOutcome::HapticThreadPanicked;
                    },
                }
            } else {
                error!("Haptic thread did not stop within {:?}, detaching it", timeout);
                outcome = ShutdownOutcome::TimedOut(timeout);
            }
        }

        self.session.close();
        let device_released = !self.session.is_leased();

        // 释放场景
        self.scene = None;

        if let Err(e) = self.transition(LifecycleState::ShuttingDown, LifecycleState::Terminated) {
            warn!(error = %e, "Failed to mark lifecycle terminated");
        }

        let report = ShutdownReport {
            from,
            capability: self.capability,
            outcome,
            device_released,
            metrics: self.metrics.snapshot(),
        };
        info!(
            outcome = ?report.outcome,
            iterations = report.metrics.iterations,
            "Shutdown complete"
        );
        self.report = Some(report.clone());
        report
    }
}

impl<S: SceneHandle + 'static> Drop for LifecycleController<S> {
    fn drop(&mut self) {
        if self.report.is_none() {
            self.shutdown();
        }
    }
}
