//! 触觉回路
//!
//! 专用线程上的高频控制回路。每次迭代严格按顺序执行：
//!
//! 1. `scene.advance_global_state()`
//! 2. `tool.update_from_device()`
//! 3. `tool.compute_interaction_forces()`
//! 4. `tool.apply_to_device()`
//!
//! `running` 只在迭代开始时检查，迭代一旦开始，四步全部完成。
//! 回路退出时 `finished` 恰好写入一次（包括 panic 展开路径）。

use crate::flags::LoopFlags;
use crate::metrics::HapticMetrics;
use crate::tool::HapticTool;
use crate::tool_state::SharedToolState;
use haptic_scene::SceneHandle;
use spin_sleep::SpinSleeper;
use std::io;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// 触觉回路
pub struct HapticLoop<S: SceneHandle + ?Sized, T: HapticTool> {
    scene: Arc<S>,
    tool: T,
    flags: Arc<LoopFlags>,
    shared: Arc<SharedToolState>,
    metrics: Arc<HapticMetrics>,
    period: Option<Duration>,
    realtime_priority: bool,
}

impl<S, T> HapticLoop<S, T>
where
    S: SceneHandle + ?Sized,
    T: HapticTool,
{
    pub fn new(
        scene: Arc<S>,
        tool: T,
        flags: Arc<LoopFlags>,
        shared: Arc<SharedToolState>,
        metrics: Arc<HapticMetrics>,
    ) -> Self {
        Self {
            scene,
            tool,
            flags,
            shared,
            metrics,
            period: None,
            realtime_priority: false,
        }
    }

    /// 限制回路频率（`None` 表示不限速）
    pub fn with_period(mut self, period: Option<Duration>) -> Self {
        self.period = period;
        self
    }

    /// 请求实时线程优先级（需要 `realtime` feature，否则忽略）
    pub fn with_realtime_priority(mut self, enabled: bool) -> Self {
        self.realtime_priority = enabled;
        self
    }

    /// 在当前线程上运行回路，直到 `running` 变为 false
    ///
    /// 返回工具，供调用方收回设备句柄。
    pub fn run(self) -> T {
        let HapticLoop {
            scene,
            mut tool,
            flags,
            shared,
            metrics,
            period,
            realtime_priority,
        } = self;

        let _finished = flags.finish_guard();

        if realtime_priority {
            set_realtime_priority();
        }

        let sleeper = SpinSleeper::default();
        let mut iteration: u64 = 0;
        debug!(?period, "Haptic loop entering hot path");

        loop {
            // Acquire: If we see false, we must see all cleanup writes from other threads
            if !flags.is_running() {
                trace!("Haptic loop: running flag is false, exiting");
                break;
            }
            let started = Instant::now();

            scene.advance_global_state();

            if tool.update_from_device().is_err() {
                metrics.device_read_errors.fetch_add(1, Ordering::Relaxed);
            }

            if tool.compute_interaction_forces() {
                metrics.contact_iterations.fetch_add(1, Ordering::Relaxed);
            }

            if tool.apply_to_device().is_err() {
                metrics.device_write_errors.fetch_add(1, Ordering::Relaxed);
            }

            iteration += 1;
            shared.publish(&tool.global_position(), &tool.force(), iteration);
            metrics.iterations.fetch_add(1, Ordering::Relaxed);

            if let Some(period) = period {
                let elapsed = started.elapsed();
                if elapsed < period {
                    sleeper.sleep(period - elapsed);
                }
            }
        }

        info!(iterations = iteration, "Haptic loop stopped");
        tool
    }
}

impl<S, T> HapticLoop<S, T>
where
    S: SceneHandle + ?Sized + 'static,
    T: HapticTool + 'static,
{
    /// 在名为 `haptic-loop` 的专用线程上运行
    pub fn spawn(self) -> io::Result<JoinHandle<T>> {
        thread::Builder::new()
            .name("haptic-loop".into())
            .spawn(move || self.run())
    }
}

#[cfg(feature = "realtime")]
fn set_realtime_priority() {
    use thread_priority::*;
    use tracing::warn;

    match set_current_thread_priority(ThreadPriority::Max) {
        Ok(_) => {
            info!("Haptic thread priority set to MAX (realtime)");
        },
        Err(e) => {
            warn!(
                "Failed to set haptic thread priority: {:?}. \
                On Linux, you may need to run with CAP_SYS_NICE or use rtkit.",
                e
            );
        },
    }
}

#[cfg(not(feature = "realtime"))]
fn set_realtime_priority() {
    debug!("Realtime priority requested but the `realtime` feature is disabled");
}
