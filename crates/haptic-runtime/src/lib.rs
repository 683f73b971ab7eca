//! # Haptic Runtime
//!
//! 双回路运行时：高频触觉回路 + 低频渲染回路，以及围绕力反馈设备的启动/关闭状态机。
//!
//! ## 架构
//!
//! ```text
//! LifecycleController
//!   ├─ DeviceSession ──lease──▶ ToolCursor ──▶ HapticLoop (专用线程)
//!   │                                              │ publish
//!   │                                              ▼
//!   │                                        SharedToolState
//!   │                                              │ snapshot
//!   └─ RenderLoop (主线程) ◀───────────────────────┘
//! ```
//!
//! - 设备缺失、端口被占用、打开失败都会退化为纯视觉模式，不会终止进程
//! - 两个回路之间只通过原子量共享状态（`LoopFlags`、`SharedToolState`、`HapticMetrics`）
//! - 关闭时有界等待触觉线程退出，超时返回 [`ShutdownOutcome::TimedOut`]
//!
//! ## 使用示例
//!
//! ```rust,no_run
//! use haptic_device::NullHandler;
//! use haptic_runtime::{LifecycleController, RuntimeConfig};
//! use haptic_scene::{HeadlessSurface, World};
//!
//! let mut controller = LifecycleController::new(RuntimeConfig::default(), World::new())?;
//! controller.start(&mut NullHandler)?;
//!
//! let mut surface = HeadlessSurface::new(1024, 768, false);
//! if let Some(mut render) = controller.render_loop() {
//!     for _ in 0..60 {
//!         render.on_refresh(&mut surface);
//!     }
//! }
//!
//! let report = controller.shutdown();
//! std::process::exit(report.exit_code());
//! # Ok::<(), haptic_runtime::LifecycleError>(())
//! ```

pub mod config;
mod error;
mod flags;
mod haptic_loop;
mod lifecycle;
mod metrics;
mod render_loop;
mod session;
mod state;
mod tool;
mod tool_state;

pub use config::{HapticConfig, RenderConfig, RuntimeConfig, ShutdownConfig, WindowConfig};
pub use error::{ConfigError, DeviceFault, LifecycleError, ShutdownError};
pub use flags::LoopFlags;
pub use haptic_loop::HapticLoop;
pub use lifecycle::{LifecycleController, ShutdownOutcome, ShutdownReport};
pub use metrics::{HapticMetrics, HapticMetricsSnapshot};
pub use render_loop::{FrameOutcome, RenderLoop, ToolSample, ZeroPositionDetector};
pub use session::{CalibrationStatus, DeviceSession, Detection};
pub use state::{AtomicLifecycleState, DeviceCapability, LifecycleState};
pub use tool::{HapticTool, ToolCursor};
pub use tool_state::{SharedToolState, ToolSnapshot};
