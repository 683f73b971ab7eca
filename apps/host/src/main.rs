//! # Haptic Host
//!
//! 力反馈宿主程序：触觉回路驱动设备，渲染回路绘制场景。
//! 没有设备时退化为纯视觉模式继续运行。
//!
//! ```bash
//! # 无设备（纯视觉）
//! haptic-host
//!
//! # 软件模拟设备
//! haptic-host --device sim
//!
//! # 必须连接设备，否则退出码 1
//! haptic-host --device sim-busy --require-device
//! ```
//!
//! 按键（stdin）：`q` / ESC 退出，`f` 切换全屏。Ctrl+C 同样退出。
//!
//! 退出码：0 正常退出；1 场景构造失败或缺少必需设备；2 触觉线程未能在超时内停止。

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use crossbeam_channel::Receiver;
use haptic_device::{
    DeviceHandler, MotionProfile, NullHandler, OpenBehavior, SimulatedDevice, SimulatedHandler,
};
use haptic_runtime::{LifecycleController, LifecycleError};
use haptic_scene::{HeadlessSurface, Surface, World};
use spin_sleep::SpinSleeper;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod input;
mod scene;

use input::HostEvent;

const EXIT_FAILURE: u8 = 1;

/// 设备后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DeviceBackend {
    /// 没有设备驱动（纯视觉）
    None,
    /// 模拟设备，圆周运动
    Sim,
    /// 模拟设备，位置通道卡在原点
    SimStuck,
    /// 模拟设备，端口被其他进程占用
    SimBusy,
    /// 模拟设备，打开失败
    SimBroken,
}

impl DeviceBackend {
    fn handler(self) -> Box<dyn DeviceHandler> {
        match self {
            DeviceBackend::None => Box::new(NullHandler),
            DeviceBackend::Sim => Box::new(SimulatedHandler::new(SimulatedDevice::new())),
            DeviceBackend::SimStuck => Box::new(SimulatedHandler::new(
                SimulatedDevice::new().with_motion(MotionProfile::StuckAtZero),
            )),
            DeviceBackend::SimBusy => Box::new(SimulatedHandler::new(
                SimulatedDevice::new().with_open_behavior(OpenBehavior::PortHeld),
            )),
            DeviceBackend::SimBroken => Box::new(SimulatedHandler::new(
                SimulatedDevice::new().with_open_behavior(OpenBehavior::Fail),
            )),
        }
    }
}

/// Haptic Host - 力反馈宿主程序
#[derive(Parser, Debug)]
#[command(name = "haptic-host")]
#[command(about = "Force-feedback host with visual-only fallback", long_about = None)]
#[command(version)]
struct Cli {
    /// 窗口宽度
    #[arg(long)]
    width: Option<u32>,

    /// 窗口高度
    #[arg(long)]
    height: Option<u32>,

    /// 全屏启动
    #[arg(long)]
    fullscreen: bool,

    /// 必须连接设备（否则以退出码 1 结束）
    #[arg(long)]
    require_device: bool,

    /// 设备后端
    #[arg(long, value_enum, default_value_t = DeviceBackend::None)]
    device: DeviceBackend,

    /// 配置文件路径（默认 ~/.config/haptic-host/config.toml）
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("haptic_host=info,haptic_runtime=info")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_FAILURE)
        },
    }
}

fn run(cli: Cli) -> Result<u8> {
    info!("haptic-host {}", env!("CARGO_PKG_VERSION"));

    let mut config = config::load(cli.config.as_deref())?;
    config::Overrides {
        width: cli.width,
        height: cli.height,
        fullscreen: cli.fullscreen,
        require_device: cli.require_device,
    }
    .apply(&mut config);

    let world = scene::build_demo_world().context("Failed to construct scene")?;
    let mut controller = LifecycleController::new(config, world)?;

    let mut handler = cli.device.handler();
    match controller.start(&mut handler) {
        Ok(state) => info!(?state, capability = ?controller.capability(), "Started"),
        Err(LifecycleError::DeviceRequired(capability)) => {
            error!(?capability, "Haptic device required but not connected");
            return Ok(EXIT_FAILURE);
        },
        Err(e) => return Err(e.into()),
    }

    let events = input::spawn_event_sources()?;
    run_render_loop(&controller, &events);

    let report = controller.shutdown();
    if let Err(e) = report.outcome.into_result() {
        error!("{}", e);
    }
    Ok(report.exit_code() as u8)
}

/// 主线程渲染回路：按 `refresh_hz` 节拍刷新，直到收到退出事件
fn run_render_loop(controller: &LifecycleController<World>, events: &Receiver<HostEvent>) {
    let Some(mut render) = controller.render_loop() else {
        return;
    };
    let config = controller.config();
    let window = &config.window;
    let mut surface = HeadlessSurface::new(window.width, window.height, window.fullscreen);
    let frame_period = config.render.frame_period();
    let sleeper = SpinSleeper::default();

    info!(
        width = window.width,
        height = window.height,
        fullscreen = surface.is_fullscreen(),
        "Render loop running (q/ESC to quit, f to toggle fullscreen)"
    );

    'frames: loop {
        let started = Instant::now();

        for event in events.try_iter() {
            match event {
                HostEvent::Quit => {
                    info!("Quit requested");
                    break 'frames;
                },
                HostEvent::ToggleFullscreen => {
                    render.toggle_fullscreen(&mut surface);
                },
            }
        }

        if !render.on_refresh(&mut surface).redisplay {
            break;
        }

        let elapsed = started.elapsed();
        if elapsed < frame_period {
            sleeper.sleep(frame_period - elapsed);
        }
    }

    info!(frames = render.frames(), size = ?surface.size(), "Render loop stopped");
}
