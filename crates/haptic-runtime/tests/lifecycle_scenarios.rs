//! 生命周期端到端场景测试
//!
//! 使用 NullHandler / SimulatedHandler 驱动完整的启动 → 运行 → 关闭流程。

use haptic_device::{MotionProfile, NullHandler, OpenBehavior, SimulatedDevice, SimulatedHandler};
use haptic_runtime::*;
use haptic_scene::{HeadlessSurface, InteractableObject, SceneHandle, World};
use serial_test::serial;
use std::thread;
use std::time::{Duration, Instant};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn demo_world() -> World {
    let mut world = World::new();
    world
        .add_object(InteractableObject::sphere("ball", 0.03))
        .unwrap();
    world
}

fn test_config() -> RuntimeConfig {
    let mut config = RuntimeConfig::default();
    config.haptic.realtime_priority = false;
    config.render.sample_every = 1;
    config.shutdown.poll_interval_ms = 10;
    config.shutdown.join_timeout_ms = 1_000;
    config
}

/// 等待条件成立，超时返回 false
fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}

// ============================================================
// Scenario A: 设备缺失 → 纯视觉模式
// ============================================================

#[test]
fn scenario_a_absent_device_renders_until_quit() {
    init_tracing();
    let mut controller = LifecycleController::new(test_config(), demo_world()).unwrap();

    let state = controller.start(&mut NullHandler).unwrap();
    assert_eq!(state, LifecycleState::VisualOnly);
    assert_eq!(controller.capability(), DeviceCapability::Absent);
    assert!(controller.flags().is_running());
    assert!(controller.flags().is_finished());

    let mut render = controller.render_loop().unwrap();
    let mut surface = HeadlessSurface::new(1024, 768, false);
    for _ in 0..500 {
        let outcome = render.on_refresh(&mut surface);
        assert!(outcome.redisplay);
        assert!(outcome.sample.is_none());
        assert!(outcome.advisory.is_none());
    }
    assert_eq!(render.scene().frames_rendered(), 500);
    // 没有触觉线程推进全局状态
    assert_eq!(render.scene().global_updates(), 0);

    let started = Instant::now();
    let report = controller.shutdown();
    assert!(started.elapsed() < Duration::from_millis(100));
    assert_eq!(report.from, LifecycleState::VisualOnly);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.metrics.iterations, 0);
    assert_eq!(controller.state(), LifecycleState::Terminated);

    // 退出后渲染回路停止请求重绘
    assert!(!render.on_refresh(&mut surface).redisplay);
}

// ============================================================
// Scenario B: 端口被占用 → 同样退化，提示不同
// ============================================================

#[test]
fn scenario_b_port_held_degrades_with_distinct_advisory() {
    init_tracing();
    let device = SimulatedDevice::new().with_open_behavior(OpenBehavior::PortHeld);
    let probe = device.probe();
    let mut controller = LifecycleController::new(test_config(), demo_world()).unwrap();

    let state = controller
        .start(&mut SimulatedHandler::new(device))
        .unwrap();
    assert_eq!(state, LifecycleState::VisualOnly);
    assert_eq!(controller.capability(), DeviceCapability::PortConflict);
    assert_eq!(probe.open_calls(), 1);
    assert_eq!(probe.force_commands(), 0);

    let conflict = DeviceFault::from_capability(DeviceCapability::PortConflict).unwrap();
    let absent = DeviceFault::from_capability(DeviceCapability::Absent).unwrap();
    assert_ne!(conflict.advisory(), absent.advisory());

    let report = controller.shutdown();
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.capability, DeviceCapability::PortConflict);
}

// ============================================================
// Scenario C: 设备连接 → 触觉回路在任何采样之前已运行
// ============================================================

#[test]
#[serial]
fn scenario_c_connected_device_starts_haptic_loop() {
    init_tracing();
    let device = SimulatedDevice::new();
    let probe = device.probe();
    let mut controller = LifecycleController::new(test_config(), demo_world()).unwrap();

    let state = controller
        .start(&mut SimulatedHandler::new(device))
        .unwrap();
    assert_eq!(state, LifecycleState::HapticActive);
    assert_eq!(controller.capability(), DeviceCapability::Connected);
    assert_eq!(controller.session().calibration(), CalibrationStatus::Calibrated);

    // 在构造渲染回路（也就是任何诊断采样）之前
    assert!(controller.flags().is_running());
    assert!(!controller.flags().is_finished());

    assert!(wait_until(Duration::from_secs(2), || {
        controller.metrics().iterations > 100
    }));
    assert!(probe.position_reads() > 0);
    assert!(probe.force_commands() > 0);

    let mut render = controller.render_loop().unwrap();
    let mut surface = HeadlessSurface::new(1024, 768, false);
    let sample = render.on_refresh(&mut surface).sample.unwrap();
    // 默认轨迹为半径 0.04 的圆周
    assert!((sample.position.norm() - 0.04).abs() < 1e-3, "{:?}", sample.position);
    assert!(render.scene().global_updates() > 0);

    let report = controller.shutdown();
    assert!(report.is_clean());
}

// ============================================================
// Scenario D: HapticActive 时退出 → 有界时间内 finished，设备关闭
// ============================================================

#[test]
#[serial]
fn scenario_d_quit_while_haptic_active() {
    init_tracing();
    let device = SimulatedDevice::new();
    let probe = device.probe();
    let config = test_config();
    let poll_window = config.shutdown.poll_interval() * 5;
    let mut controller = LifecycleController::new(config, demo_world()).unwrap();
    controller
        .start(&mut SimulatedHandler::new(device))
        .unwrap();
    assert!(wait_until(Duration::from_secs(2), || {
        controller.metrics().iterations > 0
    }));

    let flags = controller.flags().clone();
    let started = Instant::now();
    let report = controller.shutdown();
    let elapsed = started.elapsed();

    assert!(!flags.is_running());
    assert!(flags.is_finished());
    assert!(elapsed < poll_window, "{:?}", elapsed);

    assert_eq!(report.from, LifecycleState::HapticActive);
    assert_eq!(report.outcome, ShutdownOutcome::Clean);
    assert!(report.device_released);
    assert_eq!(report.exit_code(), 0);

    assert!(!probe.is_open());
    assert_eq!(probe.close_calls(), 1);
    assert_eq!(probe.last_force(), nalgebra::Vector3::zeros());
    assert_eq!(controller.state(), LifecycleState::Terminated);
    assert!(controller.scene().is_none());
}

// ============================================================
// Scenario E: 位置持续为零 → 恰好一次提示，回路继续运行
// ============================================================

#[test]
#[serial]
fn scenario_e_stuck_position_emits_one_advisory() {
    init_tracing();
    let device = SimulatedDevice::new().with_motion(MotionProfile::StuckAtZero);
    let mut config = test_config();
    config.render.zero_window_ms = 50;
    let mut controller = LifecycleController::new(config, demo_world()).unwrap();
    controller
        .start(&mut SimulatedHandler::new(device))
        .unwrap();
    assert!(wait_until(Duration::from_secs(2), || {
        controller.tool_state().has_published()
    }));

    let mut render = controller.render_loop().unwrap();
    let mut surface = HeadlessSurface::new(1024, 768, false);
    let mut advisories = Vec::new();
    let started = Instant::now();
    while started.elapsed() < Duration::from_millis(300) {
        let outcome = render.on_refresh(&mut surface);
        assert!(outcome.redisplay);
        if let Some(fault) = outcome.advisory {
            assert!(started.elapsed() >= Duration::from_millis(50));
            advisories.push(fault);
        }
        thread::sleep(Duration::from_millis(5));
    }

    assert_eq!(advisories, vec![DeviceFault::ProtocolMismatch]);
    // 不会自动拆除
    assert_eq!(controller.state(), LifecycleState::HapticActive);
    assert!(controller.flags().is_running());
    assert!(!controller.flags().is_finished());

    assert!(controller.shutdown().is_clean());
}

// ============================================================
// 关闭流程
// ============================================================

#[test]
#[serial]
fn shutdown_is_idempotent() {
    init_tracing();
    let device = SimulatedDevice::new();
    let probe = device.probe();
    let mut controller = LifecycleController::new(test_config(), demo_world()).unwrap();
    controller
        .start(&mut SimulatedHandler::new(device))
        .unwrap();

    let first = controller.shutdown();
    let second = controller.shutdown();
    assert_eq!(first, second);
    assert_eq!(probe.close_calls(), 1);
    drop(controller);
    assert_eq!(probe.close_calls(), 1);
}

#[test]
#[serial]
fn stuck_haptic_thread_times_out() {
    init_tracing();
    let device = SimulatedDevice::new().with_force_latency(Duration::from_millis(600));
    let probe = device.probe();
    let mut config = test_config();
    config.shutdown.join_timeout_ms = 100;
    let mut controller = LifecycleController::new(config, demo_world()).unwrap();
    controller
        .start(&mut SimulatedHandler::new(device))
        .unwrap();

    // 确保线程已进入一次缓慢的 set_force
    thread::sleep(Duration::from_millis(50));
    let started = Instant::now();
    let report = controller.shutdown();
    let elapsed = started.elapsed();

    assert_eq!(
        report.outcome,
        ShutdownOutcome::TimedOut(Duration::from_millis(100))
    );
    assert_eq!(report.exit_code(), 2);
    assert!(!report.device_released);
    assert!(elapsed < Duration::from_millis(400), "{:?}", elapsed);
    // 设备留在分离的线程中，会话不关闭它
    assert_eq!(probe.close_calls(), 0);
    assert_eq!(controller.state(), LifecycleState::Terminated);

    // 分离的线程最终退出时，租出的句柄自行关闭设备
    assert!(wait_until(Duration::from_secs(5), || probe.close_calls() == 1));
    assert!(!probe.is_open());
}

#[test]
fn require_device_fails_when_absent() {
    init_tracing();
    let mut config = test_config();
    config.require_device = true;
    let mut controller = LifecycleController::new(config, demo_world()).unwrap();

    let err = controller.start(&mut NullHandler).unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::DeviceRequired(DeviceCapability::Absent)
    ));
    assert_eq!(controller.state(), LifecycleState::Terminated);
    assert!(!controller.flags().is_running());
}

#[test]
#[serial]
fn require_device_accepts_connected() {
    init_tracing();
    let mut config = test_config();
    config.require_device = true;
    let mut controller = LifecycleController::new(config, demo_world()).unwrap();

    let state = controller
        .start(&mut SimulatedHandler::new(SimulatedDevice::new()))
        .unwrap();
    assert_eq!(state, LifecycleState::HapticActive);
    assert!(controller.shutdown().is_clean());
}

#[test]
#[serial]
fn calibration_failure_still_haptic_active() {
    init_tracing();
    let device = SimulatedDevice::new().with_calibration(false);
    let mut controller = LifecycleController::new(test_config(), demo_world()).unwrap();

    let state = controller
        .start(&mut SimulatedHandler::new(device))
        .unwrap();
    assert_eq!(state, LifecycleState::HapticActive);
    assert_eq!(controller.session().calibration(), CalibrationStatus::Failed);
    assert!(controller.shutdown().is_clean());
}

#[test]
#[serial]
fn contact_forces_reach_device() {
    init_tracing();
    // 工具静止在球面内侧 → 持续接触
    let device = SimulatedDevice::new()
        .with_motion(MotionProfile::Static(nalgebra::Vector3::new(0.03, 0.0, 0.0)));
    let probe = device.probe();
    let mut controller = LifecycleController::new(test_config(), demo_world()).unwrap();
    controller
        .start(&mut SimulatedHandler::new(device))
        .unwrap();

    assert!(wait_until(Duration::from_secs(2), || {
        controller.metrics().contact_iterations > 10
    }));
    assert!(probe.last_force().x > 0.0);

    let report = controller.shutdown();
    assert!(report.metrics.contact_iterations > 10);
    assert_eq!(report.metrics.device_errors(), 0);
}
