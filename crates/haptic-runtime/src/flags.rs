//! 回路生命周期标志
//!
//! - `running`：由 `LifecycleController` 设置，触觉回路在每次迭代开始时读取
//! - `finished`：触觉回路退出时写入一次，关闭流程通过条件变量有界等待

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// `running` / `finished` 标志对
///
/// `finished` 初始为 true：从未启动的触觉回路不会阻塞关闭流程。
#[derive(Debug)]
pub struct LoopFlags {
    running: AtomicBool,
    finished: Mutex<bool>,
    finished_cv: Condvar,
}

impl LoopFlags {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            finished: Mutex::new(true),
            finished_cv: Condvar::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        // Acquire: 看到 false 时也能看到停止前的全部写入
        self.running.load(Ordering::Acquire)
    }

    pub fn is_finished(&self) -> bool {
        *self.finished.lock()
    }

    /// 为即将启动的触觉回路布置标志：先清 `finished`，再置 `running`
    pub(crate) fn arm(&self) {
        *self.finished.lock() = false;
        self.running.store(true, Ordering::Release);
    }

    /// 纯视觉模式只置 `running`，`finished` 保持 true
    pub(crate) fn start_visual_only(&self) {
        self.running.store(true, Ordering::Release);
    }

    pub(crate) fn request_stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// 回路启动失败时回滚 `arm()`
    pub(crate) fn disarm(&self) {
        self.request_stop();
        self.mark_finished();
    }

    fn mark_finished(&self) {
        let mut finished = self.finished.lock();
        *finished = true;
        self.finished_cv.notify_all();
    }

    /// 有界等待 `finished`
    ///
    /// 每个 `poll_interval` 醒来一次重新检查，总时长不超过 `timeout`。
    /// 返回是否观察到 `finished == true`。
    pub fn wait_finished(&self, poll_interval: Duration, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut finished = self.finished.lock();
        while !*finished {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let slice = poll_interval.min(deadline - now);
            let _ = self.finished_cv.wait_for(&mut finished, slice);
        }
        true
    }

    /// 由触觉线程持有的守卫：drop 时写入 `finished`（包括 panic 展开路径）
    pub(crate) fn finish_guard(&self) -> FinishGuard<'_> {
        FinishGuard { flags: self }
    }
}

impl Default for LoopFlags {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct FinishGuard<'a> {
    flags: &'a LoopFlags,
}

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        self.flags.mark_finished();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_initial_state_never_blocks() {
        let flags = LoopFlags::new();
        assert!(!flags.is_running());
        assert!(flags.is_finished());
        // 从未启动：立即返回
        let start = Instant::now();
        assert!(flags.wait_finished(Duration::from_millis(100), Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn test_arm_and_guard() {
        let flags = LoopFlags::new();
        flags.arm();
        assert!(flags.is_running());
        assert!(!flags.is_finished());

        {
            let _guard = flags.finish_guard();
        }
        assert!(flags.is_finished());
    }

    #[test]
    fn test_visual_only_keeps_finished() {
        let flags = LoopFlags::new();
        flags.start_visual_only();
        assert!(flags.is_running());
        assert!(flags.is_finished());
    }

    #[test]
    fn test_wait_finished_times_out() {
        let flags = LoopFlags::new();
        flags.arm();
        let start = Instant::now();
        assert!(!flags.wait_finished(Duration::from_millis(10), Duration::from_millis(60)));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(60), "{:?}", elapsed);
        assert!(elapsed < Duration::from_secs(1), "{:?}", elapsed);
    }

    #[test]
    fn test_wait_finished_wakes_on_guard_drop() {
        let flags = Arc::new(LoopFlags::new());
        flags.arm();

        let worker_flags = flags.clone();
        let worker = thread::spawn(move || {
            let _guard = worker_flags.finish_guard();
            while worker_flags.is_running() {
                std::hint::spin_loop();
            }
        });

        thread::sleep(Duration::from_millis(20));
        flags.request_stop();
        assert!(flags.wait_finished(Duration::from_millis(100), Duration::from_secs(2)));
        worker.join().unwrap();
    }

    #[test]
    fn test_guard_sets_finished_on_panic() {
        let flags = Arc::new(LoopFlags::new());
        flags.arm();
        let worker_flags = flags.clone();
        let result = thread::spawn(move || {
            let _guard = worker_flags.finish_guard();
            panic!("tool exploded");
        })
        .join();
        assert!(result.is_err());
        assert!(flags.is_finished());
    }

    #[test]
    fn test_disarm_rolls_back() {
        let flags = LoopFlags::new();
        flags.arm();
        flags.disarm();
        assert!(!flags.is_running());
        assert!(flags.is_finished());
    }
}
