//! 触觉回路性能指标
//!
//! 零开销的原子计数器，触觉线程写入，任意线程无锁读取。

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// 触觉回路实时指标
///
/// # 使用示例
///
/// ```rust
/// use haptic_runtime::HapticMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = HapticMetrics::new();
/// metrics.iterations.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(metrics.snapshot().iterations, 1);
/// ```
#[derive(Debug, Default)]
pub struct HapticMetrics {
    /// 完成的回路迭代次数
    pub iterations: AtomicU64,

    /// 读取设备位置/速度失败次数（失败时保留上一次位置）
    pub device_read_errors: AtomicU64,

    /// 下发力失败次数（失败的指令被丢弃）
    pub device_write_errors: AtomicU64,

    /// 工具与至少一个物体接触的迭代次数
    pub contact_iterations: AtomicU64,
}

impl HapticMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    ///
    /// 使用 `Ordering::Relaxed`，不同计数器之间可能有微小的时间差。
    pub fn snapshot(&self) -> HapticMetricsSnapshot {
        HapticMetricsSnapshot {
            iterations: self.iterations.load(Ordering::Relaxed),
            device_read_errors: self.device_read_errors.load(Ordering::Relaxed),
            device_write_errors: self.device_write_errors.load(Ordering::Relaxed),
            contact_iterations: self.contact_iterations.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照（不可变）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HapticMetricsSnapshot {
    pub iterations: u64,
    pub device_read_errors: u64,
    pub device_write_errors: u64,
    pub contact_iterations: u64,
}

impl HapticMetricsSnapshot {
    /// 两次快照之间的回路频率（Hz）
    ///
    /// `elapsed` 为 0 或计数器回退时返回 0.0。
    pub fn rate_since(&self, earlier: &HapticMetricsSnapshot, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        if secs <= 0.0 || self.iterations < earlier.iterations {
            return 0.0;
        }
        (self.iterations - earlier.iterations) as f64 / secs
    }

    /// 设备错误总数
    pub fn device_errors(&self) -> u64 {
        self.device_read_errors + self.device_write_errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot() {
        let metrics = HapticMetrics::new();
        metrics.iterations.fetch_add(10, Ordering::Relaxed);
        metrics.device_read_errors.fetch_add(2, Ordering::Relaxed);
        metrics.device_write_errors.fetch_add(1, Ordering::Relaxed);

        let snap = metrics.snapshot();
        assert_eq!(snap.iterations, 10);
        assert_eq!(snap.device_errors(), 3);
        assert_eq!(HapticMetrics::new().snapshot(), HapticMetricsSnapshot::default());
    }

    #[test]
    fn test_rate_since() {
        let earlier = HapticMetricsSnapshot {
            iterations: 1_000,
            ..Default::default()
        };
        let later = HapticMetricsSnapshot {
            iterations: 3_000,
            ..Default::default()
        };
        let rate = later.rate_since(&earlier, Duration::from_secs(2));
        assert!((rate - 1_000.0).abs() < 1e-9);

        assert_eq!(later.rate_since(&earlier, Duration::ZERO), 0.0);
        assert_eq!(earlier.rate_since(&later, Duration::from_secs(1)), 0.0);
    }
}
