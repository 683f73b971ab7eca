//! 工具位置共享单元
//!
//! 触觉线程每次迭代写入，渲染回路无锁读取。使用序列锁（seqlock）：
//! 写者在写入前后各递增一次序号，读者看到奇数或前后序号不一致时重试。
//! 写者永不等待；读者重试次数有上限，超过上限返回 `None`（本帧跳过采样）。

use nalgebra::Vector3;
use std::sync::atomic::{AtomicU64, Ordering, fence};

const MAX_READ_RETRIES: usize = 64;

/// 工具状态快照
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolSnapshot {
    /// 工具在场景中的全局位置（m）
    pub position: Vector3<f64>,
    /// 最近一次作用到设备的力（N）
    pub force: Vector3<f64>,
    /// 发布时的迭代序号
    pub iteration: u64,
}

/// 工具状态共享单元（单写者）
#[derive(Debug, Default)]
pub struct SharedToolState {
    seq: AtomicU64,
    position: [AtomicU64; 3],
    force: [AtomicU64; 3],
    iteration: AtomicU64,
}

impl SharedToolState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 发布新快照（仅触觉线程调用）
    pub(crate) fn publish(&self, position: &Vector3<f64>, force: &Vector3<f64>, iteration: u64) {
        let seq = self.seq.load(Ordering::Relaxed);
        self.seq.store(seq.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);

        for (cell, value) in self.position.iter().zip(position.iter()) {
            cell.store(value.to_bits(), Ordering::Relaxed);
        }
        for (cell, value) in self.force.iter().zip(force.iter()) {
            cell.store(value.to_bits(), Ordering::Relaxed);
        }
        self.iteration.store(iteration, Ordering::Relaxed);

        self.seq.store(seq.wrapping_add(2), Ordering::Release);
    }

    /// 读取一致快照；写者持续写入导致多次重试失败时返回 `None`
    pub fn snapshot(&self) -> Option<ToolSnapshot> {
        for _ in 0..MAX_READ_RETRIES {
            let before = self.seq.load(Ordering::Acquire);
            if before % 2 == 1 {
                std::hint::spin_loop();
                continue;
            }

            let position = load_vec(&self.position);
            let force = load_vec(&self.force);
            let iteration = self.iteration.load(Ordering::Relaxed);

            fence(Ordering::Acquire);
            if self.seq.load(Ordering::Relaxed) == before {
                return Some(ToolSnapshot {
                    position,
                    force,
                    iteration,
                });
            }
        }
        None
    }

    /// 是否已至少发布过一次
    pub fn has_published(&self) -> bool {
        self.seq.load(Ordering::Acquire) != 0
    }
}

fn load_vec(cells: &[AtomicU64; 3]) -> Vector3<f64> {
    Vector3::new(
        f64::from_bits(cells[0].load(Ordering::Relaxed)),
        f64::from_bits(cells[1].load(Ordering::Relaxed)),
        f64::from_bits(cells[2].load(Ordering::Relaxed)),
    )
}
