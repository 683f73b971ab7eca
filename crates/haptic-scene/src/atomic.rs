use nalgebra::Vector3;
use std::sync::atomic::{AtomicU64, Ordering};

/// 三维向量的无锁单元
///
/// 每个分量独立存储为 `f64` 位模式。读者可能看到来自相邻两次写入的分量组合，
/// 只适合写入频率远高于读取精度要求的场景（例如物体全局位置）。
#[derive(Debug, Default)]
pub struct AtomicVec3 {
    x: AtomicU64,
    y: AtomicU64,
    z: AtomicU64,
}

impl AtomicVec3 {
    pub fn new(v: Vector3<f64>) -> Self {
        Self {
            x: AtomicU64::new(v.x.to_bits()),
            y: AtomicU64::new(v.y.to_bits()),
            z: AtomicU64::new(v.z.to_bits()),
        }
    }

    pub fn load(&self) -> Vector3<f64> {
        Vector3::new(
            f64::from_bits(self.x.load(Ordering::Acquire)),
            f64::from_bits(self.y.load(Ordering::Acquire)),
            f64::from_bits(self.z.load(Ordering::Acquire)),
        )
    }

    pub fn store(&self, v: Vector3<f64>) {
        self.x.store(v.x.to_bits(), Ordering::Release);
        self.y.store(v.y.to_bits(), Ordering::Release);
        self.z.store(v.z.to_bits(), Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_origin() {
        assert_eq!(AtomicVec3::default().load(), Vector3::zeros());
    }

    #[test]
    fn test_store_then_load() {
        let cell = AtomicVec3::new(Vector3::new(1.0, 2.0, 3.0));
        cell.store(Vector3::new(-0.5, 0.0, 1e-9));
        assert_eq!(cell.load(), Vector3::new(-0.5, 0.0, 1e-9));
    }
}
