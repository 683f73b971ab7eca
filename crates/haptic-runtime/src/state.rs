//! 设备能力与生命周期状态定义

use std::sync::atomic::{AtomicU8, Ordering};

/// 设备能力（探测结果）
///
/// 启动时确定一次，会话期间不可变。决定是否创建工具和触觉线程。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceCapability {
    /// 未找到设备
    Absent,
    /// 端口被其他进程独占（控制流上等同失败，提示文本不同）
    PortConflict,
    /// 打开失败
    OpenFailed,
    /// 已打开，可以输出力
    Connected,
}

impl DeviceCapability {
    pub fn is_connected(self) -> bool {
        self == DeviceCapability::Connected
    }
}

/// 生命周期状态
///
/// ```text
/// Init → DeviceProbing → {VisualOnly | HapticActive} → ShuttingDown → Terminated
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum LifecycleState {
    /// 场景已构造，尚未探测设备
    #[default]
    Init = 0,
    DeviceProbing = 1,
    /// 纯视觉模式：无工具、无触觉线程
    VisualOnly = 2,
    /// 触觉线程运行中
    HapticActive = 3,
    ShuttingDown = 4,
    Terminated = 5,
}

impl LifecycleState {
    /// 从 u8 转换
    ///
    /// 如果值无效，返回 Terminated（最保守的解释）。
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Init,
            1 => Self::DeviceProbing,
            2 => Self::VisualOnly,
            3 => Self::HapticActive,
            4 => Self::ShuttingDown,
            _ => Self::Terminated,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// 是否允许转换到 `next`
    ///
    /// `Init`/`DeviceProbing → ShuttingDown` 是中止路径：启动前收到退出信号，
    /// 或要求设备但探测失败。
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Init, DeviceProbing)
                | (Init, ShuttingDown)
                | (DeviceProbing, VisualOnly)
                | (DeviceProbing, HapticActive)
                | (DeviceProbing, ShuttingDown)
                | (VisualOnly, ShuttingDown)
                | (HapticActive, ShuttingDown)
                | (ShuttingDown, Terminated)
        )
    }

    /// 两个运行态之一
    pub fn is_running(self) -> bool {
        matches!(self, Self::VisualOnly | Self::HapticActive)
    }
}

/// 生命周期状态（原子版本，用于线程间共享）
#[derive(Debug)]
pub struct AtomicLifecycleState {
    inner: AtomicU8,
}

impl AtomicLifecycleState {
    pub fn new(state: LifecycleState) -> Self {
        Self {
            inner: AtomicU8::new(state.as_u8()),
        }
    }

    pub fn get(&self) -> LifecycleState {
        LifecycleState::from_u8(self.inner.load(Ordering::Acquire))
    }

    /// 按状态机规则转换
    ///
    /// 当前状态不等于 `from` 或转换不合法时返回 `Err(当前状态)`。
    pub fn transition(
        &self,
        from: LifecycleState,
        to: LifecycleState,
    ) -> Result<(), LifecycleState> {
        if !from.can_transition_to(to) {
            return Err(self.get());
        }
        self.inner
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(LifecycleState::from_u8)
    }
}

impl Default for AtomicLifecycleState {
    fn default() -> Self {
        Self::new(LifecycleState::Init)
    }
}
