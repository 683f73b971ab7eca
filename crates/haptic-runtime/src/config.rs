//! 运行时配置
//!
//! 所有字段都有默认值，配置文件只需写出要覆盖的项。时间类字段统一使用整数毫秒。
//!
//! ```toml
//! require_device = false
//!
//! [haptic]
//! tool_radius = 0.005
//! workspace_radius = 0.15
//!
//! [render]
//! refresh_hz = 60.0
//! sample_every = 60
//!
//! [shutdown]
//! join_timeout_ms = 2000
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 运行时总配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// 必须连接设备：探测失败时以非零退出码结束，而不是退化为纯视觉模式
    pub require_device: bool,
    pub window: WindowConfig,
    pub haptic: HapticConfig,
    pub render: RenderConfig,
    pub shutdown: ShutdownConfig,
}

impl RuntimeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.window.validate()?;
        self.haptic.validate()?;
        self.render.validate()?;
        self.shutdown.validate()
    }
}

/// 窗口配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            fullscreen: false,
        }
    }
}

impl WindowConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// 触觉回路配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HapticConfig {
    /// 工具光标球半径（m）
    pub tool_radius: f64,
    /// 设备工作空间映射到场景中的半径（m）
    pub workspace_radius: f64,
    /// 可选的频率上限（Hz），`None` 表示不限速
    pub rate_limit_hz: Option<f64>,
    /// 请求实时线程优先级（需要 `realtime` feature）
    pub realtime_priority: bool,
}

impl Default for HapticConfig {
    fn default() -> Self {
        Self {
            tool_radius: 0.005,
            workspace_radius: 0.15,
            rate_limit_hz: None,
            realtime_priority: true,
        }
    }
}

impl HapticConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tool_radius > 0.0 && self.tool_radius.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "haptic.tool_radius must be > 0, got {}",
                self.tool_radius
            )));
        }
        if !(self.workspace_radius > 0.0 && self.workspace_radius.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "haptic.workspace_radius must be > 0, got {}",
                self.workspace_radius
            )));
        }
        if let Some(hz) = self.rate_limit_hz
            && !(hz >= 1000.0 && hz.is_finite())
        {
            return Err(ConfigError::Invalid(format!(
                "haptic.rate_limit_hz must be >= 1000, got {hz}"
            )));
        }
        Ok(())
    }

    /// 限速时的标称周期
    pub fn period(&self) -> Option<Duration> {
        self.rate_limit_hz.map(|hz| Duration::from_secs_f64(1.0 / hz))
    }
}

/// 渲染回路配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// 刷新频率（Hz）
    pub refresh_hz: f64,
    /// 每 N 帧采样一次工具位置
    pub sample_every: u32,
    /// 判定"零位置"的模长阈值（m）
    pub zero_epsilon: f64,
    /// 零位置持续多久后发出提示（毫秒）
    pub zero_window_ms: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            refresh_hz: 60.0,
            sample_every: 60,
            zero_epsilon: 1e-6,
            zero_window_ms: 5_000,
        }
    }
}

impl RenderConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.refresh_hz > 0.0 && self.refresh_hz.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "render.refresh_hz must be > 0, got {}",
                self.refresh_hz
            )));
        }
        if self.sample_every == 0 {
            return Err(ConfigError::Invalid(
                "render.sample_every must be >= 1".to_string(),
            ));
        }
        if !(self.zero_epsilon >= 0.0 && self.zero_epsilon.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "render.zero_epsilon must be >= 0, got {}",
                self.zero_epsilon
            )));
        }
        Ok(())
    }

    pub fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.refresh_hz)
    }

    pub fn zero_window(&self) -> Duration {
        Duration::from_millis(self.zero_window_ms)
    }
}

/// 关闭流程配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// 等待 `finished` 的轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 等待触觉线程退出的总超时（毫秒）
    pub join_timeout_ms: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            join_timeout_ms: 2_000,
        }
    }
}

impl ShutdownConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "shutdown.poll_interval_ms must be >= 1".to_string(),
            ));
        }
        if self.join_timeout_ms < self.poll_interval_ms {
            return Err(ConfigError::Invalid(format!(
                "shutdown.join_timeout_ms ({}) must be >= poll_interval_ms ({})",
                self.join_timeout_ms, self.poll_interval_ms
            )));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}
