//! 空后端：没有任何设备

use crate::{DeviceHandler, HapticDevice};
use tracing::debug;

/// 永远找不到设备的管理器
///
/// 没有可用驱动时的默认后端，宿主程序会退化为纯视觉模式。
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHandler;

impl DeviceHandler for NullHandler {
    fn enumerate_first_device(&mut self) -> Option<Box<dyn HapticDevice>> {
        debug!("NullHandler: no device backend configured");
        None
    }
}
