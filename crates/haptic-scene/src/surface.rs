//! 帧呈现（窗口系统协作方）

use tracing::info;

/// 呈现表面
///
/// 对应窗口系统的双缓冲交换、尺寸变化和全屏切换。
pub trait Surface {
    /// 交换前后缓冲
    fn present(&mut self);

    fn resize(&mut self, width: u32, height: u32);

    /// 切换全屏，返回切换后的状态
    fn toggle_fullscreen(&mut self) -> bool;

    fn size(&self) -> (u32, u32);
}

/// 无窗口表面：只记录呈现次数和尺寸
#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    width: u32,
    height: u32,
    fullscreen: bool,
    presented: u64,
}

impl HeadlessSurface {
    pub fn new(width: u32, height: u32, fullscreen: bool) -> Self {
        Self {
            width,
            height,
            fullscreen,
            presented: 0,
        }
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }
}

impl Surface for HeadlessSurface {
    fn present(&mut self) {
        self.presented += 1;
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn toggle_fullscreen(&mut self) -> bool {
        self.fullscreen = !self.fullscreen;
        info!(fullscreen = self.fullscreen, "fullscreen toggled");
        self.fullscreen
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_surface() {
        let mut surface = HeadlessSurface::new(1024, 768, false);
        surface.present();
        surface.present();
        assert_eq!(surface.presented(), 2);

        assert!(surface.toggle_fullscreen());
        assert!(!surface.toggle_fullscreen());

        surface.resize(640, 480);
        assert_eq!(surface.size(), (640, 480));
    }
}
