//! 输入事件
//!
//! 专用输入线程读取 stdin 按键，Ctrl+C 处理器发送退出事件，
//! 两者都通过 crossbeam 通道送到渲染上下文（主线程）。

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::io::{self, Read};
use std::thread;
use tracing::{debug, warn};

const KEY_ESCAPE: u8 = 0x1b;

/// 宿主事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    Quit,
    ToggleFullscreen,
}

/// 按键映射：`q` / ESC 退出，`f` 切换全屏
pub fn key_event(key: u8) -> Option<HostEvent> {
    match key {
        b'q' | b'Q' | KEY_ESCAPE => Some(HostEvent::Quit),
        b'f' | b'F' => Some(HostEvent::ToggleFullscreen),
        _ => None,
    }
}

/// 启动输入线程并注册 Ctrl+C 处理器
pub fn spawn_event_sources() -> Result<Receiver<HostEvent>> {
    let (tx, rx) = unbounded();

    let signal_tx = tx.clone();
    ctrlc::set_handler(move || {
        let _ = signal_tx.send(HostEvent::Quit);
    })
    .context("Failed to install Ctrl+C handler")?;

    thread::Builder::new()
        .name("key-input".into())
        .spawn(move || read_keys(io::stdin().lock(), &tx))
        .context("Failed to spawn key input thread")?;

    Ok(rx)
}

/// 读取按键直到 EOF 或接收端关闭
///
/// EOF 只结束按键读取，不触发退出（Ctrl+C 仍然有效）。
pub fn read_keys(reader: impl Read, tx: &Sender<HostEvent>) {
    for byte in reader.bytes() {
        let key = match byte {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "Key input failed, ignoring further keys");
                return;
            },
        };
        if let Some(event) = key_event(key)
            && tx.send(event).is_err()
        {
            return;
        }
    }
    debug!("Key input reached EOF");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping() {
        assert_eq!(key_event(b'q'), Some(HostEvent::Quit));
        assert_eq!(key_event(0x1b), Some(HostEvent::Quit));
        assert_eq!(key_event(b'f'), Some(HostEvent::ToggleFullscreen));
        assert_eq!(key_event(b'x'), None);
        assert_eq!(key_event(b'\n'), None);
    }

    #[test]
    fn test_read_keys_forwards_events_in_order() {
        let (tx, rx) = unbounded();
        read_keys(&b"f\nxq\n"[..], &tx);
        let events: Vec<HostEvent> = rx.try_iter().collect();
        assert_eq!(events, vec![HostEvent::ToggleFullscreen, HostEvent::Quit]);
    }

    #[test]
    fn test_read_keys_stops_when_receiver_dropped() {
        let (tx, rx) = unbounded();
        drop(rx);
        // 不应 panic 或阻塞
        read_keys(&b"qqqq"[..], &tx);
    }
}
