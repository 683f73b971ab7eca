//! 配置文件加载
//!
//! 优先级：命令行参数 > `--config PATH` > `~/.config/haptic-host/config.toml` > 默认值

use anyhow::{Context, Result};
use haptic_runtime::RuntimeConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 默认配置文件路径
pub fn default_config_file() -> Option<PathBuf> {
    let mut path = dirs::config_dir()?;
    path.push("haptic-host");
    path.push("config.toml");
    Some(path)
}

/// 加载运行时配置
///
/// 显式指定的文件必须存在；默认位置的文件不存在时使用默认配置。
pub fn load(explicit: Option<&Path>) -> Result<RuntimeConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_file() {
            Some(path) if path.exists() => path,
            _ => {
                debug!("No config file found, using defaults");
                return Ok(RuntimeConfig::default());
            },
        },
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: RuntimeConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    info!(path = %path.display(), "Loaded config file");
    Ok(config)
}

/// 命令行覆盖项
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fullscreen: bool,
    pub require_device: bool,
}

impl Overrides {
    pub fn apply(&self, config: &mut RuntimeConfig) {
        if let Some(width) = self.width {
            config.window.width = width;
        }
        if let Some(height) = self.height {
            config.window.height = height;
        }
        if self.fullscreen {
            config.window.fullscreen = true;
        }
        if self.require_device {
            config.require_device = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_explicit_missing_file_is_error() {
        let err = load(Some(Path::new("/nonexistent/haptic-host.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "require_device = true\n[window]\nwidth = 800").unwrap();

        let config = load(Some(file.path())).unwrap();
        assert!(config.require_device);
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 768);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "require_device = \"maybe\"").unwrap();
        let err = load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_overrides() {
        let mut config = RuntimeConfig::default();
        Overrides {
            width: Some(1920),
            height: None,
            fullscreen: true,
            require_device: false,
        }
        .apply(&mut config);
        assert_eq!(config.window.width, 1920);
        assert_eq!(config.window.height, 768);
        assert!(config.window.fullscreen);
        assert!(!config.require_device);
    }
}
