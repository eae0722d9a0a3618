//! 启动配置：计时间隔、刻度像素、提示音文件（可选 JSON 文件，缺省即默认值）

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::counter::MAX_PIXELS_PER_MINUTE;
use crate::error::CounterError;

/// 配置文件名（放在用户配置目录下）
pub const CONFIG_FILENAME: &str = "config.json";

/// 每分钟对应的刻度位移（像素），与刻度尺图案一致
pub const DEFAULT_PIXELS_PER_MINUTE: u32 = 9;

/// 每次刻度移动的间隔：1 分钟
pub const DEFAULT_TICK_MILLIS: u64 = 60_000;

/// 间隔上限：一天
pub const MAX_TICK_MILLIS: u64 = 24 * 60 * 60 * 1000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    pub tick_millis: u64,
    pub pixels_per_minute: u32,
    /// 自定义提示音（.wav / .mp3），为空则使用内置铃声
    pub sound_file: Option<PathBuf>,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            tick_millis: DEFAULT_TICK_MILLIS,
            pixels_per_minute: DEFAULT_PIXELS_PER_MINUTE,
            sound_file: None,
        }
    }
}

/// 应用配置目录
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tomato-counter")
}

/// 提示音等运行时文件的缓存目录
pub fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("tomato-counter")
}

pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILENAME)
}

impl CounterConfig {
    /// 读取并解析配置文件；文件不存在时返回默认值
    pub fn from_file(path: &Path) -> Result<Self, CounterError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        let config: Self = serde_json::from_str(&text).map_err(|source| CounterError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config.sanitized())
    }

    /// 从默认位置加载；出错时记日志并退回默认值
    pub fn load() -> Self {
        let path = config_path();
        match Self::from_file(&path) {
            Ok(config) => {
                log::debug!("Loaded config from {}: {:?}", path.display(), config);
                config
            }
            Err(e) => {
                log::warn!("Ignoring config file: {}", e);
                Self::default()
            }
        }
    }

    /// 零值会导致计时器空转或刻度不动，至少取 1；过大的值截到上限
    fn sanitized(mut self) -> Self {
        self.tick_millis = self.tick_millis.clamp(1, MAX_TICK_MILLIS);
        self.pixels_per_minute = self.pixels_per_minute.clamp(1, MAX_PIXELS_PER_MINUTE);
        self
    }

    pub fn tick_period(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_millis)
    }
}
