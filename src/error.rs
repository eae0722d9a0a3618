//! 错误类型：资源加载失败、提示音失败、配置错误

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CounterError {
    /// 启动时资源（提示音文件等）加载失败，界面降级继续运行
    #[error("无法加载资源 {resource}: {source}")]
    ResourceLoad {
        resource: String,
        #[source]
        source: std::io::Error,
    },

    /// 当前平台播放器不支持的声音格式
    #[error("不支持的声音格式: {}", path.display())]
    UnsupportedSound { path: PathBuf },

    /// 倒计时结束时播放提示音失败
    #[error("提示音播放失败: {0}")]
    Signal(#[source] std::io::Error),

    #[error("配置文件 {} 格式错误: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CounterError {
    pub fn resource_load(resource: impl Into<String>, source: std::io::Error) -> Self {
        Self::ResourceLoad {
            resource: resource.into(),
            source,
        }
    }
}
