//! # Error 模块
//!
//! 定义 vn-audio 中使用的错误类型。
//!
//! 播放类调用遵循"守卫即跳过"策略：分类被禁用、名称为空、资源缺失、
//! 尚未解码都不是错误。只有调用方传入了不存在的层号才会返回 `Err`。

use thiserror::Error;

/// 资源错误（由 [`ResourceProvider`](crate::ResourceProvider) 返回）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResourceError {
    /// 资源未找到
    #[error("资源未找到: {path}")]
    NotFound { path: String },

    /// 资源加载失败
    #[error("加载 {kind} 资源失败: {path} - {message}")]
    LoadFailed {
        path: String,
        kind: String,
        message: String,
    },
}

/// 音频播放错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    /// 层号越界
    #[error("无效的音频层 {layer}，有效范围是 0..{max}")]
    LayerOutOfRange { layer: usize, max: usize },

    /// 资源错误
    #[error("资源错误: {0}")]
    Resource(#[from] ResourceError),
}

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO 错误
    #[error("配置 IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 解析失败
    #[error("配置解析失败: {0}")]
    Parse(#[from] serde_json::Error),

    /// 验证失败
    #[error("配置验证失败: {0}")]
    ValidationFailed(String),
}

/// 存档错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SaveError {
    #[error("序列化失败: {0}")]
    SerializationFailed(String),

    #[error("反序列化失败: {0}")]
    DeserializationFailed(String),

    #[error("存档版本不兼容: 存档版本 {save_version}，当前版本 {current_version}")]
    IncompatibleVersion {
        save_version: String,
        current_version: String,
    },
}

/// Result 类型别名
pub type AudioResult<T> = Result<T, AudioError>;
