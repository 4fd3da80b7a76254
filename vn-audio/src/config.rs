//! # Config 模块
//!
//! 音频层运行配置。
//!
//! 所有字段都有默认值，配置文件中缺省的字段使用默认值填充。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::error::ConfigError;

/// 编辑器预览模式的分类禁用开关
///
/// 被禁用的分类上的播放调用静默跳过，不报错。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewFlags {
    #[serde(default)]
    pub music_disabled: bool,
    #[serde(default)]
    pub sound_disabled: bool,
    #[serde(default)]
    pub voice_disabled: bool,
}

/// 音频配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// 音乐层数量
    #[serde(default = "default_layer_count")]
    pub layer_count: usize,

    /// 每帧毫秒数（用于把时长换算为帧）
    #[serde(default = "default_frame_ms")]
    pub frame_ms: f64,

    /// 音乐效果音结束后恢复音乐的淡入帧数
    #[serde(default = "default_music_effect_resume_fade")]
    pub music_effect_resume_fade: u32,

    /// 等待解码的最长帧数，超时的挂起播放会被丢弃
    #[serde(default = "default_decode_timeout_ticks")]
    pub decode_timeout_ticks: u64,

    /// 音乐资源目录（逻辑路径）
    #[serde(default = "default_music_folder")]
    pub music_folder: String,

    /// 音效资源目录
    #[serde(default = "default_sound_folder")]
    pub sound_folder: String,

    /// 语音资源目录
    #[serde(default = "default_voice_folder")]
    pub voice_folder: String,

    /// 预览模式开关（None 表示非预览）
    #[serde(default)]
    pub preview: Option<PreviewFlags>,

    /// 随机数种子（None 表示使用系统熵）
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

// 默认值函数
fn default_layer_count() -> usize {
    10
}

fn default_frame_ms() -> f64 {
    16.6
}

fn default_music_effect_resume_fade() -> u32 {
    40
}

fn default_decode_timeout_ticks() -> u64 {
    600
}

fn default_music_folder() -> String {
    "Audio/Music".to_string()
}

fn default_sound_folder() -> String {
    "Audio/Sounds".to_string()
}

fn default_voice_folder() -> String {
    "Audio/Voices".to_string()
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            layer_count: default_layer_count(),
            frame_ms: default_frame_ms(),
            music_effect_resume_fade: default_music_effect_resume_fade(),
            decode_timeout_ticks: default_decode_timeout_ticks(),
            music_folder: default_music_folder(),
            sound_folder: default_sound_folder(),
            voice_folder: default_voice_folder(),
            preview: None,
            rng_seed: None,
        }
    }
}

impl AudioConfig {
    /// 加载配置文件
    ///
    /// 如果文件不存在或解析失败，返回默认配置并记录警告。
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            warn!(path = ?path, "配置文件不存在，使用默认配置");
            return Self::default();
        }

        match Self::read(path) {
            Ok(config) => {
                info!(path = ?path, "配置文件加载成功");
                config
            }
            Err(e) => {
                warn!(path = ?path, error = %e, "配置文件加载失败，使用默认配置");
                Self::default()
            }
        }
    }

    /// 读取并验证配置文件
    pub fn read(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// 从 JSON 解析并验证
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.layer_count == 0 {
            return Err(ConfigError::ValidationFailed(
                "layer_count 必须至少为 1".to_string(),
            ));
        }

        if self.frame_ms.is_nan() || self.frame_ms <= 0.0 {
            return Err(ConfigError::ValidationFailed(
                "frame_ms 必须大于 0".to_string(),
            ));
        }

        if self.decode_timeout_ticks == 0 {
            return Err(ConfigError::ValidationFailed(
                "decode_timeout_ticks 必须大于 0".to_string(),
            ));
        }

        Ok(())
    }

    /// 毫秒换算为帧
    pub fn ms_to_ticks(&self, ms: f64) -> f64 {
        ms / self.frame_ms
    }

    pub fn music_disabled(&self) -> bool {
        self.preview.is_some_and(|p| p.music_disabled)
    }

    pub fn sound_disabled(&self) -> bool {
        self.preview.is_some_and(|p| p.sound_disabled)
    }

    pub fn voice_disabled(&self) -> bool {
        self.preview.is_some_and(|p| p.voice_disabled)
    }
}

/// 拼接逻辑路径
pub(crate) fn join_logical(folder: &str, name: &str) -> String {
    let folder = folder.trim_end_matches('/');
    if folder.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", folder, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AudioConfig::default();
        assert_eq!(config.layer_count, 10);
        assert_eq!(config.music_effect_resume_fade, 40);
        assert!(config.validate().is_ok());
        assert!(!config.music_disabled());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = AudioConfig::from_json(r#"{ "layer_count": 4, "rng_seed": 7 }"#).unwrap();
        assert_eq!(config.layer_count, 4);
        assert_eq!(config.rng_seed, Some(7));
        assert_eq!(config.music_folder, "Audio/Music");
        assert_eq!(config.frame_ms, 16.6);
    }

    #[test]
    fn test_config_validation() {
        let mut config = AudioConfig::default();

        config.layer_count = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationFailed(_))
        ));

        config.layer_count = 2;
        config.frame_ms = 0.0;
        assert!(config.validate().is_err());

        config.frame_ms = 16.6;
        config.decode_timeout_ticks = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_preview_flags() {
        let config = AudioConfig::from_json(r#"{ "preview": { "voice_disabled": true } }"#).unwrap();
        assert!(config.voice_disabled());
        assert!(!config.sound_disabled());
    }

    #[test]
    fn test_load_missing_file_falls_back() {
        let config = AudioConfig::load("definitely/not/here.json");
        assert_eq!(config, AudioConfig::default());
    }

    #[test]
    fn test_read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio.json");
        std::fs::write(&path, r#"{ "layer_count": 3, "music_folder": "bgm" }"#).unwrap();

        let config = AudioConfig::read(&path).unwrap();
        assert_eq!(config.layer_count, 3);
        assert_eq!(config.music_folder, "bgm");
        assert_eq!(AudioConfig::load(&path), config);
    }

    #[test]
    fn test_load_invalid_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio.json");
        std::fs::write(&path, r#"{ "layer_count": 0 }"#).unwrap();

        assert!(matches!(
            AudioConfig::read(&path),
            Err(ConfigError::ValidationFailed(_))
        ));
        assert_eq!(AudioConfig::load(&path), AudioConfig::default());
    }

    #[test]
    fn test_join_logical() {
        assert_eq!(join_logical("Audio/Music/", "theme"), "Audio/Music/theme");
        assert_eq!(join_logical("", "theme"), "theme");
    }
}
