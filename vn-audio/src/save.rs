//! # Save 模块
//!
//! 音频存档数据。
//!
//! ## 设计原则
//!
//! - 只保存音乐层描述，恢复时由 [`AudioLayerPlayer::restore`](crate::AudioLayerPlayer::restore) 重新播放
//! - 音效/语音是一次性的，不进入存档
//! - 必须有版本号，支持向后兼容检测

use serde::{Deserialize, Serialize};

use crate::error::SaveError;
use crate::layer::AudioLayer;

/// 存档格式版本
///
/// - MAJOR: 不兼容的格式变更
/// - MINOR: 向后兼容的新字段
pub const SAVE_VERSION_MAJOR: u32 = 1;
pub const SAVE_VERSION_MINOR: u32 = 0;

/// 存档版本信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveVersion {
    pub major: u32,
    pub minor: u32,
}

impl SaveVersion {
    pub fn current() -> Self {
        Self {
            major: SAVE_VERSION_MAJOR,
            minor: SAVE_VERSION_MINOR,
        }
    }

    /// major 相同即兼容
    pub fn is_compatible(&self) -> bool {
        self.major == SAVE_VERSION_MAJOR
    }
}

impl Default for SaveVersion {
    fn default() -> Self {
        Self::current()
    }
}

impl std::fmt::Display for SaveVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// 音频存档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSaveData {
    #[serde(default)]
    pub version: SaveVersion,
    /// 按层号排列的音乐层描述
    pub layers: Vec<Option<AudioLayer>>,
}

impl AudioSaveData {
    pub fn new(layers: Vec<Option<AudioLayer>>) -> Self {
        Self {
            version: SaveVersion::current(),
            layers,
        }
    }

    /// 正在播放的层数
    pub fn playing_count(&self) -> usize {
        self.layers.iter().flatten().filter(|l| l.playing).count()
    }

    pub fn to_json(&self) -> Result<String, SaveError> {
        serde_json::to_string_pretty(self).map_err(|e| SaveError::SerializationFailed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, SaveError> {
        let data: Self = serde_json::from_str(json)
            .map_err(|e| SaveError::DeserializationFailed(e.to_string()))?;

        if !data.version.is_compatible() {
            return Err(SaveError::IncompatibleVersion {
                save_version: data.version.to_string(),
                current_version: SaveVersion::current().to_string(),
            });
        }

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{PlayRange, RandomPlayback, TickRange};

    #[test]
    fn test_save_roundtrip_keeps_random_layer() {
        let mut wind = AudioLayer::new("wind");
        wind.playing = true;
        wind.custom_data = Some(RandomPlayback::new(
            30,
            TickRange::new(50, 150),
            PlayRange::new(100, 200),
        ));
        let data = AudioSaveData::new(vec![Some(AudioLayer::new("theme")), None, Some(wind)]);

        let json = data.to_json().unwrap();
        assert!(json.contains("\"customData\""));
        let loaded = AudioSaveData::from_json(&json).unwrap();
        assert_eq!(loaded, data);
        assert_eq!(loaded.playing_count(), 1);
    }

    #[test]
    fn test_incompatible_version() {
        let json = r#"{ "version": { "major": 99, "minor": 0 }, "layers": [] }"#;
        assert!(matches!(
            AudioSaveData::from_json(json),
            Err(SaveError::IncompatibleVersion { .. })
        ));
    }

    #[test]
    fn test_missing_version_defaults_to_current() {
        let json = r#"{ "layers": [null, { "name": "rain", "playing": true }] }"#;
        let data = AudioSaveData::from_json(json).unwrap();
        assert_eq!(data.version, SaveVersion::current());
        assert_eq!(data.playing_count(), 1);
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            AudioSaveData::from_json("{"),
            Err(SaveError::DeserializationFailed(_))
        ));
    }
}
