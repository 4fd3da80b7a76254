//! # Settings 模块
//!
//! 用户音量设置快照。宿主每帧把最新的设置传给
//! [`AudioLayerPlayer::update`](crate::AudioLayerPlayer::update)，播放器不读取任何全局状态。

use serde::{Deserialize, Serialize};

/// 用户音量设置（滑块为 0 - 100）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsSnapshot {
    /// 音乐音量
    pub bgm_volume: u32,
    /// 音效音量
    pub se_volume: u32,
    /// 语音音量
    pub voice_volume: u32,
    pub bgm_enabled: bool,
    pub sound_enabled: bool,
    pub voice_enabled: bool,
}

impl Default for SettingsSnapshot {
    fn default() -> Self {
        Self {
            bgm_volume: 100,
            se_volume: 100,
            voice_volume: 100,
            bgm_enabled: true,
            sound_enabled: true,
            voice_enabled: true,
        }
    }
}

impl SettingsSnapshot {
    pub fn with_bgm_volume(mut self, volume: u32) -> Self {
        self.bgm_volume = volume;
        self
    }

    pub fn with_se_volume(mut self, volume: u32) -> Self {
        self.se_volume = volume;
        self
    }

    pub fn with_voice_volume(mut self, volume: u32) -> Self {
        self.voice_volume = volume;
        self
    }
}
