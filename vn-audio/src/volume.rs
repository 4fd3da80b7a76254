//! # Volume 模块
//!
//! 分类音量计算：最终增益 = 调用音量 × 分类总音量。

use crate::settings::SettingsSnapshot;

/// 未指定音量时使用的调用音量
pub const DEFAULT_VOLUME: u32 = 100;

/// 未指定速率时使用的播放速率（百分比）
pub const DEFAULT_RATE: u32 = 100;

/// 音频分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Music,
    Sound,
    Voice,
}

impl Category {
    /// 音效引用所属的分类
    pub fn for_sound(voice: bool) -> Self {
        if voice { Self::Voice } else { Self::Sound }
    }

    /// 分类总音量（0 - 100），分类关闭时为 0
    pub fn general_volume(self, settings: &SettingsSnapshot) -> u32 {
        let (volume, enabled) = match self {
            Self::Music => (settings.bgm_volume, settings.bgm_enabled),
            Self::Sound => (settings.se_volume, settings.sound_enabled),
            Self::Voice => (settings.voice_volume, settings.voice_enabled),
        };
        if enabled { volume.min(100) } else { 0 }
    }

    /// 两次设置之间该分类的总音量是否变化
    pub fn changed(self, before: &SettingsSnapshot, after: &SettingsSnapshot) -> bool {
        self.general_volume(before) != self.general_volume(after)
    }
}

/// 有效音量（0 - 100 标度）
pub fn effective_volume(volume: u32, general: u32) -> f32 {
    volume as f32 * general as f32 / 100.0
}

/// 句柄增益（0.0 - 1.0 标度）
pub fn gain(volume: u32, general: u32) -> f32 {
    effective_volume(volume, general) / 100.0
}

/// 句柄播放速率（1.0 = 原速）
pub fn playback_rate(rate: u32) -> f32 {
    rate as f32 / 100.0
}
