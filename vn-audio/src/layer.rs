//! # Layer 模块
//!
//! 音乐层的数据模型。
//!
//! [`AudioLayer`] 同时是存档契约：字段名以 camelCase 序列化，
//! `customData` 仅在随机环境音模式下出现。

use serde::{Deserialize, Serialize};

use crate::volume::{DEFAULT_RATE, DEFAULT_VOLUME};

/// 帧区间 `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TickRange {
    pub min: u32,
    pub max: u32,
}

impl TickRange {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }
}

/// 下一次播放允许开始的窗口 `[start, end]`（帧）
///
/// `end == 0` 表示"直到片段结束"，在句柄解码后被替换为片段时长。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayRange {
    pub start: u32,
    pub end: u32,
}

impl PlayRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// 是否使用"直到片段结束"
    pub fn is_open_ended(&self) -> bool {
        self.end == 0
    }
}

/// 随机环境音播放状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RandomPlayback {
    /// 单次淡入/淡出帧数
    pub fade_time: u32,
    /// 每次播放持续的帧数区间
    pub play_time: TickRange,
    /// 下一次播放的起始窗口
    pub play_range: PlayRange,
    /// 距离下一次淡入的倒计时（帧）
    #[serde(default)]
    pub start_timer: u32,
}

impl RandomPlayback {
    pub fn new(fade_time: u32, play_time: TickRange, play_range: PlayRange) -> Self {
        Self {
            fade_time,
            play_time,
            play_range,
            start_timer: 0,
        }
    }
}

/// 音乐描述（`play_music_from_descriptor` 的参数）
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicDescriptor {
    pub name: String,
    #[serde(default)]
    pub volume: Option<u32>,
    #[serde(default)]
    pub rate: Option<u32>,
    #[serde(default)]
    pub fade_in_time: Option<u32>,
}

impl MusicDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_volume(mut self, volume: u32) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_rate(mut self, rate: u32) -> Self {
        self.rate = Some(rate);
        self
    }
}

/// 音乐层描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioLayer {
    /// 逻辑曲名，空表示静音层
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_volume")]
    pub volume: u32,
    #[serde(default = "default_rate")]
    pub rate: u32,
    #[serde(default)]
    pub fade_in_time: u32,
    #[serde(default)]
    pub playing: bool,
    /// 随机环境音参数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<RandomPlayback>,
}

fn default_volume() -> u32 {
    DEFAULT_VOLUME
}

fn default_rate() -> u32 {
    DEFAULT_RATE
}

impl AudioLayer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            volume: DEFAULT_VOLUME,
            rate: DEFAULT_RATE,
            fade_in_time: 0,
            playing: false,
            custom_data: None,
        }
    }

    /// 是否为随机环境音层
    pub fn is_random(&self) -> bool {
        self.custom_data.is_some()
    }

    /// 重新播放时使用的描述
    pub fn descriptor(&self) -> MusicDescriptor {
        MusicDescriptor {
            name: self.name.clone(),
            volume: Some(self.volume),
            rate: Some(self.rate),
            fade_in_time: Some(self.fade_in_time),
        }
    }
}
