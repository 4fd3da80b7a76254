//! # Backend 模块
//!
//! 宿主层需要实现的资源与播放接口。
//!
//! ## 所有权约定
//!
//! - 句柄由 [`ResourceProvider`] 持有，播放器只保存 [`StreamId`]
//! - 播放器从不释放句柄；释放由宿主的资源上下文负责（见 [`ResourceContext`]）
//! - 解码完成通过 [`ResourceProvider::drain_decode_events`] 以消息的形式送达，
//!   不使用回调

use std::collections::HashSet;

use crate::error::ResourceError;

/// 句柄 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub u64);

/// 一次淡入-保持-淡出的播放片段
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamFade {
    /// 淡入的目标音量（0.0 - 1.0）
    pub volume: f32,
    /// 淡入帧数
    pub fade_in: u32,
    /// 淡出帧数
    pub fade_out: u32,
    /// 从淡入开始到开始淡出之间的帧数
    pub hold: u32,
}

/// 可播放的音频句柄
pub trait AudioStream {
    /// 是否已解码可播放
    fn is_decoded(&self) -> bool;

    /// 请求解码（完成后由 provider 发出解码事件）
    fn decode(&mut self);

    /// 从头播放
    fn play(&mut self, fade_in: u32);

    /// 停止
    fn stop(&mut self, fade_out: u32);

    /// 从停止位置继续
    fn resume(&mut self, fade_in: u32);

    fn is_playing(&self) -> bool;

    /// 当前音量（0.0 - 1.0）
    fn volume(&self) -> f32;

    fn set_volume(&mut self, volume: f32);

    /// 播放速率（1.0 = 原速）
    fn set_playback_rate(&mut self, rate: f32);

    fn set_looping(&mut self, looping: bool);

    /// 总时长（毫秒），未解码时为 0
    fn duration_ms(&self) -> f64;

    /// 当前播放位置（毫秒）
    fn current_time_ms(&self) -> f64;

    /// 设置淡入-保持-淡出片段，由句柄自己的 update 推进
    fn set_fade(&mut self, fade: StreamFade);

    /// 修改进行中片段的目标音量，没有片段时不做任何事
    fn set_fade_volume(&mut self, volume: f32);

    /// 每帧推进句柄内部状态
    fn update(&mut self);
}

/// 资源提供者
pub trait ResourceProvider {
    type Stream: AudioStream;

    /// 获取连续播放的音乐流
    fn get_audio_stream(&mut self, path: &str) -> Result<StreamId, ResourceError>;

    /// 获取一次性播放的音效缓冲
    fn get_audio_buffer(&mut self, path: &str) -> Result<StreamId, ResourceError>;

    fn stream(&self, id: StreamId) -> Option<&Self::Stream>;

    fn stream_mut(&mut self, id: StreamId) -> Option<&mut Self::Stream>;

    /// 取出自上次调用以来完成解码的句柄
    fn drain_decode_events(&mut self) -> Vec<StreamId>;
}

/// 外部资源上下文
///
/// 场景卸载时，宿主把该场景仍存活的句柄集合交给
/// [`AudioLayerPlayer::dispose`](crate::AudioLayerPlayer::dispose)，
/// 播放器只回收集合中的句柄。
#[derive(Debug, Clone, Default)]
pub struct ResourceContext {
    resources: HashSet<StreamId>,
}

impl ResourceContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: StreamId) {
        self.resources.insert(id);
    }

    pub fn contains(&self, id: StreamId) -> bool {
        self.resources.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl FromIterator<StreamId> for ResourceContext {
    fn from_iter<I: IntoIterator<Item = StreamId>>(iter: I) -> Self {
        Self {
            resources: iter.into_iter().collect(),
        }
    }
}
