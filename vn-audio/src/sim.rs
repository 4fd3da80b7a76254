//! # Sim 模块
//!
//! 不依赖音频设备的模拟后端。
//!
//! - [`SimStream`] 按帧推进播放位置与淡入淡出，并记录收到的控制调用
//! - [`SimProvider`] 按路径配置片段时长与解码延迟
//!
//! 解码延迟以 [`ResourceProvider::drain_decode_events`] 的调用次数计，
//! 播放器每帧调用一次，因此一次调用视为经过一帧。

use std::collections::{BTreeMap, HashMap};

use crate::backend::{AudioStream, ResourceProvider, StreamFade, StreamId};
use crate::error::ResourceError;

/// 句柄收到的控制调用
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StreamCall {
    Decode,
    Play(u32),
    Stop(u32),
    Resume(u32),
    Fade(StreamFade),
}

/// 片段规格
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipSpec {
    /// 时长（毫秒）
    pub duration_ms: f64,
    /// 解码所需帧数，`Some(0)` 为同步解码，`None` 为永不完成
    pub decode_ticks: Option<u32>,
}

impl ClipSpec {
    pub fn new(duration_ms: f64) -> Self {
        Self {
            duration_ms,
            decode_ticks: Some(0),
        }
    }

    pub fn with_decode_ticks(mut self, ticks: u32) -> Self {
        self.decode_ticks = Some(ticks);
        self
    }

    /// 解码永不完成
    pub fn never_decodes(mut self) -> Self {
        self.decode_ticks = None;
        self
    }
}

impl Default for ClipSpec {
    fn default() -> Self {
        Self::new(60_000.0)
    }
}

/// 淡入-保持-淡出进度
#[derive(Debug, Clone, Copy)]
struct FadeProgress {
    fade: StreamFade,
    elapsed: u32,
}

impl FadeProgress {
    /// 当前帧的音量，片段结束时返回 None
    fn volume(&self) -> Option<f32> {
        let StreamFade {
            volume,
            fade_in,
            fade_out,
            hold,
        } = self.fade;
        let t = self.elapsed;

        if t < fade_in {
            Some(volume * t as f32 / fade_in as f32)
        } else if t < hold.max(fade_in) {
            Some(volume)
        } else {
            let out_elapsed = t - hold.max(fade_in);
            if out_elapsed < fade_out {
                Some(volume * (1.0 - out_elapsed as f32 / fade_out as f32))
            } else {
                None
            }
        }
    }
}

/// 模拟句柄
#[derive(Debug, Clone)]
pub struct SimStream {
    pub path: String,
    frame_ms: f64,
    duration_ms: f64,
    decoded: bool,
    /// 已请求解码时剩余的帧数
    decode_remaining: Option<u32>,
    never_decodes: bool,
    decode_requested: bool,
    current_ms: f64,
    playing: bool,
    volume: f32,
    rate: f32,
    looping: bool,
    fade: Option<FadeProgress>,
    calls: Vec<StreamCall>,
}

impl SimStream {
    fn new(path: &str, clip: ClipSpec, frame_ms: f64) -> Self {
        Self {
            path: path.to_string(),
            frame_ms,
            duration_ms: clip.duration_ms,
            decoded: clip.decode_ticks == Some(0),
            decode_remaining: clip.decode_ticks.filter(|t| *t > 0),
            never_decodes: clip.decode_ticks.is_none(),
            decode_requested: false,
            current_ms: 0.0,
            playing: false,
            volume: 1.0,
            rate: 1.0,
            looping: false,
            fade: None,
            calls: Vec::new(),
        }
    }

    /// 收到的全部控制调用
    pub fn calls(&self) -> &[StreamCall] {
        &self.calls
    }

    /// 满足条件的调用次数
    pub fn count_calls(&self, predicate: impl Fn(&StreamCall) -> bool) -> usize {
        self.calls.iter().filter(|c| predicate(c)).count()
    }

    pub fn playback_rate(&self) -> f32 {
        self.rate
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// 推进一帧解码，刚好完成时返回 true
    fn tick_decode(&mut self) -> bool {
        if !self.decode_requested || self.decoded || self.never_decodes {
            return false;
        }
        match self.decode_remaining {
            Some(n) if n > 1 => {
                self.decode_remaining = Some(n - 1);
                false
            }
            _ => {
                self.decode_remaining = None;
                self.decoded = true;
                true
            }
        }
    }
}

impl AudioStream for SimStream {
    fn is_decoded(&self) -> bool {
        self.decoded
    }

    fn decode(&mut self) {
        self.calls.push(StreamCall::Decode);
        self.decode_requested = true;
    }

    fn play(&mut self, fade_in: u32) {
        self.calls.push(StreamCall::Play(fade_in));
        self.current_ms = 0.0;
        self.playing = true;
    }

    fn stop(&mut self, fade_out: u32) {
        self.calls.push(StreamCall::Stop(fade_out));
        self.playing = false;
        self.fade = None;
    }

    fn resume(&mut self, fade_in: u32) {
        self.calls.push(StreamCall::Resume(fade_in));
        self.playing = true;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn set_playback_rate(&mut self, rate: f32) {
        self.rate = rate;
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn duration_ms(&self) -> f64 {
        if self.decoded { self.duration_ms } else { 0.0 }
    }

    fn current_time_ms(&self) -> f64 {
        self.current_ms
    }

    fn set_fade(&mut self, fade: StreamFade) {
        self.calls.push(StreamCall::Fade(fade));
        self.fade = Some(FadeProgress { fade, elapsed: 0 });
        if let Some(volume) = self.fade.and_then(|f| f.volume()) {
            self.volume = volume;
        }
    }

    fn set_fade_volume(&mut self, volume: f32) {
        let Some(progress) = self.fade.as_mut() else {
            return;
        };
        progress.fade.volume = volume;
        if let Some(volume) = progress.volume() {
            self.volume = volume;
        }
    }

    fn update(&mut self) {
        if !self.playing {
            return;
        }

        self.current_ms += self.frame_ms * self.rate as f64;
        if self.current_ms >= self.duration_ms {
            if self.looping && self.duration_ms > 0.0 {
                self.current_ms %= self.duration_ms;
            } else {
                self.current_ms = self.duration_ms;
                self.playing = false;
            }
        }

        if let Some(progress) = self.fade.as_mut() {
            progress.elapsed += 1;
            match progress.volume() {
                Some(volume) => self.volume = volume,
                None => {
                    self.volume = 0.0;
                    self.fade = None;
                }
            }
        }
    }
}

/// 模拟资源提供者
#[derive(Debug, Clone)]
pub struct SimProvider {
    frame_ms: f64,
    clips: HashMap<String, ClipSpec>,
    default_clip: ClipSpec,
    strict: bool,
    streams: BTreeMap<StreamId, SimStream>,
    next_id: u64,
    requests: Vec<String>,
}

impl Default for SimProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SimProvider {
    pub fn new() -> Self {
        Self {
            frame_ms: 16.6,
            clips: HashMap::new(),
            default_clip: ClipSpec::default(),
            strict: false,
            streams: BTreeMap::new(),
            next_id: 1,
            requests: Vec::new(),
        }
    }

    /// 未注册的路径返回 NotFound
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn with_frame_ms(mut self, frame_ms: f64) -> Self {
        self.frame_ms = frame_ms;
        self
    }

    /// 注册片段（逻辑路径）
    pub fn with_clip(mut self, path: impl Into<String>, clip: ClipSpec) -> Self {
        self.clips.insert(path.into(), clip);
        self
    }

    pub fn add_clip(&mut self, path: impl Into<String>, clip: ClipSpec) {
        self.clips.insert(path.into(), clip);
    }

    /// 按请求顺序记录的路径
    pub fn requests(&self) -> &[String] {
        &self.requests
    }

    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    fn open(&mut self, path: &str) -> Result<StreamId, ResourceError> {
        let clip = match self.clips.get(path) {
            Some(clip) => *clip,
            None if self.strict => {
                return Err(ResourceError::NotFound {
                    path: path.to_string(),
                });
            }
            None => self.default_clip,
        };

        let id = StreamId(self.next_id);
        self.next_id += 1;
        self.requests.push(path.to_string());
        self.streams
            .insert(id, SimStream::new(path, clip, self.frame_ms));
        Ok(id)
    }
}

impl ResourceProvider for SimProvider {
    type Stream = SimStream;

    fn get_audio_stream(&mut self, path: &str) -> Result<StreamId, ResourceError> {
        self.open(path)
    }

    fn get_audio_buffer(&mut self, path: &str) -> Result<StreamId, ResourceError> {
        self.open(path)
    }

    fn stream(&self, id: StreamId) -> Option<&SimStream> {
        self.streams.get(&id)
    }

    fn stream_mut(&mut self, id: StreamId) -> Option<&mut SimStream> {
        self.streams.get_mut(&id)
    }

    fn drain_decode_events(&mut self) -> Vec<StreamId> {
        self.streams
            .iter_mut()
            .filter_map(|(id, stream)| stream.tick_decode().then_some(*id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_provider_rejects_unknown() {
        let mut provider = SimProvider::new().strict();
        assert!(matches!(
            provider.get_audio_stream("Audio/Music/none"),
            Err(ResourceError::NotFound { .. })
        ));
    }

    #[test]
    fn test_delayed_decode() {
        let mut provider =
            SimProvider::new().with_clip("a", ClipSpec::new(1000.0).with_decode_ticks(2));
        let id = provider.get_audio_buffer("a").unwrap();
        assert!(!provider.stream(id).unwrap().is_decoded());
        assert_eq!(provider.stream(id).unwrap().duration_ms(), 0.0);

        // 未请求解码时不会推进
        assert!(provider.drain_decode_events().is_empty());

        provider.stream_mut(id).unwrap().decode();
        assert!(provider.drain_decode_events().is_empty());
        assert_eq!(provider.drain_decode_events(), vec![id]);
        assert!(provider.stream(id).unwrap().is_decoded());
        assert!(provider.drain_decode_events().is_empty());
    }

    #[test]
    fn test_one_shot_finishes() {
        let mut provider = SimProvider::new().with_clip("pop", ClipSpec::new(50.0));
        let id = provider.get_audio_buffer("pop").unwrap();
        let stream = provider.stream_mut(id).unwrap();
        stream.play(0);
        for _ in 0..3 {
            stream.update();
        }
        assert!(stream.is_playing());
        stream.update();
        assert!(!stream.is_playing());
    }

    #[test]
    fn test_fade_envelope() {
        let mut provider = SimProvider::new();
        let id = provider.get_audio_stream("wind").unwrap();
        let stream = provider.stream_mut(id).unwrap();
        stream.set_looping(true);
        stream.play(0);
        stream.set_fade(StreamFade {
            volume: 1.0,
            fade_in: 2,
            fade_out: 2,
            hold: 4,
        });
        assert_eq!(stream.volume(), 0.0);

        let mut volumes = Vec::new();
        for _ in 0..7 {
            stream.update();
            volumes.push(stream.volume());
        }
        assert_eq!(volumes, vec![0.5, 1.0, 1.0, 1.0, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_fade_volume_follows_new_target() {
        let mut provider = SimProvider::new();
        let id = provider.get_audio_stream("wind").unwrap();
        let stream = provider.stream_mut(id).unwrap();
        stream.play(0);

        stream.set_fade_volume(0.8);
        assert_eq!(stream.volume(), 0.0);

        stream.set_fade(StreamFade {
            volume: 1.0,
            fade_in: 2,
            fade_out: 2,
            hold: 6,
        });
        stream.update();
        assert_eq!(stream.volume(), 0.5);

        stream.set_fade_volume(0.4);
        assert_eq!(stream.volume(), 0.2);
        stream.update();
        stream.update();
        assert_eq!(stream.volume(), 0.4);

        stream.set_fade_volume(0.0);
        assert_eq!(stream.volume(), 0.0);
    }
}
