//! # Player 模块
//!
//! 音频层播放管理器。
//!
//! ## 职责
//!
//! - 管理最多 N 个音乐层，每层同一时刻最多持有一个句柄
//! - 管理音效/语音引用池
//! - 把分类音量设置换算为句柄增益
//! - 每帧推进随机环境音倒计时、挂起的解码与音效结束检测
//!
//! ## 层状态
//!
//! ```text
//! Empty ──play_music──────────► Playing(linear)
//! Empty ──play_music_random───► Playing(random)  每帧倒计时，归零时淡入并重采样
//! Playing ──stop_music────────► Stopped          句柄保留，可 resume_music
//! Playing ──dispose_music─────► Empty            句柄遗忘，层描述清空
//! ```
//!
//! 挂起的解码由拥有它的层或引用保存，层被停止或回收时挂起状态随之丢弃，
//! 之后到达的解码事件找不到对应的挂起项，自然失效。

mod music;
mod sound;


use std::collections::HashSet;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::ambient;
use crate::backend::{AudioStream, ResourceContext, ResourceProvider, StreamFade, StreamId};
use crate::config::AudioConfig;
use crate::layer::{AudioLayer, RandomPlayback};
use crate::pool::{EndAction, SoundPool, SoundRef, SoundReference, SoundState};
use crate::save::AudioSaveData;
use crate::settings::SettingsSnapshot;
use crate::volume::{self, Category, DEFAULT_VOLUME};

/// 音乐播放参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayOptions {
    /// 调用音量（0 - 100），默认 100
    pub volume: Option<u32>,
    /// 播放速率（百分比），默认 100
    pub rate: Option<u32>,
    /// 淡入帧数
    pub fade_in: Option<u32>,
    pub layer: usize,
    pub looping: bool,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            volume: None,
            rate: None,
            fade_in: None,
            layer: 0,
            looping: true,
        }
    }
}

impl PlayOptions {
    pub fn on_layer(layer: usize) -> Self {
        Self {
            layer,
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

    pub fn with_fade_in(mut self, fade_in: u32) -> Self {
        self.fade_in = Some(fade_in);
        self
    }

    pub fn once(mut self) -> Self {
        self.looping = false;
        self
    }
}

/// 音效播放参数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoundOptions {
    pub volume: Option<u32>,
    pub rate: Option<u32>,
    /// 音乐效果音：播放前停止主音乐层，结束后恢复
    pub music_effect: bool,
    pub voice: bool,
    pub looping: bool,
}

/// 层上的音乐句柄
#[derive(Debug, Clone)]
struct MusicTrack {
    stream: StreamId,
    /// 调用音量（0 - 100）
    volume: u32,
    rate: u32,
    fade_in: u32,
    looping: bool,
    /// 随机环境音状态，None 为普通循环
    random: Option<RandomPlayback>,
    /// 等待解码时记录请求帧号
    pending_since: Option<u64>,
}

/// 单个音乐层
#[derive(Debug, Clone, Default)]
struct LayerSlot {
    descriptor: Option<AudioLayer>,
    track: Option<MusicTrack>,
}

/// 音频层播放管理器
pub struct AudioLayerPlayer<P: ResourceProvider> {
    provider: P,
    config: AudioConfig,
    /// 最近一次 update 注入的设置
    settings: SettingsSnapshot,
    slots: Vec<LayerSlot>,
    /// 当前主音乐（第 0 层最近一次播放的描述）
    current_music: Option<AudioLayer>,
    pool: SoundPool,
    current_voice: Option<SoundRef>,
    rng: StdRng,
    /// 已执行的 update 次数
    tick: u64,
}

impl<P: ResourceProvider> AudioLayerPlayer<P> {
    /// 创建播放管理器
    pub fn new(provider: P, config: AudioConfig, settings: SettingsSnapshot) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let slots = vec![LayerSlot::default(); config.layer_count];

        Self {
            provider,
            config,
            settings,
            slots,
            current_music: None,
            pool: SoundPool::new(),
            current_voice: None,
            rng,
            tick: 0,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    pub fn settings(&self) -> &SettingsSnapshot {
        &self.settings
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn layer_count(&self) -> usize {
        self.slots.len()
    }

    /// 层描述
    pub fn layer(&self, layer: usize) -> Option<&AudioLayer> {
        self.slots.get(layer)?.descriptor.as_ref()
    }

    /// 全部层描述（存档用）
    pub fn layers(&self) -> Vec<Option<AudioLayer>> {
        self.slots.iter().map(|s| s.descriptor.clone()).collect()
    }

    /// 层上当前的句柄
    pub fn layer_stream(&self, layer: usize) -> Option<StreamId> {
        Some(self.slots.get(layer)?.track.as_ref()?.stream)
    }

    /// 层是否在等待解码
    pub fn is_layer_pending(&self, layer: usize) -> bool {
        self.slots
            .get(layer)
            .and_then(|s| s.track.as_ref())
            .is_some_and(|t| t.pending_since.is_some())
    }

    /// 层句柄上的随机环境音状态
    pub fn random_state(&self, layer: usize) -> Option<&RandomPlayback> {
        self.slots.get(layer)?.track.as_ref()?.random.as_ref()
    }

    pub fn current_music(&self) -> Option<&AudioLayer> {
        self.current_music.as_ref()
    }

    pub fn current_voice(&self) -> Option<&SoundRef> {
        self.current_voice.as_ref()
    }

    pub fn pool(&self) -> &SoundPool {
        &self.pool
    }

    pub fn sound_reference(&self, key: &SoundRef) -> Option<&SoundReference> {
        self.pool.get(key)
    }

    /// 生成存档数据
    pub fn snapshot(&self) -> AudioSaveData {
        AudioSaveData::new(self.layers())
    }

    /// 每帧更新
    ///
    /// 1. 应用新的设置快照
    /// 2. 处理解码完成事件，启动或丢弃（超时）挂起的播放
    /// 3. 推进音乐句柄与随机环境音倒计时
    /// 4. 音效/语音音量设置变化时刷新池中全部引用
    /// 5. 检测播放结束的音效并执行结束动作
    pub fn update(&mut self, settings: &SettingsSnapshot) {
        self.tick += 1;

        let music_changed = Category::Music.changed(&self.settings, settings);
        let sound_changed = Category::Sound.changed(&self.settings, settings)
            || Category::Voice.changed(&self.settings, settings);
        self.settings = *settings;

        let decoded: HashSet<StreamId> = self.provider.drain_decode_events().into_iter().collect();
        self.resolve_pending_music(&decoded);
        let mut finished = self.resolve_pending_sounds(&decoded);

        self.update_music(music_changed);

        if sound_changed {
            self.refresh_sound_volumes();
        }

        finished.extend(self.update_sounds());
        for action in finished {
            self.run_end_action(action);
        }
    }

    /// 回收资源上下文中的句柄
    ///
    /// 只处理句柄在 `context` 中的层与池化引用，其余（例如跨场景保留的背景音乐）不受影响。
    pub fn dispose(&mut self, context: &ResourceContext) {
        let layers: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.track.as_ref().is_some_and(|t| context.contains(t.stream)))
            .map(|(i, _)| i)
            .collect();

        for layer in layers {
            self.dispose_layer(layer);
        }

        let removed = self.pool.remove_where(|r| context.contains(r.stream));
        if self
            .current_voice
            .as_ref()
            .is_some_and(|v| !self.pool.contains(v))
        {
            self.current_voice = None;
        }

        info!(resources = context.len(), sounds = removed, "回收音频资源");
    }

    fn music_gain(&self, volume: u32) -> f32 {
        volume::gain(volume, Category::Music.general_volume(&self.settings))
    }

    /// 启动层上已解码的句柄
    fn start_track(&mut self, layer: usize) {
        let general = Category::Music.general_volume(&self.settings);

        let slot = &mut self.slots[layer];
        let Some(track) = slot.track.as_mut() else {
            return;
        };
        let Some(stream) = self.provider.stream_mut(track.stream) else {
            warn!(layer = layer, "音乐句柄已失效");
            slot.track = None;
            return;
        };
        track.pending_since = None;
        stream.set_playback_rate(volume::playback_rate(track.rate));

        match track.random.as_mut() {
            None => {
                stream.set_looping(track.looping);
                stream.set_volume(volume::gain(track.volume, general));
                stream.play(track.fade_in);
                debug!(layer = layer, fade_in = track.fade_in, "开始播放音乐");
            }
            Some(random) => {
                let duration_ticks = self.config.ms_to_ticks(stream.duration_ms());
                random.play_range = ambient::resolve_play_range(random.play_range, duration_ticks);
                random.start_timer = ambient::sample_window_offset(&mut self.rng, random.play_range);

                stream.set_looping(true);
                stream.set_volume(0.0);
                stream.play(0);

                if let Some(descriptor) = slot.descriptor.as_mut() {
                    descriptor.custom_data = Some(*random);
                }
                debug!(
                    layer = layer,
                    start = random.play_range.start,
                    end = random.play_range.end,
                    start_timer = random.start_timer,
                    "开始随机环境音"
                );
            }
        }
    }

    fn resolve_pending_music(&mut self, decoded: &HashSet<StreamId>) {
        let timeout = self.config.decode_timeout_ticks;
        for layer in 0..self.slots.len() {
            let Some(track) = self.slots[layer].track.as_ref() else {
                continue;
            };
            let Some(since) = track.pending_since else {
                continue;
            };

            let ready = decoded.contains(&track.stream)
                || self
                    .provider
                    .stream(track.stream)
                    .is_some_and(|s| s.is_decoded());
            if ready {
                self.start_track(layer);
            } else if self.tick.saturating_sub(since) >= timeout {
                // 只保留层描述，存档仍可恢复
                self.slots[layer].track = None;
                warn!(layer = layer, ticks = timeout, "音乐解码超时，放弃播放");
            }
        }
    }

    /// 启动解码完成的音效，返回超时引用的结束动作
    fn resolve_pending_sounds(&mut self, decoded: &HashSet<StreamId>) -> Vec<EndAction> {
        let timeout = self.config.decode_timeout_ticks;
        let tick = self.tick;
        let mut expired = Vec::new();
        for reference in self.pool.iter_mut() {
            let SoundState::Loading { since } = reference.state else {
                continue;
            };
            let Some(stream) = self.provider.stream_mut(reference.stream) else {
                reference.state = SoundState::Idle;
                continue;
            };

            if decoded.contains(&reference.stream) || stream.is_decoded() {
                start_sound_stream(stream, reference);
            } else if tick.saturating_sub(since) >= timeout {
                reference.state = SoundState::Idle;
                expired.extend(reference.on_end.take());
                warn!(ticks = timeout, "音效解码超时，放弃播放");
            }
        }
        expired
    }

    /// 推进音乐句柄与随机环境音
    fn update_music(&mut self, music_changed: bool) {
        let general = Category::Music.general_volume(&self.settings);

        for (layer, slot) in self.slots.iter_mut().enumerate() {
            let Some(track) = slot.track.as_mut() else {
                continue;
            };
            let Some(stream) = self.provider.stream_mut(track.stream) else {
                continue;
            };

            if track.pending_since.is_none() {
                match track.random.as_mut() {
                    Some(random) if random.start_timer == 0 => {
                        let time_left = self
                            .config
                            .ms_to_ticks(stream.duration_ms() - stream.current_time_ms());
                        let burst = ambient::resample(&mut self.rng, random, time_left);
                        stream.set_fade(StreamFade {
                            volume: volume::gain(track.volume, general),
                            fade_in: random.fade_time,
                            fade_out: random.fade_time,
                            hold: burst.play_time,
                        });
                        debug!(
                            layer = layer,
                            play_time = burst.play_time,
                            start_timer = burst.start_timer,
                            "随机环境音淡入"
                        );
                    }
                    Some(random) => {
                        random.start_timer -= 1;
                        if music_changed {
                            stream.set_fade_volume(volume::gain(track.volume, general));
                        }
                    }
                    None if music_changed => {
                        stream.set_volume(volume::gain(track.volume, general));
                    }
                    None => {}
                }

                if let (Some(random), Some(descriptor)) =
                    (track.random.as_ref(), slot.descriptor.as_mut())
                {
                    descriptor.custom_data = Some(*random);
                }
            }

            stream.update();
        }
    }

    /// 按当前设置刷新池中全部引用的增益
    fn refresh_sound_volumes(&mut self) {
        for reference in self.pool.iter_mut() {
            let general = Category::for_sound(reference.voice).general_volume(&self.settings);
            reference.volume = volume::gain(reference.base_volume, general);
            if let Some(stream) = self.provider.stream_mut(reference.stream) {
                stream.set_volume(reference.volume);
            }
        }
        debug!(count = self.pool.len(), "刷新音效音量");
    }

    /// 推进播放中的音效，返回结束动作
    fn update_sounds(&mut self) -> Vec<EndAction> {
        let mut finished = Vec::new();
        for reference in self.pool.iter_mut() {
            if !reference.is_playing() {
                continue;
            }
            let Some(stream) = self.provider.stream_mut(reference.stream) else {
                reference.state = SoundState::Idle;
                continue;
            };

            stream.update();
            if !stream.is_playing() {
                reference.state = SoundState::Idle;
                if let Some(action) = reference.on_end.take() {
                    finished.push(action);
                }
            }
        }
        finished
    }

    fn run_end_action(&mut self, action: EndAction) {
        match action {
            EndAction::ResumeMusic { fade_in } => {
                if let Err(e) = self.resume_music(fade_in, 0) {
                    warn!(error = %e, "恢复音乐失败");
                }
            }
        }
    }

    /// 默认音量下的音乐描述
    fn layer_descriptor(name: &str, opts: &PlayOptions) -> AudioLayer {
        AudioLayer {
            name: name.to_string(),
            volume: opts.volume.unwrap_or(DEFAULT_VOLUME),
            rate: opts.rate.unwrap_or(volume::DEFAULT_RATE),
            fade_in_time: opts.fade_in.unwrap_or(0),
            playing: true,
            custom_data: None,
        }
    }
}

/// 以引用的参数播放已解码的音效句柄
fn start_sound_stream<S: AudioStream>(stream: &mut S, reference: &mut SoundReference) {
    stream.set_looping(reference.looping);
    stream.set_volume(reference.volume);
    stream.set_playback_rate(volume::playback_rate(reference.rate));
    stream.play(0);
    reference.state = SoundState::Playing;
}
