//! 音乐层操作

use tracing::{debug, info, warn};

use super::{AudioLayerPlayer, MusicTrack, PlayOptions};
use crate::backend::{AudioStream, ResourceProvider};
use crate::config::join_logical;
use crate::error::{AudioError, AudioResult};
use crate::layer::{AudioLayer, MusicDescriptor, PlayRange, RandomPlayback, TickRange};

impl<P: ResourceProvider> AudioLayerPlayer<P> {
    /// 按名称播放音乐
    ///
    /// 层上已有的句柄会先被回收。名称为空时该层变为静音，但层描述仍会记录。
    pub fn play_music(&mut self, name: &str, opts: PlayOptions) -> AudioResult<()> {
        let descriptor = Self::layer_descriptor(name, &opts);
        self.start_music(opts.layer, descriptor, opts.looping, None)
    }

    /// 按描述播放音乐
    ///
    /// 描述中给出的音量/速率/淡入优先于 `opts`。
    pub fn play_music_from_descriptor(
        &mut self,
        descriptor: &MusicDescriptor,
        opts: PlayOptions,
    ) -> AudioResult<()> {
        let opts = PlayOptions {
            volume: descriptor.volume.or(opts.volume),
            rate: descriptor.rate.or(opts.rate),
            fade_in: descriptor.fade_in_time.or(opts.fade_in),
            ..opts
        };
        self.play_music(&descriptor.name, opts)
    }

    /// 以随机环境音模式播放
    ///
    /// 句柄以音量 0 循环播放，由每帧的倒计时触发淡入。
    /// `play_range.end == 0` 表示窗口延伸到片段结尾。
    pub fn play_music_random(
        &mut self,
        descriptor: &MusicDescriptor,
        fade_time: u32,
        layer: usize,
        play_time: TickRange,
        play_range: PlayRange,
    ) -> AudioResult<()> {
        let opts = PlayOptions {
            volume: descriptor.volume,
            rate: descriptor.rate,
            fade_in: descriptor.fade_in_time,
            layer,
            looping: true,
        };
        let random = RandomPlayback::new(fade_time, play_time, play_range);
        let mut layer_descriptor = Self::layer_descriptor(&descriptor.name, &opts);
        layer_descriptor.custom_data = Some(random);
        self.start_music(layer, layer_descriptor, true, Some(random))
    }

    /// 恢复已停止的音乐层
    ///
    /// 仅当层上有句柄且该句柄未在播放时生效。
    pub fn resume_music(&mut self, fade_in: u32, layer: usize) -> AudioResult<()> {
        self.check_layer(layer)?;

        let slot = &mut self.slots[layer];
        let Some(track) = slot.track.as_ref() else {
            return Ok(());
        };
        let Some(stream) = self.provider.stream_mut(track.stream) else {
            return Ok(());
        };
        if stream.is_playing() {
            return Ok(());
        }

        stream.resume(fade_in);
        if let Some(descriptor) = slot.descriptor.as_mut() {
            descriptor.playing = true;
        }
        debug!(layer = layer, fade_in = fade_in, "恢复音乐");
        Ok(())
    }

    /// 停止音乐层
    ///
    /// 句柄保留在层上（可恢复），随机环境音状态被清除，挂起的解码被取消。
    /// 无论停止哪一层，当前主音乐都会被清空。
    pub fn stop_music(&mut self, fade_out: u32, layer: usize) -> AudioResult<()> {
        self.check_layer(layer)?;

        let slot = &mut self.slots[layer];
        if let Some(track) = slot.track.as_mut() {
            if let Some(stream) = self.provider.stream_mut(track.stream) {
                stream.stop(fade_out);
            }
            track.random = None;
            track.pending_since = None;
        }
        if let Some(descriptor) = slot.descriptor.as_mut() {
            descriptor.playing = false;
            descriptor.custom_data = None;
        }
        self.current_music = None;

        debug!(layer = layer, fade_out = fade_out, "停止音乐");
        Ok(())
    }

    /// 停止所有层上的音乐
    pub fn stop_all_music(&mut self, fade_out: u32) {
        for slot in self.slots.iter_mut() {
            let Some(track) = slot.track.as_mut() else {
                continue;
            };
            if let Some(stream) = self.provider.stream_mut(track.stream) {
                stream.stop(fade_out);
            }
            track.random = None;
            track.pending_since = None;
            if let Some(descriptor) = slot.descriptor.as_mut() {
                descriptor.playing = false;
                descriptor.custom_data = None;
            }
        }
        self.current_music = None;

        debug!(fade_out = fade_out, "停止全部音乐");
    }

    /// 回收音乐层：立即停止，遗忘句柄，清空层描述
    pub fn dispose_music(&mut self, layer: usize) -> AudioResult<()> {
        self.check_layer(layer)?;
        self.dispose_layer(layer);
        Ok(())
    }

    /// 从存档恢复音乐层
    ///
    /// 先回收全部现有句柄，再对每个 `playing` 的层重新播放：
    /// 带 `custom_data` 的层按随机环境音恢复，其余按普通音乐恢复。
    pub fn restore(&mut self, layers: Vec<Option<AudioLayer>>) {
        for layer in 0..self.slots.len() {
            self.dispose_layer(layer);
        }
        self.current_music = None;

        if layers.len() > self.slots.len() {
            warn!(
                layers = layers.len(),
                max = self.slots.len(),
                "存档中的音乐层超出层数，多余部分被忽略"
            );
        }

        for (slot, layer) in self.slots.iter_mut().zip(layers.iter()) {
            slot.descriptor = layer.clone();
        }

        for (index, layer) in layers.into_iter().enumerate().take(self.slots.len()) {
            let Some(layer) = layer.filter(|l| l.playing) else {
                continue;
            };

            let descriptor = layer.descriptor();
            let result = match layer.custom_data {
                Some(random) => self.play_music_random(
                    &descriptor,
                    random.fade_time,
                    index,
                    random.play_time,
                    random.play_range,
                ),
                None => self.play_music_from_descriptor(&descriptor, PlayOptions::on_layer(index)),
            };
            if let Err(e) = result {
                warn!(layer = index, error = %e, "恢复音乐层失败");
            }
        }

        info!(layers = self.slots.len(), "音乐层已恢复");
    }

    pub(super) fn check_layer(&self, layer: usize) -> AudioResult<()> {
        if layer < self.slots.len() {
            Ok(())
        } else {
            Err(AudioError::LayerOutOfRange {
                layer,
                max: self.slots.len(),
            })
        }
    }

    pub(super) fn dispose_layer(&mut self, layer: usize) {
        let slot = &mut self.slots[layer];
        if let Some(track) = slot.track.take() {
            if let Some(stream) = self.provider.stream_mut(track.stream) {
                stream.stop(0);
            }
            debug!(layer = layer, "回收音乐层");
        }
        slot.descriptor = None;
    }

    fn start_music(
        &mut self,
        layer: usize,
        descriptor: AudioLayer,
        looping: bool,
        random: Option<RandomPlayback>,
    ) -> AudioResult<()> {
        self.check_layer(layer)?;

        if self.config.music_disabled() {
            debug!(layer = layer, name = %descriptor.name, "预览模式已禁用音乐");
            return Ok(());
        }

        self.dispose_layer(layer);

        let volume = descriptor.volume;
        let rate = descriptor.rate;
        let fade_in = descriptor.fade_in_time;
        let name = descriptor.name.clone();

        // 先记录描述，解码失败或尚未完成时存档仍能恢复
        if layer == 0 {
            self.current_music = Some(descriptor.clone());
        }
        self.slots[layer].descriptor = Some(descriptor);

        if name.is_empty() {
            debug!(layer = layer, "音乐层切换为静音");
            return Ok(());
        }

        let path = join_logical(&self.config.music_folder, &name);
        let stream_id = match self.provider.get_audio_stream(&path) {
            Ok(id) => id,
            Err(e) => {
                warn!(layer = layer, path = %path, error = %e, "无法获取音乐");
                return Ok(());
            }
        };

        self.slots[layer].track = Some(MusicTrack {
            stream: stream_id,
            volume,
            rate,
            fade_in,
            looping,
            random,
            pending_since: None,
        });

        let decoded = match self.provider.stream_mut(stream_id) {
            Some(stream) if stream.is_decoded() => true,
            Some(stream) => {
                stream.decode();
                false
            }
            None => {
                warn!(layer = layer, path = %path, "音乐句柄不可用");
                self.slots[layer].track = None;
                return Ok(());
            }
        };

        if decoded {
            self.start_track(layer);
        } else if let Some(track) = self.slots[layer].track.as_mut() {
            track.pending_since = Some(self.tick);
            debug!(layer = layer, path = %path, "等待音乐解码");
        }

        info!(
            layer = layer,
            name = %name,
            volume = self.music_gain(volume),
            random = random.is_some(),
            "播放音乐"
        );
        Ok(())
    }
}
