//! 音效与语音操作

use tracing::{debug, warn};

use super::{AudioLayerPlayer, SoundOptions, start_sound_stream};
use crate::backend::{AudioStream, ResourceProvider};
use crate::config::join_logical;
use crate::pool::{EndAction, SoundRef, SoundReference, SoundState};
use crate::volume::{self, Category, DEFAULT_RATE, DEFAULT_VOLUME};

impl<P: ResourceProvider> AudioLayerPlayer<P> {
    /// 播放音效
    ///
    /// 优先复用同名的空闲引用，否则申请新的缓冲并加入池中。
    /// 名称为空或分类被禁用时返回 None。
    pub fn play_sound(&mut self, name: &str, opts: SoundOptions) -> Option<SoundRef> {
        if name.is_empty() {
            return None;
        }

        let category = Category::for_sound(opts.voice);
        let disabled = if opts.voice {
            self.config.voice_disabled() || !self.settings.voice_enabled
        } else {
            self.config.sound_disabled() || !self.settings.sound_enabled
        };
        if disabled {
            debug!(name = %name, voice = opts.voice, "音效分类已禁用");
            return None;
        }

        let on_end = if opts.music_effect {
            if let Err(e) = self.stop_music(0, 0) {
                warn!(error = %e, "无法停止主音乐");
            }
            Some(EndAction::ResumeMusic {
                fade_in: self.config.music_effect_resume_fade,
            })
        } else {
            None
        };

        let key = match self.pool.find_idle(name, opts.voice) {
            Some(key) => key,
            None => {
                let folder = if opts.voice {
                    &self.config.voice_folder
                } else {
                    &self.config.sound_folder
                };
                let path = join_logical(folder, name);
                let stream = match self.provider.get_audio_buffer(&path) {
                    Ok(id) => id,
                    Err(e) => {
                        warn!(path = %path, error = %e, "无法获取音效");
                        return None;
                    }
                };
                self.pool.push(name, SoundReference::new(stream, opts.voice))
            }
        };

        let general = category.general_volume(&self.settings);
        let tick = self.tick;
        let reference = self.pool.get_mut(&key)?;
        reference.base_volume = opts.volume.unwrap_or(DEFAULT_VOLUME);
        reference.volume = volume::gain(reference.base_volume, general);
        reference.rate = opts.rate.unwrap_or(DEFAULT_RATE);
        reference.looping = opts.looping;
        reference.on_end = on_end;

        match self.provider.stream_mut(reference.stream) {
            Some(stream) if stream.is_decoded() => start_sound_stream(stream, reference),
            Some(stream) => {
                stream.decode();
                reference.state = SoundState::Loading { since: tick };
            }
            None => {
                warn!(name = %name, "音效句柄不可用");
                return None;
            }
        }

        debug!(
            name = %name,
            id = key.id,
            volume = reference.volume,
            voice = opts.voice,
            "播放音效"
        );

        if opts.voice {
            self.current_voice = Some(key.clone());
        }
        Some(key)
    }

    /// 播放语音
    ///
    /// 新语音不会停止之前的语音，只会替换"当前语音"。
    pub fn play_voice(&mut self, name: &str, volume: Option<u32>, rate: Option<u32>) -> Option<SoundRef> {
        self.play_sound(
            name,
            SoundOptions {
                volume,
                rate,
                voice: true,
                ..SoundOptions::default()
            },
        )
    }

    /// 停止同名的音效，引用保留在池中
    pub fn stop_sound(&mut self, name: &str) {
        let mut stopped = 0;
        for reference in self.pool.named_mut(name) {
            if stop_reference(&mut self.provider, reference) {
                stopped += 1;
            }
        }
        debug!(name = %name, count = stopped, "停止音效");
    }

    /// 停止同名语音
    pub fn stop_voice(&mut self, name: &str) {
        self.stop_sound(name);
    }

    /// 停止全部音效与语音
    pub fn stop_all_sounds(&mut self) {
        for reference in self.pool.iter_mut() {
            stop_reference(&mut self.provider, reference);
        }
        debug!("停止全部音效");
    }

    /// 停止全部语音
    pub fn stop_all_voices(&mut self) {
        for reference in self.pool.iter_mut().filter(|r| r.voice) {
            stop_reference(&mut self.provider, reference);
        }
        debug!("停止全部语音");
    }
}

/// 停止单个引用，返回是否确实停止了播放或加载
fn stop_reference<P: ResourceProvider>(provider: &mut P, reference: &mut SoundReference) -> bool {
    if reference.is_idle() {
        return false;
    }
    if reference.is_playing() {
        if let Some(stream) = provider.stream_mut(reference.stream) {
            stream.stop(0);
        }
    }
    reference.state = SoundState::Idle;
    reference.on_end = None;
    true
}
