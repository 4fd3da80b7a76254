//! 场景文件：按帧号排列的播放器操作

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};
use vn_audio::{
    AudioLayerPlayer, AudioSaveData, MusicDescriptor, PlayOptions, PlayRange, ResourceContext,
    ResourceProvider, SettingsSnapshot, SoundOptions, TickRange,
};

/// 场景
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// 初始设置
    #[serde(default)]
    pub settings: SettingsSnapshot,
    pub steps: Vec<Step>,
}

/// 在第 `at` 帧的 update 之前执行的操作
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub at: u64,
    pub op: Op,
}

fn default_true() -> bool {
    true
}

/// 播放器操作
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Op {
    PlayMusic {
        name: String,
        volume: Option<u32>,
        rate: Option<u32>,
        fade_in: Option<u32>,
        #[serde(default)]
        layer: usize,
        #[serde(default = "default_true")]
        looping: bool,
    },
    PlayMusicRandom {
        name: String,
        volume: Option<u32>,
        fade_time: u32,
        #[serde(default)]
        layer: usize,
        play_time: TickRange,
        play_range: PlayRange,
    },
    PlaySound {
        name: String,
        volume: Option<u32>,
        rate: Option<u32>,
        #[serde(default)]
        music_effect: bool,
        #[serde(default)]
        looping: bool,
    },
    PlayVoice {
        name: String,
        volume: Option<u32>,
        rate: Option<u32>,
    },
    StopMusic {
        #[serde(default)]
        fade_out: u32,
        #[serde(default)]
        layer: usize,
    },
    StopAllMusic {
        #[serde(default)]
        fade_out: u32,
    },
    StopSound {
        name: String,
    },
    StopVoice {
        name: String,
    },
    StopAllSounds,
    StopAllVoices,
    ResumeMusic {
        #[serde(default)]
        fade_in: u32,
        #[serde(default)]
        layer: usize,
    },
    DisposeMusic {
        layer: usize,
    },
    /// 回收指定层与指定音效的句柄（场景切换）
    DisposeContext {
        #[serde(default)]
        layers: Vec<usize>,
        #[serde(default)]
        sounds: Vec<String>,
    },
    /// 替换之后每帧注入的设置
    Settings(SettingsSnapshot),
    /// 存档并立即读档
    SaveAndRestore,
}

impl Scenario {
    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取场景文件: {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("场景文件格式错误: {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let mut scenario: Self = serde_json::from_str(json)?;
        scenario.steps.sort_by_key(|s| s.at);
        Ok(scenario)
    }

    /// 最后一个操作所在的帧
    pub fn last_step(&self) -> u64 {
        self.steps.last().map_or(0, |s| s.at)
    }
}

/// 驱动播放器的无界面宿主
pub struct Host<P: ResourceProvider> {
    pub player: AudioLayerPlayer<P>,
    pub settings: SettingsSnapshot,
}

impl<P: ResourceProvider> Host<P> {
    pub fn new(player: AudioLayerPlayer<P>, settings: SettingsSnapshot) -> Self {
        Self { player, settings }
    }

    /// 按帧执行场景，返回未执行的操作数
    pub fn run(&mut self, scenario: &Scenario, ticks: u64) -> Result<usize> {
        let mut steps = scenario.steps.iter().peekable();
        for tick in 0..ticks {
            while let Some(step) = steps.next_if(|s| s.at <= tick) {
                self.apply(&step.op)
                    .with_context(|| format!("第 {} 帧的操作执行失败", step.at))?;
            }
            self.player.update(&self.settings);
        }

        let skipped = steps.count();
        if skipped > 0 {
            warn!(skipped = skipped, ticks = ticks, "部分操作超出运行帧数，未执行");
        }
        Ok(skipped)
    }

    pub fn apply(&mut self, op: &Op) -> Result<()> {
        debug!(op = ?op, "执行操作");
        let player = &mut self.player;
        match op {
            Op::PlayMusic {
                name,
                volume,
                rate,
                fade_in,
                layer,
                looping,
            } => player.play_music(
                name,
                PlayOptions {
                    volume: *volume,
                    rate: *rate,
                    fade_in: *fade_in,
                    layer: *layer,
                    looping: *looping,
                },
            )?,
            Op::PlayMusicRandom {
                name,
                volume,
                fade_time,
                layer,
                play_time,
                play_range,
            } => {
                let descriptor = MusicDescriptor {
                    volume: *volume,
                    ..MusicDescriptor::new(name.as_str())
                };
                player.play_music_random(&descriptor, *fade_time, *layer, *play_time, *play_range)?
            }
            Op::PlaySound {
                name,
                volume,
                rate,
                music_effect,
                looping,
            } => {
                let options = SoundOptions {
                    volume: *volume,
                    rate: *rate,
                    music_effect: *music_effect,
                    voice: false,
                    looping: *looping,
                };
                if player.play_sound(name, options).is_none() {
                    debug!(name = %name, "音效未播放");
                }
            }
            Op::PlayVoice { name, volume, rate } => {
                if player.play_voice(name, *volume, *rate).is_none() {
                    debug!(name = %name, "语音未播放");
                }
            }
            Op::StopMusic { fade_out, layer } => player.stop_music(*fade_out, *layer)?,
            Op::StopAllMusic { fade_out } => player.stop_all_music(*fade_out),
            Op::StopSound { name } => player.stop_sound(name),
            Op::StopVoice { name } => player.stop_voice(name),
            Op::StopAllSounds => player.stop_all_sounds(),
            Op::StopAllVoices => player.stop_all_voices(),
            Op::ResumeMusic { fade_in, layer } => player.resume_music(*fade_in, *layer)?,
            Op::DisposeMusic { layer } => player.dispose_music(*layer)?,
            Op::DisposeContext { layers, sounds } => {
                let context: ResourceContext = layers
                    .iter()
                    .filter_map(|layer| player.layer_stream(*layer))
                    .chain(
                        player
                            .pool()
                            .iter()
                            .filter(|(key, _)| sounds.contains(&key.name))
                            .map(|(_, reference)| reference.stream),
                    )
                    .collect();
                player.dispose(&context);
            }
            Op::Settings(settings) => self.settings = *settings,
            Op::SaveAndRestore => {
                let json = player.snapshot().to_json()?;
                let data = AudioSaveData::from_json(&json)?;
                player.restore(data.layers);
            }
        }
        Ok(())
    }
}
