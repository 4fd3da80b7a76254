//! # VN Audio
//!
//! Visual Novel Engine 的音频层运行时库。
//!
//! ## 架构概述
//!
//! `vn-audio` 是纯逻辑核心，不依赖任何音频设备或解码实现。
//! 资源加载与实际播放由宿主层通过 trait 注入：
//!
//! ```text
//! Host                                   AudioLayerPlayer
//!   │                                          │
//!   │──── play_music / play_sound ───────────►│
//!   │──── update(SettingsSnapshot) ──────────►│ 每帧一次
//!   │                                          │
//!   │◄─── ResourceProvider / AudioStream 调用 ─│
//! ```
//!
//! ## 核心类型
//!
//! - [`AudioLayerPlayer`]：音乐层 + 音效/语音池的播放管理器
//! - [`AudioLayer`]：可序列化的音乐层描述（存档契约）
//! - [`ResourceProvider`] / [`AudioStream`]：宿主层提供的资源与播放句柄
//! - [`SettingsSnapshot`]：每帧注入的用户音量设置
//!
//! ## 模块结构
//!
//! - [`player`]：播放管理器
//! - [`layer`]：音乐层数据模型
//! - [`ambient`]：随机环境音的时间采样
//! - [`pool`]：音效/语音引用池
//! - [`volume`]：分类音量计算
//! - [`backend`]：宿主层 trait 定义
//! - [`settings`] / [`config`]：用户设置与运行配置
//! - [`save`]：音频存档
//! - [`sim`]：无设备的模拟后端（测试与 headless 宿主使用）

pub mod ambient;
pub mod backend;
pub mod config;
pub mod error;
pub mod layer;
pub mod player;
pub mod pool;
pub mod save;
pub mod settings;
pub mod sim;
pub mod volume;

// 重导出核心类型
pub use backend::{AudioStream, ResourceContext, ResourceProvider, StreamFade, StreamId};
pub use config::{AudioConfig, PreviewFlags};
pub use error::{AudioError, AudioResult, ConfigError, ResourceError, SaveError};
pub use layer::{AudioLayer, MusicDescriptor, PlayRange, RandomPlayback, TickRange};
pub use player::{AudioLayerPlayer, PlayOptions, SoundOptions};
pub use pool::{EndAction, SoundPool, SoundRef, SoundReference, SoundState};
pub use save::{AudioSaveData, SaveVersion};
pub use settings::SettingsSnapshot;
pub use sim::{ClipSpec, SimProvider, SimStream, StreamCall};
pub use volume::Category;
