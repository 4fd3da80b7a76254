//! # Pool 模块
//!
//! 音效/语音引用池。
//!
//! 同名音效反复播放时复用第一个空闲引用，只有全部引用都在使用中
//! 才追加新引用，避免快速重复播放导致无限增长。

use std::collections::HashMap;

use crate::backend::StreamId;

/// 引用状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundState {
    /// 空闲，可复用
    Idle,
    /// 等待解码，`since` 为请求时的帧号
    Loading { since: u64 },
    /// 播放中
    Playing,
}

/// 播放结束后执行的动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndAction {
    /// 以指定淡入帧数恢复主音乐层
    ResumeMusic { fade_in: u32 },
}

/// 引用键：音效名 + 池内编号
///
/// 编号在池内单调递增，删除其他引用不会改变已发出的键。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SoundRef {
    pub name: String,
    pub id: u64,
}
/// 池化的音效/语音引用
#[derive(Debug, Clone, PartialEq)]
pub struct SoundReference {
    pub stream: StreamId,
    pub state: SoundState,
    pub voice: bool,
    /// 调用音量（0 - 100）
    pub base_volume: u32,
    /// 当前句柄增益（0.0 - 1.0）
    pub volume: f32,
    /// 播放速率（百分比）
    pub rate: u32,
    pub looping: bool,
    pub on_end: Option<EndAction>,
}

impl SoundReference {
    pub fn new(stream: StreamId, voice: bool) -> Self {
        Self {
            stream,
            state: SoundState::Idle,
            voice,
            base_volume: 0,
            volume: 0.0,
            rate: 0,
            looping: false,
            on_end: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == SoundState::Idle
    }

    pub fn is_playing(&self) -> bool {
        self.state == SoundState::Playing
    }
}

#[derive(Debug, Clone)]
struct Entry {
    id: u64,
    reference: SoundReference,
}

/// 音效引用池（名称 -> 有序引用列表）
#[derive(Debug, Clone, Default)]
pub struct SoundPool {
    entries: HashMap<String, Vec<Entry>>,
    next_id: u64,
}

impl SoundPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// 第一个空闲且分类相同的引用
    ///
    /// 音效与语音使用不同的分类音量，不互相复用。
    pub fn find_idle(&self, name: &str, voice: bool) -> Option<SoundRef> {
        self.entries
            .get(name)?
            .iter()
            .find(|e| e.reference.is_idle() && e.reference.voice == voice)
            .map(|e| SoundRef {
                name: name.to_string(),
                id: e.id,
            })
    }

    /// 追加新引用，返回其键
    pub fn push(&mut self, name: &str, reference: SoundReference) -> SoundRef {
        let id = self.next_id;
        self.next_id += 1;
        self.entries
            .entry(name.to_string())
            .or_default()
            .push(Entry { id, reference });
        SoundRef {
            name: name.to_string(),
            id,
        }
    }

    pub fn get(&self, key: &SoundRef) -> Option<&SoundReference> {
        self.entries
            .get(&key.name)?
            .iter()
            .find(|e| e.id == key.id)
            .map(|e| &e.reference)
    }

    pub fn get_mut(&mut self, key: &SoundRef) -> Option<&mut SoundReference> {
        self.entries
            .get_mut(&key.name)?
            .iter_mut()
            .find(|e| e.id == key.id)
            .map(|e| &mut e.reference)
    }

    pub fn contains(&self, key: &SoundRef) -> bool {
        self.get(key).is_some()
    }

    /// 某名称下的引用
    pub fn named_mut(&mut self, name: &str) -> impl Iterator<Item = &mut SoundReference> {
        self.entries
            .get_mut(name)
            .into_iter()
            .flatten()
            .map(|e| &mut e.reference)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SoundRef, &SoundReference)> {
        self.entries.iter().flat_map(|(name, list)| {
            list.iter().map(move |e| {
                (
                    SoundRef {
                        name: name.clone(),
                        id: e.id,
                    },
                    &e.reference,
                )
            })
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SoundReference> {
        self.entries
            .values_mut()
            .flatten()
            .map(|e| &mut e.reference)
    }

    /// 删除满足条件的引用，返回删除数量
    pub fn remove_where(&mut self, mut predicate: impl FnMut(&SoundReference) -> bool) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, list| {
            let before = list.len();
            list.retain(|e| !predicate(&e.reference));
            removed += before - list.len();
            !list.is_empty()
        });
        removed
    }

    /// 某名称下的引用数量
    pub fn len_of(&self, name: &str) -> usize {
        self.entries.get(name).map_or(0, Vec::len)
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
