//! # Ambient 模块
//!
//! 随机环境音的时间采样。
//!
//! 每次倒计时归零时：
//!
//! ```text
//! play_time   = min(片段剩余帧数, U(play_time.min, play_time.max))
//! start_timer = play_time + play_range.start + U(0,1) * (play_range.end - play_range.start)
//! ```

use rand::Rng;

use crate::layer::{PlayRange, RandomPlayback, TickRange};

/// 采样一次播放时长（帧）
pub fn sample_play_time<R: Rng + ?Sized>(rng: &mut R, range: TickRange, time_left: f64) -> u32 {
    let (lo, hi) = if range.min <= range.max {
        (range.min, range.max)
    } else {
        (range.max, range.min)
    };
    let drawn = rng.gen_range(lo as f64..=hi as f64);
    drawn.min(time_left.max(0.0)).round() as u32
}

/// 采样播放窗口内的偏移（帧）
pub fn sample_window_offset<R: Rng + ?Sized>(rng: &mut R, range: PlayRange) -> u32 {
    let span = range.end.saturating_sub(range.start) as f64;
    let u: f64 = rng.gen_range(0.0..1.0);
    range.start + (u * span).floor() as u32
}

/// 由本次播放时长推导下一次倒计时
pub fn sample_start_timer<R: Rng + ?Sized>(rng: &mut R, play_time: u32, range: PlayRange) -> u32 {
    play_time.saturating_add(sample_window_offset(rng, range))
}

/// 把 `end == 0` 的窗口替换为片段时长
pub fn resolve_play_range(range: PlayRange, duration_ticks: f64) -> PlayRange {
    if range.is_open_ended() {
        PlayRange {
            start: range.start,
            end: duration_ticks.max(0.0).round() as u32,
        }
    } else {
        range
    }
}

/// 倒计时归零时的一次重采样结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Burst {
    /// 本次播放时长
    pub play_time: u32,
    /// 新的倒计时
    pub start_timer: u32,
}

/// 对随机状态执行一次重采样，并写回新的倒计时
pub fn resample<R: Rng + ?Sized>(rng: &mut R, state: &mut RandomPlayback, time_left: f64) -> Burst {
    let play_time = sample_play_time(rng, state.play_time, time_left);
    let start_timer = sample_start_timer(rng, play_time, state.play_range);
    state.start_timer = start_timer;
    Burst {
        play_time,
        start_timer,
    }
}
