//! # Host CLI
//!
//! 无界面音频宿主：读取场景文件，按帧驱动音频层播放器（模拟后端），
//! 结束后把音频存档 JSON 打印到标准输出。
//!
//! ## 用法
//!
//! ```bash
//! cargo run -p host-cli -- --scenario host-cli/scenarios/forest.json
//! cargo run -p host-cli -- --scenario forest.json --config audio.json --ticks 600
//! cargo run -p host-cli -- --scenario forest.json --clip Audio/Music/wind=16600
//! RUST_LOG=vn_audio=debug cargo run -p host-cli -- --scenario forest.json
//! ```

mod scenario;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vn_audio::{AudioConfig, AudioLayerPlayer, ClipSpec, SimProvider};

use crate::scenario::{Host, Scenario};

/// 最后一个操作之后继续运行的帧数
const TAIL_TICKS: u64 = 60;

#[derive(Parser)]
#[command(name = "host-cli")]
#[command(about = "无界面音频宿主 - 按场景文件驱动音频层播放器")]
#[command(version)]
struct Cli {
    /// 场景文件（JSON）
    #[arg(short, long)]
    scenario: PathBuf,

    /// 音频配置文件（JSON，缺省使用默认配置）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 运行帧数（默认：最后一个操作之后再运行 60 帧）
    #[arg(short, long)]
    ticks: Option<u64>,

    /// 片段时长，格式 `逻辑路径=毫秒`，可多次指定
    #[arg(long = "clip", value_parser = parse_clip)]
    clips: Vec<(String, f64)>,
}

fn parse_clip(arg: &str) -> Result<(String, f64), String> {
    let (path, ms) = arg
        .split_once('=')
        .ok_or_else(|| format!("格式应为 path=ms: {arg}"))?;
    let ms: f64 = ms
        .trim()
        .parse()
        .map_err(|e| format!("无效的时长 {ms}: {e}"))?;
    if ms <= 0.0 {
        return Err(format!("时长必须大于 0: {arg}"));
    }
    Ok((path.trim().to_string(), ms))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AudioConfig::read(path)
            .with_context(|| format!("无法加载音频配置: {}", path.display()))?,
        None => AudioConfig::default(),
    };
    let scenario = Scenario::read(&cli.scenario)?;

    let mut provider = SimProvider::new().with_frame_ms(config.frame_ms);
    for (path, ms) in &cli.clips {
        provider.add_clip(path.as_str(), ClipSpec::new(*ms));
    }

    let ticks = cli.ticks.unwrap_or(scenario.last_step() + TAIL_TICKS);
    info!(
        scenario = %cli.scenario.display(),
        steps = scenario.steps.len(),
        ticks = ticks,
        layers = config.layer_count,
        "开始运行场景"
    );

    let player = AudioLayerPlayer::new(provider, config, scenario.settings);
    let mut host = Host::new(player, scenario.settings);
    host.run(&scenario, ticks)?;

    let snapshot = host.player.snapshot();
    info!(
        playing = snapshot.playing_count(),
        sounds = host.player.pool().len(),
        streams = host.player.provider().stream_count(),
        "场景结束"
    );
    println!("{}", snapshot.to_json()?);
    Ok(())
}
