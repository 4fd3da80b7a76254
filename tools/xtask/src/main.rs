//! # xtask - 开发辅助工具
//!
//! 用法：`cargo run -p xtask -- <command>`
//!
//! - `check-all`: fmt、clippy、test 门禁
//! - `cov-audio`: vn-audio 覆盖率报告（需要 cargo-llvm-cov）
//! - `scenario-check [path]`: 用 host-cli 跑场景文件并校验输出的存档

use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use anyhow::{Context, bail};
use vn_audio::AudioSaveData;

const DEFAULT_SCENARIO_DIR: &str = "host-cli/scenarios";

const HELP: &str = "\
xtask - 开发辅助工具

USAGE:
  cargo run -p xtask -- <command>

COMMANDS:
  check-all                 fmt、clippy、test 门禁检查
  cov-audio                 vn-audio 覆盖率报告
  scenario-check [path]     运行场景文件（默认 host-cli/scenarios/ 下全部 .json）
";

#[derive(Debug, PartialEq, Eq)]
enum Task {
    CheckAll,
    CovAudio,
    ScenarioCheck(Option<PathBuf>),
    Help,
}

impl Task {
    fn parse(mut args: impl Iterator<Item = String>) -> anyhow::Result<Self> {
        let task = match args.next().as_deref() {
            None | Some("help" | "-h" | "--help") => Task::Help,
            Some("check-all") => Task::CheckAll,
            Some("cov-audio") => Task::CovAudio,
            Some("scenario-check") => Task::ScenarioCheck(args.next().map(PathBuf::from)),
            Some(other) => bail!("未知命令: {other}"),
        };
        Ok(task)
    }
}

/// 依次运行 cargo 子命令，任一失败即停止
fn cargo_steps(steps: &[&[&str]]) -> anyhow::Result<()> {
    for args in steps {
        let label = format!("cargo {}", args.join(" "));
        eprintln!("\n==> {label}");
        let status = Command::new("cargo")
            .args(*args)
            .status()
            .with_context(|| format!("无法启动 {label}"))?;
        if !status.success() {
            bail!("{label} 失败 ({status})");
        }
    }
    Ok(())
}

fn coverage() -> anyhow::Result<()> {
    let available = Command::new("cargo")
        .args(["llvm-cov", "--version"])
        .output()
        .is_ok_and(|o| o.status.success());
    if !available {
        bail!("cargo llvm-cov 不可用，请先安装 cargo-llvm-cov 与 llvm-tools-preview");
    }

    cargo_steps(&[&["llvm-cov", "-p", "vn-audio", "--html"]])?;
    eprintln!("\n覆盖率报告: target/llvm-cov/html/index.html");
    Ok(())
}

fn main() -> ExitCode {
    let result = Task::parse(std::env::args().skip(1)).and_then(|task| match task {
        Task::CheckAll => cargo_steps(&[
            &["fmt", "--all", "--", "--check"],
            &["clippy", "--workspace", "--all-targets"],
            &["test", "--workspace"],
        ]),
        Task::CovAudio => coverage(),
        Task::ScenarioCheck(path) => scenario_check(path.as_deref()),
        Task::Help => {
            eprint!("{HELP}");
            Ok(())
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("xtask: {e:#}");
            ExitCode::FAILURE
        }
    }
}

// ===== scenario-check =====

fn scenario_check(path: Option<&Path>) -> anyhow::Result<()> {
    let root = path.unwrap_or(Path::new(DEFAULT_SCENARIO_DIR));
    let files = if root.is_file() {
        vec![root.to_path_buf()]
    } else if root.is_dir() {
        collect_scenario_files(root)?
    } else {
        bail!("场景路径不存在: {}（请在 workspace 根目录运行）", root.display());
    };

    if files.is_empty() {
        eprintln!("未找到场景文件（.json）");
        return Ok(());
    }

    eprintln!("==> 运行 {} 个场景文件\n", files.len());
    let mut failed = 0;
    for file in &files {
        match check_scenario_file(file) {
            Ok(data) => eprintln!("  ✓ {} ({} 层仍在播放)", file.display(), data.playing_count()),
            Err(e) => {
                eprintln!("  ✗ {}: {e:#}", file.display());
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} 个场景运行失败");
    }
    Ok(())
}

/// 递归收集目录下的 .json 文件，按路径排序
fn collect_scenario_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut pending = vec![dir.to_path_buf()];
    let mut files = Vec::new();

    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir).with_context(|| format!("读取目录失败: {}", dir.display()))? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

fn check_scenario_file(file: &Path) -> anyhow::Result<AudioSaveData> {
    let output = Command::new("cargo")
        .args(["run", "--quiet", "-p", "host-cli", "--", "--scenario"])
        .arg(file)
        .output()?;
    if !output.status.success() {
        bail!(
            "host-cli 失败 ({}):\n{}",
            output.status,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    let stdout = String::from_utf8(output.stdout)?;
    Ok(AudioSaveData::from_json(&stdout)?)
}
