//! Logging Module - 统一的日志系统
//!
//! 基于 tracing：
//! - stderr 彩色输出（给人看）
//! - 日志目录下按天轮转的文件输出（可选 JSON，给机器看）
//! - `RUST_LOG` 覆盖默认过滤器
//! - 外部工具（ffmpeg / ffprobe）调用记录
//!
//! ```no_run
//! use shared_utils::logging::{init_logging, LogConfig};
//!
//! init_logging("size_boost", LogConfig::default()).expect("logging");
//! tracing::info!(target_bytes = 524288, "Search started");
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 日志目录（默认 `<tmp>/size_boost/logs`）
    pub log_dir: PathBuf,
    /// 保留的日志文件数量
    pub max_files: usize,
    pub level: Level,
    /// 文件层输出 JSON 行
    pub json: bool,
    /// 关闭 stderr 层（`--json` 输出时避免污染 stdout 的管道消费者）
    pub quiet_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: std::env::temp_dir().join("size_boost").join("logs"),
            max_files: 5,
            level: Level::INFO,
            json: false,
            quiet_stderr: false,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.log_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_max_files(mut self, count: usize) -> Self {
        self.max_files = count;
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn with_quiet_stderr(mut self, quiet: bool) -> Self {
        self.quiet_stderr = quiet;
        self
    }
}

/// Default filter: our crates at `level`, everything else at warn.
fn default_filter(level: Level) -> String {
    ["size_boost", "shared_utils", "img_target", "anim_target"]
        .iter()
        .map(|krate| format!("{}={}", krate, level))
        .chain(std::iter::once("warn".to_string()))
        .collect::<Vec<_>>()
        .join(",")
}

/// 初始化全局 subscriber（进程内只能调用一次）。
///
/// 日志文件名为 `{program_name}.log.YYYY-MM-DD`。
pub fn init_logging(program_name: &str, config: LogConfig) -> Result<()> {
    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("Failed to create log directory: {:?}", config.log_dir))?;

    let log_file_name = format!("{}.log", program_name);
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &config.log_dir, &log_file_name);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(config.level)));

    let file_layer = if config.json {
        fmt::layer()
            .json()
            .with_writer(file_appender)
            .with_current_span(false)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(file_appender)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .boxed()
    };

    let stderr_layer = (!config.quiet_stderr).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false)
            .with_line_number(false)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("Global tracing subscriber already installed")?;

    tracing::debug!(
        program = program_name,
        log_dir = ?config.log_dir,
        max_files = config.max_files,
        level = ?config.level,
        json = config.json,
        "Logging system initialized"
    );

    cleanup_old_logs(&config.log_dir, program_name, config.max_files)?;

    Ok(())
}

/// 只保留最近的 `max_files` 个日志文件。返回删除数量。
fn cleanup_old_logs(log_dir: &Path, program_name: &str, max_files: usize) -> Result<usize> {
    let entries = std::fs::read_dir(log_dir)
        .with_context(|| format!("Failed to read log directory: {:?}", log_dir))?;

    let prefix = format!("{}.log", program_name);
    let mut log_files: Vec<(PathBuf, SystemTime)> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .map(|n| n.to_string_lossy().starts_with(&prefix))
                .unwrap_or(false)
        })
        .filter_map(|path| {
            let modified = std::fs::metadata(&path).ok()?.modified().ok()?;
            Some((path, modified))
        })
        .collect();

    if log_files.len() <= max_files {
        return Ok(0);
    }

    // 最新的在前
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    let mut removed = 0;
    for (path, _) in log_files.iter().skip(max_files) {
        match std::fs::remove_file(path) {
            Ok(()) => {
                removed += 1;
                tracing::debug!(path = ?path, "Removed old log file");
            }
            Err(e) => tracing::warn!(path = ?path, error = %e, "Failed to remove old log file"),
        }
    }
    Ok(removed)
}

/// Record one external tool invocation (ffmpeg, ffprobe).
///
/// Successful runs log at debug (they happen once per trial); failures log the
/// tail of the tool output at warn so the encode error can be correlated.
pub fn log_external_tool(tool_name: &str, args: &[String], output: &str, exit_code: Option<i32>, duration: Duration) {
    let command = format!("{} {}", tool_name, args.join(" "));

    match exit_code {
        Some(0) => {
            tracing::debug!(
                tool = tool_name,
                command = %command,
                duration_ms = duration.as_millis() as u64,
                "External tool completed"
            );
        }
        Some(code) => {
            tracing::warn!(
                tool = tool_name,
                command = %command,
                duration_ms = duration.as_millis() as u64,
                exit_code = code,
                output = %tail(output, 20),
                "External tool failed"
            );
        }
        None => {
            tracing::warn!(
                tool = tool_name,
                command = %command,
                duration_ms = duration.as_millis() as u64,
                output = %tail(output, 20),
                "External tool terminated by signal"
            );
        }
    }
}

fn tail(output: &str, lines: usize) -> String {
    let all: Vec<&str> = output.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}
