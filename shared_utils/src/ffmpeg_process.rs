//! External tool runner (ffmpeg / ffprobe)
//!
//! - 启动前用 `which` 确认工具存在 → `ToolNotFound`
//! - `Command::output()` 同时读取 stdout / stderr，不会因管道缓冲区满而死锁
//! - 每次调用都经 `log_external_tool` 记录
//! - 失败时从 stderr 中提取最有意义的一行，并附带可操作的建议

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use crate::errors::{CompressError, Result};
use crate::logging::log_external_tool;

/// Captured result of one tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Locate a tool on PATH.
pub fn locate_tool(tool: &str) -> Result<PathBuf> {
    which::which(tool).map_err(|_| CompressError::ToolNotFound(tool.to_string()))
}

/// Path as a command-line argument; relative paths starting with `-` get a
/// `./` prefix so ffmpeg does not parse them as options.
pub fn safe_path_arg(path: &Path) -> OsString {
    if path.as_os_str().to_string_lossy().starts_with('-') {
        Path::new(".").join(path).into_os_string()
    } else {
        path.as_os_str().to_owned()
    }
}

/// Run `tool args…`, capturing both streams. A non-zero exit is *not* an
/// error here; callers decide how to classify it.
pub fn run_tool(tool: &str, args: &[OsString]) -> Result<ToolOutput> {
    let program = locate_tool(tool)?;
    let printable: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();

    let start = Instant::now();
    let output = Command::new(&program).args(args).output()?;
    let duration = start.elapsed();

    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    let exit_code = output.status.code();
    log_external_tool(tool, &printable, &stderr, exit_code, duration);

    Ok(ToolOutput {
        exit_code,
        stdout: output.stdout,
        stderr,
    })
}

/// Run ffmpeg; any failure becomes `EncodeFailure` labelled with `params`.
pub fn run_ffmpeg(args: &[OsString], params: &str) -> Result<()> {
    let output = run_tool("ffmpeg", args)?;
    if output.success() {
        return Ok(());
    }
    Err(CompressError::EncodeFailure {
        params: params.to_string(),
        message: match output.exit_code {
            Some(code) => format!("ffmpeg exited with {}: {}", code, format_ffmpeg_error(&output.stderr)),
            None => format!("ffmpeg terminated by signal: {}", format_ffmpeg_error(&output.stderr)),
        },
        suggestion: get_error_suggestion(&output.stderr),
    })
}

/// 从 stderr 中提取最有意义的错误信息
///
/// 1. 优先最后一行包含 "Error"/"error" 的内容
/// 2. 其次最后一行非进度内容
/// 3. 全空 → "Unknown FFmpeg error"
pub fn format_ffmpeg_error(stderr: &str) -> String {
    if let Some(error_line) = stderr
        .lines()
        .rev()
        .find(|line| line.contains("Error") || line.contains("error"))
    {
        return error_line.trim().to_string();
    }

    stderr
        .lines()
        .rev()
        .find(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty()
                && !trimmed.starts_with("frame=")
                && !trimmed.starts_with("fps=")
                && !trimmed.starts_with("size=")
        })
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "Unknown FFmpeg error".to_string())
}

/// 常见错误模式 → 建议
pub fn get_error_suggestion(stderr: &str) -> Option<String> {
    let patterns = [
        ("No such file or directory", "Check that the source file still exists in the workspace"),
        ("Invalid data found", "The source file may be corrupt; re-export it and upload again"),
        ("Permission denied", "Check read/write permissions on the workspace directory"),
        ("No space left on device", "Free disk space under the workspace root"),
        ("Cannot allocate memory", "Lower the search pool capacity (SIZE_BOOST_MAX_SEARCHES)"),
        ("Output file is empty", "The trial produced no frames; try a lower frame-rate ladder"),
        ("Unknown encoder", "Install an ffmpeg build with the gif encoder enabled"),
        ("does not contain any stream", "The source has no video stream to convert"),
    ];

    patterns
        .iter()
        .find(|(pattern, _)| stderr.contains(pattern))
        .map(|(_, suggestion)| suggestion.to_string())
}
