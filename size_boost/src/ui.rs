//! Terminal output for the CLI: spinner, colours and human-readable reports.

use std::time::Duration;

use console::{style, Style};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use img_target::ResizedImage;
use shared_utils::{CompressError, FileSize, MediaFormat, MediaInfo};

use crate::response::CompressResponse;

pub const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";
pub const SPINNER_TEMPLATE: &str = "{spinner:.green} {prefix:.cyan.bold} • ⏱️ {elapsed_precise} • {msg}";

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

pub fn success() -> Style {
    Style::new().green().bold()
}

pub fn warning() -> Style {
    Style::new().yellow()
}

pub fn error() -> Style {
    Style::new().red().bold()
}

/// Spinner on stderr; hidden when `quiet` (e.g. `--json`).
pub fn spinner(prefix: &str, message: &str, quiet: bool) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if quiet {
        pb.set_draw_target(ProgressDrawTarget::hidden());
        return pb;
    }
    // 模板是常量，解析失败时退回默认样式
    if let Ok(style) = ProgressStyle::default_spinner().template(SPINNER_TEMPLATE) {
        pb.set_style(style.tick_chars(SPINNER_CHARS));
    }
    pb.set_prefix(prefix.to_string());
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn print_compress_report(response: &CompressResponse, output: &str) {
    let verdict = if response.achieved {
        success().apply_to("✅ Target reached")
    } else {
        warning().apply_to("⚠️  Target not reachable, returning smallest result")
    };
    let change = response
        .size_change_percent()
        .map(|p| format!(" ({:+.1}%)", p))
        .unwrap_or_default();

    println!("\n📊 Compression Report");
    println!("{}", RULE);
    println!("{}", verdict);
    println!("📁 Output:   {}", output);
    println!("📦 Format:   {} → {}", response.source_format, response.format);
    println!("💾 Original: {}", response.original().display());
    println!("🎯 Target:   {}", FileSize::new(response.target_bytes).display());
    println!(
        "📉 Result:   {}{}",
        style(response.compressed().display()).blue().bold(),
        change
    );
    println!("🔧 Params:   {}", response.params);
    println!("🔍 Trials:   {} in {} ms", response.trials, response.elapsed_ms);
    println!("{}", RULE);
}

pub fn print_probe_report(path: &str, format: MediaFormat, info: &MediaInfo) {
    println!("\n📊 Media Info");
    println!("{}", RULE);
    println!("📁 File:       {}", path);
    println!("📦 Format:     {} ({})", format, info.format_name);
    println!("📐 Resolution: {}x{}", info.width, info.height);
    if let Some(frames) = info.frame_count {
        match info.frame_rate {
            Some(fps) => println!("🎞️  Frames:     {} @ {:.2} fps", frames, fps),
            None => println!("🎞️  Frames:     {}", frames),
        }
    }
    if let Some(duration) = info.duration_secs {
        println!("⏱️  Duration:   {:.2}s", duration);
    }
    println!("{}", RULE);
}

pub fn print_resize_report(resized: &ResizedImage, output: &str) {
    println!(
        "{} {} → {} (canvas {}, content {})",
        success().apply_to("✅ Resized"),
        output,
        resized.format,
        resized.canvas,
        resized.content
    );
}

pub fn print_gif_report(output: &str, size: FileSize) {
    println!("{} {} ({})", success().apply_to("✅ GIF written"), output, size.display());
}

pub fn print_error(err: &CompressError) {
    eprintln!("{} {}", error().apply_to("❌"), err);
    if let Some(hint) = err.suggestion() {
        eprintln!("   💡 {}", hint);
    }
}
