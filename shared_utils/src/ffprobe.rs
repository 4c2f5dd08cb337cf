//! FFprobe wrapper
//!
//! `ffprobe -print_format json -show_format -show_streams` → `MediaInfo`。
//! 只看第一个视频流；没有视频流或尺寸为 0 都视为探测失败。

use serde::Deserialize;
use std::ffi::OsString;
use std::path::Path;

use crate::errors::{CompressError, Result};
use crate::ffmpeg_process::{format_ffmpeg_error, run_tool, safe_path_arg};
use crate::media_format::MediaFormat;
use crate::probe::{MediaInfo, Probe};

#[derive(Debug, Deserialize)]
struct ProbeJson {
    #[serde(default)]
    streams: Vec<StreamJson>,
    format: Option<FormatJson>,
}

#[derive(Debug, Deserialize)]
struct StreamJson {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FormatJson {
    format_name: Option<String>,
    duration: Option<String>,
}

/// Probe backed by the `ffprobe` binary.
#[derive(Debug, Clone, Default)]
pub struct FfprobeProbe;

impl FfprobeProbe {
    pub fn new() -> Self {
        Self
    }
}

impl Probe for FfprobeProbe {
    fn inspect(&self, path: &Path) -> Result<MediaInfo> {
        if !path.is_file() {
            return Err(CompressError::probe(path, "not a regular file"));
        }

        let args: Vec<OsString> = vec![
            "-v".into(),
            "error".into(),
            "-print_format".into(),
            "json".into(),
            "-show_format".into(),
            "-show_streams".into(),
            safe_path_arg(path),
        ];
        let output = run_tool("ffprobe", &args)?;
        if !output.success() {
            return Err(CompressError::probe(path, format_ffmpeg_error(&output.stderr)));
        }

        parse_probe_output(path, &output.stdout)
    }
}

fn parse_probe_output(path: &Path, stdout: &[u8]) -> Result<MediaInfo> {
    let json: ProbeJson = serde_json::from_slice(stdout)
        .map_err(|e| CompressError::probe(path, format!("unreadable ffprobe output: {}", e)))?;

    let stream = json
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| CompressError::probe(path, "no video stream found"))?;

    let width = stream.width.unwrap_or(0);
    let height = stream.height.unwrap_or(0);
    if width == 0 || height == 0 {
        return Err(CompressError::probe(path, "stream has no dimensions"));
    }

    let format_name = json
        .format
        .as_ref()
        .and_then(|f| f.format_name.clone())
        .or_else(|| stream.codec_name.clone())
        .unwrap_or_else(|| "unknown".to_string());

    let format = stream
        .codec_name
        .as_deref()
        .and_then(codec_to_format)
        .or_else(|| format_name.split(',').find_map(codec_to_format));

    let frame_rate = stream.r_frame_rate.as_deref().and_then(parse_frame_rate);
    let duration_secs = json
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok());
    let frame_count = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse::<u64>().ok())
        .or_else(|| match (duration_secs, frame_rate) {
            (Some(d), Some(r)) if d > 0.0 => Some((d * r).round() as u64),
            _ => None,
        });

    Ok(MediaInfo {
        width,
        height,
        format_name,
        format,
        frame_count,
        frame_rate,
        duration_secs,
    })
}

fn codec_to_format(name: &str) -> Option<MediaFormat> {
    match name {
        "gif" => Some(MediaFormat::Gif),
        "png" | "apng" | "png_pipe" => Some(MediaFormat::Png),
        "mjpeg" | "jpeg_pipe" => Some(MediaFormat::Jpeg),
        "webp" | "webp_pipe" => Some(MediaFormat::WebP),
        _ => None,
    }
}

/// "15/1" → 15.0, "30000/1001" → 29.97; "0/0" → None
pub fn parse_frame_rate(raw: &str) -> Option<f64> {
    let (num, den) = match raw.split_once('/') {
        Some((n, d)) => (n.trim().parse::<f64>().ok()?, d.trim().parse::<f64>().ok()?),
        None => (raw.trim().parse::<f64>().ok()?, 1.0),
    };
    if den == 0.0 || num <= 0.0 {
        return None;
    }
    Some(num / den)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIF_JSON: &str = r#"{
        "streams": [
            {"index": 0, "codec_name": "gif", "codec_type": "video",
             "width": 640, "height": 360, "r_frame_rate": "10/1", "nb_frames": "48"}
        ],
        "format": {"format_name": "gif", "duration": "4.800000"}
    }"#;

    const MP4_JSON: &str = r#"{
        "streams": [
            {"codec_name": "aac", "codec_type": "audio"},
            {"codec_name": "h264", "codec_type": "video",
             "width": 1920, "height": 1080, "r_frame_rate": "30000/1001"}
        ],
        "format": {"format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "10.0"}
    }"#;

    #[test]
    fn test_parse_gif() {
        let info = parse_probe_output(Path::new("a.gif"), GIF_JSON.as_bytes()).unwrap();
        assert_eq!((info.width, info.height), (640, 360));
        assert_eq!(info.format, Some(MediaFormat::Gif));
        assert_eq!(info.frame_count, Some(48));
        assert_eq!(info.frame_rate, Some(10.0));
    }

    #[test]
    fn test_parse_video_skips_audio_stream() {
        let info = parse_probe_output(Path::new("a.mp4"), MP4_JSON.as_bytes()).unwrap();
        assert_eq!(info.width, 1920);
        assert_eq!(info.format, None);
        assert!(info.format_name.starts_with("mov"));
        // nb_frames 缺失时由时长 × 帧率推算
        assert_eq!(info.frame_count, Some(300));
    }

    #[test]
    fn test_no_video_stream_is_probe_failure() {
        let json = r#"{"streams": [{"codec_type": "audio"}], "format": {}}"#;
        let err = parse_probe_output(Path::new("a.mp3"), json.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), "probe_failure");
    }

    #[test]
    fn test_garbage_output_is_probe_failure() {
        let err = parse_probe_output(Path::new("x"), b"not json").unwrap_err();
        assert!(err.to_string().contains("unreadable ffprobe output"));
    }

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("15/1"), Some(15.0));
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        assert_eq!(parse_frame_rate("abc"), None);
    }

    #[test]
    fn test_missing_file_is_probe_failure() {
        let err = FfprobeProbe::new().inspect(Path::new("/nonexistent/clip.gif")).unwrap_err();
        assert_eq!(err.kind(), "probe_failure");
    }
}
