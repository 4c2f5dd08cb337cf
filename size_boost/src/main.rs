use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing::Level;

use anim_target::{convert_to_gif, GifConvertOptions};
use img_target::resize_contain;
use shared_utils::{
    init_logging, AdmissionPolicy, CompressError, EncodeFailurePolicy, LogConfig, QualityRange,
    SearchConfig, ServiceConfig, SizeTarget,
};
use size_boost::{ui, CompressRequest, Compressor};

#[derive(Parser)]
#[command(name = "size-boost")]
#[command(version, about = "Compress images and GIFs to a target file size", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print machine-readable JSON to stdout
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging on stderr (the log file always records everything at the chosen level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log directory (default: <tmp>/size_boost/logs)
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Several size-boost processes share this machine: halve the thread budget
    #[arg(long, global = true)]
    multi_instance: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Search encoding parameters until the output fits the target size
    Compress {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        /// Target size in megabytes (e.g. 0.5)
        #[arg(short, long, value_name = "MB")]
        target_mb: String,
        /// Output file (default: compressed-<name> next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        search: SearchArgs,
    },

    /// Show format and dimensions of a file
    Probe {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },

    /// Resize into a W×H canvas (aspect kept, centred, transparent padding)
    Resize {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        #[arg(long)]
        width: u32,
        /// Omit for auto height
        #[arg(long)]
        height: Option<u32>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert a video or animation to a looping GIF
    Gif {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        #[arg(long, default_value_t = anim_target::convert::DEFAULT_GIF_FPS)]
        fps: u32,
        #[arg(long, default_value_t = anim_target::convert::DEFAULT_GIF_WIDTH)]
        width: u32,
        /// 0 = keep aspect ratio
        #[arg(long, default_value_t = 0)]
        height: u32,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct SearchArgs {
    /// Lowest quality tried by the still-image search
    #[arg(long, default_value_t = shared_utils::config::DEFAULT_QUALITY_MIN)]
    quality_min: u8,
    /// Highest quality tried by the still-image search
    #[arg(long, default_value_t = shared_utils::config::DEFAULT_QUALITY_MAX)]
    quality_max: u8,
    /// Binary-search iterations per scale
    #[arg(long, default_value_t = shared_utils::types::iteration::BINARY_SEARCH_MAX_ITERATIONS)]
    max_iterations: u32,
    /// What the animated search does when one (scale, fps) pair fails: abort | skip-pair
    #[arg(long, default_value = "abort")]
    on_encode_failure: EncodeFailurePolicy,
    /// Request workspace root (default: <tmp>/size_boost)
    #[arg(long, value_name = "DIR")]
    workspace: Option<PathBuf>,
    /// Fail immediately instead of waiting when all search slots are busy
    #[arg(long)]
    reject_when_busy: bool,
}

impl SearchArgs {
    fn service_config(&self) -> Result<ServiceConfig, CompressError> {
        let search = SearchConfig::new()
            .with_quality(QualityRange::new(self.quality_min, self.quality_max)?)
            .with_max_iterations(self.max_iterations)
            .with_encode_failure_policy(self.on_encode_failure);
        let mut config = ServiceConfig::from_env().with_search(search);
        if let Some(root) = &self.workspace {
            config = config.with_workspace_root(root);
        }
        if self.reject_when_busy {
            config = config.with_admission(AdmissionPolicy::Reject);
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    // 必须在任何 ServiceConfig 构造之前（默认容量会被缓存）
    if cli.multi_instance {
        shared_utils::thread_manager::enable_multi_instance_mode();
    }

    let mut log_config = LogConfig::new()
        .with_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_quiet_stderr(!cli.verbose);
    if let Some(dir) = &cli.log_dir {
        log_config = log_config.with_log_dir(dir);
    }
    if let Err(e) = init_logging("size-boost", log_config) {
        eprintln!("⚠️  Logging disabled: {:#}", e);
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report_failure(&e, cli.json),
    }
}

/// Exit code 2 for problems with the request, 1 for everything else.
fn report_failure(err: &anyhow::Error, as_json: bool) -> ExitCode {
    let compress_err = err.downcast_ref::<CompressError>();
    let client = compress_err.is_some_and(CompressError::is_client_error);
    tracing::error!(error = %format!("{:#}", err), client, "Command failed");

    if as_json {
        let body = json!({
            "error": {
                "kind": compress_err.map_or("internal", CompressError::kind),
                "message": format!("{:#}", err),
                "suggestion": compress_err.and_then(CompressError::suggestion),
            }
        });
        println!("{}", body);
    } else {
        match compress_err {
            Some(e) => ui::print_error(e),
            None => eprintln!("{} {:#}", ui::error().apply_to("❌"), err),
        }
    }

    ExitCode::from(if client { 2 } else { 1 })
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Compress {
            input,
            target_mb,
            output,
            search,
        } => {
            let target: SizeTarget = target_mb.parse()?;
            let config = search.service_config()?;
            let bytes = std::fs::read(input)
                .map_err(|e| CompressError::probe(input, e.to_string()))?;

            let mut request = CompressRequest::new(bytes, target);
            if let Some(name) = input.file_name().and_then(|n| n.to_str()) {
                request = request.with_file_name(name);
            }

            let compressor = Compressor::new(config);
            let spinner = ui::spinner("size-boost", &format!("Searching for ≤ {}", target.as_file_size().display()), cli.json);
            let result = compressor.compress(&request);
            spinner.finish_and_clear();
            let response = result?;

            let output = output
                .clone()
                .unwrap_or_else(|| sibling(input, &response.suggested_name));
            std::fs::write(&output, &response.bytes)
                .with_context(|| format!("Failed to write output: {}", output.display()))?;

            if cli.json {
                let mut body = serde_json::to_value(&response)?;
                body["output"] = json!(output);
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                ui::print_compress_report(&response, &output.display().to_string());
            }
        }

        Commands::Probe { input } => {
            let compressor = Compressor::new(ServiceConfig::from_env());
            let (format, info) = compressor.inspect(input)?;
            if cli.json {
                let body = json!({ "file": input, "format": format, "info": info });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                ui::print_probe_report(&input.display().to_string(), format, &info);
            }
        }

        Commands::Resize {
            input,
            width,
            height,
            output,
        } => {
            let bytes = std::fs::read(input)
                .map_err(|e| CompressError::probe(input, e.to_string()))?;
            let resized = resize_contain(&bytes, *width, *height)?;
            let output = output.clone().unwrap_or_else(|| {
                sibling(input, &format!("resized-{}.{}", stem(input), resized.format.extension()))
            });
            std::fs::write(&output, &resized.bytes)
                .with_context(|| format!("Failed to write output: {}", output.display()))?;

            if cli.json {
                let body = json!({ "output": output, "resize": resized });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                ui::print_resize_report(&resized, &output.display().to_string());
            }
        }

        Commands::Gif {
            input,
            fps,
            width,
            height,
            output,
        } => {
            let options = GifConvertOptions {
                fps: *fps,
                width: *width,
                height: *height,
            };
            let output = output
                .clone()
                .unwrap_or_else(|| sibling(input, &format!("{}-converted.gif", stem(input))));

            let spinner = ui::spinner("size-boost", "Converting to GIF", cli.json);
            let result = convert_to_gif(input, &output, options);
            spinner.finish_and_clear();
            let size = result?;

            if cli.json {
                let body = json!({ "output": output, "size": size.bytes(), "fps": fps, "width": width, "height": height });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                ui::print_gif_report(&output.display().to_string(), size);
            }
        }
    }
    Ok(())
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("file")
        .to_string()
}

fn sibling(input: &Path, name: &str) -> PathBuf {
    input
        .parent()
        .map(|dir| dir.join(name))
        .unwrap_or_else(|| PathBuf::from(name))
}
