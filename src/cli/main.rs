//! Photo Splicer command-line interface
//!
//! `serve` runs the HTTP service; `remove` runs one file through the same
//! remover and export step the web UI uses.

use super::config::CliConfigBuilder;
use crate::{
    config::{
        ExecutionProvider, InputMode, RemovalBackendKind, DEFAULT_MAX_BODY_BYTES,
        DEFAULT_MODEL_URL, DEFAULT_REMOVE_BG_ENDPOINT,
    },
    remover::build_remover,
    server,
    services::ExportService,
    tracing_config::{spans, TracingConfig, TracingFormat},
    types::BackgroundColor,
};
use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};
use tracing::Instrument;

/// Photo Splicer background removal service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "photo-splicer")]
pub struct Cli {
    /// Increase logging verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format (console, compact, json)
    #[arg(long, global = true, env = "PHOTO_SPLICER_LOG_FORMAT", default_value = "console")]
    pub log_format: TracingFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the upload UI and the removal endpoint
    Serve(ServeArgs),
    /// Remove the background from a single image file
    Remove(RemoveArgs),
    /// Show ONNX Runtime execution provider availability
    Providers,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Interface to bind
    #[arg(long, env = "PHOTO_SPLICER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind
    #[arg(short, long, env = "PHOTO_SPLICER_PORT", default_value_t = 3000)]
    pub port: u16,

    /// HTTP worker threads (0 = one per core)
    #[arg(long, env = "PHOTO_SPLICER_WORKERS", default_value_t = 0)]
    pub workers: usize,

    /// Maximum accepted upload size in bytes
    #[arg(long, env = "PHOTO_SPLICER_MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// Load the segmentation model at startup instead of on the first request
    #[arg(long, env = "PHOTO_SPLICER_EAGER_INIT")]
    pub eager_init: bool,

    #[command(flatten)]
    pub backend: BackendArgs,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Input image (PNG, JPEG or WebP)
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output file [default: splicer-result.png / .jpg next to the input]
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Background: transparent, a palette name (white, black, red, blue) or #rrggbb
    #[arg(short, long, default_value = "transparent")]
    pub background: BackgroundColor,

    #[command(flatten)]
    pub backend: BackendArgs,
}

/// Options selecting and tuning the removal strategy
#[derive(Args, Debug)]
pub struct BackendArgs {
    /// Removal strategy (remote-api, local-model)
    #[arg(long, env = "PHOTO_SPLICER_BACKEND", default_value = "remote-api")]
    pub backend: RemovalBackendKind,

    /// remove.bg API key
    #[arg(long, env = "REMOVE_BG_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// remove.bg compatible endpoint
    #[arg(long, env = "PHOTO_SPLICER_REMOTE_ENDPOINT", default_value = DEFAULT_REMOVE_BG_ENDPOINT)]
    pub remote_endpoint: String,

    /// Remote API timeout in seconds
    #[arg(long, env = "PHOTO_SPLICER_REMOTE_TIMEOUT", default_value_t = 60)]
    pub remote_timeout: u64,

    /// Local ONNX model file
    #[arg(long, env = "PHOTO_SPLICER_MODEL_PATH", value_name = "PATH")]
    pub model_path: Option<PathBuf>,

    /// ONNX model URL used when no local model is given
    #[arg(long, env = "PHOTO_SPLICER_MODEL_URL", default_value = DEFAULT_MODEL_URL)]
    pub model_url: String,

    /// Refuse to load models from the local filesystem
    #[arg(long, env = "PHOTO_SPLICER_DISALLOW_LOCAL_MODELS")]
    pub disallow_local_models: bool,

    /// Keep downloaded models in memory only
    #[arg(long, env = "PHOTO_SPLICER_NO_CACHE")]
    pub no_cache: bool,

    /// Model cache directory [default: $PHOTO_SPLICER_CACHE_DIR/models, else the user cache dir]
    #[arg(long, value_name = "PATH")]
    pub cache_dir: Option<PathBuf>,

    /// How uploads reach the local pipeline (memory, temp-file)
    #[arg(long, env = "PHOTO_SPLICER_INPUT_MODE", default_value = "memory")]
    pub input_mode: InputMode,

    /// Directory for temporary uploads
    #[arg(long, env = "PHOTO_SPLICER_TEMP_DIR", value_name = "PATH")]
    pub temp_dir: Option<PathBuf>,

    /// ONNX Runtime execution provider (auto, cpu, cuda, coreml)
    #[arg(short, long, env = "PHOTO_SPLICER_EXECUTION_PROVIDER", default_value = "auto")]
    pub execution_provider: ExecutionProvider,

    /// Intra-op threads (0 = auto)
    #[arg(short, long, env = "PHOTO_SPLICER_THREADS", default_value_t = 0)]
    pub threads: usize,

    /// Square model input size
    #[arg(long, env = "PHOTO_SPLICER_TARGET_SIZE", default_value_t = 1024)]
    pub target_size: u32,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    TracingConfig::new()
        .with_verbosity(cli.verbose)
        .with_format(cli.log_format)
        .init()
        .context("Failed to initialize tracing")?;

    match cli.command {
        Command::Serve(args) => serve(&args).await,
        Command::Remove(args) => remove(&args).await,
        Command::Providers => {
            show_providers();
            Ok(())
        },
    }
}

async fn serve(args: &ServeArgs) -> Result<()> {
    let config = CliConfigBuilder::from_serve_args(args).context("Invalid configuration")?;
    let span = spans::serve(&config.bind_address(), &config.backend.to_string());

    server::run(config)
        .instrument(span)
        .await
        .context("Server failed")
}

async fn remove(args: &RemoveArgs) -> Result<()> {
    let config = CliConfigBuilder::from_backend_args(&args.backend)
        .build()
        .context("Invalid configuration")?;
    let span = spans::file_processing(&args.input, &args.background.to_string());

    async {
        let remover = build_remover(&config)?;
        let input = tokio::fs::read(&args.input)
            .await
            .with_context(|| format!("Failed to read {}", args.input.display()))?;

        let start = instant::Instant::now();
        let cutout = remover
            .remove_background(Bytes::from(input))
            .await
            .context("Background removal failed")?;
        let exported = ExportService::export(cutout, args.background)?;

        let output = args
            .output
            .clone()
            .unwrap_or_else(|| default_output_path(&args.input, exported.file_name));
        warn_on_extension_mismatch(&output, exported.content_type);

        tokio::fs::write(&output, &exported.bytes)
            .await
            .with_context(|| format!("Failed to write {}", output.display()))?;

        info!(
            "Wrote {} ({}, {} bytes) in {:.0}ms",
            output.display(),
            exported.content_type,
            exported.bytes.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(())
    }
    .instrument(span)
    .await
}

fn default_output_path(input: &Path, file_name: &str) -> PathBuf {
    input.with_file_name(file_name)
}

fn warn_on_extension_mismatch(output: &Path, content_type: &str) {
    let extension = output
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase);
    let matches = match content_type {
        "image/png" => extension.as_deref() == Some("png"),
        "image/jpeg" => matches!(extension.as_deref(), Some("jpg" | "jpeg")),
        _ => true,
    };
    if !matches {
        warn!(
            "Writing {} data to {}; the extension does not match",
            content_type,
            output.display()
        );
    }
}

#[cfg(feature = "onnx")]
fn show_providers() {
    use crate::backends::OnnxBackend;

    println!("ONNX Runtime execution providers:");
    for (provider, available) in OnnxBackend::list_providers() {
        println!(
            "  {:<8} {}",
            provider,
            if available { "available" } else { "unavailable" }
        );
    }
}

#[cfg(not(feature = "onnx"))]
fn show_providers() {
    println!("Built without the 'onnx' feature: only the remote API backend is available");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_remove() {
        let cli = Cli::try_parse_from([
            "photo-splicer",
            "-v",
            "remove",
            "photo.jpg",
            "--background",
            "blue",
            "--backend",
            "local-model",
            "--input-mode",
            "temp-file",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        let Command::Remove(args) = cli.command else {
            panic!("expected remove");
        };
        assert_eq!(args.background, BackgroundColor::solid(0x25, 0x63, 0xeb));
        assert_eq!(args.backend.backend, RemovalBackendKind::LocalModel);
        assert_eq!(args.backend.input_mode, InputMode::TempFile);
    }

    #[test]
    fn test_rejects_bad_color() {
        assert!(Cli::try_parse_from(["photo-splicer", "remove", "a.png", "-b", "#xyz"]).is_err());
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/photos/cat.jpg"), "splicer-result.png"),
            PathBuf::from("/photos/splicer-result.png")
        );
    }
}
