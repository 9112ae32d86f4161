mod rawvideo;

use frame_hooks_common::config::Config;
use frame_hooks_common::frame::FrameError;
use frame_hooks_common::pixfmt::{PixelFormat, UnknownPixelFormat};
use frame_hooks_filters::{FilterChain, FilterError, NegotiationError};
use rawvideo::FrameReader;
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },
    #[error("rawvideo I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0} is a hardware format and cannot be read as rawvideo")]
    HardwareFormat(PixelFormat),
    #[error("{format} frames of {width}x{height} do not fit in memory")]
    FrameTooLarge {
        width: u32,
        height: u32,
        format: PixelFormat,
    },
    #[error("bad frame: {0}")]
    Frame(#[from] FrameError),
    #[error("filter failed: {0}")]
    Filter(#[from] FilterError),
    #[error("format negotiation failed: {0}")]
    Negotiation(#[from] NegotiationError),
    #[error(transparent)]
    UnknownFormat(#[from] UnknownPixelFormat),
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("frame-hooks.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    // stdout may carry video, keep logs on stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        width = config.stream.width,
        height = config.stream.height,
        pix_fmt = config.stream.pix_fmt,
        fps = config.stream.fps,
        input = config.stream.input,
        output = config.stream.output,
        filters = config.filters.len(),
        "starting frame-hooks"
    );

    match run(&config).await {
        Ok(forwarded) => info!(forwarded, "stream finished"),
        Err(e) => {
            error!(error = %e, "pipeline aborted");
            std::process::exit(1);
        }
    }
}

async fn run(config: &Config) -> Result<u64, RunnerError> {
    let mut chain = FilterChain::from_config(&config.filters)?;
    if chain.is_empty() {
        warn!("no filters configured, frames are copied through unchanged");
    }

    let offered = config.stream.pixel_format()?;
    let format = chain.negotiate(&[offered])?;
    info!(pix_fmt = %format, "negotiated pixel format");

    let input = open_input(&config.stream.input).await?;
    let mut output = open_output(&config.stream.output).await?;
    let mut reader = FrameReader::new(
        input,
        config.stream.width,
        config.stream.height,
        format,
        config.stream.fps,
    )?;
    info!(frame_size = reader.frame_size(), "reading rawvideo");

    rawvideo::pump(&mut reader, &mut chain, &mut output).await
}

async fn open_input(spec: &str) -> Result<Box<dyn AsyncRead + Unpin + Send>, RunnerError> {
    if spec == "-" {
        return Ok(Box::new(tokio::io::stdin()));
    }
    let file = tokio::fs::File::open(spec)
        .await
        .map_err(|source| RunnerError::Open {
            path: spec.to_string(),
            source,
        })?;
    Ok(Box::new(tokio::io::BufReader::new(file)))
}

async fn open_output(spec: &str) -> Result<Box<dyn AsyncWrite + Unpin + Send>, RunnerError> {
    if spec == "-" {
        return Ok(Box::new(tokio::io::stdout()));
    }
    let file = tokio::fs::File::create(spec)
        .await
        .map_err(|source| RunnerError::Open {
            path: spec.to_string(),
            source,
        })?;
    Ok(Box::new(tokio::io::BufWriter::new(file)))
}
