use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::pixfmt::{PixelFormat, UnknownPixelFormat};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub stream: StreamConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub filters: Vec<FilterConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_pix_fmt")]
    pub pix_fmt: String,
    #[serde(default = "default_fps")]
    pub fps: f64,
    /// Rawvideo source, `-` for stdin.
    #[serde(default = "default_stdio")]
    pub input: String,
    /// Rawvideo sink, `-` for stdout.
    #[serde(default = "default_stdio")]
    pub output: String,
}

impl StreamConfig {
    pub fn pixel_format(&self) -> Result<PixelFormat, UnknownPixelFormat> {
        self.pix_fmt.parse()
    }
}

/// One filter instance in the chain, in chain order.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FilterConfig {
    SlackMsg(SlackMsgConfig),
    Storage(StorageConfig),
}

impl FilterConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            FilterConfig::SlackMsg(_) => "slackmsg",
            FilterConfig::Storage(_) => "storage",
        }
    }

    pub fn trigger_interval(&self) -> u32 {
        match self {
            FilterConfig::SlackMsg(c) => c.trigger_interval,
            FilterConfig::Storage(c) => c.trigger_interval,
        }
    }

    /// `(enable_from_secs, enable_until_secs)`
    pub fn timeline(&self) -> (Option<f64>, Option<f64>) {
        match self {
            FilterConfig::SlackMsg(c) => (c.enable_from_secs, c.enable_until_secs),
            FilterConfig::Storage(c) => (c.enable_from_secs, c.enable_until_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackMsgConfig {
    /// Incoming-webhook endpoint the notification is POSTed to.
    pub webhook_url: String,
    /// Text of the notification. `{frame}` and `{utc}` are expanded.
    #[serde(default = "default_message_body")]
    pub message_body: String,
    /// Notify on the first frame and then every N frames.
    #[serde(default = "default_trigger_interval")]
    pub trigger_interval: u32,
    /// Connect and total timeout of one webhook request.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    pub enable_from_secs: Option<f64>,
    pub enable_until_secs: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Any path on the filesystem to watch.
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
    /// Check on the first frame and then every N frames.
    #[serde(default = "default_trigger_interval")]
    pub trigger_interval: u32,
    /// Free space in GiB below which a check logs at WARN.
    #[serde(default = "default_low_space_threshold_gb")]
    pub low_space_threshold_gb: f64,
    #[serde(default)]
    pub backend: ProbeBackend,
    pub enable_from_secs: Option<f64>,
    pub enable_until_secs: Option<f64>,
}

/// How the storage filter asks the OS for free space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeBackend {
    #[default]
    Statvfs,
    Sysinfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        let config = Self::from_toml(&content)?;
        debug!(path = %path.display(), filters = config.filters.len(), "config loaded");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let stream = &self.stream;
        if stream.width == 0 || stream.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "stream dimensions must be non-zero, got {}x{}",
                stream.width, stream.height
            )));
        }
        if !(stream.fps.is_finite() && stream.fps > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "stream fps must be positive, got {}",
                stream.fps
            )));
        }
        let format = stream
            .pixel_format()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if format.is_hwaccel() {
            return Err(ConfigError::Invalid(format!(
                "{format} is a hardware format and cannot be read as rawvideo"
            )));
        }
        if format.frame_size(stream.width, stream.height).is_none() {
            return Err(ConfigError::Invalid(format!(
                "{format} frames of {}x{} do not fit in memory",
                stream.width, stream.height
            )));
        }

        for (index, filter) in self.filters.iter().enumerate() {
            let kind = filter.kind();
            if filter.trigger_interval() == 0 {
                return Err(ConfigError::Invalid(format!(
                    "filters[{index}] ({kind}): trigger_interval must be at least 1"
                )));
            }
            match filter.timeline() {
                (Some(from), _) if !(from.is_finite() && from >= 0.0) => {
                    return Err(ConfigError::Invalid(format!(
                        "filters[{index}] ({kind}): enable_from_secs must be >= 0"
                    )));
                }
                (from, Some(until)) if !until.is_finite() || until <= from.unwrap_or(0.0) => {
                    return Err(ConfigError::Invalid(format!(
                        "filters[{index}] ({kind}): \
                         enable_until_secs must be after enable_from_secs"
                    )));
                }
                _ => {}
            }
            match filter {
                FilterConfig::SlackMsg(c) => {
                    let url = c.webhook_url.trim();
                    // The stock config ships `<insert your Slack webhook url here>`.
                    if url.is_empty() || url.contains('<') || url.contains('>') {
                        return Err(ConfigError::Invalid(format!(
                            "filters[{index}] (slackmsg): webhook_url is not set"
                        )));
                    }
                    if c.request_timeout_secs == 0 {
                        return Err(ConfigError::Invalid(format!(
                            "filters[{index}] (slackmsg): request_timeout_secs must be at least 1"
                        )));
                    }
                }
                FilterConfig::Storage(c) => {
                    if !(c.low_space_threshold_gb.is_finite() && c.low_space_threshold_gb >= 0.0)
                    {
                        return Err(ConfigError::Invalid(format!(
                            "filters[{index}] (storage): low_space_threshold_gb must be >= 0"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// Default value functions
fn default_pix_fmt() -> String {
    "yuv420p".into()
}
fn default_fps() -> f64 {
    25.0
}
fn default_stdio() -> String {
    "-".into()
}
fn default_message_body() -> String {
    "Hello, World!".into()
}
fn default_trigger_interval() -> u32 {
    100
}
fn default_request_timeout() -> u64 {
    10
}
fn default_storage_path() -> PathBuf {
    PathBuf::from(".")
}
fn default_low_space_threshold_gb() -> f64 {
    0.01
}
fn default_log_level() -> String {
    "info".into()
}
