//! Configuration for the resp-tap binary.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::Parser;
use resp_stream::connection::{
    DEFAULT_MAX_NESTING_DEPTH, DEFAULT_MAX_PENDING_BYTES, DEFAULT_READ_BUFFER_SIZE,
};
use resp_stream::ReaderConfig;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// Command-line arguments for resp-tap
#[derive(Parser, Debug)]
#[command(name = "resp-tap")]
#[command(version = "0.1.0")]
#[command(about = "Decode a Redis protocol byte stream and print its frames", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// File to decode ("-" for stdin)
    #[arg(short, long)]
    pub input: Option<String>,

    /// Connect to a TCP peer and decode what it sends (e.g., 127.0.0.1:6379)
    #[arg(short = 'C', long)]
    pub connect: Option<String>,

    /// Bytes requested per read
    #[arg(short = 'b', long)]
    pub read_buffer_size: Option<usize>,

    /// Maximum bytes buffered for an incomplete frame (0 = unlimited)
    #[arg(short = 'm', long)]
    pub max_pending_bytes: Option<usize>,

    /// Maximum nested arrays in one frame (0 = unlimited)
    #[arg(short = 'd', long)]
    pub max_nesting_depth: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub reader: ReaderSection,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Input and decoding configuration
#[derive(Debug, Deserialize)]
pub struct ReaderSection {
    /// File to decode ("-" for stdin)
    pub input: Option<String>,
    /// TCP peer to read from
    pub connect: Option<String>,
    /// Bytes requested per read
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
    /// Maximum bytes buffered for an incomplete frame (0 = unlimited)
    #[serde(default = "default_max_pending_bytes")]
    pub max_pending_bytes: usize,
    /// Maximum nested arrays in one frame (0 = unlimited)
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,
}

impl Default for ReaderSection {
    fn default() -> Self {
        Self {
            input: None,
            connect: None,
            read_buffer_size: default_read_buffer_size(),
            max_pending_bytes: default_max_pending_bytes(),
            max_nesting_depth: default_max_nesting_depth(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
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

fn default_read_buffer_size() -> usize {
    DEFAULT_READ_BUFFER_SIZE
}

fn default_max_pending_bytes() -> usize {
    DEFAULT_MAX_PENDING_BYTES
}

fn default_max_nesting_depth() -> usize {
    DEFAULT_MAX_NESTING_DEPTH
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Where the byte stream comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Stdin,
    File(PathBuf),
    Tcp(String),
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Stdin => f.write_str("stdin"),
            Source::File(path) => write!(f, "file:{}", path.display()),
            Source::Tcp(addr) => write!(f, "tcp:{addr}"),
        }
    }
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub source: Source,
    pub reader: ReaderConfig,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(CliArgs::parse())
    }

    /// Merge parsed CLI args over the TOML file they point to, if any.
    /// CLI arguments take precedence over TOML file values.
    pub fn from_args(cli: CliArgs) -> Result<Self, ConfigError> {
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Self::merge(cli, toml_config)
    }

    fn merge(cli: CliArgs, toml_config: TomlConfig) -> Result<Self, ConfigError> {
        // a TCP peer wins over a file when both are given
        let source = match (
            cli.connect.or(toml_config.reader.connect),
            cli.input.or(toml_config.reader.input),
        ) {
            (Some(addr), _) => Source::Tcp(addr),
            (None, Some(path)) if path != "-" => Source::File(PathBuf::from(path)),
            (None, _) => Source::Stdin,
        };

        let read_buffer_size = cli
            .read_buffer_size
            .unwrap_or(toml_config.reader.read_buffer_size);
        if read_buffer_size == 0 {
            return Err(ConfigError::Invalid(
                "read_buffer_size must be greater than zero".to_string(),
            ));
        }

        let max_pending_bytes = match cli
            .max_pending_bytes
            .unwrap_or(toml_config.reader.max_pending_bytes)
        {
            0 => None,
            limit => Some(limit),
        };

        let max_nesting_depth = match cli
            .max_nesting_depth
            .unwrap_or(toml_config.reader.max_nesting_depth)
        {
            0 => None,
            depth => Some(depth),
        };

        Ok(Config {
            source,
            reader: ReaderConfig {
                read_buffer_size,
                max_pending_bytes,
                max_nesting_depth,
            },
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.logging.level
            },
        })
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
