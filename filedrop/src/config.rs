//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The file path
//! defaults to `config.yaml` but can be specified via the `-f` flag or the `FILEDROP_CONFIG`
//! environment variable. A missing file is not an error: every field has a default.
//!
//! ## Loading Priority
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `FILEDROP_` override YAML values
//!
//! Nested values use double underscores, e.g. `FILEDROP_UPLOADS__MAX_FILE_SIZE=1048576` sets
//! `uploads.max_file_size`.
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use filedrop::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//!
//! println!("Serving {} on {}:{}", config.storage.path.display(), config.host, config.port);
//! # Ok(())
//! # }
//! ```
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! FILEDROP_PORT=8080
//! FILEDROP_STORAGE__PATH=/var/lib/filedrop
//! FILEDROP_UPLOADS__TYPE_POLICY=strict
//! FILEDROP_CORS__ALLOWED_ORIGINS='["*"]'
//! ```

use clap::{Parser, Subcommand};
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

use crate::filter::TypePolicy;

/// Per-file ceiling used when nothing else is configured (10 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "FILEDROP_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,

    /// What to do; runs the server when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Args {
    /// Whether this invocation needs the server configuration.
    ///
    /// `upload` and `list` only talk to a remote server, so a local `config.yaml` (valid or not)
    /// does not affect them. `--validate` always loads it.
    pub fn needs_config(&self) -> bool {
        self.validate || matches!(self.command, None | Some(Command::Serve))
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the upload server
    Serve,
    /// Upload local files to a running server
    Upload {
        /// Base URL of the server
        #[arg(long, env = "FILEDROP_SERVER", default_value = "http://localhost:3001")]
        server: Url,
        /// Files to upload; anything that is not .txt or .pdf is skipped with a warning
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List files stored on a running server
    List {
        /// Base URL of the server
        #[arg(long, env = "FILEDROP_SERVER", default_value = "http://localhost:3001")]
        server: Url,
    },
}

/// Main application configuration.
///
/// All fields have defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Where uploaded files live
    pub storage: StorageConfig,
    /// Limits and type checks applied to uploads
    pub uploads: UploadsConfig,
    /// CORS configuration for browser clients served from another origin
    pub cors: CorsConfig,
    /// Enable Prometheus metrics endpoint at `/internal/metrics`
    pub enable_metrics: bool,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Storage directory, relative to the working directory unless absolute (default: `uploads`)
    pub path: PathBuf,
}

/// Upload limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadsConfig {
    /// Largest accepted file in bytes (default: 10 MiB)
    pub max_file_size: u64,
    /// Largest accepted request body in bytes, all parts included (default: 100 MiB)
    pub max_request_size: u64,
    /// Whether a matching filename extension is enough to accept a file
    pub type_policy: TypePolicy,
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

/// CORS origin specification.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            storage: StorageConfig::default(),
            uploads: UploadsConfig::default(),
            cors: CorsConfig::default(),
            enable_metrics: false,
            enable_otel_export: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("uploads"),
        }
    }
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_request_size: 10 * DEFAULT_MAX_FILE_SIZE,
            type_policy: TypePolicy::Permissive,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                CorsOrigin::Url(Url::parse("http://localhost:5173").expect("static URL is valid")), // Vite dev server
            ],
            max_age: Some(3600),
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.uploads.max_file_size == 0 {
            anyhow::bail!("Config validation: uploads.max_file_size must be greater than 0");
        }

        if self.uploads.max_request_size < self.uploads.max_file_size {
            anyhow::bail!(
                "Config validation: uploads.max_request_size ({}) cannot be smaller than uploads.max_file_size ({})",
                self.uploads.max_request_size,
                self.uploads.max_file_size
            );
        }

        if usize::try_from(self.uploads.max_request_size).is_err() {
            anyhow::bail!("Config validation: uploads.max_request_size does not fit in memory on this platform");
        }

        let has_wildcard = self.cors.allowed_origins.iter().any(|origin| matches!(origin, CorsOrigin::Wildcard));
        if has_wildcard && self.cors.allowed_origins.len() > 1 {
            anyhow::bail!("Config validation: CORS wildcard origin '*' cannot be combined with explicit origins");
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("FILEDROP_").split("__").ignore(&["config", "server"]))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
