//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `MD2SLIDES_CONFIG`
//! environment variable. A missing file is not an error: every field has a default matching the
//! container deployment of the service.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `MD2SLIDES_` override YAML values
//! 3. **Google credentials** - `GOOGLE_APPLICATION_CREDENTIALS` and `GOOGLE_CREDENTIALS_JSON`
//!    fill `credentials.application_credentials` and `credentials.credentials_json`
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `MD2SLIDES_CONVERTER__TIMEOUT=90s` sets the `converter.timeout` field.
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use md2slides::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//!
//! println!("Server will bind to {}:{}", config.host, config.port);
//! # Ok(())
//! # }
//! ```
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Override server port
//! MD2SLIDES_PORT=8080
//!
//! # Point at a different converter binary
//! MD2SLIDES_CONVERTER__PROGRAM=/usr/local/bin/md2gslides
//!
//! # Inline service-account key, written to credentials.json_path for each conversion
//! GOOGLE_CREDENTIALS_JSON='{"type":"service_account",...}'
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "MD2SLIDES_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
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
    /// External converter invocation settings
    pub converter: ConverterConfig,
    /// Where request markdown is staged before conversion
    pub uploads: UploadsConfig,
    /// Google service-account credential sources
    pub credentials: CredentialsConfig,
    /// Directory served for unmatched GET paths. Skipped when unset or missing on disk.
    pub static_dir: Option<PathBuf>,
    /// Resource limits for protecting system capacity
    pub limits: LimitsConfig,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

/// How the external markdown-to-slides converter is run.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConverterConfig {
    /// Executable name or path. Bare names are resolved on `PATH`.
    pub program: String,
    /// Working directory for the child process
    pub working_dir: PathBuf,
    /// Wall-clock bound for a single conversion. The child is killed when it elapses.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: "md2gslides".to_string(),
            working_dir: PathBuf::from("/app"),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Temp file locations and request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadsConfig {
    /// Directory that multipart uploads are streamed into
    pub dir: PathBuf,
    /// Directory for markdown received as JSON text
    pub text_dir: PathBuf,
    /// Maximum request body size in bytes for the conversion routes.
    /// Default: 10MB
    pub max_file_size: u64,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/tmp/uploads"),
            text_dir: PathBuf::from("/tmp"),
            max_file_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Service-account credential configuration.
///
/// Usually populated from the `GOOGLE_*` environment variables rather than the YAML file.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CredentialsConfig {
    /// Path to a service-account key file (`GOOGLE_APPLICATION_CREDENTIALS`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_credentials: Option<PathBuf>,
    /// Inline service-account key material (`GOOGLE_CREDENTIALS_JSON`). Takes precedence
    /// over `application_credentials` when set.
    #[serde(skip_serializing)]
    pub credentials_json: Option<String>,
    /// Fixed path that inline key material is written to before each conversion
    pub json_path: PathBuf,
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("application_credentials", &self.application_credentials)
            .field("credentials_json", &self.credentials_json.as_ref().map(|_| "<redacted>"))
            .field("json_path", &self.json_path)
            .finish()
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            application_credentials: None,
            credentials_json: None,
            json_path: PathBuf::from("/tmp/google_credentials.json"),
        }
    }
}

/// Resource limits configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Converter concurrency limits
    pub conversions: ConversionLimitsConfig,
}

/// Concurrency control for converter processes.
///
/// Every conversion spawns a child process, so this bounds the number of converters alive at
/// once. Requests that cannot get a slot wait in a bounded queue and receive HTTP 429 when the
/// queue is full or the wait times out.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConversionLimitsConfig {
    /// Maximum concurrent converter processes.
    /// Set to 0 for unlimited.
    /// Default: 4
    pub max_concurrent: usize,
    /// Maximum requests waiting for a slot.
    /// Set to 0 for an unlimited queue.
    /// Default: 20
    pub max_waiting: usize,
    /// Maximum time a request waits for a slot before receiving HTTP 429.
    /// Zero rejects immediately when all slots are busy.
    #[serde(with = "humantime_serde")]
    pub max_wait: Duration,
}

impl Default for ConversionLimitsConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            max_waiting: 20,
            max_wait: Duration::from_secs(60),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            converter: ConverterConfig::default(),
            uploads: UploadsConfig::default(),
            credentials: CredentialsConfig::default(),
            static_dir: Some(PathBuf::from("/app/shared")),
            limits: LimitsConfig::default(),
            enable_otel_export: false,
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

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.converter.program.trim().is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: converter.program cannot be empty".to_string(),
            });
        }

        if self.converter.timeout.is_zero() {
            return Err(Error::Internal {
                operation: "Config validation: converter.timeout must be greater than zero".to_string(),
            });
        }

        if self.uploads.max_file_size == 0 {
            return Err(Error::Internal {
                operation: "Config validation: uploads.max_file_size must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("MD2SLIDES_").ignore(&["CONFIG"]).split("__"))
            // The converter and the CLI both discover credentials through these
            .merge(
                Env::raw()
                    .only(&["GOOGLE_APPLICATION_CREDENTIALS"])
                    .map(|_| "credentials.application_credentials".into()),
            )
            .merge(
                Env::raw()
                    .only(&["GOOGLE_CREDENTIALS_JSON"])
                    .map(|_| "credentials.credentials_json".into()),
            )
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
