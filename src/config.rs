use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use serde::{Deserialize, Deserializer};

use crate::sink::OutputFormat;

/// Measurement name used when none is configured.
pub const DEFAULT_MEASUREMENT: &str = "goruntime_m";

pub const DEFAULT_METHOD: &str = "GET";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

// ------------------------------------------------------------
// Root configuration
// ------------------------------------------------------------
//
// Top-level structure loaded from `config.json`.
//
// It defines:
// - How often a poll cycle runs
// - How measurements are written
// - The runtime endpoints to poll
//
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Time between poll cycles, e.g. "10s"
    #[serde(default = "default_interval", deserialize_with = "duration")]
    pub interval: Duration,

    /// Output format of emitted measurements
    #[serde(default)]
    pub output: OutputFormat,

    /// Logs every emitted measurement at debug level
    #[serde(default)]
    pub debug: bool,

    /// Runtime endpoints
    pub goruntime: GoRuntimeConfig,
}

// ------------------------------------------------------------
// Input configuration
// ------------------------------------------------------------
//
// Read-only once the collector is running.
//
#[derive(Debug, Deserialize, Clone)]
pub struct GoRuntimeConfig {
    /// One or more URLs serving a runtime snapshot
    pub urls: Vec<String>,

    /// HTTP method
    #[serde(default = "default_method")]
    pub method: String,

    /// Measurement name override
    #[serde(default)]
    pub measurement: Option<String>,

    /// Optional HTTP basic auth credentials
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,

    #[serde(flatten)]
    pub tls: TlsConfig,

    /// Time allowed to complete one request, "0s" disables the limit
    #[serde(default = "default_timeout", deserialize_with = "duration")]
    pub timeout: Duration,
}

/// Client-side TLS options. All PEM encoded.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct TlsConfig {
    pub tls_ca: Option<PathBuf>,
    pub tls_cert: Option<PathBuf>,
    pub tls_key: Option<PathBuf>,

    /// Use TLS but skip chain and host verification
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.interval.is_zero() {
            bail!("interval must be greater than zero");
        }
        self.goruntime.validate()
    }
}

impl GoRuntimeConfig {
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            urls,
            method: default_method(),
            measurement: None,
            username: String::new(),
            password: String::new(),
            tls: TlsConfig::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Configured measurement name, or `DEFAULT_MEASUREMENT`.
    pub fn measurement_name(&self) -> &str {
        match self.measurement.as_deref() {
            Some(m) if !m.is_empty() => m,
            _ => DEFAULT_MEASUREMENT,
        }
    }

    pub fn has_basic_auth(&self) -> bool {
        !self.username.is_empty() || !self.password.is_empty()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.urls.is_empty() {
            bail!("goruntime: at least one url is required");
        }
        reqwest::Method::from_bytes(self.method.as_bytes())
            .with_context(|| format!("goruntime: invalid method {:?}", self.method))?;
        if self.tls.tls_cert.is_some() != self.tls.tls_key.is_some() {
            bail!("goruntime: tls_cert and tls_key must be set together");
        }
        Ok(())
    }
}

fn default_interval() -> Duration {
    DEFAULT_INTERVAL
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_method() -> String {
    DEFAULT_METHOD.to_string()
}

fn duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
}

/// Reads and validates a JSON configuration file.
pub fn load_config(path: &str) -> anyhow::Result<Config> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {path}"))?;
    let cfg: Config = serde_json::from_str(&data)
        .with_context(|| format!("parsing config file {path}"))?;
    cfg.validate()?;
    Ok(cfg)
}

pub const SAMPLE_CONFIG: &str = r#"{
  "interval": "10s",
  "output": "json",
  "debug": false,
  "goruntime": {
    "urls": ["http://localhost:8062/debug/vars"],
    "method": "GET",
    "measurement": "goruntime_m",

    "username": "",
    "password": "",

    "tls_ca": null,
    "tls_cert": null,
    "tls_key": null,
    "insecure_skip_verify": false,

    "timeout": "5s"
  }
}"#;
