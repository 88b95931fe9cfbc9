use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub seed: SeedConfig,
    #[serde(default)]
    pub sampler: SamplerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Seed server listener and cross-origin policy.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// The only browser origin allowed to call the seed endpoint.
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    /// Snapshot endpoint returning one encoded still per GET.
    #[serde(default = "default_camera_url")]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedConfig {
    /// `"http"` asks the seed server; `"frame"` hashes a camera still.
    #[serde(default = "default_seed_source")]
    pub source: String,
    #[serde(default = "default_seed_url")]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SamplerConfig {
    /// Sum-of-absolute RGB difference at or above which two frames count as changed.
    #[serde(default = "default_threshold")]
    pub threshold: u64,
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl SamplerConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            allowed_origin: default_allowed_origin(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            url: default_camera_url(),
        }
    }
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            source: default_seed_source(),
            url: default_seed_url(),
        }
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            min_interval_ms: default_min_interval_ms(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
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
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
}

// Default value functions
fn default_bind() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    5000
}
fn default_allowed_origin() -> String {
    "http://localhost:5173".into()
}
fn default_camera_url() -> String {
    "http://localhost:8080/frame".into()
}
fn default_seed_source() -> String {
    "http".into()
}
fn default_seed_url() -> String {
    "http://localhost:5000/random-seed".into()
}
fn default_threshold() -> u64 {
    2_000_000
}
fn default_min_interval_ms() -> u64 {
    1000
}
fn default_tick_interval_ms() -> u64 {
    2000
}
fn default_log_level() -> String {
    "info".into()
}
