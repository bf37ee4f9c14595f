use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// How display pages are reached and how captures are budgeted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Base URL of the public display pages, e.g. "https://menucast.example".
    pub base_url: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// JPEG quality handed to the capture backend.
    pub quality: u8,
    /// Transport timeout per capture call, seconds.
    pub max_wait_secs: u64,
    /// Snapshot mode: how long to poll for the page ready flag, seconds.
    pub ready_poll_secs: u64,
    /// Snapshot mode: settle delay after the ready flag, milliseconds.
    pub settle_ms: u64,
    /// Live mode: fixed settle delay, milliseconds.
    pub live_settle_ms: u64,
    /// Prefer the deterministic snapshot mode for batch regeneration.
    pub snapshot_capture: bool,
    /// How many screens may regenerate at once during invalidation fan-out.
    pub max_concurrent_screens: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            viewport_width: 1920,
            viewport_height: 1080,
            quality: 90,
            max_wait_secs: 30,
            ready_poll_secs: 10,
            settle_ms: 500,
            live_settle_ms: 2500,
            snapshot_capture: true,
            max_concurrent_screens: 2,
        }
    }
}

/// Capture backends, tried in declaration order. Each section is optional;
/// a missing section simply makes that backend unavailable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub batch: Option<BatchCaptureConfig>,
    pub single: Option<SingleShotConfig>,
    #[serde(default)]
    pub local: LocalBrowserConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchCaptureConfig {
    /// Endpoint of the batch capture service, e.g. "https://shots.internal/capture".
    pub service_url: String,
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleShotConfig {
    pub access_key: String,
    /// Override for the capture API endpoint; defaults to ScreenshotOne.
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalBrowserConfig {
    /// Disable on hosts where a browser cannot run (e.g. serverless).
    pub enabled: bool,
    pub browser_path: Option<String>,
}

impl Default for LocalBrowserConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            browser_path: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub spaces: Option<SpacesConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpacesConfig {
    pub key: String,
    pub secret: String,
    pub bucket: String,
    pub region: String,
    /// Public base for slide URLs; defaults to the bucket's Spaces origin.
    pub public_base_url: Option<String>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn default_template() -> &'static str {
        r#"[server]
host = "0.0.0.0"
port = 8080

[database]
# URL for the SQLite database. Ensure the directory exists.
url = "sqlite://menucast.db"

[logging]
level = "info"

[render]
base_url = "https://menucast.example"
viewport_width = 1920
viewport_height = 1080
quality = 90
max_wait_secs = 30
ready_poll_secs = 10
settle_ms = 500
live_settle_ms = 2500
snapshot_capture = true
max_concurrent_screens = 2

# Capture backends, in priority order. Leave a section out to disable it.
# [capture.batch]
# service_url = "https://shots.internal/capture"
# auth_token = ""

# [capture.single]
# access_key = "your-screenshotone-key"

[capture.local]
enabled = true
# browser_path = "/usr/bin/chromium"

# [storage.spaces]
# key = ""
# secret = ""
# bucket = "menucast-signage"
# region = "tor1"
# public_base_url = "https://cdn.menucast.example"
"#
    }
}
