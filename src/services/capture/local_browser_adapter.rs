use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::io::Cursor;
use std::path::PathBuf;

use super::{CaptureBackend, CaptureError, CaptureOutcome, RenderBudget};
use crate::config::LocalBrowserConfig;

/// Local headless Chromium fallback. Each URL is a one-shot
/// `--headless --screenshot` run; no browser session survives between
/// captures. Unavailable when disabled by config or when no browser binary
/// is on PATH, so restricted hosts skip it instead of hanging.
pub struct LocalBrowserBackend {
    browser: String,
}

impl LocalBrowserBackend {
    pub fn from_config(config: &LocalBrowserConfig) -> Option<Self> {
        if !config.enabled {
            tracing::debug!("Local browser capture disabled by configuration");
            return None;
        }
        let browser = match &config.browser_path {
            Some(path) if !path.trim().is_empty() => {
                if !std::path::Path::new(path).exists() {
                    tracing::warn!("Configured browser binary not found: {}", path);
                    return None;
                }
                path.clone()
            }
            _ => find_browser_binary()?,
        };
        Some(Self { browser })
    }

    async fn capture_one(&self, url: &str, budget: &RenderBudget) -> Result<Vec<u8>> {
        let output_path = screenshot_path();

        // A one-shot headless run cannot poll the in-page ready flag; the
        // virtual time budget covers the poll window plus settle instead.
        let render_ms = budget.wait.render_cap().as_millis();
        let (width, height) = budget.viewport;

        let status = tokio::time::timeout(
            budget.total_timeout(),
            tokio::process::Command::new(&self.browser)
                .arg("--headless=new")
                .arg("--no-sandbox")
                .arg("--disable-gpu")
                .arg("--disable-dev-shm-usage")
                .arg("--hide-scrollbars")
                .arg(format!("--window-size={},{}", width, height))
                .arg(format!("--screenshot={}", output_path.display()))
                .arg(format!("--virtual-time-budget={}", render_ms))
                .arg(url)
                .stdout(std::process::Stdio::null())
                .stderr(std::process::Stdio::null())
                .status(),
        )
        .await
        .map_err(|_| anyhow!("browser timed out after {:?}", budget.total_timeout()))??;

        if !status.success() {
            let _ = tokio::fs::remove_file(&output_path).await;
            return Err(anyhow!("browser exited with {}", status));
        }

        let png = tokio::fs::read(&output_path).await?;
        let _ = tokio::fs::remove_file(&output_path).await;

        reencode_jpeg(&png, budget.quality)
    }
}

#[async_trait]
impl CaptureBackend for LocalBrowserBackend {
    fn name(&self) -> &'static str {
        "local-browser"
    }

    async fn capture_all(
        &self,
        urls: &[String],
        budget: &RenderBudget,
    ) -> Result<Vec<CaptureOutcome>, CaptureError> {
        // One entry at a time; parallel local browsers would fight over CPU
        // and skew render timing.
        let mut outcomes = Vec::with_capacity(urls.len());
        for url in urls {
            match self.capture_one(url, budget).await {
                Ok(bytes) => outcomes.push(CaptureOutcome::Image(bytes)),
                Err(e) => outcomes.push(CaptureOutcome::Failed(format!("{}", e))),
            }
        }
        Ok(outcomes)
    }
}

/// Chromium writes PNG; the artifact contract is JPEG like the remote
/// backends produce.
fn reencode_jpeg(png: &[u8], quality: u8) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(png)?;
    let mut jpeg = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(Cursor::new(&mut jpeg), quality);
    decoded.write_with_encoder(encoder)?;
    Ok(jpeg)
}

fn screenshot_path() -> PathBuf {
    std::env::temp_dir().join(format!("menucast_capture_{}.png", uuid::Uuid::new_v4()))
}

/// Find an available Chrome/Chromium binary
fn find_browser_binary() -> Option<String> {
    for cmd in &[
        "chromium",
        "chromium-browser",
        "google-chrome",
        "google-chrome-stable",
    ] {
        if which_exists(cmd) {
            return Some(cmd.to_string());
        }
    }
    None
}

/// Check if a command exists in PATH
fn which_exists(cmd: &str) -> bool {
    std::process::Command::new("which")
        .arg(cmd)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_config_is_unavailable() {
        let config = LocalBrowserConfig {
            enabled: false,
            browser_path: None,
        };
        assert!(LocalBrowserBackend::from_config(&config).is_none());
    }

    #[test]
    fn missing_binary_is_unavailable() {
        let config = LocalBrowserConfig {
            enabled: true,
            browser_path: Some("/nonexistent/chromium".to_string()),
        };
        assert!(LocalBrowserBackend::from_config(&config).is_none());
    }
}
