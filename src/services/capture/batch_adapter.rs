use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{CaptureBackend, CaptureError, CaptureOutcome, RenderBudget, RenderWait, READY_FLAG_SELECTOR};
use crate::config::BatchCaptureConfig;

/// Remote batch capture service: one POST carries the whole rotation and the
/// service navigates and screenshots every URL in a single browser session.
/// Any transport or HTTP error invalidates the whole batch; the caller falls
/// back to a per-URL strategy.
pub struct BatchCaptureBackend {
    client: Client,
    service_url: String,
    auth_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    /// Base64 payloads in request order; null marks a per-URL failure.
    images: Vec<Option<String>>,
}

impl BatchCaptureBackend {
    pub fn from_config(config: Option<&BatchCaptureConfig>, client: Client) -> Option<Self> {
        let config = config?;
        if config.service_url.trim().is_empty() {
            return None;
        }
        Some(Self {
            client,
            service_url: config.service_url.trim().to_string(),
            auth_token: config.auth_token.clone().filter(|t| !t.trim().is_empty()),
        })
    }

    fn error(&self, message: String) -> CaptureError {
        CaptureError::Backend {
            backend: self.name(),
            message,
        }
    }
}

#[async_trait]
impl CaptureBackend for BatchCaptureBackend {
    fn name(&self) -> &'static str {
        "batch-service"
    }

    async fn capture_all(
        &self,
        urls: &[String],
        budget: &RenderBudget,
    ) -> Result<Vec<CaptureOutcome>, CaptureError> {
        let wait = match &budget.wait {
            RenderWait::ReadyFlag {
                poll_timeout,
                settle,
            } => json!({
                "strategy": "ready-flag",
                "selector": READY_FLAG_SELECTOR,
                "max_wait_ms": poll_timeout.as_millis() as u64,
                "settle_ms": settle.as_millis() as u64,
            }),
            RenderWait::FixedDelay { settle } => json!({
                "strategy": "delay",
                "settle_ms": settle.as_millis() as u64,
            }),
        };

        let payload = json!({
            "urls": urls,
            "viewport": { "width": budget.viewport.0, "height": budget.viewport.1 },
            "format": "jpeg",
            "quality": budget.quality,
            "wait": wait,
        });

        // The service renders the whole list before responding, so the
        // render cap applies once per URL on top of the transport timeout.
        let timeout = budget.transport_timeout + budget.wait.render_cap() * urls.len() as u32;

        let mut request = self
            .client
            .post(&self.service_url)
            .timeout(timeout)
            .json(&payload);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let res = request
            .send()
            .await
            .map_err(|e| self.error(format!("request failed: {}", e)))?;

        if !res.status().is_success() {
            return Err(self.error(format!("HTTP {}", res.status())));
        }

        let body: BatchResponse = res
            .json()
            .await
            .map_err(|e| self.error(format!("invalid response: {}", e)))?;

        if body.images.len() != urls.len() {
            return Err(self.error(format!(
                "expected {} images, got {}",
                urls.len(),
                body.images.len()
            )));
        }

        let outcomes = body
            .images
            .into_iter()
            .map(|encoded| match encoded {
                Some(b64) => match general_purpose::STANDARD.decode(b64.as_bytes()) {
                    Ok(bytes) => CaptureOutcome::Image(bytes),
                    Err(e) => CaptureOutcome::Failed(format!("invalid base64 payload: {}", e)),
                },
                None => CaptureOutcome::Failed("service returned no image".to_string()),
            })
            .collect();

        Ok(outcomes)
    }
}
