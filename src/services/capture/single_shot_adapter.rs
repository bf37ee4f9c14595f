use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use super::{CaptureBackend, CaptureError, CaptureOutcome, RenderBudget, RenderWait, READY_FLAG_SELECTOR};
use crate::config::SingleShotConfig;

const DEFAULT_ENDPOINT: &str = "https://api.screenshotone.com/take";

/// Hosted screenshot API, one request per URL. Any non-success response is a
/// per-URL failure; the whole call only fails if the endpoint URL itself is
/// unusable.
pub struct SingleShotBackend {
    client: Client,
    endpoint: String,
    access_key: String,
}

impl SingleShotBackend {
    pub fn from_config(config: Option<&SingleShotConfig>, client: Client) -> Option<Self> {
        let config = config?;
        if config.access_key.trim().is_empty() {
            return None;
        }
        Some(Self {
            client,
            endpoint: config
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            access_key: config.access_key.trim().to_string(),
        })
    }

    fn build_request_url(&self, target: &str, budget: &RenderBudget) -> Result<Url, CaptureError> {
        let mut url = Url::parse(&self.endpoint).map_err(|e| CaptureError::Backend {
            backend: "single-shot",
            message: format!("invalid endpoint: {}", e),
        })?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("access_key", &self.access_key)
                .append_pair("url", target)
                .append_pair("format", "jpg")
                .append_pair("image_quality", &budget.quality.to_string())
                .append_pair("viewport_width", &budget.viewport.0.to_string())
                .append_pair("viewport_height", &budget.viewport.1.to_string())
                .append_pair("timeout", &budget.transport_timeout.as_secs().to_string());

            match &budget.wait {
                RenderWait::ReadyFlag {
                    poll_timeout,
                    settle,
                } => {
                    query
                        .append_pair("wait_for_selector", READY_FLAG_SELECTOR)
                        .append_pair(
                            "wait_for_selector_timeout",
                            &poll_timeout.as_secs().to_string(),
                        )
                        .append_pair("delay", &settle.as_secs().max(1).to_string());
                }
                RenderWait::FixedDelay { settle } => {
                    query.append_pair("delay", &settle.as_secs().max(1).to_string());
                }
            }
        }

        Ok(url)
    }

    async fn capture_one(&self, target: &str, budget: &RenderBudget) -> Result<Vec<u8>, String> {
        let url = self
            .build_request_url(target, budget)
            .map_err(|e| e.to_string())?;

        let res = self
            .client
            .get(url)
            .timeout(budget.total_timeout())
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        if !res.status().is_success() {
            return Err(format!("HTTP {}", res.status()));
        }

        let bytes = res
            .bytes()
            .await
            .map_err(|e| format!("failed to read image body: {}", e))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl CaptureBackend for SingleShotBackend {
    fn name(&self) -> &'static str {
        "single-shot"
    }

    async fn capture_all(
        &self,
        urls: &[String],
        budget: &RenderBudget,
    ) -> Result<Vec<CaptureOutcome>, CaptureError> {
        // Sequential on purpose: the render targets may share one live page
        // session upstream, and the hosted API rate-limits bursts anyway.
        let mut outcomes = Vec::with_capacity(urls.len());
        for url in urls {
            match self.capture_one(url, budget).await {
                Ok(bytes) => outcomes.push(CaptureOutcome::Image(bytes)),
                Err(message) => outcomes.push(CaptureOutcome::Failed(message)),
            }
        }
        Ok(outcomes)
    }
}
