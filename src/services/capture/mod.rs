mod batch_adapter;
mod local_browser_adapter;
mod single_shot_adapter;

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{CaptureConfig, RenderConfig};

pub use batch_adapter::BatchCaptureBackend;
pub use local_browser_adapter::LocalBrowserBackend;
pub use single_shot_adapter::SingleShotBackend;

/// CSS selector the display page satisfies once rendering has stabilized
/// (fonts loaded, images decoded, animation frozen). Part of the capture
/// target URL contract; only meaningful in snapshot mode.
pub const READY_FLAG_SELECTOR: &str = "body[data-display-ready=\"true\"]";

/// Render-readiness policy. Snapshot mode polls the page ready flag and is
/// reproducible; live mode just waits out fonts and layout.
#[derive(Debug, Clone)]
pub enum RenderWait {
    ReadyFlag { poll_timeout: Duration, settle: Duration },
    FixedDelay { settle: Duration },
}

impl RenderWait {
    /// Mode flag the display page receives in its query string.
    pub fn mode_param(&self) -> &'static str {
        match self {
            RenderWait::ReadyFlag { .. } => "snapshot",
            RenderWait::FixedDelay { .. } => "live",
        }
    }

    /// Upper bound on in-page waiting, distinct from the transport timeout.
    pub fn render_cap(&self) -> Duration {
        match self {
            RenderWait::ReadyFlag {
                poll_timeout,
                settle,
            } => *poll_timeout + *settle,
            RenderWait::FixedDelay { settle } => *settle,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderBudget {
    pub viewport: (u32, u32),
    pub quality: u8,
    /// Transport timeout per capture call, excluding in-page waiting.
    pub transport_timeout: Duration,
    pub wait: RenderWait,
}

impl RenderBudget {
    pub fn from_config(render: &RenderConfig) -> Self {
        let wait = if render.snapshot_capture {
            RenderWait::ReadyFlag {
                poll_timeout: Duration::from_secs(render.ready_poll_secs),
                settle: Duration::from_millis(render.settle_ms),
            }
        } else {
            RenderWait::FixedDelay {
                settle: Duration::from_millis(render.live_settle_ms),
            }
        };
        Self {
            viewport: (render.viewport_width, render.viewport_height),
            quality: render.quality,
            transport_timeout: Duration::from_secs(render.max_wait_secs),
            wait,
        }
    }

    /// Total wall-clock bound for one capture call.
    pub fn total_timeout(&self) -> Duration {
        self.transport_timeout + self.wait.render_cap()
    }
}

/// Per-URL result. A backend never fails the whole call for one bad URL
/// when the others could still succeed.
#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    Image(Vec<u8>),
    Failed(String),
}

impl CaptureOutcome {
    pub fn is_image(&self) -> bool {
        matches!(self, CaptureOutcome::Image(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("no capture backend is configured")]
    NotConfigured,
    #[error("{backend}: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },
}

/// One capture strategy (batch service, per-URL API, local browser).
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns exactly one outcome per URL, in order. `Err` means the whole
    /// call failed (transport, service outage) and the caller may retry the
    /// same URLs against the next strategy.
    async fn capture_all(
        &self,
        urls: &[String],
        budget: &RenderBudget,
    ) -> Result<Vec<CaptureOutcome>, CaptureError>;
}

/// Routes capture calls to the first backend whose prerequisites are met,
/// falling through to later strategies on whole-call failure.
pub struct CaptureService {
    backends: Vec<Arc<dyn CaptureBackend>>,
}

impl CaptureService {
    pub fn from_config(config: &CaptureConfig) -> Self {
        let client = Client::new();
        let mut backends: Vec<Arc<dyn CaptureBackend>> = Vec::new();

        if let Some(backend) = BatchCaptureBackend::from_config(config.batch.as_ref(), client.clone())
        {
            backends.push(Arc::new(backend));
        }
        if let Some(backend) = SingleShotBackend::from_config(config.single.as_ref(), client) {
            backends.push(Arc::new(backend));
        }
        if let Some(backend) = LocalBrowserBackend::from_config(&config.local) {
            backends.push(Arc::new(backend));
        }

        if backends.is_empty() {
            tracing::warn!("No capture backend available; slide regeneration will be skipped");
        } else {
            tracing::info!(
                "Capture backends in priority order: {:?}",
                backends.iter().map(|b| b.name()).collect::<Vec<_>>()
            );
        }

        Self { backends }
    }

    #[cfg(test)]
    pub fn with_backends(backends: Vec<Arc<dyn CaptureBackend>>) -> Self {
        Self { backends }
    }

    pub fn is_available(&self) -> bool {
        !self.backends.is_empty()
    }

    pub fn backend_names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    pub async fn capture_all(
        &self,
        urls: &[String],
        budget: &RenderBudget,
    ) -> Result<Vec<CaptureOutcome>, CaptureError> {
        if urls.is_empty() {
            return Ok(Vec::new());
        }
        if self.backends.is_empty() {
            return Err(CaptureError::NotConfigured);
        }

        let mut last_error = CaptureError::NotConfigured;
        for backend in &self.backends {
            match backend.capture_all(urls, budget).await {
                Ok(outcomes) if outcomes.len() == urls.len() => return Ok(outcomes),
                Ok(outcomes) => {
                    tracing::warn!(
                        "Capture backend {} returned {} results for {} urls",
                        backend.name(),
                        outcomes.len(),
                        urls.len()
                    );
                    last_error = CaptureError::Backend {
                        backend: backend.name(),
                        message: "result count does not match request".to_string(),
                    };
                }
                Err(e) => {
                    tracing::warn!("Capture backend {} failed: {}", backend.name(), e);
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticBackend {
        name: &'static str,
        outcomes: Option<Vec<CaptureOutcome>>,
    }

    #[async_trait]
    impl CaptureBackend for StaticBackend {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn capture_all(
            &self,
            _urls: &[String],
            _budget: &RenderBudget,
        ) -> Result<Vec<CaptureOutcome>, CaptureError> {
            match &self.outcomes {
                Some(outcomes) => Ok(outcomes.clone()),
                None => Err(CaptureError::Backend {
                    backend: self.name,
                    message: "service unavailable".to_string(),
                }),
            }
        }
    }

    fn budget() -> RenderBudget {
        RenderBudget {
            viewport: (1920, 1080),
            quality: 90,
            transport_timeout: Duration::from_secs(5),
            wait: RenderWait::FixedDelay {
                settle: Duration::from_millis(100),
            },
        }
    }

    #[tokio::test]
    async fn no_backends_reports_not_configured() {
        let service = CaptureService::with_backends(Vec::new());
        let err = service
            .capture_all(&["http://a".to_string()], &budget())
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::NotConfigured));
    }

    #[tokio::test]
    async fn whole_call_failure_falls_back_to_next_strategy() {
        let failing = Arc::new(StaticBackend {
            name: "batch-service",
            outcomes: None,
        });
        let working = Arc::new(StaticBackend {
            name: "single-shot",
            outcomes: Some(vec![
                CaptureOutcome::Image(vec![1, 2, 3]),
                CaptureOutcome::Failed("render timed out".to_string()),
            ]),
        });
        let service = CaptureService::with_backends(vec![failing, working]);

        let urls = vec!["http://a".to_string(), "http://b".to_string()];
        let outcomes = service.capture_all(&urls, &budget()).await.unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].is_image());
        assert!(!outcomes[1].is_image());
    }

    #[tokio::test]
    async fn per_url_failures_do_not_trigger_fallback() {
        let partial = Arc::new(StaticBackend {
            name: "batch-service",
            outcomes: Some(vec![CaptureOutcome::Failed("bad page".to_string())]),
        });
        let never_reached = Arc::new(StaticBackend {
            name: "single-shot",
            outcomes: Some(vec![CaptureOutcome::Image(vec![9])]),
        });
        let service = CaptureService::with_backends(vec![partial, never_reached]);

        let outcomes = service
            .capture_all(&["http://a".to_string()], &budget())
            .await
            .unwrap();
        assert!(!outcomes[0].is_image());
    }

    #[test]
    fn snapshot_mode_caps_render_wait_above_live_mode() {
        let snapshot = RenderWait::ReadyFlag {
            poll_timeout: Duration::from_secs(10),
            settle: Duration::from_millis(500),
        };
        assert_eq!(snapshot.mode_param(), "snapshot");
        assert_eq!(snapshot.render_cap(), Duration::from_millis(10_500));

        let live = RenderWait::FixedDelay {
            settle: Duration::from_millis(2500),
        };
        assert_eq!(live.mode_param(), "live");
        assert_eq!(live.render_cap(), Duration::from_millis(2500));
    }
}
