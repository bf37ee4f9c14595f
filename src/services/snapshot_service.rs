use crate::models::RotationEntry;
use crate::services::capture::{CaptureOutcome, CaptureService, RenderBudget};

/// One rotation entry's capture result. `image` is None when the entry had
/// no content source or its capture failed; the error list says which.
#[derive(Debug, Clone)]
pub struct CapturedSlide {
    pub index: usize,
    pub entry: RotationEntry,
    pub image: Option<Vec<u8>>,
}

/// Best-effort capture of a whole rotation: exactly one slide per active
/// entry, order preserved, plus the accumulated per-slide errors.
#[derive(Debug, Default)]
pub struct CaptureRun {
    pub slides: Vec<CapturedSlide>,
    pub errors: Vec<String>,
}

/// Capture target URL for one rotation entry. Every component that changes
/// between runs is in the query string, so upstream caches can never serve
/// slide N's pixels for slide M: slug, rotation index, content version, and
/// a run timestamp.
pub fn capture_url(
    base_url: &str,
    slug: &str,
    index: usize,
    version: &str,
    run_ts: i64,
    mode: &str,
) -> String {
    let encoded_slug: String = url::form_urlencoded::byte_serialize(slug.as_bytes()).collect();
    format!(
        "{}/display/{}?lite=1&mode={}&rotationIndex={}&v={}&_={}-{}",
        base_url.trim_end_matches('/'),
        encoded_slug,
        mode,
        index,
        version,
        run_ts,
        index
    )
}

/// Drive one screen's rotation through the capture service. A failed entry
/// is recorded and skipped, never fatal; a regeneration is not aborted by
/// one bad slide.
pub async fn capture_rotation(
    capture: &CaptureService,
    base_url: &str,
    slug: &str,
    entries: Vec<RotationEntry>,
    version: &str,
    budget: &RenderBudget,
) -> CaptureRun {
    let run_ts = chrono::Utc::now().timestamp_millis();
    let mode = budget.wait.mode_param();

    let mut run = CaptureRun::default();
    let mut urls = Vec::new();
    let mut renderable = Vec::new();

    for (index, entry) in entries.iter().enumerate() {
        if entry.content_ref().is_some() {
            urls.push(capture_url(base_url, slug, index, version, run_ts, mode));
            renderable.push(index);
        } else {
            run.errors.push(format!(
                "Slide {}: rotation entry {} has no content source",
                index, entry.id
            ));
        }
    }

    let outcomes = if urls.is_empty() {
        Ok(Vec::new())
    } else {
        capture.capture_all(&urls, budget).await
    };

    let mut images: Vec<Option<Vec<u8>>> = vec![None; entries.len()];
    match outcomes {
        Ok(outcomes) => {
            for (slot, outcome) in renderable.iter().zip(outcomes) {
                match outcome {
                    CaptureOutcome::Image(bytes) => images[*slot] = Some(bytes),
                    CaptureOutcome::Failed(reason) => {
                        run.errors.push(format!("Slide {}: {}", slot, reason));
                    }
                }
            }
        }
        Err(e) => {
            run.errors
                .push(format!("Capture failed for all {} slides: {}", urls.len(), e));
        }
    }

    for (index, (entry, image)) in entries.into_iter().zip(images).enumerate() {
        run.slides.push(CapturedSlide {
            index,
            entry,
            image,
        });
    }

    run
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::capture::{CaptureBackend, CaptureError, RenderWait};
    use async_trait::async_trait;
    use chrono::NaiveDateTime;
    use std::sync::Arc;
    use std::time::Duration;

    fn entry(id: i32, template_id: Option<i32>, order: i32) -> RotationEntry {
        let ts = NaiveDateTime::default();
        RotationEntry {
            id,
            screen_id: 1,
            template_id,
            canvas_template_id: None,
            display_order: order,
            display_duration: 8,
            transition_effect: "fade".to_string(),
            transition_duration: 500,
            is_active: true,
            created_at: ts,
            updated_at: ts,
        }
    }

    fn budget() -> RenderBudget {
        RenderBudget {
            viewport: (1920, 1080),
            quality: 90,
            transport_timeout: Duration::from_secs(5),
            wait: RenderWait::ReadyFlag {
                poll_timeout: Duration::from_secs(2),
                settle: Duration::from_millis(100),
            },
        }
    }

    struct ScriptedBackend {
        outcomes: Vec<CaptureOutcome>,
    }

    #[async_trait]
    impl CaptureBackend for ScriptedBackend {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn capture_all(
            &self,
            urls: &[String],
            _budget: &RenderBudget,
        ) -> Result<Vec<CaptureOutcome>, CaptureError> {
            assert_eq!(urls.len(), self.outcomes.len());
            Ok(self.outcomes.clone())
        }
    }

    #[test]
    fn capture_url_distinguishes_every_slide_and_run() {
        let a = capture_url("https://menucast.example/", "metro-pizza-tv1", 0, "abc123", 99, "snapshot");
        let b = capture_url("https://menucast.example/", "metro-pizza-tv1", 1, "abc123", 99, "snapshot");
        assert_ne!(a, b);
        assert!(a.starts_with(
            "https://menucast.example/display/metro-pizza-tv1?lite=1&mode=snapshot&rotationIndex=0"
        ));
        assert!(a.contains("&v=abc123&_=99-0"));
    }

    #[tokio::test]
    async fn one_failed_slide_does_not_abort_the_run() {
        let backend = Arc::new(ScriptedBackend {
            outcomes: vec![
                CaptureOutcome::Image(vec![0]),
                CaptureOutcome::Failed("HTTP 502".to_string()),
                CaptureOutcome::Image(vec![2]),
            ],
        });
        let capture = CaptureService::with_backends(vec![backend]);

        let entries = vec![
            entry(10, Some(1), 0),
            entry(11, Some(2), 1),
            entry(12, Some(3), 2),
        ];
        let run = capture_rotation(&capture, "http://base", "tv1", entries, "deadbeef", &budget()).await;

        assert_eq!(run.slides.len(), 3);
        assert!(run.slides[0].image.is_some());
        assert!(run.slides[1].image.is_none());
        assert!(run.slides[2].image.is_some());
        assert_eq!(run.errors.len(), 1);
        assert!(run.errors[0].contains("Slide 1"));
    }

    #[tokio::test]
    async fn entries_without_content_are_reported_but_keep_their_slot() {
        let backend = Arc::new(ScriptedBackend {
            outcomes: vec![CaptureOutcome::Image(vec![7])],
        });
        let capture = CaptureService::with_backends(vec![backend]);

        // middle entry references nothing; only one URL reaches the backend
        let entries = vec![entry(1, Some(5), 0), entry(2, None, 1)];
        let run = capture_rotation(&capture, "http://base", "tv1", entries, "deadbeef", &budget()).await;

        assert_eq!(run.slides.len(), 2);
        assert!(run.slides[0].image.is_some());
        assert!(run.slides[1].image.is_none());
        assert_eq!(run.errors.len(), 1);
        assert!(run.errors[0].contains("no content source"));
    }
}
