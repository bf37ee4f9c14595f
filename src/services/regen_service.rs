use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;

use crate::config::RenderConfig;
use crate::db::DbPool;
use crate::models::{RotationEntry, Screen};
use crate::services::capture::{CaptureService, RenderBudget};
use crate::services::invalidation_service::{affected_screens, ContentChange};
use crate::services::publish_service::publish;
use crate::services::snapshot_service::capture_rotation;
use crate::services::version::rotation_version;

/// What one screen's regeneration did. Expected failures are carried as
/// error strings; an admin-triggered run gets this back verbatim, a
/// background run only logs it.
#[derive(Debug, Serialize)]
pub struct RegenOutcome {
    pub screen_id: i32,
    pub version: Option<String>,
    pub generated: usize,
    pub deleted: usize,
    pub errors: Vec<String>,
}

impl RegenOutcome {
    fn failed(screen_id: i32, error: String) -> Self {
        Self {
            screen_id,
            version: None,
            generated: 0,
            deleted: 0,
            errors: vec![error],
        }
    }
}

/// Wires the version hasher, capture orchestrator, publisher and
/// invalidation resolver together.
pub struct RegenService {
    db: DbPool,
    store: Option<Arc<dyn crate::services::storage::SlideStore>>,
    capture: Arc<CaptureService>,
    render: RenderConfig,
}

impl RegenService {
    pub fn new(
        db: DbPool,
        store: Option<Arc<dyn crate::services::storage::SlideStore>>,
        capture: Arc<CaptureService>,
        render: RenderConfig,
    ) -> Self {
        Self {
            db,
            store,
            capture,
            render,
        }
    }

    pub fn capture_backends(&self) -> Vec<&'static str> {
        self.capture.backend_names()
    }

    pub fn storage_configured(&self) -> bool {
        self.store.is_some()
    }

    /// Regenerate one screen now. Internally strictly sequential: the
    /// capture targets may share one rendering session upstream, so slides
    /// are never captured concurrently within a screen.
    pub async fn regenerate_screen(&self, screen_id: i32) -> RegenOutcome {
        let Some(store) = &self.store else {
            return RegenOutcome::failed(screen_id, "Object storage is not configured".to_string());
        };
        if !self.capture.is_available() {
            return RegenOutcome::failed(screen_id, "No capture backend is configured".to_string());
        }

        let mut conn = match self.db.get() {
            Ok(conn) => conn,
            Err(e) => {
                return RegenOutcome::failed(screen_id, format!("Database unavailable: {}", e))
            }
        };

        let (screen, entries) = match load_screen_and_rotation(&mut conn, screen_id) {
            Ok(Some(loaded)) => loaded,
            Ok(None) => {
                return RegenOutcome::failed(screen_id, format!("Screen {} not found", screen_id))
            }
            Err(e) => {
                return RegenOutcome::failed(screen_id, format!("Failed to load rotation: {}", e))
            }
        };
        if entries.is_empty() {
            return RegenOutcome::failed(screen_id, "No templates are live for this screen".to_string());
        }

        let version = rotation_version(&entries);
        let budget = RenderBudget::from_config(&self.render);
        tracing::info!(
            "Regenerating screen {} ({}): {} slides, version {}",
            screen.id,
            screen.public_slug,
            entries.len(),
            version
        );

        let run = capture_rotation(
            self.capture.as_ref(),
            &self.render.base_url,
            &screen.public_slug,
            entries,
            &version,
            &budget,
        )
        .await;

        let report = publish(store.as_ref(), &mut conn, &screen, &run, &version).await;
        tracing::info!(
            "Screen {}: version {} generated={} deleted={} errors={}",
            screen.id,
            report.version,
            report.uploaded,
            report.deleted,
            report.errors.len()
        );

        RegenOutcome {
            screen_id,
            version: Some(report.version),
            generated: report.uploaded,
            deleted: report.deleted,
            errors: report.errors,
        }
    }

    /// Screens whose published artifacts the change could have staled.
    pub fn resolve_affected(&self, change: &ContentChange) -> anyhow::Result<Vec<i32>> {
        let mut conn = self.db.get()?;
        Ok(affected_screens(&mut conn, change)?.into_iter().collect())
    }

    /// Regenerate a fixed set of screens with independent failure isolation,
    /// a few at a time so the capture backend is not overwhelmed.
    pub async fn regenerate_screens(&self, screen_ids: Vec<i32>) -> Vec<RegenOutcome> {
        let limit = self.render.max_concurrent_screens.max(1);
        stream::iter(screen_ids)
            .map(|id| self.regenerate_screen(id))
            .buffer_unordered(limit)
            .collect()
            .await
    }

    /// Resolve and regenerate everything a content change staled.
    pub async fn regenerate_affected(&self, change: &ContentChange) -> Vec<RegenOutcome> {
        let screen_ids = match self.resolve_affected(change) {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!("Invalidation resolve failed for {:?}: {}", change, e);
                return Vec::new();
            }
        };
        if screen_ids.is_empty() {
            tracing::debug!("No screens reference {:?}; nothing to regenerate", change);
            return Vec::new();
        }
        tracing::info!("{:?} affects {} screens", change, screen_ids.len());
        self.regenerate_screens(screen_ids).await
    }
}

fn load_screen_and_rotation(
    conn: &mut SqliteConnection,
    target_id: i32,
) -> anyhow::Result<Option<(Screen, Vec<RotationEntry>)>> {
    use crate::schema::screen_template_rotations::dsl as rot;
    use crate::schema::screens::dsl as s;

    let screen = s::screens
        .filter(s::id.eq(target_id))
        .select(Screen::as_select())
        .first::<Screen>(conn)
        .optional()?;
    let Some(screen) = screen else {
        return Ok(None);
    };

    let entries = rot::screen_template_rotations
        .filter(rot::screen_id.eq(target_id))
        .filter(rot::is_active.eq(true))
        .order(rot::display_order.asc())
        .select(RotationEntry::as_select())
        .load::<RotationEntry>(conn)?;

    Ok(Some((screen, entries)))
}
