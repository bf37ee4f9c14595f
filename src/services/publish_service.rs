use anyhow::Result;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use serde::Serialize;

use crate::models::{RotationEntry, Screen};
use crate::services::snapshot_service::CaptureRun;
use crate::services::storage::SlideStore;

/// The document playback devices consume: ordered slide URLs with timing
/// and transition metadata.
#[derive(Debug, Serialize)]
pub struct LayoutManifest {
    pub version: String,
    #[serde(rename = "backgroundColor")]
    pub background_color: String,
    pub slides: Vec<ManifestSlide>,
}

#[derive(Debug, Serialize)]
pub struct ManifestSlide {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub url: String,
    pub duration: i32,
    pub transition_effect: String,
    pub transition_duration: i32,
}

/// What a publish run did, stage by stage. Failures are data, not panics;
/// only the API layer decides whether any of this is worth a non-200.
#[derive(Debug, Serialize)]
pub struct PublishReport {
    pub version: String,
    pub uploaded: usize,
    pub manifest_written: bool,
    pub pointer_advanced: bool,
    pub deleted: usize,
    pub errors: Vec<String>,
}

pub fn slide_key(screen_id: i32, version: &str, index: usize) -> String {
    format!("slides/{}/{}/slide_{}.jpg", screen_id, version, index)
}

pub fn manifest_key(screen_id: i32, version: &str) -> String {
    format!("slides/{}/{}/layout_snapshot.json", screen_id, version)
}

fn version_prefix(screen_id: i32, version: &str) -> String {
    format!("slides/{}/{}/", screen_id, version)
}

fn screen_prefix(screen_id: i32) -> String {
    format!("slides/{}/", screen_id)
}

fn clamp_duration(secs: i32) -> i32 {
    secs.max(1)
}

fn clamp_transition(ms: i32) -> i32 {
    ms.clamp(100, 5000)
}

/// Publish a capture run: slides, then manifest, then version pointer, then
/// cleanup of superseded versions, strictly in that order. A device that
/// reads the pointer therefore always finds a complete manifest, and a
/// manifest never references an image that is not yet uploaded.
pub async fn publish(
    store: &dyn SlideStore,
    conn: &mut SqliteConnection,
    screen: &Screen,
    run: &CaptureRun,
    version: &str,
) -> PublishReport {
    let mut report = PublishReport {
        version: version.to_string(),
        uploaded: 0,
        manifest_written: false,
        pointer_advanced: false,
        deleted: 0,
        errors: run.errors.clone(),
    };

    // Stage 1: upload the slides that captured.
    let mut published: Vec<(usize, &RotationEntry)> = Vec::new();
    for slide in &run.slides {
        let Some(image) = &slide.image else { continue };
        let key = slide_key(screen.id, version, slide.index);
        match store.put_object(&key, image.clone(), "image/jpeg").await {
            Ok(()) => published.push((slide.index, &slide.entry)),
            Err(e) => report
                .errors
                .push(format!("Slide {}: upload failed: {}", slide.index, e)),
        }
    }
    report.uploaded = published.len();

    // Stage 2: a fully failed run must not erase a working prior version.
    if published.is_empty() {
        tracing::warn!(
            "Screen {}: no slides published for version {}, keeping previous version",
            screen.id,
            version
        );
        return report;
    }

    // Stage 3: manifest covering whatever made it; fewer slides than
    // requested beats no manifest.
    let manifest = build_manifest(store, screen, version, &published);
    let body = match serde_json::to_vec(&manifest) {
        Ok(body) => body,
        Err(e) => {
            report
                .errors
                .push(format!("Layout manifest serialization failed: {}", e));
            return report;
        }
    };
    match store
        .put_object(&manifest_key(screen.id, version), body, "application/json")
        .await
    {
        Ok(()) => report.manifest_written = true,
        Err(e) => {
            // Without a manifest the new version is not servable; leave the
            // pointer on the previous complete version and let the caller
            // retry the whole run.
            report
                .errors
                .push(format!("Layout manifest upload failed: {}", e));
            return report;
        }
    }

    // Stage 4: advance the pointer, the single pipeline-owned mutation.
    match advance_pointer(conn, screen.id, version) {
        Ok(()) => report.pointer_advanced = true,
        Err(e) => {
            report
                .errors
                .push(format!("Version pointer update failed: {}", e));
            return report;
        }
    }

    // Stage 5: reclaim superseded versions. Failure only delays storage
    // reclamation; the swept objects are already unreferenced.
    match sweep_old_versions(store, screen.id, version).await {
        Ok(deleted) => report.deleted = deleted,
        Err(e) => {
            tracing::warn!("Screen {}: cleanup failed: {}", screen.id, e);
            report.errors.push(format!("Cleanup failed: {}", e));
        }
    }

    report
}

fn build_manifest(
    store: &dyn SlideStore,
    screen: &Screen,
    version: &str,
    published: &[(usize, &RotationEntry)],
) -> LayoutManifest {
    let slides = published
        .iter()
        .map(|(index, entry)| ManifestSlide {
            kind: "image",
            url: store.public_url(&slide_key(screen.id, version, *index)),
            duration: clamp_duration(entry.display_duration),
            transition_effect: entry.transition_effect.clone(),
            transition_duration: clamp_transition(entry.transition_duration),
        })
        .collect();

    LayoutManifest {
        version: version.to_string(),
        background_color: screen.background_color.clone(),
        slides,
    }
}

fn advance_pointer(conn: &mut SqliteConnection, target_id: i32, version: &str) -> Result<()> {
    use crate::schema::screens::dsl::*;

    diesel::update(screens.filter(id.eq(target_id)))
        .set((
            published_version.eq(Some(version.to_string())),
            updated_at.eq(chrono::Utc::now().naive_utc()),
        ))
        .execute(conn)?;
    Ok(())
}

async fn sweep_old_versions(
    store: &dyn SlideStore,
    screen_id: i32,
    version: &str,
) -> Result<usize> {
    let keep = version_prefix(screen_id, version);
    let keys = store.list_keys(&screen_prefix(screen_id)).await?;
    let stale: Vec<String> = keys.into_iter().filter(|k| !k.starts_with(&keep)).collect();
    if stale.is_empty() {
        return Ok(0);
    }
    store.delete_objects(&stale).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_test_connection;
    use crate::models::{NewRotationEntry, NewScreen};
    use crate::services::snapshot_service::CapturedSlide;
    use crate::services::storage::testing::MemoryStore;

    fn create_screen(conn: &mut SqliteConnection, slug: &str) -> Screen {
        use crate::schema::screens;

        diesel::insert_into(screens::table)
            .values(&NewScreen {
                business_id: 1,
                name: "TV1".to_string(),
                public_slug: slug.to_string(),
                public_token: format!("tok-{}", slug),
                background_color: "#000000".to_string(),
            })
            .returning(Screen::as_returning())
            .get_result(conn)
            .expect("insert screen")
    }

    fn rotation_entry(conn: &mut SqliteConnection, screen_id: i32, template_id: i32, order: i32) -> RotationEntry {
        use crate::schema::screen_template_rotations;

        diesel::insert_into(screen_template_rotations::table)
            .values(&NewRotationEntry {
                screen_id,
                template_id: Some(template_id),
                canvas_template_id: None,
                display_order: order,
                display_duration: 8,
                transition_effect: "slide-left".to_string(),
                transition_duration: 500,
                is_active: true,
            })
            .returning(RotationEntry::as_returning())
            .get_result(conn)
            .expect("insert rotation entry")
    }

    fn pointer_of(conn: &mut SqliteConnection, target_id: i32) -> Option<String> {
        use crate::schema::screens::dsl::*;

        screens
            .filter(id.eq(target_id))
            .select(published_version)
            .first(conn)
            .expect("load pointer")
    }

    fn run_of(slides: Vec<CapturedSlide>, errors: Vec<String>) -> CaptureRun {
        CaptureRun { slides, errors }
    }

    #[tokio::test]
    async fn fully_failed_capture_leaves_previous_version_untouched() {
        let mut conn = open_test_connection();
        let store = MemoryStore::new();
        let screen = create_screen(&mut conn, "tv1");
        let entry = rotation_entry(&mut conn, screen.id, 1, 0);

        // an older published version already lives in storage
        store.insert("slides/1/oldversion/slide_0.jpg", vec![1]);

        let run = run_of(
            vec![CapturedSlide {
                index: 0,
                entry,
                image: None,
            }],
            vec!["Slide 0: HTTP 502".to_string()],
        );
        let report = publish(&store, &mut conn, &screen, &run, "newversion").await;

        assert_eq!(report.uploaded, 0);
        assert!(!report.manifest_written);
        assert!(!report.pointer_advanced);
        assert_eq!(report.deleted, 0);
        assert_eq!(pointer_of(&mut conn, screen.id), None);
        // nothing was written and nothing was swept
        assert_eq!(store.keys(), vec!["slides/1/oldversion/slide_0.jpg"]);
    }

    #[tokio::test]
    async fn partial_capture_publishes_the_slides_that_made_it() {
        let mut conn = open_test_connection();
        let store = MemoryStore::new();
        let screen = create_screen(&mut conn, "tv2");
        let e0 = rotation_entry(&mut conn, screen.id, 1, 0);
        let e1 = rotation_entry(&mut conn, screen.id, 2, 1);
        let e2 = rotation_entry(&mut conn, screen.id, 3, 2);

        let run = run_of(
            vec![
                CapturedSlide {
                    index: 0,
                    entry: e0,
                    image: Some(vec![0xaa]),
                },
                CapturedSlide {
                    index: 1,
                    entry: e1,
                    image: None,
                },
                CapturedSlide {
                    index: 2,
                    entry: e2,
                    image: Some(vec![0xbb]),
                },
            ],
            vec!["Slide 1: render timed out".to_string()],
        );
        let report = publish(&store, &mut conn, &screen, &run, "abc123").await;

        assert_eq!(report.uploaded, 2);
        assert!(report.manifest_written);
        assert!(report.pointer_advanced);
        assert!(report.errors.iter().any(|e| e.contains("Slide 1")));
        assert_eq!(pointer_of(&mut conn, screen.id), Some("abc123".to_string()));

        let manifest = store
            .object(&manifest_key(screen.id, "abc123"))
            .expect("manifest uploaded");
        let parsed: serde_json::Value = serde_json::from_slice(&manifest).unwrap();
        assert_eq!(parsed["version"], "abc123");
        assert_eq!(parsed["backgroundColor"], "#000000");
        let slides = parsed["slides"].as_array().unwrap();
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[0]["type"], "image");
        assert!(slides[0]["url"]
            .as_str()
            .unwrap()
            .ends_with("slide_0.jpg"));
        assert!(slides[1]["url"]
            .as_str()
            .unwrap()
            .ends_with("slide_2.jpg"));
    }

    #[tokio::test]
    async fn manifest_is_written_after_slides_and_cleanup_runs_last() {
        let mut conn = open_test_connection();
        let store = MemoryStore::new();
        let screen = create_screen(&mut conn, "tv3");
        let e0 = rotation_entry(&mut conn, screen.id, 1, 0);
        let e1 = rotation_entry(&mut conn, screen.id, 2, 1);

        store.insert(
            &slide_key(screen.id, "previous", 0),
            vec![0x01],
        );

        let run = run_of(
            vec![
                CapturedSlide {
                    index: 0,
                    entry: e0,
                    image: Some(vec![0xaa]),
                },
                CapturedSlide {
                    index: 1,
                    entry: e1,
                    image: Some(vec![0xbb]),
                },
            ],
            Vec::new(),
        );
        let report = publish(&store, &mut conn, &screen, &run, "current1").await;
        assert_eq!(report.deleted, 1);

        let events = store.events();
        let manifest_pos = events
            .iter()
            .position(|e| e.contains("layout_snapshot.json"))
            .expect("manifest event");
        // every slide upload precedes the manifest, every delete follows it
        for (pos, event) in events.iter().enumerate() {
            if event.starts_with("put slides/") && event.ends_with(".jpg") {
                assert!(pos < manifest_pos, "slide upload after manifest: {}", event);
            }
            if event.starts_with("delete ") {
                assert!(pos > manifest_pos, "cleanup before manifest: {}", event);
            }
        }

        // monotone cleanup: only the current version remains
        let keys = store.keys();
        assert!(keys.iter().all(|k| k.contains("/current1/")));
        assert_eq!(keys.len(), 3);
    }

    #[tokio::test]
    async fn manifest_upload_failure_keeps_pointer_and_skips_cleanup() {
        let mut conn = open_test_connection();
        let store = MemoryStore::new();
        let screen = create_screen(&mut conn, "tv4");
        let entry = rotation_entry(&mut conn, screen.id, 1, 0);

        store.insert(&slide_key(screen.id, "previous", 0), vec![0x01]);
        store.fail_put(&manifest_key(screen.id, "next1"));

        let run = run_of(
            vec![CapturedSlide {
                index: 0,
                entry,
                image: Some(vec![0xaa]),
            }],
            Vec::new(),
        );
        let report = publish(&store, &mut conn, &screen, &run, "next1").await;

        assert_eq!(report.uploaded, 1);
        assert!(!report.manifest_written);
        assert!(!report.pointer_advanced);
        assert_eq!(report.deleted, 0);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("manifest upload failed")));
        assert_eq!(pointer_of(&mut conn, screen.id), None);
        // the previous version's objects survive
        assert!(store
            .object(&slide_key(screen.id, "previous", 0))
            .is_some());
    }

    #[test]
    fn manifest_clamps_timing_metadata() {
        let store = MemoryStore::new();
        let ts = chrono::NaiveDateTime::default();
        let screen = Screen {
            id: 9,
            business_id: 1,
            name: "TV9".to_string(),
            public_slug: "tv9".to_string(),
            public_token: "tok".to_string(),
            broadcast_code: None,
            is_active: true,
            background_color: "#101010".to_string(),
            published_version: None,
            created_at: ts,
            updated_at: ts,
        };
        let entry = RotationEntry {
            id: 1,
            screen_id: 9,
            template_id: Some(4),
            canvas_template_id: None,
            display_order: 0,
            display_duration: 0,
            transition_effect: "fade".to_string(),
            transition_duration: 60_000,
            is_active: true,
            created_at: ts,
            updated_at: ts,
        };

        let manifest = build_manifest(&store, &screen, "v1", &[(0, &entry)]);
        assert_eq!(manifest.slides[0].duration, 1);
        assert_eq!(manifest.slides[0].transition_duration, 5000);
        assert_eq!(manifest.background_color, "#101010");
    }
}
