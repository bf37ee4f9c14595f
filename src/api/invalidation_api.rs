use crate::models::{Menu, MenuItem, Template};
use crate::services::invalidation_service::ContentChange;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use diesel::prelude::*;
use serde::Serialize;

#[derive(Serialize)]
pub struct InvalidationResponse {
    pub affected_screens: Vec<i32>,
}

/// Resolve the affected screens, answer immediately, and regenerate in the
/// background. There is no synchronous caller to report to, so the
/// background half only logs.
fn resolve_and_spawn(
    state: &AppState,
    change: ContentChange,
) -> Result<Json<InvalidationResponse>, StatusCode> {
    let affected = state
        .regen
        .resolve_affected(&change)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if !affected.is_empty() {
        let regen = state.regen.clone();
        let screen_ids = affected.clone();
        tokio::spawn(async move {
            let outcomes = regen.regenerate_screens(screen_ids).await;
            for outcome in outcomes {
                if !outcome.errors.is_empty() {
                    tracing::warn!(
                        "Background regeneration for screen {}: {} errors ({})",
                        outcome.screen_id,
                        outcome.errors.len(),
                        outcome.errors.join("; ")
                    );
                }
            }
        });
    }

    Ok(Json(InvalidationResponse {
        affected_screens: affected,
    }))
}

pub async fn menu_item_changed(
    State(state): State<AppState>,
    Path(item_id): Path<i32>,
) -> Result<Json<InvalidationResponse>, StatusCode> {
    use crate::schema::menu_items::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let item = menu_items
        .filter(id.eq(item_id))
        .select(MenuItem::as_select())
        .first::<MenuItem>(&mut conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    resolve_and_spawn(
        &state,
        ContentChange::MenuItem {
            menu_item_id: item.id,
            menu_id: item.menu_id,
        },
    )
}

pub async fn menu_changed(
    State(state): State<AppState>,
    Path(target_id): Path<i32>,
) -> Result<Json<InvalidationResponse>, StatusCode> {
    use crate::schema::menus::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let menu = menus
        .filter(id.eq(target_id))
        .select(Menu::as_select())
        .first::<Menu>(&mut conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    resolve_and_spawn(&state, ContentChange::Menu { menu_id: menu.id })
}

pub async fn template_changed(
    State(state): State<AppState>,
    Path(target_id): Path<i32>,
) -> Result<Json<InvalidationResponse>, StatusCode> {
    use crate::schema::templates::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let template = templates
        .filter(id.eq(target_id))
        .select(Template::as_select())
        .first::<Template>(&mut conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    resolve_and_spawn(
        &state,
        ContentChange::Template {
            template_id: template.id,
        },
    )
}
