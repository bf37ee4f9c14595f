use crate::models::Screen;
use crate::services::regen_service::RegenOutcome;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use diesel::prelude::*;

pub async fn list_screens(
    State(state): State<AppState>,
) -> Result<Json<Vec<Screen>>, StatusCode> {
    use crate::schema::screens::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let results = screens
        .order(name.asc())
        .select(Screen::as_select())
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(results))
}

/// Admin "regenerate now": runs the whole pipeline synchronously and reports
/// generated/deleted counts plus any per-slide messages. Expected failures
/// come back inside the outcome, not as HTTP errors.
pub async fn regenerate_screen(
    State(state): State<AppState>,
    Path(screen_id): Path<i32>,
) -> Json<RegenOutcome> {
    Json(state.regen.regenerate_screen(screen_id).await)
}
