pub mod invalidation_api;
pub mod screens_api;
pub mod system_api;

use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        // Screens
        .route("/screens", get(screens_api::list_screens))
        .route(
            "/screens/:id/regenerate",
            post(screens_api::regenerate_screen),
        )
        // Content change hooks (fired by the CRUD surface after commit)
        .route(
            "/invalidate/menu-items/:id",
            post(invalidation_api::menu_item_changed),
        )
        .route("/invalidate/menus/:id", post(invalidation_api::menu_changed))
        .route(
            "/invalidate/templates/:id",
            post(invalidation_api::template_changed),
        )
        // System
        .route(
            "/system/capabilities",
            get(system_api::get_system_capabilities),
        )
}
