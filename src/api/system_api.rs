use crate::AppState;
use axum::{extract::State, Json};

#[derive(serde::Serialize)]
pub struct SystemCapabilities {
    pub capture_backends: Vec<&'static str>,
    pub storage_configured: bool,
}

pub async fn get_system_capabilities(State(state): State<AppState>) -> Json<SystemCapabilities> {
    Json(SystemCapabilities {
        capture_backends: state.regen.capture_backends(),
        storage_configured: state.regen.storage_configured(),
    })
}
