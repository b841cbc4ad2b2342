use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::prompt_config::{ConfigField, PromptConfig, UsageTotals};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SetFieldRequest {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveConfigRequest {
    pub name: String,
}

/// The active config as seen by the front end. The API key is never included.
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub config: PromptConfig,
    pub available: Vec<String>,
    pub totals: UsageTotals,
}

#[derive(Debug, Serialize)]
pub struct SaveConfigResponse {
    pub message: String,
    pub config: PromptConfig,
}

/// GET /api/v1/config
pub async fn handle_get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    let store = state.configs.lock().await;
    Json(ConfigResponse {
        config: store.active().clone(),
        available: store.configs().iter().map(|c| c.name.clone()).collect(),
        totals: store.totals(),
    })
}

/// PATCH /api/v1/config/fields
///
/// Edits the working copy of the active config; nothing is written until save.
pub async fn handle_set_field(
    State(state): State<AppState>,
    Json(req): Json<SetFieldRequest>,
) -> Result<Json<PromptConfig>, AppError> {
    let field: ConfigField = req.field.parse()?;
    let mut store = state.configs.lock().await;
    store.set_field(field, &req.value)?;
    Ok(Json(store.active().clone()))
}

/// POST /api/v1/config/save
pub async fn handle_save_config(
    State(state): State<AppState>,
    Json(req): Json<SaveConfigRequest>,
) -> Result<Json<SaveConfigResponse>, AppError> {
    let config = state.configs.lock().await.save_config(&req.name)?;
    Ok(Json(SaveConfigResponse {
        message: format!("Saved config '{}'", config.name),
        config,
    }))
}
