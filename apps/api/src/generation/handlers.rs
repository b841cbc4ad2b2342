//! Axum route handlers for the Generation API.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::generation::coordinator::GenerateOutcome;
use crate::records::models::Record;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    #[serde(default)]
    pub include_generated: bool,
    /// Comma-separated record indices, e.g. `1,2,5`.
    pub indices: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PendingResponse {
    pub count: usize,
    pub records: Vec<Record>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub indices: Option<Vec<usize>>,
    #[serde(default)]
    pub include_generated: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/records/pending
///
/// Lists the records a generate call with the same selection would target.
pub async fn handle_list_pending(
    State(state): State<AppState>,
    Query(params): Query<PendingQuery>,
) -> Result<Json<PendingResponse>, AppError> {
    let indices = params.indices.as_deref().map(parse_indices).transpose()?;
    let records = state
        .coordinator
        .select_pending(params.include_generated, indices.as_deref())
        .await;

    if records.is_empty() {
        return Err(no_matching_records());
    }
    Ok(Json(PendingResponse {
        count: records.len(),
        records,
    }))
}

/// POST /api/v1/letters/generate
///
/// Generates a letter for every selected record. One record returns its
/// transaction; several return a batch summary.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateOutcome>, AppError> {
    let records = state
        .coordinator
        .select_pending(request.include_generated, request.indices.as_deref())
        .await;

    if records.is_empty() {
        return Err(no_matching_records());
    }

    let outcome = state.coordinator.generate_for(records).await?;
    Ok(Json(outcome))
}

fn no_matching_records() -> AppError {
    AppError::NotFound("No matching records found".to_string())
}

fn parse_indices(raw: &str) -> Result<Vec<usize>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<usize>()
                .map_err(|_| AppError::Validation(format!("Invalid record index '{part}'")))
        })
        .collect()
}
