use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;
use crate::records::models::Record;
use crate::records::payload::EntryCandidate;
use crate::records::store::{AddOutcome, InsertReport};
use crate::state::AppState;

/// Either a path / inline JSON string, or the entries themselves.
#[derive(Debug, Deserialize)]
pub struct AddEntriesRequest {
    pub payload: Option<String>,
    pub entries: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct RecordListResponse {
    pub count: usize,
    pub records: Vec<Record>,
}

/// GET /api/v1/records
pub async fn handle_list_records(State(state): State<AppState>) -> Json<RecordListResponse> {
    let store = state.records.lock().await;
    Json(RecordListResponse {
        count: store.len(),
        records: store.records().to_vec(),
    })
}

/// POST /api/v1/records
///
/// Validates and inserts a batch of new job entries. Duplicates and index
/// collisions are skipped and listed in the report, not treated as errors.
pub async fn handle_add_entries(
    State(state): State<AppState>,
    Json(req): Json<AddEntriesRequest>,
) -> Result<Json<InsertReport>, AppError> {
    let candidate = match (req.payload, req.entries) {
        (Some(payload), None) => EntryCandidate::Text(payload),
        (None, Some(entries)) => EntryCandidate::Batch(entries),
        _ => {
            return Err(AppError::Validation(
                "Provide exactly one of 'payload' or 'entries'".to_string(),
            ))
        }
    };

    let outcome = state.records.lock().await.add_entries(candidate)?;
    match outcome {
        AddOutcome::Inserted(report) => Ok(Json(report)),
        AddOutcome::Rejected(report) => Err(AppError::Validation(report.message)),
        AddOutcome::Unresolved { reason } => Err(AppError::Validation(reason)),
    }
}
