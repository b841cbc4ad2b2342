//! Generation Coordinator — reconciles generation calls with the record store.
//!
//! Flow: snapshot active config → per record: read documents → build
//!       conversation → call client (with timeout) → transaction →
//!       merge all transactions in one store update → add usage to totals.
//!
//! Client calls run without holding either store lock; the merge takes the
//! record store lock once so no reader sees a half-applied batch.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::generation::prompts::build_request;
use crate::generation::transaction::{Transaction, DEFAULT_COST_PER_TOKEN};
use crate::llm_client::{Completion, GenerationClient, LlmError};
use crate::prompt_config::store::ConfigStore;
use crate::prompt_config::PromptConfig;
use crate::records::models::Record;
use crate::records::store::RecordStore;

pub type SharedRecords = Arc<Mutex<RecordStore>>;
pub type SharedConfigs = Arc<Mutex<ConfigStore>>;

#[derive(Debug, Clone, Copy)]
pub struct GenerationSettings {
    pub request_timeout: Duration,
    pub cost_per_token: f64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(120),
            cost_per_token: DEFAULT_COST_PER_TOKEN,
        }
    }
}

/// Why a single record's attempt failed. Never aborts the batch.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{kind} file not found: {path}")]
    MissingDocument { kind: &'static str, path: String },

    #[error("Generation service error: {0}")]
    Service(#[from] LlmError),

    #[error("Generation timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

/// Result of `generate_for`. A single record yields its transaction; a batch
/// yields a summary, the letters themselves live in the store.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum GenerateOutcome {
    Single(Transaction),
    Batch {
        response: String,
        succeeded: usize,
        failed: usize,
    },
}

#[derive(Clone)]
pub struct GenerationCoordinator {
    client: Arc<dyn GenerationClient>,
    records: SharedRecords,
    configs: SharedConfigs,
    settings: GenerationSettings,
}

impl GenerationCoordinator {
    pub fn new(
        client: Arc<dyn GenerationClient>,
        records: SharedRecords,
        configs: SharedConfigs,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            client,
            records,
            configs,
            settings,
        }
    }

    /// Records matching `indices` regardless of status, or else the records
    /// still waiting for a letter (all records when `include_generated`).
    pub async fn select_pending(
        &self,
        include_generated: bool,
        indices: Option<&[usize]>,
    ) -> Vec<Record> {
        let store = self.records.lock().await;
        store
            .records()
            .iter()
            .filter(|r| match indices {
                Some(wanted) => wanted.contains(&r.index),
                None => include_generated || !r.response_generated,
            })
            .cloned()
            .collect()
    }

    /// Generates one letter per record, merges every outcome into the store
    /// in a single update and adds the batch usage to the running totals.
    ///
    /// Per-record failures become failed transactions. Only persistence
    /// failures of either store are returned as errors, after both updates
    /// were attempted.
    pub async fn generate_for(&self, records: Vec<Record>) -> Result<GenerateOutcome, AppError> {
        if records.is_empty() {
            return Err(AppError::Validation(
                "No records selected for generation".to_string(),
            ));
        }

        let config = self.configs.lock().await.active().clone();
        info!(
            "Generating {} cover letters with config '{}'",
            records.len(),
            config.name
        );

        let mut transactions = Vec::with_capacity(records.len());
        for record in &records {
            transactions.push(self.attempt(record, &config).await);
        }

        let updates = transactions.iter().map(Transaction::to_update).collect();
        let merged = self.records.lock().await.update_entries(updates);

        let tokens: u64 = transactions.iter().map(Transaction::tokens).sum();
        let cost = tokens as f64 * self.settings.cost_per_token;
        debug!("tokens in transaction: {tokens}, cost of transaction: {cost:.6}");
        let usage = if tokens > 0 {
            self.configs.lock().await.record_usage(tokens, cost).map(Some)
        } else {
            Ok(None)
        };

        let report = merged?;
        for rejected in &report.rejected {
            warn!(
                "Generation result for index {} was not stored: {}",
                rejected.index, rejected.error
            );
        }
        if let Some(totals) = usage? {
            info!(
                "Running totals: {} tokens, ${:.4}",
                totals.total_tokens, totals.current_cost
            );
        }

        let succeeded = transactions.iter().filter(|t| t.is_success()).count();
        let failed = transactions.len() - succeeded;
        info!("Generation finished: {succeeded} succeeded, {failed} failed");

        if transactions.len() == 1 {
            if let Some(single) = transactions.pop() {
                return Ok(GenerateOutcome::Single(single));
            }
        }

        Ok(GenerateOutcome::Batch {
            response: "Successfully created the cover letters".to_string(),
            succeeded,
            failed,
        })
    }

    /// One attempt for one record: Pending → RequestSent → Succeeded | Failed.
    async fn attempt(&self, record: &Record, config: &PromptConfig) -> Transaction {
        debug!(
            "Starting query for company: {}, position: {}",
            record.company, record.job_title
        );

        match self.request_letter(record, config).await {
            Ok(completion) => {
                info!(
                    "Received letter for '{}' ({} tokens)",
                    record.company, completion.total_tokens
                );
                Transaction::succeeded(record, completion, self.settings.cost_per_token)
            }
            Err(e) => {
                warn!("Generation failed for '{}': {e}", record.company);
                Transaction::failed(record, e.to_string())
            }
        }
    }

    async fn request_letter(
        &self,
        record: &Record,
        config: &PromptConfig,
    ) -> Result<Completion, GenerationError> {
        let personal_info = read_document("Personal info", &config.pinfo).await?;
        let template = read_document("Letter template", &config.template).await?;
        let request = build_request(config, &personal_info, &template, record);

        let timeout = self.settings.request_timeout;
        match tokio::time::timeout(timeout, self.client.complete(&request)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(GenerationError::Timeout(timeout)),
        }
    }
}

async fn read_document(kind: &'static str, path: &str) -> Result<String, GenerationError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|_| GenerationError::MissingDocument {
            kind,
            path: path.to_string(),
        })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
