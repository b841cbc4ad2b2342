//! Record Store — the in-memory source of truth for job application records,
//! persisted to a flat JSON file after every mutation.
//!
//! Flow on ingest: resolve payload → schema validate → default-fill →
//!                 dedup by identity key → assign indices → persist.
//! Flow on merge:  skip failed generations → locate by index →
//!                 apply per-field merge policy → recompute totals → persist.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::db::{read_json, write_json_atomic};
use crate::records::error::StoreError;
use crate::records::models::{Record, RecordUpdate};
use crate::records::payload::{resolve_candidate, EntryCandidate};
use crate::records::schema::{MergePolicy, Schema, ValidationReport};

// ────────────────────────────────────────────────────────────────────────────
// Reports
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SaveAck {
    pub message: String,
    pub record_count: usize,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InsertReport {
    /// Indices assigned to the accepted entries, in batch order.
    pub inserted: Vec<usize>,
    /// Companies dropped because their identity key already exists.
    pub duplicates: Vec<String>,
    /// Companies dropped because their computed index was already taken.
    pub collisions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AddOutcome {
    Inserted(InsertReport),
    Rejected(ValidationReport),
    Unresolved { reason: String },
}

#[derive(Debug)]
pub struct RejectedUpdate {
    pub index: usize,
    pub error: StoreError,
}

#[derive(Debug, Default)]
pub struct UpdateReport {
    pub applied: Vec<usize>,
    pub skipped_failed: Vec<usize>,
    pub rejected: Vec<RejectedUpdate>,
}

// ────────────────────────────────────────────────────────────────────────────
// Store
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    schema: Schema,
    records: Vec<Record>,
}

impl RecordStore {
    /// Loads the store from `path`, sorted by ascending index.
    /// A missing file is a fresh, empty store. A file holding the same index
    /// twice is refused.
    pub fn load(path: impl Into<PathBuf>, schema: Schema) -> Result<Self, StoreError> {
        let path = path.into();

        let mut records: Vec<Record> = match read_json(&path) {
            Ok(Some(records)) => {
                info!("Loaded records from {}", path.display());
                records
            }
            Ok(None) => {
                info!("No record store at {}, starting empty", path.display());
                Vec::new()
            }
            Err(source) => return Err(load_error(&path, source)),
        };
        records.sort_by_key(|r| r.index);

        if let Some(pair) = records.windows(2).find(|pair| pair[0].index == pair[1].index) {
            error!(
                "Record store {} holds index {} more than once",
                path.display(),
                pair[0].index
            );
            return Err(StoreError::Validation(format!(
                "Duplicate index {} in {}",
                pair[0].index,
                path.display()
            )));
        }

        Ok(Self {
            path,
            schema,
            records,
        })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.iter().find(|r| r.index == index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Resolves, validates and inserts a candidate batch.
    ///
    /// Unresolvable payloads and schema failures are reported in the outcome
    /// and leave the store untouched. Only a failed write is an `Err`.
    pub fn add_entries(
        &mut self,
        candidate: impl Into<EntryCandidate>,
    ) -> Result<AddOutcome, StoreError> {
        let batch = match resolve_candidate(candidate.into()) {
            Ok(batch) => batch,
            Err(reason) => {
                warn!("Dropping entry payload: {reason}");
                return Ok(AddOutcome::Unresolved { reason });
            }
        };

        let report = self.schema.validate(&batch);
        if !report.valid {
            warn!("Rejected entry batch: {}", report.message);
            return Ok(AddOutcome::Rejected(report));
        }

        let items = match batch {
            Value::Array(items) => items,
            other => vec![other],
        };

        let mut entries = Vec::with_capacity(items.len());
        for item in items {
            let Value::Object(mut map) = item else {
                continue;
            };
            self.schema.fill_defaults(&mut map);
            let shown = Value::Object(map.clone());
            match serde_json::from_value::<Record>(Value::Object(map)) {
                Ok(record) => entries.push(record),
                Err(e) => {
                    let report =
                        ValidationReport::fail(format!("Item does not fit a record ({e}): {shown}"));
                    return Ok(AddOutcome::Rejected(report));
                }
            }
        }

        Ok(AddOutcome::Inserted(self.insert_entries(entries)?))
    }

    /// Drops duplicates, assigns the next free indices and persists.
    ///
    /// Indices continue from the current store length. An entry whose
    /// computed index is already present is skipped, never overwritten.
    pub fn insert_entries(&mut self, entries: Vec<Record>) -> Result<InsertReport, StoreError> {
        let mut report = InsertReport::default();
        let mut known: HashSet<String> = self.records.iter().map(Record::identity_key).collect();
        let taken: HashSet<usize> = self.records.iter().map(|r| r.index).collect();

        let fresh: Vec<Record> = entries
            .into_iter()
            .filter(|entry| {
                if known.insert(entry.identity_key()) {
                    true
                } else {
                    warn!("Skipping duplicate company '{}'", entry.company.trim());
                    report.duplicates.push(entry.company.clone());
                    false
                }
            })
            .collect();

        let start = self.records.len();
        debug!("New entry range {start}..{}", start + fresh.len());

        for (offset, mut entry) in fresh.into_iter().enumerate() {
            let index = start + offset;
            if taken.contains(&index) {
                warn!(
                    "Skipping '{}': index {index} already exists in the store",
                    entry.company
                );
                report.collisions.push(entry.company);
                continue;
            }
            entry.index = index;
            entry.recompute_totals();
            report.inserted.push(index);
            self.records.push(entry);
        }

        let ack = self.save("add")?;
        info!(
            "Inserted {} entries ({} duplicates): {}",
            report.inserted.len(),
            report.duplicates.len(),
            ack.message
        );
        Ok(report)
    }

    /// Merges a batch of generation outcomes into the store and persists once.
    ///
    /// Failed generations are skipped. An item that references a missing
    /// index, names an unknown field or does not fit the record type is
    /// rejected on its own; the rest of the batch still applies.
    pub fn update_entries(&mut self, updates: Vec<RecordUpdate>) -> Result<UpdateReport, StoreError> {
        let mut report = UpdateReport::default();

        for update in updates {
            if update.is_failed_generation() {
                debug!("Skipping failed generation for index {}", update.index);
                report.skipped_failed.push(update.index);
                continue;
            }

            match self.apply_update(&update) {
                Ok(()) => {
                    debug!("Merged update into index {}", update.index);
                    report.applied.push(update.index);
                }
                Err(error) => {
                    warn!("Rejected update for index {}: {error}", update.index);
                    report.rejected.push(RejectedUpdate {
                        index: update.index,
                        error,
                    });
                }
            }
        }

        let ack = self.save("update")?;
        info!(
            "Applied {} updates, skipped {} failed, rejected {}: {}",
            report.applied.len(),
            report.skipped_failed.len(),
            report.rejected.len(),
            ack.message
        );
        Ok(report)
    }

    /// Writes the whole store to the backing file.
    pub fn save(&self, reason: &str) -> Result<SaveAck, StoreError> {
        match write_json_atomic(&self.path, &self.records) {
            Ok(()) => Ok(SaveAck {
                message: format!("{reason} was successful"),
                record_count: self.records.len(),
                saved_at: Utc::now(),
            }),
            Err(source) => {
                error!(
                    "Failed to persist record store during {reason} to {}: {source}",
                    self.path.display()
                );
                Err(StoreError::Persistence {
                    path: self.path.clone(),
                    source,
                })
            }
        }
    }

    /// Applies one update to a copy of the target record and swaps it in
    /// only when every field merged cleanly.
    fn apply_update(&mut self, update: &RecordUpdate) -> Result<(), StoreError> {
        let position = self
            .records
            .iter()
            .position(|r| r.index == update.index)
            .ok_or(StoreError::NotFound {
                index: update.index,
            })?;

        let mut doc = match serde_json::to_value(&self.records[position])? {
            Value::Object(map) => map,
            other => {
                return Err(StoreError::Validation(format!(
                    "Record {} did not serialize to a mapping: {other}",
                    update.index
                )))
            }
        };

        for (field, value) in &update.fields {
            let policy = self.schema.merge_policy(field).ok_or_else(|| {
                StoreError::Validation(format!(
                    "Unknown field '{field}' in update for index {}",
                    update.index
                ))
            })?;

            match policy {
                MergePolicy::Append => match doc.get_mut(field) {
                    Some(Value::Array(history)) => history.push(value.clone()),
                    _ => {
                        return Err(StoreError::Validation(format!(
                            "Field '{field}' of record {} is not a list",
                            update.index
                        )))
                    }
                },
                MergePolicy::Overwrite => {
                    doc.insert(field.clone(), value.clone());
                }
                MergePolicy::Immutable | MergePolicy::Derived => {
                    debug!("Ignoring {policy:?} field '{field}' in update");
                }
            }
        }

        let mut record: Record = serde_json::from_value(Value::Object(doc)).map_err(|e| {
            StoreError::Validation(format!(
                "Update for index {} does not fit the record: {e}",
                update.index
            ))
        })?;
        record.recompute_totals();
        self.records[position] = record;
        Ok(())
    }
}

/// Splits a `read_json` failure back into decode and I/O errors.
fn load_error(path: &Path, source: io::Error) -> StoreError {
    let decode = source
        .get_ref()
        .is_some_and(|inner| inner.is::<serde_json::Error>());
    if !decode {
        return StoreError::Persistence {
            path: path.to_path_buf(),
            source,
        };
    }

    match source.into_inner().map(|inner| inner.downcast::<serde_json::Error>()) {
        Some(Ok(parse)) => StoreError::Serialization(*parse),
        Some(Err(other)) => StoreError::Persistence {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidData, other),
        },
        None => StoreError::Persistence {
            path: path.to_path_buf(),
            source: io::Error::from(io::ErrorKind::InvalidData),
        },
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
