use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Placed in `response_text` of an update to mark a failed generation attempt.
/// Updates carrying it are never merged into a record.
pub const FAILURE_SENTINEL: &str = "Request Failed";

/// One job application tracked by the store.
///
/// `index` is assigned by the store on insert and never changes.
/// The `response_*` vectors are append-only history, one entry per
/// successful generation. Fields declared by a custom schema but not
/// modelled here are carried in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    pub index: usize,
    pub company: String,
    pub job_title: String,
    pub job_description: String,
    pub additional_info: String,
    pub num_tokens: u64,
    pub response_generated: bool,
    pub response_count: usize,
    pub response_text: Vec<String>,
    pub response_model: Vec<String>,
    pub response_timestamp: Vec<i64>,
    pub response_cost: Vec<f64>,
    pub total_cost: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record {
    /// Normalized company name used to detect duplicates.
    pub fn identity_key(&self) -> String {
        identity_key(&self.company)
    }

    /// Restores `response_count` and `total_cost` from the history vectors.
    pub fn recompute_totals(&mut self) {
        self.response_count = self.response_text.len();
        self.total_cost = self.response_cost.iter().sum();
    }
}

/// Lower-cased company name with surrounding whitespace trimmed and inner
/// whitespace runs collapsed to one space.
pub fn identity_key(company: &str) -> String {
    company
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A batch item for `RecordStore::update_entries`: the target index plus the
/// fields to merge, keyed by schema field name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordUpdate {
    pub index: usize,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl RecordUpdate {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            fields: Map::new(),
        }
    }

    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    /// True when this update records a failed generation attempt.
    pub fn is_failed_generation(&self) -> bool {
        self.fields
            .get("response_text")
            .and_then(Value::as_str)
            .is_some_and(|text| text == FAILURE_SENTINEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_key_normalizes_case_and_whitespace() {
        assert_eq!(identity_key("  Acme   Corp "), "acme corp");
        assert_eq!(identity_key("ACME\tCorp"), identity_key("acme corp"));
    }

    #[test]
    fn test_recompute_totals() {
        let mut record = Record {
            response_text: vec!["a".into(), "b".into()],
            response_cost: vec![0.25, 0.5],
            ..Default::default()
        };
        record.recompute_totals();
        assert_eq!(record.response_count, 2);
        assert!((record.total_cost - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_record_loads_with_missing_fields() {
        let record: Record =
            serde_json::from_str(r#"{"index": 4, "company": "Initech"}"#).unwrap();
        assert_eq!(record.index, 4);
        assert!(record.response_text.is_empty());
        assert!(!record.response_generated);
        assert!(record.extra.is_empty());
    }

    #[test]
    fn test_unmodelled_fields_survive_round_trip() {
        let record: Record =
            serde_json::from_str(r#"{"index": 2, "company": "Hooli", "salary": "100k"}"#).unwrap();
        assert_eq!(record.extra["salary"], "100k");

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["salary"], "100k");
        assert!(value.get("extra").is_none());
    }

    #[test]
    fn test_failed_generation_detected() {
        let failed = RecordUpdate::new(0)
            .with("response_text", FAILURE_SENTINEL)
            .with("response_generated", false);
        let ok = RecordUpdate::new(0).with("response_text", "Dear hiring manager");

        assert!(failed.is_failed_generation());
        assert!(!ok.is_failed_generation());
    }

    #[test]
    fn test_update_serializes_flat() {
        let update = RecordUpdate::new(3).with("num_tokens", 12);
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value, serde_json::json!({"index": 3, "num_tokens": 12}));
    }
}
