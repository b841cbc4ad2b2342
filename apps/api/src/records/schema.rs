//! Record schema — declared field kinds, default values and merge policies.
//!
//! Validation is batch-level and short-circuits on the first failing item,
//! so callers that need every failure must validate item slices themselves.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Runtime kind a field value must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Integer,
    Number,
    Text,
    Boolean,
    List,
}

impl FieldKind {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldKind::Integer => value.is_u64() || value.is_i64(),
            FieldKind::Number => value.is_number(),
            FieldKind::Text => value.is_string(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::List => value.is_array(),
        }
    }

    /// Zero value used to fill absent fields.
    pub fn default_value(&self) -> Value {
        match self {
            FieldKind::Integer => Value::from(0u64),
            FieldKind::Number => Value::from(0.0),
            FieldKind::Text => Value::String(String::new()),
            FieldKind::Boolean => Value::Bool(false),
            FieldKind::List => Value::Array(Vec::new()),
        }
    }
}

/// How an update value is merged into an existing record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Update value is pushed onto the field's history.
    Append,
    /// Update value replaces the field.
    Overwrite,
    /// Assigned once by the store; updates never change it.
    Immutable,
    /// Recomputed from other fields after every merge.
    Derived,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub merge: MergePolicy,
}

impl FieldSpec {
    fn new(name: &str, kind: FieldKind, merge: MergePolicy) -> Self {
        Self {
            name: name.to_string(),
            kind,
            merge,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub message: String,
}

impl ValidationReport {
    pub fn fail(message: String) -> Self {
        warn!("Schema validation failed: {message}");
        Self {
            valid: false,
            message,
        }
    }
}

/// Ordered field declarations for a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// The built-in job application record schema.
    pub fn record_schema() -> Self {
        use FieldKind::*;
        use MergePolicy::*;

        Self::new(vec![
            FieldSpec::new("index", Integer, Immutable),
            FieldSpec::new("company", Text, Overwrite),
            FieldSpec::new("job_title", Text, Overwrite),
            FieldSpec::new("job_description", Text, Overwrite),
            FieldSpec::new("additional_info", Text, Overwrite),
            FieldSpec::new("num_tokens", Integer, Overwrite),
            FieldSpec::new("response_generated", Boolean, Overwrite),
            FieldSpec::new("response_count", Integer, Derived),
            FieldSpec::new("response_text", List, Append),
            FieldSpec::new("response_model", List, Append),
            FieldSpec::new("response_timestamp", List, Append),
            FieldSpec::new("response_cost", List, Append),
            FieldSpec::new("total_cost", Number, Derived),
        ])
    }

    /// Loads a schema declared as a JSON array of field specs.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema file {}", path.display()))?;
        let schema: Schema = serde_json::from_str(&raw)
            .with_context(|| format!("Schema file {} is not valid", path.display()))?;
        if schema.field("index").is_none() {
            anyhow::bail!("Schema file {} must declare an 'index' field", path.display());
        }
        Ok(schema)
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn merge_policy(&self, name: &str) -> Option<MergePolicy> {
        self.field(name).map(|f| f.merge)
    }

    /// Checks that `batch` is a sequence of mappings whose keys are all
    /// declared and whose values have the declared kind.
    pub fn validate(&self, batch: &Value) -> ValidationReport {
        let Some(items) = batch.as_array() else {
            return ValidationReport::fail(format!(
                "Entries are not a sequence of mappings: top level value is {}",
                value_kind(batch)
            ));
        };

        for item in items {
            let Some(map) = item.as_object() else {
                return ValidationReport::fail(format!(
                    "Entries are not a sequence of mappings: {item} is not a mapping"
                ));
            };

            for (key, value) in map {
                let Some(spec) = self.field(key) else {
                    return ValidationReport::fail(format!(
                        "Unknown key '{key}' not found in schema for item: {item}"
                    ));
                };
                if !spec.kind.matches(value) {
                    return ValidationReport::fail(format!(
                        "Value type error for '{key}': {value} in item: {item}"
                    ));
                }
            }
        }

        ValidationReport {
            valid: true,
            message: "Batch is valid".to_string(),
        }
    }

    /// Inserts the declared zero value for every absent field.
    pub fn fill_defaults(&self, item: &mut Map<String, Value>) {
        for spec in &self.fields {
            item.entry(spec.name.clone())
                .or_insert_with(|| spec.kind.default_value());
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
