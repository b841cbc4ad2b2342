use std::path::Path;

use serde_json::Value;
use tracing::{debug, info};

/// Raw input to `RecordStore::add_entries`.
#[derive(Debug, Clone)]
pub enum EntryCandidate {
    /// Either a path to a JSON document or inline JSON text.
    Text(String),
    /// An already decoded batch.
    Batch(Value),
}

impl From<Value> for EntryCandidate {
    fn from(value: Value) -> Self {
        EntryCandidate::Batch(value)
    }
}

impl From<String> for EntryCandidate {
    fn from(text: String) -> Self {
        EntryCandidate::Text(text)
    }
}

impl From<&str> for EntryCandidate {
    fn from(text: &str) -> Self {
        EntryCandidate::Text(text.to_string())
    }
}

/// Resolves a candidate into JSON. A text candidate naming an existing file is
/// read from disk; anything else is parsed as inline JSON.
///
/// Returns the reason on failure so the caller can log and drop it.
pub fn resolve_candidate(candidate: EntryCandidate) -> Result<Value, String> {
    let text = match candidate {
        EntryCandidate::Batch(value) => return Ok(value),
        EntryCandidate::Text(text) => text,
    };

    let trimmed = text.trim();
    let path = Path::new(trimmed);
    if !trimmed.is_empty() && path.is_file() {
        info!("Reading entries from {}", path.display());
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
        return serde_json::from_str(&raw)
            .map_err(|e| format!("File {} is not valid JSON: {e}", path.display()));
    }

    debug!("Entry payload is not a file path, parsing as inline JSON");
    serde_json::from_str(trimmed)
        .map_err(|e| format!("Entry payload is neither a readable path nor valid JSON: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolves_inline_json() {
        let value = resolve_candidate(r#"[{"company": "Acme"}]"#.into()).unwrap();
        assert_eq!(value, json!([{"company": "Acme"}]));
    }

    #[test]
    fn test_resolves_file_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        std::fs::write(&path, r#"[{"company": "Globex"}]"#).unwrap();

        let value = resolve_candidate(path.to_string_lossy().into_owned().into()).unwrap();
        assert_eq!(value, json!([{"company": "Globex"}]));
    }

    #[test]
    fn test_rejects_garbage() {
        let err = resolve_candidate("not json, not a path".into()).unwrap_err();
        assert!(err.contains("neither a readable path nor valid JSON"));
    }

    #[test]
    fn test_rejects_file_with_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{oops").unwrap();

        let err = resolve_candidate(path.to_string_lossy().into_owned().into()).unwrap_err();
        assert!(err.contains("not valid JSON"));
    }

    #[test]
    fn test_batch_passes_through() {
        let value = resolve_candidate(json!({"company": "Acme"}).into()).unwrap();
        assert_eq!(value, json!({"company": "Acme"}));
    }
}
