use serde::Serialize;

use crate::llm_client::Completion;
use crate::records::models::{Record, RecordUpdate, FAILURE_SENTINEL};

/// Cost per token of the generation service in dollars (0.002 per 1k tokens).
pub const DEFAULT_COST_PER_TOKEN: f64 = 0.002 / 1000.0;

/// The terminal outcome of one generation attempt for one record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Transaction {
    Succeeded {
        index: usize,
        company: String,
        num_tokens: u64,
        model: String,
        text: String,
        created: i64,
        cost: f64,
    },
    Failed {
        index: usize,
        company: String,
        reason: String,
    },
}

impl Transaction {
    pub fn succeeded(record: &Record, completion: Completion, cost_per_token: f64) -> Self {
        Transaction::Succeeded {
            index: record.index,
            company: record.company.clone(),
            num_tokens: completion.total_tokens,
            model: completion.model,
            text: completion.text,
            created: completion.created,
            cost: completion.total_tokens as f64 * cost_per_token,
        }
    }

    pub fn failed(record: &Record, reason: impl Into<String>) -> Self {
        Transaction::Failed {
            index: record.index,
            company: record.company.clone(),
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Transaction::Succeeded { .. })
    }

    /// Tokens billed for this attempt; zero for failures.
    pub fn tokens(&self) -> u64 {
        match self {
            Transaction::Succeeded { num_tokens, .. } => *num_tokens,
            Transaction::Failed { .. } => 0,
        }
    }

    /// The store update that records this attempt in the record's history.
    pub fn to_update(&self) -> RecordUpdate {
        match self {
            Transaction::Succeeded {
                index,
                num_tokens,
                model,
                text,
                created,
                cost,
                ..
            } => RecordUpdate::new(*index)
                .with("num_tokens", *num_tokens)
                .with("response_model", model.as_str())
                .with("response_text", text.as_str())
                .with("response_timestamp", *created)
                .with("response_cost", *cost)
                .with("response_generated", true),
            Transaction::Failed { index, .. } => RecordUpdate::new(*index)
                .with("response_text", FAILURE_SENTINEL)
                .with("response_generated", false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Record {
        Record {
            index: 3,
            company: "Globex".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_cost_from_tokens() {
        let completion = Completion {
            total_tokens: 1500,
            model: "gpt-3.5-turbo".into(),
            text: "Dear Globex".into(),
            created: 1_700_000_000,
        };
        let tx = Transaction::succeeded(&record(), completion, DEFAULT_COST_PER_TOKEN);

        match tx {
            Transaction::Succeeded { cost, index, .. } => {
                assert_eq!(index, 3);
                assert!((cost - 0.003).abs() < 1e-12);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn test_failed_update_carries_sentinel() {
        let update = Transaction::failed(&record(), "timeout").to_update();
        assert!(update.is_failed_generation());
        assert_eq!(update.index, 3);
        assert!(!update.fields.contains_key("response_cost"));
    }

    #[test]
    fn test_success_update_fields() {
        let completion = Completion {
            total_tokens: 10,
            model: "m".into(),
            text: "t".into(),
            created: 5,
        };
        let update = Transaction::succeeded(&record(), completion, 1.0).to_update();
        assert!(!update.is_failed_generation());
        assert_eq!(update.fields["response_generated"], serde_json::json!(true));
        assert_eq!(update.fields["response_cost"], serde_json::json!(10.0));
    }
}
