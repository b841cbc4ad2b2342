use crate::prompt_config::PromptConfig;

/// Pluggable token-count estimate used for a config's `token_count`.
///
/// The exact tokenizer of the generation service is not reproduced here;
/// implementations only need to be monotone in text length.
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, text: &str) -> u64;
}

/// Roughly four tokens for every three whitespace-separated words.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordTokenEstimator;

impl TokenEstimator for WordTokenEstimator {
    fn estimate(&self, text: &str) -> u64 {
        let words = text.split_whitespace().count() as u64;
        (words * 4).div_ceil(3)
    }
}

/// Sums the estimate over every text field of a config.
pub fn estimate_config(estimator: &dyn TokenEstimator, config: &PromptConfig) -> u64 {
    [
        &config.name,
        &config.system_message,
        &config.instructions,
        &config.first_message,
        &config.pinfo,
        &config.template,
    ]
    .iter()
    .map(|field| estimator.estimate(field))
    .sum()
}
