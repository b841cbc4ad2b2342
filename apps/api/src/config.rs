use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Every variable has a default; a malformed value fails startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub records_path: PathBuf,
    pub prompt_config_path: PathBuf,
    pub prompt_config_name: Option<String>,
    pub schema_path: Option<PathBuf>,
    /// Overrides the credential stored in the prompt config document.
    pub openai_api_key: Option<String>,
    /// Alternative OpenAI-compatible chat-completions URL.
    pub openai_endpoint: Option<String>,
    pub generation_timeout_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Config {
            records_path: var("RECORDS_PATH")
                .unwrap_or_else(|| "./job_data.json".to_string())
                .into(),
            prompt_config_path: var("PROMPT_CONFIG_PATH")
                .unwrap_or_else(|| "./config.json".to_string())
                .into(),
            prompt_config_name: Some(
                var("PROMPT_CONFIG_NAME").unwrap_or_else(|| "default".to_string()),
            ),
            schema_path: var("SCHEMA_PATH").map(PathBuf::from),
            openai_api_key: var("OPENAI_API_KEY"),
            openai_endpoint: var("OPENAI_ENDPOINT"),
            generation_timeout_secs: var("GENERATION_TIMEOUT_SECS")
                .unwrap_or_else(|| "120".to_string())
                .parse::<u64>()
                .context("GENERATION_TIMEOUT_SECS must be a whole number of seconds")?,
            port: var("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_map(&[]).unwrap();
        assert_eq!(config.records_path, PathBuf::from("./job_data.json"));
        assert_eq!(config.prompt_config_name.as_deref(), Some("default"));
        assert_eq!(config.generation_timeout_secs, 120);
        assert_eq!(config.port, 8080);
        assert!(config.schema_path.is_none());
        assert!(config.openai_api_key.is_none());
        assert!(config.openai_endpoint.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = from_map(&[
            ("RECORDS_PATH", "/data/jobs.json"),
            ("PROMPT_CONFIG_NAME", "formal"),
            ("GENERATION_TIMEOUT_SECS", "30"),
            ("OPENAI_API_KEY", "sk-env"),
        ])
        .unwrap();
        assert_eq!(config.records_path, PathBuf::from("/data/jobs.json"));
        assert_eq!(config.prompt_config_name.as_deref(), Some("formal"));
        assert_eq!(config.generation_timeout_secs, 30);
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-env"));
    }

    #[test]
    fn test_bad_port_fails() {
        assert!(from_map(&[("PORT", "eighty")]).is_err());
    }
}
