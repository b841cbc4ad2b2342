// Named prompt configurations plus running usage totals, kept in one JSON
// document next to the record store.

pub mod handlers;
pub mod store;
pub mod tokens;

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config store I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config file {} does not exist", .path.display())]
    Missing { path: PathBuf },

    #[error("Config file {} declares no configs", .path.display())]
    Empty { path: PathBuf },

    #[error("Unknown config field '{0}'")]
    UnknownField(String),

    #[error("A value is required to update '{0}'")]
    EmptyValue(String),
}

/// One named bundle of prompt text and document references.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub name: String,
    pub system_message: String,
    pub instructions: String,
    pub first_message: String,
    /// Path to the personal info document.
    pub pinfo: String,
    /// Path to the letter template document.
    pub template: String,
    pub token_count: u64,
}

/// On-disk layout of the config store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigDocument {
    pub key: String,
    pub current_cost: f64,
    pub total_tokens: u64,
    pub configs: Vec<PromptConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UsageTotals {
    pub total_tokens: u64,
    pub current_cost: f64,
}

/// Fields of the active config that may be edited from the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigField {
    SystemMessage,
    Instructions,
    FirstMessage,
    Pinfo,
    Template,
}

impl ConfigField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigField::SystemMessage => "system_message",
            ConfigField::Instructions => "instructions",
            ConfigField::FirstMessage => "first_message",
            ConfigField::Pinfo => "pinfo",
            ConfigField::Template => "template",
        }
    }
}

impl FromStr for ConfigField {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system_message" => Ok(ConfigField::SystemMessage),
            "instructions" => Ok(ConfigField::Instructions),
            "first_message" => Ok(ConfigField::FirstMessage),
            "pinfo" => Ok(ConfigField::Pinfo),
            "template" => Ok(ConfigField::Template),
            other => Err(ConfigError::UnknownField(other.to_string())),
        }
    }
}
