use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::db::{read_json, write_json_atomic};
use crate::prompt_config::tokens::{estimate_config, TokenEstimator};
use crate::prompt_config::{ConfigDocument, ConfigError, ConfigField, PromptConfig, UsageTotals};

/// Holds the config document and a working copy of the active config.
///
/// Edits through `set_field` touch only the working copy until
/// `save_config` writes it back under a name.
pub struct ConfigStore {
    path: PathBuf,
    document: ConfigDocument,
    active: PromptConfig,
    estimator: Arc<dyn TokenEstimator>,
}

impl ConfigStore {
    /// Loads the document and selects the config called `name`.
    /// An absent or unmatched name falls back to the first config.
    pub fn load(
        path: impl Into<PathBuf>,
        name: Option<&str>,
        estimator: Arc<dyn TokenEstimator>,
    ) -> Result<Self, ConfigError> {
        let path = path.into();
        let document: ConfigDocument = read_json(&path)
            .map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?
            .ok_or_else(|| ConfigError::Missing { path: path.clone() })?;

        let position = match name {
            Some(name) => document
                .configs
                .iter()
                .position(|c| c.name == name)
                .unwrap_or_else(|| {
                    warn!("No config named '{name}' found, using the first config");
                    0
                }),
            None => 0,
        };
        let active = document
            .configs
            .get(position)
            .cloned()
            .ok_or_else(|| ConfigError::Empty { path: path.clone() })?;

        info!(
            "Loaded config '{}' ({} configs in {})",
            active.name,
            document.configs.len(),
            path.display()
        );

        Ok(Self {
            path,
            document,
            active,
            estimator,
        })
    }

    pub fn active(&self) -> &PromptConfig {
        &self.active
    }

    /// The shared credential for the generation service.
    pub fn key(&self) -> &str {
        &self.document.key
    }

    pub fn configs(&self) -> &[PromptConfig] {
        &self.document.configs
    }

    pub fn totals(&self) -> UsageTotals {
        UsageTotals {
            total_tokens: self.document.total_tokens,
            current_cost: self.document.current_cost,
        }
    }

    /// Updates one field of the working config. Empty values are refused.
    pub fn set_field(&mut self, field: ConfigField, value: &str) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::EmptyValue(field.as_str().to_string()));
        }
        let value = value.to_string();
        match field {
            ConfigField::SystemMessage => self.active.system_message = value,
            ConfigField::Instructions => self.active.instructions = value,
            ConfigField::FirstMessage => self.active.first_message = value,
            ConfigField::Pinfo => self.active.pinfo = value,
            ConfigField::Template => self.active.template = value,
        }
        debug!("Updated config field {}", field.as_str());
        Ok(())
    }

    /// Stores the working config under `name`, replacing a config with the
    /// same name or appending a new one, then persists the document.
    pub fn save_config(&mut self, name: &str) -> Result<PromptConfig, ConfigError> {
        if name.trim().is_empty() {
            return Err(ConfigError::EmptyValue("name".to_string()));
        }
        info!("Saving config under the name '{name}'");

        self.active.name = name.to_string();
        self.active.pinfo = absolutize(&self.active.pinfo);
        self.active.template = absolutize(&self.active.template);
        self.active.token_count = estimate_config(self.estimator.as_ref(), &self.active);

        match self.document.configs.iter().position(|c| c.name == name) {
            Some(existing) => self.document.configs[existing] = self.active.clone(),
            None => self.document.configs.push(self.active.clone()),
        }

        self.persist()?;
        Ok(self.active.clone())
    }

    /// Adds a generation batch's usage to the running totals and persists.
    pub fn record_usage(&mut self, tokens: u64, cost: f64) -> Result<UsageTotals, ConfigError> {
        self.document.total_tokens += tokens;
        self.document.current_cost += cost;
        debug!("Recorded usage: tokens={tokens}, cost={cost:.6}");
        self.persist()?;
        Ok(self.totals())
    }

    fn persist(&self) -> Result<(), ConfigError> {
        write_json_atomic(&self.path, &self.document).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// Resolves a relative document path against the working directory.
fn absolutize(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() || Path::new(trimmed).is_absolute() {
        return trimmed.to_string();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(trimmed).to_string_lossy().into_owned(),
        Err(e) => {
            warn!("Cannot resolve working directory, keeping '{trimmed}': {e}");
            trimmed.to_string()
        }
    }
}
