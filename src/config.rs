//! Pipeline configuration.
//!
//! One immutable [`Config`] value is built up front and passed by reference
//! into every stage. Missing keys in a config file fall back to defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub limits: Limits,
    pub output: OutputLayout,
}

impl Config {
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }
}

/// Size limits enforced by the structural validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_input_bytes: usize,
    pub max_tables: usize,
    pub max_columns_per_table: usize,
    pub max_relationships_per_table: usize,
    pub max_name_length: usize,
    /// Tables wider than this get a normalization warning.
    pub wide_table_columns: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_input_bytes: 10 * 1024 * 1024,
            max_tables: 50,
            max_columns_per_table: 100,
            max_relationships_per_table: 50,
            max_name_length: 1000,
            wide_table_columns: 20,
        }
    }
}

/// Where generated artifacts live, relative to the output directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputLayout {
    pub output_directory: String,
    pub models_directory: String,
    pub model_extension: String,
    pub index_file: String,
    pub mixins_file: String,
    pub connection_path: String,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            output_directory: "./generated".to_string(),
            models_directory: "app/models".to_string(),
            model_extension: "py".to_string(),
            index_file: "__init__.py".to_string(),
            mixins_file: "mixins.py".to_string(),
            connection_path: "app/core/database.py".to_string(),
        }
    }
}

impl OutputLayout {
    pub fn model_path(&self, table_name: &str) -> String {
        format!(
            "{}/{}.{}",
            self.models_directory, table_name, self.model_extension
        )
    }

    pub fn index_path(&self) -> String {
        format!("{}/{}", self.models_directory, self.index_file)
    }

    pub fn mixins_path(&self) -> String {
        format!("{}/{}", self.models_directory, self.mixins_file)
    }

    /// Import path of the module holding the declarative base.
    pub fn base_module(&self) -> String {
        module_path(&self.connection_path)
    }

    pub fn mixins_module(&self) -> String {
        module_path(&self.mixins_path())
    }

    pub fn model_module(&self, table_name: &str) -> String {
        module_path(&self.model_path(table_name))
    }
}

/// `app/core/database.py` -> `app.core.database`
fn module_path(file_path: &str) -> String {
    let trimmed = file_path.trim_start_matches("./");
    let stem = match trimmed.rsplit_once('.') {
        Some((stem, ext)) if !ext.contains('/') => stem,
        _ => trimmed,
    };
    stem.replace('/', ".")
}
