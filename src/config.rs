use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{PadiError, Result};

/// Dashboard defaults. Every field is optional in the TOML file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Source document.
    pub data_path: PathBuf,
    /// Forecast horizon.
    pub target_year: i32,
    /// Rows shown by the decline view.
    pub decline_top_n: usize,
    /// Rows shown by the ranking view; 0 shows all.
    pub ranking_limit: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data_padi_final.json"),
            target_year: 2025,
            decline_top_n: 5,
            ranking_limit: 20,
        }
    }
}

impl DashboardConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| PadiError::InvalidParameter(format!("config: {e}")))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
