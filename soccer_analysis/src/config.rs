//! Run configuration for the demo entry point.
//!
//! Resolution order: the file named by `SOCCER_CONFIG`, then `<project root>/config.json`,
//! then the built-in defaults. Missing keys in a file fall back to the defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::helper_functions::project_root;
use crate::models::polars_err;

pub const CONFIG_ENV: &str = "SOCCER_CONFIG";

const MATCHES_URL: &str =
    "https://raw.githubusercontent.com/VGiannac/soccer_analysis/main/spi_matches_latest.csv";
const RANKINGS_URL: &str =
    "https://raw.githubusercontent.com/VGiannac/soccer_analysis/main/spi_global_rankings.csv";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Match-level table (`spi1`, `spi2`, `prob1`, ... `score2`); path or URL.
    pub matches_source: String,
    /// Team rankings table (`rank`, `prev_rank`, `name`, `league`, `spi`, ...); path or URL.
    pub rankings_source: String,
    pub chart_dir: PathBuf,
    pub test_size: f64,
    pub random_state: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            matches_source: MATCHES_URL.to_string(),
            rankings_source: RANKINGS_URL.to_string(),
            chart_dir: PathBuf::from("./charts"),
            test_size: 0.2,
            random_state: 42,
        }
    }
}

impl AppConfig {
    pub fn load() -> PolarsResult<Self> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }
        let default_path = project_root().join("config.json");
        if default_path.exists() {
            return Self::from_file(&default_path);
        }
        info!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> PolarsResult<Self> {
        info!("Reading configuration from {}", path.display());
        let raw = fs::read_to_string(path).map_err(|e| polars_err(Box::new(e)))?;
        serde_json::from_str(&raw).map_err(|e| polars_err(Box::new(e)))
    }
}
