//! Pipeline configuration.
//!
//! A single TOML file (all fields optional) controls where data lives and
//! which indices are allow-listed into the index master. The directory layout
//! under `data_root` is fixed:
//!
//! ```text
//! {data_root}/raw/equity_unzip/   extracted equity bhavcopy CSVs
//! {data_root}/raw/fo_unzip/      extracted futures+options bhavcopy CSVs
//! {data_root}/raw/mto/           delivery .DAT files
//! {data_root}/raw/indices/       index OHLC snapshot CSVs
//! {data_root}/raw/archives/      fetched zip archives (extracted externally)
//! {data_root}/master/...         per-class master stores
//! {data_root}/reports/           build report JSON artifacts
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use bhavmaster_core::filter::Segment;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file: {0}")]
    Read(String),

    #[error("parse config TOML: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root directory all raw, master, and report paths hang off.
    pub data_root: PathBuf,

    /// Index names admitted into the index master (exact match after
    /// trim/upper-case normalization).
    pub index_allowlist: Vec<String>,

    /// How many calendar days the fetcher backtracks looking for the most
    /// recently published raw file.
    pub fetch_lookback_days: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            index_allowlist: vec!["NIFTY 50".to_string()],
            fetch_lookback_days: 10,
        }
    }
}

impl PipelineConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    // ── Raw layout ──────────────────────────────────────────────────

    pub fn raw_equity_dir(&self) -> PathBuf {
        self.data_root.join("raw").join("equity_unzip")
    }

    pub fn raw_fo_dir(&self) -> PathBuf {
        self.data_root.join("raw").join("fo_unzip")
    }

    pub fn raw_mto_dir(&self) -> PathBuf {
        self.data_root.join("raw").join("mto")
    }

    pub fn raw_index_dir(&self) -> PathBuf {
        self.data_root.join("raw").join("indices")
    }

    pub fn raw_archive_dir(&self) -> PathBuf {
        self.data_root.join("raw").join("archives")
    }

    // ── Master layout ───────────────────────────────────────────────

    pub fn master_equity_dir(&self) -> PathBuf {
        self.data_root.join("master").join("equity")
    }

    pub fn master_delivery_dir(&self) -> PathBuf {
        self.data_root.join("master").join("delivery")
    }

    pub fn master_futures_dir(&self, segment: Segment) -> PathBuf {
        let sub = match segment {
            Segment::Stock => "FUTSTK",
            Segment::Index => "FUTIDX",
        };
        self.data_root.join("master").join("futures").join(sub)
    }

    pub fn master_options_dir(&self, segment: Segment) -> PathBuf {
        let sub = match segment {
            Segment::Stock => "OPTSTK",
            Segment::Index => "OPTIDX",
        };
        self.data_root.join("master").join("options").join(sub)
    }

    pub fn master_index_dir(&self) -> PathBuf {
        self.data_root.join("master").join("indices")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.data_root.join("reports")
    }
}
