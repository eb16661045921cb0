//! Bhavmaster pipeline — orchestration around the ETL core.
//!
//! This crate builds on `bhavmaster-core` to provide:
//! - Pipeline configuration (TOML, all fields defaulted)
//! - Latest-raw-file discovery and filename-date extraction
//! - Raw readers (all-strings CSV, the MTO `.DAT` line format)
//! - One master builder per asset class with run-report counters
//! - A fetcher for the exchange archive hosts
//! - Read-only master inspection

pub mod builders;
pub mod config;
pub mod discover;
pub mod fetch;
pub mod inspect;
pub mod raw;
pub mod report;

pub use builders::{build, BuildError, CreatePolicy, INDEX_MASTER_ENTITY};
pub use config::{ConfigError, PipelineConfig};
pub use fetch::{FetchError, FetchOutcome, Fetcher, RawSource};
pub use inspect::{master_status, MasterStatus};
pub use report::{save_report, BuildReport};
