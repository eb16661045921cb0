//! Index OHLC master builder.
//!
//! Unlike the per-symbol masters, the index master is one global file: every
//! allow-listed index lands in the same dataset, deduplicated on
//! (TRADE_DATE, SYMBOL) but sorted by date alone.

use polars::prelude::*;

use bhavmaster_core::error::EtlError;
use bhavmaster_core::filter;
use bhavmaster_core::merge::merge;
use bhavmaster_core::normalize::normalize;
use bhavmaster_core::schema::{AssetClass, INDEX_DAILY, INDEX_MASTER};
use bhavmaster_core::store::MasterStore;

use super::BuildError;
use crate::config::PipelineConfig;
use crate::discover;
use crate::raw::read_csv_str;
use crate::report::BuildReport;

/// The single global entity the index master lives under.
pub const INDEX_MASTER_ENTITY: &str = "indices_ohlc";

pub fn build_index(cfg: &PipelineConfig) -> Result<BuildReport, BuildError> {
    let mut report = BuildReport::new(AssetClass::Index);

    let Some(path) = discover::latest_file(&cfg.raw_index_dir(), "indices_ohlc", "csv")? else {
        return Ok(report);
    };
    report.source_file = Some(path.display().to_string());

    let raw = read_csv_str(&path)?;
    report.rows_read = raw.height();

    let (normalized, norm) = normalize(raw, &INDEX_DAILY)?;
    report.rows_dropped_null_key = norm.rows_dropped_null_key;

    let filtered = filter::index_allowlist(normalized, &cfg.index_allowlist)?;
    report.rows_filtered_out = filtered.rows_in - filtered.rows_kept;
    if filtered.frame.is_empty() {
        return Ok(report);
    }

    let mapped = filtered
        .frame
        .lazy()
        .select([
            col("TRADE_DATE"),
            col("INDEX_NAME").alias("SYMBOL"),
            col("OPEN"),
            col("HIGH"),
            col("LOW"),
            col("CLOSE"),
        ])
        .collect()
        .map_err(EtlError::from)?;

    let store = MasterStore::new(cfg.master_index_dir());
    let existing = store.load(INDEX_MASTER_ENTITY, &INDEX_MASTER)?;
    let created = existing.is_none();
    let rows = mapped.height();

    let merged = merge(existing, mapped, &INDEX_MASTER)?;
    store.save(INDEX_MASTER_ENTITY, &merged)?;

    report.rows_appended = rows;
    if created {
        report.entities_created = 1;
    } else {
        report.entities_updated = 1;
    }
    Ok(report)
}
