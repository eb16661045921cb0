//! Per-class master builders.
//!
//! Every builder follows the same shape: discover the latest raw file,
//! read it, normalize, filter, then append per entity into the class's
//! master store, accumulating a [`BuildReport`]. A missing raw file or an
//! empty filtered batch is a successful no-op, never an error.

mod delivery;
mod equity;
mod futures;
mod index;
mod options;

pub use delivery::build_delivery;
pub use equity::build_equity;
pub use futures::build_futures;
pub use index::{build_index, INDEX_MASTER_ENTITY};
pub use options::build_options;

use polars::prelude::*;
use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;

use bhavmaster_core::error::EtlError;
use bhavmaster_core::merge::merge;
use bhavmaster_core::schema::{AssetClass, ClassSpec};
use bhavmaster_core::store::MasterStore;

use crate::config::PipelineConfig;
use crate::discover;
use crate::raw::read_csv_str;
use crate::report::BuildReport;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("data error: {0}")]
    Etl(#[from] EtlError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("raw file error: {0}")]
    Raw(String),
}

/// What to do when an incoming entity has no persisted store yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatePolicy {
    /// Create the entity's store on first sight.
    OnFirstSight,
    /// Skip the entity silently and count it (append-only masters).
    ExistingOnly,
}

/// Run the builder for one asset class.
pub fn build(class: AssetClass, cfg: &PipelineConfig) -> Result<BuildReport, BuildError> {
    match class {
        AssetClass::Equity => build_equity(cfg),
        AssetClass::Delivery => build_delivery(cfg),
        AssetClass::Futures => build_futures(cfg),
        AssetClass::Options => build_options(cfg),
        AssetClass::Index => build_index(cfg),
    }
}

/// Split a filtered batch by its entity column and merge each group into the
/// store, honoring the create policy. Entities process in sorted order.
pub(crate) fn append_per_entity(
    df: &DataFrame,
    spec: &'static ClassSpec,
    store: &MasterStore,
    policy: CreatePolicy,
    report: &mut BuildReport,
) -> Result<(), BuildError> {
    for entity in entity_values(df, spec.entity_column)? {
        let group = df
            .clone()
            .lazy()
            .filter(col(spec.entity_column).eq(lit(entity.as_str())))
            .collect()
            .map_err(EtlError::from)?;

        let existing = store.load(&entity, spec)?;
        if existing.is_none() && policy == CreatePolicy::ExistingOnly {
            report.entities_skipped += 1;
            report.rows_skipped += group.height();
            continue;
        }

        let created = existing.is_none();
        let rows = group.height();
        let merged = merge(existing, group, spec)?;
        store.save(&entity, &merged)?;

        report.rows_appended += rows;
        if created {
            report.entities_created += 1;
        } else {
            report.entities_updated += 1;
        }
    }
    Ok(())
}

fn entity_values(df: &DataFrame, column: &str) -> Result<Vec<String>, EtlError> {
    let values = df.column(column)?.str()?;
    let unique: BTreeSet<String> = values.into_iter().flatten().map(str::to_string).collect();
    Ok(unique.into_iter().collect())
}

/// Load the latest derivatives bhavcopy matching `prefix` ("fo" for futures,
/// "op" for options) with its filename trade date injected.
pub(crate) fn read_latest_fo(
    cfg: &PipelineConfig,
    prefix: &str,
) -> Result<Option<(PathBuf, DataFrame)>, BuildError> {
    let Some(path) = discover::latest_file(&cfg.raw_fo_dir(), prefix, "csv")? else {
        return Ok(None);
    };
    let Some(trade_date) = discover::filename_date_yyyymmdd(&path) else {
        return Err(BuildError::Raw(format!(
            "cannot extract trade date from {}",
            path.display()
        )));
    };

    let raw = read_csv_str(&path)?;
    // Filename date is authoritative for this feed.
    let raw = raw
        .lazy()
        .with_column(lit(trade_date).alias("TRADE_DATE"))
        .collect()
        .map_err(EtlError::from)?;
    Ok(Some((path, raw)))
}
