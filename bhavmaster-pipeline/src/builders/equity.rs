//! Equity bhavcopy master builder: one master CSV per symbol, EQ series only.

use bhavmaster_core::filter;
use bhavmaster_core::normalize::normalize;
use bhavmaster_core::schema::{AssetClass, EQUITY};
use bhavmaster_core::store::MasterStore;

use super::{append_per_entity, BuildError, CreatePolicy};
use crate::config::PipelineConfig;
use crate::discover;
use crate::raw::read_csv_str;
use crate::report::BuildReport;

pub fn build_equity(cfg: &PipelineConfig) -> Result<BuildReport, BuildError> {
    let mut report = BuildReport::new(AssetClass::Equity);

    let Some(path) = discover::latest_file(&cfg.raw_equity_dir(), "BhavCopy_NSE_CM", "csv")?
    else {
        return Ok(report);
    };
    report.source_file = Some(path.display().to_string());

    let raw = read_csv_str(&path)?;
    report.rows_read = raw.height();

    let (normalized, norm) = normalize(raw, &EQUITY)?;
    report.rows_dropped_null_key = norm.rows_dropped_null_key;

    let filtered = filter::series_eq(normalized)?;
    report.rows_filtered_out = filtered.rows_in - filtered.rows_kept;
    if filtered.frame.is_empty() {
        return Ok(report);
    }

    let store = MasterStore::new(cfg.master_equity_dir());
    append_per_entity(
        &filtered.frame,
        &EQUITY,
        &store,
        CreatePolicy::OnFirstSight,
        &mut report,
    )?;
    Ok(report)
}
