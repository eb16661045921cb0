//! Delivery (MTO) master builder.
//!
//! This master is append-only: daily rows land in existing per-symbol files
//! only. Symbols without a master are skipped silently and counted, and the
//! master directory itself must already exist — this builder never seeds it.

use bhavmaster_core::filter;
use bhavmaster_core::normalize::normalize;
use bhavmaster_core::schema::{AssetClass, DELIVERY};
use bhavmaster_core::store::MasterStore;

use super::{append_per_entity, BuildError, CreatePolicy};
use crate::config::PipelineConfig;
use crate::discover;
use crate::raw::read_mto_dat;
use crate::report::BuildReport;

pub fn build_delivery(cfg: &PipelineConfig) -> Result<BuildReport, BuildError> {
    let mut report = BuildReport::new(AssetClass::Delivery);

    let master_dir = cfg.master_delivery_dir();
    if !master_dir.exists() {
        return Err(BuildError::Raw(format!(
            "delivery master directory does not exist: {}",
            master_dir.display()
        )));
    }

    let Some(path) = discover::latest_file(&cfg.raw_mto_dir(), "MTO_", "DAT")? else {
        return Ok(report);
    };
    let Some(trade_date) = discover::filename_date_yyyymmdd(&path) else {
        return Err(BuildError::Raw(format!(
            "cannot extract trade date from {}",
            path.display()
        )));
    };
    report.source_file = Some(path.display().to_string());

    let raw = read_mto_dat(&path, trade_date)?;
    report.rows_read = raw.height();

    let (normalized, norm) = normalize(raw, &DELIVERY)?;
    report.rows_dropped_null_key = norm.rows_dropped_null_key;

    let delivery = filter::delivery_rows(normalized)?;
    report.rows_filtered_out += delivery.rows_in - delivery.rows_kept;

    let eq_only = filter::series_eq(delivery.frame)?;
    report.rows_filtered_out += eq_only.rows_in - eq_only.rows_kept;
    if eq_only.frame.is_empty() {
        return Ok(report);
    }

    let store = MasterStore::new(master_dir);
    append_per_entity(
        &eq_only.frame,
        &DELIVERY,
        &store,
        CreatePolicy::ExistingOnly,
        &mut report,
    )?;
    Ok(report)
}
