//! Options master builder: OPTSTK and OPTIDX segments, one master CSV per
//! symbol under each segment root. Calls and puts live in the same master.

use bhavmaster_core::filter::{self, Segment};
use bhavmaster_core::normalize::normalize;
use bhavmaster_core::schema::{AssetClass, OPTIONS};
use bhavmaster_core::store::MasterStore;

use super::{append_per_entity, read_latest_fo, BuildError, CreatePolicy};
use crate::config::PipelineConfig;
use crate::report::BuildReport;

pub fn build_options(cfg: &PipelineConfig) -> Result<BuildReport, BuildError> {
    let mut report = BuildReport::new(AssetClass::Options);

    let Some((path, raw)) = read_latest_fo(cfg, "op")? else {
        return Ok(report);
    };
    report.source_file = Some(path.display().to_string());
    report.rows_read = raw.height();

    // Any non-option rows in the feed carry no strike or option type and
    // fall out here as null-key rows.
    let (normalized, norm) = normalize(raw, &OPTIONS)?;
    report.rows_dropped_null_key = norm.rows_dropped_null_key;

    let split = filter::options(normalized)?;
    report.rows_filtered_out = split.rows_in - split.rows_kept;
    if split.rows_kept == 0 {
        return Ok(report);
    }

    for (segment, frame) in [(Segment::Stock, split.stock), (Segment::Index, split.index)] {
        if frame.is_empty() {
            continue;
        }
        let store = MasterStore::new(cfg.master_options_dir(segment));
        append_per_entity(&frame, &OPTIONS, &store, CreatePolicy::OnFirstSight, &mut report)?;
    }
    Ok(report)
}
