//! Read-only master inspection.
//!
//! Walks every master root and reports per-entity row counts and trade-date
//! ranges. Never mutates anything.

use polars::prelude::*;
use std::path::PathBuf;

use bhavmaster_core::error::EtlError;
use bhavmaster_core::filter::Segment;
use bhavmaster_core::schema::{ClassSpec, DELIVERY, EQUITY, FUTURES, INDEX_MASTER, OPTIONS};
use bhavmaster_core::store::MasterStore;

use crate::config::PipelineConfig;

/// One entity's vitals within a master area.
#[derive(Debug, Clone)]
pub struct MasterStatus {
    pub area: &'static str,
    pub entity: String,
    pub rows: usize,
    pub first_date: Option<i64>,
    pub last_date: Option<i64>,
}

/// Collect the status of every entity across all master areas.
pub fn master_status(cfg: &PipelineConfig) -> Result<Vec<MasterStatus>, EtlError> {
    let areas: Vec<(&'static str, PathBuf, &'static ClassSpec)> = vec![
        ("equity", cfg.master_equity_dir(), &EQUITY),
        ("delivery", cfg.master_delivery_dir(), &DELIVERY),
        ("futures/FUTSTK", cfg.master_futures_dir(Segment::Stock), &FUTURES),
        ("futures/FUTIDX", cfg.master_futures_dir(Segment::Index), &FUTURES),
        ("options/OPTSTK", cfg.master_options_dir(Segment::Stock), &OPTIONS),
        ("options/OPTIDX", cfg.master_options_dir(Segment::Index), &OPTIONS),
        ("indices", cfg.master_index_dir(), &INDEX_MASTER),
    ];

    let mut out = Vec::new();
    for (area, dir, spec) in areas {
        let store = MasterStore::new(dir);
        for entity in store.entities()? {
            let Some(df) = store.load(&entity, spec)? else {
                continue;
            };
            let dates = df.column(spec.temporal_key)?.i64()?;
            out.push(MasterStatus {
                area,
                entity,
                rows: df.height(),
                first_date: dates.min(),
                last_date: dates.max(),
            });
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn reports_rows_and_date_range_per_entity() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = PipelineConfig {
            data_root: dir.path().to_path_buf(),
            ..Default::default()
        };

        let df = df!(
            "TRADE_DATE" => [20240101i64, 20240103],
            "SYMBOL" => ["NIFTY 50", "NIFTY 50"],
            "OPEN" => [21400.0, 21500.0],
            "HIGH" => [21450.0, 21600.0],
            "LOW" => [21350.0, 21480.0],
            "CLOSE" => [21420.0, 21550.0],
        )
        .unwrap();
        MasterStore::new(cfg.master_index_dir())
            .save("indices_ohlc", &df)
            .unwrap();

        let statuses = master_status(&cfg).unwrap();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].area, "indices");
        assert_eq!(statuses[0].entity, "indices_ohlc");
        assert_eq!(statuses[0].rows, 2);
        assert_eq!(statuses[0].first_date, Some(20240101));
        assert_eq!(statuses[0].last_date, Some(20240103));
    }

    #[test]
    fn empty_root_reports_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = PipelineConfig {
            data_root: dir.path().to_path_buf(),
            ..Default::default()
        };
        assert!(master_status(&cfg).unwrap().is_empty());
    }
}
