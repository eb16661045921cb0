//! Raw-file readers.
//!
//! CSVs go through the all-strings reader shared with the store, so the
//! normalizer owns every type decision. The delivery report ships as a `.DAT`
//! line file with embedded NUL bytes, mixed comma/whitespace delimiting, and
//! header/footer garbage; its reader keeps any line that splits into at least
//! the seven delivery fields and leaves the authoritative record-type
//! filtering to the record filter.

use polars::prelude::*;
use std::path::Path;

use bhavmaster_core::error::EtlError;

pub use bhavmaster_core::store::read_csv_str;

/// Read an MTO delivery `.DAT` file into an all-strings batch.
///
/// `trade_date` comes from the filename (authoritative for this feed) and is
/// injected as an integer yyyymmdd column.
pub fn read_mto_dat(path: &Path, trade_date: i64) -> Result<DataFrame, EtlError> {
    let bytes = std::fs::read(path)
        .map_err(|e| EtlError::RawRead(format!("open {}: {e}", path.display())))?;

    let mut record_type: Vec<String> = Vec::new();
    let mut sr_no: Vec<String> = Vec::new();
    let mut symbol: Vec<String> = Vec::new();
    let mut series: Vec<String> = Vec::new();
    let mut traded_qty: Vec<String> = Vec::new();
    let mut deliverable_qty: Vec<String> = Vec::new();
    let mut delivery_pct: Vec<String> = Vec::new();

    for raw_line in bytes.split(|b| *b == b'\n') {
        let cleaned: Vec<u8> = raw_line.iter().copied().filter(|b| *b != 0).collect();
        let line = String::from_utf8_lossy(&cleaned).replace('\t', " ");
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = if line.contains(',') {
            line.split(',').map(str::trim).collect()
        } else {
            line.split_whitespace().collect()
        };
        if fields.len() < 7 {
            continue;
        }

        record_type.push(fields[0].to_string());
        sr_no.push(fields[1].to_string());
        symbol.push(fields[2].to_string());
        series.push(fields[3].to_string());
        traded_qty.push(fields[4].to_string());
        deliverable_qty.push(fields[5].to_string());
        delivery_pct.push(fields[6].to_string());
    }

    let n = record_type.len();
    df!(
        "TRADE_DATE" => vec![trade_date; n],
        "RECORD_TYPE" => record_type,
        "SR_NO" => sr_no,
        "SYMBOL" => symbol,
        "SERIES" => series,
        "TRADED_QTY" => traded_qty,
        "DELIVERABLE_QTY" => deliverable_qty,
        "DELIVERY_PCT" => delivery_pct,
    )
    .map_err(EtlError::from)
}
