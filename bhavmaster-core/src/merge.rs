//! Append-merge engine — reconcile an incoming batch against an existing
//! per-entity dataset.
//!
//! Policy: concatenate existing-then-incoming preserving input order,
//! deduplicate on the class's dedup key keeping the physically later record
//! (last write wins), then stable-sort ascending by the sort key. The result
//! fully replaces the persisted dataset.

use polars::prelude::*;

use crate::error::EtlError;
use crate::schema::ClassSpec;

/// Merge `incoming` records into the dataset for one entity.
///
/// `existing` is `None` when the entity has no persisted store yet; whether
/// that means "create" or "skip" is the caller's policy — this engine only
/// ever sees the create path.
///
/// Both sides are aligned to the contract dtypes before concatenation, so a
/// key persisted as text can never produce a false "distinct" row against an
/// integer-typed incoming key. Incoming key values that fail to coerce raise
/// [`EtlError::KeyIntegrity`] — the normalizer should have dropped them, so
/// hitting this is a defect upstream. Existing-side coercion failures are
/// kept as nulls per the normalizer's policy.
pub fn merge(
    existing: Option<DataFrame>,
    incoming: DataFrame,
    spec: &ClassSpec,
) -> Result<DataFrame, EtlError> {
    let incoming = conform_types(incoming, spec)?;
    check_incoming_keys(&incoming, spec)?;

    let combined = match existing {
        Some(old) => conform_types(old, spec)?.vstack(&incoming)?,
        None => incoming,
    };

    let subset: Vec<_> = spec.dedup_key.iter().map(|&k| k.into()).collect();
    let descending = vec![false; spec.sort_key.len()];
    let merged = combined
        .lazy()
        .unique_stable(Some(subset), UniqueKeepStrategy::Last)
        .sort(
            spec.sort_key.to_vec(),
            SortMultipleOptions::default()
                .with_order_descending_multi(descending)
                .with_maintain_order(true),
        )
        .collect()?;
    Ok(merged)
}

/// Project to contract order and align dtypes. Casts are non-strict: values
/// that do not convert become null.
fn conform_types(df: DataFrame, spec: &ClassSpec) -> Result<DataFrame, EtlError> {
    let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
    spec.require_columns(&names)?;
    let exprs: Vec<Expr> = spec
        .columns
        .iter()
        .map(|c| col(c.name).cast(c.kind.dtype()))
        .collect();
    Ok(df.lazy().select(exprs).collect()?)
}

fn check_incoming_keys(incoming: &DataFrame, spec: &ClassSpec) -> Result<(), EtlError> {
    for key in spec.dedup_key {
        let nulls = incoming.column(key)?.null_count();
        if nulls > 0 {
            return Err(EtlError::KeyIntegrity {
                column: key.to_string(),
                nulls,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EQUITY, INDEX_MASTER, OPTIONS};

    fn equity_frame(rows: &[(i64, f64)]) -> DataFrame {
        let n = rows.len();
        df!(
            "DATE" => rows.iter().map(|r| r.0).collect::<Vec<_>>(),
            "SYMBOL" => vec!["ABC"; n],
            "SERIES" => vec!["EQ"; n],
            "OPEN" => vec![1.0; n],
            "HIGH" => vec![2.0; n],
            "LOW" => vec![0.5; n],
            "CLOSE" => rows.iter().map(|r| r.1).collect::<Vec<_>>(),
            "LAST" => vec![1.0; n],
            "PREVCLOSE" => vec![1.0; n],
            "TOTTRDQTY" => vec![10i64; n],
            "TOTTRDVAL" => vec![100.0; n],
            "TOTALTRADES" => vec![3i64; n],
            "ISIN" => vec!["INE000A01001"; n],
        )
        .unwrap()
    }

    fn options_frame(rows: &[(i64, i64, &str, i64)]) -> DataFrame {
        // (trade_date, strike, opt_type, open_int)
        let n = rows.len();
        df!(
            "INSTRUMENT" => vec!["OPTSTK"; n],
            "SYMBOL" => vec!["ABC"; n],
            "TRADE_DATE" => rows.iter().map(|r| r.0).collect::<Vec<_>>(),
            "EXP_DATE" => vec![20240125i64; n],
            "STRIKE_PRICE" => rows.iter().map(|r| r.1).collect::<Vec<_>>(),
            "OPT_TYPE" => rows.iter().map(|r| r.2).collect::<Vec<_>>(),
            "OPEN_PRICE" => vec![10.0; n],
            "HI_PRICE" => vec![12.0; n],
            "LO_PRICE" => vec![9.0; n],
            "CLOSE_PRICE" => vec![11.0; n],
            "OPEN_INT" => rows.iter().map(|r| r.3).collect::<Vec<_>>(),
            "TRD_QTY" => vec![100i64; n],
            "NO_OF_CONT" => vec![2i64; n],
            "NO_OF_TRADE" => vec![5i64; n],
            "NOTION_VAL" => vec![1000i64; n],
            "PR_VAL" => vec![50.0; n],
        )
        .unwrap()
    }

    fn closes(df: &DataFrame) -> Vec<Option<f64>> {
        df.column("CLOSE").unwrap().f64().unwrap().into_iter().collect()
    }

    fn dates(df: &DataFrame) -> Vec<Option<i64>> {
        df.column("DATE").unwrap().i64().unwrap().into_iter().collect()
    }

    #[test]
    fn incoming_overrides_existing_for_same_key() {
        let existing = equity_frame(&[(20240101, 100.0)]);
        let incoming = equity_frame(&[(20240101, 105.0), (20240102, 110.0)]);

        let merged = merge(Some(existing), incoming, &EQUITY).unwrap();

        assert_eq!(merged.height(), 2);
        assert_eq!(dates(&merged), vec![Some(20240101), Some(20240102)]);
        assert_eq!(closes(&merged), vec![Some(105.0), Some(110.0)]);
    }

    #[test]
    fn merge_is_idempotent() {
        let existing = equity_frame(&[(20240101, 100.0), (20240103, 103.0)]);
        let incoming = equity_frame(&[(20240102, 102.0), (20240103, 104.0)]);

        let once = merge(Some(existing.clone()), incoming.clone(), &EQUITY).unwrap();
        let twice = merge(Some(once.clone()), incoming, &EQUITY).unwrap();

        assert!(once.equals(&twice));
    }

    #[test]
    fn absent_existing_creates_from_incoming() {
        let incoming = equity_frame(&[(20240103, 103.0), (20240101, 101.0)]);

        let merged = merge(None, incoming, &EQUITY).unwrap();

        assert_eq!(merged.height(), 2);
        assert_eq!(dates(&merged), vec![Some(20240101), Some(20240103)]);
    }

    #[test]
    fn later_incoming_row_wins_within_the_batch() {
        let incoming = options_frame(&[
            (20240102, 22500, "CE", 1000),
            (20240102, 22500, "CE", 2500),
        ]);

        let merged = merge(None, incoming, &OPTIONS).unwrap();

        assert_eq!(merged.height(), 1);
        let oi = merged.column("OPEN_INT").unwrap().i64().unwrap();
        assert_eq!(oi.get(0), Some(2500));
    }

    #[test]
    fn options_key_distinguishes_strike_and_type() {
        let incoming = options_frame(&[
            (20240102, 22500, "CE", 1000),
            (20240102, 22500, "PE", 900),
            (20240102, 22600, "CE", 800),
        ]);

        let merged = merge(None, incoming, &OPTIONS).unwrap();
        assert_eq!(merged.height(), 3);
    }

    #[test]
    fn type_drift_in_existing_does_not_duplicate_keys() {
        // A prior run left the date key as text; it must still collide with
        // the integer-typed incoming key.
        let existing = df!(
            "DATE" => ["20240101"],
            "SYMBOL" => ["ABC"],
            "SERIES" => ["EQ"],
            "OPEN" => [1.0],
            "HIGH" => [2.0],
            "LOW" => [0.5],
            "CLOSE" => [100.0],
            "LAST" => [1.0],
            "PREVCLOSE" => [1.0],
            "TOTTRDQTY" => [10i64],
            "TOTTRDVAL" => [100.0],
            "TOTALTRADES" => [3i64],
            "ISIN" => ["INE000A01001"],
        )
        .unwrap();
        let incoming = equity_frame(&[(20240101, 105.0)]);

        let merged = merge(Some(existing), incoming, &EQUITY).unwrap();

        assert_eq!(merged.height(), 1);
        assert_eq!(closes(&merged), vec![Some(105.0)]);
    }

    #[test]
    fn unparseable_incoming_key_is_rejected() {
        let mut incoming = options_frame(&[(20240102, 22500, "CE", 1000)]);
        incoming
            .replace(
                "OPT_TYPE",
                Series::new("OPT_TYPE".into(), &[None::<&str>]),
            )
            .unwrap();

        let err = merge(None, incoming, &OPTIONS).unwrap_err();
        match err {
            EtlError::KeyIntegrity { column, nulls } => {
                assert_eq!(column, "OPT_TYPE");
                assert_eq!(nulls, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn sort_key_can_be_narrower_than_dedup_key() {
        let a = df!(
            "TRADE_DATE" => [20240102i64, 20240101],
            "SYMBOL" => ["NIFTY", "NIFTY"],
            "OPEN" => [1.0, 1.0],
            "HIGH" => [2.0, 2.0],
            "LOW" => [0.5, 0.5],
            "CLOSE" => [21550.0, 21400.0],
        )
        .unwrap();

        let merged = merge(None, a, &INDEX_MASTER).unwrap();
        let dates: Vec<Option<i64>> = merged
            .column("TRADE_DATE")
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(dates, vec![Some(20240101), Some(20240102)]);
    }

    #[test]
    fn existing_missing_contract_column_is_an_error() {
        let existing = df!(
            "DATE" => [20240101i64],
            "SYMBOL" => ["ABC"],
        )
        .unwrap();
        let incoming = equity_frame(&[(20240102, 102.0)]);

        let err = merge(Some(existing), incoming, &EQUITY).unwrap_err();
        assert!(matches!(err, EtlError::MissingColumns { .. }));
    }
}
