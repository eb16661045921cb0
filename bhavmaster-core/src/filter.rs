//! Record filters — class-specific inclusion predicates.
//!
//! Filters run on normalized batches, so text fields are already trimmed and
//! upper-cased. An empty filtered result is not an error; callers treat it as
//! a no-op batch and report the counts.

use polars::prelude::*;

use crate::error::EtlError;

/// Stock vs index subset of a derivatives batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Stock,
    Index,
}

impl Segment {
    pub fn name(&self) -> &'static str {
        match self {
            Segment::Stock => "stock",
            Segment::Index => "index",
        }
    }
}

/// A filtered batch plus its row accounting.
#[derive(Debug)]
pub struct FilterOutcome {
    pub frame: DataFrame,
    pub rows_in: usize,
    pub rows_kept: usize,
}

/// A derivatives batch split into its stock and index segments.
#[derive(Debug)]
pub struct SegmentSplit {
    pub stock: DataFrame,
    pub index: DataFrame,
    pub rows_in: usize,
    pub rows_kept: usize,
}

/// Keep rows whose series code is exactly "EQ" (equity and delivery batches).
pub fn series_eq(df: DataFrame) -> Result<FilterOutcome, EtlError> {
    keep(df, col("SERIES").eq(lit("EQ")))
}

/// Delivery: keep the record-type-20 rows with strictly positive traded
/// quantity.
pub fn delivery_rows(df: DataFrame) -> Result<FilterOutcome, EtlError> {
    keep(
        df,
        col("RECORD_TYPE")
            .eq(lit(20i64))
            .and(col("TRADED_QTY").gt(lit(0i64))),
    )
}

/// Futures: split into FUTSTK / FUTIDX subsets.
pub fn futures(df: DataFrame) -> Result<SegmentSplit, EtlError> {
    split_by_instrument(df, "FUTSTK", "FUTIDX")
}

/// Options: split into OPTSTK / OPTIDX subsets.
pub fn options(df: DataFrame) -> Result<SegmentSplit, EtlError> {
    split_by_instrument(df, "OPTSTK", "OPTIDX")
}

/// Index: keep rows whose authoritative index name is on the allow-list.
pub fn index_allowlist(df: DataFrame, allowlist: &[String]) -> Result<FilterOutcome, EtlError> {
    let mut pred = lit(false);
    for name in allowlist {
        pred = pred.or(col("INDEX_NAME").eq(lit(name.as_str())));
    }
    keep(df, pred)
}

fn keep(df: DataFrame, predicate: Expr) -> Result<FilterOutcome, EtlError> {
    let rows_in = df.height();
    let frame = df.lazy().filter(predicate).collect()?;
    Ok(FilterOutcome {
        rows_in,
        rows_kept: frame.height(),
        frame,
    })
}

fn split_by_instrument(
    df: DataFrame,
    stock_prefix: &str,
    index_prefix: &str,
) -> Result<SegmentSplit, EtlError> {
    let rows_in = df.height();
    let stock = df
        .clone()
        .lazy()
        .filter(col("INSTRUMENT").str().starts_with(lit(stock_prefix)))
        .collect()?;
    let index = df
        .lazy()
        .filter(col("INSTRUMENT").str().starts_with(lit(index_prefix)))
        .collect()?;
    let rows_kept = stock.height() + index.height();
    Ok(SegmentSplit {
        stock,
        index,
        rows_in,
        rows_kept,
    })
}
