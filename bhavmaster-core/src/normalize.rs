//! Schema normalizer — raw batches to canonical, typed records.
//!
//! Raw batches arrive with free-form headers and every column as a string.
//! Normalization is one pass:
//! 1. Header cleanup (BOM strip, trim, upper-case)
//! 2. Alias resolution against the class's static alias table
//! 3. Required-column gate (aborts the batch, names every missing column)
//! 4. Per-kind coercion: dates → integer yyyymmdd, counts → i64 (null → 0),
//!    measures → f64 (null preserved, thousands separators stripped),
//!    text → trimmed upper-case
//! 5. Rows with a null identity/temporal key are dropped (and counted)
//! 6. Projection to the contract columns in contract order
//!
//! The same coercion (without the key-null drop) re-validates persisted
//! masters at the store's load boundary.

use polars::prelude::*;

use crate::error::EtlError;
use crate::schema::{ClassSpec, ColumnKind, ColumnSpec};

/// Row accounting for one normalized batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeReport {
    pub rows_in: usize,
    pub rows_out: usize,
    pub rows_dropped_null_key: usize,
}

/// Normalize a raw batch against a class contract.
pub fn normalize(df: DataFrame, spec: &ClassSpec) -> Result<(DataFrame, NormalizeReport), EtlError> {
    let rows_in = df.height();
    let out = conform(df, spec, true)?;
    let rows_out = out.height();
    let report = NormalizeReport {
        rows_in,
        rows_out,
        rows_dropped_null_key: rows_in - rows_out,
    };
    Ok((out, report))
}

/// Re-validate an already-persisted dataset against its contract.
///
/// Same coercion as [`normalize`], but rows with null keys are kept — on the
/// existing side, coercion failures become null/zero instead of dropping data.
pub fn coerce_to_contract(df: DataFrame, spec: &ClassSpec) -> Result<DataFrame, EtlError> {
    conform(df, spec, false)
}

/// Strip BOM/whitespace from headers and upper-case them.
pub fn normalize_headers(df: &mut DataFrame) -> Result<(), EtlError> {
    let cleaned: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|n| n.as_str().trim_start_matches('\u{feff}').trim().to_uppercase())
        .collect();
    df.set_column_names(cleaned)?;
    Ok(())
}

/// Rename the first matching alias of each absent canonical column.
pub fn resolve_aliases(df: &mut DataFrame, spec: &ClassSpec) -> Result<(), EtlError> {
    let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
    for column in spec.columns {
        if names.iter().any(|n| n == column.name) {
            continue;
        }
        let hit = column
            .aliases
            .iter()
            .copied()
            .find(|a| names.iter().any(|n| n.as_str() == *a));
        if let Some(alias) = hit {
            df.rename(alias, column.name.into())?;
        }
    }
    // `DataFrame::rename` populates the cached schema (via its duplicate-name
    // check) from the pre-rename columns and does not invalidate it afterward,
    // so a subsequent `lazy()` would scan against stale column names. Drop the
    // cache so the schema is recomputed from the renamed columns.
    df.clear_schema();
    Ok(())
}

fn conform(mut df: DataFrame, spec: &ClassSpec, drop_null_keys: bool) -> Result<DataFrame, EtlError> {
    normalize_headers(&mut df)?;
    resolve_aliases(&mut df, spec)?;

    let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
    spec.require_columns(&names)?;

    let casts: Vec<Expr> = spec.columns.iter().map(cast_expr).collect();
    let mut lf = df.lazy().with_columns(casts);

    // Null-key rows must go before counts are zero-filled, or a key stored
    // as a count (e.g. a strike) would survive as a bogus 0.
    if drop_null_keys {
        lf = lf.filter(keys_present(spec));
    }

    let fills: Vec<Expr> = spec
        .columns
        .iter()
        .filter(|c| c.kind == ColumnKind::Count)
        .map(|c| col(c.name).fill_null(lit(0i64)))
        .collect();
    if !fills.is_empty() {
        lf = lf.with_columns(fills);
    }

    let projection: Vec<Expr> = spec.columns.iter().map(|c| col(c.name)).collect();
    Ok(lf.select(projection).collect()?)
}

fn cast_expr(column: &ColumnSpec) -> Expr {
    let s = col(column.name)
        .cast(DataType::String)
        .str()
        .strip_chars(lit(NULL));
    let coerced = match column.kind {
        ColumnKind::Date => date_to_int(s),
        ColumnKind::Count => s
            .str()
            .replace_all(lit(","), lit(""), true)
            .cast(DataType::Float64)
            .cast(DataType::Int64),
        ColumnKind::Measure => s
            .str()
            .replace_all(lit(","), lit(""), true)
            .cast(DataType::Float64),
        ColumnKind::Text => s.str().to_uppercase(),
    };
    coerced.alias(column.name)
}

/// Parse a date string to integer yyyymmdd, trying the formats the source
/// feeds actually emit. Unparseable values become null.
fn date_to_int(s: Expr) -> Expr {
    const FORMATS: [&str; 5] = ["%Y%m%d", "%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%d-%b-%Y"];
    let attempts: Vec<Expr> = FORMATS
        .iter()
        .map(|fmt| {
            s.clone()
                .str()
                .to_date(StrptimeOptions {
                    format: Some((*fmt).into()),
                    strict: false,
                    ..Default::default()
                })
                .dt()
                .to_string("%Y%m%d")
                .cast(DataType::Int64)
        })
        .collect();
    coalesce(&attempts)
}

fn keys_present(spec: &ClassSpec) -> Expr {
    let mut pred = lit(true);
    for key in spec.key_columns() {
        let term = match spec.column(key).map(|c| c.kind) {
            Some(ColumnKind::Text) => col(key).is_not_null().and(col(key).neq(lit(""))),
            _ => col(key).is_not_null(),
        };
        pred = pred.and(term);
    }
    pred
}
