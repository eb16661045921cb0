//! Asset-class schemas: canonical column contracts, alias tables, and key tuples.
//!
//! Each asset class publishes one `ClassSpec`: the canonical column set (in
//! contract order), the column kinds driving type coercion, the dedup key the
//! merge engine deduplicates on, and the sort key it orders by. Source-format
//! column aliases live here too, so the normalizer stays table-driven instead
//! of probing header variants ad hoc.

use polars::prelude::DataType;

use crate::error::EtlError;

/// The five dataset families the pipeline maintains masters for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetClass {
    Equity,
    Delivery,
    Futures,
    Options,
    Index,
}

impl AssetClass {
    pub fn name(&self) -> &'static str {
        match self {
            AssetClass::Equity => "equity",
            AssetClass::Delivery => "delivery",
            AssetClass::Futures => "futures",
            AssetClass::Options => "options",
            AssetClass::Index => "index",
        }
    }

    /// The spec used to normalize and filter this class's raw daily batch.
    ///
    /// Note the index class normalizes against [`INDEX_DAILY`]; its master
    /// store uses the narrower [`INDEX_MASTER`] contract.
    pub fn spec(&self) -> &'static ClassSpec {
        match self {
            AssetClass::Equity => &EQUITY,
            AssetClass::Delivery => &DELIVERY,
            AssetClass::Futures => &FUTURES,
            AssetClass::Options => &OPTIONS,
            AssetClass::Index => &INDEX_DAILY,
        }
    }
}

/// How a canonical column is typed and coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Calendar day stored as integer yyyymmdd.
    Date,
    /// Discrete quantity: i64, unparseable values become 0.
    Count,
    /// Continuous measure: f64, unparseable values stay null.
    Measure,
    /// Identifier text: trimmed and upper-cased.
    Text,
}

impl ColumnKind {
    pub fn dtype(&self) -> DataType {
        match self {
            ColumnKind::Date | ColumnKind::Count => DataType::Int64,
            ColumnKind::Measure => DataType::Float64,
            ColumnKind::Text => DataType::String,
        }
    }
}

/// One canonical column: name, kind, and the source-format aliases that
/// resolve to it (tried in order, first hit wins).
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub aliases: &'static [&'static str],
}

/// The full contract for one asset class.
#[derive(Debug, Clone, Copy)]
pub struct ClassSpec {
    pub class: AssetClass,
    /// Canonical columns in published contract order. All are required.
    pub columns: &'static [ColumnSpec],
    /// Key tuple the merge engine deduplicates on (last write wins).
    pub dedup_key: &'static [&'static str],
    /// Key tuple datasets are sorted by (may be narrower than `dedup_key`).
    pub sort_key: &'static [&'static str],
    /// The trade-date column (integer yyyymmdd).
    pub temporal_key: &'static str,
    /// The column datasets are partitioned into per-entity stores by.
    pub entity_column: &'static str,
}

impl ClassSpec {
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Columns whose nullness drops the whole row: the dedup key plus the
    /// entity column.
    pub fn key_columns(&self) -> Vec<&'static str> {
        let mut keys: Vec<&'static str> = self.dedup_key.to_vec();
        if !keys.contains(&self.entity_column) {
            keys.push(self.entity_column);
        }
        keys
    }

    /// Contract columns absent from `names` (after header normalization).
    pub fn missing_columns(&self, names: &[String]) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| !names.iter().any(|n| n == c.name))
            .map(|c| c.name.to_string())
            .collect()
    }

    /// Error if any contract column is absent.
    pub fn require_columns(&self, names: &[String]) -> Result<(), EtlError> {
        let missing = self.missing_columns(names);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(EtlError::MissingColumns {
                class: self.class.name(),
                columns: missing,
            })
        }
    }
}

// ── Contract tables ─────────────────────────────────────────────────

/// Equity bhavcopy. Per-symbol store, one row per trading day.
pub static EQUITY: ClassSpec = ClassSpec {
    class: AssetClass::Equity,
    columns: &[
        ColumnSpec { name: "DATE", kind: ColumnKind::Date, aliases: &["TRADDT", "BIZDT", "TIMESTAMP"] },
        ColumnSpec { name: "SYMBOL", kind: ColumnKind::Text, aliases: &["TCKRSYMB"] },
        ColumnSpec { name: "SERIES", kind: ColumnKind::Text, aliases: &["SCTYSRS"] },
        ColumnSpec { name: "OPEN", kind: ColumnKind::Measure, aliases: &["OPNPRIC"] },
        ColumnSpec { name: "HIGH", kind: ColumnKind::Measure, aliases: &["HGHPRIC"] },
        ColumnSpec { name: "LOW", kind: ColumnKind::Measure, aliases: &["LWPRIC"] },
        ColumnSpec { name: "CLOSE", kind: ColumnKind::Measure, aliases: &["CLSPRIC"] },
        ColumnSpec { name: "LAST", kind: ColumnKind::Measure, aliases: &["LASTPRIC"] },
        ColumnSpec { name: "PREVCLOSE", kind: ColumnKind::Measure, aliases: &["PRVSCLSGPRIC"] },
        ColumnSpec { name: "TOTTRDQTY", kind: ColumnKind::Count, aliases: &["TTLTRADGVOL"] },
        ColumnSpec { name: "TOTTRDVAL", kind: ColumnKind::Measure, aliases: &["TTLTRFVAL"] },
        ColumnSpec { name: "TOTALTRADES", kind: ColumnKind::Count, aliases: &["TTLNBOFTXSEXCTD"] },
        ColumnSpec { name: "ISIN", kind: ColumnKind::Text, aliases: &[] },
    ],
    dedup_key: &["DATE"],
    sort_key: &["DATE"],
    temporal_key: "DATE",
    entity_column: "SYMBOL",
};

/// Delivery (MTO) report. Per-symbol store, append into existing masters only.
pub static DELIVERY: ClassSpec = ClassSpec {
    class: AssetClass::Delivery,
    columns: &[
        ColumnSpec { name: "TRADE_DATE", kind: ColumnKind::Date, aliases: &[] },
        ColumnSpec { name: "RECORD_TYPE", kind: ColumnKind::Count, aliases: &[] },
        ColumnSpec { name: "SR_NO", kind: ColumnKind::Count, aliases: &[] },
        ColumnSpec { name: "SYMBOL", kind: ColumnKind::Text, aliases: &[] },
        ColumnSpec { name: "SERIES", kind: ColumnKind::Text, aliases: &[] },
        ColumnSpec { name: "TRADED_QTY", kind: ColumnKind::Count, aliases: &[] },
        ColumnSpec { name: "DELIVERABLE_QTY", kind: ColumnKind::Count, aliases: &[] },
        ColumnSpec { name: "DELIVERY_PCT", kind: ColumnKind::Measure, aliases: &[] },
    ],
    dedup_key: &["TRADE_DATE", "SYMBOL"],
    sort_key: &["TRADE_DATE"],
    temporal_key: "TRADE_DATE",
    entity_column: "SYMBOL",
};

/// Futures bhavcopy rows. Per-symbol store under a per-segment root.
pub static FUTURES: ClassSpec = ClassSpec {
    class: AssetClass::Futures,
    columns: &[
        ColumnSpec { name: "INSTRUMENT", kind: ColumnKind::Text, aliases: &["FININSTRMTP", "FIN_INSTRM_TP", "INSTRUMENT_TYPE"] },
        ColumnSpec { name: "SYMBOL", kind: ColumnKind::Text, aliases: &["TCKRSYMB"] },
        ColumnSpec { name: "EXP_DATE", kind: ColumnKind::Date, aliases: &["XPRYDT", "EXPIRY_DT"] },
        ColumnSpec { name: "OPEN_PRICE", kind: ColumnKind::Measure, aliases: &["OPNPRIC", "OPEN"] },
        ColumnSpec { name: "HI_PRICE", kind: ColumnKind::Measure, aliases: &["HGHPRIC", "HIGH"] },
        ColumnSpec { name: "LO_PRICE", kind: ColumnKind::Measure, aliases: &["LWPRIC", "LOW"] },
        ColumnSpec { name: "CLOSE_PRICE", kind: ColumnKind::Measure, aliases: &["CLSPRIC", "CLOSE"] },
        ColumnSpec { name: "OPEN_INT", kind: ColumnKind::Count, aliases: &["OPEN_INT*", "OPNINTRST"] },
        ColumnSpec { name: "TRD_VAL", kind: ColumnKind::Measure, aliases: &["TTLTRFVAL", "VAL_INLAKH"] },
        ColumnSpec { name: "TRD_QTY", kind: ColumnKind::Count, aliases: &["TTLTRADGVOL", "CONTRACTS_TRADED"] },
        ColumnSpec { name: "NO_OF_CONT", kind: ColumnKind::Count, aliases: &["NOOFCONTRACTS"] },
        ColumnSpec { name: "NO_OF_TRADE", kind: ColumnKind::Count, aliases: &["TTLNBOFTXSEXCTD"] },
        ColumnSpec { name: "TRADE_DATE", kind: ColumnKind::Date, aliases: &["TRADDT"] },
    ],
    dedup_key: &["SYMBOL", "TRADE_DATE", "EXP_DATE"],
    sort_key: &["TRADE_DATE", "EXP_DATE"],
    temporal_key: "TRADE_DATE",
    entity_column: "SYMBOL",
};

/// Options bhavcopy rows. Per-symbol store under a per-segment root.
pub static OPTIONS: ClassSpec = ClassSpec {
    class: AssetClass::Options,
    columns: &[
        ColumnSpec { name: "INSTRUMENT", kind: ColumnKind::Text, aliases: &["FININSTRMTP", "FIN_INSTRM_TP", "INSTRUMENT_TYPE"] },
        ColumnSpec { name: "SYMBOL", kind: ColumnKind::Text, aliases: &["TCKRSYMB"] },
        ColumnSpec { name: "TRADE_DATE", kind: ColumnKind::Date, aliases: &["TRADDT"] },
        ColumnSpec { name: "EXP_DATE", kind: ColumnKind::Date, aliases: &["XPRYDT", "EXPIRY_DT"] },
        ColumnSpec { name: "STRIKE_PRICE", kind: ColumnKind::Count, aliases: &["STR_PRICE", "STRK_PRICE", "STRKPRIC"] },
        ColumnSpec { name: "OPT_TYPE", kind: ColumnKind::Text, aliases: &["OPTNTP", "OPTION_TYP"] },
        ColumnSpec { name: "OPEN_PRICE", kind: ColumnKind::Measure, aliases: &["OPNPRIC", "OPEN"] },
        ColumnSpec { name: "HI_PRICE", kind: ColumnKind::Measure, aliases: &["HGHPRIC", "HIGH"] },
        ColumnSpec { name: "LO_PRICE", kind: ColumnKind::Measure, aliases: &["LWPRIC", "LOW"] },
        ColumnSpec { name: "CLOSE_PRICE", kind: ColumnKind::Measure, aliases: &["CLSPRIC", "CLOSE"] },
        ColumnSpec { name: "OPEN_INT", kind: ColumnKind::Count, aliases: &["OPEN_INT*", "OPNINTRST"] },
        ColumnSpec { name: "TRD_QTY", kind: ColumnKind::Count, aliases: &["TTLTRADGVOL", "CONTRACTS_TRADED"] },
        ColumnSpec { name: "NO_OF_CONT", kind: ColumnKind::Count, aliases: &["NOOFCONTRACTS"] },
        ColumnSpec { name: "NO_OF_TRADE", kind: ColumnKind::Count, aliases: &["TTLNBOFTXSEXCTD"] },
        ColumnSpec { name: "NOTION_VAL", kind: ColumnKind::Count, aliases: &[] },
        ColumnSpec { name: "PR_VAL", kind: ColumnKind::Measure, aliases: &[] },
    ],
    dedup_key: &["SYMBOL", "TRADE_DATE", "EXP_DATE", "STRIKE_PRICE", "OPT_TYPE"],
    sort_key: &["SYMBOL", "TRADE_DATE", "EXP_DATE", "STRIKE_PRICE", "OPT_TYPE"],
    temporal_key: "TRADE_DATE",
    entity_column: "SYMBOL",
};

/// Daily index OHLC feed, as normalized from the raw download.
pub static INDEX_DAILY: ClassSpec = ClassSpec {
    class: AssetClass::Index,
    columns: &[
        ColumnSpec { name: "TRADE_DATE", kind: ColumnKind::Date, aliases: &[] },
        ColumnSpec { name: "INDEX_NAME", kind: ColumnKind::Text, aliases: &["INDEX"] },
        ColumnSpec { name: "OPEN", kind: ColumnKind::Measure, aliases: &[] },
        ColumnSpec { name: "HIGH", kind: ColumnKind::Measure, aliases: &[] },
        ColumnSpec { name: "LOW", kind: ColumnKind::Measure, aliases: &[] },
        ColumnSpec { name: "CLOSE", kind: ColumnKind::Measure, aliases: &["LAST"] },
        ColumnSpec { name: "PCT_CHANGE", kind: ColumnKind::Measure, aliases: &["PERCENTCHANGE"] },
    ],
    dedup_key: &["TRADE_DATE", "INDEX_NAME"],
    sort_key: &["TRADE_DATE"],
    temporal_key: "TRADE_DATE",
    entity_column: "INDEX_NAME",
};

/// Index master contract: the global store the allow-listed index rows are
/// mapped into. Dedup key is wider than the sort key on purpose.
pub static INDEX_MASTER: ClassSpec = ClassSpec {
    class: AssetClass::Index,
    columns: &[
        ColumnSpec { name: "TRADE_DATE", kind: ColumnKind::Date, aliases: &[] },
        ColumnSpec { name: "SYMBOL", kind: ColumnKind::Text, aliases: &[] },
        ColumnSpec { name: "OPEN", kind: ColumnKind::Measure, aliases: &[] },
        ColumnSpec { name: "HIGH", kind: ColumnKind::Measure, aliases: &[] },
        ColumnSpec { name: "LOW", kind: ColumnKind::Measure, aliases: &[] },
        ColumnSpec { name: "CLOSE", kind: ColumnKind::Measure, aliases: &[] },
    ],
    dedup_key: &["TRADE_DATE", "SYMBOL"],
    sort_key: &["TRADE_DATE"],
    temporal_key: "TRADE_DATE",
    entity_column: "SYMBOL",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_spec_keys_exist_in_contract() {
        for spec in [&EQUITY, &DELIVERY, &FUTURES, &OPTIONS, &INDEX_DAILY, &INDEX_MASTER] {
            for key in spec.dedup_key.iter().chain(spec.sort_key.iter()) {
                assert!(
                    spec.column(key).is_some(),
                    "{}: key column {key} not in contract",
                    spec.class.name()
                );
            }
            assert!(spec.column(spec.temporal_key).is_some());
            assert!(spec.column(spec.entity_column).is_some());
            assert_eq!(spec.column(spec.temporal_key).unwrap().kind, ColumnKind::Date);
        }
    }

    #[test]
    fn key_columns_include_entity() {
        let keys = EQUITY.key_columns();
        assert_eq!(keys, vec!["DATE", "SYMBOL"]);

        // Entity already part of the dedup key is not duplicated.
        let keys = DELIVERY.key_columns();
        assert_eq!(keys, vec!["TRADE_DATE", "SYMBOL"]);
    }

    #[test]
    fn missing_columns_reports_gaps() {
        let names: Vec<String> = vec!["TRADE_DATE".into(), "SYMBOL".into()];
        let missing = INDEX_MASTER.missing_columns(&names);
        assert_eq!(missing, vec!["OPEN", "HIGH", "LOW", "CLOSE"]);

        let all: Vec<String> = INDEX_MASTER.column_names().iter().map(|s| s.to_string()).collect();
        assert!(INDEX_MASTER.missing_columns(&all).is_empty());
        assert!(INDEX_MASTER.require_columns(&all).is_ok());
    }

    #[test]
    fn alias_tables_cover_known_source_variants() {
        let date = EQUITY.column("DATE").unwrap();
        assert!(date.aliases.contains(&"TRADDT"));
        assert!(date.aliases.contains(&"TIMESTAMP"));

        let oi = FUTURES.column("OPEN_INT").unwrap();
        assert!(oi.aliases.contains(&"OPEN_INT*"));
        assert!(oi.aliases.contains(&"OPNINTRST"));

        let strike = OPTIONS.column("STRIKE_PRICE").unwrap();
        assert_eq!(strike.aliases.len(), 3);
    }
}
