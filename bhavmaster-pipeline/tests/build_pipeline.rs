//! End-to-end builder tests over temp data roots.
//!
//! Each test lays out raw files the way the download/extract stage would,
//! runs a builder, and checks the master stores and report counters.

use std::fs;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

use bhavmaster_core::filter::Segment;
use bhavmaster_core::schema::{DELIVERY, EQUITY, FUTURES, INDEX_MASTER, OPTIONS};
use bhavmaster_core::store::MasterStore;
use bhavmaster_pipeline::builders::{
    build_delivery, build_equity, build_futures, build_index, build_options,
};
use bhavmaster_pipeline::{PipelineConfig, INDEX_MASTER_ENTITY};
use polars::prelude::*;

fn temp_config() -> (tempfile::TempDir, PipelineConfig) {
    let dir = tempfile::tempdir().unwrap();
    let cfg = PipelineConfig {
        data_root: dir.path().to_path_buf(),
        ..Default::default()
    };
    (dir, cfg)
}

fn write_raw(dir: &Path, name: &str, content: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(name), content).unwrap();
}

const EQUITY_HEADER: &str = "TradDt,TckrSymb,SctySrs,OpnPric,HghPric,LwPric,ClsPric,LastPric,\
                             PrvsClsgPric,TtlTradgVol,TtlTrfVal,TtlNbOfTxsExctd,ISIN";

#[test]
fn equity_build_creates_per_symbol_masters() {
    let (_dir, cfg) = temp_config();
    write_raw(
        &cfg.raw_equity_dir(),
        "BhavCopy_NSE_CM_0_0_0_20240102_F_0000.csv",
        &format!(
            "{EQUITY_HEADER}\n\
             2024-01-02,ABC,EQ,100,105,99,104,104,101,1000,104000,42,INE000A01001\n\
             2024-01-02,XYZ,EQ,50,55,49,54,54,51,2000,108000,37,INE111B02002\n\
             2024-01-02,JUNK,BE,10,11,9,10,10,10,10,100,1,INE222C03003\n"
        ),
    );

    let report = build_equity(&cfg).unwrap();

    assert_eq!(report.rows_read, 3);
    assert_eq!(report.rows_filtered_out, 1);
    assert_eq!(report.entities_created, 2);
    assert_eq!(report.rows_appended, 2);

    let store = MasterStore::new(cfg.master_equity_dir());
    assert_eq!(store.entities().unwrap(), vec!["ABC", "XYZ"]);

    let abc = store.load("ABC", &EQUITY).unwrap().unwrap();
    assert_eq!(abc.height(), 1);
    let dates = abc.column("DATE").unwrap().i64().unwrap();
    assert_eq!(dates.get(0), Some(20240102));
    assert!(!store.exists("JUNK"));
}

#[test]
fn equity_rebuild_overrides_and_extends() {
    let (_dir, cfg) = temp_config();
    write_raw(
        &cfg.raw_equity_dir(),
        "BhavCopy_NSE_CM_0_0_0_20240102_F_0000.csv",
        &format!(
            "{EQUITY_HEADER}\n\
             2024-01-02,ABC,EQ,100,105,99,104,104,101,1000,104000,42,INE000A01001\n"
        ),
    );
    build_equity(&cfg).unwrap();

    // Next trading day's file revises 2024-01-02 and adds 2024-01-03.
    sleep(Duration::from_millis(20));
    write_raw(
        &cfg.raw_equity_dir(),
        "BhavCopy_NSE_CM_0_0_0_20240103_F_0000.csv",
        &format!(
            "{EQUITY_HEADER}\n\
             2024-01-02,ABC,EQ,100,106,99,105,105,101,1100,115000,44,INE000A01001\n\
             2024-01-03,ABC,EQ,105,112,104,110,110,105,1200,132000,50,INE000A01001\n"
        ),
    );
    let report = build_equity(&cfg).unwrap();
    assert_eq!(report.entities_updated, 1);
    assert_eq!(report.entities_created, 0);

    let store = MasterStore::new(cfg.master_equity_dir());
    let abc = store.load("ABC", &EQUITY).unwrap().unwrap();
    assert_eq!(abc.height(), 2);
    let closes: Vec<Option<f64>> = abc
        .column("CLOSE")
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(closes, vec![Some(105.0), Some(110.0)]);

    // Re-running the same latest file changes nothing.
    let again = build_equity(&cfg).unwrap();
    assert_eq!(again.entities_updated, 1);
    let abc_again = store.load("ABC", &EQUITY).unwrap().unwrap();
    assert!(abc.equals(&abc_again));
}

#[test]
fn equity_without_eq_rows_is_a_noop() {
    let (_dir, cfg) = temp_config();
    write_raw(
        &cfg.raw_equity_dir(),
        "BhavCopy_NSE_CM_0_0_0_20240102_F_0000.csv",
        &format!(
            "{EQUITY_HEADER}\n\
             2024-01-02,JUNK,BE,10,11,9,10,10,10,10,100,1,INE222C03003\n"
        ),
    );

    let report = build_equity(&cfg).unwrap();
    assert!(report.is_noop());
    assert_eq!(report.rows_filtered_out, 1);
    assert!(!cfg.master_equity_dir().exists());
}

#[test]
fn equity_missing_raw_file_is_a_noop() {
    let (_dir, cfg) = temp_config();
    let report = build_equity(&cfg).unwrap();
    assert!(report.is_noop());
    assert!(report.source_file.is_none());
}

#[test]
fn futures_build_splits_segments_and_stamps_filename_date() {
    let (_dir, cfg) = temp_config();
    write_raw(
        &cfg.raw_fo_dir(),
        "fo02012024.csv",
        "INSTRUMENT,SYMBOL,EXP_DATE,OPEN_PRICE,HI_PRICE,LO_PRICE,CLOSE_PRICE,OPEN_INT*,\
         TRD_VAL,TRD_QTY,NO_OF_CONT,NO_OF_TRADE\n\
         FUTSTK,RELIANCE,25-01-2024,2500,2550,2480,2530,12000,1000.5,500,100,300\n\
         FUTIDX,NIFTY,25-01-2024,21500,21600,21400,21550,50000,2000.5,700,200,400\n\
         OPTSTK,RELIANCE,25-01-2024,100,110,90,105,3000,10.5,50,10,30\n",
    );

    let report = build_futures(&cfg).unwrap();

    assert_eq!(report.rows_read, 3);
    assert_eq!(report.rows_filtered_out, 1);
    assert_eq!(report.entities_created, 2);

    let stock = MasterStore::new(cfg.master_futures_dir(Segment::Stock));
    let reliance = stock.load("RELIANCE", &FUTURES).unwrap().unwrap();
    assert_eq!(reliance.height(), 1);
    let trade_dates = reliance.column("TRADE_DATE").unwrap().i64().unwrap();
    assert_eq!(trade_dates.get(0), Some(20240102));
    let exp_dates = reliance.column("EXP_DATE").unwrap().i64().unwrap();
    assert_eq!(exp_dates.get(0), Some(20240125));

    let index = MasterStore::new(cfg.master_futures_dir(Segment::Index));
    assert_eq!(index.entities().unwrap(), vec!["NIFTY"]);
}

#[test]
fn options_build_keeps_last_duplicate_and_splits_segments() {
    let (_dir, cfg) = temp_config();
    write_raw(
        &cfg.raw_fo_dir(),
        "op02012024.csv",
        "INSTRUMENT,SYMBOL,EXP_DATE,STR_PRICE,OPT_TYPE,OPEN_PRICE,HI_PRICE,LO_PRICE,\
         CLOSE_PRICE,OPEN_INT*,TRD_QTY,NO_OF_CONT,NO_OF_TRADE,NOTION_VAL,PR_VAL\n\
         OPTSTK,RELIANCE,25-01-2024,2500,CE,100,110,90,105,3000,50,10,30,1000,10.5\n\
         OPTSTK,RELIANCE,25-01-2024,2500,CE,100,110,90,105,4500,60,12,33,1200,11.5\n\
         OPTIDX,NIFTY,25-01-2024,21500,PE,80,85,70,75,9000,100,20,60,2000,20.0\n",
    );

    let report = build_options(&cfg).unwrap();
    assert_eq!(report.entities_created, 2);

    let stock = MasterStore::new(cfg.master_options_dir(Segment::Stock));
    let reliance = stock.load("RELIANCE", &OPTIONS).unwrap().unwrap();
    assert_eq!(reliance.height(), 1);
    let oi = reliance.column("OPEN_INT").unwrap().i64().unwrap();
    assert_eq!(oi.get(0), Some(4500));

    let index = MasterStore::new(cfg.master_options_dir(Segment::Index));
    let nifty = index.load("NIFTY", &OPTIONS).unwrap().unwrap();
    let opt_types = nifty.column("OPT_TYPE").unwrap().str().unwrap();
    assert_eq!(opt_types.get(0), Some("PE"));
}

#[test]
fn delivery_appends_into_existing_masters_only() {
    let (_dir, cfg) = temp_config();

    // Seed one existing symbol master.
    let seed = df!(
        "TRADE_DATE" => [20240101i64],
        "RECORD_TYPE" => [20i64],
        "SR_NO" => [1i64],
        "SYMBOL" => ["ABC"],
        "SERIES" => ["EQ"],
        "TRADED_QTY" => [900i64],
        "DELIVERABLE_QTY" => [300i64],
        "DELIVERY_PCT" => [33.33],
    )
    .unwrap();
    let store = MasterStore::new(cfg.master_delivery_dir());
    store.save("ABC", &seed).unwrap();

    let mut dat = Vec::new();
    dat.extend_from_slice(b"Record Type,Sr No\n");
    dat.extend_from_slice(b"20,1,ABC,EQ,1000,400,40.00\n");
    dat.extend_from_slice(b"20,2,XYZ,EQ,500,100,20.00\n");
    dat.extend_from_slice(b"20,3,NOPE,BE,100,50,50.00\n");
    fs::create_dir_all(cfg.raw_mto_dir()).unwrap();
    fs::write(cfg.raw_mto_dir().join("MTO_02012024.DAT"), dat).unwrap();

    let report = build_delivery(&cfg).unwrap();

    // BE row filtered, XYZ skipped (no master), ABC appended.
    assert_eq!(report.rows_filtered_out, 1);
    assert_eq!(report.entities_updated, 1);
    assert_eq!(report.entities_skipped, 1);
    assert_eq!(report.rows_skipped, 1);
    assert_eq!(report.entities_created, 0);

    assert!(!store.exists("XYZ"));
    let abc = store.load("ABC", &DELIVERY).unwrap().unwrap();
    assert_eq!(abc.height(), 2);
    let dates: Vec<Option<i64>> = abc
        .column("TRADE_DATE")
        .unwrap()
        .i64()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(dates, vec![Some(20240101), Some(20240102)]);
}

#[test]
fn delivery_requires_an_existing_master_directory() {
    let (_dir, cfg) = temp_config();
    fs::create_dir_all(cfg.raw_mto_dir()).unwrap();
    fs::write(
        cfg.raw_mto_dir().join("MTO_02012024.DAT"),
        b"20,1,ABC,EQ,1000,400,40.00\n",
    )
    .unwrap();

    assert!(build_delivery(&cfg).is_err());
}

#[test]
fn index_build_merges_into_one_global_master() {
    let (_dir, cfg) = temp_config();
    write_raw(
        &cfg.raw_index_dir(),
        "indices_ohlc_eod_20240102.csv",
        "TRADE_DATE,INDEX_NAME,OPEN,HIGH,LOW,CLOSE,PCT_CHANGE\n\
         20240102,NIFTY 50,21500,21600,21400,21550.5,0.45\n\
         20240102,NIFTY BANK,46000,46500,45800,46200,0.5\n",
    );

    let report = build_index(&cfg).unwrap();
    assert_eq!(report.rows_read, 2);
    assert_eq!(report.rows_filtered_out, 1);
    assert_eq!(report.entities_created, 1);

    let store = MasterStore::new(cfg.master_index_dir());
    let master = store.load(INDEX_MASTER_ENTITY, &INDEX_MASTER).unwrap().unwrap();
    assert_eq!(master.height(), 1);
    let symbols = master.column("SYMBOL").unwrap().str().unwrap();
    assert_eq!(symbols.get(0), Some("NIFTY 50"));

    // Next day's snapshot revises the 2nd and adds the 3rd.
    sleep(Duration::from_millis(20));
    write_raw(
        &cfg.raw_index_dir(),
        "indices_ohlc_eod_20240103.csv",
        "TRADE_DATE,INDEX_NAME,OPEN,HIGH,LOW,CLOSE,PCT_CHANGE\n\
         20240102,NIFTY 50,21500,21600,21400,21555.0,0.47\n\
         20240103,NIFTY 50,21560,21700,21500,21650.0,0.44\n",
    );
    let report = build_index(&cfg).unwrap();
    assert_eq!(report.entities_updated, 1);

    let master = store.load(INDEX_MASTER_ENTITY, &INDEX_MASTER).unwrap().unwrap();
    assert_eq!(master.height(), 2);
    let closes: Vec<Option<f64>> = master
        .column("CLOSE")
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(closes, vec![Some(21555.0), Some(21650.0)]);
}

#[test]
fn index_build_with_nothing_allowlisted_is_a_noop() {
    let (_dir, mut cfg) = temp_config();
    cfg.index_allowlist = vec!["NIFTY NEXT 50".to_string()];
    write_raw(
        &cfg.raw_index_dir(),
        "indices_ohlc_eod_20240102.csv",
        "TRADE_DATE,INDEX_NAME,OPEN,HIGH,LOW,CLOSE,PCT_CHANGE\n\
         20240102,NIFTY 50,21500,21600,21400,21550.5,0.45\n",
    );

    let report = build_index(&cfg).unwrap();
    assert!(report.is_noop());
    assert_eq!(report.rows_filtered_out, 1);
    assert!(!cfg.master_index_dir().exists());
}
