//! Raw-file fetcher for the exchange archive hosts.
//!
//! Fetches the latest published raw file for each source, backtracking from
//! today over weekdays until something is published (bounded lookback).
//! Archive payloads are saved byte-for-byte; zip payloads are sanity-checked
//! by magic bytes but never extracted here. The index source is a JSON
//! snapshot API that is flattened into the raw CSV the cleaner consumes.
//!
//! Transport-level retry/backoff is deliberately absent; the only looping is
//! the trading-day backtrack.

use chrono::{Datelike, Local, NaiveDate, NaiveTime, Weekday};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::config::PipelineConfig;

const ARCHIVE_HOME: &str = "https://www.nseindia.com";
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no {feed} file published in the last {lookback} day(s)")]
    NotPublished { feed: &'static str, lookback: u32 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("write raw file: {0}")]
    Write(String),
}

/// The raw feeds the pipeline knows how to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawSource {
    CmBhavcopy,
    FoBhavcopy,
    MtoDelivery,
    IndexOhlc,
}

impl RawSource {
    pub fn name(&self) -> &'static str {
        match self {
            RawSource::CmBhavcopy => "cm_bhavcopy",
            RawSource::FoBhavcopy => "fo_bhavcopy",
            RawSource::MtoDelivery => "mto_delivery",
            RawSource::IndexOhlc => "index_ohlc",
        }
    }

    /// Where fetched files for this source land under the data root.
    pub fn out_dir(&self, cfg: &PipelineConfig) -> PathBuf {
        match self {
            // Zip archives are extracted externally into the unzip dirs.
            RawSource::CmBhavcopy | RawSource::FoBhavcopy => cfg.raw_archive_dir(),
            RawSource::MtoDelivery => cfg.raw_mto_dir(),
            RawSource::IndexOhlc => cfg.raw_index_dir(),
        }
    }

    fn filename(&self, date: NaiveDate) -> String {
        match self {
            RawSource::CmBhavcopy => format!(
                "BhavCopy_NSE_CM_0_0_0_{}_F_0000.csv.zip",
                date.format("%Y%m%d")
            ),
            RawSource::FoBhavcopy => format!("fo{}.zip", date.format("%d%m%Y")),
            RawSource::MtoDelivery => format!("MTO_{}.DAT", date.format("%d%m%Y")),
            RawSource::IndexOhlc => {
                format!("indices_ohlc_eod_{}.csv", date.format("%Y%m%d"))
            }
        }
    }

    fn url(&self, date: NaiveDate) -> String {
        match self {
            RawSource::CmBhavcopy => format!(
                "https://nsearchives.nseindia.com/content/cm/{}",
                self.filename(date)
            ),
            RawSource::FoBhavcopy => format!(
                "https://nsearchives.nseindia.com/archives/fo/mkt/{}",
                self.filename(date)
            ),
            RawSource::MtoDelivery => format!(
                "https://nsearchives.nseindia.com/archives/equities/mto/{}",
                self.filename(date)
            ),
            RawSource::IndexOhlc => format!("{ARCHIVE_HOME}/api/allIndices"),
        }
    }

    fn expects_zip(&self) -> bool {
        matches!(self, RawSource::CmBhavcopy | RawSource::FoBhavcopy)
    }
}

/// Result of one fetch: where the file is and which trade date it carries.
#[derive(Debug)]
pub struct FetchOutcome {
    pub path: PathBuf,
    pub trade_date: NaiveDate,
    pub already_present: bool,
}

pub struct Fetcher {
    client: reqwest::blocking::Client,
}

impl Fetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    /// Fetch the latest published file for a source into its raw directory.
    pub fn fetch_latest(
        &self,
        source: RawSource,
        cfg: &PipelineConfig,
    ) -> Result<FetchOutcome, FetchError> {
        let out_dir = source.out_dir(cfg);
        std::fs::create_dir_all(&out_dir)?;

        // Session warm-up; the archive host serves fine without it on most
        // days, so a failure here is not fatal.
        let _ = self
            .client
            .get(ARCHIVE_HOME)
            .header("Referer", ARCHIVE_HOME)
            .send();

        match source {
            RawSource::IndexOhlc => self.fetch_index_snapshot(source, &out_dir),
            _ => self.fetch_archive(source, &out_dir, cfg.fetch_lookback_days),
        }
    }

    fn fetch_archive(
        &self,
        source: RawSource,
        out_dir: &Path,
        lookback_days: u32,
    ) -> Result<FetchOutcome, FetchError> {
        let today = Local::now().date_naive();

        for offset in 0..lookback_days {
            let date = today - chrono::Duration::days(offset as i64);
            if is_weekend(date) {
                continue;
            }

            let out_path = out_dir.join(source.filename(date));
            if out_path.exists() {
                return Ok(FetchOutcome {
                    path: out_path,
                    trade_date: date,
                    already_present: true,
                });
            }

            let resp = match self
                .client
                .get(source.url(date))
                .header("Referer", format!("{ARCHIVE_HOME}/"))
                .send()
            {
                Ok(resp) => resp,
                // Not-yet-published dates often surface as transport-level
                // resets; keep backtracking.
                Err(_) => continue,
            };
            if !resp.status().is_success() {
                continue;
            }
            let body = resp.bytes()?;
            if !payload_looks_valid(&body, source.expects_zip()) {
                continue;
            }

            std::fs::write(&out_path, &body)
                .map_err(|e| FetchError::Write(format!("{}: {e}", out_path.display())))?;
            return Ok(FetchOutcome {
                path: out_path,
                trade_date: date,
                already_present: false,
            });
        }

        Err(FetchError::NotPublished {
            feed: source.name(),
            lookback: lookback_days,
        })
    }

    /// The index feed is a live JSON snapshot; flatten it into the raw CSV
    /// shape the cleaner consumes, stamped with the trade date it represents.
    fn fetch_index_snapshot(
        &self,
        source: RawSource,
        out_dir: &Path,
    ) -> Result<FetchOutcome, FetchError> {
        let now = Local::now();
        let trade_date = snapshot_trade_date(now.date_naive(), now.time());

        let out_path = out_dir.join(source.filename(trade_date));
        if out_path.exists() {
            return Ok(FetchOutcome {
                path: out_path,
                trade_date,
                already_present: true,
            });
        }

        let resp = self
            .client
            .get(source.url(trade_date))
            .header("Referer", format!("{ARCHIVE_HOME}/"))
            .send()?;
        let snapshot: serde_json::Value = resp.json()?;

        let df = snapshot_to_frame(&snapshot, trade_date)
            .map_err(FetchError::ResponseFormatChanged)?;

        let file = std::fs::File::create(&out_path)
            .map_err(|e| FetchError::Write(format!("{}: {e}", out_path.display())))?;
        CsvWriter::new(file)
            .include_header(true)
            .finish(&mut df.clone())
            .map_err(|e| FetchError::Write(format!("{}: {e}", out_path.display())))?;

        Ok(FetchOutcome {
            path: out_path,
            trade_date,
            already_present: false,
        })
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Which trade date a live snapshot taken at `(date, time)` represents:
/// today once the market has closed, otherwise the previous day, corrected
/// back off weekends either way.
fn snapshot_trade_date(date: NaiveDate, time: NaiveTime) -> NaiveDate {
    let market_close = NaiveTime::from_hms_opt(15, 30, 0).unwrap();
    let mut trade_date = if time >= market_close {
        date
    } else {
        date - chrono::Duration::days(1)
    };
    while is_weekend(trade_date) {
        trade_date -= chrono::Duration::days(1);
    }
    trade_date
}

fn payload_looks_valid(body: &[u8], expects_zip: bool) -> bool {
    if expects_zip {
        body.starts_with(b"PK") && body.len() > 1024
    } else {
        !body.is_empty()
    }
}

fn snapshot_to_frame(snapshot: &serde_json::Value, trade_date: NaiveDate) -> Result<DataFrame, String> {
    let entries = snapshot
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| "allIndices payload has no data array".to_string())?;

    let mut names: Vec<String> = Vec::new();
    let mut opens: Vec<Option<String>> = Vec::new();
    let mut highs: Vec<Option<String>> = Vec::new();
    let mut lows: Vec<Option<String>> = Vec::new();
    let mut closes: Vec<Option<String>> = Vec::new();
    let mut pct_changes: Vec<Option<String>> = Vec::new();

    for entry in entries {
        let Some(name) = entry.get("index").and_then(|v| v.as_str()) else {
            continue;
        };
        names.push(name.to_string());
        opens.push(cell(entry.get("open")));
        highs.push(cell(entry.get("high")));
        lows.push(cell(entry.get("low")));
        closes.push(cell(entry.get("last")));
        pct_changes.push(cell(entry.get("percentChange")));
    }

    if names.is_empty() {
        return Err("allIndices payload has no index entries".to_string());
    }

    let date_str = trade_date.format("%Y%m%d").to_string();
    let n = names.len();
    df!(
        "TRADE_DATE" => vec![date_str; n],
        "INDEX_NAME" => names,
        "OPEN" => opens,
        "HIGH" => highs,
        "LOW" => lows,
        "CLOSE" => closes,
        "PCT_CHANGE" => pct_changes,
    )
    .map_err(|e| format!("snapshot frame: {e}"))
}

/// Render a JSON scalar as a raw CSV cell; the cleaner owns numeric coercion.
fn cell(value: Option<&serde_json::Value>) -> Option<String> {
    match value {
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::String(s)) if s != "-" => Some(s.clone()),
        _ => None,
    }
}
