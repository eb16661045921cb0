//! Latest-raw-file discovery.
//!
//! Each build processes exactly one "latest" raw file per class, selected by
//! filesystem modification time with a deterministic filename tie-break.
//! Futures/options and delivery filenames embed the trade date as ddmmyyyy;
//! that date is authoritative for those classes.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Newest file in `dir` whose name starts with `prefix` and whose extension
/// matches `ext` (case-insensitive). `None` when the directory is absent or
/// holds no match. Ties on mtime resolve to the lexicographically later name.
pub fn latest_file(dir: &Path, prefix: &str, ext: &str) -> Result<Option<PathBuf>, std::io::Error> {
    if !dir.exists() {
        return Ok(None);
    }

    let mut best: Option<(SystemTime, String, PathBuf)> = None;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n.to_string(),
            None => continue,
        };
        if !name.starts_with(prefix) {
            continue;
        }
        let ext_matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(ext))
            .unwrap_or(false);
        if !ext_matches {
            continue;
        }

        let mtime = entry.metadata()?.modified()?;
        let newer = match &best {
            None => true,
            Some((best_mtime, best_name, _)) => (mtime, &name) > (*best_mtime, best_name),
        };
        if newer {
            best = Some((mtime, name, path));
        }
    }

    Ok(best.map(|(_, _, path)| path))
}

/// Extract a ddmmyyyy digit run from a filename stem as integer yyyymmdd.
///
/// Scans digit runs left to right and returns the first 8-digit run that
/// parses as a valid ddmmyyyy calendar date.
pub fn filename_date_yyyymmdd(path: &Path) -> Option<i64> {
    let stem = path.file_stem()?.to_str()?;
    let bytes = stem.as_bytes();

    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i - start == 8 {
            if let Ok(date) = NaiveDate::parse_from_str(&stem[start..i], "%d%m%Y") {
                return date.format("%Y%m%d").to_string().parse().ok();
            }
        }
    }
    None
}
