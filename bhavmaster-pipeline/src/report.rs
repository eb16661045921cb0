//! Build run reports — the summary-counter contract of each build.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use bhavmaster_core::AssetClass;

/// Counters for one build run of one asset class.
///
/// `rows_skipped`/`entities_skipped` only move under the append-only store
/// policy (delivery), where incoming symbols without an existing master are
/// silently skipped rather than created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub class: String,
    pub source_file: Option<String>,
    pub rows_read: usize,
    pub rows_dropped_null_key: usize,
    pub rows_filtered_out: usize,
    pub rows_appended: usize,
    pub rows_skipped: usize,
    pub entities_created: usize,
    pub entities_updated: usize,
    pub entities_skipped: usize,
}

impl BuildReport {
    pub fn new(class: AssetClass) -> Self {
        Self {
            class: class.name().to_string(),
            source_file: None,
            rows_read: 0,
            rows_dropped_null_key: 0,
            rows_filtered_out: 0,
            rows_appended: 0,
            rows_skipped: 0,
            entities_created: 0,
            entities_updated: 0,
            entities_skipped: 0,
        }
    }

    /// True when the run touched no store (no raw file, or nothing survived
    /// filtering).
    pub fn is_noop(&self) -> bool {
        self.entities_created == 0 && self.entities_updated == 0
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Build Report: {} ===", self.class)?;
        match &self.source_file {
            Some(src) => writeln!(f, "Source:           {src}")?,
            None => writeln!(f, "Source:           (no raw file found)")?,
        }
        writeln!(f, "Rows read:        {}", self.rows_read)?;
        writeln!(f, "Dropped null key: {}", self.rows_dropped_null_key)?;
        writeln!(f, "Filtered out:     {}", self.rows_filtered_out)?;
        writeln!(f, "Rows appended:    {}", self.rows_appended)?;
        writeln!(f, "Rows skipped:     {}", self.rows_skipped)?;
        writeln!(
            f,
            "Entities:         {} created, {} updated, {} skipped",
            self.entities_created, self.entities_updated, self.entities_skipped
        )?;
        if self.is_noop() {
            writeln!(f, "No store mutations.")?;
        }
        Ok(())
    }
}

/// Persist a report as a timestamped JSON artifact under `reports_dir`.
pub fn save_report(report: &BuildReport, reports_dir: &Path) -> Result<PathBuf, std::io::Error> {
    std::fs::create_dir_all(reports_dir)?;
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = reports_dir.join(format!("{}_{stamp}.json", report.class));
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    std::fs::write(&path, json)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_report_is_noop() {
        let report = BuildReport::new(AssetClass::Equity);
        assert_eq!(report.class, "equity");
        assert!(report.is_noop());
    }

    #[test]
    fn display_names_the_skip_counters() {
        let mut report = BuildReport::new(AssetClass::Delivery);
        report.source_file = Some("MTO_02012024.DAT".to_string());
        report.rows_read = 100;
        report.rows_appended = 80;
        report.rows_skipped = 20;
        report.entities_updated = 4;
        report.entities_skipped = 1;

        let text = report.to_string();
        assert!(text.contains("delivery"));
        assert!(text.contains("Rows skipped:     20"));
        assert!(text.contains("4 updated, 1 skipped"));
        assert!(!text.contains("No store mutations"));
    }

    #[test]
    fn save_report_writes_json_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let mut report = BuildReport::new(AssetClass::Index);
        report.rows_read = 7;

        let path = save_report(&report, dir.path()).unwrap();
        assert!(path.exists());

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: BuildReport = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.class, "index");
        assert_eq!(parsed.rows_read, 7);
    }
}
