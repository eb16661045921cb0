//! Master store accessor — one flat CSV per entity.
//!
//! Layout: `{root}/{SYMBOL}.csv`. Saves are full-file overwrites; there is no
//! temp-file shuffle, matching the batch process this store serves (a crash
//! mid-write may corrupt the one entity being written, and the next clean run
//! repairs it).
//!
//! Loads re-validate against the class contract: persisted files are read
//! with every column as a string and coerced once at this boundary, so the
//! merge engine never sees drifted types from prior runs.

use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::EtlError;
use crate::normalize;
use crate::schema::ClassSpec;

pub struct MasterStore {
    root: PathBuf,
}

impl MasterStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entity_path(&self, entity: &str) -> PathBuf {
        self.root.join(format!("{entity}.csv"))
    }

    pub fn exists(&self, entity: &str) -> bool {
        self.entity_path(entity).exists()
    }

    /// Load an entity's dataset, or `None` if it has no persisted store.
    pub fn load(&self, entity: &str, spec: &ClassSpec) -> Result<Option<DataFrame>, EtlError> {
        let path = self.entity_path(entity);
        if !path.exists() {
            return Ok(None);
        }
        let raw = read_csv_str(&path)?;
        let df = normalize::coerce_to_contract(raw, spec)?;
        Ok(Some(df))
    }

    /// Persist an entity's dataset, fully replacing any previous file.
    pub fn save(&self, entity: &str, df: &DataFrame) -> Result<(), EtlError> {
        fs::create_dir_all(&self.root).map_err(|e| {
            EtlError::Store(format!("create master dir {}: {e}", self.root.display()))
        })?;
        let path = self.entity_path(entity);
        let file = fs::File::create(&path)
            .map_err(|e| EtlError::Store(format!("create {}: {e}", path.display())))?;
        CsvWriter::new(file)
            .include_header(true)
            .finish(&mut df.clone())
            .map_err(|e| EtlError::Store(format!("write {}: {e}", path.display())))?;
        Ok(())
    }

    /// Sorted entity names present in the store (empty if the root is absent).
    pub fn entities(&self) -> Result<Vec<String>, EtlError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.root)
            .map_err(|e| EtlError::Store(format!("read dir {}: {e}", self.root.display())))?;
        let mut out = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| EtlError::Store(format!("dir entry: {e}")))?;
            let path = entry.path();
            let is_csv = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("csv"))
                .unwrap_or(false);
            if !is_csv {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                out.push(stem.to_string());
            }
        }
        out.sort();
        Ok(out)
    }
}

/// Read a CSV with every column as a string; typing happens against the class
/// contract afterwards.
pub fn read_csv_str(path: &Path) -> Result<DataFrame, EtlError> {
    LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .finish()
        .map_err(|e| EtlError::RawRead(format!("open {}: {e}", path.display())))?
        .collect()
        .map_err(|e| EtlError::RawRead(format!("read {}: {e}", path.display())))
}
