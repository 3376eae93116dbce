use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{StoreError, StoreResult};
use crate::util::utc_compact_string;
use crate::validator::{ValidationResult, Violation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStage {
    Convert,
    Enhance,
    Validate,
}

impl ValidationStage {
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationStage::Convert => "convert",
            ValidationStage::Enhance => "enhance",
            ValidationStage::Validate => "validate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub document_id: String,
    pub timestamp: DateTime<Utc>,
    pub strict_mode: bool,
    pub valid: bool,
    pub error_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Violation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_version: Option<u32>,
    pub stage: ValidationStage,
}

impl ValidationReport {
    pub fn new(
        document_id: &str,
        stage: ValidationStage,
        strict_mode: bool,
        result: &ValidationResult,
        source_version: Option<u32>,
    ) -> Self {
        Self {
            document_id: document_id.to_string(),
            timestamp: Utc::now(),
            strict_mode,
            valid: result.valid,
            error_count: result.errors.len(),
            errors: result.errors.clone(),
            source_version,
            stage,
        }
    }
}

/// Writes `value` as `{stem}.json` in `dir`, never replacing an existing
/// report; same-second collisions get a numeric suffix.
pub(crate) fn write_report<T: Serialize>(
    dir: &Path,
    stem: &str,
    timestamp: DateTime<Utc>,
    value: &T,
) -> StoreResult<(PathBuf, Vec<u8>)> {
    fs::create_dir_all(dir).map_err(|err| StoreError::io("create directory", dir, err))?;

    let mut data = serde_json::to_vec_pretty(value).map_err(|err| StoreError::Encode {
        what: "report",
        message: err.to_string(),
    })?;
    data.push(b'\n');

    let base = format!("{stem}-{}", utc_compact_string(timestamp));
    let mut attempt = 1u32;
    loop {
        let name = if attempt == 1 {
            format!("{base}.json")
        } else {
            format!("{base}-{attempt}.json")
        };
        let path = dir.join(name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(&data)
                    .map_err(|err| StoreError::io("write", &path, err))?;
                return Ok((path, data));
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                attempt += 1;
            }
            Err(err) => return Err(StoreError::io("create", &path, err)),
        }
    }
}

/// Reads every `*.json` file in `dir` whose name starts with `prefix`.
/// A missing directory yields no reports; unreadable files are skipped.
pub(crate) fn read_reports<T: DeserializeOwned>(dir: &Path, prefix: &str) -> StoreResult<Vec<T>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(StoreError::io("read directory", dir, err)),
    };

    let mut reports = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| StoreError::io("read directory", dir, err))?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if !path.is_file() || !name.ends_with(".json") || !name.starts_with(prefix) {
            continue;
        }

        let parsed = fs::read(&path)
            .map_err(|err| err.to_string())
            .and_then(|bytes| serde_json::from_slice::<T>(&bytes).map_err(|err| err.to_string()));
        match parsed {
            Ok(report) => reports.push(report),
            Err(reason) => debug!(path = %path.display(), reason = %reason, "skipping unreadable report"),
        }
    }

    Ok(reports)
}
