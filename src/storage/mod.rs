mod error;
mod ledger;
mod reports;

#[cfg(test)]
mod tests;

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::coverage::CoverageReport;
use crate::guidance::GuidanceDocument;
use crate::model::{ParsedDocument, SegmentedDocument};
use crate::util::sha256_hex;

pub use error::{StoreError, StoreResult};
pub use ledger::{Ledger, LedgerEntry, LedgerTypeCount};
pub use reports::{ValidationReport, ValidationStage};

const INTERMEDIATE_DIR: &str = "intermediate";
const FINAL_DIR: &str = "final";
const VALIDATION_REPORTS_DIR: &str = "validation-reports";
const COVERAGE_REPORTS_DIR: &str = "coverage-reports";
const LEDGER_FILE: &str = "ledger.sqlite";
const FINAL_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Parsed,
    Segmented,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Parsed => "parsed",
            ArtifactKind::Segmented => "segmented",
        }
    }

    fn file_name(self) -> String {
        format!("{}.json", self.as_str())
    }

    fn sidecar_name(self) -> String {
        format!("metadata-{}.json", self.as_str())
    }

    fn label(self) -> &'static str {
        match self {
            ArtifactKind::Parsed => "parsed document",
            ArtifactKind::Segmented => "segmented document",
        }
    }
}

/// An intermediate artifact that is stored under a per-document version number.
pub trait VersionedArtifact: Serialize + DeserializeOwned {
    const KIND: ArtifactKind;

    fn document_id(&self) -> &str;
    fn set_version(&mut self, version: u32);
}

impl VersionedArtifact for ParsedDocument {
    const KIND: ArtifactKind = ArtifactKind::Parsed;

    fn document_id(&self) -> &str {
        &self.metadata.document_id
    }

    fn set_version(&mut self, version: u32) {
        self.metadata.version = version;
    }
}

impl VersionedArtifact for SegmentedDocument {
    const KIND: ArtifactKind = ArtifactKind::Segmented;

    fn document_id(&self) -> &str {
        &self.metadata.document_id
    }

    fn set_version(&mut self, version: u32) {
        self.metadata.version = version;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageMetadata {
    pub document_id: String,
    pub version: u32,
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub stored_at: DateTime<Utc>,
    pub size: u64,
    #[serde(default)]
    pub checksum: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FinalFormat {
    #[default]
    #[serde(alias = "yml")]
    #[value(alias = "yml")]
    Yaml,
    Json,
}

impl FinalFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            FinalFormat::Yaml => "yaml",
            FinalFormat::Json => "json",
        }
    }

    pub fn extension(self) -> &'static str {
        self.as_str()
    }

    pub fn encode<T: Serialize>(self, value: &T) -> StoreResult<Vec<u8>> {
        match self {
            FinalFormat::Yaml => serde_yaml::to_string(value)
                .map(String::into_bytes)
                .map_err(|err| StoreError::Encode {
                    what: "final document as yaml",
                    message: err.to_string(),
                }),
            FinalFormat::Json => {
                let mut data =
                    serde_json::to_vec_pretty(value).map_err(|err| StoreError::Encode {
                        what: "final document as json",
                        message: err.to_string(),
                    })?;
                data.push(b'\n');
                Ok(data)
            }
        }
    }
}

impl FromStr for FinalFormat {
    type Err = StoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(FinalFormat::Yaml),
            "json" => Ok(FinalFormat::Json),
            _ => Err(StoreError::UnsupportedFormat(value.to_string())),
        }
    }
}

/// Filesystem-backed artifact store rooted at `base_dir`.
#[derive(Debug)]
pub struct Storage {
    base_dir: PathBuf,
    ledger: Ledger,
}

impl Storage {
    pub fn open(base_dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)
            .map_err(|err| StoreError::io("create directory", &base_dir, err))?;
        let ledger = Ledger::open(&base_dir.join(LEDGER_FILE))?;
        Ok(Self { base_dir, ledger })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn save_parsed(&self, doc: &mut ParsedDocument) -> StoreResult<u32> {
        self.save_versioned(doc, None)
    }

    pub fn save_segmented(&self, doc: &mut SegmentedDocument) -> StoreResult<u32> {
        self.save_versioned(doc, None)
    }

    pub fn save_segmented_with_label(
        &self,
        doc: &mut SegmentedDocument,
        label: &str,
    ) -> StoreResult<u32> {
        self.save_versioned(doc, Some(label))
    }

    pub fn load_parsed(&self, document_id: &str, version: u32) -> StoreResult<ParsedDocument> {
        self.load_versioned(document_id, version)
    }

    pub fn load_segmented(
        &self,
        document_id: &str,
        version: u32,
    ) -> StoreResult<SegmentedDocument> {
        self.load_versioned(document_id, version)
    }

    /// Allocates the next version for the artifact's document and writes it.
    /// The artifact file is created exclusively; if another writer already
    /// holds the computed version the next integer is tried.
    pub fn save_versioned<A: VersionedArtifact>(
        &self,
        doc: &mut A,
        label: Option<&str>,
    ) -> StoreResult<u32> {
        let kind = A::KIND;
        let document_id = doc.document_id().to_string();
        check_document_id(&document_id)?;
        let mut version = self.latest_version(&document_id, kind)? + 1;

        loop {
            let dir = self.version_dir(&document_id, version);
            fs::create_dir_all(&dir).map_err(|err| StoreError::io("create directory", &dir, err))?;

            doc.set_version(version);
            let mut data = serde_json::to_vec_pretty(&*doc).map_err(|err| StoreError::Encode {
                what: kind.label(),
                message: err.to_string(),
            })?;
            data.push(b'\n');

            let path = dir.join(kind.file_name());
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    warn!(
                        document_id = %document_id,
                        artifact = kind.as_str(),
                        version,
                        "version already claimed; trying next"
                    );
                    version += 1;
                    continue;
                }
                Err(err) => return Err(StoreError::io("create", &path, err)),
            };
            file.write_all(&data)
                .map_err(|err| StoreError::io("write", &path, err))?;

            let meta = StorageMetadata {
                document_id: document_id.clone(),
                version,
                artifact_type: kind.as_str().to_string(),
                stored_at: Utc::now(),
                size: data.len() as u64,
                checksum: sha256_hex(&data),
                description: label.unwrap_or_default().to_string(),
            };
            write_sidecar(&dir.join(kind.sidecar_name()), &meta)?;
            self.record(&document_id, kind.as_str(), Some(version), &path, &data, label)?;

            debug!(
                document_id = %document_id,
                artifact = kind.as_str(),
                version,
                path = %path.display(),
                "stored artifact"
            );
            return Ok(version);
        }
    }

    /// Loads the requested version; `0` resolves to the latest one.
    pub fn load_versioned<A: VersionedArtifact>(
        &self,
        document_id: &str,
        version: u32,
    ) -> StoreResult<A> {
        check_document_id(document_id)?;
        let kind = A::KIND;
        let version = if version == 0 {
            self.latest_version(document_id, kind)?
        } else {
            version
        };
        if version == 0 {
            return Err(StoreError::not_found(kind.label(), document_id));
        }

        let path = self.version_dir(document_id, version).join(kind.file_name());
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::not_found(
                    format!("{} v{version}", kind.label()),
                    document_id,
                ));
            }
            Err(err) => return Err(StoreError::io("read", &path, err)),
        };

        serde_json::from_slice(&data).map_err(|source| StoreError::Json { path, source })
    }

    /// Writes the final artifact, replacing any earlier one in either format.
    pub fn save_final<T: Serialize>(
        &self,
        document_id: &str,
        data: &T,
        format: FinalFormat,
    ) -> StoreResult<PathBuf> {
        check_document_id(document_id)?;
        let dir = self.base_dir.join(FINAL_DIR);
        fs::create_dir_all(&dir).map_err(|err| StoreError::io("create directory", &dir, err))?;

        let bytes = format.encode(data)?;
        let path = dir.join(format!("{document_id}.{}", format.extension()));
        fs::write(&path, &bytes).map_err(|err| StoreError::io("write", &path, err))?;

        for extension in FINAL_EXTENSIONS {
            if extension == format.extension() {
                continue;
            }
            let stale = dir.join(format!("{document_id}.{extension}"));
            match fs::remove_file(&stale) {
                Ok(()) => debug!(path = %stale.display(), "removed stale final artifact"),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(StoreError::io("remove", &stale, err)),
            }
        }

        self.record(document_id, "final", None, &path, &bytes, None)?;
        Ok(path)
    }

    pub fn save_final_with_validation<T: Serialize>(
        &self,
        document_id: &str,
        data: &T,
        format: FinalFormat,
        report: Option<&ValidationReport>,
    ) -> StoreResult<PathBuf> {
        let path = self.save_final(document_id, data, format)?;
        if let Some(report) = report {
            self.save_validation_report(report)?;
        }
        Ok(path)
    }

    pub fn load_final(&self, document_id: &str) -> StoreResult<GuidanceDocument> {
        check_document_id(document_id)?;
        let dir = self.base_dir.join(FINAL_DIR);
        for extension in FINAL_EXTENSIONS {
            let path = dir.join(format!("{document_id}.{extension}"));
            let data = match fs::read(&path) {
                Ok(data) => data,
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => return Err(StoreError::io("read", &path, err)),
            };

            return if extension == "json" {
                serde_json::from_slice(&data).map_err(|source| StoreError::Json { path, source })
            } else {
                serde_yaml::from_slice(&data).map_err(|source| StoreError::Yaml { path, source })
            };
        }

        Err(StoreError::not_found("final document", document_id))
    }

    /// Stored versions of one artifact kind, newest first. A document with no
    /// history yields an empty list.
    pub fn list_versions(
        &self,
        document_id: &str,
        kind: ArtifactKind,
    ) -> StoreResult<Vec<StorageMetadata>> {
        check_document_id(document_id)?;
        let doc_dir = self.base_dir.join(INTERMEDIATE_DIR).join(document_id);
        let entries = match fs::read_dir(&doc_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::io("read directory", &doc_dir, err)),
        };

        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| StoreError::io("read directory", &doc_dir, err))?;
            let dir = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            if !dir.is_dir() || parse_version_dir(&name).is_none() {
                continue;
            }

            let candidates = [dir.join(kind.sidecar_name()), dir.join("metadata.json")];
            for sidecar in candidates {
                if !sidecar.is_file() {
                    continue;
                }
                match read_sidecar(&sidecar) {
                    Ok(meta) if meta.artifact_type == kind.as_str() => {
                        versions.push(meta);
                        break;
                    }
                    Ok(_) => {}
                    Err(reason) => {
                        debug!(path = %sidecar.display(), reason = %reason, "skipping unreadable sidecar");
                    }
                }
            }
        }

        versions.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(versions)
    }

    pub fn latest_version(&self, document_id: &str, kind: ArtifactKind) -> StoreResult<u32> {
        Ok(self
            .list_versions(document_id, kind)?
            .first()
            .map(|meta| meta.version)
            .unwrap_or(0))
    }

    /// Document IDs that have any intermediate or final artifact, sorted.
    pub fn document_ids(&self) -> StoreResult<Vec<String>> {
        let mut ids = Vec::new();

        let intermediate = self.base_dir.join(INTERMEDIATE_DIR);
        match fs::read_dir(&intermediate) {
            Ok(entries) => {
                for entry in entries {
                    let entry =
                        entry.map_err(|err| StoreError::io("read directory", &intermediate, err))?;
                    if entry.path().is_dir() {
                        ids.push(entry.file_name().to_string_lossy().into_owned());
                    }
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(StoreError::io("read directory", &intermediate, err)),
        }

        let final_dir = self.base_dir.join(FINAL_DIR);
        match fs::read_dir(&final_dir) {
            Ok(entries) => {
                for entry in entries {
                    let entry =
                        entry.map_err(|err| StoreError::io("read directory", &final_dir, err))?;
                    let path = entry.path();
                    let known = path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .is_some_and(|ext| FINAL_EXTENSIONS.contains(&ext));
                    if let (true, Some(stem)) = (known, path.file_stem()) {
                        ids.push(stem.to_string_lossy().into_owned());
                    }
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(StoreError::io("read directory", &final_dir, err)),
        }

        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    pub fn save_validation_report(&self, report: &ValidationReport) -> StoreResult<PathBuf> {
        check_document_id(&report.document_id)?;
        let dir = self
            .base_dir
            .join(VALIDATION_REPORTS_DIR)
            .join(&report.document_id);
        let (path, data) =
            reports::write_report(&dir, report.stage.as_str(), report.timestamp, report)?;
        self.record(
            &report.document_id,
            "validation-report",
            report.source_version,
            &path,
            &data,
            Some(report.stage.as_str()),
        )?;
        info!(
            document_id = %report.document_id,
            stage = report.stage.as_str(),
            path = %path.display(),
            "saved validation report"
        );
        Ok(path)
    }

    /// Validation reports for a document, newest first.
    pub fn load_validation_reports(&self, document_id: &str) -> StoreResult<Vec<ValidationReport>> {
        check_document_id(document_id)?;
        let dir = self.base_dir.join(VALIDATION_REPORTS_DIR).join(document_id);
        let mut reports: Vec<ValidationReport> = reports::read_reports(&dir, "")?;
        reports.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(reports)
    }

    pub fn save_coverage_report(&self, report: &CoverageReport) -> StoreResult<PathBuf> {
        check_document_id(&report.document_id)?;
        let dir = self.base_dir.join(COVERAGE_REPORTS_DIR);
        let (path, data) =
            reports::write_report(&dir, &report.document_id, report.timestamp, report)?;
        self.record(
            &report.document_id,
            "coverage-report",
            None,
            &path,
            &data,
            None,
        )?;
        info!(
            document_id = %report.document_id,
            path = %path.display(),
            "saved coverage report"
        );
        Ok(path)
    }

    /// Coverage reports for a document, newest first.
    pub fn load_coverage_reports(&self, document_id: &str) -> StoreResult<Vec<CoverageReport>> {
        check_document_id(document_id)?;
        let dir = self.base_dir.join(COVERAGE_REPORTS_DIR);
        let mut reports: Vec<CoverageReport> =
            reports::read_reports(&dir, &format!("{document_id}-"))?;
        reports.retain(|report| report.document_id == document_id);
        reports.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(reports)
    }

    pub fn ledger_entries(&self, document_id: &str) -> StoreResult<Vec<LedgerEntry>> {
        self.ledger.entries_for(document_id)
    }

    pub fn ledger_summary(&self) -> StoreResult<Vec<LedgerTypeCount>> {
        self.ledger.summary()
    }

    fn version_dir(&self, document_id: &str, version: u32) -> PathBuf {
        self.base_dir
            .join(INTERMEDIATE_DIR)
            .join(document_id)
            .join(format!("v{version}"))
    }

    fn record(
        &self,
        document_id: &str,
        artifact_type: &str,
        version: Option<u32>,
        path: &Path,
        data: &[u8],
        description: Option<&str>,
    ) -> StoreResult<()> {
        self.ledger.record(&LedgerEntry {
            document_id: document_id.to_string(),
            artifact_type: artifact_type.to_string(),
            version,
            path: path.display().to_string(),
            sha256: sha256_hex(data),
            size: data.len() as u64,
            description: description.map(str::to_string),
            recorded_at: Utc::now(),
        })
    }
}

/// Document ids become single path components under the base directory.
fn check_document_id(document_id: &str) -> StoreResult<()> {
    let reason = if document_id.trim().is_empty() {
        "must not be empty"
    } else if document_id.contains(['/', '\\']) {
        "must not contain path separators"
    } else if document_id.contains("..") {
        "must not contain '..'"
    } else if Path::new(document_id).is_absolute() {
        "must not be an absolute path"
    } else {
        return Ok(());
    };
    Err(StoreError::InvalidDocumentId {
        document_id: document_id.to_string(),
        reason,
    })
}

fn parse_version_dir(name: &str) -> Option<u32> {
    name.strip_prefix('v')?.parse().ok()
}

fn write_sidecar(path: &Path, meta: &StorageMetadata) -> StoreResult<()> {
    let mut data = serde_json::to_vec_pretty(meta).map_err(|err| StoreError::Encode {
        what: "storage metadata",
        message: err.to_string(),
    })?;
    data.push(b'\n');
    fs::write(path, data).map_err(|err| StoreError::io("write", path, err))
}

fn read_sidecar(path: &Path) -> Result<StorageMetadata, String> {
    let data = fs::read(path).map_err(|err| err.to_string())?;
    serde_json::from_slice(&data).map_err(|err| err.to_string())
}
