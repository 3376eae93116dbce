use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::open_storage;
use crate::config::PipelineConfig;
use crate::storage::ArtifactKind;

pub fn run(config: &PipelineConfig, args: StatusArgs) -> Result<()> {
    let storage = open_storage(config)?;
    info!(
        base_dir = %storage.base_dir().display(),
        strict = config.strict,
        format = config.format.as_str(),
        segmenter = config.segmenter.as_str(),
        parser = config.parser.as_str(),
        enhancer = config.enhancer.as_str(),
        "status requested"
    );

    let summary = storage.ledger_summary().context("failed to read ledger summary")?;
    if summary.is_empty() {
        warn!("ledger is empty; nothing has been stored yet");
    }
    for row in &summary {
        info!(
            artifact_type = %row.artifact_type,
            documents = row.documents,
            writes = row.writes,
            "ledger summary"
        );
    }

    let Some(document_id) = args.document_id else {
        return Ok(());
    };

    let parsed = storage.latest_version(&document_id, ArtifactKind::Parsed)?;
    let segmented = storage.latest_version(&document_id, ArtifactKind::Segmented)?;
    let validation_reports = storage.load_validation_reports(&document_id)?;
    let coverage_reports = storage.load_coverage_reports(&document_id)?;
    info!(
        document_id = %document_id,
        latest_parsed = parsed,
        latest_segmented = segmented,
        validation_reports = validation_reports.len(),
        last_validation_valid = validation_reports.first().map(|report| report.valid),
        coverage_reports = coverage_reports.len(),
        "document status"
    );

    for entry in storage
        .ledger_entries(&document_id)
        .with_context(|| format!("failed to read ledger entries for {document_id}"))?
    {
        info!(
            recorded_at = %entry.recorded_at,
            artifact_type = %entry.artifact_type,
            version = entry.version,
            size = entry.size,
            sha256 = %entry.sha256,
            path = %entry.path,
            "ledger entry"
        );
    }

    Ok(())
}
