use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::cli::ConvertArgs;
use crate::commands::open_storage;
use crate::config::PipelineConfig;
use crate::converter::{CONVERTER_NAME, convert_and_validate};
use crate::guidance::GuidanceDocument;
use crate::storage::{FinalFormat, Storage, ValidationReport, ValidationStage};
use crate::util::ensure_directory;
use crate::validator::ValidationResult;

pub fn run(config: &PipelineConfig, args: ConvertArgs) -> Result<()> {
    let storage = open_storage(config)?;
    convert_stored(
        &storage,
        config,
        &args.document_id,
        args.source_version,
        args.output.as_deref(),
    )?;
    Ok(())
}

/// Converts a stored segmented version and writes the final document. The
/// final artifact is only written when validation passes; the validation
/// report is kept either way when reports are enabled.
pub(crate) fn convert_stored(
    storage: &Storage,
    config: &PipelineConfig,
    document_id: &str,
    source_version: u32,
    output: Option<&Path>,
) -> Result<PathBuf> {
    let segmented = storage
        .load_segmented(document_id, source_version)
        .with_context(|| format!("failed to load segmented document {document_id}"))?;

    info!(
        document_id = %document_id,
        source_version = segmented.metadata.version,
        converter = CONVERTER_NAME,
        strict = config.strict,
        "converting to guidance document"
    );
    let (doc, result) = convert_and_validate(&segmented, config.strict);

    let report = config.save_reports.then(|| {
        ValidationReport::new(
            document_id,
            ValidationStage::Convert,
            config.strict,
            &result,
            Some(segmented.metadata.version),
        )
    });

    if !result.valid {
        log_violations(&result);
        if let Some(report) = &report {
            if let Err(err) = storage.save_validation_report(report) {
                warn!(document_id = %document_id, error = %err, "failed to save validation report");
            }
        }
        bail!(
            "schema validation failed with {} errors",
            result.errors.len()
        );
    }

    let path = storage
        .save_final_with_validation(document_id, &doc, config.format, report.as_ref())
        .with_context(|| format!("failed to save final document {document_id}"))?;

    if let Some(output) = output {
        write_output(output, &doc, config.format)?;
        info!(path = %output.display(), "wrote output copy");
    }

    info!(
        document_id = %document_id,
        path = %path.display(),
        categories = doc.categories.len(),
        guidelines = doc.guideline_count(),
        "conversion complete"
    );

    Ok(path)
}

pub(crate) fn log_violations(result: &ValidationResult) {
    for violation in &result.errors {
        warn!(violation = %violation, "schema violation");
    }
}

fn write_output(path: &Path, doc: &GuidanceDocument, format: FinalFormat) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        ensure_directory(parent)?;
    }

    let data = format
        .encode(doc)
        .with_context(|| format!("failed to encode {}", path.display()))?;
    fs::write(path, data).with_context(|| format!("failed to write {}", path.display()))
}
