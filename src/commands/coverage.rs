use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::cli::CoverageArgs;
use crate::commands::open_storage;
use crate::config::PipelineConfig;
use crate::coverage::{CoverageReport, analyze_final, analyze_segmented};
use crate::guidance::GuidanceDocument;
use crate::storage::{StoreResult, Storage};

pub fn run(config: &PipelineConfig, args: CoverageArgs) -> Result<()> {
    let storage = open_storage(config)?;

    let report = match (&args.file, &args.document_id) {
        (Some(path), _) => {
            info!(path = %path.display(), "analyzing coverage of guidance file");
            let doc = GuidanceDocument::from_file(path)?;
            analyze_final(&doc)
        }
        (None, Some(document_id)) => stored_report(&storage, document_id, args.source_version)?,
        (None, None) => bail!("either --document-id or --file is required"),
    };

    println!("{report}");

    if config.save_reports {
        let path = storage.save_coverage_report(&report).with_context(|| {
            format!("failed to save coverage report for {}", report.document_id)
        })?;
        info!(path = %path.display(), "coverage report saved");
    }

    Ok(())
}

/// Prefers the segmented document paired with the parsed version it was
/// built from, which carries source statistics, and falls back to the final
/// document.
fn stored_report(storage: &Storage, document_id: &str, version: u32) -> Result<CoverageReport> {
    let segmented = optional(storage.load_segmented(document_id, version))
        .with_context(|| format!("failed to load segmented document {document_id}"))?;

    if let Some(segmented) = &segmented {
        let source_version = segmented.metadata.source_version;
        let parsed = optional(storage.load_parsed(document_id, source_version))
            .with_context(|| {
                format!("failed to load parsed document {document_id} v{source_version}")
            })?;
        match parsed {
            Some(parsed) => {
                info!(
                    document_id = %document_id,
                    parsed_version = parsed.metadata.version,
                    segmented_version = segmented.metadata.version,
                    "analyzing coverage from parsed and segmented documents"
                );
                return Ok(analyze_segmented(&parsed, segmented));
            }
            None => warn!(
                document_id = %document_id,
                segmented_version = segmented.metadata.version,
                source_version,
                "source of segmented document is missing"
            ),
        }
    }

    let final_doc = optional(storage.load_final(document_id))
        .with_context(|| format!("failed to load final document {document_id}"))?;
    match final_doc {
        Some(doc) => {
            info!(document_id = %document_id, "analyzing coverage from final document");
            Ok(analyze_final(&doc))
        }
        None => bail!("no documents available for coverage analysis of {document_id}"),
    }
}

fn optional<T>(result: StoreResult<T>) -> StoreResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}
