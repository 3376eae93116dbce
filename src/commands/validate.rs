use anyhow::{Context, Result, bail};
use tracing::info;

use crate::cli::ValidateArgs;
use crate::commands::convert::log_violations;
use crate::commands::open_storage;
use crate::config::PipelineConfig;
use crate::storage::{ValidationReport, ValidationStage};
use crate::validator::Validator;

pub fn run(config: &PipelineConfig, args: ValidateArgs) -> Result<()> {
    let validator = Validator::new(config.strict);

    let result = match (&args.file, &args.document_id) {
        (Some(path), _) => {
            info!(path = %path.display(), strict = validator.is_strict(), "validating file");
            validator.validate_file(path)?
        }
        (None, Some(document_id)) => {
            let storage = open_storage(config)?;
            let doc = storage
                .load_final(document_id)
                .with_context(|| format!("failed to load final document {document_id}"))?;
            info!(document_id = %document_id, strict = validator.is_strict(), "validating stored document");

            let result = validator.validate(&doc);
            if result.valid {
                info!(
                    id = %doc.metadata.id,
                    title = %doc.metadata.title,
                    document_type = %doc.metadata.document_type,
                    categories = doc.categories.len(),
                    guidelines = doc.guideline_count(),
                    "document summary"
                );
            }
            if config.save_reports {
                let report = ValidationReport::new(
                    document_id,
                    ValidationStage::Validate,
                    config.strict,
                    &result,
                    None,
                );
                storage.save_validation_report(&report).with_context(|| {
                    format!("failed to save validation report for {document_id}")
                })?;
            }
            result
        }
        (None, None) => bail!("either --document-id or --file is required"),
    };

    if result.valid {
        info!("validation passed");
        return Ok(());
    }

    log_violations(&result);
    bail!("schema validation failed with {} errors", result.errors.len())
}
