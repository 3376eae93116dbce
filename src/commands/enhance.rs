use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::cli::EnhanceArgs;
use crate::commands::convert::log_violations;
use crate::commands::open_storage;
use crate::config::PipelineConfig;
use crate::converter::convert_and_validate;
use crate::enhancer::build_enhancer;
use crate::storage::{ValidationReport, ValidationStage};

pub fn run(config: &PipelineConfig, args: EnhanceArgs) -> Result<()> {
    let storage = open_storage(config)?;
    let document_id = args.document_id.as_str();

    let segmented = storage
        .load_segmented(document_id, args.source_version)
        .with_context(|| format!("failed to load segmented document {document_id}"))?;
    let pre_enhance_version = segmented.metadata.version;

    let enhancer = build_enhancer(config.enhancer);
    info!(
        document_id = %document_id,
        pre_enhance_version,
        enhancer = enhancer.name(),
        "enhancing segmented document"
    );

    let result = enhancer
        .enhance_segmentation(&segmented)
        .with_context(|| format!("enhancement failed for {document_id}"))?;
    info!(
        provider = %result.provider,
        model = %result.model,
        confidence = result.confidence,
        changes = result.changes.len(),
        "enhancement complete"
    );
    if args.show_changes {
        for (index, change) in result.changes.iter().enumerate() {
            info!(
                index = index + 1,
                path = %change.path,
                change_type = %change.change_type,
                reason = %change.reason,
                "enhancement change"
            );
        }
    }

    let label = format!(
        "post-enhance-{} (pre-enhance: v{pre_enhance_version})",
        result.provider
    );
    let mut enhanced = result.enhanced;
    let version = storage
        .save_segmented_with_label(&mut enhanced, &label)
        .with_context(|| format!("failed to save enhanced document {document_id}"))?;
    info!(
        document_id = %document_id,
        version,
        pre_enhance_version,
        label = %label,
        "saved enhanced segmented document"
    );

    let (_, validation) = convert_and_validate(&enhanced, config.strict);
    if config.save_reports {
        let report = ValidationReport::new(
            document_id,
            ValidationStage::Enhance,
            config.strict,
            &validation,
            Some(version),
        );
        storage
            .save_validation_report(&report)
            .with_context(|| format!("failed to save validation report for {document_id}"))?;
    }

    if validation.valid {
        info!(document_id = %document_id, version, "enhanced document passes schema validation");
        return Ok(());
    }

    log_violations(&validation);
    if config.strict {
        bail!(
            "enhanced document failed schema validation with {} errors",
            validation.errors.len()
        );
    }
    warn!(
        document_id = %document_id,
        errors = validation.errors.len(),
        "continuing despite validation errors (strict mode off)"
    );
    Ok(())
}
