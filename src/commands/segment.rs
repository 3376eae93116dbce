use anyhow::{Context, Result};
use tracing::info;

use crate::cli::SegmentArgs;
use crate::commands::open_storage;
use crate::config::PipelineConfig;
use crate::segmenter::build_segmenter;
use crate::storage::Storage;

pub fn run(config: &PipelineConfig, args: SegmentArgs) -> Result<()> {
    let storage = open_storage(config)?;
    segment_stored(&storage, config, &args.document_id, args.source_version)?;
    Ok(())
}

/// Segments a stored parsed version and saves the result as the next
/// segmented version, which is returned.
pub(crate) fn segment_stored(
    storage: &Storage,
    config: &PipelineConfig,
    document_id: &str,
    source_version: u32,
) -> Result<u32> {
    let parsed = storage
        .load_parsed(document_id, source_version)
        .with_context(|| format!("failed to load parsed document {document_id}"))?;

    let segmenter = build_segmenter(config.segmenter)?;
    info!(
        document_id = %document_id,
        source_version = parsed.metadata.version,
        segmenter = segmenter.name(),
        "segmenting document"
    );

    let mut segmented = segmenter.segment(&parsed);
    let version = storage
        .save_segmented(&mut segmented)
        .with_context(|| format!("failed to save segmented document {document_id}"))?;

    info!(
        document_id = %document_id,
        version,
        categories = segmented.categories.len(),
        guidelines = segmented.guideline_count(),
        front_matter_chars = segmented.front_matter.chars().count(),
        "saved segmented document"
    );

    Ok(version)
}
