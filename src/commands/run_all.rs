use anyhow::Result;
use tracing::info;

use crate::cli::RunAllArgs;
use crate::commands::convert::convert_stored;
use crate::commands::open_storage;
use crate::commands::parse::parse_into_store;
use crate::commands::segment::segment_stored;
use crate::config::PipelineConfig;

pub fn run(config: &PipelineConfig, args: RunAllArgs) -> Result<()> {
    let storage = open_storage(config)?;

    let (document_id, parsed_version) = parse_into_store(
        &storage,
        config,
        &args.input,
        args.document_id.as_deref(),
        args.max_pages,
    )?;
    let segmented_version = segment_stored(&storage, config, &document_id, parsed_version)?;
    let final_path = convert_stored(
        &storage,
        config,
        &document_id,
        segmented_version,
        args.output.as_deref(),
    )?;

    info!(
        document_id = %document_id,
        parsed_version,
        segmented_version,
        final_path = %final_path.display(),
        "pipeline complete"
    );
    Ok(())
}
