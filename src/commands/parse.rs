use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::cli::ParseArgs;
use crate::commands::open_storage;
use crate::config::PipelineConfig;
use crate::parser::{build_parser, document_id_from_path};
use crate::storage::Storage;

pub fn run(config: &PipelineConfig, args: ParseArgs) -> Result<()> {
    let storage = open_storage(config)?;
    parse_into_store(
        &storage,
        config,
        &args.input,
        args.document_id.as_deref(),
        args.max_pages,
    )?;
    Ok(())
}

/// Parses `input` and stores it as the next parsed version. Returns the
/// document ID and the version assigned.
pub(crate) fn parse_into_store(
    storage: &Storage,
    config: &PipelineConfig,
    input: &Path,
    document_id: Option<&str>,
    max_pages: Option<usize>,
) -> Result<(String, u32)> {
    let parser = build_parser(config.parser, max_pages)?;
    info!(
        input = %input.display(),
        parser = parser.name(),
        "parsing source document"
    );

    let mut doc = parser
        .parse(input)
        .with_context(|| format!("failed to parse {}", input.display()))?;

    let document_id = match document_id {
        Some(id) if !id.trim().is_empty() => id.trim().to_string(),
        _ if !doc.metadata.document_id.trim().is_empty() => doc.metadata.document_id.clone(),
        _ => match document_id_from_path(input) {
            Some(id) => id,
            None => bail!(
                "cannot derive a document id from {}; pass --document-id",
                input.display()
            ),
        },
    };
    doc.metadata.document_id = document_id.clone();

    let version = storage
        .save_parsed(&mut doc)
        .with_context(|| format!("failed to save parsed document {document_id}"))?;

    let block_count: usize = doc.pages.iter().map(|page| page.blocks.len()).sum();
    info!(
        document_id = %document_id,
        version,
        pages = doc.pages.len(),
        blocks = block_count,
        "saved parsed document"
    );

    Ok((document_id, version))
}
