use anyhow::{Context, Result};
use chrono::SecondsFormat;

use crate::cli::ListArgs;
use crate::commands::open_storage;
use crate::config::PipelineConfig;
use crate::storage::{ArtifactKind, StorageMetadata};

pub fn run(config: &PipelineConfig, args: ListArgs) -> Result<()> {
    let storage = open_storage(config)?;

    let Some(document_id) = args.document_id else {
        let ids = storage.document_ids().context("failed to list documents")?;
        if ids.is_empty() {
            println!("No documents in {}", storage.base_dir().display());
        }
        for id in ids {
            println!("{id}");
        }
        return Ok(());
    };

    println!("Document: {document_id}");
    for kind in [ArtifactKind::Parsed, ArtifactKind::Segmented] {
        let versions = storage
            .list_versions(&document_id, kind)
            .with_context(|| format!("failed to list {} versions of {document_id}", kind.as_str()))?;

        println!();
        println!("{} versions:", capitalize(kind.as_str()));
        if versions.is_empty() {
            println!("  (none)");
        }
        for meta in &versions {
            println!("  {}", format_version(meta));
        }
    }

    match storage.load_final(&document_id) {
        Ok(doc) => {
            println!();
            println!(
                "Final: {} ({} categories, {} guidelines)",
                doc.metadata.title,
                doc.categories.len(),
                doc.guideline_count()
            );
        }
        Err(err) if err.is_not_found() => {}
        Err(err) => return Err(err).context("failed to load final document"),
    }

    Ok(())
}

fn format_version(meta: &StorageMetadata) -> String {
    let mut line = format!(
        "v{} - {} ({} bytes)",
        meta.version,
        meta.stored_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        meta.size
    );
    if !meta.description.is_empty() {
        line.push_str(&format!(" [{}]", meta.description));
    }
    line
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
