use super::rules::{CompiledRules, first_capture};
use crate::model::{BlockType, DocumentMetadata, ParsedDocument};

const METADATA_SCAN_PAGES: usize = 5;

/// Values substituted when a required metadata field cannot be extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataDefaults {
    pub id: &'static str,
    pub title: &'static str,
    pub author: &'static str,
    pub description: &'static str,
}

pub const METADATA_DEFAULTS: MetadataDefaults = MetadataDefaults {
    id: "unidentified-document",
    title: "Untitled Document",
    author: "Unknown",
    description: "Automatically extracted from PDF",
};

pub(crate) fn extract_metadata(rules: &CompiledRules, doc: &ParsedDocument) -> DocumentMetadata {
    let mut title = None;
    let mut version = None;
    let mut author = None;
    let mut publication_date = None;

    let blocks = doc
        .pages
        .iter()
        .take(METADATA_SCAN_PAGES)
        .flat_map(|page| &page.blocks);
    for block in blocks {
        let text = block.text.trim();
        if text.is_empty() {
            continue;
        }

        if title.is_none() {
            title = first_capture(&rules.title, text).or_else(|| {
                (block.block_type == BlockType::Heading && block.level == 1)
                    .then(|| text.to_string())
            });
        }
        if version.is_none() {
            version = first_capture(&rules.version, text);
        }
        if author.is_none() {
            author = first_capture(&rules.author, text);
        }
        if publication_date.is_none() {
            publication_date = first_capture(&rules.publication, text);
        }
    }

    let id = if doc.metadata.document_id.trim().is_empty() {
        METADATA_DEFAULTS.id.to_string()
    } else {
        doc.metadata.document_id.clone()
    };

    DocumentMetadata {
        id,
        title: title.unwrap_or_else(|| METADATA_DEFAULTS.title.to_string()),
        description: METADATA_DEFAULTS.description.to_string(),
        author: author.unwrap_or_else(|| METADATA_DEFAULTS.author.to_string()),
        version: version.unwrap_or_default(),
        publication_date: publication_date.unwrap_or_default(),
        ..DocumentMetadata::default()
    }
}

/// Paragraph text ahead of the first category marker, skipping title-level
/// headings.
pub(crate) fn extract_front_matter(rules: &CompiledRules, doc: &ParsedDocument) -> String {
    let mut paragraphs = Vec::new();

    for block in doc.pages.iter().flat_map(|page| &page.blocks) {
        let text = block.text.trim();
        if rules.is_category(text) {
            break;
        }
        if block.block_type == BlockType::Heading && block.level <= 1 {
            continue;
        }
        if block.block_type == BlockType::Paragraph && !text.is_empty() {
            paragraphs.push(text);
        }
    }

    paragraphs.join("\n\n")
}
