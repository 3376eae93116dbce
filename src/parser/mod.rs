mod text;

#[cfg(test)]
mod tests;

use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{Page, ParsedDocument, ParsedMetadata};

pub use text::TextClassifier;

/// Turns a source file into pages of classified blocks.
pub trait Parser {
    fn name(&self) -> &str;
    fn parse(&self, path: &Path) -> Result<ParsedDocument>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ParserKind {
    /// Pre-parsed block JSON produced by an external layout extractor.
    Json,
    #[default]
    Text,
    Pdftotext,
}

impl ParserKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ParserKind::Json => "json",
            ParserKind::Text => "text",
            ParserKind::Pdftotext => "pdftotext",
        }
    }
}

pub fn build_parser(kind: ParserKind, max_pages: Option<usize>) -> Result<Box<dyn Parser>> {
    let parser: Box<dyn Parser> = match kind {
        ParserKind::Json => Box::new(JsonParser { max_pages }),
        ParserKind::Text => Box::new(TextParser {
            classifier: TextClassifier::new()?,
            max_pages,
        }),
        ParserKind::Pdftotext => Box::new(PdftotextParser {
            classifier: TextClassifier::new()?,
            max_pages,
        }),
    };
    Ok(parser)
}

/// Document ID derived from a source path: the file name without its extension.
pub fn document_id_from_path(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().trim().to_string())
        .filter(|stem| !stem.is_empty())
}

#[derive(Debug)]
pub struct JsonParser {
    max_pages: Option<usize>,
}

impl Parser for JsonParser {
    fn name(&self) -> &str {
        "json-v1.0"
    }

    fn parse(&self, path: &Path) -> Result<ParsedDocument> {
        let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let mut doc: ParsedDocument = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse block json {}", path.display()))?;

        if let Some(max_pages) = self.max_pages {
            doc.pages.truncate(max_pages);
        }
        if doc.metadata.source_file.is_empty() {
            doc.metadata.source_file = path.display().to_string();
        }
        if doc.metadata.parser.is_empty() {
            doc.metadata.parser = self.name().to_string();
        }
        doc.metadata.version = 0;
        Ok(doc)
    }
}

#[derive(Debug)]
pub struct TextParser {
    classifier: TextClassifier,
    max_pages: Option<usize>,
}

impl Parser for TextParser {
    fn name(&self) -> &str {
        "text-v1.0"
    }

    fn parse(&self, path: &Path) -> Result<ParsedDocument> {
        let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let mut pages = split_pages(&String::from_utf8_lossy(&raw));
        if let Some(max_pages) = self.max_pages {
            pages.truncate(max_pages);
        }

        Ok(parsed_document(
            path,
            self.name(),
            self.classifier.classify_pages(&pages),
        ))
    }
}

/// Shells out to poppler's `pdftotext` and classifies the extracted text.
#[derive(Debug)]
pub struct PdftotextParser {
    classifier: TextClassifier,
    max_pages: Option<usize>,
}

impl Parser for PdftotextParser {
    fn name(&self) -> &str {
        "pdftotext-v1.0"
    }

    fn parse(&self, path: &Path) -> Result<ParsedDocument> {
        if !command_available("pdftotext") {
            bail!("pdftotext not found on PATH (install poppler-utils)");
        }

        let pages = extract_pages_with_pdftotext(path, self.max_pages)?;
        debug!(path = %path.display(), pages = pages.len(), "extracted pdf text");

        Ok(parsed_document(
            path,
            self.name(),
            self.classifier.classify_pages(&pages),
        ))
    }
}

fn parsed_document(path: &Path, parser: &str, pages: Vec<Page>) -> ParsedDocument {
    ParsedDocument {
        metadata: ParsedMetadata {
            source_file: path.display().to_string(),
            parser: parser.to_string(),
            parsed_at: Utc::now(),
            version: 0,
            document_id: String::new(),
        },
        pages,
    }
}

fn command_available(program: &str) -> bool {
    Command::new(program).arg("--version").output().is_ok()
}

fn extract_pages_with_pdftotext(pdf_path: &Path, max_pages: Option<usize>) -> Result<Vec<String>> {
    let mut command = Command::new("pdftotext");
    command
        .arg("-layout")
        .arg("-enc")
        .arg("UTF-8")
        .arg("-f")
        .arg("1");
    if let Some(max_pages) = max_pages {
        command.arg("-l").arg(max_pages.to_string());
    }
    command.arg(pdf_path).arg("-");

    let output = command
        .output()
        .with_context(|| format!("failed to execute pdftotext for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftotext returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    Ok(split_pages(&String::from_utf8_lossy(&output.stdout)))
}

/// Splits form-feed separated text into pages, dropping trailing blank pages.
pub(crate) fn split_pages(raw: &str) -> Vec<String> {
    let mut pages: Vec<String> = raw
        .split('\u{000C}')
        .map(|chunk| chunk.replace('\u{0000}', ""))
        .collect();

    while let Some(last_page) = pages.last() {
        if last_page.trim().is_empty() {
            pages.pop();
            continue;
        }
        break;
    }

    pages
}
