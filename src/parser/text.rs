use anyhow::{Context, Result};
use regex::Regex;

use crate::model::{Block, ListItem, Page};

const MAX_NUMBERED_HEADING_LEVEL: u32 = 6;
const SHORT_CAPS_HEADING_CHARS: usize = 30;
const INDENT_WIDTH: usize = 3;

/// Line-oriented classifier for plain text: headings, list items and
/// paragraphs, with running headers, footers and table-of-contents lines
/// removed.
#[derive(Debug)]
pub struct TextClassifier {
    heading: Regex,
    list: Regex,
    numbered_prefix: Regex,
    ordered_marker: Regex,
    toc_leader: Regex,
    trailing_leader: Regex,
    inline_leader: Regex,
    multi_space: Regex,
    page_furniture: Vec<Regex>,
    table_headers: Vec<Regex>,
}

impl TextClassifier {
    pub fn new() -> Result<Self> {
        Ok(Self {
            heading: Regex::new(r"^([0-9]+\.)*[0-9]+\.?\s+[A-Z].*$|^[A-Z][A-Z\s]+$")
                .context("failed to compile heading regex")?,
            list: Regex::new(r"^([0-9]+\.|[a-z]\.|•|\*|-)\s+")
                .context("failed to compile list regex")?,
            numbered_prefix: Regex::new(r"^([0-9]+\.)*[0-9]+")
                .context("failed to compile numbered prefix regex")?,
            ordered_marker: Regex::new(r"^[0-9]+\.").context("failed to compile ordered regex")?,
            toc_leader: Regex::new(r"\.{4,}").context("failed to compile toc regex")?,
            trailing_leader: Regex::new(r"\s*\.{3,}[\s\d]*$")
                .context("failed to compile trailing leader regex")?,
            inline_leader: Regex::new(r"\s+\.{3,}\s+")
                .context("failed to compile inline leader regex")?,
            multi_space: Regex::new(r"\s{3,}").context("failed to compile whitespace regex")?,
            page_furniture: compile_all(&[
                r"(?i)^page\s+\d+(\s+of\s+\d+)?$",
                r"(?i)©\s*\d{4}",
                r"(?i)all\s+rights\s+reserved",
                r"^\d+$",
            ])?,
            table_headers: compile_all(&[
                r"(?i)^date\s{4,}version",
                r"(?i)^requirement\s{4,}testing",
                r"(?i)^pci\s+dss\s+requirement",
                r"(?i)^guidance\s{4,}",
            ])?,
        })
    }

    /// Classifies each page; pages that yield no blocks are omitted but the
    /// remaining pages keep their 1-based position in the input.
    pub fn classify_pages(&self, pages: &[String]) -> Vec<Page> {
        pages
            .iter()
            .enumerate()
            .filter_map(|(index, text)| {
                let blocks = self.classify_page(text);
                (!blocks.is_empty()).then(|| Page {
                    page_number: index as u32 + 1,
                    blocks,
                })
            })
            .collect()
    }

    pub fn classify_page(&self, text: &str) -> Vec<Block> {
        let mut builder = PageBuilder::default();

        for raw_line in text.lines() {
            if raw_line.trim().is_empty() {
                builder.flush();
                continue;
            }

            let trimmed = raw_line.trim();
            if self.toc_leader.is_match(trimmed) || self.is_furniture(trimmed) {
                continue;
            }

            let line = self.clean(trimmed);
            if line.is_empty() {
                continue;
            }

            if self.heading.is_match(&line) {
                builder.flush();
                let level = self.heading_level(&line);
                let mut block = Block::heading(level, line);
                block.font_size = Some(f64::from(18u32.saturating_sub(level * 2)));
                block.font_weight = Some("bold".to_string());
                builder.blocks.push(block);
                continue;
            }

            if let Some(captures) = self.list.captures(&line) {
                builder.flush();
                let marker = captures
                    .get(1)
                    .map(|m| m.as_str())
                    .unwrap_or_default()
                    .to_string();
                let list_type = if self.ordered_marker.is_match(&marker) {
                    "ordered"
                } else {
                    "unordered"
                };
                let body_start = captures.get(0).map(|m| m.end()).unwrap_or_default();

                let mut block = Block::list_item(String::new());
                block.list_item = Some(ListItem {
                    level: indent_level(raw_line),
                    marker,
                    list_type: list_type.to_string(),
                });
                builder.open = Some(block);
                builder.append(line[body_start..].trim());
                continue;
            }

            if builder.open.is_none() {
                builder.open = Some(Block::paragraph(String::new()));
            }
            builder.append(&line);
        }

        builder.flush();
        builder.blocks
    }

    fn is_furniture(&self, line: &str) -> bool {
        self.page_furniture.iter().any(|re| re.is_match(line))
            || self.table_headers.iter().any(|re| re.is_match(line))
    }

    /// Strips dot leaders and collapses layout padding.
    fn clean(&self, line: &str) -> String {
        let line = self.trailing_leader.replace(line, "");
        let line = self.inline_leader.replace_all(&line, " - ");
        self.multi_space.replace_all(line.trim(), " ").trim().to_string()
    }

    fn heading_level(&self, line: &str) -> u32 {
        if let Some(prefix) = self.numbered_prefix.find(line) {
            let level = prefix.as_str().matches('.').count() as u32 + 1;
            if level <= MAX_NUMBERED_HEADING_LEVEL {
                return level;
            }
        }

        if line.to_uppercase() == line {
            if line.chars().count() < SHORT_CAPS_HEADING_CHARS {
                return 1;
            }
            return 2;
        }

        3
    }
}

#[derive(Default)]
struct PageBuilder {
    blocks: Vec<Block>,
    open: Option<Block>,
}

impl PageBuilder {
    fn append(&mut self, text: &str) {
        if let Some(block) = self.open.as_mut() {
            if !block.text.is_empty() && !text.is_empty() {
                block.text.push(' ');
            }
            block.text.push_str(text);
        }
    }

    fn flush(&mut self) {
        if let Some(block) = self.open.take() {
            if !block.text.trim().is_empty() {
                self.blocks.push(block);
            }
        }
    }
}

fn indent_level(raw_line: &str) -> u32 {
    let leading = raw_line.len() - raw_line.trim_start_matches([' ', '\t']).len();
    (leading / INDENT_WIDTH) as u32 + 1
}

fn compile_all(patterns: &[&str]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).with_context(|| format!("failed to compile pattern {pattern}"))
        })
        .collect()
}
