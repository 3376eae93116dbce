use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub metadata: ParsedMetadata,
    #[serde(default)]
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedMetadata {
    #[serde(default)]
    pub source_file: String,
    #[serde(default)]
    pub parser: String,
    pub parsed_at: DateTime<Utc>,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub document_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub page_number: u32,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Heading,
    Paragraph,
    List,
    Table,
    Code,
    Footnote,
    Caption,
}

impl BlockType {
    pub fn as_str(self) -> &'static str {
        match self {
            BlockType::Heading => "heading",
            BlockType::Paragraph => "paragraph",
            BlockType::List => "list",
            BlockType::Table => "table",
            BlockType::Code => "code",
            BlockType::Footnote => "footnote",
            BlockType::Caption => "caption",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "type")]
    pub block_type: BlockType,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub level: u32,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_item: Option<ListItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_data: Option<TableData>,
}

impl Block {
    pub fn new(block_type: BlockType, text: impl Into<String>) -> Self {
        Self {
            block_type,
            level: 0,
            text: text.into(),
            bbox: None,
            font_size: None,
            font_weight: None,
            font_name: None,
            list_item: None,
            table_data: None,
        }
    }

    pub fn heading(level: u32, text: impl Into<String>) -> Self {
        Self {
            level,
            ..Self::new(BlockType::Heading, text)
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::new(BlockType::Paragraph, text)
    }

    pub fn list_item(text: impl Into<String>) -> Self {
        Self::new(BlockType::List, text)
    }
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub level: u32,
    pub marker: String,
    #[serde(rename = "type")]
    pub list_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentedDocument {
    pub metadata: SegmentedMetadata,
    pub document_metadata: DocumentMetadata,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub front_matter: String,
    #[serde(default)]
    pub categories: Vec<SegmentCategory>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unmapped_content: Vec<UnmappedContent>,
}

impl SegmentedDocument {
    pub fn guideline_count(&self) -> usize {
        self.categories
            .iter()
            .map(|category| category.guidelines.len())
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentedMetadata {
    #[serde(default)]
    pub source_version: u32,
    pub segmenter: String,
    pub segmented_at: DateTime<Utc>,
    #[serde(default)]
    pub version: u32,
    pub document_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub id: String,
    pub title: String,
    pub description: String,
    pub author: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub publication_date: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub document_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub jurisdictions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub industry_sectors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentCategory {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub guidelines: Vec<SegmentGuideline>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentGuideline {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub objective: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<SegmentPart>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentPart {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
}

/// Source content the schema had no place for. Segmenters leave this empty;
/// enhancers and future segmenters may record what they could not map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmappedContent {
    pub content: String,
    pub content_type: String,
    #[serde(default)]
    pub source_location: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub suggested_field: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaGap {
    pub suggested_field: String,
    pub description: String,
    pub occurrence_count: usize,
    pub examples: Vec<String>,
    pub priority: Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    pub fn from_occurrences(count: usize) -> Self {
        if count >= 10 {
            Priority::High
        } else if count >= 3 {
            Priority::Medium
        } else {
            Priority::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancementResult {
    pub original: SegmentedDocument,
    pub enhanced: SegmentedDocument,
    #[serde(default)]
    pub changes: Vec<EnhancementChange>,
    pub confidence: f64,
    pub provider: String,
    pub model: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancementChange {
    pub path: String,
    #[serde(rename = "type")]
    pub change_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub old_value: String,
    pub new_value: String,
    pub reason: String,
    pub confidence: f64,
}
