#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::guidance::GuidanceDocument;
use crate::model::{ParsedDocument, Priority, SchemaGap, SegmentedDocument, UnmappedContent};
use crate::util::truncate_chars;

const MAX_GAP_EXAMPLES: usize = 3;
const GAP_EXAMPLE_CHARS: usize = 100;
const LOW_BLOCK_COVERAGE: f64 = 70.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub document_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub source_stats: SourceStats,
    #[serde(default)]
    pub captured_content: CapturedContent,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unmapped_content: Vec<UnmappedContent>,
    #[serde(default)]
    pub coverage_metrics: CoverageMetrics,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schema_gaps: Vec<SchemaGap>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<SchemaRecommendation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStats {
    pub total_pages: usize,
    pub total_blocks: usize,
    pub blocks_by_type: BTreeMap<String, usize>,
    pub total_characters: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedContent {
    pub categories: usize,
    pub guidelines: usize,
    pub parts: usize,
    pub recommendations: usize,
    pub fields_captured: Vec<String>,
    pub fields_empty: Vec<String>,
}

impl CapturedContent {
    fn check_field(&mut self, name: &str, populated: bool) {
        if populated {
            self.fields_captured.push(name.to_string());
        } else {
            self.fields_empty.push(name.to_string());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageMetrics {
    pub block_coverage: f64,
    pub character_coverage: f64,
    pub required_fields_covered: usize,
    pub required_fields_total: usize,
    pub optional_fields_covered: usize,
    pub optional_fields_total: usize,
    pub overall_score: f64,
    pub quality_indicators: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRecommendation {
    #[serde(rename = "type")]
    pub kind: String,
    pub target: String,
    pub description: String,
    pub priority: Priority,
    pub rationale: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

impl SchemaRecommendation {
    fn new(
        kind: &str,
        target: impl Into<String>,
        description: impl Into<String>,
        priority: Priority,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.to_string(),
            target: target.into(),
            description: description.into(),
            priority,
            rationale: rationale.into(),
            examples: Vec::new(),
        }
    }
}

/// Overall-score bucket.
pub fn score_bucket(score: f64) -> &'static str {
    if score >= 90.0 {
        "excellent"
    } else if score >= 70.0 {
        "good"
    } else if score >= 50.0 {
        "fair"
    } else {
        "needs_improvement"
    }
}

fn capture_bucket(block_coverage: f64) -> &'static str {
    if block_coverage >= 90.0 {
        "comprehensive"
    } else if block_coverage >= 70.0 {
        "substantial"
    } else {
        "partial"
    }
}

fn depth_bucket(categories: usize, has_guidelines: bool, has_parts: bool) -> &'static str {
    if categories == 0 {
        "empty"
    } else if has_parts {
        "detailed"
    } else if has_guidelines {
        "moderate"
    } else {
        "shallow"
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}

fn fraction(part: usize, total: usize) -> f64 {
    if total == 0 { 0.0 } else { part as f64 / total as f64 }
}

/// Scores how much of a source document and of the schema's fields an
/// extraction captured.
pub fn analyze_segmented(parsed: &ParsedDocument, segmented: &SegmentedDocument) -> CoverageReport {
    let source_stats = source_stats(parsed);
    let captured_content = captured_from_segmented(segmented);
    let coverage_metrics = segmented_metrics(&source_stats, segmented);
    let schema_gaps = identify_schema_gaps(&segmented.unmapped_content);

    let mut report = CoverageReport {
        document_id: segmented.metadata.document_id.clone(),
        timestamp: Utc::now(),
        source_stats,
        captured_content,
        unmapped_content: segmented.unmapped_content.clone(),
        coverage_metrics,
        schema_gaps,
        recommendations: Vec::new(),
    };
    report.recommendations = segmented_recommendations(&report);
    report
}

pub fn analyze_final(doc: &GuidanceDocument) -> CoverageReport {
    CoverageReport {
        document_id: doc.metadata.id.clone(),
        timestamp: Utc::now(),
        source_stats: SourceStats::default(),
        captured_content: captured_from_final(doc),
        unmapped_content: Vec::new(),
        coverage_metrics: final_metrics(doc),
        schema_gaps: Vec::new(),
        recommendations: final_recommendations(doc),
    }
}

fn source_stats(parsed: &ParsedDocument) -> SourceStats {
    let mut stats = SourceStats {
        total_pages: parsed.pages.len(),
        ..SourceStats::default()
    };

    for block in parsed.pages.iter().flat_map(|page| &page.blocks) {
        stats.total_blocks += 1;
        *stats
            .blocks_by_type
            .entry(block.block_type.as_str().to_string())
            .or_default() += 1;
        stats.total_characters += block.text.chars().count();
    }

    stats
}

fn captured_from_segmented(doc: &SegmentedDocument) -> CapturedContent {
    let mut captured = CapturedContent {
        categories: doc.categories.len(),
        ..CapturedContent::default()
    };

    for guideline in doc.categories.iter().flat_map(|category| &category.guidelines) {
        captured.guidelines += 1;
        captured.parts += guideline.parts.len();
        captured.recommendations += guideline.recommendations.len();
    }

    let meta = &doc.document_metadata;
    captured.check_field("metadata.id", !meta.id.is_empty());
    captured.check_field("metadata.title", !meta.title.is_empty());
    captured.check_field("metadata.description", !meta.description.is_empty());
    captured.check_field("metadata.author", !meta.author.is_empty());
    captured.check_field("metadata.document_type", !meta.document_type.is_empty());
    captured
}

fn captured_from_final(doc: &GuidanceDocument) -> CapturedContent {
    let mut captured = CapturedContent {
        categories: doc.categories.len(),
        ..CapturedContent::default()
    };

    for guideline in doc.categories.iter().flat_map(|category| &category.guidelines) {
        captured.guidelines += 1;
        captured.parts += guideline.guideline_parts.len();
        captured.recommendations += guideline.recommendations.len();
    }

    let meta = &doc.metadata;
    captured.check_field("metadata.id", !meta.id.is_empty());
    captured.check_field("metadata.title", !meta.title.is_empty());
    captured.check_field("metadata.description", !meta.description.is_empty());
    captured.check_field("metadata.author", !meta.author.is_empty());
    captured.check_field("metadata.document_type", !meta.document_type.is_empty());
    captured.check_field("metadata.version", !meta.version.is_empty());
    captured.check_field("metadata.publication_date", !meta.publication_date.is_empty());
    captured.check_field("front_matter", !doc.front_matter.is_empty());
    captured
}

fn segmented_metrics(stats: &SourceStats, doc: &SegmentedDocument) -> CoverageMetrics {
    let meta = &doc.document_metadata;

    let unmapped_blocks = doc.unmapped_content.len();
    let unmapped_chars = doc
        .unmapped_content
        .iter()
        .map(|item| item.content.chars().count())
        .sum::<usize>();

    let required = [&meta.id, &meta.title, &meta.description, &meta.author]
        .iter()
        .filter(|value| !value.is_empty())
        .count();
    let optional = [
        !meta.version.is_empty(),
        !meta.publication_date.is_empty(),
        !meta.document_type.is_empty(),
        !meta.jurisdictions.is_empty(),
    ]
    .iter()
    .filter(|present| **present)
    .count();

    let mut metrics = CoverageMetrics {
        block_coverage: percentage(
            stats.total_blocks.saturating_sub(unmapped_blocks),
            stats.total_blocks,
        ),
        character_coverage: percentage(
            stats.total_characters.saturating_sub(unmapped_chars),
            stats.total_characters,
        ),
        required_fields_covered: required,
        required_fields_total: 4,
        optional_fields_covered: optional,
        optional_fields_total: 4,
        ..CoverageMetrics::default()
    };

    let score = fraction(required, 4) * 60.0
        + fraction(optional, 4) * 20.0
        + metrics.block_coverage * 0.2;
    metrics.overall_score = score.clamp(0.0, 100.0);

    let (has_guidelines, has_parts) = depth_flags(
        doc.categories
            .iter()
            .map(|category| category.guidelines.iter().map(|guideline| guideline.parts.len())),
    );
    metrics.quality_indicators.insert(
        "overall".to_string(),
        score_bucket(metrics.overall_score).to_string(),
    );
    metrics.quality_indicators.insert(
        "content_capture".to_string(),
        capture_bucket(metrics.block_coverage).to_string(),
    );
    metrics.quality_indicators.insert(
        "content_depth".to_string(),
        depth_bucket(doc.categories.len(), has_guidelines, has_parts).to_string(),
    );
    metrics
}

fn final_metrics(doc: &GuidanceDocument) -> CoverageMetrics {
    let meta = &doc.metadata;

    let required = [&meta.id, &meta.title, &meta.description, &meta.author]
        .iter()
        .filter(|value| !value.is_empty())
        .count();
    let optional = [
        !meta.document_type.is_empty(),
        !meta.version.is_empty(),
        !meta.publication_date.is_empty(),
        !doc.front_matter.is_empty(),
        meta.applicability.is_some(),
    ]
    .iter()
    .filter(|present| **present)
    .count();

    let mut metrics = CoverageMetrics {
        required_fields_covered: required,
        required_fields_total: 4,
        optional_fields_covered: optional,
        optional_fields_total: 5,
        ..CoverageMetrics::default()
    };
    let score = fraction(required, 4) * 70.0 + fraction(optional, 5) * 30.0;
    metrics.overall_score = score.clamp(0.0, 100.0);

    let (has_guidelines, has_parts) = depth_flags(doc.categories.iter().map(|category| {
        category
            .guidelines
            .iter()
            .map(|guideline| guideline.guideline_parts.len())
    }));
    metrics.quality_indicators.insert(
        "completeness".to_string(),
        score_bucket(metrics.overall_score).to_string(),
    );
    metrics.quality_indicators.insert(
        "content_depth".to_string(),
        depth_bucket(doc.categories.len(), has_guidelines, has_parts).to_string(),
    );
    metrics
}

/// Walks per-category part counts and reports whether any guideline and any
/// part exist.
fn depth_flags<C, G>(categories: C) -> (bool, bool)
where
    C: Iterator<Item = G>,
    G: Iterator<Item = usize>,
{
    let mut has_guidelines = false;
    let mut has_parts = false;
    for guidelines in categories {
        for parts in guidelines {
            has_guidelines = true;
            has_parts |= parts > 0;
        }
    }
    (has_guidelines, has_parts)
}

/// Groups unmapped content into gaps keyed by suggested field, falling back
/// to the content type. Most frequent first; ties by field name.
pub fn identify_schema_gaps(unmapped: &[UnmappedContent]) -> Vec<SchemaGap> {
    let mut by_field: HashMap<&str, SchemaGap> = HashMap::new();

    for item in unmapped {
        let field = if item.suggested_field.is_empty() {
            item.content_type.as_str()
        } else {
            item.suggested_field.as_str()
        };

        let gap = by_field.entry(field).or_insert_with(|| SchemaGap {
            suggested_field: field.to_string(),
            description: format!(
                "Content of type '{}' cannot be captured by current schema",
                item.content_type
            ),
            occurrence_count: 0,
            examples: Vec::new(),
            priority: Priority::Low,
        });
        gap.occurrence_count += 1;
        if gap.examples.len() < MAX_GAP_EXAMPLES {
            gap.examples.push(truncate_chars(&item.content, GAP_EXAMPLE_CHARS));
        }
    }

    let mut gaps = by_field
        .into_values()
        .map(|mut gap| {
            gap.priority = Priority::from_occurrences(gap.occurrence_count);
            gap
        })
        .collect::<Vec<_>>();
    gaps.sort_by(|a, b| {
        b.occurrence_count
            .cmp(&a.occurrence_count)
            .then_with(|| a.suggested_field.cmp(&b.suggested_field))
    });
    gaps
}

fn segmented_recommendations(report: &CoverageReport) -> Vec<SchemaRecommendation> {
    let mut recs = Vec::new();

    for gap in &report.schema_gaps {
        let mut rec = SchemaRecommendation::new(
            "add_field",
            gap.suggested_field.clone(),
            format!("Add support for '{}' content type", gap.suggested_field),
            gap.priority,
            format!("Found {} instances of unmapped content", gap.occurrence_count),
        );
        rec.examples = gap.examples.clone();
        recs.push(rec);
    }

    if report
        .captured_content
        .fields_empty
        .iter()
        .any(|field| field == "metadata.document_type")
    {
        recs.push(SchemaRecommendation::new(
            "extraction_improvement",
            "metadata.document_type",
            "Improve document type extraction",
            Priority::High,
            "Document type is required for proper classification",
        ));
    }

    let block_coverage = report.coverage_metrics.block_coverage;
    if block_coverage < LOW_BLOCK_COVERAGE {
        recs.push(SchemaRecommendation::new(
            "schema_extension",
            "categories",
            "Consider adding more category types or flexible content containers",
            Priority::High,
            format!("Only {block_coverage:.1}% of content blocks were mapped to schema"),
        ));
    }

    recs
}

fn final_recommendations(doc: &GuidanceDocument) -> Vec<SchemaRecommendation> {
    let mut recs = Vec::new();
    let meta = &doc.metadata;

    let required = [
        ("metadata.id", "Document ID", &meta.id),
        ("metadata.title", "Document title", &meta.title),
        ("metadata.description", "Document description", &meta.description),
        ("metadata.author", "Document author", &meta.author),
    ];
    for (target, label, value) in required {
        if value.is_empty() {
            recs.push(SchemaRecommendation::new(
                "missing_required",
                target,
                format!("{label} is missing"),
                Priority::High,
                "Required by the guidance schema for identification and referencing",
            ));
        }
    }

    if meta.document_type.is_empty() {
        recs.push(SchemaRecommendation::new(
            "missing_field",
            "metadata.document_type",
            "Document type should be specified",
            Priority::Medium,
            "Document type helps with classification (Standard, Regulation, Best Practice, Framework)",
        ));
    }

    if doc.categories.is_empty() {
        recs.push(SchemaRecommendation::new(
            "content_issue",
            "categories",
            "No categories found in document",
            Priority::High,
            "A valid guidance document should have at least one category",
        ));
    }

    for (i, category) in doc.categories.iter().enumerate() {
        for (j, guideline) in category.guidelines.iter().enumerate() {
            if guideline.objective.is_empty() {
                recs.push(SchemaRecommendation::new(
                    "content_enhancement",
                    format!("categories[{i}].guidelines[{j}].objective"),
                    format!("Guideline '{}' is missing an objective", guideline.id),
                    Priority::Low,
                    "Objectives help clarify the purpose of each guideline",
                ));
            }
        }
    }

    recs
}

const RULE_WIDTH: usize = 60;
const MAX_UNMAPPED_SHOWN: usize = 5;

impl fmt::Display for CoverageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(RULE_WIDTH);
        writeln!(f, "{rule}")?;
        writeln!(f, "SCHEMA COVERAGE REPORT: {}", self.document_id)?;
        writeln!(f, "{rule}")?;

        let stats = &self.source_stats;
        if stats.total_blocks > 0 {
            writeln!(f, "\nSOURCE DOCUMENT:")?;
            writeln!(f, "  Pages: {}", stats.total_pages)?;
            writeln!(f, "  Blocks: {}", stats.total_blocks)?;
            writeln!(f, "  Characters: {}", stats.total_characters)?;
            if !stats.blocks_by_type.is_empty() {
                writeln!(f, "  Block types:")?;
                for (block_type, count) in &stats.blocks_by_type {
                    writeln!(f, "    - {block_type}: {count}")?;
                }
            }
        }

        let captured = &self.captured_content;
        writeln!(f, "\nCAPTURED CONTENT:")?;
        writeln!(f, "  Categories: {}", captured.categories)?;
        writeln!(f, "  Guidelines: {}", captured.guidelines)?;
        writeln!(f, "  Parts: {}", captured.parts)?;
        writeln!(f, "  Recommendations: {}", captured.recommendations)?;
        if !captured.fields_captured.is_empty() {
            writeln!(f, "  Fields populated:")?;
            for field in &captured.fields_captured {
                writeln!(f, "    + {field}")?;
            }
        }
        if !captured.fields_empty.is_empty() {
            writeln!(f, "  Fields empty/missing:")?;
            for field in &captured.fields_empty {
                writeln!(f, "    - {field}")?;
            }
        }

        let metrics = &self.coverage_metrics;
        writeln!(f, "\nCOVERAGE METRICS:")?;
        writeln!(f, "  Overall Score: {:.1}/100", metrics.overall_score)?;
        if stats.total_blocks > 0 {
            writeln!(f, "  Block Coverage: {:.1}%", metrics.block_coverage)?;
            writeln!(f, "  Character Coverage: {:.1}%", metrics.character_coverage)?;
        }
        writeln!(
            f,
            "  Required Fields: {}/{}",
            metrics.required_fields_covered, metrics.required_fields_total
        )?;
        writeln!(
            f,
            "  Optional Fields: {}/{}",
            metrics.optional_fields_covered, metrics.optional_fields_total
        )?;
        if !metrics.quality_indicators.is_empty() {
            writeln!(f, "  Quality indicators:")?;
            for (indicator, value) in &metrics.quality_indicators {
                writeln!(f, "    {indicator}: {value}")?;
            }
        }

        if !self.unmapped_content.is_empty() {
            writeln!(f, "\nUNMAPPED CONTENT:")?;
            writeln!(f, "  Total unmapped items: {}", self.unmapped_content.len())?;
            for (i, item) in self.unmapped_content.iter().take(MAX_UNMAPPED_SHOWN).enumerate() {
                writeln!(f, "\n  [{}] Type: {}", i + 1, item.content_type)?;
                writeln!(f, "      Location: {}", item.source_location)?;
                writeln!(f, "      Reason: {}", item.reason)?;
                if !item.suggested_field.is_empty() {
                    writeln!(f, "      Suggested schema field: {}", item.suggested_field)?;
                }
                writeln!(f, "      Content: {}", truncate_chars(&item.content, GAP_EXAMPLE_CHARS))?;
            }
            if self.unmapped_content.len() > MAX_UNMAPPED_SHOWN {
                writeln!(
                    f,
                    "  ... and {} more",
                    self.unmapped_content.len() - MAX_UNMAPPED_SHOWN
                )?;
            }
        }

        if !self.schema_gaps.is_empty() {
            writeln!(f, "\nSCHEMA GAPS IDENTIFIED:")?;
            for gap in &self.schema_gaps {
                writeln!(f, "\n  [{} priority] {}", gap.priority.as_str(), gap.suggested_field)?;
                writeln!(f, "    {}", gap.description)?;
                writeln!(f, "    Occurrences: {}", gap.occurrence_count)?;
                for example in &gap.examples {
                    writeln!(f, "      - {example}")?;
                }
            }
        }

        if !self.recommendations.is_empty() {
            writeln!(f, "\nRECOMMENDATIONS:")?;
            for (i, rec) in self.recommendations.iter().enumerate() {
                writeln!(f, "\n  {}. [{}] {}", i + 1, rec.priority.as_str(), rec.description)?;
                writeln!(f, "     Target: {}", rec.target)?;
                writeln!(f, "     Rationale: {}", rec.rationale)?;
            }
        }

        write!(f, "\n{rule}")
    }
}
