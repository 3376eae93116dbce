use chrono::Utc;

use super::*;
use crate::guidance::{Applicability, Category, DocumentType, Guideline, Metadata, Part};
use crate::model::{
    Block, DocumentMetadata, Page, ParsedMetadata, SegmentCategory, SegmentGuideline,
    SegmentPart, SegmentedMetadata,
};

fn parsed(blocks: Vec<Block>) -> ParsedDocument {
    ParsedDocument {
        metadata: ParsedMetadata {
            source_file: "doc.txt".to_string(),
            parser: "text".to_string(),
            parsed_at: Utc::now(),
            version: 1,
            document_id: "doc".to_string(),
        },
        pages: vec![Page {
            page_number: 1,
            blocks,
        }],
    }
}

fn segmented(meta: DocumentMetadata, unmapped: Vec<UnmappedContent>) -> SegmentedDocument {
    SegmentedDocument {
        metadata: SegmentedMetadata {
            source_version: 1,
            segmenter: "generic-v1.0".to_string(),
            segmented_at: Utc::now(),
            version: 1,
            document_id: "doc".to_string(),
        },
        document_metadata: meta,
        front_matter: String::new(),
        categories: vec![SegmentCategory {
            id: "1".to_string(),
            title: "Access".to_string(),
            description: String::new(),
            guidelines: vec![SegmentGuideline {
                id: "1.1".to_string(),
                title: "MFA".to_string(),
                objective: "Ensure MFA".to_string(),
                recommendations: vec!["Users must enroll".to_string()],
                parts: vec![SegmentPart {
                    id: "1.1.1".to_string(),
                    text: "Admins".to_string(),
                    ..SegmentPart::default()
                }],
            }],
        }],
        unmapped_content: unmapped,
    }
}

fn full_metadata() -> DocumentMetadata {
    DocumentMetadata {
        id: "doc".to_string(),
        title: "Doc".to_string(),
        description: "Desc".to_string(),
        author: "Author".to_string(),
        version: "1.0".to_string(),
        publication_date: "January 1, 2024".to_string(),
        document_type: "Standard".to_string(),
        jurisdictions: vec!["United States".to_string()],
        industry_sectors: Vec::new(),
    }
}

fn unmapped(content: &str, content_type: &str, suggested: &str) -> UnmappedContent {
    UnmappedContent {
        content: content.to_string(),
        content_type: content_type.to_string(),
        source_location: "page 1".to_string(),
        reason: "no matching field".to_string(),
        suggested_field: suggested.to_string(),
    }
}

#[test]
fn zero_blocks_keep_scores_in_bounds() {
    let report = analyze_segmented(&parsed(Vec::new()), &segmented(DocumentMetadata::default(), Vec::new()));

    let metrics = &report.coverage_metrics;
    assert_eq!(metrics.block_coverage, 0.0);
    assert_eq!(metrics.character_coverage, 0.0);
    assert_eq!(metrics.overall_score, 0.0);
    assert_eq!(metrics.quality_indicators["overall"], "needs_improvement");
    assert_eq!(metrics.quality_indicators["content_capture"], "partial");
}

#[test]
fn fully_captured_document_scores_one_hundred() {
    let blocks = vec![Block::heading(1, "1. Access"), Block::paragraph("Text")];
    let report = analyze_segmented(&parsed(blocks), &segmented(full_metadata(), Vec::new()));

    let metrics = &report.coverage_metrics;
    assert_eq!(metrics.block_coverage, 100.0);
    assert_eq!(metrics.required_fields_covered, 4);
    assert_eq!(metrics.optional_fields_covered, 4);
    assert!((metrics.overall_score - 100.0).abs() < f64::EPSILON);
    assert_eq!(metrics.quality_indicators["overall"], "excellent");
    assert_eq!(metrics.quality_indicators["content_capture"], "comprehensive");
    assert_eq!(metrics.quality_indicators["content_depth"], "detailed");

    assert_eq!(report.source_stats.total_blocks, 2);
    assert_eq!(report.source_stats.blocks_by_type["heading"], 1);
    assert_eq!(report.captured_content.parts, 1);
    assert_eq!(report.captured_content.recommendations, 1);
    assert!(report.recommendations.is_empty());
}

#[test]
fn more_unmapped_items_than_blocks_is_clamped() {
    let items = (0..5).map(|i| unmapped(&format!("item {i}"), "table", "")).collect();
    let report = analyze_segmented(&parsed(vec![Block::paragraph("x")]), &segmented(full_metadata(), items));

    let metrics = &report.coverage_metrics;
    assert_eq!(metrics.block_coverage, 0.0);
    assert_eq!(metrics.character_coverage, 0.0);
    assert!((0.0..=100.0).contains(&metrics.overall_score));
}

#[test]
fn gaps_group_by_field_and_rank_by_count() {
    let mut items = Vec::new();
    for i in 0..10 {
        items.push(unmapped(&format!("risk {i}"), "paragraph", "rationale.risks"));
    }
    for i in 0..3 {
        items.push(unmapped(&format!("table {i}"), "table", ""));
    }
    items.push(unmapped(&"z".repeat(150), "footnote", "notes"));

    let gaps = identify_schema_gaps(&items);
    let fields = gaps
        .iter()
        .map(|gap| (gap.suggested_field.as_str(), gap.occurrence_count, gap.priority))
        .collect::<Vec<_>>();
    assert_eq!(
        fields,
        vec![
            ("rationale.risks", 10, Priority::High),
            ("table", 3, Priority::Medium),
            ("notes", 1, Priority::Low),
        ]
    );

    assert_eq!(gaps[0].examples.len(), 3);
    assert_eq!(gaps[0].examples[0], "risk 0");
    assert_eq!(gaps[2].examples[0].chars().count(), 100);
    assert!(gaps[2].examples[0].ends_with("..."));
    assert_eq!(
        gaps[1].description,
        "Content of type 'table' cannot be captured by current schema"
    );
}

#[test]
fn segmented_recommendations_cover_gaps_type_and_low_coverage() {
    let mut meta = full_metadata();
    meta.document_type.clear();
    let items = vec![unmapped("a", "table", ""), unmapped("b", "table", "")];
    let blocks = vec![Block::paragraph("a"), Block::paragraph("b"), Block::paragraph("c")];

    let report = analyze_segmented(&parsed(blocks), &segmented(meta, items));
    let kinds = report
        .recommendations
        .iter()
        .map(|rec| rec.kind.as_str())
        .collect::<Vec<_>>();
    assert_eq!(kinds, vec!["add_field", "extraction_improvement", "schema_extension"]);
    assert_eq!(report.recommendations[0].examples, vec!["a", "b"]);
    assert!(report.recommendations[2].rationale.starts_with("Only 33.3%"));
}

fn final_document() -> GuidanceDocument {
    GuidanceDocument {
        metadata: Metadata {
            id: "doc".to_string(),
            title: "Doc".to_string(),
            description: "Desc".to_string(),
            author: "Author".to_string(),
            version: "1.0".to_string(),
            publication_date: "2024".to_string(),
            document_type: DocumentType::new("Framework"),
            applicability: Some(Applicability {
                jurisdictions: vec!["United States".to_string()],
                industry_sectors: Vec::new(),
            }),
            mapping_references: Vec::new(),
        },
        front_matter: "Intro".to_string(),
        categories: vec![Category {
            id: "AC".to_string(),
            title: "Access Control".to_string(),
            description: "Access".to_string(),
            guidelines: vec![Guideline {
                id: "AC-1".to_string(),
                title: "Policy".to_string(),
                objective: "Have a policy".to_string(),
                guideline_parts: vec![Part {
                    id: "AC-1(1)".to_string(),
                    text: "Review".to_string(),
                    ..Part::default()
                }],
                ..Guideline::default()
            }],
        }],
        ..GuidanceDocument::default()
    }
}

#[test]
fn final_analysis_scores_complete_document() {
    let report = analyze_final(&final_document());
    let metrics = &report.coverage_metrics;
    assert_eq!(metrics.required_fields_covered, 4);
    assert_eq!(metrics.optional_fields_covered, 5);
    assert!((metrics.overall_score - 100.0).abs() < 1e-9);
    assert_eq!(metrics.quality_indicators["completeness"], "excellent");
    assert_eq!(metrics.quality_indicators["content_depth"], "detailed");
    assert!(report.recommendations.is_empty());
    assert_eq!(report.source_stats.total_blocks, 0);
}

#[test]
fn final_analysis_recommends_fixes_for_gaps() {
    let mut doc = final_document();
    doc.metadata.id.clear();
    doc.metadata.document_type = DocumentType::default();
    doc.categories[0].guidelines[0].objective.clear();

    let report = analyze_final(&doc);
    let targets = report
        .recommendations
        .iter()
        .map(|rec| (rec.kind.as_str(), rec.target.as_str(), rec.priority))
        .collect::<Vec<_>>();
    assert_eq!(
        targets,
        vec![
            ("missing_required", "metadata.id", Priority::High),
            ("missing_field", "metadata.document_type", Priority::Medium),
            (
                "content_enhancement",
                "categories[0].guidelines[0].objective",
                Priority::Low
            ),
        ]
    );
}

#[test]
fn empty_final_document_is_flagged() {
    let report = analyze_final(&GuidanceDocument::default());
    assert_eq!(report.coverage_metrics.overall_score, 0.0);
    assert_eq!(report.coverage_metrics.quality_indicators["content_depth"], "empty");
    assert!(
        report
            .recommendations
            .iter()
            .any(|rec| rec.kind == "content_issue" && rec.target == "categories")
    );
}

#[test]
fn depth_buckets_follow_structure() {
    assert_eq!(depth_bucket(0, false, false), "empty");
    assert_eq!(depth_bucket(2, false, false), "shallow");
    assert_eq!(depth_bucket(2, true, false), "moderate");
    assert_eq!(depth_bucket(2, true, true), "detailed");
    assert_eq!(score_bucket(70.0), "good");
    assert_eq!(score_bucket(50.0), "fair");
}

#[test]
fn rendered_report_names_document_and_score() {
    let report = analyze_final(&final_document());
    let rendered = report.to_string();
    assert!(rendered.contains("SCHEMA COVERAGE REPORT: doc"));
    assert!(rendered.contains("Overall Score: 100.0/100"));
}
