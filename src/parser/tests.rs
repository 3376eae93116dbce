use std::fs;

use tempfile::TempDir;

use super::*;
use crate::model::BlockType;

fn classifier() -> TextClassifier {
    TextClassifier::new().expect("classifier should build")
}

#[test]
fn classifies_headings_lists_and_paragraphs() {
    let text = "\
1. Access Control
Implement strong access
control for every system.

1.1 User Authentication
  - Require MFA for administrators
    on every login
* Review accounts
a. lowercase lettered item
";
    let blocks = classifier().classify_page(text);
    let kinds = blocks
        .iter()
        .map(|block| (block.block_type, block.text.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        kinds,
        vec![
            (BlockType::Heading, "1. Access Control"),
            (
                BlockType::Paragraph,
                "Implement strong access control for every system."
            ),
            (BlockType::Heading, "1.1 User Authentication"),
            (
                BlockType::List,
                "Require MFA for administrators on every login"
            ),
            (BlockType::List, "Review accounts"),
            (BlockType::List, "lowercase lettered item"),
        ]
    );

    assert_eq!(blocks[0].level, 1);
    assert_eq!(blocks[0].font_size, Some(16.0));
    assert_eq!(blocks[2].level, 2);

    let first_item = blocks[3].list_item.as_ref().expect("list metadata");
    assert_eq!(first_item.marker, "-");
    assert_eq!(first_item.list_type, "unordered");
    assert_eq!(first_item.level, 1);
}

#[test]
fn ordered_list_needs_lowercase_body() {
    let blocks = classifier().classify_page("1. ensure logs are kept\n      2. rotate keys yearly\n");
    assert_eq!(blocks.len(), 2);
    assert!(blocks.iter().all(|block| block.block_type == BlockType::List));

    let nested = blocks[1].list_item.as_ref().expect("list metadata");
    assert_eq!(nested.list_type, "ordered");
    assert_eq!(nested.marker, "2.");
    assert_eq!(nested.level, 3);
}

#[test]
fn caps_heading_levels_depend_on_length() {
    let blocks = classifier().classify_page(
        "SCOPE\n\nREQUIREMENTS FOR SERVICE PROVIDERS AND MERCHANTS\n",
    );
    assert_eq!(blocks[0].level, 1);
    assert_eq!(blocks[1].level, 2);
}

#[test]
fn skips_page_furniture_and_toc_lines() {
    let text = "\
Page 4 of 120
© 2024 Example Council. All rights reserved.
Contents
Introduction ........................ 3
Date      Version      Description
42
Body text that remains.
";
    let blocks = classifier().classify_page(text);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].text, "Contents Body text that remains.");
}

#[test]
fn page_phrase_inside_prose_is_kept() {
    let blocks = classifier().classify_page("see page 5 for the full table\n");
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].text, "see page 5 for the full table");
}

#[test]
fn collapses_layout_padding_and_short_leaders() {
    let blocks = classifier().classify_page("Scope   of this   document ... 12\n");
    assert_eq!(blocks[0].text, "Scope of this document");
}

#[test]
fn pages_keep_their_position() {
    let pages = split_pages("first page text\n\u{000C}\n\u{000C}third page text\n\u{000C}\n\n");
    assert_eq!(pages.len(), 3);

    let classified = classifier().classify_pages(&pages);
    let numbers = classified
        .iter()
        .map(|page| page.page_number)
        .collect::<Vec<_>>();
    assert_eq!(numbers, vec![1, 3]);
}

#[test]
fn split_pages_strips_nul_bytes() {
    let pages = split_pages("a\u{0000}b\u{000C}c");
    assert_eq!(pages, vec!["ab".to_string(), "c".to_string()]);
}

#[test]
fn text_parser_reads_file() {
    let dir = TempDir::new().expect("temp dir should be created");
    let path = dir.path().join("acme-standard.txt");
    fs::write(&path, "1. Scope\nApplies to all systems.\n\u{000C}2. Access\nUse MFA.\n")
        .expect("file should be written");

    let parser = build_parser(ParserKind::Text, Some(1)).expect("parser should build");
    let doc = parser.parse(&path).expect("parse should succeed");

    assert_eq!(doc.metadata.parser, "text-v1.0");
    assert_eq!(doc.metadata.version, 0);
    assert!(doc.metadata.document_id.is_empty());
    assert_eq!(doc.pages.len(), 1);
    assert_eq!(doc.pages[0].blocks[0].text, "1. Scope");
    assert_eq!(
        document_id_from_path(&path).as_deref(),
        Some("acme-standard")
    );
}

#[test]
fn json_parser_imports_blocks() {
    let dir = TempDir::new().expect("temp dir should be created");
    let path = dir.path().join("blocks.json");
    let raw = r#"{
      "metadata": {"parsed_at": "2024-05-01T00:00:00Z", "document_id": "acme", "version": 9},
      "pages": [
        {"page_number": 1, "blocks": [{"type": "heading", "level": 1, "text": "1. Scope"}]},
        {"page_number": 2, "blocks": [{"type": "paragraph", "text": "Body."}]}
      ]
    }"#;
    fs::write(&path, raw).expect("file should be written");

    let parser = build_parser(ParserKind::Json, None).expect("parser should build");
    let doc = parser.parse(&path).expect("parse should succeed");

    assert_eq!(doc.metadata.document_id, "acme");
    assert_eq!(doc.metadata.version, 0);
    assert_eq!(doc.metadata.parser, "json-v1.0");
    assert_eq!(doc.pages.len(), 2);
    assert_eq!(doc.pages[0].blocks[0].level, 1);
}

#[test]
fn json_parser_rejects_garbage() {
    let dir = TempDir::new().expect("temp dir should be created");
    let path = dir.path().join("broken.json");
    fs::write(&path, "not json").expect("file should be written");

    let parser = build_parser(ParserKind::Json, None).expect("parser should build");
    let err = parser.parse(&path).expect_err("garbage should fail");
    assert!(err.to_string().contains("failed to parse block json"));
}
