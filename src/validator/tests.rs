use serde_json::Value;

use super::*;
use crate::guidance::{DocumentType, MappingEntry, Outcome, Risk};

fn part(id: &str, text: &str) -> Part {
    Part {
        id: id.to_string(),
        text: text.to_string(),
        ..Part::default()
    }
}

fn guideline(id: &str, parts: Vec<Part>) -> Guideline {
    Guideline {
        id: id.to_string(),
        title: format!("Guideline {id}"),
        guideline_parts: parts,
        ..Guideline::default()
    }
}

fn category(id: &str, guidelines: Vec<Guideline>) -> Category {
    Category {
        id: id.to_string(),
        title: format!("Category {id}"),
        description: format!("Description {id}"),
        guidelines,
    }
}

fn document(categories: Vec<Category>) -> GuidanceDocument {
    GuidanceDocument {
        metadata: Metadata {
            id: "doc".to_string(),
            title: "Doc".to_string(),
            description: "A document".to_string(),
            author: "Someone".to_string(),
            document_type: DocumentType::new("Standard"),
            ..Metadata::default()
        },
        categories,
        ..GuidanceDocument::default()
    }
}

fn paths(result: &ValidationResult) -> Vec<&str> {
    result.errors.iter().map(|error| error.path.as_str()).collect()
}

#[test]
fn complete_document_is_valid() {
    let doc = document(vec![category("1", vec![guideline("1.1", vec![part("1.1.1", "text")])])]);
    let result = Validator::new(true).validate(&doc);
    assert!(result.valid, "{result}");
    assert!(result.errors.is_empty());
}

#[test]
fn empty_guideline_id_reports_indexed_path() {
    let doc = document(vec![
        category("1", vec![guideline("1.1", Vec::new())]),
        category("2", vec![guideline("2.1", Vec::new())]),
        category("3", vec![guideline("3.1", Vec::new()), guideline("", Vec::new())]),
    ]);

    let result = Validator::new(false).validate(&doc);
    assert!(!result.valid);
    assert_eq!(paths(&result), vec!["categories[2].guidelines[1].id"]);
    assert_eq!(result.errors[0].message, "required field is empty");
}

#[test]
fn duplicate_category_id_reported_once_at_second_occurrence() {
    let doc = document(vec![category("1", Vec::new()), category("1", Vec::new())]);

    let result = Validator::new(false).validate(&doc);
    let duplicates = result
        .errors
        .iter()
        .filter(|error| error.message == "duplicate category ID")
        .collect::<Vec<_>>();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].path, "categories[1].id");
    assert_eq!(duplicates[0].value, Some(Value::String("1".to_string())));
}

#[test]
fn duplicate_guideline_and_part_ids_are_scoped_to_parent() {
    let doc = document(vec![
        category(
            "1",
            vec![
                guideline("1.1", vec![part("a", "x"), part("a", "y")]),
                guideline("1.1", vec![part("a", "z")]),
            ],
        ),
        category("2", vec![guideline("1.1", Vec::new())]),
    ]);

    let result = Validator::new(false).validate(&doc);
    assert_eq!(
        paths(&result),
        vec![
            "categories[0].guidelines[0].guideline-parts[1].id",
            "categories[0].guidelines[1].id",
        ]
    );
    assert_eq!(result.errors[0].message, "duplicate part ID");
    assert_eq!(result.errors[1].message, "duplicate guideline ID");
}

#[test]
fn empty_part_text_uses_schema_field_names() {
    let doc = document(vec![category("1", vec![guideline("1.1", vec![part("1.1.1", "")])])]);
    let result = Validator::new(false).validate(&doc);
    assert_eq!(
        paths(&result),
        vec!["categories[0].guidelines[0].guideline-parts[0].text"]
    );
}

#[test]
fn missing_metadata_fields_all_reported() {
    let mut doc = document(vec![category("1", Vec::new())]);
    doc.metadata.id.clear();
    doc.metadata.title.clear();
    doc.metadata.description.clear();
    doc.metadata.author.clear();

    let result = Validator::new(false).validate(&doc);
    assert_eq!(
        paths(&result),
        vec![
            "metadata.id",
            "metadata.title",
            "metadata.description",
            "metadata.author",
        ]
    );
}

#[test]
fn unknown_document_type_is_rejected_with_value() {
    let mut doc = document(vec![category("1", Vec::new())]);
    doc.metadata.document_type = DocumentType::new("Memo");

    let result = Validator::new(false).validate(&doc);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].path, "metadata.document-type");
    assert_eq!(
        result.errors[0].message,
        "must be one of: Standard, Regulation, Best Practice, Framework"
    );
    assert_eq!(result.errors[0].value, Some(Value::String("Memo".to_string())));
}

#[test]
fn strict_mode_requires_document_type_and_categories() {
    let mut doc = document(Vec::new());
    doc.metadata.document_type = DocumentType::default();

    let lenient = Validator::new(false).validate(&doc);
    assert!(lenient.valid, "{lenient}");

    let strict = Validator::new(true).validate(&doc);
    assert_eq!(paths(&strict), vec!["metadata.document-type", "categories"]);
    assert_eq!(strict.errors[1].message, "document must have at least one category");
}

#[test]
fn rationale_entries_need_title_and_description() {
    let mut g = guideline("1.1", Vec::new());
    g.rationale = Some(Rationale {
        risks: vec![Risk {
            title: "Breach".to_string(),
            description: String::new(),
        }],
        outcomes: vec![Outcome::default()],
    });
    let doc = document(vec![category("1", vec![g])]);

    let result = Validator::new(false).validate(&doc);
    assert_eq!(
        paths(&result),
        vec![
            "categories[0].guidelines[0].rationale.risks[0].description",
            "categories[0].guidelines[0].rationale.outcomes[0].title",
            "categories[0].guidelines[0].rationale.outcomes[0].description",
        ]
    );
}

#[test]
fn mapping_strength_out_of_range_is_flagged() {
    let mut g = guideline("1.1", Vec::new());
    g.guideline_mappings = vec![Mapping {
        reference_id: "NIST".to_string(),
        entries: vec![
            MappingEntry {
                reference_id: "AC-1".to_string(),
                strength: 50,
                remarks: String::new(),
            },
            MappingEntry {
                reference_id: String::new(),
                strength: 101,
                remarks: String::new(),
            },
        ],
        remarks: String::new(),
    }];
    let mut doc = document(vec![category("1", vec![g])]);
    doc.imported_principles = vec![Mapping::default()];

    let result = Validator::new(false).validate(&doc);
    assert_eq!(
        paths(&result),
        vec![
            "categories[0].guidelines[0].guideline-mappings[0].entries[1].reference-id",
            "categories[0].guidelines[0].guideline-mappings[0].entries[1].strength",
            "imported-principles[0].reference-id",
        ]
    );
    assert_eq!(result.errors[1].value, Some(Value::from(101)));
}

#[test]
fn mapping_references_require_id_title_version() {
    let mut doc = document(vec![category("1", Vec::new())]);
    doc.metadata.mapping_references = vec![MappingReference {
        id: "ref".to_string(),
        ..MappingReference::default()
    }];

    let result = Validator::new(false).validate(&doc);
    assert_eq!(
        paths(&result),
        vec![
            "metadata.mapping-references[0].title",
            "metadata.mapping-references[0].version",
        ]
    );
}

#[test]
fn decode_failures_become_root_violations() {
    let validator = Validator::new(false);

    let json = validator.validate_json(b"{ not json");
    assert!(!json.valid);
    assert_eq!(json.errors.len(), 1);
    assert_eq!(json.errors[0].path, "");
    assert!(json.errors[0].message.starts_with("invalid JSON: "));

    let yaml = validator.validate_yaml(b"metadata: [unclosed");
    assert!(!yaml.valid);
    assert!(yaml.errors[0].message.starts_with("invalid YAML: "));
}

#[test]
fn validate_file_detects_format() {
    let dir = tempfile::tempdir().expect("tempdir");
    let doc = document(vec![category("1", Vec::new())]);

    let json_path = dir.path().join("doc.json");
    std::fs::write(&json_path, serde_json::to_vec(&doc).expect("encode json")).expect("write json");
    let yaml_path = dir.path().join("doc.yaml");
    std::fs::write(&yaml_path, serde_yaml::to_string(&doc).expect("encode yaml")).expect("write yaml");

    let validator = Validator::new(true);
    assert!(validator.validate_file(&json_path).expect("validate json").valid);
    assert!(validator.validate_file(&yaml_path).expect("validate yaml").valid);
    assert!(validator.validate_file(&dir.path().join("missing.yaml")).is_err());
}

#[test]
fn summary_lists_every_violation() {
    let doc = document(vec![category("1", Vec::new()), category("1", Vec::new())]);
    let result = Validator::new(false).validate(&doc);
    let rendered = result.to_string();
    assert!(rendered.starts_with("validation failed with 1 errors:"));
    assert!(rendered.contains("categories[1].id: duplicate category ID (got: 1)"));
}
