use std::fs;

use chrono::{Duration, TimeZone, Utc};
use tempfile::TempDir;

use super::*;
use crate::coverage::analyze_final;
use crate::guidance::Metadata;
use crate::model::{DocumentMetadata, Page, ParsedMetadata, SegmentedMetadata};
use crate::validator::Validator;

fn store() -> (TempDir, Storage) {
    let dir = TempDir::new().expect("temp dir should be created");
    let storage = Storage::open(dir.path()).expect("storage should open");
    (dir, storage)
}

fn parsed(document_id: &str) -> ParsedDocument {
    ParsedDocument {
        metadata: ParsedMetadata {
            source_file: "source.txt".to_string(),
            parser: "text".to_string(),
            parsed_at: Utc::now(),
            version: 0,
            document_id: document_id.to_string(),
        },
        pages: vec![Page {
            page_number: 1,
            blocks: Vec::new(),
        }],
    }
}

fn segmented(document_id: &str) -> SegmentedDocument {
    SegmentedDocument {
        metadata: SegmentedMetadata {
            source_version: 1,
            segmenter: "generic-v1.0".to_string(),
            segmented_at: Utc::now(),
            version: 0,
            document_id: document_id.to_string(),
        },
        document_metadata: DocumentMetadata::default(),
        front_matter: String::new(),
        categories: Vec::new(),
        unmapped_content: Vec::new(),
    }
}

fn final_doc(title: &str) -> GuidanceDocument {
    GuidanceDocument {
        metadata: Metadata {
            id: "acme".to_string(),
            title: title.to_string(),
            description: "desc".to_string(),
            author: "Acme".to_string(),
            ..Metadata::default()
        },
        ..GuidanceDocument::default()
    }
}

#[test]
fn versions_increase_and_zero_loads_latest() {
    let (_dir, storage) = store();

    for expected in 1..=3 {
        let mut doc = parsed("acme");
        doc.metadata.source_file = format!("run-{expected}.txt");
        let version = storage.save_parsed(&mut doc).expect("save should succeed");
        assert_eq!(version, expected);
        assert_eq!(doc.metadata.version, expected);
    }

    let latest = storage.load_parsed("acme", 0).expect("latest should load");
    assert_eq!(latest.metadata.version, 3);
    assert_eq!(latest.metadata.source_file, "run-3.txt");

    let first = storage.load_parsed("acme", 1).expect("v1 should load");
    assert_eq!(first.metadata.source_file, "run-1.txt");

    let versions = storage
        .list_versions("acme", ArtifactKind::Parsed)
        .expect("versions should list");
    let numbers = versions.iter().map(|meta| meta.version).collect::<Vec<_>>();
    assert_eq!(numbers, vec![3, 2, 1]);
    assert!(versions.iter().all(|meta| meta.checksum.len() == 64));
}

#[test]
fn parsed_and_segmented_share_version_directories() {
    let (dir, storage) = store();

    storage
        .save_parsed(&mut parsed("acme"))
        .expect("parsed save should succeed");
    let version = storage
        .save_segmented(&mut segmented("acme"))
        .expect("segmented save should succeed");
    assert_eq!(version, 1);

    let v1 = dir.path().join("intermediate/acme/v1");
    assert!(v1.join("parsed.json").is_file());
    assert!(v1.join("segmented.json").is_file());
    assert!(v1.join("metadata-parsed.json").is_file());
    assert!(v1.join("metadata-segmented.json").is_file());

    assert_eq!(storage.latest_version("acme", ArtifactKind::Parsed).expect("latest"), 1);
    assert_eq!(
        storage
            .load_segmented("acme", 0)
            .expect("segmented should load")
            .metadata
            .version,
        1
    );
}

#[test]
fn claimed_version_is_skipped() {
    let (dir, storage) = store();
    storage
        .save_parsed(&mut parsed("acme"))
        .expect("save should succeed");

    let squatted = dir.path().join("intermediate/acme/v2");
    fs::create_dir_all(&squatted).expect("dir should be created");
    fs::write(squatted.join("parsed.json"), "{}").expect("file should be written");

    let version = storage
        .save_parsed(&mut parsed("acme"))
        .expect("save should succeed");
    assert_eq!(version, 3);
    assert_eq!(
        fs::read_to_string(squatted.join("parsed.json")).expect("file should read"),
        "{}"
    );
}

#[test]
fn missing_artifacts_report_not_found() {
    let (_dir, storage) = store();

    let err = storage.load_parsed("ghost", 0).expect_err("nothing stored");
    assert!(err.is_not_found());

    storage
        .save_parsed(&mut parsed("acme"))
        .expect("save should succeed");
    let err = storage.load_parsed("acme", 7).expect_err("v7 does not exist");
    assert!(err.is_not_found());
    assert!(err.to_string().contains("v7"));

    let err = storage.load_segmented("acme", 0).expect_err("no segmented yet");
    assert!(err.is_not_found());

    let err = storage.load_final("acme").expect_err("no final yet");
    assert!(err.is_not_found());
}

#[test]
fn document_ids_that_escape_the_store_are_rejected() {
    let (dir, storage) = store();

    for id in ["../../escaped", "a/b", "a\\b", "..", "", "/abs"] {
        let err = storage
            .save_parsed(&mut parsed(id))
            .expect_err("id should be rejected");
        assert!(
            matches!(err, StoreError::InvalidDocumentId { .. }),
            "unexpected error for {id:?}: {err}"
        );
    }

    let err = storage
        .save_final("../outside", &final_doc("Escape"), FinalFormat::Json)
        .expect_err("final id should be rejected");
    assert!(matches!(err, StoreError::InvalidDocumentId { .. }));
    assert!(storage.load_final("../outside").is_err());

    let escaped = dir.path().parent().map(|parent| parent.join("escaped"));
    assert!(escaped.is_none_or(|path| !path.exists()));
    assert!(storage.document_ids().expect("ids should list").is_empty());
}

#[test]
fn unknown_document_has_empty_history() {
    let (_dir, storage) = store();
    let versions = storage
        .list_versions("ghost", ArtifactKind::Segmented)
        .expect("listing should succeed");
    assert!(versions.is_empty());
    assert_eq!(
        storage
            .latest_version("ghost", ArtifactKind::Segmented)
            .expect("latest should resolve"),
        0
    );
}

#[test]
fn labeled_save_records_description() {
    let (_dir, storage) = store();
    storage
        .save_segmented(&mut segmented("acme"))
        .expect("save should succeed");
    storage
        .save_segmented_with_label(
            &mut segmented("acme"),
            "post-enhance-passthrough (pre-enhance: v1)",
        )
        .expect("labeled save should succeed");

    let versions = storage
        .list_versions("acme", ArtifactKind::Segmented)
        .expect("versions should list");
    assert_eq!(versions[0].version, 2);
    assert_eq!(
        versions[0].description,
        "post-enhance-passthrough (pre-enhance: v1)"
    );
    assert!(versions[1].description.is_empty());
}

#[test]
fn final_overwrite_keeps_ledger_trail() {
    let (dir, storage) = store();

    let first = storage
        .save_final("acme", &final_doc("First"), FinalFormat::Yaml)
        .expect("yaml save should succeed");
    assert_eq!(first, dir.path().join("final/acme.yaml"));

    let second = storage
        .save_final("acme", &final_doc("Second"), FinalFormat::Json)
        .expect("json save should succeed");
    assert_eq!(second, dir.path().join("final/acme.json"));
    assert!(!first.exists());

    let loaded = storage.load_final("acme").expect("final should load");
    assert_eq!(loaded.metadata.title, "Second");

    let finals = storage
        .ledger_entries("acme")
        .expect("ledger should read")
        .into_iter()
        .filter(|entry| entry.artifact_type == "final")
        .collect::<Vec<_>>();
    assert_eq!(finals.len(), 2);
    assert!(finals[0].path.ends_with("acme.json"));
    assert!(finals[1].path.ends_with("acme.yaml"));
    assert_ne!(finals[0].sha256, finals[1].sha256);
    assert!(finals.iter().all(|entry| entry.version.is_none()));
}

#[test]
fn final_format_parsing() {
    assert_eq!("yml".parse::<FinalFormat>().expect("yml"), FinalFormat::Yaml);
    assert_eq!(" JSON ".parse::<FinalFormat>().expect("json"), FinalFormat::Json);

    let err = "xml".parse::<FinalFormat>().expect_err("xml is unsupported");
    assert!(matches!(err, StoreError::UnsupportedFormat(ref value) if value == "xml"));
}

#[test]
fn yml_final_is_loaded() {
    let (dir, storage) = store();
    let final_dir = dir.path().join("final");
    fs::create_dir_all(&final_dir).expect("dir should be created");
    let yaml = serde_yaml::to_string(&final_doc("Legacy")).expect("yaml should encode");
    fs::write(final_dir.join("acme.yml"), yaml).expect("file should be written");

    let loaded = storage.load_final("acme").expect("yml final should load");
    assert_eq!(loaded.metadata.title, "Legacy");
    assert_eq!(storage.document_ids().expect("ids"), vec!["acme"]);
}

#[test]
fn validation_reports_are_newest_first_and_never_clobbered() {
    let (dir, storage) = store();
    let result = Validator::new(true).validate(&final_doc("Report"));
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().expect("valid date");

    let mut older = ValidationReport::new("acme", ValidationStage::Convert, true, &result, Some(1));
    older.timestamp = at;
    let mut newer = ValidationReport::new("acme", ValidationStage::Convert, true, &result, Some(2));
    newer.timestamp = at + Duration::seconds(30);
    let mut twin = older.clone();
    twin.source_version = Some(3);

    storage.save_validation_report(&older).expect("save should succeed");
    storage.save_validation_report(&newer).expect("save should succeed");
    let twin_path = storage
        .save_validation_report(&twin)
        .expect("same-second save should succeed");
    assert_eq!(
        twin_path,
        dir.path()
            .join("validation-reports/acme/convert-20240501-120000-2.json")
    );

    let reports = storage
        .load_validation_reports("acme")
        .expect("reports should load");
    assert_eq!(reports.len(), 3);
    assert_eq!(reports[0].source_version, Some(2));
    assert!(!reports[0].valid);
    assert_eq!(reports[0].error_count, result.errors.len());

    assert!(storage
        .load_validation_reports("ghost")
        .expect("missing dir is empty")
        .is_empty());
}

#[test]
fn final_with_validation_saves_report() {
    let (_dir, storage) = store();
    let doc = final_doc("Gated");
    let result = Validator::new(false).validate(&doc);
    let report = ValidationReport::new("acme", ValidationStage::Convert, false, &result, Some(1));

    storage
        .save_final_with_validation("acme", &doc, FinalFormat::Yaml, Some(&report))
        .expect("save should succeed");

    let reports = storage
        .load_validation_reports("acme")
        .expect("reports should load");
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].stage, ValidationStage::Convert);
}

#[test]
fn coverage_reports_filter_by_document() {
    let (_dir, storage) = store();

    let mut first = analyze_final(&final_doc("One"));
    first.document_id = "acme".to_string();
    first.timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("valid date");
    let mut second = first.clone();
    second.timestamp += Duration::minutes(5);
    let mut other = first.clone();
    other.document_id = "acme-extra".to_string();

    for report in [&first, &second, &other] {
        storage.save_coverage_report(report).expect("save should succeed");
    }

    let reports = storage
        .load_coverage_reports("acme")
        .expect("reports should load");
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].timestamp, second.timestamp);
    assert!(reports.iter().all(|report| report.document_id == "acme"));
}

#[test]
fn document_ids_and_ledger_summary() {
    let (_dir, storage) = store();
    storage
        .save_parsed(&mut parsed("beta"))
        .expect("save should succeed");
    storage
        .save_parsed(&mut parsed("alpha"))
        .expect("save should succeed");
    storage
        .save_segmented(&mut segmented("alpha"))
        .expect("save should succeed");
    storage
        .save_final("gamma", &final_doc("Gamma"), FinalFormat::Json)
        .expect("save should succeed");

    assert_eq!(
        storage.document_ids().expect("ids should list"),
        vec!["alpha", "beta", "gamma"]
    );

    let summary = storage.ledger_summary().expect("summary should load");
    let parsed_row = summary
        .iter()
        .find(|row| row.artifact_type == "parsed")
        .expect("parsed row");
    assert_eq!((parsed_row.documents, parsed_row.writes), (2, 2));
    assert!(summary.iter().any(|row| row.artifact_type == "final"));
}

#[test]
fn in_memory_ledger_orders_newest_first() {
    let ledger = Ledger::open_in_memory().expect("ledger should open");
    for version in 1..=2 {
        ledger
            .record(&LedgerEntry {
                document_id: "acme".to_string(),
                artifact_type: "parsed".to_string(),
                version: Some(version),
                path: format!("intermediate/acme/v{version}/parsed.json"),
                sha256: sha256_hex(&[version as u8]),
                size: 1,
                description: None,
                recorded_at: Utc::now(),
            })
            .expect("record should succeed");
    }

    let entries = ledger.entries_for("acme").expect("entries should load");
    assert_eq!(entries[0].version, Some(2));
    assert_eq!(entries[1].version, Some(1));
}
