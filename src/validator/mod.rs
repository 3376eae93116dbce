#[cfg(test)]
mod tests;

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::guidance::{
    Category, GuidanceDocument, Guideline, Mapping, MappingReference, Metadata, Part, Rationale,
    looks_like_json,
};

const REQUIRED: &str = "required field is empty";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub path: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(Value::String(value)) => {
                write!(f, "{}: {} (got: {})", self.path, self.message, value)
            }
            Some(value) => write!(f, "{}: {} (got: {})", self.path, self.message, value),
            None => write!(f, "{}: {}", self.path, self.message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Violation>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }
}

impl ValidationResult {
    pub fn add_error(
        &mut self,
        path: impl Into<String>,
        message: impl Into<String>,
        value: Option<Value>,
    ) {
        self.valid = false;
        self.errors.push(Violation {
            path: path.into(),
            message: message.into(),
            value,
        });
    }

    fn required(&mut self, path: String, value: &str) {
        if value.is_empty() {
            self.add_error(path, REQUIRED, None);
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid {
            return write!(f, "validation passed");
        }
        write!(f, "validation failed with {} errors:", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

/// Structural checks for a finished guidance document. Every violation is
/// collected; validation never stops at the first one.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    strict: bool,
}

impl Validator {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn validate(&self, doc: &GuidanceDocument) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_metadata(&doc.metadata, &mut result);
        self.validate_categories(&doc.categories, &mut result);

        for (i, mapping) in doc.imported_guidelines.iter().enumerate() {
            validate_mapping(mapping, &format!("imported-guidelines[{i}]"), &mut result);
        }
        for (i, mapping) in doc.imported_principles.iter().enumerate() {
            validate_mapping(mapping, &format!("imported-principles[{i}]"), &mut result);
        }

        result
    }

    /// Decode failures are reported as a single violation at the root path.
    pub fn validate_json(&self, data: &[u8]) -> ValidationResult {
        match serde_json::from_slice::<GuidanceDocument>(data) {
            Ok(doc) => self.validate(&doc),
            Err(err) => decode_failure(format!("invalid JSON: {err}")),
        }
    }

    pub fn validate_yaml(&self, data: &[u8]) -> ValidationResult {
        match serde_yaml::from_slice::<GuidanceDocument>(data) {
            Ok(doc) => self.validate(&doc),
            Err(err) => decode_failure(format!("invalid YAML: {err}")),
        }
    }

    pub fn validate_file(&self, path: &Path) -> Result<ValidationResult> {
        let data = fs::read(path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        if looks_like_json(&data) {
            Ok(self.validate_json(&data))
        } else {
            Ok(self.validate_yaml(&data))
        }
    }

    fn validate_metadata(&self, meta: &Metadata, result: &mut ValidationResult) {
        result.required("metadata.id".to_string(), &meta.id);
        result.required("metadata.title".to_string(), &meta.title);
        result.required("metadata.description".to_string(), &meta.description);
        result.required("metadata.author".to_string(), &meta.author);

        if !meta.document_type.is_empty() {
            if !meta.document_type.is_recognized() {
                result.add_error(
                    "metadata.document-type",
                    "must be one of: Standard, Regulation, Best Practice, Framework",
                    Some(Value::String(meta.document_type.to_string())),
                );
            }
        } else if self.strict {
            result.add_error("metadata.document-type", "required field is empty (strict mode)", None);
        }

        for (i, reference) in meta.mapping_references.iter().enumerate() {
            validate_mapping_reference(
                reference,
                &format!("metadata.mapping-references[{i}]"),
                result,
            );
        }
    }

    fn validate_categories(&self, categories: &[Category], result: &mut ValidationResult) {
        if categories.is_empty() {
            if self.strict {
                result.add_error("categories", "document must have at least one category", None);
            }
            return;
        }

        let mut seen = HashSet::new();
        for (i, category) in categories.iter().enumerate() {
            let path = format!("categories[{i}]");
            check_duplicate(&mut seen, &category.id, &path, "duplicate category ID", result);
            validate_category(category, &path, result);
        }
    }
}

fn decode_failure(message: String) -> ValidationResult {
    let mut result = ValidationResult::default();
    result.add_error("", message, None);
    result
}

/// Reports an ID already seen among its siblings. Empty IDs are left to the
/// required-field check.
fn check_duplicate<'a>(
    seen: &mut HashSet<&'a str>,
    id: &'a str,
    path: &str,
    message: &str,
    result: &mut ValidationResult,
) {
    if id.is_empty() {
        return;
    }
    if !seen.insert(id) {
        result.add_error(format!("{path}.id"), message, Some(Value::String(id.to_string())));
    }
}

fn validate_mapping_reference(reference: &MappingReference, path: &str, result: &mut ValidationResult) {
    result.required(format!("{path}.id"), &reference.id);
    result.required(format!("{path}.title"), &reference.title);
    result.required(format!("{path}.version"), &reference.version);
}

fn validate_category(category: &Category, path: &str, result: &mut ValidationResult) {
    result.required(format!("{path}.id"), &category.id);
    result.required(format!("{path}.title"), &category.title);
    result.required(format!("{path}.description"), &category.description);

    let mut seen = HashSet::new();
    for (i, guideline) in category.guidelines.iter().enumerate() {
        let guideline_path = format!("{path}.guidelines[{i}]");
        check_duplicate(
            &mut seen,
            &guideline.id,
            &guideline_path,
            "duplicate guideline ID",
            result,
        );
        validate_guideline(guideline, &guideline_path, result);
    }
}

fn validate_guideline(guideline: &Guideline, path: &str, result: &mut ValidationResult) {
    result.required(format!("{path}.id"), &guideline.id);
    result.required(format!("{path}.title"), &guideline.title);

    if let Some(rationale) = &guideline.rationale {
        validate_rationale(rationale, &format!("{path}.rationale"), result);
    }

    let mut seen = HashSet::new();
    for (i, part) in guideline.guideline_parts.iter().enumerate() {
        let part_path = format!("{path}.guideline-parts[{i}]");
        check_duplicate(&mut seen, &part.id, &part_path, "duplicate part ID", result);
        validate_part(part, &part_path, result);
    }

    for (i, mapping) in guideline.guideline_mappings.iter().enumerate() {
        validate_mapping(mapping, &format!("{path}.guideline-mappings[{i}]"), result);
    }
    for (i, mapping) in guideline.principle_mappings.iter().enumerate() {
        validate_mapping(mapping, &format!("{path}.principle-mappings[{i}]"), result);
    }
}

fn validate_rationale(rationale: &Rationale, path: &str, result: &mut ValidationResult) {
    for (i, risk) in rationale.risks.iter().enumerate() {
        result.required(format!("{path}.risks[{i}].title"), &risk.title);
        result.required(format!("{path}.risks[{i}].description"), &risk.description);
    }
    for (i, outcome) in rationale.outcomes.iter().enumerate() {
        result.required(format!("{path}.outcomes[{i}].title"), &outcome.title);
        result.required(format!("{path}.outcomes[{i}].description"), &outcome.description);
    }
}

fn validate_part(part: &Part, path: &str, result: &mut ValidationResult) {
    result.required(format!("{path}.id"), &part.id);
    result.required(format!("{path}.text"), &part.text);
}

fn validate_mapping(mapping: &Mapping, path: &str, result: &mut ValidationResult) {
    result.required(format!("{path}.reference-id"), &mapping.reference_id);

    for (i, entry) in mapping.entries.iter().enumerate() {
        let entry_path = format!("{path}.entries[{i}]");
        result.required(format!("{entry_path}.reference-id"), &entry.reference_id);
        if !(0..=100).contains(&entry.strength) {
            result.add_error(
                format!("{entry_path}.strength"),
                "should be between 0 and 100",
                Some(Value::from(entry.strength)),
            );
        }
    }
}
