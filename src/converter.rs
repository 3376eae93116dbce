use crate::guidance::{
    Applicability, Category, DocumentType, GuidanceDocument, Guideline, Metadata, Part,
};
use crate::model::{DocumentMetadata, SegmentCategory, SegmentGuideline, SegmentPart, SegmentedDocument};
use crate::validator::{ValidationResult, Validator};

pub const CONVERTER_NAME: &str = "default-v1.0";

pub fn convert(doc: &SegmentedDocument) -> GuidanceDocument {
    GuidanceDocument {
        metadata: convert_metadata(&doc.document_metadata),
        front_matter: doc.front_matter.clone(),
        categories: doc.categories.iter().map(convert_category).collect(),
        imported_guidelines: Vec::new(),
        imported_principles: Vec::new(),
    }
}

pub fn convert_and_validate(
    doc: &SegmentedDocument,
    strict: bool,
) -> (GuidanceDocument, ValidationResult) {
    let converted = convert(doc);
    let result = Validator::new(strict).validate(&converted);
    (converted, result)
}

fn convert_metadata(meta: &DocumentMetadata) -> Metadata {
    let applicability = if meta.industry_sectors.is_empty() && meta.jurisdictions.is_empty() {
        None
    } else {
        Some(Applicability {
            jurisdictions: meta.jurisdictions.clone(),
            industry_sectors: meta.industry_sectors.clone(),
        })
    };

    Metadata {
        id: meta.id.clone(),
        title: meta.title.clone(),
        description: meta.description.clone(),
        author: meta.author.clone(),
        version: meta.version.clone(),
        publication_date: meta.publication_date.clone(),
        document_type: DocumentType::new(meta.document_type.clone()),
        applicability,
        mapping_references: Vec::new(),
    }
}

fn convert_category(category: &SegmentCategory) -> Category {
    Category {
        id: category.id.clone(),
        title: category.title.clone(),
        description: category.description.clone(),
        guidelines: category.guidelines.iter().map(convert_guideline).collect(),
    }
}

fn convert_guideline(guideline: &SegmentGuideline) -> Guideline {
    Guideline {
        id: guideline.id.clone(),
        title: guideline.title.clone(),
        objective: guideline.objective.clone(),
        recommendations: guideline.recommendations.clone(),
        guideline_parts: guideline.parts.iter().map(convert_part).collect(),
        ..Guideline::default()
    }
}

fn convert_part(part: &SegmentPart) -> Part {
    Part {
        id: part.id.clone(),
        title: part.title.clone(),
        text: part.text.clone(),
        recommendations: part.recommendations.clone(),
    }
}
