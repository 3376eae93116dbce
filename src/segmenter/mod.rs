mod metadata;
mod rules;
mod specialized;


use anyhow::Result;
use chrono::Utc;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{
    BlockType, ParsedDocument, SegmentCategory, SegmentGuideline, SegmentPart, SegmentedDocument,
    SegmentedMetadata,
};

use rules::{CompiledRules, GENERIC_RULES, MarkerKind, NIST_800_53_RULES, PCI_DSS_RULES, RuleSpec};
use specialized::{NIST_800_53_PROFILE, PCI_DSS_PROFILE, Profile};

/// Rebuilds the category/guideline/part hierarchy from a flat block stream.
pub trait Segmenter {
    fn name(&self) -> &str;
    fn segment(&self, doc: &ParsedDocument) -> SegmentedDocument;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SegmenterKind {
    #[default]
    Generic,
    PciDss,
    #[value(name = "nist-800-53")]
    #[serde(rename = "nist-800-53")]
    Nist80053,
}

impl SegmenterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SegmenterKind::Generic => "generic",
            SegmenterKind::PciDss => "pci-dss",
            SegmenterKind::Nist80053 => "nist-800-53",
        }
    }
}

pub fn build_segmenter(kind: SegmenterKind) -> Result<Box<dyn Segmenter>> {
    let segmenter = match kind {
        SegmenterKind::Generic => RuleSegmenter::new("generic-v1.0", &GENERIC_RULES, None)?,
        SegmenterKind::PciDss => {
            RuleSegmenter::new("pci-dss-v1.0", &PCI_DSS_RULES, Some(PCI_DSS_PROFILE))?
        }
        SegmenterKind::Nist80053 => RuleSegmenter::new(
            "nist-800-53-v1.0",
            &NIST_800_53_RULES,
            Some(NIST_800_53_PROFILE),
        )?,
    };
    Ok(Box::new(segmenter))
}

#[derive(Debug)]
pub struct RuleSegmenter {
    name: &'static str,
    rules: CompiledRules,
    profile: Option<Profile>,
}

impl RuleSegmenter {
    fn new(name: &'static str, spec: &RuleSpec, profile: Option<Profile>) -> Result<Self> {
        Ok(Self {
            name,
            rules: CompiledRules::compile(spec)?,
            profile,
        })
    }

    fn extract_categories(&self, doc: &ParsedDocument) -> Vec<SegmentCategory> {
        let mut categories = Vec::new();
        let mut current_category: Option<SegmentCategory> = None;
        let mut current_guideline: Option<SegmentGuideline> = None;
        let mut text = String::new();

        for block in doc.pages.iter().flat_map(|page| &page.blocks) {
            let line = block.text.trim();
            if line.is_empty() {
                continue;
            }

            let Some(marker) = self.rules.classify(line) else {
                if matches!(block.block_type, BlockType::Paragraph | BlockType::List) {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(line);
                }
                continue;
            };

            match marker.kind {
                MarkerKind::Category => {
                    self.close_guideline(&mut current_guideline, &mut current_category, &text);
                    if let Some(category) = current_category.take() {
                        categories.push(category);
                    }
                    current_category = Some(SegmentCategory {
                        id: marker.id,
                        title: marker.title,
                        ..SegmentCategory::default()
                    });
                    text.clear();
                }
                MarkerKind::Guideline => {
                    self.close_guideline(&mut current_guideline, &mut current_category, &text);
                    current_guideline = Some(SegmentGuideline {
                        id: marker.id,
                        title: marker.title,
                        ..SegmentGuideline::default()
                    });
                    text.clear();
                }
                MarkerKind::Part => match current_guideline.as_mut() {
                    Some(guideline) => guideline.parts.push(SegmentPart {
                        id: marker.id,
                        text: marker.title,
                        ..SegmentPart::default()
                    }),
                    None => debug!(part = %marker.id, "dropping part outside any guideline"),
                },
            }
        }

        self.close_guideline(&mut current_guideline, &mut current_category, &text);
        if let Some(category) = current_category.take() {
            categories.push(category);
        }

        categories
    }

    /// Finalizes the open guideline with the accumulated text and attaches it
    /// to the open category.
    fn close_guideline(
        &self,
        guideline: &mut Option<SegmentGuideline>,
        category: &mut Option<SegmentCategory>,
        text: &str,
    ) {
        let Some(mut guideline) = guideline.take() else {
            return;
        };
        if !text.is_empty() {
            self.finalize(&mut guideline, text);
        }

        match category.as_mut() {
            Some(category) => category.guidelines.push(guideline),
            None => debug!(guideline = %guideline.id, "dropping guideline outside any category"),
        }
    }

    fn finalize(&self, guideline: &mut SegmentGuideline, text: &str) {
        guideline.objective = self.rules.objective(text).unwrap_or_else(|| {
            text.split('.')
                .next()
                .unwrap_or_default()
                .trim()
                .to_string()
        });

        guideline.recommendations = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && self.rules.is_recommendation(line))
            .map(str::to_string)
            .collect();
    }
}

impl Segmenter for RuleSegmenter {
    fn name(&self) -> &str {
        self.name
    }

    fn segment(&self, doc: &ParsedDocument) -> SegmentedDocument {
        let mut segmented = SegmentedDocument {
            metadata: SegmentedMetadata {
                source_version: doc.metadata.version,
                segmenter: self.name.to_string(),
                segmented_at: Utc::now(),
                version: 0,
                document_id: doc.metadata.document_id.clone(),
            },
            document_metadata: metadata::extract_metadata(&self.rules, doc),
            front_matter: metadata::extract_front_matter(&self.rules, doc),
            categories: self.extract_categories(doc),
            unmapped_content: Vec::new(),
        };

        if let Some(profile) = &self.profile {
            profile.apply(&mut segmented);
        }

        segmented
    }
}
