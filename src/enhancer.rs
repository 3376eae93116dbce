use anyhow::Result;
use chrono::Utc;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::model::{EnhancementResult, SegmentedDocument};

/// Post-segmentation refinement step. Implementations return a new document;
/// the input is never modified so the pre-enhance version stays intact.
pub trait Enhancer {
    fn name(&self) -> &str;
    fn enhance_segmentation(&self, doc: &SegmentedDocument) -> Result<EnhancementResult>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EnhancerKind {
    #[default]
    Passthrough,
}

impl EnhancerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EnhancerKind::Passthrough => "passthrough",
        }
    }
}

pub fn build_enhancer(kind: EnhancerKind) -> Box<dyn Enhancer> {
    match kind {
        EnhancerKind::Passthrough => Box::new(PassthroughEnhancer),
    }
}

/// Returns the document unchanged with full confidence.
#[derive(Debug, Default)]
pub struct PassthroughEnhancer;

impl Enhancer for PassthroughEnhancer {
    fn name(&self) -> &str {
        EnhancerKind::Passthrough.as_str()
    }

    fn enhance_segmentation(&self, doc: &SegmentedDocument) -> Result<EnhancementResult> {
        Ok(EnhancementResult {
            original: doc.clone(),
            enhanced: doc.clone(),
            changes: Vec::new(),
            confidence: 1.0,
            provider: self.name().to_string(),
            model: "none".to_string(),
            timestamp: Utc::now(),
        })
    }
}
