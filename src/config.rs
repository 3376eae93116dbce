use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cli::PipelineArgs;
use crate::enhancer::EnhancerKind;
use crate::parser::ParserKind;
use crate::segmenter::SegmenterKind;
use crate::storage::FinalFormat;

pub const DEFAULT_BASE_DIR: &str = ".cache/guidance-pipeline";

/// Settings shared by every pipeline command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub base_dir: PathBuf,
    pub strict: bool,
    pub format: FinalFormat,
    pub save_reports: bool,
    pub segmenter: SegmenterKind,
    pub parser: ParserKind,
    pub enhancer: EnhancerKind,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            strict: true,
            format: FinalFormat::Yaml,
            save_reports: true,
            segmenter: SegmenterKind::Generic,
            parser: ParserKind::Text,
            enhancer: EnhancerKind::Passthrough,
        }
    }
}

/// On-disk form of the configuration; every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    base_dir: Option<PathBuf>,
    strict: Option<bool>,
    format: Option<FinalFormat>,
    save_reports: Option<bool>,
    segmenter: Option<SegmenterKind>,
    parser: Option<ParserKind>,
    enhancer: Option<EnhancerKind>,
}

impl PipelineConfig {
    /// Defaults, then the `--config` file if given, then explicit CLI flags.
    pub fn resolve(args: &PipelineArgs) -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = &args.config {
            config.apply_file(load_config_file(path)?);
        }
        config.apply_args(args);
        Ok(config)
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(base_dir) = file.base_dir {
            self.base_dir = base_dir;
        }
        if let Some(strict) = file.strict {
            self.strict = strict;
        }
        if let Some(format) = file.format {
            self.format = format;
        }
        if let Some(save_reports) = file.save_reports {
            self.save_reports = save_reports;
        }
        if let Some(segmenter) = file.segmenter {
            self.segmenter = segmenter;
        }
        if let Some(parser) = file.parser {
            self.parser = parser;
        }
        if let Some(enhancer) = file.enhancer {
            self.enhancer = enhancer;
        }
    }

    fn apply_args(&mut self, args: &PipelineArgs) {
        if let Some(base_dir) = &args.base_dir {
            self.base_dir = base_dir.clone();
        }
        if let Some(strict) = args.strict {
            self.strict = strict;
        }
        if let Some(format) = args.format {
            self.format = format;
        }
        if args.no_save_report {
            self.save_reports = false;
        }
        if let Some(segmenter) = args.segmenter {
            self.segmenter = segmenter;
        }
        if let Some(parser) = args.parser {
            self.parser = parser;
        }
        if let Some(enhancer) = args.enhancer {
            self.enhancer = enhancer;
        }
    }
}

fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}
