use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::enhancer::EnhancerKind;
use crate::parser::ParserKind;
use crate::segmenter::SegmenterKind;
use crate::storage::FinalFormat;

#[derive(Parser, Debug)]
#[command(
    name = "guidance-pipeline",
    version,
    about = "Segment compliance documents into validated, versioned guidance documents"
)]
pub struct Cli {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract pages of blocks from a source file and store them as a new parsed version.
    Parse(ParseArgs),
    /// Rebuild the category/guideline/part hierarchy from a stored parsed version.
    Segment(SegmentArgs),
    /// Convert a segmented version to the final schema, gated on validation.
    Convert(ConvertArgs),
    /// Run an enhancer over a segmented version and store the result as a new version.
    Enhance(EnhanceArgs),
    /// Check a stored final document or a guidance file against the schema.
    Validate(ValidateArgs),
    /// Report how much of the source content was captured.
    Coverage(CoverageArgs),
    /// Parse, segment and convert in one go.
    RunAll(RunAllArgs),
    /// List stored documents, or the versions of one document.
    List(ListArgs),
    /// Show configuration, ledger totals and per-document history.
    Status(StatusArgs),
}

/// Settings shared by every command. Unset flags fall back to `--config`,
/// then to built-in defaults.
#[derive(Args, Debug, Clone, Default)]
pub struct PipelineArgs {
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true)]
    pub base_dir: Option<PathBuf>,

    /// Strict schema validation; pass `--strict=false` to relax it.
    #[arg(
        long,
        global = true,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub strict: Option<bool>,

    #[arg(long, global = true, value_enum)]
    pub format: Option<FinalFormat>,

    #[arg(long, global = true, default_value_t = false)]
    pub no_save_report: bool,

    #[arg(long, global = true, value_enum)]
    pub segmenter: Option<SegmenterKind>,

    #[arg(long, global = true, value_enum)]
    pub parser: Option<ParserKind>,

    #[arg(long, global = true, value_enum)]
    pub enhancer: Option<EnhancerKind>,
}

#[derive(Args, Debug, Clone)]
pub struct ParseArgs {
    #[arg(long)]
    pub input: PathBuf,

    /// Defaults to the input file name without its extension.
    #[arg(long)]
    pub document_id: Option<String>,

    #[arg(long)]
    pub max_pages: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct SegmentArgs {
    #[arg(long)]
    pub document_id: String,

    /// Parsed version to segment; 0 selects the latest.
    #[arg(long, default_value_t = 0)]
    pub source_version: u32,
}

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    #[arg(long)]
    pub document_id: String,

    /// Segmented version to convert; 0 selects the latest.
    #[arg(long, default_value_t = 0)]
    pub source_version: u32,

    /// Extra copy of the final document outside the store.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct EnhanceArgs {
    #[arg(long)]
    pub document_id: String,

    #[arg(long, default_value_t = 0)]
    pub source_version: u32,

    #[arg(long, default_value_t = false)]
    pub show_changes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Validate the stored final document.
    #[arg(long, required_unless_present = "file", conflicts_with = "file")]
    pub document_id: Option<String>,

    /// Validate a YAML or JSON guidance document on disk.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct CoverageArgs {
    #[arg(long, required_unless_present = "file", conflicts_with = "file")]
    pub document_id: Option<String>,

    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Segmented version to analyze, paired with the parsed version it was
    /// built from; 0 selects the latest.
    #[arg(long, default_value_t = 0)]
    pub source_version: u32,
}

#[derive(Args, Debug, Clone)]
pub struct RunAllArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub document_id: Option<String>,

    #[arg(long)]
    pub max_pages: Option<usize>,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Without an ID, lists every stored document.
    #[arg(long)]
    pub document_id: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    /// Also show the ledger trail for one document.
    #[arg(long)]
    pub document_id: Option<String>,
}
