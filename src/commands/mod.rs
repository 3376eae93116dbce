pub mod convert;
pub mod coverage;
pub mod enhance;
pub mod list;
pub mod parse;
pub mod run_all;
pub mod segment;
pub mod status;
pub mod validate;

use anyhow::{Context, Result};

use crate::config::PipelineConfig;
use crate::storage::Storage;

pub(crate) fn open_storage(config: &PipelineConfig) -> Result<Storage> {
    Storage::open(config.base_dir.clone())
        .with_context(|| format!("failed to open store at {}", config.base_dir.display()))
}
