//! File-backed price feed.
//!
//! The oracle aggregation pipeline is an external collaborator; it is
//! expected to refresh a JSON file mapping pool ids to observations. The
//! keeper reloads the file each round and hands it to the engine as a
//! [`TableOracle`], so staleness flows through the core's own price checks.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use stasis_engine::TableOracle;

pub struct PriceFeedFile {
    path: PathBuf,
}

impl PriceFeedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        PriceFeedFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<TableOracle> {
        let bytes = fs::read(&self.path)
            .with_context(|| format!("reading price feed {}", self.path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing price feed {}", self.path.display()))
    }
}
