use crate::executor::RelocationResult;
use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only JSON-lines record of every relocation, for after-the-fact audit.
#[derive(Debug, Clone)]
pub struct ResultJournal {
    path: PathBuf,
}

impl ResultJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, results: &[RelocationResult]) -> Result<()> {
        let live: Vec<&RelocationResult> = results.iter().filter(|r| !r.dry_run).collect();
        if live.is_empty() {
            return Ok(());
        }

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("could not create journal directory: {}", dir.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("could not open journal: {}", self.path.display()))?;

        for result in live {
            let line = serde_json::to_string(result).context("could not serialize journal entry")?;
            writeln!(file, "{line}")
                .with_context(|| format!("could not write journal: {}", self.path.display()))?;
        }
        Ok(())
    }

    /// Most recent `limit` entries, oldest first.
    pub fn tail(&self, limit: usize) -> Result<Vec<RelocationResult>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("could not read journal: {}", self.path.display()))?;
        let entries = raw
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str::<RelocationResult>(line))
            .collect::<Result<Vec<_>, _>>()
            .context("journal is corrupted")?;

        let skip = entries.len().saturating_sub(limit);
        Ok(entries.into_iter().skip(skip).collect())
    }
}
