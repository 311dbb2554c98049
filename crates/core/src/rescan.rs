use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Directories waiting for a library scan, one path per line.
#[derive(Debug, Clone)]
pub struct RescanQueue {
    path: PathBuf,
}

impl RescanQueue {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn push(&self, dirs: &[PathBuf]) -> Result<()> {
        if dirs.is_empty() {
            return Ok(());
        }
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("could not create queue directory: {}", dir.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("could not open rescan queue: {}", self.path.display()))?;
        for dir in dirs {
            writeln!(file, "{}", dir.display())
                .with_context(|| format!("could not write rescan queue: {}", self.path.display()))?;
        }
        Ok(())
    }

    /// Takes every queued path, first occurrence order, and removes the queue file.
    pub fn drain(&self) -> Result<Vec<String>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("could not read rescan queue: {}", self.path.display()))?;
        fs::remove_file(&self.path)
            .with_context(|| format!("could not remove rescan queue: {}", self.path.display()))?;

        Ok(dedupe_ordered(
            raw.lines().map(str::trim).filter(|line| !line.is_empty()),
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub fn dedupe_ordered<'a>(items: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(*item))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn dedupe_keeps_first_seen_order() {
        assert_eq!(
            dedupe_ordered(["/b", "/a", "/b", "/c", "/a"]),
            vec!["/b", "/a", "/c"]
        );
    }

    #[test]
    fn drain_returns_unique_paths_and_clears_queue() {
        let temp = tempdir().expect("tempdir");
        let queue = RescanQueue::new(temp.path().join("renamer-lock.dat"));
        queue
            .push(&[PathBuf::from("/lib/A"), PathBuf::from("/lib/B")])
            .expect("push");
        queue.push(&[PathBuf::from("/lib/A")]).expect("push");

        assert_eq!(queue.drain().expect("drain"), vec!["/lib/A", "/lib/B"]);
        assert!(!queue.path().exists());
        assert!(queue.drain().expect("drain").is_empty());
    }
}
