use crate::config::RenamerConfig;
use crate::pathmap::make_path;
use crate::sanitize::sanitize;
use crate::scene::SceneMetadata;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const NO_STUDIO: &str = "No Studio";

/// Where one file should go. Built per file and consumed right away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocationPlan {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub move_needed: bool,
    pub rename_needed: bool,
    pub source_base: String,
    pub destination_base: String,
}

impl RelocationPlan {
    pub fn is_noop(&self) -> bool {
        !self.move_needed && !self.rename_needed
    }

    pub fn source_dir(&self) -> &Path {
        self.source.parent().unwrap_or_else(|| Path::new("."))
    }

    pub fn destination_dir(&self) -> &Path {
        self.destination.parent().unwrap_or_else(|| Path::new("."))
    }
}

pub fn plan(original: &Path, desired_base: &str, desired_dir: &Path) -> RelocationPlan {
    let extension = extension_with_dot(original);
    let destination = desired_dir.join(format!("{desired_base}{extension}"));
    let source_dir = original.parent().unwrap_or_else(|| Path::new("."));

    RelocationPlan {
        move_needed: source_dir != desired_dir,
        rename_needed: original.file_name() != destination.file_name(),
        source_base: file_stem(original),
        destination_base: desired_base.to_string(),
        source: original.to_path_buf(),
        destination,
    }
}

/// First free variant of `target`: the path itself, then `stem (1).ext`,
/// `stem (2).ext`, ...
///
/// A dangling symlink occupies its name. This is a check, not a reservation;
/// the executor claims the name with a no-replace link and retries on conflict.
pub fn resolve_unique(target: &Path) -> PathBuf {
    if !is_occupied(target) {
        return target.to_path_buf();
    }

    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    let stem = file_stem(target);
    let extension = extension_with_dot(target);

    let mut n = 1usize;
    loop {
        let candidate = parent.join(format!("{stem} ({n}){extension}"));
        if !is_occupied(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// `<root>/<studio>/<folder>`, where root is the first tag-specific root the
/// scene matches, or the stash root the file lives in.
pub fn target_directory(
    scene: &SceneMetadata,
    stash_root: &Path,
    foldername: &str,
    config: &RenamerConfig,
) -> PathBuf {
    let root = scene
        .tags
        .iter()
        .find_map(|tag| config.tag_specific_paths.get(&tag.name))
        .map(|raw| make_path(raw, &config.folder_map))
        .unwrap_or_else(|| stash_root.to_path_buf());

    let studio = scene
        .studio_name()
        .and_then(|name| path_component(&sanitize(name)))
        .unwrap_or_else(|| NO_STUDIO.to_string());
    let mut dir = root.join(studio);
    if let Some(folder) = path_component(foldername) {
        dir.push(folder);
    }
    dir
}

/// A single normal path component, or `None` for blank, `.` and `..`.
fn path_component(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.chars().all(|ch| ch == '.') {
        return None;
    }
    Some(value.to_string())
}

/// Any directory entry counts, including a symlink whose target is gone.
pub(crate) fn is_occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

pub fn find_stash_root<'a>(path: &Path, roots: &'a [PathBuf]) -> Option<&'a PathBuf> {
    let canonical = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    roots.iter().find(|root| {
        let canonical_root = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        canonical.starts_with(&canonical_root) || path.starts_with(root)
    })
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_default()
}

pub(crate) fn extension_with_dot(path: &Path) -> String {
    path.extension()
        .map(|v| format!(".{}", v.to_string_lossy()))
        .unwrap_or_default()
}
