use crate::config::RenamerConfig;
use crate::error::RenamerError;
use crate::planner::{file_stem, is_occupied, resolve_unique, RelocationPlan};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const TRICKPLAY_SUFFIX: &str = ".trickplay";
const MAX_CLAIM_ATTEMPTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelocationMode {
    Move,
    Rename,
}

impl RelocationMode {
    fn verb(self) -> &'static str {
        match self {
            RelocationMode::Move => "move",
            RelocationMode::Rename => "rename",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelocationAction {
    Moved,
    Renamed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanionKind {
    Associated,
    Unassociated,
    Trickplay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanionMove {
    pub kind: CompanionKind,
    pub from: PathBuf,
    pub to: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelocationResult {
    pub action: RelocationAction,
    pub scene_id: String,
    pub original_path: PathBuf,
    pub final_path: PathBuf,
    pub dry_run: bool,
    #[serde(default)]
    pub companions: Vec<CompanionMove>,
    #[serde(default)]
    pub companion_failures: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct ExecuteRequest<'a> {
    pub scene_id: &'a str,
    pub mode: RelocationMode,
    pub dry_run: bool,
    pub move_requested: bool,
    pub config: &'a RenamerConfig,
}

/// Relocates the primary file of `plan`, then everything that travels with it.
///
/// Returns `Ok(None)` when the file is already where it belongs. Companion
/// failures after the primary succeeded are recorded on the result; nothing is
/// rolled back.
pub fn execute(
    plan: &RelocationPlan,
    request: &ExecuteRequest<'_>,
) -> Result<Option<RelocationResult>, RenamerError> {
    if plan.is_noop() {
        debug!(
            scene_id = request.scene_id,
            path = %plan.source.display(),
            "already correctly placed and named"
        );
        // Companions are still evaluated; with coincident directories each one is skipped.
        if request.move_requested {
            let mut moved = Vec::new();
            let mut failures = Vec::new();
            relocate_companions(plan, &plan.source_base, request, &mut moved, &mut failures);
            debug!(
                companions = moved.len(),
                failures = failures.len(),
                "companions evaluated for placed file"
            );
        }
        return Ok(None);
    }

    if !plan.source.exists() {
        return Err(RenamerError::SourceNotFound {
            path: plan.source.clone(),
        });
    }

    let mut destination = resolve_unique(&plan.destination);
    if destination != plan.destination {
        info!(
            taken = %plan.destination.display(),
            using = %destination.display(),
            "destination already exists"
        );
    }

    if request.dry_run {
        info!(
            scene_id = request.scene_id,
            from = %plan.source.display(),
            to = %destination.display(),
            "dry run: would {}",
            request.mode.verb()
        );
    } else {
        if let Some(dir) = destination.parent() {
            fs::create_dir_all(dir).map_err(|source| RenamerError::RelocationIo {
                operation: "create directory",
                from: plan.source.clone(),
                to: dir.to_path_buf(),
                source,
            })?;
        }
        destination = relocate_unique(&plan.source, &plan.destination, request.mode)?;
        info!(
            scene_id = request.scene_id,
            from = %plan.source.display(),
            to = %destination.display(),
            "{}d main file",
            request.mode.verb()
        );
    }

    let mut result = RelocationResult {
        action: match request.mode {
            RelocationMode::Move => RelocationAction::Moved,
            RelocationMode::Rename => RelocationAction::Renamed,
        },
        scene_id: request.scene_id.to_string(),
        original_path: plan.source.clone(),
        final_path: destination.clone(),
        dry_run: request.dry_run,
        companions: Vec::new(),
        companion_failures: Vec::new(),
    };

    let final_plan = RelocationPlan {
        destination,
        ..plan.clone()
    };
    let new_base = file_stem(&final_plan.destination);
    relocate_companions(
        &final_plan,
        &new_base,
        request,
        &mut result.companions,
        &mut result.companion_failures,
    );

    Ok(Some(result))
}

fn relocate_companions(
    plan: &RelocationPlan,
    new_base: &str,
    request: &ExecuteRequest<'_>,
    moved: &mut Vec<CompanionMove>,
    failures: &mut Vec<String>,
) {
    let source_dir = plan.source_dir();
    let destination_dir = plan.destination_dir();
    let config = request.config;

    let mut jobs = Vec::new();
    for (path, tail) in find_associated(
        source_dir,
        &plan.source,
        &plan.source_base,
        &config.associated_files,
    ) {
        jobs.push((
            CompanionKind::Associated,
            path,
            destination_dir.join(format!("{new_base}{tail}")),
        ));
    }

    if request.mode == RelocationMode::Move {
        for name in &config.unassociated_files {
            for ext in &config.associated_files {
                let file_name = format!("{name}.{ext}");
                let path = source_dir.join(&file_name);
                if path.is_file() {
                    jobs.push((
                        CompanionKind::Unassociated,
                        path,
                        destination_dir.join(file_name),
                    ));
                }
            }
        }
    }

    if config.move_trickplay {
        let folder = source_dir.join(format!("{}{TRICKPLAY_SUFFIX}", plan.source_base));
        if folder.is_dir() {
            jobs.push((
                CompanionKind::Trickplay,
                folder,
                destination_dir.join(format!("{new_base}{TRICKPLAY_SUFFIX}")),
            ));
        }
    }

    for (kind, from, to) in jobs {
        if from == to {
            debug!(path = %from.display(), "companion already in place");
            continue;
        }

        let to = if request.dry_run {
            let to = resolve_unique(&to);
            info!(
                scene_id = request.scene_id,
                from = %from.display(),
                to = %to.display(),
                "dry run: would move {kind:?} file"
            );
            to
        } else {
            match relocate_unique(&from, &to, RelocationMode::Move) {
                Ok(to) => {
                    info!(
                        scene_id = request.scene_id,
                        from = %from.display(),
                        to = %to.display(),
                        "moved {kind:?} file"
                    );
                    to
                }
                Err(err) => {
                    warn!(scene_id = request.scene_id, error = %err, "companion relocation failed");
                    failures.push(err.to_string());
                    continue;
                }
            }
        };
        moved.push(CompanionMove { kind, from, to });
    }
}

/// Siblings named `<base>.<ext>` or `<base>.<anything>.<ext>`, paired with the
/// part of their name that follows `<base>`.
fn find_associated(
    dir: &Path,
    primary: &Path,
    base: &str,
    extensions: &[String],
) -> Vec<(PathBuf, String)> {
    if extensions.is_empty() || base.is_empty() {
        return Vec::new();
    }

    let prefix = format!("{base}.");
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && entry.path() != primary)
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            let tail = name.strip_prefix(&prefix)?;
            let matches_ext = extensions
                .iter()
                .any(|ext| tail == ext || tail.ends_with(&format!(".{ext}")));
            matches_ext.then(|| (entry.into_path(), name[base.len()..].to_string()))
        })
        .collect()
}

/// Relocates `from` to the first free variant of `target` and returns it.
///
/// A name taken between the check and the claim moves on to the next variant.
fn relocate_unique(
    from: &Path,
    target: &Path,
    mode: RelocationMode,
) -> Result<PathBuf, RenamerError> {
    let mut attempts = 0;
    loop {
        let to = resolve_unique(target);
        match relocate(from, &to, mode) {
            Err(RenamerError::RelocationIo { source, .. })
                if source.kind() == io::ErrorKind::AlreadyExists && attempts < MAX_CLAIM_ATTEMPTS =>
            {
                debug!(taken = %to.display(), "destination claimed concurrently, retrying");
                attempts += 1;
            }
            Err(err) => return Err(err),
            Ok(()) => return Ok(to),
        }
    }
}

/// Never replaces an existing entry at `to` for regular files: the new name is
/// claimed with a hard link before the old one is removed.
fn relocate(from: &Path, to: &Path, mode: RelocationMode) -> Result<(), RenamerError> {
    let io_error = |source: io::Error| RenamerError::RelocationIo {
        operation: mode.verb(),
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    if is_occupied(to) {
        return Err(io_error(io::Error::from(io::ErrorKind::AlreadyExists)));
    }
    if from.is_dir() {
        return rename_or_copy(from, to, mode).map_err(io_error);
    }

    match fs::hard_link(from, to) {
        Ok(()) => fs::remove_file(from).map_err(io_error),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Err(io_error(err)),
        // No hard links on this filesystem or across devices.
        Err(_) => rename_or_copy(from, to, mode).map_err(io_error),
    }
}

fn rename_or_copy(from: &Path, to: &Path, mode: RelocationMode) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(err) if mode == RelocationMode::Move && err.kind() == io::ErrorKind::CrossesDevices => {
            copy_then_remove(from, to)
        }
        Err(err) => Err(err),
    }
}

fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    if from.is_dir() {
        for entry in WalkDir::new(from) {
            let entry = entry.map_err(io::Error::from)?;
            let relative = entry.path().strip_prefix(from).map_err(io::Error::other)?;
            let target = to.join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)?;
            } else {
                copy_new(entry.path(), &target)?;
            }
        }
        fs::remove_dir_all(from)
    } else {
        copy_new(from, to)?;
        fs::remove_file(from)
    }
}

fn copy_new(from: &Path, to: &Path) -> io::Result<()> {
    let mut source = File::open(from)?;
    let mut target = OpenOptions::new().write(true).create_new(true).open(to)?;
    io::copy(&mut source, &mut target)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::plan;
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    fn config() -> RenamerConfig {
        RenamerConfig {
            associated_files: vec!["srt".to_string(), "funscript".to_string()],
            unassociated_files: vec!["poster".to_string()],
            move_trickplay: true,
            ..RenamerConfig::default()
        }
    }

    fn request(config: &RenamerConfig, mode: RelocationMode, dry_run: bool) -> ExecuteRequest<'_> {
        ExecuteRequest {
            scene_id: "42",
            mode,
            dry_run,
            move_requested: mode == RelocationMode::Move,
            config,
        }
    }

    fn snapshot(root: &Path) -> BTreeSet<PathBuf> {
        WalkDir::new(root)
            .into_iter()
            .filter_map(Result::ok)
            .map(|entry| entry.into_path())
            .collect()
    }

    #[test]
    fn move_carries_sidecars_and_trickplay() {
        let temp = tempdir().expect("tempdir");
        let src = temp.path().join("inbox");
        let dst = temp.path().join("Acme");
        fs::create_dir_all(src.join("clip.trickplay")).expect("create trickplay");
        fs::write(src.join("clip.trickplay").join("0.jpg"), b"t").expect("write tile");
        fs::write(src.join("clip.mp4"), b"v").expect("write video");
        fs::write(src.join("clip.srt"), b"s").expect("write srt");
        fs::write(src.join("clip.en.srt"), b"e").expect("write en srt");
        fs::write(src.join("clip.funscript"), b"f").expect("write funscript");
        fs::write(src.join("clipper.srt"), b"x").expect("write unrelated");
        fs::write(src.join("poster.srt"), b"p").expect("write poster");

        let config = config();
        let plan = plan(&src.join("clip.mp4"), "Acme - Clip", &dst);
        let result = execute(&plan, &request(&config, RelocationMode::Move, false))
            .expect("move must succeed")
            .expect("result expected");

        assert_eq!(result.action, RelocationAction::Moved);
        assert_eq!(result.final_path, dst.join("Acme - Clip.mp4"));
        assert!(dst.join("Acme - Clip.mp4").exists());
        assert!(dst.join("Acme - Clip.srt").exists());
        assert!(dst.join("Acme - Clip.en.srt").exists());
        assert!(dst.join("Acme - Clip.funscript").exists());
        assert!(dst.join("poster.srt").exists());
        assert!(dst.join("Acme - Clip.trickplay").join("0.jpg").exists());
        assert!(src.join("clipper.srt").exists(), "unrelated file must stay");
        assert!(!src.join("clip.mp4").exists());
        assert_eq!(result.companions.len(), 5);
        assert!(result.companion_failures.is_empty());
    }

    #[test]
    fn collision_gets_counter_and_sidecars_follow_it() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path();
        fs::write(dir.join("old.mp4"), b"new").expect("write video");
        fs::write(dir.join("old.srt"), b"s").expect("write srt");
        fs::write(dir.join("Scene.mp4"), b"existing").expect("write existing");

        let config = config();
        let plan = plan(&dir.join("old.mp4"), "Scene", dir);
        let result = execute(&plan, &request(&config, RelocationMode::Rename, false))
            .expect("rename must succeed")
            .expect("result expected");

        assert_eq!(result.action, RelocationAction::Renamed);
        assert_eq!(result.final_path, dir.join("Scene (1).mp4"));
        assert_eq!(fs::read(dir.join("Scene.mp4")).expect("read"), b"existing");
        assert_eq!(fs::read(dir.join("Scene (1).mp4")).expect("read"), b"new");
        assert!(dir.join("Scene (1).srt").exists());
    }

    #[test]
    fn dry_run_reports_live_destination_without_touching_disk() {
        let temp = tempdir().expect("tempdir");
        let src = temp.path().join("in");
        let dst = temp.path().join("out");
        fs::create_dir_all(&src).expect("create src");
        fs::create_dir_all(&dst).expect("create dst");
        fs::write(src.join("a.mp4"), b"v").expect("write video");
        fs::write(src.join("a.srt"), b"s").expect("write srt");
        fs::write(dst.join("B.mp4"), b"taken").expect("write taken");

        let config = config();
        let plan = plan(&src.join("a.mp4"), "B", &dst);
        let before = snapshot(temp.path());
        let dry = execute(&plan, &request(&config, RelocationMode::Move, true))
            .expect("dry run must succeed")
            .expect("result expected");
        assert_eq!(before, snapshot(temp.path()));
        assert!(dry.dry_run);
        assert_eq!(dry.companions.len(), 1);

        let live = execute(&plan, &request(&config, RelocationMode::Move, false))
            .expect("live run must succeed")
            .expect("result expected");
        assert_eq!(dry.final_path, live.final_path);
        assert_eq!(live.final_path, dst.join("B (1).mp4"));
    }

    #[test]
    fn noop_plan_touches_nothing() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path().join("A");
        fs::create_dir_all(&dir).expect("create dir");
        fs::write(dir.join("Scene.mp4"), b"v").expect("write video");
        fs::write(dir.join("Scene.srt"), b"s").expect("write srt");

        let config = config();
        let plan = plan(&dir.join("Scene.mp4"), "Scene", &dir);
        let before = snapshot(temp.path());
        let outcome =
            execute(&plan, &request(&config, RelocationMode::Move, false)).expect("noop is ok");
        assert!(outcome.is_none());
        assert_eq!(before, snapshot(temp.path()));
    }

    #[test]
    fn missing_source_is_reported() {
        let temp = tempdir().expect("tempdir");
        let config = config();
        let plan = plan(&temp.path().join("gone.mp4"), "New", temp.path());
        let err = execute(&plan, &request(&config, RelocationMode::Rename, false))
            .expect_err("must fail");
        assert!(matches!(err, RenamerError::SourceNotFound { .. }));
    }

    #[test]
    fn io_failure_leaves_source_and_skips_sidecars() {
        let temp = tempdir().expect("tempdir");
        let src = temp.path().join("in");
        fs::create_dir_all(&src).expect("create src");
        fs::write(src.join("a.mp4"), b"v").expect("write video");
        fs::write(src.join("a.srt"), b"s").expect("write srt");
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, b"file, not a dir").expect("write blocker");

        let config = config();
        let plan = plan(&src.join("a.mp4"), "a", &blocker.join("nested"));
        let err = execute(&plan, &request(&config, RelocationMode::Move, false))
            .expect_err("must fail");
        assert!(matches!(err, RenamerError::RelocationIo { .. }));
        assert!(src.join("a.mp4").exists());
        assert!(src.join("a.srt").exists());
    }

    #[test]
    fn sidecar_failure_is_recorded_and_later_sidecars_still_move() {
        let temp = tempdir().expect("tempdir");
        let src = temp.path().join("in");
        let dst = temp.path().join("out");
        fs::create_dir_all(&src).expect("create src");
        fs::write(src.join("clip.mp4"), b"v").expect("write video");
        // Fits as a source name, exceeds the name limit once the long base is prepended.
        let long_middle = "a".repeat(240);
        fs::write(src.join(format!("clip.{long_middle}.srt")), b"l").expect("write long srt");
        fs::write(src.join("clip.funscript"), b"f").expect("write funscript");
        fs::write(src.join("clip.srt"), b"s").expect("write srt");

        let config = config();
        let base = "A Rather Long Scene Title";
        let plan = plan(&src.join("clip.mp4"), base, &dst);
        let result = execute(&plan, &request(&config, RelocationMode::Move, false))
            .expect("primary move must succeed")
            .expect("result expected");

        assert_eq!(result.final_path, dst.join(format!("{base}.mp4")));
        assert!(result.final_path.exists(), "primary stays moved");
        assert_eq!(result.companion_failures.len(), 1);
        assert!(src.join(format!("clip.{long_middle}.srt")).exists());
        assert!(dst.join(format!("{base}.funscript")).exists());
        assert!(dst.join(format!("{base}.srt")).exists());
        assert_eq!(result.companions.len(), 2);
    }

    #[test]
    fn relocate_never_replaces_an_existing_entry() {
        let temp = tempdir().expect("tempdir");
        let from = temp.path().join("old.mp4");
        let taken = temp.path().join("Scene.mp4");
        fs::write(&from, b"new").expect("write source");
        fs::write(&taken, b"existing").expect("write existing");

        let err = relocate(&from, &taken, RelocationMode::Rename).expect_err("must refuse");
        assert!(matches!(
            err,
            RenamerError::RelocationIo { ref source, .. } if source.kind() == io::ErrorKind::AlreadyExists
        ));
        assert_eq!(fs::read(&taken).expect("read"), b"existing");
        assert!(from.exists());

        let to = relocate_unique(&from, &taken, RelocationMode::Rename).expect("next free name");
        assert_eq!(to, temp.path().join("Scene (1).mp4"));
        assert_eq!(fs::read(&to).expect("read"), b"new");
        assert!(!from.exists());
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_at_destination_survives() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path();
        fs::write(dir.join("old.mp4"), b"v").expect("write video");
        let link = dir.join("Scene.mp4");
        std::os::unix::fs::symlink(dir.join("gone.mp4"), &link).expect("create symlink");

        let config = config();
        let plan = plan(&dir.join("old.mp4"), "Scene", dir);
        let result = execute(&plan, &request(&config, RelocationMode::Rename, false))
            .expect("rename must succeed")
            .expect("result expected");

        assert_eq!(result.final_path, dir.join("Scene (1).mp4"));
        assert!(fs::symlink_metadata(&link).expect("link kept").file_type().is_symlink());
    }
}
