use crate::config::RenamerConfig;
use crate::error::RenamerError;
use crate::executor::{execute, ExecuteRequest, RelocationMode, RelocationResult};
use crate::pathmap::make_path;
use crate::payload::parse_hook_payload;
use crate::planner::{file_stem, find_stash_root, plan, target_directory};
use crate::scene::SceneMetadata;
use crate::source::SceneSource;
use crate::template::{render_names, RenderedNames};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedItem {
    pub scene_id: String,
    pub path: Option<PathBuf>,
    pub reason: String,
}

/// Everything that happened to one scene, in processing order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneReport {
    pub scene_id: String,
    pub names: Option<RenderedNames>,
    pub results: Vec<RelocationResult>,
    pub skipped: Vec<SkippedItem>,
}

impl SceneReport {
    fn skip(&mut self, path: Option<&Path>, reason: impl Into<String>) {
        self.skipped.push(SkippedItem {
            scene_id: self.scene_id.clone(),
            path: path.map(Path::to_path_buf),
            reason: reason.into(),
        });
    }

    /// Source and destination directories of live relocations, first-seen order.
    pub fn touched_directories(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = Vec::new();
        for result in self.results.iter().filter(|r| !r.dry_run) {
            for path in [&result.original_path, &result.final_path] {
                if let Some(dir) = path.parent() {
                    if !dirs.iter().any(|seen| seen == dir) {
                        dirs.push(dir.to_path_buf());
                    }
                }
            }
        }
        dirs
    }
}

/// Stash roots from the configuration, translated for this host.
pub fn stash_roots(config: &RenamerConfig) -> Vec<PathBuf> {
    config
        .stash_roots
        .iter()
        .map(|root| make_path(&root.to_string_lossy(), &config.folder_map))
        .collect()
}

/// Renames and relocates every file of `scene`. Per-file failures end up in
/// `skipped`; they never stop the remaining files.
pub fn process_scene(
    scene: &SceneMetadata,
    config: &RenamerConfig,
    roots: &[PathBuf],
) -> SceneReport {
    let mut report = SceneReport {
        scene_id: scene.id.clone(),
        ..SceneReport::default()
    };

    if scene.normalized_title().is_none() {
        info!(scene_id = %scene.id, "skipping scene without title");
        report.skip(None, "scene has no title");
        return report;
    }

    let names = render_names(scene, config);
    if config.rename_files && names.filename.is_empty() {
        warn!(scene_id = %scene.id, "rendered filename is empty");
        report.skip(None, "rendered filename is empty");
        report.names = Some(names);
        return report;
    }

    for file in &scene.files {
        let original = make_path(&file.path, &config.folder_map);
        match process_file(scene, &original, &names, config, roots) {
            Ok(Some(result)) => {
                info!(
                    scene_id = %scene.id,
                    action = ?result.action,
                    from = %result.original_path.display(),
                    to = %result.final_path.display(),
                    dry_run = result.dry_run,
                    "relocated"
                );
                report.results.push(result);
            }
            Ok(None) => {}
            Err(err) => {
                warn!(scene_id = %scene.id, path = %original.display(), error = %err, "skipping file");
                report.skip(Some(&original), err.to_string());
            }
        }
    }

    report.names = Some(names);
    report
}

fn process_file(
    scene: &SceneMetadata,
    original: &Path,
    names: &RenderedNames,
    config: &RenamerConfig,
    roots: &[PathBuf],
) -> Result<Option<RelocationResult>, RenamerError> {
    if !original.exists() {
        return Err(RenamerError::SourceNotFound {
            path: original.to_path_buf(),
        });
    }
    let root = find_stash_root(original, roots).ok_or_else(|| {
        RenamerError::PathOutsideKnownRoots {
            path: original.to_path_buf(),
        }
    })?;

    let desired_dir = if config.move_files {
        target_directory(scene, root, &names.foldername, config)
    } else {
        original
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    };
    let desired_base = if config.rename_files {
        names.filename.clone()
    } else {
        file_stem(original)
    };

    let plan = plan(original, &desired_base, &desired_dir);
    let request = ExecuteRequest {
        scene_id: &scene.id,
        mode: if plan.move_needed {
            RelocationMode::Move
        } else {
            RelocationMode::Rename
        },
        dry_run: config.dry_run,
        move_requested: config.move_files,
        config,
    };
    execute(&plan, &request)
}

/// One hook invocation: payload → scene lookup → relocation.
///
/// Payload and lookup failures are fatal and happen before any file is touched.
pub fn run_hook(
    payload: &str,
    source: &dyn SceneSource,
    config: &RenamerConfig,
    roots: &[PathBuf],
) -> Result<SceneReport, RenamerError> {
    let context = parse_hook_payload(payload)?;
    let scene = source
        .find_scene(&context.scene_id)?
        .ok_or_else(|| RenamerError::SceneNotFound(context.scene_id.clone()))?;
    Ok(process_scene(&scene, config, roots))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::RelocationAction;
    use crate::scene::{FileRecord, NamedEntity, SceneField};
    use std::collections::HashMap;
    use std::fs;
    use tempfile::tempdir;

    fn scene(paths: &[&Path]) -> SceneMetadata {
        SceneMetadata {
            id: "77".to_string(),
            title: Some("Harbor Lights".to_string()),
            date: Some("2023-11-02".to_string()),
            studio: Some(NamedEntity::new("Acme")),
            files: paths
                .iter()
                .map(|path| FileRecord {
                    path: path.to_string_lossy().to_string(),
                    height: Some(720),
                    ..FileRecord::default()
                })
                .collect(),
            ..SceneMetadata::default()
        }
    }

    fn config(move_files: bool) -> RenamerConfig {
        RenamerConfig {
            key_order: vec![SceneField::Title, SceneField::Height],
            wrapper_styles: Default::default(),
            move_files,
            rename_files: true,
            dry_run: false,
            ..RenamerConfig::default()
        }
    }

    #[test]
    fn moves_into_studio_folder_under_its_root() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path().join("stash");
        fs::create_dir_all(root.join("incoming")).expect("create incoming");
        let original = root.join("incoming").join("raw.mp4");
        fs::write(&original, b"v").expect("write video");
        fs::write(root.join("incoming").join("raw.srt"), b"s").expect("write srt");

        let report = process_scene(&scene(&[original.as_path()]), &config(true), &[root.clone()]);

        assert!(report.skipped.is_empty(), "{:?}", report.skipped);
        assert_eq!(report.results.len(), 1);
        let result = &report.results[0];
        assert_eq!(result.action, RelocationAction::Moved);
        assert_eq!(result.final_path, root.join("Acme").join("Harbor Lights - 720p.mp4"));
        assert!(root.join("Acme").join("Harbor Lights - 720p.srt").exists());
        assert_eq!(
            report.touched_directories(),
            vec![root.join("incoming"), root.join("Acme")]
        );
    }

    #[test]
    fn failures_are_isolated_per_file() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path().join("stash");
        let outside = temp.path().join("elsewhere");
        fs::create_dir_all(&root).expect("create root");
        fs::create_dir_all(&outside).expect("create outside");
        let stray = outside.join("stray.mp4");
        fs::write(&stray, b"v").expect("write stray");
        let good = root.join("good.mp4");
        fs::write(&good, b"v").expect("write good");
        let missing = root.join("missing.mp4");

        let report = process_scene(
            &scene(&[stray.as_path(), missing.as_path(), good.as_path()]),
            &config(false),
            &[root.clone()],
        );

        assert_eq!(report.skipped.len(), 2);
        assert!(report.skipped[0].reason.contains("not inside any known stash root"));
        assert!(report.skipped[1].reason.contains("source file not found"));
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].action, RelocationAction::Renamed);
        assert!(root.join("Harbor Lights - 720p.mp4").exists());
        assert!(stray.exists(), "file outside roots must not be touched");
    }

    #[test]
    fn correctly_named_file_yields_no_result() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path().join("stash");
        fs::create_dir_all(&root).expect("create root");
        let original = root.join("Harbor Lights - 720p.mp4");
        fs::write(&original, b"v").expect("write video");

        let report = process_scene(&scene(&[original.as_path()]), &config(false), &[root]);
        assert!(report.results.is_empty());
        assert!(report.skipped.is_empty());
        assert!(original.exists());
    }

    #[test]
    fn untitled_scene_is_skipped() {
        let mut scene = scene(&[]);
        scene.title = Some("   ".to_string());
        let report = process_scene(&scene, &config(true), &[]);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.names.is_none());
    }

    #[test]
    fn hook_rejects_bad_payload_and_unknown_scene() {
        let sources: HashMap<String, SceneMetadata> = HashMap::new();
        let config = config(false);

        let err = run_hook("{}", &sources, &config, &[]).expect_err("must fail");
        assert!(matches!(err, RenamerError::PayloadInvalid(_)));

        let err = run_hook(r#"{"args":{"hookContext":{"id":5}}}"#, &sources, &config, &[])
            .expect_err("must fail");
        assert!(matches!(err, RenamerError::SceneNotFound(_)));
    }

    #[test]
    fn hook_processes_found_scene_in_dry_run() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path().to_path_buf();
        let original = root.join("clip.mp4");
        fs::write(&original, b"v").expect("write video");

        let sources = HashMap::from([("77".to_string(), scene(&[original.as_path()]))]);
        let config = RenamerConfig {
            dry_run: true,
            ..config(true)
        };
        let report = run_hook(
            r#"{"args":{"hookContext":{"id":"77"}}}"#,
            &sources,
            &config,
            &[root.clone()],
        )
        .expect("hook must run");

        assert_eq!(report.results.len(), 1);
        assert!(report.results[0].dry_run);
        assert!(original.exists());
        assert!(!root.join("Acme").exists());
        assert!(report.touched_directories().is_empty());
    }
}
