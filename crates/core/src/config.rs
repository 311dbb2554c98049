use crate::error::RenamerError;
use crate::scene::SceneField;
use crate::transform::RewriteRule;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WrapperStyle {
    pub prefix: String,
    pub suffix: String,
}

impl WrapperStyle {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    pub fn wrap(&self, value: &str) -> String {
        format!("{}{}{}", self.prefix, value, self.suffix)
    }
}

/// Everything a run needs. Loaded once and passed by reference; never mutated
/// while scenes are processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenamerConfig {
    pub separator: String,
    pub date_format: String,
    pub key_order: Vec<SceneField>,
    pub folder_key_order: Vec<SceneField>,
    pub exclude_keys: BTreeSet<SceneField>,
    pub tag_whitelist: BTreeSet<String>,
    pub performer_limit: Option<usize>,
    pub wrapper_styles: BTreeMap<String, WrapperStyle>,
    pub studio_templates: BTreeMap<String, String>,
    pub regex_transformations: Vec<RewriteRule>,
    pub associated_files: Vec<String>,
    pub unassociated_files: Vec<String>,
    pub move_trickplay: bool,
    pub move_files: bool,
    pub rename_files: bool,
    pub dry_run: bool,
    pub stash_roots: Vec<PathBuf>,
    pub tag_specific_paths: BTreeMap<String, String>,
    pub folder_map: BTreeMap<String, String>,
    pub journal_path: Option<PathBuf>,
    pub rescan_queue_path: Option<PathBuf>,
}

impl Default for RenamerConfig {
    fn default() -> Self {
        Self {
            separator: " - ".to_string(),
            date_format: "%Y-%m-%d".to_string(),
            key_order: vec![
                SceneField::Studio,
                SceneField::Title,
                SceneField::Date,
                SceneField::Performers,
                SceneField::Height,
            ],
            folder_key_order: Vec::new(),
            exclude_keys: BTreeSet::new(),
            tag_whitelist: BTreeSet::new(),
            performer_limit: None,
            wrapper_styles: BTreeMap::from([
                ("date".to_string(), WrapperStyle::new("(", ")")),
                ("height".to_string(), WrapperStyle::new("[", "]")),
            ]),
            studio_templates: BTreeMap::new(),
            regex_transformations: Vec::new(),
            associated_files: vec![
                "srt".to_string(),
                "vtt".to_string(),
                "funscript".to_string(),
                "nfo".to_string(),
            ],
            unassociated_files: Vec::new(),
            move_trickplay: true,
            move_files: false,
            rename_files: true,
            dry_run: true,
            stash_roots: Vec::new(),
            tag_specific_paths: BTreeMap::new(),
            folder_map: BTreeMap::new(),
            journal_path: None,
            rescan_queue_path: None,
        }
    }
}

impl RenamerConfig {
    pub fn wrapper_for(&self, field: SceneField) -> Option<&WrapperStyle> {
        self.wrapper_styles.get(field.key())
    }

    pub fn validate(&self) -> Result<(), RenamerError> {
        if self.rename_files && self.key_order.is_empty() {
            return Err(RenamerError::ConfigurationInvalid(
                "key_order must not be empty while rename_files is enabled".to_string(),
            ));
        }
        if let Some(ext) = self
            .associated_files
            .iter()
            .find(|ext| ext.is_empty() || ext.starts_with('.'))
        {
            return Err(RenamerError::ConfigurationInvalid(format!(
                "associated_files entries are bare extensions without a dot, got '{ext}'"
            )));
        }
        if let Some(key) = self
            .wrapper_styles
            .keys()
            .find(|key| SceneField::from_key(key).is_none())
        {
            return Err(RenamerError::ConfigurationInvalid(format!(
                "wrapper_styles has unknown field '{key}'"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
    pub journal_path: PathBuf,
    pub rescan_queue_path: PathBuf,
}

pub fn app_paths() -> Result<AppPaths> {
    let proj = ProjectDirs::from("org", "stashapp", "stash-renamer")
        .context("could not resolve the OS configuration directory")?;
    let config_dir = proj.config_dir().to_path_buf();
    let data_dir = proj.data_dir().to_path_buf();
    Ok(AppPaths {
        config_path: config_dir.join("config.toml"),
        journal_path: data_dir.join("renamer.jsonl"),
        rescan_queue_path: data_dir.join("renamer-lock.dat"),
        config_dir,
    })
}

pub fn load_config() -> Result<RenamerConfig> {
    let paths = app_paths()?;
    Ok(load_config_from(&paths.config_path)?)
}

pub fn load_config_from(path: &Path) -> Result<RenamerConfig, RenamerError> {
    if !path.exists() {
        return Err(RenamerError::ConfigurationMissing {
            path: path.to_path_buf(),
        });
    }

    let raw = fs::read_to_string(path).map_err(|err| {
        RenamerError::ConfigurationInvalid(format!("cannot read {}: {err}", path.display()))
    })?;
    let config = toml::from_str::<RenamerConfig>(&raw).map_err(|err| {
        RenamerError::ConfigurationInvalid(format!("cannot parse {}: {err}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

pub fn save_config(config: &RenamerConfig, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("could not create config directory: {}", dir.display()))?;
    }
    let body = toml::to_string_pretty(config).context("could not serialize configuration")?;
    fs::write(path, body)
        .with_context(|| format!("could not write config file: {}", path.display()))?;
    Ok(())
}
