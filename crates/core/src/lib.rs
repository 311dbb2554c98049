mod config;
mod error;
mod executor;
mod journal;
mod pathmap;
mod payload;
mod planner;
mod process;
mod projector;
mod rescan;
mod sanitize;
mod scene;
mod source;
mod template;
mod transform;

pub use config::{
    app_paths, load_config, load_config_from, save_config, AppPaths, RenamerConfig, WrapperStyle,
};
pub use error::{DateFormatError, RenamerError};
pub use executor::{
    execute, CompanionKind, CompanionMove, ExecuteRequest, RelocationAction, RelocationMode,
    RelocationResult,
};
pub use journal::ResultJournal;
pub use pathmap::{make_path, translate_path, PathStyle};
pub use payload::{parse_hook_payload, HookContext};
pub use planner::{
    find_stash_root, plan, resolve_unique, target_directory, RelocationPlan, NO_STUDIO,
};
pub use process::{process_scene, run_hook, stash_roots, SceneReport, SkippedItem};
pub use projector::project_field;
pub use rescan::{dedupe_ordered, RescanQueue};
pub use sanitize::{sanitize, sanitize_opt};
pub use scene::{FieldValue, FileAttribute, FileRecord, NamedEntity, SceneField, SceneMetadata, StashId};
pub use source::{JsonSceneDirectory, SceneSource};
pub use template::{
    form_filename, form_foldername, parse_template, render_names, render_ordered,
    render_template, RenderedNames, TemplatePart,
};
pub use transform::{format_date, transform_field, CaseFunction, Replacement, RewriteRule};
