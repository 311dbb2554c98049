use crate::config::RenamerConfig;
use crate::scene::{FieldValue, FileAttribute, FileRecord, NamedEntity, SceneField, SceneMetadata};
use crate::transform::format_date;
use tracing::warn;

/// Flattens one scene field into its display string.
///
/// `None` means the field is absent or empty and must not be rendered.
pub fn project_field(
    scene: &SceneMetadata,
    field: SceneField,
    config: &RenamerConfig,
) -> Option<String> {
    let projected = match scene.value(field) {
        FieldValue::Scalar(value) => value.map(str::to_string),
        FieldValue::Entity(entity) => entity.map(|entity| entity.name.clone()),
        FieldValue::Date(value) => value.map(|raw| project_date(scene, raw, config)),
        FieldValue::Performers(performers) => Some(project_performers(performers, config)),
        FieldValue::Tags(tags) => Some(project_tags(tags, config)),
        FieldValue::Identifiers(ids) => ids
            .iter()
            .filter_map(|id| id.stash_id.as_deref())
            .map(str::trim)
            .find(|id| !id.is_empty())
            .map(str::to_string),
        FieldValue::FileAttribute(attribute, files) => project_file_attribute(attribute, files),
    };

    projected.filter(|value| !value.trim().is_empty())
}

fn project_date(scene: &SceneMetadata, raw: &str, config: &RenamerConfig) -> String {
    match format_date(raw, &config.date_format) {
        Ok(formatted) => formatted,
        Err(err) => {
            warn!(scene_id = %scene.id, error = %err, "keeping unformatted date");
            err.original
        }
    }
}

fn project_performers(performers: &[NamedEntity], config: &RenamerConfig) -> String {
    let mut names: Vec<&str> = performers
        .iter()
        .map(|performer| performer.name.as_str())
        .collect();
    names.sort_unstable();
    if let Some(limit) = config.performer_limit {
        names.truncate(limit);
    }
    names.join(&config.separator)
}

fn project_tags(tags: &[NamedEntity], config: &RenamerConfig) -> String {
    tags.iter()
        .map(|tag| tag.name.as_str())
        .filter(|name| config.tag_whitelist.contains(*name))
        .collect::<Vec<_>>()
        .join(&config.separator)
}

fn project_file_attribute(attribute: FileAttribute, files: &[FileRecord]) -> Option<String> {
    match attribute {
        FileAttribute::Height => files
            .iter()
            .find_map(|file| file.height.filter(|h| *h > 0))
            .map(|height| format!("{height}p")),
        FileAttribute::VideoCodec => files
            .iter()
            .filter_map(|file| file.video_codec.as_deref())
            .map(str::trim)
            .find(|codec| !codec.is_empty())
            .map(str::to_uppercase),
        FileAttribute::FrameRate => files
            .iter()
            .find_map(|file| file.frame_rate.filter(|fps| *fps > 0.0))
            // Whole rates keep their decimal: `30.0 FPS`.
            .map(|fps| format!("{fps:?} FPS")),
    }
}
