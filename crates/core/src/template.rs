use crate::config::RenamerConfig;
use crate::projector::project_field;
use crate::sanitize::sanitize;
use crate::scene::{SceneField, SceneMetadata};
use crate::transform::transform_field;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart {
    Literal(String),
    Field(SceneField),
}

/// Names produced for one scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedNames {
    pub filename: String,
    pub foldername: String,
    pub studio_template: bool,
}

/// Splits a studio template into literals and field references.
///
/// `$key` takes the longest run of `[a-z0-9_]` after the dollar sign, so
/// `$date_added` never resolves to `$date`. `${key}` delimits a key explicitly
/// when it is directly followed by word characters. Unknown keys stay literal.
pub fn parse_template(input: &str) -> Vec<TemplatePart> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        literal.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (key, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|ch: char| !is_key_char(ch))
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        match SceneField::from_key(key).filter(|_| consumed > 0) {
            Some(field) => {
                if !literal.is_empty() {
                    parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
                }
                parts.push(TemplatePart::Field(field));
            }
            None => {
                literal.push('$');
                literal.push_str(&after[..consumed]);
            }
        }
        rest = &after[consumed..];
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        parts.push(TemplatePart::Literal(literal));
    }
    parts
}

/// Project, rewrite and sanitize one field. `None` when the field is empty.
pub fn render_field(
    scene: &SceneMetadata,
    field: SceneField,
    config: &RenamerConfig,
) -> Option<String> {
    let projected = project_field(scene, field, config)?;
    let transformed = transform_field(&projected, field, &config.regex_transformations);
    let sanitized = sanitize(&transformed);
    (!sanitized.trim().is_empty()).then_some(sanitized)
}

pub fn render_template(
    parts: &[TemplatePart],
    scene: &SceneMetadata,
    config: &RenamerConfig,
) -> String {
    let mut output = String::new();
    for part in parts {
        match part {
            TemplatePart::Literal(s) => output.push_str(s),
            TemplatePart::Field(field) => {
                if let Some(value) = render_field(scene, *field, config) {
                    output.push_str(&wrap(config, *field, &value));
                }
            }
        }
    }
    output.trim().to_string()
}

/// Joins the non-empty fields of `order` with the configured separator.
pub fn render_ordered(
    scene: &SceneMetadata,
    order: &[SceneField],
    config: &RenamerConfig,
) -> String {
    let parts: Vec<String> = order
        .iter()
        .filter(|field| !config.exclude_keys.contains(field))
        .filter_map(|field| {
            render_field(scene, *field, config).map(|value| wrap(config, *field, &value))
        })
        .collect();

    let joined = parts.join(&config.separator);
    if config.separator.is_empty() {
        joined
    } else {
        joined.trim_end_matches(config.separator.as_str()).to_string()
    }
}

/// Studio template when one is configured and renders to something, ordered
/// fields otherwise.
pub fn form_filename(scene: &SceneMetadata, config: &RenamerConfig) -> (String, bool) {
    if let Some(template) = scene
        .studio_name()
        .and_then(|studio| config.studio_templates.get(studio))
        .filter(|template| !template.trim().is_empty())
    {
        let rendered = render_template(&parse_template(template), scene, config);
        if !rendered.is_empty() {
            info!(
                scene_id = %scene.id,
                studio = scene.studio_name().unwrap_or_default(),
                filename = %rendered,
                "applied studio template"
            );
            return (rendered, true);
        }
        debug!(scene_id = %scene.id, "studio template rendered empty, using key order");
    }

    let filename = render_ordered(scene, &config.key_order, config);
    info!(scene_id = %scene.id, filename = %filename, "generated filename");
    (filename, false)
}

pub fn form_foldername(scene: &SceneMetadata, config: &RenamerConfig) -> String {
    let foldername = render_ordered(scene, &config.folder_key_order, config);
    debug!(scene_id = %scene.id, foldername = %foldername, "generated foldername");
    foldername
}

pub fn render_names(scene: &SceneMetadata, config: &RenamerConfig) -> RenderedNames {
    let (filename, studio_template) = form_filename(scene, config);
    RenderedNames {
        filename,
        foldername: form_foldername(scene, config),
        studio_template,
    }
}

fn wrap(config: &RenamerConfig, field: SceneField, value: &str) -> String {
    match config.wrapper_for(field) {
        Some(style) => style.wrap(value),
        None => value.to_string(),
    }
}

fn is_key_char(ch: char) -> bool {
    ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_'
}
