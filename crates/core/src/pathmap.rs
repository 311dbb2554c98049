use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStyle {
    Posix,
    Windows,
}

impl PathStyle {
    pub fn native() -> Self {
        if cfg!(windows) {
            PathStyle::Windows
        } else {
            PathStyle::Posix
        }
    }
}

/// Rewrites a path reported by stash into the host's form.
///
/// On Windows the longest matching prefix of `map` is replaced and slashes are
/// flipped; on POSIX hosts the path is used as reported.
pub fn translate_path(raw: &str, map: &BTreeMap<String, String>, style: PathStyle) -> String {
    if style == PathStyle::Posix {
        return raw.to_string();
    }

    let mapped = map
        .iter()
        .filter(|(from, _)| !from.is_empty() && raw.starts_with(from.as_str()))
        .max_by_key(|(from, _)| from.len())
        .map(|(from, to)| {
            let relative = raw[from.len()..].trim_start_matches('/');
            if relative.is_empty() {
                to.clone()
            } else {
                format!("{}\\{}", to.trim_end_matches('\\'), relative)
            }
        })
        .unwrap_or_else(|| raw.to_string());

    mapped.replace('/', "\\")
}

pub fn make_path(raw: &str, map: &BTreeMap<String, String>) -> PathBuf {
    PathBuf::from(translate_path(raw, map, PathStyle::native()))
}
