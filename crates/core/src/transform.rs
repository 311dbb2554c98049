use crate::error::{DateFormatError, RenamerError};
use crate::scene::SceneField;
use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDate;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseFunction {
    Upper,
    Lower,
    Capitalize,
}

/// What a rule puts in place of each match.
///
/// A plain string is expanded against the captures (`$1`, `${name}`); a table
/// `{ case = "upper" }` applies a case function to the whole match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Replacement {
    Expand(String),
    Case { case: CaseFunction },
}

impl Default for Replacement {
    fn default() -> Self {
        Replacement::Expand(String::new())
    }
}

impl Replacement {
    fn apply(&self, caps: &Captures<'_>) -> String {
        match self {
            Replacement::Expand(template) => {
                let mut out = String::new();
                caps.expand(template, &mut out);
                out
            }
            Replacement::Case { case } => {
                let matched = &caps[0];
                match case {
                    CaseFunction::Upper => matched.to_uppercase(),
                    CaseFunction::Lower => matched.to_lowercase(),
                    CaseFunction::Capitalize => capitalize(matched),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawRewriteRule {
    name: String,
    fields: Vec<SceneField>,
    pattern: String,
    #[serde(default)]
    replacement: Replacement,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawRewriteRule", into = "RawRewriteRule")]
pub struct RewriteRule {
    name: String,
    fields: BTreeSet<SceneField>,
    pattern: Regex,
    replacement: Replacement,
}

impl RewriteRule {
    pub fn new(
        name: impl Into<String>,
        fields: impl IntoIterator<Item = SceneField>,
        pattern: &str,
        replacement: impl Into<String>,
    ) -> Result<Self, RenamerError> {
        Self::with_replacement(
            name,
            fields,
            pattern,
            Replacement::Expand(replacement.into()),
        )
    }

    pub fn with_replacement(
        name: impl Into<String>,
        fields: impl IntoIterator<Item = SceneField>,
        pattern: &str,
        replacement: Replacement,
    ) -> Result<Self, RenamerError> {
        let name = name.into();
        let pattern = Regex::new(pattern).map_err(|source| RenamerError::InvalidPattern {
            rule: name.clone(),
            source,
        })?;
        Ok(Self {
            name,
            fields: fields.into_iter().collect(),
            pattern,
            replacement,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn targets(&self, field: SceneField) -> bool {
        self.fields.contains(&field)
    }

    pub fn apply(&self, value: &str) -> String {
        self.pattern
            .replace_all(value, |caps: &Captures<'_>| self.replacement.apply(caps))
            .into_owned()
    }
}

impl TryFrom<RawRewriteRule> for RewriteRule {
    type Error = RenamerError;

    fn try_from(raw: RawRewriteRule) -> Result<Self, Self::Error> {
        RewriteRule::with_replacement(raw.name, raw.fields, &raw.pattern, raw.replacement)
    }
}

impl From<RewriteRule> for RawRewriteRule {
    fn from(rule: RewriteRule) -> Self {
        RawRewriteRule {
            name: rule.name,
            fields: rule.fields.into_iter().collect(),
            pattern: rule.pattern.as_str().to_string(),
            replacement: rule.replacement,
        }
    }
}

/// Applies every rule targeting `field`, in configured order.
pub fn transform_field(value: &str, field: SceneField, rules: &[RewriteRule]) -> String {
    rules
        .iter()
        .filter(|rule| rule.targets(field))
        .fold(value.to_string(), |current, rule| rule.apply(&current))
}

/// Reformats an ISO `YYYY-MM-DD` date with a strftime pattern.
///
/// The error keeps the original string so callers can fall back to it.
pub fn format_date(value: &str, pattern: &str) -> Result<String, DateFormatError> {
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|err| {
        DateFormatError {
            original: value.to_string(),
            reason: err.to_string(),
        }
    })?;

    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(DateFormatError {
            original: value.to_string(),
            reason: format!("invalid date pattern '{pattern}'"),
        });
    }

    Ok(date.format_with_items(items.into_iter()).to_string())
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
