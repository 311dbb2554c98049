use serde::{Deserialize, Serialize};
use std::fmt;

/// Scene record as returned by the stash `findScene` query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneMetadata {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub studio: Option<NamedEntity>,
    #[serde(default)]
    pub performers: Vec<NamedEntity>,
    #[serde(default)]
    pub tags: Vec<NamedEntity>,
    #[serde(default)]
    pub stash_ids: Vec<StashId>,
    #[serde(default)]
    pub files: Vec<FileRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedEntity {
    pub name: String,
}

impl NamedEntity {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StashId {
    #[serde(default)]
    pub stash_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub video_codec: Option<String>,
    #[serde(default)]
    pub frame_rate: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneField {
    Id,
    Title,
    Date,
    Studio,
    Performers,
    Tags,
    StashId,
    Height,
    VideoCodec,
    FrameRate,
}

impl SceneField {
    pub const ALL: [SceneField; 10] = [
        SceneField::Id,
        SceneField::Title,
        SceneField::Date,
        SceneField::Studio,
        SceneField::Performers,
        SceneField::Tags,
        SceneField::StashId,
        SceneField::Height,
        SceneField::VideoCodec,
        SceneField::FrameRate,
    ];

    pub fn key(self) -> &'static str {
        match self {
            SceneField::Id => "id",
            SceneField::Title => "title",
            SceneField::Date => "date",
            SceneField::Studio => "studio",
            SceneField::Performers => "performers",
            SceneField::Tags => "tags",
            SceneField::StashId => "stash_id",
            SceneField::Height => "height",
            SceneField::VideoCodec => "video_codec",
            SceneField::FrameRate => "frame_rate",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }
}

impl fmt::Display for SceneField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAttribute {
    Height,
    VideoCodec,
    FrameRate,
}

/// Raw value of one scene field, classified by how it must be projected.
#[derive(Debug, Clone, Copy)]
pub enum FieldValue<'a> {
    Scalar(Option<&'a str>),
    Date(Option<&'a str>),
    Entity(Option<&'a NamedEntity>),
    Performers(&'a [NamedEntity]),
    Tags(&'a [NamedEntity]),
    Identifiers(&'a [StashId]),
    FileAttribute(FileAttribute, &'a [FileRecord]),
}

impl SceneMetadata {
    pub fn value(&self, field: SceneField) -> FieldValue<'_> {
        match field {
            SceneField::Id => FieldValue::Scalar(Some(self.id.as_str())),
            SceneField::Title => FieldValue::Scalar(self.title.as_deref()),
            SceneField::Date => FieldValue::Date(self.date.as_deref()),
            SceneField::Studio => FieldValue::Entity(self.studio.as_ref()),
            SceneField::Performers => FieldValue::Performers(&self.performers),
            SceneField::Tags => FieldValue::Tags(&self.tags),
            SceneField::StashId => FieldValue::Identifiers(&self.stash_ids),
            SceneField::Height => FieldValue::FileAttribute(FileAttribute::Height, &self.files),
            SceneField::VideoCodec => {
                FieldValue::FileAttribute(FileAttribute::VideoCodec, &self.files)
            }
            SceneField::FrameRate => {
                FieldValue::FileAttribute(FileAttribute::FrameRate, &self.files)
            }
        }
    }

    pub fn normalized_title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn studio_name(&self) -> Option<&str> {
        self.studio
            .as_ref()
            .map(|studio| studio.name.trim())
            .filter(|s| !s.is_empty())
    }
}
