use serde::{Deserialize, Serialize};

/// The three reference kinds a crate item or search hit can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Artist,
    Album,
    Track,
}

impl EntityKind {
    pub fn to_int(self) -> i64 {
        match self {
            EntityKind::Artist => 0,
            EntityKind::Album => 1,
            EntityKind::Track => 2,
        }
    }

    pub fn from_int(value: i64) -> Option<EntityKind> {
        match value {
            0 => Some(EntityKind::Artist),
            1 => Some(EntityKind::Album),
            2 => Some(EntityKind::Track),
            _ => None,
        }
    }

    pub fn from_str_name(value: &str) -> Option<EntityKind> {
        match value {
            "artist" => Some(EntityKind::Artist),
            "album" => Some(EntityKind::Album),
            "track" => Some(EntityKind::Track),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    pub pretty_name: String,
    pub created: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlbumCategory {
    Core,
    Local,
    Heavy,
    Light,
}

impl AlbumCategory {
    pub fn to_int(self) -> i64 {
        match self {
            AlbumCategory::Core => 0,
            AlbumCategory::Local => 1,
            AlbumCategory::Heavy => 2,
            AlbumCategory::Light => 3,
        }
    }

    pub fn from_int(value: i64) -> Option<AlbumCategory> {
        match value {
            0 => Some(AlbumCategory::Core),
            1 => Some(AlbumCategory::Local),
            2 => Some(AlbumCategory::Heavy),
            3 => Some(AlbumCategory::Light),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub title: String,
    pub artist_id: Option<String>,
    /// Display string, kept even when `artist_id` is set so compilation albums
    /// and albums whose artist row was renamed still render what was imported.
    pub artist_name: String,
    pub label: Option<String>,
    pub year: Option<i32>,
    pub category: AlbumCategory,
    pub is_compilation: bool,
    pub num_reviews: i64,
    pub num_comments: i64,
    pub created: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub album_id: Option<String>,
    pub artist_id: Option<String>,
    pub title: String,
    pub track_num: i32,
    pub duration_ms: Option<i64>,
    pub tags: Vec<String>,
}

pub const TAG_EXPLICIT: &str = "explicit";
pub const TAG_RECOMMENDED: &str = "recommended";

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub id: String,
    pub data: Vec<u8>,
    pub mime_type: Option<String>,
    pub created: i64,
}

/// Sort-normalized display name: a leading English article moves to the back,
/// so "The Fall" collates under F as "Fall, The".
pub fn pretty_name(name: &str) -> String {
    let trimmed = name.trim();
    // Split on the first whitespace so multibyte names never get byte-sliced
    if let Some((first_word, rest)) = trimmed.split_once(char::is_whitespace) {
        let rest = rest.trim_start();
        let is_article = ["The", "A", "An"]
            .iter()
            .any(|article| first_word.eq_ignore_ascii_case(article));
        if is_article && !rest.is_empty() {
            return format!("{}, {}", rest, first_word);
        }
    }
    trimmed.to_string()
}
