use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    AccessLibrary,
    OwnCrate,
    WriteReviews,
    EditLibrary,
    ModerateReviews,
    ServerAdmin,
}

impl Permission {
    pub fn as_int(self) -> i32 {
        match self {
            Permission::AccessLibrary => 1,
            Permission::OwnCrate => 2,
            Permission::WriteReviews => 3,
            Permission::EditLibrary => 4,
            Permission::ModerateReviews => 5,
            Permission::ServerAdmin => 6,
        }
    }

    pub fn from_int(value: i32) -> Option<Self> {
        match value {
            1 => Some(Permission::AccessLibrary),
            2 => Some(Permission::OwnCrate),
            3 => Some(Permission::WriteReviews),
            4 => Some(Permission::EditLibrary),
            5 => Some(Permission::ModerateReviews),
            6 => Some(Permission::ServerAdmin),
            _ => None,
        }
    }
}

const DJ_PERMISSIONS: &[Permission] = &[
    Permission::AccessLibrary,
    Permission::OwnCrate,
    Permission::WriteReviews,
];
const MUSIC_DIRECTOR_PERMISSIONS: &[Permission] = &[
    Permission::AccessLibrary,
    Permission::OwnCrate,
    Permission::WriteReviews,
    Permission::EditLibrary,
    Permission::ModerateReviews,
    Permission::ServerAdmin,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UserRole {
    Dj,
    MusicDirector,
}

impl UserRole {
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            UserRole::Dj => DJ_PERMISSIONS,
            UserRole::MusicDirector => MUSIC_DIRECTOR_PERMISSIONS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Dj => "Dj",
            UserRole::MusicDirector => "MusicDirector",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "dj" => Some(UserRole::Dj),
            "musicdirector" | "music_director" => Some(UserRole::MusicDirector),
            _ => None,
        }
    }
}
