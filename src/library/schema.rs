//! Versioned schema of the library database.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};
use anyhow::Result;
use rusqlite::Connection;

/// V 0
const ARTIST_TABLE_V_0: Table = Table {
    name: "artist",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("pretty_name", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("index_artist_pretty_name", "pretty_name")],
    unique_constraints: &[],
};

const ALBUM_ARTIST_FK: ForeignKey = ForeignKey {
    foreign_table: "artist",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::SetNull,
};

const ALBUM_TABLE_V_0: Table = Table {
    name: "album",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("artist_id", &SqlType::Text, foreign_key = Some(&ALBUM_ARTIST_FK)),
        sqlite_column!("artist_name", &SqlType::Text, non_null = true),
        sqlite_column!("label", &SqlType::Text),
        sqlite_column!("year", &SqlType::Integer),
        sqlite_column!("category", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "is_compilation",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "num_reviews",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "num_comments",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("index_album_artist_id", "artist_id")],
    unique_constraints: &[],
};

const TRACK_ALBUM_FK: ForeignKey = ForeignKey {
    foreign_table: "album",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const TRACK_ARTIST_FK: ForeignKey = ForeignKey {
    foreign_table: "artist",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::SetNull,
};

const TRACK_TABLE_V_0: Table = Table {
    name: "track",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("album_id", &SqlType::Text, foreign_key = Some(&TRACK_ALBUM_FK)),
        sqlite_column!("artist_id", &SqlType::Text, foreign_key = Some(&TRACK_ARTIST_FK)),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("track_num", &SqlType::Integer, non_null = true),
        sqlite_column!("duration_ms", &SqlType::Integer),
    ],
    indices: &[("index_track_album_id", "album_id")],
    unique_constraints: &[],
};

const DOCUMENT_ALBUM_FK: ForeignKey = ForeignKey {
    foreign_table: "album",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const DOCUMENT_TABLE_V_0: Table = Table {
    name: "document",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!(
            "album_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&DOCUMENT_ALBUM_FK)
        ),
        sqlite_column!("doc_type", &SqlType::Integer, non_null = true),
        sqlite_column!("author_user_id", &SqlType::Text),
        sqlite_column!("author_name", &SqlType::Text, non_null = true),
        sqlite_column!("title", &SqlType::Text),
        sqlite_column!("text", &SqlType::Text, non_null = true),
        sqlite_column!(
            "is_hidden",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!(
            "modified",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[
        ("index_document_album_id", "album_id"),
        ("index_document_created", "created"),
    ],
    unique_constraints: &[],
};

const IMAGE_TABLE_V_0: Table = Table {
    name: "image",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("data", &SqlType::Blob, non_null = true),
        sqlite_column!("mime_type", &SqlType::Text),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

const CONFIG_TABLE_V_0: Table = Table {
    name: "config",
    columns: &[
        sqlite_column!("key", &SqlType::Text, is_primary_key = true),
        sqlite_column!("value", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[],
};

/// V 1, track tags
const TRACK_TAG_TRACK_FK: ForeignKey = ForeignKey {
    foreign_table: "track",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const TRACK_TAG_TABLE_V_1: Table = Table {
    name: "track_tag",
    columns: &[
        sqlite_column!(
            "track_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&TRACK_TAG_TRACK_FK)
        ),
        sqlite_column!("tag", &SqlType::Text, non_null = true),
    ],
    indices: &[("index_track_tag_track_id", "track_id")],
    unique_constraints: &[&["track_id", "tag"]],
};

fn migrate_v0_to_v1(conn: &Connection) -> Result<()> {
    TRACK_TAG_TABLE_V_1.create(conn)?;
    Ok(())
}

pub const LIBRARY_DB_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        tables: &[
            ARTIST_TABLE_V_0,
            ALBUM_TABLE_V_0,
            TRACK_TABLE_V_0,
            DOCUMENT_TABLE_V_0,
            IMAGE_TABLE_V_0,
            CONFIG_TABLE_V_0,
        ],
        migration: None,
    },
    VersionedSchema {
        version: 1,
        tables: &[
            ARTIST_TABLE_V_0,
            ALBUM_TABLE_V_0,
            TRACK_TABLE_V_0,
            DOCUMENT_TABLE_V_0,
            IMAGE_TABLE_V_0,
            CONFIG_TABLE_V_0,
            TRACK_TAG_TABLE_V_1,
        ],
        migration: Some(migrate_v0_to_v1),
    },
];
