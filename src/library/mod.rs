//! Music library: artists, albums, tracks, images, documents.

mod models;
mod schema;
mod store;

pub use models::*;
pub use schema::LIBRARY_DB_SCHEMAS;
pub use store::{
    new_entity_id, AlbumEdit, LibraryStore, SearchEntry, SqliteLibraryStore, ENTITY_ID_LEN,
};
