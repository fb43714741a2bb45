//! Shared infrastructure for the end to end tests. Each test builds an app
//! over in-memory databases and drives it with `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use djdb_server::config::DbConfig;
use djdb_server::library::{Album, AlbumCategory, Image, LibraryStore, Track};
use djdb_server::server::{make_app, ServerConfig, ServerState};
use djdb_server::user::UserRole;
use djdb_server::{Fts5SearchVault, SearchVault, SqliteLibraryStore, SqliteUserStore, UserStore};

pub const ARTIST_1_NAME: &str = "Stereolab";
pub const ARTIST_2_NAME: &str = "The Fall";
pub const ALBUM_1_ID: &str = "album0000000001";
pub const ALBUM_2_ID: &str = "album0000000002";
pub const TRACK_1_ID: &str = "track0000000001";
pub const TRACK_2_ID: &str = "track0000000002";
pub const IMAGE_1_ID: &str = "image0000000001";

pub const DJ_HANDLE: &str = "dj";
pub const DJ_PASSWORD: &str = "dj-pass-123";
pub const MD_HANDLE: &str = "md";
pub const MD_PASSWORD: &str = "md-pass-123";

pub struct TestApp {
    pub app: Router,
    pub library_store: Arc<SqliteLibraryStore>,
    pub user_store: Arc<SqliteUserStore>,
}

impl TestApp {
    pub fn new() -> Self {
        let library_store = Arc::new(SqliteLibraryStore::open_in_memory().unwrap());
        let user_store = Arc::new(SqliteUserStore::open_in_memory().unwrap());

        seed_library(library_store.as_ref());
        user_store
            .create_user(DJ_HANDLE, DJ_PASSWORD, &[UserRole::Dj])
            .unwrap();
        user_store
            .create_user(MD_HANDLE, MD_PASSWORD, &[UserRole::MusicDirector])
            .unwrap();

        let search_vault = Fts5SearchVault::new().unwrap();
        search_vault
            .rebuild_index(&library_store.searchable_entries().unwrap())
            .unwrap();

        let state = ServerState {
            config: ServerConfig::default(),
            library_store: library_store.clone(),
            user_store: user_store.clone(),
            crate_store: user_store.clone(),
            search_vault: Arc::new(search_vault),
            db_config: DbConfig::new(library_store.clone()),
        };
        TestApp {
            app: make_app(state),
            library_store,
            user_store,
        }
    }

    pub async fn login(&self, handle: &str, password: &str) -> String {
        let (status, body) = self
            .post(
                "/v1/auth/login",
                None,
                serde_json::json!({"handle": handle, "password": password}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn dj_token(&self) -> String {
        self.login(DJ_HANDLE, DJ_PASSWORD).await
    }

    pub async fn md_token(&self) -> String {
        self.login(MD_HANDLE, MD_PASSWORD).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(build_request("GET", path, token, None)).await
    }

    pub async fn post(
        &self,
        path: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        self.send(build_request("POST", path, token, Some(body)))
            .await
    }

    pub async fn put(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(build_request("PUT", path, token, Some(body)))
            .await
    }

    /// For non-JSON endpoints, returns the raw bytes and headers.
    pub async fn get_bytes(
        &self,
        path: &str,
        token: Option<&str>,
    ) -> (StatusCode, HeaderMap, Bytes) {
        let request = build_request("GET", path, token, None);
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, bytes)
    }
}

fn build_request(
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, token);
    }
    match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn seed_library(store: &dyn LibraryStore) {
    let artist_1 = store.create_artist(ARTIST_1_NAME).unwrap();
    let artist_2 = store.create_artist(ARTIST_2_NAME).unwrap();

    store
        .insert_album(&Album {
            id: ALBUM_1_ID.to_string(),
            title: "Dots and Loops".to_string(),
            artist_id: Some(artist_1.id.clone()),
            artist_name: ARTIST_1_NAME.to_string(),
            label: Some("Duophonic".to_string()),
            year: Some(1997),
            category: AlbumCategory::Core,
            is_compilation: false,
            num_reviews: 0,
            num_comments: 0,
            created: 0,
        })
        .unwrap();
    store
        .insert_album(&Album {
            id: ALBUM_2_ID.to_string(),
            title: "Hex Enduction Hour".to_string(),
            artist_id: Some(artist_2.id.clone()),
            artist_name: ARTIST_2_NAME.to_string(),
            label: None,
            year: Some(1982),
            category: AlbumCategory::Local,
            is_compilation: false,
            num_reviews: 0,
            num_comments: 0,
            created: 0,
        })
        .unwrap();

    store
        .insert_track(&Track {
            id: TRACK_1_ID.to_string(),
            album_id: Some(ALBUM_1_ID.to_string()),
            artist_id: Some(artist_1.id.clone()),
            title: "Brakhage".to_string(),
            track_num: 1,
            duration_ms: Some(347_000),
            tags: vec![],
        })
        .unwrap();
    store
        .insert_track(&Track {
            id: TRACK_2_ID.to_string(),
            album_id: Some(ALBUM_1_ID.to_string()),
            artist_id: Some(artist_1.id),
            title: "Miss Modular".to_string(),
            track_num: 2,
            duration_ms: Some(271_000),
            tags: vec!["recommended".to_string()],
        })
        .unwrap();

    // Tiny valid png header so mime sniffing has something to chew on
    store
        .insert_image(&Image {
            id: IMAGE_1_ID.to_string(),
            data: vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0],
            mime_type: None,
            created: 0,
        })
        .unwrap();
}
