//! HTTP API: router assembly and handlers.

use super::error::ApiError;
use super::session::Session;
use super::state::{
    GuardedCrateStore, GuardedLibraryStore, GuardedSearchVault, GuardedUserStore, ServerState,
};
use super::log_requests;
use crate::config::DbConfig;
use crate::crates::CrateItem;
use crate::library::{new_entity_id, Album, AlbumCategory, AlbumEdit, Artist, EntityKind, Track};
use crate::reviews::{self, sanitize_html, DocKind, Document, ALLOWED_TAGS};
use crate::search::{music_search, partial_entity_search, SearchResult};
use crate::user::Permission;

use anyhow::Result;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use tracing::debug;

// =============================================================================
// Auth
// =============================================================================

#[derive(Deserialize, Debug)]
struct LoginBody {
    handle: String,
    password: String,
}

#[derive(Serialize)]
struct LoginSuccessResponse {
    token: String,
}

async fn login(
    State(user_store): State<GuardedUserStore>,
    Json(body): Json<LoginBody>,
) -> Result<Response, ApiError> {
    debug!("login() called for handle {}", body.handle);
    let user = user_store
        .verify_password(&body.handle, &body.password)?
        .ok_or(ApiError::Forbidden)?;
    let token = user_store.create_auth_token(&user.id)?;

    let response_body = serde_json::to_string(&LoginSuccessResponse {
        token: token.0.clone(),
    })
    .map_err(anyhow::Error::from)?;
    let cookie_value =
        HeaderValue::from_str(&format!("session_token={}; Path=/; HttpOnly", token.0))
            .map_err(anyhow::Error::from)?;
    let response = Response::builder()
        .status(StatusCode::CREATED)
        .header(header::SET_COOKIE, cookie_value)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(response_body))
        .map_err(anyhow::Error::from)?;
    Ok(response)
}

async fn logout(
    State(user_store): State<GuardedUserStore>,
    session: Session,
) -> Result<Response, ApiError> {
    user_store.delete_auth_token(&session.token)?;
    let cookie_value = Cookie::build(Cookie::new("session_token", ""))
        .path("/")
        .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1)) // Expire it in the past
        .same_site(SameSite::Lax)
        .build();
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::SET_COOKIE, cookie_value.to_string())
        .body(Body::empty())
        .map_err(anyhow::Error::from)?;
    Ok(response)
}

// =============================================================================
// Landing page search
// =============================================================================

#[derive(Deserialize)]
struct SearchBody {
    query: Option<String>,
    /// Maximum number of search results to return (default: 30)
    limit: Option<usize>,
}

#[derive(Serialize)]
struct RecentReview {
    review: Document,
    album_title: Option<String>,
}

#[derive(Serialize)]
struct LandingResponse {
    recent_reviews: Vec<RecentReview>,
    search_results: Option<Vec<SearchResult>>,
    invalid_query: bool,
}

async fn search(
    _session: Session,
    State(state): State<ServerState>,
    Json(body): Json<SearchBody>,
) -> Result<Json<LandingResponse>, ApiError> {
    let recent_reviews = state
        .library_store
        .recent_reviews(state.config.recent_reviews_limit)?
        .into_iter()
        .map(|review| {
            let album_title = state
                .library_store
                .get_album(&review.album_id)
                .ok()
                .flatten()
                .map(|album| album.title);
            RecentReview {
                review,
                album_title,
            }
        })
        .collect();

    let limit = body.limit.unwrap_or(30).min(100);
    let (search_results, invalid_query) = match body
        .query
        .as_deref()
        .map(str::trim)
        .filter(|query| !query.is_empty())
    {
        None => (None, false),
        Some(query) => match music_search(state.search_vault.as_ref(), query, limit) {
            Some(results) => (Some(results), false),
            None => (None, true),
        },
    };

    Ok(Json(LandingResponse {
        recent_reviews,
        search_results,
        invalid_query,
    }))
}

#[derive(Deserialize)]
struct AutocompleteQuery {
    #[serde(default)]
    q: String,
}

/// Plain text `name|key` lines, one per match.
async fn autocomplete(
    _session: Session,
    State(search_vault): State<GuardedSearchVault>,
    Path(kind): Path<String>,
    Query(params): Query<AutocompleteQuery>,
) -> Result<Response, ApiError> {
    let kind = EntityKind::from_str_name(&kind).ok_or(ApiError::NotFound("autocomplete kind"))?;
    let results = partial_entity_search(search_vault.as_ref(), &params.q, kind);
    let body = results
        .iter()
        .map(|result| format!("{}|{}", result.matched_text, result.entity_id))
        .collect::<Vec<_>>()
        .join("\n");
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response())
}

// =============================================================================
// Library views
// =============================================================================

#[derive(Serialize)]
struct ArtistResponse {
    artist: Artist,
    albums: Vec<Album>,
}

async fn get_artist(
    _session: Session,
    State(library_store): State<GuardedLibraryStore>,
    Path(name): Path<String>,
) -> Result<Json<ArtistResponse>, ApiError> {
    let artist = library_store
        .get_artist_by_name(&name)?
        .ok_or(ApiError::NotFound("artist"))?;
    let albums = library_store.albums_by_artist(&artist.id)?;
    Ok(Json(ArtistResponse { artist, albums }))
}

#[derive(Serialize)]
struct AlbumResponse {
    album: Album,
    tracks: Vec<Track>,
    reviews: Vec<Document>,
    comments: Vec<Document>,
}

async fn get_album(
    session: Session,
    State(library_store): State<GuardedLibraryStore>,
    Path(id): Path<String>,
) -> Result<Json<AlbumResponse>, ApiError> {
    let album = library_store
        .get_album(&id)?
        .ok_or(ApiError::NotFound("album"))?;
    let tracks = library_store.tracks_for_album(&id)?;
    // Hidden documents stay visible to moderators
    let include_hidden = session.has_permission(Permission::ModerateReviews);
    let reviews = library_store.documents_for_album(&id, DocKind::Review, include_hidden)?;
    let comments = library_store.documents_for_album(&id, DocKind::Comment, include_hidden)?;
    Ok(Json(AlbumResponse {
        album,
        tracks,
        reviews,
        comments,
    }))
}

#[derive(Deserialize)]
struct AlbumsQuery {
    offset: Option<usize>,
    limit: Option<usize>,
    category: Option<AlbumCategory>,
}

#[derive(Serialize)]
struct AlbumsResponse {
    albums: Vec<Album>,
    total: usize,
    offset: usize,
    limit: usize,
}

async fn list_albums(
    _session: Session,
    State(library_store): State<GuardedLibraryStore>,
    Query(params): Query<AlbumsQuery>,
) -> Result<Json<AlbumsResponse>, ApiError> {
    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(25).clamp(1, 100);
    let (albums, total) = library_store.list_albums(offset, limit, params.category)?;
    Ok(Json(AlbumsResponse {
        albums,
        total,
        offset,
        limit,
    }))
}

async fn put_album(
    session: Session,
    State(library_store): State<GuardedLibraryStore>,
    Path(id): Path<String>,
    Json(edit): Json<AlbumEdit>,
) -> Result<Json<Album>, ApiError> {
    if !session.has_permission(Permission::EditLibrary) {
        return Err(ApiError::Forbidden);
    }
    if !library_store.update_album(&id, &edit)? {
        return Err(ApiError::NotFound("album"));
    }
    let album = library_store
        .get_album(&id)?
        .ok_or(ApiError::NotFound("album"))?;
    Ok(Json(album))
}

#[derive(Deserialize)]
struct TagsBody {
    #[serde(default)]
    add: Vec<String>,
    #[serde(default)]
    remove: Vec<String>,
}

#[derive(Serialize)]
struct TagsResponse {
    tags: Vec<String>,
}

async fn put_track_tags(
    session: Session,
    State(library_store): State<GuardedLibraryStore>,
    Path(id): Path<String>,
    Json(body): Json<TagsBody>,
) -> Result<Json<TagsResponse>, ApiError> {
    if !session.has_permission(Permission::EditLibrary) {
        return Err(ApiError::Forbidden);
    }
    let tags = library_store
        .merge_track_tags(&id, &body.add, &body.remove)?
        .ok_or(ApiError::NotFound("track"))?;
    Ok(Json(TagsResponse { tags }))
}

async fn get_image(
    _session: Session,
    State(library_store): State<GuardedLibraryStore>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let image = library_store
        .get_image(&id)?
        .ok_or(ApiError::NotFound("image"))?;
    // Stored MIME type wins, sniffing is the fallback
    let mime_type = image
        .mime_type
        .clone()
        .or_else(|| infer::get(&image.data).map(|kind| kind.mime_type().to_string()))
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime_type)
        .body(Body::from(image.data))
        .map_err(anyhow::Error::from)?;
    Ok(response)
}

// =============================================================================
// Reviews and comments
// =============================================================================

#[derive(Deserialize)]
struct DocumentBody {
    title: Option<String>,
    text: String,
    /// Free-text author, defaults to the session user's handle.
    author_name: Option<String>,
    /// When set, validate and return the sanitized text without saving.
    #[serde(default)]
    preview: bool,
}

#[derive(Serialize)]
struct PreviewResponse {
    preview: bool,
    title: Option<String>,
    text: String,
    allowed_tags: &'static [&'static str],
}

#[derive(Serialize)]
struct DocumentFormResponse {
    album_id: String,
    allowed_tags: &'static [&'static str],
}

#[derive(Deserialize)]
struct DeleteBody {
    #[serde(default)]
    confirm: bool,
}

fn resolve_author(session: &Session, author_name: &Option<String>) -> String {
    author_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| session.user.handle.clone())
}

async fn document_form(
    state: &ServerState,
    album_id: String,
) -> Result<Json<DocumentFormResponse>, ApiError> {
    if state.library_store.get_album(&album_id)?.is_none() {
        return Err(ApiError::NotFound("album"));
    }
    Ok(Json(DocumentFormResponse {
        album_id,
        allowed_tags: ALLOWED_TAGS,
    }))
}

async fn post_document(
    kind: DocKind,
    session: Session,
    state: ServerState,
    album_id: String,
    body: DocumentBody,
) -> Result<Response, ApiError> {
    if !session.has_permission(Permission::WriteReviews) {
        return Err(ApiError::Forbidden);
    }
    let author_name = resolve_author(&session, &body.author_name);
    reviews::validate_form(kind, body.title.as_deref(), &body.text, &author_name)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let sanitized = sanitize_html(&body.text);

    if body.preview {
        return Ok(Json(PreviewResponse {
            preview: true,
            title: body.title,
            text: sanitized,
            allowed_tags: ALLOWED_TAGS,
        })
        .into_response());
    }

    let doc = Document {
        id: new_entity_id(),
        album_id,
        kind,
        author_user_id: Some(session.user.id.clone()),
        author_name,
        title: match kind {
            DocKind::Review => body.title,
            DocKind::Comment => None,
        },
        text: sanitized,
        is_hidden: false,
        created: 0,
        modified: 0,
    };
    if !state.library_store.insert_document(&doc)? {
        return Err(ApiError::NotFound("album"));
    }
    let saved = state
        .library_store
        .get_document(&doc.id)?
        .ok_or_else(|| anyhow::anyhow!("document vanished after insert"))?;
    Ok((StatusCode::CREATED, Json(saved)).into_response())
}

/// Loads the document, checking it belongs to the album and is of the
/// expected kind.
fn load_document(
    state: &ServerState,
    kind: DocKind,
    album_id: &str,
    doc_id: &str,
) -> Result<Document, ApiError> {
    let doc = state
        .library_store
        .get_document(doc_id)?
        .filter(|doc| doc.album_id == album_id && doc.kind == kind)
        .ok_or(ApiError::NotFound("document"))?;
    Ok(doc)
}

async fn edit_document(
    kind: DocKind,
    session: Session,
    state: ServerState,
    album_id: String,
    doc_id: String,
    body: DocumentBody,
) -> Result<Response, ApiError> {
    let doc = load_document(&state, kind, &album_id, &doc_id)?;
    let is_author = doc.author_user_id.as_deref() == Some(session.user.id.as_str());
    if !is_author && !session.has_permission(Permission::ModerateReviews) {
        return Err(ApiError::Forbidden);
    }
    let author_name = resolve_author(&session, &body.author_name);
    reviews::validate_form(kind, body.title.as_deref(), &body.text, &author_name)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let sanitized = sanitize_html(&body.text);

    if body.preview {
        return Ok(Json(PreviewResponse {
            preview: true,
            title: body.title,
            text: sanitized,
            allowed_tags: ALLOWED_TAGS,
        })
        .into_response());
    }

    let title = match kind {
        DocKind::Review => body.title.as_deref(),
        DocKind::Comment => None,
    };
    state
        .library_store
        .update_document(&doc_id, title, &sanitized, &author_name)?;
    let updated = state
        .library_store
        .get_document(&doc_id)?
        .ok_or(ApiError::NotFound("document"))?;
    Ok(Json(updated).into_response())
}

async fn set_document_hidden(
    kind: DocKind,
    session: Session,
    state: ServerState,
    album_id: String,
    doc_id: String,
    hidden: bool,
) -> Result<Response, ApiError> {
    if !session.has_permission(Permission::ModerateReviews) {
        return Err(ApiError::Forbidden);
    }
    load_document(&state, kind, &album_id, &doc_id)?;
    state.library_store.set_document_hidden(&doc_id, hidden)?;
    Ok(StatusCode::OK.into_response())
}

async fn delete_document(
    kind: DocKind,
    session: Session,
    state: ServerState,
    album_id: String,
    doc_id: String,
    body: DeleteBody,
) -> Result<Response, ApiError> {
    if !session.has_permission(Permission::ModerateReviews) {
        return Err(ApiError::Forbidden);
    }
    if !body.confirm {
        return Err(ApiError::BadRequest(
            "deletion requires confirm: true".to_string(),
        ));
    }
    load_document(&state, kind, &album_id, &doc_id)?;
    state.library_store.delete_document(&doc_id)?;
    Ok(StatusCode::OK.into_response())
}

macro_rules! document_handlers {
    ($kind:expr, $form:ident, $post:ident, $edit:ident, $hide:ident, $unhide:ident, $delete:ident) => {
        async fn $form(
            _session: Session,
            State(state): State<ServerState>,
            Path(album_id): Path<String>,
        ) -> Result<Json<DocumentFormResponse>, ApiError> {
            document_form(&state, album_id).await
        }

        async fn $post(
            session: Session,
            State(state): State<ServerState>,
            Path(album_id): Path<String>,
            Json(body): Json<DocumentBody>,
        ) -> Result<Response, ApiError> {
            post_document($kind, session, state, album_id, body).await
        }

        async fn $edit(
            session: Session,
            State(state): State<ServerState>,
            Path((album_id, doc_id)): Path<(String, String)>,
            Json(body): Json<DocumentBody>,
        ) -> Result<Response, ApiError> {
            edit_document($kind, session, state, album_id, doc_id, body).await
        }

        async fn $hide(
            session: Session,
            State(state): State<ServerState>,
            Path((album_id, doc_id)): Path<(String, String)>,
        ) -> Result<Response, ApiError> {
            set_document_hidden($kind, session, state, album_id, doc_id, true).await
        }

        async fn $unhide(
            session: Session,
            State(state): State<ServerState>,
            Path((album_id, doc_id)): Path<(String, String)>,
        ) -> Result<Response, ApiError> {
            set_document_hidden($kind, session, state, album_id, doc_id, false).await
        }

        async fn $delete(
            session: Session,
            State(state): State<ServerState>,
            Path((album_id, doc_id)): Path<(String, String)>,
            Json(body): Json<DeleteBody>,
        ) -> Result<Response, ApiError> {
            delete_document($kind, session, state, album_id, doc_id, body).await
        }
    };
}

document_handlers!(
    DocKind::Review,
    review_form,
    post_review,
    edit_review,
    hide_review,
    unhide_review,
    delete_review
);
document_handlers!(
    DocKind::Comment,
    comment_form,
    post_comment,
    edit_comment,
    hide_comment,
    unhide_comment,
    delete_comment
);

// =============================================================================
// Crates
// =============================================================================

#[derive(Deserialize)]
struct CrateItemBody {
    kind: EntityKind,
    entity_id: String,
}

#[derive(Deserialize)]
struct ReorderBody {
    order: Vec<usize>,
}

#[derive(Serialize)]
struct CrateResponse {
    items: Vec<CrateItem>,
    order: Vec<usize>,
}

impl From<crate::crates::Crate> for CrateResponse {
    fn from(value: crate::crates::Crate) -> Self {
        CrateResponse {
            items: value.items,
            order: value.order,
        }
    }
}

/// Normalizes and persists on every full view, as the page render does.
async fn get_crate(
    session: Session,
    State(crate_store): State<GuardedCrateStore>,
) -> Result<Json<CrateResponse>, ApiError> {
    if !session.has_permission(Permission::OwnCrate) {
        return Err(ApiError::Forbidden);
    }
    let mut user_crate = crate_store.get_or_create_crate(&session.user.id)?;
    user_crate.normalize();
    crate_store.save_crate(&user_crate)?;
    Ok(Json(user_crate.into()))
}

async fn crate_add(
    session: Session,
    State(crate_store): State<GuardedCrateStore>,
    Json(body): Json<CrateItemBody>,
) -> Result<Json<CrateResponse>, ApiError> {
    if !session.has_permission(Permission::OwnCrate) {
        return Err(ApiError::Forbidden);
    }
    let mut user_crate = crate_store.get_or_create_crate(&session.user.id)?;
    let added = user_crate.add_item(CrateItem {
        kind: body.kind,
        entity_id: body.entity_id,
    });
    if added {
        crate_store.save_crate(&user_crate)?;
    }
    Ok(Json(user_crate.into()))
}

async fn crate_remove(
    session: Session,
    State(crate_store): State<GuardedCrateStore>,
    Json(body): Json<CrateItemBody>,
) -> Result<Json<CrateResponse>, ApiError> {
    if !session.has_permission(Permission::OwnCrate) {
        return Err(ApiError::Forbidden);
    }
    let mut user_crate = crate_store.get_or_create_crate(&session.user.id)?;
    let removed = user_crate.remove_item(&CrateItem {
        kind: body.kind,
        entity_id: body.entity_id,
    });
    if removed {
        crate_store.save_crate(&user_crate)?;
    }
    Ok(Json(user_crate.into()))
}

async fn crate_reorder(
    session: Session,
    State(crate_store): State<GuardedCrateStore>,
    Json(body): Json<ReorderBody>,
) -> Result<Json<CrateResponse>, ApiError> {
    if !session.has_permission(Permission::OwnCrate) {
        return Err(ApiError::Forbidden);
    }
    let mut user_crate = crate_store.get_or_create_crate(&session.user.id)?;
    user_crate
        .reorder(body.order)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    crate_store.save_crate(&user_crate)?;
    Ok(Json(user_crate.into()))
}

// =============================================================================
// Bulk artist add
// =============================================================================

#[derive(Deserialize)]
struct BulkAddConfirmBody {
    /// Newline-delimited artist names, crlf tolerated.
    names: String,
}

#[derive(Serialize)]
struct BulkAddConfirmResponse {
    candidates: Vec<String>,
}

#[derive(Deserialize)]
struct BulkAddDoBody {
    names: Vec<String>,
}

#[derive(Serialize)]
struct BulkAddDoResponse {
    created: usize,
}

/// Trims, drops blanks, dedupes and sorts.
fn parse_bulk_names(input: &str) -> Vec<String> {
    let unique: std::collections::BTreeSet<String> = input
        .split('\n')
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();
    unique.into_iter().collect()
}

/// First phase: parse and echo the candidate list, never writes.
async fn bulk_add_confirm(
    session: Session,
    Json(body): Json<BulkAddConfirmBody>,
) -> Result<Json<BulkAddConfirmResponse>, ApiError> {
    if !session.has_permission(Permission::EditLibrary) {
        return Err(ApiError::Forbidden);
    }
    Ok(Json(BulkAddConfirmResponse {
        candidates: parse_bulk_names(&body.names),
    }))
}

/// Second phase: create the confirmed names, skipping ones that exist.
async fn bulk_add_do(
    session: Session,
    State(library_store): State<GuardedLibraryStore>,
    Json(body): Json<BulkAddDoBody>,
) -> Result<Json<BulkAddDoResponse>, ApiError> {
    if !session.has_permission(Permission::EditLibrary) {
        return Err(ApiError::Forbidden);
    }
    let created = library_store.bulk_add_artists(&body.names)?;
    Ok(Json(BulkAddDoResponse { created }))
}

// =============================================================================
// Admin
// =============================================================================

#[derive(Serialize)]
struct ConfigInitResponse {
    initialized: bool,
}

async fn admin_config_init(
    session: Session,
    State(db_config): State<DbConfig>,
) -> Result<Json<ConfigInitResponse>, ApiError> {
    if !session.has_permission(Permission::ServerAdmin) {
        return Err(ApiError::Forbidden);
    }
    let initialized = db_config.init()?;
    Ok(Json(ConfigInitResponse { initialized }))
}

// =============================================================================
// Router assembly
// =============================================================================

pub fn make_app(state: ServerState) -> Router {
    let auth_routes: Router = Router::new()
        .route("/login", post(login))
        .route("/logout", get(logout))
        .with_state(state.clone());

    let library_routes: Router = Router::new()
        .route("/search", post(search))
        .route("/autocomplete/{kind}", get(autocomplete))
        .route("/artist/{name}", get(get_artist))
        .route("/artists/bulk_add/confirm", post(bulk_add_confirm))
        .route("/artists/bulk_add/do", post(bulk_add_do))
        .route("/albums", get(list_albums))
        .route("/album/{id}", get(get_album).put(put_album))
        .route("/album/{id}/review", get(review_form).post(post_review))
        .route("/album/{id}/review/{rid}", post(edit_review))
        .route("/album/{id}/review/{rid}/hide", post(hide_review))
        .route("/album/{id}/review/{rid}/unhide", post(unhide_review))
        .route("/album/{id}/review/{rid}/delete", post(delete_review))
        .route("/album/{id}/comment", get(comment_form).post(post_comment))
        .route("/album/{id}/comment/{rid}", post(edit_comment))
        .route("/album/{id}/comment/{rid}/hide", post(hide_comment))
        .route("/album/{id}/comment/{rid}/unhide", post(unhide_comment))
        .route("/album/{id}/comment/{rid}/delete", post(delete_comment))
        .route("/track/{id}/tags", put(put_track_tags))
        .route("/image/{id}", get(get_image))
        .with_state(state.clone());

    let crate_routes: Router = Router::new()
        .route("/crate", get(get_crate))
        .route("/crate/add", post(crate_add))
        .route("/crate/remove", post(crate_remove))
        .route("/crate/reorder", post(crate_reorder))
        .with_state(state.clone());

    let admin_routes: Router = Router::new()
        .route("/config/init", get(admin_config_init))
        .with_state(state.clone());

    Router::new()
        .nest("/v1/auth", auth_routes)
        .nest("/v1/admin", admin_routes)
        .nest("/v1", library_routes.merge(crate_routes))
        .layer(middleware::from_fn_with_state(state, log_requests))
}

pub async fn run_server(state: ServerState) -> Result<()> {
    let port = state.config.port;
    let app = make_app(state);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("Listening on 127.0.0.1:{}", port);
    Ok(axum::serve(listener, app).await?)
}
