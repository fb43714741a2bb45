mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;

async fn add(app: &TestApp, token: &str, kind: &str, entity_id: &str) -> serde_json::Value {
    let (status, body) = app
        .post(
            "/v1/crate/add",
            Some(token),
            json!({"kind": kind, "entity_id": entity_id}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    body
}

#[tokio::test]
async fn empty_crate_is_created_on_first_view() {
    let app = TestApp::new();
    let token = app.dj_token().await;

    let (status, body) = app.get("/v1/crate", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"], json!([]));
    assert_eq!(body["order"], json!([]));
}

#[tokio::test]
async fn added_items_get_increasing_positions() {
    let app = TestApp::new();
    let token = app.dj_token().await;

    add(&app, &token, "album", ALBUM_1_ID).await;
    add(&app, &token, "track", TRACK_1_ID).await;
    let body = add(&app, &token, "album", ALBUM_2_ID).await;

    assert_eq!(body["order"], json!([1, 2, 3]));
    assert_eq!(body["items"][2]["entity_id"], ALBUM_2_ID);
}

#[tokio::test]
async fn duplicate_add_is_ignored() {
    let app = TestApp::new();
    let token = app.dj_token().await;

    add(&app, &token, "album", ALBUM_1_ID).await;
    let body = add(&app, &token, "album", ALBUM_1_ID).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["order"], json!([1]));
}

#[tokio::test]
async fn removal_closes_the_position_gap() {
    let app = TestApp::new();
    let token = app.dj_token().await;

    add(&app, &token, "album", ALBUM_1_ID).await;
    add(&app, &token, "track", TRACK_1_ID).await;
    add(&app, &token, "album", ALBUM_2_ID).await;

    let (status, body) = app
        .post(
            "/v1/crate/remove",
            Some(&token),
            json!({"kind": "track", "entity_id": TRACK_1_ID}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    // Positions above the removed one shift down
    assert_eq!(body["order"], json!([1, 2]));
}

#[tokio::test]
async fn reorder_applies_a_permutation() {
    let app = TestApp::new();
    let token = app.dj_token().await;

    add(&app, &token, "album", ALBUM_1_ID).await;
    add(&app, &token, "track", TRACK_1_ID).await;
    add(&app, &token, "album", ALBUM_2_ID).await;

    let (status, body) = app
        .post("/v1/crate/reorder", Some(&token), json!({"order": [3, 1, 2]}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"], json!([3, 1, 2]));

    // A full view normalizes: items come back sorted by position
    let (status, body) = app.get("/v1/crate", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"], json!([1, 2, 3]));
    assert_eq!(body["items"][0]["entity_id"], TRACK_1_ID);
    assert_eq!(body["items"][1]["entity_id"], ALBUM_2_ID);
    assert_eq!(body["items"][2]["entity_id"], ALBUM_1_ID);
}

#[tokio::test]
async fn invalid_reorder_is_rejected_and_leaves_the_crate_alone() {
    let app = TestApp::new();
    let token = app.dj_token().await;

    add(&app, &token, "album", ALBUM_1_ID).await;
    add(&app, &token, "track", TRACK_1_ID).await;

    for bad_order in [json!([1]), json!([1, 1]), json!([1, 3]), json!([0, 1])] {
        let (status, body) = app
            .post("/v1/crate/reorder", Some(&token), json!({"order": bad_order}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "order {}", bad_order);
        assert_eq!(body["success"], false);
    }

    let (_, body) = app.get("/v1/crate", Some(&token)).await;
    assert_eq!(body["order"], json!([1, 2]));
    assert_eq!(body["items"][0]["entity_id"], ALBUM_1_ID);
}

#[tokio::test]
async fn crates_are_per_user() {
    let app = TestApp::new();
    let dj = app.dj_token().await;
    let md = app.md_token().await;

    add(&app, &dj, "album", ALBUM_1_ID).await;

    let (status, body) = app.get("/v1/crate", Some(&md)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"], json!([]));
}
