use std::sync::Arc;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

mod common;

use common::TestApp;

const TOKEN: &str = "session-a";

async fn open(app: &TestApp, token: &str, source: &str) -> (StatusCode, Value) {
    app.request(
        Method::POST,
        "/api/trainer/session",
        Some(token),
        Some(json!({ "source": source })),
    )
    .await
}

async fn judge(app: &TestApp, judgment: &str) -> (StatusCode, Value) {
    app.request(
        Method::POST,
        "/api/trainer/judge",
        Some(TOKEN),
        Some(json!({ "judgment": judgment })),
    )
    .await
}

async fn post(app: &TestApp, uri: &str) -> (StatusCode, Value) {
    app.request(Method::POST, uri, Some(TOKEN), None).await
}

#[tokio::test]
async fn test_open_presents_first_word() {
    let app = TestApp::new();
    app.write_source("words.txt", 20);

    let (status, body) = open(&app, TOKEN, "words.txt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["source"], "words.txt");
    assert_eq!(body["data"]["current"]["word"], "w0");
    assert_eq!(body["data"]["current"]["history"], "");
    assert_eq!(body["data"]["next"]["word"], "w1");
    assert_eq!(body["data"]["status"]["pending"], 19);
    assert_eq!(body["data"]["status"]["baseLow"], 10);
    assert_eq!(body["data"]["status"]["baseMedium"], 15);
    assert_eq!(body["data"]["canUndo"], false);
    assert_eq!(body["data"]["completed"], false);
}

#[tokio::test]
async fn test_open_missing_source() {
    let app = TestApp::new();
    let (status, body) = open(&app, TOKEN, "missing.txt").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "SOURCE_UNREADABLE");

    let (status, body) = open(&app, TOKEN, "../secret.txt").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "SOURCE_UNREADABLE");
}

#[tokio::test]
async fn test_judge_and_single_step_undo() {
    let app = TestApp::new();
    app.write_source("words.txt", 20);
    open(&app, TOKEN, "words.txt").await;

    let (status, body) = judge(&app, "u").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["placement"]["kind"], "reinserted");
    assert_eq!(body["data"]["placement"]["index"], 9);
    assert_eq!(body["data"]["word"]["history"], "U");
    assert_eq!(body["data"]["current"]["word"], "w1");
    assert_eq!(body["data"]["canUndo"], true);

    let (status, body) = post(&app, "/api/trainer/undo").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["current"]["word"], "w0");
    assert_eq!(body["data"]["current"]["history"], "");
    assert_eq!(body["data"]["next"]["word"], "w1");
    assert_eq!(body["data"]["status"]["pending"], 19);
    assert_eq!(body["data"]["canUndo"], false);

    let (status, body) = post(&app, "/api/trainer/undo").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "NOTHING_TO_UNDO");
}

#[tokio::test]
async fn test_judge_rejects_bad_input() {
    let app = TestApp::new();
    app.write_source("words.txt", 5);
    open(&app, TOKEN, "words.txt").await;

    let (status, body) = judge(&app, "maybe").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = app
        .request(
            Method::POST,
            "/api/trainer/judge",
            Some(TOKEN),
            Some(json!({ "verdict": "k" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = judge(&app, "Known").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_next_does_not_skip_unresolved_word() {
    let app = TestApp::new();
    app.write_source("words.txt", 5);
    open(&app, TOKEN, "words.txt").await;

    let (status, body) = post(&app, "/api/trainer/next").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["current"]["word"], "w0");
    assert_eq!(body["data"]["status"]["pending"], 4);
}

#[tokio::test]
async fn test_update_params() {
    let app = TestApp::new();
    app.write_source("words.txt", 20);
    open(&app, TOKEN, "words.txt").await;

    for params in [
        json!({ "baseLow": 0, "baseMedium": 5 }),
        json!({ "baseLow": 5, "baseMedium": 101 }),
        json!({ "baseLow": -1, "baseMedium": 5 }),
        json!({ "baseLow": 5 }),
    ] {
        let (status, body) = app
            .request(Method::PUT, "/api/trainer/params", Some(TOKEN), Some(params))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    let (_, body) = app.request(Method::GET, "/api/trainer", Some(TOKEN), None).await;
    assert_eq!(body["data"]["status"]["baseLow"], 10);

    let (status, body) = app
        .request(
            Method::PUT,
            "/api/trainer/params",
            Some(TOKEN),
            Some(json!({ "baseLow": 2, "baseMedium": 3 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"]["baseLow"], 2);
    assert_eq!(body["data"]["status"]["baseMedium"], 3);

    let (_, body) = judge(&app, "s").await;
    assert_eq!(body["data"]["placement"]["index"], 2);
}

#[tokio::test]
async fn test_add_word() {
    let app = TestApp::new();
    app.write_source("words.txt", 20);
    open(&app, TOKEN, "words.txt").await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/trainer/words",
            Some(TOKEN),
            Some(json!({ "word": "zeal", "definition": "great energy" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["word"]["word"], "zeal");
    assert_eq!(body["data"]["word"]["history"], "U");
    assert_eq!(body["data"]["placement"]["index"], 9);
    assert_eq!(body["data"]["status"]["pending"], 20);
    assert!(body["message"].as_str().unwrap().contains("第 10 位"));

    let (status, body) = app
        .request(
            Method::POST,
            "/api/trainer/words",
            Some(TOKEN),
            Some(json!({ "word": "  ", "definition": "blank" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_edit_current_word() {
    let app = TestApp::new();
    app.write_source("words.txt", 3);
    open(&app, TOKEN, "words.txt").await;
    judge(&app, "s").await;

    let (status, body) = app
        .request(
            Method::PUT,
            "/api/trainer/current",
            Some(TOKEN),
            Some(json!({ "word": "W1", "definition": "fixed" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["current"]["word"], "W1");
    assert_eq!(body["data"]["current"]["definition"], "fixed");
    // editing is not a resolution
    assert_eq!(body["data"]["canUndo"], true);
}

#[tokio::test]
async fn test_promote_and_undo() {
    let app = TestApp::new();
    app.write_source("words.txt", 5);
    open(&app, TOKEN, "words.txt").await;

    let (status, body) = post(&app, "/api/trainer/promote").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["placement"]["kind"], "graduated");
    assert_eq!(body["data"]["word"]["graduated"], true);
    assert_eq!(body["data"]["status"]["graduated"], 1);
    assert_eq!(body["data"]["current"]["word"], "w1");

    let (_, body) = post(&app, "/api/trainer/undo").await;
    assert_eq!(body["data"]["current"]["word"], "w0");
    assert_eq!(body["data"]["current"]["graduated"], false);
    assert_eq!(body["data"]["status"]["graduated"], 0);
    assert_eq!(body["data"]["status"]["pending"], 4);
}

#[tokio::test]
async fn test_completed_queue() {
    let app = TestApp::new();
    app.write_source("words.txt", 1);
    open(&app, TOKEN, "words.txt").await;

    let (status, body) = judge(&app, "k").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["completed"], true);
    assert!(body["data"]["current"].is_null());
    assert_eq!(body["data"]["status"]["graduated"], 1);

    let (status, body) = judge(&app, "k").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "NO_CURRENT_WORD");

    let (status, body) = post(&app, "/api/trainer/promote").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "NO_CURRENT_WORD");

    let (status, body) = post(&app, "/api/trainer/next").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["completed"], true);
}

#[tokio::test]
async fn test_reset_discards_progress() {
    let app = TestApp::new();
    app.write_source("words.txt", 6);
    open(&app, TOKEN, "words.txt").await;
    judge(&app, "k").await;
    judge(&app, "k").await;
    app.request(
        Method::PUT,
        "/api/trainer/params",
        Some(TOKEN),
        Some(json!({ "baseLow": 2, "baseMedium": 3 })),
    )
    .await;

    let (status, body) = post(&app, "/api/trainer/reset").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"]["graduated"], 0);
    assert_eq!(body["data"]["status"]["pending"], 5);
    assert_eq!(body["data"]["status"]["baseLow"], 10);
    assert_eq!(body["data"]["current"]["word"], "w0");
    assert_eq!(body["data"]["canUndo"], false);
}

#[tokio::test]
async fn test_progress_restored_after_logout() {
    let app = TestApp::new();
    app.write_source("words.txt", 6);
    open(&app, TOKEN, "words.txt").await;
    judge(&app, "k").await;
    judge(&app, "u").await;

    let (status, _) = app
        .request(Method::DELETE, "/api/trainer/session", Some(TOKEN), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.progress_path(TOKEN, "words.txt").exists());

    let (status, body) = app
        .request(Method::DELETE, "/api/trainer/session", Some(TOKEN), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "SESSION_NOT_FOUND");

    let (_, body) = open(&app, TOKEN, "words.txt").await;
    assert_eq!(body["data"]["status"]["graduated"], 1);
    assert_eq!(body["data"]["current"]["word"], "w2");
    assert_eq!(body["data"]["canUndo"], true);

    let (_, body) = post(&app, "/api/trainer/undo").await;
    assert_eq!(body["data"]["current"]["word"], "w1");
}

#[tokio::test]
async fn test_changed_source_starts_over() {
    let app = TestApp::new();
    app.write_source("words.txt", 6);
    open(&app, TOKEN, "words.txt").await;
    judge(&app, "k").await;
    app.request(Method::DELETE, "/api/trainer/session", Some(TOKEN), None)
        .await;

    app.write_source("words.txt", 8);
    let (status, body) = open(&app, TOKEN, "words.txt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"]["graduated"], 0);
    assert_eq!(body["data"]["status"]["pending"], 7);
    assert!(body["message"].as_str().unwrap().contains("已更改"));
}

#[tokio::test]
async fn test_corrupt_progress_starts_over() {
    let app = TestApp::new();
    app.write_source("words.txt", 4);
    let progress = app.progress_path(TOKEN, "words.txt");
    std::fs::create_dir_all(progress.parent().unwrap()).unwrap();
    std::fs::write(&progress, "{ not json").unwrap();

    let (status, body) = open(&app, TOKEN, "words.txt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"]["pending"], 3);
    assert!(body["message"].as_str().unwrap().contains("损坏"));
}

#[tokio::test]
async fn test_sessions_are_isolated_per_token() {
    let app = TestApp::new();
    app.write_source("a.txt", 5);
    app.write_source("b.txt", 3);
    open(&app, TOKEN, "a.txt").await;
    open(&app, "session-b", "b.txt").await;

    judge(&app, "k").await;

    let (_, body) = app
        .request(Method::GET, "/api/trainer", Some("session-b"), None)
        .await;
    assert_eq!(body["data"]["source"], "b.txt");
    assert_eq!(body["data"]["status"]["graduated"], 0);
}

#[tokio::test]
async fn test_delete_source_tears_down_sessions() {
    let app = TestApp::new();
    app.write_source("words.txt", 4);
    open(&app, TOKEN, "words.txt").await;
    judge(&app, "k").await;
    open(&app, "session-b", "words.txt").await;
    app.request(Method::DELETE, "/api/trainer/session", Some("session-b"), None)
        .await;

    let (status, body) = app
        .request(Method::DELETE, "/api/sources/words.txt", Some(TOKEN), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["closedSessions"], 1);
    assert!(!app.data_dir.path().join("words.txt").exists());
    assert!(!app.progress_path(TOKEN, "words.txt").exists());
    assert!(!app.progress_path("session-b", "words.txt").exists());

    let (status, body) = app.request(Method::GET, "/api/trainer", Some(TOKEN), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "SESSION_NOT_FOUND");

    let (status, body) = app
        .request(Method::DELETE, "/api/sources/words.txt", Some(TOKEN), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "SOURCE_UNREADABLE");
}

#[tokio::test]
async fn test_concurrent_judgments_are_serialized() {
    let app = Arc::new(TestApp::new());
    app.write_source("words.txt", 30);
    open(&app, TOKEN, "words.txt").await;

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let app = Arc::clone(&app);
            tokio::spawn(async move { judge(&app, "k").await.0 })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    let (_, body) = app.request(Method::GET, "/api/trainer", Some(TOKEN), None).await;
    assert_eq!(body["data"]["status"]["graduated"], 10);
    assert_eq!(body["data"]["status"]["pending"], 19);
    assert_eq!(body["data"]["current"]["word"], "w10");
}

#[tokio::test]
async fn test_progress_is_kept_per_identity() {
    let app = TestApp::new();
    app.write_source("words.txt", 5);
    open(&app, "alice", "words.txt").await;
    app.request(
        Method::POST,
        "/api/trainer/judge",
        Some("alice"),
        Some(json!({ "judgment": "k" })),
    )
    .await;

    let (_, body) = open(&app, "bob", "words.txt").await;
    assert_eq!(body["data"]["status"]["graduated"], 0);

    for token in ["alice", "bob"] {
        let (status, _) = app
            .request(Method::DELETE, "/api/trainer/session", Some(token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = open(&app, "alice", "words.txt").await;
    assert_eq!(body["data"]["status"]["graduated"], 1);
    assert_eq!(body["data"]["current"]["word"], "w1");
}

#[tokio::test]
async fn test_sources_sharing_a_stem_keep_separate_progress() {
    let app = TestApp::new();
    app.write_source("words.txt", 4);
    app.write_source("words.csv", 4);
    app.write_source("words", 4);

    open(&app, TOKEN, "words.txt").await;
    judge(&app, "k").await;
    open(&app, TOKEN, "words.csv").await;
    judge(&app, "k").await;
    judge(&app, "k").await;
    let (_, body) = open(&app, TOKEN, "words").await;
    assert_eq!(body["data"]["status"]["graduated"], 0);

    let (_, body) = open(&app, TOKEN, "words.txt").await;
    assert_eq!(body["data"]["status"]["graduated"], 1);
    let (_, body) = open(&app, TOKEN, "words.csv").await;
    assert_eq!(body["data"]["status"]["graduated"], 2);
}

#[tokio::test]
async fn test_failed_open_keeps_current_session() {
    let app = TestApp::new();
    app.write_source("words.txt", 4);
    open(&app, TOKEN, "words.txt").await;
    judge(&app, "k").await;

    let (status, body) = open(&app, TOKEN, "wrods.txt").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "SOURCE_UNREADABLE");

    let (status, body) = app.request(Method::GET, "/api/trainer", Some(TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["source"], "words.txt");
    assert_eq!(body["data"]["status"]["graduated"], 1);
}

#[tokio::test]
async fn test_unreadable_progress_is_an_internal_error() {
    let app = TestApp::new();
    app.write_source("words.txt", 4);
    std::fs::create_dir_all(app.progress_path(TOKEN, "words.txt")).unwrap();

    let (status, body) = open(&app, TOKEN, "words.txt").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "INTERNAL_ERROR");
    assert_eq!(body["error"], "服务器内部错误");
}

#[tokio::test]
async fn test_delete_source_that_is_a_directory() {
    let app = TestApp::new();
    std::fs::create_dir(app.data_dir.path().join("folder.txt")).unwrap();

    let (status, body) = app
        .request(Method::DELETE, "/api/sources/folder.txt", Some(TOKEN), None)
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "INTERNAL_ERROR");
}
