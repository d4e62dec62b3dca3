//! Tests for the HTTP move source against a throwaway engine.

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uttt_rules::{Mark, MatchState, Placement, Slot};
use uttt_server::{
    ComputeBudget, GameId, HttpMoveSource, MemoryStore, MoveSource, MoveSourceError,
    SessionError, SessionManager, SessionSettings, SnapshotPolicy,
};

/// Serves `router` on a random local port and returns the move endpoint URL.
async fn spawn_engine(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Local address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Engine crashed");
    });
    format!("http://{}/api/makemove/", addr)
}

fn engine_replying(reply: Value) -> Router {
    Router::new().route(
        "/api/makemove/",
        post(move || {
            let reply = reply.clone();
            async move { Json(reply) }
        }),
    )
}

fn after_human(sub: i64, cell: i64) -> MatchState {
    MatchState::new()
        .apply(Placement::from_indices(sub, cell, Mark::Human).expect("Valid indices"))
        .expect("Legal move")
}

fn budget() -> ComputeBudget {
    ComputeBudget::new(Duration::from_secs(2), false, Duration::from_secs(2))
}

fn http_manager(url: String) -> SessionManager {
    SessionManager::new(
        Arc::new(MemoryStore::new()),
        Arc::new(HttpMoveSource::new(url, false)),
        SessionSettings::new(budget(), SnapshotPolicy::default()),
    )
}

#[tokio::test]
async fn test_request_carries_board_and_reply_is_parsed() {
    let seen: Arc<Mutex<Vec<Value>>> = Arc::default();
    let router = Router::new().route(
        "/api/makemove/",
        post({
            let seen = Arc::clone(&seen);
            move |Json(body): Json<Value>| {
                let seen = Arc::clone(&seen);
                async move {
                    seen.lock().expect("Lock").push(body);
                    Json(json!({
                        "board": 2,
                        "cell": 4,
                        "metadata": {
                            "num_gamestates": 5000,
                            "depth_explored": 6,
                            "thinking_time": 1.25,
                            "moves": [[[2, 4], 0.7]],
                            "early_stop": false
                        }
                    }))
                }
            }
        }),
    );
    let source = HttpMoveSource::new(spawn_engine(router).await, false);

    let reply = source
        .request_move(&GameId::new("game-1"), &after_human(4, 2), budget())
        .await
        .expect("Engine reply");

    assert_eq!((reply.board, reply.cell), (2, 4));
    assert_eq!(reply.metadata.depth_explored, 6);
    assert_eq!(reply.metadata.early_stop, Some(false));

    let requests = seen.lock().expect("Lock");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["game_id"], "game-1");
    assert_eq!(requests[0]["last_move"], json!([4, 2, "X"]));
    assert_eq!(requests[0]["game_board"][4][2], "X");
    assert_eq!(requests[0]["compute_time"], 2.0);
}

#[tokio::test]
async fn test_legacy_body_is_a_json_string() {
    let router = Router::new().route(
        "/api/makemove/",
        post(|Json(body): Json<String>| async move {
            let inner: Value = serde_json::from_str(&body).expect("Inner JSON");
            let board = inner["last_move"][1].as_i64().expect("Cell of last move");
            Json(json!({ "board": board, "cell": 0, "metadata": {} }))
        }),
    );
    let source = HttpMoveSource::new(spawn_engine(router).await, true);

    let reply = source
        .request_move(&GameId::new("g"), &after_human(0, 7), budget())
        .await
        .expect("Engine reply");
    assert_eq!((reply.board, reply.cell), (7, 0));
}

#[tokio::test]
async fn test_malformed_reply() {
    let router = Router::new().route("/api/makemove/", post(|| async { "definitely not json" }));
    let source = HttpMoveSource::new(spawn_engine(router).await, false);

    let err = source
        .request_move(&GameId::new("g"), &after_human(4, 4), budget())
        .await
        .expect_err("Malformed");
    assert!(matches!(err, MoveSourceError::Malformed(_)));
}

#[tokio::test]
async fn test_error_status() {
    let router = Router::new().route(
        "/api/makemove/",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "engine crashed") }),
    );
    let source = HttpMoveSource::new(spawn_engine(router).await, false);

    let err = source
        .request_move(&GameId::new("g"), &after_human(4, 4), budget())
        .await
        .expect_err("Server error");
    assert_eq!(
        err,
        MoveSourceError::Status {
            code: 500,
            body: "engine crashed".to_string()
        }
    );
}

#[tokio::test]
async fn test_unreachable_engine() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Local address");
    drop(listener);

    let source = HttpMoveSource::new(format!("http://{}/api/makemove/", addr), false);
    let err = source
        .request_move(&GameId::new("g"), &after_human(4, 4), budget())
        .await
        .expect_err("Nothing listening");
    assert!(matches!(err, MoveSourceError::Transport(_)));
}

#[tokio::test]
async fn test_out_of_range_reply_through_session() {
    let url = spawn_engine(engine_replying(json!({ "board": 4, "cell": 9 }))).await;
    let manager = http_manager(url);
    let session = manager.create(None).expect("Create");

    let err = session
        .play(Slot::TOP_LEFT, Slot::CENTER)
        .await
        .expect_err("Out of range");
    assert!(matches!(
        err,
        SessionError::MoveSource(MoveSourceError::OutOfRange { board: 4, cell: 9 })
    ));
    assert_eq!(session.moves().await.expect("Moves").len(), 1);
}

#[tokio::test]
async fn test_illegal_reply_through_session() {
    // The human's own cell is occupied.
    let url = spawn_engine(engine_replying(json!({ "board": 4, "cell": 4 }))).await;
    let manager = http_manager(url);
    let session = manager.create(None).expect("Create");

    let err = session
        .play(Slot::CENTER, Slot::CENTER)
        .await
        .expect_err("Illegal");
    assert!(matches!(
        err,
        SessionError::MoveSource(MoveSourceError::IllegalReply { .. })
    ));
    assert_eq!(session.moves().await.expect("Moves").len(), 1);
}

#[tokio::test]
async fn test_legal_reply_through_session() {
    let url = spawn_engine(engine_replying(json!({ "board": 4, "cell": 0 }))).await;
    let manager = http_manager(url);
    let session = manager.create(None).expect("Create");

    session
        .play(Slot::CENTER, Slot::CENTER)
        .await
        .expect("Both moves recorded");
    let moves = session.moves().await.expect("Moves");
    assert_eq!(moves.len(), 2);
    assert_eq!(moves[1].cell(), Slot::TOP_LEFT);
}
