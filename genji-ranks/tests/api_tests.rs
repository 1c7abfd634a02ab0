//! Integration tests for genji-ranks API endpoints
//!
//! Tests cover:
//! - Health and build info
//! - Rank preview and sync
//! - Map submission, read-back, rating and archiving
//! - Error mapping to status codes
//! - Newsfeed stream

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use genji_common::db::init_memory_database;
use genji_common::events::{EventBus, GenjiEvent};
use genji_common::RankTable;
use genji_ranks::membership::InMemoryMembership;
use genji_ranks::ranks::{LadderRole, RankService, RoleLadder, RoleLadders};
use genji_ranks::{build_router, AppState};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot` method

struct TestApp {
    app: Router,
    db: SqlitePool,
    membership: Arc<InMemoryMembership>,
    events: EventBus,
}

fn ladder(base: u64, suffix: &str) -> RoleLadder {
    let names = ["Ninja", "Jumper", "Skilled", "Pro", "Master", "Grandmaster", "God"];
    RoleLadder::new(
        names
            .iter()
            .enumerate()
            .map(|(i, name)| LadderRole {
                id: base + i as u64,
                name: format!("{}{}", name, suffix),
            })
            .collect(),
    )
}

/// Test helper: in-memory database, in-memory membership, default ladders
async fn setup_app() -> TestApp {
    let db = init_memory_database().await.unwrap();
    let membership = Arc::new(InMemoryMembership::new());
    let events = EventBus::new(64);

    let ranks = RankService::new(
        db.clone(),
        RankTable::default(),
        RoleLadders {
            ranks: ladder(1000, ""),
            ranks_plus: ladder(2000, " +"),
        },
        membership.clone(),
        events.clone(),
    );

    for (id, name) in [(7_i64, "creator"), (1, "runner")] {
        sqlx::query("INSERT INTO users (user_id, nickname) VALUES (?, ?)")
            .bind(id)
            .bind(name)
            .execute(&db)
            .await
            .unwrap();
    }

    TestApp {
        app: build_router(AppState::new(ranks, events.clone())),
        db,
        membership,
        events,
    }
}

fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

fn submission(code: &str) -> Value {
    json!({
        "creator": 7,
        "map_code": code,
        "map_name": "Temple",
        "checkpoints": 15,
        "map_types": ["Classic"],
        "mechanics": ["Bhop"],
        "guides": ["https://youtu.be/guide", ""],
        "difficulty": "Medium +",
    })
}

/// Ten official Easy maps completed by player 1
async fn seed_easy_completions(db: &SqlitePool) {
    for i in 0..10 {
        let code = format!("EASY{}", i);
        sqlx::query("INSERT INTO maps (map_code, map_name, checkpoints, official) VALUES (?, ?, 3, 1)")
            .bind(&code)
            .bind(&code)
            .execute(db)
            .await
            .unwrap();
        sqlx::query("INSERT INTO map_ratings (map_code, user_id, difficulty) VALUES (?, 7, 1.5)")
            .bind(&code)
            .execute(db)
            .await
            .unwrap();
        sqlx::query("INSERT INTO records (user_id, map_code, time) VALUES (1, ?, 42.0)")
            .bind(&code)
            .execute(db)
            .await
            .unwrap();
    }
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let t = setup_app().await;

    let response = t.app.oneshot(test_request("GET", "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "genji-ranks");
}

#[tokio::test]
async fn test_build_info() {
    let t = setup_app().await;

    let response = t
        .app
        .oneshot(test_request("GET", "/api/buildinfo"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert!(body["git_hash"].is_string());
}

// =============================================================================
// Ranks
// =============================================================================

#[tokio::test]
async fn test_rank_preview() {
    let t = setup_app().await;
    seed_easy_completions(&t.db).await;

    let response = t
        .app
        .oneshot(test_request("GET", "/api/players/1/ranks"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["ranks"]["rank"], 1);
    assert_eq!(body["ranks"]["rank_plus"], 0);
    assert_eq!(body["cached"]["rank"], 0);
    assert_eq!(body["completions"]["Easy"]["completions"], 10);
}

#[tokio::test]
async fn test_rank_preview_unknown_player() {
    let t = setup_app().await;

    let response = t
        .app
        .oneshot(test_request("GET", "/api/players/404/ranks"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_sync_updates_roles() {
    let t = setup_app().await;
    seed_easy_completions(&t.db).await;
    t.membership.add_member(1, []).await;

    let response = t
        .app
        .clone()
        .oneshot(test_request("POST", "/api/players/1/ranks/sync"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["outcome"], "updated");
    assert_eq!(body["added"][0]["name"], "Jumper");
    assert_eq!(body["notification"]["status"], "sent");
    assert_eq!(t.membership.roles_of(1).await.unwrap(), vec![1001]);

    let response = t
        .app
        .oneshot(test_request("POST", "/api/players/1/ranks/sync"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["outcome"], "unchanged");
}

#[tokio::test]
async fn test_sync_non_member() {
    let t = setup_app().await;

    let response = t
        .app
        .oneshot(test_request("POST", "/api/players/1/ranks/sync"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["outcome"], "not_member");
}

#[tokio::test]
async fn test_sync_role_failure_is_server_error() {
    let t = setup_app().await;
    seed_easy_completions(&t.db).await;
    t.membership.add_member(1, []).await;
    t.membership.fail_role_updates(true).await;

    let response = t
        .app
        .oneshot(test_request("POST", "/api/players/1/ranks/sync"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "MEMBERSHIP_ERROR");
}

// =============================================================================
// Maps
// =============================================================================

#[tokio::test]
async fn test_submit_map() {
    let t = setup_app().await;
    let mut rx = t.events.subscribe();

    let response = t
        .app
        .clone()
        .oneshot(json_request("POST", "/api/maps", submission("abc12")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["map_code"], "ABC12");
    assert_eq!(body["official"], false);
    assert_eq!(body["guides_written"], 1);
    assert_eq!(body["medals_written"], false);
    assert_eq!(body["resync"], json!([]));

    assert!(matches!(
        rx.try_recv().unwrap(),
        GenjiEvent::MapSubmitted { .. }
    ));

    let response = t
        .app
        .oneshot(test_request("GET", "/api/players/7/submissions/latest"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert!(body["last_submission"].is_string());
}

#[tokio::test]
async fn test_submit_privileged_map() {
    let t = setup_app().await;
    let mut body = submission("STAFF");
    body["privileged"] = json!(true);
    body["medals"] = json!({"gold": 30.0, "silver": 45.0, "bronze": 60.0});

    let response = t
        .app
        .clone()
        .oneshot(json_request("POST", "/api/maps", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["official"], true);
    assert_eq!(body["medals_written"], true);
    assert_eq!(body["cooldown_recorded"], false);

    let response = t
        .app
        .oneshot(test_request("GET", "/api/players/7/submissions/latest"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert!(body["last_submission"].is_null());
}

#[tokio::test]
async fn test_submit_invalid_map() {
    let t = setup_app().await;

    let mut missing_types = submission("BAD1");
    missing_types["map_types"] = json!([]);
    let mut bad_grade = submission("BAD2");
    bad_grade["difficulty"] = json!("Impossible");
    let mut negative_checkpoints = submission("BAD3");
    negative_checkpoints["checkpoints"] = json!(-4);

    for body in [missing_types, bad_grade, negative_checkpoints] {
        let response = t
            .app
            .clone()
            .oneshot(json_request("POST", "/api/maps", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = extract_json(response.into_body()).await;
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    let maps: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM maps")
        .fetch_one(&t.db)
        .await
        .unwrap();
    assert_eq!(maps, 0);
}

#[tokio::test]
async fn test_submit_duplicate_map_conflicts() {
    let t = setup_app().await;

    let first = t
        .app
        .clone()
        .oneshot(json_request("POST", "/api/maps", submission("DUP01")))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = t
        .app
        .oneshot(json_request("POST", "/api/maps", submission("DUP01")))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_get_map_reads_back_submission() {
    let t = setup_app().await;

    let response = t
        .app
        .clone()
        .oneshot(json_request("POST", "/api/maps", submission("abc12")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = t
        .app
        .clone()
        .oneshot(test_request("GET", "/api/maps/abc12"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["map_code"], "ABC12");
    assert_eq!(body["map_name"], "Temple");
    assert_eq!(body["checkpoints"], 15);
    assert_eq!(body["map_types"], json!(["Classic"]));
    assert_eq!(body["mechanics"], json!(["Bhop"]));
    assert_eq!(body["creators"], json!([7]));
    assert_eq!(body["guides"], json!(["https://youtu.be/guide"]));
    assert!(body["difficulty"].is_number());
    assert!(body["medals"].is_null());

    let response = t
        .app
        .oneshot(test_request("GET", "/api/maps/NOPE"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rate_map_resyncs_players() {
    let t = setup_app().await;
    seed_easy_completions(&t.db).await;

    let response = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/maps/easy0/ratings",
            json!({"user_id": 1, "difficulty": 3.0}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["map_code"], "EASY0");
    assert_eq!(body["resync"], json!([1]));

    let response = t
        .app
        .oneshot(json_request(
            "POST",
            "/api/maps/EASY0/ratings",
            json!({"user_id": 1, "difficulty": 11.0}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_archive_map() {
    let t = setup_app().await;
    seed_easy_completions(&t.db).await;

    let response = t
        .app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/maps/EASY3/archived",
            json!({"archived": true}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let archived: bool = sqlx::query_scalar("SELECT archived FROM maps WHERE map_code = 'EASY3'")
        .fetch_one(&t.db)
        .await
        .unwrap();
    assert!(archived);

    let response = t
        .app
        .oneshot(json_request(
            "PUT",
            "/api/maps/NOPE/archived",
            json!({"archived": true}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Newsfeed
// =============================================================================

#[tokio::test]
async fn test_event_stream_content_type() {
    let t = setup_app().await;

    let response = t
        .app
        .oneshot(test_request("GET", "/api/events"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
}
