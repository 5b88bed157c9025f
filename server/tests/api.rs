//! End-to-end coverage of the HTTP surface against an in-memory SQLite pool,
//! driven through `tower::ServiceExt::oneshot` rather than binding a socket —
//! the standard way to exercise an axum `Router` in a test.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use cellar_engine::{bootstrap, Database, Registry};
use cellar_server::config::{ApiKeyConfig, BootstrapConfig, Config, CorsConfig, DatabaseConfig, HostConfig, JwtConfig, LoggingConfig, RecoveryConfig};
use cellar_server::http::dispatch::router;
use cellar_server::state::AppState;

async fn test_app() -> (axum::Router, String) {
    let db = Database::builder().max_connections(1).connect("sqlite::memory:").await.unwrap();
    let registry = Arc::new(Registry::new(db.clone()));
    bootstrap::ensure_system_tables(&db, &registry).await.unwrap();
    bootstrap::bootstrap_admin(
        &db,
        &bootstrap::BootstrapAdmin { username: "admin".into(), email: "admin@example.com".into(), password: "hunter22".into() },
    )
    .await
    .unwrap();

    let config = Config {
        host: HostConfig { host: "127.0.0.1".into(), port: 0 },
        database: DatabaseConfig { connection_string: "sqlite::memory:".into(), max_connections: 1 },
        logging: LoggingConfig { path: None },
        jwt: JwtConfig { secret: "test-secret".into(), expiry_seconds: 3600 },
        api_key: ApiKeyConfig { header_name: "X-API-Key".into(), enabled: true },
        bootstrap: Some(BootstrapConfig { username: "admin".into(), email: "admin@example.com".into(), password: "hunter22".into() }),
        recovery: RecoveryConfig { auto_repair: true, drop_orphans: false, check_timeout: Duration::from_secs(5) },
        cors: CorsConfig::default(),
        api_prefix: "api".into(),
    };

    let state = Arc::new(AppState::new(db, registry, config));
    (router(state), "hunter22".to_string())
}

async fn login(app: &axum::Router, password: &str) -> String {
    let body = json!({ "username": "admin", "password": password });
    let req = Request::builder()
        .method("POST")
        .uri("/api/auth:login")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let parsed: Value = serde_json::from_slice(&bytes).unwrap();
    parsed["access_token"].as_str().unwrap().to_string()
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_always_live_and_unauthenticated() {
    let (app, _) = test_app().await;
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert_eq!(body["status"], "live");
}

#[tokio::test]
async fn collections_list_requires_a_token() {
    let (app, _) = test_app().await;
    let req = Request::builder().uri("/api/collections:list").body(Body::empty()).unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_then_authorized_admin_call_succeeds() {
    let (app, password) = test_app().await;
    let token = login(&app, &password).await;

    let req = Request::builder()
        .uri("/api/collections:list")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

/// Seed scenario 1: the aggregation-filter regression. A numeric filter on a
/// float column must be coerced the same way for `list` and for `sum`/`count`
/// — this is the bug this crate exists to have already fixed.
#[tokio::test]
async fn aggregation_filter_bug_is_fixed() {
    let (app, password) = test_app().await;
    let token = login(&app, &password).await;
    let auth_header = format!("Bearer {token}");

    let create_body = json!({ "name": "orders", "columns": [{"name": "total", "type": "float", "nullable": false}] });
    let req = Request::builder()
        .method("POST")
        .uri("/api/collections:create")
        .header("authorization", &auth_header)
        .header("content-type", "application/json")
        .body(Body::from(create_body.to_string()))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    for total in [125.0, 150.0, 175.0, 200.0, 225.0] {
        let body = json!({ "data": { "total": total } });
        let req = Request::builder()
            .method("POST")
            .uri("/api/orders:create")
            .header("authorization", &auth_header)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let req = Request::builder()
        .uri("/api/orders:count?total[gt]=150")
        .header("authorization", &auth_header)
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert_eq!(body["value"], 3);

    let req = Request::builder()
        .uri("/api/orders:list?total[lt]=175")
        .header("authorization", &auth_header)
        .body(Body::empty())
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

/// Seed scenario 3: an API key's capability can be flipped without a
/// dedicated endpoint, purely through `users:update`'s generic payload.
#[tokio::test]
async fn api_key_capability_flip_via_admin_update() {
    let (app, password) = test_app().await;
    let token = login(&app, &password).await;
    let auth_header = format!("Bearer {token}");

    let create_body = json!({ "data": { "name": "ci", "role": "user", "can_write": false } });
    let req = Request::builder()
        .method("POST")
        .uri("/api/apikeys:create")
        .header("authorization", &auth_header)
        .header("content-type", "application/json")
        .body(Body::from(create_body.to_string()))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let created = json_body(res).await;
    let secret = created["data"]["key"].as_str().unwrap().to_string();
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let collection_body = json!({ "name": "widgets", "columns": [{"name": "label", "type": "string", "nullable": false}] });
    let req = Request::builder()
        .method("POST")
        .uri("/api/collections:create")
        .header("authorization", &auth_header)
        .header("content-type", "application/json")
        .body(Body::from(collection_body.to_string()))
        .unwrap();
    assert_eq!(app.clone().oneshot(req).await.unwrap().status(), StatusCode::OK);

    let req = Request::builder().uri("/api/widgets:list").header("X-API-Key", &secret).body(Body::empty()).unwrap();
    assert_eq!(app.clone().oneshot(req).await.unwrap().status(), StatusCode::OK);

    let write_body = json!({ "data": { "label": "first" } });
    let req = Request::builder()
        .method("POST")
        .uri("/api/widgets:create")
        .header("X-API-Key", &secret)
        .header("content-type", "application/json")
        .body(Body::from(write_body.to_string()))
        .unwrap();
    assert_eq!(app.clone().oneshot(req).await.unwrap().status(), StatusCode::FORBIDDEN);

    let flip_body = json!({ "id": id, "data": { "can_write": true } });
    let req = Request::builder()
        .method("POST")
        .uri("/api/apikeys:update")
        .header("authorization", &auth_header)
        .header("content-type", "application/json")
        .body(Body::from(flip_body.to_string()))
        .unwrap();
    assert_eq!(app.clone().oneshot(req).await.unwrap().status(), StatusCode::OK);

    let req = Request::builder()
        .method("POST")
        .uri("/api/widgets:create")
        .header("X-API-Key", &secret)
        .header("content-type", "application/json")
        .body(Body::from(write_body.to_string()))
        .unwrap();
    assert_eq!(app.oneshot(req).await.unwrap().status(), StatusCode::OK);
}

/// Seed scenario 5: schema-on-demand's state table.
#[tokio::test]
async fn schema_on_demand_state_table() {
    let (app, password) = test_app().await;
    let token = login(&app, &password).await;
    let auth_header = format!("Bearer {token}");

    let req = Request::builder()
        .uri("/api/users:list?schema=only")
        .header("authorization", &auth_header)
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    let body = json_body(res).await;
    assert!(body.get("schema").is_some());
    assert!(body.get("data").is_none());

    let req = Request::builder()
        .uri("/api/users:list?schema=false")
        .header("authorization", &auth_header)
        .body(Body::empty())
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    let body = json_body(res).await;
    assert!(body.get("data").is_some());
    assert!(body.get("schema").is_none());
}

/// Seed scenario 4: an orphan table is reported, not repaired, when
/// `drop_orphans=false`.
#[tokio::test]
async fn reconciler_reports_orphan_table_without_dropping_it() {
    let db = Database::builder().max_connections(1).connect("sqlite::memory:").await.unwrap();
    let registry = Arc::new(Registry::new(db.clone()));
    bootstrap::ensure_system_tables(&db, &registry).await.unwrap();
    db.exec("CREATE TABLE stray (id TEXT)", Default::default()).await.unwrap();

    let report = cellar_engine::reconcile(
        &db,
        &registry,
        cellar_engine::ReconcilerConfig { auto_repair: true, drop_orphans: false, check_timeout: Duration::from_secs(5) },
    )
    .await
    .unwrap();

    let orphan = report.entries.iter().find(|e| e.name == "stray").expect("orphan entry reported");
    assert!(!orphan.repaired);
    assert!(!registry.exists("stray"));
}

/// Every password-echoing record never carries its hash back to the client.
#[tokio::test]
async fn user_create_never_echoes_password_hash() {
    let (app, password) = test_app().await;
    let token = login(&app, &password).await;
    let auth_header = format!("Bearer {token}");

    let body = json!({ "data": { "username": "editor", "email": "editor@example.com", "password": "swordfish1", "role": "user", "can_write": true } });
    let req = Request::builder()
        .method("POST")
        .uri("/api/users:create")
        .header("authorization", &auth_header)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let created = json_body(res).await;
    assert!(created["data"].get("password_hash").is_none());
}
