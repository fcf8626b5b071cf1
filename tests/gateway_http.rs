use axum::body::Bytes;
use axum::extract::Path;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use moviemind_console::config::Config;
use moviemind_console::export::{Delivery, ReportKind};
use moviemind_console::gateway::{Gateway, ReqwestTransport, RequestOptions};
use moviemind_console::models::DashboardStats;
use moviemind_console::session::SessionHolder;
use moviemind_console::store::{LocalStore, MemoryStore, TOKEN_KEY};
use moviemind_console::surface::HeadlessSurface;
use moviemind_console::{Console, ConsoleError};
use serde_json::{json, Value};
use std::sync::Arc;

const TOKEN: &str = "live-token";

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

async fn stats(headers: HeaderMap) -> impl IntoResponse {
    if bearer(&headers) != Some(TOKEN) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "success": false }))).into_response();
    }
    Json(json!({
        "success": true,
        "data": { "totalMovies": 42, "totalUsers": 7, "totalQuizzes": 3, "activeUsers": 5 }
    }))
    .into_response()
}

async fn echo(headers: HeaderMap, body: Bytes) -> Json<Value> {
    let text = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    Json(json!({
        "success": true,
        "data": {
            "authorization": text("authorization"),
            "contentType": text("content-type"),
            "source": text("x-request-source"),
            "body": body
        }
    }))
}

async fn locked_movies() -> Json<Value> {
    Json(json!({ "success": false, "message": "Catalogue locked" }))
}

async fn broken_users() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "kaput")
}

async fn expired_delete(Path(_id): Path<String>) -> impl IntoResponse {
    StatusCode::UNAUTHORIZED
}

async fn export_movies(headers: HeaderMap) -> impl IntoResponse {
    if bearer(&headers) != Some(TOKEN) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    (
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"movies.csv\"; filename*=UTF-8''movies%20export.csv",
            ),
        ],
        "id,title\n1,Alien\n",
    )
        .into_response()
}

async fn spawn_backend() -> String {
    let app = Router::new()
        .route("/api/admin/stats", get(stats))
        .route("/api/admin/echo", post(echo))
        .route("/api/admin/movies", get(locked_movies))
        .route("/api/admin/movies/:id", delete(expired_delete))
        .route("/api/admin/users", get(broken_users))
        .route("/api/admin/export/movies", get(export_movies));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api", addr)
}

struct Client {
    gateway: Gateway,
    store: Arc<MemoryStore>,
    surface: Arc<HeadlessSurface>,
}

async fn client() -> Client {
    let base = spawn_backend().await;
    let store = Arc::new(MemoryStore::with_entry(TOKEN_KEY, TOKEN));
    let surface = Arc::new(HeadlessSurface::new());
    let session = Arc::new(SessionHolder::new(
        store.clone(),
        surface.clone(),
        "/login.html",
    ));
    let transport = Arc::new(ReqwestTransport::new().unwrap());
    Client {
        gateway: Gateway::new(&base, transport, session),
        store,
        surface,
    }
}

#[tokio::test]
async fn envelope_data_is_unwrapped() {
    let c = client().await;

    let stats: DashboardStats = c
        .gateway
        .request_data("/admin/stats", RequestOptions::get())
        .await
        .unwrap();

    assert_eq!(stats.total_movies, 42);
    assert_eq!(stats.active_users, 5);
}

#[tokio::test]
async fn default_headers_survive_caller_headers() {
    let c = client().await;

    let echoed: Value = c
        .gateway
        .request_data(
            "/admin/echo",
            RequestOptions::post(json!({ "title": "Alien" }))
                .header("X-Request-Source", "console"),
        )
        .await
        .unwrap();

    assert_eq!(echoed["authorization"], format!("Bearer {}", TOKEN));
    assert_eq!(echoed["contentType"], "application/json");
    assert_eq!(echoed["source"], "console");
    assert_eq!(echoed["body"], json!({ "title": "Alien" }));
}

#[tokio::test]
async fn success_flag_false_fails_with_server_message() {
    let c = client().await;

    let err = c
        .gateway
        .request("/admin/movies", RequestOptions::get())
        .await
        .unwrap_err();

    assert!(matches!(err, ConsoleError::Rejected(ref m) if m == "Catalogue locked"));
}

#[tokio::test]
async fn error_status_carries_code_and_raw_text() {
    let c = client().await;

    let err = c
        .gateway
        .request("/admin/users", RequestOptions::get())
        .await
        .unwrap_err();

    match err {
        ConsoleError::Http { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "kaput");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn unauthorized_clears_token_and_redirects() {
    let c = client().await;

    let err = c
        .gateway
        .request("/admin/movies/9", RequestOptions::delete())
        .await
        .unwrap_err();

    assert!(matches!(err, ConsoleError::Unauthorized));
    assert_eq!(c.store.get(TOKEN_KEY), None);
    assert_eq!(c.surface.redirects(), vec!["/login.html"]);
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let store = Arc::new(MemoryStore::with_entry(TOKEN_KEY, TOKEN));
    let surface = Arc::new(HeadlessSurface::new());
    let session = Arc::new(SessionHolder::new(store, surface, "/login.html"));
    // Bind then drop so the port is closed.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let gateway = Gateway::new(
        &format!("http://{}/api", addr),
        Arc::new(ReqwestTransport::new().unwrap()),
        session,
    );

    let err = gateway
        .request("/admin/stats", RequestOptions::get())
        .await
        .unwrap_err();

    assert!(matches!(err, ConsoleError::Transport(_)));
}

#[tokio::test]
async fn export_saves_file_named_by_server() {
    let base = spawn_backend().await;
    let store = Arc::new(MemoryStore::with_entry(TOKEN_KEY, TOKEN));
    let surface = Arc::new(HeadlessSurface::new());
    let console = Console::new(
        Config::new(base),
        Arc::new(ReqwestTransport::new().unwrap()),
        store,
        surface.clone(),
    );

    let delivery = console.export(ReportKind::Movies).await.unwrap();

    assert_eq!(
        delivery,
        Delivery::Downloaded {
            filename: "movies export.csv".to_string(),
            bytes: 17
        }
    );
    let downloads = surface.downloads();
    assert_eq!(downloads[0].0, "movies export.csv");
    assert_eq!(downloads[0].1, b"id,title\n1,Alien\n".to_vec());
}
