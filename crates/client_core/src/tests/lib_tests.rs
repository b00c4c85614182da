use std::{sync::Arc, time::Duration};

use super::*;
use anyhow::Result as TestResult;
use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::{json, Value};
use shared::{
    domain::{CveEntry, NewsArticle},
    error::ErrorCode,
    protocol::FetchRequest,
};
use tokio::{net::TcpListener, sync::Mutex};

type Responder = fn(&str) -> Response;

#[derive(Clone)]
struct EchoState {
    paths: Arc<Mutex<Vec<String>>>,
    bodies: Arc<Mutex<Vec<Value>>>,
    respond: Responder,
}

async fn record_any(
    State(state): State<EchoState>,
    uri: Uri,
    body: Option<Json<Value>>,
) -> Response {
    let path = uri.path().to_string();
    state.paths.lock().await.push(path.clone());
    if let Some(Json(body)) = body {
        state.bodies.lock().await.push(body);
    }
    (state.respond)(&path)
}

async fn spawn_echo_server(respond: Responder) -> TestResult<(String, EchoState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = EchoState {
        paths: Arc::new(Mutex::new(Vec::new())),
        bodies: Arc::new(Mutex::new(Vec::new())),
        respond,
    };
    let app = Router::new().fallback(record_any).with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

fn news_article() -> Value {
    json!({
        "id": 4,
        "source": "The Hacker News",
        "original_title": "New botnet",
        "turkish_title": "Yeni botnet",
        "original_description": "",
        "turkish_description": "",
        "turkish_summary": "Özet",
        "link": "https://thehackernews.com/botnet",
        "date": "2025-05-02",
        "original_date": "Fri, 02 May 2025 10:00:00 GMT",
        "created_at": "2025-05-02T10:05:00Z"
    })
}

fn ok_responder(path: &str) -> Response {
    match path {
        "/api/news/" | "/prefix/api/news/" => {
            Json(json!({ "success": true, "data": [news_article()], "cached": true, "count": 1 }))
                .into_response()
        }
        "/api/fetch/" => Json(json!({
            "success": true,
            "message": "1 haber çekildi",
            "count": 1,
            "data": [news_article()]
        }))
        .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

fn connection(server_url: &str) -> ApiConnection {
    ApiConnection::new(server_url, Duration::from_secs(5)).expect("api connection")
}

#[tokio::test]
async fn news_actions_use_api_root_routes() {
    let (server_url, state) = spawn_echo_server(ok_responder).await.expect("spawn");
    let news = connection(&server_url).feed::<NewsArticle>();

    let list = news.list().await.expect("list");
    let fetched = news
        .fetch(&FetchRequest {
            days: 3,
            sources: vec!["The Hacker News".into()],
        })
        .await
        .expect("fetch");

    assert_eq!(list.data[0].turkish_title, "Yeni botnet");
    assert!(list.cached);
    assert_eq!(fetched.message, "1 haber çekildi");
    assert_eq!(*state.paths.lock().await, vec!["/api/news/", "/api/fetch/"]);
    assert_eq!(
        *state.bodies.lock().await,
        vec![json!({ "days": 3, "sources": ["The Hacker News"] })]
    );
}

#[tokio::test]
async fn base_url_path_prefix_is_kept() {
    let (server_url, state) = spawn_echo_server(ok_responder).await.expect("spawn");
    let news = connection(&format!("{server_url}/prefix")).feed::<NewsArticle>();

    news.list().await.expect("list");

    assert_eq!(*state.paths.lock().await, vec!["/prefix/api/news/"]);
}

fn error_responder(path: &str) -> Response {
    match path {
        "/api/cve/fetch/" => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "message": "Geçersiz gün sayısı", "errors": { "days": ["too big"] } })),
        )
            .into_response(),
        "/api/cve/stats/" => (StatusCode::BAD_GATEWAY, "upstream down").into_response(),
        "/api/cve/" => "this is not json".into_response(),
        "/api/cve/clear/" => Json(json!({ "success": false, "message": "" })).into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

#[tokio::test]
async fn error_responses_map_to_typed_errors() {
    let (server_url, _state) = spawn_echo_server(error_responder).await.expect("spawn");
    let cve = connection(&server_url).feed::<CveEntry>();

    let err = cve
        .fetch(&FetchRequest {
            days: 99,
            sources: vec!["NVD".into()],
        })
        .await
        .expect_err("bad request");
    match err {
        ClientError::Api { endpoint, source } => {
            assert_eq!(endpoint, "/api/cve/fetch/");
            assert_eq!(source.code, ErrorCode::Validation);
            assert_eq!(source.message, "Geçersiz gün sayısı");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    match cve.stats().await.expect_err("bad gateway") {
        ClientError::Api { source, .. } => {
            assert_eq!(source.code, ErrorCode::Unavailable);
            assert_eq!(source.message, "server responded with HTTP 502");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert!(matches!(
        cve.list().await,
        Err(ClientError::Decode { .. })
    ));
    assert!(matches!(
        cve.clear().await,
        Err(ClientError::Rejected(message)) if message == "backend refused to clear the cache"
    ));
}

#[tokio::test]
async fn missing_task_status_endpoint_is_none() {
    let (server_url, state) = spawn_echo_server(ok_responder).await.expect("spawn");
    let cve = connection(&server_url).feed::<CveEntry>();

    let status = cve.task_status("abc").await.expect("status");

    assert!(status.is_none());
    assert_eq!(*state.paths.lock().await, vec!["/api/task-status/abc/"]);
}

#[test]
fn rejects_unparseable_server_url() {
    let err = ApiConnection::new("not a url", Duration::from_secs(1)).expect_err("invalid");
    assert!(matches!(err, ClientError::InvalidUrl { .. }));

    let conn = connection("http://localhost:8000");
    assert_eq!(conn.base_url().as_str(), "http://localhost:8000/");
}
