// Integration tests for the HTTP control API
//
// Requests go straight into the router with `tower::ServiceExt::oneshot`;
// the session behind it talks to the scripted in-memory transport.

mod common;

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{Outcome, ScriptedConnector};
use deep_talk_client::{create_router, AppState, ChatSession, ConnectionState, SessionConfig};
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;

fn router(session: &ChatSession) -> Router {
    create_router(AppState::new(session.clone()))
}

async fn call(app: Router, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = app.oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    Ok((status, body))
}

fn post(uri: &str) -> Request<Body> {
    Request::post(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

async fn wait_connected(session: &ChatSession) {
    let mut rx = session.subscribe_state();
    tokio::time::timeout(
        Duration::from_secs(60),
        rx.wait_for(|s| *s == ConnectionState::Connected),
    )
    .await
    .expect("timed out waiting for connection")
    .expect("session task ended");
}

#[tokio::test(start_paused = true)]
async fn test_health_check() -> Result<()> {
    let (connector, _peers) = ScriptedConnector::new(vec![], Outcome::Accept);
    let session = ChatSession::spawn(SessionConfig::default(), connector);

    let (status, body) = call(router(&session), get("/health")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".to_string()));

    session.shutdown().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_send_while_disconnected_is_conflict() -> Result<()> {
    let (connector, _peers) = ScriptedConnector::new(vec![], Outcome::Accept);
    let session = ChatSession::spawn(SessionConfig::default(), connector);

    let (status, body) = call(
        router(&session),
        post_json("/session/send", json!({"text": "hello"})),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Not connected to server");

    let (status, _) = call(router(&session), post("/session/listen/start")).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(session.messages().is_empty());

    session.shutdown().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_connect_send_and_read_log() -> Result<()> {
    let (connector, mut peers) = ScriptedConnector::new(vec![], Outcome::Accept);
    let session = ChatSession::spawn(SessionConfig::default(), connector);

    let (status, body) = call(router(&session), post("/session/connect")).await?;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "connecting");

    let mut peer = peers.recv().await.unwrap();
    wait_connected(&session).await;

    let (status, _) = call(
        router(&session),
        post_json("/session/send", json!({"text": "What is Rust?"})),
    )
    .await?;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(
        peer.next_sent().await,
        json!({"action": "send_text", "text": "What is Rust?"})
    );

    let (status, body) = call(router(&session), get("/session/messages")).await?;
    assert_eq!(status, StatusCode::OK);
    let messages = body.as_array().expect("log is a JSON array");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["kind"], "user");
    assert_eq!(messages[0]["text"], "What is Rust?");
    assert_eq!(messages[0]["complete"], true);

    let (status, body) = call(
        router(&session),
        post_json("/session/send", json!({"text": "   "})),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    session.shutdown().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_session_state_reports_stats() -> Result<()> {
    let (connector, mut peers) = ScriptedConnector::new(vec![], Outcome::Accept);
    let session = ChatSession::spawn(SessionConfig::default(), connector);

    let (status, body) = call(router(&session), get("/session/state")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "disconnected");
    assert_eq!(body["messages_count"], 0);

    session.connect().await?;
    let _peer = peers.recv().await.unwrap();
    wait_connected(&session).await;

    let (status, _) = call(router(&session), post("/session/listen/start")).await?;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (_, body) = call(router(&session), get("/session/state")).await?;
    assert_eq!(body["state"], "connected");
    assert_eq!(body["listening"], true);
    assert_eq!(body["reconnect_attempt"], 0);

    let (status, body) = call(router(&session), post("/session/disconnect")).await?;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "disconnecting");

    let (_, body) = call(router(&session), get("/session/state")).await?;
    assert_eq!(body["state"], "disconnected");
    assert_eq!(body["listening"], false);

    session.shutdown().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_closed_session_is_unavailable() -> Result<()> {
    let (connector, _peers) = ScriptedConnector::new(vec![], Outcome::Accept);
    let session = ChatSession::spawn(SessionConfig::default(), connector);
    session.shutdown().await?;

    let (status, body) = call(router(&session), post("/session/connect")).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].is_string());

    let (status, _) = call(router(&session), get("/session/state")).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}
