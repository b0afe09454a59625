//! In-process tests for the support chat endpoints over the in-memory store.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt; // oneshot
use uuid::Uuid;

use giftcoin_api::{AppStateInner, build_router};
use giftcoin_core::memory::MemoryStore;

fn make_router() -> axum::Router {
    build_router(AppStateInner::new(Arc::new(MemoryStore::new())))
}

async fn call(router: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = router.clone().oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, serde_json::from_slice(&body).expect("body is not valid JSON"))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn open(router: &axum::Router, name: &str, email: Option<&str>) -> String {
    let (status, json) = call(
        router,
        post("/api/conversations", json!({ "userName": name, "userEmail": email })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "open failed: {json}");
    json["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn conversation_is_reused_while_open() {
    let router = make_router();
    let first = open(&router, "Kim", Some("kim@example.com")).await;
    let again = open(&router, "Kim Minji", Some("kim@example.com")).await;
    assert_eq!(first, again);

    let other = open(&router, "Lee", None).await;
    assert_ne!(first, other);

    let (status, json) = call(&router, post("/api/conversations", json!({ "userName": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn messages_flow_in_order_and_update_preview() {
    let router = make_router();
    let id = open(&router, "Kim", None).await;
    let uri = format!("/api/conversations/{id}/messages");

    let (status, json) = call(&router, post(&uri, json!({ "senderType": "user", "content": "  환불 문의드려요 " }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["content"], "환불 문의드려요");
    assert_eq!(json["senderType"], "user");
    call(&router, post(&uri, json!({ "senderType": "admin", "content": "확인해드릴게요" }))).await;

    let (status, json) = call(&router, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    let contents: Vec<_> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(contents, ["환불 문의드려요", "확인해드릴게요"]);

    let (_, inbox) = call(&router, get("/api/conversations")).await;
    assert_eq!(inbox[0]["lastMessage"], "확인해드릴게요");
    assert!(inbox[0]["lastMessageAt"].is_string());
}

#[tokio::test]
async fn blank_or_untyped_message_is_rejected() {
    let router = make_router();
    let id = open(&router, "Kim", None).await;
    let uri = format!("/api/conversations/{id}/messages");

    let (status, _) = call(&router, post(&uri, json!({ "senderType": "user", "content": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(&router, post(&uri, json!({ "content": "hi" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, json) = call(&router, get(&uri)).await;
    assert!(json.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_conversation_is_404() {
    let router = make_router();
    let uri = format!("/api/conversations/{}/messages", Uuid::new_v4());

    let (status, json) = call(&router, post(&uri, json!({ "senderType": "user", "content": "hi" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "대화를 찾을 수 없습니다.");

    let (status, _) = call(&router, get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&router, post("/api/conversations/nope/close", json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn close_then_user_message_reopens() {
    let router = make_router();
    let closed = open(&router, "Kim", None).await;
    let _busy = open(&router, "Lee", None).await;

    let (status, json) = call(&router, post(&format!("/api/conversations/{closed}/close"), json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "closed");

    let (_, inbox) = call(&router, get("/api/conversations")).await;
    let inbox = inbox.as_array().unwrap();
    assert_eq!(inbox.len(), 2);
    assert_eq!(inbox[0]["status"], "open");
    assert_eq!(inbox[1]["id"], closed.as_str());

    // An admin reply does not reopen it.
    let uri = format!("/api/conversations/{closed}/messages");
    call(&router, post(&uri, json!({ "senderType": "admin", "content": "종료합니다" }))).await;
    let (_, inbox) = call(&router, get("/api/conversations")).await;
    assert_eq!(inbox[1]["status"], "closed");

    call(&router, post(&uri, json!({ "senderType": "user", "content": "하나 더요" }))).await;
    let (_, inbox) = call(&router, get("/api/conversations")).await;
    assert!(inbox.as_array().unwrap().iter().all(|c| c["status"] == "open"));
    assert_eq!(inbox[0]["id"], closed.as_str());
}
