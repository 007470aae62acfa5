//! Integration tests for the minikernel HTTP server
//!
//! These tests run the router on a real listener and talk to it with an
//! HTTP client:
//! - execute then evaluate share one workspace
//! - GET and POST parse give the same record
//! - error bodies carry the taxonomy kind and status

use std::net::SocketAddr;
use std::sync::Arc;

use minikernel_server::{ErrorResponse, KernelCore, build_router_with_docs};
use polars::prelude::*;
use reqwest::{Client, StatusCode};
use serde_json::{Value as JsonValue, json};

/// Start a server with one preloaded DataFrame
async fn setup_test_server() -> SocketAddr {
    let core = Arc::new(KernelCore::new());
    let df = df! {
        "name" => &["alice", "bob", "charlie"],
        "gold" => &[100, 250, 50],
    }
    .unwrap();
    core.insert_df("entities", df).await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = build_router_with_docs(core);
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

async fn post(client: &Client, addr: SocketAddr, path: &str, body: &str) -> reqwest::Response {
    client
        .post(format!("http://{addr}{path}"))
        .body(body.to_string())
        .send()
        .await
        .unwrap()
}

async fn get(client: &Client, addr: SocketAddr, path: &str) -> reqwest::Response {
    client.get(format!("http://{addr}{path}")).send().await.unwrap()
}

#[tokio::test]
async fn liveness() {
    let addr = setup_test_server().await;
    let resp = get(&Client::new(), addr, "/").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "Python service is alive!");
}

#[tokio::test]
async fn exec_then_eval_and_locals() {
    let addr = setup_test_server().await;
    let client = Client::new();

    let resp = post(&client, addr, "/exec", "a = 5\nrich = entities[['name']]").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.unwrap().is_empty());

    let resp = post(&client, addr, "/eval", "a * 2").await;
    assert_eq!(resp.json::<JsonValue>().await.unwrap(), json!(10));

    let resp = post(&client, addr, "/eval", "entities.sort_values('gold').head(1)").await;
    assert_eq!(
        resp.json::<JsonValue>().await.unwrap(),
        json!({"name": {"0": "charlie"}, "gold": {"0": 50}})
    );

    let locals: JsonValue = get(&client, addr, "/locals").await.json().await.unwrap();
    assert_eq!(
        locals,
        json!({"a": "int", "entities": "DataFrame", "rich": "DataFrame"})
    );
}

#[tokio::test]
async fn getcols_reports_first_row_types() {
    let addr = setup_test_server().await;
    let client = Client::new();

    let resp = get(&client, addr, "/getcols/entities").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cols: JsonValue = resp.json().await.unwrap();
    assert_eq!(cols, json!({"name": "str", "gold": "int"}));

    let resp = get(&client, addr, "/getcols/missing").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let err: ErrorResponse = resp.json().await.unwrap();
    assert_eq!(err.kind, "NameNotFound");

    post(&client, addr, "/exec", "n = 1").await;
    let resp = get(&client, addr, "/getcols/n").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let err: ErrorResponse = resp.json().await.unwrap();
    assert_eq!(err.kind, "WrongValueKind");
}

#[tokio::test]
async fn parse_get_and_post_agree() {
    let addr = setup_test_server().await;
    let client = Client::new();
    let code = "x = 1\nif x:\n    y = [x, 'a']";

    let by_get = client
        .get(format!("http://{addr}/parse"))
        .query(&[("code", code)])
        .send()
        .await
        .unwrap();
    assert_eq!(by_get.status(), StatusCode::OK);
    let by_get: JsonValue = by_get.json().await.unwrap();

    let by_post: JsonValue = post(&client, addr, "/parse", code).await.json().await.unwrap();
    assert_eq!(by_get, by_post);
    assert_eq!(by_get["_type"], "Module");
    assert_eq!(by_get["body"][1]["_type"], "If");
}

#[tokio::test]
async fn error_bodies_carry_kind() {
    let addr = setup_test_server().await;
    let client = Client::new();

    let resp = post(&client, addr, "/exec", "x = (").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let err: ErrorResponse = resp.json().await.unwrap();
    assert_eq!(err.kind, "SyntaxError");

    let resp = post(&client, addr, "/eval", "1 // 0").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let err: ErrorResponse = resp.json().await.unwrap();
    assert_eq!(err.kind, "ZeroDivisionError");
    assert_eq!(err.error, "integer division or modulo by zero");

    let resp = post(&client, addr, "/parse", "b'raw'").await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let err: ErrorResponse = resp.json().await.unwrap();
    assert_eq!(err.kind, "UnhandledConstantKind");

    let resp = get(&client, addr, "/parse").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let err: ErrorResponse = resp.json().await.unwrap();
    assert_eq!(err.kind, "MissingParameter");
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let addr = setup_test_server().await;
    let resp = Client::new()
        .get(format!("http://{addr}/locals"))
        .header("Origin", "http://example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .unwrap()
            .to_str()
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn openapi_document_is_served() {
    let addr = setup_test_server().await;
    let resp = get(&Client::new(), addr, "/api-docs/openapi.json").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let doc: JsonValue = resp.json().await.unwrap();
    assert!(doc["paths"].get("/exec").is_some());
}
