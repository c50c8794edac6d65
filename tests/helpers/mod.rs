//! Reusable test helpers for HTTP integration tests.
//!
//! Provides `TestApp` for building and sending requests through the full
//! axum router, plus JSON body utilities.
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{self, Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use stagecast_server::api::{create_router, AppState};
use stagecast_server::config::Config;

/// A test application wrapping the full axum router.
///
/// Every instance carries its own isolated state: registry, rosters, and
/// media engine adapter.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Create a new test app with default test configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default_for_test())
    }

    /// Create a test app with a custom config.
    pub fn with_config(config: Config) -> Self {
        let state = AppState::new(config);
        let router = create_router(state.clone());
        Self { router, state }
    }

    /// Build an HTTP request with the given method and URI.
    pub fn request(method: Method, uri: &str) -> http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    /// Send a request through the router via `tower::ServiceExt::oneshot`.
    pub async fn oneshot(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot request failed")
    }

    /// Send a GET request.
    pub async fn get(&self, uri: &str) -> Response<Body> {
        let request = Self::request(Method::GET, uri)
            .body(Body::empty())
            .expect("Failed to build request");
        self.oneshot(request).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, uri: &str) -> Response<Body> {
        let request = Self::request(Method::DELETE, uri)
            .body(Body::empty())
            .expect("Failed to build request");
        self.oneshot(request).await
    }

    /// Send a PUT request with an empty body.
    pub async fn put(&self, uri: &str) -> Response<Body> {
        let request = Self::request(Method::PUT, uri)
            .body(Body::empty())
            .expect("Failed to build request");
        self.oneshot(request).await
    }

    /// Send a POST request with a JSON body.
    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> Response<Body> {
        let request = Self::request(Method::POST, uri)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("Failed to build request");
        self.oneshot(request).await
    }
}

/// Collect a response body and parse it as JSON.
pub async fn body_to_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to collect response body")
        .to_bytes();
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        let preview = String::from_utf8_lossy(&bytes);
        panic!("Failed to parse response as JSON: {e}\nBody: {preview}")
    })
}

/// Create a room through the API, returning its id.
pub async fn create_room(app: &TestApp, id: Option<&str>, title: &str) -> String {
    let mut body = serde_json::json!({ "title": title });
    if let Some(id) = id {
        body["id"] = serde_json::json!(id);
    }
    let response = app.post_json("/api/rooms", body).await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    let json = body_to_json(response).await;
    json["room"]["id"]
        .as_str()
        .expect("room id missing")
        .to_owned()
}

/// Create a transport in a room, returning the full response body.
pub async fn create_transport(app: &TestApp, room_id: &str) -> serde_json::Value {
    let response = app
        .post_json(
            "/api/media/transport",
            serde_json::json!({ "roomId": room_id }),
        )
        .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_to_json(response).await
}

/// Connect a transport by echoing back a DTLS parameter blob.
pub async fn connect_transport(
    app: &TestApp,
    room_id: &str,
    transport_id: &str,
    dtls_parameters: serde_json::Value,
) {
    let response = app
        .post_json(
            "/api/media/transport/connect",
            serde_json::json!({
                "roomId": room_id,
                "transportId": transport_id,
                "dtlsParameters": dtls_parameters,
            }),
        )
        .await;
    assert_eq!(response.status(), axum::http::StatusCode::OK);
}

/// A minimal valid opaque RTP parameter blob.
pub fn valid_rtp_parameters(kind: &str) -> serde_json::Value {
    let mime_type = match kind {
        "video" => "video/VP8",
        _ => "audio/opus",
    };
    serde_json::json!({
        "codecs": [{ "mimeType": mime_type, "payloadType": 111, "clockRate": 48000 }],
        "encodings": [{ "ssrc": 2222 }],
    })
}
