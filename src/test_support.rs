use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use crate::{app::build_app, state::AppState};

/// Sends one request through the router and decodes the JSON body
/// (`Value::Null` when the body is empty or not JSON).
pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    body: Option<String>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if body.is_some() {
        req = req.header(header::CONTENT_TYPE, "application/json");
    }
    let req = req
        .body(body.map(Body::from).unwrap_or_else(Body::empty))
        .expect("request builds");

    let res = app.oneshot(req).await.expect("router is infallible");
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .expect("body readable");
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Router bound to one shared state so consecutive requests see each other.
pub struct TestClient {
    pub state: AppState,
}

impl TestClient {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub fn app(&self) -> Router {
        build_app(self.state.clone())
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        send(self.app(), Method::GET, uri, None).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        send(self.app(), Method::DELETE, uri, None).await
    }

    pub async fn json(&self, method: Method, uri: &str, body: Value) -> (StatusCode, Value) {
        send(self.app(), method, uri, Some(body.to_string())).await
    }

    pub async fn raw_json(&self, method: Method, uri: &str, body: &str) -> (StatusCode, Value) {
        send(self.app(), method, uri, Some(body.to_string())).await
    }
}
