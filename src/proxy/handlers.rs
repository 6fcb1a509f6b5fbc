use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap, HeaderName},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::{error, instrument, warn};

use super::allow_list::AllowList;
use crate::{error::ApiError, state::AppState};

/// Upstream headers copied onto the relayed response.
const FORWARDED: [HeaderName; 4] = [
    header::CONTENT_TYPE,
    header::CONTENT_LENGTH,
    header::ACCEPT_RANGES,
    header::CONTENT_RANGE,
];

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    pub url: Option<String>,
}

pub fn proxy_routes() -> Router<AppState> {
    Router::new().route("/files/proxy", get(proxy_file))
}

#[instrument(skip(state, headers))]
pub async fn proxy_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<ProxyQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let url = AllowList::from(&state.config.proxy)
        .check(query.url.as_deref())
        .inspect_err(|e| warn!(error = %e, "proxy request refused"))?;

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(&state.config.proxy.user_agent)
        .to_string();

    let mut upstream = state
        .http
        .get(url.clone())
        .header(header::USER_AGENT, user_agent);
    if let Some(range) = headers.get(header::RANGE) {
        upstream = upstream.header(header::RANGE, range.clone());
    }

    let upstream = upstream.send().await.map_err(|e| {
        error!(error = %e, %url, "proxy fetch failed");
        ApiError::internal("Proxy error")(e)
    })?;

    let status = upstream.status();
    if status.is_client_error() || status.is_server_error() {
        warn!(%status, %url, "upstream returned error");
        return Err(ApiError::Upstream(status));
    }

    let mut out = HeaderMap::new();
    for name in FORWARDED {
        if let Some(value) = upstream.headers().get(&name) {
            out.insert(name, value.clone());
        }
    }

    let body = Body::from_stream(upstream.bytes_stream());
    Ok((status, out, body).into_response())
}

#[cfg(test)]
mod tests {
    use std::{net::SocketAddr, sync::Arc};

    use axum::{
        body::Body,
        http::{header, HeaderMap, Request, StatusCode},
        response::{IntoResponse, Redirect, Response},
        routing::get,
        Router,
    };
    use tokio::net::TcpListener;
    use tower::ServiceExt;

    use crate::app::build_app;
    use crate::state::AppState;
    use crate::test_support::TestClient;

    async fn partial_pdf(headers: HeaderMap) -> Response {
        // only a forwarded Range gets the partial answer
        if headers.get(header::RANGE).and_then(|v| v.to_str().ok()) != Some("bytes=0-3") {
            return (StatusCode::OK, "%PDF-1.7").into_response();
        }
        (
            StatusCode::PARTIAL_CONTENT,
            [
                (header::CONTENT_TYPE, "application/pdf"),
                (header::CONTENT_RANGE, "bytes 0-3/8"),
                (header::ACCEPT_RANGES, "bytes"),
            ],
            "%PDF",
        )
            .into_response()
    }

    async fn spawn_upstream() -> SocketAddr {
        let upstream = Router::new()
            .route("/campus_uploads/a.pdf", get(partial_pdf))
            .route("/campus_uploads/gone.pdf", get(|| async { StatusCode::GONE }))
            .route(
                "/campus_uploads/moved.pdf",
                get(|| async { Redirect::temporary("/elsewhere") }),
            )
            .route("/elsewhere", get(|| async { "leaked" }));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, upstream).await.unwrap() });
        addr
    }

    fn local_relay_state() -> AppState {
        let mut state = AppState::fake();
        let mut config = (*state.config).clone();
        config.proxy.allowed_host = "127.0.0.1".into();
        state.config = Arc::new(config);
        state
    }

    async fn relay(addr: SocketAddr, path: &str) -> Response {
        let target = format!("http://{}{}", addr, path)
            .replace(':', "%3A")
            .replace('/', "%2F");
        let req = Request::builder()
            .uri(format!("/api/files/proxy?url={}", target))
            .header(header::RANGE, "bytes=0-3")
            .body(Body::empty())
            .unwrap();
        build_app(local_relay_state()).oneshot(req).await.unwrap()
    }

    async fn body_of(res: Response) -> Vec<u8> {
        axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn relays_partial_content_with_range_headers() {
        let addr = spawn_upstream().await;
        let res = relay(addr, "/campus_uploads/a.pdf").await;

        assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(res.headers()[header::CONTENT_RANGE], "bytes 0-3/8");
        assert_eq!(res.headers()[header::ACCEPT_RANGES], "bytes");
        assert_eq!(body_of(res).await, b"%PDF");
    }

    #[tokio::test]
    async fn upstream_error_status_is_forwarded() {
        let addr = spawn_upstream().await;
        let res = relay(addr, "/campus_uploads/gone.pdf").await;

        assert_eq!(res.status(), StatusCode::GONE);
        let body: serde_json::Value = serde_json::from_slice(&body_of(res).await).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Upstream error 410");
    }

    #[tokio::test]
    async fn upstream_redirect_is_not_followed() {
        let addr = spawn_upstream().await;
        let res = relay(addr, "/campus_uploads/moved.pdf").await;

        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
        let body = body_of(res).await;
        assert!(!String::from_utf8_lossy(&body).contains("leaked"));
    }

    #[tokio::test]
    async fn disallowed_url_is_forbidden() {
        let client = TestClient::new(AppState::fake());
        // unroutable host: a request attempt would surface as 500, not 403
        let (status, body) = client
            .get("/api/files/proxy?url=https%3A%2F%2F10.255.255.1%2Fcampus_uploads%2Fa.pdf")
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "URL not allowed");
    }

    #[tokio::test]
    async fn wrong_folder_is_forbidden() {
        let client = TestClient::new(AppState::fake());
        let (status, _) = client
            .get("/api/files/proxy?url=https%3A%2F%2Fcdn.test%2Fbucket%2Fprivate%2Fa.pdf")
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn missing_url_is_bad_request() {
        let client = TestClient::new(AppState::fake());
        let (status, body) = client.get("/api/files/proxy").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "url query param required");

        let (status, body) = client.get("/api/files/proxy?url=%3A%2F%2Fbroken").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid URL");
    }
}
