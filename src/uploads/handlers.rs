use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::post,
    Router,
};
use tracing::{info, instrument};

use super::services::{store_upload, StoredObject, UploadItem};
use crate::{
    config::MAX_FILE_SIZE,
    error::ApiError,
    response::{ApiResponse, Reply},
    state::AppState,
};

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_file)) // multipart field "file"
        .layer(DefaultBodyLimit::max(MAX_FILE_SIZE as usize + MULTIPART_OVERHEAD))
}

#[instrument(skip(state, mp))]
pub async fn upload_file(
    State(state): State<AppState>,
    mut mp: Multipart,
) -> Result<Reply<StoredObject>, ApiError> {
    let mut item = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(multipart_error)?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        let body = field
            .bytes()
            .await
            .map_err(multipart_error)?;
        item = Some(UploadItem { body, content_type });
        break;
    }

    let Some(item) = item else {
        return Err(ApiError::bad_request("No file found"));
    };
    if item.body.len() as i64 > MAX_FILE_SIZE {
        return Err(too_large());
    }

    let size = item.body.len();
    let stored = store_upload(&state, item)
        .await
        .map_err(ApiError::internal("Error uploading file"))?;
    info!(key = %stored.public_id, size, "object uploaded");

    Ok(Reply(
        StatusCode::OK,
        ApiResponse::ok("File uploaded successfully", stored),
    ))
}

fn too_large() -> ApiError {
    ApiError::bad_request("File size exceeds 100MB limit")
}

// the body limit cuts the stream short; report it as the size rule it enforces
fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large()
    } else {
        ApiError::bad_request(e.body_text())
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::{app::build_app, config::MAX_FILE_SIZE, state::AppState};

    const BOUNDARY: &str = "X-CAMPUS-BOUNDARY";

    fn multipart(field: &str, content_type: &str, data: &str) -> Request<Body> {
        multipart_bytes(field, content_type, data.as_bytes())
    }

    fn multipart_bytes(field: &str, content_type: &str, data: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"a.pdf\"\r\nContent-Type: {content_type}\r\n\r\n",
            b = BOUNDARY,
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        Request::builder()
            .method(Method::POST)
            .uri("/api/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_of(res: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn upload_returns_public_url() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(multipart("file", "application/pdf", "%PDF-1.7"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_of(res).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["originalType"], "application/pdf");
        let url = body["data"]["url"].as_str().unwrap();
        assert!(url.starts_with("https://cdn.test/bucket/campus_uploads/"));
        assert!(url.ends_with(".pdf"));
    }

    #[tokio::test]
    async fn upload_without_file_field_is_rejected() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(multipart("attachment", "application/pdf", "x"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = json_of(res).await;
        assert_eq!(body["message"], "No file found");
    }

    #[tokio::test]
    async fn upload_over_body_limit_reports_size_rule() {
        let app = build_app(AppState::fake());
        let data = vec![b'x'; MAX_FILE_SIZE as usize + 2 * 1024 * 1024];
        let res = app
            .oneshot(multipart_bytes("file", "application/pdf", &data))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = json_of(res).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "File size exceeds 100MB limit");
    }
}
