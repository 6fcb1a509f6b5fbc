use anyhow::Context;
use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

use crate::state::AppState;

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    pub url: String,
    pub public_id: String,
    pub original_type: String,
}

/// Puts the bytes under the upload folder and returns where they can be read.
pub async fn store_upload(st: &AppState, item: UploadItem) -> anyhow::Result<StoredObject> {
    let ext = ext_from_mime(&item.content_type).unwrap_or("bin");
    let key = format!(
        "{}/{}.{}",
        st.config.storage.upload_folder.trim_matches('/'),
        Uuid::new_v4(),
        ext
    );

    st.storage
        .put_object(&key, item.body, &item.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;

    Ok(StoredObject {
        url: st.storage.public_url(&key),
        public_id: key,
        original_type: item.content_type,
    })
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "application/pdf" => Some("pdf"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "text/plain" => Some("txt"),
        "application/msword" => Some("doc"),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => Some("docx"),
        "application/vnd.ms-powerpoint" => Some("ppt"),
        "application/vnd.openxmlformats-officedocument.presentationml.presentation" => {
            Some("pptx")
        }
        _ => None,
    }
}

#[cfg(test)]
mod upload_tests {
    use crate::state::AppState;

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(super::ext_from_mime("application/pdf"), Some("pdf"));
        assert_eq!(super::ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(super::ext_from_mime("image/png"), Some("png"));
        assert_eq!(super::ext_from_mime("text/plain"), Some("txt"));
        assert_eq!(super::ext_from_mime("application/octet-stream"), None);
        assert_eq!(super::ext_from_mime("whatever/else"), None);
    }

    #[tokio::test]
    async fn test_store_upload_keys_under_folder() {
        let state = AppState::fake();
        let stored = super::store_upload(
            &state,
            super::UploadItem {
                body: bytes::Bytes::from_static(b"%PDF-1.7"),
                content_type: "application/pdf".into(),
            },
        )
        .await
        .unwrap();
        assert!(stored.public_id.starts_with("campus_uploads/"));
        assert!(stored.public_id.ends_with(".pdf"));
        assert_eq!(
            stored.url,
            format!("https://cdn.test/bucket/{}", stored.public_id)
        );
        assert_eq!(stored.original_type, "application/pdf");
    }
}
