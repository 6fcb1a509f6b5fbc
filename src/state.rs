use crate::config::AppConfig;
use crate::db;
use crate::repo::FileStore;
use crate::storage::{Storage, StorageClient};
use std::sync::Arc;

/// Client for the relay. Redirects are handed back to the caller unfollowed,
/// so a permitted URL can never pull content from outside the allow-list.
pub fn http_client(user_agent: &str) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent.to_string())
        .redirect(reqwest::redirect::Policy::none())
        .build()
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn FileStore>,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn StorageClient>,
    pub http: reqwest::Client,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = db::connect_store(config.database_url.as_deref()).await?;

        let storage = Arc::new(Storage::new(&config.storage).await?) as Arc<dyn StorageClient>;

        let http = http_client(&config.proxy.user_agent)?;

        Ok(Self {
            store,
            config,
            storage,
            http,
        })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::{ProxyConfig, StorageConfig};
        use crate::repo::MemoryStore;
        use axum::async_trait;
        use bytes::Bytes;

        #[derive(Clone)]
        struct FakeStorage;
        #[async_trait]
        impl StorageClient for FakeStorage {
            async fn put_object(&self, _k: &str, _b: Bytes, _ct: &str) -> anyhow::Result<()> {
                Ok(())
            }
            fn public_url(&self, k: &str) -> String {
                format!("https://cdn.test/bucket/{}", k)
            }
        }

        let config = Arc::new(AppConfig {
            database_url: None,
            storage: StorageConfig {
                minio_endpoint: "fake".into(),
                minio_bucket: "bucket".into(),
                minio_access_key: "fake".into(),
                minio_secret_key: "fake".into(),
                minio_region: "us-east-1".into(),
                public_url: "https://cdn.test/bucket".into(),
                upload_folder: "campus_uploads".into(),
            },
            proxy: ProxyConfig {
                allowed_host: "cdn.test".into(),
                allowed_folder: "campus_uploads".into(),
                user_agent: "campus-files-test".into(),
            },
            auto_provision_users: true,
        });

        Self {
            store: Arc::new(MemoryStore::new()),
            config,
            storage: Arc::new(FakeStorage),
            http: http_client("campus-files-test").expect("test http client"),
        }
    }
}
