use anyhow::Context;
use reqwest::Url;
use serde::Deserialize;

/// Largest object accepted for upload or registration: 100 MiB.
pub const MAX_FILE_SIZE: i64 = 100 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub minio_endpoint: String,
    pub minio_bucket: String,
    pub minio_access_key: String,
    pub minio_secret_key: String,
    pub minio_region: String,
    /// Base URL objects are publicly reachable under, without trailing slash.
    pub public_url: String,
    pub upload_folder: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    pub allowed_host: String,
    pub allowed_folder: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// `None` runs the service on the in-memory store.
    pub database_url: Option<String>,
    pub storage: StorageConfig,
    pub proxy: ProxyConfig,
    pub auto_provision_users: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());

        let minio_endpoint = std::env::var("MINIO_ENDPOINT").context("MINIO_ENDPOINT")?;
        let minio_bucket = std::env::var("MINIO_BUCKET").context("MINIO_BUCKET")?;
        let public_url = std::env::var("STORAGE_PUBLIC_URL")
            .unwrap_or_else(|_| format!("{}/{}", minio_endpoint.trim_end_matches('/'), minio_bucket))
            .trim_end_matches('/')
            .to_string();
        let upload_folder =
            std::env::var("UPLOAD_FOLDER").unwrap_or_else(|_| "campus_uploads".into());

        let storage = StorageConfig {
            minio_endpoint,
            minio_bucket,
            minio_access_key: std::env::var("MINIO_ACCESS_KEY").context("MINIO_ACCESS_KEY")?,
            minio_secret_key: std::env::var("MINIO_SECRET_KEY").context("MINIO_SECRET_KEY")?,
            minio_region: std::env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".into()),
            public_url,
            upload_folder,
        };

        let allowed_host = match std::env::var("PROXY_ALLOWED_HOST") {
            Ok(host) => host,
            Err(_) => host_of(&storage.public_url)?,
        };
        let proxy = ProxyConfig {
            allowed_host,
            allowed_folder: std::env::var("PROXY_ALLOWED_FOLDER")
                .unwrap_or_else(|_| storage.upload_folder.clone()),
            user_agent: std::env::var("PROXY_USER_AGENT")
                .unwrap_or_else(|_| "campus-files-proxy".into()),
        };

        let auto_provision_users = std::env::var("AUTO_PROVISION_USERS")
            .ok()
            .and_then(|v| parse_flag(&v))
            .unwrap_or(true);

        Ok(Self {
            database_url,
            storage,
            proxy,
            auto_provision_users,
        })
    }
}

fn host_of(url: &str) -> anyhow::Result<String> {
    let parsed = Url::parse(url).with_context(|| format!("parse STORAGE_PUBLIC_URL {}", url))?;
    parsed
        .host_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("STORAGE_PUBLIC_URL {} has no host", url))
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
