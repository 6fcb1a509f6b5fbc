use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::repo::FileRecord;
use crate::users::dto::UserProfile;

/// Body of `POST /files/upload-url`. Missing strings deserialize as empty so
/// validation can report them together.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterFileRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub file_url: String,
    pub file_type: Option<String>,
    pub file_size: Option<i64>,
    pub username: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisteredFile {
    pub user: UserProfile,
    pub file: FileRecord,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStats {
    pub total_files: usize,
    pub total_size: i64,
    #[serde(rename = "totalSizeMB")]
    pub total_size_mb: String,
    pub file_types: BTreeMap<String, usize>,
    pub recent_files: Vec<FileRecord>,
}
