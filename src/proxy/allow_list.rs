use reqwest::Url;

use crate::config::ProxyConfig;
use crate::error::ApiError;

/// Host and folder the relay is permitted to fetch from.
#[derive(Debug, Clone)]
pub struct AllowList {
    host: String,
    folder: String,
}

impl AllowList {
    pub fn new(host: impl Into<String>, folder: impl Into<String>) -> Self {
        Self {
            host: host.into().to_lowercase(),
            folder: folder.into(),
        }
    }

    pub fn permits(&self, url: &Url) -> bool {
        let http = matches!(url.scheme(), "http" | "https");
        let host_ok = url
            .host_str()
            .is_some_and(|h| h.to_lowercase().contains(&self.host));
        http && host_ok && url.path().contains(&self.folder)
    }

    /// Parses and checks a caller-supplied URL.
    pub fn check(&self, raw: Option<&str>) -> Result<Url, ApiError> {
        let raw = raw
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| ApiError::bad_request("url query param required"))?;
        let url = Url::parse(raw).map_err(|_| ApiError::bad_request("Invalid URL"))?;
        if !self.permits(&url) {
            return Err(ApiError::Forbidden("URL not allowed".into()));
        }
        Ok(url)
    }
}

impl From<&ProxyConfig> for AllowList {
    fn from(cfg: &ProxyConfig) -> Self {
        Self::new(cfg.allowed_host.clone(), cfg.allowed_folder.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> AllowList {
        AllowList::new("res.cloudinary.com", "campus_uploads")
    }

    #[test]
    fn accepts_allowed_host_and_folder() {
        let url = list()
            .check(Some(
                "https://res.cloudinary.com/demo/raw/upload/v1/campus_uploads/a.pdf",
            ))
            .unwrap();
        assert_eq!(url.host_str(), Some("res.cloudinary.com"));
    }

    #[test]
    fn rejects_other_hosts_folders_and_schemes() {
        for raw in [
            "https://evil.example.com/campus_uploads/a.pdf",
            "https://res.cloudinary.com/demo/other_folder/a.pdf",
            "ftp://res.cloudinary.com/campus_uploads/a.pdf",
            "https://example.com/?next=res.cloudinary.com/campus_uploads",
        ] {
            let err = list().check(Some(raw)).unwrap_err();
            assert!(matches!(err, ApiError::Forbidden(_)), "{raw}");
        }
    }

    #[test]
    fn missing_or_invalid_url_is_bad_request() {
        assert!(matches!(list().check(None), Err(ApiError::BadRequest(_))));
        assert!(matches!(list().check(Some("  ")), Err(ApiError::BadRequest(_))));
        let err = list().check(Some("not a url")).unwrap_err();
        assert_eq!(err.to_string(), "Invalid URL");
    }
}
