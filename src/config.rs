use std::collections::BTreeMap;

use crate::{
    error::FilesystemError,
    model::{
        fs::Visibility,
        oss::{HEADER_CONTENT_TYPE, HEADER_META_PREFIX},
    },
};

/// Request headers a write may pass through to OSS. Anything else is rejected.
pub const AVAILABLE_HEADERS: &[&str] = &[
    "x-oss-request-payer",
    "x-oss-object-acl",
    "Expires",
    "Cache-Control",
    "Content-Disposition",
    "x-oss-traffic-limit",
    "Content-Type",
    "Content-MD5",
    "Content-Length",
    "x-oss-storage-class",
    "x-oss-tagging",
    "Content-Encoding",
    "Content-Language",
    "x-oss-server-side-encryption",
    "x-oss-forbid-overwrite",
    "x-oss-server-side-data-encryption",
    "x-oss-server-side-encryption-key-id",
];

/// Adapter-wide settings, fixed for the adapter's lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdapterOptions {
    pub endpoint: Option<String>,
    /// The endpoint already addresses the bucket, so public URLs don't get a `bucket.` host prefix.
    pub bucket_endpoint: bool,
    pub url: Option<String>,
    pub temporary_url: Option<String>,
    pub default_visibility: Visibility,
    /// Copy the source ACL onto the destination when a copy doesn't set a visibility.
    pub retain_visibility: bool,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            endpoint: None,
            bucket_endpoint: false,
            url: None,
            temporary_url: None,
            default_visibility: Visibility::Public,
            retain_visibility: true,
        }
    }
}

impl AdapterOptions {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_bucket_endpoint(mut self, bucket_endpoint: bool) -> Self {
        self.bucket_endpoint = bucket_endpoint;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_temporary_url(mut self, url: impl Into<String>) -> Self {
        self.temporary_url = Some(url.into());
        self
    }

    pub fn with_default_visibility(mut self, visibility: Visibility) -> Self {
        self.default_visibility = visibility;
        self
    }

    pub fn with_retain_visibility(mut self, retain: bool) -> Self {
        self.retain_visibility = retain;
        self
    }
}

/// Per-call options for writes, directory creation and copies.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteConfig {
    pub visibility: Option<Visibility>,
    pub directory_visibility: Option<Visibility>,
    pub mime_type: Option<String>,
    headers: BTreeMap<String, String>,
}

impl WriteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn with_directory_visibility(mut self, visibility: Visibility) -> Self {
        self.directory_visibility = Some(visibility);
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Adds a passthrough header. Names match `AVAILABLE_HEADERS` case-insensitively and
    /// are stored in their canonical spelling; `x-oss-meta-*` user metadata is also accepted.
    pub fn with_header(
        mut self,
        name: &str,
        value: impl Into<String>,
    ) -> Result<Self, FilesystemError> {
        let canonical = canonical_header(name)
            .ok_or_else(|| FilesystemError::UnsupportedOption(format!("header {}", name)))?;

        self.headers.insert(canonical, value.into());
        Ok(self)
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn content_type(&self) -> Option<&str> {
        self.mime_type
            .as_deref()
            .or_else(|| self.headers.get(HEADER_CONTENT_TYPE).map(String::as_str))
    }
}

fn canonical_header(name: &str) -> Option<String> {
    if let Some(known) = AVAILABLE_HEADERS
        .iter()
        .find(|known| known.eq_ignore_ascii_case(name))
    {
        return Some(known.to_string());
    }

    let lower = name.to_ascii_lowercase();
    match lower.strip_prefix(HEADER_META_PREFIX) {
        Some(suffix) if !suffix.is_empty() => Some(lower),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_header() {
        let cases = vec![
            ("Cache-Control", Some("Cache-Control")),
            ("cache-control", Some("Cache-Control")),
            ("X-OSS-OBJECT-ACL", Some("x-oss-object-acl")),
            ("x-oss-meta-self-define-title", Some("x-oss-meta-self-define-title")),
            ("X-Oss-Meta-Owner", Some("x-oss-meta-owner")),
            ("x-oss-meta-", None),
            ("Authorization", None),
            ("endpoint", None),
        ];

        for (input, expected) in cases {
            assert_eq!(
                canonical_header(input).as_deref(),
                expected,
                "failed for case: {}",
                input
            );
        }
    }

    #[test]
    fn test_with_header_rejects_unknown_names() {
        let result = WriteConfig::new().with_header("Host", "evil.example.com");
        assert!(matches!(result, Err(FilesystemError::UnsupportedOption(_))));
    }

    #[test]
    fn test_content_type_prefers_mime_type() {
        let config = WriteConfig::new()
            .with_header("content-type", "image/png")
            .unwrap();
        assert_eq!(config.content_type(), Some("image/png"));

        let config = config.with_mime_type("text/html");
        assert_eq!(config.content_type(), Some("text/html"));

        assert_eq!(WriteConfig::new().content_type(), None);
    }

    #[test]
    fn test_default_options() {
        let options = AdapterOptions::default();
        assert_eq!(options.default_visibility, Visibility::Public);
        assert!(options.retain_visibility);
        assert!(!options.bucket_endpoint);
        assert!(options.endpoint.is_none());
    }
}
