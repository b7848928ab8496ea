use std::{collections::BTreeMap, fmt};

pub const ACL_PRIVATE: &str = "private";
pub const ACL_PUBLIC_READ: &str = "public-read";
pub const ACL_PUBLIC_READ_WRITE: &str = "public-read-write";
pub const ACL_DEFAULT: &str = "default";

pub const HEADER_OBJECT_ACL: &str = "x-oss-object-acl";
pub const HEADER_STORAGE_CLASS: &str = "x-oss-storage-class";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_META_PREFIX: &str = "x-oss-meta-";

pub const META_CONTENT_LENGTH: &str = "content-length";
pub const META_CONTENT_TYPE: &str = "content-type";
pub const META_LAST_MODIFIED: &str = "last-modified";
pub const META_ETAG: &str = "etag";
pub const META_STORAGE_CLASS: &str = "x-oss-storage-class";

/// Failure reported by an `ObjectClient` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OssError {
    pub message: String,
    pub status: Option<u16>,
}

impl OssError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

impl fmt::Display for OssError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (status {})", self.message, status),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for OssError {}

/// Request headers forwarded with put and copy calls.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectOptions {
    pub content_type: Option<String>,
    pub headers: BTreeMap<String, String>,
}

impl ObjectOptions {
    pub fn acl(&self) -> Option<&str> {
        self.headers.get(HEADER_OBJECT_ACL).map(String::as_str)
    }
}

/// One page request of a `ListObjects` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListObjectsRequest {
    pub prefix: String,
    pub delimiter: String,
    pub max_keys: u32,
    pub marker: String,
}

/// One object row of a list response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub last_modified: String,
    pub etag: String,
    pub size: u64,
    pub storage_class: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListObjectsPage {
    pub objects: Vec<ObjectInfo>,
    pub prefixes: Vec<String>,
    /// Empty or `None` once the listing is exhausted.
    pub next_marker: Option<String>,
}

impl ListObjectsPage {
    pub fn next_marker(&self) -> Option<&str> {
        self.next_marker.as_deref().filter(|marker| !marker.is_empty())
    }
}

/// An object row tagged with the directory it was listed under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListedObject {
    pub dirname: String,
    pub info: ObjectInfo,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListingResult {
    pub objects: Vec<ListedObject>,
    pub prefixes: Vec<String>,
}

/// Raw metadata headers of a single object, keyed by lowercase header name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectMeta {
    headers: BTreeMap<String, String>,
}

impl ObjectMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignMethod {
    Get,
    Put,
    Head,
    Delete,
}

impl SignMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignMethod::Get => "GET",
            SignMethod::Put => "PUT",
            SignMethod::Head => "HEAD",
            SignMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for SignMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_marker() {
        let cases = vec![
            (None, None),
            (Some("".to_string()), None),
            (Some("a/b".to_string()), Some("a/b")),
        ];

        for (marker, expected) in cases {
            let page = ListObjectsPage {
                next_marker: marker.clone(),
                ..Default::default()
            };
            assert_eq!(page.next_marker(), expected, "failed for case: {:?}", marker);
        }
    }

    #[test]
    fn test_meta_lookup_is_case_insensitive() {
        let meta = ObjectMeta::new()
            .with("Content-Length", "9")
            .with("ETag", "\"abc\"");

        assert_eq!(meta.get("content-length"), Some("9"));
        assert_eq!(meta.get(META_ETAG), Some("\"abc\""));
        assert_eq!(meta.get(META_CONTENT_TYPE), None);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(OssError::new("boom").to_string(), "boom");
        assert_eq!(
            OssError::with_status("missing", 404).to_string(),
            "missing (status 404)"
        );
        assert!(OssError::with_status("missing", 404).is_not_found());
        assert!(!OssError::new("boom").is_not_found());
    }
}
