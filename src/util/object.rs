use crate::error::FilesystemError;

pub const SCHEME: &str = "oss://";

/// Bucket and root prefix parsed from an `oss://bucket/prefix` location.
#[derive(Debug, PartialEq, Eq)]
pub struct Location {
    pub bucket: String,
    pub prefix: String,
}

pub fn parse_location(uri: &str) -> Result<Location, FilesystemError> {
    let rest = uri.strip_prefix(SCHEME).ok_or_else(|| {
        FilesystemError::UnsupportedOption(format!("failed to parse location of: {}", uri))
    })?;

    let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
    if bucket.is_empty() {
        return Err(FilesystemError::UnsupportedOption(format!(
            "missing bucket in location: {}",
            uri
        )));
    }

    Ok(Location {
        bucket: bucket.to_string(),
        prefix: prefix.to_string(),
    })
}
