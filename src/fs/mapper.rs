use std::collections::BTreeMap;

use time::{
    format_description::well_known::{Rfc2822, Rfc3339},
    OffsetDateTime,
};

use crate::{
    model::{
        fs::{DirectoryAttributes, FileAttributes, StorageAttributes},
        oss::{
            ObjectInfo, ObjectMeta, META_CONTENT_LENGTH, META_CONTENT_TYPE, META_ETAG,
            META_LAST_MODIFIED, META_STORAGE_CLASS,
        },
    },
    util::path,
};

/// Provider fields copied into `FileAttributes::extra_metadata` when present.
pub const EXTRA_METADATA_FIELDS: &[&str] = &[META_STORAGE_CLASS, META_ETAG];

/// Common view over a list row and a HEAD response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawMetadata<'a> {
    pub content_length: Option<&'a str>,
    pub size: Option<u64>,
    pub last_modified: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub etag: Option<&'a str>,
    pub storage_class: Option<&'a str>,
}

fn non_empty(value: &str) -> Option<&str> {
    Some(value).filter(|value| !value.is_empty())
}

impl<'a> From<&'a ObjectInfo> for RawMetadata<'a> {
    fn from(info: &'a ObjectInfo) -> Self {
        Self {
            content_length: None,
            size: Some(info.size),
            last_modified: non_empty(&info.last_modified),
            content_type: None,
            etag: non_empty(&info.etag),
            storage_class: non_empty(&info.storage_class),
        }
    }
}

impl<'a> From<&'a ObjectMeta> for RawMetadata<'a> {
    fn from(meta: &'a ObjectMeta) -> Self {
        Self {
            content_length: meta.get(META_CONTENT_LENGTH),
            size: None,
            last_modified: meta.get(META_LAST_MODIFIED),
            content_type: meta.get(META_CONTENT_TYPE),
            etag: meta.get(META_ETAG),
            storage_class: meta.get(META_STORAGE_CLASS),
        }
    }
}

impl<'a> RawMetadata<'a> {
    fn extra_field(&self, name: &str) -> Option<&'a str> {
        let value = match name {
            META_STORAGE_CLASS => self.storage_class,
            META_ETAG => self.etag,
            _ => None,
        };
        value.and_then(non_empty)
    }
}

/// Maps raw metadata for the logical `path`. A delimiter-terminated path is always a
/// directory, whatever the other fields say.
pub fn map_object_metadata(path: &str, raw: &RawMetadata<'_>) -> StorageAttributes {
    if path::is_directory_key(path) {
        return StorageAttributes::Directory(DirectoryAttributes {
            path: path::trim_delimiter(path).to_string(),
        });
    }

    let size = raw
        .content_length
        .and_then(|length| length.trim().parse::<u64>().ok())
        .or(raw.size);

    let extra_metadata: BTreeMap<String, String> = EXTRA_METADATA_FIELDS
        .iter()
        .filter_map(|name| {
            raw.extra_field(name)
                .map(|value| (name.to_string(), value.to_string()))
        })
        .collect();

    StorageAttributes::File(FileAttributes {
        path: path.to_string(),
        size,
        last_modified: raw.last_modified.and_then(parse_timestamp),
        mime_type: raw.content_type.and_then(non_empty).map(str::to_string),
        extra_metadata,
    })
}

/// Unix seconds from an RFC 3339 (list responses) or RFC 2822 / HTTP date (HEAD
/// responses) timestamp.
pub fn parse_timestamp(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(dt) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(dt.unix_timestamp());
    }

    let value = match value
        .strip_suffix(" GMT")
        .or_else(|| value.strip_suffix(" UTC"))
    {
        Some(stripped) => format!("{} +0000", stripped),
        None => value.to_string(),
    };

    OffsetDateTime::parse(&value, &Rfc2822)
        .ok()
        .map(|dt| dt.unix_timestamp())
}
