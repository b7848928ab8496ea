use std::{collections::BTreeMap, fmt, str::FromStr};

use time::OffsetDateTime;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            other => Err(format!("unknown visibility: {}", other)),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileAttributes {
    pub path: String,
    pub size: Option<u64>,
    /// Unix timestamp in seconds.
    pub last_modified: Option<i64>,
    pub mime_type: Option<String>,
    pub extra_metadata: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryAttributes {
    pub path: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageAttributes {
    File(FileAttributes),
    Directory(DirectoryAttributes),
}

impl StorageAttributes {
    pub fn path(&self) -> &str {
        match self {
            StorageAttributes::File(file) => &file.path,
            StorageAttributes::Directory(dir) => &dir.path,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, StorageAttributes::File(_))
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, StorageAttributes::Directory(_))
    }

    pub fn as_file(&self) -> Option<&FileAttributes> {
        match self {
            StorageAttributes::File(file) => Some(file),
            StorageAttributes::Directory(_) => None,
        }
    }
}

/// Lifetime of a signed URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expiration {
    Seconds(u64),
    At(OffsetDateTime),
}

impl Expiration {
    /// Seconds from now; an instant in the past yields zero.
    pub fn as_seconds(&self) -> u64 {
        match self {
            Expiration::Seconds(secs) => *secs,
            Expiration::At(at) => (*at - OffsetDateTime::now_utc()).whole_seconds().max(0) as u64,
        }
    }
}

impl From<u64> for Expiration {
    fn from(secs: u64) -> Self {
        Expiration::Seconds(secs)
    }
}

impl From<OffsetDateTime> for Expiration {
    fn from(at: OffsetDateTime) -> Self {
        Expiration::At(at)
    }
}
