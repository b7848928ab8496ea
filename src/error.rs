use std::fmt;

use thiserror::Error;

use crate::model::oss::OssError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetadataKind {
    Metadata,
    FileSize,
    MimeType,
    LastModified,
    Visibility,
    Checksum,
}

impl fmt::Display for MetadataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetadataKind::Metadata => "metadata",
            MetadataKind::FileSize => "file_size",
            MetadataKind::MimeType => "mime_type",
            MetadataKind::LastModified => "last_modified",
            MetadataKind::Visibility => "visibility",
            MetadataKind::Checksum => "checksum",
        };
        f.write_str(name)
    }
}

/// Failure of a filesystem operation. Provider failures keep the `OssError` as their source.
#[derive(Debug, Error)]
pub enum FilesystemError {
    #[error("unable to write file at location: {path}. {source}")]
    UnableToWriteFile { path: String, source: OssError },

    #[error("unable to read file from location: {path}. {source}")]
    UnableToReadFile { path: String, source: OssError },

    #[error("unable to delete file located at: {path}. {source}")]
    UnableToDeleteFile { path: String, source: OssError },

    #[error("unable to delete directory located at: {path}. {source}")]
    UnableToDeleteDirectory { path: String, source: OssError },

    #[error("unable to create a directory at {path}. {source}")]
    UnableToCreateDirectory { path: String, source: OssError },

    #[error("unable to copy file from {from} to {to}. {source}")]
    UnableToCopyFile {
        from: String,
        to: String,
        source: OssError,
    },

    #[error("unable to move file from {from} to {to}. {source}")]
    UnableToMoveFile {
        from: String,
        to: String,
        source: Box<FilesystemError>,
    },

    #[error("unable to retrieve the {kind} for file at location: {path}. {reason}")]
    UnableToRetrieveMetadata {
        path: String,
        kind: MetadataKind,
        reason: String,
        #[source]
        source: Option<OssError>,
    },

    #[error("unable to set visibility for file {path}. {source}")]
    UnableToSetVisibility { path: String, source: OssError },

    #[error("unable to check existence for: {path}. {source}")]
    UnableToCheckExistence { path: String, source: OssError },

    #[error("unable to list contents of: {path}. {source}")]
    UnableToListContents { path: String, source: OssError },

    #[error("unable to generate url for: {path}. {source}")]
    UnableToGenerateUrl { path: String, source: OssError },

    #[error("unable to get url: {0}")]
    UnableToGetUrl(String),

    #[error("unsupported option: {0}")]
    UnsupportedOption(String),
}

impl FilesystemError {
    pub fn missing_option(option: &str) -> Self {
        FilesystemError::UnableToGetUrl(format!("option {} is missing", option))
    }

    pub fn metadata_unavailable(path: &str, kind: MetadataKind, source: OssError) -> Self {
        FilesystemError::UnableToRetrieveMetadata {
            path: path.to_string(),
            kind,
            reason: source.to_string(),
            source: Some(source),
        }
    }

    pub fn metadata_missing(path: &str, kind: MetadataKind) -> Self {
        FilesystemError::UnableToRetrieveMetadata {
            path: path.to_string(),
            kind,
            reason: format!("the {} is not present in the object metadata", kind),
            source: None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FilesystemError>;
