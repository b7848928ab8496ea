use std::{
    collections::BTreeSet,
    io::{Cursor, Read},
    sync::Arc,
};

use tracing::{error, info, span, warn, Level};

use crate::{
    adapters::ObjectClient,
    config::{AdapterOptions, WriteConfig},
    error::{FilesystemError, MetadataKind, Result},
    filesystem::{ChecksumProvider, FilesystemAdapter},
    model::{
        fs::{DirectoryAttributes, FileAttributes, StorageAttributes, Visibility},
        oss::{ObjectOptions, HEADER_CONTENT_TYPE, HEADER_OBJECT_ACL, META_ETAG},
    },
    util::{path, prefixer::PathPrefixer},
    visibility::PortableVisibilityConverter,
};

pub mod lister;
pub mod mapper;
pub mod urls;

use mapper::RawMetadata;

/// Checksum algorithm answered from the object's ETag.
pub const CHECKSUM_ETAG: &str = "etag";

/// Directories between `directory` and `path` that a deep listing implies but may
/// not hold a marker for, outermost first. `path` itself is not included.
fn implied_directories(directory: &str, path: &str) -> Vec<String> {
    let path = path::trim_delimiter(path);
    let rest = if directory.is_empty() {
        path
    } else {
        match path
            .strip_prefix(directory)
            .and_then(|rest| rest.strip_prefix(path::DELIMITER))
        {
            Some(rest) => rest,
            None => return Vec::new(),
        }
    };

    let base = path.len() - rest.len();
    rest.match_indices(path::DELIMITER)
        .map(|(pos, _)| path[..base + pos].to_string())
        .collect()
}

enum Body<'a> {
    Bytes(&'a [u8]),
    Stream(&'a mut dyn Read),
}

/// Filesystem view of one OSS bucket, rooted at an optional key prefix.
pub struct OssAdapter {
    client: Arc<dyn ObjectClient>,
    bucket: String,
    prefixer: PathPrefixer,
    options: AdapterOptions,
    visibility: PortableVisibilityConverter,
}

impl OssAdapter {
    pub fn new(
        client: Arc<dyn ObjectClient>,
        bucket: &str,
        prefix: &str,
        options: AdapterOptions,
    ) -> Self {
        let visibility = PortableVisibilityConverter::new(options.default_visibility);

        Self {
            client,
            bucket: bucket.to_string(),
            prefixer: PathPrefixer::new(prefix),
            options,
            visibility,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Points every later call at `bucket`. Calls already running keep the old one.
    pub fn set_bucket(&mut self, bucket: &str) {
        info!(from = %self.bucket, to = bucket, "switching bucket");
        self.bucket = bucket.to_string();
    }

    pub fn client(&self) -> &dyn ObjectClient {
        self.client.as_ref()
    }

    pub fn prefixer(&self) -> &PathPrefixer {
        &self.prefixer
    }

    pub fn options(&self) -> &AdapterOptions {
        &self.options
    }

    /// True when `path` exists as an object, or as a directory marker `path/`.
    pub fn has(&self, path: &str) -> Result<bool> {
        let span = span!(Level::INFO, "has", context = "has");
        let _e = span.enter();
        info!(path = path, "called");

        let key = self.prefixer.prefix_path(path);
        let exists = |key: &str| {
            self.client
                .does_object_exist(&self.bucket, key)
                .map_err(|err| {
                    error!(error_message = %err, error_group = "does_object_exist");
                    FilesystemError::UnableToCheckExistence {
                        path: path.to_string(),
                        source: err,
                    }
                })
        };

        if exists(&key)? {
            return Ok(true);
        }

        exists(&format!("{}/", path::trim_delimiter(&key)))
    }

    /// File or directory attributes from a single HEAD call.
    pub fn metadata(&self, path: &str) -> Result<StorageAttributes> {
        let key = self.prefixer.prefix_path(path);
        let meta = self
            .client
            .get_object_meta(&self.bucket, &key)
            .map_err(|err| {
                error!(error_message = %err, error_group = "get_object_meta");
                FilesystemError::metadata_unavailable(path, MetadataKind::Metadata, err)
            })?;

        Ok(mapper::map_object_metadata(
            &self.prefixer.strip_prefix(&key),
            &RawMetadata::from(&meta),
        ))
    }

    /// Overwrites `path`; the same call as `write`.
    pub fn update(&self, path: &str, contents: &[u8], config: &WriteConfig) -> Result<()> {
        self.write(path, contents, config)
    }

    pub fn update_stream(
        &self,
        path: &str,
        contents: &mut dyn Read,
        config: &WriteConfig,
    ) -> Result<()> {
        self.write_stream(path, contents, config)
    }

    fn fetch_file_metadata(&self, path: &str, kind: MetadataKind) -> Result<FileAttributes> {
        let key = self.prefixer.prefix_path(path);
        let meta = self
            .client
            .get_object_meta(&self.bucket, &key)
            .map_err(|err| {
                error!(error_message = %err, error_group = "get_object_meta");
                FilesystemError::metadata_unavailable(path, kind, err)
            })?;

        match mapper::map_object_metadata(path, &RawMetadata::from(&meta)) {
            StorageAttributes::File(attributes) => Ok(attributes),
            StorageAttributes::Directory(_) => Err(FilesystemError::metadata_missing(path, kind)),
        }
    }

    /// Request options for a put. The content type comes from the config, then the
    /// `Content-Type` header, then a guess from the path when there is content. The
    /// ACL header follows the requested visibility unless it was set explicitly.
    fn create_options_from_config(
        &self,
        path: &str,
        has_contents: bool,
        config: &WriteConfig,
        visibility: Option<Visibility>,
    ) -> ObjectOptions {
        let content_type = config.content_type().map(str::to_string).or_else(|| {
            has_contents
                .then(|| mime_guess::from_path(path).first_raw())
                .flatten()
                .map(str::to_string)
        });

        let mut headers = config.headers().clone();
        headers.remove(HEADER_CONTENT_TYPE);

        if !headers.contains_key(HEADER_OBJECT_ACL) {
            if let Some(visibility) = visibility {
                headers.insert(
                    HEADER_OBJECT_ACL.to_string(),
                    self.visibility.visibility_to_acl(visibility).to_string(),
                );
            }
        }

        ObjectOptions {
            content_type,
            headers,
        }
    }

    fn upload(&self, path: &str, body: Body<'_>, config: &WriteConfig) -> Result<()> {
        let key = self.prefixer.prefix_path(path);
        let has_contents = match &body {
            Body::Bytes(bytes) => !bytes.is_empty(),
            Body::Stream(_) => true,
        };
        let options =
            self.create_options_from_config(path, has_contents, config, config.visibility);

        let result = match body {
            Body::Bytes(bytes) => self
                .client
                .put_object(&self.bucket, &key, bytes.to_vec(), &options),
            Body::Stream(stream) => self
                .client
                .upload_stream(&self.bucket, &key, stream, &options),
        };

        result.map_err(|err| {
            error!(error_message = %err, error_group = "put_object");
            FilesystemError::UnableToWriteFile {
                path: path.to_string(),
                source: err,
            }
        })
    }

    fn copy_acl(
        &self,
        source: &str,
        destination: &str,
        config: &WriteConfig,
    ) -> Result<Option<String>> {
        if let Some(visibility) = config.visibility {
            return Ok(Some(self.visibility.visibility_to_acl(visibility).to_string()));
        }
        if !self.options.retain_visibility {
            return Ok(None);
        }

        let acl = self
            .client
            .get_object_acl(&self.bucket, &self.prefixer.prefix_path(source))
            .map_err(|err| {
                error!(error_message = %err, error_group = "get_object_acl");
                FilesystemError::UnableToCopyFile {
                    from: source.to_string(),
                    to: destination.to_string(),
                    source: err,
                }
            })?;
        let visibility = self.visibility.acl_to_visibility(&acl);

        Ok(Some(self.visibility.visibility_to_acl(visibility).to_string()))
    }
}

impl FilesystemAdapter for OssAdapter {
    fn file_exists(&self, path: &str) -> Result<bool> {
        let span = span!(Level::INFO, "file_exists", context = "file_exists");
        let _e = span.enter();
        info!(path = path, "called");

        self.client
            .does_object_exist(&self.bucket, &self.prefixer.prefix_path(path))
            .map_err(|err| {
                error!(error_message = %err, error_group = "does_object_exist");
                FilesystemError::UnableToCheckExistence {
                    path: path.to_string(),
                    source: err,
                }
            })
    }

    fn directory_exists(&self, path: &str) -> Result<bool> {
        let span = span!(Level::INFO, "directory_exists", context = "directory_exists");
        let _e = span.enter();
        info!(path = path, "called");

        self.probe_directory(path).map_err(|err| {
            error!(error_message = %err, error_group = "list_objects");
            FilesystemError::UnableToCheckExistence {
                path: path.to_string(),
                source: err,
            }
        })
    }

    fn write(&self, path: &str, contents: &[u8], config: &WriteConfig) -> Result<()> {
        let span = span!(Level::INFO, "write", context = "write");
        let _e = span.enter();
        info!(path = path, size = contents.len(), "called");

        self.upload(path, Body::Bytes(contents), config)
    }

    fn write_stream(
        &self,
        path: &str,
        contents: &mut dyn Read,
        config: &WriteConfig,
    ) -> Result<()> {
        let span = span!(Level::INFO, "write_stream", context = "write_stream");
        let _e = span.enter();
        info!(path = path, "called");

        self.upload(path, Body::Stream(contents), config)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let span = span!(Level::INFO, "read", context = "read");
        let _e = span.enter();
        info!(path = path, "called");

        self.client
            .get_object(&self.bucket, &self.prefixer.prefix_path(path))
            .map_err(|err| {
                error!(error_message = %err, error_group = "get_object");
                FilesystemError::UnableToReadFile {
                    path: path.to_string(),
                    source: err,
                }
            })
    }

    fn read_stream(&self, path: &str) -> Result<Box<dyn Read + Send>> {
        let span = span!(Level::INFO, "read_stream", context = "read_stream");
        let _e = span.enter();
        info!(path = path, "called");

        let mut buf = Vec::new();
        self.client
            .get_object_to(&self.bucket, &self.prefixer.prefix_path(path), &mut buf)
            .map_err(|err| {
                error!(error_message = %err, error_group = "get_object");
                FilesystemError::UnableToReadFile {
                    path: path.to_string(),
                    source: err,
                }
            })?;

        Ok(Box::new(Cursor::new(buf)))
    }

    fn delete(&self, path: &str) -> Result<()> {
        let span = span!(Level::INFO, "delete", context = "delete");
        let _e = span.enter();
        info!(path = path, "called");

        self.client
            .delete_object(&self.bucket, &self.prefixer.prefix_path(path))
            .map_err(|err| {
                error!(error_message = %err, error_group = "delete_object");
                FilesystemError::UnableToDeleteFile {
                    path: path.to_string(),
                    source: err,
                }
            })
    }

    fn delete_directory(&self, path: &str) -> Result<()> {
        let span = span!(Level::INFO, "delete_directory", context = "delete_directory");
        let _e = span.enter();
        info!(path = path, "called");

        let to_error = |err| FilesystemError::UnableToDeleteDirectory {
            path: path.to_string(),
            source: err,
        };

        let listing = self.list_dir_objects(path, true).map_err(|err| {
            error!(error_message = %err, error_group = "list_objects");
            to_error(err)
        })?;

        let keys: Vec<String> = listing
            .objects
            .into_iter()
            .map(|object| object.info.key)
            .collect();
        if keys.is_empty() {
            warn!(path = path, "nothing to delete");
            return Ok(());
        }

        self.delete_keys(&keys).map_err(|err| {
            error!(error_message = %err, error_group = "delete_objects");
            to_error(err)
        })
    }

    fn create_directory(&self, path: &str, config: &WriteConfig) -> Result<()> {
        let span = span!(Level::INFO, "create_directory", context = "create_directory");
        let _e = span.enter();
        info!(path = path, "called");

        let key = self.prefixer.prefix_directory_path(path);
        let visibility = config.directory_visibility.or(config.visibility);
        let options = self.create_options_from_config(&key, false, config, visibility);

        self.client
            .put_object(&self.bucket, &key, Vec::new(), &options)
            .map_err(|err| {
                error!(error_message = %err, error_group = "put_object");
                FilesystemError::UnableToCreateDirectory {
                    path: path.to_string(),
                    source: err,
                }
            })
    }

    fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<()> {
        let span = span!(Level::INFO, "set_visibility", context = "set_visibility");
        let _e = span.enter();
        info!(path = path, visibility = %visibility, "called");

        let acl = self.visibility.visibility_to_acl(visibility);
        self.client
            .put_object_acl(&self.bucket, &self.prefixer.prefix_path(path), acl)
            .map_err(|err| {
                error!(error_message = %err, error_group = "put_object_acl");
                FilesystemError::UnableToSetVisibility {
                    path: path.to_string(),
                    source: err,
                }
            })
    }

    fn visibility(&self, path: &str) -> Result<Visibility> {
        let span = span!(Level::INFO, "visibility", context = "visibility");
        let _e = span.enter();
        info!(path = path, "called");

        let acl = self
            .client
            .get_object_acl(&self.bucket, &self.prefixer.prefix_path(path))
            .map_err(|err| {
                error!(error_message = %err, error_group = "get_object_acl");
                FilesystemError::metadata_unavailable(path, MetadataKind::Visibility, err)
            })?;

        Ok(self.visibility.acl_to_visibility(&acl))
    }

    fn mime_type(&self, path: &str) -> Result<String> {
        self.fetch_file_metadata(path, MetadataKind::MimeType)?
            .mime_type
            .ok_or_else(|| FilesystemError::metadata_missing(path, MetadataKind::MimeType))
    }

    fn last_modified(&self, path: &str) -> Result<i64> {
        self.fetch_file_metadata(path, MetadataKind::LastModified)?
            .last_modified
            .ok_or_else(|| FilesystemError::metadata_missing(path, MetadataKind::LastModified))
    }

    fn file_size(&self, path: &str) -> Result<u64> {
        self.fetch_file_metadata(path, MetadataKind::FileSize)?
            .size
            .ok_or_else(|| FilesystemError::metadata_missing(path, MetadataKind::FileSize))
    }

    fn list_contents(&self, path: &str, deep: bool) -> Result<Vec<StorageAttributes>> {
        let span = span!(Level::INFO, "list_contents", context = "list_contents");
        let _e = span.enter();
        info!(path = path, deep = deep, "called");

        let directory = path::normalize(path);
        let directory = path::trim_delimiter(&directory);
        let listing = self.list_dir_objects(directory, deep).map_err(|err| {
            error!(error_message = %err, error_group = "list_objects");
            FilesystemError::UnableToListContents {
                path: path.to_string(),
                source: err,
            }
        })?;

        let mut contents = Vec::with_capacity(listing.objects.len() + listing.prefixes.len());
        let mut directories = BTreeSet::new();
        let mut implied = Vec::new();
        for object in &listing.objects {
            let logical = self.prefixer.strip_prefix(&object.info.key);
            if path::trim_delimiter(&logical) == directory {
                continue;
            }
            if deep {
                implied.extend(implied_directories(directory, &logical));
            }

            let attributes =
                mapper::map_object_metadata(&logical, &RawMetadata::from(&object.info));
            if attributes.is_dir() && !directories.insert(attributes.path().to_string()) {
                continue;
            }
            contents.push(attributes);
        }

        let prefixes = listing
            .prefixes
            .iter()
            .map(|prefix| self.prefixer.strip_directory_prefix(prefix));
        for dir in prefixes.chain(implied) {
            if directories.insert(dir.clone()) {
                contents.push(StorageAttributes::Directory(DirectoryAttributes { path: dir }));
            }
        }

        Ok(contents)
    }

    fn move_file(&self, source: &str, destination: &str, config: &WriteConfig) -> Result<()> {
        let span = span!(Level::INFO, "move_file", context = "move_file");
        let _e = span.enter();
        info!(source = source, destination = destination, "called");

        if path::normalize(source) == path::normalize(destination) {
            return Ok(());
        }

        let to_error = |err| FilesystemError::UnableToMoveFile {
            from: source.to_string(),
            to: destination.to_string(),
            source: Box::new(err),
        };

        self.copy(source, destination, config).map_err(to_error)?;
        self.delete(source).map_err(|err| {
            warn!(
                source = source,
                destination = destination,
                "copied but failed to delete source"
            );
            to_error(err)
        })
    }

    fn copy(&self, source: &str, destination: &str, config: &WriteConfig) -> Result<()> {
        let span = span!(Level::INFO, "copy", context = "copy");
        let _e = span.enter();
        info!(source = source, destination = destination, "called");

        let mut options = ObjectOptions::default();
        if let Some(acl) = self.copy_acl(source, destination, config)? {
            options.headers.insert(HEADER_OBJECT_ACL.to_string(), acl);
        }

        self.client
            .copy_object(
                &self.bucket,
                &self.prefixer.prefix_path(source),
                &self.bucket,
                &self.prefixer.prefix_path(destination),
                &options,
            )
            .map_err(|err| {
                error!(error_message = %err, error_group = "copy_object");
                FilesystemError::UnableToCopyFile {
                    from: source.to_string(),
                    to: destination.to_string(),
                    source: err,
                }
            })
    }
}

impl ChecksumProvider for OssAdapter {
    /// Only `etag` is served; it is the provider ETag without quotes, not a content
    /// digest for multipart uploads.
    fn checksum(&self, path: &str, algorithm: &str) -> Result<String> {
        if !algorithm.eq_ignore_ascii_case(CHECKSUM_ETAG) {
            return Err(FilesystemError::UnsupportedOption(format!(
                "checksum algorithm {}",
                algorithm
            )));
        }

        let meta = self
            .client
            .get_object_meta(&self.bucket, &self.prefixer.prefix_path(path))
            .map_err(|err| {
                error!(error_message = %err, error_group = "get_object_meta");
                FilesystemError::metadata_unavailable(path, MetadataKind::Checksum, err)
            })?;

        meta.get(META_ETAG)
            .map(|etag| etag.trim_matches('"'))
            .filter(|etag| !etag.is_empty())
            .map(str::to_string)
            .ok_or_else(|| FilesystemError::metadata_missing(path, MetadataKind::Checksum))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use crate::{
        adapters::{memory::MemoryClient, mock::MockClient},
        model::oss::{ListObjectsPage, ObjectInfo, ObjectMeta, ACL_PRIVATE, ACL_PUBLIC_READ},
    };

    fn memory_adapter(prefix: &str, options: AdapterOptions) -> (Arc<MemoryClient>, OssAdapter) {
        let client = Arc::new(MemoryClient::new());
        let adapter = OssAdapter::new(client.clone(), "test", prefix, options);
        (client, adapter)
    }

    fn write(adapter: &OssAdapter, path: &str, contents: &str) {
        adapter
            .write(path, contents.as_bytes(), &WriteConfig::new())
            .unwrap();
    }

    #[test]
    fn test_write_read_round_trip() {
        let (client, adapter) = memory_adapter("root", AdapterOptions::default());
        write(&adapter, "fixture/read.txt", "read-test");

        assert_eq!(client.keys("test"), vec!["root/fixture/read.txt"]);
        assert_eq!(adapter.read("fixture/read.txt").unwrap(), b"read-test");

        let mut buf = String::new();
        adapter
            .read_stream("fixture/read.txt")
            .unwrap()
            .read_to_string(&mut buf)
            .unwrap();
        assert_eq!(buf, "read-test");
    }

    #[test]
    fn test_write_stream() {
        let (_, adapter) = memory_adapter("", AdapterOptions::default());
        let mut body = Cursor::new(b"streamed".to_vec());

        adapter
            .write_stream("stream.bin", &mut body, &WriteConfig::new())
            .unwrap();
        adapter
            .update_stream("stream.bin", &mut Cursor::new(b"again".to_vec()), &WriteConfig::new())
            .unwrap();

        assert_eq!(adapter.read("stream.bin").unwrap(), b"again");
        assert_eq!(adapter.file_size("stream.bin").unwrap(), 5);
    }

    #[test]
    fn test_mime_type_resolution() {
        let cases = vec![
            ("a.txt", "abc", WriteConfig::new(), Some("text/plain")),
            ("a.json", "{}", WriteConfig::new(), Some("application/json")),
            ("a.txt", "", WriteConfig::new(), None),
            ("noext", "abc", WriteConfig::new(), None),
            (
                "a.txt",
                "abc",
                WriteConfig::new().with_mime_type("application/custom"),
                Some("application/custom"),
            ),
            (
                "a.txt",
                "abc",
                WriteConfig::new()
                    .with_header("content-type", "text/csv")
                    .unwrap(),
                Some("text/csv"),
            ),
        ];

        for (path, contents, config, expected) in cases {
            let (_, adapter) = memory_adapter("", AdapterOptions::default());
            adapter.write(path, contents.as_bytes(), &config).unwrap();

            let mime_type = adapter.mime_type(path).ok();
            assert_eq!(mime_type.as_deref(), expected, "failed for case: {}", path);
        }
    }

    #[test]
    fn test_missing_mime_type_reports_kind() {
        let (_, adapter) = memory_adapter("", AdapterOptions::default());
        write(&adapter, "noext", "abc");

        let err = adapter.mime_type("noext").unwrap_err();
        assert!(matches!(
            err,
            FilesystemError::UnableToRetrieveMetadata {
                kind: MetadataKind::MimeType,
                source: None,
                ..
            }
        ));
    }

    #[test]
    fn test_write_visibility_and_explicit_acl_header() {
        let (_, adapter) = memory_adapter("", AdapterOptions::default());

        adapter
            .write(
                "private.txt",
                b"x",
                &WriteConfig::new().with_visibility(Visibility::Private),
            )
            .unwrap();
        adapter
            .write(
                "explicit.txt",
                b"x",
                &WriteConfig::new()
                    .with_visibility(Visibility::Private)
                    .with_header("x-oss-object-acl", ACL_PUBLIC_READ)
                    .unwrap(),
            )
            .unwrap();
        write(&adapter, "default.txt", "x");

        let cases = vec![
            ("private.txt", Visibility::Private),
            ("explicit.txt", Visibility::Public),
            ("default.txt", Visibility::Public),
        ];
        for (path, expected) in cases {
            assert_eq!(adapter.visibility(path).unwrap(), expected, "failed for case: {}", path);
        }
    }

    #[test]
    fn test_set_visibility() {
        let (_, adapter) = memory_adapter("", AdapterOptions::default());
        write(&adapter, "file.txt", "x");

        adapter.set_visibility("file.txt", Visibility::Private).unwrap();
        assert_eq!(adapter.visibility("file.txt").unwrap(), Visibility::Private);

        adapter.set_visibility("file.txt", Visibility::Public).unwrap();
        assert_eq!(adapter.visibility("file.txt").unwrap(), Visibility::Public);

        let err = adapter.set_visibility("missing.txt", Visibility::Public).unwrap_err();
        assert!(matches!(err, FilesystemError::UnableToSetVisibility { .. }));
    }

    #[test]
    fn test_create_directory_and_exists() {
        let (client, adapter) = memory_adapter("root", AdapterOptions::default());

        adapter
            .create_directory(
                "a/b",
                &WriteConfig::new().with_directory_visibility(Visibility::Private),
            )
            .unwrap();

        assert_eq!(client.keys("test"), vec!["root/a/b/"]);
        assert!(adapter.directory_exists("a/b").unwrap());
        assert!(adapter.directory_exists("a/b/").unwrap());
        assert!(!adapter.directory_exists("a").unwrap());
        assert!(!adapter.file_exists("a/b").unwrap());
        assert!(adapter.has("a/b").unwrap());
        assert!(!adapter.has("a/c").unwrap());
        assert_eq!(adapter.visibility("a/b/").unwrap(), Visibility::Private);
    }

    #[test]
    fn test_has_prefers_bare_key() {
        let (_, adapter) = memory_adapter("", AdapterOptions::default());
        write(&adapter, "dup", "file");
        adapter.create_directory("dup", &WriteConfig::new()).unwrap();

        assert!(adapter.has("dup").unwrap());
        assert!(adapter.file_exists("dup").unwrap());
        assert!(adapter.directory_exists("dup").unwrap());
    }

    #[test]
    fn test_metadata_of_directory_marker() {
        let (client, adapter) = memory_adapter("", AdapterOptions::default());
        client
            .put_object("test", "path/", b"not-empty".to_vec(), &ObjectOptions::default())
            .unwrap();

        assert_eq!(
            adapter.metadata("path/").unwrap(),
            StorageAttributes::Directory(DirectoryAttributes {
                path: "path".to_string()
            })
        );
    }

    #[test]
    fn test_metadata_of_file() {
        let (_, adapter) = memory_adapter("root", AdapterOptions::default());
        write(&adapter, "a/file.txt", "hello");

        let attributes = adapter.metadata("a/file.txt").unwrap();
        let file = attributes.as_file().unwrap();
        assert_eq!(file.path, "a/file.txt");
        assert_eq!(file.size, Some(5));
        assert_eq!(file.mime_type.as_deref(), Some("text/plain"));
        assert!(file.last_modified.is_some());
        assert!(adapter.last_modified("a/file.txt").unwrap() > 0);
    }

    #[test]
    fn test_file_size_missing_from_metadata() {
        let adapter = OssAdapter::new(
            Arc::new(MockClient::new()),
            "test",
            "",
            AdapterOptions::default(),
        );

        let cases = vec![
            MetadataKind::FileSize,
            MetadataKind::MimeType,
            MetadataKind::LastModified,
        ];
        for expected in cases {
            let err = match expected {
                MetadataKind::FileSize => adapter.file_size("f").map(|_| ()),
                MetadataKind::MimeType => adapter.mime_type("f").map(|_| ()),
                _ => adapter.last_modified("f").map(|_| ()),
            }
            .unwrap_err();

            assert!(
                matches!(err, FilesystemError::UnableToRetrieveMetadata { kind, .. } if kind == expected),
                "failed for case: {}",
                expected
            );
        }
    }

    #[test]
    fn test_metadata_failure_keeps_source() {
        let (client, adapter) = memory_adapter("", AdapterOptions::default());
        client.fail_on("get_object_meta", "f.txt");

        let err = adapter.file_size("f.txt").unwrap_err();
        assert!(matches!(
            err,
            FilesystemError::UnableToRetrieveMetadata {
                kind: MetadataKind::FileSize,
                source: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn test_list_contents_with_mock_pages() {
        let client = Arc::new(MockClient::with_pages(vec![Ok(ListObjectsPage {
            objects: vec![
                ObjectInfo {
                    key: "a/".to_string(),
                    last_modified: "2021-05-31T06:52:31.942Z".to_string(),
                    ..Default::default()
                },
                ObjectInfo {
                    key: "a/file.txt".to_string(),
                    last_modified: "2021-05-31T06:52:31.942Z".to_string(),
                    etag: "\"d41d8cd98f00b204e9800998ecf8427e\"".to_string(),
                    size: 9,
                    storage_class: "Standard".to_string(),
                },
            ],
            prefixes: vec!["a/b/".to_string()],
            next_marker: None,
        })]));
        let adapter = OssAdapter::new(client.clone(), "test", "", AdapterOptions::default());

        let contents = adapter.list_contents("a", true).unwrap();
        assert_eq!(contents.len(), 2);

        let file = contents[0].as_file().unwrap();
        assert_eq!(file.path, "a/file.txt");
        assert_eq!(file.size, Some(9));
        assert_eq!(file.last_modified, Some(1622443951));
        assert_eq!(
            contents[1],
            StorageAttributes::Directory(DirectoryAttributes {
                path: "a/b".to_string()
            })
        );

        let requests = client.list_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].prefix, "a/");
        assert_eq!(requests[0].delimiter, "");
    }

    #[test]
    fn test_list_contents_shallow_and_deep() {
        let (_, adapter) = memory_adapter("root", AdapterOptions::default());
        adapter.create_directory("a", &WriteConfig::new()).unwrap();
        write(&adapter, "a/1.txt", "1");
        write(&adapter, "a/b/2.txt", "2");
        write(&adapter, "c.txt", "3");

        let paths = |deep| {
            let mut paths: Vec<_> = adapter
                .list_contents("a", deep)
                .unwrap()
                .iter()
                .map(|entry| format!("{}:{}", entry.is_dir(), entry.path()))
                .collect();
            paths.sort();
            paths
        };

        assert_eq!(paths(false), vec!["false:a/1.txt", "true:a/b"]);
        assert_eq!(
            paths(true),
            vec!["false:a/1.txt", "false:a/b/2.txt", "true:a/b"]
        );

        let root: Vec<_> = adapter
            .list_contents("", false)
            .unwrap()
            .iter()
            .map(|entry| entry.path().to_string())
            .collect();
        assert_eq!(root, vec!["c.txt", "a"]);
    }

    #[test]
    fn test_deep_listing_reports_nested_directories() {
        let (_, adapter) = memory_adapter("", AdapterOptions::default());
        write(&adapter, "a/b/file.txt", "test");

        let contents = adapter.list_contents("a", true).unwrap();
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0].path(), "a/b/file.txt");
        assert!(contents[0].is_file());
        assert_eq!(
            contents[1],
            StorageAttributes::Directory(DirectoryAttributes {
                path: "a/b".to_string()
            })
        );
    }

    #[test]
    fn test_deep_listing_does_not_repeat_directories() {
        let (_, adapter) = memory_adapter("root", AdapterOptions::default());
        adapter.create_directory("a/b", &WriteConfig::new()).unwrap();
        write(&adapter, "a/b/c/f.txt", "x");
        write(&adapter, "a/b/c/g.txt", "y");

        let mut paths: Vec<_> = adapter
            .list_contents("a", true)
            .unwrap()
            .iter()
            .map(|entry| format!("{}:{}", entry.is_dir(), entry.path()))
            .collect();
        paths.sort();

        assert_eq!(
            paths,
            vec!["false:a/b/c/f.txt", "false:a/b/c/g.txt", "true:a/b", "true:a/b/c"]
        );
    }

    #[test]
    fn test_implied_directories() {
        let cases = vec![
            ("a", "a/file.txt", vec![]),
            ("a", "a/b/file.txt", vec!["a/b"]),
            ("a", "a/b/c/", vec!["a/b"]),
            ("", "x/y/z.txt", vec!["x", "x/y"]),
            ("a", "ab/c.txt", vec![]),
        ];

        for (directory, path, expected) in cases {
            assert_eq!(
                implied_directories(directory, path),
                expected,
                "failed for case: {}",
                path
            );
        }
    }

    #[test]
    fn test_directory_lifecycle() {
        let (client, adapter) = memory_adapter("", AdapterOptions::default());

        adapter.create_directory("path", &WriteConfig::new()).unwrap();
        let before = client.list_requests().len();
        assert!(adapter.directory_exists("path").unwrap());
        assert_eq!(client.list_requests().len(), before + 1);

        adapter.delete_directory("path").unwrap();
        assert!(client.keys("test").is_empty());

        let before = client.list_requests().len();
        assert!(!adapter.directory_exists("path").unwrap());
        assert_eq!(client.list_requests().len(), before + 1);
    }

    #[test]
    fn test_list_contents_failure() {
        let (client, adapter) = memory_adapter("", AdapterOptions::default());
        client.fail_on("list_objects", "a/");

        let err = adapter.list_contents("a", false).unwrap_err();
        assert!(matches!(err, FilesystemError::UnableToListContents { .. }));
    }

    #[test]
    fn test_delete() {
        let (client, adapter) = memory_adapter("", AdapterOptions::default());
        write(&adapter, "file.txt", "x");

        adapter.delete("file.txt").unwrap();
        assert!(client.keys("test").is_empty());

        client.fail_on("delete_object", "other.txt");
        let err = adapter.delete("other.txt").unwrap_err();
        assert!(matches!(err, FilesystemError::UnableToDeleteFile { .. }));
    }

    #[test]
    fn test_delete_directory_in_batches() {
        let (client, adapter) = memory_adapter("", AdapterOptions::default());
        for i in 0..2500 {
            client
                .put_object("test", &format!("bulk/{:04}", i), Vec::new(), &ObjectOptions::default())
                .unwrap();
        }
        write(&adapter, "keep.txt", "x");

        adapter.delete_directory("bulk").unwrap();

        assert_eq!(client.delete_batches(), vec![1000, 1000, 500]);
        assert_eq!(client.keys("test"), vec!["keep.txt"]);
    }

    #[test]
    fn test_delete_empty_directory() {
        let (client, adapter) = memory_adapter("", AdapterOptions::default());

        adapter.delete_directory("nothing").unwrap();
        assert!(client.delete_batches().is_empty());
    }

    #[test]
    fn test_delete_directory_failure() {
        let (client, adapter) = memory_adapter("", AdapterOptions::default());
        write(&adapter, "dir/a.txt", "x");
        client.fail_on("delete_objects", "dir/a.txt");

        let err = adapter.delete_directory("dir").unwrap_err();
        assert!(matches!(err, FilesystemError::UnableToDeleteDirectory { .. }));
    }

    #[test]
    fn test_copy_retains_visibility() {
        let (_, adapter) = memory_adapter("", AdapterOptions::default());
        adapter
            .write("src.txt", b"x", &WriteConfig::new().with_visibility(Visibility::Private))
            .unwrap();

        adapter.copy("src.txt", "retained.txt", &WriteConfig::new()).unwrap();
        adapter
            .copy(
                "src.txt",
                "overridden.txt",
                &WriteConfig::new().with_visibility(Visibility::Public),
            )
            .unwrap();

        assert_eq!(adapter.visibility("retained.txt").unwrap(), Visibility::Private);
        assert_eq!(adapter.visibility("overridden.txt").unwrap(), Visibility::Public);
        assert_eq!(adapter.read("retained.txt").unwrap(), b"x");
    }

    #[test]
    fn test_copy_without_retain_uses_default() {
        let (_, adapter) = memory_adapter(
            "",
            AdapterOptions::default().with_retain_visibility(false),
        );
        adapter
            .write("src.txt", b"x", &WriteConfig::new().with_visibility(Visibility::Private))
            .unwrap();

        adapter.copy("src.txt", "dst.txt", &WriteConfig::new()).unwrap();
        assert_eq!(adapter.visibility("dst.txt").unwrap(), Visibility::Public);
    }

    #[test]
    fn test_copy_failures() {
        let (client, adapter) = memory_adapter("", AdapterOptions::default());

        let err = adapter
            .copy("missing.txt", "dst.txt", &WriteConfig::new())
            .unwrap_err();
        assert!(matches!(err, FilesystemError::UnableToCopyFile { .. }));

        write(&adapter, "src.txt", "x");
        client.fail_on("copy_object", "src.txt");
        let err = adapter
            .copy("src.txt", "dst.txt", &WriteConfig::new())
            .unwrap_err();
        assert!(matches!(err, FilesystemError::UnableToCopyFile { .. }));
    }

    #[test]
    fn test_move_file() {
        let (client, adapter) = memory_adapter("", AdapterOptions::default());
        write(&adapter, "from.txt", "payload");

        adapter.move_file("from.txt", "to.txt", &WriteConfig::new()).unwrap();

        assert_eq!(client.keys("test"), vec!["to.txt"]);
        assert_eq!(adapter.read("to.txt").unwrap(), b"payload");
    }

    #[test]
    fn test_move_to_same_path_is_noop() {
        let (client, adapter) = memory_adapter("", AdapterOptions::default());
        write(&adapter, "same.txt", "payload");

        adapter.move_file("same.txt", "/same.txt", &WriteConfig::new()).unwrap();
        assert_eq!(client.keys("test"), vec!["same.txt"]);
    }

    #[test]
    fn test_move_keeps_both_when_delete_fails() {
        let (client, adapter) = memory_adapter("", AdapterOptions::default());
        write(&adapter, "from.txt", "payload");
        client.fail_on("delete_object", "from.txt");

        let err = adapter
            .move_file("from.txt", "to.txt", &WriteConfig::new())
            .unwrap_err();

        match err {
            FilesystemError::UnableToMoveFile { source, .. } => {
                assert!(matches!(*source, FilesystemError::UnableToDeleteFile { .. }));
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(client.keys("test"), vec!["from.txt", "to.txt"]);
    }

    #[test]
    fn test_checksum() {
        let (_, adapter) = memory_adapter("", AdapterOptions::default());
        write(&adapter, "file.txt", "x");

        let checksum = adapter.checksum("file.txt", "ETAG").unwrap();
        assert!(!checksum.is_empty());
        assert!(!checksum.contains('"'));
    }

    #[test]
    fn test_checksum_rejects_unknown_algorithm() {
        let client = Arc::new(MockClient::new());
        let adapter = OssAdapter::new(client.clone(), "test", "", AdapterOptions::default());

        let err = adapter.checksum("file.txt", "md5").unwrap_err();
        assert!(matches!(err, FilesystemError::UnsupportedOption(_)));
        assert!(client.calls().is_empty());
    }

    #[test]
    fn test_checksum_missing_etag() {
        let client = Arc::new(MockClient::new());
        let adapter = OssAdapter::new(client, "test", "", AdapterOptions::default());

        let err = adapter.checksum("file.txt", CHECKSUM_ETAG).unwrap_err();
        assert!(matches!(
            err,
            FilesystemError::UnableToRetrieveMetadata {
                kind: MetadataKind::Checksum,
                ..
            }
        ));
    }

    #[test]
    fn test_set_bucket() {
        let (client, mut adapter) = memory_adapter("", AdapterOptions::default());
        write(&adapter, "a.txt", "x");

        adapter.set_bucket("other");
        write(&adapter, "b.txt", "y");

        assert_eq!(adapter.bucket(), "other");
        assert_eq!(client.keys("test"), vec!["a.txt"]);
        assert_eq!(client.keys("other"), vec!["b.txt"]);
    }

    #[test]
    fn test_write_failure() {
        let (client, adapter) = memory_adapter("", AdapterOptions::default());
        client.fail_on("put_object", "file.txt");

        let err = adapter
            .write("file.txt", b"x", &WriteConfig::new())
            .unwrap_err();
        assert!(matches!(err, FilesystemError::UnableToWriteFile { .. }));

        let err = adapter.read("missing.txt").unwrap_err();
        assert!(matches!(
            err,
            FilesystemError::UnableToReadFile { ref source, .. } if source.is_not_found()
        ));
    }

    #[test]
    fn test_private_acl_constant_used_for_private() {
        let (client, adapter) = memory_adapter("", AdapterOptions::default());
        adapter
            .write("p.txt", b"x", &WriteConfig::new().with_visibility(Visibility::Private))
            .unwrap();

        assert_eq!(client.get_object_acl("test", "p.txt").unwrap(), ACL_PRIVATE);
        let meta: ObjectMeta = client.get_object_meta("test", "p.txt").unwrap();
        assert!(meta.get("x-oss-object-acl").is_none());
    }
}
