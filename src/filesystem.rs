use std::io::Read;

use crate::{
    config::WriteConfig,
    error::Result,
    model::fs::{Expiration, StorageAttributes, Visibility},
};

/// Storage-agnostic filesystem operations that application code is written against.
pub trait FilesystemAdapter {
    fn file_exists(&self, path: &str) -> Result<bool>;

    fn directory_exists(&self, path: &str) -> Result<bool>;

    fn write(&self, path: &str, contents: &[u8], config: &WriteConfig) -> Result<()>;

    fn write_stream(&self, path: &str, contents: &mut dyn Read, config: &WriteConfig)
        -> Result<()>;

    fn read(&self, path: &str) -> Result<Vec<u8>>;

    fn read_stream(&self, path: &str) -> Result<Box<dyn Read + Send>>;

    fn delete(&self, path: &str) -> Result<()>;

    fn delete_directory(&self, path: &str) -> Result<()>;

    fn create_directory(&self, path: &str, config: &WriteConfig) -> Result<()>;

    fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<()>;

    fn visibility(&self, path: &str) -> Result<Visibility>;

    fn mime_type(&self, path: &str) -> Result<String>;

    /// Unix timestamp in seconds.
    fn last_modified(&self, path: &str) -> Result<i64>;

    fn file_size(&self, path: &str) -> Result<u64>;

    fn list_contents(&self, path: &str, deep: bool) -> Result<Vec<StorageAttributes>>;

    fn move_file(&self, source: &str, destination: &str, config: &WriteConfig) -> Result<()>;

    fn copy(&self, source: &str, destination: &str, config: &WriteConfig) -> Result<()>;
}

pub trait PublicUrlGenerator {
    fn public_url(&self, path: &str) -> Result<String>;
}

pub trait TemporaryUrlGenerator {
    fn temporary_url(&self, path: &str, expiration: Expiration) -> Result<String>;
}

pub trait ChecksumProvider {
    fn checksum(&self, path: &str, algorithm: &str) -> Result<String>;
}
