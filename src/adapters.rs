use std::{
    collections::BTreeMap,
    io::{Read, Write},
};

use crate::model::oss::{
    ListObjectsPage, ListObjectsRequest, ObjectMeta, ObjectOptions, OssError, SignMethod,
};

pub mod memory;
pub mod mock;
pub mod s3;

/// The object storage calls the adapter is built on. Every call blocks until the
/// provider answers and is issued exactly once; retries belong to the implementation.
pub trait ObjectClient: Send + Sync {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        options: &ObjectOptions,
    ) -> Result<(), OssError>;

    fn upload_stream(
        &self,
        bucket: &str,
        key: &str,
        body: &mut dyn Read,
        options: &ObjectOptions,
    ) -> Result<(), OssError> {
        let mut buf = Vec::new();
        body.read_to_end(&mut buf).map_err(|err| {
            OssError::new(format!("failed to read upload stream for: {}, {}", key, err))
        })?;

        self.put_object(bucket, key, buf, options)
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, OssError>;

    /// Downloads into `sink` and returns the number of bytes written.
    fn get_object_to(
        &self,
        bucket: &str,
        key: &str,
        sink: &mut dyn Write,
    ) -> Result<u64, OssError> {
        let body = self.get_object(bucket, key)?;
        sink.write_all(&body).map_err(|err| {
            OssError::new(format!("failed to write download of: {}, {}", key, err))
        })?;

        Ok(body.len() as u64)
    }

    fn get_object_meta(&self, bucket: &str, key: &str) -> Result<ObjectMeta, OssError>;

    fn does_object_exist(&self, bucket: &str, key: &str) -> Result<bool, OssError>;

    fn copy_object(
        &self,
        from_bucket: &str,
        from_key: &str,
        to_bucket: &str,
        to_key: &str,
        options: &ObjectOptions,
    ) -> Result<(), OssError>;

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), OssError>;

    /// Batch delete; callers send at most 1000 keys per call.
    fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), OssError>;

    fn list_objects(
        &self,
        bucket: &str,
        request: &ListObjectsRequest,
    ) -> Result<ListObjectsPage, OssError>;

    fn get_object_acl(&self, bucket: &str, key: &str) -> Result<String, OssError>;

    fn put_object_acl(&self, bucket: &str, key: &str, acl: &str) -> Result<(), OssError>;

    fn sign_url(
        &self,
        bucket: &str,
        key: &str,
        expires: u64,
        method: SignMethod,
        query: &BTreeMap<String, String>,
    ) -> Result<String, OssError>;
}
