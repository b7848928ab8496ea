use std::{
    collections::{BTreeMap, VecDeque},
    sync::Mutex,
};

use crate::{
    adapters::ObjectClient,
    model::oss::{
        ListObjectsPage, ListObjectsRequest, ObjectMeta, ObjectOptions, OssError, SignMethod,
        ACL_DEFAULT,
    },
};

/// Client that answers list calls from a scripted queue of pages and accepts every
/// other call. Each call is recorded as `"<operation> <key>"`.
#[derive(Default)]
pub struct MockClient {
    pages: Mutex<VecDeque<Result<ListObjectsPage, OssError>>>,
    list_requests: Mutex<Vec<ListObjectsRequest>>,
    calls: Mutex<Vec<String>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pages(pages: Vec<Result<ListObjectsPage, OssError>>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            ..Default::default()
        }
    }

    pub fn list_requests(&self) -> Vec<ListObjectsRequest> {
        self.list_requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn record(&self, operation: &str, key: &str) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(format!("{} {}", operation, key));
        }
    }
}

impl ObjectClient for MockClient {
    fn put_object(
        &self,
        _bucket: &str,
        key: &str,
        _body: Vec<u8>,
        _options: &ObjectOptions,
    ) -> Result<(), OssError> {
        self.record("put_object", key);
        Ok(())
    }

    fn get_object(&self, _bucket: &str, key: &str) -> Result<Vec<u8>, OssError> {
        self.record("get_object", key);
        Ok(Vec::new())
    }

    fn get_object_meta(&self, _bucket: &str, key: &str) -> Result<ObjectMeta, OssError> {
        self.record("get_object_meta", key);
        Ok(ObjectMeta::new())
    }

    fn does_object_exist(&self, _bucket: &str, key: &str) -> Result<bool, OssError> {
        self.record("does_object_exist", key);
        Ok(false)
    }

    fn copy_object(
        &self,
        _from_bucket: &str,
        from_key: &str,
        _to_bucket: &str,
        _to_key: &str,
        _options: &ObjectOptions,
    ) -> Result<(), OssError> {
        self.record("copy_object", from_key);
        Ok(())
    }

    fn delete_object(&self, _bucket: &str, key: &str) -> Result<(), OssError> {
        self.record("delete_object", key);
        Ok(())
    }

    fn delete_objects(&self, _bucket: &str, keys: &[String]) -> Result<(), OssError> {
        self.record("delete_objects", &keys.join(","));
        Ok(())
    }

    fn list_objects(
        &self,
        _bucket: &str,
        request: &ListObjectsRequest,
    ) -> Result<ListObjectsPage, OssError> {
        self.record("list_objects", &request.prefix);
        if let Ok(mut requests) = self.list_requests.lock() {
            requests.push(request.clone());
        }

        self.pages
            .lock()
            .map_err(|err| OssError::new(format!("failed to acquire `pages` guard: {}", err)))?
            .pop_front()
            .unwrap_or_else(|| Ok(ListObjectsPage::default()))
    }

    fn get_object_acl(&self, _bucket: &str, key: &str) -> Result<String, OssError> {
        self.record("get_object_acl", key);
        Ok(ACL_DEFAULT.to_string())
    }

    fn put_object_acl(&self, _bucket: &str, key: &str, _acl: &str) -> Result<(), OssError> {
        self.record("put_object_acl", key);
        Ok(())
    }

    fn sign_url(
        &self,
        _bucket: &str,
        key: &str,
        _expires: u64,
        _method: SignMethod,
        _query: &BTreeMap<String, String>,
    ) -> Result<String, OssError> {
        self.record("sign_url", key);
        Ok("signed-url".to_string())
    }
}
