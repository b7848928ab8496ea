use std::{
    collections::{hash_map::DefaultHasher, BTreeMap, HashSet},
    hash::{Hash, Hasher},
    sync::{Mutex, MutexGuard},
};

use time::{
    format_description::well_known::{Rfc2822, Rfc3339},
    OffsetDateTime,
};
use url::Url;

use crate::{
    adapters::ObjectClient,
    model::oss::{
        ListObjectsPage, ListObjectsRequest, ObjectInfo, ObjectMeta, ObjectOptions, OssError,
        SignMethod, ACL_DEFAULT, HEADER_OBJECT_ACL, META_CONTENT_LENGTH, META_CONTENT_TYPE,
        META_ETAG, META_LAST_MODIFIED, META_STORAGE_CLASS,
    },
};

const STORAGE_CLASS: &str = "Standard";

#[derive(Clone, Debug)]
struct StoredObject {
    body: Vec<u8>,
    content_type: Option<String>,
    acl: String,
    headers: BTreeMap<String, String>,
    last_modified: OffsetDateTime,
}

impl StoredObject {
    fn etag(&self) -> String {
        let mut hasher = DefaultHasher::new();
        self.body.hash(&mut hasher);
        format!("\"{:016X}\"", hasher.finish())
    }
}

#[derive(Default)]
struct State {
    objects: BTreeMap<(String, String), StoredObject>,
    failures: HashSet<(String, String)>,
    list_requests: Vec<ListObjectsRequest>,
    delete_batches: Vec<usize>,
}

/// In-process object store with OSS listing semantics.
///
/// Pages hold at most `page_size` entries regardless of the requested `max_keys`, and
/// calls can be made to fail per operation and key with `fail_on`.
pub struct MemoryClient {
    state: Mutex<State>,
    page_size: usize,
}

impl Default for MemoryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::with_page_size(1000)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: page_size.max(1),
        }
    }

    /// Makes every later `operation` call on `key` fail. `operation` is the
    /// `ObjectClient` method name; list calls match on the request prefix.
    pub fn fail_on(&self, operation: &str, key: &str) {
        self.lock()
            .failures
            .insert((operation.to_string(), key.to_string()));
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    pub fn list_requests(&self) -> Vec<ListObjectsRequest> {
        self.lock().list_requests.clone()
    }

    pub fn delete_batches(&self) -> Vec<usize> {
        self.lock().delete_batches.clone()
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.lock()
            .objects
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, key)| key.clone())
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(state: &State, operation: &str, key: &str) -> Result<(), OssError> {
        if state
            .failures
            .contains(&(operation.to_string(), key.to_string()))
        {
            return Err(OssError::with_status(
                format!("injected failure on {}: {}", operation, key),
                500,
            ));
        }

        Ok(())
    }

    fn not_found(key: &str) -> OssError {
        OssError::with_status(format!("no such key: {}", key), 404)
    }

    fn id(bucket: &str, key: &str) -> (String, String) {
        (bucket.to_string(), key.to_string())
    }
}

enum Entry {
    Object(String),
    Prefix(String),
}

impl ObjectClient for MemoryClient {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        options: &ObjectOptions,
    ) -> Result<(), OssError> {
        let mut state = self.lock();
        Self::check(&state, "put_object", key)?;

        let mut headers = options.headers.clone();
        let acl = headers
            .remove(HEADER_OBJECT_ACL)
            .unwrap_or_else(|| ACL_DEFAULT.to_string());

        state.objects.insert(
            Self::id(bucket, key),
            StoredObject {
                body,
                content_type: options.content_type.clone(),
                acl,
                headers,
                last_modified: OffsetDateTime::now_utc(),
            },
        );

        Ok(())
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, OssError> {
        let state = self.lock();
        Self::check(&state, "get_object", key)?;

        state
            .objects
            .get(&Self::id(bucket, key))
            .map(|object| object.body.clone())
            .ok_or_else(|| Self::not_found(key))
    }

    fn get_object_meta(&self, bucket: &str, key: &str) -> Result<ObjectMeta, OssError> {
        let state = self.lock();
        Self::check(&state, "get_object_meta", key)?;

        let object = state
            .objects
            .get(&Self::id(bucket, key))
            .ok_or_else(|| Self::not_found(key))?;

        let mut meta = ObjectMeta::new()
            .with(META_CONTENT_LENGTH, object.body.len().to_string())
            .with(META_ETAG, object.etag())
            .with(META_STORAGE_CLASS, STORAGE_CLASS);
        if let Ok(last_modified) = object.last_modified.format(&Rfc2822) {
            meta.insert(META_LAST_MODIFIED, last_modified);
        }
        if let Some(content_type) = &object.content_type {
            meta.insert(META_CONTENT_TYPE, content_type.clone());
        }
        for (name, value) in &object.headers {
            meta.insert(name, value.clone());
        }

        Ok(meta)
    }

    fn does_object_exist(&self, bucket: &str, key: &str) -> Result<bool, OssError> {
        let state = self.lock();
        Self::check(&state, "does_object_exist", key)?;

        Ok(state.objects.contains_key(&Self::id(bucket, key)))
    }

    fn copy_object(
        &self,
        from_bucket: &str,
        from_key: &str,
        to_bucket: &str,
        to_key: &str,
        options: &ObjectOptions,
    ) -> Result<(), OssError> {
        let mut state = self.lock();
        Self::check(&state, "copy_object", from_key)?;

        let mut object = state
            .objects
            .get(&Self::id(from_bucket, from_key))
            .cloned()
            .ok_or_else(|| Self::not_found(from_key))?;

        object.acl = options.acl().unwrap_or(ACL_DEFAULT).to_string();
        object.last_modified = OffsetDateTime::now_utc();
        state.objects.insert(Self::id(to_bucket, to_key), object);

        Ok(())
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), OssError> {
        let mut state = self.lock();
        Self::check(&state, "delete_object", key)?;

        state.objects.remove(&Self::id(bucket, key));
        Ok(())
    }

    fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), OssError> {
        let mut state = self.lock();
        for key in keys {
            Self::check(&state, "delete_objects", key)?;
        }

        if keys.len() > 1000 {
            return Err(OssError::with_status(
                format!("too many keys in one batch: {}", keys.len()),
                400,
            ));
        }

        state.delete_batches.push(keys.len());
        for key in keys {
            state.objects.remove(&Self::id(bucket, key));
        }

        Ok(())
    }

    fn list_objects(
        &self,
        bucket: &str,
        request: &ListObjectsRequest,
    ) -> Result<ListObjectsPage, OssError> {
        let mut state = self.lock();
        state.list_requests.push(request.clone());
        Self::check(&state, "list_objects", &request.prefix)?;

        let max_keys = (request.max_keys as usize).clamp(1, self.page_size);
        let delimiter = request.delimiter.as_str();
        let marker = request.marker.as_str();
        let skip_folded = !delimiter.is_empty() && marker.ends_with(delimiter);

        let mut page = ListObjectsPage::default();
        let mut count = 0;
        let mut last = None;
        let mut truncated = false;

        let start = Self::id(bucket, &request.prefix);
        for ((b, key), object) in state.objects.range(start..) {
            if b != bucket || !key.starts_with(&request.prefix) {
                break;
            }
            if !marker.is_empty()
                && (key.as_str() <= marker || (skip_folded && key.starts_with(marker)))
            {
                continue;
            }

            let rest = &key[request.prefix.len()..];
            let entry = match rest.find(delimiter).filter(|_| !delimiter.is_empty()) {
                Some(pos) => Entry::Prefix(format!(
                    "{}{}",
                    request.prefix,
                    &rest[..pos + delimiter.len()]
                )),
                None => Entry::Object(key.clone()),
            };

            if let Entry::Prefix(prefix) = &entry {
                if page.prefixes.last() == Some(prefix) {
                    continue;
                }
            }

            if count == max_keys {
                truncated = true;
                break;
            }
            count += 1;

            match entry {
                Entry::Object(key) => {
                    page.objects.push(ObjectInfo {
                        key: key.clone(),
                        last_modified: object.last_modified.format(&Rfc3339).unwrap_or_default(),
                        etag: object.etag(),
                        size: object.body.len() as u64,
                        storage_class: STORAGE_CLASS.to_string(),
                    });
                    last = Some(key);
                }
                Entry::Prefix(prefix) => {
                    page.prefixes.push(prefix.clone());
                    last = Some(prefix);
                }
            }
        }

        page.next_marker = if truncated { last } else { None };
        Ok(page)
    }

    fn get_object_acl(&self, bucket: &str, key: &str) -> Result<String, OssError> {
        let state = self.lock();
        Self::check(&state, "get_object_acl", key)?;

        state
            .objects
            .get(&Self::id(bucket, key))
            .map(|object| object.acl.clone())
            .ok_or_else(|| Self::not_found(key))
    }

    fn put_object_acl(&self, bucket: &str, key: &str, acl: &str) -> Result<(), OssError> {
        let mut state = self.lock();
        Self::check(&state, "put_object_acl", key)?;

        let object = state
            .objects
            .get_mut(&Self::id(bucket, key))
            .ok_or_else(|| Self::not_found(key))?;
        object.acl = acl.to_string();

        Ok(())
    }

    fn sign_url(
        &self,
        bucket: &str,
        key: &str,
        expires: u64,
        method: SignMethod,
        query: &BTreeMap<String, String>,
    ) -> Result<String, OssError> {
        let state = self.lock();
        Self::check(&state, "sign_url", key)?;

        if bucket.is_empty() {
            return Err(OssError::new("bucket name must not be empty"));
        }

        let mut url = Url::parse(&format!("https://{}.oss-memory.local/", bucket))
            .map_err(|err| OssError::new(format!("failed to build url for: {}, {}", key, err)))?;
        url.set_path(key);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("Expires", &expires.to_string());
            pairs.append_pair("Method", method.as_str());
            for (name, value) in query {
                pairs.append_pair(name, value);
            }
        }

        Ok(url.to_string())
    }
}
