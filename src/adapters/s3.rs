//! OSS through its S3-compatible API.

use std::{collections::BTreeMap, io::Write, time::Duration};

use aws_sdk_s3::{
    error::{DisplayErrorContext, SdkError},
    presigning::{PresignedRequest, PresigningConfig},
    primitives::{ByteStream, DateTimeFormat},
    types::{Delete, Grant, ObjectCannedAcl, ObjectIdentifier, Permission, StorageClass},
};
use tracing::{debug, error};

use crate::{
    adapters::ObjectClient,
    model::oss::{
        ListObjectsPage, ListObjectsRequest, ObjectInfo, ObjectMeta, ObjectOptions, OssError,
        SignMethod, ACL_PRIVATE, ACL_PUBLIC_READ, ACL_PUBLIC_READ_WRITE, HEADER_META_PREFIX,
        HEADER_OBJECT_ACL, HEADER_STORAGE_CLASS, META_CONTENT_LENGTH, META_CONTENT_TYPE,
        META_ETAG, META_LAST_MODIFIED, META_STORAGE_CLASS,
    },
    util::poll::Poller,
};

const ALL_USERS_URI: &str = "http://acs.amazonaws.com/groups/global/AllUsers";

pub struct S3Client {
    client: aws_sdk_s3::Client,
    poller: Poller,
}

impl S3Client {
    pub fn new(client: aws_sdk_s3::Client, poller: Poller) -> Self {
        Self { client, poller }
    }

    /// Loads credentials and region from the environment and targets `endpoint`,
    /// e.g. `oss-cn-hangzhou.aliyuncs.com`.
    pub fn from_env(endpoint: Option<&str>) -> Result<Self, OssError> {
        let poller = Poller::new()
            .map_err(|err| OssError::new(format!("failed to start runtime, {}", err)))?;
        let sdk_config = poller.poll_until_ready(aws_config::load_from_env());

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = endpoint {
            let endpoint = if endpoint.starts_with("http") {
                endpoint.to_string()
            } else {
                format!("https://{}", endpoint)
            };
            builder = builder.endpoint_url(endpoint);
        }

        let client = aws_sdk_s3::Client::from_conf(builder.build());
        Ok(Self::new(client, poller))
    }

    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.client
    }
}

fn sdk_error<E>(operation: &str, key: &str, err: SdkError<E>) -> OssError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|res| res.status().as_u16());
    let message = format!(
        "failed to {}: {}, {}",
        operation,
        key,
        DisplayErrorContext(&err)
    );

    match status {
        Some(status) => OssError::with_status(message, status),
        None => OssError::new(message),
    }
}

/// `x-amz-copy-source` value: the bucket, then the key percent-encoded one segment
/// at a time so `/` stays literal.
fn copy_source(bucket: &str, key: &str) -> String {
    let key = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");

    format!("{}/{}", bucket, key)
}

fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

/// Rejects a passthrough header the HTTP layer would refuse, so it is never dropped
/// on the way out.
fn validate_raw_header(name: &str, value: &str) -> Result<(), OssError> {
    if name.is_empty() || !name.bytes().all(is_token_char) {
        return Err(OssError::new(format!("invalid header name: {:?}", name)));
    }
    if !value.bytes().all(|b| b == b'\t' || (0x20..0x7f).contains(&b)) {
        return Err(OssError::new(format!(
            "invalid value for header {}: {:?}",
            name, value
        )));
    }

    Ok(())
}

/// Marker to resume a truncated listing when the provider sent no `NextMarker`: the
/// greater of the last key and the last common prefix.
fn fallback_marker(objects: &[ObjectInfo], prefixes: &[String]) -> Option<String> {
    let last_key = objects.last().map(|o| o.key.as_str());
    let last_prefix = prefixes.last().map(String::as_str);

    last_key.max(last_prefix).map(str::to_string)
}

/// OSS exposes ACLs as grants over the S3 API; fold them back into a canned ACL.
fn canned_acl_from_grants(grants: &[Grant]) -> &'static str {
    let public: Vec<&Permission> = grants
        .iter()
        .filter(|grant| grant.grantee().and_then(|grantee| grantee.uri()) == Some(ALL_USERS_URI))
        .filter_map(|grant| grant.permission())
        .collect();

    if public
        .iter()
        .any(|p| matches!(p, Permission::Write | Permission::FullControl))
    {
        ACL_PUBLIC_READ_WRITE
    } else if public.iter().any(|p| matches!(p, Permission::Read)) {
        ACL_PUBLIC_READ
    } else {
        ACL_PRIVATE
    }
}

impl ObjectClient for S3Client {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        options: &ObjectOptions,
    ) -> Result<(), OssError> {
        let mut req = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body));

        if let Some(content_type) = &options.content_type {
            req = req.content_type(content_type);
        }

        let mut raw = Vec::new();
        for (name, value) in &options.headers {
            req = match name.as_str() {
                HEADER_OBJECT_ACL => req.acl(ObjectCannedAcl::from(value.as_str())),
                HEADER_STORAGE_CLASS => req.storage_class(StorageClass::from(value.as_str())),
                "Cache-Control" => req.cache_control(value),
                "Content-Disposition" => req.content_disposition(value),
                "Content-Encoding" => req.content_encoding(value),
                "Content-Language" => req.content_language(value),
                "Content-MD5" => req.content_md5(value),
                "x-oss-tagging" => req.tagging(value),
                // the SDK computes the length from the body
                "Content-Length" => req,
                other => match other.strip_prefix(HEADER_META_PREFIX) {
                    Some(meta) => req.metadata(meta, value),
                    None => {
                        validate_raw_header(other, value)?;
                        raw.push((other.to_string(), value.clone()));
                        req
                    }
                },
            };
        }

        let fut = req
            .customize()
            .mutate_request(move |http| {
                for (name, value) in &raw {
                    if let Err(err) = http.headers_mut().try_insert(name.clone(), value.clone()) {
                        error!(error_message = %err, error_group = "put_object", header = %name);
                    }
                }
            })
            .send();

        self.poller
            .poll_until_ready_error(fut)
            .map_err(|err| sdk_error("put_object", key, err))?;

        debug!(key = key, "put_object complete");
        Ok(())
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, OssError> {
        let req = self.client.get_object().bucket(bucket).key(key);

        let o = self
            .poller
            .poll_until_ready_error(req.send())
            .map_err(|err| sdk_error("get_object", key, err))?;

        let bytes = self
            .poller
            .poll_until_ready_error(o.body.collect())
            .map_err(|err| OssError::new(format!("failed to collect body: {}, {}", key, err)))?;

        Ok(bytes.into_bytes().to_vec())
    }

    fn get_object_to(
        &self,
        bucket: &str,
        key: &str,
        sink: &mut dyn Write,
    ) -> Result<u64, OssError> {
        let req = self.client.get_object().bucket(bucket).key(key);

        let mut o = self
            .poller
            .poll_until_ready_error(req.send())
            .map_err(|err| sdk_error("get_object", key, err))?;

        let mut written = 0;
        while let Some(chunk) = self
            .poller
            .poll_until_ready_error(o.body.try_next())
            .map_err(|err| OssError::new(format!("failed to read body: {}, {}", key, err)))?
        {
            sink.write_all(&chunk).map_err(|err| {
                OssError::new(format!("failed to write download of: {}, {}", key, err))
            })?;
            written += chunk.len() as u64;
        }

        Ok(written)
    }

    fn get_object_meta(&self, bucket: &str, key: &str) -> Result<ObjectMeta, OssError> {
        let req = self.client.head_object().bucket(bucket).key(key);

        let ho = self
            .poller
            .poll_until_ready_error(req.send())
            .map_err(|err| sdk_error("head_object", key, err))?;

        let mut meta = ObjectMeta::new();
        if let Some(length) = ho.content_length() {
            meta.insert(META_CONTENT_LENGTH, length.to_string());
        }
        if let Some(content_type) = ho.content_type() {
            meta.insert(META_CONTENT_TYPE, content_type);
        }
        if let Some(last_modified) = ho
            .last_modified()
            .and_then(|dt| dt.fmt(DateTimeFormat::HttpDate).ok())
        {
            meta.insert(META_LAST_MODIFIED, last_modified);
        }
        if let Some(etag) = ho.e_tag() {
            meta.insert(META_ETAG, etag);
        }
        if let Some(storage_class) = ho.storage_class() {
            meta.insert(META_STORAGE_CLASS, storage_class.as_str());
        }
        if let Some(user) = ho.metadata() {
            for (name, value) in user {
                meta.insert(&format!("{}{}", HEADER_META_PREFIX, name), value.clone());
            }
        }

        Ok(meta)
    }

    fn does_object_exist(&self, bucket: &str, key: &str) -> Result<bool, OssError> {
        let req = self.client.head_object().bucket(bucket).key(key);

        match self.poller.poll_until_ready_error(req.send()) {
            Ok(_) => Ok(true),
            Err(err) => {
                if let Some(svc_err) = err.as_service_error() {
                    if svc_err.is_not_found() {
                        return Ok(false);
                    }
                }

                Err(sdk_error("head_object", key, err))
            }
        }
    }

    fn copy_object(
        &self,
        from_bucket: &str,
        from_key: &str,
        to_bucket: &str,
        to_key: &str,
        options: &ObjectOptions,
    ) -> Result<(), OssError> {
        let mut req = self
            .client
            .copy_object()
            .copy_source(copy_source(from_bucket, from_key))
            .bucket(to_bucket)
            .key(to_key);

        if let Some(acl) = options.acl() {
            req = req.acl(ObjectCannedAcl::from(acl));
        }

        self.poller
            .poll_until_ready_error(req.send())
            .map_err(|err| sdk_error("copy_object", from_key, err))?;

        Ok(())
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), OssError> {
        let req = self.client.delete_object().bucket(bucket).key(key);

        self.poller
            .poll_until_ready_error(req.send())
            .map_err(|err| sdk_error("delete_object", key, err))?;

        Ok(())
    }

    fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), OssError> {
        let objects = keys
            .iter()
            .map(|key| {
                ObjectIdentifier::builder().key(key).build().map_err(|err| {
                    OssError::new(format!("failed to build object identifier: {}, {}", key, err))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|err| OssError::new(format!("failed to build delete request, {}", err)))?;

        let req = self.client.delete_objects().bucket(bucket).delete(delete);
        let out = self
            .poller
            .poll_until_ready_error(req.send())
            .map_err(|err| sdk_error("delete_objects", bucket, err))?;

        if let Some(failed) = out.errors().first() {
            return Err(OssError::new(format!(
                "failed to delete_objects: {} of {} keys failed, first: {}, {}",
                out.errors().len(),
                keys.len(),
                failed.key().unwrap_or_default(),
                failed.message().unwrap_or_default()
            )));
        }

        Ok(())
    }

    fn list_objects(
        &self,
        bucket: &str,
        request: &ListObjectsRequest,
    ) -> Result<ListObjectsPage, OssError> {
        let mut req = self
            .client
            .list_objects()
            .bucket(bucket)
            .prefix(&request.prefix)
            .max_keys(request.max_keys as i32);

        if !request.delimiter.is_empty() {
            req = req.delimiter(&request.delimiter);
        }
        if !request.marker.is_empty() {
            req = req.marker(&request.marker);
        }

        let lo = self
            .poller
            .poll_until_ready_error(req.send())
            .map_err(|err| sdk_error("list_objects", &request.prefix, err))?;

        let objects: Vec<ObjectInfo> = lo
            .contents()
            .iter()
            .map(|o| ObjectInfo {
                key: o.key().unwrap_or_default().to_string(),
                last_modified: o
                    .last_modified()
                    .and_then(|dt| dt.fmt(DateTimeFormat::DateTime).ok())
                    .unwrap_or_default(),
                etag: o.e_tag().unwrap_or_default().to_string(),
                size: o.size().unwrap_or(0).max(0) as u64,
                storage_class: o
                    .storage_class()
                    .map(|class| class.as_str().to_string())
                    .unwrap_or_default(),
            })
            .collect();

        let prefixes: Vec<String> = lo
            .common_prefixes()
            .iter()
            .filter_map(|p| p.prefix())
            .map(str::to_string)
            .collect();

        // NextMarker is only sent for delimited listings.
        let next_marker = if lo.is_truncated().unwrap_or(false) {
            lo.next_marker()
                .map(str::to_string)
                .or_else(|| fallback_marker(&objects, &prefixes))
        } else {
            None
        };

        Ok(ListObjectsPage {
            objects,
            prefixes,
            next_marker,
        })
    }

    fn get_object_acl(&self, bucket: &str, key: &str) -> Result<String, OssError> {
        let req = self.client.get_object_acl().bucket(bucket).key(key);

        let out = self
            .poller
            .poll_until_ready_error(req.send())
            .map_err(|err| sdk_error("get_object_acl", key, err))?;

        Ok(canned_acl_from_grants(out.grants()).to_string())
    }

    fn put_object_acl(&self, bucket: &str, key: &str, acl: &str) -> Result<(), OssError> {
        let req = self
            .client
            .put_object_acl()
            .bucket(bucket)
            .key(key)
            .acl(ObjectCannedAcl::from(acl));

        self.poller
            .poll_until_ready_error(req.send())
            .map_err(|err| sdk_error("put_object_acl", key, err))?;

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
        let config = PresigningConfig::expires_in(Duration::from_secs(expires))
            .map_err(|err| OssError::new(format!("invalid expiration for: {}, {}", key, err)))?;

        if method != SignMethod::Get && !query.is_empty() {
            return Err(OssError::new(format!(
                "query options are only supported when signing GET, not {}",
                method
            )));
        }

        let presigned: PresignedRequest = match method {
            SignMethod::Get => {
                let mut req = self.client.get_object().bucket(bucket).key(key);
                for (name, value) in query {
                    req = match name.as_str() {
                        "response-content-type" => req.response_content_type(value),
                        "response-content-disposition" => req.response_content_disposition(value),
                        "response-content-encoding" => req.response_content_encoding(value),
                        "response-content-language" => req.response_content_language(value),
                        "response-cache-control" => req.response_cache_control(value),
                        other => {
                            return Err(OssError::new(format!(
                                "unsupported sign option: {}",
                                other
                            )))
                        }
                    };
                }
                self.poller
                    .poll_until_ready_error(req.presigned(config))
                    .map_err(|err| sdk_error("sign_url", key, err))?
            }
            SignMethod::Put => {
                let req = self.client.put_object().bucket(bucket).key(key);
                self.poller
                    .poll_until_ready_error(req.presigned(config))
                    .map_err(|err| sdk_error("sign_url", key, err))?
            }
            SignMethod::Head => {
                let req = self.client.head_object().bucket(bucket).key(key);
                self.poller
                    .poll_until_ready_error(req.presigned(config))
                    .map_err(|err| sdk_error("sign_url", key, err))?
            }
            SignMethod::Delete => {
                let req = self.client.delete_object().bucket(bucket).key(key);
                self.poller
                    .poll_until_ready_error(req.presigned(config))
                    .map_err(|err| sdk_error("sign_url", key, err))?
            }
        };

        Ok(presigned.uri().to_string())
    }
}
