use std::collections::BTreeMap;

use tracing::{error, info, span, Level};
use url::Url;

use crate::{
    error::{FilesystemError, Result},
    filesystem::{PublicUrlGenerator, TemporaryUrlGenerator},
    fs::OssAdapter,
    model::{fs::Expiration, oss::SignMethod},
};

const DEFAULT_SCHEME: &str = "https://";

/// Joins `base` and `path` with exactly one `/` between them.
pub fn concat_path_to_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn parse_url(value: &str) -> Result<Url> {
    Url::parse(value)
        .map_err(|err| FilesystemError::UnableToGetUrl(format!("invalid url {}: {}", value, err)))
}

/// Moves `signed` onto the scheme, host and port of `base`, keeping its path and query.
pub fn replace_base_url(signed: &str, base: &str) -> Result<String> {
    let mut url = parse_url(signed)?;
    let base = parse_url(base)?;
    let unsupported =
        || FilesystemError::UnableToGetUrl(format!("cannot move {} onto {}", signed, base));

    url.set_scheme(base.scheme()).map_err(|_| unsupported())?;
    url.set_host(base.host_str()).map_err(|_| unsupported())?;
    url.set_port(base.port()).map_err(|_| unsupported())?;

    Ok(url.to_string())
}

impl OssAdapter {
    /// Base URL for public links: `<scheme>://[<bucket>.]<endpoint host>[:<port>]/`.
    pub fn normalize_host(&self) -> Result<String> {
        let endpoint = self
            .options
            .endpoint
            .as_deref()
            .filter(|endpoint| !endpoint.is_empty())
            .ok_or_else(|| FilesystemError::missing_option("endpoint"))?;

        let endpoint = if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            format!("{}{}", DEFAULT_SCHEME, endpoint)
        };
        let url = parse_url(&endpoint)?;
        let host = url.host_str().ok_or_else(|| {
            FilesystemError::UnableToGetUrl(format!("endpoint {} has no host", endpoint))
        })?;

        let mut domain = if self.options.bucket_endpoint {
            host.to_string()
        } else {
            format!("{}.{}", self.bucket, host)
        };
        if let Some(port) = url.port() {
            domain = format!("{}:{}", domain, port);
        }

        Ok(format!("{}://{}/", url.scheme(), domain))
    }

    /// Presigns `path` for `method`. The result expires after `expiration`; `query` is
    /// signed into the URL.
    pub fn sign_url(
        &self,
        path: &str,
        expiration: Expiration,
        method: SignMethod,
        query: &BTreeMap<String, String>,
    ) -> Result<String> {
        let span = span!(Level::INFO, "sign_url", context = "sign_url");
        let _e = span.enter();
        info!(path = path, method = %method, "called");

        let key = self.prefixer.prefix_path(path);
        self.client
            .sign_url(&self.bucket, &key, expiration.as_seconds(), method, query)
            .map_err(|err| {
                error!(error_message = %err, error_group = "sign_url");
                FilesystemError::UnableToGenerateUrl {
                    path: path.to_string(),
                    source: err,
                }
            })
    }

    /// Like `TemporaryUrlGenerator::temporary_url` for any method and signed query.
    pub fn temporary_url_with(
        &self,
        path: &str,
        expiration: Expiration,
        method: SignMethod,
        query: &BTreeMap<String, String>,
    ) -> Result<String> {
        let signed = self.sign_url(path, expiration, method, query)?;
        match self.options.temporary_url.as_deref() {
            Some(base) if !base.is_empty() => replace_base_url(&signed, base),
            _ => Ok(signed),
        }
    }
}

impl PublicUrlGenerator for OssAdapter {
    fn public_url(&self, path: &str) -> Result<String> {
        let key = self.prefixer.prefix_path(path);
        match self.options.url.as_deref() {
            Some(url) if !url.is_empty() => Ok(concat_path_to_url(url, &key)),
            _ => Ok(concat_path_to_url(&self.normalize_host()?, &key)),
        }
    }
}

impl TemporaryUrlGenerator for OssAdapter {
    fn temporary_url(&self, path: &str, expiration: Expiration) -> Result<String> {
        self.temporary_url_with(path, expiration, SignMethod::Get, &BTreeMap::new())
    }
}
