use tracing::debug;

use crate::{
    fs::OssAdapter,
    model::oss::{ListObjectsRequest, ListedObject, ListingResult, OssError},
};

pub const DELIMITER: &str = "/";
pub const MAX_KEYS: u32 = 1000;
/// Provider limit for one `delete_objects` call.
pub const DELETE_BATCH_SIZE: usize = 1000;

impl OssAdapter {
    /// Lists everything under `dirname`, following `next_marker` until the provider
    /// reports none. A non-recursive listing folds one level of hierarchy into
    /// common prefixes.
    ///
    /// A failed page fails the whole listing; entries gathered so far are dropped.
    pub fn list_dir_objects(
        &self,
        dirname: &str,
        recursive: bool,
    ) -> Result<ListingResult, OssError> {
        let mut request = ListObjectsRequest {
            prefix: self.prefixer.prefix_directory_path(dirname),
            delimiter: if recursive { "" } else { DELIMITER }.to_string(),
            max_keys: MAX_KEYS,
            marker: String::new(),
        };

        let mut result = ListingResult::default();
        loop {
            let page = self.client.list_objects(&self.bucket, &request)?;
            debug!(
                prefix = %request.prefix,
                marker = %request.marker,
                objects = page.objects.len(),
                prefixes = page.prefixes.len(),
                "listed page"
            );

            let next_marker = page.next_marker().map(str::to_string);
            result
                .objects
                .extend(page.objects.into_iter().map(|info| ListedObject {
                    dirname: dirname.to_string(),
                    info,
                }));
            result.prefixes.extend(page.prefixes);

            match next_marker {
                Some(marker) => request.marker = marker,
                None => break,
            }
        }

        Ok(result)
    }

    /// One delimited request with `max_keys = 1`; true when any object sits directly
    /// under the directory, including its own marker.
    pub(crate) fn probe_directory(&self, dirname: &str) -> Result<bool, OssError> {
        let request = ListObjectsRequest {
            prefix: self.prefixer.prefix_directory_path(dirname),
            delimiter: DELIMITER.to_string(),
            max_keys: 1,
            marker: String::new(),
        };

        let page = self.client.list_objects(&self.bucket, &request)?;
        Ok(!page.objects.is_empty())
    }

    pub(crate) fn delete_keys(&self, keys: &[String]) -> Result<(), OssError> {
        for batch in keys.chunks(DELETE_BATCH_SIZE) {
            self.client.delete_objects(&self.bucket, batch)?;
            debug!(keys = batch.len(), "deleted batch");
        }

        Ok(())
    }
}
