use crate::util::path::{self, DELIMITER};

/// Translates logical paths to storage keys under a fixed root prefix.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathPrefixer {
    prefix: String,
}

impl PathPrefixer {
    pub fn new(prefix: &str) -> Self {
        let trimmed = path::normalize(prefix);
        let trimmed = path::trim_delimiter(&trimmed);

        let prefix = if trimmed.is_empty() {
            String::new()
        } else {
            format!("{}{}", trimmed, DELIMITER)
        };

        Self { prefix }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn prefix_path(&self, path: &str) -> String {
        format!("{}{}", self.prefix, path::normalize(path))
    }

    /// Like `prefix_path` but delimiter-terminated, except for the bare root.
    pub fn prefix_directory_path(&self, path: &str) -> String {
        let key = self.prefix_path(path::trim_delimiter(path));
        if key.is_empty() || path::is_directory_key(&key) {
            key
        } else {
            format!("{}{}", key, DELIMITER)
        }
    }

    pub fn strip_prefix(&self, key: &str) -> String {
        key.strip_prefix(self.prefix.as_str())
            .unwrap_or(key)
            .trim_start_matches(DELIMITER)
            .to_string()
    }

    pub fn strip_directory_prefix(&self, key: &str) -> String {
        path::trim_delimiter(&self.strip_prefix(key)).to_string()
    }
}
