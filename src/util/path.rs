pub const DELIMITER: char = '/';

/// Collapses repeated delimiters and drops leading ones. A trailing delimiter is kept
/// because it marks a directory key.
pub fn normalize(path: &str) -> String {
    let joined = path
        .split(DELIMITER)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    if !joined.is_empty() && path.ends_with(DELIMITER) {
        format!("{}/", joined)
    } else {
        joined
    }
}

pub fn is_directory_key(key: &str) -> bool {
    key.ends_with(DELIMITER)
}

pub fn trim_delimiter(path: &str) -> &str {
    path.trim_end_matches(DELIMITER)
}
