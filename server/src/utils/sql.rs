//! SQL utility functions

/// Escape SQL LIKE metacharacters (%, _, \) in user input
///
/// Patterns built from the result must be used with `ESCAPE '\'`.
///
/// # Example
///
/// ```
/// use queryforge_server::utils::sql::escape_like_pattern;
///
/// let pattern = format!("%{}%", escape_like_pattern("50% off_sale"));
/// assert_eq!(pattern, "%50\\% off\\_sale%");
/// ```
pub fn escape_like_pattern(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// JSON path for a top-level document key, e.g. `$.status`
///
/// Callers must only pass identifier-like keys; entity descriptors
/// guarantee this for every field name.
pub fn json_path(key: &str) -> String {
    format!("$.{}", key)
}
