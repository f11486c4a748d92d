//! Whitespace normalization.
//!
//! ```rust
//! use canonical::collapse_whitespace;
//!
//! assert_eq!(collapse_whitespace("  ecog \t 0-1\n"), "ecog 0-1");
//! ```

/// Collapses runs of Unicode whitespace to single ASCII spaces and trims the
/// edges.
///
/// Empty or whitespace-only input yields an empty string.
pub fn collapse_whitespace(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    for segment in text.split_whitespace() {
        if !normalized.is_empty() {
            normalized.push(' ');
        }
        normalized.push_str(segment);
    }
    normalized
}
