//! Small string helpers shared by the parsers and CSV rows.

use regex::Regex;
use std::sync::LazyLock;

/// Maximum length of the `title` column, in characters
pub const MAX_TITLE_LEN: usize = 255;

static MULTI_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());

/// Truncate `s` to at most `max_len` characters (not bytes)
pub fn trim_to_max_len(s: &str, max_len: usize) -> String {
    match s.char_indices().nth(max_len) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// The untruncated title, but only when `title` would be truncated
pub fn full_title(title: &str) -> String {
    if title.chars().count() > MAX_TITLE_LEN {
        title.to_string()
    } else {
        String::new()
    }
}

/// Drop newlines, turn tabs into spaces and collapse runs of whitespace.
pub fn clean_string(s: &str) -> String {
    let cleaned = s.replace('\n', "");
    let cleaned = cleaned.trim().replace('\t', " ");
    MULTI_SPACE.replace_all(&cleaned, " ").into_owned()
}

/// Replace every run of whitespace, newlines included, with one space
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Push `value` unless it is empty or already present
pub fn push_unique(values: &mut Vec<String>, value: String) {
    if !value.is_empty() && !values.contains(&value) {
        values.push(value);
    }
}
