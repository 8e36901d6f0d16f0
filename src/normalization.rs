/// Normalizes free text entered by a user by stripping surrounding
/// whitespace and composing it into Unicode Normalization Form C.
///
/// ```
/// use journal::normalization::normalize_text;
/// assert_eq!(normalize_text(" hi\u{0308} "), "h\u{00ef}");
/// ```
pub fn normalize_text(text: impl AsRef<str>) -> String {
    use unicode_normalization::UnicodeNormalization;

    text.as_ref().trim().nfc().collect()
}

/// Normalizes optional free text, treating blank input as absent.
pub fn normalize_optional(text: impl AsRef<str>) -> Option<String> {
    Some(normalize_text(text)).filter(|s| !s.is_empty())
}

/// Splits a comma-separated list of tags, normalizing each and
/// dropping blanks.
///
/// ```
/// use journal::normalization::split_tags;
/// assert_eq!(split_tags(" grassy, , nutty ,"), vec!["grassy", "nutty"]);
/// ```
pub fn split_tags(text: impl AsRef<str>) -> Vec<String> {
    text.as_ref()
        .split(',')
        .filter_map(normalize_optional)
        .collect()
}
