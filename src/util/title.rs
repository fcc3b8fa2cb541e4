/// Canonicalizes an article title into its comparison key.
///
/// Whitespace runs become a single underscore, repeated underscores are
/// collapsed, leading/trailing separators are trimmed, and the result is
/// lowercased. This is the key used by both caches and by grid matching,
/// so `"USA"`, `" usa "`, and `"usa"` all collide as intended.
///
/// Pure and total: empty or whitespace-only input yields `""`.
///
/// # Examples
///
/// ```
/// use wikibingo::util::normalize;
///
/// assert_eq!(normalize(" New  York "), "new_york");
/// assert_eq!(normalize("new_york"), "new_york");
/// assert_eq!(normalize("NEW YORK"), "new_york");
/// assert_eq!(normalize("   "), "");
/// ```
pub fn normalize(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_sep = false;

    for c in title.trim().chars() {
        if c.is_whitespace() || c == '_' {
            pending_sep = true;
            continue;
        }
        if pending_sep && !out.is_empty() {
            out.push('_');
        }
        pending_sep = false;
        for lower in c.to_lowercase() {
            out.push(lower);
        }
    }

    out
}

/// Encodes a title for use as a URL path segment.
///
/// Spaces become underscores first (the encyclopedia's URL convention),
/// then the result is percent-encoded.
pub fn title_path_segment(title: &str) -> String {
    urlencoding::encode(&title.replace(' ', "_")).into_owned()
}
