use url::Url;

/// File extensions the frontier never enqueues
pub const SKIP_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp", ".tiff", ".svg", ".ico", ".zip", ".rar",
    ".7z", ".tar", ".gz", ".pdf",
];

/// Canonicalizes a URL for visited-set bookkeeping
///
/// Removes the fragment and every trailing slash. The function is total and
/// idempotent: `canonicalize(canonicalize(u)) == canonicalize(u)`.
///
/// # Examples
///
/// ```
/// use lead_crawler::url::canonicalize;
///
/// assert_eq!(canonicalize("https://x.com/a/#team"), "https://x.com/a");
/// assert_eq!(canonicalize("https://x.com/"), "https://x.com");
/// ```
pub fn canonicalize(url: &str) -> String {
    let without_fragment = match url.find('#') {
        Some(idx) => &url[..idx],
        None => url,
    };
    without_fragment.trim_end_matches('/').to_string()
}

/// Returns true when the URL points at a denied file type
///
/// Only the path is inspected, so query strings do not hide an extension.
pub fn should_skip(url: &str) -> bool {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_lowercase(),
        Err(_) => {
            let end = url.find(|c| c == '?' || c == '#').unwrap_or(url.len());
            url[..end].to_lowercase()
        }
    };

    SKIP_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Resolves an href found on `base` into an absolute http(s) URL
///
/// Returns `None` for non-navigational links (`javascript:`, `mailto:`,
/// `tel:`, `data:`), fragment-only anchors and anything that does not
/// resolve to http or https.
pub fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let resolved = base.join(href).ok()?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        _ => None,
    }
}
