use crate::url::canonicalize;
use url::Url;

/// Extracts the normalized host of a URL
///
/// The host is lower-cased, keeps an explicit port (`host:port`) and has a
/// leading `www.` removed, so `https://WWW.Example.com/a` and
/// `http://example.com` share the host `example.com`.
///
/// Bare domains without a scheme are accepted. Anything else that cannot be
/// parsed yields an empty string.
///
/// # Examples
///
/// ```
/// use lead_crawler::url::host_of;
///
/// assert_eq!(host_of("https://WWW.Example.com/about"), "example.com");
/// assert_eq!(host_of("http://127.0.0.1:8080/"), "127.0.0.1:8080");
/// assert_eq!(host_of("example.com"), "example.com");
/// ```
pub fn host_of(url: &str) -> String {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(_) => match Url::parse(&format!("http://{}", url)) {
            Ok(parsed) => parsed,
            Err(_) => return String::new(),
        },
    };

    let host = match parsed.host_str() {
        Some(host) => host.to_lowercase(),
        None => return String::new(),
    };
    let host = host.strip_prefix("www.").map(str::to_string).unwrap_or(host);

    match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    }
}

/// Returns true when both URLs share the same normalized host
pub fn is_same_host(a: &str, b: &str) -> bool {
    let host = host_of(a);
    !host.is_empty() && host == host_of(b)
}

/// Builds the canonical seed URL for a domain entry
///
/// Bare domains get `https://` prepended. Scheme and host are lower-cased the
/// way resolved links are, so the seed and a link back to the home page land
/// on the same visited-set key.
pub fn seed_url(domain: &str) -> String {
    let trimmed = domain.trim();
    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    match Url::parse(&with_scheme) {
        Ok(parsed) => canonicalize(parsed.as_str()),
        Err(_) => canonicalize(&with_scheme),
    }
}
