use crate::types::Result;
use url::Url;

/// Re-base `maybe_relative` onto the `scheme://host[:port]` of `origin_url`.
///
/// References that already carry an `http://` or `https://` scheme are
/// returned unchanged. Everything else is treated as a path on the origin's
/// host, so `notes.json` and `/notes.json` resolve identically. Protocol
/// relative references (`//cdn.example/a.png`) take the origin's scheme.
pub fn resolve_url(origin_url: &str, maybe_relative: &str) -> Result<String> {
    if maybe_relative.starts_with("http://") || maybe_relative.starts_with("https://") {
        return Ok(maybe_relative.to_string());
    }

    let origin = Url::parse(origin_url)?;

    if let Some(rest) = maybe_relative.strip_prefix("//") {
        return Ok(format!("{}://{}", origin.scheme(), rest));
    }

    let path = if maybe_relative.starts_with('/') {
        maybe_relative.to_string()
    } else {
        format!("/{}", maybe_relative)
    };

    Ok(format!("{}{}", origin_base(&origin), path))
}

/// `scheme://host[:port]` of a parsed URL, without a trailing slash.
pub fn origin_base(url: &Url) -> String {
    let host = url.host_str().unwrap_or("");
    match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    }
}
