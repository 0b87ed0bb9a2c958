//! URL modeling and filename derivation.
//!
//! A [`Target`] keeps the pieces of the requested URL separately so the host
//! can be swapped for an address override while the original name travels in
//! the `Host` header.

mod content_disposition;
mod path;
mod sanitize;

pub use content_disposition::parse_content_disposition_filename;
pub use path::filename_from_url_path;
pub use sanitize::sanitize_filename;

use crate::error::DownloadError;

/// Default filename when neither the header nor the URL path yields a usable name.
pub const DEFAULT_FILENAME: &str = "download.bin";

/// Scheme used when the input URL carries none.
pub const DEFAULT_SCHEME: &str = "http";

/// Scheme, authority, path and query of a download target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    scheme: String,
    /// Host name plus `:port` when the URL names a non-default port.
    host: String,
    path: String,
    query: String,
}

impl Target {
    /// Parses `input`, defaulting the scheme to `http` when it has none.
    pub fn parse(input: &str) -> Result<Self, DownloadError> {
        let trimmed = input.trim();
        let candidate = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("{}://{}", DEFAULT_SCHEME, trimmed)
        };
        let invalid = |reason: String| DownloadError::InvalidUrl {
            url: input.to_string(),
            reason,
        };

        let parsed = url::Url::parse(&candidate).map_err(|e| invalid(e.to_string()))?;
        let host_name = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid("missing host".to_string()))?;
        let host = match parsed.port() {
            Some(port) => format!("{}:{}", host_name, port),
            None => host_name.to_string(),
        };

        Ok(Self {
            scheme: parsed.scheme().to_string(),
            host,
            path: parsed.path().to_string(),
            query: parsed.query().unwrap_or("").to_string(),
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Authority as it appears in the request URL (`host[:port]`).
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_scheme(&mut self, scheme: &str) {
        self.scheme = scheme.to_string();
    }

    /// Replaces the authority (e.g. with `203.0.113.7:8443`).
    pub fn set_host(&mut self, host: &str) {
        self.host = host.to_string();
    }

    /// Host without the port.
    pub fn host_name(&self) -> &str {
        split_authority(&self.host).0
    }

    /// Explicit port, or the scheme default (443 for https, 80 otherwise).
    pub fn port(&self) -> u16 {
        split_authority(&self.host)
            .1
            .unwrap_or(if self.scheme.eq_ignore_ascii_case("https") {
                443
            } else {
                80
            })
    }

    /// `<scheme>://<host><path>` plus `?<query>` when the query is non-empty.
    pub fn resolved_url(&self) -> String {
        let mut url = format!("{}://{}{}", self.scheme, self.host, self.path);
        if !self.query.is_empty() {
            url.push('?');
            url.push_str(&self.query);
        }
        url
    }
}

/// Splits `host[:port]`, keeping bracketed IPv6 literals intact.
fn split_authority(authority: &str) -> (&str, Option<u16>) {
    let port_sep = match authority.rfind(':') {
        Some(i) if !authority[i..].contains(']') => i,
        _ => return (authority, None),
    };
    match authority[port_sep + 1..].parse::<u16>() {
        Ok(port) => (&authority[..port_sep], Some(port)),
        Err(_) => (authority, None),
    }
}

/// Derives a safe filename for saving a download.
///
/// Prefers the `filename="..."` directive of `content_disposition`, otherwise
/// the last segment of `url_path`. The result is sanitized and falls back to
/// [`DEFAULT_FILENAME`].
pub fn derive_filename(url_path: &str, content_disposition: Option<&str>) -> String {
    let candidate = content_disposition
        .and_then(parse_content_disposition_filename)
        .or_else(|| filename_from_url_path(url_path));

    let sanitized = candidate.map(|c| sanitize_filename(&c)).unwrap_or_default();
    if sanitized.is_empty() {
        DEFAULT_FILENAME.to_string()
    } else {
        sanitized
    }
}
