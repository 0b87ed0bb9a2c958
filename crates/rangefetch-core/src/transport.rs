//! Per-task HTTP transport built on libcurl.
//!
//! A [`Transport`] holds everything needed to configure a curl `Easy` handle
//! for one task: request URL, proxy policy, address override, TLS policy,
//! user agent and `Host` header. It is built once before any request and only
//! read afterwards, so the workers of a task share it behind an `Arc`.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use curl::easy::{Easy, List};

use crate::config::{FetchConfig, ProxyPolicy};
use crate::error::DownloadError;
use crate::url_model::Target;

/// Certificate verification for TLS requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CertificatePolicy {
    /// Verify, except when the `Host` header is overridden: the connection then
    /// goes to an address whose certificate rarely matches the URL.
    #[default]
    Auto,
    Verify,
    Skip,
}

impl CertificatePolicy {
    pub fn skips_verification(self, host_header_overridden: bool) -> bool {
        match self {
            CertificatePolicy::Auto => host_header_overridden,
            CertificatePolicy::Verify => false,
            CertificatePolicy::Skip => true,
        }
    }
}

/// Redirects a task to a fixed address instead of the host's DNS answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressOverride {
    /// Connect to this IP for the target's host and port; the URL, TLS server
    /// name and `Host` header keep the original host (`curl --resolve`).
    Resolve(IpAddr),
    /// Put this `addr[:port]` in the request URL and send the original host in
    /// the `Host` header. Works through reverse proxies on other ports.
    OnHost(String),
}

impl AddressOverride {
    /// Accepts `1.2.3.4`, `::1`, or a socket address whose port is ignored.
    pub fn resolve(addr: &str) -> Result<Self, DownloadError> {
        let addr = addr.trim();
        if let Ok(ip) = addr.parse::<IpAddr>() {
            return Ok(AddressOverride::Resolve(ip));
        }
        if let Ok(sock) = addr.parse::<SocketAddr>() {
            return Ok(AddressOverride::Resolve(sock.ip()));
        }
        let unbracketed = addr.trim_start_matches('[').trim_end_matches(']');
        unbracketed
            .parse::<IpAddr>()
            .map(AddressOverride::Resolve)
            .map_err(|_| DownloadError::InvalidAddress(addr.to_string()))
    }

    /// Accepts any `host[:port]` authority.
    pub fn on_host(authority: &str) -> Result<Self, DownloadError> {
        let authority = authority.trim();
        let invalid = || DownloadError::InvalidAddress(authority.to_string());
        if authority.is_empty() || authority.contains('/') {
            return Err(invalid());
        }
        let parsed = url::Url::parse(&format!("http://{}/", authority)).map_err(|_| invalid())?;
        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(invalid());
        }
        Ok(AddressOverride::OnHost(authority.to_string()))
    }
}

/// Read-only request configuration for one task.
#[derive(Debug, Clone)]
pub struct Transport {
    url: String,
    user_agent: String,
    proxy: ProxyPolicy,
    host_header: Option<String>,
    /// `host:port:address` entry for `CURLOPT_RESOLVE`.
    resolve: Option<String>,
    insecure: bool,
}

impl Transport {
    /// Builds the transport for `target`.
    ///
    /// `host_header` is set when the task rerouted its URL to another address;
    /// `resolve_to` pins DNS for the target host. Fails only on a malformed
    /// proxy URL.
    pub fn build(
        target: &Target,
        host_header: Option<&str>,
        resolve_to: Option<IpAddr>,
        certificate: CertificatePolicy,
        config: &FetchConfig,
    ) -> Result<Self, DownloadError> {
        config.proxy.validate()?;

        let resolve = resolve_to.map(|ip| {
            let address = match ip {
                IpAddr::V4(v4) => v4.to_string(),
                IpAddr::V6(v6) => format!("[{}]", v6),
            };
            format!("{}:{}:{}", target.host_name(), target.port(), address)
        });

        Ok(Self {
            url: target.resolved_url(),
            user_agent: config.user_agent.clone(),
            proxy: config.proxy.clone(),
            host_header: host_header.map(str::to_string),
            resolve,
            insecure: certificate.skips_verification(host_header.is_some()),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn host_header(&self) -> Option<&str> {
        self.host_header.as_deref()
    }

    pub fn resolve_entry(&self) -> Option<&str> {
        self.resolve.as_deref()
    }

    pub fn skips_certificate_verification(&self) -> bool {
        self.insecure
    }

    /// A fresh `Easy` handle for this task's URL with every transport setting
    /// applied. `timeout` bounds the whole transfer; callers add method and range.
    pub(crate) fn easy(&self, timeout: Duration) -> Result<Easy, curl::Error> {
        // curl treats a zero timeout as "no timeout".
        let timeout = timeout.max(Duration::from_millis(1));
        let mut easy = Easy::new();
        easy.url(&self.url)?;
        easy.follow_location(true)?;
        easy.timeout(timeout)?;
        easy.connect_timeout(timeout)?;

        match &self.proxy {
            // An empty proxy string disables proxies, including the environment ones.
            ProxyPolicy::None => easy.proxy("")?,
            // libcurl reads http_proxy / https_proxy / no_proxy on its own.
            ProxyPolicy::Environment => {}
            ProxyPolicy::Url { url } => easy.proxy(url)?,
        }

        if let Some(entry) = &self.resolve {
            let mut list = List::new();
            list.append(entry)?;
            easy.resolve(list)?;
        }

        if self.insecure {
            easy.ssl_verify_peer(false)?;
            easy.ssl_verify_host(false)?;
        }

        if !self.user_agent.is_empty() {
            easy.useragent(&self.user_agent)?;
        }

        if let Some(host) = &self.host_header {
            let mut headers = List::new();
            headers.append(&format!("Host: {}", host))?;
            easy.http_headers(headers)?;
        }

        Ok(easy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(url: &str) -> Target {
        Target::parse(url).unwrap()
    }

    #[test]
    fn host_override_implies_insecure_only_under_auto() {
        assert!(CertificatePolicy::Auto.skips_verification(true));
        assert!(!CertificatePolicy::Auto.skips_verification(false));
        assert!(!CertificatePolicy::Verify.skips_verification(true));
        assert!(CertificatePolicy::Skip.skips_verification(false));
    }

    #[test]
    fn resolve_entry_uses_target_host_and_port() {
        let cfg = FetchConfig::default();
        let ip: IpAddr = "203.0.113.9".parse().unwrap();
        let t = Transport::build(
            &target("https://www.example.com/1.jpg"),
            None,
            Some(ip),
            CertificatePolicy::Auto,
            &cfg,
        )
        .unwrap();
        assert_eq!(t.resolve_entry(), Some("www.example.com:443:203.0.113.9"));
        assert_eq!(t.url(), "https://www.example.com/1.jpg");
        assert!(!t.skips_certificate_verification());
        assert_eq!(t.host_header(), None);
    }

    #[test]
    fn resolve_entry_brackets_ipv6() {
        let cfg = FetchConfig::default();
        let t = Transport::build(
            &target("http://example.com:8080/f"),
            None,
            Some("::1".parse().unwrap()),
            CertificatePolicy::Auto,
            &cfg,
        )
        .unwrap();
        assert_eq!(t.resolve_entry(), Some("example.com:8080:[::1]"));
    }

    #[test]
    fn host_header_turns_off_verification_by_default() {
        let cfg = FetchConfig::default();
        let mut tgt = target("https://www.example.com/1.jpg");
        tgt.set_host("198.51.100.4:23333");
        let t = Transport::build(
            &tgt,
            Some("www.example.com"),
            None,
            CertificatePolicy::Auto,
            &cfg,
        )
        .unwrap();
        assert_eq!(t.url(), "https://198.51.100.4:23333/1.jpg");
        assert_eq!(t.host_header(), Some("www.example.com"));
        assert!(t.skips_certificate_verification());

        let strict = Transport::build(
            &tgt,
            Some("www.example.com"),
            None,
            CertificatePolicy::Verify,
            &cfg,
        )
        .unwrap();
        assert!(!strict.skips_certificate_verification());
    }

    #[test]
    fn malformed_proxy_fails_before_any_request() {
        let cfg = FetchConfig {
            proxy: ProxyPolicy::Url {
                url: "::bad proxy".to_string(),
            },
            ..FetchConfig::default()
        };
        let err = Transport::build(
            &target("http://example.com/f"),
            None,
            None,
            CertificatePolicy::Auto,
            &cfg,
        )
        .unwrap_err();
        assert!(matches!(err, DownloadError::InvalidProxy { .. }));
    }

    #[test]
    fn easy_handle_builds_for_every_proxy_mode() {
        for proxy in [
            ProxyPolicy::None,
            ProxyPolicy::Environment,
            ProxyPolicy::Url {
                url: "http://127.0.0.1:3128".to_string(),
            },
        ] {
            let cfg = FetchConfig {
                proxy,
                ..FetchConfig::default()
            };
            let t = Transport::build(
                &target("http://example.com/f"),
                Some("example.org"),
                Some("127.0.0.1".parse().unwrap()),
                CertificatePolicy::Auto,
                &cfg,
            )
            .unwrap();
            assert!(t.easy(Duration::from_secs(5)).is_ok());
        }
    }

    #[test]
    fn address_override_parsing() {
        assert_eq!(
            AddressOverride::resolve("114.5.1.4").unwrap(),
            AddressOverride::Resolve("114.5.1.4".parse().unwrap())
        );
        assert_eq!(
            AddressOverride::resolve("114.5.1.4:23333").unwrap(),
            AddressOverride::Resolve("114.5.1.4".parse().unwrap())
        );
        assert_eq!(
            AddressOverride::resolve("[::1]").unwrap(),
            AddressOverride::Resolve("::1".parse().unwrap())
        );
        assert!(AddressOverride::resolve("example.com").is_err());

        assert_eq!(
            AddressOverride::on_host("114.5.1.4:23333").unwrap(),
            AddressOverride::OnHost("114.5.1.4:23333".to_string())
        );
        assert!(AddressOverride::on_host("").is_err());
        assert!(AddressOverride::on_host("a/b").is_err());
    }
}
