//! Request snapshot with proxy-aware client address resolution.
//!
//! Forwarding headers are only honored when the direct peer is a trusted
//! proxy. Supported headers: `CF-Connecting-IP` (Cloudflare), `X-Real-IP`
//! and `X-Forwarded-For` (first address in the chain).

use std::net::IpAddr;

use indexmap::IndexMap;
use logctx_types::RequestAccessor;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

/// Header priority for client address extraction (highest to lowest).
const IP_HEADERS: &[&str] = &[
    "cf-connecting-ip", // Cloudflare
    "x-real-ip",        // Nginx
    "x-forwarded-for",  // Standard proxy header (first IP in chain)
];

/// Captured view of an inbound HTTP request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSnapshot {
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub query: Option<String>,
    /// Header names are stored lower-cased.
    #[serde(default, deserialize_with = "deserialize_headers")]
    pub headers: IndexMap<String, String>,
    /// Socket peer address.
    #[serde(default)]
    pub remote_addr: Option<IpAddr>,
    /// Server bind address (`SERVER_ADDR`).
    #[serde(default)]
    pub server_addr: Option<String>,
    /// Peers whose forwarding headers are trusted.
    #[serde(default)]
    pub trusted_proxies: Vec<IpAddr>,
}

impl RequestSnapshot {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            query: None,
            headers: IndexMap::new(),
            remote_addr: None,
            server_addr: None,
            trusted_proxies: Vec::new(),
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_remote_addr(mut self, addr: IpAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn with_server_addr(mut self, addr: impl Into<String>) -> Self {
        self.server_addr = Some(addr.into());
        self
    }

    pub fn with_trusted_proxy(mut self, addr: IpAddr) -> Self {
        self.trusted_proxies.push(addr);
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Resolves the client address, falling back to the socket peer.
    pub fn resolve_client_ip(&self) -> Option<IpAddr> {
        let peer = self.remote_addr?;
        if !self.trusted_proxies.contains(&peer) {
            return Some(peer);
        }

        for header in IP_HEADERS {
            let ip = self
                .header(header)
                .and_then(|value| value.split(',').next())
                .map(str::trim)
                .and_then(|candidate| candidate.parse::<IpAddr>().ok());

            if let Some(ip) = ip {
                debug!(header = %header, peer = %peer, client = %ip, "client address taken from forwarding header");
                return Some(ip);
            }
        }

        Some(peer)
    }
}

impl RequestAccessor for RequestSnapshot {
    fn path(&self) -> String {
        self.path.clone()
    }

    fn query_string(&self) -> Option<String> {
        self.query.clone()
    }

    fn method(&self) -> String {
        self.method.clone()
    }

    fn server_addr(&self) -> Option<String> {
        self.server_addr.clone()
    }

    fn client_ip(&self) -> Option<String> {
        self.resolve_client_ip().map(|ip| ip.to_string())
    }

    fn user_agent(&self) -> Option<String> {
        self.header("user-agent").map(str::to_string)
    }
}

fn deserialize_headers<'de, D>(deserializer: D) -> Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = IndexMap::<String, String>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|(name, value)| (name.to_ascii_lowercase(), value)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(raw: &str) -> IpAddr {
        raw.parse().unwrap()
    }

    fn behind_proxy() -> RequestSnapshot {
        RequestSnapshot::new("GET", "/")
            .with_remote_addr(ip("10.0.0.2"))
            .with_trusted_proxy(ip("10.0.0.2"))
    }

    #[test]
    fn untrusted_peer_headers_are_ignored() {
        let request = RequestSnapshot::new("GET", "/")
            .with_remote_addr(ip("198.51.100.7"))
            .with_header("X-Forwarded-For", "203.0.113.195");
        assert_eq!(request.resolve_client_ip(), Some(ip("198.51.100.7")));
    }

    #[test]
    fn trusted_proxy_uses_first_forwarded_address() {
        let request = behind_proxy().with_header("x-forwarded-for", "203.0.113.195, 70.41.3.18, 150.172.238.178");
        assert_eq!(request.resolve_client_ip(), Some(ip("203.0.113.195")));
    }

    #[test]
    fn prefers_cloudflare_over_others() {
        let request = behind_proxy()
            .with_header("cf-connecting-ip", "198.51.100.1")
            .with_header("x-forwarded-for", "203.0.113.1")
            .with_header("x-real-ip", "192.0.2.1");
        assert_eq!(request.resolve_client_ip(), Some(ip("198.51.100.1")));
    }

    #[test]
    fn invalid_forwarded_value_falls_back_to_peer() {
        let request = behind_proxy().with_header("x-forwarded-for", "not-an-ip");
        assert_eq!(request.resolve_client_ip(), Some(ip("10.0.0.2")));
    }

    #[test]
    fn handles_ipv6() {
        let request = behind_proxy().with_header("x-real-ip", "2001:db8::1");
        assert_eq!(request.client_ip().as_deref(), Some("2001:db8::1"));
    }

    #[test]
    fn missing_peer_yields_none() {
        assert!(RequestSnapshot::new("GET", "/").client_ip().is_none());
    }

    #[test]
    fn deserializes_with_lowercased_headers() {
        let json = r#"{
            "method": "POST",
            "path": "checkout",
            "query": "step=2",
            "headers": { "User-Agent": "curl/8.5.0" },
            "remoteAddr": "192.0.2.10",
            "serverAddr": "10.1.1.1"
        }"#;
        let request: RequestSnapshot = serde_json::from_str(json).expect("request snapshot");
        assert_eq!(request.user_agent().as_deref(), Some("curl/8.5.0"));
        assert_eq!(request.server_addr().as_deref(), Some("10.1.1.1"));
        assert_eq!(request.query_string().as_deref(), Some("step=2"));
        assert_eq!(request.client_ip().as_deref(), Some("192.0.2.10"));
    }
}
