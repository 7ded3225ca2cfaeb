//! HTTP client construction and SSRF guards shared by the tools.

use std::net::{IpAddr, Ipv6Addr};
use std::time::Duration;

use reqwest::Client;
use reqwest::redirect::Policy;
use url::{Host, Url};

use scriptcrew_shared::{Result, ScriptCrewError};

/// User-Agent string for tool requests.
const USER_AGENT: &str = concat!("Mozilla/5.0 (compatible; scriptcrew/", env!("CARGO_PKG_VERSION"), ")");

/// Redirects followed before giving up.
pub(crate) const MAX_REDIRECTS: usize = 5;

/// Build a reqwest client with the tools' common settings.
pub(crate) fn build_client(timeout_secs: u64, redirect: Policy) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(redirect)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ScriptCrewError::Network(format!("failed to build HTTP client: {e}")))
}

/// Check if a URL targets a potentially dangerous resource.
pub(crate) fn is_ssrf_target(url: &Url) -> bool {
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Resolve a domain host and report whether any of its addresses is private.
///
/// IP-literal hosts are left to [`is_ssrf_target`].
pub(crate) async fn resolves_to_private(url: &Url) -> Result<bool> {
    let Some(Host::Domain(host)) = url.host() else {
        return Ok(false);
    };
    let port = url.port_or_known_default().unwrap_or(80);

    let addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| ScriptCrewError::Network(format!("failed to resolve {host}: {e}")))?;

    Ok(addrs.map(|addr| addr.ip()).any(|ip| is_private_ip(&ip)))
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    if let IpAddr::V6(v6) = ip {
        if let Some(v4) = v6.to_ipv4_mapped() {
            return is_private_ip(&IpAddr::V4(v4));
        }
    }

    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => {
            v6.is_loopback() || v6.is_unspecified() || is_unique_local(v6) || is_unicast_link_local(v6)
        }
    }
}

/// fc00::/7
fn is_unique_local(v6: &Ipv6Addr) -> bool {
    (v6.segments()[0] & 0xfe00) == 0xfc00
}

/// fe80::/10
fn is_unicast_link_local(v6: &Ipv6Addr) -> bool {
    (v6.segments()[0] & 0xffc0) == 0xfe80
}
