use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use url::{Host, Url};

/// Why a host was refused. The reader maps every variant to a 400.
#[derive(Debug, Clone, PartialEq)]
pub enum Blocked {
    Scheme(String),
    MissingHost,
    LocalhostName(String),
    Address(IpAddr),
    Unresolvable(String),
}

impl std::fmt::Display for Blocked {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Blocked::Scheme(s) => write!(f, "scheme {s:?} is not allowed"),
            Blocked::MissingHost => write!(f, "URL has no host"),
            Blocked::LocalhostName(h) => write!(f, "host {h:?} is not allowed"),
            Blocked::Address(ip) => write!(f, "host resolves to blocked address {ip}"),
            Blocked::Unresolvable(h) => write!(f, "host {h:?} did not resolve"),
        }
    }
}

/// Address families and ranges the reader must never talk to:
/// loopback, link-local, RFC 1918 private, unique-local, CGNAT,
/// broadcast, multicast, documentation, and the unspecified address.
/// IPv4-mapped IPv6 is classified by its embedded IPv4 address.
pub fn is_blocked_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_blocked_v4(v4),
        IpAddr::V6(v6) => is_blocked_v6(v6),
    }
}

fn is_blocked_v4(ip: Ipv4Addr) -> bool {
    // 100.64.0.0/10 (RFC 6598 shared address space)
    let octets = ip.octets();
    let cgnat = octets[0] == 100 && (octets[1] & 0xc0) == 64;

    ip.is_loopback()
        || ip.is_link_local()
        || ip.is_private()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_multicast()
        || ip.is_documentation()
        || cgnat
}

fn is_blocked_v6(ip: Ipv6Addr) -> bool {
    if let Some(mapped) = ip.to_ipv4_mapped() {
        return is_blocked_v4(mapped);
    }
    ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        || ip.is_unique_local()
        || ip.is_unicast_link_local()
}

fn is_localhost_name(host: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    host == "localhost" || host.ends_with(".localhost")
}

/// Validate a URL before (and again after) any reader I/O: http/https
/// scheme, a present host, no localhost aliases, and no blocked
/// addresses. Domain hosts are resolved and *every* returned address
/// must be public; a mixed public/private answer is refused.
pub async fn ensure_public_url(url: &Url) -> Result<(), Blocked> {
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(Blocked::Scheme(other.to_string())),
    }

    let host = match url.host() {
        Some(host) => host,
        None => return Err(Blocked::MissingHost),
    };

    match host {
        Host::Ipv4(ip) => {
            if is_blocked_v4(ip) {
                return Err(Blocked::Address(IpAddr::V4(ip)));
            }
        }
        Host::Ipv6(ip) => {
            if is_blocked_v6(ip) {
                return Err(Blocked::Address(IpAddr::V6(ip)));
            }
        }
        Host::Domain(name) => {
            if is_localhost_name(name) {
                return Err(Blocked::LocalhostName(name.to_string()));
            }
            let port = url.port_or_known_default().unwrap_or(80);
            let addrs: Vec<IpAddr> = tokio::net::lookup_host((name, port))
                .await
                .map_err(|_| Blocked::Unresolvable(name.to_string()))?
                .map(|sock| sock.ip())
                .collect();
            if addrs.is_empty() {
                return Err(Blocked::Unresolvable(name.to_string()));
            }
            if let Some(bad) = addrs.into_iter().find(|ip| is_blocked_ip(*ip)) {
                return Err(Blocked::Address(bad));
            }
        }
    }

    Ok(())
}
