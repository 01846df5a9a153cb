//! Parsing helpers for literal values: integers, IP addresses and CIDR blocks.
//!
//! None of these return errors. Callers decide whether an unparseable value
//! becomes a finding or is skipped.

use std::net::{IpAddr, Ipv4Addr};

/// Outcome of reading a literal as a signed integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerLiteral {
    Value(i64),
    /// Well-formed digits that do not fit in an `i64`.
    Overflow { negative: bool },
    NotNumeric,
}

impl IntegerLiteral {
    pub fn value(self) -> Option<i64> {
        match self {
            IntegerLiteral::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// Reads an optionally signed decimal integer, ignoring surrounding whitespace.
pub fn classify_integer(raw: &str) -> IntegerLiteral {
    let trimmed = raw.trim();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return IntegerLiteral::NotNumeric;
    }
    match trimmed.parse::<i64>() {
        Ok(value) => IntegerLiteral::Value(value),
        Err(_) => IntegerLiteral::Overflow { negative },
    }
}

/// Parses a bare IPv4 or IPv6 address. Port suffixes are not accepted.
pub fn parse_ip(raw: &str) -> Option<IpAddr> {
    raw.trim().parse().ok()
}

/// An IP network in CIDR notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cidr {
    network: IpAddr,
    prefix: u8,
}

impl Cidr {
    /// Parses `addr/prefix`; host bits may be set and are masked off.
    /// A bare address is a single-host network.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (addr, prefix) = match raw.split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (raw, None),
        };
        let addr: IpAddr = addr.parse().ok()?;
        let max = max_prefix(&addr);
        let prefix = match prefix {
            Some(p) => {
                if p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                p.parse::<u8>().ok().filter(|p| *p <= max)?
            }
            None => max,
        };
        Some(Self {
            network: mask(addr, prefix),
            prefix,
        })
    }

    pub fn network(&self) -> IpAddr {
        self.network
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Addresses of the other IP family are never contained.
    pub fn contains(&self, ip: &IpAddr) -> bool {
        match (self.network, ip) {
            (IpAddr::V4(_), IpAddr::V4(_)) | (IpAddr::V6(_), IpAddr::V6(_)) => {
                mask(*ip, self.prefix) == self.network
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for Cidr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

fn max_prefix(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

fn mask(addr: IpAddr, prefix: u8) -> IpAddr {
    match addr {
        IpAddr::V4(v4) => {
            let bits = u32::from(v4);
            let masked = if prefix == 0 {
                0
            } else {
                bits & (u32::MAX << (32 - u32::from(prefix)))
            };
            IpAddr::V4(Ipv4Addr::from(masked))
        }
        IpAddr::V6(v6) => {
            let bits = u128::from(v6);
            let masked = if prefix == 0 {
                0
            } else {
                bits & (u128::MAX << (128 - u32::from(prefix)))
            };
            IpAddr::V6(masked.into())
        }
    }
}

/// Drops a `:port` suffix from an `ip:port` address.
pub fn strip_port(addr: &str) -> &str {
    addr.split(':').next().unwrap_or(addr)
}

/// The `/24` range an IPv4 device address falls in, rendered as CIDR text.
pub fn ipv4_slash24(addr: &str) -> Option<String> {
    let host = strip_port(addr).trim();
    if !host.contains('.') || !host.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    let ip: Ipv4Addr = host.parse().ok()?;
    let cidr = Cidr {
        network: mask(IpAddr::V4(ip), 24),
        prefix: 24,
    };
    Some(cidr.to_string())
}

/// Dotted four-part address (optionally with a port) whose parts are all integers.
pub fn looks_like_ip(addr: &str) -> bool {
    if !addr.contains('.') || !addr.bytes().any(|b| b.is_ascii_digit()) {
        return false;
    }
    let dotted_quad = |s: &str| {
        let parts: Vec<&str> = s.split('.').collect();
        parts.len() == 4
            && parts
                .iter()
                .all(|p| classify_integer(p) != IntegerLiteral::NotNumeric)
    };
    dotted_quad(strip_port(addr))
}

/// Small positive integer address typical of MS/TP MAC addresses.
pub fn looks_like_mstp_mac(addr: &str) -> bool {
    !addr.is_empty()
        && addr.bytes().all(|b| b.is_ascii_digit())
        && matches!(addr.parse::<u32>(), Ok(1..=127))
}
