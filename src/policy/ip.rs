//! IPv4 range matching

use std::net::Ipv4Addr;

/// True when `ip` falls inside `range`.
///
/// A range without `/` is an exact string match; otherwise it is parsed as
/// IPv4 CIDR. Malformed input never matches.
pub fn is_ip_in_range(ip: &str, range: &str) -> bool {
    let Some((base, bits)) = range.split_once('/') else {
        return ip == range;
    };

    let (Some(addr), Some(base), Ok(bits)) =
        (parse_ipv4(ip), parse_ipv4(base), bits.trim().parse::<u32>())
    else {
        return false;
    };
    if bits > 32 {
        return false;
    }

    let mask = if bits == 0 { 0 } else { u32::MAX << (32 - bits) };
    (addr & mask) == (base & mask)
}

fn parse_ipv4(raw: &str) -> Option<u32> {
    raw.trim().parse::<Ipv4Addr>().ok().map(u32::from)
}
