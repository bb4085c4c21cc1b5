//! Address-space accounting over routed prefixes.

use hornet_api::{HornetError, HornetResult};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// IPv4 ranges that are never routable on the public Internet.
///
/// These are subtracted from the 2^32 total when normalizing an address
/// count into a fraction of the allocable space. The list is fixed.
pub const RESERVED_IPV4_RANGES: [&str; 16] = [
    "0.0.0.0/8",
    "10.0.0.0/8",
    "100.64.0.0/10",
    "127.0.0.0/8",
    "169.254.0.0/16",
    "172.16.0.0/12",
    "192.0.0.0/24",
    "192.0.2.0/24",
    "192.88.99.0/24",
    "192.168.0.0/16",
    "198.18.0.0/15",
    "198.51.100.0/24",
    "203.0.113.0/24",
    "224.0.0.0/4",
    "240.0.0.0/4",
    "255.255.255.255/32",
];

/// An IP network in `addr/len` form.
///
/// Host bits below the prefix length are masked off on parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Prefix {
    network: IpAddr,
    len: u8,
}

impl Prefix {
    /// Construct a prefix, masking host bits.
    pub fn new(addr: IpAddr, len: u8) -> HornetResult<Self> {
        let max = max_len(&addr);
        if len > max {
            return Err(HornetError::other(format!(
                "prefix length {len} exceeds {max} for {addr}"
            )));
        }
        Ok(Self {
            network: mask(addr, len),
            len,
        })
    }

    /// The network address.
    pub fn network(&self) -> IpAddr {
        self.network
    }

    /// The prefix length.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u8 {
        self.len
    }

    /// Does this prefix contain `addr`?
    pub fn contains(&self, addr: IpAddr) -> bool {
        self.network.is_ipv4() == addr.is_ipv4()
            && mask(addr, self.len) == self.network
    }

    /// The number of addresses covered. Saturates for `::/0`.
    pub fn num_addresses(&self) -> u128 {
        let host_bits = (max_len(&self.network) - self.len) as u32;
        1u128.checked_shl(host_bits).unwrap_or(u128::MAX)
    }
}

impl std::str::FromStr for Prefix {
    type Err = HornetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, len) = s.split_once('/').ok_or_else(|| {
            HornetError::other(format!("prefix {s:?} has no length"))
        })?;
        let addr: IpAddr = addr.parse().map_err(|e| {
            HornetError::other_src(format!("bad prefix address {s:?}"), e)
        })?;
        let len: u8 = len.parse().map_err(|e| {
            HornetError::other_src(format!("bad prefix length {s:?}"), e)
        })?;
        Self::new(addr, len)
    }
}

impl std::fmt::Display for Prefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.network, self.len)
    }
}

fn max_len(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

fn mask(addr: IpAddr, len: u8) -> IpAddr {
    match addr {
        IpAddr::V4(a) => {
            let bits = u32::from(a);
            let m = u32::MAX.checked_shl(32 - len as u32).unwrap_or(0);
            IpAddr::V4(Ipv4Addr::from(bits & m))
        }
        IpAddr::V6(a) => {
            let bits = u128::from(a);
            let m = u128::MAX.checked_shl(128 - len as u32).unwrap_or(0);
            IpAddr::V6(Ipv6Addr::from(bits & m))
        }
    }
}

/// The number of addresses in [RESERVED_IPV4_RANGES].
pub fn num_reserved_ipv4_addrs() -> u128 {
    RESERVED_IPV4_RANGES
        .iter()
        .filter_map(|r| r.parse::<Prefix>().ok())
        .map(|p| p.num_addresses())
        .sum()
}

/// The number of publicly allocable IPv4 addresses.
pub fn num_allocable_ipv4_addrs() -> u128 {
    (1u128 << 32) - num_reserved_ipv4_addrs()
}

/// Sum of the address-space sizes of `prefixes`.
pub fn address_count<'a, I>(prefixes: I) -> HornetResult<u128>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut total = 0u128;
    for p in prefixes {
        total = total.saturating_add(p.parse::<Prefix>()?.num_addresses());
    }
    Ok(total)
}

/// An address count as a fraction of the allocable IPv4 space.
pub fn fraction_of_allocable(count: u128) -> f64 {
    count as f64 / num_allocable_ipv4_addrs() as f64
}

/// [address_count] of `prefixes` as a fraction of the allocable IPv4
/// space.
pub fn address_fraction<'a, I>(prefixes: I) -> HornetResult<f64>
where
    I: IntoIterator<Item = &'a str>,
{
    Ok(fraction_of_allocable(address_count(prefixes)?))
}
