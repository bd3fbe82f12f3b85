//! IPv4 CIDR blocks and the per-build subnet allocator.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{GraphError, GraphResult};

/// An IPv4 CIDR block such as `10.0.1.0/24`.
///
/// The stored address is always masked down to the network address, so two
/// blocks spelled differently but covering the same range compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Cidr {
    addr: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Cidr {
    /// Create a block from an address and prefix length.
    pub fn new(addr: Ipv4Addr, prefix: u8) -> GraphResult<Self> {
        if prefix > 32 {
            return Err(GraphError::InvalidCidr(format!("{addr}/{prefix}")));
        }
        let masked = Ipv4Addr::from(u32::from(addr) & Self::mask(prefix));
        Ok(Self {
            addr: masked,
            prefix,
        })
    }

    /// The `0.0.0.0/0` block, meaning "open to the world".
    pub fn open() -> Self {
        Self {
            addr: Ipv4Addr::UNSPECIFIED,
            prefix: 0,
        }
    }

    /// Whether this block is the universal source.
    pub fn is_open(&self) -> bool {
        self.prefix == 0
    }

    pub fn addr(&self) -> Ipv4Addr {
        self.addr
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    fn mask(prefix: u8) -> u32 {
        if prefix == 0 {
            0
        } else {
            u32::MAX << (32 - prefix)
        }
    }

    fn first(&self) -> u32 {
        u32::from(self.addr)
    }

    fn last(&self) -> u32 {
        u32::from(self.addr) | !Self::mask(self.prefix)
    }

    /// Test whether two blocks share any addresses.
    pub fn overlaps(&self, other: &Ipv4Cidr) -> bool {
        self.first() <= other.last() && other.first() <= self.last()
    }

    /// Test whether `other` lies entirely inside this block.
    pub fn contains(&self, other: &Ipv4Cidr) -> bool {
        self.prefix <= other.prefix && self.first() <= other.first() && other.last() <= self.last()
    }
}

impl FromStr for Ipv4Cidr {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr_part, prefix_part) = s
            .split_once('/')
            .ok_or_else(|| GraphError::InvalidCidr(s.to_string()))?;
        let addr: Ipv4Addr = addr_part
            .parse()
            .map_err(|_| GraphError::InvalidCidr(s.to_string()))?;
        let prefix: u8 = prefix_part
            .parse()
            .map_err(|_| GraphError::InvalidCidr(s.to_string()))?;
        Self::new(addr, prefix)
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

impl Serialize for Ipv4Cidr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Ipv4Cidr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Monotonic /24 allocator carving subnets out of a network container block.
///
/// The allocator is a plain value owned by a single build or generation run;
/// threading it explicitly is what guarantees non-overlap by construction
/// and keeps parallel invocations independent.
#[derive(Debug, Clone)]
pub struct SubnetAllocator {
    base: Ipv4Cidr,
    next: u32,
}

impl SubnetAllocator {
    /// Create an allocator over a container block (normally a /16).
    pub fn new(base: Ipv4Cidr) -> Self {
        Self { base, next: 0 }
    }

    /// Carve the next unused /24 block.
    pub fn next_block(&mut self) -> GraphResult<Ipv4Cidr> {
        let capacity = 1u32 << (24u32.saturating_sub(u32::from(self.base.prefix())));
        if self.base.prefix() > 24 || self.next >= capacity {
            return Err(GraphError::AddressSpaceExhausted(self.base.to_string()));
        }
        let addr = Ipv4Addr::from(self.base.first() + (self.next << 8));
        self.next += 1;
        Ipv4Cidr::new(addr, 24)
    }

    /// Carve the next /24 that overlaps none of the given blocks.
    pub fn next_unused(&mut self, used: &[Ipv4Cidr]) -> GraphResult<Ipv4Cidr> {
        loop {
            let candidate = self.next_block()?;
            if !used.iter().any(|u| u.overlaps(&candidate)) {
                return Ok(candidate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_roundtrip() {
        let cidr: Ipv4Cidr = "10.0.1.0/24".parse().unwrap();
        assert_eq!(cidr.to_string(), "10.0.1.0/24");
    }

    #[test]
    fn host_bits_are_masked() {
        let cidr: Ipv4Cidr = "10.0.1.57/24".parse().unwrap();
        assert_eq!(cidr.to_string(), "10.0.1.0/24");
    }

    #[test]
    fn rejects_malformed_blocks() {
        assert!("10.0.1.0".parse::<Ipv4Cidr>().is_err());
        assert!("10.0.1.0/33".parse::<Ipv4Cidr>().is_err());
        assert!("10.0.1/24".parse::<Ipv4Cidr>().is_err());
    }

    #[test]
    fn overlap_detection() {
        let a: Ipv4Cidr = "10.0.0.0/16".parse().unwrap();
        let b: Ipv4Cidr = "10.0.1.0/24".parse().unwrap();
        let c: Ipv4Cidr = "10.1.0.0/24".parse().unwrap();
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!b.overlaps(&c));
        assert!(Ipv4Cidr::open().overlaps(&c));
    }

    #[test]
    fn allocator_is_monotonic_and_disjoint() {
        let mut alloc = SubnetAllocator::new("10.0.0.0/16".parse().unwrap());
        let first = alloc.next_block().unwrap();
        let second = alloc.next_block().unwrap();
        assert_eq!(first.to_string(), "10.0.0.0/24");
        assert_eq!(second.to_string(), "10.0.1.0/24");
        assert!(!first.overlaps(&second));
    }

    #[test]
    fn allocator_skips_used_blocks() {
        let mut alloc = SubnetAllocator::new("10.0.0.0/16".parse().unwrap());
        let used: Vec<Ipv4Cidr> = vec![
            "10.0.0.0/24".parse().unwrap(),
            "10.0.1.0/24".parse().unwrap(),
        ];
        let block = alloc.next_unused(&used).unwrap();
        assert_eq!(block.to_string(), "10.0.2.0/24");
    }

    #[test]
    fn allocator_exhausts_explicitly() {
        let mut alloc = SubnetAllocator::new("10.0.0.0/24".parse().unwrap());
        alloc.next_block().unwrap();
        assert!(alloc.next_block().is_err());
    }
}
