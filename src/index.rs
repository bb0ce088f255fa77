//! The public, algorithm-erased entry point.
//!
//! Callers who don't want to pick a concrete index type by hand use
//! [`Index::create`] and the byte-oriented `insert`/`delete`/`lookup_*`
//! methods here. Callers who already know which algorithm they want can
//! use [`crate::trie8::Trie8Index`], [`crate::dir24::Dir24Index`], or
//! [`crate::wide16::Wide16Index`] directly and skip the enum
//! indirection entirely.

use crate::address::{AddressFamily, Family, Ipv4Addr, Ipv6Addr, INVALID_NEXT_HOP};
use crate::cache::HotCache;
use crate::dir24::Dir24Index;
use crate::error::{ErrorKind, Result};
use crate::resultset::ResultSet;
use crate::simd;
use crate::trie8::Trie8Index;
use crate::wide16::Wide16Index;
use log::info;

/// Which lookup structure backs an [`Index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Universal fallback, valid for either address family.
    Trie8,
    /// IPv4 only.
    Dir24,
    /// IPv6 only.
    Wide16,
}

enum Concrete {
    Trie8V4(Trie8Index<Ipv4Addr>),
    Trie8V6(Trie8Index<Ipv6Addr>),
    Dir24(Dir24Index),
    Wide16(Wide16Index),
}

/// An algorithm-erased, single address-family LPM index.
///
/// Owns its arenas and an optional hot cache; dropped as a unit like any
/// other Rust value. [`Index::destroy`] is provided only for parity with
/// the language-neutral contract this core also serves (e.g. an FFI
/// layer built on top) - ordinary scope exit is equivalent.
pub struct Index {
    concrete: Concrete,
    family: Family,
    algorithm: Algorithm,
    cache: Option<HotCache>,
}

impl Index {
    /// Build an empty index. `Dir24` only supports `Family::V4`;
    /// `Wide16` only supports `Family::V6`; `Trie8` supports both.
    pub fn create(family: Family, algorithm: Algorithm) -> Result<Self> {
        let concrete = match (family, algorithm) {
            (Family::V4, Algorithm::Trie8) => Concrete::Trie8V4(Trie8Index::new()),
            (Family::V6, Algorithm::Trie8) => Concrete::Trie8V6(Trie8Index::new()),
            (Family::V4, Algorithm::Dir24) => Concrete::Dir24(Dir24Index::new()),
            (Family::V6, Algorithm::Wide16) => Concrete::Wide16(Wide16Index::new()),
            (Family::V6, Algorithm::Dir24) | (Family::V4, Algorithm::Wide16) => {
                return Err(ErrorKind::ValidationError)
            }
        };
        info!("created index family={family:?} algorithm={algorithm:?}");
        Ok(Index {
            concrete,
            family,
            algorithm,
            cache: None,
        })
    }

    /// Attach a hot cache of `size` slots (must be a non-zero power of
    /// two). Replaces any cache already attached.
    pub fn with_hot_cache(mut self, size: usize) -> Result<Self> {
        self.cache = Some(HotCache::new(size)?);
        Ok(self)
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn prefix_count(&self) -> usize {
        match &self.concrete {
            Concrete::Trie8V4(i) => i.prefix_count(),
            Concrete::Trie8V6(i) => i.prefix_count(),
            Concrete::Dir24(i) => i.prefix_count(),
            Concrete::Wide16(i) => i.prefix_count(),
        }
    }

    pub fn insert(&mut self, prefix_bytes: &[u8], prefix_len: u8, next_hop: u32) -> Result<()> {
        match &mut self.concrete {
            Concrete::Trie8V4(i) => {
                i.insert(Ipv4Addr::from_slice(prefix_bytes)?, prefix_len, next_hop)?
            }
            Concrete::Trie8V6(i) => {
                i.insert(Ipv6Addr::from_slice(prefix_bytes)?, prefix_len, next_hop)?
            }
            Concrete::Dir24(i) => {
                i.insert(Ipv4Addr::from_slice(prefix_bytes)?, prefix_len, next_hop)?
            }
            Concrete::Wide16(i) => {
                i.insert(Ipv6Addr::from_slice(prefix_bytes)?, prefix_len, next_hop)?
            }
        }
        if let Some(cache) = &self.cache {
            cache.clear();
        }
        Ok(())
    }

    pub fn delete(&mut self, prefix_bytes: &[u8], prefix_len: u8) -> Result<()> {
        match &mut self.concrete {
            Concrete::Trie8V4(i) => i.delete(Ipv4Addr::from_slice(prefix_bytes)?, prefix_len)?,
            Concrete::Trie8V6(i) => i.delete(Ipv6Addr::from_slice(prefix_bytes)?, prefix_len)?,
            Concrete::Dir24(i) => i.delete(Ipv4Addr::from_slice(prefix_bytes)?, prefix_len)?,
            Concrete::Wide16(i) => i.delete(Ipv6Addr::from_slice(prefix_bytes)?, prefix_len)?,
        }
        if let Some(cache) = &self.cache {
            cache.clear();
        }
        Ok(())
    }

    pub fn lookup_single(&self, addr_bytes: &[u8]) -> u32 {
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(addr_bytes) {
                return hit;
            }
        }
        let next_hop = match &self.concrete {
            Concrete::Trie8V4(i) => match Ipv4Addr::from_slice(addr_bytes) {
                Ok(a) => i.lookup_single(&a),
                Err(_) => return INVALID_NEXT_HOP,
            },
            Concrete::Trie8V6(i) => match Ipv6Addr::from_slice(addr_bytes) {
                Ok(a) => i.lookup_single(&a),
                Err(_) => return INVALID_NEXT_HOP,
            },
            Concrete::Dir24(i) => match Ipv4Addr::from_slice(addr_bytes) {
                Ok(a) => i.lookup_single(&a),
                Err(_) => return INVALID_NEXT_HOP,
            },
            Concrete::Wide16(i) => match Ipv6Addr::from_slice(addr_bytes) {
                Ok(a) => i.lookup_single(&a),
                Err(_) => return INVALID_NEXT_HOP,
            },
        };
        if let Some(cache) = &self.cache {
            cache.put(addr_bytes, next_hop);
        }
        next_hop
    }

    /// Batch lookup. For a `Dir24` index this dispatches through
    /// [`crate::simd`]'s runtime-selected variant; other algorithms use
    /// their own scalar loop. The hot cache, if attached, is bypassed
    /// here (batches are assumed cold or already deduplicated by the
    /// caller) and left untouched.
    pub fn lookup_batch(&self, addrs: &[&[u8]], out: &mut [u32]) {
        debug_assert_eq!(addrs.len(), out.len());
        match &self.concrete {
            Concrete::Dir24(i) => {
                let parsed: Vec<Ipv4Addr> = addrs
                    .iter()
                    .map(|b| Ipv4Addr::from_slice(b).unwrap_or_else(|_| Ipv4Addr::zero()))
                    .collect();
                simd::dispatch_batch(i, &parsed, out);
            }
            Concrete::Trie8V4(i) => {
                for (b, o) in addrs.iter().zip(out.iter_mut()) {
                    *o = Ipv4Addr::from_slice(b)
                        .map(|a| i.lookup_single(&a))
                        .unwrap_or(INVALID_NEXT_HOP);
                }
            }
            Concrete::Trie8V6(i) => {
                for (b, o) in addrs.iter().zip(out.iter_mut()) {
                    *o = Ipv6Addr::from_slice(b)
                        .map(|a| i.lookup_single(&a))
                        .unwrap_or(INVALID_NEXT_HOP);
                }
            }
            Concrete::Wide16(i) => {
                for (b, o) in addrs.iter().zip(out.iter_mut()) {
                    *o = Ipv6Addr::from_slice(b)
                        .map(|a| i.lookup_single(&a))
                        .unwrap_or(INVALID_NEXT_HOP);
                }
            }
        }
    }

    /// Every bound prefix covering `addr_bytes`, shortest length first.
    pub fn lookup_all(&self, addr_bytes: &[u8], results: &mut ResultSet) -> Result<()> {
        results.clear();
        match &self.concrete {
            Concrete::Trie8V4(i) => {
                let addr = Ipv4Addr::from_slice(addr_bytes)?;
                i.lookup_all(&addr, |len, hop| results.push(len, hop))
            }
            Concrete::Trie8V6(i) => {
                let addr = Ipv6Addr::from_slice(addr_bytes)?;
                i.lookup_all(&addr, |len, hop| results.push(len, hop))
            }
            Concrete::Dir24(i) => {
                let addr = Ipv4Addr::from_slice(addr_bytes)?;
                i.lookup_all(&addr, |len, hop| results.push(len, hop))
            }
            Concrete::Wide16(i) => {
                let addr = Ipv6Addr::from_slice(addr_bytes)?;
                i.lookup_all(&addr, |len, hop| results.push(len, hop))
            }
        }
    }

    /// Consume the index, releasing its arenas. Equivalent to dropping
    /// it; provided for callers that model lifetime management
    /// explicitly.
    pub fn destroy(self) {}
}
