//! Direct-mapped hot cache keyed by an address fingerprint.
//!
//! Slots are atomic so a lookup can populate the cache through a shared
//! reference: readers of an [`crate::index::Index`] never need exclusive
//! access just to benefit from a cache hit. A hit requires the full
//! 64-bit fingerprint to match bit-for-bit, so a collision simply misses
//! rather than returning a wrong answer for a different address - the
//! only way a stale answer can surface is if the cache isn't invalidated
//! on mutation, which [`crate::index::Index`] guarantees by clearing it
//! before any insert/delete call returns.

use crate::address::INVALID_NEXT_HOP;
use crate::error::{ErrorKind, Result};
use std::sync::atomic::{AtomicU64, Ordering};

/// FxHash's well-known multiplicative constant, chosen per the
/// crate-level design notes because it is a widely audited constant
/// rather than a novel one.
const SEED: u64 = 0x51_7c_c1_b7_27_22_0a_95;

#[inline]
fn fold(hash: u64, word: u64) -> u64 {
    (hash.rotate_left(5) ^ word).wrapping_mul(SEED)
}

/// Streaming multiplicative fingerprint over an address's raw bytes.
pub fn fingerprint(bytes: &[u8]) -> u64 {
    let mut hash = bytes.len() as u64;
    let mut chunks = bytes.chunks_exact(8);
    for chunk in &mut chunks {
        let word = u64::from_le_bytes(chunk.try_into().unwrap());
        hash = fold(hash, word);
    }
    let rest = chunks.remainder();
    if !rest.is_empty() {
        let mut buf = [0u8; 8];
        buf[..rest.len()].copy_from_slice(rest);
        hash = fold(hash, u64::from_le_bytes(buf));
    }
    hash
}

/// A value word packs an occupied flag with its next-hop: bit 63 is
/// "occupied", bits 31..0 the next-hop. The occupied bit is what
/// distinguishes a never-written slot from a cached `INVALID_NEXT_HOP`
/// answer (a real, valid cache entry for a miss) - folding that case
/// into the sentinel value itself would mean a fingerprint that happens
/// to hash to an all-zero tag could be silently treated as empty.
const OCCUPIED_BIT: u64 = 1 << 63;
const EMPTY_VALUE: u64 = 0;
const EMPTY_TAG: u64 = 0;

#[inline]
fn pack(next_hop: u32) -> u64 {
    OCCUPIED_BIT | next_hop as u64
}

/// A power-of-two-sized direct-mapped `(fingerprint, next-hop)` cache.
///
/// Each slot is a full 64-bit fingerprint tag plus a separate occupied/
/// next-hop word, so a hit requires the entire fingerprint to match
/// rather than a truncated slice of it - the index bits the slot was
/// chosen by are checked again as part of the tag instead of being
/// assumed correct, so there is no window of untested bits a distinct
/// address could slip through.
///
/// Lookups and inserts are lock-free: each slot's tag/value pair is two
/// independent [`AtomicU64`]s, so [`HotCache::get`] and [`HotCache::put`]
/// both take `&self`. [`HotCache::put`] writes the value word before the
/// tag word (`Release`), and [`HotCache::get`] reads the tag first
/// (`Acquire`) and only consults the value if the tag matches - so a
/// concurrent reader that observes a fresh tag is guaranteed to observe
/// the value that was written alongside it, never a stale one from the
/// slot's previous occupant.
pub struct HotCache {
    tags: Vec<AtomicU64>,
    values: Vec<AtomicU64>,
    mask: u64,
}

impl HotCache {
    /// `size` must be a non-zero power of two.
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 || !size.is_power_of_two() {
            return Err(ErrorKind::ValidationError);
        }
        let mut tags = Vec::with_capacity(size);
        tags.resize_with(size, || AtomicU64::new(EMPTY_TAG));
        let mut values = Vec::with_capacity(size);
        values.resize_with(size, || AtomicU64::new(EMPTY_VALUE));
        Ok(HotCache {
            tags,
            values,
            mask: (size - 1) as u64,
        })
    }

    #[inline]
    pub fn get(&self, addr_bytes: &[u8]) -> Option<u32> {
        let fp = fingerprint(addr_bytes);
        let idx = (fp & self.mask) as usize;
        let tag = self.tags[idx].load(Ordering::Acquire);
        if tag != fp {
            return None;
        }
        let value = self.values[idx].load(Ordering::Relaxed);
        if value & OCCUPIED_BIT == 0 {
            return None;
        }
        Some(value as u32)
    }

    #[inline]
    pub fn put(&self, addr_bytes: &[u8], next_hop: u32) {
        let fp = fingerprint(addr_bytes);
        let idx = (fp & self.mask) as usize;
        self.values[idx].store(pack(next_hop), Ordering::Relaxed);
        self.tags[idx].store(fp, Ordering::Release);
    }

    /// Invalidate every entry in one pass. Called before any mutation
    /// call returns (cache-coherence invariant).
    pub fn clear(&self) {
        for (tag, value) in self.tags.iter().zip(self.values.iter()) {
            tag.store(EMPTY_TAG, Ordering::Relaxed);
            value.store(EMPTY_VALUE, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_power_of_two() {
        assert!(HotCache::new(3).is_err());
        assert!(HotCache::new(0).is_err());
    }

    #[test]
    fn put_then_get_hits() {
        let cache = HotCache::new(16).unwrap();
        cache.put(&[1, 2, 3, 4], 42);
        assert_eq!(cache.get(&[1, 2, 3, 4]), Some(42));
        assert_eq!(cache.get(&[1, 2, 3, 5]), None);
    }

    #[test]
    fn clear_empties_every_slot() {
        let cache = HotCache::new(8).unwrap();
        cache.put(&[9, 9, 9, 9], 7);
        cache.clear();
        assert_eq!(cache.get(&[9, 9, 9, 9]), None);
    }

    #[test]
    fn stores_invalid_next_hop_without_matching_empty() {
        // A real lookup miss stores INVALID_NEXT_HOP as a cached answer;
        // a fresh, never-written slot must not be confused with it.
        let cache = HotCache::new(8).unwrap();
        cache.put(&[1, 1, 1, 1], INVALID_NEXT_HOP);
        assert_eq!(cache.get(&[1, 1, 1, 1]), Some(INVALID_NEXT_HOP));
    }

    #[test]
    fn distinct_addresses_sharing_an_index_do_not_false_hit() {
        // A tiny 2-slot cache forces an index collision between any two
        // addresses whose fingerprints differ only above bit 0; the full
        // 64-bit tag compare must still tell them apart.
        let cache = HotCache::new(2).unwrap();
        let addrs: Vec<[u8; 4]> = (0u32..64).map(|i| i.to_be_bytes()).collect();
        for (i, a) in addrs.iter().enumerate() {
            cache.put(a, i as u32);
        }
        // Whatever ended up in each slot last must be retrievable
        // exactly, and every other address that collided into the same
        // slot must miss rather than return a stale neighbor's value.
        for (i, a) in addrs.iter().enumerate() {
            match cache.get(a) {
                Some(hop) => assert_eq!(hop, i as u32),
                None => {}
            }
        }
    }
}
