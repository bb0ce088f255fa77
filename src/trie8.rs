//! The universal-fallback index: a plain 256-wide, 8-bit-stride trie.
//!
//! Works for either address family - IPv4 walks at most 4 levels deep,
//! IPv6 at most 16 - since both are just "some number of bytes". The same
//! [`Node8`] pool also backs the tail of [`crate::wide16::Wide16Index`]
//! once its first three 16-bit strides are exhausted.

use crate::address::{AddressFamily, INVALID_NEXT_HOP};
use crate::arena::{Arena, Entry};
use crate::error::{ErrorKind, Result};
use log::trace;

/// A single 256-entry trie node.
#[derive(Clone)]
pub struct Node8 {
    pub entries: Vec<Entry>,
}

impl Node8 {
    fn new() -> Self {
        Node8 {
            entries: vec![Entry::default(); 256],
        }
    }
}

impl Default for Node8 {
    fn default() -> Self {
        Node8::new()
    }
}

/// An 8-bit-stride LPM trie over a `AF`-shaped address space.
pub struct Trie8Index<AF: AddressFamily> {
    pool: Arena<Node8>,
    root: u32,
    default_route: Option<u32>,
    prefix_count: usize,
    _af: std::marker::PhantomData<AF>,
}

impl<AF: AddressFamily> Trie8Index<AF> {
    pub fn new() -> Self {
        let mut pool = Arena::new();
        // index 0 is reserved as "no child"; never used for a real node.
        pool.reserve(2).expect("initial reservation cannot fail");
        pool.allocate(Node8::new());
        let root = pool.allocate(Node8::new());
        Trie8Index {
            pool,
            root,
            default_route: None,
            prefix_count: 0,
            _af: std::marker::PhantomData,
        }
    }

    pub fn prefix_count(&self) -> usize {
        self.prefix_count
    }

    pub fn default_route(&self) -> Option<u32> {
        self.default_route
    }

    /// Number of full bytes and the bit remainder for a prefix length.
    fn split(len: u8) -> (usize, u8) {
        ((len / 8) as usize, len % 8)
    }

    pub fn insert(&mut self, addr: AF, len: u8, next_hop: u32) -> Result<()> {
        if len > AF::BITS {
            return Err(ErrorKind::ValidationError);
        }
        if len == 0 {
            self.default_route = Some(next_hop);
            return Ok(());
        }
        let octets = addr.octets();
        let (full_bytes, rem) = Self::split(len);

        // Pre-reserve the worst case (one node per remaining byte) before
        // any write, so growth failure is a no-op visible to the caller.
        let depth = if rem == 0 { full_bytes - 1 } else { full_bytes };
        self.pool.reserve(depth)?;

        let mut node = self.root;
        for &byte in &octets[..depth] {
            node = self.descend_or_create(node, byte);
        }

        if rem == 0 {
            // Byte-aligned prefix: write the entry in the parent node at
            // the last walked byte, not a new child.
            let last_byte = octets[full_bytes - 1];
            self.pool.get_mut(node).entries[last_byte as usize]
                .write_if_longer_or_equal(len, next_hop);
        } else {
            let byte = octets[full_bytes];
            let base = (byte as u16 & (0xFFu16 << (8 - rem))) as usize;
            let span = 1usize << (8 - rem);
            let entries = &mut self.pool.get_mut(node).entries;
            for i in base..base + span {
                entries[i].write_if_longer_or_equal(len, next_hop);
            }
        }
        self.prefix_count += 1;
        trace!("trie8 insert len={len} next_hop={next_hop}");
        Ok(())
    }

    pub fn delete(&mut self, addr: AF, len: u8) -> Result<()> {
        if len > AF::BITS {
            return Err(ErrorKind::ValidationError);
        }
        if len == 0 {
            if self.default_route.take().is_none() {
                return Err(ErrorKind::NotFound);
            }
            return Ok(());
        }
        let octets = addr.octets();
        let (full_bytes, rem) = Self::split(len);

        let mut node = self.root;
        let walk_len = if rem == 0 { full_bytes - 1 } else { full_bytes };
        for &byte in &octets[..walk_len] {
            match self.descend(node, byte) {
                Some(next) => node = next,
                None => return Err(ErrorKind::NotFound),
            }
        }

        let mut found = false;
        if rem == 0 {
            let last_byte = octets[full_bytes - 1];
            let entry = &mut self.pool.get_mut(node).entries[last_byte as usize];
            if entry.is_valid() && entry.written_len == len {
                entry.clear_if_len(len);
                found = true;
            }
        } else {
            let byte = octets[full_bytes];
            let base = (byte as u16 & (0xFFu16 << (8 - rem))) as usize;
            let span = 1usize << (8 - rem);
            let entries = &mut self.pool.get_mut(node).entries;
            if entries[base].is_valid() && entries[base].written_len == len {
                for i in base..base + span {
                    entries[i].clear_if_len(len);
                }
                found = true;
            }
        }
        if !found {
            return Err(ErrorKind::NotFound);
        }
        self.prefix_count -= 1;
        Ok(())
    }

    fn descend(&self, node: u32, byte: u8) -> Option<u32> {
        let entry = &self.pool.get(node).entries[byte as usize];
        if entry.has_child() {
            Some(entry.child_index())
        } else {
            None
        }
    }

    fn descend_or_create(&mut self, node: u32, byte: u8) -> u32 {
        if let Some(child) = self.descend(node, byte) {
            return child;
        }
        let child = self.pool.allocate(Node8::new());
        self.pool.get_mut(node).entries[byte as usize].set_child(child, false);
        child
    }

    /// Walk the address, returning the longest-match next-hop, or `None`
    /// if no bound prefix covers it (caller applies the default route).
    #[inline]
    pub fn lookup_running_best(&self, addr: &AF) -> Option<u32> {
        let octets = addr.octets();
        let mut node = self.root;
        let mut best = None;
        for &byte in octets {
            let entry = &self.pool.get(node).entries[byte as usize];
            if entry.is_valid() {
                best = Some(entry.next_hop);
            }
            if entry.has_child() {
                node = entry.child_index();
            } else {
                break;
            }
        }
        best
    }

    #[inline]
    pub fn lookup_single(&self, addr: &AF) -> u32 {
        self.lookup_running_best(addr)
            .or(self.default_route)
            .unwrap_or(INVALID_NEXT_HOP)
    }

    pub fn lookup_batch(&self, addrs: &[AF], out: &mut [u32]) {
        debug_assert_eq!(addrs.len(), out.len());
        for (a, o) in addrs.iter().zip(out.iter_mut()) {
            *o = self.lookup_single(a);
        }
    }

    /// Walk the address, appending every valid entry seen (shortest
    /// length first) into `sink`. Used by [`crate::resultset`].
    pub fn lookup_all(&self, addr: &AF, mut sink: impl FnMut(u8, u32) -> Result<()>) -> Result<()> {
        if let Some(next_hop) = self.default_route {
            sink(0, next_hop)?;
        }
        let octets = addr.octets();
        let mut node = self.root;
        for &byte in octets {
            let entry = &self.pool.get(node).entries[byte as usize];
            if entry.is_valid() {
                sink(entry.written_len, entry.next_hop)?;
            }
            if entry.has_child() {
                node = entry.child_index();
            } else {
                break;
            }
        }
        Ok(())
    }
}

impl<AF: AddressFamily> Default for Trie8Index<AF> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Ipv4Addr;

    fn v4(a: u8, b: u8, c: u8, d: u8) -> Ipv4Addr {
        Ipv4Addr::new([a, b, c, d])
    }

    #[test]
    fn scenario_1_ipv4_trie8() {
        let mut idx: Trie8Index<Ipv4Addr> = Trie8Index::new();
        idx.insert(v4(10, 0, 0, 0), 8, 300).unwrap();
        idx.insert(v4(172, 16, 0, 0), 12, 400).unwrap();
        idx.insert(v4(192, 168, 0, 0), 16, 100).unwrap();
        idx.insert(v4(192, 168, 1, 0), 24, 200).unwrap();

        assert_eq!(idx.lookup_single(&v4(192, 168, 1, 1)), 200);
        assert_eq!(idx.lookup_single(&v4(192, 168, 2, 1)), 100);
        assert_eq!(idx.lookup_single(&v4(10, 1, 2, 3)), 300);
        assert_eq!(idx.lookup_single(&v4(172, 16, 5, 10)), 400);
        assert_eq!(idx.lookup_single(&v4(8, 8, 8, 8)), INVALID_NEXT_HOP);
    }

    #[test]
    fn scenario_2_default_route() {
        let mut idx: Trie8Index<Ipv4Addr> = Trie8Index::new();
        idx.insert(v4(0, 0, 0, 0), 0, 999).unwrap();
        idx.insert(v4(10, 0, 0, 0), 8, 100).unwrap();

        assert_eq!(idx.lookup_single(&v4(10, 1, 2, 3)), 100);
        assert_eq!(idx.lookup_single(&v4(1, 1, 1, 1)), 999);
        assert_eq!(idx.lookup_single(&v4(8, 8, 8, 8)), 999);
    }

    #[test]
    fn scenario_4_overlap_stack() {
        let mut idx: Trie8Index<Ipv4Addr> = Trie8Index::new();
        idx.insert(v4(10, 0, 0, 0), 8, 100).unwrap();
        idx.insert(v4(10, 1, 0, 0), 16, 200).unwrap();
        idx.insert(v4(10, 1, 2, 0), 24, 300).unwrap();
        idx.insert(v4(10, 1, 2, 3), 32, 400).unwrap();

        assert_eq!(idx.lookup_single(&v4(10, 1, 2, 3)), 400);
        assert_eq!(idx.lookup_single(&v4(10, 1, 2, 4)), 300);
        assert_eq!(idx.lookup_single(&v4(10, 1, 3, 1)), 200);
        assert_eq!(idx.lookup_single(&v4(10, 2, 0, 0)), 100);
    }

    #[test]
    fn insert_then_delete_restores_prior_result() {
        let mut idx: Trie8Index<Ipv4Addr> = Trie8Index::new();
        idx.insert(v4(10, 0, 0, 0), 8, 100).unwrap();
        let before = idx.lookup_single(&v4(10, 1, 2, 3));
        idx.insert(v4(10, 1, 2, 0), 24, 300).unwrap();
        assert_ne!(idx.lookup_single(&v4(10, 1, 2, 3)), before);
        idx.delete(v4(10, 1, 2, 0), 24).unwrap();
        assert_eq!(idx.lookup_single(&v4(10, 1, 2, 3)), before);
    }

    #[test]
    fn delete_missing_prefix_errors() {
        let mut idx: Trie8Index<Ipv4Addr> = Trie8Index::new();
        idx.insert(v4(10, 0, 0, 0), 8, 100).unwrap();
        assert_eq!(
            idx.delete(v4(192, 168, 0, 0), 16),
            Err(ErrorKind::NotFound)
        );
    }

    #[test]
    fn stride_boundary_20() {
        let mut idx: Trie8Index<Ipv4Addr> = Trie8Index::new();
        idx.insert(v4(10, 1, 16, 0), 20, 500).unwrap();
        assert_eq!(idx.lookup_single(&v4(10, 1, 16, 1)), 500);
        assert_eq!(idx.lookup_single(&v4(10, 1, 31, 255)), 500);
        assert_eq!(idx.lookup_single(&v4(10, 1, 32, 0)), INVALID_NEXT_HOP);
    }

    #[test]
    fn equal_length_reinsert_overwrites() {
        let mut idx: Trie8Index<Ipv4Addr> = Trie8Index::new();
        idx.insert(v4(10, 0, 0, 0), 24, 1).unwrap();
        idx.insert(v4(10, 0, 0, 0), 24, 2).unwrap();
        assert_eq!(idx.lookup_single(&v4(10, 0, 0, 5)), 2);
    }
}
