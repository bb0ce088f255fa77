//! Wide-16: the IPv6 index. The first three strides index 16 bits each
//! (covering the first 48 bits - the common IPv6 allocation boundary),
//! cutting the level count for a typical `/48` from 16 down to 3; the
//! remaining ten strides fall back to 8 bits each, reusing the same
//! [`crate::trie8::Node8`] pool Trie-8 uses.

use crate::address::{Ipv6Addr, INVALID_NEXT_HOP};
use crate::arena::{Arena, Entry};
use crate::error::{ErrorKind, Result};
use crate::trie8::Node8;
use log::trace;

const WIDE_LEVELS: usize = 3;
const LEVEL_COUNT: usize = 13;
/// Bit width consumed at each of the 13 levels: 16 bits for the first
/// three, 8 bits for the rest (48 + 10*8 = 128).
const WIDTHS: [u8; LEVEL_COUNT] = [16, 16, 16, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8];
const WIDE_WIDTH: usize = 1 << 16;

/// A single 65,536-entry node for one of the first three strides.
#[derive(Clone)]
pub struct Node16 {
    pub entries: Vec<Entry>,
}

impl Node16 {
    fn new() -> Self {
        Node16 {
            entries: vec![Entry::default(); WIDE_WIDTH],
        }
    }
}

/// The node a walk currently sits on, tagged by which pool it lives in.
#[derive(Clone, Copy)]
enum Cursor {
    Wide(u32),
    Narrow(u32),
}

fn level_is_wide(level: usize) -> bool {
    level < WIDE_LEVELS
}

/// The per-level index keys for one address: the first three as 16-bit
/// values, the rest as 8-bit values, all widened to `usize`.
fn keys(addr: &Ipv6Addr) -> [usize; LEVEL_COUNT] {
    let o = addr.0;
    [
        u16::from_be_bytes([o[0], o[1]]) as usize,
        u16::from_be_bytes([o[2], o[3]]) as usize,
        u16::from_be_bytes([o[4], o[5]]) as usize,
        o[6] as usize,
        o[7] as usize,
        o[8] as usize,
        o[9] as usize,
        o[10] as usize,
        o[11] as usize,
        o[12] as usize,
        o[13] as usize,
        o[14] as usize,
        o[15] as usize,
    ]
}

/// Locate which level a prefix length falls into, and how many bits of
/// that level's stride it consumes (1..=width of that level). A length
/// that exactly completes a level (`rem == width`) still resolves to
/// that same level with `rem` equal to the full width - the expansion
/// below then naturally covers a single entry instead of a range, the
/// same effect a dedicated "stride-aligned" case would have.
fn locate(len: u8) -> (usize, u8) {
    let mut remaining = len;
    for (level, &width) in WIDTHS.iter().enumerate() {
        if remaining <= width {
            return (level, remaining);
        }
        remaining -= width;
    }
    unreachable!("len must be <= 128, checked by the caller");
}

pub struct Wide16Index {
    wide_pool: Arena<Node16>,
    narrow_pool: Arena<Node8>,
    root: u32,
    default_route: Option<u32>,
    prefix_count: usize,
}

impl Wide16Index {
    pub fn new() -> Self {
        let mut narrow_pool = Arena::new();
        narrow_pool
            .reserve(2)
            .expect("initial reservation cannot fail");
        narrow_pool.allocate(Node8::default()); // reserved index 0, never used
        let mut wide_pool = Arena::new();
        wide_pool
            .reserve(1)
            .expect("initial reservation cannot fail");
        let root = wide_pool.allocate(Node16::new());
        Wide16Index {
            wide_pool,
            narrow_pool,
            root,
            default_route: None,
            prefix_count: 0,
        }
    }

    pub fn prefix_count(&self) -> usize {
        self.prefix_count
    }

    pub fn default_route(&self) -> Option<u32> {
        self.default_route
    }

    /// How many new wide-pool / narrow-pool nodes a walk of `levels`
    /// steps could allocate in the worst case. Wide children are only
    /// ever created while stepping off level 0 or level 1 (their child
    /// is still within the first three, wide, levels); every later step
    /// creates a narrow child.
    fn reserve_counts(levels: usize) -> (usize, usize) {
        let wide = levels.min(2);
        let narrow = levels.saturating_sub(2);
        (wide, narrow)
    }

    fn descend_or_create(&mut self, cur: Cursor, level: usize, key: usize) -> Cursor {
        match cur {
            Cursor::Wide(node) => {
                let entry = self.wide_pool.get(node).entries[key];
                if entry.has_child() {
                    return if entry.is_wide_child() {
                        Cursor::Wide(entry.child_index())
                    } else {
                        Cursor::Narrow(entry.child_index())
                    };
                }
                if level_is_wide(level + 1) {
                    let child = self.wide_pool.allocate(Node16::new());
                    self.wide_pool.get_mut(node).entries[key].set_child(child, true);
                    Cursor::Wide(child)
                } else {
                    let child = self.narrow_pool.allocate(Node8::default());
                    self.wide_pool.get_mut(node).entries[key].set_child(child, false);
                    Cursor::Narrow(child)
                }
            }
            Cursor::Narrow(node) => {
                let entry = self.narrow_pool.get(node).entries[key];
                if entry.has_child() {
                    return Cursor::Narrow(entry.child_index());
                }
                let child = self.narrow_pool.allocate(Node8::default());
                self.narrow_pool.get_mut(node).entries[key].set_child(child, false);
                Cursor::Narrow(child)
            }
        }
    }

    fn descend(&self, cur: Cursor, key: usize) -> Option<Cursor> {
        match cur {
            Cursor::Wide(node) => {
                let entry = &self.wide_pool.get(node).entries[key];
                if !entry.has_child() {
                    return None;
                }
                Some(if entry.is_wide_child() {
                    Cursor::Wide(entry.child_index())
                } else {
                    Cursor::Narrow(entry.child_index())
                })
            }
            Cursor::Narrow(node) => {
                let entry = &self.narrow_pool.get(node).entries[key];
                if !entry.has_child() {
                    return None;
                }
                Some(Cursor::Narrow(entry.child_index()))
            }
        }
    }

    fn entries_mut(&mut self, cur: Cursor) -> &mut [Entry] {
        match cur {
            Cursor::Wide(node) => &mut self.wide_pool.get_mut(node).entries,
            Cursor::Narrow(node) => &mut self.narrow_pool.get_mut(node).entries,
        }
    }

    pub fn insert(&mut self, addr: Ipv6Addr, len: u8, next_hop: u32) -> Result<()> {
        if len > 128 {
            return Err(ErrorKind::ValidationError);
        }
        if len == 0 {
            self.default_route = Some(next_hop);
            return Ok(());
        }

        let keys = keys(&addr);
        let (level, rem) = locate(len);

        let (wide_reserve, narrow_reserve) = Self::reserve_counts(level);
        self.wide_pool.reserve(wide_reserve)?;
        self.narrow_pool.reserve(narrow_reserve)?;

        let mut cur = Cursor::Wide(self.root);
        for l in 0..level {
            cur = self.descend_or_create(cur, l, keys[l]);
        }

        let width = WIDTHS[level];
        let shift = width - rem;
        let key = keys[level];
        let base = key & !((1usize << shift) - 1);
        let span = 1usize << shift;
        let entries = self.entries_mut(cur);
        for i in base..base + span {
            entries[i].write_if_longer_or_equal(len, next_hop);
        }

        self.prefix_count += 1;
        trace!("wide16 insert len={len} next_hop={next_hop}");
        Ok(())
    }

    pub fn delete(&mut self, addr: Ipv6Addr, len: u8) -> Result<()> {
        if len > 128 {
            return Err(ErrorKind::ValidationError);
        }
        if len == 0 {
            if self.default_route.take().is_none() {
                return Err(ErrorKind::NotFound);
            }
            return Ok(());
        }

        let keys = keys(&addr);
        let (level, rem) = locate(len);

        let mut cur = Cursor::Wide(self.root);
        for l in 0..level {
            cur = match self.descend(cur, keys[l]) {
                Some(next) => next,
                None => return Err(ErrorKind::NotFound),
            };
        }

        let width = WIDTHS[level];
        let shift = width - rem;
        let key = keys[level];
        let base = key & !((1usize << shift) - 1);
        let span = 1usize << shift;
        let entries = self.entries_mut(cur);
        if !entries[base].is_valid() || entries[base].written_len != len {
            return Err(ErrorKind::NotFound);
        }
        for i in base..base + span {
            entries[i].clear_if_len(len);
        }
        self.prefix_count -= 1;
        Ok(())
    }

    #[inline]
    pub fn lookup_running_best(&self, addr: &Ipv6Addr) -> Option<u32> {
        let keys = keys(addr);
        let mut best = None;
        let mut cur = Cursor::Wide(self.root);
        for &key in keys.iter() {
            let entry = match cur {
                Cursor::Wide(node) => &self.wide_pool.get(node).entries[key],
                Cursor::Narrow(node) => &self.narrow_pool.get(node).entries[key],
            };
            if entry.is_valid() {
                best = Some(entry.next_hop);
            }
            if !entry.has_child() {
                break;
            }
            cur = if entry.is_wide_child() {
                Cursor::Wide(entry.child_index())
            } else {
                Cursor::Narrow(entry.child_index())
            };
        }
        best
    }

    #[inline]
    pub fn lookup_single(&self, addr: &Ipv6Addr) -> u32 {
        self.lookup_running_best(addr)
            .or(self.default_route)
            .unwrap_or(INVALID_NEXT_HOP)
    }

    pub fn lookup_batch(&self, addrs: &[Ipv6Addr], out: &mut [u32]) {
        debug_assert_eq!(addrs.len(), out.len());
        for (a, o) in addrs.iter().zip(out.iter_mut()) {
            *o = self.lookup_single(a);
        }
    }

    pub fn lookup_all(
        &self,
        addr: &Ipv6Addr,
        mut sink: impl FnMut(u8, u32) -> Result<()>,
    ) -> Result<()> {
        if let Some(next_hop) = self.default_route {
            sink(0, next_hop)?;
        }
        let keys = keys(addr);
        let mut cur = Cursor::Wide(self.root);
        for &key in keys.iter() {
            let entry = match cur {
                Cursor::Wide(node) => &self.wide_pool.get(node).entries[key],
                Cursor::Narrow(node) => &self.narrow_pool.get(node).entries[key],
            };
            if entry.is_valid() {
                sink(entry.written_len, entry.next_hop)?;
            }
            if !entry.has_child() {
                break;
            }
            cur = if entry.is_wide_child() {
                Cursor::Wide(entry.child_index())
            } else {
                Cursor::Narrow(entry.child_index())
            };
        }
        Ok(())
    }
}

impl Default for Wide16Index {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v6(segments: [u16; 8]) -> Ipv6Addr {
        let addr = std::net::Ipv6Addr::new(
            segments[0],
            segments[1],
            segments[2],
            segments[3],
            segments[4],
            segments[5],
            segments[6],
            segments[7],
        );
        Ipv6Addr::from(addr)
    }

    #[test]
    fn scenario_3_ipv6_wide16() {
        let mut idx = Wide16Index::new();
        idx.insert(v6([0x2001, 0x0db8, 0, 0, 0, 0, 0, 0]), 32, 100)
            .unwrap();
        idx.insert(v6([0x2001, 0x0db8, 0, 1, 0, 0, 0, 0]), 64, 200)
            .unwrap();
        idx.insert(v6([0xfe80, 0, 0, 0, 0, 0, 0, 0]), 10, 300)
            .unwrap();

        assert_eq!(
            idx.lookup_single(&v6([0x2001, 0x0db8, 0, 1, 0, 0, 0, 1])),
            200
        );
        assert_eq!(
            idx.lookup_single(&v6([0x2001, 0x0db8, 0, 2, 0, 0, 0, 1])),
            100
        );
        assert_eq!(idx.lookup_single(&v6([0xfe80, 0, 0, 0, 0, 0, 0, 1])), 300);
        assert_eq!(
            idx.lookup_single(&v6([0x3001, 0, 0, 0, 0, 0, 0, 1])),
            INVALID_NEXT_HOP
        );
    }

    #[test]
    fn wide48_and_64_longer_wins() {
        let mut idx = Wide16Index::new();
        idx.insert(v6([0x2001, 0xdb8, 0, 0, 0, 0, 0, 0]), 48, 1)
            .unwrap();
        idx.insert(v6([0x2001, 0xdb8, 0, 0, 0, 0, 0, 0]), 64, 2)
            .unwrap();
        assert_eq!(idx.lookup_single(&v6([0x2001, 0xdb8, 0, 0, 1, 0, 0, 0])), 2);
        assert_eq!(idx.lookup_single(&v6([0x2001, 0xdb8, 0, 1, 0, 0, 0, 0])), 1);
    }

    #[test]
    fn narrow_boundary_at_bit_56() {
        let mut idx = Wide16Index::new();
        // segments[3] = 0x0000 means o[6] = 0, o[7] = 0; /56 covers bytes
        // 0..=6, so only o[6] matters here, not o[7].
        idx.insert(v6([0x2001, 0xdb8, 0, 0, 0, 0, 0, 0]), 56, 7)
            .unwrap();
        assert_eq!(
            idx.lookup_single(&v6([0x2001, 0xdb8, 0, 0, 0xff00, 0, 0, 1])),
            7
        );
        // segments[3] = 0x0100 sets o[6] = 1, breaking the match.
        assert_eq!(
            idx.lookup_single(&v6([0x2001, 0xdb8, 0, 0x0100, 0, 0, 0, 1])),
            INVALID_NEXT_HOP
        );
    }

    #[test]
    fn insert_then_delete_restores_prior_result() {
        let mut idx = Wide16Index::new();
        idx.insert(v6([0x2001, 0xdb8, 0, 0, 0, 0, 0, 0]), 32, 100)
            .unwrap();
        let before = idx.lookup_single(&v6([0x2001, 0xdb8, 5, 5, 0, 0, 0, 1]));
        idx.insert(v6([0x2001, 0xdb8, 0, 1, 0, 0, 0, 0]), 64, 200)
            .unwrap();
        idx.delete(v6([0x2001, 0xdb8, 0, 1, 0, 0, 0, 0]), 64)
            .unwrap();
        assert_eq!(
            idx.lookup_single(&v6([0x2001, 0xdb8, 0, 1, 0, 0, 0, 1])),
            before
        );
    }

    #[test]
    fn delete_missing_prefix_errors() {
        let mut idx = Wide16Index::new();
        idx.insert(v6([0x2001, 0xdb8, 0, 0, 0, 0, 0, 0]), 32, 1)
            .unwrap();
        assert_eq!(
            idx.delete(v6([0xfe80, 0, 0, 0, 0, 0, 0, 0]), 16),
            Err(ErrorKind::NotFound)
        );
    }
}
