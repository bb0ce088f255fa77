//! DIR-24-8: the IPv4-only, one-to-two-indexed-read lookup table.
//!
//! Most real BGP routes are /8-/24; a flat `2^24`-entry primary table
//! answers those with a single indexed read. A small fraction of
//! /25-/32 routes extends a primary slot into a shared 256-entry tbl8
//! group, costing one extra indexed read.

use crate::address::{Ipv4Addr, INVALID_NEXT_HOP};
use crate::error::{ErrorKind, Result};
use log::{info, trace};
use zerocopy::{Immutable, IntoBytes, KnownLayout};

const PRIMARY_LEN: usize = 1 << 24;

/// `bit 31 = valid, bit 30 = extended, bits 29..0 = next-hop or tbl8 group`.
/// Visible at `pub(crate)` so [`crate::simd`] can interpret gathered
/// primary words without going through the scalar lookup path.
pub(crate) const VALID_BIT: u32 = 1 << 31;
pub(crate) const EXTENDED_BIT: u32 = 1 << 30;
pub(crate) const PAYLOAD_MASK: u32 = (1 << 30) - 1;
const MAX_NEXT_HOP: u32 = PAYLOAD_MASK;

/// `#[repr(transparent)]` over a bare `u32` so a primary-table slice can be
/// reinterpreted as raw words for the gather-based SIMD variants in
/// [`crate::simd`] without padding or endianness surprises; `IntoBytes` /
/// `Immutable` / `KnownLayout` make that layout guarantee load-bearing
/// rather than just commentary.
#[derive(Clone, Copy, Default, Immutable, IntoBytes, KnownLayout)]
#[repr(transparent)]
struct Record(u32);

impl Record {
    #[inline]
    fn is_valid(self) -> bool {
        self.0 & VALID_BIT != 0
    }

    #[inline]
    fn is_extended(self) -> bool {
        self.0 & EXTENDED_BIT != 0
    }

    #[inline]
    fn payload(self) -> u32 {
        self.0 & PAYLOAD_MASK
    }

    #[inline]
    fn plain(next_hop: u32) -> Self {
        Record(VALID_BIT | (next_hop & PAYLOAD_MASK))
    }

    #[inline]
    fn extended(group: u32) -> Self {
        Record(VALID_BIT | EXTENDED_BIT | (group & PAYLOAD_MASK))
    }

    #[inline]
    fn invalid() -> Self {
        Record(0)
    }
}

/// Per-entry length bookkeeping for the primary table, mirroring
/// [`crate::arena::Entry::written_len`] so a later, shorter `/L` insert
/// cannot clobber a longer one already resolved to the same slot.
#[derive(Clone, Copy, Default)]
struct Meta {
    len: u8,
}

/// A 256-entry extension block for `/25`-`/32` routes.
#[derive(Clone)]
struct Tbl8Group {
    records: [Record; 256],
    meta: [Meta; 256],
}

impl Tbl8Group {
    fn filled_with(record: Record, len: u8) -> Self {
        Tbl8Group {
            records: [record; 256],
            meta: [Meta { len }; 256],
        }
    }
}

pub struct Dir24Index {
    primary: Vec<Record>,
    primary_meta: Vec<Meta>,
    tbl8: Vec<Tbl8Group>,
    default_route: Option<u32>,
    prefix_count: usize,
}

impl Dir24Index {
    pub fn new() -> Self {
        info!("allocating DIR-24-8 primary table ({PRIMARY_LEN} entries)");
        Dir24Index {
            primary: vec![Record::invalid(); PRIMARY_LEN],
            primary_meta: vec![Meta::default(); PRIMARY_LEN],
            tbl8: Vec::new(),
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

    fn validate_next_hop(next_hop: u32) -> Result<()> {
        if next_hop > MAX_NEXT_HOP {
            return Err(ErrorKind::ValidationError);
        }
        Ok(())
    }

    pub fn insert(&mut self, addr: Ipv4Addr, len: u8, next_hop: u32) -> Result<()> {
        if len > 32 {
            return Err(ErrorKind::ValidationError);
        }
        Self::validate_next_hop(next_hop)?;

        if len == 0 {
            self.default_route = Some(next_hop);
            return Ok(());
        }

        let word = addr.as_u32();

        if len <= 24 {
            let idx24 = (word >> 8) as usize;
            let shift = 24 - len;
            let base = (idx24 >> shift) << shift;
            let span = 1usize << shift;
            for i in base..base + span {
                if self.primary[i].is_extended() {
                    // A longer /25-/32 already lives below this /24 slot;
                    // descend into its tbl8 group and apply the same
                    // "don't clobber a longer prefix" rule per group entry
                    // instead of skipping the whole slot.
                    let group = &mut self.tbl8[self.primary[i].payload() as usize];
                    for (record, meta) in group.records.iter_mut().zip(group.meta.iter_mut()) {
                        if !record.is_valid() || len >= meta.len {
                            *record = Record::plain(next_hop);
                            *meta = Meta { len };
                        }
                    }
                } else if !self.primary[i].is_valid() || len >= self.primary_meta[i].len {
                    self.primary[i] = Record::plain(next_hop);
                    self.primary_meta[i] = Meta { len };
                }
            }
        } else {
            let idx24 = (word >> 8) as usize;
            let group_idx = if self.primary[idx24].is_extended() {
                self.primary[idx24].payload() as usize
            } else {
                let seed = if self.primary[idx24].is_valid() {
                    (self.primary[idx24], self.primary_meta[idx24].len)
                } else {
                    (Record::invalid(), 0)
                };
                let group_idx = self.tbl8.len();
                self.tbl8
                    .try_reserve(1)
                    .map_err(|_| ErrorKind::OutOfMemory)?;
                self.tbl8.push(Tbl8Group::filled_with(seed.0, seed.1));
                self.primary[idx24] = Record::extended(group_idx as u32);
                group_idx
            };

            let last_byte = (word & 0xFF) as usize;
            let shift = 32 - len;
            let base = (last_byte >> shift) << shift;
            let span = 1usize << shift;
            let group = &mut self.tbl8[group_idx];
            for i in base..base + span {
                if !group.records[i].is_valid() || len >= group.meta[i].len {
                    group.records[i] = Record::plain(next_hop);
                    group.meta[i] = Meta { len };
                }
            }
        }
        self.prefix_count += 1;
        trace!("dir24 insert len={len} next_hop={next_hop}");
        Ok(())
    }

    pub fn delete(&mut self, addr: Ipv4Addr, len: u8) -> Result<()> {
        if len > 32 {
            return Err(ErrorKind::ValidationError);
        }
        if len == 0 {
            if self.default_route.take().is_none() {
                return Err(ErrorKind::NotFound);
            }
            return Ok(());
        }

        let word = addr.as_u32();
        let mut found = false;

        if len <= 24 {
            let idx24 = (word >> 8) as usize;
            let shift = 24 - len;
            let base = (idx24 >> shift) << shift;
            let span = 1usize << shift;
            for i in base..base + span {
                if self.primary[i].is_extended() {
                    let group = &mut self.tbl8[self.primary[i].payload() as usize];
                    for (record, meta) in group.records.iter_mut().zip(group.meta.iter_mut()) {
                        if record.is_valid() && meta.len == len {
                            *record = Record::invalid();
                            *meta = Meta::default();
                            found = true;
                        }
                    }
                } else if self.primary[i].is_valid() && self.primary_meta[i].len == len {
                    self.primary[i] = Record::invalid();
                    self.primary_meta[i] = Meta::default();
                    found = true;
                }
            }
        } else {
            let idx24 = (word >> 8) as usize;
            if self.primary[idx24].is_extended() {
                let group_idx = self.primary[idx24].payload() as usize;
                let last_byte = (word & 0xFF) as usize;
                let shift = 32 - len;
                let base = (last_byte >> shift) << shift;
                let span = 1usize << shift;
                let group = &mut self.tbl8[group_idx];
                if group.records[base].is_valid() && group.meta[base].len == len {
                    for i in base..base + span {
                        if group.meta[i].len == len {
                            group.records[i] = Record::invalid();
                            group.meta[i] = Meta::default();
                        }
                    }
                    found = true;
                }
            }
        }

        if !found {
            return Err(ErrorKind::NotFound);
        }
        self.prefix_count -= 1;
        Ok(())
    }

    #[inline]
    fn lookup_record(&self, word: u32) -> Record {
        let idx24 = (word >> 8) as usize;
        let primary = self.primary[idx24];
        if !primary.is_extended() {
            return primary;
        }
        let group = &self.tbl8[primary.payload() as usize];
        group.records[(word & 0xFF) as usize]
    }

    #[inline]
    pub fn lookup_single_word(&self, word: u32) -> u32 {
        let record = self.lookup_record(word);
        if record.is_valid() {
            record.payload()
        } else {
            self.default_route.unwrap_or(INVALID_NEXT_HOP)
        }
    }

    #[inline]
    pub fn lookup_single(&self, addr: &Ipv4Addr) -> u32 {
        self.lookup_single_word(addr.as_u32())
    }

    pub fn lookup_batch(&self, addrs: &[Ipv4Addr], out: &mut [u32]) {
        debug_assert_eq!(addrs.len(), out.len());
        for (a, o) in addrs.iter().zip(out.iter_mut()) {
            *o = self.lookup_single(a);
        }
    }

    /// Lowest-latency batch form: a contiguous array of raw big-endian
    /// IPv4 words, no byte-level address loads needed.
    pub fn lookup_batch_words(&self, words: &[u32], out: &mut [u32]) {
        debug_assert_eq!(words.len(), out.len());
        for (w, o) in words.iter().zip(out.iter_mut()) {
            *o = self.lookup_single_word(*w);
        }
    }

    /// Raw primary-table words, laid out exactly as the packed record
    /// format documents. Used by [`crate::simd`]'s gather-based batch
    /// drivers, which index this table themselves instead of going
    /// through [`Dir24Index::lookup_record`].
    pub(crate) fn primary_words(&self) -> &[u32] {
        // Safe: `Record` is `#[repr(transparent)]` over `u32`.
        unsafe {
            std::slice::from_raw_parts(
                self.primary.as_ptr() as *const u32,
                self.primary.len(),
            )
        }
    }

    pub(crate) fn default_next_hop(&self) -> u32 {
        self.default_route.unwrap_or(INVALID_NEXT_HOP)
    }

    /// Resolve one lane flagged `extended` by a gathered primary word:
    /// returns the packed tbl8 record word for `(group, last_byte)`.
    pub(crate) fn tbl8_word(&self, group: u32, last_byte: u8) -> u32 {
        self.tbl8[group as usize].records[last_byte as usize].0
    }

    pub fn lookup_all(
        &self,
        addr: &Ipv4Addr,
        mut sink: impl FnMut(u8, u32) -> Result<()>,
    ) -> Result<()> {
        if let Some(next_hop) = self.default_route {
            sink(0, next_hop)?;
        }
        let word = addr.as_u32();
        let idx24 = (word >> 8) as usize;
        let primary = self.primary[idx24];
        if primary.is_valid() && !primary.is_extended() {
            sink(self.primary_meta[idx24].len, primary.payload())?;
        }
        if primary.is_extended() {
            let group = &self.tbl8[primary.payload() as usize];
            let slot = (word & 0xFF) as usize;
            if group.records[slot].is_valid() {
                sink(group.meta[slot].len, group.records[slot].payload())?;
            }
        }
        Ok(())
    }
}

impl Default for Dir24Index {
    fn default() -> Self {
        Self::new()
    }
}
