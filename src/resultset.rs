//! The multi-answer "longest-match-all" result type.
//!
//! Fed by each index's `lookup_all(addr, sink)` walk (see
//! [`crate::trie8`], [`crate::dir24`], [`crate::wide16`]), which calls
//! back into [`ResultSet::push`] for every bound prefix covering an
//! address, shortest length first.

use crate::error::{ErrorKind, Result};

/// One covering prefix: its length and bound next-hop.
pub type Match = (u8, u32);

/// A fixed-capacity, ordered collection of matches for one lookup.
///
/// The cap is chosen once at construction and never grown; a lookup
/// that would overflow it fails with [`ErrorKind::CapacityExceeded`]
/// rather than silently truncating the result.
pub struct ResultSet {
    entries: Vec<Match>,
    cap: usize,
}

impl ResultSet {
    pub fn with_capacity(cap: usize) -> Result<Self> {
        if cap == 0 {
            return Err(ErrorKind::ValidationError);
        }
        Ok(ResultSet {
            entries: Vec::with_capacity(cap),
            cap,
        })
    }

    /// Append a match, shortest-first order preserved by the caller's
    /// walk order. Errors once `cap` matches are already held.
    pub fn push(&mut self, len: u8, next_hop: u32) -> Result<()> {
        if self.entries.len() >= self.cap {
            return Err(ErrorKind::CapacityExceeded);
        }
        self.entries.push((len, next_hop));
        Ok(())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn as_slice(&self) -> &[Match] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Match> {
        self.entries.iter()
    }

    /// The most specific match (last one pushed), if any.
    pub fn longest(&self) -> Option<Match> {
        self.entries.last().copied()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a Match;
    type IntoIter = std::slice::Iter<'a, Match>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_capacity() {
        assert_eq!(
            ResultSet::with_capacity(0).err(),
            Some(ErrorKind::ValidationError)
        );
    }

    #[test]
    fn push_until_capacity_then_errors() {
        let mut rs = ResultSet::with_capacity(2).unwrap();
        rs.push(8, 1).unwrap();
        rs.push(16, 2).unwrap();
        assert_eq!(rs.push(24, 3), Err(ErrorKind::CapacityExceeded));
        assert_eq!(rs.len(), 2);
    }

    #[test]
    fn longest_is_last_pushed() {
        let mut rs = ResultSet::with_capacity(4).unwrap();
        rs.push(8, 100).unwrap();
        rs.push(24, 200).unwrap();
        assert_eq!(rs.longest(), Some((24, 200)));
    }

    #[test]
    fn clear_resets_len_but_keeps_capacity() {
        let mut rs = ResultSet::with_capacity(2).unwrap();
        rs.push(8, 1).unwrap();
        rs.clear();
        assert!(rs.is_empty());
        assert_eq!(rs.capacity(), 2);
        rs.push(8, 1).unwrap();
        rs.push(16, 2).unwrap();
        assert!(rs.push(24, 3).is_err());
    }
}
