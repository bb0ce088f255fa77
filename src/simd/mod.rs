//! Runtime-dispatched batch lookup drivers.
//!
//! A resolver picks the best instruction-set variant available on the
//! running CPU exactly once (via [`std::is_x86_feature_detected!`]) and
//! caches the chosen function pointer in a [`OnceLock`]; the hot path
//! after that first call contains no feature check at all. Non-x86
//! targets never compile the detection code or the intrinsics - the
//! scalar variant is bound at compile time instead.
//!
//! Only DIR-24-8 gets accelerated variants: its flat primary table is
//! the one structure in this crate a gather instruction actually helps.
//! Trie-8 and Wide-16 batch lookups stay scalar loops (see
//! [`crate::trie8::Trie8Index::lookup_batch`],
//! [`crate::wide16::Wide16Index::lookup_batch`]) - there is no indexed
//! array to vectorize the way DIR-24-8's does.

pub mod scalar;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod x86;

use crate::address::Ipv4Addr;
use crate::dir24::Dir24Index;
use std::sync::OnceLock;

type BatchWordsFn = unsafe fn(&Dir24Index, &[u32], &mut [u32]);

static DISPATCH: OnceLock<BatchWordsFn> = OnceLock::new();

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn resolve() -> BatchWordsFn {
    if std::is_x86_feature_detected!("avx512f") {
        return x86::avx512f::batch_lookup_words;
    }
    if std::is_x86_feature_detected!("avx2") {
        return x86::avx2::batch_lookup_words;
    }
    if std::is_x86_feature_detected!("avx") {
        return x86::avx::batch_lookup_words;
    }
    if std::is_x86_feature_detected!("sse4.2") {
        return x86::sse42::batch_lookup_words;
    }
    scalar::batch_lookup_words
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
fn resolve() -> BatchWordsFn {
    scalar::batch_lookup_words
}

/// Dispatch the contiguous-words fast case (see
/// [`crate::dir24::Dir24Index::lookup_batch_words`]) through whichever
/// variant this CPU supports.
pub fn dispatch_batch_words(index: &Dir24Index, words: &[u32], out: &mut [u32]) {
    debug_assert_eq!(words.len(), out.len());
    let f = *DISPATCH.get_or_init(resolve);
    // Safe: `resolve` only ever returns a variant whose required target
    // feature was confirmed present by `is_x86_feature_detected!`, or
    // the feature-free scalar fallback.
    unsafe { f(index, words, out) }
}

/// Dispatch the general case (disjoint `Ipv4Addr` values) by converting
/// to words and reusing the same resolved variant.
pub fn dispatch_batch(index: &Dir24Index, addrs: &[Ipv4Addr], out: &mut [u32]) {
    debug_assert_eq!(addrs.len(), out.len());
    let words: Vec<u32> = addrs.iter().map(|a| a.as_u32()).collect();
    dispatch_batch_words(index, &words, out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::INVALID_NEXT_HOP;

    fn v4(a: u8, b: u8, c: u8, d: u8) -> Ipv4Addr {
        Ipv4Addr::new([a, b, c, d])
    }

    #[test]
    fn dispatched_batch_matches_scalar_reference() {
        let mut idx = Dir24Index::new();
        idx.insert(v4(10, 0, 0, 0), 8, 300).unwrap();
        idx.insert(v4(192, 168, 0, 0), 16, 100).unwrap();
        idx.insert(v4(192, 168, 1, 0), 24, 200).unwrap();
        idx.insert(v4(192, 168, 1, 128), 25, 250).unwrap();

        let addrs = [
            v4(192, 168, 1, 1),
            v4(192, 168, 1, 200),
            v4(192, 168, 2, 1),
            v4(10, 1, 2, 3),
            v4(8, 8, 8, 8),
        ];

        let mut expected = [0u32; 5];
        scalar::batch_lookup(&idx, &addrs, &mut expected);
        assert_eq!(expected, [200, 250, 100, 300, INVALID_NEXT_HOP]);

        let mut actual = [0u32; 5];
        dispatch_batch(&idx, &addrs, &mut actual);
        assert_eq!(actual, expected);
    }

    #[test]
    fn dispatch_handles_length_not_a_multiple_of_lane_width() {
        let mut idx = Dir24Index::new();
        idx.insert(v4(0, 0, 0, 0), 0, 1).unwrap();
        let addrs: Vec<Ipv4Addr> = (0u8..19).map(|i| v4(1, 2, 3, i)).collect();
        let mut out = vec![0u32; addrs.len()];
        dispatch_batch(&idx, &addrs, &mut out);
        assert!(out.iter().all(|&h| h == 1));
    }
}
