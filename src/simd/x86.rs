//! x86/x86_64 batch lookup variants for DIR-24-8.
//!
//! Only the primary-table read is ever issued as a true vector gather:
//! the 2^24-entry primary array is one contiguous, uniformly-strided
//! buffer, exactly what a gather instruction wants. The tbl8 extension
//! groups are not laid out that way (each group interleaves its 256
//! next-hop records with 256 length bytes), so the rare extended lane -
//! a /25-/32 route - is resolved with a scalar read instead of a second
//! gather. Most addresses never take that branch.

use crate::dir24::{Dir24Index, EXTENDED_BIT, PAYLOAD_MASK, VALID_BIT};

#[inline]
fn resolve_lane(index: &Dir24Index, word: u32, primary_word: u32, default_hop: u32) -> u32 {
    if primary_word & VALID_BIT == 0 {
        return default_hop;
    }
    if primary_word & EXTENDED_BIT == 0 {
        return primary_word & PAYLOAD_MASK;
    }
    let group = primary_word & PAYLOAD_MASK;
    let last_byte = (word & 0xFF) as u8;
    let record = index.tbl8_word(group, last_byte);
    if record & VALID_BIT != 0 {
        record & PAYLOAD_MASK
    } else {
        default_hop
    }
}

/// Scalar resolution with software prefetch, the strategy used for the
/// targets below that lack a gather instruction: a lookahead window of
/// 8 primary-table cache lines is kept warm ahead of where the loop is
/// actually reading.
#[inline]
unsafe fn prefetching_scalar(index: &Dir24Index, words: &[u32], out: &mut [u32]) {
    use std::arch::x86_64::{_mm_prefetch, _MM_HINT_T0};
    const LOOKAHEAD: usize = 8;
    let primary = index.primary_words();
    let default_hop = index.default_next_hop();
    for i in 0..words.len() {
        if i + LOOKAHEAD < words.len() {
            let idx24 = (words[i + LOOKAHEAD] >> 8) as usize;
            _mm_prefetch(
                primary.as_ptr().add(idx24) as *const i8,
                _MM_HINT_T0,
            );
        }
        let idx24 = (words[i] >> 8) as usize;
        out[i] = resolve_lane(index, words[i], primary[idx24], default_hop);
    }
}

pub mod sse42 {
    use super::*;

    #[target_feature(enable = "sse4.2")]
    pub unsafe fn batch_lookup_words(index: &Dir24Index, words: &[u32], out: &mut [u32]) {
        prefetching_scalar(index, words, out);
    }
}

pub mod avx {
    use super::*;

    #[target_feature(enable = "avx")]
    pub unsafe fn batch_lookup_words(index: &Dir24Index, words: &[u32], out: &mut [u32]) {
        prefetching_scalar(index, words, out);
    }
}

pub mod avx2 {
    use super::*;
    use std::arch::x86_64::*;

    #[target_feature(enable = "avx2")]
    pub unsafe fn batch_lookup_words(index: &Dir24Index, words: &[u32], out: &mut [u32]) {
        let primary = index.primary_words();
        let default_hop = index.default_next_hop();

        let mut word_chunks = words.chunks_exact(8);
        let mut out_chunks = out.chunks_exact_mut(8);
        for (wchunk, ochunk) in (&mut word_chunks).zip(&mut out_chunks) {
            let w = _mm256_loadu_si256(wchunk.as_ptr() as *const __m256i);
            let idx24 = _mm256_srli_epi32(w, 8);
            let primary_vals =
                _mm256_i32gather_epi32(primary.as_ptr() as *const i32, idx24, 4);

            let mut gathered = [0i32; 8];
            _mm256_storeu_si256(gathered.as_mut_ptr() as *mut __m256i, primary_vals);

            for lane in 0..8 {
                ochunk[lane] = resolve_lane(
                    index,
                    wchunk[lane],
                    gathered[lane] as u32,
                    default_hop,
                );
            }
        }

        let rem_words = word_chunks.remainder();
        let rem_out = out_chunks.into_remainder();
        for (w, o) in rem_words.iter().zip(rem_out.iter_mut()) {
            let idx24 = (*w >> 8) as usize;
            *o = resolve_lane(index, *w, primary[idx24], default_hop);
        }
    }
}

pub mod avx512f {
    use super::*;
    use std::arch::x86_64::*;

    #[target_feature(enable = "avx512f")]
    pub unsafe fn batch_lookup_words(index: &Dir24Index, words: &[u32], out: &mut [u32]) {
        let primary = index.primary_words();
        let default_hop = index.default_next_hop();

        let mut word_chunks = words.chunks_exact(16);
        let mut out_chunks = out.chunks_exact_mut(16);
        for (wchunk, ochunk) in (&mut word_chunks).zip(&mut out_chunks) {
            let w = _mm512_loadu_si512(wchunk.as_ptr() as *const i32);
            let idx24 = _mm512_srli_epi32(w, 8);
            let primary_vals =
                _mm512_i32gather_epi32::<4>(idx24, primary.as_ptr() as *const u8);

            let mut gathered = [0i32; 16];
            _mm512_storeu_si512(gathered.as_mut_ptr() as *mut i32, primary_vals);

            for lane in 0..16 {
                ochunk[lane] = resolve_lane(
                    index,
                    wchunk[lane],
                    gathered[lane] as u32,
                    default_hop,
                );
            }
        }

        let rem_words = word_chunks.remainder();
        let rem_out = out_chunks.into_remainder();
        for (w, o) in rem_words.iter().zip(rem_out.iter_mut()) {
            let idx24 = (*w >> 8) as usize;
            *o = resolve_lane(index, *w, primary[idx24], default_hop);
        }
    }
}
