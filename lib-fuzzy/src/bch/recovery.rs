//! Parity-guided retry for error patterns just past the decoder bound
//!
//! The word is split into eight 16-bit blocks (the last holds 15 bits).
//! Enrollment records one parity bit per block; at reproduction time a
//! parity mismatch marks blocks holding an odd number of flips. Retrying
//! the decode with one extra flip inside each mismatched block recovers
//! patterns of t+1 errors whose surplus error sits in a flagged block.
//! Every accepted retry is re-encoded and distance-checked, so the retry
//! can never return a word farther than the correction radius.

use crate::error::BchError;

use super::{decode, encode, BCH_N, BCH_T};

/// Number of parity blocks
pub const PARITY_BLOCKS: usize = 8;
/// Bits per parity block (the final block holds `BCH_N % BLOCK_BITS`)
pub const BLOCK_BITS: usize = 16;

/// One parity bit per 16-bit block of a 127-bit word
pub fn block_parities(word: u128) -> u8 {
    let mut parity = 0u8;
    for block in 0..PARITY_BLOCKS {
        let lo = block * BLOCK_BITS;
        let hi = (lo + BLOCK_BITS).min(BCH_N);
        let chunk = (word >> lo) & ((1u128 << (hi - lo)) - 1);
        if chunk.count_ones() % 2 == 1 {
            parity |= 1 << block;
        }
    }
    parity
}

/// Decode with one bounded retry pass guided by a block-parity mismatch
///
/// `mismatch` flags the blocks whose recorded parity disagrees with the
/// received word. Returns the corrected message and the total number of
/// bits that differed from the re-encoded codeword.
pub fn decode_with_parity(noisy: u128, mismatch: u8) -> Result<(u64, u8), BchError> {
    if let Ok(result) = decode(noisy) {
        return Ok(result);
    }

    for block in 0..PARITY_BLOCKS {
        if mismatch & (1 << block) == 0 {
            continue;
        }
        let lo = block * BLOCK_BITS;
        let hi = (lo + BLOCK_BITS).min(BCH_N);
        for bit in lo..hi {
            let candidate = noisy ^ (1u128 << bit);
            if let Ok((msg, _)) = decode(candidate) {
                let distance = (encode(msg) ^ noisy).count_ones();
                if distance as usize <= BCH_T + 1 {
                    return Ok((msg, distance as u8));
                }
            }
        }
    }

    Err(BchError::UncorrectableErrors)
}
