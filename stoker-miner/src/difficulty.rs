//! Share difficulty arithmetic.

use bitcoin::BlockHash;
use bitcoin::hashes::Hash;

/// The difficulty-1 pool target (`0x00000000ffff0000...`) as a float.
///
/// Share difficulty is this value divided by the hash interpreted as a
/// 256-bit integer. Pool-side difficulty accounting is conventionally done
/// in floating point; the ~2^-53 relative error is irrelevant against the
/// variance of the hashes themselves.
const TRUE_DIFF_ONE: f64 = 26959535291011309493156476344723991336010898738574164086137773096960.0;

/// Difficulty of a share, from its block hash.
///
/// Higher is better: a hash meeting pool difficulty D satisfies
/// `share_difficulty(hash) >= D`. An all-zero hash yields infinity.
pub fn share_difficulty(hash: &BlockHash) -> f64 {
    let value = hash
        .as_byte_array()
        .chunks_exact(8)
        .rev()
        .fold(0.0f64, |acc, chunk| {
            // Infallible: chunks_exact always yields 8 bytes.
            let word = u64::from_le_bytes(chunk.try_into().unwrap_or_default());
            acc * 1.8446744073709552e19 + word as f64
        });
    TRUE_DIFF_ONE / value
}
