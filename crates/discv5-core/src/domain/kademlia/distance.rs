//! XOR distance metric.

use std::cmp::Ordering;

use crate::domain::KademliaError;

fn check_lengths(a: &[u8], b: &[u8]) -> Result<(), KademliaError> {
    if a.len() != b.len() {
        return Err(KademliaError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(())
}

/// Log-distance between two equal-length identifiers.
///
/// This is the bit-length of `a XOR b`, i.e. the position (counted from 1 at
/// the least significant bit) of the most significant differing bit. It is
/// NOT the number of differing bits: `[0x80]` and `[0x00]` are at distance 8
/// even though a single bit differs.
///
/// # Properties
/// - Symmetric: `xor_dist(a, b) == xor_dist(b, a)`
/// - `xor_dist(a, a) == 0`
/// - Range `0..=8 * a.len()`, which is also the bucket index space
pub fn xor_dist(a: &[u8], b: &[u8]) -> Result<usize, KademliaError> {
    check_lengths(a, b)?;

    for (i, (x, y)) in a.iter().zip(b).enumerate() {
        let xor = x ^ y;
        if xor != 0 {
            return Ok((a.len() - i) * 8 - xor.leading_zeros() as usize);
        }
    }

    Ok(0)
}

/// Compare `center XOR a` against `center XOR b` as big-endian integers.
///
/// Finer than comparing [`xor_dist`] values: two keys in the same bucket are
/// still strictly ordered unless they are identical.
pub fn xor_dist_cmp(center: &[u8], a: &[u8], b: &[u8]) -> Result<Ordering, KademliaError> {
    check_lengths(center, a)?;
    check_lengths(center, b)?;
    Ok(xor_cmp_unchecked(center, a, b))
}

/// [`xor_dist_cmp`] for inputs already known to share a length.
pub(crate) fn xor_cmp_unchecked(center: &[u8], a: &[u8], b: &[u8]) -> Ordering {
    for ((c, x), y) in center.iter().zip(a).zip(b) {
        match (c ^ x).cmp(&(c ^ y)) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}
