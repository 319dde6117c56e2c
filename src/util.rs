//! Bit-level helpers shared by the hash and message lanes.

use cipher::{consts::U16, generic_array::GenericArray};

/// A 16-byte cipher block.
pub(crate) type Block = GenericArray<u8, U16>;

/// Doubling in GF(2^128) modulo `x^128 + x^7 + x^2 + x + 1`, treating the
/// block as a big-endian field element. See
/// https://www.rfc-editor.org/rfc/rfc7253.html#section-2
///
/// Branch-free: the reduction constant is folded in under a mask derived
/// from the carried-out bit.
pub(crate) fn double(block: &Block) -> Block {
    let x = u128::from_be_bytes((*block).into());
    let carry = x >> 127;
    ((x << 1) ^ (carry * 0x87)).to_be_bytes().into()
}

#[inline]
pub(crate) fn inplace_xor(a: &mut Block, b: &Block) {
    for (x, y) in a.iter_mut().zip(b.iter()) {
        *x ^= y;
    }
}

/// Number of trailing zero bits. Block counters start at 1, so the argument
/// is never zero at a call site.
#[inline]
pub(crate) fn ntz(n: u64) -> usize {
    n.trailing_zeros() as usize
}
