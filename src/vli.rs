//! Fixed-width unsigned big-integer arithmetic
//!
//! Values are little-endian sequences of 32-bit limbs held in fixed-capacity
//! buffers; the active width travels as the slice length, which callers take
//! from the curve in use. Nothing here allocates, and nothing in the
//! secret-operand paths branches on limb values: carries and borrows are
//! computed arithmetically and selection goes through `subtle`.

use byteorder::{BigEndian, ByteOrder};
use subtle::{Choice, ConditionallySelectable};

/// Machine word of the engine. All limb buffers are `u32` little-endian.
pub(crate) type Word = u32;

/// Bits per limb
pub(crate) const WORD_BITS: usize = 32;

/// Limb capacity covering the largest supported field (256 bits)
pub(crate) const MAX_WORDS: usize = 8;

/// A full-capacity limb buffer; the active prefix length comes from the curve
pub(crate) type Limbs = [Word; MAX_WORDS];

/// A double-width buffer for products and squares
pub(crate) type WideLimbs = [Word; 2 * MAX_WORDS];

/// Constant-time zero test over the active words
pub(crate) fn is_zero(v: &[Word]) -> bool {
    let mut acc: Word = 0;
    for &w in v {
        acc |= w;
    }
    acc == 0
}

/// Read a single bit (little-endian bit order) as a `Choice`
#[inline(always)]
pub(crate) fn test_bit(v: &[Word], bit: usize) -> Choice {
    Choice::from(((v[bit / WORD_BITS] >> (bit % WORD_BITS)) & 1) as u8)
}

/// Number of significant bits, i.e. the index of the highest set bit plus one
pub(crate) fn num_bits(v: &[Word]) -> usize {
    let mut used = v.len();
    while used > 0 && v[used - 1] == 0 {
        used -= 1;
    }
    if used == 0 {
        return 0;
    }
    used * WORD_BITS - v[used - 1].leading_zeros() as usize
}

/// Variable-time comparison; only for public operands
pub(crate) fn cmp_vartime(a: &[Word], b: &[Word]) -> core::cmp::Ordering {
    debug_assert_eq!(a.len(), b.len());
    for i in (0..a.len()).rev() {
        match a[i].cmp(&b[i]) {
            core::cmp::Ordering::Equal => continue,
            other => return other,
        }
    }
    core::cmp::Ordering::Equal
}

/// Constant-time `a < b`
pub(crate) fn lt(a: &[Word], b: &[Word]) -> Choice {
    debug_assert_eq!(a.len(), b.len());
    // a < b exactly when a - b underflows
    let mut borrow: u64 = 0;
    for i in 0..a.len() {
        let d = (a[i] as u64).wrapping_sub(b[i] as u64).wrapping_sub(borrow);
        borrow = (d >> 63) & 1;
    }
    Choice::from(borrow as u8)
}

/// Constant-time equality over the active words
pub(crate) fn equal(a: &[Word], b: &[Word]) -> Choice {
    debug_assert_eq!(a.len(), b.len());
    let mut diff: Word = 0;
    for i in 0..a.len() {
        diff |= a[i] ^ b[i];
    }
    // Collapse the accumulated difference to a single bit without branching.
    let nonzero = (diff | diff.wrapping_neg()) >> (WORD_BITS - 1);
    Choice::from((nonzero ^ 1) as u8)
}

/// `a += b`, returning the carry word (0 or 1)
pub(crate) fn add_assign(a: &mut [Word], b: &[Word]) -> Word {
    debug_assert_eq!(a.len(), b.len());
    let mut carry: u64 = 0;
    for i in 0..a.len() {
        let tmp = (a[i] as u64) + (b[i] as u64) + carry;
        a[i] = tmp as Word;
        carry = tmp >> WORD_BITS;
    }
    carry as Word
}

/// `a += b` where `b` may be shorter than `a`; the carry ripples across the
/// remaining words of `a`. Returns the final carry.
pub(crate) fn add_assign_partial(a: &mut [Word], b: &[Word]) -> Word {
    debug_assert!(b.len() <= a.len());
    let mut carry: u64 = 0;
    for i in 0..a.len() {
        let addend = if i < b.len() { b[i] as u64 } else { 0 };
        let tmp = (a[i] as u64) + addend + carry;
        a[i] = tmp as Word;
        carry = tmp >> WORD_BITS;
    }
    carry as Word
}

/// `a -= b`, returning the borrow word (0 or 1)
pub(crate) fn sub_assign(a: &mut [Word], b: &[Word]) -> Word {
    debug_assert_eq!(a.len(), b.len());
    let mut borrow: u64 = 0;
    for i in 0..a.len() {
        let d = (a[i] as u64).wrapping_sub(b[i] as u64).wrapping_sub(borrow);
        a[i] = d as Word;
        borrow = (d >> 63) & 1;
    }
    borrow as Word
}

/// Schoolbook multiplication: `result = a * b`
///
/// `result` must hold `a.len() + b.len()` words. Column sums are accumulated
/// in 128 bits, then carries are propagated in one pass.
pub(crate) fn mult(result: &mut [Word], a: &[Word], b: &[Word]) {
    debug_assert_eq!(result.len(), a.len() + b.len());
    let mut t = [0u128; 2 * MAX_WORDS];
    for (i, &ai) in a.iter().enumerate() {
        for (j, &bj) in b.iter().enumerate() {
            t[i + j] += (ai as u128) * (bj as u128);
        }
    }
    let mut carry: u128 = 0;
    for (i, r) in result.iter_mut().enumerate() {
        let v = t[i] + carry;
        *r = (v & 0xFFFF_FFFF) as Word;
        carry = v >> WORD_BITS;
    }
}

/// `result = a * a`; `result` must hold `2 * a.len()` words
pub(crate) fn square(result: &mut [Word], a: &[Word]) {
    mult(result, a, a);
}

/// Shift right by one bit in place, dropping the low bit
pub(crate) fn rshift1(v: &mut [Word]) {
    let mut carry: Word = 0;
    for w in v.iter_mut().rev() {
        let t = *w;
        *w = (t >> 1) | carry;
        carry = t << (WORD_BITS - 1);
    }
}

/// Constant-time select: `r = if choice { b } else { a }`
pub(crate) fn conditional_select(r: &mut [Word], a: &[Word], b: &[Word], choice: Choice) {
    debug_assert!(r.len() == a.len() && r.len() == b.len());
    for i in 0..r.len() {
        r[i] = Word::conditional_select(&a[i], &b[i], choice);
    }
}

/// Constant-time assign: `a = b` when `choice` is set
pub(crate) fn conditional_assign(a: &mut [Word], b: &[Word], choice: Choice) {
    debug_assert_eq!(a.len(), b.len());
    for i in 0..a.len() {
        a[i].conditional_assign(&b[i], choice);
    }
}

/// Constant-time swap of two equally sized buffers
pub(crate) fn conditional_swap(a: &mut [Word], b: &mut [Word], choice: Choice) {
    debug_assert_eq!(a.len(), b.len());
    for i in 0..a.len() {
        let t = Word::conditional_select(&a[i], &b[i], choice);
        b[i] = Word::conditional_select(&b[i], &a[i], choice);
        a[i] = t;
    }
}

/// Load a big-endian byte string into little-endian limbs
///
/// `bytes` may have any length up to `4 * words.len()`, including the odd
/// 21-byte secp160r1 private-key width; unused high limbs are cleared.
pub(crate) fn from_be_bytes(words: &mut [Word], bytes: &[u8]) {
    debug_assert!(bytes.len() <= words.len() * 4);
    for w in words.iter_mut() {
        *w = 0;
    }
    if bytes.len() % 4 == 0 {
        let full = bytes.len() / 4;
        for i in 0..full {
            words[i] = BigEndian::read_u32(&bytes[(full - 1 - i) * 4..][..4]);
        }
    } else {
        for (i, &byte) in bytes.iter().rev().enumerate() {
            words[i / 4] |= (byte as Word) << (8 * (i % 4));
        }
    }
}

/// Store little-endian limbs as a big-endian byte string of `bytes.len()`
pub(crate) fn to_be_bytes(bytes: &mut [u8], words: &[Word]) {
    debug_assert!(bytes.len() <= words.len() * 4);
    if bytes.len() % 4 == 0 {
        let full = bytes.len() / 4;
        for i in 0..full {
            BigEndian::write_u32(&mut bytes[(full - 1 - i) * 4..][..4], words[i]);
        }
    } else {
        for i in 0..bytes.len() {
            let b = bytes.len() - 1 - i;
            bytes[i] = (words[b / 4] >> (8 * (b % 4))) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_sub_carry_borrow() {
        let mut a = [0xFFFF_FFFFu32, 0xFFFF_FFFF, 0, 0];
        let b = [1u32, 0, 0, 0];
        let carry = add_assign(&mut a, &b);
        assert_eq!(a, [0, 0, 1, 0]);
        assert_eq!(carry, 0);

        let mut c = [0u32, 0, 1, 0];
        let borrow = sub_assign(&mut c, &[1, 0, 0, 0]);
        assert_eq!(c, [0xFFFF_FFFF, 0xFFFF_FFFF, 0, 0]);
        assert_eq!(borrow, 0);

        let mut z = [0u32; 4];
        let borrow = sub_assign(&mut z, &[1, 0, 0, 0]);
        assert_eq!(borrow, 1);
    }

    #[test]
    fn partial_add_ripples_carry() {
        let mut a = [0xFFFF_FFFFu32, 0xFFFF_FFFF, 0xFFFF_FFFF, 0];
        let carry = add_assign_partial(&mut a, &[1]);
        assert_eq!(a, [0, 0, 0, 1]);
        assert_eq!(carry, 0);
    }

    #[test]
    fn mult_known_product() {
        // (2^32 - 1)^2 = 2^64 - 2^33 + 1
        let a = [0xFFFF_FFFFu32];
        let mut r = [0u32; 2];
        mult(&mut r, &a, &a);
        assert_eq!(r, [1, 0xFFFF_FFFE]);

        // Cross-word: (2^32 + 3) * (2^32 + 5)
        let x = [3u32, 1];
        let y = [5u32, 1];
        let mut r = [0u32; 4];
        mult(&mut r, &x, &y);
        assert_eq!(r, [15, 8, 1, 0]);
    }

    #[test]
    fn bit_length_and_testing() {
        assert_eq!(num_bits(&[0u32, 0]), 0);
        assert_eq!(num_bits(&[1u32, 0]), 1);
        assert_eq!(num_bits(&[0u32, 0x8000_0000]), 64);
        assert_eq!(num_bits(&[0xFFFF_FFFFu32, 1]), 33);

        let v = [0b1010u32, 1];
        assert_eq!(test_bit(&v, 1).unwrap_u8(), 1);
        assert_eq!(test_bit(&v, 2).unwrap_u8(), 0);
        assert_eq!(test_bit(&v, 32).unwrap_u8(), 1);
    }

    #[test]
    fn shift_right_crosses_words() {
        let mut v = [0u32, 1];
        rshift1(&mut v);
        assert_eq!(v, [0x8000_0000, 0]);
    }

    #[test]
    fn constant_time_comparisons() {
        let a = [5u32, 9];
        let b = [6u32, 9];
        assert_eq!(lt(&a, &b).unwrap_u8(), 1);
        assert_eq!(lt(&b, &a).unwrap_u8(), 0);
        assert_eq!(lt(&a, &a).unwrap_u8(), 0);
        assert_eq!(equal(&a, &a).unwrap_u8(), 1);
        assert_eq!(equal(&a, &b).unwrap_u8(), 0);
    }

    #[test]
    fn conditional_ops_respect_choice() {
        let a = [1u32, 2];
        let b = [3u32, 4];
        let mut r = [0u32; 2];
        conditional_select(&mut r, &a, &b, Choice::from(0));
        assert_eq!(r, a);
        conditional_select(&mut r, &a, &b, Choice::from(1));
        assert_eq!(r, b);

        let mut x = [7u32, 8];
        let mut y = [9u32, 10];
        conditional_swap(&mut x, &mut y, Choice::from(1));
        assert_eq!(x, [9, 10]);
        assert_eq!(y, [7, 8]);
    }

    #[test]
    fn byte_round_trips_aligned_and_odd() {
        // 8-byte (aligned) round trip
        let bytes = [0x01u8, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF];
        let mut words = [0u32; 2];
        from_be_bytes(&mut words, &bytes);
        assert_eq!(words, [0x89AB_CDEF, 0x0123_4567]);
        let mut out = [0u8; 8];
        to_be_bytes(&mut out, &words);
        assert_eq!(out, bytes);

        // 21-byte (secp160r1 private key width) round trip
        let mut odd = [0u8; 21];
        for (i, b) in odd.iter_mut().enumerate() {
            *b = i as u8 + 1;
        }
        let mut words = [0u32; 6];
        from_be_bytes(&mut words, &odd);
        let mut back = [0u8; 21];
        to_be_bytes(&mut back, &words);
        assert_eq!(back, odd);
        // Most significant byte lands in the top active limb
        assert_eq!(words[5], 0x01);
    }
}
