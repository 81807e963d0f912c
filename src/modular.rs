//! Modular arithmetic over the field primes and group orders
//!
//! Field products are reduced with the shifted-add/subtract scheme each
//! standard prime admits (selected by the curve record); products modulo the
//! group order, which has no usable structure, go through a generic
//! shift-and-subtract reduction. The generic reduction is the only long
//! division in the crate and is kept out of the constant-time scalar
//! multiplication path.

use subtle::Choice;

use crate::curve::{Curve, FieldReduction, SqrtMethod};
use crate::vli::{self, Limbs, WideLimbs, Word, MAX_WORDS, WORD_BITS};

/// The multiplicative identity as a limb buffer
pub(crate) fn one() -> Limbs {
    let mut o = [0; MAX_WORDS];
    o[0] = 1;
    o
}

/// Constant-time `(a + b) mod m` for reduced operands
pub(crate) fn mod_add(a: &Limbs, b: &Limbs, m: &[Word]) -> Limbs {
    let w = m.len();
    let mut r = *a;
    let carry = vli::add_assign(&mut r[..w], &b[..w]);
    let mut reduced = r;
    let borrow = vli::sub_assign(&mut reduced[..w], m);
    // Reduce when the raw sum overflowed the limbs or reached m
    let need = Choice::from(carry as u8) | !Choice::from(borrow as u8);
    vli::conditional_assign(&mut r[..w], &reduced[..w], need);
    r
}

/// Constant-time `(a - b) mod m` for reduced operands
pub(crate) fn mod_sub(a: &Limbs, b: &Limbs, m: &[Word]) -> Limbs {
    let w = m.len();
    let mut r = *a;
    let borrow = vli::sub_assign(&mut r[..w], &b[..w]);
    let mut fixed = r;
    vli::add_assign(&mut fixed[..w], m);
    vli::conditional_assign(&mut r[..w], &fixed[..w], Choice::from(borrow as u8));
    r
}

/// Generic reduction of a double-width product modulo an arbitrary modulus
///
/// Restoring shift-and-subtract division: the modulus is shifted up to the
/// top of the product and walked back down one bit per step, keeping
/// whichever of (remainder, remainder − shifted modulus) is non-negative.
/// The step count depends only on the modulus, but the subtract/keep pattern
/// is data-dependent — this routine serves digest reduction and order
/// arithmetic, never the scalar-multiplication ladder.
pub(crate) fn mmod(product: &[Word], m: &[Word]) -> Limbs {
    let w = m.len();
    let pw = product.len();
    debug_assert_eq!(pw, 2 * w);

    let shift = pw * WORD_BITS - vli::num_bits(m);
    let word_shift = shift / WORD_BITS;
    let bit_shift = shift % WORD_BITS;

    // mod_multiple = m << shift, aligned to the top of the product width
    let mut mod_multiple = [0u32; 2 * MAX_WORDS];
    if bit_shift > 0 {
        let mut carry: Word = 0;
        for i in 0..w {
            mod_multiple[word_shift + i] = (m[i] << bit_shift) | carry;
            carry = m[i] >> (WORD_BITS - bit_shift);
        }
        if word_shift + w < pw {
            mod_multiple[word_shift + w] = carry;
        }
    } else {
        mod_multiple[word_shift..word_shift + w].copy_from_slice(m);
    }

    let mut va = [0u32; 2 * MAX_WORDS];
    va[..pw].copy_from_slice(product);
    let mut vb = [0u32; 2 * MAX_WORDS];
    let mut a_is_current = true;

    for _ in 0..=shift {
        let borrow = {
            let (src, dst) = if a_is_current {
                (&va, &mut vb)
            } else {
                (&vb, &mut va)
            };
            let mut borrow: u64 = 0;
            for i in 0..pw {
                let d = (src[i] as u64)
                    .wrapping_sub(mod_multiple[i] as u64)
                    .wrapping_sub(borrow);
                dst[i] = d as Word;
                borrow = (d >> 63) & 1;
            }
            borrow
        };
        // The subtracted copy becomes current only if it did not go negative
        if borrow == 0 {
            a_is_current = !a_is_current;
        }
        vli::rshift1(&mut mod_multiple[..pw]);
    }

    let cur = if a_is_current { &va } else { &vb };
    let mut out = [0u32; MAX_WORDS];
    out[..w].copy_from_slice(&cur[..w]);
    out
}

/// `(a * b) mod m` via the generic reduction
pub(crate) fn mod_mult(a: &Limbs, b: &Limbs, m: &[Word]) -> Limbs {
    let w = m.len();
    let mut product = [0u32; 2 * MAX_WORDS];
    vli::mult(&mut product[..2 * w], &a[..w], &b[..w]);
    mmod(&product[..2 * w], m)
}

/// Modular inverse via the binary extended Euclidean algorithm
///
/// Returns zero when `input` is zero; for the prime moduli used here that is
/// the only non-invertible case and callers treat it as a protocol failure.
/// The iteration pattern depends on the operand, so secret values are blinded
/// by their callers before reaching this routine.
pub(crate) fn mod_inv(input: &Limbs, m: &[Word]) -> Limbs {
    use core::cmp::Ordering;

    let w = m.len();
    if vli::is_zero(&input[..w]) {
        return [0; MAX_WORDS];
    }

    let mut a = *input;
    let mut b = [0u32; MAX_WORDS];
    b[..w].copy_from_slice(m);
    let mut u = one();
    let mut v = [0u32; MAX_WORDS];

    loop {
        let cmp = vli::cmp_vartime(&a[..w], &b[..w]);
        if cmp == Ordering::Equal {
            break;
        }
        if a[0] & 1 == 0 {
            vli::rshift1(&mut a[..w]);
            half_mod(&mut u, m);
        } else if b[0] & 1 == 0 {
            vli::rshift1(&mut b[..w]);
            half_mod(&mut v, m);
        } else if cmp == Ordering::Greater {
            vli::sub_assign(&mut a[..w], &b[..w]);
            vli::rshift1(&mut a[..w]);
            if vli::cmp_vartime(&u[..w], &v[..w]) == Ordering::Less {
                vli::add_assign(&mut u[..w], m);
            }
            vli::sub_assign(&mut u[..w], &v[..w]);
            half_mod(&mut u, m);
        } else {
            vli::sub_assign(&mut b[..w], &a[..w]);
            vli::rshift1(&mut b[..w]);
            if vli::cmp_vartime(&v[..w], &u[..w]) == Ordering::Less {
                vli::add_assign(&mut v[..w], m);
            }
            vli::sub_assign(&mut v[..w], &u[..w]);
            half_mod(&mut v, m);
        }
    }
    u
}

/// Halve modulo an odd modulus: make even by adding `m` if needed, then shift
fn half_mod(x: &mut Limbs, m: &[Word]) {
    let w = m.len();
    let mut carry: Word = 0;
    if x[0] & 1 == 1 {
        carry = vli::add_assign(&mut x[..w], m);
    }
    vli::rshift1(&mut x[..w]);
    if carry == 1 {
        x[w - 1] |= 1 << (WORD_BITS - 1);
    }
}

/// Reduce a double-width product modulo the field prime of `curve`
pub(crate) fn reduce_field(product: &WideLimbs, curve: &Curve) -> Limbs {
    match curve.reduction {
        FieldReduction::PseudoMersenne { c, c_words } => {
            reduce_pseudo_mersenne(product, curve, &c[..c_words])
        }
        FieldReduction::Nist224 => reduce_nist224(product, curve),
        FieldReduction::Nist256 => reduce_nist256(product, curve),
    }
}

/// Fold a product modulo `p = 2^(32·w) − c` using `2^(32·w) ≡ c (mod p)`
///
/// Two full folds bring the value under `2^(32·w) + ε`; the leftover carry
/// bit is folded with masked additions and the result is brought below `p`
/// with fixed-count conditional subtractions.
fn reduce_pseudo_mersenne(product: &WideLimbs, curve: &Curve, c: &[Word]) -> Limbs {
    let w = curve.num_words;
    let p = curve.p_words();

    let mut acc = *product;
    for _ in 0..2 {
        let mut high = [0u32; MAX_WORDS];
        high[..w].copy_from_slice(&acc[w..2 * w]);
        let mut fold = [0u32; MAX_WORDS + 4];
        vli::mult(&mut fold[..w + c.len()], &high[..w], c);
        for x in acc[w..].iter_mut() {
            *x = 0;
        }
        vli::add_assign_partial(&mut acc[..2 * w], &fold[..w + c.len()]);
    }

    // At most a single residual bit lives at word w now; fold it without
    // branching on its (secret-derived) value.
    for _ in 0..2 {
        let carry = acc[w];
        debug_assert!(carry <= 1);
        acc[w] = 0;
        let mask = carry.wrapping_neg();
        let mut addend = [0u32; 3];
        for (i, &ci) in c.iter().enumerate() {
            addend[i] = ci & mask;
        }
        let carry_out = vli::add_assign_partial(&mut acc[..w], &addend[..c.len()]);
        acc[w] = carry_out;
    }

    let mut out = [0u32; MAX_WORDS];
    out[..w].copy_from_slice(&acc[..w]);
    for _ in 0..2 {
        let mut t = out;
        let borrow = vli::sub_assign(&mut t[..w], p);
        vli::conditional_assign(&mut out[..w], &t[..w], !Choice::from(borrow as u8));
    }
    out
}

/// FIPS 186-4 D.2.2 reduction for the secp224r1 prime: T + S1 + S2 − D1 − D2
fn reduce_nist224(product: &WideLimbs, curve: &Curve) -> Limbs {
    let w = curve.num_words;
    debug_assert_eq!(w, 7);
    let p = curve.p_words();
    let c = |i: usize| product[i];

    let mut res = [0u32; MAX_WORDS];
    res[..w].copy_from_slice(&product[..w]);
    let mut carry: i64 = 0;
    let mut tmp = [0u32; MAX_WORDS];

    // S1 = (c10, c9, c8, c7, 0, 0, 0)
    tmp[..w].copy_from_slice(&[0, 0, 0, c(7), c(8), c(9), c(10)]);
    carry += vli::add_assign(&mut res[..w], &tmp[..w]) as i64;

    // S2 = (0, c13, c12, c11, 0, 0, 0)
    tmp[..w].copy_from_slice(&[0, 0, 0, c(11), c(12), c(13), 0]);
    carry += vli::add_assign(&mut res[..w], &tmp[..w]) as i64;

    // D1 = (c13, c12, c11, c10, c9, c8, c7)
    tmp[..w].copy_from_slice(&[c(7), c(8), c(9), c(10), c(11), c(12), c(13)]);
    carry -= vli::sub_assign(&mut res[..w], &tmp[..w]) as i64;

    // D2 = (0, 0, 0, 0, c13, c12, c11)
    tmp[..w].copy_from_slice(&[c(11), c(12), c(13), 0, 0, 0, 0]);
    carry -= vli::sub_assign(&mut res[..w], &tmp[..w]) as i64;

    fixup_carry(&mut res, carry, p);
    res
}

/// FIPS 186-4 D.2.3 reduction for the secp256r1 prime:
/// T + 2·S1 + 2·S2 + S3 + S4 − D1 − D2 − D3 − D4
fn reduce_nist256(product: &WideLimbs, curve: &Curve) -> Limbs {
    let w = curve.num_words;
    debug_assert_eq!(w, 8);
    let p = curve.p_words();
    let c = |i: usize| product[i];

    let mut res = [0u32; MAX_WORDS];
    res[..w].copy_from_slice(&product[..w]);
    let mut carry: i64 = 0;
    let mut tmp = [0u32; MAX_WORDS];

    // S1 = (c15, c14, c13, c12, c11, 0, 0, 0), doubled
    tmp[..w].copy_from_slice(&[0, 0, 0, c(11), c(12), c(13), c(14), c(15)]);
    let s1 = tmp;
    carry += vli::add_assign(&mut tmp[..w], &s1[..w]) as i64;
    carry += vli::add_assign(&mut res[..w], &tmp[..w]) as i64;

    // S2 = (0, c15, c14, c13, c12, 0, 0, 0), doubled
    tmp[..w].copy_from_slice(&[0, 0, 0, c(12), c(13), c(14), c(15), 0]);
    let s2 = tmp;
    carry += vli::add_assign(&mut tmp[..w], &s2[..w]) as i64;
    carry += vli::add_assign(&mut res[..w], &tmp[..w]) as i64;

    // S3 = (c15, c14, 0, 0, 0, c10, c9, c8)
    tmp[..w].copy_from_slice(&[c(8), c(9), c(10), 0, 0, 0, c(14), c(15)]);
    carry += vli::add_assign(&mut res[..w], &tmp[..w]) as i64;

    // S4 = (c8, c13, c15, c14, c13, c11, c10, c9)
    tmp[..w].copy_from_slice(&[c(9), c(10), c(11), c(13), c(14), c(15), c(13), c(8)]);
    carry += vli::add_assign(&mut res[..w], &tmp[..w]) as i64;

    // D1 = (c10, c8, 0, 0, 0, c13, c12, c11)
    tmp[..w].copy_from_slice(&[c(11), c(12), c(13), 0, 0, 0, c(8), c(10)]);
    carry -= vli::sub_assign(&mut res[..w], &tmp[..w]) as i64;

    // D2 = (c11, c9, 0, 0, c15, c14, c13, c12)
    tmp[..w].copy_from_slice(&[c(12), c(13), c(14), c(15), 0, 0, c(9), c(11)]);
    carry -= vli::sub_assign(&mut res[..w], &tmp[..w]) as i64;

    // D3 = (c12, 0, c10, c9, c8, c15, c14, c13)
    tmp[..w].copy_from_slice(&[c(13), c(14), c(15), c(8), c(9), c(10), 0, c(12)]);
    carry -= vli::sub_assign(&mut res[..w], &tmp[..w]) as i64;

    // D4 = (c13, 0, c11, c10, c9, 0, c15, c14)
    tmp[..w].copy_from_slice(&[c(14), c(15), 0, c(9), c(10), c(11), 0, c(13)]);
    carry -= vli::sub_assign(&mut res[..w], &tmp[..w]) as i64;

    fixup_carry(&mut res, carry, p);
    res
}

/// Resolve the signed carry left by term-wise reduction
///
/// The carry is bounded by the (public) term count of the reduction, so the
/// small correction loops reveal nothing about the operands beyond what the
/// algorithm already fixes.
fn fixup_carry(res: &mut Limbs, mut carry: i64, p: &[Word]) {
    let w = p.len();
    if carry < 0 {
        while carry < 0 {
            carry += vli::add_assign(&mut res[..w], p) as i64;
        }
    } else {
        while carry > 0 || vli::cmp_vartime(&res[..w], p) != core::cmp::Ordering::Less {
            carry -= vli::sub_assign(&mut res[..w], p) as i64;
        }
    }
}

/// `(a * b) mod p` via the curve's fast reduction
pub(crate) fn mod_mult_fast(a: &Limbs, b: &Limbs, curve: &Curve) -> Limbs {
    let w = curve.num_words;
    let mut product = [0u32; 2 * MAX_WORDS];
    vli::mult(&mut product[..2 * w], &a[..w], &b[..w]);
    reduce_field(&product, curve)
}

/// `(a * a) mod p` via the curve's fast reduction
pub(crate) fn mod_square_fast(a: &Limbs, curve: &Curve) -> Limbs {
    let w = curve.num_words;
    let mut product = [0u32; 2 * MAX_WORDS];
    vli::square(&mut product[..2 * w], &a[..w]);
    reduce_field(&product, curve)
}

/// `base^exp mod p` by left-to-right binary exponentiation
///
/// The exponent is public in every use (fixed functions of the prime), so
/// the multiply-on-set-bit branch leaks nothing secret.
fn mod_pow_fast(base: &Limbs, exp: &[Word], curve: &Curve) -> Limbs {
    let mut result = one();
    for i in (0..vli::num_bits(exp)).rev() {
        result = mod_square_fast(&result, curve);
        if bool::from(vli::test_bit(exp, i)) {
            result = mod_mult_fast(&result, base, curve);
        }
    }
    result
}

/// Square root modulo the field prime, used only by point decompression
///
/// Returns *a* root; the caller picks the one matching the stored parity.
/// `None` means the input is not a quadratic residue and decompression must
/// fail. The result is always checked by squaring before it is returned.
pub(crate) fn mod_sqrt(a: &Limbs, curve: &Curve) -> Option<Limbs> {
    let w = curve.num_words;
    if vli::is_zero(&a[..w]) {
        return Some([0; MAX_WORDS]);
    }

    let root = match curve.sqrt {
        SqrtMethod::ThreeMod4 => sqrt_three_mod_four(a, curve),
        SqrtMethod::TonelliShanks => sqrt_tonelli_shanks(a, curve)?,
    };

    if mod_square_fast(&root, curve) == *a {
        Some(root)
    } else {
        None
    }
}

/// `a^((p+1)/4)` for `p ≡ 3 (mod 4)`
///
/// Walks the bits of `p + 1` from the top down to index 2, which is the same
/// as exponentiation by `(p+1)/4` without materializing the shifted value.
fn sqrt_three_mod_four(a: &Limbs, curve: &Curve) -> Limbs {
    let w = curve.num_words;
    let mut p1 = [0u32; MAX_WORDS];
    p1[..w].copy_from_slice(curve.p_words());
    let carry = vli::add_assign_partial(&mut p1[..w], &[1]);
    debug_assert_eq!(carry, 0);

    let mut result = one();
    for i in (2..vli::num_bits(&p1[..w])).rev() {
        result = mod_square_fast(&result, curve);
        if bool::from(vli::test_bit(&p1, i)) {
            result = mod_mult_fast(&result, a, curve);
        }
    }
    result
}

/// Tonelli–Shanks for the secp224r1 prime (`p ≡ 1 (mod 4)`)
///
/// The decomposition `p − 1 = q·2^s` and the non-residue are derived from
/// the curve record at runtime; decompression inputs are public, so the
/// variable-time search loops are acceptable here.
fn sqrt_tonelli_shanks(a: &Limbs, curve: &Curve) -> Option<Limbs> {
    let w = curve.num_words;
    let unit = one();

    // legendre_exp = (p - 1) / 2
    let mut legendre_exp = [0u32; MAX_WORDS];
    legendre_exp[..w].copy_from_slice(curve.p_words());
    legendre_exp[0] &= !1;
    vli::rshift1(&mut legendre_exp[..w]);

    if mod_pow_fast(a, &legendre_exp[..w], curve) != unit {
        return None;
    }

    // p - 1 = q * 2^s with q odd
    let mut q = [0u32; MAX_WORDS];
    q[..w].copy_from_slice(curve.p_words());
    q[0] &= !1;
    let mut s = 0usize;
    while q[0] & 1 == 0 {
        vli::rshift1(&mut q[..w]);
        s += 1;
    }

    // Smallest quadratic non-residue, by trial from 2
    let mut z = one();
    z[0] = 2;
    while mod_pow_fast(&z, &legendre_exp[..w], curve) == unit {
        z[0] += 1;
    }

    let mut c = mod_pow_fast(&z, &q[..w], curve);
    let mut t = mod_pow_fast(a, &q[..w], curve);
    // r = a^((q+1)/2)
    let mut qp1h = q;
    vli::add_assign_partial(&mut qp1h[..w], &[1]);
    vli::rshift1(&mut qp1h[..w]);
    let mut r = mod_pow_fast(a, &qp1h[..w], curve);
    let mut m = s;

    while t != unit {
        // Least i with t^(2^i) = 1
        let mut i = 0usize;
        let mut cur = t;
        while cur != unit {
            cur = mod_square_fast(&cur, curve);
            i += 1;
            if i == m {
                return None;
            }
        }

        // b = c^(2^(m - i - 1))
        let mut b = c;
        for _ in 0..(m - i - 1) {
            b = mod_square_fast(&b, curve);
        }

        r = mod_mult_fast(&r, &b, curve);
        c = mod_square_fast(&b, curve);
        t = mod_mult_fast(&t, &c, curve);
        m = i;
    }

    Some(r)
}
