//! Scalar multiplication
//!
//! The secret-scalar path is a fixed-iteration co-Z Montgomery ladder:
//! the scalar is first regularized to a fixed bit length by adding the group
//! order (or twice the order), then every ladder step performs the same
//! conjugate-add/add pair and routes its operands through constant-time
//! conditional swaps keyed on the scalar bit. No iteration count, branch or
//! lookup index depends on secret bits.
//!
//! Verification, which handles only public data, uses Shamir's trick to
//! evaluate `u1·G + u2·Q` in a single interleaved double-and-add pass.

use subtle::Choice;

use crate::curve::Curve;
use crate::modular::{mod_inv, mod_mult_fast, mod_sub, one};
use crate::point::{
    apply_z, double_jacobian, negate_y, xycz_add, xycz_add_c, xycz_initial_double, AffinePoint,
};
use crate::vli::{self, Limbs, Word, MAX_WORDS, WORD_BITS};

/// Regularize a scalar for the ladder: returns `k + n` or `k + 2n`, whichever
/// has its bit at index `num_n_bits` set
///
/// Either candidate represents the same multiple of any order-`n` point, so
/// the ladder can always run over exactly `num_n_bits + 1` bits regardless of
/// how many leading zeros `k` has. The choice between the candidates is made
/// with a constant-time select because it depends on the secret scalar.
pub(crate) fn regularize_scalar(k: &[Word], curve: &Curve) -> Limbs {
    let nw = curve.num_n_words;
    let n = curve.n_words();

    let mut k0 = [0u32; MAX_WORDS];
    k0[..nw].copy_from_slice(&k[..nw]);
    let mut carry = vli::add_assign(&mut k0[..nw], n);
    if curve.num_n_bits < nw * WORD_BITS {
        carry |= vli::test_bit(&k0, curve.num_n_bits).unwrap_u8() as Word;
    }

    let mut k1 = k0;
    vli::add_assign(&mut k1[..nw], n);

    let mut out = [0u32; MAX_WORDS];
    vli::conditional_select(&mut out[..nw], &k1[..nw], &k0[..nw], Choice::from(carry as u8));
    out
}

/// Constant-time ladder: `scalar · point` over a fixed number of bits
///
/// `scalar` must be regularized (bit `num_bits − 1` set, value not a multiple
/// of the point's order); `point` must be a finite on-curve point. Both are
/// the caller's contract — key generation, ECDH and signing all reject the
/// degenerate inputs before coming here.
fn ladder(
    point: &AffinePoint,
    scalar: &[Word],
    num_bits: usize,
    initial_z: Option<&Limbs>,
    curve: &Curve,
) -> AffinePoint {
    let p = curve.p_words();

    // Physical slot 1 starts as P; the initial step turns the pair into
    // (slot1, slot0) = (2P, P) sharing one implicit Z.
    let mut r0x = [0u32; MAX_WORDS];
    let mut r0y = [0u32; MAX_WORDS];
    let mut r1x = point.x;
    let mut r1y = point.y;
    xycz_initial_double(&mut r1x, &mut r1y, &mut r0x, &mut r0y, initial_z, curve);

    for i in (1..=num_bits - 2).rev() {
        let nb = !vli::test_bit(scalar, i);

        // Map the logical pair (R[bit], R[!bit]) onto the physical slots,
        // run the fixed conjugate-add/add step, and map back. The swaps are
        // the only place the scalar bit is consumed.
        vli::conditional_swap(&mut r0x, &mut r1x, nb);
        vli::conditional_swap(&mut r0y, &mut r1y, nb);

        xycz_add_c(&mut r1x, &mut r1y, &mut r0x, &mut r0y, curve);
        xycz_add(&mut r0x, &mut r0y, &mut r1x, &mut r1y, curve);

        vli::conditional_swap(&mut r0x, &mut r1x, nb);
        vli::conditional_swap(&mut r0y, &mut r1y, nb);
    }

    // Last bit: one conjugate addition, then recover the final Z from the
    // known affine base point and fold it in with a single inversion.
    let bit = vli::test_bit(scalar, 0);
    let nb = !bit;

    vli::conditional_swap(&mut r0x, &mut r1x, nb);
    vli::conditional_swap(&mut r0y, &mut r1y, nb);
    xycz_add_c(&mut r1x, &mut r1y, &mut r0x, &mut r0y, curve);
    vli::conditional_swap(&mut r0x, &mut r1x, nb);
    vli::conditional_swap(&mut r0y, &mut r1y, nb);

    // 1/Z = yP · Xb / (xP · Yb · (X1 − X0))
    let mut yb = [0u32; MAX_WORDS];
    vli::conditional_select(&mut yb, &r0y, &r1y, bit);
    let mut xb = [0u32; MAX_WORDS];
    vli::conditional_select(&mut xb, &r0x, &r1x, bit);

    let mut z = mod_sub(&r1x, &r0x, p);
    z = mod_mult_fast(&z, &yb, curve);
    z = mod_mult_fast(&z, &point.x, curve);
    z = mod_inv(&z, p);
    z = mod_mult_fast(&z, &point.y, curve);
    z = mod_mult_fast(&z, &xb, curve);

    vli::conditional_swap(&mut r0x, &mut r1x, nb);
    vli::conditional_swap(&mut r0y, &mut r1y, nb);
    xycz_add(&mut r0x, &mut r0y, &mut r1x, &mut r1y, curve);
    vli::conditional_swap(&mut r0x, &mut r1x, nb);
    vli::conditional_swap(&mut r0y, &mut r1y, nb);

    apply_z(&mut r0x, &mut r0y, &z, curve);
    AffinePoint { x: r0x, y: r0y }
}

/// `k · point` with ladder regularization; `0 < k < n` is the caller's
/// contract
pub(crate) fn scalar_mult(
    point: &AffinePoint,
    k: &[Word],
    initial_z: Option<&Limbs>,
    curve: &Curve,
) -> AffinePoint {
    let k_reg = regularize_scalar(k, curve);
    let mut result = ladder(
        point,
        &k_reg[..curve.num_n_words],
        curve.num_n_bits + 1,
        initial_z,
        curve,
    );

    // The co-Z formulas cannot represent the point at infinity, and the
    // ladder's intermediate state brushes it for the scalars bordering the
    // group order: after regularization, k ∈ {1, n−2, n−1} walk through a
    // sum of a point and its negative. Their correct results are small
    // multiples of the input, computed here unconditionally and selected in
    // constant time, so those scalars stay both exact and profile-uniform.
    let nw = curve.num_n_words;
    let n = curve.n_words();
    let unit = one();

    let is_one = vli::equal(&k[..nw], &unit[..nw]);
    let mut edge = [0u32; MAX_WORDS];
    edge[..nw].copy_from_slice(n);
    vli::sub_assign(&mut edge[..nw], &unit[..nw]); // n − 1
    let is_n_minus_1 = vli::equal(&k[..nw], &edge[..nw]);
    vli::sub_assign(&mut edge[..nw], &unit[..nw]); // n − 2
    let is_n_minus_2 = vli::equal(&k[..nw], &edge[..nw]);

    let neg_y = negate_y(&point.y, curve);
    let double = {
        let mut x = point.x;
        let mut y = point.y;
        let mut z = one();
        double_jacobian(&mut x, &mut y, &mut z, curve);
        let z_inv = mod_inv(&z, curve.p_words());
        apply_z(&mut x, &mut y, &z_inv, curve);
        AffinePoint { x, y }
    };
    let neg_double_y = negate_y(&double.y, curve);

    // k = 1 → P
    vli::conditional_assign(&mut result.x, &point.x, is_one);
    vli::conditional_assign(&mut result.y, &point.y, is_one);
    // k = n − 1 → −P
    vli::conditional_assign(&mut result.x, &point.x, is_n_minus_1);
    vli::conditional_assign(&mut result.y, &neg_y, is_n_minus_1);
    // k = n − 2 → −2P
    vli::conditional_assign(&mut result.x, &double.x, is_n_minus_2);
    vli::conditional_assign(&mut result.y, &neg_double_y, is_n_minus_2);

    result
}

/// `u1·G + u2·Q` by Shamir's trick, for signature verification
///
/// All operands are public; the interleaved double-and-add walks the joint
/// bits of `u1`/`u2` against the table `{∞, G, Q, G + Q}`. The degenerate
/// table entry `Q = ±G` and transient `R = ±T` collisions fall back to
/// doubling or the identity instead of feeding the co-Z formulas inputs they
/// cannot represent.
pub(crate) fn shamir_double_mult(
    u1: &Limbs,
    u2: &Limbs,
    q: &AffinePoint,
    curve: &Curve,
) -> AffinePoint {
    let w = curve.num_words;
    let p = curve.p_words();
    let g = AffinePoint::generator(curve);

    // sum = G + Q, or None when Q = −G
    let sum = if g.x[..w] == q.x[..w] {
        if g.y[..w] == q.y[..w] {
            // Q = G: the sum is 2G
            let mut x = g.x;
            let mut y = g.y;
            let mut z = one();
            double_jacobian(&mut x, &mut y, &mut z, curve);
            let z_inv = mod_inv(&z, p);
            apply_z(&mut x, &mut y, &z_inv, curve);
            Some(AffinePoint { x, y })
        } else {
            None
        }
    } else {
        // Co-Z addition of the two affine points; the implicit Z after the
        // add is exactly (qx − gx), inverted once to get back to affine.
        let mut tx = g.x;
        let mut ty = g.y;
        let mut sx = q.x;
        let mut sy = q.y;
        let z = mod_sub(&sx, &tx, p);
        xycz_add(&mut tx, &mut ty, &mut sx, &mut sy, curve);
        let z_inv = mod_inv(&z, p);
        let mut x = sx;
        let mut y = sy;
        apply_z(&mut x, &mut y, &z_inv, curve);
        Some(AffinePoint { x, y })
    };

    let points: [Option<&AffinePoint>; 4] = [None, Some(&g), Some(q), sum.as_ref()];
    let total_bits = core::cmp::max(
        vli::num_bits(&u1[..curve.num_n_words]),
        vli::num_bits(&u2[..curve.num_n_words]),
    );

    let index_at = |i: usize| -> usize {
        (vli::test_bit(u1, i).unwrap_u8() | (vli::test_bit(u2, i).unwrap_u8() << 1)) as usize
    };

    let mut rx = [0u32; MAX_WORDS];
    let mut ry = [0u32; MAX_WORDS];
    let mut z = [0u32; MAX_WORDS]; // Z = 0 encodes the running infinity

    if let Some(start) = points[index_at(total_bits - 1)] {
        rx = start.x;
        ry = start.y;
        z = one();
    }

    for i in (0..total_bits - 1).rev() {
        double_jacobian(&mut rx, &mut ry, &mut z, curve);

        if let Some(pt) = points[index_at(i)] {
            if vli::is_zero(&z[..w]) {
                rx = pt.x;
                ry = pt.y;
                z = one();
                continue;
            }

            let mut tx = pt.x;
            let mut ty = pt.y;
            apply_z(&mut tx, &mut ty, &z, curve);
            let tz = mod_sub(&rx, &tx, p);
            if vli::is_zero(&tz[..w]) {
                if ry[..w] == ty[..w] {
                    // R = T: addition degenerates to doubling
                    double_jacobian(&mut rx, &mut ry, &mut z, curve);
                } else {
                    // R = −T: the sum is the identity
                    z = [0u32; MAX_WORDS];
                }
            } else {
                xycz_add(&mut tx, &mut ty, &mut rx, &mut ry, curve);
                z = mod_mult_fast(&z, &tz, curve);
            }
        }
    }

    if vli::is_zero(&z[..w]) {
        return AffinePoint::zero();
    }
    let z_inv = mod_inv(&z, p);
    apply_z(&mut rx, &mut ry, &z_inv, curve);
    AffinePoint { x: rx, y: ry }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve;
    use crate::modular::{mmod, mod_add};
    use crate::point::is_valid_point;
    use crate::vli::WideLimbs;

    fn small_scalar(v: Word) -> Limbs {
        let mut k = [0u32; MAX_WORDS];
        k[0] = v;
        k
    }

    #[test]
    fn identity_scalar_returns_the_base_point() {
        for curve in curve::all() {
            let g = AffinePoint::generator(curve);
            let k = small_scalar(1);
            let result = scalar_mult(&g, &k[..curve.num_n_words], None, curve);
            assert_eq!(result, g, "{}", curve.name());
        }
    }

    #[test]
    fn small_multiples_match_repeated_addition() {
        for curve in curve::all() {
            let g = AffinePoint::generator(curve);

            // 2G via the ladder vs plain Jacobian doubling
            let two_g = scalar_mult(&g, &small_scalar(2)[..curve.num_n_words], None, curve);
            let mut x = g.x;
            let mut y = g.y;
            let mut z = one();
            double_jacobian(&mut x, &mut y, &mut z, curve);
            let z_inv = mod_inv(&z, curve.p_words());
            apply_z(&mut x, &mut y, &z_inv, curve);
            assert_eq!(two_g, AffinePoint { x, y }, "{}", curve.name());

            // 3G, 5G, 7G land on the curve and differ pairwise
            let three = scalar_mult(&g, &small_scalar(3)[..curve.num_n_words], None, curve);
            let five = scalar_mult(&g, &small_scalar(5)[..curve.num_n_words], None, curve);
            let seven = scalar_mult(&g, &small_scalar(7)[..curve.num_n_words], None, curve);
            for pt in [&three, &five, &seven] {
                assert!(is_valid_point(pt, curve), "{}", curve.name());
            }
            assert_ne!(three, five);
            assert_ne!(five, seven);
        }
    }

    #[test]
    fn initial_z_blinding_does_not_change_the_result() {
        for curve in curve::all() {
            let g = AffinePoint::generator(curve);
            let k = small_scalar(0x1234_5679);
            let plain = scalar_mult(&g, &k[..curve.num_n_words], None, curve);
            let blinded = scalar_mult(&g, &k[..curve.num_n_words], Some(&curve.b), curve);
            assert_eq!(plain, blinded, "{}", curve.name());
        }
    }

    #[test]
    fn shamir_matches_single_ladder() {
        for curve in curve::all() {
            let nw = curve.num_n_words;
            let n = curve.n_words();
            let g = AffinePoint::generator(curve);

            let u1 = small_scalar(0x0F0F_1123);
            let u2 = small_scalar(0x7432_0001);

            // u1·G + u2·G = (u1 + u2)·G
            let combined = {
                let mut wide: WideLimbs = [0; 2 * MAX_WORDS];
                wide[..nw].copy_from_slice(&mod_add(&u1, &u2, n)[..nw]);
                mmod(&wide[..2 * nw], n)
            };
            let expected = scalar_mult(&g, &combined[..nw], None, curve);
            let shamir = shamir_double_mult(&u1, &u2, &g, curve);
            assert_eq!(shamir, expected, "{}", curve.name());
        }
    }

    #[test]
    fn shamir_with_distinct_point() {
        for curve in curve::all() {
            let nw = curve.num_n_words;
            let g = AffinePoint::generator(curve);
            let q = scalar_mult(&g, &small_scalar(11)[..nw], None, curve);

            // u1·G + u2·(11G) = (u1 + 11·u2)·G
            let u1 = small_scalar(201);
            let u2 = small_scalar(37);
            let expected = scalar_mult(&g, &small_scalar(201 + 11 * 37)[..nw], None, curve);
            let shamir = shamir_double_mult(&u1, &u2, &q, curve);
            assert_eq!(shamir, expected, "{}", curve.name());
        }
    }

    #[test]
    fn shamir_handles_zero_u1() {
        for curve in curve::all() {
            let nw = curve.num_n_words;
            let g = AffinePoint::generator(curve);
            let q = scalar_mult(&g, &small_scalar(5)[..nw], None, curve);
            let expected = scalar_mult(&g, &small_scalar(5 * 9)[..nw], None, curve);
            let shamir = shamir_double_mult(&small_scalar(0), &small_scalar(9), &q, curve);
            assert_eq!(shamir, expected, "{}", curve.name());
        }
    }

    #[test]
    fn scalars_bordering_the_order() {
        // k = 1, n−1 and n−2 are the ladder's exceptional inputs; n−3 goes
        // through the plain ladder path and pins the two paths against each
        // other via (n − j)·G = −j·G.
        for curve in curve::all() {
            let nw = curve.num_n_words;
            let g = AffinePoint::generator(curve);
            let unit = small_scalar(1);

            assert_eq!(scalar_mult(&g, &unit[..nw], None, curve), g, "{}", curve.name());

            let mut edge = [0u32; MAX_WORDS];
            edge[..nw].copy_from_slice(curve.n_words());
            vli::sub_assign(&mut edge[..nw], &unit[..nw]); // n − 1
            let minus_g = scalar_mult(&g, &edge[..nw], None, curve);
            assert_eq!(minus_g.x, g.x, "{}", curve.name());
            assert_eq!(minus_g.y, negate_y(&g.y, curve), "{}", curve.name());

            vli::sub_assign(&mut edge[..nw], &unit[..nw]); // n − 2
            let r = scalar_mult(&g, &edge[..nw], None, curve);
            let two_g = scalar_mult(&g, &small_scalar(2)[..nw], None, curve);
            assert_eq!(r.x, two_g.x, "{}", curve.name());
            assert_eq!(r.y, negate_y(&two_g.y, curve), "{}", curve.name());

            vli::sub_assign(&mut edge[..nw], &unit[..nw]); // n − 3
            let r = scalar_mult(&g, &edge[..nw], None, curve);
            let three_g = scalar_mult(&g, &small_scalar(3)[..nw], None, curve);
            assert_eq!(r.x, three_g.x, "{}", curve.name());
            assert_eq!(r.y, negate_y(&three_g.y, curve), "{}", curve.name());
        }
    }

    #[test]
    fn regularized_scalars_keep_the_top_bit() {
        for curve in curve::all() {
            let nw = curve.num_n_words;
            for k in [1u32, 2, 0xFFFF_FFFF] {
                let reg = regularize_scalar(&small_scalar(k)[..nw], curve);
                // Bit num_n_bits of (k + n) or (k + 2n) is set by construction;
                // it may live one position above the stored words, in which
                // case the ladder treats it as implicit. When it is storable,
                // check it.
                if curve.num_n_bits < nw * WORD_BITS {
                    assert_eq!(
                        vli::test_bit(&reg, curve.num_n_bits).unwrap_u8(),
                        1,
                        "{}",
                        curve.name()
                    );
                }
            }
        }
    }
}
