//! Elliptic curve point arithmetic
//!
//! Points are affine pairs of field elements; scalar multiplication and the
//! verification double-multiply work internally in Jacobian coordinates
//! (`x = X/Z²`, `y = Y/Z³`) and in the shared-Z ("co-Z") representation,
//! which lets every ladder step run on two points with a common Z and defers
//! the field inversion to a single final step.
//!
//! The point at infinity is encoded as the all-zero coordinate pair, which is
//! never a valid finite point on the supported curves.

use crate::curve::Curve;
use crate::modular::{mod_add, mod_mult_fast, mod_sqrt, mod_square_fast, mod_sub};
use crate::vli::{self, Limbs, MAX_WORDS};

/// An affine point, or the point at infinity (both coordinates zero)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct AffinePoint {
    pub(crate) x: Limbs,
    pub(crate) y: Limbs,
}

impl AffinePoint {
    /// The point at infinity
    pub(crate) fn zero() -> Self {
        AffinePoint {
            x: [0; MAX_WORDS],
            y: [0; MAX_WORDS],
        }
    }

    /// The curve generator
    pub(crate) fn generator(curve: &Curve) -> Self {
        AffinePoint {
            x: curve.gx,
            y: curve.gy,
        }
    }

    /// Is this the point at infinity?
    pub(crate) fn is_zero(&self) -> bool {
        vli::is_zero(&self.x) && vli::is_zero(&self.y)
    }
}

/// Right-hand side of the curve equation: `x³ + a·x + b mod p`
pub(crate) fn x_side(x: &Limbs, curve: &Curve) -> Limbs {
    let p = curve.p_words();
    let t = mod_square_fast(x, curve);
    let t = mod_add(&t, &curve.a, p);
    let t = mod_mult_fast(&t, x, curve);
    mod_add(&t, &curve.b, p)
}

/// Full validity check for externally supplied points
///
/// Rejects the point at infinity, out-of-range coordinates and anything not
/// satisfying the curve equation. Every deserialized public key passes
/// through here before any other arithmetic sees it.
pub(crate) fn is_valid_point(point: &AffinePoint, curve: &Curve) -> bool {
    use core::cmp::Ordering;

    let w = curve.num_words;
    let p = curve.p_words();
    if point.is_zero() {
        return false;
    }
    if vli::cmp_vartime(&point.x[..w], p) != Ordering::Less
        || vli::cmp_vartime(&point.y[..w], p) != Ordering::Less
    {
        return false;
    }
    let y2 = mod_square_fast(&point.y, curve);
    y2 == x_side(&point.x, curve)
}

/// `p − y`, the y-coordinate of the negated point (zero stays zero)
pub(crate) fn negate_y(y: &Limbs, curve: &Curve) -> Limbs {
    if vli::is_zero(&y[..curve.num_words]) {
        return [0; MAX_WORDS];
    }
    mod_sub(&[0; MAX_WORDS], y, curve.p_words())
}

/// Jacobian doubling in place: `(X, Y, Z) ← 2·(X, Y, Z)`
///
/// Uses the curve-generic formulas with `M = 3X² + a·Z⁴`, so the same code
/// path serves `a = p − 3` and `a = 0`. `Z = 0` (infinity) doubles to itself.
pub(crate) fn double_jacobian(x: &mut Limbs, y: &mut Limbs, z: &mut Limbs, curve: &Curve) {
    let p = curve.p_words();
    if vli::is_zero(&z[..curve.num_words]) {
        return;
    }

    let y2 = mod_square_fast(y, curve);
    // S = 4·X·Y²
    let mut s = mod_mult_fast(x, &y2, curve);
    s = mod_add(&s, &s, p);
    s = mod_add(&s, &s, p);

    // M = 3·X² + a·Z⁴
    let z2 = mod_square_fast(z, curve);
    let z4 = mod_square_fast(&z2, curve);
    let az4 = mod_mult_fast(&curve.a, &z4, curve);
    let x2 = mod_square_fast(x, curve);
    let mut m = mod_add(&x2, &x2, p);
    m = mod_add(&m, &x2, p);
    m = mod_add(&m, &az4, p);

    // X' = M² − 2S
    let xp = mod_sub(&mod_sub(&mod_square_fast(&m, curve), &s, p), &s, p);

    // Y' = M·(S − X') − 8·Y⁴
    let y4 = mod_square_fast(&y2, curve);
    let mut e = mod_add(&y4, &y4, p);
    e = mod_add(&e, &e, p);
    e = mod_add(&e, &e, p);
    let yp = mod_sub(&mod_mult_fast(&m, &mod_sub(&s, &xp, p), curve), &e, p);

    // Z' = 2·Y·Z
    let mut zp = mod_mult_fast(y, z, curve);
    zp = mod_add(&zp, &zp, p);

    *x = xp;
    *y = yp;
    *z = zp;
}

/// Rescale an affine point into the Jacobian frame of `z`:
/// `x ← x·z²`, `y ← y·z³`
pub(crate) fn apply_z(x: &mut Limbs, y: &mut Limbs, z: &Limbs, curve: &Curve) {
    let t = mod_square_fast(z, curve);
    *x = mod_mult_fast(x, &t, curve);
    let t = mod_mult_fast(&t, z, curve);
    *y = mod_mult_fast(y, &t, curve);
}

/// Co-Z addition
///
/// Input `P = (x1, y1)`, `Q = (x2, y2)` sharing an (implicit) Z.
/// Output: `(x1, y1) ← P` rescaled to the new common Z, `(x2, y2) ← P + Q`.
/// The implicit Z picks up a factor of `(x2 − x1)`.
pub(crate) fn xycz_add(
    x1: &mut Limbs,
    y1: &mut Limbs,
    x2: &mut Limbs,
    y2: &mut Limbs,
    curve: &Curve,
) {
    let p = curve.p_words();

    let mut t5 = mod_sub(x2, x1, p); // x2 − x1
    t5 = mod_square_fast(&t5, curve); // A = (x2 − x1)²
    *x1 = mod_mult_fast(x1, &t5, curve); // B = x1·A
    *x2 = mod_mult_fast(x2, &t5, curve); // C = x2·A
    *y2 = mod_sub(y2, y1, p); // y2 − y1
    t5 = mod_square_fast(y2, curve); // D = (y2 − y1)²

    t5 = mod_sub(&t5, x1, p);
    t5 = mod_sub(&t5, x2, p); // x3 = D − B − C
    *x2 = mod_sub(x2, x1, p); // C − B
    *y1 = mod_mult_fast(y1, x2, curve); // y1·(C − B)
    *x2 = mod_sub(x1, &t5, p); // B − x3
    *y2 = mod_mult_fast(y2, x2, curve); // (y2 − y1)·(B − x3)
    *y2 = mod_sub(y2, y1, p); // y3

    *x2 = t5;
}

/// Conjugate co-Z addition
///
/// Input `P = (x1, y1)`, `Q = (x2, y2)` sharing an (implicit) Z.
/// Output: `(x1, y1) ← P − Q`, `(x2, y2) ← P + Q`, again sharing a Z.
/// One ladder step computes both candidate successors so the scalar bit only
/// chooses between buffers, never between code paths.
pub(crate) fn xycz_add_c(
    x1: &mut Limbs,
    y1: &mut Limbs,
    x2: &mut Limbs,
    y2: &mut Limbs,
    curve: &Curve,
) {
    let p = curve.p_words();

    let mut t5 = mod_sub(x2, x1, p); // x2 − x1
    t5 = mod_square_fast(&t5, curve); // A = (x2 − x1)²
    *x1 = mod_mult_fast(x1, &t5, curve); // B = x1·A
    *x2 = mod_mult_fast(x2, &t5, curve); // C = x2·A
    t5 = mod_add(y2, y1, p); // y2 + y1
    *y2 = mod_sub(y2, y1, p); // y2 − y1

    let mut t6 = mod_sub(x2, x1, p); // C − B
    *y1 = mod_mult_fast(y1, &t6, curve); // E = y1·(C − B)
    t6 = mod_add(x1, x2, p); // B + C
    *x2 = mod_square_fast(y2, curve); // D = (y2 − y1)²
    *x2 = mod_sub(x2, &t6, p); // x3 = D − (B + C)

    let mut t7 = mod_sub(x1, x2, p); // B − x3
    *y2 = mod_mult_fast(y2, &t7, curve); // (y2 − y1)·(B − x3)
    *y2 = mod_sub(y2, y1, p); // y3 = (y2 − y1)·(B − x3) − E

    t7 = mod_square_fast(&t5, curve); // F = (y2 + y1)²
    t7 = mod_sub(&t7, &t6, p); // x3' = F − (B + C)
    t6 = mod_sub(&t7, x1, p); // x3' − B
    t6 = mod_mult_fast(&t6, &t5, curve); // (y2 + y1)·(x3' − B)
    *y1 = mod_sub(&t6, y1, p); // y3' = (y2 + y1)·(x3' − B) − E

    *x1 = t7;
}

/// Co-Z initial step: from affine `P` in `(x1, y1)`, produce the co-Z pair
/// `(x1, y1) = 2P`, `(x2, y2) = P`
///
/// An `initial_z` drawn from the caller's RNG randomizes the projective
/// representation before the first doubling, which decorrelates the ladder's
/// intermediate values from the fixed base point.
pub(crate) fn xycz_initial_double(
    x1: &mut Limbs,
    y1: &mut Limbs,
    x2: &mut Limbs,
    y2: &mut Limbs,
    initial_z: Option<&Limbs>,
    curve: &Curve,
) {
    let mut z = crate::modular::one();
    if let Some(iz) = initial_z {
        z = *iz;
    }

    *x2 = *x1;
    *y2 = *y1;

    apply_z(x1, y1, &z, curve);
    double_jacobian(x1, y1, &mut z, curve);
    apply_z(x2, y2, &z, curve);
}

/// Recover an affine point from compressed form
///
/// Solves `y² = x³ + a·x + b` for `y` and picks the root whose parity
/// matches `parity_odd`. Fails when `x` has no square root on the curve.
/// The result is checked against the curve equation before it is returned.
pub(crate) fn decompress(x: &Limbs, parity_odd: bool, curve: &Curve) -> Option<AffinePoint> {
    let rhs = x_side(x, curve);
    let mut y = mod_sqrt(&rhs, curve)?;
    if (y[0] & 1 == 1) != parity_odd {
        y = negate_y(&y, curve);
    }
    let point = AffinePoint { x: *x, y };
    if is_valid_point(&point, curve) {
        Some(point)
    } else {
        None
    }
}
