//! ECDSA signing and verification over caller-supplied digests
//!
//! The digest is truncated to the leftmost `bitlen(n)` bits and reduced
//! modulo the order, per the standard convention, so any digest length works
//! with any curve. Nonces follow the same draw-and-reject discipline as key
//! generation, zero `r`/`s` outcomes retry with a fresh nonce, and the nonce
//! inverse is computed on a multiplicatively blinded value so the
//! variable-time inversion never sees the raw nonce.

use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use crate::curve::Curve;
use crate::error::{validate, Error, Result};
use crate::keys::{self, PublicKey, SecretKey};
use crate::modular::{mod_add, mod_inv, mod_mult};
use crate::mult;
use crate::point::AffinePoint;
use crate::vli::{self, Limbs, MAX_WORDS};

/// An ECDSA signature `(r, s)` bound to its curve
///
/// Serialized as fixed-width big-endian `r ‖ s`, each component one field
/// element wide. Parsing does not range-check the components; verification
/// rejects out-of-range values itself, so a tampered signature is reported
/// as [`Error::VerificationFailed`] rather than a parse error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature {
    pub(crate) curve: &'static Curve,
    pub(crate) r: Limbs,
    pub(crate) s: Limbs,
}

impl Signature {
    /// The curve this signature belongs to
    pub fn curve(&self) -> &'static Curve {
        self.curve
    }

    /// Parse a fixed-width `r ‖ s` signature of exactly
    /// [`Curve::signature_bytes`] bytes
    pub fn from_be_bytes(curve: &'static Curve, bytes: &[u8]) -> Result<Self> {
        validate::length("signature", bytes.len(), curve.signature_bytes())?;
        let mut r = [0u32; MAX_WORDS];
        let mut s = [0u32; MAX_WORDS];
        vli::from_be_bytes(&mut r[..curve.num_words], &bytes[..curve.num_bytes]);
        vli::from_be_bytes(&mut s[..curve.num_words], &bytes[curve.num_bytes..]);
        Ok(Signature { curve, r, s })
    }

    /// Write the fixed-width `r ‖ s` encoding into `out`, which must be
    /// exactly [`Curve::signature_bytes`] long
    pub fn write_be_bytes(&self, out: &mut [u8]) -> Result<()> {
        let curve = self.curve;
        validate::length("signature", out.len(), curve.signature_bytes())?;
        vli::to_be_bytes(&mut out[..curve.num_bytes], &self.r[..curve.num_words]);
        vli::to_be_bytes(&mut out[curve.num_bytes..], &self.s[..curve.num_words]);
        Ok(())
    }

    /// The fixed-width `r ‖ s` encoding
    #[cfg(feature = "alloc")]
    pub fn to_be_bytes(&self) -> alloc::vec::Vec<u8> {
        let mut out = alloc::vec![0u8; self.curve.signature_bytes()];
        self.write_be_bytes(&mut out).expect("sized to fit");
        out
    }
}

/// Truncate a digest to the leftmost `bitlen(n)` bits and reduce modulo `n`
///
/// Digests longer than the order keep only their leftmost bits; shorter
/// digests are used whole. One conditional subtraction suffices because the
/// truncated value is below `2n`.
pub(crate) fn digest_to_scalar(digest: &[u8], curve: &Curve) -> Limbs {
    let nw = curve.num_n_words;
    let n_bytes = (curve.num_n_bits + 7) / 8;
    let take = core::cmp::min(digest.len(), n_bytes);

    let mut z = [0u32; MAX_WORDS];
    vli::from_be_bytes(&mut z[..nw], &digest[..take]);

    let excess_bits = take * 8;
    if excess_bits > curve.num_n_bits {
        for _ in 0..(excess_bits - curve.num_n_bits) {
            vli::rshift1(&mut z[..nw]);
        }
    }

    if vli::cmp_vartime(&z[..nw], curve.n_words()) != core::cmp::Ordering::Less {
        vli::sub_assign(&mut z[..nw], curve.n_words());
    }
    z
}

/// Widen a field element to order width and reduce it modulo `n`
///
/// Used for `r = x mod n`; the input is below `p < 2n` on every supported
/// curve, so a single conditional subtraction reduces it.
fn x_coordinate_mod_n(x: &Limbs, curve: &Curve) -> Limbs {
    let nw = curve.num_n_words;
    let mut r = *x;
    if vli::cmp_vartime(&r[..nw], curve.n_words()) != core::cmp::Ordering::Less {
        vli::sub_assign(&mut r[..nw], curve.n_words());
    }
    r
}

/// Sign a digest
///
/// FIPS 186-4 ECDSA with a random nonce per attempt: `R = k·G`,
/// `r = R.x mod n`, `s = k⁻¹(z + r·d) mod n`. Zero `r` or `s` draws a fresh
/// nonce — returning either would leak the key or produce an unverifiable
/// signature. On secp160r1 an `s` wider than the 20-byte signature slot also
/// retries, keeping the wire format fixed-width.
pub fn sign_digest<R: CryptoRng + RngCore>(
    key: &SecretKey,
    digest: &[u8],
    rng: &mut R,
) -> Result<Signature> {
    let curve: &'static Curve = key.curve();
    let nw = curve.num_n_words;
    let n = curve.n_words();
    let g = AffinePoint::generator(curve);
    let z = digest_to_scalar(digest, curve);

    for _ in 0..keys::MAX_RETRIES {
        let mut k = keys::random_in_range(n, rng, "signing")?;
        let blind_z = keys::random_in_range(curve.p_words(), rng, "signing")?;

        let point = mult::scalar_mult(&g, &k[..nw], Some(&blind_z), curve);
        if point.is_zero() {
            k.zeroize();
            continue;
        }

        let r = x_coordinate_mod_n(&point.x, curve);
        if vli::is_zero(&r[..nw]) {
            k.zeroize();
            continue;
        }

        // k⁻¹ via a blinded inversion: invert b·k, then multiply by b again.
        let b = keys::random_in_range(n, rng, "signing")?;
        let mut kb = mod_mult(&k, &b, n);
        let mut kb_inv = mod_inv(&kb, n);
        let mut k_inv = mod_mult(&kb_inv, &b, n);
        k.zeroize();
        kb.zeroize();
        kb_inv.zeroize();

        let mut rd = mod_mult(&r, &key.d, n);
        let mut zrd = mod_add(&z, &rd, n);
        let s = mod_mult(&k_inv, &zrd, n);
        k_inv.zeroize();
        rd.zeroize();
        zrd.zeroize();

        if vli::is_zero(&s[..nw]) {
            continue;
        }
        // s must fit the fixed-width signature slot (one bit narrower than
        // the order on secp160r1).
        if vli::num_bits(&s[..nw]) > curve.num_bytes * 8 {
            continue;
        }

        return Ok(Signature { curve, r, s });
    }
    Err(Error::DegenerateResult { operation: "signing" })
}

/// Verify a signature against a digest and public key
///
/// Rejects `r`/`s` outside `[1, n−1]` before any curve arithmetic, computes
/// `R' = u1·G + u2·Q` with Shamir's trick, and accepts only when `R'` is
/// finite and `R'.x ≡ r (mod n)`. A bad signature yields
/// [`Error::VerificationFailed`]; infrastructure problems use the other
/// error variants.
pub fn verify_digest(key: &PublicKey, digest: &[u8], signature: &Signature) -> Result<()> {
    use core::cmp::Ordering;

    let curve: &'static Curve = key.curve();
    if signature.curve() != curve {
        return Err(Error::CurveMismatch { context: "signature verification" });
    }
    let nw = curve.num_n_words;
    let n = curve.n_words();

    let r = &signature.r;
    let s = &signature.s;
    if vli::is_zero(&r[..nw]) || vli::is_zero(&s[..nw]) {
        return Err(Error::VerificationFailed);
    }
    if vli::cmp_vartime(&r[..nw], n) != Ordering::Less
        || vli::cmp_vartime(&s[..nw], n) != Ordering::Less
    {
        return Err(Error::VerificationFailed);
    }

    let z = digest_to_scalar(digest, curve);
    let s_inv = mod_inv(s, n);
    let u1 = mod_mult(&z, &s_inv, n);
    let u2 = mod_mult(r, &s_inv, n);

    let rp = mult::shamir_double_mult(&u1, &u2, key.point(), curve);
    if rp.is_zero() {
        return Err(Error::VerificationFailed);
    }

    let v = x_coordinate_mod_n(&rp.x, curve);
    if bool::from(vli::equal(&v[..nw], &r[..nw])) {
        Ok(())
    } else {
        Err(Error::VerificationFailed)
    }
}
