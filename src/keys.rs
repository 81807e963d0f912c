//! Key material: generation, validation and serialization
//!
//! Private keys are scalars in `[1, n−1]`, sized by the *order* of the curve
//! (21 bytes on secp160r1, whose order is one bit wider than its prime).
//! Public keys are validated, finite, on-curve points; the constructors here
//! are the only way to build one, so everything downstream can rely on that
//! invariant.

use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use crate::curve::Curve;
use crate::error::{validate, Error, Result};
use crate::mult;
use crate::point::{self, AffinePoint};
use crate::vli::{self, Limbs, Word, MAX_WORDS, WORD_BITS};

/// Cap on redraws when rejection-sampling a scalar, and on regeneration when
/// a computation produces a degenerate result. The rejection probability per
/// draw is negligible for every supported curve, so hitting this cap means
/// the randomness source is broken.
pub(crate) const MAX_RETRIES: usize = 64;

/// Draw a uniform value in `[1, bound)` from the caller's RNG
///
/// Rejection sampling as in key generation: fill the limb width of `bound`,
/// mask off the bits above `bound`'s bit length, and redraw on zero or
/// overshoot. RNG failure aborts immediately; only the (astronomically
/// unlikely) repeated overshoot path consumes retries.
pub(crate) fn random_in_range<R: CryptoRng + RngCore>(
    bound: &[Word],
    rng: &mut R,
    context: &'static str,
) -> Result<Limbs> {
    let words = bound.len();
    let bits = vli::num_bits(bound);
    let excess = words * WORD_BITS - bits;

    let mut buf = [0u8; MAX_WORDS * 4];
    for _ in 0..MAX_RETRIES {
        rng.try_fill_bytes(&mut buf[..words * 4])
            .map_err(|_| Error::RandomSource { context })?;

        let mut v = [0u32; MAX_WORDS];
        vli::from_be_bytes(&mut v[..words], &buf[..words * 4]);
        v[words - 1] &= u32::MAX >> excess;

        if !vli::is_zero(&v[..words]) && bool::from(vli::lt(&v[..words], bound)) {
            buf.zeroize();
            return Ok(v);
        }
        v.zeroize();
    }
    buf.zeroize();
    Err(Error::DegenerateResult { operation: context })
}

/// A private scalar bound to its curve
///
/// Holds `d` with `1 ≤ d ≤ n−1`; the limbs are wiped on drop. There is no
/// way to construct one with an out-of-range scalar.
#[derive(Clone)]
pub struct SecretKey {
    pub(crate) curve: &'static Curve,
    pub(crate) d: Limbs,
}

impl Zeroize for SecretKey {
    fn zeroize(&mut self) {
        self.d.zeroize();
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl core::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Never print the scalar.
        f.debug_struct("SecretKey").field("curve", &self.curve.name()).finish()
    }
}

impl SecretKey {
    /// The curve this key belongs to
    pub fn curve(&self) -> &'static Curve {
        self.curve
    }

    /// Generate a fresh private key from the caller's RNG
    pub fn generate<R: CryptoRng + RngCore>(
        curve: &'static Curve,
        rng: &mut R,
    ) -> Result<Self> {
        let d = random_in_range(curve.n_words(), rng, "key generation")?;
        Ok(SecretKey { curve, d })
    }

    /// Import a big-endian private key of exactly
    /// [`Curve::private_key_bytes`] bytes
    pub fn from_be_bytes(curve: &'static Curve, bytes: &[u8]) -> Result<Self> {
        validate::length("private key", bytes.len(), curve.private_key_bytes())?;

        let mut d = [0u32; MAX_WORDS];
        vli::from_be_bytes(&mut d[..curve.num_n_words], bytes);

        let in_range = !vli::is_zero(&d[..curve.num_n_words])
            && bool::from(vli::lt(&d[..curve.num_n_words], curve.n_words()));
        if !in_range {
            d.zeroize();
            return Err(Error::InvalidScalar { context: "private key import" });
        }
        Ok(SecretKey { curve, d })
    }

    /// Export the big-endian private key into `out`, which must be exactly
    /// [`Curve::private_key_bytes`] long
    pub fn write_be_bytes(&self, out: &mut [u8]) -> Result<()> {
        validate::length("private key", out.len(), self.curve.private_key_bytes())?;
        vli::to_be_bytes(out, &self.d[..self.curve.num_n_words]);
        Ok(())
    }

    /// Export the big-endian private key
    #[cfg(feature = "alloc")]
    pub fn to_be_bytes(&self) -> alloc::vec::Vec<u8> {
        let mut out = alloc::vec![0u8; self.curve.private_key_bytes()];
        vli::to_be_bytes(&mut out, &self.d[..self.curve.num_n_words]);
        out
    }

    /// Compute the public key `Q = d·G`
    ///
    /// Fails with [`Error::InvalidScalar`] on a zero scalar (unreachable
    /// through the public constructors, but checked rather than assumed) and
    /// never silently returns the point at infinity.
    pub fn public_key(&self) -> Result<PublicKey> {
        let curve = self.curve;
        if vli::is_zero(&self.d[..curve.num_n_words]) {
            return Err(Error::InvalidScalar { context: "public key computation" });
        }
        let g = AffinePoint::generator(curve);
        let q = mult::scalar_mult(&g, &self.d[..curve.num_n_words], None, curve);
        if q.is_zero() {
            return Err(Error::DegenerateResult { operation: "public key computation" });
        }
        Ok(PublicKey { curve, point: q })
    }
}

/// A validated public point bound to its curve
///
/// Constructors reject off-curve points, out-of-range coordinates and the
/// point at infinity, so a `PublicKey` value is always safe to multiply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicKey {
    pub(crate) curve: &'static Curve,
    pub(crate) point: AffinePoint,
}

impl PublicKey {
    /// The curve this key belongs to
    pub fn curve(&self) -> &'static Curve {
        self.curve
    }

    pub(crate) fn from_generator(curve: &'static Curve) -> Self {
        PublicKey {
            curve,
            point: AffinePoint::generator(curve),
        }
    }

    pub(crate) fn point(&self) -> &AffinePoint {
        &self.point
    }

    /// Import an uncompressed public key: `x ‖ y`, both big-endian, exactly
    /// [`Curve::public_key_bytes`] bytes in total
    pub fn from_uncompressed(curve: &'static Curve, bytes: &[u8]) -> Result<Self> {
        validate::length("uncompressed public key", bytes.len(), curve.public_key_bytes())?;

        let mut point = AffinePoint::zero();
        vli::from_be_bytes(&mut point.x[..curve.num_words], &bytes[..curve.num_bytes]);
        vli::from_be_bytes(&mut point.y[..curve.num_words], &bytes[curve.num_bytes..]);

        if !point::is_valid_point(&point, curve) {
            return Err(Error::InvalidPoint {
                context: "public key import",
                reason: "not a finite point on the curve",
            });
        }
        Ok(PublicKey { curve, point })
    }

    /// Import a compressed public key: a `0x02`/`0x03` parity byte followed
    /// by big-endian `x`, exactly [`Curve::compressed_public_key_bytes`]
    /// bytes in total
    pub fn from_compressed(curve: &'static Curve, bytes: &[u8]) -> Result<Self> {
        validate::length(
            "compressed public key",
            bytes.len(),
            curve.compressed_public_key_bytes(),
        )?;

        let tag = bytes[0];
        if tag != 0x02 && tag != 0x03 {
            return Err(Error::InvalidPoint {
                context: "public key decompression",
                reason: "unknown format byte",
            });
        }

        let mut x = [0u32; MAX_WORDS];
        vli::from_be_bytes(&mut x[..curve.num_words], &bytes[1..]);
        if vli::cmp_vartime(&x[..curve.num_words], curve.p_words()) != core::cmp::Ordering::Less {
            return Err(Error::InvalidPoint {
                context: "public key decompression",
                reason: "x coordinate not below the field prime",
            });
        }

        let point = point::decompress(&x, tag == 0x03, curve).ok_or(Error::InvalidPoint {
            context: "public key decompression",
            reason: "x is not the abscissa of a curve point",
        })?;
        Ok(PublicKey { curve, point })
    }

    /// Export as uncompressed `x ‖ y` into `out`, which must be exactly
    /// [`Curve::public_key_bytes`] long
    pub fn write_uncompressed(&self, out: &mut [u8]) -> Result<()> {
        let curve = self.curve;
        validate::length("uncompressed public key", out.len(), curve.public_key_bytes())?;
        vli::to_be_bytes(&mut out[..curve.num_bytes], &self.point.x[..curve.num_words]);
        vli::to_be_bytes(&mut out[curve.num_bytes..], &self.point.y[..curve.num_words]);
        Ok(())
    }

    /// Export in compressed form (parity byte, then `x`) into `out`, which
    /// must be exactly [`Curve::compressed_public_key_bytes`] long
    pub fn write_compressed(&self, out: &mut [u8]) -> Result<()> {
        let curve = self.curve;
        validate::length(
            "compressed public key",
            out.len(),
            curve.compressed_public_key_bytes(),
        )?;
        out[0] = 0x02 + (self.point.y[0] & 1) as u8;
        vli::to_be_bytes(&mut out[1..], &self.point.x[..curve.num_words]);
        Ok(())
    }

    /// Export as uncompressed `x ‖ y`
    #[cfg(feature = "alloc")]
    pub fn to_uncompressed(&self) -> alloc::vec::Vec<u8> {
        let mut out = alloc::vec![0u8; self.curve.public_key_bytes()];
        self.write_uncompressed(&mut out).expect("sized to fit");
        out
    }

    /// Export in compressed form
    #[cfg(feature = "alloc")]
    pub fn to_compressed(&self) -> alloc::vec::Vec<u8> {
        let mut out = alloc::vec![0u8; self.curve.compressed_public_key_bytes()];
        self.write_compressed(&mut out).expect("sized to fit");
        out
    }
}

/// Generate a key pair: a fresh private scalar and its public point
///
/// The scalar is drawn with rejection sampling; the public-key ladder runs
/// with a randomized initial Z from the same RNG. A degenerate result
/// (public point at infinity) is redrawn up to the retry cap, mirroring the
/// zero-scalar redraw discipline.
pub fn generate_keypair<R: CryptoRng + RngCore>(
    curve: &'static Curve,
    rng: &mut R,
) -> Result<(SecretKey, PublicKey)> {
    let g = AffinePoint::generator(curve);
    for _ in 0..MAX_RETRIES {
        let secret = SecretKey::generate(curve, rng)?;
        let blind = random_in_range(curve.p_words(), rng, "key generation")?;
        let q = mult::scalar_mult(&g, &secret.d[..curve.num_n_words], Some(&blind), curve);
        if q.is_zero() {
            continue;
        }
        return Ok((secret, PublicKey { curve, point: q }));
    }
    Err(Error::DegenerateResult { operation: "key generation" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn generated_keys_round_trip_through_bytes() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        for curve in curve::all() {
            let (sk, pk) = generate_keypair(curve, &mut rng).unwrap();

            let mut sk_bytes = [0u8; 32];
            let sk_len = curve.private_key_bytes();
            sk.write_be_bytes(&mut sk_bytes[..sk_len]).unwrap();
            let sk2 = SecretKey::from_be_bytes(curve, &sk_bytes[..sk_len]).unwrap();
            assert_eq!(sk2.public_key().unwrap(), pk, "{}", curve.name());

            let mut pk_bytes = [0u8; 64];
            let pk_len = curve.public_key_bytes();
            pk.write_uncompressed(&mut pk_bytes[..pk_len]).unwrap();
            let pk2 = PublicKey::from_uncompressed(curve, &pk_bytes[..pk_len]).unwrap();
            assert_eq!(pk2, pk, "{}", curve.name());
        }
    }

    #[test]
    fn zero_and_oversized_private_keys_are_rejected() {
        for curve in curve::all() {
            let len = curve.private_key_bytes();
            let zero = [0u8; 32];
            assert_eq!(
                SecretKey::from_be_bytes(curve, &zero[..len]).unwrap_err(),
                Error::InvalidScalar { context: "private key import" },
                "{}",
                curve.name()
            );

            // n itself is out of range
            let mut n_bytes = [0u8; 32];
            vli::to_be_bytes(&mut n_bytes[..len], &curve.n[..curve.num_n_words]);
            assert!(
                SecretKey::from_be_bytes(curve, &n_bytes[..len]).is_err(),
                "{}",
                curve.name()
            );

            // wrong length
            assert!(matches!(
                SecretKey::from_be_bytes(curve, &zero[..len - 1]),
                Err(Error::Length { .. })
            ));
        }
    }

    #[test]
    fn tampered_public_keys_are_rejected() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        for curve in curve::all() {
            let (_, pk) = generate_keypair(curve, &mut rng).unwrap();
            let mut bytes = [0u8; 64];
            let len = curve.public_key_bytes();
            pk.write_uncompressed(&mut bytes[..len]).unwrap();
            bytes[len - 1] ^= 1;
            assert!(
                matches!(
                    PublicKey::from_uncompressed(curve, &bytes[..len]),
                    Err(Error::InvalidPoint { .. })
                ),
                "{}",
                curve.name()
            );

            // All-zero encoding is the point at infinity: rejected
            let zeros = [0u8; 64];
            assert!(PublicKey::from_uncompressed(curve, &zeros[..len]).is_err());
        }
    }

    #[test]
    fn compression_round_trips() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        for curve in curve::all() {
            for _ in 0..4 {
                let (_, pk) = generate_keypair(curve, &mut rng).unwrap();
                let mut compressed = [0u8; 33];
                let len = curve.compressed_public_key_bytes();
                pk.write_compressed(&mut compressed[..len]).unwrap();
                assert!(compressed[0] == 0x02 || compressed[0] == 0x03);
                let back = PublicKey::from_compressed(curve, &compressed[..len]).unwrap();
                assert_eq!(back, pk, "{}", curve.name());
            }
        }
    }

    #[test]
    fn compressed_rejects_bad_tag_and_non_residue() {
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        for curve in curve::all() {
            let (_, pk) = generate_keypair(curve, &mut rng).unwrap();
            let mut compressed = [0u8; 33];
            let len = curve.compressed_public_key_bytes();
            pk.write_compressed(&mut compressed[..len]).unwrap();

            compressed[0] = 0x04;
            assert!(PublicKey::from_compressed(curve, &compressed[..len]).is_err());
        }

        // An x whose cubic has no square root must fail decompression.
        // Scan small x values until one is rejected.
        for curve in curve::all() {
            let len = curve.compressed_public_key_bytes();
            let mut encoded = [0u8; 33];
            encoded[0] = 0x02;
            let mut rejected = false;
            for x in 1u8..64 {
                encoded[len - 1] = x;
                if PublicKey::from_compressed(curve, &encoded[..len]).is_err() {
                    rejected = true;
                    break;
                }
            }
            assert!(rejected, "{}", curve.name());
        }
    }

    #[test]
    fn identity_scalar_yields_the_generator() {
        // d = 1 must give exactly Q = G.
        let mut one = [0u8; 32];
        one[31] = 1;
        let len = curve::SECP256R1.private_key_bytes();
        let sk = SecretKey::from_be_bytes(&curve::SECP256R1, &one[..len]).unwrap();
        let q = sk.public_key().unwrap();
        assert_eq!(q, curve::SECP256R1.generator());
    }

    #[test]
    fn failing_rng_surfaces_as_random_source_error() {
        struct BrokenRng;
        impl RngCore for BrokenRng {
            fn next_u32(&mut self) -> u32 {
                0
            }
            fn next_u64(&mut self) -> u64 {
                0
            }
            fn fill_bytes(&mut self, _dest: &mut [u8]) {}
            fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> core::result::Result<(), rand::Error> {
                Err(rand::Error::new("entropy source unavailable"))
            }
        }
        impl CryptoRng for BrokenRng {}

        let err = SecretKey::generate(&curve::SECP256R1, &mut BrokenRng).unwrap_err();
        assert_eq!(err, Error::RandomSource { context: "key generation" });
    }
}
