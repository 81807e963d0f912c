//! Elliptic Curve Diffie-Hellman shared-secret derivation
//!
//! The shared secret is the raw big-endian x-coordinate of `d·Q`, one field
//! element wide. Callers wanting a symmetric key should run it through a KDF;
//! this crate deliberately stops at the group operation.

use zeroize::Zeroize;

use crate::curve::Curve;
use crate::error::{Error, Result};
use crate::keys::{PublicKey, SecretKey};
use crate::mult;
use crate::vli::{self, MAX_WORDS};

/// An ECDH shared secret; the bytes are wiped on drop
pub struct SharedSecret {
    bytes: [u8; MAX_WORDS * 4],
    len: usize,
}

impl SharedSecret {
    /// The big-endian x-coordinate, [`Curve::shared_secret_bytes`] long
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

impl AsRef<[u8]> for SharedSecret {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl Zeroize for SharedSecret {
    fn zeroize(&mut self) {
        self.bytes.zeroize();
    }
}

impl Drop for SharedSecret {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl core::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Never print the secret bytes.
        f.debug_struct("SharedSecret").field("len", &self.len).finish()
    }
}

/// Derive the shared secret `x(d_self · Q_peer)`
///
/// `peer` was validated on construction (finite, on-curve), so an invalid
/// point can not reach the ladder. The multiplication result being the point
/// at infinity — only possible for a degenerate key pairing — is a definite
/// failure, never an all-zero "secret".
pub fn shared_secret(secret: &SecretKey, peer: &PublicKey) -> Result<SharedSecret> {
    let curve: &'static Curve = secret.curve();
    if peer.curve() != curve {
        return Err(Error::CurveMismatch { context: "shared secret derivation" });
    }

    let product = mult::scalar_mult(
        peer.point(),
        &secret.d[..curve.num_n_words],
        None,
        curve,
    );
    if product.is_zero() {
        return Err(Error::DegenerateResult { operation: "shared secret derivation" });
    }

    let mut out = SharedSecret {
        bytes: [0u8; MAX_WORDS * 4],
        len: curve.shared_secret_bytes(),
    };
    vli::to_be_bytes(&mut out.bytes[..out.len], &product.x[..curve.num_words]);
    Ok(out)
}
