//! Constant-time elliptic curve engine for the small SECG/NIST curves
//!
//! This crate implements key generation, ECDH shared-secret derivation, ECDSA
//! signing/verification and point compression over the short-Weierstrass
//! curves secp160r1, secp192r1, secp224r1, secp256r1 and secp256k1.
//!
//! Unlike per-curve generic code, the arithmetic here is parameterized at
//! runtime by an immutable [`Curve`] record: fixed-capacity limb buffers sized
//! to the largest supported curve carry an explicit active word count taken
//! from the curve, so one engine serves every curve with a predictable memory
//! layout.
//!
//! # Security Features
//!
//! - Scalar multiplication runs a fixed-iteration co-Z ladder; the scalar is
//!   regularized by adding a multiple of the group order before the ladder so
//!   its bit length never leaks, and ladder arms are chosen by constant-time
//!   conditional swaps, never by branching on key bits
//! - Secret material (private keys, nonces, shared secrets) is zeroized on drop
//! - Every externally supplied public key is validated (on-curve, not the
//!   point at infinity) before any arithmetic touches it
//! - The randomness source is an external collaborator supplied by the caller;
//!   its failures surface as errors instead of being retried forever
//!
//! Callers supply message *digests*; this crate does not hash.

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

#[cfg(feature = "alloc")]
extern crate alloc;

// Error module and re-exports
pub mod error;
pub use error::{validate, Error, Result};

// Curve parameter table
pub mod curve;
pub use curve::{Curve, SECP160R1, SECP192R1, SECP224R1, SECP256K1, SECP256R1};

// Arithmetic layers (crate-internal)
mod modular;
mod mult;
mod point;
mod vli;

// Key material and point (de)serialization
pub mod keys;
pub use keys::{generate_keypair, PublicKey, SecretKey};

// Diffie-Hellman shared-secret derivation
pub mod ecdh;
pub use ecdh::{shared_secret, SharedSecret};

// ECDSA over caller-supplied digests
pub mod ecdsa;
pub use ecdsa::{sign_digest, verify_digest, Signature};
