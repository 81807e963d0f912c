//! Error handling for the elliptic curve engine

use core::fmt;

/// The error type for elliptic curve operations
///
/// Infrastructure failures and the ordinary negative outcome of signature
/// verification are separate variants on purpose: a caller matching on
/// [`Error::VerificationFailed`] can never confuse "this signature is bad"
/// with "the engine could not run".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A scalar (private key, nonce, signature component) is zero or not
    /// below the group order
    InvalidScalar {
        /// Operation that rejected the scalar
        context: &'static str,
    },

    /// A supplied point is not on the curve, or is the point at infinity
    InvalidPoint {
        /// Operation that rejected the point
        context: &'static str,
        /// Why the point was rejected
        reason: &'static str,
    },

    /// The random-bytes collaborator failed to deliver entropy
    RandomSource {
        /// Operation that needed randomness
        context: &'static str,
    },

    /// An operation kept producing degenerate intermediate values (zero
    /// nonce, zero signature component, point at infinity) until its retry
    /// cap ran out
    DegenerateResult {
        /// Operation whose retries were exhausted
        operation: &'static str,
    },

    /// The signature does not check out against the key and digest
    ///
    /// This is a legitimate negative answer, not an infrastructure failure.
    VerificationFailed,

    /// Length validation error
    Length {
        /// Context where the length error occurred
        context: &'static str,
        /// Expected length in bytes
        expected: usize,
        /// Actual length in bytes
        actual: usize,
    },

    /// Two objects bound to different curves were combined
    CurveMismatch {
        /// Operation that received the mismatched objects
        context: &'static str,
    },
}

/// Result type for elliptic curve operations
pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidScalar { context } => {
                write!(f, "invalid scalar in {}: zero or not below the group order", context)
            }
            Error::InvalidPoint { context, reason } => {
                write!(f, "invalid point in {}: {}", context, reason)
            }
            Error::RandomSource { context } => {
                write!(f, "random source failure in {}", context)
            }
            Error::DegenerateResult { operation } => {
                write!(f, "{} exhausted its retries on degenerate values", operation)
            }
            Error::VerificationFailed => {
                write!(f, "signature verification failed")
            }
            Error::Length { context, expected, actual } => {
                write!(f, "invalid length for {}: expected {}, got {}", context, expected, actual)
            }
            Error::CurveMismatch { context } => {
                write!(f, "curve mismatch in {}", context)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

pub mod validate;
