//! Validation utilities shared by the byte-level APIs

use super::{Error, Result};

/// Validate an exact buffer length
#[inline(always)]
pub fn length(context: &'static str, actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(Error::Length {
            context,
            expected,
            actual,
        });
    }
    Ok(())
}
