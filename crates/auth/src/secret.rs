//! Constant-time secret comparison.

use subtle::ConstantTimeEq;

/// Compare two secrets without an early exit on the first differing byte.
///
/// Lengths are not secret (every security code and digest has a fixed width),
/// so a length mismatch returns `false` immediately.
pub fn secrets_match(expected: &[u8], provided: &[u8]) -> bool {
    expected.ct_eq(provided).into()
}
