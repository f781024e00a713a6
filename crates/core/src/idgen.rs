//! Identifier generator: unpredictable fixed-width lowercase hex strings.
//!
//! All identifiers that must not be guessable (session tokens, security codes,
//! transaction ids, public account identifiers) come from here. Bytes are drawn
//! from the operating system CSPRNG.

use rand::{CryptoRng, RngCore, rngs::OsRng};
use thiserror::Error;

/// Width of transaction ids (and loan ids).
pub const TRANSACTION_ID_BITS: u32 = 256;
/// Width of session tokens.
pub const SESSION_TOKEN_BITS: u32 = 256;
/// Width of public account identifiers.
pub const ACCOUNT_IDENTIFIER_BITS: u32 = 128;
/// Width of per-account security codes.
pub const SECURITY_CODE_BITS: u32 = 128;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("bits must be greater than zero")]
    ZeroWidth,

    #[error("entropy source failed: {0}")]
    Entropy(#[from] rand::Error),
}

/// Generate `ceil(bits / 8)` random bytes from the OS CSPRNG, hex encoded.
pub fn generate(bits: u32) -> Result<String, GenerationError> {
    generate_with(&mut OsRng, bits)
}

/// Same as [`generate`], drawing from the given cryptographic RNG.
pub fn generate_with<R>(rng: &mut R, bits: u32) -> Result<String, GenerationError>
where
    R: RngCore + CryptoRng,
{
    if bits == 0 {
        return Err(GenerationError::ZeroWidth);
    }

    let mut bytes = vec![0u8; bits.div_ceil(8) as usize];
    rng.try_fill_bytes(&mut bytes)?;

    Ok(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::validate::is_hex;

    struct FailingRng;

    impl RngCore for FailingRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, _dest: &mut [u8]) {}

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
            Err(rand::Error::new(std::io::Error::other("entropy pool unavailable")))
        }
    }

    impl CryptoRng for FailingRng {}

    #[test]
    fn widths_round_up_to_whole_bytes() {
        assert_eq!(generate(256).unwrap().len(), 64);
        assert_eq!(generate(128).unwrap().len(), 32);
        assert_eq!(generate(1).unwrap().len(), 2);
        assert_eq!(generate(9).unwrap().len(), 4);
    }

    #[test]
    fn zero_width_is_rejected() {
        assert!(matches!(generate(0), Err(GenerationError::ZeroWidth)));
    }

    #[test]
    fn entropy_failure_is_surfaced() {
        let err = generate_with(&mut FailingRng, 256).unwrap_err();
        assert!(matches!(err, GenerationError::Entropy(_)));
    }

    #[test]
    fn output_is_lowercase_hex() {
        for _ in 0..100 {
            let id = generate(TRANSACTION_ID_BITS).unwrap();
            assert!(is_hex(&id, 64), "unexpected id {id}");
        }
    }

    #[test]
    fn ten_thousand_samples_do_not_collide() {
        let mut seen = HashSet::with_capacity(10_000);
        for _ in 0..10_000 {
            let id = generate(256).unwrap();
            assert_eq!(id.len(), 64);
            assert!(seen.insert(id), "duplicate identifier generated");
        }
    }
}
