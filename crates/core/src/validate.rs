//! Input validators.
//!
//! Pure predicates over untrusted strings. Hex identifiers are pinned to
//! **lowercase**: the generator only emits lowercase and every header, body
//! field and stored id is compared byte-for-byte, so `ABCD` is rejected rather
//! than normalized.

use std::sync::LazyLock;

use regex::Regex;

/// Length of a SHA-512 hex digest.
pub const DIGEST_LEN: usize = 128;
/// Length of session tokens and transaction ids.
pub const TOKEN_LEN: usize = 64;
/// Length of security codes and public account identifiers.
pub const CODE_LEN: usize = 32;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}\p{N}_.]+$").expect("username pattern is valid"));

static ADDR_SPEC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*$",
    )
    .expect("address pattern is valid")
});

/// Exactly `len` characters, all in `[0-9a-f]`.
pub fn is_hex(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// A hex-encoded SHA-512 digest (the password form clients send).
pub fn is_digest(value: &str) -> bool {
    is_hex(value, DIGEST_LEN)
}

/// More than six characters of letters, digits, `_` or `.`.
pub fn is_username(value: &str) -> bool {
    value.chars().count() > 6 && USERNAME_RE.is_match(value)
}

/// Accepts a bare `local@domain` or the `Display Name <local@domain>` form.
pub fn is_email(value: &str) -> bool {
    let value = value.trim();
    let addr = match (value.rfind('<'), value.strip_suffix('>')) {
        (Some(open), Some(inner)) => &inner[open + 1..],
        (None, None) => value,
        _ => return false,
    };

    ADDR_SPEC_RE.is_match(addr)
}

/// Plain non-negative decimal: digits with at most one `.`, no sign or exponent.
pub fn is_amount(value: &str) -> bool {
    let mut digits = 0usize;
    let mut points = 0usize;

    for c in value.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => points += 1,
            _ => return false,
        }
    }

    digits > 0 && points <= 1
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn hex_checks_length_and_case() {
        assert!(is_hex("0123456789abcdef", 16));
        assert!(!is_hex("0123456789abcde", 16));
        assert!(!is_hex("0123456789ABCDEF", 16));
        assert!(!is_hex("0123456789abcdeg", 16));
        assert!(is_hex(&"a".repeat(TOKEN_LEN), TOKEN_LEN));
        assert!(!is_hex(&"a".repeat(CODE_LEN), TOKEN_LEN));
        assert!(is_hex(&"0".repeat(CODE_LEN), CODE_LEN));
        assert!(!is_hex(&"0".repeat(TOKEN_LEN), CODE_LEN));
    }

    #[test]
    fn digest_is_128_hex() {
        assert!(is_digest(&"f".repeat(128)));
        assert!(!is_digest(&"f".repeat(127)));
        assert!(!is_digest(&"F".repeat(128)));
    }

    #[test]
    fn usernames() {
        assert!(is_username("alice_01"));
        assert!(is_username("jürgen.k"));
        assert!(!is_username("alice"));
        assert!(!is_username("abcdef"));
        assert!(is_username("abcdefg"));
        assert!(!is_username("alice-bob"));
        assert!(!is_username("alice bob"));
    }

    #[test]
    fn emails() {
        assert!(is_email("alice@example.com"));
        assert!(is_email("Alice Liddell <alice@example.com>"));
        assert!(is_email("first.last+tag@mail.example.org"));
        assert!(!is_email("alice"));
        assert!(!is_email("alice@"));
        assert!(!is_email("@example.com"));
        assert!(!is_email("alice@@example.com"));
        assert!(!is_email("Alice <alice@example.com"));
        assert!(!is_email("alice..x@example.com"));
    }

    #[test]
    fn amounts() {
        assert!(is_amount("500"));
        assert!(is_amount("49999.99"));
        assert!(is_amount(".5"));
        assert!(is_amount("5."));
        assert!(!is_amount(""));
        assert!(!is_amount("."));
        assert!(!is_amount("-5"));
        assert!(!is_amount("+5"));
        assert!(!is_amount("1e5"));
        assert!(!is_amount("1.2.3"));
        assert!(!is_amount(" 5"));
    }

    proptest! {
        #[test]
        fn unsigned_decimals_are_amounts(whole in 0u64..1_000_000_000, frac in 0u32..100) {
            let formatted = format!("{whole}.{frac:02}");
            prop_assert!(is_amount(&formatted));
        }

        #[test]
        fn signed_values_are_not_amounts(value in -1_000_000i64..-1) {
            prop_assert!(!is_amount(&value.to_string()));
        }
    }
}
