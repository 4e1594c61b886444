//! One-time codes and reset tokens.

use rand::{rngs::OsRng, Rng, RngCore};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const RESET_TOKEN_BYTES: usize = 20;

/// Six-digit code, uniform over `100000..=999999`.
pub fn generate_verification_code() -> String {
    OsRng.gen_range(100_000u32..1_000_000).to_string()
}

/// Plaintext reset token (hex). Only its [`hash_reset_token`] is stored.
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Constant-time comparison of a submitted code with the stored one.
/// A missing stored code never matches.
pub fn codes_match(stored: Option<&str>, submitted: &str) -> bool {
    match stored {
        Some(stored) => stored.as_bytes().ct_eq(submitted.as_bytes()).into(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_code_format() {
        for _ in 0..200 {
            let code = generate_verification_code();
            assert_eq!(code.len(), 6);
            let n: u32 = code.parse().expect("numeric");
            assert!((100_000..1_000_000).contains(&n));
        }
    }

    #[test]
    fn reset_tokens_are_unique_hex() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), RESET_TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn reset_token_hash_is_stable_sha256() {
        assert_eq!(
            hash_reset_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_ne!(hash_reset_token("abc"), "abc");
    }

    #[test]
    fn code_comparison() {
        assert!(codes_match(Some("123456"), "123456"));
        assert!(!codes_match(Some("123456"), "123457"));
        assert!(!codes_match(Some("123456"), "12345"));
        assert!(!codes_match(None, "123456"));
        assert!(!codes_match(None, ""));
    }
}
