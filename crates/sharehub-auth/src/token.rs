//! Random share token generation.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;

/// Fewest random bytes accepted for a share token.
pub const MIN_TOKEN_BYTES: usize = 16;

/// Produces URL-safe tokens from the operating system RNG.
#[derive(Debug, Clone, Copy)]
pub struct TokenGenerator {
    bytes: usize,
}

impl TokenGenerator {
    /// Tokens with `bytes` bytes of entropy (at least [`MIN_TOKEN_BYTES`]).
    pub fn new(bytes: usize) -> Self {
        Self {
            bytes: bytes.max(MIN_TOKEN_BYTES),
        }
    }

    /// Draw a fresh token.
    pub fn generate(&self) -> String {
        let mut raw = vec![0u8; self.bytes];
        OsRng.fill_bytes(&mut raw);
        URL_SAFE_NO_PAD.encode(raw)
    }
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self::new(32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_url_safe_and_distinct() {
        let generator = TokenGenerator::default();
        let a = generator.generate();
        let b = generator.generate();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(
            a.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_entropy_floor() {
        assert_eq!(TokenGenerator::new(1).generate().len(), 22);
    }
}
