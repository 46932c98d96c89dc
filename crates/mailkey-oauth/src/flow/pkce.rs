//! PKCE (Proof Key for Code Exchange, RFC 7636).
//!
//! The verifier never leaves the process until the code exchange, so an
//! intercepted loopback redirect is useless on its own.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use sha2::{Digest, Sha256};

/// The only challenge method this crate sends.
const METHOD_S256: &str = "S256";

/// PKCE code challenge and verifier pair.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    verifier: String,
    challenge: String,
}

impl PkceChallenge {
    /// Generates a new pair from 32 random bytes (a 43 character verifier).
    #[must_use]
    pub fn generate() -> Self {
        let random_bytes: [u8; 32] = rand::thread_rng().r#gen();
        Self::from_verifier(URL_SAFE_NO_PAD.encode(random_bytes))
    }

    /// Builds the pair for a known verifier.
    #[must_use]
    pub fn from_verifier(verifier: impl Into<String>) -> Self {
        let verifier = verifier.into();
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self {
            verifier,
            challenge,
        }
    }

    /// Returns the verifier sent with the code exchange.
    #[must_use]
    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    /// Returns the challenge sent with the authorization request.
    #[must_use]
    pub fn challenge(&self) -> &str {
        &self.challenge
    }

    /// Returns the challenge method.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        METHOD_S256
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_challenge() {
        let pkce = PkceChallenge::from_verifier("test_verifier_string");
        assert_eq!(pkce.challenge(), "ktZu5ELbnUnx97HKaZsNZbfVaXdT1D2IdagpxxtQEI0");
        assert_eq!(pkce.method(), "S256");
    }

    #[test]
    fn test_verifier_length() {
        let pkce = PkceChallenge::generate();
        assert!(pkce.verifier().len() >= 43);
        assert!(pkce.verifier().len() <= 128);
        assert_ne!(pkce.verifier(), pkce.challenge());
    }

    #[test]
    fn test_multiple_generations_unique() {
        let pkce1 = PkceChallenge::generate();
        let pkce2 = PkceChallenge::generate();
        assert_ne!(pkce1.verifier(), pkce2.verifier());
        assert_ne!(pkce1.challenge(), pkce2.challenge());
    }
}
