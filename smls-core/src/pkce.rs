use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Raw entropy behind a code verifier. 64 bytes encode to 86 characters,
/// inside the 43..=128 range of RFC 7636.
pub const CODE_VERIFIER_BYTES: usize = 64;

/// The only challenge method this crate emits.
pub const CODE_CHALLENGE_METHOD: &str = "S256";

/// Encodes `N` bytes from the thread CSPRNG as unpadded base64url.
pub(crate) fn url_safe_token<const N: usize>() -> String {
    let mut bytes = [0u8; N];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generates a fresh PKCE code verifier with 512 bits of entropy.
pub fn generate_code_verifier() -> String {
    url_safe_token::<CODE_VERIFIER_BYTES>()
}

/// Derives the S256 code challenge: `base64url(SHA256(verifier))` without padding.
pub fn generate_code_challenge(code_verifier: &str) -> String {
    let digest = Sha256::digest(code_verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// A PKCE verifier together with its derived challenge.
#[derive(Debug, Clone)]
pub struct Pkce {
    /// Secret kept by the client until the token exchange.
    pub code_verifier: String,
    /// Value sent in the authorization request.
    pub code_challenge: String,
}

impl Pkce {
    /// Generate a fresh verifier/challenge pair.
    pub fn new() -> Self {
        let code_verifier = generate_code_verifier();
        let code_challenge = generate_code_challenge(&code_verifier);
        Self {
            code_verifier,
            code_challenge,
        }
    }
}

impl Default for Pkce {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_url_safe(s: &str) -> bool {
        s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    #[test]
    fn verifier_length_is_within_rfc_bounds() {
        let verifier = generate_code_verifier();
        assert_eq!(verifier.len(), 86);
        assert!(is_url_safe(&verifier));
    }

    #[test]
    fn challenge_matches_rfc7636_appendix_b() {
        let challenge = generate_code_challenge("dBjftJeZ4CVP-mJ92K9TZGZRvO1kNuFrdzz1Vs3v4mk");
        assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn challenge_is_deterministic_and_unpadded() {
        let verifier = generate_code_verifier();
        let first = generate_code_challenge(&verifier);
        let second = generate_code_challenge(&verifier);
        assert_eq!(first, second);
        assert!(!first.contains('='));
        assert!(is_url_safe(&first));
        assert_eq!(first.len(), 43);
    }

    #[test]
    fn pkce_pair_is_consistent_and_fresh() {
        let a = Pkce::new();
        let b = Pkce::new();
        assert_eq!(a.code_challenge, generate_code_challenge(&a.code_verifier));
        assert_ne!(a.code_verifier, b.code_verifier);
    }
}
