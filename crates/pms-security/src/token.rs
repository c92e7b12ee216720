//! One-time tokens for email verification and password reset.
//!
//! The plain secret is mailed to the user; only its SHA-256 digest is stored.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone)]
pub struct OneTimeToken {
    pub secret: String,
    pub digest: String,
    pub expires_at: DateTime<Utc>,
}

impl OneTimeToken {
    pub fn generate(ttl_seconds: i64) -> Self {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        let secret = hex::encode(bytes);
        Self {
            digest: Self::digest(&secret),
            secret,
            expires_at: Utc::now() + Duration::seconds(ttl_seconds),
        }
    }

    pub fn digest(secret: &str) -> String {
        hex::encode(Sha256::digest(secret.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_unique_tokens() {
        let a = OneTimeToken::generate(60);
        let b = OneTimeToken::generate(60);
        assert_ne!(a.secret, b.secret);
        assert_eq!(a.secret.len(), 64);
        assert_eq!(OneTimeToken::digest(&a.secret), a.digest);
        assert!(a.expires_at > Utc::now());
    }
}
