//! Token generation and password hashing using `ring`.

use std::num::NonZeroU32;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use tokio::task::{JoinError, spawn_blocking};

use super::types::OAuthError;

const TOKEN_BYTES: usize = 32;
const SALT_BYTES: usize = 16;
const HASH_BYTES: usize = ring::digest::SHA256_OUTPUT_LEN;
const PBKDF2_ITERATIONS: u32 = 100_000;
const HASH_SCHEME: &str = "pbkdf2-sha256";

/// Well-formed hash that no password matches. Checking against it costs as
/// much as checking a real hash, so misses take as long as wrong passwords.
pub const DUMMY_PASSWORD_HASH: &str =
    "pbkdf2-sha256$100000$AAAAAAAAAAAAAAAAAAAAAA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Generate a new opaque bearer token (256 random bits, base64url without padding).
pub fn generate_token() -> Result<String, OAuthError> {
    let rng = SystemRandom::new();
    let mut buf = [0u8; TOKEN_BYTES];
    rng.fill(&mut buf)
        .map_err(|_| OAuthError::ServerError("token generation failed".into()))?;
    Ok(URL_SAFE_NO_PAD.encode(buf))
}

/// Hash a password into `pbkdf2-sha256$<iterations>$<salt>$<hash>`.
pub fn hash_password(password: &str) -> Result<String, OAuthError> {
    let rng = SystemRandom::new();
    let mut salt = [0u8; SALT_BYTES];
    rng.fill(&mut salt)
        .map_err(|_| OAuthError::ServerError("salt generation failed".into()))?;
    let iterations = NonZeroU32::new(PBKDF2_ITERATIONS)
        .ok_or_else(|| OAuthError::ServerError("invalid iteration count".into()))?;

    let mut hash = [0u8; HASH_BYTES];
    pbkdf2::derive(pbkdf2::PBKDF2_HMAC_SHA256, iterations, &salt, password.as_bytes(), &mut hash);

    Ok(format!(
        "{HASH_SCHEME}${PBKDF2_ITERATIONS}${}${}",
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(hash)
    ))
}

struct ParsedHash {
    iterations: NonZeroU32,
    salt: Vec<u8>,
    hash: Vec<u8>,
}

fn parse_hash(encoded: &str) -> Option<ParsedHash> {
    let mut parts = encoded.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(hash), None) =
        (parts.next(), parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };
    if scheme != HASH_SCHEME {
        return None;
    }
    Some(ParsedHash {
        iterations: iterations.parse::<u32>().ok().and_then(NonZeroU32::new)?,
        salt: STANDARD_NO_PAD.decode(salt).ok()?,
        hash: STANDARD_NO_PAD.decode(hash).ok()?,
    })
}

/// Check a password against a hash produced by [`hash_password`].
///
/// Malformed hashes never verify.
pub fn verify_password(password: &str, encoded: &str) -> bool {
    let Some(parsed) = parse_hash(encoded) else {
        return false;
    };
    // constant-time comparison happens inside ring
    pbkdf2::verify(
        pbkdf2::PBKDF2_HMAC_SHA256,
        parsed.iterations,
        &parsed.salt,
        password.as_bytes(),
        &parsed.hash,
    )
    .is_ok()
}

/// [`hash_password`] on the blocking pool, off the async workers.
pub async fn hash_password_blocking(password: String) -> Result<String, OAuthError> {
    spawn_blocking(move || hash_password(&password))
        .await
        .map_err(hashing_task_failed)?
}

/// [`verify_password`] on the blocking pool, off the async workers.
pub async fn verify_password_blocking(
    password: String,
    encoded: String,
) -> Result<bool, OAuthError> {
    spawn_blocking(move || verify_password(&password, &encoded))
        .await
        .map_err(hashing_task_failed)
}

fn hashing_task_failed(err: JoinError) -> OAuthError {
    OAuthError::ServerError(format!("password hashing task failed: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_and_url_safe() {
        let a = generate_token().unwrap();
        let b = generate_token().unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn password_hash_verifies_only_the_original_password() {
        let hash = hash_password("s3cret").unwrap();
        assert!(hash.starts_with("pbkdf2-sha256$"));
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("badpassword", &hash));
    }

    #[test]
    fn malformed_hashes_never_verify() {
        assert!(!verify_password("s3cret", ""));
        assert!(!verify_password("s3cret", "md5$1$abc$def"));
        assert!(!verify_password("s3cret", "pbkdf2-sha256$0$abc$def"));
        assert!(!verify_password("s3cret", "pbkdf2-sha256$10$!!$def"));
    }

    #[test]
    fn dummy_hash_costs_a_full_check_and_never_matches() {
        let parsed = parse_hash(DUMMY_PASSWORD_HASH).unwrap();
        assert_eq!(parsed.iterations.get(), PBKDF2_ITERATIONS);
        assert_eq!(parsed.salt.len(), SALT_BYTES);
        assert_eq!(parsed.hash.len(), HASH_BYTES);
        assert!(!verify_password("", DUMMY_PASSWORD_HASH));
        assert!(!verify_password("password", DUMMY_PASSWORD_HASH));
    }

    #[tokio::test]
    async fn blocking_helpers_round_trip() {
        let hash = hash_password_blocking("s3cret".to_string()).await.unwrap();
        assert!(verify_password_blocking("s3cret".to_string(), hash.clone()).await.unwrap());
        assert!(!verify_password_blocking("badpassword".to_string(), hash).await.unwrap());
    }
}
