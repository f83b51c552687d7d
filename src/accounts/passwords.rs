use anyhow::{Context, Result};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use std::num::NonZeroU32;

const ALGORITHM: &str = "pbkdf2_sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 150;

/// Hashes passwords as `pbkdf2_sha256$<iterations>$<salt>$<hash>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasher {
    iterations: NonZeroU32,
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: NonZeroU32::new(iterations).unwrap_or(NonZeroU32::MIN),
        }
    }

    /// Derives the hash on the blocking pool.
    pub async fn hash(&self, password: &str) -> Result<String> {
        let hasher = *self;
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash_blocking(&password))
            .await
            .context("Password hashing task failed")?
    }

    /// Spends the same work as a real verification, for unknown accounts.
    pub async fn burn_verification(&self, password: &str) -> Result<()> {
        self.hash(password).await.map(|_| ())
    }

    fn hash_blocking(&self, password: &str) -> Result<String> {
        let mut salt = [0u8; SALT_LEN];
        SystemRandom::new()
            .fill(&mut salt)
            .map_err(|_| anyhow::anyhow!("Failed to generate password salt"))?;

        let mut hash = [0u8; HASH_LEN];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            self.iterations,
            &salt,
            password.as_bytes(),
            &mut hash,
        );

        Ok(format!(
            "{ALGORITHM}${}${}${}",
            self.iterations,
            BASE64.encode(salt),
            BASE64.encode(hash)
        ))
    }
}

/// Checks `password` against an encoded hash on the blocking pool.
pub async fn verify_password(password: &str, encoded: &str) -> Result<bool> {
    let password = password.to_string();
    let encoded = encoded.to_string();
    tokio::task::spawn_blocking(move || verify_blocking(&password, &encoded))
        .await
        .context("Password verification task failed")
}

fn verify_blocking(password: &str, encoded: &str) -> bool {
    let mut parts = encoded.split('$');
    let (Some(ALGORITHM), Some(iterations), Some(salt), Some(hash), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };

    let Some(iterations) = iterations.parse::<u32>().ok().and_then(NonZeroU32::new) else {
        return false;
    };
    let (Ok(salt), Ok(hash)) = (BASE64.decode(salt), BASE64.decode(hash)) else {
        return false;
    };

    pbkdf2::verify(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        &salt,
        password.as_bytes(),
        &hash,
    )
    .is_ok()
}

/// Returns every rule the password breaks.
pub fn password_problems(password: &str) -> Vec<String> {
    let mut problems = Vec::new();
    let length = password.chars().count();

    if length < MIN_PASSWORD_LENGTH {
        problems.push(format!(
            "This password is too short. It must contain at least {MIN_PASSWORD_LENGTH} characters."
        ));
    }
    if length > MAX_PASSWORD_LENGTH {
        problems.push(format!(
            "Ensure this field has no more than {MAX_PASSWORD_LENGTH} characters."
        ));
    }
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }

    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_hash_and_verify() -> Result<()> {
        let hasher = PasswordHasher::new(1_000);
        let encoded = hasher.hash("correct horse").await?;

        assert!(encoded.starts_with("pbkdf2_sha256$1000$"));
        assert!(verify_password("correct horse", &encoded).await?);
        assert!(!verify_password("wrong horse", &encoded).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_hashes_are_salted() -> Result<()> {
        let hasher = PasswordHasher::new(1_000);
        assert_ne!(hasher.hash("same").await?, hasher.hash("same").await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_hashing_leaves_runtime_responsive() -> Result<()> {
        let hasher = PasswordHasher::new(100_000);
        let started = Instant::now();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            started.elapsed()
        });

        let encoded = hasher.hash("pw").await?;
        let hash_elapsed = started.elapsed();
        let timer_elapsed = timer.await?;

        assert!(
            timer_elapsed < hash_elapsed,
            "timer fired after {timer_elapsed:?}, hash took {hash_elapsed:?}"
        );
        assert!(verify_password("pw", &encoded).await?);
        Ok(())
    }

    #[test]
    fn test_verify_rejects_malformed_hashes() {
        assert!(!verify_blocking("x", ""));
        assert!(!verify_blocking("x", "md5$1$abc$def"));
        assert!(!verify_blocking("x", "pbkdf2_sha256$0$AAAA$AAAA"));
        assert!(!verify_blocking("x", "pbkdf2_sha256$10$not-base64$AAAA"));
        assert!(!verify_blocking("x", "pbkdf2_sha256$10$AAAA$AAAA$extra"));
    }

    #[test]
    fn test_password_problems() {
        assert!(password_problems("a sensible passphrase").is_empty());
        assert_eq!(password_problems("short").len(), 1);
        assert_eq!(password_problems("1234567").len(), 2);
        assert_eq!(password_problems("123456789").len(), 1);
    }
}
