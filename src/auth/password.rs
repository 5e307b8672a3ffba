use std::sync::Arc;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::error;

const DUMMY_PASSWORD: &str = "blogstack-unknown-account";

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("argon2 hash error: {0}")]
    Hash(String),
    #[error("malformed password hash: {0}")]
    MalformedHash(String),
    #[error("hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Argon2id hasher. Digests are PHC strings, so verification always uses the
/// parameters embedded in the stored digest rather than `params`.
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    params: Params,
    // Digest of DUMMY_PASSWORD under `params`, built on first use.
    dummy: Arc<OnceCell<String>>,
}

impl Default for CredentialHasher {
    /// m = 19456 KiB, t = 2, p = 1.
    fn default() -> Self {
        Self {
            params: Params::default(),
            dummy: Arc::default(),
        }
    }
}

impl CredentialHasher {
    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash_password(&self, plain: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                PasswordError::Hash(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    pub fn verify_password(&self, plain: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            PasswordError::MalformedHash(e.to_string())
        })?;
        Ok(self
            .argon2()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok())
    }

    /// Hashes on the blocking pool.
    pub async fn hash(&self, plain: String) -> Result<String, PasswordError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash_password(&plain)).await?
    }

    /// Verifies on the blocking pool.
    pub async fn verify(&self, plain: String, hash: String) -> Result<bool, PasswordError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify_password(&plain, &hash)).await?
    }

    /// Spends the same work as a real verification when there is no stored
    /// digest to check against, so a missing account costs as much as a
    /// wrong password.
    pub async fn verify_dummy(&self, plain: String) -> Result<(), PasswordError> {
        let digest = self
            .dummy
            .get_or_try_init(|| self.hash(DUMMY_PASSWORD.to_string()))
            .await?
            .clone();
        self.verify(plain, digest).await?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn has_dummy_digest(&self) -> bool {
        self.dummy.initialized()
    }
}

#[cfg(test)]
pub(crate) fn cheap_hasher() -> CredentialHasher {
    CredentialHasher {
        params: Params::new(1024, 1, 1, None).expect("valid argon2 params"),
        dummy: Arc::default(),
    }
}
