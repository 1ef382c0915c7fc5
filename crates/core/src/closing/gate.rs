//! The authorization gate holding the admin code every closure commit must
//! present. The code is a short numeric secret distinct from any login
//! credential; it is stored as a SHA-256 digest and compared in constant
//! time. The gate caches the digest and invalidates the cache on rotation,
//! so rotations take effect without a restart while routine verifies skip
//! the storage round-trip.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use super::StoreError;

/// Digest of the active authorization code plus when it was set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredSecret {
    pub digest: [u8; 32],
    pub rotated_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait SecretStore: Send + Sync {
    async fn load(&self) -> Result<Option<StoredSecret>, StoreError>;
    async fn store(&self, secret: StoredSecret) -> Result<(), StoreError>;
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("authorization code must be 4 to 6 digits")]
    MalformedCode,
    #[error("authorization code has not been configured")]
    NotConfigured,
    #[error("incorrect authorization code")]
    Incorrect,
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct AuthorizationGate {
    store: Arc<dyn SecretStore>,
    cached_digest: RwLock<Option<[u8; 32]>>,
}

impl AuthorizationGate {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store, cached_digest: RwLock::new(None) }
    }

    /// Check a candidate code against the active secret. A missing secret is
    /// its own condition (`NotConfigured`), never reported as a wrong guess.
    pub async fn verify(&self, code: &str) -> Result<(), GateError> {
        if !is_valid_code(code) {
            return Err(GateError::MalformedCode);
        }

        let digest = match self.active_digest().await? {
            Some(digest) => digest,
            None => return Err(GateError::NotConfigured),
        };

        if constant_time_eq(&digest, &digest_of(code)) {
            Ok(())
        } else {
            Err(GateError::Incorrect)
        }
    }

    /// Replace the active code, returning the persisted rotation timestamp.
    /// The caller is responsible for having authenticated the administrator;
    /// the gate only enforces the format.
    pub async fn rotate(&self, new_code: &str) -> Result<DateTime<Utc>, GateError> {
        if !is_valid_code(new_code) {
            return Err(GateError::MalformedCode);
        }

        let digest = digest_of(new_code);
        let rotated_at = Utc::now();
        self.store.store(StoredSecret { digest, rotated_at }).await?;
        *self.cached_digest.write().await = Some(digest);
        Ok(rotated_at)
    }

    pub async fn is_configured(&self) -> Result<bool, GateError> {
        Ok(self.active_digest().await?.is_some())
    }

    // The unconfigured state is never cached: until a code exists, every
    // verify re-reads so a rotation done by another process is picked up.
    async fn active_digest(&self) -> Result<Option<[u8; 32]>, GateError> {
        if let Some(digest) = *self.cached_digest.read().await {
            return Ok(Some(digest));
        }

        match self.store.load().await? {
            Some(secret) => {
                *self.cached_digest.write().await = Some(secret.digest);
                Ok(Some(secret.digest))
            }
            None => Ok(None),
        }
    }
}

/// Admin authorization codes are 4 to 6 ASCII digits.
pub fn is_valid_code(code: &str) -> bool {
    (4..=6).contains(&code.len()) && code.bytes().all(|byte| byte.is_ascii_digit())
}

pub(crate) fn digest_of(code: &str) -> [u8; 32] {
    Sha256::digest(code.as_bytes()).into()
}

pub(crate) fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::Mutex;

    use super::{
        constant_time_eq, digest_of, is_valid_code, AuthorizationGate, GateError, SecretStore,
        StoredSecret,
    };
    use crate::closing::StoreError;

    #[derive(Default)]
    struct InMemorySecretStore {
        secret: Mutex<Option<StoredSecret>>,
        loads: Mutex<u32>,
    }

    #[async_trait::async_trait]
    impl SecretStore for InMemorySecretStore {
        async fn load(&self) -> Result<Option<StoredSecret>, StoreError> {
            *self.loads.lock().await += 1;
            Ok(self.secret.lock().await.clone())
        }

        async fn store(&self, secret: StoredSecret) -> Result<(), StoreError> {
            *self.secret.lock().await = Some(secret);
            Ok(())
        }
    }

    #[test]
    fn code_format_accepts_4_to_6_digits_only() {
        assert!(is_valid_code("1234"));
        assert!(is_valid_code("123456"));
        assert!(!is_valid_code("123"));
        assert!(!is_valid_code("1234567"));
        assert!(!is_valid_code("12a4"));
        assert!(!is_valid_code(""));
    }

    #[test]
    fn digest_comparison_detects_any_byte_difference() {
        let a = digest_of("1234");
        let b = digest_of("1235");
        assert!(constant_time_eq(&a, &digest_of("1234")));
        assert!(!constant_time_eq(&a, &b));
    }

    #[tokio::test]
    async fn verify_without_a_configured_secret_is_not_configured() {
        let gate = AuthorizationGate::new(Arc::new(InMemorySecretStore::default()));
        assert_eq!(gate.verify("1234").await, Err(GateError::NotConfigured));
    }

    #[tokio::test]
    async fn rotate_then_verify_accepts_new_code_and_rejects_old() {
        let gate = AuthorizationGate::new(Arc::new(InMemorySecretStore::default()));

        gate.rotate("4321").await.expect("rotate");
        assert_eq!(gate.verify("4321").await, Ok(()));
        assert_eq!(gate.verify("1234").await, Err(GateError::Incorrect));

        gate.rotate("998877").await.expect("second rotate");
        assert_eq!(gate.verify("4321").await, Err(GateError::Incorrect));
        assert_eq!(gate.verify("998877").await, Ok(()));
    }

    #[tokio::test]
    async fn rotate_reports_the_timestamp_it_persisted() {
        let store = Arc::new(InMemorySecretStore::default());
        let gate = AuthorizationGate::new(store.clone());

        let reported = gate.rotate("4321").await.expect("rotate");

        let persisted = store.secret.lock().await.clone().expect("secret stored");
        assert_eq!(reported, persisted.rotated_at);
    }

    #[tokio::test]
    async fn rotate_rejects_malformed_codes_without_storing() {
        let store = Arc::new(InMemorySecretStore::default());
        let gate = AuthorizationGate::new(store.clone());

        assert_eq!(gate.rotate("12").await, Err(GateError::MalformedCode));
        assert_eq!(gate.rotate("abcd").await, Err(GateError::MalformedCode));
        assert!(store.secret.lock().await.is_none());
    }

    #[tokio::test]
    async fn verify_uses_the_cache_after_the_first_load() {
        let store = Arc::new(InMemorySecretStore::default());
        store
            .store(StoredSecret { digest: digest_of("5555"), rotated_at: chrono::Utc::now() })
            .await
            .expect("seed secret");

        let gate = AuthorizationGate::new(store.clone());
        assert_eq!(gate.verify("5555").await, Ok(()));
        assert_eq!(gate.verify("5555").await, Ok(()));
        assert_eq!(gate.verify("0000").await, Err(GateError::Incorrect));

        assert_eq!(*store.loads.lock().await, 1);
    }

    #[tokio::test]
    async fn malformed_verify_fails_before_touching_the_store() {
        let store = Arc::new(InMemorySecretStore::default());
        let gate = AuthorizationGate::new(store.clone());

        assert_eq!(gate.verify("12").await, Err(GateError::MalformedCode));
        assert_eq!(*store.loads.lock().await, 0);
    }
}
