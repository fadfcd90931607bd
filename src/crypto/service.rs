use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use uuid::Uuid;

use crate::core::config::SecurityConfig;
use crate::core::error::{ForumError, ForumResult};

pub struct CryptoService {
    params: Params,
    /// Hash under the configured cost that no password is expected to match.
    /// Failed lookups verify against it so they cost as much as a real check.
    dummy_hash: String,
}

const DUMMY_PASSWORD: &str = "forum-core-unmatched-credential";

impl CryptoService {
    pub fn new(config: &SecurityConfig) -> ForumResult<Self> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| ForumError::System(format!("Invalid argon2 parameters: {}", e)))?;

        let mut service = Self {
            params,
            dummy_hash: String::new(),
        };
        service.dummy_hash = service.hash_password(DUMMY_PASSWORD)?;
        Ok(service)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password using Argon2id with a fresh random salt.
    ///
    /// Slow by construction; async callers run it on the blocking pool.
    pub fn hash_password(&self, password: &str) -> ForumResult<String> {
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| ForumError::System(format!("Password hashing failed: {}", e)))?;

        Ok(password_hash.to_string())
    }

    /// Verify a password against its PHC-formatted hash.
    ///
    /// The hash carries its own parameters, so hashes made under an older
    /// cost setting keep verifying.
    pub fn verify_password(&self, password: &str, hash: &str) -> ForumResult<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| ForumError::System(format!("Invalid password hash: {}", e)))?;

        match self.argon2().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(_) => Ok(false),
        }
    }

    /// Spend one full verification without a stored hash. Always `false`
    /// unless `password` is the internal placeholder.
    pub fn verify_dummy(&self, password: &str) -> ForumResult<bool> {
        self.verify_password(password, &self.dummy_hash)
    }

    /// Opaque, non-sequential token that stands in for a user id in sessions.
    pub fn generate_public_token(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> CryptoService {
        CryptoService::new(&SecurityConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    #[test]
    fn hashes_are_salted_and_verifiable() {
        let crypto = cheap();
        let first = crypto.hash_password("backthemall97").unwrap();
        let second = crypto.hash_password("backthemall97").unwrap();

        assert_ne!(first, second);
        assert!(!first.contains("backthemall97"));
        assert!(crypto.verify_password("backthemall97", &first).unwrap());
        assert!(!crypto.verify_password("breakingdown434", &first).unwrap());
    }

    #[test]
    fn hashes_from_other_cost_settings_still_verify() {
        let old = cheap().hash_password("backthemall97").unwrap();
        let stronger = CryptoService::new(&SecurityConfig {
            memory_kib: 2048,
            iterations: 2,
            parallelism: 1,
        })
        .unwrap();
        assert!(stronger.verify_password("backthemall97", &old).unwrap());
    }

    #[test]
    fn garbage_hash_is_a_system_error() {
        let err = cheap().verify_password("whatever1", "not-a-phc-string").unwrap_err();
        assert!(matches!(err, ForumError::System(_)));
    }

    #[test]
    fn rejects_impossible_parameters() {
        let result = CryptoService::new(&SecurityConfig {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        });
        assert!(matches!(result, Err(ForumError::System(_))));
    }

    #[test]
    fn dummy_hash_uses_the_configured_cost() {
        let crypto = CryptoService::new(&SecurityConfig {
            memory_kib: 2048,
            iterations: 3,
            parallelism: 1,
        })
        .unwrap();

        let parsed = PasswordHash::new(&crypto.dummy_hash).unwrap();
        let params = Params::try_from(&parsed).unwrap();
        assert_eq!(params.m_cost(), 2048);
        assert_eq!(params.t_cost(), 3);
        assert!(!crypto.verify_dummy("backthemall97").unwrap());
    }

    #[test]
    fn public_tokens_are_unique() {
        let crypto = cheap();
        assert_ne!(crypto.generate_public_token(), crypto.generate_public_token());
    }
}
