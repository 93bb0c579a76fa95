use std::str::FromStr;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::error::{AdminError, AdminResult};

/// Salted one-way credential hashing.
pub trait CredentialHasher: Send + Sync {
    /// Every call draws a fresh salt, so equal inputs give distinct digests.
    fn hash(&self, plain: &str) -> AdminResult<String>;

    /// `Ok(false)` for a wrong password, `Err` for a digest that cannot be parsed.
    /// Both bcrypt and Argon2 digests are accepted whatever `hash` produces.
    fn verify(&self, plain: &str, digest: &str) -> AdminResult<bool> {
        verify_password(plain, digest)
    }
}

/// Digest family written to `password_hash`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashScheme {
    /// What the web app checks logins against.
    Bcrypt { cost: u32 },
    Argon2,
}

impl FromStr for HashScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bcrypt" => Ok(HashScheme::Bcrypt {
                cost: bcrypt::DEFAULT_COST,
            }),
            "argon2" | "argon2id" => Ok(HashScheme::Argon2),
            other => Err(format!("unknown password scheme {other:?}; expected \"bcrypt\" or \"argon2\"")),
        }
    }
}

impl HashScheme {
    pub fn hasher(self) -> Box<dyn CredentialHasher> {
        match self {
            HashScheme::Bcrypt { cost } => Box::new(BcryptHasher { cost }),
            HashScheme::Argon2 => Box::new(Argon2Hasher),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    pub cost: u32,
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl CredentialHasher for BcryptHasher {
    fn hash(&self, plain: &str) -> AdminResult<String> {
        bcrypt::hash(plain, self.cost).map_err(|e| {
            error!(error = %e, "bcrypt hash error");
            AdminError::Hash(e.to_string())
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plain: &str) -> AdminResult<String> {
        hash_password(plain)
    }
}

pub fn hash_password(plain: &str) -> AdminResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            AdminError::Hash(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

fn is_bcrypt(digest: &str) -> bool {
    ["$2a$", "$2b$", "$2x$", "$2y$"]
        .iter()
        .any(|prefix| digest.starts_with(prefix))
}

/// Checks `plain` against a bcrypt (`$2?$`) or Argon2 PHC digest.
pub fn verify_password(plain: &str, hash: &str) -> AdminResult<bool> {
    if is_bcrypt(hash) {
        return bcrypt::verify(plain, hash).map_err(|e| {
            error!(error = %e, "bcrypt parse hash error");
            AdminError::Hash(e.to_string())
        });
    }
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        AdminError::Hash(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}
