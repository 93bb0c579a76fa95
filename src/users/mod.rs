#[cfg(test)]
pub mod memory;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod rest;
pub mod store;

pub use password::{Argon2Hasher, CredentialHasher};
pub use repo_types::{NewUser, User, UserPatch};
pub use store::UserStore;
