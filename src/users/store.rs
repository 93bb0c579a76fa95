use async_trait::async_trait;

use crate::error::AdminResult;
use crate::users::repo_types::{NewUser, User, UserPatch};

/// Keyed user store reachable over the network.
///
/// Absence is `Ok(None)` from `find`, never an error. Every other failure is
/// either `StoreUnavailable` (the store could not be reached or refused us)
/// or `WriteRejected` (the store declined a specific write).
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find(&self, email: &str) -> AdminResult<Option<User>>;

    async fn list(&self) -> AdminResult<Vec<User>>;

    async fn insert(&self, user: NewUser) -> AdminResult<User>;

    /// Fails with `WriteRejected` when no row has `email`.
    async fn update(&self, email: &str, patch: &UserPatch) -> AdminResult<User>;

    async fn delete(&self, email: &str) -> AdminResult<()>;

    /// Updates the row at `email` and removes the row at `stale_email`.
    ///
    /// Backends with transactions commit both or neither. The fallback
    /// removes the stale row first and never leaves two rows for one
    /// identity. A failed update after that delete leaves the target row
    /// unchanged: when it was not yet an admin, no admin row exists until
    /// the caller runs the pair again.
    async fn update_and_delete(
        &self,
        email: &str,
        patch: &UserPatch,
        stale_email: &str,
    ) -> AdminResult<User> {
        self.delete(stale_email).await?;
        self.update(email, patch).await.inspect_err(|e| {
            tracing::warn!(email, stale_email, error = %e, "stale row removed but target update failed; re-run to restore");
        })
    }
}
