use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, instrument};

use crate::admin::dto::{Branch, LookupResult, ReconcileReport};
use crate::error::{AdminError, AdminResult};
use crate::state::AppState;
use crate::users::{CredentialHasher, NewUser, UserPatch, UserStore};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trimmed and shape-checked. Case is kept: stores match emails exactly.
pub(crate) fn normalize_email(raw: &str) -> AdminResult<String> {
    let email = raw.trim().to_string();
    if !is_valid_email(&email) {
        return Err(AdminError::InvalidInput(format!("invalid email {raw:?}")));
    }
    Ok(email)
}

pub(crate) fn require_password(password: &str) -> AdminResult<()> {
    if password.is_empty() {
        return Err(AdminError::InvalidInput("password must not be empty".into()));
    }
    Ok(())
}

/// Brings the store to a single admin row under the target email.
pub struct AdminReconciler {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn CredentialHasher>,
}

impl AdminReconciler {
    pub fn new(store: Arc<dyn UserStore>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { store, hasher }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(state.store.clone(), state.hasher.clone())
    }

    /// Read-only phase. Emails are matched exactly as given.
    pub async fn lookup(&self, old_email: &str, new_email: &str) -> AdminResult<LookupResult> {
        let distinct = old_email != new_email;

        if let Some(target) = self.store.find(new_email).await? {
            let legacy = if distinct {
                self.store
                    .find(old_email)
                    .await?
                    .filter(|legacy| legacy.id != target.id)
            } else {
                None
            };
            return Ok(LookupResult::Target { target, legacy });
        }

        if distinct {
            if let Some(legacy) = self.store.find(old_email).await? {
                return Ok(LookupResult::LegacyOnly(legacy));
            }
        }
        Ok(LookupResult::Neither)
    }

    /// On success exactly one row has `email == new_email` and `is_admin`,
    /// and no row is left at `old_email` when the two differ.
    #[instrument(skip(self, new_password, display_name))]
    pub async fn reconcile(
        &self,
        old_email: &str,
        new_email: &str,
        new_password: &str,
        display_name: &str,
    ) -> AdminResult<ReconcileReport> {
        let old_email = normalize_email(old_email)?;
        let new_email = normalize_email(new_email)?;
        require_password(new_password)?;
        let name = display_name.trim();
        if name.is_empty() {
            return Err(AdminError::InvalidInput("display name must not be empty".into()));
        }

        let lookup = self.lookup(&old_email, &new_email).await?;
        let branch = lookup.branch();
        info!(%branch, email = %new_email, legacy = %old_email, "reconciling admin identity");

        let result = self.apply(lookup, &new_email, new_password, name).await;
        match &result {
            Ok(report) => info!(
                %branch,
                email = %report.user.email,
                id = %report.user.id,
                removed = report.removed_legacy.as_deref().unwrap_or("-"),
                "admin identity reconciled"
            ),
            Err(e) => error!(%branch, email = %new_email, error = %e, "admin reconciliation failed"),
        }
        result
    }

    async fn apply(
        &self,
        lookup: LookupResult,
        new_email: &str,
        password: &str,
        name: &str,
    ) -> AdminResult<ReconcileReport> {
        let password_hash = self.hasher.hash(password)?;
        let patch = UserPatch::credentials(name, password_hash.clone(), true);

        match lookup {
            LookupResult::Target {
                legacy: Some(stale),
                ..
            } => {
                let user = self
                    .store
                    .update_and_delete(new_email, &patch, &stale.email)
                    .await?;
                Ok(ReconcileReport {
                    branch: Branch::UpdatedTarget,
                    user,
                    removed_legacy: Some(stale.email),
                })
            }
            LookupResult::Target { legacy: None, .. } => {
                let user = self.store.update(new_email, &patch).await?;
                Ok(ReconcileReport {
                    branch: Branch::UpdatedTarget,
                    user,
                    removed_legacy: None,
                })
            }
            LookupResult::LegacyOnly(legacy) => {
                let user = self
                    .store
                    .update(&legacy.email, &patch.with_email(new_email))
                    .await?;
                Ok(ReconcileReport {
                    branch: Branch::MigratedLegacy,
                    user,
                    removed_legacy: Some(legacy.email),
                })
            }
            LookupResult::Neither => {
                let user = self
                    .store
                    .insert(NewUser::new(new_email, name, password_hash, true))
                    .await?;
                Ok(ReconcileReport {
                    branch: Branch::Created,
                    user,
                    removed_legacy: None,
                })
            }
        }
    }
}
