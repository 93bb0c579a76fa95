use tracing::{error, info, instrument, warn};

use crate::admin::dto::{
    DemoAccount, ResetReport, SeedAction, SeedOutcome, UserListing, UserTally,
};
use crate::admin::services::{normalize_email, require_password};
use crate::error::{AdminError, AdminResult};
use crate::state::AppState;
use crate::users::{NewUser, UserPatch};

/// Rewrites one user's password hash and checks the stored result.
#[instrument(skip(st, password))]
pub async fn reset_password(st: &AppState, email: &str, password: &str) -> AdminResult<ResetReport> {
    let email = normalize_email(email)?;
    require_password(password)?;

    let user = st
        .store
        .find(&email)
        .await?
        .ok_or_else(|| AdminError::UnknownUser(email.clone()))?;

    // A digest in neither bcrypt nor PHC form only means "no match".
    let previously_valid = user.password_hash.as_deref().map(|hash| {
        st.hasher.verify(password, hash).unwrap_or_else(|e| {
            warn!(%email, error = %e, "stored hash unreadable");
            false
        })
    });

    let patch = UserPatch {
        password_hash: Some(st.hasher.hash(password)?),
        ..Default::default()
    };
    st.store.update(&email, &patch).await?;

    let verified = match st.store.find(&email).await? {
        Some(fresh) => match fresh.password_hash.as_deref() {
            Some(hash) => st.hasher.verify(password, hash)?,
            None => false,
        },
        None => false,
    };

    info!(%email, ?previously_valid, verified, "password reset");
    Ok(ResetReport {
        email,
        previously_valid,
        verified,
    })
}

async fn upsert_account(st: &AppState, account: &DemoAccount) -> AdminResult<SeedAction> {
    let email = normalize_email(account.email)?;
    let password_hash = st.hasher.hash(account.password)?;

    if st.store.find(&email).await?.is_some() {
        let patch = UserPatch::credentials(account.name, password_hash, false);
        st.store.update(&email, &patch).await?;
        Ok(SeedAction::Updated)
    } else {
        st.store
            .insert(NewUser::new(&email, account.name, password_hash, false))
            .await?;
        Ok(SeedAction::Created)
    }
}

/// Creates or refreshes each demo account; one failure does not stop the rest.
#[instrument(skip_all, fields(count = accounts.len()))]
pub async fn seed_demo_users(st: &AppState, accounts: &[DemoAccount]) -> Vec<SeedOutcome> {
    let mut outcomes = Vec::with_capacity(accounts.len());
    for account in accounts {
        let result = upsert_account(st, account).await;
        match &result {
            Ok(action) => info!(email = account.email, ?action, "demo user seeded"),
            Err(e) => error!(email = account.email, error = %e, "demo user failed"),
        }
        outcomes.push(SeedOutcome {
            email: account.email,
            result,
        });
    }
    outcomes
}

pub async fn list_users(st: &AppState) -> AdminResult<UserListing> {
    let users = st.store.list().await?;
    let tally = UserTally::of(&users);
    Ok(UserListing { users, tally })
}
