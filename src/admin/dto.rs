use std::fmt;

use serde::Serialize;

use crate::users::User;

/// What the lookup phase found, in reconciliation priority order.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupResult {
    /// A row holds the target email; `legacy` is a different row at the legacy email.
    Target { target: User, legacy: Option<User> },
    /// Only the legacy email is present.
    LegacyOnly(User),
    Neither,
}

impl LookupResult {
    pub fn branch(&self) -> Branch {
        match self {
            LookupResult::Target { .. } => Branch::UpdatedTarget,
            LookupResult::LegacyOnly(_) => Branch::MigratedLegacy,
            LookupResult::Neither => Branch::Created,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    UpdatedTarget,
    MigratedLegacy,
    Created,
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Branch::UpdatedTarget => "updated existing admin",
            Branch::MigratedLegacy => "migrated legacy admin",
            Branch::Created => "created admin",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct ReconcileReport {
    pub branch: Branch,
    pub user: User,
    /// Legacy email whose row no longer exists after this run.
    pub removed_legacy: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetReport {
    pub email: String,
    /// Whether the supplied password already matched; `None` when no hash was stored.
    pub previously_valid: Option<bool>,
    /// Whether the hash read back after the write verifies.
    pub verified: bool,
}

/// Known-password account created by `seed-users`.
#[derive(Debug, Clone, Copy)]
pub struct DemoAccount {
    pub email: &'static str,
    pub password: &'static str,
    pub name: &'static str,
}

pub const DEMO_ACCOUNTS: &[DemoAccount] = &[
    DemoAccount { email: "user1@test.com", password: "user1pass", name: "Test User 1" },
    DemoAccount { email: "user2@test.com", password: "user2pass", name: "Test User 2" },
    DemoAccount { email: "user3@test.com", password: "user3pass", name: "Test User 3" },
    DemoAccount { email: "creator@test.com", password: "creatorpass", name: "Campaign Creator" },
    DemoAccount { email: "backer@test.com", password: "backerpass", name: "Campaign Backer" },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedAction {
    Created,
    Updated,
}

#[derive(Debug)]
pub struct SeedOutcome {
    pub email: &'static str,
    pub result: Result<SeedAction, crate::error::AdminError>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UserTally {
    pub total: usize,
    pub admins: usize,
    pub regular: usize,
}

impl UserTally {
    pub fn of(users: &[User]) -> Self {
        let admins = users.iter().filter(|u| u.is_admin).count();
        Self {
            total: users.len(),
            admins,
            regular: users.len() - admins,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserListing {
    pub users: Vec<User>,
    pub tally: UserTally,
}
