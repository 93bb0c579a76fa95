use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AdminError, AdminResult, StoreOp};
use crate::users::repo_types::{NewUser, User, UserPatch};
use crate::users::store::UserStore;

/// In-process store for tests: enforces the unique email key, records every
/// call, and can be told to fail chosen operations.
#[derive(Default)]
pub struct MemoryUserStore {
    rows: Mutex<Vec<User>>,
    calls: Mutex<Vec<StoreOp>>,
    failing: Mutex<HashSet<StoreOp>>,
    rejecting: Mutex<HashSet<StoreOp>>,
}

impl MemoryUserStore {
    pub fn with_rows(rows: Vec<User>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Default::default()
        }
    }

    /// Subsequent calls of `op` fail as if the store were unreachable.
    pub fn fail(&self, op: StoreOp) {
        self.failing.lock().unwrap().insert(op);
    }

    /// Subsequent calls of `op` are declined by the store.
    pub fn reject(&self, op: StoreOp) {
        self.rejecting.lock().unwrap().insert(op);
    }

    pub fn rows(&self) -> Vec<User> {
        self.rows.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<StoreOp> {
        self.calls.lock().unwrap().clone()
    }

    pub fn writes(&self) -> usize {
        self.calls().into_iter().filter(|op| op.is_write()).count()
    }

    fn enter(&self, op: StoreOp, email: &str) -> AdminResult<()> {
        self.calls.lock().unwrap().push(op);
        if self.failing.lock().unwrap().contains(&op) {
            return Err(AdminError::unavailable(op, "connection refused"));
        }
        if self.rejecting.lock().unwrap().contains(&op) {
            return Err(AdminError::rejected(op, email, "declined by test store"));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find(&self, email: &str) -> AdminResult<Option<User>> {
        self.enter(StoreOp::Find, email)?;
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|u| u.email == email).cloned())
    }

    async fn list(&self) -> AdminResult<Vec<User>> {
        self.enter(StoreOp::List, "*")?;
        let mut rows = self.rows();
        rows.sort_by_key(|u| u.created_at);
        Ok(rows)
    }

    async fn insert(&self, user: NewUser) -> AdminResult<User> {
        self.enter(StoreOp::Insert, &user.email)?;
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|u| u.email == user.email || u.id == user.id) {
            return Err(AdminError::rejected(
                StoreOp::Insert,
                &user.email,
                "duplicate key value violates unique constraint",
            ));
        }
        let row = User {
            id: user.id,
            email: user.email,
            name: user.name,
            password_hash: Some(user.password_hash),
            is_admin: user.is_admin,
            created_at: user.created_at,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, email: &str, patch: &UserPatch) -> AdminResult<User> {
        self.enter(StoreOp::Update, email)?;
        let mut rows = self.rows.lock().unwrap();
        if let Some(next) = &patch.email {
            if next != email && rows.iter().any(|u| &u.email == next) {
                return Err(AdminError::rejected(
                    StoreOp::Update,
                    email,
                    "duplicate key value violates unique constraint",
                ));
            }
        }
        let row = rows
            .iter_mut()
            .find(|u| u.email == email)
            .ok_or_else(|| AdminError::rejected(StoreOp::Update, email, "no row matched"))?;
        patch.apply(row);
        Ok(row.clone())
    }

    async fn delete(&self, email: &str) -> AdminResult<()> {
        self.enter(StoreOp::Delete, email)?;
        self.rows.lock().unwrap().retain(|u| u.email != email);
        Ok(())
    }
}
