use std::fmt;

use thiserror::Error;

/// Store operation an error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Find,
    List,
    Insert,
    Update,
    Delete,
}

impl StoreOp {
    pub fn is_write(self) -> bool {
        matches!(self, StoreOp::Insert | StoreOp::Update | StoreOp::Delete)
    }
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StoreOp::Find => "find",
            StoreOp::List => "list",
            StoreOp::Insert => "insert",
            StoreOp::Update => "update",
            StoreOp::Delete => "delete",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("user store unavailable during {op}: {reason}")]
    StoreUnavailable { op: StoreOp, reason: String },

    #[error("user store rejected {op} for {email}: {reason}")]
    WriteRejected {
        op: StoreOp,
        email: String,
        reason: String,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("no user with email {0}")]
    UnknownUser(String),
}

impl AdminError {
    pub fn unavailable(op: StoreOp, reason: impl fmt::Display) -> Self {
        AdminError::StoreUnavailable {
            op,
            reason: reason.to_string(),
        }
    }

    pub fn rejected(op: StoreOp, email: &str, reason: impl fmt::Display) -> Self {
        AdminError::WriteRejected {
            op,
            email: email.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type AdminResult<T> = Result<T, AdminError>;
