use std::time::Duration;

use anyhow::{anyhow, bail, Context};

use crate::users::password::HashScheme;

/// Where the `users` table is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Postgres {
        database_url: String,
        max_connections: u32,
    },
    Rest {
        base_url: String,
        api_key: String,
        table: String,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store: StoreConfig,
    /// Upper bound on every single call to the store.
    pub store_timeout: Duration,
    /// Digest format written for new passwords.
    pub hash_scheme: HashScheme,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds the config from any variable source; empty values count as unset.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let backend = match get("USER_STORE") {
            Some(kind) => kind.to_lowercase(),
            None if get("DATABASE_URL").is_some() => "postgres".into(),
            None if get("SUPABASE_URL").is_some() => "rest".into(),
            None => bail!("no user store configured: set DATABASE_URL, or SUPABASE_URL and SUPABASE_KEY"),
        };

        let store = match backend.as_str() {
            "postgres" => StoreConfig::Postgres {
                database_url: get("DATABASE_URL").context("DATABASE_URL must be set")?,
                max_connections: get("DB_MAX_CONNECTIONS")
                    .and_then(|v| v.parse::<u32>().ok())
                    .unwrap_or(5),
            },
            "rest" => StoreConfig::Rest {
                base_url: get("SUPABASE_URL").context("SUPABASE_URL must be set")?,
                api_key: get("SUPABASE_KEY").context("SUPABASE_KEY must be set")?,
                table: get("USERS_TABLE").unwrap_or_else(|| "users".into()),
            },
            other => bail!("unknown USER_STORE {other:?}; expected \"postgres\" or \"rest\""),
        };

        let store_timeout = Duration::from_secs(
            get("STORE_TIMEOUT_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(10),
        );

        let hash_scheme = match get("PASSWORD_SCHEME") {
            Some(name) => name.parse::<HashScheme>().map_err(|e| anyhow!(e))?,
            None => HashScheme::Bcrypt { cost: 12 },
        };
        let hash_scheme = match hash_scheme {
            HashScheme::Bcrypt { cost } => HashScheme::Bcrypt {
                cost: get("BCRYPT_COST")
                    .map(|v| v.parse::<u32>())
                    .transpose()
                    .context("BCRYPT_COST must be a number")?
                    .unwrap_or(cost),
            },
            other => other,
        };
        if let HashScheme::Bcrypt { cost } = hash_scheme {
            if !(4..=31).contains(&cost) {
                bail!("BCRYPT_COST must be between 4 and 31, got {cost}");
            }
        }

        Ok(Self {
            store,
            store_timeout,
            hash_scheme,
        })
    }
}
