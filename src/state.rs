use std::sync::Arc;

use crate::config::{AppConfig, StoreConfig};
use crate::db;
use crate::users::{repo::PgUserStore, rest::RestUserStore, CredentialHasher, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn UserStore>,
    pub hasher: Arc<dyn CredentialHasher>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = match &config.store {
            StoreConfig::Postgres {
                database_url,
                max_connections,
            } => {
                let pool = db::connect(database_url, *max_connections, config.store_timeout).await?;
                tracing::info!("using postgres user store");
                Arc::new(PgUserStore::new(pool, config.store_timeout)) as Arc<dyn UserStore>
            }
            StoreConfig::Rest {
                base_url,
                api_key,
                table,
            } => {
                tracing::info!(%base_url, %table, "using rest user store");
                Arc::new(RestUserStore::new(
                    base_url,
                    api_key,
                    table,
                    config.store_timeout,
                )?) as Arc<dyn UserStore>
            }
        };

        tracing::debug!(scheme = ?config.hash_scheme, "password hasher selected");
        let hasher: Arc<dyn CredentialHasher> = Arc::from(config.hash_scheme.hasher());
        Ok(Self::from_parts(config, store, hasher))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        store: Arc<dyn UserStore>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Self {
        Self {
            config,
            store,
            hasher,
        }
    }

    /// State over an in-memory store; the returned handle inspects it.
    #[cfg(test)]
    pub fn fake() -> (Self, Arc<crate::users::memory::MemoryUserStore>) {
        Self::fake_with(crate::users::memory::MemoryUserStore::default())
    }

    #[cfg(test)]
    pub fn fake_with(
        store: crate::users::memory::MemoryUserStore,
    ) -> (Self, Arc<crate::users::memory::MemoryUserStore>) {
        let store = Arc::new(store);
        let config = Arc::new(AppConfig {
            store: StoreConfig::Rest {
                base_url: "http://fake.local".into(),
                api_key: "test".into(),
                table: "users".into(),
            },
            store_timeout: std::time::Duration::from_secs(10),
            hash_scheme: crate::users::password::HashScheme::Bcrypt { cost: 4 },
        });
        let hasher: Arc<dyn CredentialHasher> = Arc::from(config.hash_scheme.hasher());
        let state = Self::from_parts(config, store.clone(), hasher);
        (state, store)
    }
}
