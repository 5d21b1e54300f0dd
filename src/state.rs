use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::{DbPool, OrmConn, pool_of},
    error::AppResult,
    middleware::auth::SessionVerifier,
    revalidate::Revalidator,
    storage::{self, SharedStore},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub sessions: SessionVerifier,
    pub storage: SharedStore,
    pub revalidate: Revalidator,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(config: &AppConfig, orm: OrmConn) -> AppResult<Self> {
        Ok(Self {
            pool: pool_of(&orm),
            orm,
            sessions: SessionVerifier::new(&config.jwt_secret),
            storage: storage::from_config(&config.storage)?,
            revalidate: Revalidator::new(),
            max_upload_bytes: config.storage.max_upload_bytes,
        })
    }

    /// State with an explicit store, for tools and tests.
    pub fn with_store(orm: OrmConn, jwt_secret: &str, store: SharedStore) -> Self {
        Self {
            pool: pool_of(&orm),
            orm,
            sessions: SessionVerifier::new(jwt_secret),
            storage: store,
            revalidate: Revalidator::new(),
            max_upload_bytes: crate::config::StorageConfig::default().max_upload_bytes,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish_non_exhaustive()
    }
}
