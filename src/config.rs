use std::env;

use anyhow::Context;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Secret shared with the auth provider for verifying session tokens.
    pub jwt_secret: String,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Object store endpoint. Uploads are disabled when unset.
    pub url: Option<String>,
    pub token: Option<String>,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt_secret = env::var("AUTH_JWT_SECRET").context("AUTH_JWT_SECRET is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            storage: StorageConfig::from_env(),
        })
    }
}

impl StorageConfig {
    pub fn from_env() -> Self {
        let max_upload_bytes = env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
        Self {
            url: env::var("STORAGE_URL").ok().filter(|v| !v.is_empty()),
            token: env::var("STORAGE_TOKEN").ok().filter(|v| !v.is_empty()),
            max_upload_bytes,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}
