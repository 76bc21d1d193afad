use common::storage::MAX_CONTENT_SIZE;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Externally visible base URL (e.g. `https://rehagoal.example.org`).
    /// When unset, links are built from the request `Host` header.
    #[serde(default)]
    pub public_url: Option<String>,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Lifetime of an issued token.
    pub token_ttl_secs: u64,
    /// How long after the original login a token may still be refreshed.
    pub refresh_window_secs: u64,
    /// Staff account ensured on startup.
    #[serde(default)]
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub files_dir: String,
    /// Upper bound (inclusive) for workflow content, in bytes.
    pub max_content_size: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaginationConfig {
    /// Items per page on list endpoints. Must be at least 1.
    pub page_size: u64,
}

impl PaginationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Message(
                "pagination.page_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub pagination: PaginationConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("database.url", "sqlite://rehagoal.sqlite3?mode=rwc")?
            .set_default("auth.token_ttl_secs", 300)?
            .set_default("auth.refresh_window_secs", 7 * 24 * 3600)?
            .set_default("storage.files_dir", "./files")?
            .set_default("storage.max_content_size", MAX_CONTENT_SIZE)?
            .set_default("pagination.page_size", 100)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., REHAGOAL__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("REHAGOAL").separator("__"))
            .build()?;

        let config: Self = s.try_deserialize()?;
        config.pagination.validate()?;
        Ok(config)
    }
}
