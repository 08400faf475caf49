use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

const DEFAULTS: &str = include_str!("../config/default.toml");

/// Bare environment variables mapped onto `database.*` keys.
const DB_ENV_VARS: [(&str, &str); 6] = [
    ("DB_HOST", "database.host"),
    ("DB_PORT", "database.port"),
    ("DB_USER", "database.user"),
    ("DB_PASS", "database.pass"),
    ("DB_NAME", "database.name"),
    ("SESSION_LIVE_TIME", "database.session_live_time"),
];

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Used as-is when `host` is unset.
    pub url: String,
    pub host: Option<String>,
    pub port: u16,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub name: Option<String>,
    pub session_live_time: u64,
    pub max_connections: u32,
    pub reset_on_startup: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        // The embedded defaults are compiled in; failing to parse them is a build defect
        match ::config::Config::builder()
            .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
            .build()
            .and_then(|cfg| cfg.try_deserialize())
        {
            Ok(app_cfg) => app_cfg,
            Err(e) => panic!("Failed to load embedded default config: {}", e),
        }
    }
}

impl DatabaseConfig {
    /// Builds the connection string.
    ///
    /// With `DB_HOST` (or `database.host`) configured this derives a PostgreSQL
    /// URL from the discrete settings; otherwise `database.url` is returned.
    pub fn connection_url(&self) -> anyhow::Result<String> {
        let Some(host) = self.host.as_deref() else {
            return Ok(self.url.clone());
        };
        let user = self
            .user
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("database.user (DB_USER) is required when database.host is set"))?;
        let name = self
            .name
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("database.name (DB_NAME) is required when database.host is set"))?;
        let pass = self.pass.as_deref().unwrap_or_default();

        Ok(format!(
            "postgres://{}:{}@{}:{}/{}",
            urlencoding::encode(user),
            urlencoding::encode(pass),
            host,
            self.port,
            name
        ))
    }
}

/// Loads configuration from the process environment.
///
/// Precedence (lowest first): embedded defaults, `crudkit.toml` in the working
/// directory, the file named by `CRUDKIT_CONFIG`, `CRUDKIT__*` variables, and
/// finally the bare `DB_*` / `SESSION_LIVE_TIME` variables.
pub fn load() -> anyhow::Result<AppConfig> {
    // Load .env first (optional)
    let _ = dotenvy::dotenv();
    load_from(std::env::vars().collect())
}

/// Same as [`load`] but reads variables from `env` instead of the process.
pub fn load_from(env: HashMap<String, String>) -> anyhow::Result<AppConfig> {
    let mut builder = ::config::Config::builder()
        .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
        .add_source(::config::File::with_name("crudkit").required(false));

    if let Some(custom_path) = env.get("CRUDKIT_CONFIG") {
        builder = builder.add_source(::config::File::with_name(custom_path).required(false));
    }
    builder = builder.add_source(
        ::config::Environment::with_prefix("CRUDKIT")
            .separator("__")
            .source(Some(env.clone())),
    );
    for (var, key) in DB_ENV_VARS {
        builder = builder.set_override_option(key, env.get(var).cloned())?;
    }

    let app_cfg: AppConfig = builder.build()?.try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    if cfg.server.port == 0 {
        return Err(anyhow::anyhow!("invalid server.port: {}", cfg.server.port));
    }
    #[cfg(unix)]
    if cfg.server.port < 1024 {
        tracing::warn!("Using privileged port {} - may require elevated permissions", cfg.server.port);
    }

    let db = &cfg.database;
    if db.max_connections == 0 {
        return Err(anyhow::anyhow!("database.max_connections must be > 0"));
    }
    if db.session_live_time == 0 {
        return Err(anyhow::anyhow!("database.session_live_time must be > 0"));
    }
    // Surfaces missing DB_USER / DB_NAME at startup rather than at connect time
    db.connection_url()?;

    Ok(())
}

pub fn ensure_sqlite_parent_dir(url: &str) -> anyhow::Result<()> {
    if url.contains(":memory:") {
        return Ok(());
    }
    if let Some(path) = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:")) {
        // Drop connection options such as ?mode=rwc
        let path = path.split('?').next().unwrap_or(path);
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }
    Ok(())
}
