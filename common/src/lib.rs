/*!
common/src/lib.rs

Shared configuration types and DB helper functions for the Outreach newsletter.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader for a defaults file merged with an optional override file
- Credential lookup from the environment (with `.env` support)
- A helper to open the SQLite pool that backs the newsletter cache
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;

pub const DEFAULT_DB_PATH: &str = "news_archive.db";
pub const DEFAULT_SEARCH_URL: &str = "https://serpapi.com/search";
pub const DEFAULT_SEARCH_KEY_ENV: &str = "SERP_API_KEY";
pub const DEFAULT_SITE: &str = "https://www.hawaiinewsnow.com";
pub const DEFAULT_LLM_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_LLM_KEY_ENV: &str = "OPENROUTER_API_KEY";
pub const DEFAULT_LLM_MODEL: &str = "google/gemini-2.5-flash";
pub const DEFAULT_TIMEZONE: &str = "Pacific/Honolulu";

/// Environment variable that overrides `database.path`.
pub const DB_PATH_ENV: &str = "NEWS_DB_PATH";

/// Database configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the sqlite database file (e.g. "data/news_archive.db")
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_DB_PATH.to_string(),
        }
    }
}

/// Search API (SerpApi) configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    pub api_url: Option<String>,
    pub api_key_env: Option<String>,
    pub engine: Option<String>,
    pub language: Option<String>,
    /// Site whose dated URL structure scopes the query
    pub site: Option<String>,
    pub max_results: Option<usize>,
    pub page_size: Option<usize>,
    pub timeout_seconds: Option<u64>,
}

impl SearchConfig {
    pub fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_SEARCH_URL)
    }

    pub fn api_key_env(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or(DEFAULT_SEARCH_KEY_ENV)
    }

    pub fn engine(&self) -> &str {
        self.engine.as_deref().unwrap_or("google")
    }

    pub fn language(&self) -> &str {
        self.language.as_deref().unwrap_or("en")
    }

    pub fn site(&self) -> &str {
        self.site.as_deref().unwrap_or(DEFAULT_SITE)
    }

    pub fn max_results(&self) -> usize {
        self.max_results.unwrap_or(100)
    }

    pub fn page_size(&self) -> usize {
        self.page_size.unwrap_or(10)
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds.unwrap_or(30)
    }
}

/// Remote LLM config (OpenAI-compatible chat completions endpoint)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_url: Option<String>,
    pub api_key_env: Option<String>,
    pub model: Option<String>,
    /// No timeout is applied unless this is set
    pub timeout_seconds: Option<u64>,
    pub max_tokens: Option<usize>,
}

impl LlmConfig {
    pub fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_LLM_URL)
    }

    pub fn api_key_env(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or(DEFAULT_LLM_KEY_ENV)
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_LLM_MODEL)
    }
}

/// Newsletter scheduling options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsletterConfig {
    /// IANA zone used to decide what "today" is
    pub timezone: Option<String>,
}

impl NewsletterConfig {
    pub fn timezone(&self) -> &str {
        self.timezone.as_deref().unwrap_or(DEFAULT_TIMEZONE)
    }
}

/// HTTP server bind options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: Option<String>,
    pub port: Option<u16>,
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub newsletter: NewsletterConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// API keys resolved from the environment. Either may be missing; the
/// pipeline refuses to run until both are present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub search_api_key: Option<String>,
    pub llm_api_key: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    ///
    /// Example:
    ///   let cfg = Config::from_file("config.toml").await?;
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    /// Missing files are skipped, so an empty merge yields the built-in defaults.
    pub async fn load_with_defaults(
        default_path: Option<&Path>,
        override_path: Option<&Path>,
    ) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        if let Some(path) = default_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path).await
                    .with_context(|| format!("Failed to read default config: {}", path.display()))?;
                let val: toml::Value = toml::from_str(&data)
                    .context("Failed to parse default configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        if let Some(path) = override_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path).await
                    .with_context(|| {
                        format!("Failed to read override config: {}", path.display())
                    })?;
                let val: toml::Value = toml::from_str(&data)
                    .context("Failed to parse override configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        Ok(cfg)
    }

    /// Apply environment overrides on top of file configuration.
    /// Currently only `NEWS_DB_PATH`, which wins over `database.path`.
    pub fn apply_env_overrides(&mut self) {
        if let Some(path) = non_empty_env(DB_PATH_ENV) {
            tracing::debug!(path = %path, "database path overridden from environment");
            self.database.path = path;
        }
    }

    /// Read the API keys named by the config from the environment.
    /// Empty values count as missing.
    pub fn credentials(&self) -> Credentials {
        Credentials {
            search_api_key: non_empty_env(self.search.api_key_env()),
            llm_api_key: non_empty_env(self.llm.api_key_env()),
        }
    }
}

/// Load a `.env` file from the working directory if one exists.
/// Variables already set in the process environment are left untouched.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("failed to load .env: {}", e),
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

/// Initialize an SQLite connection pool.
///
/// This function will create the parent directory if necessary and return a configured
/// `SqlitePool`. The database file is created when missing. Schema creation is left to
/// the caller (the newsletter store ensures its own table).
///
/// Example:
///   let pool = init_db_pool("data/news_archive.db").await?;
pub async fn init_db_pool(path: &str) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create DB parent directory: {}", parent.display())
        })?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to connect to sqlite database at path: {}", path))?;

    Ok(pool)
}
