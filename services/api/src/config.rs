use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub gemini_api_key: String,
    pub live_model: String,
    pub live_endpoint: Option<String>,
    pub embedding_model: String,
    pub voice_name: String,
    pub backend_base_url: String,
    pub database_url: String,
    pub similarity_threshold: f64,
    pub shutdown_grace: Duration,
    pub log_level: Level,
    pub prompts_path: PathBuf,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn required_var(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name.to_string()))
}

fn parse_var<T>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = var_or(name, default);
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("'{raw}': {e}")))
}

/// `DATABASE_URL`, or a DSN assembled from the `VOICE_AGENT_DB_*` parts.
fn database_url() -> Result<String, ConfigError> {
    if let Ok(url) = std::env::var("DATABASE_URL") {
        return Ok(url);
    }
    let user = required_var("VOICE_AGENT_DB_USER")?;
    let password = required_var("VOICE_AGENT_DB_PASSWORD")?;
    let host = required_var("VOICE_AGENT_DB_HOST")?;
    let port: u16 = parse_var("VOICE_AGENT_DB_PORT", "5432")?;
    let name = required_var("VOICE_AGENT_DB_NAME")?;
    Ok(format!(
        "postgres://{user}:{password}@{host}:{port}/{name}?sslmode=disable"
    ))
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address = parse_var("BIND_ADDRESS", "0.0.0.0:8000")?;
        let gemini_api_key = required_var("GEMINI_API_KEY")?;
        let live_model = var_or("LIVE_MODEL", "models/gemini-2.0-flash-exp");
        let live_endpoint = std::env::var("LIVE_ENDPOINT").ok();
        let embedding_model = var_or("EMBEDDING_MODEL", "text-embedding-004");
        let voice_name = var_or("VOICE_NAME", "Kore");
        let backend_base_url = var_or("BACKEND_BASE_URL", "http://localhost:8080");
        let database_url = database_url()?;

        let similarity_threshold: f64 = parse_var("SIMILARITY_THRESHOLD", "0.0")?;
        if !similarity_threshold.is_finite() {
            return Err(ConfigError::InvalidValue(
                "SIMILARITY_THRESHOLD".to_string(),
                "must be a finite number".to_string(),
            ));
        }
        let shutdown_grace = Duration::from_secs(parse_var("SHUTDOWN_GRACE_SECS", "5")?);

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let prompts_path = std::env::var("PROMPTS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./prompts"));

        Ok(Self {
            bind_address,
            gemini_api_key,
            live_model,
            live_endpoint,
            embedding_model,
            voice_name,
            backend_base_url,
            database_url,
            similarity_threshold,
            shutdown_grace,
            log_level,
            prompts_path,
        })
    }
}
