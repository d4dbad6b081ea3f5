use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "ClinicEmr";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default listen address for the REST service.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";
/// Default bearer session lifetime.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 12;
/// Audit rows are kept for six years.
pub const AUDIT_RETENTION_DAYS: i64 = 2190;
/// Route the client lands on after a forced sign-out.
pub const LOGIN_ROUTE: &str = "/login";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,clinic_emr_lib=debug,tower_http=info"
}

/// Get the application data directory.
/// ~/ClinicEmr/ on all platforms; falls back to the working directory.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Initial organization/clinic/admin created on an empty database.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

/// Server settings, read from `EMR_*` environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub api_key: String,
    pub session_ttl_hours: i64,
    pub bootstrap_admin: Option<BootstrapAdmin>,
    pub cors_origin: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let bind_raw = get("EMR_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse().map_err(|e| ConfigError::Invalid {
            name: "EMR_BIND_ADDR",
            reason: format!("{e}"),
        })?;

        let data_dir = get("EMR_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(app_data_dir);
        let db_path = get("EMR_DB_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("clinic.db"));

        let api_key = get("EMR_API_KEY").ok_or(ConfigError::Missing("EMR_API_KEY"))?;
        if api_key.len() < 16 {
            return Err(ConfigError::Invalid {
                name: "EMR_API_KEY",
                reason: "must be at least 16 characters".into(),
            });
        }

        let session_ttl_hours = match get("EMR_SESSION_TTL_HOURS") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|h| *h > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    name: "EMR_SESSION_TTL_HOURS",
                    reason: format!("expected a positive integer, got {raw:?}"),
                })?,
            None => DEFAULT_SESSION_TTL_HOURS,
        };

        let bootstrap_admin = match (
            get("EMR_BOOTSTRAP_ADMIN_EMAIL"),
            get("EMR_BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Some(email), Some(password)) => Some(BootstrapAdmin { email, password }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Invalid {
                    name: "EMR_BOOTSTRAP_ADMIN_EMAIL",
                    reason: "email and password must be set together".into(),
                })
            }
        };

        Ok(Self {
            bind_addr,
            data_dir,
            db_path,
            api_key,
            session_ttl_hours,
            bootstrap_admin,
            cors_origin: get("EMR_CORS_ORIGIN"),
        })
    }
}

/// Client settings: where the service lives and how to reach it.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
    pub login_route: String,
}

impl ClientConfig {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            timeout: Duration::from_secs(30),
            login_route: LOGIN_ROUTE.to_string(),
        }
    }
}
