use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::with_security_headers;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/cinema";
const DEFAULT_APP_URL: &str = "http://localhost:3001";
const DEFAULT_PAYMENT_GATEWAY_URL: &str =
    "https://app.sandbox.midtrans.com/snap/v1/transactions";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    /// Process-local state, lost on restart.
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Endpoint receiving the create-payment POST.
    pub gateway_url: String,
    pub server_key: String,
    /// Where the gateway sends the customer once payment finishes.
    pub finish_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreBackend,
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    /// Signing key for customer and admin tokens.
    pub secret_key: String,
    /// Public base URL; uploaded files are served under `{app_url}/uploads`.
    pub app_url: String,
    pub upload_dir: PathBuf,
    pub cors_allowed_origins: String,
    pub production: bool,
    pub payment: PaymentConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreBackend::Postgres,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            database_max_connections: 5,
            host: "0.0.0.0".to_string(),
            port: 3001,
            secret_key: "development-secret".to_string(),
            app_url: DEFAULT_APP_URL.to_string(),
            upload_dir: PathBuf::from("public/uploads"),
            cors_allowed_origins: cors::DEFAULT_ALLOWED_ORIGINS.to_string(),
            production: false,
            payment: PaymentConfig {
                gateway_url: DEFAULT_PAYMENT_GATEWAY_URL.to_string(),
                server_key: String::new(),
                finish_url: format!("{DEFAULT_APP_URL}/wallet/topup/success"),
                timeout: Duration::from_secs(10),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let app_url = env::var("APP_URL").unwrap_or(defaults.app_url);

        Self {
            store: parse_env("STORE_BACKEND", defaults.store),
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            database_max_connections: parse_env(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            ),
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_env("PORT", defaults.port),
            secret_key: env::var("SECRET_KEY").unwrap_or_else(|_| {
                tracing::warn!("SECRET_KEY not set, using the development signing key");
                defaults.secret_key
            }),
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or(defaults.cors_allowed_origins),
            production: env::var("RUST_ENV")
                .map(|v| v.to_lowercase() == "production")
                .unwrap_or(false),
            payment: PaymentConfig {
                gateway_url: env::var("PAYMENT_GATEWAY_URL")
                    .unwrap_or(defaults.payment.gateway_url),
                server_key: env::var("PAYMENT_SERVER_KEY").unwrap_or_default(),
                finish_url: env::var("PAYMENT_FINISH_URL")
                    .unwrap_or_else(|_| format!("{app_url}/wallet/topup/success")),
                timeout: Duration::from_secs(parse_env(
                    "PAYMENT_TIMEOUT_SECS",
                    defaults.payment.timeout.as_secs(),
                )),
            },
            app_url,
        }
    }
}

impl Config {
    /// Settings that are tolerable in development but unsafe to serve with.
    pub fn check_production(&self) -> Result<(), String> {
        if !self.production {
            return Ok(());
        }
        if self.payment.server_key.trim().is_empty() {
            return Err("PAYMENT_SERVER_KEY must be set in production".to_string());
        }
        if self.secret_key == Self::default().secret_key {
            return Err("SECRET_KEY must be set in production".to_string());
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Ignoring unparsable environment value");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_falls_back_on_garbage() {
        std::env::set_var("CINEMA_TEST_PORT", "not-a-port");
        assert_eq!(parse_env::<u16>("CINEMA_TEST_PORT", 8080), 8080);
        std::env::set_var("CINEMA_TEST_PORT", "9000");
        assert_eq!(parse_env::<u16>("CINEMA_TEST_PORT", 8080), 9000);
        std::env::remove_var("CINEMA_TEST_PORT");
    }

    #[test]
    fn test_store_backend_names() {
        assert_eq!("memory".parse::<StoreBackend>(), Ok(StoreBackend::Memory));
        assert_eq!("Postgres".parse::<StoreBackend>(), Ok(StoreBackend::Postgres));
        assert!("mongo".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn test_production_requires_payment_key() {
        let mut config = Config::default();
        assert!(config.check_production().is_ok());

        config.production = true;
        config.secret_key = "real-secret".into();
        let err = config.check_production().unwrap_err();
        assert!(err.contains("PAYMENT_SERVER_KEY"));

        config.payment.server_key = "SB-Mid-server-live".into();
        assert!(config.check_production().is_ok());

        config.secret_key = Config::default().secret_key;
        assert!(config.check_production().is_err());
    }

    #[test]
    fn test_finish_url_follows_app_url() {
        let config = Config::default();
        assert!(config.payment.finish_url.starts_with(&config.app_url));
    }
}
