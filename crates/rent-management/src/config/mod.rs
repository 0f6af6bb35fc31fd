use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::paging::PageLimits;

const DEVELOPMENT_JWT_SECRET: &str = "rent-management-development-secret";
/// Ten years.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 366 * 10;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub auth: AuthConfig,
    pub mail: MailConfig,
    pub paging: PageLimits,
    pub geocoding: GeocodingConfig,
    pub admin: Option<AdminSeed>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let environment = AppEnvironment::from_str(&var("APP_ENV", "development"));

        let host = var("APP_HOST", "127.0.0.1");
        let port = var("APP_PORT", "3000")
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = var("APP_LOG_LEVEL", "info");

        let jwt_secret = match lookup("JWT_SECRET").filter(|secret| !secret.is_empty()) {
            Some(secret) => secret,
            None if environment == AppEnvironment::Production => {
                return Err(ConfigError::MissingSecret)
            }
            None => DEVELOPMENT_JWT_SECRET.to_string(),
        };
        let token_ttl_hours = parse_number("JWT_EXPIRES_HOURS", var("JWT_EXPIRES_HOURS", "10"))?;

        let paging = PageLimits {
            default_size: parse_number("DEFAULT_PAGE_SIZE", var("DEFAULT_PAGE_SIZE", "25"))?,
            max_size: parse_number("MAX_PAGE_SIZE", var("MAX_PAGE_SIZE", "1000"))?,
        };

        let admin = match (lookup("ADMIN_EMAIL"), lookup("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some(AdminSeed { email, password })
            }
            _ => None,
        };

        let auth = AuthConfig {
            jwt_secret,
            token_ttl_hours,
        };
        auth.session_ttl()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            auth,
            mail: MailConfig {
                frontend_url: var("FRONTEND_URL", "http://localhost:3005"),
                mail_from: var("MAIL_FROM", "test.admin@apartments.com"),
            },
            paging,
            geocoding: GeocodingConfig {
                google_api_key: lookup("GOOGLE_API_KEY").filter(|key| !key.is_empty()),
            },
            admin,
        })
    }
}

fn parse_number<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber { key, value })
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Session signing parameters.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

impl AuthConfig {
    /// Session lifetime. Must be positive and no longer than [`MAX_TOKEN_TTL_HOURS`].
    pub fn session_ttl(&self) -> Result<chrono::Duration, ConfigError> {
        let hours = self.token_ttl_hours;
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&hours) {
            return Err(ConfigError::InvalidTokenTtl { hours });
        }
        chrono::Duration::try_hours(hours).ok_or(ConfigError::InvalidTokenTtl { hours })
    }
}

/// Addresses used when composing verification mail.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub frontend_url: String,
    pub mail_from: String,
}

#[derive(Debug, Clone, Default)]
pub struct GeocodingConfig {
    pub google_api_key: Option<String>,
}

/// Verified admin account created at boot when absent.
#[derive(Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminSeed")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str, value: String },
    InvalidTokenTtl { hours: i64 },
    MissingSecret,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be a number, got '{value}'")
            }
            ConfigError::InvalidTokenTtl { hours } => write!(
                f,
                "JWT_EXPIRES_HOURS must be between 1 and {MAX_TOKEN_TTL_HOURS}, got {hours}"
            ),
            ConfigError::MissingSecret => write!(f, "JWT_SECRET is required in production"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidTokenTtl { .. }
            | ConfigError::MissingSecret => None,
        }
    }
}
