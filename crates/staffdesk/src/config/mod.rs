use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_STALE_SECS: u64 = 60;
pub const DEFAULT_WEEKLY_CAPACITY_HOURS: f32 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }

    /// Log filter used when `APP_LOG_LEVEL` is unset.
    pub const fn default_log_level(self) -> &'static str {
        match self {
            Self::Development => "staffdesk=debug,info",
            Self::Test => "warn",
            Self::Production => "info",
        }
    }
}

/// Everything the service reads from its environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub cache: CacheConfig,
    pub planning: PlanningConfig,
}

impl AppConfig {
    /// Reads `.env` (when present) and then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);
        let environment = vars
            .text("APP_ENV")
            .map_or(AppEnvironment::Development, |raw| AppEnvironment::parse(&raw));

        let server = ServerConfig {
            host: vars.text("APP_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: vars.parsed("APP_PORT", "a port number", 3000)?,
        };
        let telemetry = TelemetryConfig {
            log_level: vars
                .text("APP_LOG_LEVEL")
                .unwrap_or_else(|| environment.default_log_level().to_string()),
        };
        let cache = CacheConfig {
            stale_after: Duration::from_secs(vars.parsed(
                "CACHE_STALE_SECS",
                "a whole number of seconds",
                DEFAULT_STALE_SECS,
            )?),
        };

        let weekly_capacity_hours: f32 = vars.parsed(
            "WEEKLY_CAPACITY_HOURS",
            "a positive number of hours",
            DEFAULT_WEEKLY_CAPACITY_HOURS,
        )?;
        if !(weekly_capacity_hours.is_finite() && weekly_capacity_hours > 0.0) {
            return Err(ConfigError::Invalid {
                key: "WEEKLY_CAPACITY_HOURS",
                value: weekly_capacity_hours.to_string(),
                expected: "a positive number of hours",
            });
        }

        Ok(Self {
            environment,
            server,
            telemetry,
            cache,
            planning: PlanningConfig {
                weekly_capacity_hours,
            },
        })
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Trimmed value, with blank treated as unset.
    fn text(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
    }

    fn parsed<T: FromStr>(
        &self,
        key: &'static str,
        expected: &'static str,
        default: T,
    ) -> Result<T, ConfigError> {
        match self.text(key) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key,
                value: raw,
                expected,
            }),
        }
    }
}

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

        self.host
            .parse::<IpAddr>()
            .map(|ip| SocketAddr::new(ip, self.port))
            .map_err(|source| ConfigError::InvalidHost {
                host: self.host.clone(),
                source,
            })
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// How long a fetched collection is served from the query cache.
///
/// A zero duration means every read goes back to the store.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub stale_after: Duration,
}

#[derive(Debug, Clone)]
pub struct PlanningConfig {
    pub weekly_capacity_hours: f32,
}

#[derive(Debug)]
pub enum ConfigError {
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
    InvalidHost {
        host: String,
        source: std::net::AddrParseError,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid {
                key,
                value,
                expected,
            } => write!(f, "{key}='{value}' is not {expected}"),
            ConfigError::InvalidHost { host, .. } => {
                write!(f, "APP_HOST='{host}' is not an IPv4 or IPv6 address")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source, .. } => Some(source),
            ConfigError::Invalid { .. } => None,
        }
    }
}
