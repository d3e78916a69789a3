use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::tickets::domain::ActorRole;

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
    pub identity: IdentityConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let identity = match env::var("APP_ACTOR_TOKENS") {
            Ok(raw) => IdentityConfig::parse(&raw)?,
            Err(_) => IdentityConfig::default(),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            identity,
        })
    }
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Bearer tokens accepted by the built-in identity directory.
#[derive(Debug, Clone, Default)]
pub struct IdentityConfig {
    pub grants: Vec<ActorGrant>,
}

/// A single `token:id:name:role[:detail]` entry.
///
/// The optional detail is the flat number for residents and the designation for staff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorGrant {
    pub token: String,
    pub actor_id: String,
    pub name: String,
    pub role: ActorRole,
    pub flat_number: Option<String>,
    pub designation: Option<String>,
}

impl IdentityConfig {
    /// Parse a comma-separated list of `token:id:name:role[:detail]` grants.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let grants = raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(parse_grant)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { grants })
    }
}

fn parse_grant(entry: &str) -> Result<ActorGrant, ConfigError> {
    let invalid = || ConfigError::InvalidActorGrant {
        entry: entry.to_string(),
    };

    let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
    let (token, actor_id, name, role, detail) = match parts.as_slice() {
        [token, actor_id, name, role] => (*token, *actor_id, *name, *role, None),
        [token, actor_id, name, role, detail] => {
            (*token, *actor_id, *name, *role, Some(*detail).filter(|d| !d.is_empty()))
        }
        _ => return Err(invalid()),
    };
    if token.is_empty() || actor_id.is_empty() || name.is_empty() {
        return Err(invalid());
    }
    let role = ActorRole::parse(role).ok_or_else(invalid)?;
    let detail = detail.map(str::to_string);
    let (flat_number, designation) = match role {
        ActorRole::Resident => (detail, None),
        ActorRole::Staff => (None, detail),
    };

    Ok(ActorGrant {
        token: token.to_string(),
        actor_id: actor_id.to_string(),
        name: name.to_string(),
        role,
        flat_number,
        designation,
    })
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidActorGrant { entry: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidActorGrant { entry } => write!(
                f,
                "APP_ACTOR_TOKENS entry '{}' must look like token:id:name:resident|staff[:detail]",
                entry
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidActorGrant { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
