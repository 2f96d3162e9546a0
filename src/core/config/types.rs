use thiserror::Error;

use crate::schemas::account::Role;

#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(super) server: ServerSettings,
    pub(super) runtime: RuntimeSettings,
    pub(super) api: ApiSettings,
    pub(super) security: SecuritySettings,
    pub(super) cors: CorsSettings,
    pub(super) backend: BackendSettings,
    pub(super) accounts: AccountSettings,
    pub(super) telemetry: TelemetrySettings,
}

#[derive(Debug, Clone)]
pub(crate) struct ServerSettings {
    pub(super) host: ServerHost,
    pub(super) port: ServerPort,
}

#[derive(Debug, Clone)]
pub(crate) struct ApiSettings {
    pub(crate) project_name: String,
    pub(crate) version: String,
    pub(crate) prefix: String,
}

#[derive(Debug, Clone)]
pub(crate) struct SecuritySettings {
    pub(crate) secret_key: String,
    pub(crate) secret_key_explicit: bool,
    pub(crate) access_token_expire_minutes: u64,
    pub(crate) algorithm: String,
}

#[derive(Debug, Clone)]
pub(crate) struct CorsSettings {
    pub(crate) origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct BackendSettings {
    pub(crate) base_url: String,
    pub(crate) timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct AccountSettings {
    pub(crate) seeds: Vec<SeedAccount>,
    pub(crate) match_first_name: bool,
}

/// A bootstrap login supplied through configuration. The password is plain text until
/// the seed directory hashes it at startup.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct SeedAccount {
    pub(crate) username: String,
    pub(crate) password: String,
    pub(crate) role: Role,
}

impl std::fmt::Debug for SeedAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedAccount")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct TelemetrySettings {
    pub(crate) log_level: String,
    pub(crate) json: bool,
    pub(crate) prometheus_enabled: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct RuntimeSettings {
    pub(crate) environment: Environment,
    pub(crate) strict_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Environment {
    Development,
    Production,
    Staging,
    Test,
}

impl Environment {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Staging => "staging",
            Self::Test => "test",
        }
    }

    pub(super) fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ServerHost(pub(super) String);

#[derive(Debug, Clone, Copy)]
pub(crate) struct ServerPort(pub(super) u16);

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("invalid server host: {0}")]
    InvalidHost(String),
    #[error("invalid server port: {0}")]
    InvalidPort(String),
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("invalid cors origins: {0}")]
    InvalidCors(String),
    #[error("invalid seed account entry: {0}")]
    InvalidSeedAccount(String),
    #[error("missing required secret for {0}")]
    MissingSecret(&'static str),
}

impl ServerHost {
    pub(super) fn parse(value: String) -> Result<Self, ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::InvalidHost(value));
        }

        Ok(Self(value))
    }
}

impl ServerPort {
    pub(super) fn parse(value: String) -> Result<Self, ConfigError> {
        let parsed: u16 = value.parse().map_err(|_| ConfigError::InvalidPort(value.clone()))?;
        if parsed == 0 {
            return Err(ConfigError::InvalidPort(value));
        }

        Ok(Self(parsed))
    }
}
