use std::collections::HashSet;

use super::parsing::{
    env_optional, env_or_default, normalize_prefix, parse_bool, parse_cors_origins,
    parse_environment, parse_seed_accounts, parse_u64,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    AccountSettings, ApiSettings, BackendSettings, ConfigError, CorsSettings, RuntimeSettings,
    SecuritySettings, ServerHost, ServerPort, ServerSettings, Settings, TelemetrySettings,
};

const MIN_SEED_PASSWORD_LEN: usize = 6;

/// Credentials shipped with the legacy front end; never acceptable outside development.
const WELL_KNOWN_PASSWORDS: &[&str] = &["SuperAdmin@123", "admin", "teacher"];

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("REPORTCARD_HOST", "0.0.0.0");
        let port = env_or_default("REPORTCARD_PORT", "8000");

        let environment = parse_environment(
            env_optional("REPORTCARD_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_optional("REPORTCARD_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Report Card Gateway");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let prefix = normalize_prefix(&env_or_default("API_PREFIX", "/api"));

        let (secret_key, secret_key_explicit) = match env_optional("SECRET_KEY") {
            Some(value) => (value, true),
            None => (load_or_create_secret_key(), false),
        };

        let access_token_expire_minutes = parse_u64(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            env_or_default("ACCESS_TOKEN_EXPIRE_MINUTES", "480"),
        )?;
        let algorithm = env_or_default("ALGORITHM", "HS256");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let backend_url = env_or_default("BACKEND_API_URL", "http://localhost:3001/api");
        let backend_timeout =
            parse_u64("BACKEND_TIMEOUT_SECONDS", env_or_default("BACKEND_TIMEOUT_SECONDS", "30"))?;

        let seeds = parse_seed_accounts(env_optional("SEED_ACCOUNTS"))?;
        let match_first_name =
            env_optional("USER_MATCH_FIRST_NAME").map(|value| parse_bool(&value)).unwrap_or(false);

        let log_level = env_or_default("REPORTCARD_LOG_LEVEL", "info");
        let json = env_optional("REPORTCARD_LOG_JSON")
            .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
            .unwrap_or(false);
        let prometheus_enabled = env_optional("PROMETHEUS_ENABLED")
            .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
            .unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, prefix },
            security: SecuritySettings {
                secret_key,
                secret_key_explicit,
                access_token_expire_minutes,
                algorithm,
            },
            cors: CorsSettings { origins: cors_origins },
            backend: BackendSettings {
                base_url: backend_url.trim_end_matches('/').to_string(),
                timeout_seconds: backend_timeout,
            },
            accounts: AccountSettings { seeds, match_first_name },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn backend(&self) -> &BackendSettings {
        &self.backend
    }

    pub(crate) fn accounts(&self) -> &AccountSettings {
        &self.accounts
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let url = &self.backend.base_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue { field: "BACKEND_API_URL", value: url.clone() });
        }

        if self.backend.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "BACKEND_TIMEOUT_SECONDS",
                value: "0".to_string(),
            });
        }

        if self.security.access_token_expire_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ACCESS_TOKEN_EXPIRE_MINUTES",
                value: "0".to_string(),
            });
        }

        if self.security.algorithm != "HS256" {
            return Err(ConfigError::InvalidValue {
                field: "ALGORITHM",
                value: self.security.algorithm.clone(),
            });
        }

        let mut seen = HashSet::new();
        for seed in &self.accounts.seeds {
            if seed.password.chars().count() < MIN_SEED_PASSWORD_LEN {
                return Err(ConfigError::InvalidSeedAccount(format!(
                    "{}: password must be at least {MIN_SEED_PASSWORD_LEN} characters",
                    seed.username
                )));
            }
            if !seen.insert(seed.username.to_lowercase()) {
                return Err(ConfigError::InvalidSeedAccount(format!(
                    "{}: duplicate username",
                    seed.username
                )));
            }
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if !self.security.secret_key_explicit {
            return Err(ConfigError::MissingSecret("SECRET_KEY"));
        }

        if let Some(seed) = self
            .accounts
            .seeds
            .iter()
            .find(|seed| WELL_KNOWN_PASSWORDS.contains(&seed.password.as_str()))
        {
            return Err(ConfigError::InvalidSeedAccount(format!(
                "{}: well-known default password",
                seed.username
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::core::config::{ConfigError, Settings};
    use crate::schemas::account::Role;
    use crate::test_support::{env_lock, set_test_env};

    #[tokio::test]
    async fn loads_defaults_and_seed_accounts() {
        let _guard = env_lock().await;
        set_test_env();
        std::env::set_var("SEED_ACCOUNTS", "registrar:secret12:admin");
        std::env::set_var("API_PREFIX", "api/");

        let settings = Settings::load().expect("settings");

        assert_eq!(settings.api().prefix, "/api");
        assert_eq!(settings.backend().base_url, "http://localhost:3001/api");
        assert_eq!(settings.backend().timeout_seconds, 30);
        assert_eq!(settings.security().access_token_expire_minutes, 480);
        assert_eq!(settings.accounts().seeds[0].role, Role::Admin);
        assert!(!settings.accounts().match_first_name);
    }

    #[tokio::test]
    async fn rejects_non_http_backend_and_zero_timeout() {
        let _guard = env_lock().await;
        set_test_env();

        std::env::set_var("BACKEND_API_URL", "ftp://records.local");
        let err = Settings::load().expect_err("bad url");
        assert!(matches!(err, ConfigError::InvalidValue { field: "BACKEND_API_URL", .. }));

        std::env::set_var("BACKEND_API_URL", "https://records.local/api");
        std::env::set_var("BACKEND_TIMEOUT_SECONDS", "0");
        let err = Settings::load().expect_err("zero timeout");
        assert!(matches!(err, ConfigError::InvalidValue { field: "BACKEND_TIMEOUT_SECONDS", .. }));
    }

    #[tokio::test]
    async fn rejects_short_and_duplicate_seed_passwords() {
        let _guard = env_lock().await;
        set_test_env();

        std::env::set_var("SEED_ACCOUNTS", "registrar:abc:admin");
        assert!(matches!(Settings::load(), Err(ConfigError::InvalidSeedAccount(_))));

        std::env::set_var("SEED_ACCOUNTS", "registrar:secret12:admin,Registrar:secret34:teacher");
        assert!(matches!(Settings::load(), Err(ConfigError::InvalidSeedAccount(_))));
    }

    #[tokio::test]
    async fn strict_mode_requires_secret_and_rejects_default_passwords() {
        let _guard = env_lock().await;
        set_test_env();
        std::env::set_var("REPORTCARD_STRICT_CONFIG", "1");
        std::env::remove_var("SECRET_KEY");

        let err = Settings::load().expect_err("secret required");
        assert!(matches!(err, ConfigError::MissingSecret("SECRET_KEY")));

        std::env::set_var("SECRET_KEY", "unit-test-secret");
        std::env::set_var("SEED_ACCOUNTS", "superadmin:SuperAdmin@123:superadmin");
        assert!(matches!(Settings::load(), Err(ConfigError::InvalidSeedAccount(_))));

        std::env::set_var("SEED_ACCOUNTS", "superadmin:a-real-passphrase:superadmin");
        assert!(Settings::load().is_ok());
    }
}
