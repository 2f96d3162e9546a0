use std::env;

use serde::Deserialize;

use super::types::{ConfigError, Environment, SeedAccount};
use crate::schemas::account::Role;

const DEFAULT_CORS_ORIGINS: &[&str] =
    &["http://localhost:3000", "http://localhost:5173", "http://127.0.0.1:3000"];

pub(super) fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

pub(super) fn env_or_default(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

pub(super) fn parse_u64(field: &'static str, value: String) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidValue { field, value })
}

pub(super) fn parse_cors_origins(value: Option<String>) -> Result<Vec<String>, ConfigError> {
    let Some(raw) = value else {
        return Ok(default_cors_origins());
    };

    if raw.trim().is_empty() {
        return Ok(default_cors_origins());
    }

    if raw.trim_start().starts_with('[') {
        let parsed: Vec<String> =
            serde_json::from_str(&raw).map_err(|_| ConfigError::InvalidCors(raw.clone()))?;
        if parsed.is_empty() {
            return Ok(default_cors_origins());
        }
        return Ok(parsed);
    }

    let items: Vec<String> = raw
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();

    if items.is_empty() {
        return Ok(default_cors_origins());
    }

    Ok(items)
}

#[derive(Deserialize)]
struct RawSeedAccount {
    username: String,
    password: String,
    #[serde(default)]
    role: Option<String>,
}

/// Accepts a JSON array of `{username, password, role}` objects or a comma separated list
/// of `username:password:role` triples. A missing role means `user`.
pub(super) fn parse_seed_accounts(value: Option<String>) -> Result<Vec<SeedAccount>, ConfigError> {
    let Some(raw) = value else {
        return Ok(Vec::new());
    };

    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let entries: Vec<RawSeedAccount> = if raw.starts_with('[') {
        serde_json::from_str(raw).map_err(|err| ConfigError::InvalidSeedAccount(err.to_string()))?
    } else {
        raw.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| {
                let mut parts = item.splitn(3, ':');
                let username = parts.next().unwrap_or_default().trim().to_string();
                let password = parts
                    .next()
                    .map(|part| part.trim().to_string())
                    .ok_or_else(|| ConfigError::InvalidSeedAccount(username.clone()))?;
                let role = parts.next().map(|part| part.trim().to_string());
                Ok(RawSeedAccount { username, password, role })
            })
            .collect::<Result<_, ConfigError>>()?
    };

    entries
        .into_iter()
        .map(|entry| {
            if entry.username.trim().is_empty() {
                return Err(ConfigError::InvalidSeedAccount("<empty username>".to_string()));
            }
            Ok(SeedAccount {
                username: entry.username.trim().to_string(),
                password: entry.password,
                role: entry.role.as_deref().map(Role::parse).unwrap_or_default(),
            })
        })
        .collect()
}

pub(super) fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES" | "on" | "ON")
}

pub(super) fn parse_environment(value: Option<String>) -> Environment {
    match value.as_deref().map(|item| item.to_lowercase()) {
        Some(ref val) if val == "production" || val == "prod" => Environment::Production,
        Some(ref val) if val == "staging" => Environment::Staging,
        Some(ref val) if val == "test" || val == "testing" => Environment::Test,
        _ => Environment::Development,
    }
}

pub(super) fn normalize_prefix(value: &str) -> String {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn default_cors_origins() -> Vec<String> {
    DEFAULT_CORS_ORIGINS.iter().map(|item| item.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cors_origins_json() {
        let raw = "[\"http://a\",\"http://b\"]".to_string();
        let parsed = parse_cors_origins(Some(raw)).expect("cors json");
        assert_eq!(parsed, vec!["http://a".to_string(), "http://b".to_string()]);
    }

    #[test]
    fn parse_cors_origins_csv() {
        let raw = "http://a, http://b".to_string();
        let parsed = parse_cors_origins(Some(raw)).expect("cors csv");
        assert_eq!(parsed, vec!["http://a".to_string(), "http://b".to_string()]);
    }

    #[test]
    fn parse_cors_origins_defaults_on_empty() {
        let parsed = parse_cors_origins(Some(" ".to_string())).expect("cors empty");
        assert_eq!(parsed, default_cors_origins());
    }

    #[test]
    fn parse_seed_accounts_json() {
        let raw = r#"[{"username":"principal","password":"changeme1","role":"superadmin"},
                      {"username":"120001090153","password":"learner1"}]"#;
        let parsed = parse_seed_accounts(Some(raw.to_string())).expect("seed json");

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].username, "principal");
        assert_eq!(parsed[0].role, Role::Superadmin);
        assert_eq!(parsed[1].role, Role::User);
    }

    #[test]
    fn parse_seed_accounts_csv() {
        let raw = "registrar:secret12:admin, mreyes:secret34:teacher".to_string();
        let parsed = parse_seed_accounts(Some(raw)).expect("seed csv");

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].username, "registrar");
        assert_eq!(parsed[0].password, "secret12");
        assert_eq!(parsed[0].role, Role::Admin);
        assert_eq!(parsed[1].role, Role::Teacher);
    }

    #[test]
    fn parse_seed_accounts_unknown_role_falls_back_to_user() {
        let parsed =
            parse_seed_accounts(Some("guest:secret12:principal".to_string())).expect("seed");
        assert_eq!(parsed[0].role, Role::User);
    }

    #[test]
    fn parse_seed_accounts_rejects_missing_password() {
        let err = parse_seed_accounts(Some("registrar".to_string())).expect_err("missing pw");
        assert!(matches!(err, ConfigError::InvalidSeedAccount(_)));

        let err = parse_seed_accounts(Some("[{\"username\":\"x\"}]".to_string()))
            .expect_err("missing pw json");
        assert!(matches!(err, ConfigError::InvalidSeedAccount(_)));
    }

    #[test]
    fn parse_seed_accounts_empty_is_empty() {
        assert!(parse_seed_accounts(None).expect("none").is_empty());
        assert!(parse_seed_accounts(Some("  ".to_string())).expect("blank").is_empty());
    }

    #[test]
    fn seed_account_debug_hides_password() {
        let parsed = parse_seed_accounts(Some("registrar:secret12:admin".to_string())).expect("seed");
        let rendered = format!("{:?}", parsed[0]);
        assert!(!rendered.contains("secret12"));
    }

    #[test]
    fn normalize_prefix_variants() {
        assert_eq!(normalize_prefix("/api"), "/api");
        assert_eq!(normalize_prefix("api/"), "/api");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix("/api/v1/"), "/api/v1");
    }

    #[test]
    fn parse_bool_variants() {
        assert!(parse_bool("1"));
        assert!(parse_bool("true"));
        assert!(parse_bool("yes"));
        assert!(parse_bool("on"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("0"));
    }

    #[test]
    fn parse_environment_variants() {
        assert_eq!(parse_environment(Some("prod".to_string())), Environment::Production);
        assert_eq!(parse_environment(Some("staging".to_string())), Environment::Staging);
        assert_eq!(parse_environment(Some("testing".to_string())), Environment::Test);
        assert_eq!(parse_environment(None), Environment::Development);
    }
}
