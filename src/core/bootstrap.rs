use std::collections::HashMap;

use crate::core::config::{SeedAccount, Settings};
use crate::core::security::{self, SecurityError};
use crate::schemas::account::{Account, Role};
use crate::schemas::wire::RecordId;

#[derive(Debug, Clone)]
struct SeededLogin {
    username: String,
    hashed_password: String,
    role: Role,
}

/// Bootstrap logins from `SEED_ACCOUNTS`, held only as argon2 hashes.
#[derive(Debug, Clone, Default)]
pub(crate) struct SeedDirectory {
    logins: HashMap<String, SeededLogin>,
}

impl SeedDirectory {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self, SecurityError> {
        let directory = Self::from_seeds(&settings.accounts().seeds)?;
        if directory.is_empty() {
            tracing::warn!("SEED_ACCOUNTS not configured; logins rely on the backend only");
        } else {
            tracing::info!(count = directory.len(), "Seed accounts loaded");
        }
        Ok(directory)
    }

    pub(crate) fn from_seeds(seeds: &[SeedAccount]) -> Result<Self, SecurityError> {
        let mut logins = HashMap::with_capacity(seeds.len());
        for seed in seeds {
            let hashed_password = security::hash_password(&seed.password)?;
            logins.insert(
                seed.username.to_lowercase(),
                SeededLogin { username: seed.username.clone(), hashed_password, role: seed.role },
            );
        }
        Ok(Self { logins })
    }

    pub(crate) fn len(&self) -> usize {
        self.logins.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.logins.is_empty()
    }

    pub(crate) fn contains(&self, username: &str) -> bool {
        self.logins.contains_key(&username.to_lowercase())
    }

    /// `Ok(None)` for an unknown username or a wrong password.
    pub(crate) fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Account>, SecurityError> {
        let Some(login) = self.logins.get(&username.to_lowercase()) else {
            return Ok(None);
        };

        if !security::verify_password(password, &login.hashed_password)? {
            return Ok(None);
        }

        Ok(Some(Account {
            id: RecordId::new(format!("seed:{}", login.username)),
            username: login.username.clone(),
            email: None,
            role: login.role,
            is_active: true,
        }))
    }
}
