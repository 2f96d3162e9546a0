use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::schemas::wire::{optional_text, text_or_empty, RecordId};

/// Account role. Unknown values decode as [`Role::User`], the most restrictive role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Role {
    Superadmin,
    Admin,
    Teacher,
    #[default]
    User,
}

impl Role {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "superadmin" => Role::Superadmin,
            "admin" => Role::Admin,
            "teacher" => Role::Teacher,
            _ => Role::User,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Superadmin => "superadmin",
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::User => "user",
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Role::parse(&value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: RecordId,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub username: String,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Account {
    pub(crate) fn matches_search(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.username.to_lowercase().contains(&query)
            || self.email.as_deref().is_some_and(|email| email.to_lowercase().contains(&query))
            || self.role.as_str().contains(&query)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AccountCreate {
    #[validate(length(min = 1, message = "username must not be empty"))]
    pub(crate) username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "email must be a valid address"))]
    pub(crate) email: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub(crate) password: String,
    #[serde(default)]
    pub(crate) role: Role,
    #[serde(default = "default_true", alias = "is_active")]
    pub(crate) is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AccountUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "username must not be empty"))]
    pub(crate) username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "email must be a valid address"))]
    pub(crate) email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub(crate) password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) role: Option<Role>,
    #[serde(default, alias = "is_active", skip_serializing_if = "Option::is_none")]
    pub(crate) is_active: Option<bool>,
}

fn default_true() -> bool {
    true
}
