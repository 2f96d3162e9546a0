use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::schemas::account::{Account, Role};
use crate::services::access_control::CapabilitySet;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub(crate) struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub(crate) username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub(crate) password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionUser {
    pub(crate) username: String,
    pub(crate) role: Role,
}

#[derive(Debug, Serialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
    pub(crate) token_type: String,
    pub(crate) user: Account,
    pub(crate) capabilities: CapabilitySet,
}

#[derive(Debug, Serialize)]
pub(crate) struct MeResponse {
    pub(crate) user: SessionUser,
    pub(crate) capabilities: CapabilitySet,
}
