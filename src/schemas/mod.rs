use std::collections::HashMap;

use serde::Serialize;

use crate::services::access_control::CapabilitySet;

pub mod account;
pub(crate) mod auth;
pub mod attendance;
pub mod grade;
pub mod observed_value;
pub mod report_card;
pub mod student;
pub mod subject;
pub mod wire;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) service: String,
    pub(crate) status: String,
    pub(crate) components: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RootResponse {
    pub(crate) message: String,
    pub(crate) version: String,
    pub(crate) api_prefix: String,
}

/// A record together with what the caller may do with it.
#[derive(Debug, Serialize)]
pub(crate) struct Scoped<T> {
    #[serde(flatten)]
    pub(crate) record: T,
    pub(crate) capabilities: CapabilitySet,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DashboardResponse {
    pub(crate) role: account::Role,
    pub(crate) capabilities: CapabilitySet,
    pub(crate) students: usize,
    pub(crate) subjects: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) accounts: Option<usize>,
}
