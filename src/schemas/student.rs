use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::schemas::wire::{optional_text, text_or_empty, RecordId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: RecordId,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub lrn: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub first_name: String,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub last_name: String,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub grade_level: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub school_year: Option<String>,
}

impl Student {
    /// Name as printed on the report card: `Last, First Middle`.
    pub fn display_name(&self) -> String {
        let mut name = format!("{}, {}", self.last_name.trim(), self.first_name.trim());
        if let Some(middle) = self.middle_name.as_deref().map(str::trim).filter(|m| !m.is_empty())
        {
            name.push(' ');
            name.push_str(middle);
        }
        name
    }

    pub(crate) fn matches_search(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.first_name.to_lowercase().contains(&query)
            || self.last_name.to_lowercase().contains(&query)
            || self.lrn.to_lowercase().contains(&query)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StudentPayload {
    #[validate(length(min = 1, message = "lrn must not be empty"))]
    pub(crate) lrn: String,
    #[serde(alias = "first_name")]
    #[validate(length(min = 1, message = "firstName must not be empty"))]
    pub(crate) first_name: String,
    #[serde(default, alias = "middle_name", skip_serializing_if = "Option::is_none")]
    pub(crate) middle_name: Option<String>,
    #[serde(alias = "last_name")]
    #[validate(length(min = 1, message = "lastName must not be empty"))]
    pub(crate) last_name: String,
    #[serde(default, alias = "grade_level", skip_serializing_if = "Option::is_none")]
    pub(crate) grade_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) section: Option<String>,
    #[serde(default, alias = "school_year", skip_serializing_if = "Option::is_none")]
    pub(crate) school_year: Option<String>,
}
