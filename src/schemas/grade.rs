use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::schemas::wire::{optional_score, optional_text, RecordId};

/// Subject summary the backend embeds in grade rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectRef {
    #[serde(default, deserialize_with = "optional_text")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<RecordId>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub subject_name: Option<String>,
    #[serde(default, rename = "Subject", skip_serializing_if = "Option::is_none")]
    pub subject: Option<SubjectRef>,
    #[serde(default, deserialize_with = "optional_score")]
    pub q1: Option<f64>,
    #[serde(default, deserialize_with = "optional_score")]
    pub q2: Option<f64>,
    #[serde(default, deserialize_with = "optional_score")]
    pub q3: Option<f64>,
    #[serde(default, deserialize_with = "optional_score")]
    pub q4: Option<f64>,
    #[serde(default, deserialize_with = "optional_score")]
    pub final_rating: Option<f64>,
}

impl GradeRecord {
    pub fn quarters(&self) -> [Option<f64>; 4] {
        [self.q1, self.q2, self.q3, self.q4]
    }

    /// Learning-area label: explicit name, then the embedded subject, then the id.
    pub fn subject_label(&self) -> String {
        if let Some(name) = self.subject_name.as_deref().filter(|name| !name.trim().is_empty()) {
            return name.to_string();
        }
        if let Some(name) = self.subject.as_ref().and_then(|subject| subject.name.as_deref()) {
            return name.to_string();
        }
        match &self.subject_id {
            Some(id) => format!("Subject {id}"),
            None => "Subject".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GradePayload {
    #[serde(alias = "student_id")]
    pub(crate) student_id: RecordId,
    #[serde(alias = "subject_id")]
    pub(crate) subject_id: RecordId,
    #[serde(default, deserialize_with = "optional_score")]
    #[validate(range(min = 0.0, max = 100.0, message = "q1 must be between 0 and 100"))]
    pub(crate) q1: Option<f64>,
    #[serde(default, deserialize_with = "optional_score")]
    #[validate(range(min = 0.0, max = 100.0, message = "q2 must be between 0 and 100"))]
    pub(crate) q2: Option<f64>,
    #[serde(default, deserialize_with = "optional_score")]
    #[validate(range(min = 0.0, max = 100.0, message = "q3 must be between 0 and 100"))]
    pub(crate) q3: Option<f64>,
    #[serde(default, deserialize_with = "optional_score")]
    #[validate(range(min = 0.0, max = 100.0, message = "q4 must be between 0 and 100"))]
    pub(crate) q4: Option<f64>,
    #[serde(default, alias = "school_year", skip_serializing_if = "Option::is_none")]
    pub(crate) school_year: Option<String>,
}
