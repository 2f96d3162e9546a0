use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::schemas::wire::{text_or_empty, RecordId};

/// Core values of the report card's observed-values section.
pub const CORE_VALUES: [&str; 4] = ["Maka-Diyos", "Makatao", "Makakalikasan", "Makabansa"];

/// Quarterly behavior rating. No numeric mapping exists for these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObservedRating {
    #[serde(rename = "AO")]
    AlwaysObserved,
    #[serde(rename = "SO")]
    SometimesObserved,
    #[serde(rename = "RO")]
    RarelyObserved,
    #[serde(rename = "NO")]
    NotObserved,
}

impl ObservedRating {
    pub fn code(self) -> &'static str {
        match self {
            ObservedRating::AlwaysObserved => "AO",
            ObservedRating::SometimesObserved => "SO",
            ObservedRating::RarelyObserved => "RO",
            ObservedRating::NotObserved => "NO",
        }
    }

    fn parse(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "AO" => Some(ObservedRating::AlwaysObserved),
            "SO" => Some(ObservedRating::SometimesObserved),
            "RO" => Some(ObservedRating::RarelyObserved),
            "NO" => Some(ObservedRating::NotObserved),
            _ => None,
        }
    }
}

fn optional_rating<'de, D>(deserializer: D) -> Result<Option<ObservedRating>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(code) => ObservedRating::parse(code)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("unknown observed-value rating: {code}"))),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedValueRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<RecordId>,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub core_value: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub behavior_statement: String,
    #[serde(default, deserialize_with = "optional_rating")]
    pub q1: Option<ObservedRating>,
    #[serde(default, deserialize_with = "optional_rating")]
    pub q2: Option<ObservedRating>,
    #[serde(default, deserialize_with = "optional_rating")]
    pub q3: Option<ObservedRating>,
    #[serde(default, deserialize_with = "optional_rating")]
    pub q4: Option<ObservedRating>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ObservedValuePayload {
    #[serde(alias = "student_id")]
    pub(crate) student_id: RecordId,
    #[serde(alias = "core_value")]
    #[validate(custom(function = "validate_core_value"))]
    pub(crate) core_value: String,
    #[serde(alias = "behavior_statement")]
    #[validate(length(min = 1, message = "behaviorStatement must not be empty"))]
    pub(crate) behavior_statement: String,
    #[serde(default, deserialize_with = "optional_rating")]
    pub(crate) q1: Option<ObservedRating>,
    #[serde(default, deserialize_with = "optional_rating")]
    pub(crate) q2: Option<ObservedRating>,
    #[serde(default, deserialize_with = "optional_rating")]
    pub(crate) q3: Option<ObservedRating>,
    #[serde(default, deserialize_with = "optional_rating")]
    pub(crate) q4: Option<ObservedRating>,
    #[serde(default, alias = "school_year", skip_serializing_if = "Option::is_none")]
    pub(crate) school_year: Option<String>,
}

fn validate_core_value(core_value: &str) -> Result<(), ValidationError> {
    if CORE_VALUES.contains(&core_value) {
        Ok(())
    } else {
        Err(ValidationError::new("core_value").with_message("unknown core value".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratings_decode_codes_and_blanks() {
        let raw = r#"{"coreValue": "Makatao", "behaviorStatement": "Shows respect",
                      "q1": "AO", "q2": "so", "q3": "", "q4": null}"#;
        let record: ObservedValueRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.q1, Some(ObservedRating::AlwaysObserved));
        assert_eq!(record.q2, Some(ObservedRating::SometimesObserved));
        assert_eq!(record.q3, None);
        assert_eq!(record.q4, None);
    }

    #[test]
    fn unknown_rating_is_rejected() {
        let raw = r#"{"coreValue": "Makatao", "q1": "XX"}"#;
        assert!(serde_json::from_str::<ObservedValueRecord>(raw).is_err());
    }

    #[test]
    fn ratings_serialize_as_codes() {
        let json = serde_json::to_value(ObservedRating::RarelyObserved).unwrap();
        assert_eq!(json, serde_json::json!("RO"));
        assert_eq!(ObservedRating::NotObserved.code(), "NO");
    }

    #[test]
    fn payload_requires_known_core_value() {
        let payload: ObservedValuePayload = serde_json::from_str(
            r#"{"studentId": 1, "coreValue": "Makabayan", "behaviorStatement": "x"}"#,
        )
        .unwrap();
        assert!(payload.validate().is_err());
    }
}
