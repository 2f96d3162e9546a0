//! Lenient decoding helpers for backend JSON.
//!
//! The backend serializes decimal columns as strings (`"90.00"`) and form submissions leave
//! empty strings behind, so numeric fields accept numbers, numeric strings, `""` and `null`.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

/// Backend primary key. Accepted as a string or an integer, always rendered as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl Visitor<'_> for IdVisitor {
            type Value = RecordId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string or integer id")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<RecordId, E> {
                Ok(RecordId(value.to_string()))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<RecordId, E> {
                Ok(RecordId(value.to_string()))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<RecordId, E> {
                Ok(RecordId(value.to_string()))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Number(f64),
    Text(String),
}

/// Optional score: number, numeric string, `""` or `null`. Only finite values are accepted.
pub fn optional_score<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawNumber>::deserialize(deserializer)?;
    let value = match raw {
        None => return Ok(None),
        Some(RawNumber::Number(value)) => value,
        Some(RawNumber::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<f64>()
                .map_err(|_| de::Error::custom(format!("invalid numeric value: {trimmed}")))?
        }
    };

    if !value.is_finite() {
        return Err(de::Error::custom(format!("non-finite numeric value: {value}")));
    }
    Ok(Some(value))
}

/// Optional nonnegative counter with the same leniency as [`optional_score`].
pub fn optional_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(value) = optional_score(deserializer)? else {
        return Ok(None);
    };

    if value < 0.0 || value.fract() != 0.0 || value > f64::from(u32::MAX) {
        return Err(de::Error::custom(format!("invalid count: {value}")));
    }

    Ok(Some(value as u32))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawText {
    Text(String),
    Integer(i64),
    Number(f64),
}

/// Optional free-form label such as a grade level, which the backend may store as a number.
pub fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawText>::deserialize(deserializer)?;
    Ok(match raw {
        None => None,
        Some(RawText::Text(text)) => Some(text).filter(|value| !value.trim().is_empty()),
        Some(RawText::Integer(value)) => Some(value.to_string()),
        Some(RawText::Number(value)) => Some(value.to_string()),
    })
}

/// Required-ish text field where the backend may send `null`; absent becomes `""`.
pub fn text_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    optional_text(deserializer).map(Option::unwrap_or_default)
}
