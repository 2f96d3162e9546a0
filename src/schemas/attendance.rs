use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::schemas::wire::{optional_count, text_or_empty, RecordId};

/// Months of the ten-month school year, June through March.
pub const SCHOOL_YEAR_MONTHS: [&str; 10] = [
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
    "January",
    "February",
    "March",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<RecordId>,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub month: String,
    #[serde(default, deserialize_with = "optional_count")]
    pub days_of_school: Option<u32>,
    #[serde(default, deserialize_with = "optional_count")]
    pub days_present: Option<u32>,
    #[serde(default, deserialize_with = "optional_count")]
    pub days_absent: Option<u32>,
    #[serde(default, deserialize_with = "optional_count")]
    pub days_tardy: Option<u32>,
    /// Older spelling of `daysTardy`. Only read when `daysTardy` is absent.
    #[serde(default, deserialize_with = "optional_count", skip_serializing)]
    pub times_tardy: Option<u32>,
}

impl AttendanceRecord {
    pub fn tardy(&self) -> Option<u32> {
        self.days_tardy.or(self.times_tardy)
    }
}

/// Attendance row as displayed: counts default to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceLine {
    pub month: String,
    pub days_of_school: u32,
    pub days_present: u32,
    pub days_absent: u32,
    pub days_tardy: u32,
}

impl From<&AttendanceRecord> for AttendanceLine {
    fn from(record: &AttendanceRecord) -> Self {
        Self {
            month: record.month.clone(),
            days_of_school: record.days_of_school.unwrap_or(0),
            days_present: record.days_present.unwrap_or(0),
            days_absent: record.days_absent.unwrap_or(0),
            days_tardy: record.tardy().unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AttendancePayload {
    #[serde(alias = "student_id")]
    pub(crate) student_id: RecordId,
    #[validate(custom(function = "validate_month"))]
    pub(crate) month: String,
    #[serde(default, alias = "days_of_school", deserialize_with = "optional_count")]
    pub(crate) days_of_school: Option<u32>,
    #[serde(default, alias = "days_present", deserialize_with = "optional_count")]
    pub(crate) days_present: Option<u32>,
    #[serde(default, alias = "days_absent", deserialize_with = "optional_count")]
    pub(crate) days_absent: Option<u32>,
    #[serde(default, alias = "days_tardy", deserialize_with = "optional_count")]
    pub(crate) days_tardy: Option<u32>,
    #[serde(default, deserialize_with = "optional_count", skip_serializing)]
    pub(crate) times_tardy: Option<u32>,
    #[serde(default, alias = "school_year", skip_serializing_if = "Option::is_none")]
    pub(crate) school_year: Option<String>,
}

impl AttendancePayload {
    /// Folds the `timesTardy` spelling into `daysTardy`, which wins when both are sent.
    pub(crate) fn normalized(mut self) -> Self {
        if self.days_tardy.is_none() {
            self.days_tardy = self.times_tardy.take();
        }
        self.times_tardy = None;
        self
    }
}

fn validate_month(month: &str) -> Result<(), ValidationError> {
    if SCHOOL_YEAR_MONTHS.contains(&month) {
        Ok(())
    } else {
        Err(ValidationError::new("month")
            .with_message("month must be a school-year month (June to March)".into()))
    }
}
