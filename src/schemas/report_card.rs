use serde::{Serialize, Serializer};

use crate::schemas::attendance::AttendanceLine;
use crate::schemas::observed_value::ObservedValueRecord;
use crate::schemas::student::Student;
use crate::schemas::wire::RecordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remark {
    Passed,
    Failed,
    /// No final rating yet.
    Pending,
}

impl Remark {
    pub fn as_str(self) -> &'static str {
        match self {
            Remark::Passed => "Passed",
            Remark::Failed => "Failed",
            Remark::Pending => "\u{2014}",
        }
    }
}

impl Serialize for Remark {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeLine {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<RecordId>,
    pub subject: String,
    pub q1: Option<f64>,
    pub q2: Option<f64>,
    pub q3: Option<f64>,
    pub q4: Option<f64>,
    pub final_rating: Option<f64>,
    pub remark: Remark,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceTotals {
    pub total_present: u64,
    pub total_absent: u64,
    pub total_tardy: u64,
}

/// Display-ready report card. Always rebuilt from source records.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCardView {
    pub student: Student,
    pub learner_name: String,
    pub grades: Vec<GradeLine>,
    pub attendance: Vec<AttendanceLine>,
    pub attendance_totals: AttendanceTotals,
    pub observed_values: Vec<ObservedValueRecord>,
}
