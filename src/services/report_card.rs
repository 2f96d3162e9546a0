//! Report card aggregation.
//!
//! Final ratings, remarks and attendance totals are derived here and nowhere else.

use thiserror::Error;

use crate::schemas::attendance::{AttendanceLine, AttendanceRecord};
use crate::schemas::grade::GradeRecord;
use crate::schemas::observed_value::ObservedValueRecord;
use crate::schemas::report_card::{AttendanceTotals, GradeLine, Remark, ReportCardView};
use crate::schemas::student::Student;

/// Lowest final rating that passes a learning area.
pub const PASSING_THRESHOLD: f64 = 75.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportCardError {
    #[error("report card requires a student")]
    MissingStudent,
}

/// Backend override first; otherwise the rounded mean of four quarters, or nothing.
/// Non-finite inputs count as absent.
pub fn compute_final_rating(grade: &GradeRecord) -> Option<f64> {
    if let Some(rating) = grade.final_rating.filter(|rating| rating.is_finite()) {
        return Some(rating);
    }

    let [Some(q1), Some(q2), Some(q3), Some(q4)] = grade.quarters() else {
        return None;
    };

    // f64::round rounds half away from zero.
    Some(((q1 + q2 + q3 + q4) / 4.0).round()).filter(|rating| rating.is_finite())
}

pub fn remark_for(final_rating: Option<f64>) -> Remark {
    match final_rating {
        None => Remark::Pending,
        Some(rating) if rating >= PASSING_THRESHOLD => Remark::Passed,
        Some(_) => Remark::Failed,
    }
}

pub fn aggregate_attendance(records: &[AttendanceRecord]) -> AttendanceTotals {
    records.iter().fold(AttendanceTotals::default(), |totals, record| AttendanceTotals {
        total_present: totals.total_present + u64::from(record.days_present.unwrap_or(0)),
        total_absent: totals.total_absent + u64::from(record.days_absent.unwrap_or(0)),
        total_tardy: totals.total_tardy + u64::from(record.tardy().unwrap_or(0)),
    })
}

fn grade_line(grade: &GradeRecord) -> GradeLine {
    let final_rating = compute_final_rating(grade);
    GradeLine {
        subject_id: grade.subject_id.clone(),
        subject: grade.subject_label(),
        q1: grade.q1,
        q2: grade.q2,
        q3: grade.q3,
        q4: grade.q4,
        final_rating,
        remark: remark_for(final_rating),
    }
}

pub fn build_report_card(
    student: Option<&Student>,
    grades: &[GradeRecord],
    attendance: &[AttendanceRecord],
    observed_values: &[ObservedValueRecord],
) -> Result<ReportCardView, ReportCardError> {
    let student = student.ok_or(ReportCardError::MissingStudent)?;

    Ok(ReportCardView {
        student: student.clone(),
        learner_name: student.display_name(),
        grades: grades.iter().map(grade_line).collect(),
        attendance: attendance.iter().map(AttendanceLine::from).collect(),
        attendance_totals: aggregate_attendance(attendance),
        observed_values: observed_values.to_vec(),
    })
}
