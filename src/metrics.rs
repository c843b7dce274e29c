use serde::Serialize;

use crate::store::{Assignment, Snapshot, Student};

pub const UNKNOWN_STUDENT: &str = "Unknown Student";
pub const UNKNOWN_ASSIGNMENT: &str = "Unknown Assignment";

/// Round-half-up to the nearest whole percent. Display values are always
/// integers; 66.666 becomes 67, 62.5 becomes 63.
pub fn round_percent(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// A grade's standalone percentage. A non-positive max contributes zero to
/// any mean instead of poisoning it.
pub fn grade_percent(grade: &crate::store::Grade) -> f64 {
    if grade.max_score > 0.0 {
        (grade.score / grade.max_score) * 100.0
    } else {
        0.0
    }
}

fn share_percent(part: usize, whole: usize) -> i64 {
    if whole == 0 {
        return 0;
    }
    round_percent((part as f64 / whole as f64) * 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentStats {
    pub attendance_rate: i64,
    pub average_grade: i64,
    pub total_grades: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassStats {
    pub total_students: i64,
    pub average_attendance: i64,
    pub average_grade: i64,
}

impl ClassStats {
    /// The no-class-selected answer: everything zero.
    pub fn empty() -> Self {
        ClassStats {
            total_students: 0,
            average_attendance: 0,
            average_grade: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Excellent,
    Good,
    AtRisk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeCohorts {
    pub above_90: i64,
    pub above_80: i64,
    pub below_60: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceCohorts {
    pub perfect: i64,
    pub above_90: i64,
    pub below_70: i64,
}

pub fn class_roster<'a>(students: &'a [Student], class_id: &str) -> Vec<&'a Student> {
    students.iter().filter(|s| s.class_id == class_id).collect()
}

/// Per-student aggregates for one student in the context of one class.
///
/// Attendance is scoped to (student, class). Grades are scoped to the
/// student only: a grade earned in any context counts toward the average.
/// That asymmetry is contractual, not an oversight.
pub fn student_stats(snapshot: &Snapshot, student_id: &str, class_id: &str) -> StudentStats {
    let mut present = 0usize;
    let mut total = 0usize;
    for rec in &snapshot.attendance {
        if rec.student_id == student_id && rec.class_id == class_id {
            total += 1;
            if rec.status == "present" {
                present += 1;
            }
        }
    }

    let mut percent_sum = 0.0;
    let mut grade_count = 0usize;
    for grade in &snapshot.grades {
        if grade.student_id == student_id {
            percent_sum += grade_percent(grade);
            grade_count += 1;
        }
    }
    // Mean of per-grade percentages, not sum(score)/sum(max). The two
    // differ whenever max varies across assignments.
    let average_grade = if grade_count > 0 {
        round_percent(percent_sum / grade_count as f64)
    } else {
        0
    };

    StudentStats {
        attendance_rate: share_percent(present, total),
        average_grade,
        total_grades: grade_count as i64,
    }
}

/// Class-wide roll-up. Attendance is event-weighted: every attendance row
/// of the class counts once, so a student with more rows weighs more than
/// a mean-of-per-student-rates would allow.
pub fn class_stats(snapshot: &Snapshot, class_id: &str) -> ClassStats {
    let roster = class_roster(&snapshot.students, class_id);

    let mut present = 0usize;
    let mut total = 0usize;
    for rec in &snapshot.attendance {
        if rec.class_id == class_id {
            total += 1;
            if rec.status == "present" {
                present += 1;
            }
        }
    }

    let mut percent_sum = 0.0;
    let mut grade_count = 0usize;
    for grade in &snapshot.grades {
        if roster.iter().any(|s| s.id == grade.student_id) {
            percent_sum += grade_percent(grade);
            grade_count += 1;
        }
    }
    let average_grade = if grade_count > 0 {
        round_percent(percent_sum / grade_count as f64)
    } else {
        0
    };

    ClassStats {
        total_students: roster.len() as i64,
        average_attendance: share_percent(present, total),
        average_grade,
    }
}

/// Excellent is checked first, then AtRisk, then the residual Good band.
/// A student with no data at all (0, 0) lands in AtRisk.
pub fn classify(stats: &StudentStats) -> RiskTier {
    if stats.average_grade >= 80 && stats.attendance_rate >= 90 {
        return RiskTier::Excellent;
    }
    if stats.average_grade < 60 || stats.attendance_rate < 70 {
        return RiskTier::AtRisk;
    }
    RiskTier::Good
}

/// Overview counts over a roster's per-student stats. "Below 60" skips
/// zero averages so no-data students are not counted as failing here,
/// even though classify() does treat them as at risk.
pub fn grade_cohorts(stats: &[StudentStats]) -> GradeCohorts {
    GradeCohorts {
        above_90: stats.iter().filter(|s| s.average_grade >= 90).count() as i64,
        above_80: stats.iter().filter(|s| s.average_grade >= 80).count() as i64,
        below_60: stats
            .iter()
            .filter(|s| s.average_grade < 60 && s.average_grade > 0)
            .count() as i64,
    }
}

/// Same shape for attendance; "Below 70" skips zero rates.
pub fn attendance_cohorts(stats: &[StudentStats]) -> AttendanceCohorts {
    AttendanceCohorts {
        perfect: stats.iter().filter(|s| s.attendance_rate == 100).count() as i64,
        above_90: stats.iter().filter(|s| s.attendance_rate >= 90).count() as i64,
        below_70: stats
            .iter()
            .filter(|s| s.attendance_rate < 70 && s.attendance_rate > 0)
            .count() as i64,
    }
}

/// Display name for a possibly-dangling student reference.
pub fn student_name<'a>(students: &'a [Student], student_id: &str) -> &'a str {
    students
        .iter()
        .find(|s| s.id == student_id)
        .map(|s| s.name.as_str())
        .unwrap_or(UNKNOWN_STUDENT)
}

/// Display name for a possibly-dangling assignment reference.
pub fn assignment_name<'a>(assignments: &'a [Assignment], assignment_id: &str) -> &'a str {
    assignments
        .iter()
        .find(|a| a.id == assignment_id)
        .map(|a| a.name.as_str())
        .unwrap_or(UNKNOWN_ASSIGNMENT)
}
