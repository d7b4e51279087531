use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use super::{CourseId, StudentId};

/// A student as provided by the SIS read model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Grade level 8-12
    pub grade: u8,
    #[serde(default)]
    pub medical_notes: String,
    #[serde(default)]
    pub has_iep: bool,
    /// Accommodation review deadline; overdue reviews gate enrolment
    #[serde(default)]
    pub iep_review_date: Option<NaiveDate>,
}

fn default_active() -> bool {
    true
}

impl Student {
    /// True when `has_iep` and the accommodation review is past due
    pub fn iep_review_overdue(&self, today: NaiveDate) -> bool {
        self.has_iep
            && self
                .iep_review_date
                .map(|date| date < today)
                .unwrap_or(false)
    }
}

/// One completed-course history entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedCourse {
    pub course_id: CourseId,
    /// Final grade 0-100
    pub final_grade: u8,
    pub term: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iep_review_overdue() {
        let mut student = Student {
            id: StudentId("s1".to_string()),
            name: "Student".to_string(),
            active: true,
            grade: 9,
            medical_notes: String::new(),
            has_iep: true,
            iep_review_date: NaiveDate::from_ymd_opt(2025, 1, 15),
        };
        let today = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();

        assert!(student.iep_review_overdue(today));

        student.iep_review_date = NaiveDate::from_ymd_opt(2026, 1, 15);
        assert!(!student.iep_review_overdue(today));

        student.has_iep = false;
        student.iep_review_date = NaiveDate::from_ymd_opt(2025, 1, 15);
        assert!(!student.iep_review_overdue(today));
    }
}
