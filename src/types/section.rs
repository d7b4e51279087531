use serde::{Deserialize, Serialize};
use super::{CourseId, SectionId, StudentId};

/// Section lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionStatus {
    Open,
    Scheduled,
    Full,
    Closed,
}

impl SectionStatus {
    /// Statuses that accept new enrolments
    pub fn accepts_enrollment(&self) -> bool {
        matches!(self, SectionStatus::Open | SectionStatus::Scheduled)
    }
}

/// One offering of a course for which students enrol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseSection {
    pub id: SectionId,
    pub course_id: CourseId,
    /// 1-based period number, or None while unplaced
    #[serde(default)]
    pub period: Option<u8>,
    pub max_enrollment: u32,
    #[serde(default)]
    pub enrolled_students: Vec<StudentId>,
    #[serde(default = "default_status")]
    pub status: SectionStatus,
    #[serde(default)]
    pub is_singleton: bool,
}

fn default_status() -> SectionStatus {
    SectionStatus::Open
}

impl CourseSection {
    pub fn new(id: SectionId, course_id: CourseId, max_enrollment: u32) -> Self {
        Self {
            id,
            course_id,
            period: None,
            max_enrollment,
            enrolled_students: Vec::new(),
            status: SectionStatus::Open,
            is_singleton: false,
        }
    }

    pub fn enrollment(&self) -> usize {
        self.enrolled_students.len()
    }

    pub fn available_seats(&self) -> u32 {
        self.max_enrollment
            .saturating_sub(self.enrolled_students.len() as u32)
    }

    pub fn is_full(&self) -> bool {
        self.enrolled_students.len() >= self.max_enrollment as usize
    }

    pub fn has_student(&self, student_id: &StudentId) -> bool {
        self.enrolled_students.contains(student_id)
    }

    /// Enroll a student; capacity is the caller's concern (gated in the
    /// enrollment module)
    pub fn enroll(&mut self, student_id: StudentId) {
        if !self.has_student(&student_id) {
            self.enrolled_students.push(student_id);
        }
    }

    pub fn unenroll(&mut self, student_id: &StudentId) {
        self.enrolled_students.retain(|s| s != student_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrollment_accounting() {
        let mut section = CourseSection::new(
            SectionId("bio-1".to_string()),
            CourseId("bio".to_string()),
            2,
        );
        assert_eq!(section.available_seats(), 2);

        section.enroll(StudentId("s1".to_string()));
        section.enroll(StudentId("s1".to_string())); // idempotent
        section.enroll(StudentId("s2".to_string()));

        assert_eq!(section.enrollment(), 2);
        assert!(section.is_full());
        assert_eq!(section.available_seats(), 0);

        section.unenroll(&StudentId("s1".to_string()));
        assert_eq!(section.enrollment(), 1);
        assert!(!section.is_full());
    }

    #[test]
    fn test_status_gating() {
        assert!(SectionStatus::Open.accepts_enrollment());
        assert!(SectionStatus::Scheduled.accepts_enrollment());
        assert!(!SectionStatus::Full.accepts_enrollment());
        assert!(!SectionStatus::Closed.accepts_enrollment());
    }
}
