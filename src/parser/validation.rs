//! Cross-reference validation of a loaded snapshot before any pipeline
//! run. Errors abort; warnings ride along with the run's output.

use chrono::NaiveDate;

use crate::config::Config;
use crate::detector::is_qualified;
use crate::error::Result;
use crate::snapshot::Snapshot;

/// Validation result with collected errors and warnings
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }
}

/// Validate snapshot contents against each other and the config
pub fn validate_snapshot(
    snapshot: &Snapshot,
    config: &Config,
    today: NaiveDate,
) -> Result<ValidationResult> {
    let mut result = ValidationResult::default();

    // Every active course needs at least one qualified, current teacher
    for course in snapshot.courses() {
        if !course.active {
            continue;
        }
        let staffed = snapshot
            .teachers()
            .any(|t| is_qualified(t, course, today));
        if !staffed {
            result.add_error(format!(
                "Course '{}' has no qualified teachers",
                course.id
            ));
        }
    }

    // Course sizes a room can actually hold
    let max_room_capacity = snapshot.rooms().map(|r| r.capacity).max().unwrap_or(0);
    for course in snapshot.courses() {
        if course.max_students > max_room_capacity {
            result.add_warning(format!(
                "Course '{}' max_students ({}) exceeds largest room capacity ({})",
                course.id, course.max_students, max_room_capacity
            ));
        }
        if course.max_students == 0 {
            result.add_error(format!("Course '{}' has zero max_students", course.id));
        }
    }

    // Grade levels the selector tables understand
    for student in snapshot.students() {
        if !(8..=12).contains(&student.grade) {
            result.add_warning(format!(
                "Student '{}' has unusual grade level: {}",
                student.id, student.grade
            ));
        }
    }

    // Expiring credentials are worth surfacing before staffing
    for teacher in snapshot.teachers() {
        for cert in &teacher.certifications {
            if cert.is_expired(today) {
                result.add_warning(format!(
                    "Teacher '{}' certification '{}' is expired",
                    teacher.id, cert.name
                ));
            }
        }
    }

    // Prerequisites naming unknown courses can never be satisfied
    for course in snapshot.courses() {
        for group in snapshot.prerequisites_of(&course.id) {
            for option in &group.options {
                if snapshot.course(&option.course).is_none() {
                    result.add_warning(format!(
                        "Course '{}' prerequisite references unknown course '{}'",
                        course.id, option.course
                    ));
                }
            }
        }
    }

    // Config sanity
    if config.lunch_window.0 >= config.lunch_window.1 {
        result.add_warning("configured lunch window is empty".to_string());
    }
    if config.periods_per_day == 0 {
        result.add_error("periods_per_day must be at least 1".to_string());
    }

    if !result.is_valid() {
        return Err(anyhow::anyhow!(
            "Validation failed with {} errors:\n{}",
            result.errors.len(),
            result.errors.join("\n")
        ));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::DataSource;
    use crate::types::*;

    struct UnstaffedSource;

    impl DataSource for UnstaffedSource {
        fn students(&self) -> Vec<Student> {
            vec![Student {
                id: StudentId("s1".to_string()),
                name: "Seventh Grader".to_string(),
                active: true,
                grade: 7,
                medical_notes: String::new(),
                has_iep: false,
                iep_review_date: None,
            }]
        }

        fn teachers(&self) -> Vec<Teacher> {
            vec![Teacher {
                id: TeacherId("t1".to_string()),
                name: "History Only".to_string(),
                department: "History".to_string(),
                active: true,
                certifications: vec![Certification {
                    name: "Secondary History".to_string(),
                    subjects: vec![Subject::History],
                    grade_range: Some((9, 12)),
                    expires: None,
                }],
            }]
        }

        fn courses(&self) -> Vec<Course> {
            vec![Course {
                id: CourseId("chem".to_string()),
                name: "Chemistry".to_string(),
                subject: Subject::Science,
                level: Some(CourseLevel::HighSchool),
                max_students: 24,
                required_certifications: vec!["Secondary Science".to_string()],
                is_singleton: false,
                num_sections_needed: 1,
                requires_lab: true,
                required_equipment: vec![],
                credits: 1.0,
                active: true,
            }]
        }

        fn rooms(&self) -> Vec<Room> {
            vec![]
        }

        fn history(&self, _: &StudentId) -> Vec<CompletedCourse> {
            vec![]
        }

        fn prerequisites(&self, _: &CourseId) -> Vec<PrerequisiteGroup> {
            vec![]
        }

        fn sections(&self, _: &CourseId) -> Vec<CourseSection> {
            vec![]
        }
    }

    #[test]
    fn test_unstaffed_course_fails_validation() {
        let snapshot = Snapshot::from_source(&UnstaffedSource).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 8, 20).unwrap();

        let outcome = validate_snapshot(&snapshot, &Config::default(), today);
        assert!(outcome.is_err());
        assert!(outcome
            .unwrap_err()
            .to_string()
            .contains("no qualified teachers"));
    }
}
