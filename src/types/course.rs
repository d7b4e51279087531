use serde::{Deserialize, Serialize};
use std::fmt;
use super::CourseId;

/// Closed set of course subjects
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Subject {
    English,
    Mathematics,
    Science,
    SocialStudies,
    History,
    ForeignLanguage,
    ComputerScience,
    Art,
    Music,
    PhysicalEducation,
}

impl Subject {
    /// Core academic subjects, in the order the selector fills them
    pub const CORE: [Subject; 5] = [
        Subject::English,
        Subject::Mathematics,
        Subject::Science,
        Subject::SocialStudies,
        Subject::History,
    ];

    pub fn is_core(&self) -> bool {
        Subject::CORE.contains(self)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Subject::English => "English",
            Subject::Mathematics => "Mathematics",
            Subject::Science => "Science",
            Subject::SocialStudies => "Social Studies",
            Subject::History => "History",
            Subject::ForeignLanguage => "Foreign Language",
            Subject::ComputerScience => "Computer Science",
            Subject::Art => "Art",
            Subject::Music => "Music",
            Subject::PhysicalEducation => "Physical Education",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// School level a course is taught at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CourseLevel {
    MiddleSchool,
    HighSchool,
}

impl CourseLevel {
    /// Inclusive grade band covered by the level
    pub fn grade_band(&self) -> (u8, u8) {
        match self {
            CourseLevel::MiddleSchool => (6, 8),
            CourseLevel::HighSchool => (9, 12),
        }
    }
}

/// One prerequisite option: a course completed with at least `min_grade`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prerequisite {
    pub course: CourseId,
    /// Minimum final grade 0-100
    pub min_grade: u8,
}

/// A disjunction of prerequisite options. A course's prerequisites are
/// the conjunction of its groups (AND of ORs). Serializes as the bare
/// option list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrerequisiteGroup {
    pub options: Vec<Prerequisite>,
}

/// A course offering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub subject: Subject,
    #[serde(default)]
    pub level: Option<CourseLevel>,
    /// Maximum students per section
    pub max_students: u32,
    /// Certifications a teacher must hold (any one suffices)
    #[serde(default)]
    pub required_certifications: Vec<String>,
    #[serde(default)]
    pub is_singleton: bool,
    #[serde(default = "default_sections_needed")]
    pub num_sections_needed: u8,
    #[serde(default)]
    pub requires_lab: bool,
    /// Equipment the assigned room must provide (e.g. "kiln", "projector")
    #[serde(default)]
    pub required_equipment: Vec<String>,
    #[serde(default = "default_credits")]
    pub credits: f64,
    #[serde(default = "default_course_active")]
    pub active: bool,
}

fn default_sections_needed() -> u8 {
    1
}

fn default_credits() -> f64 {
    1.0
}

fn default_course_active() -> bool {
    true
}

impl Course {
    /// Singleton courses are offered as exactly one section per year
    pub fn is_singleton_offering(&self) -> bool {
        self.is_singleton || self.num_sections_needed == 1
    }

    pub fn is_elective(&self) -> bool {
        !self.subject.is_core()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_subject_classification() {
        assert!(Subject::Mathematics.is_core());
        assert!(Subject::History.is_core());
        assert!(!Subject::Art.is_core());
        assert!(!Subject::PhysicalEducation.is_core());
    }

    #[test]
    fn test_singleton_offering() {
        let mut course = Course {
            id: CourseId("ap-art".to_string()),
            name: "AP Studio Art".to_string(),
            subject: Subject::Art,
            level: Some(CourseLevel::HighSchool),
            max_students: 20,
            required_certifications: vec![],
            is_singleton: false,
            num_sections_needed: 1,
            requires_lab: false,
            required_equipment: vec![],
            credits: 1.0,
            active: true,
        };
        assert!(course.is_singleton_offering());

        course.num_sections_needed = 3;
        assert!(!course.is_singleton_offering());

        course.is_singleton = true;
        assert!(course.is_singleton_offering());
    }
}
