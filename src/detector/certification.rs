//! Certification-to-course matching: tolerant string rules plus
//! grade-level refinement.

use chrono::NaiveDate;

use crate::types::{Course, Teacher};

/// Outcome of matching a teacher against a course's requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertMatch {
    /// A certification matches, grade range included
    Full,
    /// Name matched but the certification's grade range excludes the
    /// course level
    GradeMismatch,
    /// No certification matches
    None,
}

fn tokens(s: &str) -> Vec<String> {
    s.split([' ', '-'])
        .map(str::trim)
        .filter(|t| t.len() > 3)
        .map(str::to_lowercase)
        .collect()
}

/// Tolerant certification-name match:
/// 1. exact (case-insensitive, trimmed), or
/// 2. substring containment either direction, or
/// 3. at least half the significant tokens (longer than 3 chars) shared.
pub fn certification_names_match(a: &str, b: &str) -> bool {
    let a_norm = a.trim().to_lowercase();
    let b_norm = b.trim().to_lowercase();
    if a_norm.is_empty() || b_norm.is_empty() {
        return false;
    }
    if a_norm == b_norm {
        return true;
    }
    if a_norm.contains(&b_norm) || b_norm.contains(&a_norm) {
        return true;
    }

    let ta = tokens(&a_norm);
    let tb = tokens(&b_norm);
    if ta.is_empty() || tb.is_empty() {
        return false;
    }
    let common = ta.iter().filter(|t| tb.contains(t)).count();
    2 * common >= ta.len().max(tb.len())
}

/// Match a teacher's valid certifications against a course. Expired
/// certifications never match.
pub fn match_teacher_to_course(teacher: &Teacher, course: &Course, today: NaiveDate) -> CertMatch {
    let band = course.level.map(|l| l.grade_band());
    let mut best = CertMatch::None;

    for cert in teacher.valid_certifications(today) {
        let name_hit = if course.required_certifications.is_empty() {
            // Courses without explicit requirements match on subject tags
            cert.subjects.contains(&course.subject)
        } else {
            course.required_certifications.iter().any(|required| {
                certification_names_match(required, &cert.name)
                    || cert
                        .subjects
                        .iter()
                        .any(|s| certification_names_match(required, s.name()))
            })
        };
        if !name_hit {
            continue;
        }

        let grades_ok = band.map(|b| cert.covers_grades(b)).unwrap_or(true);
        if grades_ok {
            return CertMatch::Full;
        }
        best = CertMatch::GradeMismatch;
    }

    best
}

/// Shorthand used by the selector and placers
pub fn is_qualified(teacher: &Teacher, course: &Course, today: NaiveDate) -> bool {
    teacher.active && match_teacher_to_course(teacher, course, today) == CertMatch::Full
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Certification, CourseId, CourseLevel, Subject, TeacherId};

    fn teacher(certs: Vec<Certification>) -> Teacher {
        Teacher {
            id: TeacherId("t1".to_string()),
            name: "Teacher".to_string(),
            department: "Mathematics".to_string(),
            active: true,
            certifications: certs,
        }
    }

    fn course(required: &[&str], level: Option<CourseLevel>) -> Course {
        Course {
            id: CourseId("alg1".to_string()),
            name: "Algebra 1".to_string(),
            subject: Subject::Mathematics,
            level,
            max_students: 30,
            required_certifications: required.iter().map(|s| s.to_string()).collect(),
            is_singleton: false,
            num_sections_needed: 2,
            requires_lab: false,
            required_equipment: vec![],
            credits: 1.0,
            active: true,
        }
    }

    fn cert(name: &str, grade_range: Option<(u8, u8)>) -> Certification {
        Certification {
            name: name.to_string(),
            subjects: vec![Subject::Mathematics],
            grade_range,
            expires: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 20).unwrap()
    }

    #[test]
    fn test_exact_and_substring_match() {
        assert!(certification_names_match("Mathematics", "mathematics"));
        assert!(certification_names_match(
            "Mathematics",
            "Secondary Mathematics"
        ));
        assert!(certification_names_match(
            "Secondary Mathematics Certification",
            "Mathematics"
        ));
        assert!(!certification_names_match("Mathematics", "History"));
    }

    #[test]
    fn test_token_overlap_match() {
        // Shares "secondary" and "mathematics": 2 of max(2, 3) tokens
        assert!(certification_names_match(
            "Mathematics Secondary",
            "Secondary Mathematics Certification"
        ));
        // No significant tokens shared
        assert!(!certification_names_match(
            "Advanced Placement Calculus",
            "World History Teaching"
        ));
        // Short tokens are ignored entirely
        assert!(!certification_names_match("K-8 Gen Ed", "9-12 Sci Ed"));
    }

    #[test]
    fn test_grade_range_refinement() {
        let hs_course = course(&["Mathematics"], Some(CourseLevel::HighSchool));

        let qualified = teacher(vec![cert("Secondary Mathematics", Some((9, 12)))]);
        assert_eq!(
            match_teacher_to_course(&qualified, &hs_course, today()),
            CertMatch::Full
        );

        let middle_only = teacher(vec![cert("Middle Mathematics", Some((6, 8)))]);
        assert_eq!(
            match_teacher_to_course(&middle_only, &hs_course, today()),
            CertMatch::GradeMismatch
        );

        let unknown_level = course(&["Mathematics"], None);
        assert_eq!(
            match_teacher_to_course(&middle_only, &unknown_level, today()),
            CertMatch::Full
        );
    }

    #[test]
    fn test_expired_certification_never_matches() {
        let mut expired = cert("Secondary Mathematics", Some((9, 12)));
        expired.expires = NaiveDate::from_ymd_opt(2024, 6, 30);
        let t = teacher(vec![expired]);

        assert_eq!(
            match_teacher_to_course(&t, &course(&["Mathematics"], None), today()),
            CertMatch::None
        );
    }

    #[test]
    fn test_subject_tag_fallback_when_no_requirements() {
        let unrestricted = course(&[], Some(CourseLevel::HighSchool));
        let t = teacher(vec![cert("Anything At All", Some((9, 12)))]);
        assert_eq!(
            match_teacher_to_course(&t, &unrestricted, today()),
            CertMatch::Full
        );
    }
}
