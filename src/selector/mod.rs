//! Per-student course selection: core subjects filled by sequential
//! continuation, grade-pattern preference, then subject fallback;
//! electives by continuation, recommended categories, then fill; all
//! under medical PE restrictions and capacity/qualification screens.

pub mod names;

use chrono::NaiveDate;

use crate::config::Config;
use crate::detector::{is_qualified, keyword_matches};
use crate::enrollment::check_prerequisites;
use crate::snapshot::Snapshot;
use crate::state::ScheduleState;
use crate::types::{CompletedCourse, Course, CourseId, Student, StudentId, Subject};
use names::names_match;

/// Final grade at or above which a completed course earns credit
const PASSING_GRADE: u8 = 60;

/// Outcome of selecting one student's course list
#[derive(Debug, Clone)]
pub struct StudentScheduleResult {
    pub student_id: StudentId,
    pub grade: u8,
    pub selected: Vec<CourseId>,
    pub warnings: Vec<String>,
    /// True when at least target - 1 courses were assigned
    pub success: bool,
}

struct Selection<'a> {
    student: &'a Student,
    snapshot: &'a Snapshot,
    state: &'a ScheduleState,
    config: &'a Config,
    today: NaiveDate,
    skip_pe: bool,
    selected: Vec<CourseId>,
    warnings: Vec<String>,
}

/// Build a course list for one student against the current state
pub fn select_courses(
    student: &Student,
    snapshot: &Snapshot,
    state: &ScheduleState,
    config: &Config,
    today: NaiveDate,
) -> StudentScheduleResult {
    let (core_target, elective_target) = config.core_elective_counts(student.grade);
    let target = core_target as usize + elective_target as usize;

    let mut selection = Selection {
        student,
        snapshot,
        state,
        config,
        today,
        skip_pe: false,
        selected: Vec::new(),
        warnings: Vec::new(),
    };

    selection.scan_medical_notes();
    selection.pick_core(core_target as usize);
    selection.pick_electives(elective_target as usize);
    selection.validate();

    let success = selection.selected.len() + 1 >= target;
    StudentScheduleResult {
        student_id: student.id.clone(),
        grade: student.grade,
        selected: selection.selected,
        warnings: selection.warnings,
        success,
    }
}

impl<'a> Selection<'a> {
    fn scan_medical_notes(&mut self) {
        let notes = self.student.medical_notes.to_lowercase();
        if notes.is_empty() {
            return;
        }
        for keyword in &self.config.medical_pe_restriction_keywords {
            if notes.contains(&keyword.to_lowercase()) {
                self.skip_pe = true;
                self.warnings.push(format!(
                    "⚠ Medical alert: PE excluded (notes mention '{keyword}')"
                ));
                return;
            }
        }
    }

    fn history(&self) -> &[CompletedCourse] {
        self.snapshot.history_of(&self.student.id)
    }

    fn already_completed(&self, course: &Course) -> bool {
        self.history().iter().any(|done| {
            done.course_id == course.id && done.final_grade >= PASSING_GRADE
        })
    }

    fn is_pe_course(&self, course: &Course) -> bool {
        self.config.pe_keywords.iter().any(|kw| {
            keyword_matches(&course.name, kw) || keyword_matches(course.subject.name(), kw)
        })
    }

    /// Capacity and staffing screen. Seat counts are re-checked at
    /// actual enrolment because they change across students.
    fn course_available(&self, course: &Course) -> bool {
        if !course.active {
            return false;
        }
        let staffed = self
            .snapshot
            .teachers()
            .any(|t| is_qualified(t, course, self.today));
        if !staffed {
            return false;
        }
        let sections = self.state.sections_of_course(&course.id);
        if sections.is_empty() {
            course.max_students > 0
        } else {
            sections
                .iter()
                .any(|s| !s.is_full() && s.status.accepts_enrollment())
        }
    }

    fn selectable(&self, course: &Course) -> bool {
        !self.selected.contains(&course.id)
            && !self.already_completed(course)
            && !(self.skip_pe && self.is_pe_course(course))
            && self.course_available(course)
    }

    /// Candidates in a subject, id-ordered for deterministic fallbacks
    fn subject_candidates(&self, subject: Subject) -> Vec<&'a Course> {
        let mut ids: Vec<&CourseId> = self.snapshot.courses_in_subject(subject).iter().collect();
        ids.sort();
        ids.into_iter()
            .filter_map(|id| self.snapshot.course(id))
            .collect()
    }

    /// Completed-course names in this subject, most recent term first
    fn completed_in_subject(&self, subject: Subject) -> Vec<String> {
        let mut done: Vec<(&str, &CompletedCourse)> = self
            .history()
            .iter()
            .filter_map(|entry| {
                let course = self.snapshot.course(&entry.course_id)?;
                (course.subject == subject && entry.final_grade >= PASSING_GRADE)
                    .then_some((course.name.as_str(), entry))
            })
            .collect();
        done.sort_by(|a, b| b.1.term.cmp(&a.1.term));
        done.into_iter().map(|(name, _)| name.to_string()).collect()
    }

    fn pick_core(&mut self, core_target: usize) {
        let mut picked = 0usize;
        for subject in Subject::CORE {
            if picked >= core_target {
                break;
            }
            if self.pick_core_subject(subject) {
                picked += 1;
            } else {
                self.warnings
                    .push(format!("No available {subject} course for grade {}", self.student.grade));
            }
        }
    }

    fn pick_core_subject(&mut self, subject: Subject) -> bool {
        let candidates = self.subject_candidates(subject);

        // a. Sequential continuation from completed coursework
        for completed_name in self.completed_in_subject(subject) {
            for next_name in self.config.sequence_after(&completed_name) {
                let hit = candidates
                    .iter()
                    .find(|c| names_match(&c.name, next_name) && self.selectable(c));
                if let Some(course) = hit {
                    let id = course.id.clone();
                    let name = course.name.clone();
                    self.selected.push(id);
                    self.warnings.push(format!(
                        "✓ State/federal standard: {name} ({subject})"
                    ));
                    self.warnings.push(format!(
                        "Sequential pick: {name} follows {completed_name}"
                    ));
                    return true;
                }
            }
        }

        // b. Grade-pattern preference
        for preferred in self.config.patterns_for(self.student.grade, subject) {
            let hit = candidates
                .iter()
                .find(|c| names_match(&c.name, preferred) && self.selectable(c));
            if let Some(course) = hit {
                let id = course.id.clone();
                let name = course.name.clone();
                self.selected.push(id);
                self.warnings
                    .push(format!("✓ State/federal standard: {name} ({subject})"));
                return true;
            }
        }

        // c. Any active course in the subject
        if let Some(course) = candidates.iter().find(|c| self.selectable(c)) {
            let id = course.id.clone();
            let name = course.name.clone();
            self.selected.push(id);
            self.warnings
                .push(format!("✓ State/federal standard: {name} ({subject})"));
            self.warnings
                .push(format!("Fallback pick: {name} for {subject}"));
            return true;
        }

        false
    }

    /// Elective candidates across all non-core subjects, id-ordered
    fn elective_candidates(&self) -> Vec<&'a Course> {
        let mut courses: Vec<&Course> = self
            .snapshot
            .courses()
            .filter(|c| c.is_elective())
            .collect();
        courses.sort_by(|a, b| a.id.cmp(&b.id));
        courses
    }

    fn pick_electives(&mut self, elective_target: usize) {
        let mut picked = 0usize;

        // a. Continue electives from prior years
        let completed: Vec<String> = self
            .history()
            .iter()
            .filter(|e| e.final_grade >= PASSING_GRADE)
            .filter_map(|e| self.snapshot.course(&e.course_id))
            .filter(|c| c.is_elective())
            .map(|c| c.name.clone())
            .collect();
        for completed_name in completed {
            if picked >= elective_target {
                return;
            }
            for next_name in self.config.sequence_after(&completed_name) {
                let hit = self
                    .elective_candidates()
                    .into_iter()
                    .find(|c| names_match(&c.name, next_name) && self.selectable(c));
                if let Some(course) = hit {
                    let name = course.name.clone();
                    self.selected.push(course.id.clone());
                    self.warnings.push(format!(
                        "Sequential elective: {name} follows {completed_name}"
                    ));
                    picked += 1;
                    break;
                }
            }
        }

        // b. Recommended categories for the grade
        let categories: Vec<String> = self
            .config
            .elective_categories(self.student.grade)
            .to_vec();
        for category in categories {
            if picked >= elective_target {
                return;
            }
            let hit = self.elective_candidates().into_iter().find(|c| {
                (keyword_matches(&c.name, &category)
                    || keyword_matches(c.subject.name(), &category))
                    && self.selectable(c)
            });
            if let Some(course) = hit {
                self.selected.push(course.id.clone());
                picked += 1;
            }
        }

        // c. Fill with anything left
        while picked < elective_target {
            let hit = self
                .elective_candidates()
                .into_iter()
                .find(|c| self.selectable(c));
            match hit {
                Some(course) => {
                    self.selected.push(course.id.clone());
                    picked += 1;
                }
                None => {
                    self.warnings.push(format!(
                        "Only {picked} of {elective_target} electives available"
                    ));
                    return;
                }
            }
        }
    }

    fn validate(&mut self) {
        // Prerequisite screen: warn, never fail, at selection time
        for course_id in self.selected.clone() {
            let check = check_prerequisites(self.snapshot, &self.student.id, &course_id);
            if !check.satisfied {
                let name = self
                    .snapshot
                    .course(&course_id)
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| course_id.to_string());
                self.warnings.push(format!(
                    "Prerequisite deficit for {name}: needs {}",
                    check.unsatisfied_groups.join("; ")
                ));
            }
        }

        // Graduation-credit projection
        let earned: f64 = self
            .history()
            .iter()
            .filter(|e| e.final_grade >= PASSING_GRADE)
            .filter_map(|e| self.snapshot.course(&e.course_id))
            .map(|c| c.credits)
            .sum();
        let enrolled: f64 = self
            .selected
            .iter()
            .filter_map(|id| self.snapshot.course(id))
            .map(|c| c.credits)
            .sum();
        let projected = earned + enrolled;

        if self.student.grade == 12 {
            let required = self.config.required_graduation_credits;
            if projected < required {
                self.warnings.push(format!(
                    "⚠ Graduation risk: projected {projected:.1} of {required:.1} required credits"
                ));
            } else {
                self.warnings
                    .push(format!("On track: projected {projected:.1} credits"));
            }
        } else if let Some(expected) = self.config.expected_credits(self.student.grade) {
            if expected - projected >= 2.0 {
                self.warnings.push(format!(
                    "⚠ Credit deficit: projected {projected:.1} of expected {expected:.1}"
                ));
            }
        }
    }
}
