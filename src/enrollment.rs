//! Enrolment gating and waitlists. Every roster mutation funnels through
//! `enroll`/`unenroll` here; the gate enforces the AND-of-ORs
//! prerequisite formula, student/section status, IEP review currency,
//! and period collisions.

use chrono::{DateTime, Utc};

use crate::error::{Result, SchedulerError};
use crate::snapshot::Snapshot;
use crate::state::ScheduleState;
use crate::types::{
    CourseId, CourseSection, PrerequisiteGroup, SectionId, StudentId, WaitlistEntry,
    WaitlistStatus,
};

/// Result of checking a student's history against a course's
/// prerequisite groups
#[derive(Debug, Clone)]
pub struct PrereqCheck {
    pub satisfied: bool,
    /// Human-readable descriptions of groups the student satisfies
    pub satisfied_groups: Vec<String>,
    /// Descriptions of unmet groups, with the grade requirement shown
    pub unsatisfied_groups: Vec<String>,
}

fn course_name(snapshot: &Snapshot, id: &CourseId) -> String {
    snapshot
        .course(id)
        .map(|c| c.name.clone())
        .unwrap_or_else(|| id.to_string())
}

fn group_satisfied(snapshot: &Snapshot, student: &StudentId, group: &PrerequisiteGroup) -> bool {
    let history = snapshot.history_of(student);
    group.options.iter().any(|option| {
        history
            .iter()
            .any(|done| done.course_id == option.course && done.final_grade >= option.min_grade)
    })
}

/// A group is satisfied by any one completed option at its minimum
/// grade; the course requires every group.
pub fn check_prerequisites(
    snapshot: &Snapshot,
    student: &StudentId,
    course: &CourseId,
) -> PrereqCheck {
    let mut satisfied_groups = Vec::new();
    let mut unsatisfied_groups = Vec::new();

    for group in snapshot.prerequisites_of(course) {
        if group.options.is_empty() {
            continue;
        }
        if group_satisfied(snapshot, student, group) {
            let desc = group
                .options
                .iter()
                .map(|o| course_name(snapshot, &o.course))
                .collect::<Vec<_>>()
                .join(" OR ");
            satisfied_groups.push(desc);
        } else {
            let desc = group
                .options
                .iter()
                .map(|o| {
                    format!(
                        "{} (Grade: {}+)",
                        course_name(snapshot, &o.course),
                        o.min_grade
                    )
                })
                .collect::<Vec<_>>()
                .join(" OR ");
            unsatisfied_groups.push(desc);
        }
    }

    PrereqCheck {
        satisfied: unsatisfied_groups.is_empty(),
        satisfied_groups,
        unsatisfied_groups,
    }
}

/// Gate verdict for one (student, section) pair
#[derive(Debug, Clone)]
pub struct GateDecision {
    pub allowed: bool,
    pub reasons: Vec<String>,
    pub prereq: PrereqCheck,
}

/// Period collision: compare assigned period numbers first; only when
/// either side is unplaced fall back to interval overlap of the
/// sections' slots.
pub(crate) fn sections_collide(
    state: &ScheduleState,
    section: &CourseSection,
    other: &CourseSection,
) -> bool {
    if let (Some(a), Some(b)) = (section.period, other.period) {
        return a == b;
    }
    let slots_a = state.slots_of_section(&section.id);
    let slots_b = state.slots_of_section(&other.id);
    slots_a
        .iter()
        .any(|sa| slots_b.iter().any(|sb| sa.overlaps(sb)))
}

/// Apply every gate for enrolling `student` into `section`
pub fn can_enroll(
    state: &ScheduleState,
    snapshot: &Snapshot,
    student_id: &StudentId,
    section_id: &SectionId,
    now: DateTime<Utc>,
) -> GateDecision {
    let mut reasons = Vec::new();

    let section = state.section(section_id);
    let Some(section) = section else {
        return GateDecision {
            allowed: false,
            reasons: vec![format!("section '{section_id}' does not exist")],
            prereq: PrereqCheck {
                satisfied: true,
                satisfied_groups: vec![],
                unsatisfied_groups: vec![],
            },
        };
    };

    match snapshot.student(student_id) {
        None => reasons.push(format!("student '{student_id}' not in snapshot")),
        Some(student) => {
            if !student.active {
                reasons.push(format!("student '{student_id}' is inactive"));
            }
            if student.iep_review_overdue(now.date_naive()) {
                reasons.push(format!(
                    "student '{student_id}' has an overdue IEP accommodation review"
                ));
            }
        }
    }

    if !section.status.accepts_enrollment() {
        reasons.push(format!(
            "section '{section_id}' is not open for enrollment"
        ));
    }

    let prereq = check_prerequisites(snapshot, student_id, &section.course_id);
    if !prereq.satisfied {
        reasons.push(format!(
            "prerequisites not met: {}",
            prereq.unsatisfied_groups.join("; ")
        ));
    }

    for other in state.sections_of_student(student_id) {
        if other.id != section.id && sections_collide(state, section, other) {
            reasons.push(format!(
                "period collision with section '{}'",
                other.id
            ));
        }
    }

    GateDecision {
        allowed: reasons.is_empty(),
        reasons,
        prereq,
    }
}

/// Outcome of a gated enrolment attempt
#[derive(Debug, Clone)]
pub enum EnrollOutcome {
    Enrolled { section_id: SectionId },
    Waitlisted { position: u32 },
    Rejected { reasons: Vec<String> },
}

/// Enrol a student into the best section of a course. Gate-passing full
/// sections waitlist the student; gate failures reject.
pub fn enroll(
    state: &mut ScheduleState,
    snapshot: &Snapshot,
    student_id: &StudentId,
    course_id: &CourseId,
    priority_weight: u32,
    now: DateTime<Utc>,
) -> Result<EnrollOutcome> {
    let mut candidates: Vec<(usize, SectionId)> = state
        .sections_of_course(course_id)
        .into_iter()
        .map(|s| (s.enrollment(), s.id.clone()))
        .collect();
    if candidates.is_empty() {
        return Ok(EnrollOutcome::Rejected {
            reasons: vec![format!("course '{course_id}' has no sections")],
        });
    }
    // Least-loaded first keeps sections balanced as enrolment proceeds
    candidates.sort();

    let mut reasons = Vec::new();
    let mut saw_full_candidate = false;

    for (_, section_id) in &candidates {
        let decision = can_enroll(state, snapshot, student_id, section_id, now);
        if !decision.allowed {
            reasons.extend(decision.reasons);
            continue;
        }
        let section = state.section(section_id).ok_or(SchedulerError::NotFound {
            kind: "section",
            id: section_id.to_string(),
        })?;
        if section.is_full() {
            saw_full_candidate = true;
            continue;
        }
        state.record_enrollment(student_id.clone(), section_id)?;
        return Ok(EnrollOutcome::Enrolled {
            section_id: section_id.clone(),
        });
    }

    if saw_full_candidate {
        let position = add_to_waitlist(state, course_id, student_id, priority_weight, now);
        return Ok(EnrollOutcome::Waitlisted { position });
    }

    reasons.sort();
    reasons.dedup();
    Ok(EnrollOutcome::Rejected { reasons })
}

/// Cancel an enrolment, then try to promote from the course waitlist
/// into the freed seat.
pub fn unenroll(
    state: &mut ScheduleState,
    snapshot: &Snapshot,
    student_id: &StudentId,
    section_id: &SectionId,
    now: DateTime<Utc>,
) -> Result<Option<StudentId>> {
    let course_id = state
        .section(section_id)
        .ok_or(SchedulerError::NotFound {
            kind: "section",
            id: section_id.to_string(),
        })?
        .course_id
        .clone();
    state.record_unenrollment(student_id, section_id)?;
    Ok(promote_from_waitlist(state, snapshot, &course_id, now))
}

/// Append to a course waitlist at the next dense position. Re-adding an
/// already-active student is a no-op returning their position.
pub fn add_to_waitlist(
    state: &mut ScheduleState,
    course_id: &CourseId,
    student_id: &StudentId,
    priority_weight: u32,
    now: DateTime<Utc>,
) -> u32 {
    let mut entries: Vec<WaitlistEntry> = state.waitlist(course_id).to_vec();

    if let Some(existing) = entries
        .iter()
        .find(|e| e.is_active() && &e.student_id == student_id)
    {
        return existing.position;
    }

    let position = entries.iter().filter(|e| e.is_active()).count() as u32 + 1;
    entries.push(WaitlistEntry {
        student_id: student_id.clone(),
        course_id: course_id.clone(),
        position,
        priority_weight,
        status: WaitlistStatus::Active,
        added_at: now,
        note: None,
    });
    state.set_waitlist(course_id.clone(), entries);
    position
}

/// Keep ACTIVE positions dense and strictly increasing from 1, in
/// queue order.
fn renumber(entries: &mut [WaitlistEntry]) {
    let mut next = 1u32;
    for entry in entries.iter_mut() {
        if entry.is_active() {
            entry.position = next;
            next += 1;
        }
    }
}

/// Promote the best waitlisted student into an open seat: highest
/// priority weight wins, earliest `added_at` breaks ties. Candidates
/// failing the gate are marked BYPASSED with the reason and the search
/// continues.
pub fn promote_from_waitlist(
    state: &mut ScheduleState,
    snapshot: &Snapshot,
    course_id: &CourseId,
    now: DateTime<Utc>,
) -> Option<StudentId> {
    let mut entries: Vec<WaitlistEntry> = state.waitlist(course_id).to_vec();
    if !entries.iter().any(WaitlistEntry::is_active) {
        return None;
    }

    let open_sections: Vec<SectionId> = state
        .sections_of_course(course_id)
        .into_iter()
        .filter(|s| !s.is_full() && s.status.accepts_enrollment())
        .map(|s| s.id.clone())
        .collect();
    if open_sections.is_empty() {
        return None;
    }

    let mut promoted: Option<StudentId> = None;
    let mut changed = false;

    loop {
        let candidate = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_active())
            .min_by_key(|(_, e)| (std::cmp::Reverse(e.priority_weight), e.added_at, e.position))
            .map(|(index, _)| index);
        let Some(index) = candidate else {
            break;
        };

        let student_id = entries[index].student_id.clone();
        let mut seat: Option<SectionId> = None;
        let mut gate_reason: Option<String> = None;
        let mut allowed_but_full = false;

        for section_id in &open_sections {
            let decision = can_enroll(state, snapshot, &student_id, section_id, now);
            if !decision.allowed {
                gate_reason = Some(decision.reasons.join("; "));
                continue;
            }
            let section_open = state
                .section(section_id)
                .map(|s| !s.is_full())
                .unwrap_or(false);
            if section_open {
                seat = Some(section_id.clone());
                break;
            }
            allowed_but_full = true;
        }

        match seat {
            Some(section_id) => {
                if state.record_enrollment(student_id.clone(), &section_id).is_ok() {
                    entries[index].status = WaitlistStatus::Enrolled;
                    promoted = Some(student_id);
                    changed = true;
                }
                break;
            }
            // Gate passes somewhere but every seat is taken: hold the
            // entry for the next opening
            None if allowed_but_full => break,
            None => match gate_reason {
                Some(reason) => {
                    entries[index].status = WaitlistStatus::Bypassed;
                    entries[index].note = Some(reason);
                    changed = true;
                }
                None => break,
            },
        }
    }

    if changed {
        renumber(&mut entries);
        state.set_waitlist(course_id.clone(), entries);
    }
    promoted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::DataSource;
    use crate::types::*;
    use chrono::TimeZone;

    struct PrereqSource;

    impl DataSource for PrereqSource {
        fn students(&self) -> Vec<Student> {
            vec![
                Student {
                    id: StudentId("s1".to_string()),
                    name: "Student One".to_string(),
                    active: true,
                    grade: 10,
                    medical_notes: String::new(),
                    has_iep: false,
                    iep_review_date: None,
                },
                Student {
                    id: StudentId("s2".to_string()),
                    name: "Student Two".to_string(),
                    active: true,
                    grade: 10,
                    medical_notes: String::new(),
                    has_iep: false,
                    iep_review_date: None,
                },
            ]
        }

        fn teachers(&self) -> Vec<Teacher> {
            vec![]
        }

        fn courses(&self) -> Vec<Course> {
            let course = |id: &str, name: &str| Course {
                id: CourseId(id.to_string()),
                name: name.to_string(),
                subject: Subject::Mathematics,
                level: None,
                max_students: 30,
                required_certifications: vec![],
                is_singleton: false,
                num_sections_needed: 1,
                requires_lab: false,
                required_equipment: vec![],
                credits: 1.0,
                active: true,
            };
            vec![
                course("alg-i", "Algebra I"),
                course("alg-1", "Algebra 1"),
                course("geo", "Geometry"),
                course("alg-2", "Algebra 2"),
            ]
        }

        fn rooms(&self) -> Vec<Room> {
            vec![]
        }

        fn history(&self, student: &StudentId) -> Vec<CompletedCourse> {
            if student.0 == "s1" {
                vec![
                    CompletedCourse {
                        course_id: CourseId("alg-1".to_string()),
                        final_grade: 72,
                        term: "2024-F".to_string(),
                    },
                    CompletedCourse {
                        course_id: CourseId("geo".to_string()),
                        final_grade: 55,
                        term: "2025-S".to_string(),
                    },
                ]
            } else {
                vec![]
            }
        }

        fn prerequisites(&self, course: &CourseId) -> Vec<PrerequisiteGroup> {
            if course.0 == "alg-2" {
                vec![
                    PrerequisiteGroup {
                        options: vec![
                            Prerequisite {
                                course: CourseId("alg-i".to_string()),
                                min_grade: 70,
                            },
                            Prerequisite {
                                course: CourseId("alg-1".to_string()),
                                min_grade: 70,
                            },
                        ],
                    },
                    PrerequisiteGroup {
                        options: vec![Prerequisite {
                            course: CourseId("geo".to_string()),
                            min_grade: 60,
                        }],
                    },
                ]
            } else {
                vec![]
            }
        }

        fn sections(&self, _: &CourseId) -> Vec<CourseSection> {
            vec![]
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 20, 7, 0, 0).unwrap()
    }

    fn state_with_section(id: &str, course: &str, period: u8, capacity: u32) -> ScheduleState {
        let mut state = ScheduleState::new();
        let mut section = CourseSection::new(
            SectionId(id.to_string()),
            CourseId(course.to_string()),
            capacity,
        );
        section.period = Some(period);
        section.status = SectionStatus::Scheduled;
        state.upsert_section(section);
        state
    }

    #[test]
    fn test_and_of_ors_prerequisites() {
        let snapshot = Snapshot::from_source(&PrereqSource).unwrap();
        let state = state_with_section("alg2-1", "alg-2", 3, 30);

        let decision = can_enroll(
            &state,
            &snapshot,
            &StudentId("s1".to_string()),
            &SectionId("alg2-1".to_string()),
            now(),
        );

        // Algebra 1 at 72 satisfies group one; Geometry at 55 misses 60
        assert!(!decision.allowed);
        assert_eq!(
            decision.prereq.satisfied_groups,
            vec!["Algebra I OR Algebra 1".to_string()]
        );
        assert_eq!(
            decision.prereq.unsatisfied_groups,
            vec!["Geometry (Grade: 60+)".to_string()]
        );
    }

    #[test]
    fn test_period_collision_by_number() {
        let snapshot = Snapshot::from_source(&PrereqSource).unwrap();
        let mut state = state_with_section("geo-1", "geo", 3, 30);
        state
            .record_enrollment(StudentId("s2".to_string()), &SectionId("geo-1".to_string()))
            .unwrap();

        let mut other = CourseSection::new(
            SectionId("alg1-1".to_string()),
            CourseId("alg-1".to_string()),
            30,
        );
        other.period = Some(3);
        other.status = SectionStatus::Scheduled;
        state.upsert_section(other);

        let decision = can_enroll(
            &state,
            &snapshot,
            &StudentId("s2".to_string()),
            &SectionId("alg1-1".to_string()),
            now(),
        );
        assert!(!decision.allowed);
        assert!(decision.reasons[0].contains("period collision"));
    }

    #[test]
    fn test_enroll_waitlists_when_full() {
        let snapshot = Snapshot::from_source(&PrereqSource).unwrap();
        let mut state = state_with_section("geo-1", "geo", 2, 1);

        let first = enroll(
            &mut state,
            &snapshot,
            &StudentId("s1".to_string()),
            &CourseId("geo".to_string()),
            1,
            now(),
        )
        .unwrap();
        assert!(matches!(first, EnrollOutcome::Enrolled { .. }));

        let second = enroll(
            &mut state,
            &snapshot,
            &StudentId("s2".to_string()),
            &CourseId("geo".to_string()),
            1,
            now(),
        )
        .unwrap();
        match second {
            EnrollOutcome::Waitlisted { position } => assert_eq!(position, 1),
            other => panic!("expected waitlist, got {other:?}"),
        }
    }

    #[test]
    fn test_waitlist_positions_stay_dense() {
        let mut state = ScheduleState::new();
        let course = CourseId("geo".to_string());
        let t0 = now();

        for (i, s) in ["a", "b", "c"].iter().enumerate() {
            let position = add_to_waitlist(
                &mut state,
                &course,
                &StudentId(s.to_string()),
                1,
                t0 + chrono::Duration::minutes(i as i64),
            );
            assert_eq!(position, i as u32 + 1);
        }

        let positions: Vec<u32> = state
            .waitlist(&course)
            .iter()
            .filter(|e| e.is_active())
            .map(|e| e.position)
            .collect();
        assert_eq!(positions, vec![1, 2, 3]);
    }

    #[test]
    fn test_promotion_prefers_priority_then_fifo() {
        let snapshot = Snapshot::from_source(&PrereqSource).unwrap();
        let mut state = state_with_section("geo-1", "geo", 2, 1);
        let course = CourseId("geo".to_string());
        let t0 = now();

        add_to_waitlist(&mut state, &course, &StudentId("s1".to_string()), 1, t0);
        add_to_waitlist(
            &mut state,
            &course,
            &StudentId("s2".to_string()),
            5,
            t0 + chrono::Duration::minutes(10),
        );

        // Seat available: highest priority weight wins despite later add
        let promoted = promote_from_waitlist(&mut state, &snapshot, &course, t0);
        assert_eq!(promoted, Some(StudentId("s2".to_string())));

        let entries = state.waitlist(&course);
        let s2 = entries.iter().find(|e| e.student_id.0 == "s2").unwrap();
        assert_eq!(s2.status, WaitlistStatus::Enrolled);

        // Remaining active entry renumbered to position 1
        let s1 = entries.iter().find(|e| e.student_id.0 == "s1").unwrap();
        assert!(s1.is_active());
        assert_eq!(s1.position, 1);
    }

    #[test]
    fn test_promotion_bypasses_gate_failures() {
        let snapshot = Snapshot::from_source(&PrereqSource).unwrap();
        // alg-2 requires Geometry at 60+; s1 has 55, s2 has no history
        let mut state = state_with_section("alg2-1", "alg-2", 2, 1);
        let course = CourseId("alg-2".to_string());
        let t0 = now();

        add_to_waitlist(&mut state, &course, &StudentId("s1".to_string()), 9, t0);

        let promoted = promote_from_waitlist(&mut state, &snapshot, &course, t0);
        assert_eq!(promoted, None);

        let entries = state.waitlist(&course);
        let s1 = entries.iter().find(|e| e.student_id.0 == "s1").unwrap();
        assert_eq!(s1.status, WaitlistStatus::Bypassed);
        assert!(s1.note.as_deref().unwrap().contains("prerequisites"));
    }
}
