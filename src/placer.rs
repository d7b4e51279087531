//! Section placement: singleton period assignment, period spreading for
//! multi-section courses, enrolment balancing, and waitlist promotion
//! into freed seats.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};

use crate::config::Config;
use crate::enrollment::{promote_from_waitlist, sections_collide};
use crate::snapshot::Snapshot;
use crate::state::ScheduleState;
use crate::types::{CourseId, SectionId, SectionStatus, StudentId};

/// Outcome of singleton placement
#[derive(Debug, Clone, Default)]
pub struct PlacementReport {
    pub placed: Vec<(SectionId, u8)>,
    pub unplaced: Vec<SectionId>,
    pub warnings: Vec<String>,
}

/// Assign periods to singleton sections: demand-descending order, one
/// singleton per period from the preference list, so the periods a
/// student's singletons occupy stay pairwise distinct.
pub fn place_singletons(
    state: &mut ScheduleState,
    snapshot: &Snapshot,
    config: &Config,
    demand: &BTreeMap<CourseId, u32>,
) -> PlacementReport {
    let mut report = PlacementReport::default();

    let mut singletons: Vec<(u32, SectionId, CourseId)> = state
        .sections()
        .filter(|section| {
            snapshot
                .course(&section.course_id)
                .map(|c| c.is_singleton_offering())
                .unwrap_or(false)
        })
        .map(|section| {
            let d = demand.get(&section.course_id).copied().unwrap_or(0);
            (d, section.id.clone(), section.course_id.clone())
        })
        .collect();

    // Highest demand first, course id as the stable tie-break
    singletons.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.2.cmp(&b.2)));

    let mut used_periods: HashSet<u8> = HashSet::new();

    for (_, section_id, course_id) in singletons {
        let free = config
            .singleton_period_preference
            .iter()
            .copied()
            .filter(|p| *p >= 1 && *p <= config.periods_per_day)
            .find(|p| !used_periods.contains(p));

        match free {
            Some(period) => {
                used_periods.insert(period);
                let update = state.update_section(&section_id, |section| {
                    section.is_singleton = true;
                    section.period = Some(period);
                    section.status = SectionStatus::Scheduled;
                });
                if update.is_ok() {
                    report.placed.push((section_id, period));
                }
            }
            None => {
                report.warnings.push(format!(
                    "no free period left for singleton '{course_id}' (section '{section_id}')"
                ));
                let _ = state.update_section(&section_id, |section| {
                    section.is_singleton = true;
                });
                report.unplaced.push(section_id);
            }
        }
    }

    report
}

/// Spread the remaining unplaced sections across periods: least-loaded
/// period first, never reusing a period within the same course when
/// another one is free.
pub fn assign_remaining_periods(state: &mut ScheduleState, config: &Config) {
    let mut period_load: BTreeMap<u8, u32> = (1..=config.periods_per_day).map(|p| (p, 0)).collect();
    let mut course_periods: BTreeMap<CourseId, HashSet<u8>> = BTreeMap::new();

    for section in state.sections() {
        if let Some(period) = section.period {
            *period_load.entry(period).or_insert(0) += 1;
            course_periods
                .entry(section.course_id.clone())
                .or_default()
                .insert(period);
        }
    }

    let pending: Vec<(SectionId, CourseId)> = state
        .sections()
        .filter(|s| s.period.is_none())
        .map(|s| (s.id.clone(), s.course_id.clone()))
        .collect();

    for (section_id, course_id) in pending {
        let used_by_course = course_periods.entry(course_id.clone()).or_default();
        let best = (1..=config.periods_per_day)
            .min_by_key(|p| {
                let mut penalty = period_load.get(p).copied().unwrap_or(0);
                if used_by_course.contains(p) {
                    penalty += 1000;
                }
                (penalty, *p)
            })
            .unwrap_or(1);

        *period_load.entry(best).or_insert(0) += 1;
        used_by_course.insert(best);
        let _ = state.update_section(&section_id, |section| {
            section.period = Some(best);
            if section.status == SectionStatus::Open {
                section.status = SectionStatus::Scheduled;
            }
        });
    }
}

/// Outcome of the enrolment balancer
#[derive(Debug, Clone, Default)]
pub struct BalanceReport {
    pub moves: usize,
    pub iterations: u32,
}

fn can_move_student(
    state: &ScheduleState,
    student_id: &StudentId,
    from_id: &SectionId,
    to_id: &SectionId,
) -> bool {
    let Some(to) = state.section(to_id) else {
        return false;
    };
    if to.is_full() {
        return false;
    }
    state
        .sections_of_student(student_id)
        .into_iter()
        .filter(|other| &other.id != from_id && &other.id != to_id)
        .all(|other| !sections_collide(state, to, other))
}

/// Move real roster entries from over-full to under-full sections of the
/// same course until the spread is within one student, nothing can move
/// without a collision, or the iteration cap is hit.
pub fn balance_sections(state: &mut ScheduleState, config: &Config) -> BalanceReport {
    let mut report = BalanceReport::default();

    let courses: Vec<CourseId> = {
        let mut seen: Vec<CourseId> = state.sections().map(|s| s.course_id.clone()).collect();
        seen.sort();
        seen.dedup();
        seen
    };

    for _ in 0..config.balance_max_iterations {
        report.iterations += 1;
        let mut improved = false;

        for course_id in &courses {
            let mut sections: Vec<(usize, SectionId)> = state
                .sections_of_course(course_id)
                .into_iter()
                .map(|s| (s.enrollment(), s.id.clone()))
                .collect();
            if sections.len() < 2 {
                continue;
            }
            sections.sort();

            let (smallest_count, smallest_id) = sections.first().cloned().expect("non-empty");
            let (largest_count, largest_id) = sections.last().cloned().expect("non-empty");
            if largest_count as i64 - smallest_count as i64 <= 1 {
                continue;
            }

            let roster: Vec<StudentId> = state
                .section(&largest_id)
                .map(|s| s.enrolled_students.clone())
                .unwrap_or_default();

            for student_id in roster {
                if can_move_student(state, &student_id, &largest_id, &smallest_id) {
                    if state.record_unenrollment(&student_id, &largest_id).is_ok()
                        && state
                            .record_enrollment(student_id.clone(), &smallest_id)
                            .is_ok()
                    {
                        report.moves += 1;
                        improved = true;
                    }
                    break;
                }
            }
        }

        if !improved {
            break;
        }
    }

    report
}

/// Promote waitlisted students into any seats the balancer or manual
/// edits opened, course by course.
pub fn promote_waitlists(
    state: &mut ScheduleState,
    snapshot: &Snapshot,
    now: DateTime<Utc>,
) -> Vec<(CourseId, StudentId)> {
    let courses: Vec<CourseId> = state.waitlisted_courses().cloned().collect();
    let mut promoted = Vec::new();

    for course_id in courses {
        while let Some(student) = promote_from_waitlist(state, snapshot, &course_id, now) {
            promoted.push((course_id.clone(), student));
        }
    }

    promoted
}
