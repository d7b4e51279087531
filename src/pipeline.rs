//! Phased schedule generation driver: seed sections, select courses per
//! student, place and spread sections, staff and build the weekly slot
//! graph, run gated enrolment, balance, assign rooms, schedule lunch
//! waves, then detect, auto-resolve, and score.

use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::calendar::{DayOfWeek, TimeRange};
use crate::config::Config;
use crate::detector::{detect, is_qualified, DetectionReport};
use crate::enrollment;
use crate::error::Result;
use crate::fitness::{evaluate, FitnessReport};
use crate::placer;
use crate::resolver::{ResolveOptions, ResolveOutcome, Resolver};
use crate::selector::{select_courses, StudentScheduleResult};
use crate::snapshot::Snapshot;
use crate::sources::Clock;
use crate::state::ScheduleState;
use crate::types::{
    CourseId, CourseSection, SectionId, SlotSpec, StudentId, TeacherId,
};

/// Options for one full pipeline run
pub struct PipelineOptions {
    pub quiet: bool,
    pub resolve: ResolveOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            quiet: true,
            resolve: ResolveOptions::default(),
        }
    }
}

/// Everything a host needs after a run: the final state (with its write
/// log), per-student selections, the last detection pass, the score, and
/// what the resolver accomplished.
pub struct PipelineOutcome {
    pub state: ScheduleState,
    pub selections: Vec<StudentScheduleResult>,
    pub detection: DetectionReport,
    pub fitness: FitnessReport,
    pub resolve: ResolveOutcome,
    pub elapsed_ms: u64,
}

/// Generate a schedule from a snapshot
pub fn run_pipeline(
    snapshot: &Snapshot,
    config: &Config,
    clock: &dyn Clock,
    options: PipelineOptions,
) -> Result<PipelineOutcome> {
    let started = Instant::now();
    let now = clock.now();
    let today = now.date_naive();

    let progress = if options.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(100);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );
        pb
    };

    let mut state = ScheduleState::new();

    // Phase 1: seed working sections from the snapshot
    progress.set_message("Seeding sections...");
    progress.set_position(5);
    for course in snapshot.courses() {
        if !course.active {
            continue;
        }
        let seeded = snapshot.seeded_sections(&course.id);
        if seeded.is_empty() {
            for n in 1..=course.num_sections_needed.max(1) {
                let section = CourseSection::new(
                    SectionId(format!("{}-{n}", course.id)),
                    course.id.clone(),
                    course.max_students,
                );
                state.upsert_section(section);
            }
        } else {
            for section in seeded {
                state.upsert_section(section.clone());
            }
        }
    }

    // Phase 2: per-student course selection
    progress.set_message("Selecting courses per student...");
    progress.set_position(15);
    let mut selections: Vec<StudentScheduleResult> = Vec::new();
    let mut demand: BTreeMap<CourseId, u32> = BTreeMap::new();
    for student in snapshot.students() {
        if !student.active {
            continue;
        }
        let result = select_courses(student, snapshot, &state, config, today);
        for course_id in &result.selected {
            *demand.entry(course_id.clone()).or_insert(0) += 1;
        }
        selections.push(result);
    }

    // Phase 3: singleton placement by demand
    progress.set_message("Placing singletons...");
    progress.set_position(25);
    placer::place_singletons(&mut state, snapshot, config, &demand);

    // Phase 4: spread the remaining sections across periods
    progress.set_message("Assigning periods...");
    progress.set_position(35);
    placer::assign_remaining_periods(&mut state, config);

    // Phase 5: staff sections and build the weekly slot graph
    progress.set_message("Building weekly slots...");
    progress.set_position(45);
    build_slots(&mut state, snapshot, config, today);

    // Phase 6: gated enrolment, seniors first
    progress.set_message("Enrolling students...");
    progress.set_position(55);
    let mut ordered: Vec<&StudentScheduleResult> = selections.iter().collect();
    ordered.sort_by_key(|r| (std::cmp::Reverse(r.grade), r.student_id.clone()));
    for result in ordered {
        for course_id in &result.selected {
            let _ = enrollment::enroll(
                &mut state,
                snapshot,
                &result.student_id,
                course_id,
                result.grade as u32,
                now,
            )?;
        }
    }

    // Phase 7: balance multi-section courses
    progress.set_message("Balancing sections...");
    progress.set_position(65);
    placer::balance_sections(&mut state, config);

    // Phase 8: promote from waitlists into any opened seats
    progress.set_message("Promoting waitlists...");
    progress.set_position(70);
    placer::promote_waitlists(&mut state, snapshot, now);

    // Phase 9: room assignment, most-constrained sections first
    progress.set_message("Assigning rooms...");
    progress.set_position(75);
    assign_rooms(&mut state, snapshot);

    // Phase 10: lunch waves inside the configured window
    progress.set_message("Scheduling lunch waves...");
    progress.set_position(80);
    build_lunch_waves(&mut state, config);

    // Phase 11: detect, auto-resolve, re-detect, score
    progress.set_message("Resolving conflicts...");
    progress.set_position(85);
    let mut resolver = Resolver::new(snapshot, config);
    let resolve = resolver.auto_resolve(&mut state, now, &options.resolve);

    progress.set_message("Scoring...");
    progress.set_position(95);
    let detection = detect(&state, snapshot, config, now);
    let fitness = evaluate(&detection.conflicts, &state, config);

    progress.set_message("Complete");
    progress.set_position(100);
    progress.finish_with_message("Schedule generated");

    Ok(PipelineOutcome {
        state,
        selections,
        detection,
        fitness,
        resolve,
        elapsed_ms: started.elapsed().as_millis() as u64,
    })
}

/// Staff each placed section with the least-loaded qualified teacher and
/// create one slot per weekday at its period.
fn build_slots(
    state: &mut ScheduleState,
    snapshot: &Snapshot,
    config: &Config,
    today: chrono::NaiveDate,
) {
    let grid = config.grid();
    let mut teacher_load: BTreeMap<TeacherId, u32> = BTreeMap::new();

    let sections: Vec<(SectionId, CourseId, Option<u8>)> = state
        .sections()
        .map(|s| (s.id.clone(), s.course_id.clone(), s.period))
        .collect();

    for (section_id, course_id, period) in sections {
        let Some(period) = period else { continue };
        let Some(time) = grid.period(period).map(|p| p.time) else {
            continue;
        };
        let course = snapshot.course(&course_id);

        // Least-loaded qualified teacher, capped at the daily ceiling
        let teacher = course.and_then(|course| {
            let mut qualified: Vec<&TeacherId> = snapshot
                .teachers()
                .filter(|t| is_qualified(t, course, today))
                .map(|t| &t.id)
                .collect();
            qualified.sort_by_key(|id| (teacher_load.get(*id).copied().unwrap_or(0), (*id).clone()));
            qualified
                .into_iter()
                .find(|id| {
                    teacher_load.get(*id).copied().unwrap_or(0)
                        < config.max_periods_per_day as u32
                })
                .cloned()
        });
        if let Some(teacher_id) = &teacher {
            *teacher_load.entry(teacher_id.clone()).or_insert(0) += 1;
        }

        for day in DayOfWeek::WEEKDAYS {
            let mut spec = SlotSpec::new(course_id.clone(), day, period, time);
            spec.section_id = Some(section_id.clone());
            spec.teacher_id = teacher.clone();
            state.add_slot(spec);
        }
    }
}

/// Smallest compatible free room per section, most-constrained course
/// first. Sections that find no room stay unassigned and surface as
/// detector warnings or conflicts downstream.
fn assign_rooms(state: &mut ScheduleState, snapshot: &Snapshot) {
    let mut section_order: Vec<(SectionId, CourseId, usize)> = state
        .sections()
        .map(|s| (s.id.clone(), s.course_id.clone(), s.enrollment()))
        .collect();
    section_order.sort_by_key(|(id, course_id, _)| {
        let constraint = snapshot
            .course(course_id)
            .map(|c| c.required_equipment.len() + usize::from(c.requires_lab))
            .unwrap_or(0);
        (std::cmp::Reverse(constraint), id.clone())
    });

    let mut rooms: Vec<_> = snapshot.rooms().collect();
    rooms.sort_by_key(|r| (r.capacity, r.id.clone()));

    for (section_id, course_id, enrolled) in section_order {
        let slot_ids: Vec<_> = state
            .slots_of_section(&section_id)
            .iter()
            .map(|s| (s.id, s.day, s.time))
            .collect();
        if slot_ids.is_empty() {
            continue;
        }
        let course = snapshot.course(&course_id);

        let chosen = rooms.iter().find(|room| {
            room.capacity as usize >= enrolled
                && course
                    .map(|c| {
                        crate::detector::room_type_ok(c, room.room_type)
                            && room.has_equipment(&c.required_equipment)
                    })
                    .unwrap_or(true)
                && slot_ids
                    .iter()
                    .all(|(id, day, time)| !state.room_busy_at(&room.id, *day, time, Some(*id)))
        });

        if let Some(room) = chosen {
            let room_id = room.id.clone();
            for (slot_id, _, _) in slot_ids {
                let _ = state.mutate_slot(slot_id, |s| s.room_id = Some(room_id.clone()));
            }
        }
    }
}

/// Give enrolled students lunch slots: one wave per grid period that
/// intersects the configured window, each student taking the first wave
/// that does not overlap their classes that day. Students whose
/// schedule blocks every wave surface as NO_LUNCH_BREAK conflicts.
fn build_lunch_waves(state: &mut ScheduleState, config: &Config) {
    let (window_start, window_end) = config.lunch_window;
    let Ok(window) = TimeRange::new(window_start, window_end) else {
        return;
    };

    let grid = config.grid();
    let wave_windows: Vec<TimeRange> = grid
        .periods_of_day(DayOfWeek::Monday)
        .iter()
        .filter(|p| p.time.overlaps(&window))
        .filter_map(|p| p.time.intersection(&window))
        .collect();
    if wave_windows.is_empty() {
        return;
    }

    // Class meetings per student per day, from section rosters
    let mut meetings: BTreeMap<(StudentId, DayOfWeek), Vec<TimeRange>> = BTreeMap::new();
    let mut enrolled: Vec<StudentId> = Vec::new();
    for slot in state.slots() {
        let Some(section_id) = &slot.section_id else { continue };
        let Some(section) = state.section(section_id) else { continue };
        for student in &section.enrolled_students {
            if !enrolled.contains(student) {
                enrolled.push(student.clone());
            }
            meetings
                .entry((student.clone(), slot.day))
                .or_default()
                .push(slot.time);
        }
    }
    enrolled.sort();

    for day in DayOfWeek::WEEKDAYS {
        let mut waves: Vec<Vec<StudentId>> = vec![Vec::new(); wave_windows.len()];
        for student in &enrolled {
            let busy = meetings
                .get(&(student.clone(), day))
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let pick = wave_windows
                .iter()
                .position(|w| busy.iter().all(|t| !t.overlaps(w)));
            if let Some(index) = pick {
                waves[index].push(student.clone());
            }
        }

        for (index, roster) in waves.into_iter().enumerate() {
            if roster.is_empty() {
                continue;
            }
            let mut spec = SlotSpec::new(
                CourseId("lunch".to_string()),
                day,
                0,
                wave_windows[index],
            );
            spec.is_lunch = true;
            spec.lunch_wave = Some(index as u8 + 1);
            spec.students = roster;
            state.add_slot(spec);
        }
    }
}
