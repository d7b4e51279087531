//! Pure conflict detection over a consistent schedule snapshot.
//!
//! Each pair-generating dimension buckets slots by key and sweeps the
//! bucket in start-time order; per-slot and per-teacher checks follow.
//! Output order is canonical (severity desc, type asc, day asc, start
//! asc, primary slot asc) so repeated passes over the same state are
//! byte-identical.

mod certification;
mod policy;

pub use certification::*;
pub use policy::*;

use chrono::{DateTime, NaiveDate, Utc};
use itertools::Itertools;
use std::collections::{BTreeMap, HashSet};

use crate::calendar::{DayOfWeek, PeriodGrid, TimeRange};
use crate::config::Config;
use crate::snapshot::Snapshot;
use crate::state::ScheduleState;
use crate::types::{
    Conflict, ConflictId, ConflictType, RoomId, ScheduleSlot, SectionId, Severity, SlotId,
    StudentId, TeacherId,
};

/// Detection output: typed conflicts plus data-quality warnings.
/// Malformed or dangling slots land in `warnings`, never abort a pass.
#[derive(Debug, Clone, Default)]
pub struct DetectionReport {
    pub conflicts: Vec<Conflict>,
    pub warnings: Vec<String>,
}

impl DetectionReport {
    pub fn count_critical(&self) -> usize {
        self.conflicts
            .iter()
            .filter(|c| c.severity == Severity::Critical)
            .count()
    }

    pub fn count_hard(&self) -> usize {
        self.conflicts
            .iter()
            .filter(|c| c.severity.is_hard())
            .count()
    }
}

/// Restriction of a detection pass to the entities an edit touched.
/// A scoped sweep still sees every slot of an in-scope teacher/room/
/// student, so local re-validation cannot miss a new pairwise overlap.
#[derive(Debug, Clone, Default)]
pub struct DetectScope {
    pub teachers: HashSet<TeacherId>,
    pub rooms: HashSet<RoomId>,
    pub students: HashSet<StudentId>,
    pub sections: HashSet<SectionId>,
    pub slots: HashSet<SlotId>,
}

impl DetectScope {
    /// Everything reachable from the given slots: their teachers, rooms,
    /// sections, and rostered students.
    pub fn for_slots<'a>(state: &ScheduleState, ids: impl IntoIterator<Item = &'a SlotId>) -> Self {
        let mut scope = DetectScope::default();
        for id in ids {
            scope.slots.insert(*id);
            if let Some(slot) = state.slot(*id) {
                scope.absorb_slot(state, slot);
            }
        }
        scope
    }

    pub fn absorb_slot(&mut self, state: &ScheduleState, slot: &ScheduleSlot) {
        self.slots.insert(slot.id);
        for teacher in slot.teachers() {
            self.teachers.insert(teacher.clone());
        }
        if let Some(room) = &slot.room_id {
            self.rooms.insert(room.clone());
        }
        if let Some(section_id) = &slot.section_id {
            self.sections.insert(section_id.clone());
            if let Some(section) = state.section(section_id) {
                for student in &section.enrolled_students {
                    self.students.insert(student.clone());
                }
            }
        }
        for student in &slot.students {
            self.students.insert(student.clone());
        }
    }

    pub fn add_section(&mut self, state: &ScheduleState, section_id: &SectionId) {
        self.sections.insert(section_id.clone());
        if let Some(section) = state.section(section_id) {
            for student in &section.enrolled_students {
                self.students.insert(student.clone());
            }
        }
        for slot in state.slots_of_section(section_id) {
            self.absorb_slot(state, slot);
        }
    }
}

/// Full detection pass over the state
pub fn detect(
    state: &ScheduleState,
    snapshot: &Snapshot,
    config: &Config,
    now: DateTime<Utc>,
) -> DetectionReport {
    Detector::new(state, snapshot, config, now, None).run()
}

/// Detection restricted to the entities in `scope`
pub fn detect_scoped(
    state: &ScheduleState,
    snapshot: &Snapshot,
    config: &Config,
    now: DateTime<Utc>,
    scope: &DetectScope,
) -> DetectionReport {
    Detector::new(state, snapshot, config, now, Some(scope)).run()
}

struct Detector<'a> {
    state: &'a ScheduleState,
    snapshot: &'a Snapshot,
    config: &'a Config,
    grid: PeriodGrid,
    now: DateTime<Utc>,
    today: NaiveDate,
    scope: Option<&'a DetectScope>,
    conflicts: Vec<Conflict>,
    warnings: Vec<String>,
}

impl<'a> Detector<'a> {
    fn new(
        state: &'a ScheduleState,
        snapshot: &'a Snapshot,
        config: &'a Config,
        now: DateTime<Utc>,
        scope: Option<&'a DetectScope>,
    ) -> Self {
        Detector {
            state,
            snapshot,
            config,
            grid: config.grid(),
            now,
            today: now.date_naive(),
            scope,
            conflicts: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn run(mut self) -> DetectionReport {
        self.sweep_teachers();
        self.sweep_rooms();
        self.sweep_students();
        self.per_slot_checks();
        self.teacher_day_checks();
        self.lunch_checks();
        self.section_checks();

        self.conflicts.sort_by_key(|c| c.sort_key());
        for (index, conflict) in self.conflicts.iter_mut().enumerate() {
            conflict.id = ConflictId(index as u64 + 1);
        }
        self.warnings.sort();
        self.warnings.dedup();

        DetectionReport {
            conflicts: self.conflicts,
            warnings: self.warnings,
        }
    }

    fn teacher_in_scope(&self, teacher: &TeacherId) -> bool {
        self.scope.map(|s| s.teachers.contains(teacher)).unwrap_or(true)
    }

    fn room_in_scope(&self, room: &RoomId) -> bool {
        self.scope.map(|s| s.rooms.contains(room)).unwrap_or(true)
    }

    fn student_in_scope(&self, student: &StudentId) -> bool {
        self.scope.map(|s| s.students.contains(student)).unwrap_or(true)
    }

    fn slot_in_scope(&self, slot: &ScheduleSlot) -> bool {
        match self.scope {
            None => true,
            Some(scope) => {
                scope.slots.contains(&slot.id)
                    || slot
                        .section_id
                        .as_ref()
                        .map(|s| scope.sections.contains(s))
                        .unwrap_or(false)
            }
        }
    }

    fn section_in_scope(&self, section_id: &SectionId) -> bool {
        self.scope
            .map(|s| s.sections.contains(section_id))
            .unwrap_or(true)
    }

    /// Roster that actually meets in a slot: the section's students, or
    /// the slot's own roster for sectionless (lunch-wave) slots.
    fn roster_of(&mut self, slot: &ScheduleSlot) -> Vec<StudentId> {
        if let Some(section_id) = &slot.section_id {
            match self.state.section(section_id) {
                Some(section) => section.enrolled_students.clone(),
                None => {
                    self.warnings.push(format!(
                        "{} references unknown section '{section_id}'; roster checks skipped",
                        slot.id
                    ));
                    Vec::new()
                }
            }
        } else {
            slot.students.clone()
        }
    }

    fn push(&mut self, conflict: Conflict) {
        self.conflicts.push(conflict);
    }

    // ---- pairwise sweeps ----

    fn sweep_teachers(&mut self) {
        let state = self.state;
        let mut buckets: BTreeMap<(TeacherId, DayOfWeek), Vec<&ScheduleSlot>> = BTreeMap::new();
        for slot in state.slots() {
            for teacher in slot.teachers() {
                if self.teacher_in_scope(teacher) {
                    buckets
                        .entry((teacher.clone(), slot.day))
                        .or_default()
                        .push(slot);
                }
            }
        }

        for ((teacher, day), mut bucket) in buckets {
            bucket.sort_by_key(|s| (s.time.start, s.id));
            for (current, next) in bucket.iter().tuple_windows() {
                if let Some(window) = current.time.intersection(&next.time) {
                    let mut c = Conflict::new(
                        ConflictType::TeacherOverlap,
                        format!("Teacher '{teacher}' double-booked on {day} at {window}"),
                        self.now,
                    );
                    c.slots = vec![current.id, next.id];
                    c.teachers = vec![teacher.clone()];
                    c.courses = vec![current.course_id.clone(), next.course_id.clone()];
                    c.day = Some(day);
                    c.window = Some(window);
                    self.push(c);
                }
            }
        }
    }

    fn sweep_rooms(&mut self) {
        let state = self.state;
        let mut buckets: BTreeMap<(RoomId, DayOfWeek), Vec<&ScheduleSlot>> = BTreeMap::new();
        for slot in state.slots() {
            if let Some(room) = &slot.room_id {
                if self.room_in_scope(room) {
                    buckets
                        .entry((room.clone(), slot.day))
                        .or_default()
                        .push(slot);
                }
            }
        }

        for ((room, day), mut bucket) in buckets {
            bucket.sort_by_key(|s| (s.time.start, s.id));
            for (current, next) in bucket.iter().tuple_windows() {
                if let Some(window) = current.time.intersection(&next.time) {
                    let mut c = Conflict::new(
                        ConflictType::RoomOverlap,
                        format!("Room '{room}' double-booked on {day} at {window}"),
                        self.now,
                    );
                    c.slots = vec![current.id, next.id];
                    c.rooms = vec![room.clone()];
                    c.courses = vec![current.course_id.clone(), next.course_id.clone()];
                    c.day = Some(day);
                    c.window = Some(window);
                    self.push(c);
                }
            }
        }
    }

    fn sweep_students(&mut self) {
        let slots: Vec<ScheduleSlot> = self.state.slots().cloned().collect();
        let mut roster_map: BTreeMap<SlotId, Vec<StudentId>> = BTreeMap::new();
        for slot in &slots {
            let roster = self.roster_of(slot);
            roster_map.insert(slot.id, roster);
        }

        let mut buckets: BTreeMap<(StudentId, DayOfWeek), Vec<&ScheduleSlot>> = BTreeMap::new();
        for slot in &slots {
            for student in roster_map.get(&slot.id).into_iter().flatten() {
                if self.student_in_scope(student) {
                    buckets
                        .entry((student.clone(), slot.day))
                        .or_default()
                        .push(slot);
                }
            }
        }

        for ((student, day), mut bucket) in buckets {
            bucket.sort_by_key(|s| (s.time.start, s.id));
            for (current, next) in bucket.iter().tuple_windows() {
                if let Some(window) = current.time.intersection(&next.time) {
                    let mut c = Conflict::new(
                        ConflictType::StudentOverlap,
                        format!("Student '{student}' double-booked on {day} at {window}"),
                        self.now,
                    );
                    c.slots = vec![current.id, next.id];
                    c.students = vec![student.clone()];
                    c.courses = vec![current.course_id.clone(), next.course_id.clone()];
                    c.sections = [&current.section_id, &next.section_id]
                        .into_iter()
                        .flatten()
                        .cloned()
                        .collect();
                    c.day = Some(day);
                    c.window = Some(window);
                    self.push(c);
                }
            }
        }
    }

    // ---- per-slot checks ----

    fn per_slot_checks(&mut self) {
        let slots: Vec<ScheduleSlot> = self.state.slots().cloned().collect();
        for slot in &slots {
            if !self.slot_in_scope(slot) {
                continue;
            }
            let enrolled = self.roster_of(slot).len();
            self.check_room(slot, enrolled);
            self.check_qualification(slot);
        }
    }

    fn check_room(&mut self, slot: &ScheduleSlot, enrolled: usize) {
        let Some(room_id) = &slot.room_id else {
            return;
        };
        let Some(room) = self.snapshot.room(room_id) else {
            self.warnings.push(format!(
                "{} references unknown room '{room_id}'; room checks skipped",
                slot.id
            ));
            return;
        };

        if enrolled > room.capacity as usize {
            let mut c = Conflict::new(
                ConflictType::RoomCapacity,
                format!(
                    "Room '{room_id}' (capacity {}) holds {enrolled} students for '{}'",
                    room.capacity, slot.course_id
                ),
                self.now,
            );
            c.slots = vec![slot.id];
            c.rooms = vec![room_id.clone()];
            c.courses = vec![slot.course_id.clone()];
            c.sections = slot.section_id.iter().cloned().collect();
            c.day = Some(slot.day);
            c.window = Some(slot.time);
            self.push(c);
        }

        let Some(course) = self.snapshot.course(&slot.course_id) else {
            self.warnings.push(format!(
                "{} references unknown course '{}'; policy checks skipped",
                slot.id, slot.course_id
            ));
            return;
        };

        if !policy::room_type_ok(course, room.room_type) {
            let mut c = Conflict::new(
                ConflictType::RoomTypeMismatch,
                format!(
                    "'{}' placed in {} '{room_id}'",
                    course.name,
                    room.room_type
                ),
                self.now,
            );
            c.slots = vec![slot.id];
            c.rooms = vec![room_id.clone()];
            c.courses = vec![course.id.clone()];
            c.day = Some(slot.day);
            c.window = Some(slot.time);
            self.push(c);
        }

        if !room.has_equipment(&course.required_equipment) {
            let missing: Vec<&str> = course
                .required_equipment
                .iter()
                .filter(|need| !room.has_equipment(std::slice::from_ref(need)))
                .map(String::as_str)
                .collect();
            let mut c = Conflict::new(
                ConflictType::EquipmentUnavailable,
                format!(
                    "Room '{room_id}' lacks equipment for '{}': {}",
                    course.name,
                    missing.join(", ")
                ),
                self.now,
            );
            c.slots = vec![slot.id];
            c.rooms = vec![room_id.clone()];
            c.courses = vec![course.id.clone()];
            c.day = Some(slot.day);
            c.window = Some(slot.time);
            self.push(c);
        }
    }

    fn check_qualification(&mut self, slot: &ScheduleSlot) {
        let Some(teacher_id) = &slot.teacher_id else {
            return;
        };
        let Some(teacher) = self.snapshot.teacher(teacher_id) else {
            self.warnings.push(format!(
                "{} references unknown teacher '{teacher_id}'; qualification not checked",
                slot.id
            ));
            return;
        };
        let Some(course) = self.snapshot.course(&slot.course_id) else {
            self.warnings.push(format!(
                "{} references unknown course '{}'; qualification not checked",
                slot.id, slot.course_id
            ));
            return;
        };

        match certification::match_teacher_to_course(teacher, course, self.today) {
            CertMatch::Full => {}
            CertMatch::GradeMismatch => {
                let mut c = Conflict::new(
                    ConflictType::SubjectMismatch,
                    format!(
                        "Teacher '{teacher_id}' certification grade range excludes '{}'",
                        course.name
                    ),
                    self.now,
                );
                c.severity = Severity::Medium;
                c.slots = vec![slot.id];
                c.teachers = vec![teacher_id.clone()];
                c.courses = vec![course.id.clone()];
                c.day = Some(slot.day);
                c.window = Some(slot.time);
                self.push(c);
            }
            CertMatch::None => {
                let mut c = Conflict::new(
                    ConflictType::SubjectMismatch,
                    format!("Teacher '{teacher_id}' is not certified for '{}'", course.name),
                    self.now,
                );
                c.slots = vec![slot.id];
                c.teachers = vec![teacher_id.clone()];
                c.courses = vec![course.id.clone()];
                c.day = Some(slot.day);
                c.window = Some(slot.time);
                self.push(c);
            }
        }
    }

    // ---- per-(teacher, day) checks ----

    fn teacher_day_checks(&mut self) {
        let state = self.state;
        let mut buckets: BTreeMap<(TeacherId, DayOfWeek), Vec<&ScheduleSlot>> = BTreeMap::new();
        for slot in state.slots() {
            for teacher in slot.teachers() {
                if self.teacher_in_scope(teacher) {
                    buckets
                        .entry((teacher.clone(), slot.day))
                        .or_default()
                        .push(slot);
                }
            }
        }

        let day_range = self.grid.day_range();
        let mut found: Vec<Conflict> = Vec::new();

        for ((teacher, day), mut bucket) in buckets {
            bucket.sort_by_key(|s| (s.time.start, s.id));
            let teaching: Vec<&ScheduleSlot> =
                bucket.iter().copied().filter(|s| !s.is_lunch).collect();

            if teaching.len() > self.config.max_periods_per_day as usize {
                let mut c = Conflict::new(
                    ConflictType::ExcessiveTeachingHours,
                    format!(
                        "Teacher '{teacher}' teaches {} periods on {day} (limit {})",
                        teaching.len(),
                        self.config.max_periods_per_day
                    ),
                    self.now,
                );
                c.slots = teaching.iter().map(|s| s.id).collect();
                c.teachers = vec![teacher.clone()];
                c.day = Some(day);
                found.push(c);
            }

            if let Some(range) = day_range {
                if !teaching.is_empty() && !self.has_prep_gap(&teaching, range) {
                    let mut c = Conflict::new(
                        ConflictType::NoPrepPeriod,
                        format!(
                            "Teacher '{teacher}' has no free gap of {}+ minutes on {day}",
                            self.config.min_prep_minutes
                        ),
                        self.now,
                    );
                    c.slots = teaching.iter().map(|s| s.id).collect();
                    c.teachers = vec![teacher.clone()];
                    c.day = Some(day);
                    found.push(c);
                }
            }

            // Travel between back-to-back meetings
            for (current, next) in bucket.iter().tuple_windows() {
                let (Some(a), Some(b)) = (&current.room_id, &next.room_id) else {
                    continue;
                };
                let (Some(room_a), Some(room_b)) =
                    (self.snapshot.room(a), self.snapshot.room(b))
                else {
                    continue;
                };
                let cost = room_a.travel_cost(room_b);
                if cost >= self.config.teacher_travel_threshold {
                    let mut c = Conflict::new(
                        ConflictType::TeacherTravel,
                        format!(
                            "Teacher '{teacher}' moves from '{a}' to '{b}' between consecutive periods on {day}"
                        ),
                        self.now,
                    );
                    c.slots = vec![current.id, next.id];
                    c.teachers = vec![teacher.clone()];
                    c.rooms = vec![a.clone(), b.clone()];
                    c.day = Some(day);
                    c.window = Some(next.time);
                    found.push(c);
                }
            }
        }

        for c in found {
            self.push(c);
        }
    }

    /// A prep gap is any free stretch of `min_prep_minutes`+ inside the
    /// instructional day, leading and trailing free periods included.
    fn has_prep_gap(&self, teaching: &[&ScheduleSlot], day: TimeRange) -> bool {
        let min = self.config.min_prep_minutes;
        let first = teaching.first().expect("non-empty teaching list");
        let last = teaching.last().expect("non-empty teaching list");

        if day.start.minutes_until(first.time.start) >= min {
            return true;
        }
        if last.time.end.minutes_until(day.end) >= min {
            return true;
        }
        teaching
            .windows(2)
            .any(|pair| pair[0].time.end.minutes_until(pair[1].time.start) >= min)
    }

    // ---- per-(student, day) lunch check ----

    fn lunch_checks(&mut self) {
        let (lunch_start, lunch_end) = self.config.lunch_window;
        let Ok(window) = TimeRange::new(lunch_start, lunch_end) else {
            self.warnings
                .push("configured lunch window is empty; lunch checks skipped".to_string());
            return;
        };

        let slots: Vec<ScheduleSlot> = self.state.slots().cloned().collect();
        let mut attendance: BTreeMap<(StudentId, DayOfWeek), bool> = BTreeMap::new();
        for slot in &slots {
            for student in self.roster_of(slot) {
                if !self.student_in_scope(&student) {
                    continue;
                }
                let fed = attendance.entry((student, slot.day)).or_insert(false);
                if slot.is_lunch && slot.time.overlaps(&window) {
                    *fed = true;
                }
            }
        }

        for ((student, day), fed) in attendance {
            if !fed {
                let mut c = Conflict::new(
                    ConflictType::NoLunchBreak,
                    format!("Student '{student}' has no lunch period on {day}"),
                    self.now,
                );
                c.students = vec![student];
                c.day = Some(day);
                c.window = Some(window);
                self.push(c);
            }
        }
    }

    // ---- per-section checks ----

    fn section_checks(&mut self) {
        let sections: Vec<_> = self.state.sections().cloned().collect();
        for section in sections {
            if !self.section_in_scope(&section.id) {
                continue;
            }
            let enrolled = section.enrollment();
            if enrolled > section.max_enrollment as usize {
                let mut c = Conflict::new(
                    ConflictType::SectionOverEnrolled,
                    format!(
                        "Section '{}' enrols {enrolled} over its limit of {}",
                        section.id, section.max_enrollment
                    ),
                    self.now,
                );
                c.sections = vec![section.id.clone()];
                c.courses = vec![section.course_id.clone()];
                self.push(c);
            }

            let floor = (section.max_enrollment as usize
                * self.config.section_min_fill_percent as usize)
                .div_ceil(100);
            if section.max_enrollment > 0
                && section.status == crate::types::SectionStatus::Scheduled
                && enrolled < floor
            {
                let mut c = Conflict::new(
                    ConflictType::SectionUnderEnrolled,
                    format!(
                        "Section '{}' enrols {enrolled} of {} seats",
                        section.id, section.max_enrollment
                    ),
                    self.now,
                );
                c.sections = vec![section.id.clone()];
                c.courses = vec![section.course_id.clone()];
                self.push(c);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::TimeOfDay;
    use crate::sources::DataSource;
    use crate::types::*;
    use chrono::TimeZone;

    struct EmptySource;

    impl DataSource for EmptySource {
        fn students(&self) -> Vec<Student> {
            vec![]
        }
        fn teachers(&self) -> Vec<Teacher> {
            vec![]
        }
        fn courses(&self) -> Vec<Course> {
            vec![]
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

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 20, 7, 0, 0).unwrap()
    }

    fn range(start: (u8, u8), end: (u8, u8)) -> TimeRange {
        TimeRange::new(
            TimeOfDay::new(start.0, start.1).unwrap(),
            TimeOfDay::new(end.0, end.1).unwrap(),
        )
        .unwrap()
    }

    fn slot(
        state: &mut ScheduleState,
        course: &str,
        teacher: Option<&str>,
        day: DayOfWeek,
        period: u8,
        start: (u8, u8),
        end: (u8, u8),
    ) -> SlotId {
        let mut spec = SlotSpec::new(
            CourseId(course.to_string()),
            day,
            period,
            range(start, end),
        );
        spec.teacher_id = teacher.map(|t| TeacherId(t.to_string()));
        state.add_slot(spec)
    }

    #[test]
    fn test_teacher_double_book_scenario() {
        let snapshot = Snapshot::from_source(&EmptySource).unwrap();
        let config = Config::default();
        let mut state = ScheduleState::new();

        let a = slot(&mut state, "c1", Some("t1"), DayOfWeek::Monday, 2, (9, 0), (9, 50));
        let b = slot(&mut state, "c2", Some("t1"), DayOfWeek::Monday, 2, (9, 30), (10, 20));

        let report = detect(&state, &snapshot, &config, now());
        let overlaps: Vec<&Conflict> = report
            .conflicts
            .iter()
            .filter(|c| c.kind == ConflictType::TeacherOverlap)
            .collect();

        assert_eq!(overlaps.len(), 1);
        let conflict = overlaps[0];
        assert_eq!(conflict.severity, Severity::Critical);
        assert_eq!(conflict.slots, vec![a, b]);
        assert_eq!(conflict.teachers, vec![TeacherId("t1".to_string())]);
        assert_eq!(conflict.day, Some(DayOfWeek::Monday));
        let window = conflict.window.unwrap();
        assert_eq!(window.start, TimeOfDay::new(9, 30).unwrap());
        assert_eq!(window.end, TimeOfDay::new(9, 50).unwrap());
    }

    #[test]
    fn test_touching_slots_do_not_conflict() {
        let snapshot = Snapshot::from_source(&EmptySource).unwrap();
        let config = Config::default();
        let mut state = ScheduleState::new();

        slot(&mut state, "c1", Some("t1"), DayOfWeek::Monday, 2, (9, 0), (9, 50));
        slot(&mut state, "c2", Some("t1"), DayOfWeek::Monday, 3, (9, 50), (10, 40));

        let report = detect(&state, &snapshot, &config, now());
        assert!(report
            .conflicts
            .iter()
            .all(|c| c.kind != ConflictType::TeacherOverlap));
    }

    #[test]
    fn test_detection_is_idempotent_and_ordered() {
        let snapshot = Snapshot::from_source(&EmptySource).unwrap();
        let config = Config::default();
        let mut state = ScheduleState::new();

        slot(&mut state, "c1", Some("t1"), DayOfWeek::Tuesday, 2, (9, 0), (9, 50));
        slot(&mut state, "c2", Some("t1"), DayOfWeek::Tuesday, 2, (9, 30), (10, 20));
        slot(&mut state, "c3", Some("t2"), DayOfWeek::Monday, 1, (8, 0), (8, 50));
        slot(&mut state, "c4", Some("t2"), DayOfWeek::Monday, 1, (8, 20), (9, 10));

        let first = detect(&state, &snapshot, &config, now());
        let second = detect(&state, &snapshot, &config, now());

        let keys1: Vec<_> = first.conflicts.iter().map(|c| c.sort_key()).collect();
        let keys2: Vec<_> = second.conflicts.iter().map(|c| c.sort_key()).collect();
        assert_eq!(keys1, keys2);

        let mut sorted = keys1.clone();
        sorted.sort();
        assert_eq!(keys1, sorted, "output must already be in canonical order");
    }

    #[test]
    fn test_excessive_hours_and_missing_prep() {
        let snapshot = Snapshot::from_source(&EmptySource).unwrap();
        let config = Config::default();
        let mut state = ScheduleState::new();

        // Eight back-to-back periods: over the 6-period limit and no gap
        let grid = config.grid();
        for p in 1..=8u8 {
            let time = grid.period(p).unwrap().time;
            let mut spec = SlotSpec::new(
                CourseId(format!("c{p}")),
                DayOfWeek::Wednesday,
                p,
                time,
            );
            spec.teacher_id = Some(TeacherId("t1".to_string()));
            state.add_slot(spec);
        }

        let report = detect(&state, &snapshot, &config, now());
        assert!(report
            .conflicts
            .iter()
            .any(|c| c.kind == ConflictType::ExcessiveTeachingHours));
        assert!(report
            .conflicts
            .iter()
            .any(|c| c.kind == ConflictType::NoPrepPeriod));
    }

    #[test]
    fn test_trailing_free_periods_count_as_prep() {
        let snapshot = Snapshot::from_source(&EmptySource).unwrap();
        let config = Config::default();
        let mut state = ScheduleState::new();

        let grid = config.grid();
        for p in 1..=4u8 {
            let time = grid.period(p).unwrap().time;
            let mut spec = SlotSpec::new(CourseId(format!("c{p}")), DayOfWeek::Monday, p, time);
            spec.teacher_id = Some(TeacherId("t1".to_string()));
            state.add_slot(spec);
        }

        let report = detect(&state, &snapshot, &config, now());
        assert!(report
            .conflicts
            .iter()
            .all(|c| c.kind != ConflictType::NoPrepPeriod));
    }

    #[test]
    fn test_missing_lunch_flagged_per_student_day() {
        let snapshot = Snapshot::from_source(&EmptySource).unwrap();
        let config = Config::default();
        let mut state = ScheduleState::new();

        let mut morning = SlotSpec::new(
            CourseId("c1".to_string()),
            DayOfWeek::Monday,
            2,
            range((9, 0), (9, 50)),
        );
        morning.students = vec![StudentId("s1".to_string())];
        state.add_slot(morning);

        let report = detect(&state, &snapshot, &config, now());
        let lunch: Vec<_> = report
            .conflicts
            .iter()
            .filter(|c| c.kind == ConflictType::NoLunchBreak)
            .collect();
        assert_eq!(lunch.len(), 1);
        assert_eq!(lunch[0].students, vec![StudentId("s1".to_string())]);

        // Adding a lunch-wave slot inside the window clears it
        let mut lunch_slot = SlotSpec::new(
            CourseId("lunch".to_string()),
            DayOfWeek::Monday,
            5,
            range((11, 40), (12, 10)),
        );
        lunch_slot.is_lunch = true;
        lunch_slot.lunch_wave = Some(1);
        lunch_slot.students = vec![StudentId("s1".to_string())];
        state.add_slot(lunch_slot);

        let report = detect(&state, &snapshot, &config, now());
        assert!(report
            .conflicts
            .iter()
            .all(|c| c.kind != ConflictType::NoLunchBreak));
    }

    #[test]
    fn test_dangling_section_is_warned_not_fatal() {
        let snapshot = Snapshot::from_source(&EmptySource).unwrap();
        let config = Config::default();
        let mut state = ScheduleState::new();

        let mut spec = SlotSpec::new(
            CourseId("c1".to_string()),
            DayOfWeek::Monday,
            1,
            range((8, 0), (8, 50)),
        );
        spec.section_id = Some(SectionId("ghost".to_string()));
        state.add_slot(spec);

        let report = detect(&state, &snapshot, &config, now());
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("unknown section 'ghost'")));
    }
}
