//! Conflict resolution: per-conflict suggestion generation, scratch-state
//! validation, and the bounded auto-resolve loop.
//!
//! A suggestion is only committed after its edits are materialised into
//! a scratch copy and a scoped re-detection shows the targeted conflict
//! gone with no new CRITICAL conflict introduced. Rejections are data:
//! they demote the suggestion and feed the success history.

mod priority;
mod suggestion;

pub use priority::*;
pub use suggestion::*;

use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::calendar::{DayOfWeek, PeriodGrid};
use crate::config::Config;
use crate::detector::{detect, detect_scoped, is_qualified, room_type_ok, DetectScope};
use crate::enrollment::{check_prerequisites, sections_collide};
use crate::snapshot::Snapshot;
use crate::state::ScheduleState;
use crate::types::{
    Conflict, ConflictSignature, ConflictType, RoomId, ScheduleSlot, SectionId, Severity, SlotId,
    StudentId, TeacherId,
};

/// Budgets and cancellation for the auto-resolve loop
pub struct ResolveOptions {
    pub max_iterations: u32,
    pub time_budget: Option<Duration>,
    /// External cancellation check, polled between steps
    pub should_continue: Option<Box<dyn Fn() -> bool>>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            time_budget: None,
            should_continue: None,
        }
    }
}

/// What the loop accomplished. The write log in the state carries the
/// committed edits; nothing is rolled back on budget expiry.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOutcome {
    pub resolved: usize,
    pub remaining: usize,
    pub iterations: u32,
}

/// Verdict of scratch-state validation for one suggestion
#[derive(Debug, Clone)]
pub struct ValidationVerdict {
    pub accepted: bool,
    pub reason: String,
}

pub struct Resolver<'a> {
    snapshot: &'a Snapshot,
    config: &'a Config,
    grid: PeriodGrid,
    history: SuccessHistory,
}

impl<'a> Resolver<'a> {
    pub fn new(snapshot: &'a Snapshot, config: &'a Config) -> Self {
        Resolver {
            snapshot,
            config,
            grid: config.grid(),
            history: SuccessHistory::default(),
        }
    }

    /// Mean of the configured type default and the rolling observed rate
    fn confidence(&self, kind: SuggestionKind) -> f64 {
        let base = self.config.success_rate_of(kind) as f64 / 100.0;
        match self.history.rate(kind) {
            Some(observed) => (base + observed) / 2.0,
            None => base,
        }
    }

    fn make(
        &self,
        kind: SuggestionKind,
        edits: Vec<ScheduleEdit>,
        impact: u32,
        description: String,
    ) -> Suggestion {
        let confidence = self.confidence(kind);
        let threshold = self.config.auto_apply_confidence_threshold as f64 / 100.0;
        let touches_students =
            matches!(kind, SuggestionKind::ReassignStudent | SuggestionKind::SplitSection);
        Suggestion {
            kind,
            edits,
            impact,
            confidence,
            requires_confirmation: confidence < threshold || touches_students,
            description,
        }
    }

    fn roster_len(&self, state: &ScheduleState, slot: &ScheduleSlot) -> usize {
        match &slot.section_id {
            Some(section_id) => state
                .section(section_id)
                .map(|s| s.enrollment())
                .unwrap_or(0),
            None => slot.students.len(),
        }
    }

    /// Qualified, active teachers free at the slot's time, id-ordered
    fn find_free_teachers(
        &self,
        state: &ScheduleState,
        slot: &ScheduleSlot,
        limit: usize,
        today: chrono::NaiveDate,
    ) -> Vec<TeacherId> {
        let Some(course) = self.snapshot.course(&slot.course_id) else {
            return Vec::new();
        };
        let mut found: Vec<TeacherId> = self
            .snapshot
            .teachers()
            .filter(|t| Some(&t.id) != slot.teacher_id.as_ref())
            .filter(|t| is_qualified(t, course, today))
            .filter(|t| !state.teacher_busy_at(&t.id, slot.day, &slot.time, Some(slot.id)))
            .map(|t| t.id.clone())
            .collect();
        found.sort();
        found.truncate(limit);
        found
    }

    /// Free, type-compatible rooms with at least `min_capacity` seats,
    /// ascending capacity surplus. `zone` restricts to one zone;
    /// `need_equipment` additionally requires the course's equipment.
    fn find_free_rooms(
        &self,
        state: &ScheduleState,
        slot: &ScheduleSlot,
        min_capacity: u32,
        zone: Option<&str>,
        need_equipment: bool,
    ) -> Vec<RoomId> {
        let course = self.snapshot.course(&slot.course_id);
        let mut found: Vec<(u32, RoomId)> = self
            .snapshot
            .rooms()
            .filter(|r| Some(&r.id) != slot.room_id.as_ref())
            .filter(|r| r.capacity >= min_capacity)
            .filter(|r| zone.map(|z| r.zone_key() == z).unwrap_or(true))
            .filter(|r| course.map(|c| room_type_ok(c, r.room_type)).unwrap_or(true))
            .filter(|r| {
                !need_equipment
                    || course
                        .map(|c| r.has_equipment(&c.required_equipment))
                        .unwrap_or(true)
            })
            .filter(|r| !state.room_busy_at(&r.id, slot.day, &slot.time, Some(slot.id)))
            .map(|r| (r.capacity - min_capacity, r.id.clone()))
            .collect();
        found.sort();
        found.into_iter().map(|(_, id)| id).collect()
    }

    /// A slot taught by someone else whose meeting time this slot could
    /// trade with: each teacher (and each kept room) must be free at the
    /// time it would inherit.
    fn find_swap_partner(&self, state: &ScheduleState, slot: &ScheduleSlot) -> Option<SlotId> {
        let my_teacher = slot.teacher_id.as_ref()?;
        state
            .slots()
            .filter(|other| other.id != slot.id)
            .filter(|other| !(other.day == slot.day && other.time == slot.time))
            .filter(|other| {
                other
                    .teacher_id
                    .as_ref()
                    .map(|t| t != my_teacher)
                    .unwrap_or(false)
            })
            .find(|other| {
                let their_teacher = other.teacher_id.as_ref().expect("filtered on teacher");
                !state.teacher_busy_at(my_teacher, other.day, &other.time, Some(slot.id))
                    && !state.teacher_busy_at(their_teacher, slot.day, &slot.time, Some(other.id))
                    && slot
                        .room_id
                        .as_ref()
                        .map(|r| !state.room_busy_at(r, other.day, &other.time, Some(slot.id)))
                        .unwrap_or(true)
                    && other
                        .room_id
                        .as_ref()
                        .map(|r| !state.room_busy_at(r, slot.day, &slot.time, Some(other.id)))
                        .unwrap_or(true)
            })
            .map(|other| other.id)
    }

    /// First (day, period) where the slot's teacher and room are both
    /// free, skipping its current placement
    fn find_free_time(&self, state: &ScheduleState, slot: &ScheduleSlot) -> Option<(DayOfWeek, u8)> {
        for day in DayOfWeek::WEEKDAYS {
            for period in self.grid.periods_of_day(day) {
                if day == slot.day && period.number == slot.period {
                    continue;
                }
                let time = period.time;
                let teacher_free = slot
                    .teacher_id
                    .as_ref()
                    .map(|t| !state.teacher_busy_at(t, day, &time, Some(slot.id)))
                    .unwrap_or(true);
                let room_free = slot
                    .room_id
                    .as_ref()
                    .map(|r| !state.room_busy_at(r, day, &time, Some(slot.id)))
                    .unwrap_or(true);
                if teacher_free && room_free {
                    return Some((day, period.number));
                }
            }
        }
        None
    }

    /// Generate the ranked suggestion list for one conflict
    pub fn suggest(
        &self,
        state: &ScheduleState,
        conflict: &Conflict,
        now: DateTime<Utc>,
    ) -> Vec<Suggestion> {
        let today = now.date_naive();
        let mut out: Vec<Suggestion> = Vec::new();

        match conflict.kind {
            ConflictType::TeacherOverlap => {
                for slot_id in conflict.slots.iter().take(2) {
                    let Some(slot) = state.slot(*slot_id) else { continue };
                    let impact = self.roster_len(state, slot) as u32 + 1;
                    for teacher in self.find_free_teachers(state, slot, 3, today) {
                        out.push(self.make(
                            SuggestionKind::ChangeTeacher,
                            vec![ScheduleEdit::SetTeacher {
                                slot: *slot_id,
                                teacher: teacher.clone(),
                            }],
                            impact,
                            format!("assign '{teacher}' to '{}' instead", slot.course_id),
                        ));
                    }
                }
                // Move the later meeting to a free period of its teacher
                if let Some(slot_id) = conflict.slots.last() {
                    if let Some(slot) = state.slot(*slot_id) {
                        if let Some((day, period)) = self.find_free_time(state, slot) {
                            out.push(self.make(
                                SuggestionKind::ChangeTime,
                                vec![ScheduleEdit::SetTime {
                                    slot: *slot_id,
                                    day,
                                    period,
                                }],
                                self.roster_len(state, slot) as u32 + 1,
                                format!("move '{}' to {day} period {period}", slot.course_id),
                            ));
                        }
                        // Or trade times with a differently-staffed slot
                        // so both teachers end up clear
                        if let Some(partner) = self.find_swap_partner(state, slot) {
                            out.push(self.make(
                                SuggestionKind::SwapSlots,
                                vec![ScheduleEdit::SwapTimes {
                                    a: *slot_id,
                                    b: partner,
                                }],
                                self.roster_len(state, slot) as u32 + 2,
                                format!("swap meeting times of {} and {partner}", slot.id),
                            ));
                        }
                    }
                }
            }

            ConflictType::RoomOverlap => {
                if let Some(slot_id) = conflict.slots.last() {
                    if let Some(slot) = state.slot(*slot_id) {
                        let enrolled = self.roster_len(state, slot) as u32;
                        for room in self
                            .find_free_rooms(state, slot, enrolled, None, false)
                            .into_iter()
                            .take(3)
                        {
                            out.push(self.make(
                                SuggestionKind::ChangeRoom,
                                vec![ScheduleEdit::SetRoom {
                                    slot: *slot_id,
                                    room: room.clone(),
                                }],
                                1,
                                format!("move '{}' into room '{room}'", slot.course_id),
                            ));
                        }
                    }
                }
            }

            ConflictType::RoomCapacity => {
                if let Some(slot_id) = conflict.slots.first() {
                    if let Some(slot) = state.slot(*slot_id) {
                        let enrolled = self.roster_len(state, slot) as u32;
                        let rooms =
                            self.find_free_rooms(state, slot, enrolled + 5, None, false);
                        for room in rooms.iter().take(3) {
                            out.push(self.make(
                                SuggestionKind::ChangeRoom,
                                vec![ScheduleEdit::SetRoom {
                                    slot: *slot_id,
                                    room: room.clone(),
                                }],
                                1,
                                format!("rehouse '{}' in larger room '{room}'", slot.course_id),
                            ));
                        }
                        if rooms.is_empty() {
                            if let Some(split) = self.split_section_suggestion(state, slot) {
                                out.push(split);
                            }
                        }
                    }
                }
            }

            ConflictType::StudentOverlap => {
                for student in &conflict.students {
                    for from_id in &conflict.sections {
                        out.extend(self.reassign_suggestions(state, student, from_id));
                    }
                }
            }

            ConflictType::SubjectMismatch => {
                if let Some(slot_id) = conflict.slots.first() {
                    if let Some(slot) = state.slot(*slot_id) {
                        let impact = self.roster_len(state, slot) as u32 + 1;
                        for teacher in self.find_free_teachers(state, slot, 3, today) {
                            out.push(self.make(
                                SuggestionKind::ChangeTeacher,
                                vec![ScheduleEdit::SetTeacher {
                                    slot: *slot_id,
                                    teacher: teacher.clone(),
                                }],
                                impact,
                                format!("staff '{}' with certified '{teacher}'", slot.course_id),
                            ));
                        }
                    }
                }
            }

            ConflictType::ExcessiveTeachingHours | ConflictType::NoPrepPeriod => {
                if let Some(slot_id) = conflict.slots.first() {
                    if let Some(slot) = state.slot(*slot_id) {
                        for teacher in self.find_free_teachers(state, slot, 1, today) {
                            out.push(self.make(
                                SuggestionKind::AddCoTeacher,
                                vec![ScheduleEdit::AddCoTeacher {
                                    slot: *slot_id,
                                    teacher: teacher.clone(),
                                }],
                                1,
                                format!("add co-teacher '{teacher}' on '{}'", slot.course_id),
                            ));
                        }
                    }
                }
                if let Some(slot_id) = conflict.slots.last() {
                    if let Some(slot) = state.slot(*slot_id) {
                        let impact = self.roster_len(state, slot) as u32 + 1;
                        for teacher in self.find_free_teachers(state, slot, 2, today) {
                            out.push(self.make(
                                SuggestionKind::ChangeTeacher,
                                vec![ScheduleEdit::SetTeacher {
                                    slot: *slot_id,
                                    teacher: teacher.clone(),
                                }],
                                impact,
                                format!("hand '{}' to '{teacher}'", slot.course_id),
                            ));
                        }
                    }
                }
            }

            ConflictType::TeacherTravel => {
                let anchor_zone = conflict
                    .slots
                    .first()
                    .and_then(|id| state.slot(*id))
                    .and_then(|s| s.room_id.as_ref())
                    .and_then(|r| self.snapshot.room(r))
                    .map(|r| r.zone_key());
                if let (Some(zone), Some(slot_id)) = (anchor_zone, conflict.slots.last()) {
                    if let Some(slot) = state.slot(*slot_id) {
                        let enrolled = self.roster_len(state, slot) as u32;
                        for room in self
                            .find_free_rooms(state, slot, enrolled, Some(&zone), false)
                            .into_iter()
                            .take(2)
                        {
                            out.push(self.make(
                                SuggestionKind::ChangeRoom,
                                vec![ScheduleEdit::SetRoom {
                                    slot: *slot_id,
                                    room: room.clone(),
                                }],
                                1,
                                format!("keep consecutive meetings in zone '{zone}' via '{room}'"),
                            ));
                        }
                    }
                }
            }

            ConflictType::RoomTypeMismatch | ConflictType::EquipmentUnavailable => {
                let need_equipment = conflict.kind == ConflictType::EquipmentUnavailable;
                if let Some(slot_id) = conflict.slots.first() {
                    if let Some(slot) = state.slot(*slot_id) {
                        let enrolled = self.roster_len(state, slot) as u32;
                        for room in self
                            .find_free_rooms(state, slot, enrolled, None, need_equipment)
                            .into_iter()
                            .take(3)
                        {
                            out.push(self.make(
                                SuggestionKind::ChangeRoom,
                                vec![ScheduleEdit::SetRoom {
                                    slot: *slot_id,
                                    room: room.clone(),
                                }],
                                1,
                                format!("move '{}' into suitable room '{room}'", slot.course_id),
                            ));
                        }
                    }
                }
            }

            ConflictType::SectionOverEnrolled => {
                if let Some(section_id) = conflict.sections.first() {
                    if let Some(section) = state.section(section_id) {
                        let excess =
                            section.enrollment() as i64 - section.max_enrollment as i64;
                        if excess > 0 {
                            let movers: Vec<StudentId> = section
                                .enrolled_students
                                .iter()
                                .rev()
                                .take(excess as usize)
                                .cloned()
                                .collect();
                            out.push(self.make(
                                SuggestionKind::SplitSection,
                                vec![ScheduleEdit::SplitSection {
                                    section: section_id.clone(),
                                    new_section: SectionId(format!("{section_id}-split")),
                                    students: movers.clone(),
                                }],
                                movers.len() as u32,
                                format!("split '{section_id}' to shed {excess} students"),
                            ));
                        }
                    }
                }
            }

            ConflictType::NoLunchBreak | ConflictType::SectionUnderEnrolled => {}
        }

        // Last-resort operator action for advisory severities
        if !conflict.severity.is_hard() {
            out.push(self.make(
                SuggestionKind::Ignore,
                Vec::new(),
                0,
                format!("leave '{}' unresolved", conflict.kind),
            ));
        }

        out.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.impact.cmp(&b.impact))
        });
        out
    }

    fn split_section_suggestion(
        &self,
        state: &ScheduleState,
        slot: &ScheduleSlot,
    ) -> Option<Suggestion> {
        let section_id = slot.section_id.as_ref()?;
        let section = state.section(section_id)?;
        let room_capacity = slot
            .room_id
            .as_ref()
            .and_then(|r| self.snapshot.room(r))
            .map(|r| r.capacity as usize)
            .unwrap_or(section.max_enrollment as usize);
        let enrolled = section.enrollment();
        let excess = enrolled.saturating_sub(room_capacity.min(section.max_enrollment as usize));
        let movers: Vec<StudentId> = if excess > 0 {
            section.enrolled_students.iter().rev().take(excess).cloned().collect()
        } else {
            section
                .enrolled_students
                .iter()
                .skip(enrolled / 2)
                .cloned()
                .collect()
        };
        if movers.is_empty() {
            return None;
        }
        Some(self.make(
            SuggestionKind::SplitSection,
            vec![ScheduleEdit::SplitSection {
                section: section_id.clone(),
                new_section: SectionId(format!("{section_id}-split")),
                students: movers.clone(),
            }],
            movers.len() as u32,
            format!("split overfull section '{section_id}'"),
        ))
    }

    fn reassign_suggestions(
        &self,
        state: &ScheduleState,
        student: &StudentId,
        from_id: &SectionId,
    ) -> Vec<Suggestion> {
        let Some(from) = state.section(from_id) else {
            return Vec::new();
        };
        if !from.has_student(student) {
            return Vec::new();
        }
        let mut out = Vec::new();
        let others: Vec<&SectionId> = {
            let mut list: Vec<&SectionId> = Vec::new();
            for section in state.sections_of_course(&from.course_id) {
                if section.id != *from_id {
                    list.push(&section.id);
                }
            }
            list
        };
        let other_ids: Vec<SectionId> = others.into_iter().cloned().collect();

        for to_id in other_ids {
            let Some(to) = state.section(&to_id) else { continue };
            if to.is_full() || !to.status.accepts_enrollment() {
                continue;
            }
            let collision = state
                .sections_of_student(student)
                .into_iter()
                .filter(|other| other.id != *from_id && other.id != to_id)
                .any(|other| sections_collide(state, to, other));
            if collision {
                continue;
            }
            if !check_prerequisites(self.snapshot, student, &to.course_id).satisfied {
                continue;
            }
            out.push(self.make(
                SuggestionKind::ReassignStudent,
                vec![ScheduleEdit::MoveStudent {
                    student: student.clone(),
                    from: from_id.clone(),
                    to: to_id.clone(),
                }],
                1,
                format!("move '{student}' from '{from_id}' to '{to_id}'"),
            ));
        }
        out
    }

    fn scope_of(
        &self,
        state: &ScheduleState,
        conflict: &Conflict,
        suggestion: Option<&Suggestion>,
    ) -> DetectScope {
        let mut scope = DetectScope::for_slots(state, conflict.slots.iter());
        for teacher in &conflict.teachers {
            scope.teachers.insert(teacher.clone());
        }
        for room in &conflict.rooms {
            scope.rooms.insert(room.clone());
        }
        for student in &conflict.students {
            scope.students.insert(student.clone());
        }
        for section in &conflict.sections {
            scope.add_section(state, section);
        }

        if let Some(suggestion) = suggestion {
            for edit in &suggestion.edits {
                match edit {
                    ScheduleEdit::SetTeacher { slot, teacher }
                    | ScheduleEdit::AddCoTeacher { slot, teacher } => {
                        scope.slots.insert(*slot);
                        scope.teachers.insert(teacher.clone());
                    }
                    ScheduleEdit::SetRoom { slot, room } => {
                        scope.slots.insert(*slot);
                        scope.rooms.insert(room.clone());
                    }
                    ScheduleEdit::SetTime { slot, .. } => {
                        scope.slots.insert(*slot);
                    }
                    ScheduleEdit::SwapTimes { a, b } => {
                        scope.slots.insert(*a);
                        scope.slots.insert(*b);
                    }
                    ScheduleEdit::MoveStudent { student, from, to } => {
                        scope.students.insert(student.clone());
                        scope.add_section(state, from);
                        scope.add_section(state, to);
                    }
                    ScheduleEdit::SplitSection {
                        section,
                        new_section,
                        students,
                    } => {
                        scope.add_section(state, section);
                        scope.sections.insert(new_section.clone());
                        for student in students {
                            scope.students.insert(student.clone());
                        }
                    }
                }
            }
        }
        scope
    }

    /// Materialise the suggestion into a scratch state and require that
    /// (a) no new CRITICAL conflict appears in scope and (b) the
    /// targeted conflict is cleared.
    pub fn validate(
        &self,
        state: &ScheduleState,
        conflict: &Conflict,
        suggestion: &Suggestion,
        now: DateTime<Utc>,
    ) -> ValidationVerdict {
        if suggestion.kind == SuggestionKind::Ignore {
            return ValidationVerdict {
                accepted: false,
                reason: "ignore requires operator confirmation".to_string(),
            };
        }

        let mut scratch = state.clone();
        if let Err(error) = apply_edits(&mut scratch, &suggestion.edits, &self.grid) {
            return ValidationVerdict {
                accepted: false,
                reason: format!("edit failed to apply: {error}"),
            };
        }

        let scope = self.scope_of(state, conflict, Some(suggestion));
        let before = detect_scoped(state, self.snapshot, self.config, now, &scope);
        let after = detect_scoped(&scratch, self.snapshot, self.config, now, &scope);

        let target = conflict.signature();
        if after.conflicts.iter().any(|c| c.signature() == target) {
            return ValidationVerdict {
                accepted: false,
                reason: "targeted conflict persists after edit".to_string(),
            };
        }

        let known_critical: HashSet<ConflictSignature> = before
            .conflicts
            .iter()
            .filter(|c| c.severity == Severity::Critical)
            .map(|c| c.signature())
            .collect();
        let introduced = after
            .conflicts
            .iter()
            .filter(|c| c.severity == Severity::Critical)
            .find(|c| !known_critical.contains(&c.signature()));
        if let Some(bad) = introduced {
            return ValidationVerdict {
                accepted: false,
                reason: format!("edit introduces new critical conflict: {}", bad.message),
            };
        }

        ValidationVerdict {
            accepted: true,
            reason: String::new(),
        }
    }

    /// Validate, then commit to the live state. Both outcomes feed the
    /// success history.
    pub fn try_apply(
        &mut self,
        state: &mut ScheduleState,
        conflict: &Conflict,
        suggestion: &Suggestion,
        now: DateTime<Utc>,
    ) -> bool {
        let verdict = self.validate(state, conflict, suggestion, now);
        if !verdict.accepted {
            self.history.record(suggestion.kind, false);
            return false;
        }
        if apply_edits(state, &suggestion.edits, &self.grid).is_err() {
            self.history.record(suggestion.kind, false);
            return false;
        }
        let id = state.open_conflict(conflict.clone());
        let _ = state.resolve_conflict(
            id,
            format!("auto-resolved ({}): {}", suggestion.kind, suggestion.description),
        );
        self.history.record(suggestion.kind, true);
        true
    }

    /// Iterate active conflicts in priority order, applying the best
    /// validated suggestion at or above the confidence threshold.
    /// Stops when a pass makes no progress, the iteration or time budget
    /// runs out, or the host cancels. Best-so-far state is kept.
    pub fn auto_resolve(
        &mut self,
        state: &mut ScheduleState,
        now: DateTime<Utc>,
        options: &ResolveOptions,
    ) -> ResolveOutcome {
        let started = Instant::now();
        let threshold = self.config.auto_apply_confidence_threshold as f64 / 100.0;
        let mut outcome = ResolveOutcome::default();

        let within_budget = |started: &Instant| {
            options
                .time_budget
                .map(|budget| started.elapsed() <= budget)
                .unwrap_or(true)
        };
        let host_continues = || {
            options
                .should_continue
                .as_ref()
                .map(|f| f())
                .unwrap_or(true)
        };

        'passes: while outcome.iterations < options.max_iterations {
            if !within_budget(&started) || !host_continues() {
                break;
            }
            outcome.iterations += 1;

            let ignored: HashSet<ConflictSignature> =
                state.ignored_signatures().into_iter().collect();
            let report = detect(state, self.snapshot, self.config, now);
            let mut active: Vec<Conflict> = report
                .conflicts
                .into_iter()
                .filter(|c| !ignored.contains(&c.signature()))
                .collect();
            if active.is_empty() {
                break;
            }

            let ranking = active.clone();
            active.sort_by_key(|c| (Reverse(priority_score(c, &ranking, now)), c.id));

            let mut progressed = false;
            for conflict in &active {
                if !within_budget(&started) || !host_continues() {
                    break 'passes;
                }

                // Earlier edits this pass may already have cleared it
                let scope = self.scope_of(state, conflict, None);
                let current = detect_scoped(state, self.snapshot, self.config, now, &scope);
                let signature = conflict.signature();
                if !current.conflicts.iter().any(|c| c.signature() == signature) {
                    continue;
                }

                for suggestion in self.suggest(state, conflict, now) {
                    if suggestion.kind == SuggestionKind::Ignore
                        || suggestion.confidence < threshold
                    {
                        continue;
                    }
                    if self.try_apply(state, conflict, &suggestion, now) {
                        outcome.resolved += 1;
                        progressed = true;
                        break;
                    }
                }
            }

            if !progressed {
                break;
            }
        }

        let ignored: HashSet<ConflictSignature> = state.ignored_signatures().into_iter().collect();
        outcome.remaining = detect(state, self.snapshot, self.config, now)
            .conflicts
            .iter()
            .filter(|c| !ignored.contains(&c.signature()))
            .count();
        outcome
    }
}
