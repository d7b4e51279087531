//! Authoritative mutable schedule state: the slot arena, working copies
//! of sections, per-course waitlists, conflict records, and the
//! append-only write log the host persists as one atomic unit.
//!
//! The state is single-writer within an optimisation session. Readers
//! (detector, evaluator) borrow it immutably and therefore always see a
//! consistent snapshot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::calendar::{DayOfWeek, TimeRange};
use crate::error::{Result, SchedulerError};
use crate::types::{
    Conflict, ConflictId, ConflictSignature, ConflictStatus, CourseId, CourseSection,
    RoomId, ScheduleSlot, SectionId, SlotId, SlotSpec, StudentId, TeacherId, WaitlistEntry,
};

/// One intended mutation, with before/after where applicable. The host
/// decides persistence; the engine only appends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WriteEvent {
    SlotAdded {
        slot: ScheduleSlot,
    },
    SlotRemoved {
        slot: ScheduleSlot,
    },
    SlotMutated {
        before: Box<ScheduleSlot>,
        after: Box<ScheduleSlot>,
    },
    SectionUpdated {
        before: Option<Box<CourseSection>>,
        after: Box<CourseSection>,
    },
    EnrollmentCreated {
        student_id: StudentId,
        section_id: SectionId,
    },
    EnrollmentCancelled {
        student_id: StudentId,
        section_id: SectionId,
    },
    WaitlistUpdated {
        course_id: CourseId,
        entries: Vec<WaitlistEntry>,
    },
    ConflictOpened {
        conflict: Conflict,
    },
    ConflictResolved {
        conflict_id: ConflictId,
        notes: String,
    },
    ConflictIgnored {
        conflict_id: ConflictId,
        reason: String,
    },
}

/// The mutable assignment graph for one optimisation session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleState {
    slots: BTreeMap<SlotId, ScheduleSlot>,
    sections: BTreeMap<SectionId, CourseSection>,
    waitlists: BTreeMap<CourseId, Vec<WaitlistEntry>>,
    conflicts: BTreeMap<ConflictId, Conflict>,
    write_log: Vec<WriteEvent>,
    next_slot_id: u64,
    next_conflict_id: u64,
}

impl ScheduleState {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- slots ----

    pub fn slots(&self) -> impl Iterator<Item = &ScheduleSlot> {
        self.slots.values()
    }

    pub fn slot(&self, id: SlotId) -> Option<&ScheduleSlot> {
        self.slots.get(&id)
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slots_of_section(&self, section_id: &SectionId) -> Vec<&ScheduleSlot> {
        self.slots
            .values()
            .filter(|s| s.section_id.as_ref() == Some(section_id))
            .collect()
    }

    pub fn add_slot(&mut self, spec: SlotSpec) -> SlotId {
        self.next_slot_id += 1;
        let id = SlotId(self.next_slot_id);
        let slot = spec.into_slot(id);
        self.write_log.push(WriteEvent::SlotAdded { slot: slot.clone() });
        self.slots.insert(id, slot);
        id
    }

    pub fn remove_slot(&mut self, id: SlotId) -> Result<ScheduleSlot> {
        let slot = self.slots.remove(&id).ok_or(SchedulerError::NotFound {
            kind: "slot",
            id: id.to_string(),
        })?;
        self.write_log.push(WriteEvent::SlotRemoved { slot: slot.clone() });
        Ok(slot)
    }

    pub fn mutate_slot<F>(&mut self, id: SlotId, f: F) -> Result<WriteEvent>
    where
        F: FnOnce(&mut ScheduleSlot),
    {
        let slot = self.slots.get_mut(&id).ok_or(SchedulerError::NotFound {
            kind: "slot",
            id: id.to_string(),
        })?;
        let before = slot.clone();
        f(slot);
        let event = WriteEvent::SlotMutated {
            before: Box::new(before),
            after: Box::new(slot.clone()),
        };
        self.write_log.push(event.clone());
        Ok(event)
    }

    /// True when the teacher already meets a class overlapping the given
    /// window, excluding `exclude` (the slot being moved).
    pub fn teacher_busy_at(
        &self,
        teacher: &TeacherId,
        day: DayOfWeek,
        time: &TimeRange,
        exclude: Option<SlotId>,
    ) -> bool {
        self.slots.values().any(|s| {
            Some(s.id) != exclude
                && s.day == day
                && s.teachers().any(|t| t == teacher)
                && s.time.overlaps(time)
        })
    }

    pub fn room_busy_at(
        &self,
        room: &RoomId,
        day: DayOfWeek,
        time: &TimeRange,
        exclude: Option<SlotId>,
    ) -> bool {
        self.slots.values().any(|s| {
            Some(s.id) != exclude
                && s.day == day
                && s.room_id.as_ref() == Some(room)
                && s.time.overlaps(time)
        })
    }

    // ---- sections ----

    pub fn sections(&self) -> impl Iterator<Item = &CourseSection> {
        self.sections.values()
    }

    pub fn section(&self, id: &SectionId) -> Option<&CourseSection> {
        self.sections.get(id)
    }

    pub fn sections_of_course(&self, course_id: &CourseId) -> Vec<&CourseSection> {
        self.sections
            .values()
            .filter(|s| &s.course_id == course_id)
            .collect()
    }

    pub fn sections_of_student(&self, student_id: &StudentId) -> Vec<&CourseSection> {
        self.sections
            .values()
            .filter(|s| s.has_student(student_id))
            .collect()
    }

    /// Insert a working copy of a section (seeding or split), logging it
    pub fn upsert_section(&mut self, section: CourseSection) {
        let before = self.sections.get(&section.id).cloned().map(Box::new);
        self.write_log.push(WriteEvent::SectionUpdated {
            before,
            after: Box::new(section.clone()),
        });
        self.sections.insert(section.id.clone(), section);
    }

    pub fn update_section<F>(&mut self, id: &SectionId, f: F) -> Result<WriteEvent>
    where
        F: FnOnce(&mut CourseSection),
    {
        let section = self.sections.get_mut(id).ok_or(SchedulerError::NotFound {
            kind: "section",
            id: id.to_string(),
        })?;
        let before = section.clone();
        f(section);
        let event = WriteEvent::SectionUpdated {
            before: Some(Box::new(before)),
            after: Box::new(section.clone()),
        };
        self.write_log.push(event.clone());
        Ok(event)
    }

    /// Roster mutation primitive used by the gated enrollment module.
    /// Capacity/prerequisite gating is the caller's concern.
    pub fn record_enrollment(&mut self, student_id: StudentId, section_id: &SectionId) -> Result<()> {
        let section = self
            .sections
            .get_mut(section_id)
            .ok_or(SchedulerError::NotFound {
                kind: "section",
                id: section_id.to_string(),
            })?;
        section.enroll(student_id.clone());
        self.write_log.push(WriteEvent::EnrollmentCreated {
            student_id,
            section_id: section_id.clone(),
        });
        Ok(())
    }

    pub fn record_unenrollment(
        &mut self,
        student_id: &StudentId,
        section_id: &SectionId,
    ) -> Result<()> {
        let section = self
            .sections
            .get_mut(section_id)
            .ok_or(SchedulerError::NotFound {
                kind: "section",
                id: section_id.to_string(),
            })?;
        section.unenroll(student_id);
        self.write_log.push(WriteEvent::EnrollmentCancelled {
            student_id: student_id.clone(),
            section_id: section_id.clone(),
        });
        Ok(())
    }

    // ---- waitlists ----

    pub fn waitlist(&self, course_id: &CourseId) -> &[WaitlistEntry] {
        self.waitlists
            .get(course_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn waitlisted_courses(&self) -> impl Iterator<Item = &CourseId> {
        self.waitlists.keys()
    }

    /// Replace a course's waitlist wholesale, logging the new ordering
    pub fn set_waitlist(&mut self, course_id: CourseId, entries: Vec<WaitlistEntry>) {
        self.write_log.push(WriteEvent::WaitlistUpdated {
            course_id: course_id.clone(),
            entries: entries.clone(),
        });
        self.waitlists.insert(course_id, entries);
    }

    // ---- conflicts ----

    pub fn conflicts(&self) -> impl Iterator<Item = &Conflict> {
        self.conflicts.values()
    }

    pub fn active_conflicts(&self) -> impl Iterator<Item = &Conflict> {
        self.conflicts
            .values()
            .filter(|c| c.status == ConflictStatus::Active)
    }

    /// Record a detected conflict. Assigns a persistent id; the
    /// detector's pass-local id is discarded.
    pub fn open_conflict(&mut self, mut conflict: Conflict) -> ConflictId {
        self.next_conflict_id += 1;
        let id = ConflictId(self.next_conflict_id);
        conflict.id = id;
        conflict.status = ConflictStatus::Active;
        self.write_log.push(WriteEvent::ConflictOpened {
            conflict: conflict.clone(),
        });
        self.conflicts.insert(id, conflict);
        id
    }

    /// ACTIVE -> RESOLVED. Records never reopen; re-detection opens a
    /// fresh record.
    pub fn resolve_conflict(&mut self, id: ConflictId, notes: impl Into<String>) -> Result<()> {
        let conflict = self.conflicts.get_mut(&id).ok_or(SchedulerError::NotFound {
            kind: "conflict",
            id: id.to_string(),
        })?;
        if conflict.status != ConflictStatus::Active {
            return Err(SchedulerError::InvalidInput(format!(
                "{id} is not active and cannot be resolved"
            ))
            .into());
        }
        let notes = notes.into();
        conflict.status = ConflictStatus::Resolved;
        conflict.resolution_notes = Some(notes.clone());
        self.write_log
            .push(WriteEvent::ConflictResolved { conflict_id: id, notes });
        Ok(())
    }

    /// ACTIVE -> IGNORED with a reason
    pub fn ignore_conflict(&mut self, id: ConflictId, reason: impl Into<String>) -> Result<()> {
        let conflict = self.conflicts.get_mut(&id).ok_or(SchedulerError::NotFound {
            kind: "conflict",
            id: id.to_string(),
        })?;
        if conflict.status != ConflictStatus::Active {
            return Err(SchedulerError::InvalidInput(format!(
                "{id} is not active and cannot be ignored"
            ))
            .into());
        }
        let reason = reason.into();
        conflict.status = ConflictStatus::Ignored;
        conflict.resolution_notes = Some(reason.clone());
        self.write_log
            .push(WriteEvent::ConflictIgnored { conflict_id: id, reason });
        Ok(())
    }

    /// Signatures of conflicts the operator chose to ignore; detection
    /// consumers use this to avoid re-flagging them.
    pub fn ignored_signatures(&self) -> Vec<ConflictSignature> {
        self.conflicts
            .values()
            .filter(|c| c.status == ConflictStatus::Ignored)
            .map(|c| c.signature())
            .collect()
    }

    // ---- write log ----

    pub fn write_log(&self) -> &[WriteEvent] {
        &self.write_log
    }

    /// Drain the log, handing the events to the host for persistence
    pub fn take_write_log(&mut self) -> Vec<WriteEvent> {
        std::mem::take(&mut self.write_log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::TimeOfDay;
    use crate::types::ConflictType;
    use chrono::{TimeZone, Utc};

    fn range(start: (u8, u8), end: (u8, u8)) -> TimeRange {
        TimeRange::new(
            TimeOfDay::new(start.0, start.1).unwrap(),
            TimeOfDay::new(end.0, end.1).unwrap(),
        )
        .unwrap()
    }

    fn spec(course: &str, day: DayOfWeek, period: u8) -> SlotSpec {
        SlotSpec::new(
            CourseId(course.to_string()),
            day,
            period,
            range((9, 0), (9, 50)),
        )
    }

    #[test]
    fn test_slot_lifecycle_writes_log() {
        let mut state = ScheduleState::new();
        let id = state.add_slot(spec("bio", DayOfWeek::Monday, 2));

        state
            .mutate_slot(id, |slot| {
                slot.teacher_id = Some(TeacherId("t1".to_string()));
            })
            .unwrap();
        state.remove_slot(id).unwrap();

        let log = state.write_log();
        assert_eq!(log.len(), 3);
        assert!(matches!(log[0], WriteEvent::SlotAdded { .. }));
        match &log[1] {
            WriteEvent::SlotMutated { before, after } => {
                assert!(before.teacher_id.is_none());
                assert_eq!(after.teacher_id, Some(TeacherId("t1".to_string())));
            }
            other => panic!("expected SlotMutated, got {other:?}"),
        }
        assert!(matches!(log[2], WriteEvent::SlotRemoved { .. }));
    }

    #[test]
    fn test_busy_predicates() {
        let mut state = ScheduleState::new();
        let mut s = spec("bio", DayOfWeek::Monday, 2);
        s.teacher_id = Some(TeacherId("t1".to_string()));
        s.room_id = Some(RoomId("201".to_string()));
        let id = state.add_slot(s);

        let overlapping = range((9, 30), (10, 20));
        let clear = range((10, 0), (10, 50));

        assert!(state.teacher_busy_at(
            &TeacherId("t1".to_string()),
            DayOfWeek::Monday,
            &overlapping,
            None
        ));
        assert!(!state.teacher_busy_at(
            &TeacherId("t1".to_string()),
            DayOfWeek::Monday,
            &clear,
            None
        ));
        assert!(!state.teacher_busy_at(
            &TeacherId("t1".to_string()),
            DayOfWeek::Tuesday,
            &overlapping,
            None
        ));
        // Excluding the slot itself frees the window
        assert!(!state.teacher_busy_at(
            &TeacherId("t1".to_string()),
            DayOfWeek::Monday,
            &overlapping,
            Some(id)
        ));
        assert!(state.room_busy_at(
            &RoomId("201".to_string()),
            DayOfWeek::Monday,
            &overlapping,
            None
        ));
    }

    #[test]
    fn test_conflict_lifecycle_never_reopens() {
        let mut state = ScheduleState::new();
        let now = Utc.with_ymd_and_hms(2025, 8, 20, 7, 0, 0).unwrap();

        let id = state.open_conflict(Conflict::new(
            ConflictType::TeacherOverlap,
            "double booked",
            now,
        ));
        state.resolve_conflict(id, "moved slot").unwrap();

        // A resolved record cannot transition again
        assert!(state.resolve_conflict(id, "again").is_err());
        assert!(state.ignore_conflict(id, "reason").is_err());
        assert_eq!(state.active_conflicts().count(), 0);
    }

    #[test]
    fn test_ignored_signature_tracking() {
        let mut state = ScheduleState::new();
        let now = Utc.with_ymd_and_hms(2025, 8, 20, 7, 0, 0).unwrap();

        let mut conflict = Conflict::new(ConflictType::TeacherTravel, "long walk", now);
        conflict.teachers = vec![TeacherId("t1".to_string())];
        let signature = conflict.signature();

        let id = state.open_conflict(conflict);
        state.ignore_conflict(id, "accepted by principal").unwrap();

        assert_eq!(state.ignored_signatures(), vec![signature]);
    }
}
