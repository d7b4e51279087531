//! Suggestion and edit types, plus the session-scoped success history
//! that feeds confidence scores.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use crate::calendar::{DayOfWeek, PeriodGrid};
use crate::error::{Result, SchedulerError};
use crate::state::ScheduleState;
use crate::types::{CourseSection, RoomId, SectionId, SlotId, StudentId, TeacherId};

/// The kinds of localized edits the resolver can propose
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum SuggestionKind {
    ChangeTeacher,
    ChangeRoom,
    ChangeTime,
    SwapSlots,
    ReassignStudent,
    SplitSection,
    AddCoTeacher,
    Ignore,
}

impl SuggestionKind {
    /// Starting confidence before any history accrues, in percent
    pub fn default_confidence_percent(&self) -> u32 {
        match self {
            SuggestionKind::ChangeRoom => 90,
            SuggestionKind::ChangeTeacher => 85,
            SuggestionKind::SwapSlots => 75,
            SuggestionKind::ChangeTime => 70,
            SuggestionKind::ReassignStudent => 65,
            SuggestionKind::SplitSection => 60,
            SuggestionKind::AddCoTeacher => 50,
            SuggestionKind::Ignore => 20,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SuggestionKind::ChangeTeacher => "Change Teacher",
            SuggestionKind::ChangeRoom => "Change Room",
            SuggestionKind::ChangeTime => "Change Time",
            SuggestionKind::SwapSlots => "Swap Slots",
            SuggestionKind::ReassignStudent => "Reassign Student",
            SuggestionKind::SplitSection => "Split Section",
            SuggestionKind::AddCoTeacher => "Add Co-Teacher",
            SuggestionKind::Ignore => "Ignore",
        }
    }
}

impl fmt::Display for SuggestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One atomic mutation of the schedule state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScheduleEdit {
    SetTeacher {
        slot: SlotId,
        teacher: TeacherId,
    },
    AddCoTeacher {
        slot: SlotId,
        teacher: TeacherId,
    },
    SetRoom {
        slot: SlotId,
        room: RoomId,
    },
    SetTime {
        slot: SlotId,
        day: DayOfWeek,
        period: u8,
    },
    SwapTimes {
        a: SlotId,
        b: SlotId,
    },
    MoveStudent {
        student: StudentId,
        from: SectionId,
        to: SectionId,
    },
    SplitSection {
        section: SectionId,
        new_section: SectionId,
        students: Vec<StudentId>,
    },
}

/// Materialise edits into a state. Used both on scratch copies during
/// validation and on the live state after acceptance.
pub fn apply_edits(
    state: &mut ScheduleState,
    edits: &[ScheduleEdit],
    grid: &PeriodGrid,
) -> Result<()> {
    for edit in edits {
        match edit {
            ScheduleEdit::SetTeacher { slot, teacher } => {
                state.mutate_slot(*slot, |s| s.teacher_id = Some(teacher.clone()))?;
            }
            ScheduleEdit::AddCoTeacher { slot, teacher } => {
                state.mutate_slot(*slot, |s| s.co_teacher_id = Some(teacher.clone()))?;
            }
            ScheduleEdit::SetRoom { slot, room } => {
                state.mutate_slot(*slot, |s| s.room_id = Some(room.clone()))?;
            }
            ScheduleEdit::SetTime { slot, day, period } => {
                let time = grid
                    .period(*period)
                    .ok_or_else(|| {
                        SchedulerError::InvalidInput(format!("period {period} not in grid"))
                    })?
                    .time;
                state.mutate_slot(*slot, |s| {
                    s.day = *day;
                    s.period = *period;
                    s.time = time;
                })?;
            }
            ScheduleEdit::SwapTimes { a, b } => {
                let slot_a = state
                    .slot(*a)
                    .ok_or(SchedulerError::NotFound {
                        kind: "slot",
                        id: a.to_string(),
                    })?
                    .clone();
                let slot_b = state
                    .slot(*b)
                    .ok_or(SchedulerError::NotFound {
                        kind: "slot",
                        id: b.to_string(),
                    })?
                    .clone();
                state.mutate_slot(*a, |s| {
                    s.day = slot_b.day;
                    s.period = slot_b.period;
                    s.time = slot_b.time;
                })?;
                state.mutate_slot(*b, |s| {
                    s.day = slot_a.day;
                    s.period = slot_a.period;
                    s.time = slot_a.time;
                })?;
            }
            ScheduleEdit::MoveStudent { student, from, to } => {
                state.record_unenrollment(student, from)?;
                state.record_enrollment(student.clone(), to)?;
            }
            ScheduleEdit::SplitSection {
                section,
                new_section,
                students,
            } => {
                let template = state
                    .section(section)
                    .ok_or(SchedulerError::NotFound {
                        kind: "section",
                        id: section.to_string(),
                    })?
                    .clone();
                let fresh = CourseSection::new(
                    new_section.clone(),
                    template.course_id.clone(),
                    template.max_enrollment,
                );
                state.upsert_section(fresh);
                for student in students {
                    state.record_unenrollment(student, section)?;
                    state.record_enrollment(student.clone(), new_section)?;
                }
            }
        }
    }
    Ok(())
}

/// A proposed fix for one conflict
#[derive(Debug, Clone)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub edits: Vec<ScheduleEdit>,
    /// Estimated entities touched (students moved, slots edited)
    pub impact: u32,
    /// 0.0..=1.0
    pub confidence: f64,
    pub requires_confirmation: bool,
    pub description: String,
}

/// Rolling per-kind success history, trimmed to the last 100
/// applications, session-scoped.
#[derive(Debug, Default)]
pub struct SuccessHistory {
    by_kind: BTreeMap<SuggestionKind, VecDeque<bool>>,
}

const HISTORY_WINDOW: usize = 100;

impl SuccessHistory {
    pub fn record(&mut self, kind: SuggestionKind, success: bool) {
        let entries = self.by_kind.entry(kind).or_default();
        if entries.len() == HISTORY_WINDOW {
            entries.pop_front();
        }
        entries.push_back(success);
    }

    /// Observed success rate, if any applications were recorded
    pub fn rate(&self, kind: SuggestionKind) -> Option<f64> {
        let entries = self.by_kind.get(&kind)?;
        if entries.is_empty() {
            return None;
        }
        let wins = entries.iter().filter(|&&ok| ok).count();
        Some(wins as f64 / entries.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_rate_and_window() {
        let mut history = SuccessHistory::default();
        assert_eq!(history.rate(SuggestionKind::ChangeRoom), None);

        history.record(SuggestionKind::ChangeRoom, true);
        history.record(SuggestionKind::ChangeRoom, false);
        assert_eq!(history.rate(SuggestionKind::ChangeRoom), Some(0.5));

        // Saturate with successes: the early failure ages out
        for _ in 0..HISTORY_WINDOW {
            history.record(SuggestionKind::ChangeRoom, true);
        }
        assert_eq!(history.rate(SuggestionKind::ChangeRoom), Some(1.0));
    }

    #[test]
    fn test_default_confidence_table() {
        assert_eq!(SuggestionKind::ChangeRoom.default_confidence_percent(), 90);
        assert_eq!(SuggestionKind::ChangeTeacher.default_confidence_percent(), 85);
        assert_eq!(SuggestionKind::ChangeTime.default_confidence_percent(), 70);
        assert_eq!(SuggestionKind::SwapSlots.default_confidence_percent(), 75);
        assert_eq!(SuggestionKind::SplitSection.default_confidence_percent(), 60);
    }
}
