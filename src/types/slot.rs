use serde::{Deserialize, Serialize};
use crate::calendar::{DayOfWeek, TimeRange};
use super::{CourseId, RoomId, SectionId, SlotId, StudentId, TeacherId};

/// One scheduled meeting: a course section on one day in one room with
/// one teacher. Slots hold ids, never references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSlot {
    pub id: SlotId,
    pub course_id: CourseId,
    /// The section whose roster meets here; lunch-wave slots have none
    #[serde(default)]
    pub section_id: Option<SectionId>,
    #[serde(default)]
    pub teacher_id: Option<TeacherId>,
    #[serde(default)]
    pub co_teacher_id: Option<TeacherId>,
    #[serde(default)]
    pub room_id: Option<RoomId>,
    pub day: DayOfWeek,
    /// 1-based period number
    pub period: u8,
    pub time: TimeRange,
    #[serde(default)]
    pub is_lunch: bool,
    #[serde(default)]
    pub lunch_wave: Option<u8>,
    /// Direct roster for sectionless slots (lunch waves)
    #[serde(default)]
    pub students: Vec<StudentId>,
}

/// Slot fields supplied by callers; the state arena assigns the id.
#[derive(Debug, Clone)]
pub struct SlotSpec {
    pub course_id: CourseId,
    pub section_id: Option<SectionId>,
    pub teacher_id: Option<TeacherId>,
    pub room_id: Option<RoomId>,
    pub day: DayOfWeek,
    pub period: u8,
    pub time: TimeRange,
    pub is_lunch: bool,
    pub lunch_wave: Option<u8>,
    pub students: Vec<StudentId>,
}

impl SlotSpec {
    pub fn new(course_id: CourseId, day: DayOfWeek, period: u8, time: TimeRange) -> Self {
        Self {
            course_id,
            section_id: None,
            teacher_id: None,
            room_id: None,
            day,
            period,
            time,
            is_lunch: false,
            lunch_wave: None,
            students: Vec::new(),
        }
    }

    pub fn into_slot(self, id: SlotId) -> ScheduleSlot {
        ScheduleSlot {
            id,
            course_id: self.course_id,
            section_id: self.section_id,
            teacher_id: self.teacher_id,
            co_teacher_id: None,
            room_id: self.room_id,
            day: self.day,
            period: self.period,
            time: self.time,
            is_lunch: self.is_lunch,
            lunch_wave: self.lunch_wave,
            students: self.students,
        }
    }
}

impl ScheduleSlot {
    /// Teachers bound to this meeting (primary first)
    pub fn teachers(&self) -> impl Iterator<Item = &TeacherId> {
        self.teacher_id.iter().chain(self.co_teacher_id.iter())
    }

    pub fn overlaps(&self, other: &ScheduleSlot) -> bool {
        self.day == other.day && self.time.overlaps(&other.time)
    }
}
