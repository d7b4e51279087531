use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use crate::calendar::{DayOfWeek, TimeRange};
use super::{ConflictId, CourseId, RoomId, SectionId, SlotId, StudentId, TeacherId};

/// Typed schedule violations. Declaration order is the canonical type
/// order used when sorting detection output.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ConflictType {
    TeacherOverlap,
    RoomOverlap,
    RoomCapacity,
    StudentOverlap,
    SubjectMismatch,
    ExcessiveTeachingHours,
    NoLunchBreak,
    RoomTypeMismatch,
    TeacherTravel,
    EquipmentUnavailable,
    SectionOverEnrolled,
    SectionUnderEnrolled,
    NoPrepPeriod,
}

impl ConflictType {
    pub const ALL: [ConflictType; 13] = [
        ConflictType::TeacherOverlap,
        ConflictType::RoomOverlap,
        ConflictType::RoomCapacity,
        ConflictType::StudentOverlap,
        ConflictType::SubjectMismatch,
        ConflictType::ExcessiveTeachingHours,
        ConflictType::NoLunchBreak,
        ConflictType::RoomTypeMismatch,
        ConflictType::TeacherTravel,
        ConflictType::EquipmentUnavailable,
        ConflictType::SectionOverEnrolled,
        ConflictType::SectionUnderEnrolled,
        ConflictType::NoPrepPeriod,
    ];

    /// Deterministic severity per type
    pub fn severity(&self) -> Severity {
        match self {
            ConflictType::TeacherOverlap
            | ConflictType::RoomOverlap
            | ConflictType::StudentOverlap => Severity::Critical,
            ConflictType::RoomCapacity
            | ConflictType::SubjectMismatch
            | ConflictType::SectionOverEnrolled => Severity::High,
            ConflictType::ExcessiveTeachingHours
            | ConflictType::NoPrepPeriod
            | ConflictType::NoLunchBreak => Severity::Medium,
            ConflictType::TeacherTravel
            | ConflictType::RoomTypeMismatch
            | ConflictType::EquipmentUnavailable => Severity::Low,
            ConflictType::SectionUnderEnrolled => Severity::Info,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConflictType::TeacherOverlap => "Teacher Overlap",
            ConflictType::RoomOverlap => "Room Overlap",
            ConflictType::RoomCapacity => "Room Capacity",
            ConflictType::StudentOverlap => "Student Overlap",
            ConflictType::SubjectMismatch => "Subject Mismatch",
            ConflictType::ExcessiveTeachingHours => "Excessive Teaching Hours",
            ConflictType::NoLunchBreak => "No Lunch Break",
            ConflictType::RoomTypeMismatch => "Room Type Mismatch",
            ConflictType::TeacherTravel => "Teacher Travel",
            ConflictType::EquipmentUnavailable => "Equipment Unavailable",
            ConflictType::SectionOverEnrolled => "Section Over-Enrolled",
            ConflictType::SectionUnderEnrolled => "Section Under-Enrolled",
            ConflictType::NoPrepPeriod => "No Prep Period",
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Conflict severity, most severe first
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    /// 0 = most severe; used in the canonical sort key
    pub fn rank(&self) -> u8 {
        *self as u8
    }

    /// Hard violations make a schedule infeasible
    pub fn is_hard(&self) -> bool {
        matches!(self, Severity::Critical | Severity::High)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
            Severity::Info => "INFO",
        };
        write!(f, "{name}")
    }
}

/// Conflict record lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictStatus {
    Active,
    Resolved,
    Ignored,
}

/// A typed, localised invariant violation on a schedule state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    pub id: ConflictId,
    pub kind: ConflictType,
    pub severity: Severity,
    pub message: String,
    pub slots: Vec<SlotId>,
    pub teachers: Vec<TeacherId>,
    pub students: Vec<StudentId>,
    pub rooms: Vec<RoomId>,
    pub courses: Vec<CourseId>,
    pub sections: Vec<SectionId>,
    pub day: Option<DayOfWeek>,
    /// Offending time window, e.g. the shared overlap interval
    pub window: Option<TimeRange>,
    pub detected_at: DateTime<Utc>,
    pub status: ConflictStatus,
    #[serde(default)]
    pub resolution_notes: Option<String>,
}

impl Conflict {
    pub fn new(kind: ConflictType, message: impl Into<String>, detected_at: DateTime<Utc>) -> Self {
        Self {
            id: ConflictId(0),
            kind,
            severity: kind.severity(),
            message: message.into(),
            slots: Vec::new(),
            teachers: Vec::new(),
            students: Vec::new(),
            rooms: Vec::new(),
            courses: Vec::new(),
            sections: Vec::new(),
            day: None,
            window: None,
            detected_at,
            status: ConflictStatus::Active,
            resolution_notes: None,
        }
    }

    /// Count of distinct entities the conflict touches
    pub fn affected_count(&self) -> usize {
        self.teachers.len() + self.students.len() + self.rooms.len() + self.sections.len()
    }

    /// Pass-independent identity: ids are assigned per detection pass, so
    /// the resolver matches conflicts across passes by this key.
    pub fn signature(&self) -> ConflictSignature {
        let mut slots = self.slots.clone();
        let mut teachers = self.teachers.clone();
        let mut students = self.students.clone();
        let mut rooms = self.rooms.clone();
        let mut sections = self.sections.clone();
        slots.sort();
        teachers.sort();
        students.sort();
        rooms.sort();
        sections.sort();
        ConflictSignature {
            kind: self.kind,
            slots,
            teachers,
            students,
            rooms,
            sections,
        }
    }

    /// Canonical detection-output sort key:
    /// (severity desc, type asc, day asc, start asc, primary slot asc)
    pub fn sort_key(&self) -> (u8, ConflictType, u8, u16, u64) {
        (
            self.severity.rank(),
            self.kind,
            self.day.map(|d| d.index()).unwrap_or(7),
            self.window
                .map(|w| w.start.minutes_since_midnight())
                .unwrap_or(u16::MAX),
            self.slots.first().map(|s| s.0).unwrap_or(u64::MAX),
        )
    }
}

/// Sortable, hashable conflict identity across detection passes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConflictSignature {
    pub kind: ConflictType,
    pub slots: Vec<SlotId>,
    pub teachers: Vec<TeacherId>,
    pub students: Vec<StudentId>,
    pub rooms: Vec<RoomId>,
    pub sections: Vec<SectionId>,
}
